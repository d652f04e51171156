//! WAV output through hound

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use chipsynth::OutputSink;
use hound::{SampleFormat, WavSpec, WavWriter};

/// A WAV file (or any seekable writer) accepting interleaved frames
pub struct WavSink<W: Write + Seek> {
    writer: WavWriter<W>,
}

impl WavSink<BufWriter<File>> {
    pub fn create(path: &Path, sample_rate: u32, channels: u16, bits: u16) -> hound::Result<Self> {
        let sink = Self::new(BufWriter::new(File::create(path)?), sample_rate, channels, bits)?;
        log::info!(
            "writing {} ({}Hz, {} bit, {} channel{})",
            path.display(),
            sample_rate,
            bits,
            channels,
            if channels == 1 { "" } else { "s" }
        );
        Ok(sink)
    }
}

impl<W: Write + Seek> WavSink<W> {
    pub fn new(inner: W, sample_rate: u32, channels: u16, bits: u16) -> hound::Result<Self> {
        Ok(Self {
            writer: WavWriter::new(inner, spec(sample_rate, channels, bits))?,
        })
    }

    /// Number of samples written so far, across all channels
    pub fn samples_written(&self) -> u32 {
        self.writer.len()
    }

    /// Patch up the header and flush
    pub fn finalize(self) -> hound::Result<()> {
        self.writer.finalize()
    }
}

fn spec(sample_rate: u32, channels: u16, bits: u16) -> WavSpec {
    WavSpec {
        channels,
        sample_rate,
        bits_per_sample: bits,
        sample_format: SampleFormat::Int,
    }
}

impl<W: Write + Seek> OutputSink<i16> for WavSink<W> {
    type Error = hound::Error;
    fn write(&mut self, frames: &[i16]) -> Result<(), hound::Error> {
        for s in frames {
            self.writer.write_sample(*s)?;
        }
        Ok(())
    }
}

impl<W: Write + Seek> OutputSink<i32> for WavSink<W> {
    type Error = hound::Error;
    fn write(&mut self, frames: &[i32]) -> Result<(), hound::Error> {
        for s in frames {
            self.writer.write_sample(*s)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chipsynth::output::StereoDuplicate;
    use std::io::Cursor;

    #[test]
    fn mono_16() {
        let mut buf = Cursor::new(Vec::new());
        let mut sink = WavSink::new(&mut buf, 48000, 1, 16).unwrap();
        sink.write(&[1i16, -2, 3][..]).unwrap();
        assert_eq!(sink.samples_written(), 3);
        sink.finalize().unwrap();
        buf.set_position(0);
        let reader = hound::WavReader::new(buf).unwrap();
        assert_eq!(reader.spec().sample_rate, 48000);
        let got: Vec<i16> = reader.into_samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(got, [1, -2, 3]);
    }
    #[test]
    fn stereo_32() {
        let mut buf = Cursor::new(Vec::new());
        let sink = WavSink::new(&mut buf, 44100, 2, 32).unwrap();
        let mut stereo = StereoDuplicate::new(sink);
        stereo.write(&[7i32 << 16, -(9 << 16)][..]).unwrap();
        stereo.into_inner().finalize().unwrap();
        buf.set_position(0);
        let reader = hound::WavReader::new(buf).unwrap();
        assert_eq!(reader.spec().channels, 2);
        let got: Vec<i32> = reader.into_samples::<i32>().map(Result::unwrap).collect();
        assert_eq!(got, [7 << 16, 7 << 16, -(9 << 16), -(9 << 16)]);
    }
}
