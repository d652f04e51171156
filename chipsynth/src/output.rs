//! The boundary between the engine and the audio hardware: conversion of the
//! 32 bit mix into output samples, and the sink the periodic driver writes
//! finished blocks to.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// The sample format the output stage produces
pub enum OutputDepth {
    /// 16 bit container with the low byte cleared, for a bit-crushed sound
    Bits8,
    /// Plain 16 bit
    #[default]
    Bits16,
    /// 16 bits of resolution, left-justified in a 32 bit container
    Bits32,
}

impl TryFrom<u8> for OutputDepth {
    type Error = &'static str;
    fn try_from(value: u8) -> Result<Self, &'static str> {
        match value {
            8 => Ok(Self::Bits8),
            16 => Ok(Self::Bits16),
            32 => Ok(Self::Bits32),
            _ => Err("Unsupported output depth"),
        }
    }
}

// apply the master volume and clip to 16 bits
#[inline]
fn scale(mix: i32, master: u8, shift: u32) -> i32 {
    ((mix as i64 * master as i64) >> shift).clamp(i16::MIN as i64, i16::MAX as i64) as i32
}

#[inline]
fn quantize_16(mix: i32, master: u8, depth: OutputDepth) -> i16 {
    let s = scale(mix, master, 9);
    match depth {
        OutputDepth::Bits8 => (s & !0xFF) as i16,
        _ => s as i16,
    }
}

/// A type the mix can be quantized into
pub trait OutputSample: Copy + Default {
    /// Convert one mixed sample, applying the master volume
    fn from_mix(mix: i32, master: u8, depth: OutputDepth) -> Self;
}

impl OutputSample for i16 {
    fn from_mix(mix: i32, master: u8, depth: OutputDepth) -> Self {
        quantize_16(mix, master, depth)
    }
}

impl OutputSample for i32 {
    fn from_mix(mix: i32, master: u8, depth: OutputDepth) -> Self {
        match depth {
            OutputDepth::Bits32 => scale(mix, master, 8) << 16,
            _ => (quantize_16(mix, master, depth) as i32) << 16,
        }
    }
}

/// Unsigned 8 bit, for driving a DAC directly
impl OutputSample for u8 {
    fn from_mix(mix: i32, master: u8, depth: OutputDepth) -> Self {
        ((quantize_16(mix, master, depth) as i32 + 32768) >> 8) as u8
    }
}

/// Where finished blocks go.  Implementations are expected to block until
/// the hardware (or file, or ring buffer) has room.
pub trait OutputSink<S> {
    /// The error reported by the underlying device
    type Error;
    /// Write a block of mono frames
    fn write(&mut self, frames: &[S]) -> Result<(), Self::Error>;
}

/// Frames handed to the inner sink per write
pub const STEREO_CHUNK: usize = 64;

/// Adapts a stereo sink to take mono blocks by duplicating each frame into
/// both channels
pub struct StereoDuplicate<K> {
    inner: K,
}

impl<K> StereoDuplicate<K> {
    /// Wrap a stereo sink
    pub fn new(inner: K) -> Self {
        Self { inner }
    }
    /// Unwrap the stereo sink
    pub fn into_inner(self) -> K {
        self.inner
    }
}

impl<S: Copy + Default, K: OutputSink<S>> OutputSink<S> for StereoDuplicate<K> {
    type Error = K::Error;
    fn write(&mut self, frames: &[S]) -> Result<(), Self::Error> {
        let mut buf = [S::default(); STEREO_CHUNK * 2];
        for chunk in frames.chunks(STEREO_CHUNK) {
            for (pair, s) in buf.chunks_exact_mut(2).zip(chunk) {
                pair[0] = *s;
                pair[1] = *s;
            }
            self.inner.write(&buf[..chunk.len() * 2])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_volume_halves() {
        assert_eq!(i16::from_mix(2 * i16::MAX as i32, 128, OutputDepth::Bits16), i16::MAX / 2);
        assert_eq!(i32::from_mix(i16::MAX as i32, 128, OutputDepth::Bits32), (i16::MAX as i32 / 2) << 16);
    }
    #[test]
    fn scale_then_clip() {
        assert_eq!(i16::from_mix(1 << 20, 128, OutputDepth::Bits16), i16::MAX);
        assert_eq!(i16::from_mix(-(1 << 20), 128, OutputDepth::Bits16), i16::MIN);
        // loud enough to clip at full volume, but not at a quarter
        assert_eq!(i16::from_mix(100_000, 255, OutputDepth::Bits16), i16::MAX);
        assert_eq!(i16::from_mix(100_000, 64, OutputDepth::Bits16), 12500);
        assert_eq!(i32::from_mix(1 << 20, 255, OutputDepth::Bits32), (i16::MAX as i32) << 16);
    }
    #[test]
    fn bitcrush_masks_low_byte() {
        let s = i16::from_mix(12345 * 2, 255, OutputDepth::Bits8);
        assert_eq!(s & 0xFF, 0);
        assert_eq!(s, i16::from_mix(12345 * 2, 255, OutputDepth::Bits16) & !0xFF);
        assert_eq!(i16::from_mix(-1000, 255, OutputDepth::Bits8), -512);
    }
    #[test]
    fn dac_rebias() {
        assert_eq!(u8::from_mix(0, 255, OutputDepth::Bits16), 128);
        assert_eq!(u8::from_mix(1 << 20, 255, OutputDepth::Bits16), 255);
        assert_eq!(u8::from_mix(-(1 << 20), 255, OutputDepth::Bits16), 0);
    }
    #[test]
    fn depth_from_bits() {
        assert_eq!(OutputDepth::try_from(32), Ok(OutputDepth::Bits32));
        assert!(OutputDepth::try_from(24).is_err());
    }

    struct Collect(Vec<i16>, usize);
    impl OutputSink<i16> for Collect {
        type Error = ();
        fn write(&mut self, frames: &[i16]) -> Result<(), ()> {
            self.0.extend_from_slice(frames);
            self.1 += 1;
            Ok(())
        }
    }

    #[test]
    fn stereo_duplication() {
        let mono: Vec<i16> = (0..150).collect();
        let mut sink = StereoDuplicate::new(Collect(Vec::new(), 0));
        sink.write(&mono).unwrap();
        let Collect(out, writes) = sink.into_inner();
        assert_eq!(writes, 3);
        assert_eq!(out.len(), 300);
        for (i, pair) in out.chunks(2).enumerate() {
            assert_eq!(pair, [i as i16, i as i16]);
        }
    }
}
