//! Runs a [Synth] against a command schedule, the way an audio driver would:
//! pending commands are applied between blocks, and blocks are cut short so
//! each command lands on its exact sample.

use chipsynth::{OutputSample, OutputSink, Synth};

use crate::instrumentation;
use crate::score::Timed;

/// Render `total` samples into `sink`, in blocks of at most `block` samples
pub fn play<'a, S, K, const VOICES: usize>(
    synth: &mut Synth<'a, VOICES>,
    schedule: &[Timed<'a>],
    total: u64,
    block: usize,
    sink: &mut K,
) -> Result<(), K::Error>
where
    S: OutputSample,
    K: OutputSink<S>,
{
    let block = block.clamp(1, chipsynth::MAX_BLOCK_SIZE) as u64;
    let mut buf = vec![S::default(); block as usize];
    let mut pending = schedule.iter().peekable();
    let mut pos = 0u64;
    while pos < total {
        while let Some(t) = pending.next_if(|t| t.at <= pos) {
            log::trace!("{}: {:?}", pos, t.cmd);
            synth.apply(&t.cmd);
        }
        let mut len = block.min(total - pos);
        if let Some(next) = pending.peek() {
            len = len.min(next.at - pos);
        }
        let timer = instrumentation::begin();
        synth.render_to(&mut buf[..len as usize], sink)?;
        instrumentation::end(timer, len);
        pos += len;
    }
    let skipped = pending.count();
    if skipped > 0 {
        log::warn!("{} commands scheduled past the end were dropped", skipped);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chipsynth::{Command, Context, WaveType};

    #[derive(Default)]
    pub struct Collect {
        pub samples: Vec<i16>,
        pub blocks: Vec<usize>,
    }

    impl OutputSink<i16> for Collect {
        type Error = std::convert::Infallible;
        fn write(&mut self, frames: &[i16]) -> Result<(), Self::Error> {
            self.samples.extend_from_slice(frames);
            self.blocks.push(frames.len());
            Ok(())
        }
    }

    #[test]
    fn commands_land_on_their_sample() {
        let schedule = [
            Timed {
                at: 0,
                cmd: Command::SetWave {
                    voice: 0,
                    wave: WaveType::Pulse,
                },
            },
            Timed {
                at: 100,
                cmd: Command::NoteOn {
                    voice: 0,
                    centihz: 44000,
                    volume: 255,
                },
            },
            Timed {
                at: 5000,
                cmd: Command::NoteOff { voice: 0 },
            },
        ];
        let mut synth = Synth::<2>::with_seed(Context::new_480(), 3);
        let mut sink = Collect::default();
        play::<i16, Collect, 2>(&mut synth, &schedule, 700, 256, &mut sink).unwrap();
        assert_eq!(sink.samples.len(), 700);
        assert_eq!(sink.blocks, [100, 256, 256, 88]);
        assert!(sink.samples[..100].iter().all(|&s| s == 0));
        assert!(sink.samples[100] > 0);
        // the note-off was never reached
        assert!(synth.is_voice_active(0));
    }
    #[test]
    fn oversized_blocks_are_clamped() {
        let mut synth = Synth::<1>::with_seed(Context::new_480(), 3);
        let mut sink = Collect::default();
        play::<i16, Collect, 1>(&mut synth, &[], 1500, 100_000, &mut sink).unwrap();
        assert_eq!(sink.blocks, [512, 512, 476]);
    }
}
