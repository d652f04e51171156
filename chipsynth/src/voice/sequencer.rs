//! Stage sequencing for voices bound to a [TrackerInstrument]
//!
//! The envelope's stage doubles as the sequencer's position: Attack walks
//! the attack stages, Sustain holds, Release walks the release stages and
//! then ends the note.  The envelope level itself stays pinned at full scale;
//! loudness comes from each stage's volume.

use crate::devices::{EnvStage, Envelope};
use crate::fixedmath::ms_to_ticks;
use crate::instrument::{Stage, TrackerInstrument, WaveSelect};

/// What a tracker-bound voice should sound like after a control tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageOutput {
    /// Voice volume
    pub volume: u8,
    /// Waveform for the current stage
    pub wave: WaveSelect,
    /// Waveform for the following stage, for crossfading
    pub next: WaveSelect,
    /// How far to crossfade from `wave` into `next` (0-255)
    pub morph: u8,
}

impl StageOutput {
    fn held(stage: Stage) -> Self {
        let wave = WaveSelect::decode(stage.wave);
        Self {
            volume: stage.volume,
            wave,
            next: wave,
            morph: 0,
        }
    }
}

/// Result of one sequencer tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeqStep {
    /// Nothing to change
    Hold,
    /// Apply the given stage
    Apply(StageOutput),
    /// The release sequence is over; the voice should stop
    Finished,
}

/// Position within the current sequence
#[derive(Clone, Debug, Default)]
pub struct Sequencer {
    stage_idx: usize,
    ticks_left: u32,
    ticks_total: u32,
}

impl Sequencer {
    /// Rewind to the first stage (on note-on and note-off)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
    /// Index of the stage currently playing
    pub fn stage_index(&self) -> usize {
        self.stage_idx
    }

    /// Evaluate one control tick
    pub fn tick(&mut self, inst: &TrackerInstrument, env: &mut Envelope, control_rate: u32) -> SeqStep {
        match env.stage() {
            EnvStage::Attack => {
                if inst.attack.is_empty() {
                    env.set_stage(EnvStage::Sustain);
                    return SeqStep::Apply(StageOutput::held(inst.sustain));
                }
                let out = self.walk(
                    inst.attack,
                    inst.attack_speed_ms,
                    inst.sustain.wave,
                    inst.smooth_morph,
                    control_rate,
                );
                if self.stage_idx >= inst.attack.len() {
                    env.set_stage(EnvStage::Sustain);
                }
                SeqStep::Apply(out)
            }
            EnvStage::Decay | EnvStage::Sustain => {
                env.set_stage(EnvStage::Sustain);
                SeqStep::Apply(StageOutput::held(inst.sustain))
            }
            EnvStage::Release => {
                let Some(last) = inst.release.last() else {
                    return SeqStep::Finished;
                };
                let out = self.walk(
                    inst.release,
                    inst.release_speed_ms,
                    last.wave,
                    inst.smooth_morph,
                    control_rate,
                );
                if self.stage_idx >= inst.release.len() {
                    SeqStep::Finished
                } else {
                    SeqStep::Apply(out)
                }
            }
            EnvStage::Idle => SeqStep::Hold,
        }
    }

    // `stages` must be non-empty
    fn walk(&mut self, stages: &[Stage], speed_ms: u16, after: i16, smooth: bool, rate: u32) -> StageOutput {
        if self.ticks_left == 0 {
            self.ticks_total = ms_to_ticks(speed_ms as u32, rate).max(1);
            self.ticks_left = self.ticks_total;
        }
        let idx = self.stage_idx.min(stages.len() - 1);
        let stage = stages[idx];
        let next = stages.get(idx + 1).map_or(after, |s| s.wave);
        let morph = if smooth {
            let elapsed = self.ticks_total - self.ticks_left;
            (elapsed as u64 * 255 / self.ticks_total as u64) as u8
        } else {
            0
        };
        self.ticks_left -= 1;
        if self.ticks_left == 0 {
            self.stage_idx += 1;
        }
        StageOutput {
            volume: stage.volume,
            wave: WaveSelect::decode(stage.wave),
            next: WaveSelect::decode(next),
            morph,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{W_NOISE, W_SAW, W_TRI};
    use crate::voice::WaveType;

    const ATTACK: [Stage; 2] = [Stage::new(200, 0), Stage::new(150, 1)];
    const RELEASE: [Stage; 2] = [Stage::new(100, W_SAW), Stage::new(50, W_NOISE)];

    fn instrument(smooth_morph: bool) -> TrackerInstrument<'static> {
        TrackerInstrument {
            attack: &ATTACK,
            attack_speed_ms: 20,
            sustain: Stage::new(120, W_TRI),
            release: &RELEASE,
            release_speed_ms: 10,
            smooth_morph,
        }
    }

    fn started() -> (Sequencer, Envelope) {
        let mut env = Envelope::default();
        env.trigger_full();
        (Sequencer::default(), env)
    }

    fn volume(step: SeqStep) -> Option<u8> {
        match step {
            SeqStep::Apply(out) => Some(out.volume),
            _ => None,
        }
    }

    #[test]
    fn attack_then_sustain() {
        let inst = instrument(false);
        let (mut seq, mut env) = started();
        // 20 ms per stage at 100 Hz is two ticks each
        let vols: Vec<_> = (0..5).map(|_| volume(seq.tick(&inst, &mut env, 100))).collect();
        assert_eq!(vols, [Some(200), Some(200), Some(150), Some(150), Some(120)]);
        assert_eq!(env.stage(), EnvStage::Sustain);
        let SeqStep::Apply(out) = seq.tick(&inst, &mut env, 100) else {
            panic!("sustain should apply");
        };
        assert_eq!(out.wave, WaveSelect::Basic(WaveType::Triangle));
    }
    #[test]
    fn empty_attack_goes_to_sustain() {
        let inst = TrackerInstrument::held(Stage::new(77, 3));
        let (mut seq, mut env) = started();
        assert_eq!(volume(seq.tick(&inst, &mut env, 100)), Some(77));
        assert_eq!(env.stage(), EnvStage::Sustain);
    }
    #[test]
    fn decay_passes_through() {
        let inst = instrument(false);
        let (mut seq, mut env) = started();
        env.set_stage(EnvStage::Decay);
        assert_eq!(volume(seq.tick(&inst, &mut env, 100)), Some(120));
        assert_eq!(env.stage(), EnvStage::Sustain);
    }
    #[test]
    fn release_runs_out() {
        let inst = instrument(false);
        let (mut seq, mut env) = started();
        env.release();
        assert_eq!(volume(seq.tick(&inst, &mut env, 100)), Some(100));
        assert_eq!(seq.tick(&inst, &mut env, 100), SeqStep::Finished);

        let empty = TrackerInstrument::held(Stage::new(1, 0));
        let (mut seq, mut env) = started();
        env.release();
        assert_eq!(seq.tick(&empty, &mut env, 100), SeqStep::Finished);
    }
    #[test]
    fn zero_speed_is_one_tick() {
        let mut inst = instrument(false);
        inst.attack_speed_ms = 0;
        let (mut seq, mut env) = started();
        assert_eq!(volume(seq.tick(&inst, &mut env, 100)), Some(200));
        assert_eq!(volume(seq.tick(&inst, &mut env, 100)), Some(150));
        assert_eq!(env.stage(), EnvStage::Sustain);
    }
    #[test]
    fn morph_is_linear_with_lookahead() {
        let mut inst = instrument(true);
        inst.attack_speed_ms = 40;
        let (mut seq, mut env) = started();
        let mut morphs = Vec::new();
        for _ in 0..4 {
            let SeqStep::Apply(out) = seq.tick(&inst, &mut env, 100) else {
                panic!("attack should apply");
            };
            assert_eq!(out.wave, WaveSelect::Wavetable(0));
            assert_eq!(out.next, WaveSelect::Wavetable(1));
            morphs.push(out.morph);
        }
        assert_eq!(morphs, [0, 63, 127, 191]);
        // the last attack stage looks ahead to the sustain wave
        let SeqStep::Apply(out) = seq.tick(&inst, &mut env, 100) else {
            panic!("attack should apply");
        };
        assert_eq!(out.next, WaveSelect::Basic(WaveType::Triangle));
    }
}
