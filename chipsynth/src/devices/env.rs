use super::*;

/// Full-scale envelope level, in bits of [EnvFxP]
pub const ENV_MAX: u32 = 1 << 28;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// The phase an [Envelope] is in
pub enum EnvStage {
    /// Not sounding
    #[default]
    Idle,
    /// Rising towards full scale
    Attack,
    /// Falling towards the sustain level
    Decay,
    /// Holding
    Sustain,
    /// Falling towards zero after note-off
    Release,
}

/// Parameters for an [Envelope].  Times of zero are instantaneous.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EnvParams {
    /// Attack time, in milliseconds
    pub attack_ms: u16,
    /// Decay time, in milliseconds
    pub decay_ms: u16,
    /// Sustain level, where 255 is (almost exactly) full scale
    pub sustain: u8,
    /// Release time, in milliseconds
    pub release_ms: u16,
}

impl Default for EnvParams {
    fn default() -> Self {
        Self {
            attack_ms: 0,
            decay_ms: 0,
            sustain: u8::MAX,
            release_ms: 0,
        }
    }
}

/// The envelope over one block: sample `i` of the block is scaled by
/// `start + i * step`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnvRamp {
    /// Level at the first sample of the block, in bits of [EnvFxP]
    pub start: u32,
    /// Per-sample change across the block
    pub step: i32,
    /// True if the release finished during this block
    pub ended: bool,
}

impl EnvRamp {
    const fn flat(level: u32) -> Self {
        Self {
            start: level,
            step: 0,
            ended: false,
        }
    }
    /// True if every sample of this block is at zero
    pub const fn is_silent(&self) -> bool {
        self.start == 0 && self.step == 0
    }
}

/// A linear ADSR envelope evaluated once per block.
///
/// The state machine may cross one or more stage boundaries within a block;
/// the returned [EnvRamp] then interpolates linearly between the level at the
/// start of the block and the level the new stage has reached by its end.
#[derive(Clone, Debug)]
pub struct Envelope {
    stage: EnvStage,
    value: EnvFxP,
    attack_rate: EnvFxP,
    decay_rate: EnvFxP,
    sustain: EnvFxP,
    release_rate: EnvFxP,
    params: EnvParams,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            stage: EnvStage::Idle,
            value: EnvFxP::ZERO,
            attack_rate: EnvFxP::ONE,
            decay_rate: EnvFxP::ZERO,
            sustain: EnvFxP::ONE,
            release_rate: EnvFxP::ONE,
            params: EnvParams::default(),
        }
    }
}

// Per-sample rate covering full scale in `ms`; zero is a jump
fn rate_for(ms: u16, samples_per_ms: u32) -> EnvFxP {
    if ms == 0 {
        EnvFxP::ONE
    } else {
        let samples = (ms as u64 * samples_per_ms as u64).max(1);
        EnvFxP::from_bits((ENV_MAX as u64 / samples) as u32)
    }
}

impl Envelope {
    /// Recompute the per-sample rates from the given parameters
    pub fn set_params(&mut self, params: EnvParams, context: &Context) {
        let spm = context.samples_per_ms();
        self.attack_rate = rate_for(params.attack_ms, spm);
        self.decay_rate = rate_for(params.decay_ms, spm);
        self.release_rate = rate_for(params.release_ms, spm);
        self.sustain = EnvFxP::from_bits(params.sustain as u32 * (ENV_MAX / 255));
        self.params = params;
    }
    /// The parameters last applied
    pub fn params(&self) -> EnvParams {
        self.params
    }
    /// The current stage
    pub fn stage(&self) -> EnvStage {
        self.stage
    }
    /// The level at the end of the last block
    pub fn value(&self) -> EnvFxP {
        self.value
    }
    /// Retrigger from silence.  An instantaneous attack skips straight to
    /// the decay stage at full scale.
    pub fn trigger(&mut self) {
        if self.attack_rate >= EnvFxP::ONE {
            self.value = EnvFxP::ONE;
            self.stage = EnvStage::Decay;
        } else {
            self.value = EnvFxP::ZERO;
            self.stage = EnvStage::Attack;
        }
    }
    /// Retrigger at full scale (used by instruments, which either pin the
    /// level or start their samples at full volume)
    pub fn trigger_full(&mut self) {
        self.value = EnvFxP::ONE;
        self.stage = EnvStage::Attack;
    }
    /// Enter the release stage
    pub fn release(&mut self) {
        self.stage = EnvStage::Release;
    }
    /// Park at zero
    pub fn silence(&mut self) {
        self.value = EnvFxP::ZERO;
        self.stage = EnvStage::Idle;
    }
    /// Move the stage without touching the level
    pub(crate) fn set_stage(&mut self, stage: EnvStage) {
        self.stage = stage;
    }

    /// Advance the envelope over a block of `samples` samples.  When
    /// `pinned` is set the level is held at full scale regardless of stage
    /// (the stage itself then belongs to whatever is sequencing the voice).
    pub fn advance(&mut self, samples: u32, pinned: bool) -> EnvRamp {
        if pinned {
            self.value = EnvFxP::ONE;
            return EnvRamp::flat(ENV_MAX);
        }
        match self.stage {
            EnvStage::Idle => {
                self.value = EnvFxP::ZERO;
                return EnvRamp::flat(0);
            }
            EnvStage::Sustain => return EnvRamp::flat(self.value.to_bits()),
            EnvStage::Attack if self.attack_rate >= EnvFxP::ONE => {
                self.value = EnvFxP::ONE;
                self.stage = EnvStage::Decay;
                return EnvRamp::flat(ENV_MAX);
            }
            EnvStage::Decay if self.decay_rate >= EnvFxP::ONE => {
                self.value = self.sustain;
                self.stage = EnvStage::Sustain;
                return EnvRamp::flat(self.value.to_bits());
            }
            EnvStage::Release if self.release_rate >= EnvFxP::ONE => {
                self.silence();
                return EnvRamp {
                    start: 0,
                    step: 0,
                    ended: true,
                };
            }
            _ => {}
        }
        if samples == 0 {
            return EnvRamp::flat(self.value.to_bits());
        }
        let start = self.value.to_bits().min(ENV_MAX);
        let max = ENV_MAX as u64;
        let mut level = start as u64;
        let mut remaining = samples as u64;
        let mut ended = false;
        while remaining > 0 {
            match self.stage {
                EnvStage::Attack => {
                    let rate = self.attack_rate.to_bits() as u64;
                    if rate == 0 {
                        break;
                    }
                    let need = (max - level).div_ceil(rate);
                    if need > remaining {
                        level += rate * remaining;
                        remaining = 0;
                    } else {
                        level = max;
                        remaining -= need;
                        self.stage = EnvStage::Decay;
                    }
                }
                EnvStage::Decay => {
                    let sustain = self.sustain.to_bits() as u64;
                    let rate = self.decay_rate.to_bits() as u64;
                    if level <= sustain || rate >= max {
                        level = sustain;
                        self.stage = EnvStage::Sustain;
                        continue;
                    }
                    if rate == 0 {
                        break;
                    }
                    let need = (level - sustain).div_ceil(rate);
                    if need > remaining {
                        level -= rate * remaining;
                        remaining = 0;
                    } else {
                        level = sustain;
                        remaining -= need;
                        self.stage = EnvStage::Sustain;
                    }
                }
                EnvStage::Release => {
                    let rate = self.release_rate.to_bits() as u64;
                    if rate == 0 {
                        break;
                    }
                    let need = level.div_ceil(rate);
                    if need > remaining {
                        level -= rate * remaining;
                    } else {
                        level = 0;
                        self.stage = EnvStage::Idle;
                        ended = true;
                    }
                    remaining = 0;
                }
                EnvStage::Idle | EnvStage::Sustain => break,
            }
        }
        self.value = EnvFxP::from_bits(level as u32);
        let step = (level as i64 - start as i64) / samples as i64;
        EnvRamp {
            start,
            step: step as i32,
            ended,
        }
    }
}
