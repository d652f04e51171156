use super::*;
use crate::{SampleIncFxP, SamplePosFxP};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// How a sample behaves at its loop points
pub enum LoopMode {
    /// Play once and stop
    #[default]
    Off,
    /// Jump from the loop end back to the loop start
    Forward,
    /// Bounce between the loop points
    PingPong,
    /// Play backwards, jumping from the loop start to the loop end
    Reverse,
}

impl TryFrom<u8> for LoopMode {
    type Error = &'static str;
    fn try_from(value: u8) -> Result<Self, &'static str> {
        match value {
            0 => Ok(Self::Off),
            1 => Ok(Self::Forward),
            2 => Ok(Self::PingPong),
            3 => Ok(Self::Reverse),
            _ => Err("Conversion of u8 to LoopMode Overflowed"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
/// Loop settings for a playing sample
pub struct SampleLoop {
    /// Behaviour at the loop points
    pub mode: LoopMode,
    /// First frame of the loop
    pub start: u32,
    /// Frame after the last frame of the loop (0 means the end of the sample)
    pub end: u32,
}

impl SampleLoop {
    /// A sample that plays once
    pub const fn off() -> Self {
        Self {
            mode: LoopMode::Off,
            start: 0,
            end: 0,
        }
    }
    /// Clamp the loop points to a sample of `len` frames.  An end of zero or
    /// past the end of the data becomes `len`, and a start at or past the end
    /// becomes zero.
    pub const fn resolve(self, len: u32) -> Self {
        let end = if self.end == 0 || self.end > len {
            len
        } else {
            self.end
        };
        let start = if self.start >= end { 0 } else { self.start };
        Self {
            mode: self.mode,
            start,
            end,
        }
    }
}

/// The playback rate needed to hear a sample recorded at `root_centihz` and
/// `sample_rate` at `centihz` when output runs at `output_rate`.  A sample
/// with no root pitch does not advance.
pub fn sample_increment(centihz: u32, root_centihz: u32, sample_rate: u32, output_rate: u32) -> SampleIncFxP {
    if root_centihz == 0 {
        return SampleIncFxP::ZERO;
    }
    let ratio = ((centihz as u128) << 16) / root_centihz as u128;
    let inc = ratio * sample_rate as u128 / output_rate.max(1) as u128;
    SampleIncFxP::from_bits(u32::try_from(inc).unwrap_or(u32::MAX))
}

/// Playback state for a voice playing a registered sample
#[derive(Clone, Debug, Default)]
pub struct SamplePlayer {
    id: Option<u16>,
    pos: SamplePosFxP,
    inc: SampleIncFxP,
    looping: SampleLoop,
    forward: bool,
    finished: bool,
}

impl SamplePlayer {
    /// Start playing `data` (registered as `id`) from the beginning, or from
    /// the end when the loop mode is [LoopMode::Reverse]
    pub fn start(&mut self, id: u16, data: &SampleData, looping: SampleLoop, inc: SampleIncFxP) {
        let len = data.len();
        self.id = Some(id);
        self.looping = looping.resolve(len);
        self.inc = inc;
        self.forward = looping.mode != LoopMode::Reverse;
        self.pos = if self.forward {
            SamplePosFxP::ZERO
        } else {
            SamplePosFxP::from_bits(((len as u64) << 16).saturating_sub(1))
        };
        self.finished = false;
    }
    /// Forget the current sample
    pub fn clear(&mut self) {
        *self = Self::default();
    }
    /// Change the loop settings without restarting playback
    pub fn set_loop(&mut self, looping: SampleLoop, len: u32) {
        self.looping = looping.resolve(len);
    }
    /// Change the playback rate
    pub fn set_increment(&mut self, inc: SampleIncFxP) {
        self.inc = inc;
    }
    /// The registered ID of the sample, if any
    pub fn id(&self) -> Option<u16> {
        self.id
    }
    /// The current position, in frames
    pub fn position(&self) -> SamplePosFxP {
        self.pos
    }
    /// The playback rate, in frames per output sample
    pub fn increment(&self) -> SampleIncFxP {
        self.inc
    }
    /// The loop settings in effect
    pub fn looping(&self) -> SampleLoop {
        self.looping
    }
    /// True while moving towards the end of the sample
    pub fn is_forward(&self) -> bool {
        self.forward
    }
    /// True once a non-looping sample has played out
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Mix the next block of `data`.  Returns true if playback finished
    /// during this block.
    pub(crate) fn render(&mut self, data: &SampleData, mix: &mut [i32], ramp: &EnvRamp, gain: Gain) -> bool {
        if self.finished || data.is_empty() {
            return false;
        }
        let frames = data.data;
        let len = data.len() as u64;
        let SampleLoop { mode, start, end } = self.looping.resolve(data.len());
        let loop_start = (start as u64) << 16;
        let loop_end = (end as u64) << 16;
        let last = loop_end - 1;
        let inc = self.inc.to_bits() as u64;
        let mut pos = self.pos.to_bits();
        let mut forward = self.forward;
        let mut done = false;
        accumulate(mix, ramp, gain, || {
            if done {
                return None;
            }
            let idx = (pos >> 16).min(len - 1) as usize;
            let s = frames[idx] as i32;
            if forward {
                pos += inc;
                if pos >= loop_end {
                    match mode {
                        LoopMode::Forward => pos = loop_start,
                        LoopMode::PingPong | LoopMode::Reverse => {
                            forward = false;
                            pos = last;
                        }
                        LoopMode::Off => done = true,
                    }
                }
            } else {
                pos = pos.saturating_sub(inc);
                if pos >> 16 <= start as u64 {
                    match mode {
                        LoopMode::Reverse => pos = last,
                        LoopMode::PingPong | LoopMode::Forward => {
                            forward = true;
                            pos = loop_start;
                        }
                        LoopMode::Off => done = true,
                    }
                }
            }
            Some(s)
        });
        self.pos = SamplePosFxP::from_bits(pos);
        self.forward = forward;
        self.finished = done;
        done
    }
}
