//! Instrument descriptors that can be bound to a voice.
//!
//! A [TrackerInstrument] drives the voice's volume and waveform from short
//! per-tick sequences, the way a tracker "instrument macro" does.  A
//! [SampleInstrument] maps pitch ranges onto registered samples.  Both are
//! borrowed, caller-owned data: binding one to a voice stores a reference.

use crate::voice::{LoopMode, WaveType};

/// Waveform code selecting the built-in sine
pub const W_SINE: i16 = -1;
/// Waveform code selecting the built-in triangle
pub const W_TRI: i16 = -2;
/// Waveform code selecting the built-in sawtooth
pub const W_SAW: i16 = -3;
/// Waveform code selecting the built-in pulse
pub const W_PULSE: i16 = -4;
/// Waveform code selecting noise
pub const W_NOISE: i16 = -5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// A decoded tracker waveform code
pub enum WaveSelect {
    /// One of the built-in generators
    Basic(WaveType),
    /// A registered wavetable ID
    Wavetable(u16),
}

impl WaveSelect {
    /// Decode a waveform code.  Non-negative codes are wavetable IDs; unknown
    /// negative codes fall back to a sine.
    pub const fn decode(code: i16) -> Self {
        match code {
            W_TRI => Self::Basic(WaveType::Triangle),
            W_SAW => Self::Basic(WaveType::Saw),
            W_PULSE => Self::Basic(WaveType::Pulse),
            W_NOISE => Self::Basic(WaveType::Noise),
            c if c >= 0 => Self::Wavetable(c as u16),
            _ => Self::Basic(WaveType::Sine),
        }
    }
    /// True if this selects the noise generator
    pub const fn is_noise(&self) -> bool {
        matches!(self, Self::Basic(WaveType::Noise))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// One step of a tracker sequence
pub struct Stage {
    /// Voice volume while this stage is current
    pub volume: u8,
    /// Waveform code (see [WaveSelect::decode])
    pub wave: i16,
}

impl Stage {
    /// Create a new stage
    pub const fn new(volume: u8, wave: i16) -> Self {
        Self { volume, wave }
    }
}

#[derive(Clone, Copy, Debug)]
/// A tracker-style instrument: a one-shot attack sequence, a held sustain
/// stage, and a one-shot release sequence.
pub struct TrackerInstrument<'a> {
    /// Stages played in order after note-on
    pub attack: &'a [Stage],
    /// How long each attack stage lasts, in milliseconds
    pub attack_speed_ms: u16,
    /// Held once the attack sequence is exhausted
    pub sustain: Stage,
    /// Stages played in order after note-off
    pub release: &'a [Stage],
    /// How long each release stage lasts, in milliseconds
    pub release_speed_ms: u16,
    /// Crossfade from each stage's waveform into the next one's
    pub smooth_morph: bool,
}

impl<'a> TrackerInstrument<'a> {
    /// An instrument that holds a single stage with no attack or release
    pub const fn held(sustain: Stage) -> Self {
        Self {
            attack: &[],
            attack_speed_ms: 0,
            sustain,
            release: &[],
            release_speed_ms: 0,
            smooth_morph: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// A pitch range mapped onto a registered sample
pub struct SampleZone {
    /// Lowest matching frequency, in hundredths of a Hz (inclusive)
    pub low_centihz: u32,
    /// Highest matching frequency, in hundredths of a Hz (inclusive)
    pub high_centihz: u32,
    /// Registered sample ID to play
    pub sample_id: u16,
    /// Replaces the sample's own root pitch when set
    pub root_override: Option<u32>,
}

impl SampleZone {
    /// True if `centihz` falls inside this zone
    pub const fn contains(&self, centihz: u32) -> bool {
        centihz >= self.low_centihz && centihz <= self.high_centihz
    }
}

#[derive(Clone, Copy, Debug)]
/// A multi-sampled instrument
pub struct SampleInstrument<'a> {
    /// Zones, searched in order; the first match wins
    pub zones: &'a [SampleZone],
    /// Loop behaviour applied to whichever sample is selected
    pub loop_mode: LoopMode,
    /// Loop start, in frames
    pub loop_start: u32,
    /// Loop end, in frames (0 means the end of the sample)
    pub loop_end: u32,
}

impl<'a> SampleInstrument<'a> {
    /// The first zone containing `centihz`
    pub fn zone_for(&self, centihz: u32) -> Option<&SampleZone> {
        self.zones.iter().find(|z| z.contains(centihz))
    }
}

#[derive(Clone, Copy, Debug, Default)]
/// What (if anything) is driving a voice besides its own settings.  A voice
/// can be bound to at most one instrument at a time.
pub enum Binding<'a> {
    /// A plain oscillator voice
    #[default]
    None,
    /// Volume and waveform are sequenced by a tracker instrument
    Tracker(&'a TrackerInstrument<'a>),
    /// Note-on selects a sample by pitch
    Sample(&'a SampleInstrument<'a>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wave_codes() {
        assert_eq!(WaveSelect::decode(W_SINE), WaveSelect::Basic(WaveType::Sine));
        assert_eq!(WaveSelect::decode(W_TRI), WaveSelect::Basic(WaveType::Triangle));
        assert_eq!(WaveSelect::decode(W_SAW), WaveSelect::Basic(WaveType::Saw));
        assert_eq!(WaveSelect::decode(W_PULSE), WaveSelect::Basic(WaveType::Pulse));
        assert!(WaveSelect::decode(W_NOISE).is_noise());
        assert_eq!(WaveSelect::decode(0), WaveSelect::Wavetable(0));
        assert_eq!(WaveSelect::decode(999), WaveSelect::Wavetable(999));
        assert_eq!(WaveSelect::decode(-100), WaveSelect::Basic(WaveType::Sine));
    }
    #[test]
    fn zone_lookup() {
        let zones = [
            SampleZone {
                low_centihz: 0,
                high_centihz: 29999,
                sample_id: 1,
                root_override: None,
            },
            SampleZone {
                low_centihz: 30000,
                high_centihz: 100000,
                sample_id: 2,
                root_override: Some(44000),
            },
        ];
        let inst = SampleInstrument {
            zones: &zones,
            loop_mode: LoopMode::Off,
            loop_start: 0,
            loop_end: 0,
        };
        assert_eq!(inst.zone_for(29999).map(|z| z.sample_id), Some(1));
        assert_eq!(inst.zone_for(30000).map(|z| z.sample_id), Some(2));
        assert!(inst.zone_for(100001).is_none());
    }
}
