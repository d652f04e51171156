//! Scores: everything needed to drive the engine offline.  A score carries
//! its own wavetables, samples and instruments, plus a list of timed events
//! that are turned into [Command]s.

use std::path::Path;

use anyhow::{bail, Context as _};
use serde::{Deserialize, Serialize};

use chipsynth::{
    midi_note_to_centihz, Command, EnvParams, SampleData, SampleInstrument, SampleLoop, SampleZone, Stage, Synth,
    TrackerInstrument, WaveType, Wavetable,
};

const DEFAULT_TAIL_MS: u32 = 1000;

fn default_tail() -> u32 {
    DEFAULT_TAIL_MS
}

/// A pitch, either exact or as a MIDI note number
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pitch {
    /// Hundredths of a Hz
    Centihz(u32),
    /// Equal-tempered MIDI note
    Midi(u8),
}

impl Pitch {
    /// The pitch in hundredths of a Hz
    pub fn centihz(self) -> u32 {
        match self {
            Self::Centihz(c) => c,
            Self::Midi(n) => midi_note_to_centihz(n),
        }
    }
}

/// Wavetable contents at one of the supported bit depths
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableData {
    /// Signed 16 bit entries
    Bits16(Vec<i16>),
    /// Unsigned 8 bit entries, 128 is zero
    Bits8(Vec<u8>),
    /// Two unsigned 4 bit entries per byte, low nibble first
    Bits4 {
        /// Packed nibbles
        packed: Vec<u8>,
        /// Number of entries
        size: u32,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WavetableDef {
    pub id: u16,
    pub table: TableData,
}

impl WavetableDef {
    pub fn wavetable(&self) -> Wavetable<'_> {
        match &self.table {
            TableData::Bits16(d) => Wavetable::new_16(d),
            TableData::Bits8(d) => Wavetable::new_8(d),
            TableData::Bits4 { packed, size } => Wavetable::new_4(packed, *size),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SampleDef {
    pub id: u16,
    pub sample_rate: u32,
    pub root: Pitch,
    pub data: Vec<i16>,
}

impl SampleDef {
    pub fn sample(&self) -> SampleData<'_> {
        SampleData::new(&self.data, self.sample_rate, self.root.centihz())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackerDef {
    #[serde(default)]
    pub attack: Vec<Stage>,
    #[serde(default)]
    pub attack_speed_ms: u16,
    pub sustain: Stage,
    #[serde(default)]
    pub release: Vec<Stage>,
    #[serde(default)]
    pub release_speed_ms: u16,
    #[serde(default)]
    pub smooth_morph: bool,
}

impl TrackerDef {
    pub fn instrument(&self) -> TrackerInstrument<'_> {
        TrackerInstrument {
            attack: &self.attack,
            attack_speed_ms: self.attack_speed_ms,
            sustain: self.sustain,
            release: &self.release,
            release_speed_ms: self.release_speed_ms,
            smooth_morph: self.smooth_morph,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SampleInstrumentDef {
    pub zones: Vec<SampleZone>,
    #[serde(default)]
    pub looping: SampleLoop,
}

impl SampleInstrumentDef {
    pub fn instrument(&self) -> SampleInstrument<'_> {
        SampleInstrument {
            zones: &self.zones,
            loop_mode: self.looping.mode,
            loop_start: self.looping.start,
            loop_end: self.looping.end,
        }
    }
}

/// What an event does to its voice
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    NoteOn {
        pitch: Pitch,
        volume: u8,
    },
    NoteOff,
    Frequency {
        pitch: Pitch,
    },
    Volume {
        volume: u8,
    },
    Wave {
        wave: WaveType,
    },
    PulseWidth {
        width: u8,
    },
    Envelope {
        params: EnvParams,
    },
    /// Rate and depth in hundredths of a Hz
    Vibrato {
        rate: u32,
        depth: u32,
    },
    /// Rate in hundredths of a Hz
    Tremolo {
        rate: u32,
        depth: u16,
    },
    Wavetable {
        id: u16,
    },
    Sample {
        id: u16,
        #[serde(default)]
        looping: SampleLoop,
    },
    SampleLoop {
        looping: SampleLoop,
    },
    /// Index into the score's tracker instruments
    Tracker {
        instrument: usize,
    },
    /// Index into the score's sample instruments
    Samples {
        instrument: usize,
    },
    Detach {
        wave: WaveType,
    },
    Arpeggio {
        speed_ms: u16,
        notes: Vec<Pitch>,
    },
    StopArpeggio,
    Slide {
        from: Pitch,
        to: Pitch,
        ms: u32,
    },
    SlideTo {
        to: Pitch,
        ms: u32,
    },
    ControlRate {
        hz: u16,
    },
    MasterVolume {
        volume: u8,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub at_ms: u32,
    #[serde(default)]
    pub voice: usize,
    pub action: Action,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Score {
    #[serde(default)]
    pub wavetables: Vec<WavetableDef>,
    #[serde(default)]
    pub samples: Vec<SampleDef>,
    #[serde(default)]
    pub trackers: Vec<TrackerDef>,
    #[serde(default)]
    pub sample_instruments: Vec<SampleInstrumentDef>,
    pub events: Vec<Event>,
    /// Silence rendered after the last event
    #[serde(default = "default_tail")]
    pub tail_ms: u32,
}

/// The instruments of a score, borrowed from it
pub struct Bank<'a> {
    trackers: Vec<TrackerInstrument<'a>>,
    sample_instruments: Vec<SampleInstrument<'a>>,
}

impl<'a> Bank<'a> {
    pub fn new(score: &'a Score) -> Self {
        Self {
            trackers: score.trackers.iter().map(TrackerDef::instrument).collect(),
            sample_instruments: score.sample_instruments.iter().map(SampleInstrumentDef::instrument).collect(),
        }
    }
}

/// A command and the output sample it takes effect at
#[derive(Clone, Debug)]
pub struct Timed<'a> {
    pub at: u64,
    pub cmd: Command<'a>,
}

impl Score {
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let score: Self = serde_json::from_str(text)?;
        log::debug!(
            "score: {} wavetables, {} samples, {} instruments, {} events",
            score.wavetables.len(),
            score.samples.len(),
            score.trackers.len() + score.sample_instruments.len(),
            score.events.len()
        );
        Ok(score)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Length of the rendering, including the tail
    pub fn duration_ms(&self) -> u32 {
        let last = self.events.iter().map(|e| e.at_ms).max().unwrap_or(0);
        last.saturating_add(self.tail_ms)
    }

    /// Register the score's wavetables and samples
    pub fn register<'a, const VOICES: usize>(&'a self, synth: &mut Synth<'a, VOICES>) -> anyhow::Result<()> {
        for def in &self.wavetables {
            synth
                .register_wavetable(def.id, def.wavetable())
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("wavetable {}", def.id))?;
        }
        for def in &self.samples {
            synth
                .register_sample(def.id, def.sample())
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("sample {}", def.id))?;
        }
        Ok(())
    }

    /// Convert the events into commands, in time order
    pub fn schedule<'a>(&self, bank: &'a Bank<'a>, sample_rate: u32) -> anyhow::Result<Vec<Timed<'a>>> {
        let mut timed = Vec::with_capacity(self.events.len());
        for (n, event) in self.events.iter().enumerate() {
            let cmd = command(event, bank).with_context(|| format!("event {} at {}ms", n, event.at_ms))?;
            timed.push(Timed {
                at: event.at_ms as u64 * sample_rate as u64 / 1000,
                cmd,
            });
        }
        timed.sort_by_key(|t| t.at);
        Ok(timed)
    }
}

fn command<'a>(event: &Event, bank: &'a Bank<'a>) -> anyhow::Result<Command<'a>> {
    let voice = event.voice;
    let cmd = match &event.action {
        Action::NoteOn { pitch, volume } => Command::NoteOn {
            voice,
            centihz: pitch.centihz(),
            volume: *volume,
        },
        Action::NoteOff => Command::NoteOff { voice },
        Action::Frequency { pitch } => Command::SetFrequency {
            voice,
            centihz: pitch.centihz(),
        },
        Action::Volume { volume } => Command::SetVolume { voice, volume: *volume },
        Action::Wave { wave } => Command::SetWave { voice, wave: *wave },
        Action::PulseWidth { width } => Command::SetPulseWidth { voice, width: *width },
        Action::Envelope { params } => Command::SetEnvelope { voice, params: *params },
        Action::Vibrato { rate, depth } => Command::SetVibrato {
            voice,
            rate_centihz: *rate,
            depth_centihz: *depth,
        },
        Action::Tremolo { rate, depth } => Command::SetTremolo {
            voice,
            rate_centihz: *rate,
            depth: *depth,
        },
        Action::Wavetable { id } => Command::SetWavetable { voice, id: *id },
        Action::Sample { id, looping } => Command::SetSample {
            voice,
            id: *id,
            looping: *looping,
        },
        Action::SampleLoop { looping } => Command::SetSampleLoop {
            voice,
            looping: *looping,
        },
        Action::Tracker { instrument } => match bank.trackers.get(*instrument) {
            Some(inst) => Command::BindTracker {
                voice,
                instrument: inst,
            },
            None => bail!("no tracker instrument {}", instrument),
        },
        Action::Samples { instrument } => match bank.sample_instruments.get(*instrument) {
            Some(inst) => Command::BindSamples {
                voice,
                instrument: inst,
            },
            None => bail!("no sample instrument {}", instrument),
        },
        Action::Detach { wave } => Command::Detach { voice, wave: *wave },
        Action::Arpeggio { speed_ms, notes } => {
            if notes.len() > chipsynth::MAX_ARP_NOTES {
                log::warn!("arpeggio on voice {} truncated to {} notes", voice, chipsynth::MAX_ARP_NOTES);
            }
            let notes: Vec<u32> = notes.iter().map(|p| p.centihz()).collect();
            Command::arpeggio(voice, *speed_ms, &notes)
        }
        Action::StopArpeggio => Command::DetachArpeggio { voice },
        Action::Slide { from, to, ms } => Command::Slide {
            voice,
            from_centihz: from.centihz(),
            to_centihz: to.centihz(),
            ms: *ms,
        },
        Action::SlideTo { to, ms } => Command::SlideTo {
            voice,
            to_centihz: to.centihz(),
            ms: *ms,
        },
        Action::ControlRate { hz } => Command::SetControlRate(*hz),
        Action::MasterVolume { volume } => Command::SetMasterVolume(*volume),
    };
    Ok(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chipsynth::{Context, LoopMode};

    const SCORE: &str = r#"{
        "wavetables": [
            { "id": 3, "table": { "bits8": [128, 255, 128, 0] } },
            { "id": 4, "table": { "bits4": { "packed": [135, 15], "size": 4 } } }
        ],
        "samples": [
            { "id": 1, "sample_rate": 24000, "root": { "midi": 60 }, "data": [0, 1000, 2000, 1000] }
        ],
        "trackers": [
            { "attack": [{ "volume": 255, "wave": -5 }], "attack_speed_ms": 20,
              "sustain": { "volume": 100, "wave": 3 } }
        ],
        "sample_instruments": [
            { "zones": [{ "low_centihz": 0, "high_centihz": 100000, "sample_id": 1, "root_override": null }],
              "looping": { "mode": "Forward" } }
        ],
        "events": [
            { "at_ms": 500, "voice": 1, "action": { "op": "note_off" } },
            { "at_ms": 0, "voice": 1, "action": { "op": "tracker", "instrument": 0 } },
            { "at_ms": 0, "voice": 1, "action": { "op": "note_on", "pitch": { "centihz": 44000 }, "volume": 200 } },
            { "at_ms": 10, "action": { "op": "envelope", "params": { "release_ms": 50 } } },
            { "at_ms": 20, "voice": 2, "action": { "op": "arpeggio", "speed_ms": 30,
              "notes": [{ "midi": 60 }, { "midi": 64 }, { "centihz": 39200 }] } }
        ],
        "tail_ms": 250
    }"#;

    #[test]
    fn parse_score() {
        let score = Score::from_json(SCORE).unwrap();
        assert_eq!(score.duration_ms(), 750);
        assert_eq!(score.wavetables[1].wavetable().size(), 4);
        assert_eq!(score.samples[0].sample().root_centihz, midi_note_to_centihz(60));
        assert_eq!(score.sample_instruments[0].looping.mode, LoopMode::Forward);
        let Action::Envelope { params } = &score.events[3].action else {
            panic!("expected an envelope event");
        };
        assert_eq!(params.release_ms, 50);
        assert_eq!(params.sustain, 255);
    }
    #[test]
    fn schedule_sorts_and_converts() {
        let score = Score::from_json(SCORE).unwrap();
        let bank = Bank::new(&score);
        let timed = score.schedule(&bank, 48000).unwrap();
        let at: Vec<u64> = timed.iter().map(|t| t.at).collect();
        assert_eq!(at, [0, 0, 480, 960, 24000]);
        assert!(matches!(timed[0].cmd, Command::BindTracker { voice: 1, .. }));
        assert!(matches!(timed[4].cmd, Command::NoteOff { voice: 1 }));
        let Command::SetArpeggio { ref notes, .. } = timed[3].cmd else {
            panic!("expected an arpeggio");
        };
        assert_eq!(notes[2], 39200);
    }
    #[test]
    fn bad_instrument_index() {
        let mut score = Score::from_json(SCORE).unwrap();
        score.events.push(Event {
            at_ms: 0,
            voice: 0,
            action: Action::Samples { instrument: 9 },
        });
        let bank = Bank::new(&score);
        let err = score.schedule(&bank, 48000).unwrap_err();
        assert!(format!("{:#}", err).contains("no sample instrument 9"));
    }
    #[test]
    fn register_into_synth() {
        let score = Score::from_json(SCORE).unwrap();
        let mut synth = Synth::<2>::with_seed(Context::new_480(), 0);
        score.register(&mut synth).unwrap();
        assert!(synth.registry().wavetable(3).is_some());
        assert!(synth.registry().sample(1).is_some());

        let mut bad = score.clone();
        bad.samples[0].id = 500;
        let mut synth = Synth::<2>::with_seed(Context::new_480(), 0);
        assert!(bad.register(&mut synth).is_err());
    }
}
