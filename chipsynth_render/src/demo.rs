//! The score played when none is given: two bars that touch every part of
//! the engine (tracker instruments, a looped multi-sample bass, noise,
//! arpeggios, glides, vibrato and tremolo).

use std::f32::consts::TAU;

use chipsynth::instrument::{W_NOISE, W_PULSE, W_SINE, W_TRI};
use chipsynth::{EnvParams, LoopMode, SampleLoop, SampleZone, Stage, WaveType};

use crate::score::{Action, Event, Pitch, SampleDef, SampleInstrumentDef, Score, TableData, TrackerDef, WavetableDef};

const STEP_MS: u32 = 125;

const LEAD: usize = 0;
const BASS: usize = 1;
const HAT: usize = 2;
const KICK: usize = 3;
const ARP: usize = 4;
const PAD: usize = 5;
const BELL: usize = 6;

// sample loop points fall on whole periods of the root pitch
const PLUCK_RATE: u32 = 24000;
const PLUCK_PERIOD: usize = 192;
const PLUCK_LEN: usize = PLUCK_PERIOD * 64;

fn organ() -> Vec<u8> {
    (0..32)
        .map(|i| {
            let x = i as f32 * TAU / 32.0;
            let v = (x.sin() + 0.5 * (2.0 * x).sin() + 0.25 * (3.0 * x).sin()) / 1.5;
            (v.clamp(-1.0, 1.0) * 127.0 + 128.0) as u8
        })
        .collect()
}

fn buzz() -> Vec<u8> {
    (0..16u8).map(|i| (i & 0x0F) | ((15 - i) << 4)).collect()
}

fn soft_square() -> Vec<i16> {
    (0..256)
        .map(|i| {
            let x = i as f32 * TAU / 256.0;
            ((4.0 * x.sin()).tanh() * 30000.0) as i16
        })
        .collect()
}

fn pluck() -> Vec<i16> {
    (0..PLUCK_LEN)
        .map(|n| {
            let t = n as f32 / PLUCK_RATE as f32;
            let x = n as f32 * TAU / PLUCK_PERIOD as f32;
            let bright = (-t * 12.0).exp();
            let v = 0.5 * x.sin() + bright * (0.3 * (2.0 * x).sin() + 0.2 * (3.0 * x).sin());
            (v * 28000.0) as i16
        })
        .collect()
}

fn at(step: u32, voice: usize, action: Action) -> Event {
    Event {
        at_ms: step * STEP_MS,
        voice,
        action,
    }
}

fn note(step: u32, voice: usize, midi: u8, volume: u8) -> Event {
    at(
        step,
        voice,
        Action::NoteOn {
            pitch: Pitch::Midi(midi),
            volume,
        },
    )
}

fn off(step: u32, voice: usize) -> Event {
    at(step, voice, Action::NoteOff)
}

pub fn score() -> Score {
    let mut events = vec![
        at(0, 0, Action::MasterVolume { volume: 200 }),
        at(0, LEAD, Action::Tracker { instrument: 0 }),
        at(0, BASS, Action::Samples { instrument: 0 }),
        at(0, HAT, Action::Tracker { instrument: 1 }),
        at(0, KICK, Action::Tracker { instrument: 2 }),
        at(0, ARP, Action::Wave { wave: WaveType::Saw }),
        at(
            0,
            ARP,
            Action::Envelope {
                params: EnvParams {
                    attack_ms: 5,
                    decay_ms: 200,
                    sustain: 120,
                    release_ms: 300,
                },
            },
        ),
        at(0, PAD, Action::Wavetable { id: 2 }),
        at(
            0,
            PAD,
            Action::Envelope {
                params: EnvParams {
                    attack_ms: 600,
                    decay_ms: 0,
                    sustain: 255,
                    release_ms: 800,
                },
            },
        ),
        at(0, PAD, Action::Tremolo { rate: 400, depth: 6000 }),
        at(0, BELL, Action::Wave { wave: WaveType::Pulse }),
        at(0, BELL, Action::Vibrato { rate: 550, depth: 400 }),
        at(
            0,
            BELL,
            Action::Envelope {
                params: EnvParams {
                    attack_ms: 2,
                    decay_ms: 400,
                    sustain: 60,
                    release_ms: 200,
                },
            },
        ),
    ];

    for (i, midi) in [72u8, 74, 76, 79, 76, 74, 72, 67, 69, 72, 74, 76, 74, 72, 69, 72].into_iter().enumerate() {
        let step = i as u32 * 2;
        events.push(note(step, LEAD, midi, 220));
        events.push(off(step + 1, LEAD));
    }
    for (i, midi) in [36u8, 36, 43, 41, 33, 33, 40, 43].into_iter().enumerate() {
        let step = i as u32 * 4;
        events.push(note(step, BASS, midi, 255));
        events.push(off(step + 3, BASS));
    }
    for step in (0..32).step_by(2) {
        events.push(at(
            step,
            HAT,
            Action::NoteOn {
                pitch: Pitch::Centihz(800_000),
                volume: if step % 4 == 0 { 255 } else { 160 },
            },
        ));
    }
    for step in (0..32).step_by(4) {
        events.push(note(step, KICK, 40, 255));
        events.push(at(
            step,
            KICK,
            Action::Slide {
                from: Pitch::Midi(52),
                to: Pitch::Midi(28),
                ms: 80,
            },
        ));
        events.push(off(step + 1, KICK));
    }

    let chord = |notes: &[u8]| notes.iter().map(|&n| Pitch::Midi(n)).collect();
    events.extend([
        at(
            0,
            ARP,
            Action::Arpeggio {
                speed_ms: 62,
                notes: chord(&[60, 64, 67, 72]),
            },
        ),
        note(0, ARP, 60, 120),
        off(15, ARP),
        at(
            16,
            ARP,
            Action::Arpeggio {
                speed_ms: 62,
                notes: chord(&[57, 60, 64, 69]),
            },
        ),
        note(16, ARP, 57, 120),
        off(31, ARP),
        at(32, ARP, Action::StopArpeggio),
    ]);

    events.extend([
        note(0, PAD, 55, 150),
        at(
            16,
            PAD,
            Action::SlideTo {
                to: Pitch::Midi(60),
                ms: 1000,
            },
        ),
        off(28, PAD),
    ]);

    events.push(note(8, BELL, 79, 90));
    for (i, step) in (8..24).enumerate() {
        let width = 32 + (i as u32 * 12) as u8;
        events.push(at(step, BELL, Action::PulseWidth { width }));
    }
    events.push(off(24, BELL));

    Score {
        wavetables: vec![
            WavetableDef {
                id: 0,
                table: TableData::Bits8(organ()),
            },
            WavetableDef {
                id: 1,
                table: TableData::Bits4 {
                    packed: buzz(),
                    size: 32,
                },
            },
            WavetableDef {
                id: 2,
                table: TableData::Bits16(soft_square()),
            },
        ],
        samples: vec![SampleDef {
            id: 0,
            sample_rate: PLUCK_RATE,
            root: Pitch::Centihz((PLUCK_RATE * 100) / PLUCK_PERIOD as u32),
            data: pluck(),
        }],
        trackers: vec![
            TrackerDef {
                attack: vec![Stage::new(255, W_PULSE), Stage::new(230, 0), Stage::new(210, 0)],
                attack_speed_ms: 40,
                sustain: Stage::new(190, 0),
                release: vec![Stage::new(140, 0), Stage::new(90, 1), Stage::new(40, 1)],
                release_speed_ms: 60,
                smooth_morph: true,
            },
            TrackerDef {
                attack: vec![Stage::new(200, W_NOISE), Stage::new(90, W_NOISE), Stage::new(30, W_NOISE)],
                attack_speed_ms: 15,
                sustain: Stage::new(0, W_NOISE),
                release: Vec::new(),
                release_speed_ms: 0,
                smooth_morph: false,
            },
            TrackerDef {
                attack: vec![Stage::new(255, W_SINE), Stage::new(200, W_TRI), Stage::new(120, W_SINE)],
                attack_speed_ms: 20,
                sustain: Stage::new(0, W_SINE),
                release: Vec::new(),
                release_speed_ms: 0,
                smooth_morph: false,
            },
        ],
        sample_instruments: vec![SampleInstrumentDef {
            zones: vec![SampleZone {
                low_centihz: 0,
                high_centihz: u32::MAX,
                sample_id: 0,
                root_override: None,
            }],
            looping: SampleLoop {
                mode: LoopMode::Forward,
                start: (PLUCK_PERIOD * 32) as u32,
                end: PLUCK_LEN as u32,
            },
        }],
        events,
        tail_ms: 1000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::play;
    use crate::score::Bank;
    use chipsynth::{Context, OutputSink, Synth};

    struct Peak(i32, usize);

    impl OutputSink<i16> for Peak {
        type Error = std::convert::Infallible;
        fn write(&mut self, frames: &[i16]) -> Result<(), Self::Error> {
            self.0 = frames.iter().fold(self.0, |p, &s| p.max((s as i32).abs()));
            self.1 += frames.len();
            Ok(())
        }
    }

    #[test]
    fn tables_are_in_range() {
        assert_eq!(organ().len(), 32);
        assert_eq!(buzz().len(), 16);
        let pluck = pluck();
        // the loop joins up
        let start = PLUCK_PERIOD * 32;
        assert!((pluck[start] as i32 - pluck[0] as i32).abs() < 2000);
        assert!(pluck[PLUCK_LEN - 1] < 1000);
    }
    #[test]
    fn demo_survives_json() {
        let demo = score();
        let text = serde_json::to_string(&demo).unwrap();
        let back = Score::from_json(&text).unwrap();
        assert_eq!(back.events.len(), demo.events.len());
        assert_eq!(back.duration_ms(), 5000);
    }
    #[test]
    fn demo_renders() {
        let demo = score();
        let ctx = Context::new_441();
        let bank = Bank::new(&demo);
        let mut synth: Synth = Synth::with_seed(ctx, 1);
        demo.register(&mut synth).unwrap();
        let schedule = demo.schedule(&bank, ctx.sample_rate()).unwrap();
        let total = demo.duration_ms() as u64 * ctx.sample_rate() as u64 / 1000;
        let mut sink = Peak(0, 0);
        play::<i16, Peak, { chipsynth::MAX_VOICES }>(&mut synth, &schedule, total, 256, &mut sink).unwrap();
        assert_eq!(sink.1 as u64, total);
        assert!(sink.0 > 1000);
        // everything but the hats (never released) has finished by the end
        assert!((0..7).filter(|&v| v != HAT).all(|v| !synth.is_voice_active(v)));
        assert!(synth.is_voice_active(HAT));
    }
}
