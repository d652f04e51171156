//! Deferred mutations of a [Synth].
//!
//! A [Command] carries one call of the control surface by value, so it can
//! sit in a queue between whatever produces musical events (a sequencer
//! task, a MIDI handler, a score reader) and the audio driver, which applies
//! pending commands between blocks.

use arrayvec::ArrayVec;

use crate::devices::EnvParams;
use crate::instrument::{SampleInstrument, TrackerInstrument};
use crate::synth::Synth;
use crate::voice::{SampleLoop, WaveType};
use crate::MAX_ARP_NOTES;

/// One control-surface operation addressed to a voice (or, for the global
/// settings, to the whole engine)
#[derive(Clone, Debug)]
pub enum Command<'a> {
    /// Start a note (frequency in hundredths of a Hz)
    NoteOn {
        /// Target voice
        voice: usize,
        /// Pitch
        centihz: u32,
        /// Volume
        volume: u8,
    },
    /// Release a note
    NoteOff {
        /// Target voice
        voice: usize,
    },
    /// Change pitch without retriggering
    SetFrequency {
        /// Target voice
        voice: usize,
        /// Pitch
        centihz: u32,
    },
    /// Change volume
    SetVolume {
        /// Target voice
        voice: usize,
        /// Volume
        volume: u8,
    },
    /// Change waveform
    SetWave {
        /// Target voice
        voice: usize,
        /// Waveform
        wave: WaveType,
    },
    /// Change pulse width (128 is square)
    SetPulseWidth {
        /// Target voice
        voice: usize,
        /// Width
        width: u8,
    },
    /// Replace the envelope parameters
    SetEnvelope {
        /// Target voice
        voice: usize,
        /// Parameters
        params: EnvParams,
    },
    /// Set vibrato
    SetVibrato {
        /// Target voice
        voice: usize,
        /// LFO rate in hundredths of a Hz
        rate_centihz: u32,
        /// Depth in hundredths of a Hz
        depth_centihz: u32,
    },
    /// Set tremolo
    SetTremolo {
        /// Target voice
        voice: usize,
        /// LFO rate in hundredths of a Hz
        rate_centihz: u32,
        /// Depth
        depth: u16,
    },
    /// Select a registered wavetable
    SetWavetable {
        /// Target voice
        voice: usize,
        /// Wavetable ID
        id: u16,
    },
    /// Play a registered sample directly
    SetSample {
        /// Target voice
        voice: usize,
        /// Sample ID
        id: u16,
        /// Loop settings
        looping: SampleLoop,
    },
    /// Change the sample loop
    SetSampleLoop {
        /// Target voice
        voice: usize,
        /// Loop settings
        looping: SampleLoop,
    },
    /// Bind a tracker instrument
    BindTracker {
        /// Target voice
        voice: usize,
        /// Instrument
        instrument: &'a TrackerInstrument<'a>,
    },
    /// Bind a multi-sample instrument
    BindSamples {
        /// Target voice
        voice: usize,
        /// Instrument
        instrument: &'a SampleInstrument<'a>,
    },
    /// Drop the instrument and return to a plain oscillator
    Detach {
        /// Target voice
        voice: usize,
        /// Waveform to fall back to
        wave: WaveType,
    },
    /// Start arpeggiating
    SetArpeggio {
        /// Target voice
        voice: usize,
        /// Time per note
        speed_ms: u16,
        /// Frequencies in hundredths of a Hz
        notes: ArrayVec<u32, MAX_ARP_NOTES>,
    },
    /// Stop arpeggiating
    DetachArpeggio {
        /// Target voice
        voice: usize,
    },
    /// Jump to one pitch and glide to another
    Slide {
        /// Target voice
        voice: usize,
        /// Starting pitch
        from_centihz: u32,
        /// Final pitch
        to_centihz: u32,
        /// Glide time
        ms: u32,
    },
    /// Glide from the current pitch
    SlideTo {
        /// Target voice
        voice: usize,
        /// Final pitch
        to_centihz: u32,
        /// Glide time
        ms: u32,
    },
    /// Change the control rate
    SetControlRate(u16),
    /// Change the master volume
    SetMasterVolume(u8),
}

impl<'a> Command<'a> {
    /// The voice this command addresses, if any
    pub fn voice(&self) -> Option<usize> {
        match *self {
            Self::NoteOn { voice, .. }
            | Self::NoteOff { voice }
            | Self::SetFrequency { voice, .. }
            | Self::SetVolume { voice, .. }
            | Self::SetWave { voice, .. }
            | Self::SetPulseWidth { voice, .. }
            | Self::SetEnvelope { voice, .. }
            | Self::SetVibrato { voice, .. }
            | Self::SetTremolo { voice, .. }
            | Self::SetWavetable { voice, .. }
            | Self::SetSample { voice, .. }
            | Self::SetSampleLoop { voice, .. }
            | Self::BindTracker { voice, .. }
            | Self::BindSamples { voice, .. }
            | Self::Detach { voice, .. }
            | Self::SetArpeggio { voice, .. }
            | Self::DetachArpeggio { voice }
            | Self::Slide { voice, .. }
            | Self::SlideTo { voice, .. } => Some(voice),
            Self::SetControlRate(_) | Self::SetMasterVolume(_) => None,
        }
    }

    /// Build an arpeggio command, keeping at most [MAX_ARP_NOTES] notes
    pub fn arpeggio(voice: usize, speed_ms: u16, notes: &[u32]) -> Self {
        let notes = notes.iter().copied().take(MAX_ARP_NOTES).collect();
        Self::SetArpeggio {
            voice,
            speed_ms,
            notes,
        }
    }
}

impl<'a, const VOICES: usize> Synth<'a, VOICES> {
    /// Apply a queued command
    pub fn apply(&mut self, cmd: &Command<'a>) {
        match *cmd {
            Command::NoteOn {
                voice,
                centihz,
                volume,
            } => self.note_on(voice, centihz, volume),
            Command::NoteOff { voice } => self.note_off(voice),
            Command::SetFrequency { voice, centihz } => self.set_frequency(voice, centihz),
            Command::SetVolume { voice, volume } => self.set_volume(voice, volume),
            Command::SetWave { voice, wave } => self.set_wave(voice, wave),
            Command::SetPulseWidth { voice, width } => self.set_pulse_width(voice, width),
            Command::SetEnvelope { voice, params } => self.set_env(voice, params),
            Command::SetVibrato {
                voice,
                rate_centihz,
                depth_centihz,
            } => self.set_vibrato(voice, rate_centihz, depth_centihz),
            Command::SetTremolo {
                voice,
                rate_centihz,
                depth,
            } => self.set_tremolo(voice, rate_centihz, depth),
            Command::SetWavetable { voice, id } => self.set_wavetable_id(voice, id),
            Command::SetSample { voice, id, looping } => self.set_sample(voice, id, looping),
            Command::SetSampleLoop { voice, looping } => self.set_sample_loop(voice, looping),
            Command::BindTracker { voice, instrument } => self.set_tracker_instrument(voice, Some(instrument)),
            Command::BindSamples { voice, instrument } => self.set_sample_instrument(voice, Some(instrument)),
            Command::Detach { voice, wave } => self.detach_instrument(voice, wave),
            Command::SetArpeggio {
                voice,
                speed_ms,
                ref notes,
            } => self.set_arpeggio(voice, speed_ms, notes),
            Command::DetachArpeggio { voice } => self.detach_arpeggio(voice),
            Command::Slide {
                voice,
                from_centihz,
                to_centihz,
                ms,
            } => self.slide(voice, from_centihz, to_centihz, ms),
            Command::SlideTo {
                voice,
                to_centihz,
                ms,
            } => self.slide_to(voice, to_centihz, ms),
            Command::SetControlRate(hz) => self.set_control_rate(hz),
            Command::SetMasterVolume(vol) => self.set_master_volume(vol),
        }
    }

    /// Apply every command from an iterator, in order
    pub fn apply_all<'c, I>(&mut self, cmds: I)
    where
        I: IntoIterator<Item = &'c Command<'a>>,
        'a: 'c,
    {
        for cmd in cmds {
            self.apply(cmd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::instrument::Stage;

    #[test]
    fn voice_addressing() {
        assert_eq!(Command::NoteOff { voice: 3 }.voice(), Some(3));
        assert_eq!(Command::SetMasterVolume(3).voice(), None);
    }
    #[test]
    fn arpeggio_truncates() {
        let notes: Vec<u32> = (0..40).collect();
        let Command::SetArpeggio { notes, .. } = Command::arpeggio(0, 10, &notes) else {
            panic!("expected an arpeggio");
        };
        assert_eq!(notes.len(), MAX_ARP_NOTES);
    }
    #[test]
    fn apply_matches_direct_calls() {
        static INST: TrackerInstrument = TrackerInstrument::held(Stage::new(99, 2));
        let cmds = [
            Command::SetMasterVolume(100),
            Command::SetControlRate(50),
            Command::BindTracker {
                voice: 1,
                instrument: &INST,
            },
            Command::NoteOn {
                voice: 1,
                centihz: 44000,
                volume: 1,
            },
            Command::NoteOn {
                voice: 0,
                centihz: 22000,
                volume: 50,
            },
            Command::SetVolume { voice: 0, volume: 70 },
            Command::arpeggio(0, 20, &[100, 200]),
            Command::NoteOn {
                voice: 9,
                centihz: 1,
                volume: 1,
            },
        ];
        let mut queued = Synth::<4>::with_seed(Context::new_480(), 5);
        queued.apply_all(cmds.iter());

        let mut direct = Synth::<4>::with_seed(Context::new_480(), 5);
        direct.set_master_volume(100);
        direct.set_control_rate(50);
        direct.set_tracker_instrument(1, Some(&INST));
        direct.note_on(1, 44000, 1);
        direct.note_on(0, 22000, 50);
        direct.set_volume(0, 70);
        direct.set_arpeggio(0, 20, &[100, 200]);

        assert_eq!(queued.master_volume(), 100);
        assert_eq!(queued.control_rate(), 50);
        assert_eq!(queued.volume(1), 99);
        assert_eq!(queued.volume(0), 70);
        let mut a = [0i16; 1500];
        let mut b = [0i16; 1500];
        queued.render(&mut a);
        direct.render(&mut b);
        assert_eq!(a, b);
        assert_eq!(queued.frequency(0), direct.frequency(0));
    }
}
