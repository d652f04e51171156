//! This module contains a single synthesizer voice: its oscillator state,
//! envelope, modulation sources, and (optionally) the instrument driving it.
//!
//! Voices are owned by a [crate::Synth] and mutated only through its control
//! surface; the accessors here are for inspection.

pub mod modulation;
pub mod sequencer;

use crate::context::Context;
use crate::devices::{
    sample_increment, Envelope, Noise, Oscillator, SamplePlayer, Source, DEFAULT_PULSE_WIDTH,
    ENV_MAX,
};
use crate::fixedmath::{centihz_from_increment, phase_increment};
use crate::instrument::{Binding, WaveSelect};
use crate::registry::Registry;
use crate::PhaseFxP;
use modulation::{Arpeggio, Glide, Tremolo, Vibrato};
use sequencer::{SeqStep, Sequencer, StageOutput};

pub use crate::devices::{EnvParams, EnvStage, LoopMode, SampleLoop};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// The generator a voice uses when no instrument overrides it
pub enum WaveType {
    /// Sine (the default)
    #[default]
    Sine,
    /// Triangle
    Triangle,
    /// Sawtooth
    Saw,
    /// Pulse, with adjustable width
    Pulse,
    /// The voice's assigned wavetable
    Wavetable,
    /// Pitched noise
    Noise,
    /// Sample playback
    Sample,
}

impl WaveType {
    const ELEM: [WaveType; 7] = [
        Self::Sine,
        Self::Triangle,
        Self::Saw,
        Self::Pulse,
        Self::Wavetable,
        Self::Noise,
        Self::Sample,
    ];
    /// Returns a slice to all of the possible WaveTypes
    pub const fn waves() -> &'static [WaveType] {
        &Self::ELEM
    }
    /// Provides the name of the waveform (long-format)
    pub const fn to_str(&self) -> &'static str {
        ["Sine", "Triangle", "Saw", "Pulse", "Wavetable", "Noise", "Sample"][*self as usize]
    }
    /// Provides the name of the waveform (short-format)
    ///
    /// This is a single character for the basic shapes, or a three
    /// character abbreviation otherwise
    pub const fn to_str_short(&self) -> &'static str {
        [
            crate::util::SIN_CHARSTR,
            crate::util::TRI_CHARSTR,
            crate::util::SAW_CHARSTR,
            crate::util::SQ_CHARSTR,
            "WT",
            crate::util::NOISE_CHARSTR,
            "SMP",
        ][*self as usize]
    }
}

impl TryFrom<u8> for WaveType {
    type Error = &'static str;
    fn try_from(value: u8) -> Result<Self, &'static str> {
        Self::ELEM
            .get(value as usize)
            .copied()
            .ok_or("Conversion of u8 to WaveType Overflowed")
    }
}

/// Tracker stage currently applied to a bound voice
#[derive(Clone, Copy, Debug)]
struct TrackerSound {
    wave: WaveSelect,
    next: WaveSelect,
    morph: u8,
}

/// One synthesizer voice
#[derive(Clone, Debug)]
pub struct Voice<'a> {
    pub(crate) active: bool,
    frequency: u32,
    volume: u8,
    wave: WaveType,
    pub(crate) phase: PhaseFxP,
    phase_inc: PhaseFxP,
    pub(crate) pulse_width: u32,
    wavetable: Option<crate::registry::Wavetable<'a>>,
    pub(crate) env: Envelope,
    pub(crate) sample: SamplePlayer,
    pub(crate) noise: Noise,
    vibrato: Vibrato,
    tremolo: Tremolo,
    arp: Arpeggio,
    glide: Glide,
    binding: Binding<'a>,
    sequencer: Sequencer,
    tracker: Option<TrackerSound>,
}

impl<'a> Voice<'a> {
    /// Create voice number `index` with default settings
    pub fn new(index: usize) -> Self {
        Self {
            active: false,
            frequency: 0,
            volume: 0,
            wave: WaveType::default(),
            phase: PhaseFxP::ZERO,
            phase_inc: PhaseFxP::ZERO,
            pulse_width: DEFAULT_PULSE_WIDTH,
            wavetable: None,
            env: Envelope::default(),
            sample: SamplePlayer::default(),
            noise: Noise::new(12345u32.wrapping_add((index as u32).wrapping_mul(999))),
            vibrato: Vibrato::default(),
            tremolo: Tremolo::default(),
            arp: Arpeggio::default(),
            glide: Glide::default(),
            binding: Binding::None,
            sequencer: Sequencer::default(),
            tracker: None,
        }
    }

    /// True while the voice contributes to the mix
    pub fn is_active(&self) -> bool {
        self.active
    }
    /// Current frequency, in hundredths of a Hz
    pub fn frequency(&self) -> u32 {
        self.frequency
    }
    /// Current volume
    pub fn volume(&self) -> u8 {
        self.volume
    }
    /// Nominal waveform
    pub fn wave(&self) -> WaveType {
        self.wave
    }
    /// Oscillator phase
    pub fn phase(&self) -> PhaseFxP {
        self.phase
    }
    /// Per-sample phase increment, before vibrato
    pub fn phase_increment(&self) -> PhaseFxP {
        self.phase_inc
    }
    /// The envelope
    pub fn envelope(&self) -> &Envelope {
        &self.env
    }
    /// Sample playback state
    pub fn sample_player(&self) -> &SamplePlayer {
        &self.sample
    }
    /// The arpeggiator
    pub fn arpeggio(&self) -> &Arpeggio {
        &self.arp
    }
    /// The portamento state
    pub fn glide(&self) -> &Glide {
        &self.glide
    }
    /// Current vibrato offset applied to the phase increment
    pub fn vibrato_offset(&self) -> i32 {
        self.vibrato.offset()
    }
    /// Current tremolo gain (255 is unity)
    pub fn tremolo_gain(&self) -> u8 {
        self.tremolo.gain()
    }
    /// The instrument binding
    pub fn binding(&self) -> Binding<'a> {
        self.binding
    }
    /// True if a tracker instrument drives this voice
    pub fn is_tracker_bound(&self) -> bool {
        matches!(self.binding, Binding::Tracker(_))
    }
    /// Index of the tracker stage playing, if tracker-bound
    pub fn tracker_stage(&self) -> Option<usize> {
        self.is_tracker_bound().then(|| self.sequencer.stage_index())
    }
    /// Envelope level reduced to 8 bits
    pub fn env_8bit(&self) -> u8 {
        (self.env.value().to_bits() >> 20).min(255) as u8
    }
    /// Envelope level in its native 28 bit scale
    pub fn env_raw(&self) -> u32 {
        self.env.value().to_bits()
    }
    /// Envelope times volume, reduced to 8 bits
    pub fn output_8bit(&self) -> u8 {
        (((self.env.value().to_bits() >> 20) * self.volume as u32) >> 8).min(255) as u8
    }
    /// Envelope times volume at full precision
    pub fn output_raw(&self) -> u32 {
        (self.env.value().to_bits() >> 8) * self.volume as u32
    }

    pub(crate) fn set_frequency(&mut self, centihz: u32, ctx: &Context, registry: &Registry) {
        self.frequency = centihz;
        self.phase_inc = PhaseFxP::from_bits(phase_increment(centihz, ctx.sample_rate()));
        if self.wave == WaveType::Sample {
            self.retune_sample(ctx, registry);
        }
    }

    pub(crate) fn set_volume(&mut self, volume: u8) {
        self.volume = volume;
    }

    pub(crate) fn set_wave(&mut self, wave: WaveType) {
        self.wave = wave;
    }

    pub(crate) fn set_pulse_width(&mut self, width: u8) {
        self.pulse_width = (width as u32) << 24;
    }

    pub(crate) fn set_env(&mut self, params: EnvParams, ctx: &Context) {
        self.env.set_params(params, ctx);
    }

    pub(crate) fn set_wavetable(&mut self, table: crate::registry::Wavetable<'a>) {
        self.wavetable = Some(table);
        self.wave = WaveType::Wavetable;
    }

    pub(crate) fn set_vibrato(&mut self, rate: u32, depth: u32, ctx: &Context) {
        self.vibrato.set(rate, depth, ctx.sample_rate());
    }

    pub(crate) fn set_tremolo(&mut self, rate: u32, depth: u16, ctx: &Context) {
        self.tremolo.set(rate, depth, ctx.sample_rate());
    }

    pub(crate) fn set_arpeggio(&mut self, speed_ms: u16, notes: &[u32]) {
        self.arp.set(speed_ms, notes);
    }

    pub(crate) fn clear_arpeggio(&mut self) {
        self.arp.clear();
    }

    /// Glide from the current pitch to `target` over `ms` milliseconds
    pub(crate) fn glide_to(&mut self, target: u32, ms: u32, ctx: &Context) {
        let from = if self.frequency == 0 {
            centihz_from_increment(self.phase_inc.to_bits(), ctx.sample_rate())
        } else {
            self.frequency
        };
        self.glide_between(from, target, ms, ctx);
    }

    /// Jump to `from`, then glide to `target` over `ms` milliseconds
    pub(crate) fn glide_between(&mut self, from: u32, target: u32, ms: u32, ctx: &Context) {
        let sr = ctx.sample_rate();
        let ticks = crate::fixedmath::ms_to_ticks(ms, ctx.control_rate() as u32);
        let target_inc = phase_increment(target, sr);
        if ticks == 0 {
            self.glide.cancel();
            self.frequency = target;
            self.phase_inc = PhaseFxP::from_bits(target_inc);
            return;
        }
        self.frequency = from;
        let from_inc = phase_increment(from, sr);
        self.phase_inc = PhaseFxP::from_bits(from_inc);
        self.glide.start(from_inc, target_inc, target, ticks);
    }

    pub(crate) fn bind(&mut self, binding: Binding<'a>) {
        self.binding = binding;
        self.sequencer.reset();
        self.tracker = None;
        match binding {
            Binding::Tracker(_) => self.env.trigger_full(),
            Binding::Sample(_) => {
                self.wave = WaveType::Sample;
                self.env.silence();
            }
            Binding::None => self.env.silence(),
        }
    }

    pub(crate) fn detach(&mut self, wave: WaveType) {
        self.bind(Binding::None);
        self.wave = wave;
    }

    /// Load a registered sample for direct playback
    pub(crate) fn set_sample(&mut self, id: u16, looping: SampleLoop, registry: &Registry) {
        self.binding = Binding::None;
        self.tracker = None;
        self.wave = WaveType::Sample;
        match registry.sample(id) {
            Some(data) => {
                let inc = self.sample.increment();
                self.sample.start(id, data, looping, inc);
            }
            None => self.sample.clear(),
        }
    }

    pub(crate) fn set_sample_loop(&mut self, looping: SampleLoop, registry: &Registry) {
        let len = self
            .sample
            .id()
            .and_then(|id| registry.sample(id))
            .map_or(0, |d| d.len());
        self.sample.set_loop(looping, len);
    }

    fn retune_sample(&mut self, ctx: &Context, registry: &Registry) {
        let Some(data) = self.sample.id().and_then(|id| registry.sample(id)) else {
            return;
        };
        let root = match self.binding {
            Binding::Sample(inst) => inst
                .zone_for(self.frequency)
                .and_then(|z| z.root_override)
                .unwrap_or(data.root_centihz),
            _ => data.root_centihz,
        };
        self.sample.set_increment(sample_increment(
            self.frequency,
            root,
            data.sample_rate,
            ctx.sample_rate(),
        ));
    }

    pub(crate) fn note_on(&mut self, centihz: u32, volume: u8, ctx: &Context, registry: &Registry, entropy: u32) {
        self.frequency = centihz;
        self.volume = volume;
        self.active = true;
        self.phase_inc = PhaseFxP::from_bits(phase_increment(centihz, ctx.sample_rate()));
        self.noise.reseed(entropy);
        match self.binding {
            Binding::Tracker(inst) => {
                self.env.trigger_full();
                self.sequencer.reset();
                self.tracker = None;
                if let SeqStep::Apply(out) = self.sequencer.tick(inst, &mut self.env, ctx.control_rate() as u32) {
                    self.apply_stage(out);
                }
            }
            Binding::Sample(inst) => {
                self.wave = WaveType::Sample;
                self.env.trigger_full();
                let zone = inst.zone_for(centihz);
                let found = zone.and_then(|z| registry.sample(z.sample_id).map(|d| (z, d)));
                match found {
                    Some((zone, data)) => {
                        let root = zone.root_override.unwrap_or(data.root_centihz);
                        let inc = sample_increment(centihz, root, data.sample_rate, ctx.sample_rate());
                        let looping = SampleLoop {
                            mode: inst.loop_mode,
                            start: inst.loop_start,
                            end: inst.loop_end,
                        };
                        self.sample.start(zone.sample_id, data, looping, inc);
                    }
                    None => self.sample.clear(),
                }
            }
            Binding::None if self.wave == WaveType::Sample => {
                self.env.trigger();
                let loaded = self.sample.id().and_then(|id| registry.sample(id).map(|d| (id, d)));
                if let Some((id, data)) = loaded {
                    let inc = sample_increment(centihz, data.root_centihz, data.sample_rate, ctx.sample_rate());
                    let looping = self.sample.looping();
                    self.sample.start(id, data, looping, inc);
                }
            }
            Binding::None => {
                self.phase = PhaseFxP::ZERO;
                if self.arp.is_active() {
                    self.arp.restart();
                }
                self.env.trigger();
            }
        }
    }

    pub(crate) fn note_off(&mut self) {
        if self.active {
            self.env.release();
            self.sequencer.reset();
        }
    }

    fn apply_stage(&mut self, out: StageOutput) {
        self.volume = out.volume;
        self.tracker = Some(TrackerSound {
            wave: out.wave,
            next: out.next,
            morph: out.morph,
        });
    }

    /// Run one control tick: vibrato, tremolo, arpeggio, glide, then the
    /// tracker sequence
    pub(crate) fn control_tick(&mut self, ctx: &Context, registry: &Registry) {
        if !self.active {
            return;
        }
        let interval = ctx.control_interval();
        let rate = ctx.control_rate() as u32;
        self.vibrato.tick(interval);
        self.tremolo.tick(interval);
        if let Some(freq) = self.arp.tick(rate) {
            self.set_frequency(freq, ctx, registry);
        }
        if self.glide.is_active() {
            let mut inc = self.phase_inc.to_bits();
            let done = self.glide.tick(&mut inc);
            self.phase_inc = PhaseFxP::from_bits(inc);
            self.frequency = done.unwrap_or_else(|| centihz_from_increment(inc, ctx.sample_rate()));
        }
        if let Binding::Tracker(inst) = self.binding {
            match self.sequencer.tick(inst, &mut self.env, rate) {
                SeqStep::Apply(out) => self.apply_stage(out),
                SeqStep::Finished => self.active = false,
                SeqStep::Hold => {}
            }
        }
    }

    fn source_for(&self, select: WaveSelect, registry: &Registry<'a>) -> Option<Source<'a>> {
        match select {
            WaveSelect::Basic(WaveType::Noise) => None,
            WaveSelect::Basic(shape) => Some(Source::Basic(shape)),
            WaveSelect::Wavetable(id) => registry.wavetable(id).map(|t| Source::Wavetable(*t)),
        }
    }

    /// Choose the generator for the next block
    pub(crate) fn oscillator(&self, registry: &Registry<'a>) -> Oscillator<'a> {
        if let (Binding::Tracker(_), Some(sound)) = (self.binding, self.tracker) {
            if sound.wave.is_noise() {
                return Oscillator::Noise;
            }
            let Some(from) = self.source_for(sound.wave, registry) else {
                return Oscillator::Silent;
            };
            if sound.morph > 0 {
                if let Some(to) = self.source_for(sound.next, registry) {
                    return Oscillator::Morph {
                        from,
                        to,
                        amount: sound.morph,
                    };
                }
            }
            return Oscillator::Tone(from);
        }
        match self.wave {
            WaveType::Wavetable => self
                .wavetable
                .map_or(Oscillator::Silent, |t| Oscillator::Tone(Source::Wavetable(t))),
            WaveType::Noise => Oscillator::Noise,
            WaveType::Sample => self
                .sample
                .id()
                .and_then(|id| registry.sample(id))
                .map_or(Oscillator::Silent, |d| Oscillator::Sample(*d)),
            shape => Oscillator::Tone(Source::Basic(shape)),
        }
    }

    /// Phase increment for the next block, including vibrato
    pub(crate) fn block_increment(&self) -> u32 {
        self.phase_inc.to_bits().wrapping_add(self.vibrato.offset() as u32)
    }

    /// Volume scaled by the tremolo gain
    pub(crate) fn gain(&self) -> crate::devices::Gain {
        crate::devices::Gain::new(self.volume, self.tremolo.gain())
    }

    /// True if the envelope is exactly full scale
    pub fn env_is_full(&self) -> bool {
        self.env.value().to_bits() == ENV_MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{SampleInstrument, SampleZone, Stage, TrackerInstrument, W_PULSE};
    use crate::registry::{SampleData, Wavetable};

    const CTX: Context = Context::new_480();

    #[test]
    fn wave_type_conversions() {
        assert_eq!(WaveType::try_from(4), Ok(WaveType::Wavetable));
        assert!(WaveType::try_from(7).is_err());
        for w in WaveType::waves() {
            assert_eq!(WaveType::try_from(*w as u8), Ok(*w));
            assert!(!w.to_str().is_empty());
            assert!(!w.to_str_short().is_empty());
        }
    }
    #[test]
    fn defaults() {
        let v = Voice::new(2);
        assert!(!v.is_active());
        assert_eq!(v.tremolo_gain(), 255);
        assert_eq!(v.pulse_width, DEFAULT_PULSE_WIDTH);
        assert_eq!(v.env_8bit(), 0);
    }
    #[test]
    fn note_on_basic() {
        let reg = Registry::default();
        let mut v = Voice::new(0);
        v.note_on(44000, 200, &CTX, &reg, 0);
        assert!(v.is_active());
        assert_eq!(v.frequency(), 44000);
        assert_eq!(v.phase_increment().to_bits(), phase_increment(44000, 48000));
        // default attack is instantaneous
        assert!(v.env_is_full());
        assert_eq!(v.envelope().stage(), EnvStage::Decay);
        assert_eq!(v.env_8bit(), 255);
        assert_eq!(v.output_8bit(), 200);
        assert_eq!(v.output_raw(), (ENV_MAX >> 8) * 200);
    }
    #[test]
    fn note_off_only_when_active() {
        let mut v = Voice::new(0);
        v.note_off();
        assert_eq!(v.envelope().stage(), EnvStage::Idle);
    }
    #[test]
    fn zero_length_glide_jumps() {
        let mut v = Voice::new(0);
        v.glide_between(10000, 20000, 0, &CTX);
        assert_eq!(v.frequency(), 20000);
        assert!(!v.glide().is_active());
        assert_eq!(v.phase_increment().to_bits(), phase_increment(20000, 48000));
    }
    #[test]
    fn glide_to_from_increment() {
        let reg = Registry::default();
        let mut v = Voice::new(0);
        v.note_on(44000, 200, &CTX, &reg, 0);
        v.glide_to(88000, 50, &CTX);
        assert_eq!(v.glide().ticks_left(), 5);
        for _ in 0..5 {
            v.control_tick(&CTX, &reg);
        }
        assert_eq!(v.frequency(), 88000);
        assert_eq!(v.phase_increment().to_bits(), phase_increment(88000, 48000));
    }
    #[test]
    fn tracker_binding_overrides_wave() {
        static ATTACK: [Stage; 1] = [Stage::new(90, W_PULSE)];
        static INST: TrackerInstrument = TrackerInstrument {
            attack: &ATTACK,
            attack_speed_ms: 10,
            sustain: Stage::new(60, 5),
            release: &[],
            release_speed_ms: 0,
            smooth_morph: false,
        };
        static TABLE: [i16; 4] = [0, 1, 2, 3];
        let mut reg = Registry::default();
        reg.register_wavetable(5, Wavetable::new_16(&TABLE)).unwrap();
        let mut v = Voice::new(0);
        v.bind(Binding::Tracker(&INST));
        v.note_on(44000, 1, &CTX, &reg, 0);
        assert_eq!(v.volume(), 90);
        assert!(matches!(v.oscillator(&reg), Oscillator::Tone(Source::Basic(WaveType::Pulse))));
        assert_eq!(v.wave(), WaveType::Sine);
        v.control_tick(&CTX, &reg);
        assert_eq!(v.volume(), 60);
        assert!(matches!(v.oscillator(&reg), Oscillator::Tone(Source::Wavetable(_))));
        v.note_off();
        v.control_tick(&CTX, &reg);
        assert!(!v.is_active());
    }
    #[test]
    fn sample_instrument_note_on() {
        static FRAMES: [i16; 64] = [0; 64];
        static ZONES: [SampleZone; 1] = [SampleZone {
            low_centihz: 20000,
            high_centihz: 90000,
            sample_id: 7,
            root_override: Some(22000),
        }];
        static INST: SampleInstrument = SampleInstrument {
            zones: &ZONES,
            loop_mode: LoopMode::Forward,
            loop_start: 8,
            loop_end: 1000,
        };
        let mut reg = Registry::default();
        reg.register_sample(7, SampleData::new(&FRAMES, 48000, 44000)).unwrap();
        let mut v = Voice::new(0);
        v.bind(Binding::Sample(&INST));
        v.note_on(44000, 255, &CTX, &reg, 0);
        assert_eq!(v.wave(), WaveType::Sample);
        assert_eq!(v.sample_player().id(), Some(7));
        // root override of one octave down doubles the rate
        assert_eq!(v.sample_player().increment(), crate::SampleIncFxP::from_num(2));
        assert_eq!(v.sample_player().looping().end, 64);
        assert!(v.env_is_full());
        // outside every zone: silent, but still a valid note
        v.note_on(100, 255, &CTX, &reg, 0);
        assert!(matches!(v.oscillator(&reg), Oscillator::Silent));
    }
    #[test]
    fn raw_sample_follows_pitch() {
        static FRAMES: [i16; 64] = [0; 64];
        let mut reg = Registry::default();
        reg.register_sample(1, SampleData::new(&FRAMES, 24000, 44000)).unwrap();
        let mut v = Voice::new(0);
        v.set_sample(1, SampleLoop::off(), &reg);
        v.note_on(88000, 255, &CTX, &reg, 0);
        assert_eq!(v.sample_player().increment(), crate::SampleIncFxP::ONE);
        v.set_frequency(44000, &CTX, &reg);
        assert_eq!(v.sample_player().increment(), crate::SampleIncFxP::from_num(0.5));
    }
}
