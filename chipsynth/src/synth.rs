//! The engine: a fixed bank of voices, the ID registries, and the mixer.
//!
//! Every control method takes a voice index and silently ignores indices out
//! of range, so callers driving the engine from sequencer data never need to
//! validate it.  Methods that take effect at the next block do so because
//! [Synth::render] is the only place any of this state is read on the audio
//! path.

use oorandom::Rand32;

use crate::context::Context;
use crate::devices::{render_morph, render_tone, EnvParams, EnvStage, Oscillator};
use crate::instrument::{Binding, SampleInstrument, TrackerInstrument};
use crate::output::{OutputSample, OutputSink};
use crate::registry::{Registry, SampleData, Wavetable};
use crate::voice::{SampleLoop, Voice, WaveType};
use crate::{PhaseFxP, MAX_BLOCK_SIZE, MAX_VOICES};

/// Default random seed to use if not provided a seed
const RANDOM_SEED: u64 = 0xce607a9d25ec3d88u64;

/// A polyphonic synthesizer with `VOICES` voices
pub struct Synth<'a, const VOICES: usize = MAX_VOICES> {
    context: Context,
    control_interval: u32,
    control_counter: u32,
    control_ticks: u64,
    master_volume: u8,
    voices: [Voice<'a>; VOICES],
    registry: Registry<'a>,
    mix: [i32; MAX_BLOCK_SIZE],
    rng: Rand32,
}

impl<'a> Synth<'a> {
    /// Create a synthesizer with the default number of voices
    pub fn new(context: Context) -> Self {
        Self::with_seed(context, RANDOM_SEED)
    }
}

impl<'a, const VOICES: usize> Synth<'a, VOICES> {
    /// Create a synthesizer whose noise voices are seeded from `seed`
    pub fn with_seed(context: Context, seed: u64) -> Self {
        Self {
            context,
            control_interval: context.control_interval(),
            control_counter: 0,
            control_ticks: 0,
            master_volume: u8::MAX,
            voices: core::array::from_fn(Voice::new),
            registry: Registry::default(),
            mix: [0; MAX_BLOCK_SIZE],
            rng: Rand32::new(seed),
        }
    }

    /// The processing context
    pub fn context(&self) -> &Context {
        &self.context
    }
    /// The output sample rate, in Hz
    pub fn sample_rate(&self) -> u32 {
        self.context.sample_rate()
    }
    /// The control rate, in Hz
    pub fn control_rate(&self) -> u16 {
        self.context.control_rate()
    }
    /// Number of control ticks run so far
    pub fn control_ticks(&self) -> u64 {
        self.control_ticks
    }
    /// Change how often modulation is evaluated.  Zero is treated as 1Hz.
    pub fn set_control_rate(&mut self, hz: u16) {
        self.context = self.context.with_control_rate(hz);
        self.control_interval = self.context.control_interval();
        log::debug!(
            "control rate {}Hz, every {} samples",
            self.context.control_rate(),
            self.control_interval
        );
    }
    /// Master volume, where 255 is unity
    pub fn master_volume(&self) -> u8 {
        self.master_volume
    }
    /// Set the master volume
    pub fn set_master_volume(&mut self, volume: u8) {
        self.master_volume = volume;
    }
    /// All voices, for inspection
    pub fn voices(&self) -> &[Voice<'a>] {
        &self.voices
    }
    /// A single voice, for inspection
    pub fn voice(&self, voice: usize) -> Option<&Voice<'a>> {
        self.voices.get(voice)
    }
    /// True if the voice exists and is sounding
    pub fn is_voice_active(&self, voice: usize) -> bool {
        self.voice(voice).is_some_and(Voice::is_active)
    }

    /// Register (or replace) a wavetable under `id`
    pub fn register_wavetable(&mut self, id: u16, table: Wavetable<'a>) -> Result<(), &'static str> {
        self.registry.register_wavetable(id, table)?;
        log::debug!("wavetable {}: {} entries, {} bit", id, table.size(), table.depth().bits());
        Ok(())
    }
    /// Register (or replace) a sample under `id`
    pub fn register_sample(&mut self, id: u16, sample: SampleData<'a>) -> Result<(), &'static str> {
        self.registry.register_sample(id, sample)?;
        log::debug!("sample {}: {} frames at {}Hz", id, sample.len(), sample.sample_rate);
        Ok(())
    }
    /// The registries
    pub fn registry(&self) -> &Registry<'a> {
        &self.registry
    }

    /// Start a note.  Takes effect at the next block, and forces a control
    /// tick at the start of that block.
    pub fn note_on(&mut self, voice: usize, centihz: u32, volume: u8) {
        let entropy = self.rng.rand_u32();
        let ctx = self.context;
        if let Some(v) = self.voices.get_mut(voice) {
            v.note_on(centihz, volume, &ctx, &self.registry, entropy);
            self.control_counter = self.control_interval;
        }
    }
    /// Release a note
    pub fn note_off(&mut self, voice: usize) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.note_off();
        }
    }
    /// Change a voice's pitch, in hundredths of a Hz
    pub fn set_frequency(&mut self, voice: usize, centihz: u32) {
        let ctx = self.context;
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_frequency(centihz, &ctx, &self.registry);
        }
    }
    /// Change a voice's volume
    pub fn set_volume(&mut self, voice: usize, volume: u8) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_volume(volume);
        }
    }
    /// Change a voice's waveform
    pub fn set_wave(&mut self, voice: usize, wave: WaveType) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_wave(wave);
        }
    }
    /// Change a voice's pulse width, where 128 is square
    pub fn set_pulse_width(&mut self, voice: usize, width: u8) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_pulse_width(width);
        }
    }
    /// Change a voice's envelope
    pub fn set_env(&mut self, voice: usize, params: EnvParams) {
        let ctx = self.context;
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_env(params, &ctx);
        }
    }
    /// Set vibrato rate and depth, both in hundredths of a Hz.  A depth of
    /// zero disables vibrato.
    pub fn set_vibrato(&mut self, voice: usize, rate_centihz: u32, depth_centihz: u32) {
        let ctx = self.context;
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_vibrato(rate_centihz, depth_centihz, &ctx);
        }
    }
    /// Set tremolo rate (hundredths of a Hz) and depth.  A depth of zero
    /// disables tremolo.
    pub fn set_tremolo(&mut self, voice: usize, rate_centihz: u32, depth: u16) {
        let ctx = self.context;
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_tremolo(rate_centihz, depth, &ctx);
        }
    }
    /// Give a voice its own wavetable and switch it to wavetable playback
    pub fn set_wavetable(&mut self, voice: usize, table: Wavetable<'a>) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_wavetable(table);
        }
    }
    /// Give a voice a registered wavetable.  Unknown IDs are ignored.
    pub fn set_wavetable_id(&mut self, voice: usize, id: u16) {
        if let Some(table) = self.registry.wavetable(id).copied() {
            self.set_wavetable(voice, table);
        }
    }
    /// Give every voice the same wavetable
    pub fn set_wavetable_all(&mut self, table: Wavetable<'a>) {
        for v in self.voices.iter_mut() {
            v.set_wavetable(table);
        }
    }
    /// Switch a voice to playing a registered sample directly
    pub fn set_sample(&mut self, voice: usize, id: u16, looping: SampleLoop) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_sample(id, looping, &self.registry);
        }
    }
    /// Change a voice's sample loop without restarting it
    pub fn set_sample_loop(&mut self, voice: usize, looping: SampleLoop) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_sample_loop(looping, &self.registry);
        }
    }
    /// Bind (or with `None`, unbind) a tracker instrument
    pub fn set_tracker_instrument(&mut self, voice: usize, instrument: Option<&'a TrackerInstrument<'a>>) {
        if let Some(v) = self.voices.get_mut(voice) {
            log::debug!("voice {} tracker instrument {}", voice, if instrument.is_some() { "bound" } else { "cleared" });
            v.bind(instrument.map_or(Binding::None, Binding::Tracker));
        }
    }
    /// Bind (or with `None`, unbind) a sample instrument
    pub fn set_sample_instrument(&mut self, voice: usize, instrument: Option<&'a SampleInstrument<'a>>) {
        if let Some(v) = self.voices.get_mut(voice) {
            log::debug!("voice {} sample instrument {}", voice, if instrument.is_some() { "bound" } else { "cleared" });
            v.bind(instrument.map_or(Binding::None, Binding::Sample));
        }
    }
    /// Drop any instrument and return the voice to a plain oscillator
    pub fn detach_instrument(&mut self, voice: usize, wave: WaveType) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.detach(wave);
        }
    }
    /// Cycle a voice through up to [crate::MAX_ARP_NOTES] frequencies
    pub fn set_arpeggio(&mut self, voice: usize, speed_ms: u16, notes: &[u32]) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_arpeggio(speed_ms, notes);
        }
    }
    /// Stop arpeggiating
    pub fn detach_arpeggio(&mut self, voice: usize) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.clear_arpeggio();
        }
    }
    /// Jump to `from_centihz` and glide to `to_centihz` over `ms`
    pub fn slide(&mut self, voice: usize, from_centihz: u32, to_centihz: u32, ms: u32) {
        let ctx = self.context;
        if let Some(v) = self.voices.get_mut(voice) {
            v.glide_between(from_centihz, to_centihz, ms, &ctx);
        }
    }
    /// Glide from the current pitch to `to_centihz` over `ms`
    pub fn slide_to(&mut self, voice: usize, to_centihz: u32, ms: u32) {
        let ctx = self.context;
        if let Some(v) = self.voices.get_mut(voice) {
            v.glide_to(to_centihz, ms, &ctx);
        }
    }

    /// Frequency in hundredths of a Hz (0 for an invalid voice)
    pub fn frequency(&self, voice: usize) -> u32 {
        self.voice(voice).map_or(0, Voice::frequency)
    }
    /// Volume (0 for an invalid voice)
    pub fn volume(&self, voice: usize) -> u8 {
        self.voice(voice).map_or(0, Voice::volume)
    }
    /// Envelope level, 8 bit (0 for an invalid voice)
    pub fn env_8bit(&self, voice: usize) -> u8 {
        self.voice(voice).map_or(0, Voice::env_8bit)
    }
    /// Envelope level, 28 bit (0 for an invalid voice)
    pub fn env_raw(&self, voice: usize) -> u32 {
        self.voice(voice).map_or(0, Voice::env_raw)
    }
    /// Envelope times volume, 8 bit (0 for an invalid voice)
    pub fn output_8bit(&self, voice: usize) -> u8 {
        self.voice(voice).map_or(0, Voice::output_8bit)
    }
    /// Envelope times volume, full precision (0 for an invalid voice)
    pub fn output_raw(&self, voice: usize) -> u32 {
        self.voice(voice).map_or(0, Voice::output_raw)
    }

    /// Render `out.len()` samples of mono audio.  Long buffers are mixed in
    /// chunks of [MAX_BLOCK_SIZE].
    pub fn render<S: OutputSample>(&mut self, out: &mut [S]) {
        let depth = self.context.output_depth();
        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            self.mix_block(chunk.len());
            let master = self.master_volume;
            for (o, m) in chunk.iter_mut().zip(self.mix.iter()) {
                *o = S::from_mix(*m, master, depth);
            }
        }
    }

    /// Render one block into `buf` and hand it to `sink`
    pub fn render_to<S, K>(&mut self, buf: &mut [S], sink: &mut K) -> Result<(), K::Error>
    where
        S: OutputSample,
        K: OutputSink<S>,
    {
        self.render(buf);
        sink.write(buf)
    }

    fn advance_control(&mut self, samples: u32) {
        self.control_counter += samples;
        while self.control_counter >= self.control_interval {
            self.control_counter -= self.control_interval;
            self.control_tick();
        }
    }

    fn control_tick(&mut self) {
        self.control_ticks += 1;
        let Self {
            voices,
            registry,
            context,
            ..
        } = self;
        for v in voices.iter_mut() {
            v.control_tick(context, registry);
        }
    }

    fn mix_block(&mut self, samples: usize) {
        self.advance_control(samples as u32);
        let Self {
            voices,
            registry,
            mix,
            ..
        } = self;
        let mix = &mut mix[..samples];
        mix.fill(0);
        for (idx, v) in voices.iter_mut().enumerate() {
            if v.active {
                render_voice(idx, v, registry, mix);
            }
        }
    }
}

fn render_voice<'a>(idx: usize, voice: &mut Voice<'a>, registry: &Registry<'a>, mix: &mut [i32]) {
    let ramp = voice.env.advance(mix.len() as u32, voice.is_tracker_bound());
    if ramp.ended {
        voice.active = false;
    }
    if ramp.is_silent() && voice.env.stage() != EnvStage::Attack {
        return;
    }
    let gain = voice.gain();
    let inc = voice.block_increment();
    let width = voice.pulse_width;
    let mut phase = voice.phase.to_bits();
    match voice.oscillator(registry) {
        Oscillator::Silent => {}
        Oscillator::Tone(source) => render_tone(&source, mix, &ramp, gain, &mut phase, inc, width),
        Oscillator::Morph { from, to, amount } => {
            render_morph(&from, &to, amount, mix, &ramp, gain, &mut phase, inc, width)
        }
        Oscillator::Noise => voice.noise.render(mix, &ramp, gain, &mut phase, inc),
        Oscillator::Sample(data) => {
            if voice.sample.render(&data, mix, &ramp, gain) {
                log::trace!("voice {} sample finished", idx);
                voice.active = false;
                voice.env.silence();
            }
        }
    }
    voice.phase = PhaseFxP::from_bits(phase);
}
