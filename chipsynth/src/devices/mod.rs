//! This module contains the DSP primitives a voice is built from.  Each one
//! renders a whole block at a time: the envelope produces a linear ramp, and
//! exactly one generator runs per voice per block, chosen up front through
//! [Oscillator] so no per-sample dispatch happens on the hot path.

mod env;
mod noise;
mod osc;
mod sampler;
mod wavetable;

use crate::context::Context;
use crate::registry::{SampleData, Wavetable};
use crate::voice::WaveType;
use crate::EnvFxP;

pub use env::{EnvParams, EnvRamp, EnvStage, Envelope, ENV_MAX};
pub use noise::Noise;
pub use osc::{pulse, saw, sine, triangle, DEFAULT_PULSE_WIDTH};
pub use sampler::{sample_increment, LoopMode, SampleLoop, SamplePlayer};

/// Voice volume scaled by the tremolo gain, applied on top of the envelope
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Gain(i32);

impl Gain {
    /// Combine an 8 bit volume with an 8 bit tremolo gain
    pub const fn new(volume: u8, tremolo: u8) -> Self {
        Self((volume as i32 * tremolo as i32) >> 8)
    }
}

/// Something that can be evaluated at an arbitrary phase: a built-in shape
/// or a wavetable.
#[derive(Clone, Copy, Debug)]
pub enum Source<'a> {
    /// A built-in shape (sine, triangle, saw, or pulse)
    Basic(WaveType),
    /// A registered wavetable
    Wavetable(Wavetable<'a>),
}

impl Source<'_> {
    /// The sample at `phase`, as a signed 16 bit value widened to 32 bits
    #[inline]
    pub fn at(&self, phase: u32, width: u32) -> i32 {
        match self {
            Self::Basic(WaveType::Triangle) => triangle(phase),
            Self::Basic(WaveType::Saw) => saw(phase),
            Self::Basic(WaveType::Pulse) => pulse(phase, width),
            Self::Basic(_) => sine(phase),
            Self::Wavetable(table) => table.at_phase(phase) as i32,
        }
    }
}

/// The generator a voice runs for one block
#[derive(Clone, Copy, Debug)]
pub enum Oscillator<'a> {
    /// Nothing to play (missing data)
    Silent,
    /// A single phase-driven source
    Tone(Source<'a>),
    /// A crossfade between two sources; 0 is all `from`, 255 almost all `to`
    Morph {
        /// Source being faded out
        from: Source<'a>,
        /// Source being faded in
        to: Source<'a>,
        /// Crossfade position
        amount: u8,
    },
    /// Noise clocked by the voice's phase
    Noise,
    /// Sample playback
    Sample(SampleData<'a>),
}

/// Mix one voice into `mix`, pulling samples from `source` until the block is
/// full or the source runs dry.  Each sample is scaled by the envelope (top 8
/// bits plus one) and the combined volume.
#[inline]
pub(crate) fn accumulate<F>(mix: &mut [i32], ramp: &EnvRamp, gain: Gain, mut source: F)
where
    F: FnMut() -> Option<i32>,
{
    let mut env = ramp.start as i32;
    for out in mix.iter_mut() {
        let Some(sample) = source() else {
            break;
        };
        let scale = (env >> 20) * gain.0;
        *out += (sample * scale) >> 16;
        env += ramp.step;
    }
}

/// Run a phase-driven generator over the block
#[inline]
pub(crate) fn run_phase<F>(mix: &mut [i32], ramp: &EnvRamp, gain: Gain, phase: &mut u32, inc: u32, f: F)
where
    F: Fn(u32) -> i32,
{
    let mut ph = *phase;
    accumulate(mix, ramp, gain, || {
        let s = f(ph);
        ph = ph.wrapping_add(inc);
        Some(s)
    });
    *phase = ph;
}

/// Render a single source
pub(crate) fn render_tone(
    source: &Source,
    mix: &mut [i32],
    ramp: &EnvRamp,
    gain: Gain,
    phase: &mut u32,
    inc: u32,
    width: u32,
) {
    match source {
        Source::Basic(shape) => osc::render(*shape, mix, ramp, gain, phase, inc, width),
        Source::Wavetable(table) => wavetable::render(table, mix, ramp, gain, phase, inc),
    }
}

/// Render a crossfade between two sources sharing one phase
#[allow(clippy::too_many_arguments)]
pub(crate) fn render_morph(
    from: &Source,
    to: &Source,
    amount: u8,
    mix: &mut [i32],
    ramp: &EnvRamp,
    gain: Gain,
    phase: &mut u32,
    inc: u32,
    width: u32,
) {
    let b = amount as i32;
    let a = 256 - b;
    run_phase(mix, ramp, gain, phase, inc, |ph| {
        (from.at(ph, width) * a + to.at(ph, width) * b) >> 8
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: EnvRamp = EnvRamp {
        start: ENV_MAX,
        step: 0,
        ended: false,
    };

    #[test]
    fn gain_scaling() {
        assert_eq!(Gain::new(255, 255).0, 254);
        assert_eq!(Gain::new(128, 255).0, 127);
        assert_eq!(Gain::new(255, 0).0, 0);
    }
    #[test]
    fn mix_formula() {
        let mut mix = [0i32; 4];
        let mut values = [32767, -32768, 1000, 0].into_iter();
        accumulate(&mut mix, &FULL, Gain::new(255, 255), || values.next());
        // (s * 256 * 254) >> 16
        assert_eq!(mix, [32511, -32512, 992, 0]);
    }
    #[test]
    fn accumulate_adds() {
        let mut mix = [100i32; 3];
        accumulate(&mut mix, &FULL, Gain::new(255, 255), || Some(256));
        assert_eq!(mix, [354, 354, 354]);
    }
    #[test]
    fn dry_source_stops_early() {
        let mut mix = [0i32; 8];
        let mut n = 0;
        accumulate(&mut mix, &FULL, Gain::new(255, 255), || {
            n += 1;
            (n <= 2).then_some(1 << 12)
        });
        assert_ne!(mix[1], 0);
        assert_eq!(&mix[2..], &[0; 6]);
    }
    #[test]
    fn morph_endpoints() {
        let from = Source::Basic(WaveType::Pulse);
        let to = Source::Basic(WaveType::Saw);
        let mut a = [0i32; 16];
        let mut b = [0i32; 16];
        let mut p1 = 0u32;
        let mut p2 = 0u32;
        render_morph(&from, &to, 0, &mut a, &FULL, Gain::new(255, 255), &mut p1, 1 << 28, DEFAULT_PULSE_WIDTH);
        render_tone(&from, &mut b, &FULL, Gain::new(255, 255), &mut p2, 1 << 28, DEFAULT_PULSE_WIDTH);
        assert_eq!(a, b);
        assert_eq!(p1, p2);
    }
}
