use super::*;
use crate::fixedmath;

/// Pulse threshold for a 50% duty cycle
pub const DEFAULT_PULSE_WIDTH: u32 = 0x8000_0000;
const PULSE_LEVEL: i32 = 20000;

/// Sine: the top 12 bits of the phase index the sine table, which is then
/// brought down to a 16 bit range
#[inline]
pub fn sine(phase: u32) -> i32 {
    fixedmath::sine(phase) >> 15
}

/// Rising sawtooth: the top 16 bits of the phase, read as signed
#[inline]
pub fn saw(phase: u32) -> i32 {
    (phase >> 16) as i16 as i32
}

/// Triangle, folded from the sawtooth
#[inline]
pub fn triangle(phase: u32) -> i32 {
    let s = saw(phase);
    ((s ^ (s >> 15)) << 1) - 32767
}

/// Pulse: high while the phase is below `width`
#[inline]
pub fn pulse(phase: u32, width: u32) -> i32 {
    if phase < width {
        PULSE_LEVEL
    } else {
        -PULSE_LEVEL
    }
}

pub(super) fn render(
    shape: WaveType,
    mix: &mut [i32],
    ramp: &EnvRamp,
    gain: Gain,
    phase: &mut u32,
    inc: u32,
    width: u32,
) {
    match shape {
        WaveType::Triangle => run_phase(mix, ramp, gain, phase, inc, triangle),
        WaveType::Saw => run_phase(mix, ramp, gain, phase, inc, saw),
        WaveType::Pulse => run_phase(mix, ramp, gain, phase, inc, |ph| pulse(ph, width)),
        _ => run_phase(mix, ramp, gain, phase, inc, sine),
    }
}
