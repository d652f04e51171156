use super::*;

const LCG_MUL: u32 = 1664525;
const LCG_ADD: u32 = 1013904223;

/// A sample-and-hold noise generator.  A new value is drawn each time the
/// voice's phase, sped up sixteen times, wraps around, so the noise colour
/// follows the voice pitch.
#[derive(Clone, Debug)]
pub struct Noise {
    state: u32,
    held: i16,
}

impl Noise {
    /// Create a generator with the given LCG state
    pub const fn new(seed: u32) -> Self {
        Self {
            state: seed,
            held: 0,
        }
    }
    /// Perturb the LCG state (on note-on)
    pub fn reseed(&mut self, entropy: u32) {
        self.state = self.state.wrapping_add(entropy);
    }
    /// The value currently being held
    pub fn held(&self) -> i16 {
        self.held
    }
    fn draw(&mut self) {
        self.state = self.state.wrapping_mul(LCG_MUL).wrapping_add(LCG_ADD);
        self.held = (self.state >> 16) as i16;
    }

    pub(crate) fn render(&mut self, mix: &mut [i32], ramp: &EnvRamp, gain: Gain, phase: &mut u32, inc: u32) {
        let step = inc << 4;
        let mut ph = *phase;
        accumulate(mix, ramp, gain, || {
            let next = ph.wrapping_add(step);
            if next < ph {
                self.draw();
            }
            ph = next;
            Some(self.held as i32)
        });
        *phase = ph;
    }
}
