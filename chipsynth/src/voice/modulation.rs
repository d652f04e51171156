//! Control-rate modulation of a [super::Voice]: vibrato, tremolo, arpeggio,
//! and portamento.  Each source has its own state and a `tick` that the
//! scheduler calls once per control period.

use arrayvec::ArrayVec;

use crate::fixedmath::{ms_to_ticks, phase_increment, sine};
use crate::MAX_ARP_NOTES;

// a sine LFO narrowed to roughly +/-16000
fn lfo(phase: u32) -> i32 {
    (sine(phase) >> 16) as i16 as i32
}

/// Pitch modulation by a sine LFO
#[derive(Clone, Debug, Default)]
pub struct Vibrato {
    rate_inc: u32,
    depth_inc: u32,
    phase: u32,
    offset: i32,
}

impl Vibrato {
    /// Set rate and depth, both in hundredths of a Hz
    pub fn set(&mut self, rate_centihz: u32, depth_centihz: u32, sample_rate: u32) {
        self.rate_inc = phase_increment(rate_centihz, sample_rate);
        self.depth_inc = phase_increment(depth_centihz, sample_rate);
    }
    /// Advance the LFO by `interval` samples and recompute the pitch offset
    pub fn tick(&mut self, interval: u32) {
        if self.depth_inc == 0 {
            self.offset = 0;
            return;
        }
        self.phase = self.phase.wrapping_add(self.rate_inc.wrapping_mul(interval));
        self.offset = ((self.depth_inc as i64 * lfo(self.phase) as i64) >> 14) as i32;
    }
    /// The signed amount to add to the phase increment
    pub fn offset(&self) -> i32 {
        self.offset
    }
}

/// Amplitude modulation by a sine LFO
#[derive(Clone, Debug)]
pub struct Tremolo {
    rate_inc: u32,
    depth: u16,
    phase: u32,
    gain: u8,
}

impl Default for Tremolo {
    fn default() -> Self {
        Self {
            rate_inc: 0,
            depth: 0,
            phase: 0,
            gain: u8::MAX,
        }
    }
}

impl Tremolo {
    /// Set the rate (in hundredths of a Hz) and depth
    pub fn set(&mut self, rate_centihz: u32, depth: u16, sample_rate: u32) {
        self.rate_inc = phase_increment(rate_centihz, sample_rate);
        self.depth = depth;
    }
    /// Advance the LFO by `interval` samples and recompute the gain
    pub fn tick(&mut self, interval: u32) {
        if self.depth == 0 {
            self.gain = u8::MAX;
            return;
        }
        self.phase = self.phase.wrapping_add(self.rate_inc.wrapping_mul(interval));
        let magnitude = lfo(self.phase) as i64 + 20000;
        let reduction = (magnitude * self.depth as i64) >> 15;
        self.gain = (255 - reduction.clamp(0, 255)) as u8;
    }
    /// Current gain, where 255 is unity
    pub fn gain(&self) -> u8 {
        self.gain
    }
}

/// Cycles the voice frequency through a list of notes
#[derive(Clone, Debug, Default)]
pub struct Arpeggio {
    notes: ArrayVec<u32, MAX_ARP_NOTES>,
    speed_ms: u16,
    index: usize,
    counter: u32,
}

impl Arpeggio {
    /// Replace the note list (frequencies in hundredths of a Hz).  Notes past
    /// the capacity are dropped.  An empty list disables the arpeggio.
    pub fn set(&mut self, speed_ms: u16, notes: &[u32]) {
        self.notes.clear();
        let n = notes.len().min(MAX_ARP_NOTES);
        // cannot fail: bounded by capacity above
        let _ = self.notes.try_extend_from_slice(&notes[..n]);
        self.speed_ms = speed_ms;
        self.restart();
    }
    /// Remove all notes
    pub fn clear(&mut self) {
        self.notes.clear();
        self.restart();
    }
    /// Start again from the first note on the next tick
    pub fn restart(&mut self) {
        self.index = 0;
        self.counter = 0;
    }
    /// True if there are notes to cycle through
    pub fn is_active(&self) -> bool {
        !self.notes.is_empty()
    }
    /// The note list
    pub fn notes(&self) -> &[u32] {
        &self.notes
    }
    /// Index of the note that will play next
    pub fn index(&self) -> usize {
        self.index
    }
    /// Advance one control tick.  Returns the frequency to switch to when a
    /// new note starts.
    pub fn tick(&mut self, control_rate: u32) -> Option<u32> {
        if self.notes.is_empty() {
            return None;
        }
        let mut next = None;
        if self.counter == 0 {
            next = self.notes.get(self.index).copied();
            self.index = (self.index + 1) % self.notes.len();
            self.counter = ms_to_ticks(self.speed_ms as u32, control_rate).max(1);
        }
        self.counter -= 1;
        next
    }
}

/// A linear phase-increment ramp spread exactly over a whole number of
/// ticks.  The per-tick step is the integer quotient; the remainder is
/// distributed one unit at a time, so the target is hit exactly.
#[derive(Clone, Debug, Default)]
pub struct Glide {
    active: bool,
    delta: i64,
    rem: i64,
    rem_acc: i64,
    ticks_total: u32,
    ticks_left: u32,
    target_inc: u32,
    target_freq: u32,
}

impl Glide {
    /// Begin a glide from `from_inc` to `target_inc` over `ticks` ticks
    pub fn start(&mut self, from_inc: u32, target_inc: u32, target_freq: u32, ticks: u32) {
        let diff = target_inc as i64 - from_inc as i64;
        let ticks = ticks.max(1);
        self.delta = diff / ticks as i64;
        self.rem = diff % ticks as i64;
        self.rem_acc = 0;
        self.ticks_total = ticks;
        self.ticks_left = ticks;
        self.target_inc = target_inc;
        self.target_freq = target_freq;
        self.active = true;
    }
    /// Abandon the glide where it is
    pub fn cancel(&mut self) {
        self.active = false;
    }
    /// True while gliding
    pub fn is_active(&self) -> bool {
        self.active
    }
    /// Ticks left until the target is reached
    pub fn ticks_left(&self) -> u32 {
        self.ticks_left
    }
    /// Advance `inc` by one tick.  Returns the target frequency on the tick
    /// the glide completes.
    pub fn tick(&mut self, inc: &mut u32) -> Option<u32> {
        if !self.active || self.ticks_left == 0 {
            return None;
        }
        let mut next = *inc as i64 + self.delta;
        if self.rem != 0 {
            self.rem_acc += self.rem;
            if self.rem_acc.abs() >= self.ticks_total as i64 {
                let sign = self.rem.signum();
                next += sign;
                self.rem_acc -= sign * self.ticks_total as i64;
            }
        }
        *inc = next.clamp(0, u32::MAX as i64) as u32;
        self.ticks_left -= 1;
        if self.ticks_left == 0 {
            *inc = self.target_inc;
            self.active = false;
            return Some(self.target_freq);
        }
        None
    }
}
