//! Fixed-point math used internally by the engine.
//!
//! As with any embedded audio code, all of these functions prioritize
//! speed over accuracy.  Lookup tables are generated at compile time so
//! nothing needs to run at boot.

pub use fixed::types::*;

/// A unsigned 16 bit fixed point number representing a note/pitch, with 7 integral
/// bits and 9 fractional.  The integral bits correspond to the MIDI note numbers,
/// i.e. a value of 69.0 represents A440 and tuning is 12 tone equal temprament.
pub type Note = U7F9;
/// A unsigned 32 bit fixed point number representing a frequency in Hz.
/// This uses 14 integral bits and 18 fractional bits
pub type Frequency = U14F18; // 14 bits will hold the highest MIDI freq
/// A unsigned 16 bit fixed point number in the interval `[0, 1)`.
pub type Scalar = U0F16;

const FRAC_2_3: Scalar = Scalar::lit("0x0.aaab"); //0x0.a repeating

// (4/3)*ln(2)
const FRAC_4LN2_3: Scalar = Scalar::lit("0x0.ec98");
// Frequency of E4 ~= 329.63 Hz
const FREQ_E4: Frequency = Frequency::lit("329.627557");

/// log2 of the number of entries in [SINE_TABLE]
pub const SINE_TABLE_BITS: u32 = 12;
/// Number of entries in [SINE_TABLE]
pub const SINE_TABLE_SIZE: usize = 1 << SINE_TABLE_BITS;
/// Peak value stored in [SINE_TABLE].  Leaves a little headroom below
/// `i32::MAX` so that interpolation and scaling never wrap.
pub const SINE_AMPLITUDE: i32 = 1_050_000_000;

const fn f_abs(x: f64) -> f64 {
    if x < 0f64 {
        -x
    } else {
        x
    }
}

// Taylor series for sin(x), valid (and converging quickly) for |x| <= pi
const fn sin_taylor(x: f64) -> f64 {
    const DELTA: f64 = 1e-12;
    let mut n = 1u32;
    let mut term = x;
    let mut acc = x;
    while f_abs(term) > DELTA {
        let denom = ((2 * n) * (2 * n + 1)) as f64;
        term = -term * x * x / denom;
        acc += term;
        n += 1;
    }
    acc
}

const fn generate_sine() -> [i32; SINE_TABLE_SIZE] {
    const HALF: usize = SINE_TABLE_SIZE / 2;
    let mut table = [0i32; SINE_TABLE_SIZE];
    let mut i = 0usize;
    while i < SINE_TABLE_SIZE {
        // map the upper half onto [-pi, 0) so the series stays accurate
        let signed = if i < HALF {
            i as f64
        } else {
            i as f64 - SINE_TABLE_SIZE as f64
        };
        let theta = core::f64::consts::PI * signed / HALF as f64;
        let value = sin_taylor(theta) * SINE_AMPLITUDE as f64;
        let rounded = if value < 0f64 {
            value - 0.5
        } else {
            value + 0.5
        };
        table[i] = rounded as i32;
        i += 1;
    }
    table
}

/// One full cycle of a sine wave, with a peak of [SINE_AMPLITUDE]
pub static SINE_TABLE: [i32; SINE_TABLE_SIZE] = generate_sine();

/// Look up the sine of a 32 bit phase (one cycle per 2^32)
#[inline]
pub fn sine(phase: u32) -> i32 {
    SINE_TABLE[(phase >> (32 - SINE_TABLE_BITS)) as usize]
}

/// Convert a frequency in hundredths of a Hz into a per-sample phase
/// increment at the given sample rate.  Frequencies at or above the sample
/// rate saturate.
pub fn phase_increment(centihz: u32, sample_rate: u32) -> u32 {
    let denom = (sample_rate as u64 * 100).max(1);
    let inc = ((centihz as u64) << 32) / denom;
    u32::try_from(inc).unwrap_or(u32::MAX)
}

/// The inverse of [phase_increment] (modulo rounding)
pub fn centihz_from_increment(inc: u32, sample_rate: u32) -> u32 {
    ((inc as u64 * sample_rate as u64 * 100) >> 32) as u32
}

/// Number of whole ticks of a clock running at `rate_hz` needed to cover
/// `ms` milliseconds, rounded up
pub fn ms_to_ticks(ms: u32, rate_hz: u32) -> u32 {
    let ticks = (ms as u64 * rate_hz as u64).div_ceil(1000);
    u32::try_from(ticks).unwrap_or(u32::MAX)
}

/// Map a phase onto an index into a table of `size` entries
#[inline]
pub fn table_index(phase: u32, size: u32) -> usize {
    ((phase as u64 * size as u64) >> 32) as usize
}

/// calculate e^x in the range [-0.5, 0.5) using an order 4 Taylor series
fn exp_fixed_small(x: I0F16) -> U2F14 {
    // e^x ~= 1 + x * { 1 + x/2 * [ 1 + x/3 * ( 1 + x/4 )]}
    let c_nested = I3F29::ONE + I3F29::from_num(x).unwrapped_shr(2);
    let b = I0F16::from_num(x.wide_mul_unsigned(FRAC_2_3).unwrapped_shr(1));
    let b_nested = I3F29::ONE + I3F13::from_num(c_nested).wide_mul(b);
    let a = I3F13::from_num(I3F29::from_num(x).unwrapped_shr(1));
    let a_nested = I6F26::ONE + I3F13::from_num(b_nested).wide_mul(a);
    U2F14::from_num(x.wide_mul(I3F13::from_num(a_nested)) + I3F29::ONE)
}

/// Calculate e^x of a 16 bit signed fixed point number with 13 fractional bits
/// (that is to say, between -4 and 4), and return it as a unsigned 32 bit
/// number with 24 fractional bits.
fn exp_fixed(x: I3F13) -> U8F24 {
    // e^x ~= e^[int(x) + 1/2] * e^[frac(x) - 1/2]
    //
    // The integral part comes from the table below, scaled into [0, 1) along
    // with the number of right/left shifts needed to undo that scaling.
    const LOOKUP_TABLE: [(Scalar, u32, u32); 8] = [
        (Scalar::lit("0x0.f760"), 5, 0),
        (Scalar::lit("0x0.a81c"), 3, 0),
        (Scalar::lit("0x0.e47c"), 2, 0),
        (Scalar::lit("0x0.9b45"), 0, 0),
        (Scalar::lit("0x0.d309"), 0, 1),
        (Scalar::lit("0x0.8f69"), 0, 3),
        (Scalar::lit("0x0.c2eb"), 0, 4),
        (Scalar::lit("0x0.8476"), 0, 6),
    ];
    const ONE_HALF: I3F13 = I3F13::lit("0.5");
    // Note: x.int() rounds towards -inf, not zero for fixed point numbers
    let x_int = x.int().to_num::<i8>();
    let index = (x_int + 4) as usize;
    let frac_exp = exp_fixed_small(I0F16::from_num(x.frac() - ONE_HALF));
    let (multiplier, right, left) = LOOKUP_TABLE[index];
    let retval = U8F56::from_num(multiplier.wide_mul(frac_exp));
    U8F24::from_num(retval.unwrapped_shl(left).unwrapped_shr(right))
}

// Centre the note about zero and scale to 16 semitones per unit
fn note_to_value(note: Note) -> I3F13 {
    const C64: I19F13 = I19F13::lit("64");
    let note_signed = I19F13::from_num(note) - C64;
    I3F13::from_num(note_signed.unwrapped_shr(4))
}

/// Convert a MIDI note number to a frequency in Hz
pub fn midi_note_to_frequency(note: Note) -> Frequency {
    // f = f0 * e^(note/12), with 1.0 == 16 semitones after note_to_value,
    // so scale by (4/3)*ln(2) in one step
    let note_xform = note_to_value(note);
    let power = I3F13::from_num(note_xform.wide_mul_unsigned(FRAC_4LN2_3));
    FREQ_E4 * U14F18::from_num(exp_fixed(power))
}

/// Convert a MIDI note number into hundredths of a Hz, the unit used by the
/// [crate::Synth] control surface.  Notes above 127 are clamped.
pub fn midi_note_to_centihz(note: u8) -> u32 {
    let freq = midi_note_to_frequency(Note::from_num(note.min(127)));
    ((freq.to_bits() as u64 * 100 + (1 << 17)) >> 18) as u32
}

#[cfg(test)]
mod tests {
    use super::super::util::calculate_cents;
    use super::*;
    use fixed::traits::ToFixed;

    #[test]
    fn const_fraction_correctness() {
        assert_eq!(FRAC_2_3, Scalar::from_num(2.0 / 3.0));
    }
    #[test]
    fn midi_pitch_calculations() {
        for i in 0..=127 {
            let pitch = 440.0 * f32::powf(2.0, ((i - 69) as f32) / 12.0);
            let pitch_fixed = midi_note_to_frequency(i.to_fixed()).to_num::<f32>();
            let error = calculate_cents(pitch, pitch_fixed);
            assert!(error < 1.0); //less than one cent per note
        }
    }
    #[test]
    fn midi_centihz() {
        let a4 = midi_note_to_centihz(69) as i64;
        assert!((a4 - 44000).abs() < 30);
        assert_eq!(midi_note_to_centihz(200), midi_note_to_centihz(127));
    }
    #[test]
    fn sine_table_shape() {
        assert_eq!(SINE_TABLE[0], 0);
        assert_eq!(SINE_TABLE[SINE_TABLE_SIZE / 4], SINE_AMPLITUDE);
        assert_eq!(SINE_TABLE[3 * SINE_TABLE_SIZE / 4], -SINE_AMPLITUDE);
        for i in 0..SINE_TABLE_SIZE / 2 {
            let a = SINE_TABLE[i];
            let b = SINE_TABLE[i + SINE_TABLE_SIZE / 2];
            assert!((a + b).abs() <= 1, "asymmetry at {i}: {a} {b}");
        }
        for i in 1..SINE_TABLE_SIZE {
            let expected = (2.0 * std::f64::consts::PI * i as f64 / SINE_TABLE_SIZE as f64).sin();
            let actual = SINE_TABLE[i] as f64 / SINE_AMPLITUDE as f64;
            assert!((expected - actual).abs() < 1e-6);
        }
    }
    #[test]
    fn sine_lookup_uses_top_bits() {
        assert_eq!(sine(0x4000_0000), SINE_AMPLITUDE);
        assert_eq!(sine(0x400F_FFFF), SINE_AMPLITUDE);
    }
    #[test]
    fn phase_increment_math() {
        // 480 Hz at 48 kHz is one cycle per 100 samples
        let inc = phase_increment(48000, 48000);
        assert_eq!(inc, ((1u64 << 32) / 100) as u32);
        assert_eq!(phase_increment(u32::MAX, 8000), u32::MAX);
        let back = centihz_from_increment(phase_increment(44000, 44100), 44100);
        assert!((back as i64 - 44000).abs() <= 1);
    }
    #[test]
    fn tick_rounding() {
        assert_eq!(ms_to_ticks(10, 100), 1);
        assert_eq!(ms_to_ticks(11, 100), 2);
        assert_eq!(ms_to_ticks(0, 100), 0);
        assert_eq!(ms_to_ticks(1000, 60), 60);
    }
    #[test]
    fn table_indexing() {
        assert_eq!(table_index(0, 256), 0);
        assert_eq!(table_index(u32::MAX, 256), 255);
        assert_eq!(table_index(0x8000_0000, 100), 50);
    }
}
