//! Various utility functions and helpful constants

// currently the only users of this function are unit tests
#[cfg(test)]
/// The interval from `base` up to `freq`, in cents
pub fn calculate_cents(base: f32, freq: f32) -> f32 {
    1200.0 * f32::log2(freq / base)
}

/// A character depicting a sine wave (∿)
pub const SIN_CHARSTR: &str = "\u{223F}";
/// A character depicting a square wave (⎍).
/// This is actually the Unicode "monostable symbol"
pub const SQ_CHARSTR: &str = "\u{238D}";
/// A character depicting a triangle wave (Λ).  This is the greek capital
/// lambda, so use a sans-serif font for this to appear correct
pub const TRI_CHARSTR: &str = "\u{039B}";
/// A character depicting a sawtooth wave (⩘).  This is the "sloping large and".
pub const SAW_CHARSTR: &str = "\u{2A58}";
/// A character depicting noise (≋), the "triple tilde"
pub const NOISE_CHARSTR: &str = "\u{224B}";
