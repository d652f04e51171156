//! This module provides objects to reason about the processing context:
//! the audio sample rate, the rate at which modulation is evaluated, and the
//! depth of the samples handed to the output stage.

use crate::output::OutputDepth;
use crate::DEFAULT_CONTROL_RATE_HZ;

/// The lowest supported sample rate.  Envelope timing is computed in
/// samples per millisecond, so anything lower would round to zero.
pub const MIN_SAMPLE_RATE: u32 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// A fixed-point processing context.  This is fixed for the lifetime of a
/// [crate::Synth], with the exception of the control rate, which may be
/// changed at runtime through [crate::Synth::set_control_rate].
pub struct Context {
    sample_rate: u32,
    control_rate_hz: u16,
    output_depth: OutputDepth,
}

impl Context {
    /// Create a new context with a sample rate of 44.1kHz
    pub const fn new_441() -> Self {
        Self {
            sample_rate: 44100,
            control_rate_hz: DEFAULT_CONTROL_RATE_HZ,
            output_depth: OutputDepth::Bits16,
        }
    }
    /// Create a new context with a sample rate of 48kHz
    pub const fn new_480() -> Self {
        Self {
            sample_rate: 48000,
            control_rate_hz: DEFAULT_CONTROL_RATE_HZ,
            output_depth: OutputDepth::Bits16,
        }
    }
    /// Create a context if the sample rate provided is supported, or
    /// return `None` otherwise.
    pub fn maybe_create(sample_rate: u32) -> Option<Self> {
        if sample_rate < MIN_SAMPLE_RATE {
            None
        } else {
            Some(Self {
                sample_rate,
                ..Self::new_480()
            })
        }
    }
    /// Replace the control rate.  A rate of zero is treated as 1Hz.
    pub const fn with_control_rate(mut self, hz: u16) -> Self {
        self.control_rate_hz = if hz == 0 { 1 } else { hz };
        self
    }
    /// Replace the output depth
    pub const fn with_output_depth(mut self, depth: OutputDepth) -> Self {
        self.output_depth = depth;
        self
    }
    /// The sample rate, in Hz
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
    /// The control rate, in Hz
    pub const fn control_rate(&self) -> u16 {
        self.control_rate_hz
    }
    /// The output depth
    pub const fn output_depth(&self) -> OutputDepth {
        self.output_depth
    }
    /// Number of output samples between control ticks (never zero)
    pub const fn control_interval(&self) -> u32 {
        let interval = self.sample_rate / self.control_rate_hz as u32;
        if interval == 0 {
            1
        } else {
            interval
        }
    }
    /// Output samples per millisecond, used for envelope timing (never zero)
    pub const fn samples_per_ms(&self) -> u32 {
        let spm = self.sample_rate / 1000;
        if spm == 0 {
            1
        } else {
            spm
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new_480()
    }
}

impl TryFrom<u32> for Context {
    type Error = &'static str;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::maybe_create(value).ok_or("Unsupported Sample Rate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_interval() {
        assert_eq!(Context::new_480().control_interval(), 480);
        assert_eq!(Context::new_441().control_interval(), 441);
        let fast = Context::new_480().with_control_rate(u16::MAX);
        assert_eq!(fast.control_interval(), 1);
        assert_eq!(Context::new_480().with_control_rate(0).control_rate(), 1);
    }
    #[test]
    fn creation() {
        assert!(Context::maybe_create(999).is_none());
        let ctx = Context::try_from(22050).unwrap();
        assert_eq!(ctx.sample_rate(), 22050);
        assert_eq!(ctx.samples_per_ms(), 22);
        assert_eq!(ctx.output_depth(), OutputDepth::Bits16);
    }
}
