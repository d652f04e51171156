//! This crate contains the synthesis engine for a small polyphonic chip-style
//! synthesizer.  It is designed for microcontrollers: everything on the audio
//! and control paths is integer or fixed-point arithmetic, nothing allocates,
//! and all sample and wavetable data is borrowed from the caller (usually from
//! flash) rather than copied.
//!
//! Most users only need [Synth]: build one from a [context::Context], register
//! wavetables and samples, then call [Synth::render] once per output block from
//! the audio driver.  Mutations coming from another execution context should be
//! queued as [Command]s and applied between blocks with [Synth::apply].
//!
//! Fixed-point quantities follow the crate convention of a `FxP` suffix on the
//! type aliases, to keep the location of the binary point in the type system.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

mod fixedmath;
pub mod util;

pub mod command;
pub mod context;
pub mod devices;
pub mod instrument;
pub mod output;
pub mod registry;
pub mod synth;
pub mod voice;

pub use command::Command;
pub use context::Context;
pub use instrument::{SampleInstrument, SampleZone, Stage, TrackerInstrument, WaveSelect};
pub use output::{OutputDepth, OutputSample, OutputSink};
pub use registry::{BitDepth, SampleData, Wavetable};
pub use synth::Synth;
pub use voice::{EnvParams, EnvStage, LoopMode, SampleLoop, WaveType};

pub use fixedmath::midi_note_to_centihz;
pub use fixedmath::midi_note_to_frequency;
pub use fixedmath::Frequency as FrequencyFxP;
pub use fixedmath::Note as NoteFxP;

/// A 32 bit oscillator phase, covering one full cycle over `[0, 1)`.
pub type PhaseFxP = fixedmath::U0F32;
/// An envelope level.  Full scale is exactly `1.0`, i.e. `1 << 28` in bits.
pub type EnvFxP = fixedmath::U4F28;
/// A playback position within a sample, in frames, with 16 fractional bits.
pub type SamplePosFxP = fixedmath::U48F16;
/// A sample playback rate, in frames per output sample, with 16 fractional bits.
pub type SampleIncFxP = fixedmath::U16F16;

/// The number of voices in a [Synth] unless overridden.
pub const MAX_VOICES: usize = 80;
/// The number of wavetable IDs available for registration.
pub const MAX_WAVETABLES: usize = 1000;
/// The number of sample IDs available for registration.
pub const MAX_SAMPLES: usize = 100;
/// The maximum number of notes in an arpeggio.
pub const MAX_ARP_NOTES: usize = 16;
/// The largest block that is mixed in one pass.  Longer output buffers are
/// processed in chunks of this size.
pub const MAX_BLOCK_SIZE: usize = 512;
/// The default control-rate tick frequency, in Hz.
pub const DEFAULT_CONTROL_RATE_HZ: u16 = 100;
