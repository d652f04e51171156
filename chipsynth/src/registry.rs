//! Borrowed sample and wavetable data, and the ID-addressed tables the engine
//! resolves them through.
//!
//! The engine never copies or frees audio data.  Everything registered here is
//! a reference into caller-owned storage (on a microcontroller, usually flash),
//! which must outlive the [crate::Synth] it is registered with.

use crate::{MAX_SAMPLES, MAX_WAVETABLES};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Storage format of a [Wavetable]
pub enum BitDepth {
    /// Signed 16 bit samples
    Bits16,
    /// Unsigned 8 bit samples, biased by 128
    Bits8,
    /// Unsigned 4 bit samples, biased by 8 and packed two per byte with the
    /// even-indexed entry in the low nibble
    Bits4,
}

impl BitDepth {
    /// The number of bits per entry
    pub const fn bits(&self) -> u8 {
        match self {
            Self::Bits16 => 16,
            Self::Bits8 => 8,
            Self::Bits4 => 4,
        }
    }
}

impl TryFrom<u8> for BitDepth {
    type Error = &'static str;
    fn try_from(value: u8) -> Result<Self, &'static str> {
        match value {
            16 => Ok(Self::Bits16),
            8 => Ok(Self::Bits8),
            4 => Ok(Self::Bits4),
            _ => Err("Unsupported wavetable bit depth"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
/// The raw storage behind a [Wavetable]
pub enum WavetableData<'a> {
    /// Signed 16 bit samples
    Bits16(&'a [i16]),
    /// Unsigned 8 bit samples
    Bits8(&'a [u8]),
    /// Packed unsigned 4 bit samples
    Bits4(&'a [u8]),
}

#[derive(Clone, Copy, Debug)]
/// One cycle of a waveform, read by phase.
///
/// The logical size is always clamped to what the backing slice can hold, so
/// any index derived from a phase is in bounds.
pub struct Wavetable<'a> {
    data: WavetableData<'a>,
    size: u32,
}

impl<'a> Wavetable<'a> {
    /// Create a wavetable of `size` entries over the given storage.  A size
    /// of zero, or one larger than the storage holds, is clamped to the
    /// storage capacity.
    pub fn new(data: WavetableData<'a>, size: u32) -> Self {
        let capacity = match data {
            WavetableData::Bits16(d) => d.len(),
            WavetableData::Bits8(d) => d.len(),
            WavetableData::Bits4(d) => d.len().saturating_mul(2),
        };
        let capacity = u32::try_from(capacity).unwrap_or(u32::MAX);
        let size = if size == 0 || size > capacity {
            capacity
        } else {
            size
        };
        Self { data, size }
    }
    /// A 16 bit wavetable spanning the whole slice
    pub fn new_16(data: &'a [i16]) -> Self {
        Self::new(WavetableData::Bits16(data), 0)
    }
    /// An 8 bit wavetable spanning the whole slice
    pub fn new_8(data: &'a [u8]) -> Self {
        Self::new(WavetableData::Bits8(data), 0)
    }
    /// A 4 bit wavetable of `size` nibbles
    pub fn new_4(data: &'a [u8], size: u32) -> Self {
        Self::new(WavetableData::Bits4(data), size)
    }
    /// The number of entries in one cycle
    pub const fn size(&self) -> u32 {
        self.size
    }
    /// The backing storage
    pub const fn data(&self) -> WavetableData<'a> {
        self.data
    }
    /// The storage format
    pub const fn depth(&self) -> BitDepth {
        match self.data {
            WavetableData::Bits16(_) => BitDepth::Bits16,
            WavetableData::Bits8(_) => BitDepth::Bits8,
            WavetableData::Bits4(_) => BitDepth::Bits4,
        }
    }
    /// True if the table has no entries (and so renders silence)
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }
    /// The entry at `idx`, widened to a signed 16 bit sample
    #[inline]
    pub fn at(&self, idx: usize) -> i16 {
        match self.data {
            WavetableData::Bits16(d) => d[idx],
            WavetableData::Bits8(d) => (d[idx] as i16 - 128) << 8,
            WavetableData::Bits4(d) => {
                let nibble = (d[idx >> 1] >> ((idx & 1) << 2)) & 0xF;
                (nibble as i16 - 8) * 4096
            }
        }
    }
    /// The entry selected by a 32 bit phase
    #[inline]
    pub fn at_phase(&self, phase: u32) -> i16 {
        self.at(crate::fixedmath::table_index(phase, self.size))
    }
}

#[derive(Clone, Copy, Debug)]
/// A mono 16 bit PCM recording
pub struct SampleData<'a> {
    /// The frames of the recording
    pub data: &'a [i16],
    /// The rate the recording was made at, in Hz
    pub sample_rate: u32,
    /// The pitch the recording plays at its native rate, in hundredths of a Hz
    pub root_centihz: u32,
}

impl<'a> SampleData<'a> {
    /// Create a new sample descriptor
    pub const fn new(data: &'a [i16], sample_rate: u32, root_centihz: u32) -> Self {
        Self {
            data,
            sample_rate,
            root_centihz,
        }
    }
    /// Length in frames
    pub const fn len(&self) -> u32 {
        if self.data.len() > u32::MAX as usize {
            u32::MAX
        } else {
            self.data.len() as u32
        }
    }
    /// True if there are no frames
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Fixed-capacity tables mapping small integer IDs to registered data
pub struct Registry<'a> {
    samples: [Option<SampleData<'a>>; MAX_SAMPLES],
    wavetables: [Option<Wavetable<'a>>; MAX_WAVETABLES],
}

impl<'a> Default for Registry<'a> {
    fn default() -> Self {
        Self {
            samples: [None; MAX_SAMPLES],
            wavetables: [None; MAX_WAVETABLES],
        }
    }
}

impl<'a> Registry<'a> {
    /// Register (or replace) the sample with the given ID
    pub fn register_sample(&mut self, id: u16, sample: SampleData<'a>) -> Result<(), &'static str> {
        let slot = self
            .samples
            .get_mut(id as usize)
            .ok_or("Sample ID out of range")?;
        *slot = Some(sample);
        Ok(())
    }
    /// Register (or replace) the wavetable with the given ID
    pub fn register_wavetable(&mut self, id: u16, table: Wavetable<'a>) -> Result<(), &'static str> {
        let slot = self
            .wavetables
            .get_mut(id as usize)
            .ok_or("Wavetable ID out of range")?;
        *slot = Some(table);
        Ok(())
    }
    /// Look up a registered sample
    pub fn sample(&self, id: u16) -> Option<&SampleData<'a>> {
        self.samples.get(id as usize).and_then(Option::as_ref)
    }
    /// Look up a registered wavetable
    pub fn wavetable(&self, id: u16) -> Option<&Wavetable<'a>> {
        self.wavetables.get(id as usize).and_then(Option::as_ref)
    }
}
