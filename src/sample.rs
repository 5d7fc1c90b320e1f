//! Sample types, numeric sample buffers and the fixed-size PCM blocks sent to
//! the output channel.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpeakerError};

/// Numeric encoding of one audio sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    Int8,
    #[default]
    Int16,
    Int32,
    Float32,
    Float64,
}

impl SampleType {
    /// Size of one sample in bytes.
    pub fn width(self) -> usize {
        match self {
            SampleType::Int8 => 1,
            SampleType::Int16 => 2,
            SampleType::Int32 | SampleType::Float32 => 4,
            SampleType::Float64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, SampleType::Float32 | SampleType::Float64)
    }

    /// Largest representable magnitude of an integer type, used when scaling
    /// between integer and float samples. Floats have a full scale of 1.0.
    pub fn full_scale(self) -> f64 {
        match self {
            SampleType::Int8 => i8::MAX as f64,
            SampleType::Int16 => i16::MAX as f64,
            SampleType::Int32 => i32::MAX as f64,
            SampleType::Float32 | SampleType::Float64 => 1.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SampleType::Int8 => "int8",
            SampleType::Int16 => "int16",
            SampleType::Int32 => "int32",
            SampleType::Float32 => "float32",
            SampleType::Float64 => "float64",
        }
    }
}

impl Display for SampleType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SampleType {
    type Err = SpeakerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "int8" => Ok(SampleType::Int8),
            "int16" => Ok(SampleType::Int16),
            "int32" => Ok(SampleType::Int32),
            "float32" => Ok(SampleType::Float32),
            "float64" => Ok(SampleType::Float64),
            other => Err(SpeakerError::invalid(format!("unknown sample type '{other}'"))),
        }
    }
}

/// Interleaved sample storage in the type it was produced in.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleData {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl SampleData {
    pub fn sample_type(&self) -> SampleType {
        match self {
            SampleData::I8(_) => SampleType::Int8,
            SampleData::I16(_) => SampleType::Int16,
            SampleData::I32(_) => SampleType::Int32,
            SampleData::F32(_) => SampleType::Float32,
            SampleData::F64(_) => SampleType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SampleData::I8(v) => v.len(),
            SampleData::I16(v) => v.len(),
            SampleData::I32(v) => v.len(),
            SampleData::F32(v) => v.len(),
            SampleData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw value at `index`, widened to f64 without any scaling.
    pub(crate) fn value(&self, index: usize) -> f64 {
        match self {
            SampleData::I8(v) => v[index] as f64,
            SampleData::I16(v) => v[index] as f64,
            SampleData::I32(v) => v[index] as f64,
            SampleData::F32(v) => v[index] as f64,
            SampleData::F64(v) => v[index],
        }
    }
}

/// A numeric sample array, optionally multi-channel (interleaved frames).
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    data: SampleData,
    channels: usize,
}

impl SampleBuffer {
    pub fn new(data: SampleData, channels: usize) -> Result<Self> {
        if channels == 0 {
            return Err(SpeakerError::invalid("sample buffer needs at least one channel"));
        }
        if data.len() % channels != 0 {
            return Err(SpeakerError::invalid(format!(
                "{} samples don't divide into {channels} channels",
                data.len()
            )));
        }
        Ok(Self { data, channels })
    }

    pub fn mono(data: SampleData) -> Self {
        Self { data, channels: 1 }
    }

    pub fn data(&self) -> &SampleData {
        &self.data
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_type(&self) -> SampleType {
        self.data.sample_type()
    }

    pub fn frames(&self) -> usize {
        self.data.len() / self.channels
    }

    /// Mono value of `frame`: the mean across channels, unscaled.
    pub(crate) fn frame_value(&self, frame: usize) -> f64 {
        let start = frame * self.channels;
        let sum: f64 = (start..start + self.channels)
            .map(|i| self.data.value(i))
            .sum();
        sum / self.channels as f64
    }
}

impl From<Vec<i16>> for SampleBuffer {
    fn from(samples: Vec<i16>) -> Self {
        SampleBuffer::mono(SampleData::I16(samples))
    }
}

impl From<Vec<f32>> for SampleBuffer {
    fn from(samples: Vec<f32>) -> Self {
        SampleBuffer::mono(SampleData::F32(samples))
    }
}

/// One immutable chunk of little-endian mono PCM. Every block of a session
/// has the same length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioBlock(Bytes);

impl AudioBlock {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        AudioBlock(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Lazy sequence of blocks produced for one play request.
pub type BlockStream = Box<dyn Iterator<Item = AudioBlock> + Send>;

/// Format of one playback session, announced to the output channel on open.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct StreamDescriptor {
    pub sample_rate: u32,
    pub sample_type: SampleType,
    pub block_size: usize,
}

impl StreamDescriptor {
    pub fn block_bytes(&self) -> usize {
        self.block_size * self.sample_type.width()
    }

    /// Playback duration of one block in seconds.
    pub fn block_duration(&self) -> f64 {
        self.block_size as f64 / self.sample_rate as f64
    }
}

/// Number of samples in a block of `block_duration` seconds at `sample_rate`.
pub fn block_size_for(sample_rate: u32, block_duration: f64) -> Result<usize> {
    if sample_rate == 0 {
        return Err(SpeakerError::invalid("sample rate must be positive"));
    }
    if !(block_duration.is_finite() && block_duration > 0.0) {
        return Err(SpeakerError::invalid(format!(
            "block duration must be positive, got {block_duration}"
        )));
    }
    let size = (sample_rate as f64 * block_duration).round() as usize;
    if size == 0 {
        return Err(SpeakerError::invalid(format!(
            "block duration {block_duration}s holds no samples at {sample_rate} Hz"
        )));
    }
    Ok(size)
}
