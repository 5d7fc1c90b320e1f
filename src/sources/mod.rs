//! Source normalization.
//!
//! Every kind of playable source is resolved once into a [`Source`] variant
//! and normalized into the same shape: the effective sample rate, the
//! effective block size and a lazy sequence of fixed-size PCM blocks.

pub mod espeak;
pub mod fetch;
pub mod symphonia;
pub mod tone;
pub mod wav;

use std::fmt::{Debug, Formatter};
use std::io::Read;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::codec::{encode_blocks, raw_blocks};
use crate::error::{Result, SpeakerError};
use crate::sample::{block_size_for, BlockStream, SampleBuffer, SampleType};

/// A playable source, resolved once at the entry of a play request.
pub enum Source {
    /// Encoded audio file on disk
    File(PathBuf),
    /// Encoded audio behind an HTTP(S) URL
    Url(String),
    /// Encoded audio read from a byte-stream handle
    Reader(Box<dyn Read + Send>),
    /// Numeric samples, converted to the requested sample type
    Samples(SampleBuffer),
    /// PCM already in the requested sample type, only chunked and padded
    Raw(Bytes),
    /// Pre-chunked blocks, passed through untouched
    Blocks(BlockStream),
}

impl Source {
    /// Interpret a string as a URL or a file path.
    pub fn parse(location: &str) -> Result<Source> {
        let lower = location.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(Source::Url(location.to_string()))
        } else if let Some((scheme, _)) = location.split_once("://") {
            Err(SpeakerError::unsupported(format!(
                "'{scheme}' URLs can't be played: {location}"
            )))
        } else {
            Ok(Source::File(PathBuf::from(location)))
        }
    }

    pub fn reader(reader: impl Read + Send + 'static) -> Source {
        Source::Reader(Box::new(reader))
    }

    pub fn blocks<I>(blocks: I) -> Source
    where
        I: IntoIterator<Item = crate::sample::AudioBlock>,
        I::IntoIter: Send + 'static,
    {
        Source::Blocks(Box::new(blocks.into_iter()))
    }

    fn kind(&self) -> &'static str {
        match self {
            Source::File(_) => "file",
            Source::Url(_) => "url",
            Source::Reader(_) => "reader",
            Source::Samples(_) => "samples",
            Source::Raw(_) => "raw",
            Source::Blocks(_) => "blocks",
        }
    }
}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::File(path) => write!(f, "File({})", path.display()),
            Source::Url(url) => write!(f, "Url({url})"),
            Source::Samples(samples) => write!(
                f,
                "Samples({} frames of {} x {})",
                samples.frames(),
                samples.channels(),
                samples.sample_type()
            ),
            Source::Raw(data) => write!(f, "Raw({} bytes)", data.len()),
            other => write!(f, "{}", other.kind()),
        }
    }
}

impl From<SampleBuffer> for Source {
    fn from(samples: SampleBuffer) -> Self {
        Source::Samples(samples)
    }
}

impl From<Bytes> for Source {
    fn from(data: Bytes) -> Self {
        Source::Raw(data)
    }
}

impl From<Vec<u8>> for Source {
    fn from(data: Vec<u8>) -> Self {
        Source::Raw(Bytes::from(data))
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::File(path)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Source::File(path.to_path_buf())
    }
}

/// Requested stream format. For file sources `sample_rate` is a ceiling:
/// the file's own rate is kept when it's lower.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamHint {
    pub sample_rate: u32,
    pub sample_type: SampleType,
    pub block_duration: f64,
}

pub struct NormalizedSource {
    pub sample_rate: u32,
    pub block_size: usize,
    pub blocks: BlockStream,
}

impl Debug for NormalizedSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizedSource")
            .field("sample_rate", &self.sample_rate)
            .field("block_size", &self.block_size)
            .finish_non_exhaustive()
    }
}

/// Decoded audio at its effective rate, before block encoding.
#[derive(Debug)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub samples: SampleBuffer,
}

pub async fn normalize(src: Source, hint: &StreamHint) -> Result<NormalizedSource> {
    let block_size = block_size_for(hint.sample_rate, hint.block_duration)?;
    debug!("Normalizing {src:?} with {hint:?}");

    let normalized = match src {
        Source::File(path) => {
            let extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.to_ascii_lowercase());
            let data = fetch::read_file(&path).await?;
            decode_encoded(data, extension, hint).await?
        }
        Source::Url(url) => {
            let data = fetch::get_url(&url).await?;
            decode_encoded(data, fetch::extension_of(&url), hint).await?
        }
        Source::Reader(reader) => {
            let data = fetch::read_stream(reader).await?;
            decode_encoded(data, None, hint).await?
        }
        Source::Samples(samples) => NormalizedSource {
            sample_rate: hint.sample_rate,
            block_size,
            blocks: Box::new(encode_blocks(samples, hint.sample_type, block_size)),
        },
        Source::Raw(data) => NormalizedSource {
            sample_rate: hint.sample_rate,
            block_size,
            blocks: Box::new(raw_blocks(data, hint.sample_type, block_size)),
        },
        Source::Blocks(blocks) => NormalizedSource {
            sample_rate: hint.sample_rate,
            block_size,
            blocks,
        },
    };

    debug!(
        "Normalized source: {} Hz, {} samples per block",
        normalized.sample_rate, normalized.block_size
    );
    Ok(normalized)
}

async fn decode_encoded(
    data: Bytes,
    extension: Option<String>,
    hint: &StreamHint,
) -> Result<NormalizedSource> {
    let ceiling = hint.sample_rate;
    let decoded =
        tokio::task::spawn_blocking(move || decode(data, extension.as_deref(), ceiling)).await??;

    let block_size = block_size_for(decoded.sample_rate, hint.block_duration)?;
    Ok(NormalizedSource {
        sample_rate: decoded.sample_rate,
        block_size,
        blocks: Box::new(encode_blocks(decoded.samples, hint.sample_type, block_size)),
    })
}

/// Decode encoded audio, preferring the native WAV reader and falling back
/// to the general-purpose decoder when it declines the format or the file's
/// rate exceeds `max_sample_rate`.
pub fn decode(data: Bytes, extension: Option<&str>, max_sample_rate: u32) -> Result<DecodedAudio> {
    let primary = match wav::decode(&data) {
        Ok(decoded) if decoded.sample_rate <= max_sample_rate => {
            debug!("Decoded natively at {} Hz", decoded.sample_rate);
            return Ok(decoded);
        }
        Ok(decoded) => format!(
            "native rate {} Hz exceeds {max_sample_rate} Hz",
            decoded.sample_rate
        ),
        Err(e) => e.to_string(),
    };

    debug!("Primary decoder declined ({primary}), falling back to symphonia");

    self::symphonia::decode(data, extension, max_sample_rate).map_err(|e| {
        SpeakerError::Decode {
            primary,
            fallback: format!("{e:#}"),
        }
    })
}
