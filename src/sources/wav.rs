//! Primary decoder: reads PCM WAV natively with hound.

use std::borrow::Cow;
use std::io::Cursor;

use anyhow::{bail, Result};
use byteorder::{ByteOrder, LittleEndian};
use hound::{SampleFormat, WavReader};

use crate::sample::{SampleBuffer, SampleData};
use crate::sources::DecodedAudio;

const RIFF_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

pub fn decode(data: &[u8]) -> Result<DecodedAudio> {
    let data = fit_chunk_sizes(data);
    let mut reader = WavReader::new(Cursor::new(data.as_ref()))?;
    let spec = reader.spec();

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => {
            SampleData::I16(reader.samples::<i16>().collect::<Result<_, _>>()?)
        }
        // Other integer depths have no matching sample type, so they are
        // scaled by their own full scale into [-1, 1)
        (SampleFormat::Int, bits @ (8 | 24 | 32)) => {
            let full_scale = (1u64 << (bits - 1)) as f64;
            SampleData::F64(
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|s| s as f64 / full_scale))
                    .collect::<Result<_, _>>()?,
            )
        }
        (SampleFormat::Float, 32) => {
            SampleData::F32(reader.samples::<f32>().collect::<Result<_, _>>()?)
        }
        (format, bits) => bail!("Unsupported WAV sample format {format:?} with {bits} bits"),
    };

    Ok(DecodedAudio {
        sample_rate: spec.sample_rate,
        samples: SampleBuffer::new(samples, spec.channels as usize)?,
    })
}

/// Clamps the RIFF and `data` chunk sizes to what is actually in `data`.
///
/// Streaming writers put placeholder sizes in the header. The buffer is only
/// copied when a size needs fixing.
fn fit_chunk_sizes(data: &[u8]) -> Cow<'_, [u8]> {
    if data.len() < RIFF_HEADER_LEN || &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Cow::Borrowed(data);
    }

    let mut patches = Vec::new();
    let riff_size = (data.len() - CHUNK_HEADER_LEN) as u32;
    if LittleEndian::read_u32(&data[4..8]) > riff_size {
        patches.push((4, riff_size));
    }

    let mut block_align = 1;
    let mut pos = RIFF_HEADER_LEN;
    while pos + CHUNK_HEADER_LEN <= data.len() {
        let id = &data[pos..pos + 4];
        let size = LittleEndian::read_u32(&data[pos + 4..pos + 8]) as usize;
        let body = pos + CHUNK_HEADER_LEN;

        if id == b"fmt " && body + 14 <= data.len() {
            block_align = LittleEndian::read_u16(&data[body + 12..body + 14]).max(1) as usize;
        }

        if id == b"data" {
            let available = data.len() - body;
            if size > available {
                let whole_frames = available - available % block_align;
                debug!("WAV data chunk claims {size} bytes, using {whole_frames}");
                patches.push((pos + 4, whole_frames as u32));
            }
            break;
        }

        // Chunks are padded to an even length
        pos = body.saturating_add(size).saturating_add(size & 1);
    }

    if patches.is_empty() {
        return Cow::Borrowed(data);
    }

    let mut fixed = data.to_vec();
    for (offset, value) in patches {
        LittleEndian::write_u32(&mut fixed[offset..offset + 4], value);
    }
    Cow::Owned(fixed)
}
