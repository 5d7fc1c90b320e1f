//! Block codec: turns sample buffers into fixed-width byte blocks of a target
//! sample type, zero-padding the final partial block.
//!
//! Both iterators are lazy. Conversion happens one block at a time, so a
//! consumer that stops early never pays for the rest of the buffer.

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use crate::sample::{AudioBlock, SampleBuffer, SampleType};

/// Encode `samples` into blocks of `block_size` samples of `target` type.
///
/// Multi-channel input is down-mixed to mono by averaging each frame.
pub fn encode_blocks(samples: SampleBuffer, target: SampleType, block_size: usize) -> SampleBlocks {
    SampleBlocks {
        samples,
        target,
        block_size,
        next_frame: 0,
    }
}

/// Chunk pre-encoded bytes into blocks of `block_size` samples of `target`
/// type. No numeric conversion is applied.
pub fn raw_blocks(data: Bytes, target: SampleType, block_size: usize) -> RawBlocks {
    RawBlocks {
        data,
        block_bytes: block_size * target.width(),
        offset: 0,
    }
}

/// Convert one unscaled sample value between sample types.
///
/// float -> int scales by the destination's full scale, int -> float divides
/// by the source's full scale, same-family conversions are a plain cast.
pub fn convert_sample(value: f64, from: SampleType, to: SampleType) -> f64 {
    match (from.is_float(), to.is_float()) {
        (true, false) => value * to.full_scale(),
        (false, true) => value / from.full_scale(),
        _ => value,
    }
}

// Float -> int casts saturate at the integer bounds and truncate toward zero.
fn write_sample(out: &mut [u8], value: f64, to: SampleType) {
    match to {
        SampleType::Int8 => out[0] = (value as i8) as u8,
        SampleType::Int16 => LittleEndian::write_i16(out, value as i16),
        SampleType::Int32 => LittleEndian::write_i32(out, value as i32),
        SampleType::Float32 => LittleEndian::write_f32(out, value as f32),
        SampleType::Float64 => LittleEndian::write_f64(out, value),
    }
}

fn blocks_needed(len: usize, per_block: usize) -> usize {
    if per_block == 0 {
        0
    } else {
        len.div_ceil(per_block)
    }
}

pub struct SampleBlocks {
    samples: SampleBuffer,
    target: SampleType,
    block_size: usize,
    next_frame: usize,
}

impl Iterator for SampleBlocks {
    type Item = AudioBlock;

    fn next(&mut self) -> Option<AudioBlock> {
        let frames = self.samples.frames();
        if self.block_size == 0 || self.next_frame >= frames {
            return None;
        }

        let width = self.target.width();
        let source_type = self.samples.sample_type();
        let end = (self.next_frame + self.block_size).min(frames);

        // Zero-initialized, so the tail of a short final block is already padding
        let mut block = vec![0u8; self.block_size * width];
        for (i, frame) in (self.next_frame..end).enumerate() {
            let value = convert_sample(self.samples.frame_value(frame), source_type, self.target);
            write_sample(&mut block[i * width..(i + 1) * width], value, self.target);
        }

        self.next_frame = end;
        Some(AudioBlock::new(block))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = blocks_needed(
            self.samples.frames().saturating_sub(self.next_frame),
            self.block_size,
        );
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SampleBlocks {}

pub struct RawBlocks {
    data: Bytes,
    block_bytes: usize,
    offset: usize,
}

impl Iterator for RawBlocks {
    type Item = AudioBlock;

    fn next(&mut self) -> Option<AudioBlock> {
        if self.block_bytes == 0 || self.offset >= self.data.len() {
            return None;
        }

        let end = (self.offset + self.block_bytes).min(self.data.len());
        let block = if end - self.offset == self.block_bytes {
            self.data.slice(self.offset..end)
        } else {
            let mut padded = self.data[self.offset..end].to_vec();
            padded.resize(self.block_bytes, 0);
            Bytes::from(padded)
        };

        self.offset = end;
        Some(AudioBlock::new(block))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = blocks_needed(
            self.data.len().saturating_sub(self.offset),
            self.block_bytes,
        );
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RawBlocks {}
