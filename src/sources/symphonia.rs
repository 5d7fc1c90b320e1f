//! Fallback decoder: any container/codec symphonia understands, down-mixed
//! to mono and resampled down to the requested ceiling when needed.

use std::io::Cursor;

use anyhow::{Context, Result};
use bytes::Bytes;
use rubato::{FftFixedIn, Resampler};
use symphonia::core::audio::SampleBuffer as DecodeBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::sample::{SampleBuffer, SampleData};
use crate::sources::DecodedAudio;

const RESAMPLER_CHUNK_SIZE: usize = 1024;

pub fn decode(data: Bytes, extension: Option<&str>, max_sample_rate: u32) -> Result<DecodedAudio> {
    let (native_rate, mono) = decode_mono(data, extension)?;

    // Leave the rate alone unless it exceeds the ceiling
    if native_rate <= max_sample_rate {
        return Ok(DecodedAudio {
            sample_rate: native_rate,
            samples: SampleBuffer::mono(SampleData::F32(mono)),
        });
    }

    debug!("Resampling {native_rate} Hz -> {max_sample_rate} Hz");
    let resampled = resample(&mono, native_rate, max_sample_rate)?;

    Ok(DecodedAudio {
        sample_rate: max_sample_rate,
        samples: SampleBuffer::mono(SampleData::F32(resampled)),
    })
}

/// Decode the default track into mono f32 samples at its native rate.
fn decode_mono(data: Bytes, extension: Option<&str>) -> Result<(u32, Vec<f32>)> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .context("Could not find any tracks in file")?;

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;

    let mut mono = Vec::new();
    let mut sample_buf: Option<DecodeBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // Symphonia signals the end of the stream with UnexpectedEof
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let audio_buf = match decoder.decode(&packet) {
            Ok(audio_buf) => audio_buf,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping undecodable packet: {e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *audio_buf.spec();
        sample_rate.get_or_insert(spec.rate);
        let channels = spec.channels.count().max(1);

        // Packets may grow past the first one's capacity
        let capacity = audio_buf.capacity();
        if sample_buf
            .as_ref()
            .map_or(true, |buf| buf.capacity() < capacity * channels)
        {
            sample_buf = Some(DecodeBuffer::<f32>::new(capacity as u64, spec));
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(audio_buf);

        mono.extend(
            buf.samples()
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }

    let sample_rate = sample_rate.context("Stream has no sample rate")?;
    Ok((sample_rate, mono))
}

/// Resample mono audio with an FFT resampler, trimming its delay so the
/// output lines up with the input.
fn resample(input: &[f32], from: u32, to: u32) -> Result<Vec<f32>> {
    let mut resampler = FftFixedIn::<f64>::new(
        from as usize,
        to as usize,
        RESAMPLER_CHUNK_SIZE,
        2, // sub-chunks
        1, // mono
    )?;

    let delay = resampler.output_delay();
    let expected = (input.len() as u64 * to as u64 / from as u64) as usize;
    let mut output = Vec::with_capacity(expected + delay);
    let mut position = 0;

    while output.len() < expected + delay {
        let frames = resampler.input_frames_next();

        // Past the end of the input we keep feeding silence to flush the filter
        let mut chunk: Vec<f64> = input
            .iter()
            .skip(position)
            .take(frames)
            .map(|&s| s as f64)
            .collect();
        chunk.resize(frames, 0.0);
        position += frames;

        let wave_in = vec![chunk];
        let resampled = resampler.process(&wave_in, None)?;
        output.extend(resampled[0].iter().map(|&s| s as f32));
    }

    Ok(output.into_iter().skip(delay).take(expected).collect())
}
