//! Test infrastructure for speaker-rs integration tests.
//!
//! Provides a recording output channel, WAV fixtures and a fake speech
//! synthesizer so tests run without a device or espeak installed.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;

pub use speaker_rs::config::StreamConfig;
pub use speaker_rs::output::{ChannelOutput, OutputEvent};
pub use speaker_rs::sources::espeak::{SpeechSynthesizer, VoiceOptions};
pub use speaker_rs::sources::tone::Tone;
pub use speaker_rs::{
    AudioBlock, BeepOptions, PlayOptions, SampleBuffer, SampleType, Source, Speaker, SpeakerError,
    StreamDescriptor,
};

/// Stream settings with short blocks so paced tests finish quickly.
pub fn test_stream_config() -> StreamConfig {
    StreamConfig {
        sample_rate: 8000,
        sample_type: SampleType::Int16,
        block_duration: 0.01,
        preload: 1,
    }
}

/// Creates a speaker on an in-process channel output.
pub fn test_speaker() -> (Speaker<ChannelOutput>, UnboundedReceiver<OutputEvent>) {
    let (output, rx) = ChannelOutput::new();
    (Speaker::with_config(output, test_stream_config()), rx)
}

/// Encodes a mono 16-bit WAV file of `frames` samples of a 440 Hz sine.
pub fn sine_wav(sample_rate: u32, frames: usize) -> Vec<u8> {
    let samples: Vec<i16> = (0..frames)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            ((t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 8000.0) as i16
        })
        .collect();
    wav_from_samples(sample_rate, &samples)
}

pub fn wav_from_samples(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// One play session as seen by the output channel.
#[derive(Debug, Default)]
pub struct RecordedSession {
    pub descriptor: Option<StreamDescriptor>,
    pub blocks: Vec<AudioBlock>,
    pub closed: bool,
}

impl RecordedSession {
    pub fn bytes(&self) -> Vec<u8> {
        self.blocks
            .iter()
            .flat_map(|b| b.as_bytes().to_vec())
            .collect()
    }
}

/// Collects everything currently queued on the output channel.
pub fn drain(rx: &mut UnboundedReceiver<OutputEvent>) -> Vec<OutputEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Splits an event log into sessions. Panics if sessions overlap.
pub fn sessions(events: &[OutputEvent]) -> Vec<RecordedSession> {
    let mut sessions = Vec::new();
    let mut current: Option<RecordedSession> = None;

    for event in events {
        match event {
            OutputEvent::Opened(descriptor) => {
                assert!(current.is_none(), "Session opened while another was streaming");
                current = Some(RecordedSession {
                    descriptor: Some(*descriptor),
                    ..Default::default()
                });
            }
            OutputEvent::Block(block) => current
                .as_mut()
                .expect("Block outside of a session")
                .blocks
                .push(block.clone()),
            OutputEvent::Closed => {
                let mut session = current.take().expect("Close outside of a session");
                session.closed = true;
                sessions.push(session);
            }
        }
    }

    assert!(current.is_none(), "Session was never closed");
    sessions
}

/// Waits until the channel yields an event, or panics after `timeout`.
pub async fn next_event(
    rx: &mut UnboundedReceiver<OutputEvent>,
    timeout: Duration,
) -> OutputEvent {
    tokio::time::timeout(timeout, rx.recv())
        .await
        .expect("Timed out waiting for output event")
        .expect("Output channel closed")
}

/// Calls made to a [`FakeSynthesizer`].
pub type SynthesisLog = Arc<Mutex<Vec<(String, VoiceOptions)>>>;

/// Synthesizer that records its calls and returns a short WAV.
pub struct FakeSynthesizer {
    pub log: SynthesisLog,
    pub sample_rate: u32,
}

impl FakeSynthesizer {
    pub fn new(log: SynthesisLog) -> Self {
        Self {
            log,
            sample_rate: 16000,
        }
    }
}

impl SpeechSynthesizer for FakeSynthesizer {
    fn synth_wav(
        &mut self,
        text: &str,
        options: &VoiceOptions,
    ) -> speaker_rs::Result<Vec<u8>> {
        self.log
            .lock()
            .unwrap()
            .push((text.to_string(), options.clone()));

        // 10ms of audio per character
        let frames = text.chars().count() * self.sample_rate as usize / 100;
        Ok(sine_wav(self.sample_rate, frames))
    }
}

/// Synthesizer that always fails.
pub struct BrokenSynthesizer;

impl SpeechSynthesizer for BrokenSynthesizer {
    fn synth_wav(&mut self, _text: &str, _options: &VoiceOptions) -> speaker_rs::Result<Vec<u8>> {
        Err(SpeakerError::Synthesis("no voice data".to_string()))
    }
}

/// reqwest needs a process-wide rustls provider, as in main.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}
