//! The speaker: `play`, `say` and `beep` over one output channel.
//!
//! Play requests are serialized by a FIFO session lock, so concurrent
//! callers stream one after another in arrival order and never interleave
//! their blocks.

use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

use crate::config::StreamConfig;
use crate::constants::{DEFAULT_DUTY_CYCLE, DEFAULT_TEMPO};
use crate::error::{Result, SpeakerError};
use crate::output::OutputChannel;
use crate::playback::{self, PlaybackSession};
use crate::repeat::repeat;
use crate::sample::{SampleType, StreamDescriptor};
use crate::sources::espeak::{SpeechSynthesizer, VoiceOptions};
use crate::sources::tone::{self, EqualTemperament, FrequencyLookup, Tone};
use crate::sources::{self, Source, StreamHint};
use crate::sync::PoisonlessLock;

type SharedSynthesizer = Arc<Mutex<Box<dyn SpeechSynthesizer>>>;
type SynthesizerFactory = Box<dyn Fn() -> Result<Box<dyn SpeechSynthesizer>> + Send + Sync>;

/// Per-request overrides for [`Speaker::play`].
#[derive(Clone, Debug, PartialEq)]
pub struct PlayOptions {
    pub repeat: usize,
    pub preload: Option<usize>,
    pub sample_rate: Option<u32>,
    pub sample_type: Option<SampleType>,
    pub block_duration: Option<f64>,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            repeat: 1,
            preload: None,
            sample_rate: None,
            sample_type: None,
            block_duration: None,
        }
    }
}

impl PlayOptions {
    pub fn repeat(mut self, repeat: usize) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn preload(mut self, preload: usize) -> Self {
        self.preload = Some(preload);
        self
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn sample_type(mut self, sample_type: SampleType) -> Self {
        self.sample_type = Some(sample_type);
        self
    }

    pub fn block_duration(mut self, block_duration: f64) -> Self {
        self.block_duration = Some(block_duration);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeepOptions {
    pub repeat: usize,
    /// Beats per minute
    pub tempo: f64,
    /// Fraction of each beat during which the tone sounds, in (0, 1]
    pub duty_cycle: f64,
}

impl Default for BeepOptions {
    fn default() -> Self {
        Self {
            repeat: 1,
            tempo: DEFAULT_TEMPO,
            duty_cycle: DEFAULT_DUTY_CYCLE,
        }
    }
}

pub struct Speaker<O: OutputChannel> {
    output: O,
    stream: StreamConfig,
    voice: VoiceOptions,
    lookup: Arc<dyn FrequencyLookup>,

    session_lock: tokio::sync::Mutex<()>,
    active: Mutex<Option<StreamDescriptor>>,

    // Created on the first `say` and reused afterwards
    synthesizer: OnceCell<SharedSynthesizer>,
    synthesizer_factory: SynthesizerFactory,
}

impl<O: OutputChannel> Speaker<O> {
    pub fn new(output: O) -> Self {
        Self::with_config(output, StreamConfig::default())
    }

    pub fn with_config(output: O, stream: StreamConfig) -> Self {
        Self {
            output,
            stream,
            voice: VoiceOptions::default(),
            lookup: Arc::new(EqualTemperament),
            session_lock: tokio::sync::Mutex::new(()),
            active: Mutex::new(None),
            synthesizer: OnceCell::new(),
            synthesizer_factory: Box::new(default_synthesizer),
        }
    }

    /// Default voice options, overridden per `say` call.
    pub fn with_voice(mut self, voice: VoiceOptions) -> Self {
        self.voice = voice;
        self
    }

    pub fn with_frequency_lookup(mut self, lookup: impl FrequencyLookup + 'static) -> Self {
        self.lookup = Arc::new(lookup);
        self
    }

    /// Use `factory` to create the synthesizer on the first `say`.
    pub fn with_synthesizer<F, S>(mut self, factory: F) -> Self
    where
        F: Fn() -> Result<S> + Send + Sync + 'static,
        S: SpeechSynthesizer + 'static,
    {
        self.synthesizer_factory =
            Box::new(move || factory().map(|s| Box::new(s) as Box<dyn SpeechSynthesizer>));
        self
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn stream_config(&self) -> &StreamConfig {
        &self.stream
    }

    /// Format of the session currently streaming, if any.
    pub fn active_stream(&self) -> Option<StreamDescriptor> {
        *self.active.plock()
    }

    /// Play `src`, waiting for any session already streaming to finish first.
    pub async fn play(&self, src: impl Into<Source>, options: PlayOptions) -> Result<()> {
        let src = src.into();
        let hint = StreamHint {
            sample_rate: options.sample_rate.unwrap_or(self.stream.sample_rate),
            sample_type: options.sample_type.unwrap_or(self.stream.sample_type),
            block_duration: options.block_duration.unwrap_or(self.stream.block_duration),
        };
        let preload = options.preload.unwrap_or(self.stream.preload);

        let _session_guard = self.session_lock.lock().await;

        let normalized = sources::normalize(src, &hint).await?;
        let descriptor = StreamDescriptor {
            sample_rate: normalized.sample_rate,
            sample_type: hint.sample_type,
            block_size: normalized.block_size,
        };
        let blocks = repeat(normalized.blocks, options.repeat);

        let _active = ActiveStream::set(&self.active, descriptor);
        let mut session = PlaybackSession::new(descriptor);
        info!("Playback session started: {descriptor:?}");

        let result = playback::stream(&self.output, &mut session, blocks, preload).await;
        match &result {
            Ok(()) => info!(
                "Playback session finished after {} blocks",
                session.blocks_sent()
            ),
            Err(e) => error!(
                "Playback session failed after {} blocks: {e}",
                session.blocks_sent()
            ),
        }
        result
    }

    /// Speak `text`. The voice is picked from the text's script unless
    /// `options` or the speaker's defaults name one.
    pub async fn say(&self, text: &str, repeat: usize, options: &VoiceOptions) -> Result<()> {
        let options = self.voice.merge(options).for_text(text);
        let synthesizer = self.synthesizer().await?;

        debug!("Synthesizing {} chars with {options:?}", text.len());
        let text = text.to_string();
        let wav = tokio::task::spawn_blocking(move || {
            synthesizer.plock().synth_wav(&text, &options)
        })
        .await??;

        let speech = sources::wav::decode(&wav)
            .map_err(|e| SpeakerError::Synthesis(format!("unreadable WAV output: {e}")))?;

        let options = PlayOptions::default()
            .repeat(repeat)
            .sample_rate(speech.sample_rate)
            .sample_type(SampleType::Int16);
        self.play(speech.samples, options).await
    }

    /// Play a tone phrase. The rendering rate is the smallest tier that
    /// covers the phrase's highest frequency.
    pub async fn beep(&self, tones: &[Tone], options: BeepOptions) -> Result<()> {
        tone::validate_duty_cycle(options.duty_cycle)?;
        if !(options.tempo.is_finite() && options.tempo > 0.0) {
            return Err(SpeakerError::invalid(format!(
                "tempo {} must be positive",
                options.tempo
            )));
        }

        let lookup = self.lookup.clone();
        let sample_rate = tone::sample_rate_tier(tone::max_frequency(tones, lookup.as_ref())?);
        let base_beat_ms = 60000.0 / options.tempo;
        debug!("Rendering {} tones at {sample_rate} Hz", tones.len());

        let tones = tones.to_vec();
        let duty_cycle = options.duty_cycle;
        let rendered = tokio::task::spawn_blocking(move || {
            tone::render(&tones, base_beat_ms, duty_cycle, sample_rate, lookup.as_ref())
        })
        .await??;

        let play_options = PlayOptions::default()
            .repeat(options.repeat)
            .sample_rate(sample_rate)
            .sample_type(SampleType::Int16);
        self.play(rendered.into_sample_buffer(), play_options).await
    }

    async fn synthesizer(&self) -> Result<SharedSynthesizer> {
        let synthesizer = self
            .synthesizer
            .get_or_try_init(|| async {
                info!("Initializing speech synthesizer");
                (self.synthesizer_factory)().map(|s| Arc::new(Mutex::new(s)))
            })
            .await?;
        Ok(synthesizer.clone())
    }
}

#[cfg(feature = "espeak")]
fn default_synthesizer() -> Result<Box<dyn SpeechSynthesizer>> {
    Ok(Box::new(sources::espeak::EspeakNg::new()?))
}

#[cfg(not(feature = "espeak"))]
fn default_synthesizer() -> Result<Box<dyn SpeechSynthesizer>> {
    Ok(Box::new(sources::espeak::EspeakCommand::default()))
}

/// Publishes the session's format while it streams and clears it on drop.
struct ActiveStream<'a> {
    active: &'a Mutex<Option<StreamDescriptor>>,
}

impl<'a> ActiveStream<'a> {
    fn set(active: &'a Mutex<Option<StreamDescriptor>>, descriptor: StreamDescriptor) -> Self {
        *active.plock() = Some(descriptor);
        Self { active }
    }
}

impl Drop for ActiveStream<'_> {
    fn drop(&mut self) {
        *self.active.plock() = None;
    }
}
