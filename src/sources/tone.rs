//! Tone synthesizer for `beep`.
//!
//! A phrase is a sequence of tones where each element is either a pitch or a
//! nested phrase. A pitch sounds for `beat * duty_cycle` followed by silence
//! for the rest of the beat; a nested phrase plays each of its elements at
//! half the parent's beat.

use serde::{Deserialize, Serialize};

use crate::constants::{TONE_TIER_HIGH, TONE_TIER_LOW, TONE_TIER_MID};
use crate::error::{Result, SpeakerError};
use crate::sample::{SampleBuffer, SampleData};

const AMPLITUDE: f64 = 0.5; // 50% amplitude

/// A musical pitch.
///
/// Whole numbers that fit in a `u8` are MIDI note numbers (only 0-127 are
/// valid notes). Larger whole numbers and anything with a fraction are
/// frequencies in Hz, so `69`, `440` and `440.0` all mean A4.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Pitch {
    Midi(u8),
    Frequency(f64),
    /// Scientific pitch notation, e.g. `"A4"`, `"C#5"`, `"Bb3"`
    Name(String),
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Tone {
    Pitch(Pitch),
    Phrase(Vec<Tone>),
}

impl Tone {
    pub fn note(name: &str) -> Tone {
        Tone::Pitch(Pitch::Name(name.to_string()))
    }

    pub fn hz(frequency: f64) -> Tone {
        Tone::Pitch(Pitch::Frequency(frequency))
    }

    pub fn phrase(tones: impl IntoIterator<Item = Tone>) -> Tone {
        Tone::Phrase(tones.into_iter().collect())
    }
}

impl From<&str> for Tone {
    fn from(name: &str) -> Self {
        Tone::note(name)
    }
}

/// Resolves a pitch to its frequency in Hz.
pub trait FrequencyLookup: Send + Sync {
    fn frequency(&self, pitch: &Pitch) -> Result<f64>;
}

/// Twelve-tone equal temperament tuned to A4 = 440 Hz.
#[derive(Clone, Copy, Debug, Default)]
pub struct EqualTemperament;

impl EqualTemperament {
    fn midi_frequency(note: f64) -> f64 {
        440.0 * 2f64.powf((note - 69.0) / 12.0)
    }

    fn parse_name(name: &str) -> Result<i32> {
        let invalid = || SpeakerError::invalid(format!("unknown pitch '{name}'"));

        let mut chars = name.trim().chars().peekable();
        let semitone = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('C') => 0,
            Some('D') => 2,
            Some('E') => 4,
            Some('F') => 5,
            Some('G') => 7,
            Some('A') => 9,
            Some('B') => 11,
            _ => return Err(invalid()),
        };

        let accidental = match chars.peek() {
            Some('#') | Some('♯') => 1,
            Some('b') | Some('♭') => -1,
            _ => 0,
        };
        if accidental != 0 {
            chars.next();
        }

        let octave: i32 = chars.collect::<String>().parse().map_err(|_| invalid())?;
        let note = (octave + 1) * 12 + semitone + accidental;
        if !(0..=127).contains(&note) {
            return Err(invalid());
        }
        Ok(note)
    }
}

impl FrequencyLookup for EqualTemperament {
    fn frequency(&self, pitch: &Pitch) -> Result<f64> {
        match pitch {
            Pitch::Midi(note) if *note <= 127 => Ok(Self::midi_frequency(*note as f64)),
            Pitch::Midi(note) => Err(SpeakerError::invalid(format!(
                "MIDI note {note} is out of range"
            ))),
            Pitch::Frequency(hz) if hz.is_finite() && *hz > 0.0 => Ok(*hz),
            Pitch::Frequency(hz) => Err(SpeakerError::invalid(format!("invalid frequency {hz}"))),
            Pitch::Name(name) => Ok(Self::midi_frequency(Self::parse_name(name)? as f64)),
        }
    }
}

/// Mono 16-bit PCM rendering of a phrase.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderedTone {
    pub sample_rate: u32,
    pub samples: Vec<i16>,
}

impl RenderedTone {
    fn empty(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            samples: Vec::new(),
        }
    }

    fn append(mut self, other: RenderedTone) -> Self {
        self.samples.extend(other.samples);
        self
    }

    pub fn duration_ms(&self) -> f64 {
        self.samples.len() as f64 * 1000.0 / self.sample_rate as f64
    }

    pub fn into_sample_buffer(self) -> SampleBuffer {
        SampleBuffer::mono(SampleData::I16(self.samples))
    }
}

/// Highest frequency anywhere in the (possibly nested) phrase.
pub fn max_frequency(tones: &[Tone], lookup: &dyn FrequencyLookup) -> Result<f64> {
    tones.iter().try_fold(0.0, |max: f64, tone| -> Result<f64> {
        let frequency = match tone {
            Tone::Pitch(pitch) => lookup.frequency(pitch)?,
            Tone::Phrase(phrase) => max_frequency(phrase, lookup)?,
        };
        Ok(max.max(frequency))
    })
}

/// Smallest standard rate that comfortably covers `max_frequency`.
pub fn sample_rate_tier(max_frequency: f64) -> u32 {
    if max_frequency > 11025.0 {
        TONE_TIER_HIGH
    } else if max_frequency > 800.0 {
        TONE_TIER_MID
    } else {
        TONE_TIER_LOW
    }
}

pub fn validate_duty_cycle(duty_cycle: f64) -> Result<()> {
    if duty_cycle > 0.0 && duty_cycle <= 1.0 {
        Ok(())
    } else {
        Err(SpeakerError::invalid(format!(
            "duty_cycle {duty_cycle} out of range (0, 1]"
        )))
    }
}

pub fn render(
    tones: &[Tone],
    base_beat_ms: f64,
    duty_cycle: f64,
    sample_rate: u32,
    lookup: &dyn FrequencyLookup,
) -> Result<RenderedTone> {
    validate_duty_cycle(duty_cycle)?;
    if !(base_beat_ms.is_finite() && base_beat_ms > 0.0) {
        return Err(SpeakerError::invalid(format!(
            "beat length {base_beat_ms}ms must be positive"
        )));
    }
    if sample_rate == 0 {
        return Err(SpeakerError::invalid("sample rate must be positive"));
    }

    render_phrase(tones, base_beat_ms, duty_cycle, sample_rate, lookup)
}

fn render_phrase(
    tones: &[Tone],
    beat_ms: f64,
    duty_cycle: f64,
    sample_rate: u32,
    lookup: &dyn FrequencyLookup,
) -> Result<RenderedTone> {
    tones
        .iter()
        .try_fold(RenderedTone::empty(sample_rate), |rendered, tone| -> Result<RenderedTone> {
            let next = match tone {
                Tone::Pitch(pitch) => render_beat(
                    lookup.frequency(pitch)?,
                    beat_ms,
                    duty_cycle,
                    sample_rate,
                ),
                Tone::Phrase(phrase) => {
                    render_phrase(phrase, beat_ms / 2.0, duty_cycle, sample_rate, lookup)?
                }
            };
            Ok(rendered.append(next))
        })
}

/// One beat: the tone, faded out over the gap length at its end, then silence.
fn render_beat(frequency: f64, beat_ms: f64, duty_cycle: f64, sample_rate: u32) -> RenderedTone {
    let to_samples = |ms: f64| (ms * sample_rate as f64 / 1000.0).round() as usize;
    let sounded = to_samples(beat_ms * duty_cycle);
    let gap = to_samples(beat_ms) - sounded;
    let fade = gap.min(sounded);

    let mut samples = Vec::with_capacity(sounded + gap);
    let mut phase = 0.0;

    for i in 0..sounded {
        let remaining = sounded - i;
        let gain = if remaining <= fade {
            remaining as f64 / (fade + 1) as f64
        } else {
            1.0
        };
        samples.push((sine_wave(phase) as f64 * gain) as i16);

        phase += frequency / sample_rate as f64;
        phase %= 1.0;
    }
    samples.resize(sounded + gap, 0);

    RenderedTone {
        sample_rate,
        samples,
    }
}

// Sine sample at `phase` (in cycles), scaled to the amplitude
fn sine_wave(phase: f64) -> i16 {
    let sample = (phase * std::f64::consts::PI * 2.0).sin();
    let amplitude = i16::MAX as f64 * AMPLITUDE;
    (sample * amplitude) as i16
}
