//! Text-to-speech using espeak-ng.
//!
//! Synthesizers return a complete WAV file. The default one runs the
//! `espeak-ng` executable; with the `espeak` feature enabled, speech can also
//! be synthesized in-process through `espeakng-sys`.

use std::path::PathBuf;
use std::io::Write;
use std::process::{Command, Stdio};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpeakerError};

lazy_static! {
    static ref CJK_IDEOGRAPHS: Regex = Regex::new(r"[\u{4e00}-\u{9fff}]").unwrap();
}

/// Voice settings passed to the synthesizer. Unset fields keep the engine's
/// defaults.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VoiceOptions {
    /// Language/voice name, e.g. `en`, `zh`, `fi`
    pub voice: Option<String>,
    /// Amplitude, 0-200
    pub volume: Option<u32>,
    /// Base pitch, 0-99
    pub pitch: Option<u32>,
    /// Words per minute
    pub speed: Option<u32>,
    /// Pause between words in units of 10ms
    pub word_gap: Option<u32>,
}

impl VoiceOptions {
    /// `self` with every field set in `overrides` replaced.
    pub fn merge(&self, overrides: &VoiceOptions) -> VoiceOptions {
        VoiceOptions {
            voice: overrides.voice.clone().or_else(|| self.voice.clone()),
            volume: overrides.volume.or(self.volume),
            pitch: overrides.pitch.or(self.pitch),
            speed: overrides.speed.or(self.speed),
            word_gap: overrides.word_gap.or(self.word_gap),
        }
    }

    /// Fill in the voice from the text's script when none was chosen.
    pub fn for_text(&self, text: &str) -> VoiceOptions {
        let mut options = self.clone();
        if options.voice.is_none() {
            options.voice = Some(select_voice(text).to_string());
        }
        options
    }
}

/// Chinese for text containing CJK ideographs, English otherwise.
pub fn select_voice(text: &str) -> &'static str {
    if CJK_IDEOGRAPHS.is_match(text) {
        "zh"
    } else {
        "en"
    }
}

/// Turns text into a WAV-encoded buffer. Calls block, so they are made from
/// a worker thread.
pub trait SpeechSynthesizer: Send {
    fn synth_wav(&mut self, text: &str, options: &VoiceOptions) -> Result<Vec<u8>>;
}

/// Synthesizes by running the `espeak-ng` executable.
#[derive(Clone, Debug)]
pub struct EspeakCommand {
    program: PathBuf,
}

impl EspeakCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for EspeakCommand {
    fn default() -> Self {
        let program = std::env::var("ESPEAK_BIN").unwrap_or_else(|_| "espeak-ng".to_string());
        Self::new(program)
    }
}

impl SpeechSynthesizer for EspeakCommand {
    fn synth_wav(&mut self, text: &str, options: &VoiceOptions) -> Result<Vec<u8>> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--stdout");

        if let Some(voice) = &options.voice {
            cmd.arg("-v").arg(voice);
        }
        if let Some(volume) = options.volume {
            cmd.arg("-a").arg(volume.to_string());
        }
        if let Some(pitch) = options.pitch {
            cmd.arg("-p").arg(pitch.to_string());
        }
        if let Some(speed) = options.speed {
            cmd.arg("-s").arg(speed.to_string());
        }
        if let Some(word_gap) = options.word_gap {
            cmd.arg("-g").arg(word_gap.to_string());
        }
        // Text goes through stdin so a leading '-' is never read as an option
        cmd.arg("--stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!("Running {cmd:?}");
        let spawn_error = |e: std::io::Error| {
            SpeakerError::Synthesis(format!("failed to run {}: {e}", self.program.display()))
        };
        let mut child = cmd.spawn().map_err(spawn_error)?;

        // Written from another thread while stdout is drained below
        let writer = child.stdin.take().map(|mut stdin| {
            let text = text.to_string();
            std::thread::spawn(move || stdin.write_all(text.as_bytes()))
        });

        let output = child.wait_with_output().map_err(spawn_error)?;
        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Failed to pass text to {}: {e}", self.program.display()),
                Err(_) => warn!("Text writer for {} panicked", self.program.display()),
            }
        }

        if !output.status.success() {
            return Err(SpeakerError::Synthesis(format!(
                "{} failed (exit code {}): {}",
                self.program.display(),
                output.status.code().unwrap_or_default(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(output.stdout)
    }
}

#[cfg(feature = "espeak")]
pub use self::ffi::EspeakNg;

#[cfg(feature = "espeak")]
mod ffi {
    #![allow(non_upper_case_globals)]

    use std::ffi::{c_void, CString};
    use std::io::Cursor;
    use std::os::raw::{c_char, c_int, c_short};

    use espeakng_sys::*;
    use hound::{SampleFormat, WavSpec, WavWriter};

    use super::{SpeechSynthesizer, VoiceOptions};
    use crate::error::{Result, SpeakerError};

    const BUFF_LEN: i32 = 500;
    const OPTIONS: i32 = 0;

    /// In-process espeak-ng. The library keeps global state, so only one
    /// instance should exist at a time.
    pub struct EspeakNg {
        sample_rate: u32,
    }

    impl EspeakNg {
        pub fn new() -> Result<Self> {
            let output: espeak_AUDIO_OUTPUT = espeak_AUDIO_OUTPUT_AUDIO_OUTPUT_RETRIEVAL;
            let path: *const c_char = std::ptr::null();

            let sample_rate = unsafe { espeak_Initialize(output, BUFF_LEN, path, OPTIONS) };
            if sample_rate <= 0 {
                return Err(SpeakerError::Synthesis(
                    "espeak_Initialize failed".to_string(),
                ));
            }

            unsafe { espeak_SetSynthCallback(Some(synth_callback)) };

            Ok(Self {
                sample_rate: sample_rate as u32,
            })
        }

        fn apply(&self, options: &VoiceOptions) -> Result<()> {
            if let Some(voice) = &options.voice {
                let name = CString::new(voice.as_str())
                    .map_err(|e| SpeakerError::Synthesis(e.to_string()))?;
                check(unsafe { espeak_SetVoiceByName(name.as_ptr()) }, "espeak_SetVoiceByName")?;
            }

            let parameters = [
                (espeak_PARAMETER_espeakVOLUME, options.volume),
                (espeak_PARAMETER_espeakPITCH, options.pitch),
                (espeak_PARAMETER_espeakRATE, options.speed),
                (espeak_PARAMETER_espeakWORDGAP, options.word_gap),
            ];
            for (parameter, value) in parameters {
                if let Some(value) = value {
                    check(
                        unsafe { espeak_SetParameter(parameter, value as c_int, 0) },
                        "espeak_SetParameter",
                    )?;
                }
            }
            Ok(())
        }
    }

    impl SpeechSynthesizer for EspeakNg {
        fn synth_wav(&mut self, text: &str, options: &VoiceOptions) -> Result<Vec<u8>> {
            self.apply(options)?;

            // Filter out null bytes so CString::new can't fail
            let filtered: String = text.chars().filter(|&c| c != '\0').collect();
            let text_cstr =
                CString::new(filtered).map_err(|e| SpeakerError::Synthesis(e.to_string()))?;

            // The callback appends to this through the event's user_data pointer
            let mut samples: Vec<i16> = Vec::new();
            let user_data = &mut samples as *mut Vec<i16> as *mut c_void;

            let synth = unsafe {
                espeak_Synth(
                    text_cstr.as_ptr() as *const c_void,
                    text_cstr.as_bytes_with_nul().len(),
                    0,
                    0,
                    0,
                    espeakCHARS_AUTO,
                    std::ptr::null_mut(),
                    user_data,
                )
            };
            check(synth, "espeak_Synth")?;
            check(unsafe { espeak_Synchronize() }, "espeak_Synchronize")?;

            encode_wav(&samples, self.sample_rate)
        }
    }

    impl Drop for EspeakNg {
        fn drop(&mut self) {
            unsafe {
                espeak_Terminate();
            }
        }
    }

    fn check(status: espeak_ERROR, call: &str) -> Result<()> {
        match status {
            espeak_ERROR_EE_OK => Ok(()),
            other => Err(SpeakerError::Synthesis(format!(
                "{call} returned error {other}"
            ))),
        }
    }

    fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let to_err = |e: hound::Error| SpeakerError::Synthesis(e.to_string());
        let mut wav = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut wav, spec).map_err(to_err)?;
            for &sample in samples {
                writer.write_sample(sample).map_err(to_err)?;
            }
            writer.finalize().map_err(to_err)?;
        }
        Ok(wav.into_inner())
    }

    unsafe extern "C" fn synth_callback(
        wav: *mut c_short,
        sample_count: c_int,
        events: *mut espeak_EVENT,
    ) -> c_int {
        if events.is_null() || wav.is_null() || sample_count <= 0 {
            return 0;
        }

        let samples = (*events).user_data as *mut Vec<i16>;
        if let Some(samples) = samples.as_mut() {
            let chunk = std::slice::from_raw_parts(wav, sample_count as usize);
            samples.extend_from_slice(chunk);
        }

        0
    }
}
