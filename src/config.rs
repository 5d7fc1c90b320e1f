use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs::read_to_string;

use crate::constants::{
    DEFAULT_BLOCK_DURATION, DEFAULT_OUTPUT_ADDRESS, DEFAULT_PRELOAD_BLOCKS, DEFAULT_SAMPLE_RATE,
};
use crate::sample::SampleType;
use crate::sources::espeak::VoiceOptions;
use crate::sources::tone::Tone;

pub const CONFIG_FILE: &str = "Config.toml";

/// Stream defaults for play requests that don't override them.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Also the ceiling for file and URL sources
    pub sample_rate: u32,
    pub sample_type: SampleType,
    /// Seconds of audio per block
    pub block_duration: f64,
    /// Blocks pushed without pacing at the start of a session
    pub preload: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            sample_type: SampleType::Int16,
            block_duration: DEFAULT_BLOCK_DURATION,
            preload: DEFAULT_PRELOAD_BLOCKS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Address of the TCP listener that plays the WAV stream
    pub address: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_OUTPUT_ADDRESS.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub stream: StreamConfig,
    pub output: OutputConfig,
    pub voice: VoiceOptions,

    /// Named tone phrases, e.g. `startup = ["C5", ["E5", "G5"]]`
    pub melodies: HashMap<String, Vec<Tone>>,
}

impl Config {
    pub fn parse(config: &str) -> Result<Config> {
        let config: Config = toml::from_str(config)?;
        Ok(config)
    }
}

pub async fn load() -> Result<Config> {
    load_from(CONFIG_FILE).await
}

/// Read config from `path`, falling back to defaults if the file doesn't exist.
pub async fn load_from(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();

    let config = match read_to_string(path).await {
        Ok(config) => config,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No {} found, using default config", path.display());
            return Ok(Config::default());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };

    Config::parse(&config).with_context(|| format!("Invalid config in {}", path.display()))
}
