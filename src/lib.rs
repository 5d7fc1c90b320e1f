//! speaker-rs library crate
//!
//! Turns audio files, URLs, sample buffers, synthesized speech and tone
//! phrases into a paced stream of fixed-size PCM blocks for a remote speaker.
//! The binary is in main.rs.

#[macro_use]
extern crate log;

pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod net;
pub mod output;
pub mod playback;
pub mod repeat;
pub mod sample;
pub mod sources;
pub mod speaker;
mod sync;

pub use error::{Result, SpeakerError};
pub use sample::{AudioBlock, SampleBuffer, SampleData, SampleType, StreamDescriptor};
pub use sources::Source;
pub use speaker::{BeepOptions, PlayOptions, Speaker};

// Test modules
#[cfg(test)]
mod codec_tests;
#[cfg(test)]
mod playback_tests;
#[cfg(test)]
mod net_tests;
