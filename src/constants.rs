// Default stream parameters used when a play request doesn't override them
pub const DEFAULT_SAMPLE_RATE: u32 = 22050; // also the ceiling for file sources
pub const DEFAULT_BLOCK_DURATION: f64 = 0.1; // seconds
pub const DEFAULT_PRELOAD_BLOCKS: usize = 1;

/// Fraction of a block's duration to wait after each paced push.
pub const PACING_FACTOR: f64 = 0.95;

/// Capacity of the handoff queue between block production and the pacer.
pub const HANDOFF_CAPACITY: usize = 16;

// Rendering tiers for synthesized tones
pub const TONE_TIER_LOW: u32 = 16000;
pub const TONE_TIER_MID: u32 = 22050;
pub const TONE_TIER_HIGH: u32 = 44100;

pub const DEFAULT_TEMPO: f64 = 120.0; // BPM
pub const DEFAULT_DUTY_CYCLE: f64 = 0.9;

pub const DEFAULT_OUTPUT_ADDRESS: &str = "127.0.0.1:7878";
