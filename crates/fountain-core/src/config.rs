//! Configuration for coding sessions and the simulator.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $FOUNTAIN_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/fountain/config.toml
//!   3. ~/.config/fountain/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::decoder::{DecoderOptions, DEFAULT_MAX_BLOCKS};
use crate::sampler::degree::DEFAULT_FAILURE_PROBABILITY;
use crate::sampler::SolitonParams;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FountainConfig {
    pub coding: CodingConfig,
    pub decoder: DecoderConfig,
    pub sim: SimConfig,
}

/// Shared by encoder and decoder. Both sides must agree on every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodingConfig {
    /// Payload bytes per frame.
    pub frame_size: usize,
    /// Robust Soliton δ.
    pub failure_probability: f64,
    /// Spike position. None = ceil(ln(K)^2).
    pub spike: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Frames above this index are ignored. None = no limit.
    pub max_frame_index: Option<u64>,
    /// Streams declaring more source blocks are refused.
    pub max_blocks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Probability that a frame is dropped.
    pub loss_rate: f64,
    /// Frames held back and shuffled in the out-of-order scenario.
    pub reorder_window: usize,
    /// Give up after this many frames.
    pub max_frames: u64,
    /// Seed for loss and reorder draws. None = random.
    pub seed: Option<u64>,
    /// Generated payload size when no input file is given.
    pub payload_len: usize,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for CodingConfig {
    fn default() -> Self {
        Self {
            frame_size: 1024,
            failure_probability: DEFAULT_FAILURE_PROBABILITY,
            spike: None,
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_frame_index: None,
            max_blocks: DEFAULT_MAX_BLOCKS,
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            loss_rate: 0.3,
            reorder_window: 32,
            max_frames: 1_000_000,
            seed: None,
            payload_len: 256 * 1024,
        }
    }
}

impl CodingConfig {
    pub fn soliton(&self) -> SolitonParams {
        SolitonParams {
            spike: self.spike,
            failure_probability: self.failure_probability,
        }
    }
}

impl FountainConfig {
    pub fn decoder_options(&self) -> DecoderOptions {
        DecoderOptions {
            soliton: self.coding.soliton(),
            max_frame_index: self.decoder.max_frame_index,
            max_blocks: self.decoder.max_blocks,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("fountain")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("invalid value for {0}: {1:?}")]
    InvalidEnv(&'static str, String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl FountainConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            FountainConfig::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse one file, no env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("FOUNTAIN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Apply FOUNTAIN_* env var overrides.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_parse("FOUNTAIN_CODING__FRAME_SIZE")? {
            self.coding.frame_size = v;
        }
        if let Some(v) = env_parse("FOUNTAIN_CODING__FAILURE_PROBABILITY")? {
            self.coding.failure_probability = v;
        }
        if let Some(v) = env_parse("FOUNTAIN_CODING__SPIKE")? {
            self.coding.spike = Some(v);
        }
        if let Some(v) = env_parse("FOUNTAIN_DECODER__MAX_FRAME_INDEX")? {
            self.decoder.max_frame_index = Some(v);
        }
        if let Some(v) = env_parse("FOUNTAIN_DECODER__MAX_BLOCKS")? {
            self.decoder.max_blocks = v;
        }
        if let Some(v) = env_parse("FOUNTAIN_SIM__LOSS_RATE")? {
            self.sim.loss_rate = v;
        }
        if let Some(v) = env_parse("FOUNTAIN_SIM__REORDER_WINDOW")? {
            self.sim.reorder_window = v;
        }
        if let Some(v) = env_parse("FOUNTAIN_SIM__MAX_FRAMES")? {
            self.sim.max_frames = v;
        }
        if let Some(v) = env_parse("FOUNTAIN_SIM__SEED")? {
            self.sim.seed = Some(v);
        }
        if let Some(v) = env_parse("FOUNTAIN_SIM__PAYLOAD_LEN")? {
            self.sim.payload_len = v;
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv(key, v)),
        Err(_) => Ok(None),
    }
}
