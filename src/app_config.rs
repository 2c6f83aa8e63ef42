use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::pages::PageOptions;

/// Application configuration module
/// This module handles loading, validating and saving the JSON configuration
/// that drives page synthesis and the transcription engine.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    /// Page synthesis options
    #[serde(default)]
    pub captions: PageOptions,

    /// Local transcription engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Transcription engine configuration (whisper.cpp command line)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EngineConfig {
    // @field: Engine executable, a path or a name resolved through PATH
    #[serde(default = "default_binary_path")]
    pub binary_path: String,

    // @field: Model file
    #[serde(default = "default_model_path")]
    pub model_path: String,

    // @field: Spoken language hint passed to the engine
    #[serde(default)]
    pub language: Option<String>,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Extra arguments appended to the engine command line
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary_path: default_binary_path(),
            model_path: default_model_path(),
            language: None,
            timeout_secs: default_timeout_secs(),
            extra_args: Vec::new(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_binary_path() -> String {
    "whisper-cli".to_string()
}

fn default_model_path() -> String {
    ".whisper/ggml-small.en.bin".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.captions.max_tokens_per_page == Some(0) {
            return Err(anyhow!("captions.max_tokens_per_page must be at least 1"));
        }
        if self.captions.max_page_duration_ms == Some(0) {
            return Err(anyhow!("captions.max_page_duration_ms must be greater than 0"));
        }
        if self.engine.binary_path.trim().is_empty() {
            return Err(anyhow!("engine.binary_path must not be empty"));
        }
        if self.engine.model_path.trim().is_empty() {
            return Err(anyhow!("engine.model_path must not be empty"));
        }
        if self.engine.timeout_secs == 0 {
            return Err(anyhow!("engine.timeout_secs must be greater than 0"));
        }
        Ok(())
    }

    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load a configuration file, writing the defaults first if it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Save as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }
}
