//! Runtime configuration, read from the environment (and `.env` via dotenv).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use humantime_serde::re::humantime;
use thiserror::Error;

use crate::commands::voice::utils::asset_resolver::CompositeAddressing;

/// Errors that can occur while reading configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// How per-number countdowns estimate clip lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberTiming {
    EqualSpacing,
    Measured,
}

/// Everything the countdown needs to know about its deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownConfig {
    pub audio_dir: PathBuf,
    pub clip_extension: String,
    pub number_timing: NumberTiming,
    pub assumed_clip: Duration,
    pub composite: CompositeAddressing,
    pub master_length: Duration,
    pub start_delay: Duration,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            audio_dir: PathBuf::from("countdown_audio"),
            clip_extension: "mp4".to_string(),
            number_timing: NumberTiming::EqualSpacing,
            assumed_clip: Duration::from_secs(1),
            composite: CompositeAddressing::Lookup,
            master_length: Duration::from_secs(60),
            start_delay: Duration::from_millis(300),
        }
    }
}

impl CountdownConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key -> value source. Unset keys keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(dir) = lookup("COUNTDOWN_AUDIO_DIR") {
            config.audio_dir = PathBuf::from(dir);
        }
        if let Some(extension) = lookup("COUNTDOWN_CLIP_EXTENSION") {
            config.clip_extension = extension.trim_start_matches('.').to_string();
        }
        if let Some(value) = lookup("COUNTDOWN_NUMBER_TIMING") {
            config.number_timing = match value.to_ascii_lowercase().as_str() {
                "equal-spacing" | "equal" => NumberTiming::EqualSpacing,
                "measured" => NumberTiming::Measured,
                _ => {
                    return Err(invalid(
                        "COUNTDOWN_NUMBER_TIMING",
                        value,
                        "expected `equal-spacing` or `measured`",
                    ));
                }
            };
        }
        if let Some(value) = lookup("COUNTDOWN_COMPOSITE_MODE") {
            config.composite = match value.to_ascii_lowercase().as_str() {
                "lookup" => CompositeAddressing::Lookup,
                "seek" => CompositeAddressing::Seek,
                _ => {
                    return Err(invalid(
                        "COUNTDOWN_COMPOSITE_MODE",
                        value,
                        "expected `lookup` or `seek`",
                    ));
                }
            };
        }
        if let Some(value) = lookup("COUNTDOWN_ASSUMED_CLIP") {
            config.assumed_clip = parse_duration("COUNTDOWN_ASSUMED_CLIP", value)?;
        }
        if let Some(value) = lookup("COUNTDOWN_MASTER_LENGTH") {
            config.master_length = parse_duration("COUNTDOWN_MASTER_LENGTH", value)?;
        }
        if let Some(value) = lookup("COUNTDOWN_START_DELAY") {
            config.start_delay = parse_duration("COUNTDOWN_START_DELAY", value)?;
        }

        Ok(config)
    }
}

/// The bot token, which has no default
pub fn discord_token() -> Result<String, ConfigError> {
    env::var("DISCORD_TOKEN").map_err(|_| ConfigError::Missing("DISCORD_TOKEN"))
}

fn parse_duration(key: &'static str, value: String) -> Result<Duration, ConfigError> {
    humantime::parse_duration(&value).map_err(|e| invalid(key, value.clone(), e.to_string()))
}

fn invalid(key: &'static str, value: String, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        value,
        reason: reason.into(),
    }
}
