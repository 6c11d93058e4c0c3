//! Configuration management for detection and capture parameters
//!
//! This module provides runtime configuration loading from JSON files so the
//! acceptance thresholds, voice band and capture pacing can be tuned without
//! recompilation. Missing or malformed files fall back to the defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::audio::{DEFAULT_FRAME_COUNT, DEFAULT_FRAME_SIZE};

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "VOCAL_RANGE_CONFIG";

/// Default config file location, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "assets/vocal_range.json";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub detection: DetectionConfig,
    pub audio: AudioConfig,
    pub http: HttpConfig,
}

/// Pitch acceptance and detector parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Samples are accepted only when clarity is strictly above this value
    pub clarity_threshold: f32,
    /// Lower edge of the accepted voice band (inclusive)
    pub min_frequency_hz: f32,
    /// Upper edge of the accepted voice band (inclusive)
    pub max_frequency_hz: f32,
    /// Time-domain window handed to the detector on each tick
    pub window_size: usize,
    /// Fraction of the highest NSDF key maximum a peak must reach to be picked
    pub cutoff: f32,
    /// RMS below which a window is treated as silence (0 disables the gate)
    pub min_rms: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            clarity_threshold: 0.95,
            min_frequency_hz: 80.0,
            max_frequency_hz: 1100.0,
            window_size: 2048,
            cutoff: 0.97,
            min_rms: 0.0,
        }
    }
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Number of pre-allocated frames circulating between capture and sampler
    pub frame_count: usize,
    /// Capacity of each frame in mono samples
    pub frame_size: usize,
    /// Sampler tick period, roughly one display refresh
    pub tick_interval_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            frame_count: DEFAULT_FRAME_COUNT,
            frame_size: DEFAULT_FRAME_SIZE,
            tick_interval_ms: 16,
        }
    }
}

/// Lookup server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub addr: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file doesn't exist
    /// or the JSON is invalid. Either failure is logged.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from `$VOCAL_RANGE_CONFIG` or the default path
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.detection.clarity_threshold, 0.95);
        assert_eq!(config.detection.min_frequency_hz, 80.0);
        assert_eq!(config.detection.max_frequency_hz, 1100.0);
        assert_eq!(config.detection.window_size, 2048);
        assert_eq!(config.audio.tick_interval_ms, 16);
        assert_eq!(config.audio.frame_count, DEFAULT_FRAME_COUNT);
        assert_eq!(config.audio.frame_size, DEFAULT_FRAME_SIZE);
        assert_eq!(config.http.addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{ "detection": { "clarity_threshold": 0.9 } }"#).unwrap();
        assert_eq!(parsed.detection.clarity_threshold, 0.9);
        assert_eq!(parsed.detection.max_frequency_hz, 1100.0);
        assert_eq!(parsed.audio.frame_count, DEFAULT_FRAME_COUNT);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = AppConfig::load_from_file("/nonexistent/vocal_range.json");
        assert_eq!(config.detection.window_size, 2048);
    }
}
