//! Inspector configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Stream played when the page opens
pub const DEFAULT_STREAM_URL: &str =
    "https://28553.live.streamtheworld.com/ZET_DANCE.mp3?dist=eztestbanera";

/// MIME type probed for native adaptive-manifest playback
pub const NATIVE_MANIFEST_MIME: &str = "application/vnd.apple.mpegurl";

/// Settings passed to the adaptive engine at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Parse WebVTT subtitle renditions
    pub enable_webvtt: bool,
    /// Parse CEA-708 captions embedded in video
    pub enable_cea708_captions: bool,
    /// Engine-side debug logging
    pub debug: bool,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            enable_webvtt: true,
            enable_cea708_captions: true,
            debug: false,
        }
    }
}

/// Settings for legacy-container sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyConfig {
    /// Container type handed to the player factory
    pub container: String,
    /// Treat every source as a live relay
    pub is_live: bool,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            container: "flv".to_string(),
            is_live: true,
        }
    }
}

/// Entry of the example stream picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleStream {
    pub label: String,
    pub url: String,
}

impl ExampleStream {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// Inspector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// URL loaded on startup
    pub default_url: String,
    pub adaptive: AdaptiveConfig,
    pub legacy: LegacyConfig,
    /// MIME type used to ask the media element about native manifest playback
    pub native_manifest_mime: String,
    pub example_streams: Vec<ExampleStream>,
    /// Enable the subtitle bridge before the first load
    pub subtitles_on_start: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            default_url: DEFAULT_STREAM_URL.to_string(),
            adaptive: AdaptiveConfig::default(),
            legacy: LegacyConfig::default(),
            native_manifest_mime: NATIVE_MANIFEST_MIME.to_string(),
            example_streams: vec![
                ExampleStream::new("ZET Dance (MP3)", DEFAULT_STREAM_URL),
                ExampleStream::new(
                    "Apple bipbop (HLS)",
                    "https://devstreaming-cdn.apple.com/videos/streaming/examples/bipbop_adv_example_hevc/master.m3u8",
                ),
                ExampleStream::new(
                    "Mux test stream (HLS)",
                    "https://test-streams.mux.dev/x36xhzz/x36xhzz.m3u8",
                ),
            ],
            subtitles_on_start: false,
        }
    }
}

impl StreamConfig {
    /// Parse a JSON document; missing keys take their defaults
    pub fn from_json(input: &str) -> Result<Self> {
        let config: StreamConfig = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let input = std::fs::read_to_string(path)?;
        Self::from_json(&input)
    }

    /// Check field-level constraints
    pub fn validate(&self) -> Result<()> {
        if self.default_url.trim().is_empty() {
            return Err(Error::InvalidConfig("default_url is empty".to_string()));
        }
        if self.native_manifest_mime.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "native_manifest_mime is empty".to_string(),
            ));
        }
        if self.legacy.container.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "legacy.container is empty".to_string(),
            ));
        }
        if let Some(example) = self.example_streams.iter().find(|e| e.url.trim().is_empty()) {
            return Err(Error::InvalidConfig(format!(
                "example stream '{}' has no URL",
                example.label
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
