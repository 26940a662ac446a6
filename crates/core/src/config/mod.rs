use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for the application.
///
/// Every field carries a serde default, so a config file only needs to list
/// the values it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Location of the JSON dataset loaded at startup.
    pub dataset: String,
    pub media: MediaConfig,
    pub audio: AudioConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset: "assets/animals.json".to_string(),
            media: MediaConfig::default(),
            audio: AudioConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parses a (possibly partial) JSON configuration document.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&raw)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded configuration");
        Ok(config)
    }
}

/// Width and height requested for a rendered image slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Settings for the image candidate chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Host whose assets get a mirror candidate prepended. Matched exactly.
    pub mirror_host: String,
    /// File-serving endpoint of the mirror; the file name is appended to it.
    pub mirror_endpoint: String,
    /// Smallest width ever requested from the mirror.
    pub mirror_min_width: u32,
    /// Base of the placeholder service, which takes `<w>x<h>?text=<name>`.
    pub placeholder_base: String,
    /// Placeholder text used when the display name is empty.
    pub placeholder_text: String,
    pub card_size: ImageSize,
    pub detail_size: ImageSize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            mirror_host: "upload.wikimedia.org".to_string(),
            mirror_endpoint: "https://commons.wikimedia.org/wiki/Special:FilePath/".to_string(),
            mirror_min_width: 800,
            placeholder_base: "https://placehold.co/".to_string(),
            placeholder_text: "Image".to_string(),
            card_size: ImageSize::new(800, 600),
            detail_size: ImageSize::new(1200, 800),
        }
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Gain handed to the playback backend for real recordings.
    pub recording_gain: f32,
    pub start_muted: bool,
    pub tone: ToneConfig,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            recording_gain: 1.0,
            start_muted: false,
            tone: ToneConfig::default(),
        }
    }
}

/// Oscillator shape of the fallback tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Triangle,
}

/// Shape of the synthesized fallback tone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    pub waveform: Waveform,
    pub start_hz: f32,
    pub end_hz: f32,
    pub duration_ms: u32,
    pub attack_ms: u32,
    pub peak_gain: f32,
    /// Gain the envelope decays to by the end of the tone.
    pub floor_gain: f32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            waveform: Waveform::Triangle,
            start_hz: 660.0,
            end_hz: 330.0,
            duration_ms: 220,
            attack_ms: 10,
            peak_gain: 0.06,
            floor_gain: 0.0001,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config =
            AppConfig::from_json_str(r#"{ "audio": { "start_muted": true, "tone": { "end_hz": 220 } } }"#)
                .unwrap();

        assert!(config.audio.start_muted);
        assert_eq!(config.audio.sample_rate, 48_000);
        assert_eq!(config.audio.tone.end_hz, 220.0);
        assert_eq!(config.audio.tone.start_hz, 660.0);
        assert_eq!(config.media.mirror_host, "upload.wikimedia.org");
        assert_eq!(config.dataset, "assets/animals.json");
    }

    #[test]
    fn rejects_malformed_config() {
        let err = AppConfig::from_json_str("{ \"media\": 3 }").unwrap_err();
        assert!(err.is_content_error());
    }
}
