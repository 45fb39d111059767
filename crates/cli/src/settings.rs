use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use facelens_core::live::live_session::LiveConfig;
use facelens_core::shared::constants::{
    DEFAULT_DISPLAY_INTERVAL, DEFAULT_PROCESS_INTERVAL, DEFAULT_RECOGNITION_INTERVAL,
    DEFAULT_SERVER_URL,
};
use facelens_core::recognition::infrastructure::jpeg_frame_encoder::RECOGNITION_JPEG_QUALITY;

/// Persisted defaults for the CLI. Flags override individual fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server_url: String,
    pub process_interval_ms: u64,
    pub display_interval_ms: u64,
    pub recognition_interval_ms: u64,
    pub silhouette: bool,
    pub face_confidence: f32,
    pub jpeg_quality: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            process_interval_ms: DEFAULT_PROCESS_INTERVAL.as_millis() as u64,
            display_interval_ms: DEFAULT_DISPLAY_INTERVAL.as_millis() as u64,
            recognition_interval_ms: DEFAULT_RECOGNITION_INTERVAL.as_millis() as u64,
            silhouette: false,
            face_confidence: 0.5,
            jpeg_quality: RECOGNITION_JPEG_QUALITY,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceLens").join("settings.json"))
    }

    /// Stored settings, or defaults when there are none or they don't parse.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> io::Result<PathBuf> {
        let path = Self::config_path()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no config directory"))?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(path, json)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(format!(
                "Server URL must start with http:// or https://, got '{}'",
                self.server_url
            ));
        }
        if self.process_interval_ms == 0 || self.display_interval_ms == 0 {
            return Err("Process and display intervals must be at least 1 ms".into());
        }
        if !(0.0..=1.0).contains(&self.face_confidence) {
            return Err(format!(
                "Face confidence must be between 0.0 and 1.0, got {}",
                self.face_confidence
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(format!(
                "JPEG quality must be between 1 and 100, got {}",
                self.jpeg_quality
            ));
        }
        Ok(())
    }

    pub fn live_config(&self) -> LiveConfig {
        LiveConfig {
            process_interval: Duration::from_millis(self.process_interval_ms),
            display_interval: Duration::from_millis(self.display_interval_ms),
            recognition_interval: Duration::from_millis(self.recognition_interval_ms),
            silhouette: self.silhouette,
            jpeg_quality: self.jpeg_quality,
            ..LiveConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            server_url: "https://faces.example.org".into(),
            silhouette: true,
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"silhouette": true}"#).unwrap();
        let settings = Settings::load_from(&path);
        assert!(settings.silhouette);
        assert_eq!(settings.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_url = Settings {
            server_url: "ftp://x".into(),
            ..Settings::default()
        };
        assert!(bad_url.validate().unwrap_err().contains("Server URL"));

        let bad_quality = Settings {
            jpeg_quality: 0,
            ..Settings::default()
        };
        assert!(bad_quality.validate().is_err());
    }

    #[test]
    fn test_live_config_uses_intervals() {
        let settings = Settings {
            recognition_interval_ms: 2500,
            ..Settings::default()
        };
        let config = settings.live_config();
        assert_eq!(config.recognition_interval, Duration::from_millis(2500));
        assert_eq!(config.process_interval, DEFAULT_PROCESS_INTERVAL);
    }
}
