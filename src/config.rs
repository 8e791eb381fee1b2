//! Session configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Settings for a reorder session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Quiet period after the last reorder before an auto-save starts
    pub debounce: Duration,
    /// How long the "saved" status stays up before returning to idle
    pub saved_display: Duration,
    /// Scale used for page thumbnails
    pub thumbnail_scale: f32,
    /// Scale used for the single-page preview
    pub preview_scale: f32,
    /// Where each successful save is written, if anywhere
    pub autosave_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1000),
            saved_display: Duration::from_millis(2000),
            thumbnail_scale: 0.2,
            preview_scale: 1.5,
            autosave_path: None,
        }
    }
}

impl SessionConfig {
    /// Build a config from `PDF_REORDER_*` environment variables.
    ///
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        let millis = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };
        let scale = |key: &str, fallback: f32| {
            lookup(key)
                .and_then(|v| v.trim().parse::<f32>().ok())
                .unwrap_or(fallback)
        };

        Self {
            debounce: millis("PDF_REORDER_DEBOUNCE_MS", default.debounce),
            saved_display: millis("PDF_REORDER_SAVED_DISPLAY_MS", default.saved_display),
            thumbnail_scale: scale("PDF_REORDER_THUMBNAIL_SCALE", default.thumbnail_scale),
            preview_scale: scale("PDF_REORDER_PREVIEW_SCALE", default.preview_scale),
            autosave_path: lookup("PDF_REORDER_AUTOSAVE_PATH")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .or(default.autosave_path),
        }
    }

    /// Check that the values can drive a session
    pub fn validate(&self) -> Result<()> {
        if self.debounce.is_zero() {
            return Err(Error::Config("debounce must be greater than zero".to_string()));
        }
        for (name, value) in [
            ("thumbnail_scale", self.thumbnail_scale),
            ("preview_scale", self.preview_scale),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Config(format!("{name} must be a positive number, got {value}")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.debounce, Duration::from_millis(1000));
        assert_eq!(config.saved_display, Duration::from_millis(2000));
        assert!(config.autosave_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = SessionConfig::from_lookup(lookup_from(&[
            ("PDF_REORDER_DEBOUNCE_MS", "250"),
            ("PDF_REORDER_PREVIEW_SCALE", "2.0"),
            ("PDF_REORDER_AUTOSAVE_PATH", "/tmp/out.pdf"),
        ]));
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert_eq!(config.preview_scale, 2.0);
        assert_eq!(config.autosave_path, Some(PathBuf::from("/tmp/out.pdf")));
        assert_eq!(config.saved_display, Duration::from_millis(2000));
    }

    #[test]
    fn test_unparsable_env_falls_back() {
        let config = SessionConfig::from_lookup(lookup_from(&[
            ("PDF_REORDER_DEBOUNCE_MS", "soon"),
            ("PDF_REORDER_THUMBNAIL_SCALE", "big"),
        ]));
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = SessionConfig {
            debounce: Duration::ZERO,
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = SessionConfig {
            thumbnail_scale: -1.0,
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = SessionConfig {
            preview_scale: f32::NAN,
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
