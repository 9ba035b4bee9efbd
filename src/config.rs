//! Editor settings.
//!
//! Settings are read from `settings.json` in the user's config directory.
//! Every field has a default, so a partial file is fine.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How the parent of a node is chosen among the nodes that contain it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentRule {
    /// Containing node with the smallest area; ties go to the earlier node.
    #[default]
    Smallest,
    /// First containing node in insertion order.
    First,
}

/// Slot grid used to place imported nodes that carry no coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementSettings {
    pub slot_width: f32,
    pub slot_height: f32,
    pub gap: f32,
    pub row_width: f32,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            slot_width: 120.0,
            slot_height: 60.0,
            gap: 10.0,
            row_width: 1000.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub zoom_step: f32,
    pub min_scale: f32,
    pub max_scale: Option<f32>,
    /// Screen pixels moved per arrow key press.
    pub pan_step: f32,
    /// Minimum drag extent, in screen pixels, along each axis for a new node.
    pub min_drag: f32,
    /// Screen-pixel distance within which a click selects a connection.
    pub connection_tolerance: f32,
    /// Screen-pixel radius of the resize handle at a node's end corner.
    pub resize_handle: f32,
    pub default_opacity: u8,
    pub parent_rule: ParentRule,
    pub placement: PlacementSettings,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            zoom_step: 0.1,
            min_scale: 0.1,
            max_scale: Some(5.0),
            pan_step: 20.0,
            min_drag: 5.0,
            connection_tolerance: 5.0,
            resize_handle: 8.0,
            default_opacity: 128,
            parent_rule: ParentRule::default(),
            placement: PlacementSettings::default(),
        }
    }
}

impl EditorSettings {
    /// `$XDG_CONFIG_HOME/annotate-graph/settings.json`, or `~/.config/...`.
    pub fn default_path() -> PathBuf {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".config")
            });
        config_dir.join("annotate-graph").join("settings.json")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads settings, falling back to defaults when the file is missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Self::default();
        }
        match Self::from_file(path) {
            Ok(settings) => {
                tracing::info!(path = %path.display(), "loaded settings");
                settings
            }
            Err(e) => {
                tracing::warn!(error = %e, "ignoring settings file");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let s: EditorSettings =
            serde_json::from_str(r#"{"zoom_step": 0.25, "parent_rule": "first"}"#).unwrap();
        assert_eq!(s.zoom_step, 0.25);
        assert_eq!(s.parent_rule, ParentRule::First);
        assert_eq!(s.min_scale, 0.1);
        assert_eq!(s.max_scale, Some(5.0));
        assert_eq!(s.placement, PlacementSettings::default());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = EditorSettings::load_or_default(&dir.path().join("nope.json"));
        assert_eq!(s, EditorSettings::default());
    }

    #[test]
    fn malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(EditorSettings::from_file(&path).is_err());
        assert_eq!(EditorSettings::load_or_default(&path), EditorSettings::default());
    }
}
