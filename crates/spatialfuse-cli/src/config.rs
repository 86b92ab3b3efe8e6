//! Startup configuration: engine tuning from a TOML file, camera extrinsics
//! from a JSON calibration map. Both are read once; the extrinsics are
//! immutable for the life of the process.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spatialfuse_engine::FusionEngineConfig;
use spatialfuse_types::{CameraExtrinsics, FuseError};

fn default_target_fps() -> u32 {
    30
}

fn default_distance_threshold_m() -> f32 {
    1.5
}

fn default_intake_capacity() -> usize {
    4
}

fn default_extrinsics_path() -> String {
    "calibration_data/extrinsics.json".to_string()
}

/// User configuration, usually `spatialfuse.toml`. Every field has a
/// default, so an empty (or absent) file yields a runnable setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Camera frame rate; drives the flush timeout and window width.
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,

    /// Same-object distance threshold on the world ground plane, metres.
    #[serde(default = "default_distance_threshold_m")]
    pub distance_threshold_m: f32,

    /// Per-camera intake queue depth in batches.
    #[serde(default = "default_intake_capacity")]
    pub intake_capacity: usize,

    /// Force-flush bound for stalled buckets, milliseconds. Unset keeps the
    /// watermark-only flushing of the original pipeline.
    #[serde(default)]
    pub max_bucket_age_ms: Option<u64>,

    /// Path to the JSON calibration map `camera_id -> extrinsics`.
    #[serde(default = "default_extrinsics_path")]
    pub extrinsics_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            distance_threshold_m: default_distance_threshold_m(),
            intake_capacity: default_intake_capacity(),
            max_bucket_age_ms: None,
            extrinsics_path: default_extrinsics_path(),
        }
    }
}

impl Config {
    /// Read the TOML config at `path`. A missing file is not an error – it
    /// simply yields the defaults.
    pub fn load(path: &Path) -> Result<Self, FuseError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .map_err(|e| FuseError::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&raw)
            .map_err(|e| FuseError::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Engine configuration derived from this file.
    pub fn engine_config(&self) -> FusionEngineConfig {
        FusionEngineConfig {
            target_fps: self.target_fps,
            distance_threshold_m: self.distance_threshold_m,
            intake_capacity: self.intake_capacity,
            max_bucket_age_ms: self.max_bucket_age_ms,
            poll_interval: Duration::from_millis(2),
        }
    }
}

/// Load the per-camera calibration map produced by the extrinsic
/// calibration tool.
pub fn load_extrinsics(path: &Path) -> Result<HashMap<String, CameraExtrinsics>, FuseError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| FuseError::Config(format!("cannot read {}: {e}", path.display())))?;
    let map: HashMap<String, CameraExtrinsics> = serde_json::from_str(&raw)
        .map_err(|e| FuseError::Config(format!("cannot parse {}: {e}", path.display())))?;
    if map.is_empty() {
        return Err(FuseError::Config(format!(
            "{} contains no camera extrinsics",
            path.display()
        )));
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.target_fps, 30);
        assert!((config.distance_threshold_m - 1.5).abs() < 1e-5);
        assert_eq!(config.intake_capacity, 4);
        assert!(config.max_bucket_age_ms.is_none());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: Config =
            toml::from_str("target_fps = 15\nmax_bucket_age_ms = 500\n").unwrap();
        assert_eq!(config.target_fps, 15);
        assert_eq!(config.max_bucket_age_ms, Some(500));
        assert_eq!(config.intake_capacity, 4);
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let config = Config::load(Path::new("/nonexistent/spatialfuse.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_extrinsics_roundtrip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "18443010F1E4": {{
                    "cam_to_world": [
                        [1.0, 0.0, 0.0, 0.0],
                        [0.0, 1.0, 0.0, 0.0],
                        [0.0, 0.0, 1.0, 0.0],
                        [0.0, 0.0, 0.0, 1.0]
                    ],
                    "friendly_id": 0
                }}
            }}"#
        )
        .unwrap();

        let map = load_extrinsics(file.path()).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["18443010F1E4"].friendly_id, 0);
    }

    #[test]
    fn empty_extrinsics_map_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();
        assert!(matches!(
            load_extrinsics(file.path()),
            Err(FuseError::Config(_))
        ));
    }

    #[test]
    fn missing_extrinsics_file_is_a_config_error() {
        assert!(matches!(
            load_extrinsics(Path::new("/nonexistent/extrinsics.json")),
            Err(FuseError::Config(_))
        ));
    }
}
