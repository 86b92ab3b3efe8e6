use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A single detection as reported by one camera, in that camera's local
/// coordinate frame. Coordinates are millimetres, straight off the stereo
/// depth stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawDetection {
    /// Class label (e.g. "person").
    pub label: String,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
    pub x_mm: f32,
    pub y_mm: f32,
    /// Depth. A value of exactly `0` marks a ghost detection (invalid depth).
    pub z_mm: f32,
}

impl RawDetection {
    /// `true` when the stereo stage produced no valid depth for this
    /// detection. Ghosts are filtered before world transformation.
    pub fn is_ghost(&self) -> bool {
        self.z_mm == 0.0
    }
}

/// One tick's worth of detections from a single camera, stamped with that
/// camera's device clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectionBatch {
    /// Producer device identifier (e.g. the camera's serial).
    pub camera_id: String,
    /// Device timestamp in milliseconds.
    pub timestamp_ms: i64,
    pub detections: Vec<RawDetection>,
}

impl DetectionBatch {
    /// Reject malformed inbound batches with an explicit error kind instead
    /// of asserting. A bad batch is dropped by the caller; it never aborts
    /// the fusion loop.
    pub fn validate(&self) -> Result<(), FuseError> {
        if self.timestamp_ms < 0 {
            return Err(FuseError::MalformedBatch {
                camera: self.camera_id.clone(),
                details: format!("negative timestamp {}", self.timestamp_ms),
            });
        }
        for (i, det) in self.detections.iter().enumerate() {
            if det.label.is_empty() {
                return Err(FuseError::MalformedBatch {
                    camera: self.camera_id.clone(),
                    details: format!("detection {i} has an empty label"),
                });
            }
            if !(det.x_mm.is_finite() && det.y_mm.is_finite() && det.z_mm.is_finite()) {
                return Err(FuseError::MalformedBatch {
                    camera: self.camera_id.clone(),
                    details: format!("detection {i} ({}) has non-finite coordinates", det.label),
                });
            }
            if !det.confidence.is_finite() || !(0.0..=1.0).contains(&det.confidence) {
                return Err(FuseError::MalformedBatch {
                    camera: self.camera_id.clone(),
                    details: format!(
                        "detection {i} ({}) confidence {} outside [0, 1]",
                        det.label, det.confidence
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Calibration mapping one camera's local frame into the shared world frame.
/// Loaded once at startup and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CameraExtrinsics {
    /// Row-major homogeneous camera-to-world transform.
    pub cam_to_world: [[f32; 4]; 4],
    /// Small integer id used in place of the device serial on the wire.
    pub friendly_id: u32,
}

/// A detection after ghost filtering and transformation into the world frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorldDetection {
    pub label: String,
    pub confidence: f32,
    /// Homogeneous world position `[x, y, z, w]` in metres.
    pub world_position: [f32; 4],
    /// Friendly id of the source camera.
    pub camera: u32,
}

/// Detections judged to represent one physical object. After redundancy
/// pruning each camera contributes at most one member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FusedGroup {
    pub members: Vec<WorldDetection>,
}

/// The explicit wire schema for one fused time window. Serialized as JSON
/// into [`FusionOutput::payload`] so consumers are not coupled to any
/// runtime's object serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FusionFrame {
    pub id: Uuid,
    pub emitted_at: DateTime<Utc>,
    /// Start of the fused time window, in source-clock milliseconds.
    pub window_start_ms: i64,
    pub groups: Vec<FusedGroup>,
}

/// One emission on the fusion output bus: the serialized [`FusionFrame`]
/// plus its window-start timestamp for consumers that only need ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionOutput {
    pub window_start_ms: i64,
    pub payload: Vec<u8>,
}

/// Global error type spanning calibration gaps, malformed producer input,
/// serialization failures, and channel faults.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum FuseError {
    #[error("no extrinsics loaded for camera {0}")]
    UnknownCamera(String),

    #[error("malformed batch from camera {camera}: {details}")]
    MalformedBatch { camera: String, details: String },

    #[error("fused output serialization failed: {0}")]
    Serialization(String),

    #[error("channel error: {0}")]
    Channel(String),

    #[error("window start {offered_ms} ms regresses behind {previous_ms} ms")]
    NonMonotonicWindow { previous_ms: i64, offered_ms: i64 },

    #[error("configuration error: {0}")]
    Config(String),
}
