//! Detection Ingestor.
//!
//! Turns one camera's raw batch into world-frame detections: looks up the
//! camera's extrinsics, drops ghosts (zero depth), transforms the survivors,
//! and tags them with the camera's friendly id. The ingestor holds only the
//! immutable calibration map; bucketing and watermark updates belong to the
//! [`TimeWindowScheduler`](crate::scheduler::TimeWindowScheduler).

use std::collections::HashMap;

use spatialfuse_perception::transform::{Mat4, world_from_camera};
use spatialfuse_types::{CameraExtrinsics, DetectionBatch, FuseError, WorldDetection};
use tracing::debug;

/// Per-camera calibration with the matrix pre-converted for the hot path.
struct CameraCalibration {
    cam_to_world: Mat4,
    friendly_id: u32,
}

/// Stateless-per-batch transformer from raw camera batches to world
/// detections. Built once from the startup extrinsics map.
pub struct DetectionIngestor {
    cameras: HashMap<String, CameraCalibration>,
}

impl DetectionIngestor {
    /// Build an ingestor from the startup extrinsics map.
    pub fn new(extrinsics: &HashMap<String, CameraExtrinsics>) -> Self {
        let cameras = extrinsics
            .iter()
            .map(|(id, ext)| {
                (
                    id.clone(),
                    CameraCalibration {
                        cam_to_world: Mat4::from(ext.cam_to_world),
                        friendly_id: ext.friendly_id,
                    },
                )
            })
            .collect();
        Self { cameras }
    }

    /// Transform every non-ghost detection of `batch` into the world frame.
    ///
    /// # Errors
    ///
    /// [`FuseError::UnknownCamera`] when no extrinsics were loaded for the
    /// reporting camera; the caller drops the batch and keeps the loop
    /// running.
    pub fn ingest(&self, batch: &DetectionBatch) -> Result<Vec<WorldDetection>, FuseError> {
        let calibration = self
            .cameras
            .get(&batch.camera_id)
            .ok_or_else(|| FuseError::UnknownCamera(batch.camera_id.clone()))?;

        let mut world: Vec<WorldDetection> = Vec::with_capacity(batch.detections.len());
        let mut ghosts = 0usize;
        for det in &batch.detections {
            if det.is_ghost() {
                ghosts += 1;
                continue;
            }
            let world_position =
                world_from_camera(det.x_mm, det.y_mm, det.z_mm, &calibration.cam_to_world);
            world.push(WorldDetection {
                label: det.label.clone(),
                confidence: det.confidence,
                world_position,
                camera: calibration.friendly_id,
            });
        }

        if ghosts > 0 {
            debug!(
                camera = %batch.camera_id,
                ghosts,
                "filtered ghost detections with zero depth"
            );
        }
        Ok(world)
    }
}
