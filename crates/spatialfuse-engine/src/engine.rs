//! [`FusionEngine`] – the fusion worker loop.
//!
//! A single loop owns every piece of engine-internal mutable state (buckets,
//! watermark, emission order gate), so nothing inside needs a lock. Each
//! pass:
//!
//! 1. **Poll** – nonblocking round-robin drain of every camera's intake
//!    queue; each batch is validated, ghost-filtered, transformed to world
//!    coordinates, and buffered by timestamp.
//! 2. **Tick** – one [`TimeWindowScheduler`] flush check; a due window is
//!    clustered into groups, pruned to one detection per camera, and emitted
//!    on the [`FusionBus`].
//! 3. **Sleep** – a millisecond-scale pause so the loop cooperates instead
//!    of spinning.
//!
//! Producer threads touch the engine only through [`IntakeProducer`]
//! handles; subscribers only through the bus. A malformed batch or a camera
//! without extrinsics costs that batch a warning, never the loop.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//! use spatialfuse_engine::{FusionEngine, FusionEngineConfig};
//! use spatialfuse_types::CameraExtrinsics;
//!
//! let mut extrinsics = HashMap::new();
//! extrinsics.insert("18443010F1E4".to_string(), CameraExtrinsics {
//!     cam_to_world: [
//!         [1.0, 0.0, 0.0, 0.0],
//!         [0.0, 1.0, 0.0, 0.0],
//!         [0.0, 0.0, 1.0, 0.0],
//!         [0.0, 0.0, 0.0, 1.0],
//!     ],
//!     friendly_id: 0,
//! });
//!
//! let engine = FusionEngine::new(extrinsics, FusionEngineConfig::default());
//! let mut frames = engine.bus().subscribe();
//! let producer = engine.intake("18443010F1E4").unwrap();
//! let shutdown = Arc::new(AtomicBool::new(false));
//! tokio::spawn(engine.run(shutdown));
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use spatialfuse_middleware::{FusionBus, IntakeProducer, IntakeQueue};
use spatialfuse_perception::clustering::group_detections;
use spatialfuse_perception::redundancy::prune_redundant;
use spatialfuse_types::{CameraExtrinsics, DetectionBatch, FuseError, FusedGroup};
use tracing::{debug, error, info, warn};

use crate::emitter::FusedOutputEmitter;
use crate::ingest::DetectionIngestor;
use crate::scheduler::{FlushWindow, TimeWindowScheduler};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Tuning knobs for [`FusionEngine`].
#[derive(Debug, Clone)]
pub struct FusionEngineConfig {
    /// Frame rate the cameras are configured for; drives the flush timeout
    /// and window width.
    pub target_fps: u32,
    /// Two same-label detections closer than this (world ground plane,
    /// metres) are considered the same physical object.
    pub distance_threshold_m: f32,
    /// Per-camera intake queue depth in batches; overflow drops the oldest.
    pub intake_capacity: usize,
    /// Optional wall-clock bound after which a stalled bucket is flushed
    /// even without watermark progress. `None` keeps the original
    /// watermark-only behavior.
    pub max_bucket_age_ms: Option<u64>,
    /// Pause between worker-loop passes.
    pub poll_interval: Duration,
}

impl Default for FusionEngineConfig {
    fn default() -> Self {
        Self {
            target_fps: 30,
            distance_threshold_m: 1.5,
            intake_capacity: spatialfuse_middleware::intake::DEFAULT_CAPACITY,
            max_bucket_age_ms: None,
            poll_interval: Duration::from_millis(2),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FusionEngine
// ─────────────────────────────────────────────────────────────────────────────

/// The fusion worker. Owns the intake queues, the ingestor, the scheduler,
/// and the emitter; drive it with [`run`][Self::run] or, for deterministic
/// embedding and tests, with [`poll_once`][Self::poll_once].
pub struct FusionEngine {
    /// One queue per calibrated camera, drained round-robin in a fixed
    /// (sorted) order.
    intakes: Vec<IntakeQueue>,
    ingestor: DetectionIngestor,
    scheduler: TimeWindowScheduler,
    emitter: FusedOutputEmitter,
    bus: FusionBus,
    distance_threshold_m: f32,
    poll_interval: Duration,
}

impl FusionEngine {
    /// Build an engine for the cameras in `extrinsics`. One statically typed
    /// intake queue is created per camera id, resolved here rather than via
    /// any runtime lookup.
    pub fn new(extrinsics: HashMap<String, CameraExtrinsics>, config: FusionEngineConfig) -> Self {
        let mut camera_ids: Vec<&String> = extrinsics.keys().collect();
        camera_ids.sort();
        let intakes = camera_ids
            .into_iter()
            .map(|id| IntakeQueue::new(id.clone(), config.intake_capacity))
            .collect();

        let bus = FusionBus::default();
        Self {
            intakes,
            ingestor: DetectionIngestor::new(&extrinsics),
            scheduler: TimeWindowScheduler::new(config.target_fps, config.max_bucket_age_ms),
            emitter: FusedOutputEmitter::new(bus.clone()),
            bus,
            distance_threshold_m: config.distance_threshold_m,
            poll_interval: config.poll_interval,
        }
    }

    /// Clone of the fusion output bus for attaching subscribers.
    pub fn bus(&self) -> FusionBus {
        self.bus.clone()
    }

    /// Producer handle for `camera_id`, or `None` if the camera has no
    /// extrinsics (and therefore no queue).
    pub fn intake(&self, camera_id: &str) -> Option<IntakeProducer> {
        self.intakes
            .iter()
            .find(|q| q.camera_id() == camera_id)
            .map(|q| q.producer())
    }

    /// Ids of all calibrated cameras, in round-robin order.
    pub fn camera_ids(&self) -> Vec<String> {
        self.intakes
            .iter()
            .map(|q| q.camera_id().to_string())
            .collect()
    }

    /// One worker-loop pass: drain every intake queue, then run one
    /// scheduler tick. Synchronous and deterministic.
    pub fn poll_once(&mut self) {
        for i in 0..self.intakes.len() {
            while let Some(batch) = self.intakes[i].try_pop() {
                if let Err(err) = self.ingest_batch(&batch) {
                    warn!(camera = %batch.camera_id, %err, "dropped batch");
                }
            }
        }

        if let Some(window) = self.scheduler.flush_due() {
            self.fuse_and_emit(window);
        }
    }

    /// Run the loop until `shutdown` flips, then flush whatever windows are
    /// still pending so a graceful stop loses nothing.
    pub async fn run(mut self, shutdown: Arc<AtomicBool>) {
        info!(
            cameras = self.intakes.len(),
            "fusion engine started"
        );
        while !shutdown.load(Ordering::Acquire) {
            self.poll_once();
            tokio::time::sleep(self.poll_interval).await;
        }

        for window in self.scheduler.drain_all() {
            self.fuse_and_emit(window);
        }
        info!("fusion engine stopped");
    }

    fn ingest_batch(&mut self, batch: &DetectionBatch) -> Result<(), FuseError> {
        batch.validate()?;
        let world = self.ingestor.ingest(batch)?;
        self.scheduler.insert(batch.timestamp_ms, world);
        Ok(())
    }

    fn fuse_and_emit(&mut self, window: FlushWindow) {
        if window.detections.is_empty() {
            // All ghosts, or bare clock-carrier batches: nothing to fuse.
            debug!(start_ms = window.start_ms, "skipped empty window");
            return;
        }

        let groups: Vec<FusedGroup> =
            group_detections(window.detections, self.distance_threshold_m)
                .into_iter()
                .map(prune_redundant)
                .collect();

        match self.emitter.emit(window.start_ms, groups) {
            Ok(receivers) => {
                debug!(
                    start_ms = window.start_ms,
                    receivers, "emitted fused window"
                );
            }
            Err(err) => {
                // This window is lost; the loop keeps going for later ones.
                error!(start_ms = window.start_ms, %err, "failed to emit fused window");
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
