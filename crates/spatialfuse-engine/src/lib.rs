//! `spatialfuse-engine` – The fusion loop.
//!
//! Owns everything stateful between the per-camera intake queues and the
//! fusion output bus: world transformation of inbound batches, time-window
//! buffering against per-device clocks, and the single worker loop that
//! clusters, prunes, and emits fused frames.
//!
//! # Modules
//!
//! - [`ingest`] – [`DetectionIngestor`][ingest::DetectionIngestor]: ghost
//!   filtering and camera-to-world transformation of one batch.
//! - [`scheduler`] – [`TimeWindowScheduler`][scheduler::TimeWindowScheduler]:
//!   watermark tracking, per-timestamp buckets, and timeout-gated window
//!   flushing.
//! - [`emitter`] – [`FusedOutputEmitter`][emitter::FusedOutputEmitter]:
//!   serializes pruned groups into the explicit wire schema and publishes
//!   them, refusing out-of-order windows.
//! - [`engine`] – [`FusionEngine`][engine::FusionEngine]: the round-robin
//!   polling loop that ties the above together.

pub mod emitter;
pub mod engine;
pub mod ingest;
pub mod scheduler;

pub use engine::{FusionEngine, FusionEngineConfig};
