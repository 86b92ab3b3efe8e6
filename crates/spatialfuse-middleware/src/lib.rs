//! `spatialfuse-middleware` – Cross-thread plumbing.
//!
//! Moves detection batches from producer threads into the fusion loop and
//! fused frames out to subscribers, without caring what either contains.
//!
//! # Modules
//!
//! - [`intake`] – per-camera bounded, nonblocking, drop-oldest queues that
//!   carry [`DetectionBatch`][spatialfuse_types::DetectionBatch]es from
//!   producer threads into the engine.
//! - [`bus`] – [`FusionBus`]: single fan-out channel built on a Tokio
//!   broadcast channel, delivering every fused frame to every subscriber.

pub mod bus;
pub mod intake;

pub use bus::{FusionBus, FusionReceiver};
pub use intake::{IntakeProducer, IntakeQueue};
