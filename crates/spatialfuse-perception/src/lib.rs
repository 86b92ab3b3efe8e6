//! `spatialfuse-perception` – Geometry and grouping layer.
//!
//! Pure algorithms that turn per-camera detections into candidate physical
//! objects. Nothing in this crate holds engine state or touches a channel.
//!
//! # Modules
//!
//! - [`transform`] – [`Mat4`][transform::Mat4]/[`Vec4`][transform::Vec4]
//!   primitives and [`world_from_camera`][transform::world_from_camera]:
//!   camera-local millimetre coordinates to homogeneous world metres.
//! - [`clustering`] – [`group_detections`][clustering::group_detections]:
//!   label + distance adjacency graph and BFS connected components.
//! - [`redundancy`] – [`prune_redundant`][redundancy::prune_redundant]:
//!   collapses same-camera duplicates within a group to the
//!   highest-confidence detection.

pub mod clustering;
pub mod redundancy;
pub mod transform;
