//! Time Window Scheduler.
//!
//! The cameras run on independent clocks, so detections for the same instant
//! arrive spread over tens of milliseconds. Incoming world detections are
//! bucketed by their exact source millisecond; a bucket becomes eligible for
//! flushing once the watermark — the newest timestamp seen across all
//! cameras — has moved past it by more than one frame period, which gives
//! every currently active camera a fair chance to report. A flush then
//! merges every bucket inside 0.8 frame periods of the oldest one into a
//! single window.
//!
//! A camera that goes silent never advances the watermark by itself; fusion
//! keeps flowing as long as any other camera keeps reporting. If *no* camera
//! reports, the oldest bucket stalls indefinitely unless a maximum bucket
//! age is configured, in which case it is force-flushed on wall-clock age
//! alone.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use spatialfuse_types::WorldDetection;
use tracing::{debug, trace};

/// Fraction of a frame period that one fused window spans.
const WINDOW_WIDTH_FACTOR: f32 = 0.8;

/// One flushed window: its start timestamp and every detection whose bucket
/// fell inside the window.
#[derive(Debug)]
pub struct FlushWindow {
    pub start_ms: i64,
    pub detections: Vec<WorldDetection>,
}

struct Bucket {
    detections: Vec<WorldDetection>,
    /// Wall-clock creation time, used only by the max-age force flush.
    created_at: Instant,
}

/// Watermark-gated window scheduler over per-millisecond buckets.
///
/// The `BTreeMap` keeps pending bucket timestamps in ascending order, so the
/// oldest bucket is always the first entry and flushed windows come out in
/// non-decreasing start order by construction.
pub struct TimeWindowScheduler {
    timeout_s: f32,
    window_width_ms: i64,
    max_bucket_age: Option<Duration>,
    buckets: BTreeMap<i64, Bucket>,
    watermark_ms: i64,
}

impl TimeWindowScheduler {
    /// Create a scheduler for producers running at `target_fps`.
    ///
    /// The flush timeout is one frame period; the window width is
    /// [`WINDOW_WIDTH_FACTOR`] of one. `max_bucket_age_ms`, when set, bounds
    /// how long a bucket may wait for the watermark before being flushed on
    /// wall-clock age alone.
    pub fn new(target_fps: u32, max_bucket_age_ms: Option<u64>) -> Self {
        let frame_time_ms = 1000.0 / target_fps.max(1) as f32;
        Self {
            timeout_s: frame_time_ms / 1000.0,
            window_width_ms: (frame_time_ms * WINDOW_WIDTH_FACTOR) as i64,
            max_bucket_age: max_bucket_age_ms.map(Duration::from_millis),
            buckets: BTreeMap::new(),
            watermark_ms: 0,
        }
    }

    /// Advance the watermark to `ts_ms` if it is the newest timestamp seen.
    pub fn observe(&mut self, ts_ms: i64) {
        self.watermark_ms = self.watermark_ms.max(ts_ms);
    }

    /// Buffer `detections` into the bucket for `ts_ms` and advance the
    /// watermark.
    ///
    /// An empty set still creates the bucket: the original producers send
    /// empty batches as clock carriers, and an all-ghost batch must still
    /// claim its window.
    pub fn insert(&mut self, ts_ms: i64, detections: Vec<WorldDetection>) {
        self.buckets
            .entry(ts_ms)
            .or_insert_with(|| Bucket {
                detections: Vec::new(),
                created_at: Instant::now(),
            })
            .detections
            .extend(detections);
        self.observe(ts_ms);
        trace!(ts_ms, pending = self.buckets.len(), "buffered detections");
    }

    /// Newest timestamp observed across all cameras, in milliseconds.
    pub fn watermark_ms(&self) -> i64 {
        self.watermark_ms
    }

    /// Number of pending (unflushed) buckets.
    pub fn pending_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Flush the oldest window if it is due. At most one window per call.
    ///
    /// A window is due when the watermark has moved past its oldest bucket
    /// by more than the timeout, or — with a max bucket age configured —
    /// when that bucket has waited longer than the age bound. The returned
    /// window merges every bucket within the window width of the oldest.
    pub fn flush_due(&mut self) -> Option<FlushWindow> {
        let (&oldest_ms, bucket) = self.buckets.first_key_value()?;

        let timed_out = (self.watermark_ms - oldest_ms) as f32 / 1000.0 > self.timeout_s;
        let over_age = self
            .max_bucket_age
            .is_some_and(|max| bucket.created_at.elapsed() > max);
        if !timed_out && !over_age {
            return None;
        }

        let window = self.merge_from(oldest_ms);
        debug!(
            start_ms = window.start_ms,
            detections = window.detections.len(),
            forced = over_age && !timed_out,
            "flushed time window"
        );
        Some(window)
    }

    /// Flush everything still pending, windowed by the same width rule but
    /// ignoring the watermark. Used for graceful shutdown so partial windows
    /// are not silently discarded.
    pub fn drain_all(&mut self) -> Vec<FlushWindow> {
        let mut windows = Vec::new();
        while let Some((&oldest_ms, _)) = self.buckets.first_key_value() {
            windows.push(self.merge_from(oldest_ms));
        }
        windows
    }

    /// Remove and merge every bucket with a timestamp inside the window
    /// starting at `start_ms`.
    fn merge_from(&mut self, start_ms: i64) -> FlushWindow {
        let window_end_ms = start_ms + self.window_width_ms;
        let mut detections = Vec::new();
        while let Some(entry) = self.buckets.first_entry() {
            if *entry.key() > window_end_ms {
                break;
            }
            detections.append(&mut entry.remove().detections);
        }
        FlushWindow {
            start_ms,
            detections,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
