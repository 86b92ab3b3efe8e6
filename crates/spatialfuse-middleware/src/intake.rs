//! Per-camera intake queues.
//!
//! Each camera gets one statically typed bounded channel, resolved at engine
//! construction from the extrinsics map — no dynamic named-port lookup at
//! runtime. Producers push with [`IntakeProducer::push`], which never blocks:
//! when the queue is full the oldest buffered batch is discarded to make
//! room, so a stalled fusion loop costs stale frames rather than producer
//! latency. The engine drains with the equally nonblocking
//! [`IntakeQueue::try_pop`].

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use spatialfuse_types::DetectionBatch;
use tracing::warn;

/// Default per-camera queue depth, in batches.
pub const DEFAULT_CAPACITY: usize = 4;

/// Consumer end of one camera's intake queue. Owned by the fusion loop.
pub struct IntakeQueue {
    camera_id: String,
    tx: Sender<DetectionBatch>,
    rx: Receiver<DetectionBatch>,
}

impl IntakeQueue {
    /// Create a queue for `camera_id` holding at most `capacity` batches.
    pub fn new(camera_id: impl Into<String>, capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self {
            camera_id: camera_id.into(),
            tx,
            rx,
        }
    }

    /// Hand out a producer handle. Handles are cheap to clone and safe to
    /// use from any thread.
    pub fn producer(&self) -> IntakeProducer {
        IntakeProducer {
            camera_id: self.camera_id.clone(),
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }

    /// Nonblocking pop of the oldest pending batch.
    pub fn try_pop(&self) -> Option<DetectionBatch> {
        self.rx.try_recv().ok()
    }

    /// The camera this queue belongs to.
    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }
}

/// Producer end of one camera's intake queue.
///
/// Holds a receiver clone of the same channel so it can evict the oldest
/// batch when the queue is full (the channel is MPMC underneath).
#[derive(Clone)]
pub struct IntakeProducer {
    camera_id: String,
    tx: Sender<DetectionBatch>,
    rx: Receiver<DetectionBatch>,
}

impl IntakeProducer {
    /// Push a batch without ever blocking.
    ///
    /// On a full queue the oldest buffered batch is dropped to make room;
    /// if eviction races with the consumer and the retry still fails, the
    /// new batch itself is dropped. Either way the producer thread moves on.
    pub fn push(&self, batch: DetectionBatch) {
        let mut pending = batch;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    if self.rx.try_recv().is_ok() {
                        warn!(camera = %self.camera_id, "intake queue full; dropped oldest batch");
                        pending = rejected;
                        continue;
                    }
                    // Queue drained between Full and the eviction attempt;
                    // one more try, then give up on this batch.
                    if self.tx.try_send(rejected).is_err() {
                        warn!(camera = %self.camera_id, "intake queue contended; dropped new batch");
                    }
                    return;
                }
                Err(TrySendError::Disconnected(_)) => {
                    warn!(camera = %self.camera_id, "intake queue closed; dropped batch");
                    return;
                }
            }
        }
    }

    /// The camera this producer feeds.
    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(ts: i64) -> DetectionBatch {
        DetectionBatch {
            camera_id: "cam-a".to_string(),
            timestamp_ms: ts,
            detections: Vec::new(),
        }
    }

    #[test]
    fn push_then_pop_preserves_fifo_order() {
        let queue = IntakeQueue::new("cam-a", 4);
        let producer = queue.producer();
        producer.push(batch(1));
        producer.push(batch(2));
        assert_eq!(queue.try_pop().unwrap().timestamp_ms, 1);
        assert_eq!(queue.try_pop().unwrap().timestamp_ms, 2);
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn overflow_drops_oldest() {
        let queue = IntakeQueue::new("cam-a", 4);
        let producer = queue.producer();
        for ts in 1..=6 {
            producer.push(batch(ts));
        }
        // Batches 1 and 2 were evicted; 3..=6 remain, in order.
        let remaining: Vec<i64> = std::iter::from_fn(|| queue.try_pop())
            .map(|b| b.timestamp_ms)
            .collect();
        assert_eq!(remaining, vec![3, 4, 5, 6]);
    }

    #[test]
    fn pop_on_empty_queue_is_none() {
        let queue = IntakeQueue::new("cam-a", 4);
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn producers_work_across_threads() {
        let queue = IntakeQueue::new("cam-a", 64);
        let handles: Vec<_> = (0..4i64)
            .map(|t| {
                let producer = queue.producer();
                std::thread::spawn(move || {
                    for i in 0..8i64 {
                        producer.push(batch(t * 100 + i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let count = std::iter::from_fn(|| queue.try_pop()).count();
        assert_eq!(count, 32);
    }
}
