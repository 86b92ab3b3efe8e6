//! Synthetic camera producers for demo mode.
//!
//! One thread per calibrated camera pushes plausible detection batches at
//! the configured frame rate, so the whole stack runs headless — no depth
//! hardware, no inference — in demos and smoke tests. Each simulated camera
//! watches the same wandering "person" from its own frame, with per-camera
//! confidence jitter and the occasional zero-depth ghost to exercise the
//! filter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rand::Rng;
use spatialfuse_middleware::IntakeProducer;
use spatialfuse_types::{DetectionBatch, RawDetection};
use tracing::info;

/// Fraction of simulated detections reported with invalid (zero) depth.
const GHOST_RATE: f64 = 0.05;

/// Spawn one producer thread per handle. Threads run until `shutdown`
/// flips; join the returned handles after setting it.
pub fn spawn_producers(
    producers: Vec<IntakeProducer>,
    target_fps: u32,
    shutdown: Arc<AtomicBool>,
) -> Vec<JoinHandle<()>> {
    let period = Duration::from_millis((1000 / target_fps.max(1)) as u64);
    let epoch = Instant::now();

    producers
        .into_iter()
        .map(|producer| {
            let shutdown = Arc::clone(&shutdown);
            std::thread::spawn(move || {
                info!(camera = %producer.camera_id(), "simulated camera started");
                let mut rng = rand::thread_rng();
                while !shutdown.load(Ordering::Acquire) {
                    let ts_ms = epoch.elapsed().as_millis() as i64;
                    let mut batch = synthetic_batch(&mut rng, ts_ms);
                    batch.camera_id = producer.camera_id().to_string();
                    producer.push(batch);
                    std::thread::sleep(period);
                }
            })
        })
        .collect()
}

/// One camera tick: a single "person" wandering a slow circle ~2 m out,
/// seen with jittered position and confidence.
fn synthetic_batch(rng: &mut impl Rng, ts_ms: i64) -> DetectionBatch {
    let phase = ts_ms as f32 / 5000.0;
    let z_mm = if rng.gen_bool(GHOST_RATE) {
        0.0
    } else {
        2000.0 + 300.0 * phase.sin() + rng.gen_range(-50.0..50.0)
    };
    let detection = RawDetection {
        label: "person".to_string(),
        confidence: rng.gen_range(0.6..0.99),
        x_mm: 400.0 * phase.cos() + rng.gen_range(-50.0..50.0),
        y_mm: rng.gen_range(-100.0..100.0),
        z_mm,
    };
    // The caller stamps the producing camera's id on the batch.
    DetectionBatch {
        camera_id: String::new(),
        timestamp_ms: ts_ms,
        detections: vec![detection],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spatialfuse_middleware::IntakeQueue;

    #[test]
    fn producers_stop_on_shutdown() {
        let queue = IntakeQueue::new("cam-sim", 64);
        let shutdown = Arc::new(AtomicBool::new(false));
        let handles = spawn_producers(vec![queue.producer()], 100, Arc::clone(&shutdown));

        std::thread::sleep(Duration::from_millis(50));
        shutdown.store(true, Ordering::Release);
        for h in handles {
            h.join().unwrap();
        }

        let produced = std::iter::from_fn(|| queue.try_pop()).count();
        assert!(produced > 0, "simulated camera produced nothing");
    }

    #[test]
    fn synthetic_batches_validate() {
        let mut rng = rand::thread_rng();
        for ts in (0..2000i64).step_by(33) {
            let mut batch = synthetic_batch(&mut rng, ts);
            batch.camera_id = "cam-sim".to_string();
            assert!(batch.validate().is_ok());
        }
    }
}
