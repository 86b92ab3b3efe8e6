//! Fused Output Emitter.
//!
//! Wraps each flushed window's pruned groups in a [`FusionFrame`] — the
//! explicit, versionable wire schema — serializes it to JSON bytes, and
//! publishes the result on the [`FusionBus`]. Exactly one payload leaves per
//! window, and window-start timestamps never go backwards across emissions.

use chrono::Utc;
use spatialfuse_middleware::FusionBus;
use spatialfuse_types::{FuseError, FusedGroup, FusionFrame, FusionOutput};
use tracing::debug;
use uuid::Uuid;

/// Serializing, order-enforcing front of the fusion output bus.
pub struct FusedOutputEmitter {
    bus: FusionBus,
    last_window_start_ms: Option<i64>,
}

impl FusedOutputEmitter {
    pub fn new(bus: FusionBus) -> Self {
        Self {
            bus,
            last_window_start_ms: None,
        }
    }

    /// Serialize and publish one window's fused groups.
    ///
    /// Returns the number of subscribers the frame reached (zero when nobody
    /// is listening, which is not a fault).
    ///
    /// # Errors
    ///
    /// - [`FuseError::NonMonotonicWindow`] if `window_start_ms` regresses
    ///   behind an earlier emission; the window is refused.
    /// - [`FuseError::Serialization`] if the frame cannot be encoded; the
    ///   window is lost, later windows are unaffected.
    pub fn emit(
        &mut self,
        window_start_ms: i64,
        groups: Vec<FusedGroup>,
    ) -> Result<usize, FuseError> {
        if let Some(previous_ms) = self.last_window_start_ms
            && window_start_ms < previous_ms
        {
            return Err(FuseError::NonMonotonicWindow {
                previous_ms,
                offered_ms: window_start_ms,
            });
        }

        let frame = FusionFrame {
            id: Uuid::new_v4(),
            emitted_at: Utc::now(),
            window_start_ms,
            groups,
        };
        let payload =
            serde_json::to_vec(&frame).map_err(|e| FuseError::Serialization(e.to_string()))?;

        self.last_window_start_ms = Some(window_start_ms);

        match self.bus.publish(FusionOutput {
            window_start_ms,
            payload,
        }) {
            Ok(receivers) => Ok(receivers),
            Err(_) => {
                // Nobody listening yet; the frame is simply unobserved.
                debug!(window_start_ms, "emitted fused frame with no subscribers");
                Ok(0)
            }
        }
    }

    /// Window start of the most recent emission, if any.
    pub fn last_window_start_ms(&self) -> Option<i64> {
        self.last_window_start_ms
    }
}
