//! Fusion output bus.
//!
//! A single fan-out channel built on [`tokio::sync::broadcast`]: every
//! subscriber receives every fused frame, and a slow subscriber lags (loses
//! old frames) instead of blocking the engine or its peers. Downstream
//! consumers — rendering, logging, further pipeline stages — all attach
//! here.

use spatialfuse_types::{FuseError, FusionOutput};
use tokio::sync::broadcast;

/// Default number of buffered frames before the oldest are dropped for slow
/// subscribers.
const DEFAULT_CAPACITY: usize = 64;

/// Shared fan-out channel for [`FusionOutput`] frames. Clone it cheaply –
/// all clones feed the same underlying broadcast channel.
#[derive(Clone, Debug)]
pub struct FusionBus {
    sender: broadcast::Sender<FusionOutput>,
}

impl FusionBus {
    /// Create a bus buffering up to `capacity` frames per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish one fused frame to every current subscriber.
    ///
    /// Returns the number of receivers the frame was handed to. With no
    /// subscribers attached the frame has nowhere to go and
    /// [`FuseError::Channel`] is returned; the emitter treats that as a
    /// best-effort condition, not a fault.
    pub fn publish(&self, output: FusionOutput) -> Result<usize, FuseError> {
        self.sender
            .send(output)
            .map_err(|_| FuseError::Channel("no subscribers on fusion bus".to_string()))
    }

    /// Attach a new subscriber. Frames published from now on are delivered
    /// to it alongside every other subscriber.
    pub fn subscribe(&self) -> FusionReceiver {
        FusionReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of currently attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for FusionBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// One subscriber's end of the fusion bus.
pub struct FusionReceiver {
    receiver: broadcast::Receiver<FusionOutput>,
}

impl FusionReceiver {
    /// Wait for the next fused frame.
    ///
    /// Returns:
    /// * `Ok(output)` – the next frame.
    /// * `Err(RecvError::Lagged(n))` – this subscriber fell behind and `n`
    ///   frames were dropped; the caller decides whether to continue.
    /// * `Err(RecvError::Closed)` – the engine has shut down.
    pub async fn recv(&mut self) -> Result<FusionOutput, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Nonblocking poll for a frame that is already buffered.
    pub fn try_recv(&mut self) -> Result<FusionOutput, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }
}
