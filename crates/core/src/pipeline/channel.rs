//! Rendezvous hand-off between stages.
//!
//! A send completes only once a receiver that is waiting *right now* has taken
//! the item. Idle receivers park a one-shot slot on a ready queue; senders take
//! slots off that queue one at a time. Nothing is ever buffered, so a send
//! blocks while every worker of the receiving stage is busy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};

/// The item could not be handed off because every receiver is gone.
#[derive(Debug, PartialEq, Eq)]
pub struct SendError<T>(pub T);

impl<T> std::fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("stage channel closed")
    }
}

impl<T: std::fmt::Debug> std::error::Error for SendError<T> {}

/// Creates a rendezvous channel.
pub fn stage_channel<T>() -> (StageSender<T>, StageReceiver<T>) {
    let (ready_tx, ready_rx) = mpsc::unbounded_channel();
    let sender = StageSender {
        ready: Arc::new(Mutex::new(ready_rx)),
        waiting: Arc::new(AtomicUsize::new(0)),
    };
    let receiver = StageReceiver { ready: ready_tx };
    (sender, receiver)
}

/// Sending half. Cheap to clone; concurrent senders are served in turn.
pub struct StageSender<T> {
    ready: Arc<Mutex<mpsc::UnboundedReceiver<oneshot::Sender<T>>>>,
    waiting: Arc<AtomicUsize>,
}

impl<T> Clone for StageSender<T> {
    fn clone(&self) -> Self {
        Self {
            ready: Arc::clone(&self.ready),
            waiting: Arc::clone(&self.waiting),
        }
    }
}

impl<T> StageSender<T> {
    /// Hands `item` to a waiting receiver, waiting for one if none is idle.
    ///
    /// Cancel-safe: dropping the future before it resolves drops the item
    /// without delivering it.
    pub async fn send(&self, item: T) -> Result<(), SendError<T>> {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let _waiting = WaitingGuard(&self.waiting);

        let mut item = item;
        let mut ready = self.ready.lock().await;
        loop {
            let Some(slot) = ready.recv().await else {
                return Err(SendError(item));
            };
            // A receiver that stopped waiting leaves a dead slot behind.
            match slot.send(item) {
                Ok(()) => return Ok(()),
                Err(returned) => item = returned,
            }
        }
    }

    /// Number of sends currently blocked on this channel.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }
}

struct WaitingGuard<'a>(&'a AtomicUsize);

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Receiving half. Clone one per worker.
pub struct StageReceiver<T> {
    ready: mpsc::UnboundedSender<oneshot::Sender<T>>,
}

impl<T> Clone for StageReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            ready: self.ready.clone(),
        }
    }
}

impl<T> StageReceiver<T> {
    /// Waits for the next item. Returns `None` once every sender is gone.
    ///
    /// Cancel-safe: an abandoned wait is skipped by senders.
    pub async fn recv(&self) -> Option<T> {
        let (slot_tx, slot_rx) = oneshot::channel();
        self.ready.send(slot_tx).ok()?;
        slot_rx.await.ok()
    }
}
