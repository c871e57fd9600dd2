//! # Cancellation
//!
//! One-shot cancellation signal consulted by the delivery watcher.
//! Submission never looks at it.

use tokio::sync::watch;

/// Sending half. Cancels every [`CancelSignal`] cloned from the pair.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    /// Raise the signal. Idempotent.
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// Receiving half, cheap to clone.
#[derive(Clone, Debug, Default)]
pub struct CancelSignal(Option<watch::Receiver<bool>>);

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self(None)
    }

    /// Whether the signal has already fired.
    pub fn is_cancelled(&self) -> bool {
        self.0.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Resolve once the signal fires.
    ///
    /// Stays pending forever when the signal cannot fire (no handle, or the
    /// handle was dropped without cancelling).
    pub async fn cancelled(&self) {
        let Some(rx) = &self.0 else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Create a connected handle/signal pair.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelSignal(Some(rx)))
}
