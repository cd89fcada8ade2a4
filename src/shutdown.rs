//! Cooperative shutdown signalling.
//!
//! Every long-lived task holds a [`Receiver`] and races it against its own
//! work in `select!`. The signal is sticky: receivers that subscribe or poll
//! after the signal was raised still observe it.

use tokio::sync::watch;

/// Creates a connected shutdown sender/receiver pair.
pub fn channel() -> (Sender, Receiver) {
    let (tx, rx) = watch::channel(false);
    (Sender { tx }, Receiver { rx })
}

/// Raises the shutdown signal.
pub struct Sender {
    tx: watch::Sender<bool>,
}

impl Sender {
    /// Signals shutdown to every receiver, current and future.
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// Observes the shutdown signal.
#[derive(Debug, Clone)]
pub struct Receiver {
    rx: watch::Receiver<bool>,
}

impl Receiver {
    /// Completes once shutdown has been signalled.
    ///
    /// A dropped [`Sender`] counts as shutdown.
    pub async fn recv(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Returns true if shutdown has been signalled.
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recv_completes_after_signal() {
        let (tx, mut rx) = channel();
        assert!(!rx.is_shutdown());
        tx.shutdown();
        rx.recv().await;
        assert!(rx.is_shutdown());
    }

    #[tokio::test]
    async fn late_clone_still_observes_signal() {
        let (tx, rx) = channel();
        tx.shutdown();
        let mut late = rx.clone();
        late.recv().await;
        assert!(late.is_shutdown());
    }

    #[tokio::test]
    async fn dropped_sender_counts_as_shutdown() {
        let (tx, mut rx) = channel();
        drop(tx);
        rx.recv().await;
    }
}
