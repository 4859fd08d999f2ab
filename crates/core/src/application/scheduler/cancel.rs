// Batch Cancellation Token

use tokio::sync::watch;

/// Cancellation signal checked between dispatches
///
/// Cooperative only: in-flight jobs always run to completion.
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for the cancellation signal
    pub async fn wait(&mut self) {
        while !*self.rx.borrow() {
            if self.rx.changed().await.is_err() {
                // Handle dropped without cancelling; park forever so a
                // select! against real work never spuriously fires.
                std::future::pending::<()>().await;
            }
        }
    }

    /// Token that can never fire
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }
}

/// Cancellation sender
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Request cancellation of the batch
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a cancellation channel
pub fn cancel_channel() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}
