//! Cancellation tokens that halt scheduled work.
//!
//! Every event generator carries a [`CancellationToken`]; cancelling it
//! permanently finishes the generator and is handed to every action the
//! generator has already produced, so that descendant work can stop itself.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

/// A clonable, level-triggered cancellation flag.
///
/// All clones observe the same state. Once cancelled, a token stays
/// cancelled forever.
#[derive(Clone)]
pub struct CancellationToken {
    flag: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// Creates a new token in the not-cancelled state.
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self { flag: Arc::new(flag) }
    }

    /// Cancels this token and every clone of it.
    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    /// Returns whether the token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Completes once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut receiver = self.flag.subscribe();
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
