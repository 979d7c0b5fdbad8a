use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

/// Single-trigger cancellation signal shared by every listener
///
/// Cloning yields another handle to the same signal. The first call to
/// [`trigger`](Self::trigger) records its reason and wakes every waiter;
/// later calls change nothing.
///
/// # Examples
///
/// ```
/// use echoprobe::lifecycle::CancellationSignal;
///
/// let signal = CancellationSignal::new();
/// assert!(signal.trigger("listener one failed"));
/// assert!(!signal.trigger("listener two failed"));
/// assert_eq!(signal.reason().as_deref(), Some("listener one failed"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<String>>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the signal; returns `true` only for the call that fired it
    pub fn trigger(&self, reason: impl Into<String>) -> bool {
        let fired = self.reason.set(reason.into()).is_ok();
        self.token.cancel();
        fired
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Reason given by the call that fired this signal
    ///
    /// `None` when not fired, or when it was fired through a parent.
    pub fn reason(&self) -> Option<String> {
        self.reason.get().cloned()
    }

    /// Completes once the signal (or a parent) has fired
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// A signal that fires with this one but can also fire on its own
    /// without affecting this one
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            reason: Arc::new(OnceLock::new()),
        }
    }
}
