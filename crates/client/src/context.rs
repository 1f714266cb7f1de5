//! Per-call cancellation and deadline signal.

use etcdkit_common::CancelReason;
use tokio::sync::watch;
use tokio::time::{Duration, Instant};

/// External signal that can stop a call mid-flight.
///
/// A context may carry a cancel flag (a `watch` receiver that flips to
/// `true`), a deadline, both, or neither. A context whose cancel sender was
/// dropped without flipping is never cancelled by signal.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Sender half returned by [`CallContext::cancellable`].
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    /// Cancel every context created from this handle.
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }
}

impl CallContext {
    /// A context that is never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// A fresh context together with the handle that cancels it.
    pub fn cancellable() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle(tx), Self::background().with_cancel(rx))
    }

    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking check, used before the first attempt.
    pub fn check(&self) -> Option<CancelReason> {
        if let Some(rx) = &self.cancel {
            if *rx.borrow() {
                return Some(CancelReason::Signal);
            }
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled. Pending forever otherwise.
    pub async fn cancelled(&self) -> CancelReason {
        let signal = async {
            if let Some(mut rx) = self.cancel.clone() {
                loop {
                    let cancelled = *rx.borrow_and_update();
                    if cancelled {
                        return;
                    }
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
            }
            std::future::pending::<()>().await
        };
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = signal => CancelReason::Signal,
            _ = deadline => CancelReason::DeadlineExceeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_never_cancels() {
        let ctx = CallContext::background();
        assert_eq!(ctx.check(), None);
        let waited = tokio::time::timeout(Duration::from_millis(20), ctx.cancelled()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_signal_cancels() {
        let (handle, ctx) = CallContext::cancellable();
        assert_eq!(ctx.check(), None);
        assert!(!handle.is_cancelled());

        let waiter = tokio::spawn({
            let ctx = ctx.clone();
            async move { ctx.cancelled().await }
        });
        handle.cancel();
        assert_eq!(waiter.await.unwrap(), CancelReason::Signal);
        assert_eq!(ctx.check(), Some(CancelReason::Signal));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cancels() {
        let ctx = CallContext::background().with_timeout(Duration::from_secs(1));
        assert_eq!(ctx.check(), None);

        let start = Instant::now();
        assert_eq!(ctx.cancelled().await, CancelReason::DeadlineExceeded);
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert_eq!(ctx.check(), Some(CancelReason::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_dropped_sender_is_not_cancellation() {
        let (handle, ctx) = CallContext::cancellable();
        drop(handle);
        assert_eq!(ctx.check(), None);
        let waited = tokio::time::timeout(Duration::from_millis(20), ctx.cancelled()).await;
        assert!(waited.is_err());
    }
}
