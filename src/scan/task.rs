// src/scan/task.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::types::Shard;

/// Longest budget a deadline is allowed to express; about 30 years.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `now + timeout`, clamped so an absurdly long timeout cannot overflow `Instant`
pub fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout.min(FAR_FUTURE)).unwrap_or(now)
}

/// Read-only state shared by every worker of one scan
#[derive(Clone)]
pub struct ScanContext {
    pub keyword: Arc<str>,
    pub deadline: Instant,
    pub max_hosts_per_block: Option<usize>,
    cancel: watch::Receiver<bool>,
}

impl ScanContext {
    pub fn new(
        keyword: impl Into<Arc<str>>,
        deadline: Instant,
        max_hosts_per_block: Option<usize>,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            deadline,
            max_hosts_per_block,
            cancel,
        }
    }

    /// Deadline passed or cancellation requested
    pub fn is_stopped(&self) -> bool {
        Instant::now() >= self.deadline || *self.cancel.borrow()
    }

    /// Resolves once the scan must stop
    pub async fn stopped(&mut self) {
        let deadline = self.deadline;
        let cancel = &mut self.cancel;
        let cancelled = async move {
            // A dropped sender can never cancel; fall back to the deadline
            let closed = cancel.wait_for(|stop| *stop).await.is_err();
            if closed {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {}
            _ = cancelled => {}
        }
    }
}

/// One worker's assignment
pub struct ScanTask {
    pub shard: Shard,
    pub context: ScanContext,
}

/// Requests early termination of a running scan
#[derive(Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub(crate) fn new(tx: Arc<watch::Sender<bool>>) -> Self {
        Self { tx }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_after_saturates() {
        let before = Instant::now();
        let deadline = deadline_after(Duration::MAX);
        assert!(deadline >= before + FAR_FUTURE);

        let short = deadline_after(Duration::from_secs(5));
        assert!(short <= Instant::now() + Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_deadline_stops_context() {
        let (_tx, rx) = watch::channel(false);
        let mut ctx = ScanContext::new("k", Instant::now() + Duration::from_millis(50), None, rx);

        assert!(!ctx.is_stopped());
        tokio::time::timeout(Duration::from_secs(2), ctx.stopped())
            .await
            .expect("deadline should stop the context");
        assert!(ctx.is_stopped());
    }

    #[tokio::test]
    async fn test_cancel_handle_stops_context() {
        let tx = Arc::new(watch::channel(false).0);
        let handle = CancelHandle::new(Arc::clone(&tx));
        let mut ctx = ScanContext::new(
            "k",
            Instant::now() + Duration::from_secs(60),
            None,
            tx.subscribe(),
        );

        handle.cancel();
        assert!(handle.is_cancelled());
        tokio::time::timeout(Duration::from_secs(2), ctx.stopped())
            .await
            .expect("cancel should stop the context");
        assert!(ctx.is_stopped());
    }
}
