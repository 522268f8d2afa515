use tokio::sync::watch;

/// Cancelling half of a request's cancellation pair. Owned by whoever
/// supersedes requests; dropping it without cancelling leaves the paired
/// token inert.
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

/// Observing half, handed to the transport layer alongside the request.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelSource {
    pub fn new() -> (CancelSource, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelSource { tx }, CancelToken { rx })
    }

    /// Mark the paired request obsolete. Takes effect on the observer's
    /// next poll; already-completed work is unaffected.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl CancelToken {
    /// A token that can never fire, for one-shot calls outside any
    /// supersession scheme.
    pub fn detached() -> CancelToken {
        let (_tx, rx) = watch::channel(false);
        CancelToken { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the source fires. A source dropped without cancelling
    /// parks this future forever, so a `select!` arm on it simply never
    /// wins.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let (source, token) = CancelSource::new();
        assert!(!token.is_cancelled());

        let waiter = tokio::spawn(async move {
            token.cancelled().await;
        });
        source.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should resolve after cancel")
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_source_never_fires() {
        let (source, token) = CancelSource::new();
        drop(source);

        assert!(!token.is_cancelled());
        let outcome =
            tokio::time::timeout(Duration::from_millis(50), token.cancelled()).await;
        assert!(outcome.is_err(), "cancelled() must stay pending");
    }

    #[tokio::test]
    async fn test_cancel_is_sticky() {
        let (source, token) = CancelSource::new();
        source.cancel();
        assert!(token.is_cancelled());
        // A late waiter still sees it.
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .expect("already-cancelled token resolves immediately");
    }

    #[tokio::test]
    async fn test_detached_token_is_inert() {
        let token = CancelToken::detached();
        assert!(!token.is_cancelled());
        let outcome =
            tokio::time::timeout(Duration::from_millis(50), token.cancelled()).await;
        assert!(outcome.is_err());
    }
}
