use crate::error::LaunchError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub enum Readiness {
    Pending,
    Ready,
    Failed(LaunchError),
}

impl Readiness {
    pub fn is_pending(&self) -> bool {
        matches!(self, Readiness::Pending)
    }
}

/// Write-once readiness result shared between the launch and its waiters.
///
/// The first `resolve`/`reject` wins; the check and the write happen under
/// the channel lock, so two concurrent callers can never both settle it.
#[derive(Clone)]
pub struct Deferred {
    tx: Arc<watch::Sender<Readiness>>,
}

impl Default for Deferred {
    fn default() -> Self {
        Self::new()
    }
}

impl Deferred {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Readiness::Pending);
        Self { tx: Arc::new(tx) }
    }

    /// Returns `true` only for the call that moved the result to `Ready`.
    pub fn resolve(&self) -> bool {
        self.settle(Readiness::Ready).is_none()
    }

    /// Hands the error back when the result was already settled.
    pub fn reject(&self, error: LaunchError) -> Result<(), LaunchError> {
        match self.settle(Readiness::Failed(error)) {
            Some(Readiness::Failed(error)) => Err(error),
            _ => Ok(()),
        }
    }

    pub fn state(&self) -> Readiness {
        self.tx.borrow().clone()
    }

    pub fn is_settled(&self) -> bool {
        !self.tx.borrow().is_pending()
    }

    /// Completes once the result leaves `Pending`.
    pub fn wait(&self) -> impl Future<Output = Result<(), LaunchError>> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            let outcome = rx
                .wait_for(|state| !state.is_pending())
                .await
                .map(|state| state.clone());
            match outcome {
                Ok(Readiness::Failed(error)) => Err(error),
                Ok(_) => Ok(()),
                Err(_) => Err(LaunchError::Abandoned),
            }
        }
    }

    // Returns the outcome back when it lost the race.
    fn settle(&self, outcome: Readiness) -> Option<Readiness> {
        let mut outcome = Some(outcome);
        self.tx.send_if_modified(|state| match (state.is_pending(), outcome.take()) {
            (true, Some(next)) => {
                *state = next;
                true
            }
            (_, rest) => {
                outcome = rest;
                false
            }
        });
        outcome
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::io;

    fn broken_pipe() -> LaunchError {
        LaunchError::process("Renderer", io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
    }

    #[tokio::test]
    async fn resolves_exactly_once() {
        let deferred = Deferred::new();
        let waiter = deferred.wait();
        assert!(deferred.resolve());
        assert!(!deferred.resolve());
        assert!(deferred.is_settled());
        assert!(waiter.await.is_ok());
    }

    #[tokio::test]
    async fn reject_after_resolve_returns_error() {
        let deferred = Deferred::new();
        assert!(deferred.resolve());
        let err = deferred.reject(broken_pipe()).unwrap_err();
        assert!(matches!(err, LaunchError::Process { .. }));
        assert!(matches!(deferred.state(), Readiness::Ready));
        assert!(deferred.wait().await.is_ok());
    }

    #[tokio::test]
    async fn resolve_after_reject_has_no_effect() {
        let deferred = Deferred::new();
        assert!(deferred.reject(broken_pipe()).is_ok());
        assert!(!deferred.resolve());
        assert!(matches!(deferred.wait().await, Err(LaunchError::Process { .. })));
    }

    #[tokio::test]
    async fn pending_until_settled() {
        let deferred = Deferred::new();
        assert!(deferred.wait().now_or_never().is_none());
        assert!(matches!(deferred.state(), Readiness::Pending));
    }

    #[tokio::test]
    async fn dropped_while_pending_is_abandoned() {
        let deferred = Deferred::new();
        let waiter = deferred.wait();
        drop(deferred);
        assert!(matches!(waiter.await, Err(LaunchError::Abandoned)));
    }

    #[tokio::test]
    async fn settled_result_survives_drop() {
        let deferred = Deferred::new();
        let waiter = deferred.wait();
        deferred.resolve();
        drop(deferred);
        assert!(waiter.await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_resolvers_settle_once() {
        let deferred = Deferred::new();
        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let d = deferred.clone();
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        d.resolve()
                    } else {
                        d.reject(broken_pipe()).is_ok()
                    }
                })
            })
            .collect();

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert!(deferred.is_settled());
    }
}
