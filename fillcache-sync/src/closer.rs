//! One-shot shutdown coordination.
//!
//! A [`Closer`] is closed exactly once, either by a process signal or by a
//! call to [`Closer::close`]. Every task waiting on it is released, and the
//! optional close error is handed to each of them.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use fillcache_core::BoxError;

use crate::flag::AtomicFlag;

/// Error a closer was closed with, shared between all waiters.
pub type CloseError = Arc<dyn std::error::Error + Send + Sync + 'static>;

type Outcome = Option<Result<(), CloseError>>;

/// Signal-aware shutdown notifier.
#[derive(Clone, Debug)]
pub struct Closer {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    closed: AtomicFlag,
    outcome: watch::Sender<Outcome>,
}

impl Closer {
    /// Creates a closer that also closes itself on SIGINT, SIGTERM or SIGABRT
    /// (ctrl-c on non-unix platforms).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new() -> Self {
        let closer = Self::manual();
        tokio::spawn(closer.clone().listen());
        closer
    }

    /// Creates a closer that only closes through [`close`](Self::close) or
    /// [`close_with_error`](Self::close_with_error).
    pub fn manual() -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                closed: AtomicFlag::new(false),
                outcome,
            }),
        }
    }

    /// Closes cleanly. Returns true if this call closed the closer.
    pub fn close(&self) -> bool {
        self.finish(Ok(()))
    }

    /// Closes with an error. Returns true if this call closed the closer.
    pub fn close_with_error<E>(&self, err: E) -> bool
    where
        E: Into<BoxError>,
    {
        let err: BoxError = err.into();
        self.finish(Err(Arc::from(err)))
    }

    /// Returns true once the closer has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    /// Waits until the closer is closed.
    ///
    /// Returns `Ok(())` for a clean close, or the error it was closed with.
    /// Waiters arriving after the close return immediately.
    pub async fn wait(&self) -> Result<(), CloseError> {
        let mut rx = self.inner.outcome.subscribe();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(state) => (*state).clone(),
            Err(_) => None,
        };
        outcome.unwrap_or(Ok(()))
    }

    fn finish(&self, outcome: Result<(), CloseError>) -> bool {
        if !self.inner.closed.set_true() {
            return false;
        }
        debug!(clean = outcome.is_ok(), "Closer closed");
        self.inner.outcome.send_replace(Some(outcome));
        true
    }

    async fn listen(self) {
        let received = tokio::select! {
            received = wait_for_signal() => received,
            _ = self.wait() => return,
        };

        match received {
            Ok(name) => {
                info!(signal = name, "Received shutdown signal");
                self.close();
            }
            Err(err) => warn!(error = %err, "Unable to listen for shutdown signals"),
        }
    }
}

impl Default for Closer {
    fn default() -> Self {
        Self::manual()
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut abort = signal(abort_signal())?;

    tokio::select! {
        _ = interrupt.recv() => Ok("SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
        _ = abort.recv() => Ok("SIGABRT"),
    }
}

#[cfg(unix)]
fn abort_signal() -> tokio::signal::unix::SignalKind {
    tokio::signal::unix::SignalKind::from_raw(libc::SIGABRT)
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_close_with_error_reaches_waiter() {
        let closer = Closer::manual();
        let remote = closer.clone();

        tokio::spawn(async move {
            remote.close_with_error("HALP");
        });

        let err = closer.wait().await.unwrap_err();
        assert_eq!(err.to_string(), "HALP");
    }

    #[tokio::test]
    async fn test_close_only_once() {
        let closer = Closer::manual();
        assert!(!closer.is_closed());

        assert!(closer.close());
        assert!(!closer.close());
        assert!(!closer.close_with_error("late"));
        assert!(closer.is_closed());

        // The first close wins, so the outcome stays clean.
        assert!(closer.wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_many_waiters_released() {
        let closer = Closer::manual();
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let closer = closer.clone();
                tokio::spawn(async move { closer.wait().await.is_ok() })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(10)).await;
        closer.close();

        for waiter in waiters {
            assert!(waiter.await.unwrap());
        }
    }

    #[test]
    fn test_manual_closer_outside_runtime() {
        let closer = Closer::default();
        assert!(closer.close());
        assert!(tokio_test::block_on(closer.wait()).is_ok());
    }

    #[tokio::test]
    async fn test_late_waiter_returns_immediately() {
        let closer = Closer::manual();
        closer.close_with_error("done");

        let result = tokio::time::timeout(Duration::from_secs(1), closer.wait()).await;
        assert!(result.unwrap().is_err());
    }

    // The only test that installs signal handlers, so the signal cannot leak
    // into another test's closer.
    #[cfg(unix)]
    #[tokio::test]
    async fn test_signal_listener_closes_on_abort() {
        let closer = Closer::new();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!closer.is_closed());

        let status = std::process::Command::new("kill")
            .args(["-s", "ABRT", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let result = tokio::time::timeout(Duration::from_secs(5), closer.wait()).await;
        assert!(result.unwrap().is_ok());
        assert!(closer.is_closed());
        assert!(!closer.close());
    }
}
