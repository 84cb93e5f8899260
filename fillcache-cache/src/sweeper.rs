//! Background removal of expired entries.

use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::cache::Directory;

/// Handle to a running sweeper thread.
///
/// The thread only holds a weak reference to the directory, and stops either
/// when asked to or when the directory is gone.
#[derive(Debug)]
pub(crate) struct Sweeper {
    stop: Arc<StopSignal>,
    handle: Option<JoinHandle<()>>,
}

#[derive(Debug, Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl Sweeper {
    /// Starts sweeping `directory` every `interval`.
    ///
    /// Returns `None` if the thread could not be spawned; the cache then keeps
    /// working and expired entries are simply refilled in place.
    pub(crate) fn spawn<V, E>(directory: Weak<Directory<V, E>>, interval: Duration) -> Option<Self>
    where
        V: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        let stop = Arc::new(StopSignal::default());
        let signal = Arc::clone(&stop);

        let spawned = std::thread::Builder::new()
            .name("fillcache-sweeper".into())
            .spawn(move || run(&directory, interval, &signal));

        match spawned {
            Ok(handle) => {
                debug!(
                    interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
                    "Sweeper started"
                );
                Some(Self {
                    stop,
                    handle: Some(handle),
                })
            }
            Err(err) => {
                warn!(error = %err, "Failed to spawn sweeper thread, expired entries will not be swept");
                None
            }
        }
    }

    /// Stops the thread and waits for it to exit.
    pub(crate) fn stop(&mut self) {
        *self.stop.stopped.lock() = true;
        self.stop.wake.notify_all();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Sweeper thread panicked");
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<V, E>(directory: &Weak<Directory<V, E>>, interval: Duration, signal: &StopSignal)
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    loop {
        {
            let mut stopped = signal.stopped.lock();
            if !*stopped {
                signal.wake.wait_for(&mut stopped, interval);
            }
            if *stopped {
                break;
            }
        }

        let Some(directory) = directory.upgrade() else {
            break;
        };
        directory.purge_expired();
    }
    debug!("Sweeper stopped");
}
