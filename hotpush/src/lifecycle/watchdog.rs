//! Startup watchdog.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One-shot timer that fires unless canceled in time.
///
/// Arming again replaces the previous timer.
#[derive(Debug, Default)]
pub struct StartupWatchdog {
    token: Mutex<Option<CancellationToken>>,
}

impl StartupWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the timer; `on_expire` runs if it is not canceled within `timeout`.
    ///
    /// Requires a tokio runtime; without one the watchdog stays disarmed.
    pub fn arm<F>(&self, timeout: Duration, on_expire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Ok(handle) = Handle::try_current() else {
            warn!("No async runtime available, startup watchdog not armed");
            return;
        };

        let token = CancellationToken::new();
        if let Some(previous) = self.token.lock().replace(token.clone()) {
            previous.cancel();
        }

        debug!(timeout_secs = timeout.as_secs_f64(), "Startup watchdog armed");
        handle.spawn(async move {
            tokio::select! {
                biased;

                _ = token.cancelled() => {}

                _ = tokio::time::sleep(timeout) => {
                    token.cancel();
                    on_expire();
                }
            }
        });
    }

    /// Stop the timer. Returns whether it was running.
    pub fn cancel(&self) -> bool {
        match self.token.lock().take() {
            Some(token) => {
                let was_running = !token.is_cancelled();
                token.cancel();
                was_running
            }
            None => false,
        }
    }

    /// Whether a timer is running.
    pub fn is_armed(&self) -> bool {
        self.token
            .lock()
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }
}
