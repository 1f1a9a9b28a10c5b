//! Scraper status polling.
//!
//! A status screen mounts a [`StatusMonitor`], which owns at most one
//! polling task. The task fetches on a fixed interval (no backoff, no
//! jitter), publishes each snapshot on a `watch` channel and exits once a
//! non-running status shows up or its [`CancellationToken`] fires. Dropping
//! a [`PollHandle`] cancels the task, so a forgotten handle cannot leak a
//! timer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ListingsApi, ScraperStatus};

/// Cadence when no run is known to be in progress.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
/// Cadence while a run is in progress.
pub const DEFAULT_ACTIVE_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub active_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            active_interval: DEFAULT_ACTIVE_INTERVAL,
        }
    }
}

impl PollConfig {
    fn delay_after(&self, last: Option<&ScraperStatus>) -> Duration {
        match last {
            Some(status) if status.is_running() => self.active_interval,
            _ => self.interval,
        }
    }
}

/// Counts live polling tasks; decremented when the task ends for any reason.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handle to one running poll task.
pub struct PollHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    updates: watch::Receiver<Option<ScraperStatus>>,
}

impl PollHandle {
    pub fn spawn(api: Arc<dyn ListingsApi>, config: PollConfig) -> Self {
        Self::spawn_counted(api, config, Arc::new(AtomicUsize::new(0)))
    }

    fn spawn_counted(
        api: Arc<dyn ListingsApi>,
        config: PollConfig,
        active: Arc<AtomicUsize>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (tx, updates) = watch::channel(None);
        let guard = ActiveGuard::new(active);

        let task = tokio::spawn(poll_loop(api, config, cancel.clone(), tx, guard));

        Self {
            cancel,
            task: Some(task),
            updates,
        }
    }

    /// Receiver yielding every snapshot; starts at `None`.
    pub fn subscribe(&self) -> watch::Receiver<Option<ScraperStatus>> {
        self.updates.clone()
    }

    /// Most recent snapshot, if any has arrived.
    pub fn latest(&self) -> Option<ScraperStatus> {
        self.updates.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Cancel the task and wait for it to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        self.join().await;
    }

    /// Wait for the task to end on its own and return the final snapshot.
    pub async fn wait(mut self) -> Option<ScraperStatus> {
        self.join().await;
        self.latest()
    }

    async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "Status poll task panicked");
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn poll_loop(
    api: Arc<dyn ListingsApi>,
    config: PollConfig,
    cancel: CancellationToken,
    tx: watch::Sender<Option<ScraperStatus>>,
    _guard: ActiveGuard,
) {
    debug!(
        interval_secs = config.interval.as_secs(),
        active_interval_secs = config.active_interval.as_secs(),
        "Status polling started"
    );

    loop {
        let fetched = tokio::select! {
            _ = cancel.cancelled() => break,
            result = api.scraper_status() => result,
        };

        match fetched {
            Ok(status) => {
                let running = status.is_running();
                tx.send_replace(Some(status));
                if !running {
                    info!("Scraper run not active, polling stopped");
                    break;
                }
            }
            Err(err) => {
                warn!(error = %err, "Status poll failed");
            }
        }

        let delay = config.delay_after(tx.borrow().as_ref());
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    debug!("Status polling task exiting");
}

/// Screen-scoped owner of the status poll.
///
/// `mount` replaces any previous task and `unmount` stops the current one,
/// so however often a screen is shown and hidden, at most one task runs.
pub struct StatusMonitor {
    api: Arc<dyn ListingsApi>,
    config: PollConfig,
    active: Arc<AtomicUsize>,
    current: Option<PollHandle>,
}

impl StatusMonitor {
    pub fn new(api: Arc<dyn ListingsApi>, config: PollConfig) -> Self {
        Self {
            api,
            config,
            active: Arc::new(AtomicUsize::new(0)),
            current: None,
        }
    }

    /// Start polling, stopping any task from a previous mount first.
    pub async fn mount(&mut self) -> watch::Receiver<Option<ScraperStatus>> {
        self.unmount().await;
        let handle = PollHandle::spawn_counted(self.api.clone(), self.config, self.active.clone());
        let updates = handle.subscribe();
        self.current = Some(handle);
        updates
    }

    pub async fn unmount(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.stop().await;
        }
    }

    /// Take the running handle, e.g. to wait for the run to finish.
    pub fn detach(&mut self) -> Option<PollHandle> {
        self.current.take()
    }

    pub fn is_polling(&self) -> bool {
        self.current.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Number of poll tasks from this monitor that are still alive.
    pub fn active_pollers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}
