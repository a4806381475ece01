use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::SessionStore;
use crate::models::Roster;

/// Default period between background roster saves.
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(6 * 60);

struct AutosaveTask {
    snapshot: watch::Sender<Roster>,
    handle: JoinHandle<()>,
}

/// Periodic background save of the roster being completed.
///
/// At most one task runs at a time. The task saves the latest snapshot passed
/// to [`Autosave::update`] once per interval and skips empty rosters.
pub struct Autosave {
    store: Arc<dyn SessionStore>,
    interval: Duration,
    task: Option<AutosaveTask>,
}

impl Autosave {
    pub fn new(store: Arc<dyn SessionStore>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Starts the timer with `roster` as the first snapshot, replacing any
    /// running task. Must be called from within a tokio runtime.
    pub fn start(&mut self, roster: Roster) {
        if let Some(task) = self.task.take() {
            task.handle.abort();
        }

        let (snapshot, mut receiver) = watch::channel(roster);
        let store = self.store.clone();
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let roster = receiver.borrow_and_update().clone();
                if roster.is_empty() {
                    continue;
                }
                match store.save_roster(&roster).await {
                    Ok(()) => debug!("Autosaved roster with {} players", roster.len()),
                    Err(e) => warn!("Autosave failed: {}", e),
                }
            }
        });

        info!("Autosave started, every {}s", period.as_secs());
        self.task = Some(AutosaveTask { snapshot, handle });
    }

    /// Replaces the snapshot the next tick will save. No-op when stopped.
    pub fn update(&self, roster: &Roster) {
        if let Some(task) = &self.task {
            task.snapshot.send_replace(roster.clone());
        }
    }

    /// Stops the timer and waits for the task to finish, so no save can land
    /// after this returns.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        task.handle.abort();
        let _ = task.handle.await;
        info!("Autosave stopped");
    }
}

impl Drop for Autosave {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.handle.abort();
        }
    }
}
