//! Periodic reaping of abandoned rooms.
//!
//! A room is abandoned when it has sat in `waiting` with its `empty_at`
//! more than [`CleanupConfig::stale_after`] in the past. The sweep
//! deletes such rooms (their game and moves go with them), but re-checks
//! each candidate first and leaves it alone if its game is still
//! `playing`.
//!
//! # Lifecycle
//!
//! ```text
//! Stopped ──start()──→ Running ──stop()──→ Stopped
//!                        │
//!                        └─ sweep now, then every `interval`
//! ```
//!
//! [`CleanupScheduler::start`] on a running scheduler is a no-op that
//! returns `false`, so calling it from several places is harmless.
//! [`CleanupScheduler::sweep_once`] runs a sweep on demand whether or
//! not the loop is running.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use moo_core::GameStatus;
use moo_store::{Store, StoreError};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the cleanup scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Time between sweeps.
    pub interval: Duration,
    /// How long a room must have been empty before it is reaped.
    pub stale_after: Duration,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2 * 60),
            stale_after: Duration::from_secs(5 * 60),
        }
    }
}

impl CleanupConfig {
    /// Shortest interval the scheduler will run at.
    pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`CleanupScheduler::new`].
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                "cleanup interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }

    /// Rooms emptied before this instant are stale at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::from_std(self.stale_after)
            .ok()
            .and_then(|d| now.checked_sub_signed(d))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

// ---------------------------------------------------------------------------
// Reports and metrics
// ---------------------------------------------------------------------------

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Stale rooms found.
    pub candidates: usize,
    /// Rooms actually deleted.
    pub deleted: usize,
    /// Candidates left alone because their game is still playing.
    pub skipped: usize,
}

/// Running totals across every sweep since the scheduler was built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupMetrics {
    pub sweeps: u64,
    pub rooms_deleted: u64,
    pub rooms_skipped: u64,
    /// Sweeps that ended in a store error.
    pub failures: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

struct Shared<S> {
    store: S,
    config: CleanupConfig,
    metrics: Mutex<CleanupMetrics>,
}

impl<S: Store> Shared<S> {
    fn metrics(&self) -> MutexGuard<'_, CleanupMetrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        let result = self.reap(now).await;
        let mut m = self.metrics();
        m.sweeps += 1;
        match &result {
            Ok(report) => {
                m.rooms_deleted += report.deleted as u64;
                m.rooms_skipped += report.skipped as u64;
            }
            Err(_) => m.failures += 1,
        }
        result
    }

    async fn reap(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        let stale = self.store.stale_rooms(self.config.cutoff(now)).await?;
        let mut report = SweepReport {
            candidates: stale.len(),
            ..SweepReport::default()
        };
        if stale.is_empty() {
            return Ok(report);
        }
        debug!(candidates = stale.len(), "found empty rooms");

        for room in stale {
            let game = self.store.game_by_room(room.id).await?;
            if game.is_some_and(|g| g.status == GameStatus::Playing) {
                warn!(room_id = %room.id, code = %room.code, "skipping room with active game");
                report.skipped += 1;
                continue;
            }
            if self.store.delete_room(room.id).await? {
                info!(room_id = %room.id, code = %room.code, "reaped empty room");
                report.deleted += 1;
            }
        }
        Ok(report)
    }
}

struct Running {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Owns the background sweep task for one store.
pub struct CleanupScheduler<S> {
    shared: Arc<Shared<S>>,
    running: Mutex<Option<Running>>,
}

impl<S: Store> CleanupScheduler<S> {
    pub fn new(store: S, config: CleanupConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                config: config.validated(),
                metrics: Mutex::new(CleanupMetrics::default()),
            }),
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CleanupConfig {
        &self.shared.config
    }

    /// Spawns the sweep loop on the current Tokio runtime.
    ///
    /// The first sweep runs immediately. Returns `false`, without
    /// spawning anything, if the loop is already running.
    pub fn start(&self) -> bool {
        let mut running = self.lock_running();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            info!("room cleanup already running");
            return false;
        }

        let (shutdown, rx) = oneshot::channel();
        let handle = tokio::spawn(run(Arc::clone(&self.shared), rx));
        *running = Some(Running { shutdown, handle });
        info!(
            interval_secs = self.shared.config.interval.as_secs(),
            stale_after_secs = self.shared.config.stale_after.as_secs(),
            "room cleanup started"
        );
        true
    }

    /// Stops the loop and waits for it to exit. Returns `false` if it was
    /// not running.
    pub async fn stop(&self) -> bool {
        let Some(Running { shutdown, handle }) = self.lock_running().take() else {
            return false;
        };
        let _ = shutdown.send(());
        if let Err(e) = handle.await {
            warn!(error = %e, "room cleanup task ended abnormally");
        }
        info!("room cleanup stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.lock_running()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Runs one sweep right now.
    pub async fn sweep_once(&self) -> Result<SweepReport, StoreError> {
        self.sweep_at(Utc::now()).await
    }

    /// Runs one sweep as if the clock read `now`.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        self.shared.sweep(now).await
    }

    pub fn metrics(&self) -> CleanupMetrics {
        self.shared.metrics().clone()
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S> Drop for CleanupScheduler<S> {
    fn drop(&mut self) {
        let running = self
            .running
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(Running { handle, .. }) = running {
            handle.abort();
        }
    }
}

async fn run<S: Store>(shared: Arc<Shared<S>>, mut shutdown: oneshot::Receiver<()>) {
    let mut interval = time::interval(shared.config.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = interval.tick() => {
                match shared.sweep(Utc::now()).await {
                    Ok(report) if report.deleted > 0 => {
                        info!(deleted = report.deleted, skipped = report.skipped, "cleanup sweep done");
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "cleanup sweep failed"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CleanupConfig::default();
        assert_eq!(config.interval, Duration::from_secs(120));
        assert_eq!(config.stale_after, Duration::from_secs(300));
    }

    #[test]
    fn test_validated_clamps_zero_interval() {
        let config = CleanupConfig {
            interval: Duration::ZERO,
            ..CleanupConfig::default()
        }
        .validated();
        assert_eq!(config.interval, CleanupConfig::MIN_INTERVAL);
    }

    #[test]
    fn test_cutoff_subtracts_stale_after() {
        let now = Utc::now();
        assert_eq!(CleanupConfig::default().cutoff(now), now - TimeDelta::minutes(5));
    }

    #[test]
    fn test_cutoff_saturates() {
        let config = CleanupConfig {
            stale_after: Duration::MAX,
            ..CleanupConfig::default()
        };
        assert_eq!(config.cutoff(Utc::now()), DateTime::<Utc>::MIN_UTC);
    }
}
