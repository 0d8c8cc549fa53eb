use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace};

use crate::api::RequestPipeline;

use super::{RefreshOutcome, SessionStore};

/// Handle to the background refresh loop. The loop stops when the handle is
/// dropped.
pub struct RefreshTask {
    handle: JoinHandle<()>,
}

impl RefreshTask {
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl SessionStore {
    /// Check the session every `interval` and refresh it when it expires
    /// within `threshold`.
    ///
    /// Ticks with no session are skipped, so a session saved later (a new
    /// login after logout or a failed refresh) is picked up. Only dropping or
    /// aborting the returned handle ends the loop.
    pub fn spawn_refresh_task(
        api: Arc<RequestPipeline>,
        interval: std::time::Duration,
        threshold: chrono::Duration,
    ) -> RefreshTask {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(std::time::Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match api.session().refresh_if_near_expiry(&api, threshold).await {
                    RefreshOutcome::NoSession => trace!("No session, skipping refresh tick"),
                    RefreshOutcome::NotDue => {}
                    RefreshOutcome::Refreshed(session) => {
                        debug!(expires_at = %session.expires_at, "Background refresh done")
                    }
                    RefreshOutcome::Cleared => info!("Refresh failed, waiting for a new login"),
                }
            }
        });
        RefreshTask { handle }
    }
}
