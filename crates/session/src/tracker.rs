//! In-process registry of recent predictions, keyed by caller identity.
//!
//! Gates the disposal confirmation action: a caller may confirm once per
//! successful prediction, and only while the prediction is younger than the
//! session TTL. Records live only in memory, so a restart rejects every
//! pending confirmation.

use crate::identity::{CallerContext, SessionIdentity};
use binthere_core::config::SessionConfig;
use binthere_core::types::SessionStats;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Prediction state for one caller.
#[derive(Debug, Clone, Copy)]
pub struct SessionRecord {
    /// Last prediction time. Confirmation leaves it untouched.
    pub timestamp: Instant,
    pub has_prediction: bool,
    pub disposal_confirmed: bool,
}

impl SessionRecord {
    fn fresh_prediction() -> Self {
        Self {
            timestamp: Instant::now(),
            has_prediction: true,
            disposal_confirmed: false,
        }
    }

    fn can_confirm(&self) -> bool {
        self.has_prediction && !self.disposal_confirmed
    }
}

/// Concurrent, TTL-bounded map from caller identity to prediction state.
pub struct SessionTracker {
    store: DashMap<SessionIdentity, SessionRecord>,
    ttl: Duration,
    sweep_interval: Duration,
    shutdown_tx: watch::Sender<bool>,
}

impl SessionTracker {
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Arc<Self> {
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(Self {
            store: DashMap::new(),
            ttl,
            sweep_interval,
            shutdown_tx,
        })
    }

    pub fn from_config(config: &SessionConfig) -> Arc<Self> {
        Self::new(config.ttl(), config.sweep_interval())
    }

    /// Record a successful, non-empty prediction. Overwrites any previous
    /// record for the caller, which re-arms confirmation and restarts the TTL.
    pub fn track_prediction(&self, ctx: &CallerContext) -> SessionIdentity {
        let identity = ctx.identity();
        self.store
            .insert(identity.clone(), SessionRecord::fresh_prediction());
        metrics::counter!("session.predictions_tracked").increment(1);
        debug!(session = %identity, "Prediction tracked");
        identity
    }

    /// Whether the caller has an unconfirmed prediction on record.
    pub fn can_confirm_disposal(&self, ctx: &CallerContext) -> bool {
        self.store
            .get(&ctx.identity())
            .is_some_and(|record| record.can_confirm())
    }

    /// Mark the caller's prediction as disposed of. Returns `false` when no
    /// record exists. Does not re-check the record's state: callers gate on
    /// `can_confirm_disposal` first.
    pub fn confirm_disposal(&self, ctx: &CallerContext) -> bool {
        let identity = ctx.identity();
        match self.store.get_mut(&identity) {
            Some(mut record) => {
                record.disposal_confirmed = true;
                metrics::counter!("session.disposals_confirmed").increment(1);
                debug!(session = %identity, "Disposal confirmed");
                true
            }
            None => false,
        }
    }

    pub fn stats(&self) -> SessionStats {
        let mut stats = SessionStats {
            total: self.store.len(),
            ..Default::default()
        };
        for entry in self.store.iter() {
            if entry.has_prediction {
                stats.with_predictions += 1;
            }
            if entry.disposal_confirmed {
                stats.confirmed += 1;
            }
        }
        stats
    }

    pub fn record(&self, ctx: &CallerContext) -> Option<SessionRecord> {
        self.store.get(&ctx.identity()).map(|r| *r)
    }

    /// Remove records older than the TTL. Returns the number removed.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.store.len();
        self.store
            .retain(|_, record| now.duration_since(record.timestamp) <= self.ttl);
        let evicted = before.saturating_sub(self.store.len());

        metrics::counter!("session.evicted").increment(evicted as u64);
        metrics::gauge!("session.live").set(self.store.len() as f64);
        evicted
    }

    /// Spawn the periodic sweep. Runs until `shutdown` is called.
    pub fn start_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let tracker = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            // `changed()` never fires for a value that was already sent.
            if *shutdown_rx.borrow_and_update() {
                info!("Session sweeper not started: tracker is shut down");
                return;
            }

            let start = Instant::now() + tracker.sweep_interval;
            let mut interval = tokio::time::interval_at(start, tracker.sweep_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                interval_secs = tracker.sweep_interval.as_secs(),
                ttl_secs = tracker.ttl.as_secs(),
                "Session sweeper started"
            );

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let evicted = tracker.evict_expired();
                        if evicted > 0 {
                            debug!(evicted = evicted, "Expired prediction sessions removed");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        info!("Session sweeper shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Signal the sweep task to stop.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// False once `shutdown` has been called.
    pub fn is_running(&self) -> bool {
        !*self.shutdown_tx.borrow()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60 * 60);
    const SWEEP: Duration = Duration::from_secs(30 * 60);

    fn tracker() -> Arc<SessionTracker> {
        SessionTracker::new(TTL, SWEEP)
    }

    #[test]
    fn test_cannot_confirm_without_prediction() {
        let tracker = tracker();
        let ctx = CallerContext::anonymous("1.2.3.4", "X");

        assert!(!tracker.can_confirm_disposal(&ctx));
        assert!(!tracker.confirm_disposal(&ctx));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_predict_confirm_flow() {
        let tracker = tracker();
        let ctx = CallerContext::authenticated("42");

        let identity = tracker.track_prediction(&ctx);
        assert_eq!(identity.as_str(), "user_42");
        assert!(tracker.can_confirm_disposal(&ctx));

        assert!(tracker.confirm_disposal(&ctx));
        assert!(!tracker.can_confirm_disposal(&ctx));

        let stats = tracker.stats();
        assert!(stats.confirmed >= 1);
    }

    #[test]
    fn test_confirm_is_idempotent_once_record_exists() {
        let tracker = tracker();
        let ctx = CallerContext::authenticated("7");

        tracker.track_prediction(&ctx);
        assert!(tracker.confirm_disposal(&ctx));
        // Still true: the gate is can_confirm_disposal, not this call.
        assert!(tracker.confirm_disposal(&ctx));
        assert_eq!(tracker.stats().confirmed, 1);
    }

    #[test]
    fn test_users_are_independent() {
        let tracker = tracker();
        let user_1 = CallerContext::authenticated("1");
        let user_2 = CallerContext::authenticated("2");

        tracker.track_prediction(&user_1);
        tracker.track_prediction(&user_2);
        tracker.confirm_disposal(&user_1);

        assert!(!tracker.can_confirm_disposal(&user_1));
        assert!(tracker.can_confirm_disposal(&user_2));
    }

    #[test]
    fn test_repredict_rearms_confirmation() {
        let tracker = tracker();
        let ctx = CallerContext::anonymous("198.51.100.4", "Firefox");

        tracker.track_prediction(&ctx);
        tracker.confirm_disposal(&ctx);
        assert!(!tracker.can_confirm_disposal(&ctx));

        tracker.track_prediction(&ctx);
        assert!(tracker.can_confirm_disposal(&ctx));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_stats_counts() {
        let tracker = tracker();
        let callers: Vec<_> = (0..5)
            .map(|i| CallerContext::authenticated(i.to_string()))
            .collect();

        for ctx in &callers {
            tracker.track_prediction(ctx);
        }
        for ctx in callers.iter().take(2) {
            tracker.confirm_disposal(ctx);
        }

        let stats = tracker.stats();
        assert!(stats.total >= 5);
        assert_eq!(stats.with_predictions, 5);
        assert_eq!(stats.confirmed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_does_not_refresh_timestamp() {
        let tracker = tracker();
        let ctx = CallerContext::authenticated("9");

        tracker.track_prediction(&ctx);
        let tracked_at = tracker.record(&ctx).unwrap().timestamp;

        tokio::time::advance(Duration::from_secs(120)).await;
        tracker.confirm_disposal(&ctx);

        let record = tracker.record(&ctx).unwrap();
        assert_eq!(record.timestamp, tracked_at);
        assert!(record.disposal_confirmed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_expired_after_ttl() {
        let tracker = tracker();
        let stale = CallerContext::authenticated("old");
        let fresh = CallerContext::authenticated("new");

        tracker.track_prediction(&stale);
        tokio::time::advance(TTL).await;
        // Exactly at TTL the record is kept.
        assert_eq!(tracker.evict_expired(), 0);

        tracker.track_prediction(&fresh);
        tokio::time::advance(Duration::from_secs(1)).await;

        assert_eq!(tracker.evict_expired(), 1);
        assert!(!tracker.can_confirm_disposal(&stale));
        assert!(tracker.can_confirm_disposal(&fresh));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_in_background() {
        let tracker = tracker();
        let handle = tracker.start_sweeper();
        let ctx = CallerContext::anonymous("1.2.3.4", "X");

        tracker.track_prediction(&ctx);
        assert!(tracker.can_confirm_disposal(&ctx));

        // Sweeps at 30, 60 and 90 minutes; the 90 minute sweep sees age > TTL.
        tokio::time::sleep(Duration::from_secs(91 * 60)).await;

        assert!(!tracker.can_confirm_disposal(&ctx));
        assert_eq!(tracker.stats(), SessionStats::default());

        tracker.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_sweeper_started_after_shutdown_exits() {
        let tracker = tracker();
        tracker.shutdown();

        let handle = tracker.start_sweeper();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper should not outlive shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_sweeper() {
        let tracker = tracker();
        let handle = tracker.start_sweeper();
        assert!(tracker.is_running());

        tracker.shutdown();
        assert!(!tracker.is_running());
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper should stop")
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_tracking() {
        let tracker = tracker();
        let mut handles = Vec::new();

        for i in 0..32 {
            let tracker = Arc::clone(&tracker);
            handles.push(tokio::spawn(async move {
                let ctx = CallerContext::authenticated(i.to_string());
                tracker.track_prediction(&ctx);
                if i % 2 == 0 {
                    assert!(tracker.can_confirm_disposal(&ctx));
                    tracker.confirm_disposal(&ctx);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = tracker.stats();
        assert_eq!(stats.total, 32);
        assert_eq!(stats.with_predictions, 32);
        assert_eq!(stats.confirmed, 16);
    }
}
