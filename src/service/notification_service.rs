// service/notification_service.rs
//
// Fire-and-forget notification dispatch. The core never awaits delivery
// guarantees; dispatch is a tracing event plus an in-memory record retained
// for a bounded window. The sweep is an explicit task owned by process
// startup, with the clock injected so retention is testable.
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use uuid::Uuid;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct NotificationRecord {
    pub user_id: Uuid,
    pub template: String,
    pub vars: JsonValue,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct NotificationService {
    log: Arc<RwLock<Vec<NotificationRecord>>>,
    clock: Arc<dyn Clock>,
    retention: Duration,
}

impl NotificationService {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            log: Arc::new(RwLock::new(Vec::new())),
            clock,
            retention: Duration::hours(24),
        }
    }

    pub async fn notify(&self, user_id: Uuid, template: &str, vars: JsonValue) {
        tracing::info!(
            "Notification dispatched: user {} template {} vars {}",
            user_id,
            template,
            vars
        );

        let record = NotificationRecord {
            user_id,
            template: template.to_string(),
            vars,
            created_at: self.clock.now(),
        };

        self.log.write().await.push(record);
    }

    /// Drops records older than the retention window. Returns how many were
    /// removed.
    pub async fn prune_expired(&self) -> usize {
        let cutoff = self.clock.now() - self.retention;
        let mut log = self.log.write().await;
        let before = log.len();
        log.retain(|record| record.created_at >= cutoff);
        before - log.len()
    }

    pub async fn recent_for_user(&self, user_id: Uuid) -> Vec<NotificationRecord> {
        self.log
            .read()
            .await
            .iter()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect()
    }
}

/// Periodic sweep over the notification log, spawned from `main`.
pub async fn start_notification_sweeper(service: Arc<NotificationService>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));

    loop {
        interval.tick().await;
        let removed = service.prune_expired().await;
        if removed > 0 {
            tracing::debug!("Notification sweep removed {} expired records", removed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct FixedClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        fn new(now: DateTime<Utc>) -> Self {
            Self { now: Mutex::new(now) }
        }

        fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now = *now + by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn records_and_filters_per_user() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let service = NotificationService::new(clock);

        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        service.notify(alice, "wallet_credited", json!({"amount": 5000})).await;
        service.notify(bob, "wallet_debited", json!({"amount": 100})).await;

        let for_alice = service.recent_for_user(alice).await;
        assert_eq!(for_alice.len(), 1);
        assert_eq!(for_alice[0].template, "wallet_credited");
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_records() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let service = NotificationService::new(clock.clone());

        let user = Uuid::new_v4();
        service.notify(user, "old", json!({})).await;

        clock.advance(Duration::hours(25));
        service.notify(user, "fresh", json!({})).await;

        let removed = service.prune_expired().await;
        assert_eq!(removed, 1);

        let remaining = service.recent_for_user(user).await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].template, "fresh");
    }

    #[tokio::test]
    async fn sweep_is_a_noop_within_retention() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let service = NotificationService::new(clock.clone());

        service.notify(Uuid::new_v4(), "t", json!({})).await;
        clock.advance(Duration::hours(1));

        assert_eq!(service.prune_expired().await, 0);
    }
}
