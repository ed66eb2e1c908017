use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::Duration;
use promokit_config::PromoSettings;
use promokit_db::models::AttemptState;
use tracing::{debug, warn};

use super::clock::Clock;
use crate::store::AttemptStore;

/// Sliding-window throttle on redemption attempts, keyed by user id.
///
/// Store failures let the attempt through: a broken counter must not lock
/// legitimate users out.
pub struct AttemptLimiter {
    store: Arc<dyn AttemptStore>,
    clock: Arc<dyn Clock>,
    window: Duration,
    max_attempts: u32,
}

#[derive(Debug, PartialEq)]
enum Step {
    /// Still inside an earlier block; nothing is recorded.
    Blocked,
    Allow(AttemptState),
    Deny(AttemptState),
}

impl AttemptLimiter {
    pub fn new(store: Arc<dyn AttemptStore>, clock: Arc<dyn Clock>, settings: &PromoSettings) -> Self {
        let window_secs = i64::try_from(settings.rate_limit_window_secs).unwrap_or(i64::MAX);
        Self::with_policy(
            store,
            clock,
            Duration::seconds(window_secs),
            settings.rate_limit_max_attempts,
        )
    }

    pub fn with_policy(
        store: Arc<dyn AttemptStore>,
        clock: Arc<dyn Clock>,
        window: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            clock,
            window,
            max_attempts,
        }
    }

    /// Records one attempt for `user_id` and reports whether it may proceed.
    pub async fn check_and_consume(&self, user_id: ObjectId) -> bool {
        let now = self.clock.now_bson();

        let state = match self.store.load(user_id).await {
            Ok(state) => state.unwrap_or_else(|| AttemptState::new(user_id, now)),
            Err(e) => {
                warn!(%user_id, error = %e, "Attempt counter unreadable, allowing attempt");
                return true;
            }
        };

        let (allowed, next) = match self.step(state, now) {
            Step::Blocked => {
                debug!(%user_id, "Redemption attempt during active block");
                return false;
            }
            Step::Allow(next) => (true, next),
            Step::Deny(next) => (false, next),
        };

        if let Err(e) = self.store.save(&next).await {
            warn!(%user_id, error = %e, "Attempt counter not persisted, allowing attempt");
            return true;
        }

        if !allowed {
            warn!(%user_id, attempts = next.attempts, "Redemption attempts exceeded, user blocked");
        }
        allowed
    }

    fn step(&self, mut state: AttemptState, now: bson::DateTime) -> Step {
        if state.blocked_until.is_some_and(|until| until > now) {
            return Step::Blocked;
        }

        let since_last = now.to_chrono() - state.last_attempt.to_chrono();
        if since_last > self.window {
            state.attempts = 0;
            state.blocked_until = None;
        }

        state.attempts = state.attempts.saturating_add(1);
        state.last_attempt = now;

        if state.attempts > self.max_attempts {
            state.blocked_until = Some(bson::DateTime::from_chrono(now.to_chrono() + self.window));
            Step::Deny(state)
        } else {
            Step::Allow(state)
        }
    }
}
