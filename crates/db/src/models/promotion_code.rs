use bson::{oid::ObjectId, DateTime};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// `max_uses` sentinel for codes without a global redemption cap.
pub const UNLIMITED_USES: i64 = -1;

/// Longest timed upgrade a code may grant (about 100 years).
pub const MAX_DURATION_DAYS: u32 = 36_500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionCode {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub code: String,
    pub integrity_tag: String,
    pub event_period: EventPeriod,
    pub benefit: Benefit,
    pub max_uses: i64,
    pub max_uses_per_user: u32,
    #[serde(default)]
    pub current_uses: i64,
    #[serde(default)]
    pub status: CodeStatus,
    #[serde(default)]
    pub description: String,
    pub created_by: ObjectId,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Inclusive redemption window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EventPeriod {
    pub start_date: DateTime,
    pub end_date: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Benefit {
    SubscriptionUpgrade {
        plan_id: String,
        is_permanent: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_days: Option<u32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BenefitError {
    #[error("a {0} day upgrade overflows the representable date range")]
    DurationOutOfRange(u32),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CodeStatus {
    #[default]
    Active,
    Inactive,
}

/// Where `now` falls relative to a code's event period.
///
/// Never persisted: "expired" is read-time state, distinct from the
/// stored `active`/`inactive` status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Pending,
    Open,
    Closed,
}

impl PromotionCode {
    pub const COLLECTION: &'static str = "promotion_codes";

    pub fn is_unlimited(&self) -> bool {
        self.max_uses == UNLIMITED_USES
    }

    pub fn is_exhausted(&self) -> bool {
        !self.is_unlimited() && self.current_uses >= self.max_uses
    }

    pub fn remaining_uses(&self) -> Option<i64> {
        if self.is_unlimited() {
            None
        } else {
            Some((self.max_uses - self.current_uses).max(0))
        }
    }

    pub fn window_state(&self, now: DateTime) -> WindowState {
        self.event_period.state_at(now)
    }
}

impl EventPeriod {
    pub fn state_at(&self, now: DateTime) -> WindowState {
        if now < self.start_date {
            WindowState::Pending
        } else if now > self.end_date {
            WindowState::Closed
        } else {
            WindowState::Open
        }
    }
}

impl Benefit {
    pub fn plan_id(&self) -> &str {
        match self {
            Benefit::SubscriptionUpgrade { plan_id, .. } => plan_id,
        }
    }

    /// Expiry of the granted subscription, `None` for permanent upgrades.
    pub fn expires_at(&self, granted_at: DateTime) -> Result<Option<DateTime>, BenefitError> {
        match self {
            Benefit::SubscriptionUpgrade {
                is_permanent: true, ..
            } => Ok(None),
            Benefit::SubscriptionUpgrade {
                is_permanent: false,
                duration_days,
                ..
            } => {
                let days = duration_days.unwrap_or_default();
                Duration::try_days(i64::from(days))
                    .and_then(|delta| granted_at.to_chrono().checked_add_signed(delta))
                    .map(|expiry| Some(DateTime::from_chrono(expiry)))
                    .ok_or(BenefitError::DurationOutOfRange(days))
            }
        }
    }

    /// Human-readable description stored on the redemption record.
    pub fn summary(&self) -> String {
        match self {
            Benefit::SubscriptionUpgrade {
                plan_id,
                is_permanent: true,
                ..
            } => format!("Permanent {plan_id} subscription"),
            Benefit::SubscriptionUpgrade {
                plan_id,
                duration_days,
                ..
            } => format!(
                "{} days of {plan_id} subscription",
                duration_days.unwrap_or_default()
            ),
        }
    }
}
