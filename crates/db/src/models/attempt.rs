use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// Per-user redemption attempt counter backing the attempt limiter.
///
/// Abuse-deterrence state only; the authoritative records are the
/// promotion codes and the user's redemption history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptState {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    #[serde(default)]
    pub attempts: u32,
    pub last_attempt: DateTime,
    pub blocked_until: Option<DateTime>,
}

impl AttemptState {
    pub const COLLECTION: &'static str = "promo_attempts";

    pub fn new(user_id: ObjectId, now: DateTime) -> Self {
        Self {
            id: None,
            user_id,
            attempts: 0,
            last_attempt: now,
            blocked_until: None,
        }
    }
}
