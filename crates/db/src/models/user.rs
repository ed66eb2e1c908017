use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// Account document. Created by the identity system; this service only
/// touches `subscription` and `redemptions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub username: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
    #[serde(default)]
    pub redemptions: Vec<RedemptionRecord>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub plan_id: String,
    /// Absent for permanent upgrades.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime>,
    pub source_code: String,
    pub granted_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedemptionRecord {
    pub code: String,
    pub redeemed_at: DateTime,
    pub benefit_received: String,
}

impl User {
    pub const COLLECTION: &'static str = "users";

    pub fn redemption_count(&self, code: &str) -> u32 {
        let count = self.redemptions.iter().filter(|r| r.code == code).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}
