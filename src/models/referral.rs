use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ReferralType {
    #[serde(rename = "click")]
    Click,
    #[serde(rename = "signup")]
    Signup,
    #[serde(rename = "purchase")]
    Purchase,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ReferralStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "confirmed")]
    Confirmed,
    #[serde(rename = "cancelled")]
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Referral {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub affiliate_id: ObjectId,
    #[serde(rename = "type")]
    pub kind: ReferralType,
    pub status: ReferralStatus,
    #[serde(default)]
    pub referred_user_id: Option<ObjectId>,
    #[serde(default)]
    pub order_id: Option<ObjectId>,
    #[serde(default)]
    pub order_amount: Option<f64>,
    #[serde(default)]
    pub commission: Option<f64>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    pub created_at: i64,
}

impl Referral {
    fn base(affiliate_id: ObjectId, kind: ReferralType) -> Self {
        Self {
            id: None,
            affiliate_id,
            kind,
            status: ReferralStatus::Confirmed,
            referred_user_id: None,
            order_id: None,
            order_amount: None,
            commission: None,
            ip_address: None,
            user_agent: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn click(affiliate_id: ObjectId, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            ip_address,
            user_agent,
            ..Self::base(affiliate_id, ReferralType::Click)
        }
    }

    pub fn signup(affiliate_id: ObjectId, user_id: ObjectId) -> Self {
        Self {
            referred_user_id: Some(user_id),
            ..Self::base(affiliate_id, ReferralType::Signup)
        }
    }

    pub fn purchase(affiliate_id: ObjectId, user_id: ObjectId, order_id: ObjectId, amount: f64, commission: f64) -> Self {
        Self {
            referred_user_id: Some(user_id),
            order_id: Some(order_id),
            order_amount: Some(amount),
            commission: Some(commission),
            ..Self::base(affiliate_id, ReferralType::Purchase)
        }
    }
}
