use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;
use crate::utils::commission::BASE_COMMISSION_RATE;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum AffiliateStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "approved")]
    Approved,
    #[serde(rename = "rejected")]
    Rejected,
    #[serde(rename = "suspended")]
    Suspended,
}

impl std::fmt::Display for AffiliateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AffiliateStatus::Pending => write!(f, "pending"),
            AffiliateStatus::Approved => write!(f, "approved"),
            AffiliateStatus::Rejected => write!(f, "rejected"),
            AffiliateStatus::Suspended => write!(f, "suspended"),
        }
    }
}

impl AffiliateStatus {
    pub fn can_transition_to(self, next: AffiliateStatus) -> bool {
        use AffiliateStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Approved, Suspended)
                | (Suspended, Approved)
                | (Rejected, Approved)
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct AffiliateStats {
    pub total_clicks: i64,
    pub total_signups: i64,
    pub total_sales: i64,
    pub total_earnings: f64,
    pub conversion_rate: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PayoutInfo {
    /// "mtn_momo" or "orange_money"
    pub method: String,
    pub phone: String,
    pub account_name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Affiliate {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub code: String,
    pub status: AffiliateStatus,
    pub is_active: bool,
    pub commission_rate: f64,
    #[serde(default)]
    pub stats: AffiliateStats,
    #[serde(default)]
    pub next_payout_amount: f64,
    #[serde(default)]
    pub total_paid_out: f64,
    #[serde(default)]
    pub last_payout_at: Option<i64>,
    #[serde(default)]
    pub payment_info: Option<PayoutInfo>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub social_media: Option<String>,
    #[serde(default)]
    pub motivation: Option<String>,
    #[serde(default)]
    pub approved_at: Option<i64>,
    #[serde(default)]
    pub approved_by: Option<ObjectId>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Affiliate {
    pub fn new(user_id: ObjectId, code: String, application: AffiliateApplication) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: None,
            user_id,
            code,
            status: AffiliateStatus::Pending,
            is_active: true,
            commission_rate: BASE_COMMISSION_RATE,
            stats: AffiliateStats::default(),
            next_payout_amount: 0.0,
            total_paid_out: 0.0,
            last_payout_at: None,
            payment_info: application.payment_info,
            website: application.website,
            social_media: application.social_media,
            motivation: application.motivation,
            approved_at: None,
            approved_by: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Only approved, active affiliates accumulate referrals.
    pub fn is_trackable(&self) -> bool {
        self.status == AffiliateStatus::Approved && self.is_active
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AffiliateApplication {
    pub website: Option<String>,
    pub social_media: Option<String>,
    pub motivation: Option<String>,
    pub payment_info: Option<PayoutInfo>,
}

#[derive(Debug, Deserialize)]
pub struct TrackClickRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAffiliateStatusRequest {
    pub status: AffiliateStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AffiliateListQuery {
    pub status: Option<AffiliateStatus>,
}

#[derive(Debug, Serialize)]
pub struct AffiliateDashboard {
    pub affiliate: Affiliate,
    pub referral_link: String,
    pub recent_referrals: Vec<crate::models::Referral>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_workflow() {
        use AffiliateStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Suspended));
        assert!(Suspended.can_transition_to(Approved));
        assert!(Rejected.can_transition_to(Approved));

        assert!(!Pending.can_transition_to(Suspended));
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Approved));
        assert!(!Suspended.can_transition_to(Rejected));
    }

    #[test]
    fn test_new_affiliate_is_pending_at_base_rate() {
        let affiliate = Affiliate::new(ObjectId::new(), "ABC123".into(), AffiliateApplication::default());
        assert_eq!(affiliate.status, AffiliateStatus::Pending);
        assert_eq!(affiliate.commission_rate, 0.05);
        assert!(!affiliate.is_trackable());
    }
}
