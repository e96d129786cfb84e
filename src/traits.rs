use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use crate::models::{Affiliate, AffiliateStatus, ApiError, Referral};
use crate::models::affiliate::PayoutInfo;

/// Persistence used by the affiliate program.
///
/// Counter updates are increments on the stored document, never
/// read-modify-write; the methods returning `Option<Affiliate>` hand back the
/// document as it is after the increment.
#[async_trait]
pub trait AffiliateStore: Send + Sync {
    async fn insert_affiliate(&self, affiliate: Affiliate) -> Result<Affiliate, ApiError>;
    async fn find_affiliate_by_id(&self, id: &ObjectId) -> Result<Option<Affiliate>, ApiError>;
    async fn find_affiliate_by_user(&self, user_id: &ObjectId) -> Result<Option<Affiliate>, ApiError>;
    /// Any status; used for uniqueness checks and lookups.
    async fn find_affiliate_by_code(&self, code: &str) -> Result<Option<Affiliate>, ApiError>;
    async fn list_affiliates(&self, status: Option<AffiliateStatus>) -> Result<Vec<Affiliate>, ApiError>;

    async fn increment_clicks(&self, id: &ObjectId) -> Result<(), ApiError>;
    async fn increment_signups(&self, id: &ObjectId) -> Result<Option<Affiliate>, ApiError>;
    async fn set_conversion_rate(&self, id: &ObjectId, rate: f64) -> Result<(), ApiError>;
    /// Adds one sale and `commission` to earnings and the pending payout.
    async fn record_sale(&self, id: &ObjectId, commission: f64) -> Result<Option<Affiliate>, ApiError>;
    async fn set_commission_rate(&self, id: &ObjectId, rate: f64) -> Result<(), ApiError>;

    async fn update_affiliate_status(
        &self,
        id: &ObjectId,
        status: AffiliateStatus,
        approved_by: Option<ObjectId>,
        rejection_reason: Option<String>,
    ) -> Result<Option<Affiliate>, ApiError>;
    async fn set_affiliate_active(&self, id: &ObjectId, active: bool) -> Result<Option<Affiliate>, ApiError>;
    async fn update_payout_info(&self, id: &ObjectId, info: PayoutInfo) -> Result<Option<Affiliate>, ApiError>;
    /// Moves exactly `amount` from the pending payout to the paid-out total.
    async fn record_payout(&self, id: &ObjectId, amount: f64) -> Result<Option<Affiliate>, ApiError>;

    async fn insert_referral(&self, referral: Referral) -> Result<Referral, ApiError>;
    async fn find_latest_confirmed_signup(&self, user_id: &ObjectId) -> Result<Option<Referral>, ApiError>;
    async fn find_purchase_for_order(&self, order_id: &ObjectId) -> Result<Option<Referral>, ApiError>;
    async fn list_referrals(&self, affiliate_id: &ObjectId, limit: i64) -> Result<Vec<Referral>, ApiError>;
}
