use std::sync::Arc;
use log::{info, warn, error};
use mongodb::bson::oid::ObjectId;

use crate::models::affiliate::{AffiliateApplication, AffiliateDashboard, PayoutInfo};
use crate::models::{Affiliate, AffiliateStatus, ApiError, Referral};
use crate::traits::AffiliateStore;
use crate::utils::affiliate_code::{generate_affiliate_code, normalize_affiliate_code};
use crate::utils::commission::{commission_for, commission_rate_for_sales, conversion_rate};

const CODE_GENERATION_ATTEMPTS: usize = 5;
const DASHBOARD_REFERRALS: i64 = 20;
const PAYOUT_METHODS: &[&str] = &["mtn_momo", "orange_money"];

pub struct AffiliateService {
    store: Arc<dyn AffiliateStore>,
    frontend_url: String,
}

impl AffiliateService {
    pub fn new(store: Arc<dyn AffiliateStore>, frontend_url: String) -> Self {
        Self { store, frontend_url }
    }

    async fn trackable_affiliate(&self, code: &str) -> Result<Option<Affiliate>, ApiError> {
        let code = normalize_affiliate_code(code);
        if code.is_empty() {
            return Ok(None);
        }
        Ok(self.store
            .find_affiliate_by_code(&code)
            .await?
            .filter(Affiliate::is_trackable))
    }

    pub async fn is_trackable_code(&self, code: &str) -> Result<bool, ApiError> {
        Ok(self.trackable_affiliate(code).await?.is_some())
    }

    /// Logs a click on a referral link. Returns false when the code does not
    /// belong to an approved, active affiliate.
    pub async fn track_click(
        &self,
        code: &str,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<bool, ApiError> {
        let Some(affiliate) = self.trackable_affiliate(code).await? else {
            info!("Ignoring click for unknown or inactive affiliate code {}", code);
            return Ok(false);
        };
        let affiliate_id = affiliate.id
            .ok_or_else(|| ApiError::InternalError("Affiliate without id".to_string()))?;

        self.store.insert_referral(Referral::click(affiliate_id, ip_address, user_agent)).await?;
        self.store.increment_clicks(&affiliate_id).await?;

        info!("Tracked click for affiliate {}", affiliate.code);
        Ok(true)
    }

    /// Attributes a new user to the affiliate owning `code`.
    pub async fn track_signup(&self, code: &str, user_id: ObjectId) -> Result<bool, ApiError> {
        let Some(affiliate) = self.trackable_affiliate(code).await? else {
            info!("Ignoring signup for unknown or inactive affiliate code {}", code);
            return Ok(false);
        };
        let affiliate_id = affiliate.id
            .ok_or_else(|| ApiError::InternalError("Affiliate without id".to_string()))?;

        self.store.insert_referral(Referral::signup(affiliate_id, user_id)).await?;
        let updated = self.store
            .increment_signups(&affiliate_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Affiliate {} disappeared", affiliate_id)))?;

        let rate = conversion_rate(updated.stats.total_signups, updated.stats.total_clicks);
        self.store.set_conversion_rate(&affiliate_id, rate).await?;

        info!("Tracked signup of user {} for affiliate {}", user_id, affiliate.code);
        Ok(true)
    }

    /// Credits the affiliate that referred `user_id`, if any, with commission
    /// on `amount`.
    pub async fn track_purchase(
        &self,
        user_id: ObjectId,
        order_id: ObjectId,
        amount: f64,
    ) -> Result<Option<Referral>, ApiError> {
        if let Some(existing) = self.store.find_purchase_for_order(&order_id).await? {
            info!("Order {} was already credited to affiliate {}", order_id, existing.affiliate_id);
            return Ok(None);
        }
        let Some(signup) = self.store.find_latest_confirmed_signup(&user_id).await? else {
            return Ok(None);
        };
        // Narrower than a bare signup check: a suspended, rejected or
        // deactivated affiliate earns nothing on later orders.
        let affiliate = match self.store.find_affiliate_by_id(&signup.affiliate_id).await? {
            Some(affiliate) if affiliate.is_trackable() => affiliate,
            Some(affiliate) => {
                info!("Affiliate {} is {} / active={}, no commission for order {}",
                    affiliate.code, affiliate.status, affiliate.is_active, order_id);
                return Ok(None);
            }
            None => {
                warn!("Signup referral for user {} points to missing affiliate {}", user_id, signup.affiliate_id);
                return Ok(None);
            }
        };

        let commission = commission_for(amount, affiliate.commission_rate);
        let referral = self.store
            .insert_referral(Referral::purchase(signup.affiliate_id, user_id, order_id, amount, commission))
            .await?;

        let updated = self.store
            .record_sale(&signup.affiliate_id, commission)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Affiliate {} disappeared", signup.affiliate_id)))?;

        let new_rate = commission_rate_for_sales(updated.stats.total_sales);
        if new_rate != updated.commission_rate {
            info!("Affiliate {} moves to commission rate {} after {} sales",
                updated.code, new_rate, updated.stats.total_sales);
            self.store.set_commission_rate(&signup.affiliate_id, new_rate).await?;
        }

        info!("Credited {} XAF commission to affiliate {} for order {}", commission, affiliate.code, order_id);
        Ok(Some(referral))
    }

    /// Registration must not fail because of referral bookkeeping.
    pub async fn track_signup_best_effort(&self, code: &str, user_id: ObjectId) {
        if let Err(e) = self.track_signup(code, user_id).await {
            error!("Failed to track signup for code {} and user {}: {}", code, user_id, e);
        }
    }

    /// Checkout must not fail because of referral bookkeeping.
    pub async fn track_purchase_best_effort(&self, user_id: ObjectId, order_id: ObjectId, amount: f64) {
        if let Err(e) = self.track_purchase(user_id, order_id, amount).await {
            error!("Failed to track purchase for order {} of user {}: {}", order_id, user_id, e);
        }
    }

    pub async fn apply(&self, user_id: ObjectId, application: AffiliateApplication) -> Result<Affiliate, ApiError> {
        if self.store.find_affiliate_by_user(&user_id).await?.is_some() {
            return Err(ApiError::DuplicateError("You have already applied to the affiliate program".to_string()));
        }
        if let Some(info) = &application.payment_info {
            validate_payout_info(info)?;
        }

        let code = self.unique_code().await?;
        let affiliate = self.store.insert_affiliate(Affiliate::new(user_id, code, application)).await?;
        info!("User {} applied to the affiliate program with code {}", user_id, affiliate.code);
        Ok(affiliate)
    }

    async fn unique_code(&self) -> Result<String, ApiError> {
        for _ in 0..CODE_GENERATION_ATTEMPTS {
            let code = generate_affiliate_code();
            if self.store.find_affiliate_by_code(&code).await?.is_none() {
                return Ok(code);
            }
        }
        Err(ApiError::InternalError("Could not generate a unique affiliate code".to_string()))
    }

    pub fn referral_link(&self, code: &str) -> String {
        format!("{}/?ref={}", self.frontend_url.trim_end_matches('/'), code)
    }

    async fn affiliate_for_user(&self, user_id: &ObjectId) -> Result<Affiliate, ApiError> {
        self.store
            .find_affiliate_by_user(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("You are not enrolled in the affiliate program".to_string()))
    }

    pub async fn dashboard(&self, user_id: &ObjectId) -> Result<AffiliateDashboard, ApiError> {
        let affiliate = self.affiliate_for_user(user_id).await?;
        let recent_referrals = match affiliate.id {
            Some(id) => self.store.list_referrals(&id, DASHBOARD_REFERRALS).await?,
            None => Vec::new(),
        };
        Ok(AffiliateDashboard {
            referral_link: self.referral_link(&affiliate.code),
            affiliate,
            recent_referrals,
        })
    }

    pub async fn referrals(&self, user_id: &ObjectId, limit: i64) -> Result<Vec<Referral>, ApiError> {
        let affiliate = self.affiliate_for_user(user_id).await?;
        match affiliate.id {
            Some(id) => self.store.list_referrals(&id, limit.clamp(1, 200)).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn update_payment_info(&self, user_id: &ObjectId, info: PayoutInfo) -> Result<Affiliate, ApiError> {
        validate_payout_info(&info)?;
        let affiliate = self.affiliate_for_user(user_id).await?;
        let id = affiliate.id
            .ok_or_else(|| ApiError::InternalError("Affiliate without id".to_string()))?;
        self.store
            .update_payout_info(&id, info)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Affiliate {} not found", id)))
    }

    pub async fn list(&self, status: Option<AffiliateStatus>) -> Result<Vec<Affiliate>, ApiError> {
        self.store.list_affiliates(status).await
    }

    pub async fn update_status(
        &self,
        admin_id: ObjectId,
        id: &ObjectId,
        status: AffiliateStatus,
        reason: Option<String>,
    ) -> Result<Affiliate, ApiError> {
        let affiliate = self.store
            .find_affiliate_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Affiliate {} not found", id)))?;

        if !affiliate.status.can_transition_to(status) {
            return Err(ApiError::ValidationError(format!(
                "Cannot change affiliate status from {} to {}", affiliate.status, status
            )));
        }

        let (approved_by, rejection_reason) = match status {
            AffiliateStatus::Approved => (Some(admin_id), None),
            AffiliateStatus::Rejected => (None, reason.filter(|r| !r.trim().is_empty())),
            _ => (None, None),
        };

        let updated = self.store
            .update_affiliate_status(id, status, approved_by, rejection_reason)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Affiliate {} not found", id)))?;
        info!("Admin {} moved affiliate {} from {} to {}", admin_id, updated.code, affiliate.status, status);
        Ok(updated)
    }

    pub async fn set_active(&self, id: &ObjectId, active: bool) -> Result<Affiliate, ApiError> {
        self.store
            .set_affiliate_active(id, active)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Affiliate {} not found", id)))
    }

    pub async fn toggle_active(&self, id: &ObjectId) -> Result<Affiliate, ApiError> {
        let affiliate = self.store
            .find_affiliate_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Affiliate {} not found", id)))?;
        self.set_active(id, !affiliate.is_active).await
    }

    /// Marks the pending balance as paid out.
    pub async fn record_payout(&self, id: &ObjectId) -> Result<Affiliate, ApiError> {
        let affiliate = self.store
            .find_affiliate_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Affiliate {} not found", id)))?;
        if affiliate.next_payout_amount <= 0.0 {
            return Err(ApiError::ValidationError("Nothing to pay out".to_string()));
        }
        let updated = self.store
            .record_payout(id, affiliate.next_payout_amount)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Affiliate {} not found", id)))?;
        info!("Paid out {} XAF to affiliate {}", affiliate.next_payout_amount, affiliate.code);
        Ok(updated)
    }
}

fn validate_payout_info(info: &PayoutInfo) -> Result<(), ApiError> {
    if !PAYOUT_METHODS.contains(&info.method.as_str()) {
        return Err(ApiError::ValidationError(format!(
            "Payout method must be one of: {}", PAYOUT_METHODS.join(", ")
        )));
    }
    if info.phone.trim().is_empty() || info.account_name.trim().is_empty() {
        return Err(ApiError::ValidationError("Payout phone and account name are required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use async_trait::async_trait;
    use crate::models::{ReferralStatus, ReferralType};

    #[derive(Default)]
    pub(crate) struct MemoryAffiliateStore {
        affiliates: Mutex<Vec<Affiliate>>,
        referrals: Mutex<Vec<Referral>>,
    }

    impl MemoryAffiliateStore {
        fn update<F: FnOnce(&mut Affiliate)>(&self, id: &ObjectId, f: F) -> Option<Affiliate> {
            let mut affiliates = self.affiliates.lock().unwrap();
            let affiliate = affiliates.iter_mut().find(|a| a.id.as_ref() == Some(id))?;
            f(affiliate);
            Some(affiliate.clone())
        }

        pub(crate) fn referrals(&self) -> Vec<Referral> {
            self.referrals.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AffiliateStore for MemoryAffiliateStore {
        async fn insert_affiliate(&self, mut affiliate: Affiliate) -> Result<Affiliate, ApiError> {
            affiliate.id = Some(ObjectId::new());
            self.affiliates.lock().unwrap().push(affiliate.clone());
            Ok(affiliate)
        }

        async fn find_affiliate_by_id(&self, id: &ObjectId) -> Result<Option<Affiliate>, ApiError> {
            Ok(self.affiliates.lock().unwrap().iter().find(|a| a.id.as_ref() == Some(id)).cloned())
        }

        async fn find_affiliate_by_user(&self, user_id: &ObjectId) -> Result<Option<Affiliate>, ApiError> {
            Ok(self.affiliates.lock().unwrap().iter().find(|a| &a.user_id == user_id).cloned())
        }

        async fn find_affiliate_by_code(&self, code: &str) -> Result<Option<Affiliate>, ApiError> {
            Ok(self.affiliates.lock().unwrap().iter().find(|a| a.code == code).cloned())
        }

        async fn list_affiliates(&self, status: Option<AffiliateStatus>) -> Result<Vec<Affiliate>, ApiError> {
            Ok(self.affiliates.lock().unwrap()
                .iter()
                .filter(|a| status.map_or(true, |s| a.status == s))
                .cloned()
                .collect())
        }

        async fn increment_clicks(&self, id: &ObjectId) -> Result<(), ApiError> {
            self.update(id, |a| a.stats.total_clicks += 1);
            Ok(())
        }

        async fn increment_signups(&self, id: &ObjectId) -> Result<Option<Affiliate>, ApiError> {
            Ok(self.update(id, |a| a.stats.total_signups += 1))
        }

        async fn set_conversion_rate(&self, id: &ObjectId, rate: f64) -> Result<(), ApiError> {
            self.update(id, |a| a.stats.conversion_rate = rate);
            Ok(())
        }

        async fn record_sale(&self, id: &ObjectId, commission: f64) -> Result<Option<Affiliate>, ApiError> {
            Ok(self.update(id, |a| {
                a.stats.total_sales += 1;
                a.stats.total_earnings += commission;
                a.next_payout_amount += commission;
            }))
        }

        async fn set_commission_rate(&self, id: &ObjectId, rate: f64) -> Result<(), ApiError> {
            self.update(id, |a| a.commission_rate = rate);
            Ok(())
        }

        async fn update_affiliate_status(
            &self,
            id: &ObjectId,
            status: AffiliateStatus,
            approved_by: Option<ObjectId>,
            rejection_reason: Option<String>,
        ) -> Result<Option<Affiliate>, ApiError> {
            Ok(self.update(id, |a| {
                a.status = status;
                if approved_by.is_some() {
                    a.approved_by = approved_by;
                    a.approved_at = Some(chrono::Utc::now().timestamp_millis());
                }
                a.rejection_reason = rejection_reason;
            }))
        }

        async fn set_affiliate_active(&self, id: &ObjectId, active: bool) -> Result<Option<Affiliate>, ApiError> {
            Ok(self.update(id, |a| a.is_active = active))
        }

        async fn update_payout_info(&self, id: &ObjectId, info: PayoutInfo) -> Result<Option<Affiliate>, ApiError> {
            Ok(self.update(id, |a| a.payment_info = Some(info)))
        }

        async fn record_payout(&self, id: &ObjectId, amount: f64) -> Result<Option<Affiliate>, ApiError> {
            Ok(self.update(id, |a| {
                a.next_payout_amount -= amount;
                a.total_paid_out += amount;
                a.last_payout_at = Some(chrono::Utc::now().timestamp_millis());
            }))
        }

        async fn insert_referral(&self, mut referral: Referral) -> Result<Referral, ApiError> {
            referral.id = Some(ObjectId::new());
            self.referrals.lock().unwrap().push(referral.clone());
            Ok(referral)
        }

        async fn find_latest_confirmed_signup(&self, user_id: &ObjectId) -> Result<Option<Referral>, ApiError> {
            Ok(self.referrals.lock().unwrap()
                .iter()
                .filter(|r| r.kind == ReferralType::Signup
                    && r.status == ReferralStatus::Confirmed
                    && r.referred_user_id.as_ref() == Some(user_id))
                .max_by_key(|r| r.created_at)
                .cloned())
        }

        async fn find_purchase_for_order(&self, order_id: &ObjectId) -> Result<Option<Referral>, ApiError> {
            Ok(self.referrals.lock().unwrap()
                .iter()
                .find(|r| r.kind == ReferralType::Purchase && r.order_id.as_ref() == Some(order_id))
                .cloned())
        }

        async fn list_referrals(&self, affiliate_id: &ObjectId, limit: i64) -> Result<Vec<Referral>, ApiError> {
            Ok(self.referrals.lock().unwrap()
                .iter()
                .rev()
                .filter(|r| &r.affiliate_id == affiliate_id)
                .take(limit as usize)
                .cloned()
                .collect())
        }
    }

    fn service() -> (Arc<MemoryAffiliateStore>, AffiliateService) {
        let store = Arc::new(MemoryAffiliateStore::default());
        let service = AffiliateService::new(store.clone(), "https://shop.example/".to_string());
        (store, service)
    }

    async fn approved_affiliate(store: &MemoryAffiliateStore, code: &str) -> Affiliate {
        let mut affiliate = Affiliate::new(ObjectId::new(), code.to_string(), AffiliateApplication::default());
        affiliate.status = AffiliateStatus::Approved;
        store.insert_affiliate(affiliate).await.unwrap()
    }

    async fn reload(store: &MemoryAffiliateStore, affiliate: &Affiliate) -> Affiliate {
        store.find_affiliate_by_id(affiliate.id.as_ref().unwrap()).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_clicks_accumulate_without_dedup() {
        let (store, service) = service();
        let affiliate = approved_affiliate(&store, "ABC123").await;

        assert!(service.track_click("ABC123", Some("1.2.3.4".into()), None).await.unwrap());
        assert_eq!(reload(&store, &affiliate).await.stats.total_clicks, 1);

        assert!(service.track_click("abc123", Some("1.2.3.4".into()), None).await.unwrap());
        assert_eq!(reload(&store, &affiliate).await.stats.total_clicks, 2);
        assert_eq!(store.referrals().len(), 2);
    }

    #[tokio::test]
    async fn test_untrackable_codes_are_no_ops() {
        let (store, service) = service();
        let mut pending = Affiliate::new(ObjectId::new(), "PEND1NG0".into(), AffiliateApplication::default());
        pending.status = AffiliateStatus::Pending;
        store.insert_affiliate(pending).await.unwrap();
        let inactive = approved_affiliate(&store, "1NACT1VE").await;
        store.set_affiliate_active(inactive.id.as_ref().unwrap(), false).await.unwrap();

        for code in ["PEND1NG0", "1NACT1VE", "MISSING0", ""] {
            assert!(!service.track_click(code, None, None).await.unwrap());
            assert!(!service.track_signup(code, ObjectId::new()).await.unwrap());
        }
        assert!(store.referrals().is_empty());
        assert_eq!(reload(&store, &inactive).await.stats.total_clicks, 0);
    }

    #[tokio::test]
    async fn test_signup_recomputes_conversion_rate() {
        let (store, service) = service();
        let affiliate = approved_affiliate(&store, "ABC123").await;

        for _ in 0..4 {
            service.track_click("ABC123", None, None).await.unwrap();
        }
        assert!(service.track_signup("ABC123", ObjectId::new()).await.unwrap());

        let updated = reload(&store, &affiliate).await;
        assert_eq!(updated.stats.total_signups, 1);
        assert_eq!(updated.stats.conversion_rate, 25.0);

        let signup = store.referrals().into_iter().find(|r| r.kind == ReferralType::Signup).unwrap();
        assert_eq!(signup.status, ReferralStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_signup_without_clicks_has_zero_conversion() {
        let (store, service) = service();
        let affiliate = approved_affiliate(&store, "ABC123").await;
        service.track_signup("ABC123", ObjectId::new()).await.unwrap();
        assert_eq!(reload(&store, &affiliate).await.stats.conversion_rate, 0.0);
    }

    #[tokio::test]
    async fn test_purchase_credits_referring_affiliate() {
        let (store, service) = service();
        let affiliate = approved_affiliate(&store, "ABC123").await;
        let user_id = ObjectId::new();
        service.track_signup("ABC123", user_id).await.unwrap();

        let order_id = ObjectId::new();
        let referral = service.track_purchase(user_id, order_id, 10000.0).await.unwrap().unwrap();
        assert_eq!(referral.kind, ReferralType::Purchase);
        assert_eq!(referral.commission, Some(500.0));
        assert_eq!(referral.order_id, Some(order_id));

        let updated = reload(&store, &affiliate).await;
        assert_eq!(updated.stats.total_sales, 1);
        assert_eq!(updated.stats.total_earnings, 500.0);
        assert_eq!(updated.next_payout_amount, 500.0);
        assert_eq!(updated.commission_rate, 0.05);
    }

    #[tokio::test]
    async fn test_same_order_is_credited_once() {
        let (store, service) = service();
        let affiliate = approved_affiliate(&store, "ABC123").await;
        let user_id = ObjectId::new();
        service.track_signup("ABC123", user_id).await.unwrap();

        let order_id = ObjectId::new();
        assert!(service.track_purchase(user_id, order_id, 10000.0).await.unwrap().is_some());
        assert!(service.track_purchase(user_id, order_id, 10000.0).await.unwrap().is_none());
        service.track_purchase_best_effort(user_id, order_id, 10000.0).await;

        let updated = reload(&store, &affiliate).await;
        assert_eq!(updated.stats.total_sales, 1);
        assert_eq!(updated.stats.total_earnings, 500.0);
        assert_eq!(updated.next_payout_amount, 500.0);
        let purchases = store.referrals().into_iter().filter(|r| r.kind == ReferralType::Purchase).count();
        assert_eq!(purchases, 1);
    }

    #[tokio::test]
    async fn test_purchase_without_signup_referral_is_ignored() {
        let (store, service) = service();
        let affiliate = approved_affiliate(&store, "ABC123").await;

        let result = service.track_purchase(ObjectId::new(), ObjectId::new(), 10000.0).await.unwrap();
        assert!(result.is_none());
        assert!(store.referrals().is_empty());
        assert_eq!(reload(&store, &affiliate).await.stats.total_earnings, 0.0);
    }

    #[tokio::test]
    async fn test_purchase_for_suspended_affiliate_is_ignored() {
        let (store, service) = service();
        let affiliate = approved_affiliate(&store, "ABC123").await;
        let user_id = ObjectId::new();
        service.track_signup("ABC123", user_id).await.unwrap();
        service.update_status(ObjectId::new(), affiliate.id.as_ref().unwrap(), AffiliateStatus::Suspended, None)
            .await
            .unwrap();

        assert!(service.track_purchase(user_id, ObjectId::new(), 10000.0).await.unwrap().is_none());
        assert_eq!(reload(&store, &affiliate).await.stats.total_sales, 0);
    }

    #[tokio::test]
    async fn test_commission_tier_moves_at_eleventh_sale() {
        let (store, service) = service();
        let affiliate = approved_affiliate(&store, "ABC123").await;
        let user_id = ObjectId::new();
        service.track_signup("ABC123", user_id).await.unwrap();

        for _ in 0..10 {
            service.track_purchase(user_id, ObjectId::new(), 1000.0).await.unwrap();
        }
        let after_ten = reload(&store, &affiliate).await;
        assert_eq!(after_ten.commission_rate, 0.05);
        assert_eq!(after_ten.stats.total_earnings, 500.0);

        // The 11th sale is still paid at the old rate, then the tier moves up
        let eleventh = service.track_purchase(user_id, ObjectId::new(), 1000.0).await.unwrap().unwrap();
        assert_eq!(eleventh.commission, Some(50.0));
        assert_eq!(reload(&store, &affiliate).await.commission_rate, 0.075);

        let twelfth = service.track_purchase(user_id, ObjectId::new(), 1000.0).await.unwrap().unwrap();
        assert_eq!(twelfth.commission, Some(75.0));
    }

    #[tokio::test]
    async fn test_apply_once_per_user() {
        let (_store, service) = service();
        let user_id = ObjectId::new();

        let affiliate = service.apply(user_id, AffiliateApplication::default()).await.unwrap();
        assert_eq!(affiliate.status, AffiliateStatus::Pending);
        assert_eq!(affiliate.code.len(), 8);

        let err = service.apply(user_id, AffiliateApplication::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::DuplicateError(_)));
    }

    #[tokio::test]
    async fn test_status_workflow_enforced() {
        let (_store, service) = service();
        let admin = ObjectId::new();
        let affiliate = service.apply(ObjectId::new(), AffiliateApplication::default()).await.unwrap();
        let id = affiliate.id.unwrap();

        let err = service.update_status(admin, &id, AffiliateStatus::Suspended, None).await.unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));

        let rejected = service.update_status(admin, &id, AffiliateStatus::Rejected, Some("No audience".into()))
            .await
            .unwrap();
        assert_eq!(rejected.rejection_reason.as_deref(), Some("No audience"));

        let approved = service.update_status(admin, &id, AffiliateStatus::Approved, None).await.unwrap();
        assert_eq!(approved.approved_by, Some(admin));
        assert!(approved.approved_at.is_some());
        assert!(approved.rejection_reason.is_none());
        assert!(service.is_trackable_code(&approved.code).await.unwrap());
    }

    #[tokio::test]
    async fn test_payout_moves_pending_balance() {
        let (store, service) = service();
        let affiliate = approved_affiliate(&store, "ABC123").await;
        let id = affiliate.id.unwrap();

        let err = service.record_payout(&id).await.unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));

        let user_id = ObjectId::new();
        service.track_signup("ABC123", user_id).await.unwrap();
        service.track_purchase(user_id, ObjectId::new(), 20000.0).await.unwrap();

        let paid = service.record_payout(&id).await.unwrap();
        assert_eq!(paid.next_payout_amount, 0.0);
        assert_eq!(paid.total_paid_out, 1000.0);
        assert!(paid.last_payout_at.is_some());
        assert_eq!(paid.stats.total_earnings, 1000.0);
    }

    #[tokio::test]
    async fn test_dashboard_and_payment_info() {
        let (store, service) = service();
        let user_id = ObjectId::new();
        let mut affiliate = Affiliate::new(user_id, "ABC123".into(), AffiliateApplication::default());
        affiliate.status = AffiliateStatus::Approved;
        store.insert_affiliate(affiliate).await.unwrap();
        service.track_click("ABC123", None, None).await.unwrap();

        let dashboard = service.dashboard(&user_id).await.unwrap();
        assert_eq!(dashboard.referral_link, "https://shop.example/?ref=ABC123");
        assert_eq!(dashboard.recent_referrals.len(), 1);

        let bad = PayoutInfo { method: "bank".into(), phone: "677000000".into(), account_name: "Ada".into() };
        assert!(service.update_payment_info(&user_id, bad).await.is_err());

        let good = PayoutInfo { method: "mtn_momo".into(), phone: "677000000".into(), account_name: "Ada".into() };
        let updated = service.update_payment_info(&user_id, good.clone()).await.unwrap();
        assert_eq!(updated.payment_info, Some(good));

        assert!(matches!(service.dashboard(&ObjectId::new()).await, Err(ApiError::NotFound(_))));
    }
}
