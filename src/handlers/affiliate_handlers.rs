use actix_web::{web, HttpRequest, HttpResponse};
use log::info;
use serde::Deserialize;
use serde_json::json;

use crate::handlers::{parse_object_id, AuthAdmin, AuthUser};
use crate::models::affiliate::{
    AffiliateApplication, AffiliateListQuery, PayoutInfo, TrackClickRequest, UpdateAffiliateStatusRequest,
};
use crate::models::{ApiError, Permission};
use crate::services::AffiliateService;

const DEFAULT_REFERRAL_PAGE: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct ReferralsQuery {
    pub limit: Option<i64>,
}

fn client_details(req: &HttpRequest) -> (Option<String>, Option<String>) {
    let ip = req.connection_info().realip_remote_addr().map(str::to_string);
    let user_agent = req.headers()
        .get("User-Agent")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    (ip, user_agent)
}

pub async fn track_click(
    affiliates: web::Data<AffiliateService>,
    req: HttpRequest,
    payload: web::Json<TrackClickRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Tracking referral click for code {}", payload.code);
    let (ip, user_agent) = client_details(&req);
    let tracked = affiliates.track_click(&payload.code, ip, user_agent).await?;

    // Unknown codes are not an error for the storefront
    Ok(HttpResponse::Ok().json(json!({ "success": tracked })))
}

pub async fn validate_code(
    affiliates: web::Data<AffiliateService>,
    code: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let valid = affiliates.is_trackable_code(&code).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "valid": valid })))
}

pub async fn apply(
    affiliates: web::Data<AffiliateService>,
    user: AuthUser,
    payload: web::Json<AffiliateApplication>,
) -> Result<HttpResponse, ApiError> {
    info!("User {} applying to the affiliate program", user.user_id);
    let affiliate = affiliates.apply(user.user_id, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Application submitted, we will review it shortly",
        "affiliate": affiliate,
    })))
}

pub async fn dashboard(
    affiliates: web::Data<AffiliateService>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let dashboard = affiliates.dashboard(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "dashboard": dashboard })))
}

pub async fn referrals(
    affiliates: web::Data<AffiliateService>,
    user: AuthUser,
    query: web::Query<ReferralsQuery>,
) -> Result<HttpResponse, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_REFERRAL_PAGE);
    let referrals = affiliates.referrals(&user.user_id, limit).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "referrals": referrals })))
}

pub async fn update_payment_info(
    affiliates: web::Data<AffiliateService>,
    user: AuthUser,
    payload: web::Json<PayoutInfo>,
) -> Result<HttpResponse, ApiError> {
    info!("User {} updating affiliate payout details", user.user_id);
    let affiliate = affiliates.update_payment_info(&user.user_id, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "affiliate": affiliate })))
}

pub async fn list_affiliates(
    affiliates: web::Data<AffiliateService>,
    admin: AuthAdmin,
    query: web::Query<AffiliateListQuery>,
) -> Result<HttpResponse, ApiError> {
    admin.require(Permission::ManageAffiliates)?;
    info!("Admin {} listing affiliates (status: {:?})", admin.admin.username, query.status);
    let list = affiliates.list(query.status).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "affiliates": list })))
}

pub async fn update_status(
    affiliates: web::Data<AffiliateService>,
    admin: AuthAdmin,
    affiliate_id: web::Path<String>,
    payload: web::Json<UpdateAffiliateStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    admin.require(Permission::ManageAffiliates)?;
    let id = parse_object_id(&affiliate_id, "affiliate")?;
    let req = payload.into_inner();
    let affiliate = affiliates.update_status(admin.id()?, &id, req.status, req.reason).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "affiliate": affiliate })))
}

pub async fn toggle_active(
    affiliates: web::Data<AffiliateService>,
    admin: AuthAdmin,
    affiliate_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    admin.require(Permission::ManageAffiliates)?;
    let id = parse_object_id(&affiliate_id, "affiliate")?;
    let affiliate = affiliates.toggle_active(&id).await?;
    info!("Admin {} set affiliate {} active={}", admin.admin.username, affiliate.code, affiliate.is_active);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "affiliate": affiliate })))
}

pub async fn record_payout(
    affiliates: web::Data<AffiliateService>,
    admin: AuthAdmin,
    affiliate_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    admin.require(Permission::ManageAffiliates)?;
    let id = parse_object_id(&affiliate_id, "affiliate")?;
    let affiliate = affiliates.record_payout(&id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Payout recorded",
        "affiliate": affiliate,
    })))
}
