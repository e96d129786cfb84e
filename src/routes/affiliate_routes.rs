use actix_web::web;
use crate::handlers::affiliate_handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/affiliate")
            .route("/track-click", web::post().to(affiliate_handlers::track_click))
            .route("/validate/{code}", web::get().to(affiliate_handlers::validate_code))
            .route("/apply", web::post().to(affiliate_handlers::apply))
            .route("/dashboard", web::get().to(affiliate_handlers::dashboard))
            .route("/referrals", web::get().to(affiliate_handlers::referrals))
            .route("/payment-info", web::put().to(affiliate_handlers::update_payment_info))
            .route("/admin/all", web::get().to(affiliate_handlers::list_affiliates))
            .route("/admin/{id}/status", web::put().to(affiliate_handlers::update_status))
            .route("/admin/{id}/toggle-active", web::put().to(affiliate_handlers::toggle_active))
            .route("/admin/{id}/payout", web::post().to(affiliate_handlers::record_payout))
    );
}
