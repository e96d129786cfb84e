use actix_web::web;
use crate::handlers::order_handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/order")
            .route("/shipping-quote", web::post().to(order_handlers::shipping_quote))
            .route("/place", web::post().to(order_handlers::place_order))
            .route("/user", web::get().to(order_handlers::user_orders))
            .route("/admin/all", web::get().to(order_handlers::all_orders))
            .route("/admin/stats", web::get().to(order_handlers::order_stats))
            .route("/admin/{id}/status", web::put().to(order_handlers::update_status))
            .route("/admin/{id}/payment", web::put().to(order_handlers::update_payment))
    );
}
