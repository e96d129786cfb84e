use actix_web::web;
use crate::handlers::mesomb_handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/mesomb")
            .route("/pay", web::post().to(mesomb_handlers::pay))
            .route("/status/{reference}", web::get().to(mesomb_handlers::payment_status))
    );
}
