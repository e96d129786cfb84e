use actix_web::web;
use crate::handlers::meta_handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/meta")
            .route("", web::get().to(meta_handlers::home_meta))
            .route("/", web::get().to(meta_handlers::home_meta))
            .route("/product/{id}", web::get().to(meta_handlers::product_meta))
    );
}
