use actix_web::web;
use crate::handlers::product_handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/product")
            .route("/list", web::get().to(product_handlers::list_products))
            .route("/add", web::post().to(product_handlers::add_product))
            .route("/admin/all", web::get().to(product_handlers::list_all_products))
            .route("/{id}", web::get().to(product_handlers::get_product))
            .route("/{id}", web::put().to(product_handlers::update_product))
            .route("/{id}", web::delete().to(product_handlers::delete_product))
            .route("/{id}/toggle-active", web::put().to(product_handlers::toggle_product_active))
            .route("/{id}/review", web::post().to(product_handlers::add_review))
            .route("/{id}/review", web::delete().to(product_handlers::delete_review))
            .route("/{id}/photo", web::post().to(product_handlers::add_user_photo))
            .route("/{id}/photo/{photo_id}", web::delete().to(product_handlers::delete_user_photo))
    );
}
