use actix_web::web;
use crate::handlers::user_handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/user")
            .route("/register", web::post().to(user_handlers::register))
            .route("/login", web::post().to(user_handlers::login))
            .route("/profile", web::get().to(user_handlers::get_profile))
            .route("/profile", web::put().to(user_handlers::update_profile))
            .route("/cart", web::get().to(user_handlers::get_cart))
            .route("/cart/add", web::post().to(user_handlers::add_to_cart))
            .route("/cart/update", web::put().to(user_handlers::update_cart))
            .route("/cart/clear", web::post().to(user_handlers::clear_cart))
            .route("/favorites", web::get().to(user_handlers::get_favorites))
            .route("/favorites/toggle", web::post().to(user_handlers::toggle_favorite))
            .route("/admin/all", web::get().to(user_handlers::list_users))
    );
}
