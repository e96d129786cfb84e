use actix_web::web;
use crate::handlers::admin_auth_handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin-auth")
            .route("/login", web::post().to(admin_auth_handlers::login))
            .route("/me", web::get().to(admin_auth_handlers::me))
            .route("/change-password", web::put().to(admin_auth_handlers::change_password))
            .route("/admins", web::get().to(admin_auth_handlers::list_admins))
            .route("/admins", web::post().to(admin_auth_handlers::create_admin))
            .route("/admins/{id}", web::put().to(admin_auth_handlers::update_admin))
            .route("/admins/{id}", web::delete().to(admin_auth_handlers::delete_admin))
    );
}
