mod user_routes;
mod product_routes;
mod order_routes;
mod mesomb_routes;
mod affiliate_routes;
mod admin_auth_routes;
mod meta_routes;

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    user_routes::configure(cfg);
    product_routes::configure(cfg);
    order_routes::configure(cfg);
    mesomb_routes::configure(cfg);
    affiliate_routes::configure(cfg);
    admin_auth_routes::configure(cfg);
    meta_routes::configure(cfg);
}
