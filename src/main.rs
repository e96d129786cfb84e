use std::sync::Arc;
use actix_web::{App, HttpServer, HttpResponse, web};
use actix_cors::Cors;
use log::{info, error};
use dotenv::dotenv;

mod config;
mod handlers;
mod models;
mod routes;
mod services;
mod traits;
mod utils;

use config::AppConfig;
use handlers::admin_auth_handlers::ensure_super_admin;
use services::{AffiliateService, AuthService, MesombClient, MongoDBService};
use traits::AffiliateStore;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    let config = AppConfig::load()?;

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(config.log_level.clone()));
    config.log_summary();

    let mongodb = MongoDBService::init(&config.mongodb_uri, &config.mongodb_database)
        .await
        .map_err(|e| {
            error!("Failed to initialize MongoDB: {}", e);
            e
        })?;

    let auth_service = AuthService::new(
        &config.jwt_secret,
        chrono::Duration::days(config.user_token_days),
        chrono::Duration::hours(config.admin_token_hours),
    );

    ensure_super_admin(&mongodb, &auth_service, config.bootstrap_admin.as_ref())
        .await
        .map_err(|e| format!("Failed to create initial super admin: {}", e))?;

    let affiliate_store: Arc<dyn AffiliateStore> = Arc::new(mongodb.clone());
    let affiliate_service = web::Data::new(AffiliateService::new(affiliate_store, config.site().frontend_url));
    let mesomb_client = web::Data::new(MesombClient::new(config.mesomb.clone())?);
    let mongodb_data = web::Data::new(mongodb);
    let auth_data = web::Data::new(auth_service);
    let site_data = web::Data::new(config.site());

    let (host, port) = (config.host.clone(), config.port);
    info!("Starting server at http://{}:{}", host, port);

    HttpServer::new(move || {
        // Configure CORS middleware
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .expose_headers(vec!["content-type", "content-length", "accept"])
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(mongodb_data.clone())
            .app_data(auth_data.clone())
            .app_data(affiliate_service.clone())
            .app_data(mesomb_client.clone())
            .app_data(site_data.clone())
            .configure(routes::configure)
            .route("/health", web::get().to(|| async {
                info!("Health check");
                HttpResponse::Ok().body("OK")
            }))
    })
    .bind(format!("{host}:{port}"))?
    .run()
    .await?;

    info!("Server shutting down");
    Ok(())
}
