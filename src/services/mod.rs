mod mongodb;
pub mod auth_service;
pub mod affiliate_service;
pub mod mesomb_client;

pub use mongodb::MongoDBService;
pub use auth_service::AuthService;
pub use affiliate_service::AffiliateService;
pub use mesomb_client::MesombClient;
