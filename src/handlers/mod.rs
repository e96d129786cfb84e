pub mod auth;
pub mod user_handlers;
pub mod product_handlers;
pub mod order_handlers;
pub mod mesomb_handlers;
pub mod affiliate_handlers;
pub mod admin_auth_handlers;
pub mod meta_handlers;

pub use auth::{AuthAdmin, AuthUser};

use mongodb::bson::oid::ObjectId;
use crate::models::ApiError;

/// Parses a path or body id, naming the entity in the error.
pub(crate) fn parse_object_id(raw: &str, entity: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw.trim())
        .map_err(|_| ApiError::ValidationError(format!("Invalid {} id: {}", entity, raw)))
}
