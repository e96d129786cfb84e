use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, Error as ActixError, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use log::warn;
use mongodb::bson::oid::ObjectId;

use crate::models::{Admin, ApiError, Permission};
use crate::services::{AuthService, MongoDBService};

/// Reads the JWT from the `token` header or from `Authorization: Bearer`.
pub fn extract_token(req: &HttpRequest) -> Option<String> {
    if let Some(token) = req.headers().get("token").and_then(|v| v.to_str().ok()) {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn auth_service(req: &HttpRequest) -> Result<web::Data<AuthService>, ApiError> {
    req.app_data::<web::Data<AuthService>>()
        .cloned()
        .ok_or_else(|| ApiError::InternalError("Auth service not configured".to_string()))
}

/// A storefront customer with a valid session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: ObjectId,
}

impl FromRequest for AuthUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate_user(req).map_err(ActixError::from))
    }
}

fn authenticate_user(req: &HttpRequest) -> Result<AuthUser, ApiError> {
    let auth = auth_service(req)?;
    let token = extract_token(req)
        .ok_or_else(|| ApiError::Unauthorized("Not authorized, please log in again".to_string()))?;
    let user_id = auth.verify_user_token(&token)?;
    Ok(AuthUser { user_id })
}

/// An active admin account, reloaded from the database on every request so
/// role changes and deactivation take effect immediately.
#[derive(Debug, Clone)]
pub struct AuthAdmin {
    pub admin: Admin,
}

impl AuthAdmin {
    pub fn id(&self) -> Result<ObjectId, ApiError> {
        self.admin.id
            .ok_or_else(|| ApiError::InternalError("Admin without id".to_string()))
    }

    pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
        if self.admin.permissions.allows(permission) {
            Ok(())
        } else {
            warn!("Admin {} lacks permission {:?}", self.admin.username, permission);
            Err(ApiError::Forbidden("You do not have permission to perform this action".to_string()))
        }
    }
}

impl FromRequest for AuthAdmin {
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move { authenticate_admin(&req).await.map_err(ActixError::from) })
    }
}

async fn authenticate_admin(req: &HttpRequest) -> Result<AuthAdmin, ApiError> {
    let auth = auth_service(req)?;
    let mongodb = req.app_data::<web::Data<MongoDBService>>()
        .cloned()
        .ok_or_else(|| ApiError::InternalError("Database not configured".to_string()))?;

    let token = extract_token(req)
        .ok_or_else(|| ApiError::Unauthorized("Admin authentication required".to_string()))?;
    let (admin_id, _) = auth.verify_admin_token(&token)?;

    let admin = mongodb
        .get_admin(&admin_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Admin account no longer exists".to_string()))?;
    if !admin.is_active {
        warn!("Rejected request from deactivated admin {}", admin.username);
        return Err(ApiError::Forbidden("This admin account has been deactivated".to_string()));
    }
    Ok(AuthAdmin { admin })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use crate::models::AdminRole;
    use crate::services::auth_service::tests::test_auth_service;

    #[test]
    fn test_extract_token_from_either_header() {
        let req = TestRequest::default().insert_header(("token", "abc.def")).to_http_request();
        assert_eq!(extract_token(&req).as_deref(), Some("abc.def"));

        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer xyz.123"))
            .to_http_request();
        assert_eq!(extract_token(&req).as_deref(), Some("xyz.123"));

        let req = TestRequest::default().insert_header(("Authorization", "Basic Zm9v")).to_http_request();
        assert!(extract_token(&req).is_none());

        let req = TestRequest::default().to_http_request();
        assert!(extract_token(&req).is_none());
    }

    #[actix_web::test]
    async fn test_auth_user_extractor() {
        let auth = test_auth_service();
        let user_id = ObjectId::new();
        let token = auth.issue_user_token(&user_id).unwrap();

        let req = TestRequest::default()
            .app_data(web::Data::new(auth.clone()))
            .insert_header(("token", token))
            .to_http_request();
        let user = AuthUser::extract(&req).await.unwrap();
        assert_eq!(user.user_id, user_id);

        let admin_token = auth.issue_admin_token(&ObjectId::new(), AdminRole::SuperAdmin).unwrap();
        let req = TestRequest::default()
            .app_data(web::Data::new(auth.clone()))
            .insert_header(("Authorization", format!("Bearer {}", admin_token)))
            .to_http_request();
        let err = AuthUser::extract(&req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), actix_web::http::StatusCode::UNAUTHORIZED);

        let req = TestRequest::default().app_data(web::Data::new(auth)).to_http_request();
        assert!(AuthUser::extract(&req).await.is_err());
    }

    #[test]
    fn test_require_checks_permissions() {
        let assistant = AuthAdmin {
            admin: Admin::new("helper".into(), "helper@shop.cm".into(), "hash".into(), AdminRole::AssistantAdmin, None),
        };
        assert!(assistant.require(Permission::ManageProducts).is_ok());
        assert!(matches!(assistant.require(Permission::ManageAdmins), Err(ApiError::Forbidden(_))));
        assert!(assistant.id().is_err());
    }
}
