use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use jsonwebtoken::errors::ErrorKind;
use log::{debug, warn};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AdminRole, ApiError};

const USER_TOKEN_KIND: &str = "user";
const ADMIN_TOKEN_KIND: &str = "admin";
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Failed to issue token: {0}")]
    Encoding(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenExpired | AuthError::InvalidToken => {
                ApiError::Unauthorized("Session expired, please log in again".to_string())
            }
            AuthError::Encoding(_) | AuthError::Hashing(_) => ApiError::InternalError(err.to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserClaims {
    pub id: String,
    pub kind: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminClaims {
    pub id: String,
    pub role: AdminRole,
    pub kind: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    user_token_ttl: Duration,
    admin_token_ttl: Duration,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(secret: &str, user_token_ttl: Duration, admin_token_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            user_token_ttl,
            admin_token_ttl,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    #[cfg(test)]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        bcrypt::hash(password, self.bcrypt_cost).map_err(|e| AuthError::Hashing(e.to_string()))
    }

    /// A malformed stored hash counts as a mismatch.
    pub fn verify_password(&self, password: &str, hashed: &str) -> bool {
        match bcrypt::verify(password, hashed) {
            Ok(matches) => matches,
            Err(e) => {
                warn!("Password verification failed: {}", e);
                false
            }
        }
    }

    pub fn validate_password_strength(password: &str) -> Result<(), ApiError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::ValidationError(format!(
                "Password must be at least {} characters", MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }

    pub fn issue_user_token(&self, user_id: &ObjectId) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = UserClaims {
            id: user_id.to_hex(),
            kind: USER_TOKEN_KIND.to_string(),
            iat: now.timestamp(),
            exp: (now + self.user_token_ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Encoding(e.to_string()))
    }

    pub fn issue_admin_token(&self, admin_id: &ObjectId, role: AdminRole) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = AdminClaims {
            id: admin_id.to_hex(),
            role,
            kind: ADMIN_TOKEN_KIND.to_string(),
            iat: now.timestamp(),
            exp: (now + self.admin_token_ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Encoding(e.to_string()))
    }

    fn decode_claims<T: serde::de::DeserializeOwned>(&self, token: &str) -> Result<T, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<T>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    debug!("Token verification failed: token expired");
                    AuthError::TokenExpired
                }
                _ => {
                    warn!("Token verification failed: {}", e);
                    AuthError::InvalidToken
                }
            })
    }

    pub fn verify_user_token(&self, token: &str) -> Result<ObjectId, AuthError> {
        let claims: UserClaims = self.decode_claims(token)?;
        if claims.kind != USER_TOKEN_KIND {
            return Err(AuthError::InvalidToken);
        }
        ObjectId::parse_str(&claims.id).map_err(|_| AuthError::InvalidToken)
    }

    pub fn verify_admin_token(&self, token: &str) -> Result<(ObjectId, AdminRole), AuthError> {
        let claims: AdminClaims = self.decode_claims(token)?;
        if claims.kind != ADMIN_TOKEN_KIND {
            return Err(AuthError::InvalidToken);
        }
        let id = ObjectId::parse_str(&claims.id).map_err(|_| AuthError::InvalidToken)?;
        Ok((id, claims.role))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_auth_service() -> AuthService {
        AuthService::new("test-secret", Duration::days(7), Duration::hours(24)).with_bcrypt_cost(4)
    }

    #[test]
    fn test_hash_and_verify_password() {
        let auth = test_auth_service();
        let hashed = auth.hash_password("SecurePassword123").unwrap();
        assert!(auth.verify_password("SecurePassword123", &hashed));
        assert!(!auth.verify_password("WrongPassword", &hashed));
        assert!(!auth.verify_password("SecurePassword123", "invalid-hash"));
    }

    #[test]
    fn test_user_token_round_trip() {
        let auth = test_auth_service();
        let user_id = ObjectId::new();
        let token = auth.issue_user_token(&user_id).unwrap();
        assert_eq!(auth.verify_user_token(&token).unwrap(), user_id);
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let auth = test_auth_service();
        let id = ObjectId::new();
        let admin_token = auth.issue_admin_token(&id, AdminRole::AssistantAdmin).unwrap();
        let user_token = auth.issue_user_token(&id).unwrap();

        assert!(matches!(auth.verify_user_token(&admin_token), Err(AuthError::InvalidToken)));
        assert!(auth.verify_admin_token(&user_token).is_err());

        let (admin_id, role) = auth.verify_admin_token(&admin_token).unwrap();
        assert_eq!(admin_id, id);
        assert_eq!(role, AdminRole::AssistantAdmin);
    }

    #[test]
    fn test_expired_and_foreign_tokens_rejected() {
        let expired = AuthService::new("test-secret", Duration::hours(-2), Duration::hours(-2));
        let token = expired.issue_user_token(&ObjectId::new()).unwrap();
        assert!(matches!(test_auth_service().verify_user_token(&token), Err(AuthError::TokenExpired)));

        let other = AuthService::new("another-secret", Duration::days(1), Duration::days(1));
        let token = other.issue_user_token(&ObjectId::new()).unwrap();
        assert!(matches!(test_auth_service().verify_user_token(&token), Err(AuthError::InvalidToken)));
        assert!(matches!(test_auth_service().verify_user_token("garbage"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_password_strength() {
        assert!(AuthService::validate_password_strength("short").is_err());
        assert!(AuthService::validate_password_strength("longenough").is_ok());
    }
}
