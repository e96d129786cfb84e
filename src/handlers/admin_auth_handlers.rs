use actix_web::{web, HttpResponse};
use log::{info, warn};
use serde_json::json;

use crate::handlers::{parse_object_id, AuthAdmin};
use crate::models::admin::{AdminLoginRequest, ChangePasswordRequest, CreateAdminRequest, UpdateAdminRequest};
use crate::models::user::validate_email;
use crate::models::{Admin, AdminRole, ApiError, Permission};
use crate::services::{AuthService, MongoDBService};

pub async fn login(
    mongodb: web::Data<MongoDBService>,
    auth: web::Data<AuthService>,
    payload: web::Json<AdminLoginRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Admin login attempt for {}", payload.login);

    let admin = match mongodb.find_admin_by_login(&payload.login).await? {
        Some(admin) if auth.verify_password(&payload.password, &admin.password) => admin,
        _ => {
            warn!("Failed admin login for {}", payload.login);
            return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
        }
    };
    if !admin.is_active {
        return Err(ApiError::Forbidden("This admin account has been deactivated".to_string()));
    }
    let admin_id = admin.id
        .ok_or_else(|| ApiError::InternalError("Stored admin has no id".to_string()))?;

    mongodb.touch_admin_login(&admin_id).await?;
    let token = auth.issue_admin_token(&admin_id, admin.role)?;
    info!("Admin {} logged in as {}", admin.username, admin.role);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "token": token,
        "admin": admin.public(),
    })))
}

pub async fn me(admin: AuthAdmin) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(json!({ "success": true, "admin": admin.admin.public() })))
}

pub async fn change_password(
    mongodb: web::Data<MongoDBService>,
    auth: web::Data<AuthService>,
    admin: AuthAdmin,
    payload: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Admin {} changing password", admin.admin.username);
    let mut account = admin.admin;

    if !auth.verify_password(&payload.current_password, &account.password) {
        return Err(ApiError::Unauthorized("Current password is incorrect".to_string()));
    }
    AuthService::validate_password_strength(&payload.new_password)?;

    account.password = auth.hash_password(&payload.new_password)?;
    mongodb.save_admin(&mut account).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Password updated" })))
}

pub async fn list_admins(
    mongodb: web::Data<MongoDBService>,
    admin: AuthAdmin,
) -> Result<HttpResponse, ApiError> {
    admin.require(Permission::ManageAdmins)?;
    let admins: Vec<Admin> = mongodb.list_admins().await?.iter().map(Admin::public).collect();
    Ok(HttpResponse::Ok().json(json!({ "success": true, "admins": admins })))
}

pub async fn create_admin(
    mongodb: web::Data<MongoDBService>,
    auth: web::Data<AuthService>,
    admin: AuthAdmin,
    payload: web::Json<CreateAdminRequest>,
) -> Result<HttpResponse, ApiError> {
    admin.require(Permission::ManageAdmins)?;
    let req = payload.into_inner();
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();
    info!("Admin {} creating {} account {}", admin.admin.username, req.role, username);

    if username.is_empty() {
        return Err(ApiError::ValidationError("Username is required".to_string()));
    }
    if !validate_email(&email) {
        return Err(ApiError::ValidationError("Please enter a valid email".to_string()));
    }
    AuthService::validate_password_strength(&req.password)?;

    let hashed = auth.hash_password(&req.password)?;
    let created = mongodb
        .create_admin(Admin::new(username, email, hashed, req.role, admin.admin.id))
        .await?;

    Ok(HttpResponse::Created().json(json!({ "success": true, "admin": created.public() })))
}

pub async fn update_admin(
    mongodb: web::Data<MongoDBService>,
    admin: AuthAdmin,
    admin_id: web::Path<String>,
    payload: web::Json<UpdateAdminRequest>,
) -> Result<HttpResponse, ApiError> {
    admin.require(Permission::ManageAdmins)?;
    let id = parse_object_id(&admin_id, "admin")?;
    let req = payload.into_inner();

    if id == admin.id()? {
        if req.is_active == Some(false) {
            return Err(ApiError::Forbidden("You cannot deactivate your own account".to_string()));
        }
        if req.role.map_or(false, |role| role != admin.admin.role) {
            return Err(ApiError::Forbidden("You cannot change your own role".to_string()));
        }
    }

    let mut target = mongodb
        .get_admin(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Admin {} not found", id)))?;

    if let Some(email) = req.email {
        let email = email.trim().to_lowercase();
        if !validate_email(&email) {
            return Err(ApiError::ValidationError("Please enter a valid email".to_string()));
        }
        if email != target.email && mongodb.find_admin_by_login(&email).await?.is_some() {
            return Err(ApiError::DuplicateError(format!("Email {} is already in use", email)));
        }
        target.email = email;
    }
    if let Some(role) = req.role {
        target.role = role;
    }
    if let Some(active) = req.is_active {
        target.is_active = active;
    }

    mongodb.save_admin(&mut target).await?;
    info!("Admin {} updated admin {} (role {}, active {})", admin.admin.username, target.username, target.role, target.is_active);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "admin": target.public() })))
}

pub async fn delete_admin(
    mongodb: web::Data<MongoDBService>,
    admin: AuthAdmin,
    admin_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    admin.require(Permission::ManageAdmins)?;
    let id = parse_object_id(&admin_id, "admin")?;
    if id == admin.id()? {
        return Err(ApiError::Forbidden("You cannot delete your own account".to_string()));
    }

    if !mongodb.delete_admin(&id).await? {
        return Err(ApiError::NotFound(format!("Admin {} not found", id)));
    }
    info!("Admin {} deleted admin {}", admin.admin.username, id);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Admin deleted" })))
}

/// Creates the first super admin from the environment when the admins
/// collection is empty.
pub async fn ensure_super_admin(
    mongodb: &MongoDBService,
    auth: &AuthService,
    bootstrap: Option<&crate::config::BootstrapAdmin>,
) -> Result<(), ApiError> {
    if mongodb.count_admins().await? > 0 {
        return Ok(());
    }
    let Some(bootstrap) = bootstrap else {
        warn!("No admin accounts exist and SUPER_ADMIN_* is not set; the admin console is unusable");
        return Ok(());
    };

    AuthService::validate_password_strength(&bootstrap.password)?;
    let hashed = auth.hash_password(&bootstrap.password)?;
    let admin = mongodb
        .create_admin(Admin::new(
            bootstrap.username.clone(),
            bootstrap.email.trim().to_lowercase(),
            hashed,
            AdminRole::SuperAdmin,
            None,
        ))
        .await?;
    info!("Created initial super admin {}", admin.username);
    Ok(())
}
