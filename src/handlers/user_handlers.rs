use actix_web::{web, HttpResponse};
use log::{info, warn, error};
use serde_json::json;

use crate::handlers::{parse_object_id, AuthAdmin, AuthUser};
use crate::models::user::{
    quantity_after_add, set_cart_quantity, validate_email, CartAddRequest, CartUpdateRequest, LoginRequest,
    RegisterRequest, ToggleFavoriteRequest, UpdateProfileRequest,
};
use crate::models::{ApiError, Permission, Product, User};
use crate::services::{AffiliateService, AuthService, MongoDBService};
use crate::utils::affiliate_code::normalize_affiliate_code;
use crate::utils::variant::variant_key;

async fn load_user(mongodb: &MongoDBService, user: &AuthUser) -> Result<User, ApiError> {
    mongodb
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

async fn load_active_product(mongodb: &MongoDBService, product_id: &str) -> Result<Product, ApiError> {
    let id = parse_object_id(product_id, "product")?;
    match mongodb.get_product(&id).await? {
        Some(product) if product.is_active => Ok(product),
        _ => Err(ApiError::NotFound(format!("Product {} not found", product_id))),
    }
}

pub async fn register(
    mongodb: web::Data<MongoDBService>,
    auth: web::Data<AuthService>,
    affiliates: web::Data<AffiliateService>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    let email = req.email.trim().to_lowercase();
    info!("Registering user {}", email);

    if req.name.trim().is_empty() {
        return Err(ApiError::ValidationError("Name is required".to_string()));
    }
    if !validate_email(&email) {
        return Err(ApiError::ValidationError("Please enter a valid email".to_string()));
    }
    AuthService::validate_password_strength(&req.password)?;

    let referral_code = req.referral_code
        .as_deref()
        .map(normalize_affiliate_code)
        .filter(|code| !code.is_empty());

    // Only remember codes that still point at a live affiliate
    let referred_by = match &referral_code {
        Some(code) => match affiliates.is_trackable_code(code).await {
            Ok(true) => Some(code.clone()),
            Ok(false) => None,
            Err(e) => {
                error!("Failed to validate referral code {}: {}", code, e);
                None
            }
        },
        None => None,
    };

    let hashed = auth.hash_password(&req.password)?;
    let user = mongodb
        .create_user(User::new(req.name.trim().to_string(), email, hashed, referred_by.clone()))
        .await?;
    let user_id = user.id
        .ok_or_else(|| ApiError::InternalError("Created user has no id".to_string()))?;

    if let Some(code) = referred_by {
        affiliates.track_signup_best_effort(&code, user_id).await;
    }

    let token = auth.issue_user_token(&user_id)?;
    info!("Registered user {}", user_id);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "token": token,
        "user": user.public(),
    })))
}

pub async fn login(
    mongodb: web::Data<MongoDBService>,
    auth: web::Data<AuthService>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Login attempt for {}", payload.email);

    let user = match mongodb.get_user_by_email(&payload.email).await? {
        Some(user) if auth.verify_password(&payload.password, &user.password) => user,
        _ => {
            warn!("Failed login for {}", payload.email);
            return Err(ApiError::Unauthorized("Invalid email or password".to_string()));
        }
    };
    let user_id = user.id
        .ok_or_else(|| ApiError::InternalError("Stored user has no id".to_string()))?;

    let token = auth.issue_user_token(&user_id)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "token": token,
        "user": user.public(),
    })))
}

pub async fn get_profile(
    mongodb: web::Data<MongoDBService>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    info!("Fetching profile for user {}", user.user_id);
    let profile = load_user(&mongodb, &user).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "user": profile.public() })))
}

pub async fn update_profile(
    mongodb: web::Data<MongoDBService>,
    user: AuthUser,
    payload: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Updating profile for user {}", user.user_id);
    let req = payload.into_inner();

    let name = match req.name {
        Some(name) if name.trim().is_empty() => {
            return Err(ApiError::ValidationError("Name cannot be empty".to_string()));
        }
        other => other.map(|n| n.trim().to_string()),
    };
    if let Some(info) = &req.delivery_info {
        info.validate().map_err(ApiError::ValidationError)?;
    }

    let updated = mongodb.update_user_profile(&user.user_id, name, req.delivery_info).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "user": updated.public() })))
}

pub async fn get_cart(
    mongodb: web::Data<MongoDBService>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let profile = load_user(&mongodb, &user).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "cart_data": profile.cart_data })))
}

pub async fn add_to_cart(
    mongodb: web::Data<MongoDBService>,
    user: AuthUser,
    payload: web::Json<CartAddRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    info!("User {} adding {} x {} ({}) to cart", user.user_id, req.quantity, req.product_id, req.size);

    if req.quantity == 0 {
        return Err(ApiError::ValidationError("Quantity must be at least 1".to_string()));
    }
    let product = load_active_product(&mongodb, &req.product_id).await?;
    let (color, entry) = product
        .find_variant(&req.size, req.color_hex.as_deref())
        .ok_or_else(|| ApiError::ValidationError("Please select an available size and color".to_string()))?;

    let key = variant_key(&entry.size, Some(&color.color_hex));
    let mut profile = load_user(&mongodb, &user).await?;
    let wanted = quantity_after_add(&profile.cart_data, &req.product_id, &key, req.quantity, entry.quantity)
        .map_err(ApiError::ValidationError)?;

    set_cart_quantity(&mut profile.cart_data, &req.product_id, &key, wanted);
    mongodb.set_cart(&user.user_id, &profile.cart_data).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Added to cart",
        "cart_data": profile.cart_data,
    })))
}

pub async fn update_cart(
    mongodb: web::Data<MongoDBService>,
    user: AuthUser,
    payload: web::Json<CartUpdateRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    info!("User {} setting {} / {} to {}", user.user_id, req.product_id, req.variant_key, req.quantity);

    let key = if req.quantity > 0 {
        let product = load_active_product(&mongodb, &req.product_id).await?;
        let (key, entry) = product
            .resolve_variant_key(&req.variant_key)
            .ok_or_else(|| ApiError::ValidationError("This variant is no longer available".to_string()))?;
        if req.quantity > entry.quantity {
            return Err(ApiError::ValidationError(format!(
                "Only {} left in stock for this variant", entry.quantity
            )));
        }
        key
    } else {
        // Removal still works for products that were deleted or deactivated
        let id = parse_object_id(&req.product_id, "product")?;
        let stored = mongodb.get_product(&id).await?;
        stored
            .as_ref()
            .and_then(|product| product.resolve_variant_key(&req.variant_key))
            .map(|(key, _)| key)
            .unwrap_or_else(|| req.variant_key.clone())
    };

    let mut profile = load_user(&mongodb, &user).await?;
    set_cart_quantity(&mut profile.cart_data, &req.product_id, &key, req.quantity);
    mongodb.set_cart(&user.user_id, &profile.cart_data).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Cart updated",
        "cart_data": profile.cart_data,
    })))
}

pub async fn clear_cart(
    mongodb: web::Data<MongoDBService>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    info!("Clearing cart for user {}", user.user_id);
    mongodb.clear_cart(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Cart cleared" })))
}

pub async fn get_favorites(
    mongodb: web::Data<MongoDBService>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let profile = load_user(&mongodb, &user).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "favorites": profile.favorites })))
}

pub async fn toggle_favorite(
    mongodb: web::Data<MongoDBService>,
    user: AuthUser,
    payload: web::Json<ToggleFavoriteRequest>,
) -> Result<HttpResponse, ApiError> {
    let product_id = parse_object_id(&payload.product_id, "product")?.to_hex();
    let mut profile = load_user(&mongodb, &user).await?;

    let added = match profile.favorites.iter().position(|id| id == &product_id) {
        Some(index) => {
            profile.favorites.remove(index);
            false
        }
        None => {
            profile.favorites.push(product_id.clone());
            true
        }
    };
    mongodb.set_favorites(&user.user_id, &profile.favorites).await?;
    info!("User {} {} favorite {}", user.user_id, if added { "added" } else { "removed" }, product_id);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "added": added,
        "favorites": profile.favorites,
    })))
}

pub async fn list_users(
    mongodb: web::Data<MongoDBService>,
    admin: AuthAdmin,
) -> Result<HttpResponse, ApiError> {
    admin.require(Permission::ManageUsers)?;
    info!("Admin {} listing users", admin.admin.username);
    let users: Vec<User> = mongodb.list_users().await?.iter().map(User::public).collect();
    Ok(HttpResponse::Ok().json(json!({ "success": true, "users": users })))
}
