use actix_web::{web, HttpResponse};
use log::{info, warn};
use mongodb::bson::oid::ObjectId;
use serde_json::json;

use crate::handlers::{parse_object_id, AuthAdmin, AuthUser};
use crate::models::product::{ProductListQuery, ProductRequest, ReviewRequest, UserPhoto, UserPhotoRequest};
use crate::models::{ApiError, Permission, Product};
use crate::services::MongoDBService;

async fn find_product(mongodb: &MongoDBService, id: &ObjectId) -> Result<Product, ApiError> {
    mongodb
        .get_product(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product {} not found", id)))
}

async fn user_name(mongodb: &MongoDBService, user: &AuthUser) -> Result<String, ApiError> {
    mongodb
        .get_user(&user.user_id)
        .await?
        .map(|u| u.name)
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

pub async fn list_products(
    mongodb: web::Data<MongoDBService>,
    query: web::Query<ProductListQuery>,
) -> Result<HttpResponse, ApiError> {
    info!("Listing products (category: {:?}, bestseller: {:?})", query.category, query.bestseller);
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    let products = mongodb.list_products(true, category, query.bestseller).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "products": products })))
}

pub async fn list_all_products(
    mongodb: web::Data<MongoDBService>,
    admin: AuthAdmin,
) -> Result<HttpResponse, ApiError> {
    admin.require(Permission::ManageProducts)?;
    let products = mongodb.list_products(false, None, None).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "products": products })))
}

pub async fn get_product(
    mongodb: web::Data<MongoDBService>,
    product_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    info!("Getting product {}", product_id);
    let id = parse_object_id(&product_id, "product")?;
    let product = find_product(&mongodb, &id).await?;
    if !product.is_active {
        return Err(ApiError::NotFound(format!("Product {} not found", id)));
    }
    let in_stock = product.total_stock() > 0;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "in_stock": in_stock, "product": product })))
}

pub async fn add_product(
    mongodb: web::Data<MongoDBService>,
    admin: AuthAdmin,
    payload: web::Json<ProductRequest>,
) -> Result<HttpResponse, ApiError> {
    admin.require(Permission::ManageProducts)?;
    info!("Admin {} adding product {}", admin.admin.username, payload.name);

    let product = Product::from_request(payload.into_inner());
    product.validate().map_err(ApiError::ValidationError)?;
    let product = mongodb.create_product(product).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Product added",
        "product": product,
    })))
}

pub async fn update_product(
    mongodb: web::Data<MongoDBService>,
    admin: AuthAdmin,
    product_id: web::Path<String>,
    payload: web::Json<ProductRequest>,
) -> Result<HttpResponse, ApiError> {
    admin.require(Permission::ManageProducts)?;
    let id = parse_object_id(&product_id, "product")?;
    info!("Admin {} updating product {}", admin.admin.username, id);

    let mut product = find_product(&mongodb, &id).await?;
    product.apply_update(payload.into_inner());
    product.validate().map_err(ApiError::ValidationError)?;
    mongodb.replace_product(&product).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Product updated",
        "product": product,
    })))
}

pub async fn delete_product(
    mongodb: web::Data<MongoDBService>,
    admin: AuthAdmin,
    product_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    admin.require(Permission::ManageProducts)?;
    let id = parse_object_id(&product_id, "product")?;
    info!("Admin {} deleting product {}", admin.admin.username, id);

    if !mongodb.delete_product(&id).await? {
        return Err(ApiError::NotFound(format!("Product {} not found", id)));
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Product removed" })))
}

pub async fn toggle_product_active(
    mongodb: web::Data<MongoDBService>,
    admin: AuthAdmin,
    product_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    admin.require(Permission::ManageProducts)?;
    let id = parse_object_id(&product_id, "product")?;
    let current = find_product(&mongodb, &id).await?;

    let product = mongodb
        .set_product_active(&id, !current.is_active)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product {} not found", id)))?;
    info!("Admin {} set product {} active={}", admin.admin.username, id, product.is_active);

    Ok(HttpResponse::Ok().json(json!({ "success": true, "product": product })))
}

pub async fn add_review(
    mongodb: web::Data<MongoDBService>,
    user: AuthUser,
    product_id: web::Path<String>,
    payload: web::Json<ReviewRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_object_id(&product_id, "product")?;
    info!("User {} reviewing product {}", user.user_id, id);

    let req = payload.into_inner();
    let name = user_name(&mongodb, &user).await?;
    let mut product = find_product(&mongodb, &id).await?;
    product
        .upsert_review(user.user_id, name, req.rating, req.comment.trim().to_string())
        .map_err(ApiError::ValidationError)?;
    mongodb.save_reviews(&product).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "average_rating": product.average_rating,
        "review_count": product.review_count,
        "reviews": product.reviews,
    })))
}

pub async fn delete_review(
    mongodb: web::Data<MongoDBService>,
    user: AuthUser,
    product_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_object_id(&product_id, "product")?;
    let mut product = find_product(&mongodb, &id).await?;
    if !product.remove_review(&user.user_id) {
        return Err(ApiError::NotFound("You have not reviewed this product".to_string()));
    }
    mongodb.save_reviews(&product).await?;
    info!("User {} removed their review of product {}", user.user_id, id);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "average_rating": product.average_rating,
        "review_count": product.review_count,
    })))
}

pub async fn add_user_photo(
    mongodb: web::Data<MongoDBService>,
    user: AuthUser,
    product_id: web::Path<String>,
    payload: web::Json<UserPhotoRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_object_id(&product_id, "product")?;
    let req = payload.into_inner();
    let image_url = req.image_url.trim().to_string();
    if !(image_url.starts_with("https://") || image_url.starts_with("http://")) {
        return Err(ApiError::ValidationError("Photo must be an http(s) image URL".to_string()));
    }

    let photo = UserPhoto {
        id: ObjectId::new(),
        user_id: user.user_id,
        user_name: user_name(&mongodb, &user).await?,
        image_url,
        caption: req.caption.trim().to_string(),
        created_at: chrono::Utc::now().timestamp_millis(),
    };
    if !mongodb.add_user_photo(&id, &photo).await? {
        return Err(ApiError::NotFound(format!("Product {} not found", id)));
    }
    info!("User {} shared a photo of product {}", user.user_id, id);

    Ok(HttpResponse::Created().json(json!({ "success": true, "photo": photo })))
}

pub async fn delete_user_photo(
    mongodb: web::Data<MongoDBService>,
    admin: AuthAdmin,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    admin.require(Permission::ManageProducts)?;
    let (product_id, photo_id) = path.into_inner();
    let product_id = parse_object_id(&product_id, "product")?;
    let photo_id = parse_object_id(&photo_id, "photo")?;

    if !mongodb.remove_user_photo(&product_id, &photo_id).await? {
        warn!("Photo {} not found on product {}", photo_id, product_id);
        return Err(ApiError::NotFound("Photo not found".to_string()));
    }
    info!("Admin {} removed photo {} from product {}", admin.admin.username, photo_id, product_id);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Photo removed" })))
}
