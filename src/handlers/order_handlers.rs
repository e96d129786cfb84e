use std::collections::{BTreeMap, HashMap};

use actix_web::{web, HttpResponse};
use log::{info, error};
use serde_json::json;

use crate::handlers::{parse_object_id, AuthAdmin, AuthUser};
use crate::models::order::{
    OrderLineRequest, PlaceOrderRequest, ShippingQuoteRequest, UpdatePaymentRequest, UpdateStatusRequest,
};
use crate::models::{ApiError, Order, PaymentMethod, Permission, Product};
use crate::services::{AffiliateService, MongoDBService};
use crate::utils::pricing::{price_order, PricedOrder};
use crate::utils::shipping::available_methods;

/// Prices checkout lines against the current catalog.
pub(crate) async fn price_lines(
    mongodb: &MongoDBService,
    lines: &[OrderLineRequest],
    country: &str,
    method: &str,
) -> Result<PricedOrder, ApiError> {
    let mut ids = Vec::with_capacity(lines.len());
    for line in lines {
        ids.push(parse_object_id(&line.product_id, "product")?);
    }
    ids.sort();
    ids.dedup();

    let products: HashMap<String, Product> = mongodb
        .get_products_by_ids(ids)
        .await?
        .into_iter()
        .filter_map(|p| p.id.map(|id| (id.to_hex(), p)))
        .collect();

    price_order(&products, lines, country, method).map_err(ApiError::ValidationError)
}

/// Takes stock for the order, then saves it. Stock is returned if the save fails.
pub(crate) async fn reserve_and_save(mongodb: &MongoDBService, order: Order) -> Result<Order, ApiError> {
    mongodb.reserve_stock(&order.items).await?;
    let items = order.items.clone();
    match mongodb.create_order(order).await {
        Ok(order) => Ok(order),
        Err(e) => {
            error!("Failed to save order, returning stock: {}", e);
            mongodb.release_stock(&items).await;
            Err(e)
        }
    }
}

pub async fn shipping_quote(
    mongodb: web::Data<MongoDBService>,
    payload: web::Json<ShippingQuoteRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Quoting {} lines shipped from {} by {}", payload.items.len(), payload.shipping_country, payload.shipping_method);
    let priced = price_lines(&mongodb, &payload.items, &payload.shipping_country, &payload.shipping_method).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "subtotal": priced.subtotal,
        "shipping": priced.shipping,
        "amount": priced.amount,
        "available_methods": available_methods(&payload.shipping_country),
    })))
}

pub async fn place_order(
    mongodb: web::Data<MongoDBService>,
    user: AuthUser,
    payload: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    info!("User {} placing a cash on delivery order", user.user_id);

    req.address.validate().map_err(ApiError::ValidationError)?;
    let priced = price_lines(&mongodb, &req.items, &req.shipping_country, &req.shipping_method).await?;
    let order = Order::new(user.user_id, priced, req.address, PaymentMethod::CashOnDelivery);
    let order = reserve_and_save(&mongodb, order).await?;

    if let Err(e) = mongodb.clear_cart(&user.user_id).await {
        error!("Order placed but failed to clear cart for user {}: {}", user.user_id, e);
    }
    info!("Order {:?} placed for {} XAF", order.id, order.amount);

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Order placed",
        "order": order,
    })))
}

pub async fn user_orders(
    mongodb: web::Data<MongoDBService>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    info!("Fetching orders for user {}", user.user_id);
    let orders = mongodb.get_orders_for_user(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "orders": orders })))
}

pub async fn all_orders(
    mongodb: web::Data<MongoDBService>,
    admin: AuthAdmin,
) -> Result<HttpResponse, ApiError> {
    admin.require(Permission::ManageOrders)?;
    info!("Admin {} listing all orders", admin.admin.username);
    let orders = mongodb.list_orders().await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "orders": orders })))
}

/// Totals for the admin dashboard.
pub async fn order_stats(
    mongodb: web::Data<MongoDBService>,
    admin: AuthAdmin,
) -> Result<HttpResponse, ApiError> {
    admin.require(Permission::ViewAnalytics)?;
    let orders = mongodb.list_orders().await?;

    let mut by_status: BTreeMap<String, u64> = BTreeMap::new();
    let mut paid_revenue = 0.0;
    let mut outstanding = 0.0;
    for order in &orders {
        *by_status.entry(order.status.clone()).or_insert(0) += 1;
        if order.payment {
            paid_revenue += order.amount;
        } else {
            outstanding += order.amount;
        }
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "total_orders": orders.len(),
        "paid_revenue": paid_revenue,
        "outstanding": outstanding,
        "by_status": by_status,
    })))
}

pub async fn update_status(
    mongodb: web::Data<MongoDBService>,
    admin: AuthAdmin,
    order_id: web::Path<String>,
    payload: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    admin.require(Permission::ManageOrders)?;
    let id = parse_object_id(&order_id, "order")?;
    let status = payload.status.trim();
    if status.is_empty() {
        return Err(ApiError::ValidationError("Status cannot be empty".to_string()));
    }

    let order = mongodb
        .update_order_status(&id, status)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {} not found", id)))?;
    info!("Admin {} set order {} status to {}", admin.admin.username, id, status);

    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Status updated", "order": order })))
}

/// Marking an unpaid order as paid counts as a completed purchase for
/// affiliate attribution.
pub async fn update_payment(
    mongodb: web::Data<MongoDBService>,
    affiliates: web::Data<AffiliateService>,
    admin: AuthAdmin,
    order_id: web::Path<String>,
    payload: web::Json<UpdatePaymentRequest>,
) -> Result<HttpResponse, ApiError> {
    admin.require(Permission::ManageOrders)?;
    let id = parse_object_id(&order_id, "order")?;

    let mut order = mongodb
        .update_order_payment(&id, payload.payment)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {} not found", id)))?;
    let credits_affiliate = order.payment_credits_affiliate(payload.payment);
    order.payment = payload.payment;
    info!("Admin {} set order {} payment={}", admin.admin.username, id, order.payment);

    // Re-marking an order paid is deduplicated per order by the affiliate service
    if credits_affiliate {
        affiliates.track_purchase_best_effort(order.user_id, id, order.amount).await;
    }

    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Payment updated", "order": order })))
}
