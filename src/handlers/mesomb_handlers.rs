use actix_web::{web, HttpResponse};
use log::{info, warn, error};
use serde_json::json;

use crate::handlers::order_handlers::price_lines;
use crate::handlers::AuthUser;
use crate::models::payment::{CollectRequest, CollectResponse, MesombPayRequest};
use crate::models::{ApiError, Order, PaymentMethod};
use crate::services::mesomb_client::normalize_phone;
use crate::services::{AffiliateService, MesombClient, MongoDBService};

/// Reference recorded on the order: MeSomb's own, else its transaction pk, else our trxID.
fn payment_reference(response: &CollectResponse, trx_id: &str) -> String {
    response.reference.clone()
        .or_else(|| response.transaction.as_ref().and_then(|t| t.reference.clone()))
        .or_else(|| response.transaction.as_ref().map(|t| t.pk.clone()))
        .unwrap_or_else(|| trx_id.to_string())
}

/// Collects payment first; the order only exists once the money has moved.
pub async fn pay(
    mongodb: web::Data<MongoDBService>,
    mesomb: web::Data<MesombClient>,
    affiliates: web::Data<AffiliateService>,
    user: AuthUser,
    payload: web::Json<MesombPayRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    info!("User {} paying with {} mobile money", user.user_id, req.service);

    req.address.validate().map_err(ApiError::ValidationError)?;
    let payer = normalize_phone(&req.phone)?;
    let priced = price_lines(&mongodb, &req.items, &req.shipping_country, &req.shipping_method).await?;

    let trx_id = uuid::Uuid::new_v4().to_string();
    let response = match mesomb.collect(CollectRequest::new(priced.amount, req.service, payer), &trx_id).await {
        Ok(response) => response,
        Err(e) => {
            warn!("MeSomb payment failed for user {} (trx {}): {}", user.user_id, trx_id, e);
            return Err(e.into());
        }
    };

    let mut order = Order::new(user.user_id, priced, req.address, PaymentMethod::MeSomb);
    order.payment = true;
    order.payment_reference = Some(payment_reference(&response, &trx_id));

    // The customer has paid, so a stock race is logged for follow-up rather than refused
    if let Err(e) = mongodb.reserve_stock(&order.items).await {
        error!("Paid order for user {} (trx {}) could not reserve stock: {}", user.user_id, trx_id, e);
    }
    let order = match mongodb.create_order(order).await {
        Ok(order) => order,
        Err(e) => {
            error!("Payment {} succeeded but saving the order failed: {}", trx_id, e);
            return Err(e);
        }
    };
    let order_id = order.id
        .ok_or_else(|| ApiError::InternalError("Saved order has no id".to_string()))?;

    if let Err(e) = mongodb.clear_cart(&user.user_id).await {
        error!("Order {} paid but failed to clear cart for user {}: {}", order_id, user.user_id, e);
    }
    affiliates.track_purchase_best_effort(user.user_id, order_id, order.amount).await;

    info!("Order {} paid via MeSomb, reference {:?}", order_id, order.payment_reference);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Payment successful",
        "order": order,
        "transaction": response.transaction,
    })))
}

pub async fn payment_status(
    mesomb: web::Data<MesombClient>,
    _user: AuthUser,
    reference: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    info!("Checking MeSomb transaction {}", reference);
    let reference = reference.into_inner();
    if reference.trim().is_empty() {
        return Err(ApiError::ValidationError("Transaction reference is required".to_string()));
    }

    let transactions = mesomb.transaction_status(&[reference.clone()]).await?;
    let transaction = transactions
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound(format!("Transaction {} not found", reference)))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "status": transaction.status,
        "transaction": transaction,
    })))
}
