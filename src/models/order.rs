use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;
use crate::models::user::DeliveryInfo;

pub const DEFAULT_ORDER_STATUS: &str = "Order Placed";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub image: Option<String>,
    pub size: String,
    #[serde(default)]
    pub color_name: String,
    #[serde(default)]
    pub color_hex: String,
    pub quantity: u32,
}

impl OrderItem {
    pub fn line_total(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ShippingInfo {
    pub method: String,
    pub cost: f64,
    pub weight_kg: f64,
    /// Origin country the parcel ships from.
    pub country: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum PaymentMethod {
    #[serde(rename = "COD")]
    CashOnDelivery,
    #[serde(rename = "MeSomb")]
    MeSomb,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PaymentMethod::CashOnDelivery => write!(f, "COD"),
            PaymentMethod::MeSomb => write!(f, "MeSomb"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Order {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    pub amount: f64,
    pub shipping: ShippingInfo,
    pub address: DeliveryInfo,
    pub status: String,
    pub payment_method: PaymentMethod,
    pub payment: bool,
    #[serde(default)]
    pub payment_reference: Option<String>,
    pub created_at: i64,
}

impl Order {
    pub fn new(
        user_id: ObjectId,
        priced: crate::utils::pricing::PricedOrder,
        address: DeliveryInfo,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            id: None,
            user_id,
            items: priced.items,
            subtotal: priced.subtotal,
            amount: priced.amount,
            shipping: priced.shipping,
            address,
            status: DEFAULT_ORDER_STATUS.to_string(),
            payment_method,
            payment: false,
            payment_reference: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Whether an admin setting `payment` to `paid` on this stored order is a
    /// new sale for the referring affiliate. MeSomb orders are credited at checkout.
    pub fn payment_credits_affiliate(&self, paid: bool) -> bool {
        credits_affiliate_on_payment(&self.payment_method, self.payment, paid)
    }
}

fn credits_affiliate_on_payment(method: &PaymentMethod, was_paid: bool, paid: bool) -> bool {
    *method == PaymentMethod::CashOnDelivery && !was_paid && paid
}

/// One line as sent by the storefront checkout.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OrderLineRequest {
    pub product_id: String,
    pub size: String,
    #[serde(default)]
    pub color_hex: Option<String>,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct ShippingQuoteRequest {
    pub items: Vec<OrderLineRequest>,
    pub shipping_country: String,
    pub shipping_method: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderLineRequest>,
    pub address: DeliveryInfo,
    pub shipping_country: String,
    pub shipping_method: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentRequest {
    pub payment: bool,
}
