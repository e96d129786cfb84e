use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;

/// productId -> variant key -> quantity
pub type CartData = HashMap<String, HashMap<String, u32>>;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct DeliveryInfo {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub region: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "Cameroon".to_string()
}

impl DeliveryInfo {
    pub fn validate(&self) -> Result<(), String> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err("Recipient name is required".to_string());
        }
        if self.phone.trim().is_empty() {
            return Err("Phone number is required".to_string());
        }
        if self.street.trim().is_empty() || self.city.trim().is_empty() {
            return Err("Street and city are required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub password: String,
    #[serde(default)]
    pub cart_data: CartData,
    #[serde(default)]
    pub delivery_info: Option<DeliveryInfo>,
    #[serde(default)]
    pub favorites: Vec<String>,
    #[serde(default)]
    pub referred_by: Option<String>,
    pub created_at: i64,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String, referred_by: Option<String>) -> Self {
        Self {
            id: None,
            name,
            email,
            password: password_hash,
            cart_data: HashMap::new(),
            delivery_info: None,
            favorites: Vec::new(),
            referred_by,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Copy safe to return to clients.
    pub fn public(&self) -> User {
        User {
            password: String::new(),
            ..self.clone()
        }
    }
}

/// Sets `quantity` for one variant; zero removes it and prunes empty products.
pub fn set_cart_quantity(cart: &mut CartData, product_id: &str, variant_key: &str, quantity: u32) {
    if quantity == 0 {
        if let Some(variants) = cart.get_mut(product_id) {
            variants.remove(variant_key);
            if variants.is_empty() {
                cart.remove(product_id);
            }
        }
        return;
    }
    cart.entry(product_id.to_string())
        .or_default()
        .insert(variant_key.to_string(), quantity);
}

pub fn cart_quantity(cart: &CartData, product_id: &str, variant_key: &str) -> u32 {
    cart.get(product_id)
        .and_then(|variants| variants.get(variant_key))
        .copied()
        .unwrap_or(0)
}

/// Cart quantity of one variant after adding `added`, capped at `stock`.
pub fn quantity_after_add(cart: &CartData, product_id: &str, variant_key: &str, added: u32, stock: u32) -> Result<u32, String> {
    cart_quantity(cart, product_id, variant_key)
        .checked_add(added)
        .filter(|wanted| *wanted <= stock)
        .ok_or_else(|| format!("Only {} left in stock for this variant", stock))
}

pub fn validate_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Affiliate code carried from the referral link.
    #[serde(rename = "ref", default)]
    pub referral_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub delivery_info: Option<DeliveryInfo>,
}

#[derive(Debug, Deserialize)]
pub struct CartAddRequest {
    pub product_id: String,
    pub size: String,
    pub color_hex: Option<String>,
    #[serde(default = "default_add_quantity")]
    pub quantity: u32,
}

fn default_add_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct CartUpdateRequest {
    pub product_id: String,
    pub variant_key: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct ToggleFavoriteRequest {
    pub product_id: String,
}
