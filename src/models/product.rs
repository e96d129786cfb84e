use std::collections::HashSet;
use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;

use crate::utils::variant::{parse_variant_key, variant_key};

/// Size used for products sold without sizes.
pub const NO_SIZE: &str = "N/A";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SizeEntry {
    pub size: String,
    pub quantity: u32,
    /// Overrides the product price for this size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ColorVariant {
    pub color_name: String,
    #[serde(default)]
    pub color_hex: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub sizes: Vec<SizeEntry>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub user_name: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    pub created_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserPhoto {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub user_name: String,
    pub image_url: String,
    #[serde(default)]
    pub caption: String,
    pub created_at: i64,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Product {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub category: String,
    #[serde(default)]
    pub sub_category: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub colors: Vec<ColorVariant>,
    #[serde(default)]
    pub bestseller: bool,
    #[serde(default)]
    pub weight_kg: f64,
    /// Shipping origin, e.g. "china" or "nigeria".
    #[serde(default)]
    pub origin_country: String,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub user_photos: Vec<UserPhoto>,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    pub fn from_request(req: ProductRequest) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: None,
            name: req.name.trim().to_string(),
            description: req.description,
            price: req.price,
            category: req.category,
            sub_category: req.sub_category,
            images: req.images,
            colors: req.colors,
            bestseller: req.bestseller,
            weight_kg: req.weight_kg,
            origin_country: req.origin_country.to_lowercase(),
            reviews: Vec::new(),
            user_photos: Vec::new(),
            average_rating: 0.0,
            review_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the editable fields, keeping reviews and photos.
    pub fn apply_update(&mut self, req: ProductRequest) {
        self.name = req.name.trim().to_string();
        self.description = req.description;
        self.price = req.price;
        self.category = req.category;
        self.sub_category = req.sub_category;
        self.images = req.images;
        self.colors = req.colors;
        self.bestseller = req.bestseller;
        self.weight_kg = req.weight_kg;
        self.origin_country = req.origin_country.to_lowercase();
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Product name is required".to_string());
        }
        if !(self.price > 0.0) {
            return Err("Price must be greater than zero".to_string());
        }
        if self.category.trim().is_empty() {
            return Err("Category is required".to_string());
        }
        if self.weight_kg < 0.0 {
            return Err("Weight cannot be negative".to_string());
        }

        if self.colors.is_empty() {
            return Err("At least one color variant is required (leave the hex empty for a single default color)".to_string());
        }

        let mut seen_colors = HashSet::new();
        for color in &self.colors {
            if !seen_colors.insert(color.color_hex.to_lowercase()) {
                return Err(format!("Duplicate color {}", color.color_name));
            }
            if color.sizes.is_empty() {
                return Err(format!(
                    "Color {} must have at least one size (use \"{}\" for sizeless products)",
                    color.color_name, NO_SIZE
                ));
            }
            let mut seen_sizes = HashSet::new();
            for entry in &color.sizes {
                if entry.size.trim().is_empty() {
                    return Err(format!("Color {} has an empty size name", color.color_name));
                }
                if !seen_sizes.insert(entry.size.as_str()) {
                    return Err(format!("Size {} is listed twice for color {}", entry.size, color.color_name));
                }
                if let Some(price) = entry.price {
                    if !(price > 0.0) {
                        return Err(format!("Price for size {} must be greater than zero", entry.size));
                    }
                }
            }
        }
        Ok(())
    }

    /// Looks up a variant; an empty hex matches a product without colors.
    pub fn find_variant(&self, size: &str, color_hex: Option<&str>) -> Option<(&ColorVariant, &SizeEntry)> {
        let hex = color_hex.unwrap_or("");
        let color = self.colors.iter().find(|c| c.color_hex.eq_ignore_ascii_case(hex))?;
        let entry = color.sizes.iter().find(|s| s.size == size)?;
        Some((color, entry))
    }

    /// Resolves a cart key to the variant it names, written with the stored color hex.
    pub fn resolve_variant_key(&self, key: &str) -> Option<(String, &SizeEntry)> {
        let (size, color_hex) = parse_variant_key(key);
        let (color, entry) = self.find_variant(&size, color_hex.as_deref())?;
        Some((variant_key(&entry.size, Some(&color.color_hex)), entry))
    }

    pub fn total_stock(&self) -> u32 {
        self.colors
            .iter()
            .flat_map(|c| c.sizes.iter())
            .map(|s| s.quantity)
            .sum()
    }

    pub fn recompute_rating(&mut self) {
        self.review_count = self.reviews.len() as u32;
        self.average_rating = if self.reviews.is_empty() {
            0.0
        } else {
            let total: u32 = self.reviews.iter().map(|r| r.rating as u32).sum();
            let avg = total as f64 / self.reviews.len() as f64;
            (avg * 10.0).round() / 10.0
        };
    }

    /// Adds the user's review, replacing any earlier one from the same user.
    pub fn upsert_review(&mut self, user_id: ObjectId, user_name: String, rating: u8, comment: String) -> Result<(), String> {
        if !(1..=5).contains(&rating) {
            return Err("Rating must be between 1 and 5".to_string());
        }
        self.reviews.retain(|r| r.user_id != user_id);
        self.reviews.push(Review {
            id: ObjectId::new(),
            user_id,
            user_name,
            rating,
            comment,
            created_at: chrono::Utc::now().timestamp_millis(),
        });
        self.recompute_rating();
        Ok(())
    }

    pub fn remove_review(&mut self, user_id: &ObjectId) -> bool {
        let before = self.reviews.len();
        self.reviews.retain(|r| &r.user_id != user_id);
        let removed = self.reviews.len() != before;
        if removed {
            self.recompute_rating();
        }
        removed
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub category: String,
    #[serde(default)]
    pub sub_category: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub colors: Vec<ColorVariant>,
    #[serde(default)]
    pub bestseller: bool,
    #[serde(default)]
    pub weight_kg: f64,
    #[serde(default)]
    pub origin_country: String,
}

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
    pub bestseller: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct UserPhotoRequest {
    pub image_url: String,
    #[serde(default)]
    pub caption: String,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_product() -> Product {
        let mut product = Product::from_request(ProductRequest {
            name: "Ankara Dress".to_string(),
            description: "Wax print".to_string(),
            price: 15000.0,
            category: "Women".to_string(),
            sub_category: "Dresses".to_string(),
            images: vec!["https://img.example/dress.jpg".to_string()],
            colors: vec![
                ColorVariant {
                    color_name: "Red".to_string(),
                    color_hex: "#FF0000".to_string(),
                    images: vec![],
                    sizes: vec![
                        SizeEntry { size: "M".to_string(), quantity: 3, price: None },
                        SizeEntry { size: "XL".to_string(), quantity: 1, price: Some(17000.0) },
                    ],
                },
                ColorVariant {
                    color_name: "Blue".to_string(),
                    color_hex: "#0000FF".to_string(),
                    images: vec![],
                    sizes: vec![SizeEntry { size: "M".to_string(), quantity: 0, price: None }],
                },
            ],
            bestseller: false,
            weight_kg: 0.4,
            origin_country: "Nigeria".to_string(),
        });
        product.id = Some(ObjectId::new());
        product
    }

    #[test]
    fn test_variant_key_resolves_to_stored_hex() {
        let product = sample_product();
        let (key, entry) = product.resolve_variant_key("M-#ff0000").unwrap();
        assert_eq!(key, "M-#FF0000");
        assert_eq!(entry.quantity, 3);
        assert_eq!(product.resolve_variant_key("M-#FF0000").unwrap().0, "M-#FF0000");
        assert!(product.resolve_variant_key("S-#FF0000").is_none());
    }

    #[test]
    fn test_color_without_sizes_is_rejected() {
        let mut product = sample_product();
        assert!(product.validate().is_ok());

        product.colors[1].sizes.clear();
        let err = product.validate().unwrap_err();
        assert!(err.contains("at least one size"));

        product.colors.clear();
        assert!(product.validate().is_err());
    }

    #[test]
    fn test_sizeless_product_uses_sentinel() {
        let mut product = sample_product();
        product.colors = vec![ColorVariant {
            color_name: "Default".to_string(),
            color_hex: String::new(),
            images: vec![],
            sizes: vec![SizeEntry { size: NO_SIZE.to_string(), quantity: 5, price: None }],
        }];
        assert!(product.validate().is_ok());
        let (_, entry) = product.find_variant(NO_SIZE, None).unwrap();
        assert_eq!(entry.quantity, 5);
    }

    #[test]
    fn test_duplicate_size_rejected() {
        let mut product = sample_product();
        product.colors[0].sizes.push(SizeEntry { size: "M".to_string(), quantity: 1, price: None });
        assert!(product.validate().is_err());
    }

    #[test]
    fn test_find_variant_matches_hex_case_insensitively() {
        let product = sample_product();
        let (color, entry) = product.find_variant("XL", Some("#ff0000")).unwrap();
        assert_eq!(color.color_name, "Red");
        assert_eq!(entry.price, Some(17000.0));
        assert!(product.find_variant("S", Some("#FF0000")).is_none());
        assert_eq!(product.total_stock(), 4);
    }

    #[test]
    fn test_review_upsert_recomputes_average() {
        let mut product = sample_product();
        let alice = ObjectId::new();
        let bob = ObjectId::new();

        product.upsert_review(alice, "Alice".into(), 5, "Great".into()).unwrap();
        product.upsert_review(bob, "Bob".into(), 4, String::new()).unwrap();
        assert_eq!(product.review_count, 2);
        assert_eq!(product.average_rating, 4.5);

        // Same user replaces their review
        product.upsert_review(alice, "Alice".into(), 2, "Faded".into()).unwrap();
        assert_eq!(product.review_count, 2);
        assert_eq!(product.average_rating, 3.0);

        assert!(product.remove_review(&bob));
        assert_eq!(product.average_rating, 2.0);
        assert!(!product.remove_review(&bob));

        assert!(product.upsert_review(bob, "Bob".into(), 6, String::new()).is_err());
    }
}
