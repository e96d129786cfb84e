use std::collections::HashMap;
use crate::models::order::OrderLineRequest;
use crate::models::{OrderItem, Product, ShippingInfo};
use crate::utils::shipping;
use crate::utils::variant::variant_key;

#[derive(Debug, Clone, PartialEq)]
pub struct PricedOrder {
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    pub shipping: ShippingInfo,
    pub amount: f64,
}

/// Prices checkout lines against current product data, keyed by product id.
pub fn price_order(
    products: &HashMap<String, Product>,
    lines: &[OrderLineRequest],
    country: &str,
    method: &str,
) -> Result<PricedOrder, String> {
    if lines.is_empty() {
        return Err("Order has no items".to_string());
    }

    let mut requested: HashMap<(String, String), u32> = HashMap::new();
    let mut items = Vec::with_capacity(lines.len());
    let mut weight_kg = 0.0;

    for line in lines {
        if line.quantity == 0 {
            return Err("Quantity must be at least 1".to_string());
        }
        let product = products
            .get(&line.product_id)
            .ok_or_else(|| format!("Product {} not found", line.product_id))?;
        if !product.is_active {
            return Err(format!("{} is no longer available", product.name));
        }
        if !ships_on_route(product, country) {
            return Err(format!(
                "{} ships from {}, it cannot be sent on the {} route",
                product.name, product.origin_country, country.trim().to_lowercase()
            ));
        }

        let (color, entry) = product
            .find_variant(&line.size, line.color_hex.as_deref())
            .ok_or_else(|| format!("{} is not available in the selected size/color", product.name))?;

        let key = (line.product_id.clone(), variant_key(&entry.size, Some(&color.color_hex)));
        let total_requested = requested.entry(key).or_insert(0);
        *total_requested = total_requested
            .checked_add(line.quantity)
            .ok_or_else(|| format!("Quantity requested for {} is too large", product.name))?;
        if *total_requested > entry.quantity {
            return Err(format!(
                "Only {} left of {} (size {}{})",
                entry.quantity,
                product.name,
                entry.size,
                if color.color_name.is_empty() { String::new() } else { format!(", {}", color.color_name) }
            ));
        }

        let image = color.images.first().or_else(|| product.images.first()).cloned();
        weight_kg += product.weight_kg * line.quantity as f64;
        items.push(OrderItem {
            product_id: line.product_id.clone(),
            name: product.name.clone(),
            price: entry.price.unwrap_or(product.price),
            image,
            size: entry.size.clone(),
            color_name: color.color_name.clone(),
            color_hex: color.color_hex.clone(),
            quantity: line.quantity,
        });
    }

    let subtotal: f64 = items.iter().map(OrderItem::line_total).sum();
    let cost = shipping::shipping_cost(country, method, weight_kg)?;

    Ok(PricedOrder {
        items,
        subtotal,
        shipping: ShippingInfo {
            method: method.trim().to_lowercase(),
            cost,
            weight_kg,
            country: country.trim().to_lowercase(),
        },
        amount: subtotal + cost,
    })
}

/// An empty origin means the product can ship on any route.
fn ships_on_route(product: &Product, country: &str) -> bool {
    let origin = product.origin_country.trim();
    origin.is_empty() || origin.eq_ignore_ascii_case(country.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::product::tests::sample_product;

    fn catalog() -> (String, HashMap<String, Product>) {
        let product = sample_product();
        let id = product.id.unwrap().to_hex();
        let mut products = HashMap::new();
        products.insert(id.clone(), product);
        (id, products)
    }

    fn line(product_id: &str, size: &str, hex: &str, quantity: u32) -> OrderLineRequest {
        OrderLineRequest {
            product_id: product_id.to_string(),
            size: size.to_string(),
            color_hex: Some(hex.to_string()),
            quantity,
        }
    }

    #[test]
    fn test_prices_with_size_override_and_shipping() {
        let (id, products) = catalog();
        let priced = price_order(
            &products,
            &[line(&id, "M", "#FF0000", 2), line(&id, "XL", "#FF0000", 1)],
            "nigeria",
            "road",
        )
        .unwrap();

        assert_eq!(priced.items.len(), 2);
        assert_eq!(priced.items[0].price, 15000.0);
        assert_eq!(priced.items[1].price, 17000.0);
        assert_eq!(priced.subtotal, 47000.0);
        // 3 x 0.4 kg = 1.2 kg, billed as 1.5 kg
        assert_eq!(priced.shipping.cost, 3750.0);
        assert_eq!(priced.amount, 50750.0);
        assert_eq!(priced.items[0].image.as_deref(), Some("https://img.example/dress.jpg"));
    }

    #[test]
    fn test_rejects_quantity_above_stock_across_lines() {
        let (id, products) = catalog();
        let err = price_order(
            &products,
            &[line(&id, "M", "#FF0000", 2), line(&id, "M", "#ff0000", 2)],
            "nigeria",
            "air",
        )
        .unwrap_err();
        assert!(err.contains("Only 3 left"));

        let err = price_order(&products, &[line(&id, "M", "#0000FF", 1)], "nigeria", "air").unwrap_err();
        assert!(err.contains("Only 0 left"));
    }

    #[test]
    fn test_rejects_unknown_variant_inactive_and_empty() {
        let (id, mut products) = catalog();
        assert!(price_order(&products, &[line(&id, "S", "#FF0000", 1)], "nigeria", "air").is_err());
        assert!(price_order(&products, &[], "nigeria", "air").is_err());
        assert!(price_order(&products, &[line("missing", "M", "#FF0000", 1)], "nigeria", "air").is_err());

        products.get_mut(&id).unwrap().is_active = false;
        let err = price_order(&products, &[line(&id, "M", "#FF0000", 1)], "nigeria", "air").unwrap_err();
        assert!(err.contains("no longer available"));
    }

    #[test]
    fn test_rejects_unknown_shipping_route() {
        let (id, products) = catalog();
        assert!(price_order(&products, &[line(&id, "M", "#FF0000", 1)], "nigeria", "sea").is_err());
    }

    #[test]
    fn test_huge_second_line_is_rejected() {
        let (id, products) = catalog();
        let err = price_order(
            &products,
            &[line(&id, "M", "#FF0000", 2), line(&id, "M", "#FF0000", u32::MAX)],
            "nigeria",
            "air",
        )
        .unwrap_err();
        assert!(err.contains("too large"));
    }

    #[test]
    fn test_rejects_route_from_other_origin() {
        let (id, mut products) = catalog();
        let err = price_order(&products, &[line(&id, "M", "#FF0000", 1)], "china", "sea").unwrap_err();
        assert!(err.contains("ships from nigeria"));

        products.get_mut(&id).unwrap().origin_country = String::new();
        assert_eq!(
            price_order(&products, &[line(&id, "M", "#FF0000", 1)], "china", "sea").unwrap().shipping.cost,
            1500.0
        );
    }
}
