use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::item::BodegaItem;

/// Upper bound on the quantity of a single item per checkout
pub const MAX_LINE_QUANTITY: u32 = 10;

/// One line of a checkout request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    pub item_id: Uuid,
    pub quantity: u32,
}

/// A cart line priced against the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PricedLine {
    pub item_id: Uuid,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
    pub line_total_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub total_cents: i64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Cart is empty")]
    Empty,

    #[error("Invalid quantity {quantity} for item {item_id}")]
    InvalidQuantity { item_id: Uuid, quantity: u32 },

    #[error("Item not available: {0}")]
    UnknownItem(Uuid),
}

/// Price `lines` against `catalog`.
///
/// Duplicate lines for the same item are merged before the quantity limit is
/// checked. Prices always come from the catalog, never from the client.
pub fn price_cart(catalog: &[BodegaItem], lines: &[CartLine]) -> Result<PricedCart, CartError> {
    if lines.is_empty() {
        return Err(CartError::Empty);
    }

    let mut quantities: BTreeMap<Uuid, u32> = BTreeMap::new();
    for line in lines {
        if line.quantity == 0 {
            return Err(CartError::InvalidQuantity {
                item_id: line.item_id,
                quantity: line.quantity,
            });
        }
        let entry = quantities.entry(line.item_id).or_insert(0);
        *entry = entry.saturating_add(line.quantity);
    }

    let mut priced = Vec::with_capacity(quantities.len());
    for (item_id, quantity) in quantities {
        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::InvalidQuantity { item_id, quantity });
        }
        let item = catalog
            .iter()
            .find(|i| i.id == item_id && i.is_active)
            .ok_or(CartError::UnknownItem(item_id))?;

        priced.push(PricedLine {
            item_id,
            name: item.name.clone(),
            unit_price_cents: item.price_cents,
            quantity,
            line_total_cents: item.price_cents * i64::from(quantity),
        });
    }

    let total_cents = priced.iter().map(|l| l.line_total_cents).sum();
    Ok(PricedCart {
        lines: priced,
        total_cents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, price_cents: i64, is_active: bool) -> BodegaItem {
        BodegaItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            price_cents,
            image_url: None,
            category: Some("apparel".to_string()),
            is_active,
        }
    }

    #[test]
    fn test_prices_from_catalog() {
        let shirt = item("AirBear Tee", 2500, true);
        let mug = item("Solar Mug", 1200, true);
        let catalog = vec![shirt.clone(), mug.clone()];

        let cart = price_cart(
            &catalog,
            &[
                CartLine { item_id: shirt.id, quantity: 2 },
                CartLine { item_id: mug.id, quantity: 1 },
            ],
        )
        .unwrap();

        assert_eq!(cart.total_cents, 6200);
        assert_eq!(cart.lines.len(), 2);
        let shirt_line = cart.lines.iter().find(|l| l.item_id == shirt.id).unwrap();
        assert_eq!(shirt_line.line_total_cents, 5000);
    }

    #[test]
    fn test_duplicate_lines_merge() {
        let mug = item("Solar Mug", 1200, true);
        let cart = price_cart(
            &[mug.clone()],
            &[
                CartLine { item_id: mug.id, quantity: 4 },
                CartLine { item_id: mug.id, quantity: 3 },
            ],
        )
        .unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 7);

        let too_many = price_cart(
            &[mug.clone()],
            &[
                CartLine { item_id: mug.id, quantity: 6 },
                CartLine { item_id: mug.id, quantity: 5 },
            ],
        );
        assert_eq!(
            too_many,
            Err(CartError::InvalidQuantity { item_id: mug.id, quantity: 11 })
        );
    }

    #[test]
    fn test_rejects_bad_carts() {
        let retired = item("Old Cap", 900, false);
        assert_eq!(price_cart(&[], &[]), Err(CartError::Empty));
        assert_eq!(
            price_cart(&[retired.clone()], &[CartLine { item_id: retired.id, quantity: 1 }]),
            Err(CartError::UnknownItem(retired.id))
        );
        assert!(matches!(
            price_cart(&[retired.clone()], &[CartLine { item_id: retired.id, quantity: 0 }]),
            Err(CartError::InvalidQuantity { .. })
        ));
    }
}
