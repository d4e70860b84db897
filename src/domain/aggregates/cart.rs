//! Cart Aggregate
//!
//! Every transform here is pure: it takes `&self` and returns a new cart with
//! `total_items` and `cached_subtotal` recomputed, so a cached value can be
//! kept as a rollback snapshot while the transformed copy is published.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::value_objects::{now, Timestamp};
use crate::validation::validate_price;

/// Largest quantity a single request may ask for.
pub const MAX_LINE_QUANTITY: u32 = 9_999;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartStatus {
    #[default]
    Active,
    Purchased,
    Abandoned,
    Merged,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub status: CartStatus,
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub total_items: u32,
    #[serde(default)]
    pub cached_subtotal: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: String,
    pub quantity: u32,
    pub seller_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_price: Option<Decimal>,
}

impl CartItem {
    /// Cached price times quantity; an item without a cached price counts as zero.
    pub fn line_total(&self) -> Decimal {
        self.cached_price.unwrap_or(Decimal::ZERO) * Decimal::from(self.quantity)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    #[validate(length(min = 1))]
    pub product_id: String,
    #[validate(range(min = 1, max = 9999))]
    pub quantity: u32,
    #[validate(length(min = 1))]
    pub seller_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_price")]
    pub cached_price: Option<Decimal>,
}

impl AddToCartRequest {
    pub fn new(product_id: impl Into<String>, quantity: u32, seller_id: impl Into<String>) -> Self {
        Self { product_id: product_id.into(), quantity, seller_id: seller_id.into(), cached_product_name: None, cached_price: None }
    }

    pub fn with_display(mut self, name: impl Into<String>, price: Decimal) -> Self {
        self.cached_product_name = Some(name.into());
        self.cached_price = Some(price);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct UpdateCartItemRequest {
    #[validate(range(max = 9999))]
    pub quantity: u32,
}

impl Cart {
    /// Cart synthesized locally when the server has none for this user yet.
    /// It carries no id: only the server hands out persisted ids.
    pub fn empty_for(user_id: impl Into<String>) -> Self {
        Self {
            id: None, user_id: user_id.into(), status: CartStatus::Active, items: vec![],
            total_items: 0, cached_subtotal: Decimal::ZERO, created_at: None, updated_at: None,
        }
    }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn distinct_product_count(&self) -> usize { self.items.len() }
    pub fn find_item(&self, product_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Adds the requested quantity. An existing line keeps its cached display
    /// fields and only accumulates quantity, saturating at `u32::MAX`.
    pub fn with_item_added(&self, request: &AddToCartRequest) -> Self {
        let mut next = self.clone();
        let stamp = now();
        if let Some(existing) = next.items.iter_mut().find(|i| i.product_id == request.product_id) {
            existing.quantity = existing.quantity.saturating_add(request.quantity);
            existing.updated_at = Some(stamp);
        } else {
            next.items.push(CartItem {
                product_id: request.product_id.clone(),
                quantity: request.quantity,
                seller_id: request.seller_id.clone(),
                added_at: Some(stamp),
                updated_at: Some(stamp),
                cached_product_name: request.cached_product_name.clone(),
                cached_price: request.cached_price,
            });
        }
        next.recalculated()
    }

    /// Sets a line's quantity. Zero removes the line; an unknown product is a no-op.
    pub fn with_quantity(&self, product_id: &str, quantity: u32) -> Self {
        if quantity == 0 {
            return self.without_item(product_id);
        }
        let mut next = self.clone();
        if let Some(item) = next.items.iter_mut().find(|i| i.product_id == product_id) {
            item.quantity = quantity;
            item.updated_at = Some(now());
        }
        next.recalculated()
    }

    pub fn without_item(&self, product_id: &str) -> Self {
        let mut next = self.clone();
        next.items.retain(|i| i.product_id != product_id);
        next.recalculated()
    }

    /// Empties the cart but keeps it scoped to the same user.
    pub fn cleared(&self) -> Self {
        let mut next = self.clone();
        next.items.clear();
        next.recalculated()
    }

    /// Recomputes the cached aggregates from the item list.
    pub fn recalculated(mut self) -> Self {
        self.total_items = self.items.iter().fold(0u32, |sum, i| sum.saturating_add(i.quantity));
        self.cached_subtotal = self.items.iter().map(CartItem::line_total).sum();
        self
    }

    pub fn has_consistent_totals(&self) -> bool {
        let expected = self.clone().recalculated();
        expected.total_items == self.total_items && expected.cached_subtotal == self.cached_subtotal
    }
}
