//! Order Aggregate
//!
//! The client never mutates an order: status changes come back from the
//! server as a fresh representation. What lives here are the guards the UI
//! consults before offering an action and the pure views over order lists.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use validator::Validate;

use crate::domain::value_objects::{Role, ShippingAddress, Timestamp};

pub const PAY_ON_DELIVERY: &str = "PAY_ON_DELIVERY";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        Self::Pending, Self::Confirmed, Self::Processing, Self::Shipped,
        Self::Delivered, Self::Cancelled, Self::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Returned => "RETURNED",
        }
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::Processing)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_description: Option<String>,
    pub price_at_purchase: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub subtotal: Decimal,
    pub seller_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_media_id: Option<String>,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal { self.price_at_purchase * Decimal::from(self.quantity) }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusHistory {
    #[serde(default)]
    pub previous_status: Option<OrderStatus>,
    pub new_status: OrderStatus,
    pub changed_at: Timestamp,
    pub changed_by: String,
    #[serde(default)]
    pub changed_by_role: Option<Role>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub buyer_id: String,
    #[serde(default)]
    pub buyer_name: Option<String>,
    #[serde(default)]
    pub buyer_email: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub shipping_cost: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    #[serde(default)]
    pub discount_amount: Decimal,
    #[serde(default)]
    pub total_amount: Decimal,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub delivery_notes: Option<String>,
    pub status: OrderStatus,
    #[serde(default)]
    pub status_history: Vec<OrderStatusHistory>,
    #[serde(default)]
    pub estimated_delivery_date: Option<Timestamp>,
    #[serde(default)]
    pub actual_delivery_date: Option<Timestamp>,
    #[serde(default)]
    pub original_order_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

fn default_payment_method() -> String { PAY_ON_DELIVERY.to_string() }

impl Order {
    /// `subtotal + shipping + tax - discount`
    pub fn computed_total(&self) -> Decimal {
        self.subtotal + self.shipping_cost + self.tax_amount - self.discount_amount
    }

    pub fn has_consistent_total(&self) -> bool { self.computed_total() == self.total_amount }

    pub fn total_item_count(&self) -> u32 { self.items.iter().map(|i| i.quantity).sum() }

    pub fn seller_ids(&self) -> BTreeSet<&str> { self.items.iter().map(|i| i.seller_id.as_str()).collect() }

    pub fn contains_seller(&self, seller_id: &str) -> bool { self.items.iter().any(|i| i.seller_id == seller_id) }
}

/// Whether the UI should offer "cancel". Advisory only: the server re-checks.
pub fn can_cancel(order: &Order) -> bool { order.status.is_cancellable() }

/// Whether the UI should offer "order again". Only cancelled orders qualify.
pub fn can_redo(order: &Order) -> bool { order.status == OrderStatus::Cancelled }

/// Case-insensitive match on order number or any item name, optionally
/// narrowed to one status.
pub fn filter_orders(orders: &[Order], query: &str, status: Option<OrderStatus>) -> Vec<Order> {
    let query = query.trim().to_lowercase();
    orders
        .iter()
        .filter(|o| status.map_or(true, |s| o.status == s))
        .filter(|o| {
            query.is_empty()
                || o.order_number.to_lowercase().contains(&query)
                || o.items.iter().any(|i| i.product_name.to_lowercase().contains(&query))
        })
        .cloned()
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[validate]
    pub shipping_address: ShippingAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub delivery_notes: Option<String>,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
}

impl CheckoutRequest {
    pub fn new(shipping_address: ShippingAddress) -> Self {
        Self { shipping_address, delivery_notes: None, payment_method: default_payment_method() }
    }
}

/// Query for `GET /orders/my-orders`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub keyword: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl OrderFilter {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status { pairs.push(("status", status.as_str().to_string())); }
        if let Some(keyword) = self.keyword.as_ref().filter(|k| !k.is_empty()) { pairs.push(("keyword", keyword.clone())); }
        if let Some(from) = &self.date_from { pairs.push(("dateFrom", from.clone())); }
        if let Some(to) = &self.date_to { pairs.push(("dateTo", to.clone())); }
        pairs
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCount { pub name: String, pub count: u32 }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShare { pub name: String, pub percentage: f64 }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRevenue { pub name: String, pub revenue: Decimal, pub units: u32 }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue { pub month: String, pub amount: Decimal }

/// Buyer dashboard figures.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerStats {
    pub total_spent: Decimal,
    pub total_orders: u32,
    #[serde(default)]
    pub most_bought_products: Vec<ProductCount>,
    #[serde(default)]
    pub top_categories: Vec<CategoryShare>,
}

/// Seller dashboard figures.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerStats {
    pub total_revenue: Decimal,
    pub total_units_sold: u32,
    #[serde(default)]
    pub best_selling_products: Vec<ProductRevenue>,
    #[serde(default)]
    pub revenue_by_month: Vec<MonthlyRevenue>,
}
