//! Product Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::value_objects::Timestamp;
use crate::validation::validate_price;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default)]
    pub seller_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub media_ids: Vec<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl Product {
    pub fn is_in_stock(&self) -> bool { self.stock.map_or(true, |s| s > 0) }
    pub fn is_sold_by(&self, seller_id: &str) -> bool { self.seller_id.as_deref() == Some(seller_id) }
}

/// Body for create/update, as the product service expects it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    #[validate(length(min = 3, max = 100))]
    pub name: String,
    #[validate(length(min = 10, max = 1000))]
    pub description: String,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Filters for `GET /products/search`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductSearch {
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    /// `field` or `field,direction`
    pub sort: Option<String>,
}

impl ProductSearch {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self { keyword: Some(keyword.into()), ..Self::default() }
    }

    /// Query pairs in the names the product service reads: the keyword goes
    /// out as `q` and a `field,direction` sort is split in two.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(keyword) = self.keyword.as_ref().filter(|k| !k.is_empty()) { pairs.push(("q", keyword.clone())); }
        if let Some(category) = self.category.as_ref().filter(|c| !c.is_empty()) { pairs.push(("category", category.clone())); }
        if let Some(min) = self.min_price { pairs.push(("minPrice", min.to_string())); }
        if let Some(max) = self.max_price { pairs.push(("maxPrice", max.to_string())); }
        if let Some(page) = self.page { pairs.push(("page", page.to_string())); }
        if let Some(size) = self.size { pairs.push(("size", size.to_string())); }
        if let Some(sort) = self.sort.as_ref().filter(|s| !s.is_empty()) {
            let mut parts = sort.splitn(2, ',');
            if let Some(field) = parts.next() { pairs.push(("sort", field.trim().to_string())); }
            if let Some(direction) = parts.next().map(str::trim).filter(|d| !d.is_empty()) {
                pairs.push(("direction", direction.to_string()));
            }
        }
        pairs
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse<T> {
    pub products: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub first: bool,
    pub last: bool,
}

impl<T: Clone> PagedResponse<T> {
    /// Slices a full result list into the requested zero-based page.
    pub fn paginate(all: &[T], page: u32, size: u32) -> Self {
        let size = size.max(1);
        let total = all.len() as u64;
        let total_pages = u32::try_from(total.div_ceil(u64::from(size))).unwrap_or(u32::MAX);
        let start = (page as usize).saturating_mul(size as usize).min(all.len());
        let end = start.saturating_add(size as usize).min(all.len());
        Self {
            products: all[start..end].to_vec(),
            page, size, total_elements: total, total_pages,
            first: page == 0,
            last: page.saturating_add(1) >= total_pages,
        }
    }
}
