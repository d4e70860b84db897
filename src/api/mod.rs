//! REST seam between the services and the backend.
//!
//! Services depend on these traits, not on HTTP, so tests can swap in a
//! backend that fails or answers from a script.

mod http;
mod interceptor;

pub use http::{HttpApi, USER_ID_HEADER};
pub use interceptor::ErrorInterceptor;

use async_trait::async_trait;

use crate::domain::{
    AddToCartRequest, BuyerStats, Cart, CheckoutRequest, Order, OrderFilter, OrderStatus, PagedResponse,
    Product, ProductRequest, ProductSearch, SellerStats, UpdateCartItemRequest, User,
};
use crate::error::ApiResult;

#[async_trait]
pub trait CartApi: Send + Sync {
    /// `GET /cart`. A user without a cart gets `ApiError::NotFound`.
    async fn get_cart(&self) -> ApiResult<Cart>;
    async fn add_item(&self, request: &AddToCartRequest) -> ApiResult<Cart>;
    async fn update_item(&self, product_id: &str, request: &UpdateCartItemRequest) -> ApiResult<Cart>;
    async fn remove_item(&self, product_id: &str) -> ApiResult<Cart>;
    async fn clear(&self) -> ApiResult<()>;
}

#[async_trait]
pub trait OrderApi: Send + Sync {
    async fn checkout(&self, request: &CheckoutRequest) -> ApiResult<Order>;
    async fn my_orders(&self, filter: &OrderFilter) -> ApiResult<Vec<Order>>;
    async fn seller_orders(&self, status: Option<OrderStatus>) -> ApiResult<Vec<Order>>;
    async fn get_order(&self, order_id: &str) -> ApiResult<Order>;
    async fn cancel(&self, order_id: &str, reason: Option<&str>) -> ApiResult<Order>;
    async fn redo(&self, order_id: &str) -> ApiResult<Order>;
    async fn buyer_stats(&self) -> ApiResult<BuyerStats>;
    async fn seller_stats(&self) -> ApiResult<SellerStats>;
}

#[async_trait]
pub trait ProductApi: Send + Sync {
    async fn list(&self) -> ApiResult<Vec<Product>>;
    async fn get(&self, product_id: &str) -> ApiResult<Product>;
    async fn categories(&self) -> ApiResult<Vec<String>>;
    async fn search(&self, search: &ProductSearch) -> ApiResult<PagedResponse<Product>>;
    async fn create(&self, request: &ProductRequest) -> ApiResult<Product>;
    async fn update(&self, product_id: &str, request: &ProductRequest) -> ApiResult<Product>;
    async fn delete(&self, product_id: &str) -> ApiResult<()>;
}

#[async_trait]
pub trait UserApi: Send + Sync {
    async fn get_user(&self, user_id: &str) -> ApiResult<User>;
}
