//! `reqwest` implementation of the REST seam.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::{CartApi, ErrorInterceptor, OrderApi, ProductApi, UserApi};
use crate::config::ClientConfig;
use crate::domain::{
    AddToCartRequest, BuyerStats, Cart, CheckoutRequest, Order, OrderFilter, OrderStatus, PagedResponse,
    Product, ProductRequest, ProductSearch, SellerStats, UpdateCartItemRequest, User,
};
use crate::error::{ApiError, ApiResult};
use crate::notify::Notifier;
use crate::session::Session;
use crate::{Result, StorefrontError};

pub const USER_ID_HEADER: &str = "X-User-Id";

/// Spring-style page wrapper returned by the seller order listing.
#[derive(Debug, Deserialize)]
struct Page<T> {
    content: Vec<T>,
}

#[derive(Clone, Debug)]
struct Endpoints {
    cart: Url,
    orders: Url,
    products: Url,
    users: Url,
}

impl Endpoints {
    fn parse(config: &ClientConfig) -> Result<Self> {
        let base = |name: &str, raw: &str| {
            Url::parse(raw)
                .ok()
                .filter(|url| !url.cannot_be_a_base())
                .ok_or_else(|| StorefrontError::Config(format!("{name} is not a usable base URL: {raw}")))
        };
        Ok(Self {
            cart: base("cart URL", &config.cart_url)?,
            orders: base("orders URL", &config.orders_url)?,
            products: base("products URL", &config.products_url)?,
            users: base("users URL", &config.users_url)?,
        })
    }
}

/// Appends path segments to a base URL. Each segment is percent-encoded, so an
/// id containing `/`, `?` or `#` stays a single segment.
fn join(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    // Bases are checked in `Endpoints::parse`, so this always succeeds.
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

#[derive(Clone, Debug)]
pub struct HttpApi {
    client: Client,
    endpoints: Endpoints,
    debug_logging: bool,
    session: Session,
    interceptor: ErrorInterceptor,
}

impl HttpApi {
    pub fn new(config: ClientConfig, session: Session, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let endpoints = Endpoints::parse(&config)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StorefrontError::Config(format!("cannot build HTTP client: {e}")))?;
        let interceptor = ErrorInterceptor::new(notifier, session.clone());
        Ok(Self { client, endpoints, debug_logging: config.debug_logging, session, interceptor })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn cart(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.request(method, join(&self.endpoints.cart, segments))
    }

    fn products(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.request(method, join(&self.endpoints.products, segments))
    }

    /// Order requests identify the user explicitly; the gateway validates it independently.
    fn orders(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let builder = self.request(method, join(&self.endpoints.orders, segments));
        builder.header(USER_ID_HEADER, self.session.current_user_id().unwrap_or_default())
    }

    async fn dispatch(&self, builder: RequestBuilder, quiet_not_found: bool) -> ApiResult<Response> {
        let request = builder.build().map_err(|e| ApiError::InvalidInput { message: e.to_string(), fields: vec![] })?;
        debug!(method = %request.method(), url = %request.url(), "request");
        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => return Err(self.interceptor.handle(ApiError::Network { detail: e.to_string() }, quiet_not_found)),
        };
        let status = response.status();
        if self.debug_logging {
            info!(status = status.as_u16(), url = %response.url(), "response");
        }
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(self.interceptor.handle(ApiError::from_response(status.as_u16(), &body), quiet_not_found))
    }

    /// A body that does not match the expected shape is reported like any other failure.
    async fn decode<T: DeserializeOwned>(&self, response: Response) -> ApiResult<T> {
        response.json::<T>().await.map_err(|e| self.interceptor.handle(e.into(), false))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let response = self.dispatch(builder, false).await?;
        self.decode(response).await
    }

    async fn send_empty(&self, builder: RequestBuilder) -> ApiResult<()> {
        self.dispatch(builder, false).await.map(drop)
    }
}

#[async_trait]
impl CartApi for HttpApi {
    async fn get_cart(&self) -> ApiResult<Cart> {
        let response = self.dispatch(self.cart(Method::GET, &[]), true).await?;
        self.decode(response).await
    }

    async fn add_item(&self, request: &AddToCartRequest) -> ApiResult<Cart> {
        self.send(self.cart(Method::POST, &["items"]).json(request)).await
    }

    async fn update_item(&self, product_id: &str, request: &UpdateCartItemRequest) -> ApiResult<Cart> {
        self.send(self.cart(Method::PATCH, &["items", product_id]).json(request)).await
    }

    async fn remove_item(&self, product_id: &str) -> ApiResult<Cart> {
        self.send(self.cart(Method::DELETE, &["items", product_id])).await
    }

    async fn clear(&self) -> ApiResult<()> {
        self.send_empty(self.cart(Method::DELETE, &[])).await
    }
}

#[async_trait]
impl OrderApi for HttpApi {
    async fn checkout(&self, request: &CheckoutRequest) -> ApiResult<Order> {
        self.send(self.orders(Method::POST, &["checkout"]).json(request)).await
    }

    async fn my_orders(&self, filter: &OrderFilter) -> ApiResult<Vec<Order>> {
        self.send(self.orders(Method::GET, &["my-orders"]).query(&filter.query_pairs())).await
    }

    async fn seller_orders(&self, status: Option<OrderStatus>) -> ApiResult<Vec<Order>> {
        let mut builder = self.orders(Method::GET, &["seller"]);
        if let Some(status) = status {
            builder = builder.query(&[("status", status.as_str())]);
        }
        let page: Page<Order> = self.send(builder).await?;
        Ok(page.content)
    }

    async fn get_order(&self, order_id: &str) -> ApiResult<Order> {
        self.send(self.orders(Method::GET, &[order_id])).await
    }

    async fn cancel(&self, order_id: &str, reason: Option<&str>) -> ApiResult<Order> {
        let mut builder = self.orders(Method::PATCH, &[order_id, "cancel"]);
        if let Some(reason) = reason {
            builder = builder.query(&[("reason", reason)]);
        }
        self.send(builder).await
    }

    async fn redo(&self, order_id: &str) -> ApiResult<Order> {
        self.send(self.orders(Method::POST, &[order_id, "redo"])).await
    }

    async fn buyer_stats(&self) -> ApiResult<BuyerStats> {
        self.send(self.orders(Method::GET, &["stats", "buyer"])).await
    }

    async fn seller_stats(&self) -> ApiResult<SellerStats> {
        self.send(self.orders(Method::GET, &["stats", "seller"])).await
    }
}

#[async_trait]
impl ProductApi for HttpApi {
    async fn list(&self) -> ApiResult<Vec<Product>> {
        self.send(self.products(Method::GET, &[])).await
    }

    async fn get(&self, product_id: &str) -> ApiResult<Product> {
        self.send(self.products(Method::GET, &[product_id])).await
    }

    async fn categories(&self) -> ApiResult<Vec<String>> {
        self.send(self.products(Method::GET, &["categories"])).await
    }

    async fn search(&self, search: &ProductSearch) -> ApiResult<PagedResponse<Product>> {
        self.send(self.products(Method::GET, &["search"]).query(&search.query_pairs())).await
    }

    async fn create(&self, request: &ProductRequest) -> ApiResult<Product> {
        self.send(self.products(Method::POST, &[]).json(request)).await
    }

    async fn update(&self, product_id: &str, request: &ProductRequest) -> ApiResult<Product> {
        self.send(self.products(Method::PUT, &[product_id]).json(request)).await
    }

    async fn delete(&self, product_id: &str) -> ApiResult<()> {
        self.send_empty(self.products(Method::DELETE, &[product_id])).await
    }
}

#[async_trait]
impl UserApi for HttpApi {
    async fn get_user(&self, user_id: &str) -> ApiResult<User> {
        self.send(self.request(Method::GET, join(&self.endpoints.users, &[user_id]))).await
    }
}
