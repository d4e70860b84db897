//! One handle for a running storefront client.

use std::sync::Arc;
use tracing::info;

use crate::api::{CartApi, HttpApi, OrderApi, ProductApi, UserApi};
use crate::config::ClientConfig;
use crate::domain::{CheckoutRequest, Order, User};
use crate::error::ApiResult;
use crate::notify::{Notification, Notifier};
use crate::services::{CartService, OrderService, ProductService, UserService};
use crate::session::Session;
use crate::Result;

pub struct Storefront {
    pub session: Session,
    pub cart: CartService,
    pub orders: OrderService,
    pub products: ProductService,
    pub users: UserService,
    notifier: Arc<dyn Notifier>,
}

impl Storefront {
    /// Builds every service over one HTTP client.
    pub fn connect(config: ClientConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let session = Session::new();
        let api = Arc::new(HttpApi::new(config, session.clone(), Arc::clone(&notifier))?);
        Ok(Self::with_api(api, session, notifier))
    }

    pub fn with_api<A>(api: Arc<A>, session: Session, notifier: Arc<dyn Notifier>) -> Self
    where
        A: CartApi + OrderApi + ProductApi + UserApi + 'static,
    {
        Self {
            cart: CartService::new(api.clone(), session.clone()),
            orders: OrderService::new(api.clone(), session.clone()),
            products: ProductService::new(api.clone(), session.clone()),
            users: UserService::new(api),
            session,
            notifier,
        }
    }

    pub fn login(&self, user: User, token: Option<String>) { self.session.login(user, token); }

    /// Places the order, then drops the cart cache: the server has emptied it.
    pub async fn checkout(&self, request: &CheckoutRequest) -> ApiResult<Order> {
        let order = self.orders.checkout(request).await?;
        self.cart.reset_cart();
        self.notifier.notify(Notification::Success(format!("Order {} placed", order.order_number)));
        Ok(order)
    }

    pub fn logout(&self) {
        self.session.logout();
        self.cart.reset_cart();
        self.orders.reset();
        self.products.reset();
        info!("storefront state cleared");
    }
}
