use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use super::{require_user, LoadingGuard};
use crate::api::OrderApi;
use crate::domain::{self, BuyerStats, CheckoutRequest, Order, OrderFilter, OrderStatus, SellerStats};
use crate::error::ApiResult;
use crate::session::Session;
use crate::store::Store;
use crate::validation;

/// Orders placed by or sold by the current user.
///
/// Order state is owned by the server. Nothing here changes an order
/// locally: cancel and redo replace cached entries with what the server
/// returns.
pub struct OrderService {
    api: Arc<dyn OrderApi>,
    session: Session,
    orders: Store<Vec<Order>>,
    selected: Store<Option<Order>>,
    loading: Store<bool>,
}

impl OrderService {
    pub fn new(api: Arc<dyn OrderApi>, session: Session) -> Self {
        Self { api, session, orders: Store::default(), selected: Store::default(), loading: Store::new(false) }
    }

    pub fn orders(&self) -> Vec<Order> { self.orders.get() }
    pub fn selected(&self) -> Option<Order> { self.selected.get() }
    pub fn watch(&self) -> watch::Receiver<Vec<Order>> { self.orders.subscribe() }
    pub fn is_loading(&self) -> bool { self.loading.get() }

    #[instrument(skip_all)]
    pub async fn checkout(&self, request: &CheckoutRequest) -> ApiResult<Order> {
        validation::check(request)?;
        require_user(&self.session)?;
        let _loading = LoadingGuard::start(&self.loading);
        let order = self.api.checkout(request).await?;
        info!(order_number = %order.order_number, total = %order.total_amount, "order placed");
        self.orders.update(|orders| orders.insert(0, order.clone()));
        self.selected.set(Some(order.clone()));
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn get_my_orders(&self, filter: &OrderFilter) -> ApiResult<Vec<Order>> {
        let _loading = LoadingGuard::start(&self.loading);
        let orders = self.api.my_orders(filter).await?;
        self.orders.set(orders.clone());
        Ok(orders)
    }

    #[instrument(skip(self))]
    pub async fn get_seller_orders(&self, status: Option<OrderStatus>) -> ApiResult<Vec<Order>> {
        let _loading = LoadingGuard::start(&self.loading);
        let orders = self.api.seller_orders(status).await?;
        self.orders.set(orders.clone());
        Ok(orders)
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: &str) -> ApiResult<Order> {
        let order = self.api.get_order(order_id).await?;
        self.selected.set(Some(order.clone()));
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: &str, reason: Option<&str>) -> ApiResult<Order> {
        if let Some(cached) = self.cached(order_id).filter(|o| !domain::can_cancel(o)) {
            warn!(status = %cached.status, "cancel requested for an order that does not look cancellable");
        }
        let _loading = LoadingGuard::start(&self.loading);
        let order = self.api.cancel(order_id, reason).await?;
        info!(order_number = %order.order_number, "order cancelled");
        self.replace(&order);
        Ok(order)
    }

    /// Places a fresh order with the items of a cancelled one.
    #[instrument(skip(self))]
    pub async fn redo_order(&self, order_id: &str) -> ApiResult<Order> {
        if let Some(cached) = self.cached(order_id).filter(|o| !domain::can_redo(o)) {
            warn!(status = %cached.status, "redo requested for an order that is not cancelled");
        }
        let _loading = LoadingGuard::start(&self.loading);
        let order = self.api.redo(order_id).await?;
        info!(order_number = %order.order_number, original = order_id, "order redone");
        self.orders.update(|orders| orders.insert(0, order.clone()));
        Ok(order)
    }

    pub async fn get_buyer_stats(&self) -> ApiResult<BuyerStats> { self.api.buyer_stats().await }
    pub async fn get_seller_stats(&self) -> ApiResult<SellerStats> { self.api.seller_stats().await }

    pub fn filtered_orders(&self, query: &str, status: Option<OrderStatus>) -> Vec<Order> {
        self.orders.with(|orders| domain::filter_orders(orders, query, status))
    }

    pub fn can_cancel(&self, order: &Order) -> bool { domain::can_cancel(order) }
    pub fn can_redo(&self, order: &Order) -> bool { domain::can_redo(order) }

    pub fn reset(&self) {
        self.orders.set(Vec::new());
        self.selected.set(None);
    }

    fn cached(&self, order_id: &str) -> Option<Order> {
        self.orders.with(|orders| orders.iter().find(|o| o.id == order_id).cloned())
    }

    fn replace(&self, order: &Order) {
        self.orders.update(|orders| {
            if let Some(slot) = orders.iter_mut().find(|o| o.id == order.id) {
                *slot = order.clone();
            }
        });
        self.selected.update(|selected| {
            if let Some(slot) = selected.as_mut().filter(|o| o.id == order.id) {
                *slot = order.clone();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderItem, Role, ShippingAddress, User};
    use crate::error::ApiError;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeOrders {
        orders: Mutex<Vec<Order>>,
        checkouts: Mutex<u32>,
    }

    impl FakeOrders {
        fn with(orders: Vec<Order>) -> Arc<Self> { Arc::new(Self { orders: Mutex::new(orders), ..Default::default() }) }

        fn find(&self, id: &str) -> ApiResult<Order> {
            self.orders.lock().unwrap().iter().find(|o| o.id == id).cloned()
                .ok_or_else(|| ApiError::from_response(404, r#"{"message":"Order not found"}"#))
        }
    }

    #[async_trait]
    impl OrderApi for FakeOrders {
        async fn checkout(&self, request: &CheckoutRequest) -> ApiResult<Order> {
            *self.checkouts.lock().unwrap() += 1;
            let mut placed = order("o-new", OrderStatus::Confirmed);
            placed.shipping_address = Some(request.shipping_address.clone());
            Ok(placed)
        }
        async fn my_orders(&self, filter: &OrderFilter) -> ApiResult<Vec<Order>> {
            let orders = self.orders.lock().unwrap().clone();
            Ok(domain::filter_orders(&orders, filter.keyword.as_deref().unwrap_or(""), filter.status))
        }
        async fn seller_orders(&self, status: Option<OrderStatus>) -> ApiResult<Vec<Order>> {
            let orders = self.orders.lock().unwrap().clone();
            Ok(domain::filter_orders(&orders, "", status))
        }
        async fn get_order(&self, order_id: &str) -> ApiResult<Order> { self.find(order_id) }
        async fn cancel(&self, order_id: &str, _reason: Option<&str>) -> ApiResult<Order> {
            let mut order = self.find(order_id)?;
            if !order.status.is_cancellable() {
                return Err(ApiError::from_response(409, r#"{"message":"Order cannot be cancelled in its current status"}"#));
            }
            order.status = OrderStatus::Cancelled;
            Ok(order)
        }
        async fn redo(&self, order_id: &str) -> ApiResult<Order> {
            let old = self.find(order_id)?;
            let mut fresh = order(&format!("{order_id}-redo"), OrderStatus::Pending);
            fresh.original_order_id = Some(old.id);
            Ok(fresh)
        }
        async fn buyer_stats(&self) -> ApiResult<BuyerStats> { Ok(BuyerStats::default()) }
        async fn seller_stats(&self) -> ApiResult<SellerStats> { Err(ApiError::Forbidden) }
    }

    fn order(id: &str, status: OrderStatus) -> Order {
        let item = OrderItem {
            product_id: "prod_1".into(), product_name: "Nokia 3310".into(), product_description: None,
            price_at_purchase: Decimal::new(1999, 2), quantity: 1, subtotal: Decimal::new(1999, 2),
            seller_id: "mock_seller_id".into(), seller_name: None, thumbnail_media_id: None,
        };
        serde_json::from_value(serde_json::json!({
            "id": id, "orderNumber": format!("ORD-{id}"), "buyerId": "u1", "status": status,
            "subtotal": 19.99, "totalAmount": 19.99,
        }))
        .map(|mut o: Order| { o.items = vec![item]; o })
        .unwrap()
    }

    fn service(api: Arc<FakeOrders>) -> OrderService {
        let session = Session::new();
        session.login(User::new("u1", "John Client", "client@test.com", Role::Client), None);
        OrderService::new(api, session)
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "John Client".into(), address_line1: "1 Main St".into(), address_line2: None,
            city: "Helsinki".into(), postal_code: "00100".into(), country: "Finland".into(), phone_number: None,
        }
    }

    #[tokio::test]
    async fn test_checkout_prepends_and_selects() {
        let api = FakeOrders::with(vec![]);
        let service = service(api.clone());
        service.get_my_orders(&OrderFilter::default()).await.unwrap();
        let placed = service.checkout(&CheckoutRequest::new(address())).await.unwrap();
        assert_eq!(placed.id, "o-new");
        assert_eq!(service.orders()[0].id, "o-new");
        assert_eq!(service.selected().map(|o| o.id), Some("o-new".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_address_never_reaches_server() {
        let api = FakeOrders::with(vec![]);
        let service = service(api.clone());
        let mut bad = address();
        bad.postal_code = "12".into();
        let err = service.checkout(&CheckoutRequest::new(bad)).await.unwrap_err();
        match err {
            ApiError::InvalidInput { fields, .. } => {
                assert_eq!(fields, vec!["Please enter a valid postal code (4-10 digits)".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(*api.checkouts.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancel_replaces_cached_order() {
        let api = FakeOrders::with(vec![order("o1", OrderStatus::Pending), order("o2", OrderStatus::Delivered)]);
        let service = service(api);
        service.get_my_orders(&OrderFilter::default()).await.unwrap();
        service.get_order("o1").await.unwrap();

        let cancelled = service.cancel_order("o1", Some("changed my mind")).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(service.orders()[0].status, OrderStatus::Cancelled);
        assert_eq!(service.selected().unwrap().status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_server_rejection_is_recoverable() {
        let api = FakeOrders::with(vec![order("o2", OrderStatus::Delivered)]);
        let service = service(api);
        service.get_my_orders(&OrderFilter::default()).await.unwrap();
        let err = service.cancel_order("o2", None).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict { .. }));
        assert!(err.is_recoverable());
        assert_eq!(service.orders()[0].status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_redo_adds_new_order_and_keeps_original() {
        let api = FakeOrders::with(vec![order("o3", OrderStatus::Cancelled)]);
        let service = service(api);
        service.get_my_orders(&OrderFilter::default()).await.unwrap();
        let fresh = service.redo_order("o3").await.unwrap();
        assert_eq!(fresh.original_order_id.as_deref(), Some("o3"));
        let orders = service.orders();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, "o3-redo");
        assert_eq!(orders[1].status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_filtered_orders_and_guards() {
        let api = FakeOrders::with(vec![order("a1", OrderStatus::Shipped), order("b2", OrderStatus::Cancelled)]);
        let service = service(api);
        service.get_seller_orders(None).await.unwrap();
        assert_eq!(service.filtered_orders("nokia", None).len(), 2);
        assert_eq!(service.filtered_orders("ord-b2", None).len(), 1);
        assert!(service.filtered_orders("", Some(OrderStatus::Pending)).is_empty());

        let orders = service.orders();
        assert!(!service.can_cancel(&orders[0]));
        assert!(service.can_redo(&orders[1]));
        assert_eq!(service.get_seller_stats().await, Err(ApiError::Forbidden));

        service.reset();
        assert!(service.orders().is_empty());
        assert!(service.selected().is_none());
    }
}
