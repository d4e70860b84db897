//! Cart service: read-through cache plus optimistic mutations.
//!
//! Each mutation snapshots the cached cart, publishes the locally predicted
//! cart at once, then replaces it with the server's answer or restores the
//! snapshot if the request fails. Mutations on the cart are serialized by
//! the store, so an overlapping call starts from the previous call's final
//! state rather than its optimistic guess. A direct write to the cache
//! (`update_local_cart`, `reset_cart`, a fresh fetch) made while a mutation
//! is in flight wins over that mutation's late answer.

use std::future::Future;
use std::sync::Arc;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use super::LoadingGuard;
use crate::api::CartApi;
use crate::domain::{AddToCartRequest, Cart, UpdateCartItemRequest};
use crate::error::ApiResult;
use crate::session::Session;
use crate::store::{Derived, Store};
use crate::validation;

pub struct CartService {
    api: Arc<dyn CartApi>,
    session: Session,
    /// `None` until a cart has been fetched or synthesized.
    cart: Store<Option<Cart>>,
    loading: Store<bool>,
}

impl CartService {
    pub fn new(api: Arc<dyn CartApi>, session: Session) -> Self {
        Self { api, session, cart: Store::new(None), loading: Store::new(false) }
    }

    pub fn cart(&self) -> Option<Cart> { self.cart.get() }
    pub fn watch(&self) -> watch::Receiver<Option<Cart>> { self.cart.subscribe() }
    pub fn is_loading(&self) -> bool { self.loading.get() }
    pub fn is_loaded(&self) -> bool { self.cart.with(Option::is_some) }

    pub fn item_count(&self) -> u32 { self.cart.with(|c| c.as_ref().map_or(0, |c| c.total_items)) }
    pub fn subtotal(&self) -> Decimal { self.cart.with(|c| c.as_ref().map_or(Decimal::ZERO, |c| c.cached_subtotal)) }
    pub fn is_empty(&self) -> bool { self.cart.with(|c| c.as_ref().map_or(true, Cart::is_empty)) }

    /// Badge count that follows every cache change.
    pub fn item_count_view(&self) -> Derived<Option<Cart>, impl Fn(&Option<Cart>) -> u32> {
        self.cart.derive(|c: &Option<Cart>| c.as_ref().map_or(0, |c| c.total_items))
    }

    /// Fetches the authoritative cart. A 404 means the user has no cart yet:
    /// an empty one scoped to the current user is cached and returned.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> ApiResult<Cart> {
        let _loading = LoadingGuard::start(&self.loading);
        match self.api.get_cart().await {
            Ok(cart) => {
                self.cart.set(Some(cart.clone()));
                Ok(cart)
            }
            Err(err) if err.is_not_found() => {
                debug!("no cart on server yet, starting empty");
                let empty = Cart::empty_for(self.user_id());
                self.cart.set(Some(empty.clone()));
                Ok(empty)
            }
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, request), fields(product_id = %request.product_id, quantity = request.quantity))]
    pub async fn add_to_cart(&self, request: AddToCartRequest) -> ApiResult<Cart> {
        validation::check(&request)?;
        self.mutate("add", |cart| cart.with_item_added(&request), || async {
            self.api.add_item(&request).await.map(Some)
        })
        .await
    }

    /// Zero is treated as removal.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(&self, product_id: &str, quantity: u32) -> ApiResult<Cart> {
        if quantity == 0 {
            return self.remove_item(product_id).await;
        }
        let request = UpdateCartItemRequest { quantity };
        validation::check(&request)?;
        self.mutate("update", |cart| cart.with_quantity(product_id, quantity), || async {
            self.api.update_item(product_id, &request).await.map(Some)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, product_id: &str) -> ApiResult<Cart> {
        self.mutate("remove", |cart| cart.without_item(product_id), || async {
            self.api.remove_item(product_id).await.map(Some)
        })
        .await
    }

    /// The server answers with no body, so the cleared cart is kept as final.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> ApiResult<Cart> {
        self.mutate("clear", Cart::cleared, || async { self.api.clear().await.map(|()| None) }).await
    }

    /// Replaces the cache directly.
    pub fn update_local_cart(&self, cart: Cart) { self.cart.set(Some(cart)); }

    /// Back to "not loaded", e.g. after checkout or logout.
    pub fn reset_cart(&self) { self.cart.set(None); }

    fn user_id(&self) -> String { self.session.current_user_id().unwrap_or_default() }

    async fn mutate<F, Fut>(&self, op: &'static str, transform: impl FnOnce(&Cart) -> Cart, request: F) -> ApiResult<Cart>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<Option<Cart>>>,
    {
        let user_id = self.user_id();
        let tx = self
            .cart
            .begin(|previous| {
                let base = previous.clone().unwrap_or_else(|| Cart::empty_for(user_id.as_str()));
                Some(transform(&base))
            })
            .await;
        let _loading = LoadingGuard::start(&self.loading);
        match request().await {
            Ok(Some(server)) => {
                debug!(op, total_items = server.total_items, subtotal = %server.cached_subtotal, "cart mutation confirmed");
                if !tx.commit(Some(server.clone())) {
                    debug!(op, "cart replaced while the request was in flight, keeping the newer cart");
                }
                Ok(server)
            }
            Ok(None) => {
                let kept = self.cart.get().unwrap_or_else(|| Cart::empty_for(user_id.as_str()));
                tx.confirm();
                Ok(kept)
            }
            Err(err) => {
                warn!(op, error = %err, "cart mutation failed, restoring previous cart");
                if !tx.rollback() {
                    debug!(op, "cart replaced while the request was in flight, nothing to restore");
                }
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for CartService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartService").field("cart", &self.cart).field("loading", &self.loading).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::domain::{CartItem, CartStatus, Role, User};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::Semaphore;

    /// Answers from a queue, one reply per released permit.
    struct ScriptedCartApi {
        replies: Mutex<VecDeque<ApiResult<Cart>>>,
        gate: Semaphore,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedCartApi {
        fn open(replies: Vec<ApiResult<Cart>>) -> Arc<Self> {
            let count = replies.len();
            Arc::new(Self { replies: Mutex::new(replies.into()), gate: Semaphore::new(count), calls: Mutex::new(vec![]) })
        }

        fn gated(replies: Vec<ApiResult<Cart>>) -> Arc<Self> {
            Arc::new(Self { replies: Mutex::new(replies.into()), gate: Semaphore::new(0), calls: Mutex::new(vec![]) })
        }

        async fn reply(&self, call: String) -> ApiResult<Cart> {
            self.calls.lock().unwrap().push(call);
            self.gate.acquire().await.unwrap().forget();
            self.replies.lock().unwrap().pop_front().expect("unscripted call")
        }

        fn calls(&self) -> Vec<String> { self.calls.lock().unwrap().clone() }
    }

    #[async_trait]
    impl CartApi for ScriptedCartApi {
        async fn get_cart(&self) -> ApiResult<Cart> { self.reply("get".into()).await }
        async fn add_item(&self, request: &AddToCartRequest) -> ApiResult<Cart> { self.reply(format!("add {}", request.product_id)).await }
        async fn update_item(&self, product_id: &str, request: &UpdateCartItemRequest) -> ApiResult<Cart> {
            self.reply(format!("update {product_id}={}", request.quantity)).await
        }
        async fn remove_item(&self, product_id: &str) -> ApiResult<Cart> { self.reply(format!("remove {product_id}")).await }
        async fn clear(&self) -> ApiResult<()> { self.reply("clear".into()).await.map(drop) }
    }

    fn session() -> Session {
        let session = Session::new();
        session.login(User::new("u1", "John Client", "client@test.com", Role::Client), None);
        session
    }

    fn server_cart(items: Vec<(&str, u32, i64)>) -> Cart {
        let mut cart = Cart::empty_for("u1");
        cart.id = Some("cart-1".into());
        cart.items = items
            .into_iter()
            .map(|(id, quantity, price)| CartItem {
                product_id: id.into(), quantity, seller_id: "s1".into(), added_at: None, updated_at: None,
                cached_product_name: Some(format!("Product {id}")), cached_price: Some(Decimal::new(price, 0)),
            })
            .collect();
        cart.recalculated()
    }

    fn add(id: &str, quantity: u32, price: i64) -> AddToCartRequest {
        AddToCartRequest::new(id, quantity, "s1").with_display(format!("Product {id}"), Decimal::new(price, 0))
    }

    #[tokio::test]
    async fn test_optimistic_then_server_wins() {
        let api = ScriptedCartApi::gated(vec![Ok(server_cart(vec![("p1", 2, 12)]))]);
        let service = Arc::new(CartService::new(api.clone(), session()));
        service.update_local_cart(Cart::empty_for("u1"));
        let mut rx = service.watch();

        let worker = Arc::clone(&service);
        let pending = tokio::spawn(async move { worker.add_to_cart(add("p1", 2, 10)).await });

        rx.changed().await.unwrap();
        assert_eq!(service.item_count(), 2);
        assert_eq!(service.subtotal(), Decimal::new(20, 0));
        assert!(service.cart().unwrap().id.is_none());

        api.gate.add_permits(1);
        let confirmed = pending.await.unwrap().unwrap();
        assert_eq!(confirmed.cached_subtotal, Decimal::new(24, 0));
        assert_eq!(service.subtotal(), Decimal::new(24, 0));
        assert_eq!(service.cart().unwrap().id.as_deref(), Some("cart-1"));
        assert!(!service.is_loading());
    }

    #[tokio::test]
    async fn test_failure_restores_exact_snapshot() {
        let before = server_cart(vec![("p1", 1, 10), ("p2", 3, 4)]);
        let api = ScriptedCartApi::open(vec![
            Err(ApiError::Server),
            Err(ApiError::Network { detail: "refused".into() }),
            Err(ApiError::Conflict { message: "stale".into() }),
            Err(ApiError::BusinessRule { message: "Not enough stock".into() }),
        ]);
        let service = CartService::new(api.clone(), session());
        service.update_local_cart(before.clone());

        assert_eq!(service.add_to_cart(add("p3", 1, 5)).await, Err(ApiError::Server));
        assert_eq!(service.cart(), Some(before.clone()));
        assert!(matches!(service.update_item_quantity("p1", 9).await, Err(ApiError::Network { .. })));
        assert_eq!(service.cart(), Some(before.clone()));
        assert!(matches!(service.remove_item("p2").await, Err(ApiError::Conflict { .. })));
        assert_eq!(service.cart(), Some(before.clone()));
        assert!(matches!(service.clear_cart().await, Err(ApiError::BusinessRule { .. })));
        assert_eq!(service.cart(), Some(before));
        assert_eq!(api.calls(), vec!["add p3", "update p1=9", "remove p2", "clear"]);
    }

    #[tokio::test]
    async fn test_failure_before_load_returns_to_unloaded() {
        let api = ScriptedCartApi::open(vec![Err(ApiError::Server)]);
        let service = CartService::new(api, session());
        assert!(service.add_to_cart(add("p1", 1, 5)).await.is_err());
        assert!(!service.is_loaded());
    }

    #[tokio::test]
    async fn test_missing_cart_becomes_empty() {
        let api = ScriptedCartApi::open(vec![Err(ApiError::from_response(404, r#"{"message":"Cart not found"}"#))]);
        let service = CartService::new(api, session());
        assert!(!service.is_loaded());
        let cart = service.get_cart().await.unwrap();
        assert_eq!(cart, Cart::empty_for("u1"));
        assert!(service.is_loaded());
        assert!(service.is_empty());
        assert_eq!(cart.status, CartStatus::Active);
    }

    #[tokio::test]
    async fn test_other_fetch_errors_propagate() {
        let api = ScriptedCartApi::open(vec![Err(ApiError::Forbidden)]);
        let service = CartService::new(api, session());
        assert_eq!(service.get_cart().await, Err(ApiError::Forbidden));
        assert!(!service.is_loaded());
    }

    #[tokio::test]
    async fn test_clear_yields_empty_cart_not_unloaded() {
        let api = ScriptedCartApi::open(vec![Ok(Cart::empty_for("ignored"))]);
        let service = CartService::new(api, session());
        service.update_local_cart(server_cart(vec![("p1", 2, 10)]));
        let cleared = service.clear_cart().await.unwrap();
        assert_eq!(cleared.user_id, "u1");
        assert!(cleared.items.is_empty());
        assert_eq!(cleared.total_items, 0);
        assert_eq!(cleared.cached_subtotal, Decimal::ZERO);
        assert_eq!(service.cart(), Some(cleared));
    }

    #[tokio::test]
    async fn test_zero_quantity_removes() {
        let api = ScriptedCartApi::open(vec![Ok(server_cart(vec![]))]);
        let service = CartService::new(api.clone(), session());
        service.update_local_cart(server_cart(vec![("p1", 2, 10)]));
        service.update_item_quantity("p1", 0).await.unwrap();
        assert_eq!(api.calls(), vec!["remove p1"]);
        assert!(service.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_request_touches_nothing() {
        let api = ScriptedCartApi::open(vec![]);
        let service = CartService::new(api.clone(), session());
        let err = service.add_to_cart(AddToCartRequest::new("p1", 0, "s1")).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput { .. }));
        assert!(api.calls().is_empty());
        assert!(!service.is_loaded());
    }

    #[tokio::test]
    async fn test_oversized_quantities_are_rejected_locally() {
        let api = ScriptedCartApi::open(vec![]);
        let service = CartService::new(api.clone(), session());
        service.update_local_cart(server_cart(vec![("p1", 2, 10)]));
        let before = service.cart();

        let err = service.add_to_cart(add("p1", u32::MAX, 10)).await.unwrap_err();
        assert_eq!(err, ApiError::InvalidInput { message: "Quantity must not exceed 9999".into(), fields: vec!["Quantity must not exceed 9999".into()] });
        assert!(matches!(service.update_item_quantity("p1", 10_000).await, Err(ApiError::InvalidInput { .. })));
        assert!(api.calls().is_empty());
        assert_eq!(service.cart(), before);
    }

    #[tokio::test]
    async fn test_overlapping_mutations_do_not_clobber() {
        let initial = server_cart(vec![("p1", 1, 10)]);
        let after_update = server_cart(vec![("p1", 5, 10)]);
        let api = ScriptedCartApi::gated(vec![Err(ApiError::Server), Ok(after_update.clone())]);
        let service = Arc::new(CartService::new(api.clone(), session()));
        service.update_local_cart(initial.clone());
        let mut rx = service.watch();

        let first = Arc::clone(&service);
        let adding = tokio::spawn(async move { first.add_to_cart(add("p2", 1, 3)).await });
        rx.changed().await.unwrap();
        assert_eq!(service.item_count(), 2);

        let second = Arc::clone(&service);
        let updating = tokio::spawn(async move { second.update_item_quantity("p1", 5).await });
        tokio::task::yield_now().await;
        assert_eq!(api.calls(), vec!["add p2"], "second mutation waits for the first");

        api.gate.add_permits(2);
        assert_eq!(adding.await.unwrap(), Err(ApiError::Server));
        assert_eq!(updating.await.unwrap(), Ok(after_update.clone()));
        assert_eq!(service.cart(), Some(after_update));
    }

    #[tokio::test]
    async fn test_reset_during_failed_mutation_stays_unloaded() {
        let api = ScriptedCartApi::gated(vec![Err(ApiError::Server)]);
        let service = Arc::new(CartService::new(api.clone(), session()));
        service.update_local_cart(server_cart(vec![("p1", 1, 10)]));
        let mut rx = service.watch();

        let worker = Arc::clone(&service);
        let adding = tokio::spawn(async move { worker.add_to_cart(add("p2", 1, 3)).await });
        rx.changed().await.unwrap();
        service.reset_cart();

        api.gate.add_permits(1);
        assert_eq!(adding.await.unwrap(), Err(ApiError::Server));
        assert!(!service.is_loaded());
        assert_eq!(service.cart(), None);
    }

    #[tokio::test]
    async fn test_direct_writes_win_over_late_server_answer() {
        let api = ScriptedCartApi::gated(vec![Ok(server_cart(vec![("p1", 2, 10)])), Ok(server_cart(vec![("p2", 1, 3)]))]);
        let service = Arc::new(CartService::new(api.clone(), session()));
        let mut rx = service.watch();

        let worker = Arc::clone(&service);
        let adding = tokio::spawn(async move { worker.add_to_cart(add("p1", 2, 10)).await });
        rx.changed().await.unwrap();
        service.reset_cart();
        api.gate.add_permits(1);
        assert!(adding.await.unwrap().is_ok(), "the caller still gets the server's answer");
        assert!(!service.is_loaded());

        let local = server_cart(vec![("p9", 4, 1)]);
        rx.borrow_and_update();
        let worker = Arc::clone(&service);
        let adding = tokio::spawn(async move { worker.add_to_cart(add("p2", 1, 3)).await });
        rx.changed().await.unwrap();
        service.update_local_cart(local.clone());
        api.gate.add_permits(1);
        assert!(adding.await.unwrap().is_ok());
        assert_eq!(service.cart(), Some(local));
    }

    #[tokio::test]
    async fn test_badge_view_tracks_cache() {
        let api = ScriptedCartApi::open(vec![]);
        let service = CartService::new(api, session());
        let mut badge = service.item_count_view();
        assert_eq!(badge.get(), 0);
        service.update_local_cart(server_cart(vec![("p1", 3, 1)]));
        assert_eq!(badge.changed().await, Some(3));
        service.reset_cart();
        assert_eq!(badge.changed().await, Some(0));
    }
}
