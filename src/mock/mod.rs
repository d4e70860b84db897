//! In-memory backend serving the storefront REST contract.
//!
//! Enough of the cart, order, product and user services to develop and test
//! the client without the real stack. The caller is whoever `X-User-Id`
//! names, then the bearer token, then the seeded client.

pub mod seed;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::Duration;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::api::USER_ID_HEADER;
use crate::domain::{
    self, now, AddToCartRequest, BuyerStats, Cart, CategoryShare, CheckoutRequest, MonthlyRevenue, Order, OrderItem,
    OrderStatus, OrderStatusHistory, PagedResponse, Product, ProductCount, ProductRequest, ProductRevenue, Role,
    SellerStats, ShippingAddress, User, MAX_LINE_QUANTITY,
};
use crate::validation;

#[derive(Debug, Default)]
pub struct Db {
    pub users: Vec<User>,
    pub products: Vec<Product>,
    /// Active cart per user id.
    pub carts: HashMap<String, Cart>,
    pub orders: Vec<Order>,
}

#[derive(Clone, Default)]
pub struct MockState {
    db: Arc<RwLock<Db>>,
}

impl MockState {
    pub fn new(seeded: bool) -> Self {
        let mut db = Db::default();
        if seeded {
            seed::populate(&mut db);
        }
        Self { db: Arc::new(RwLock::new(db)) }
    }

    pub fn db(&self) -> &Arc<RwLock<Db>> { &self.db }
}

type Failure = (StatusCode, Json<Value>);
type Reply<T> = Result<T, Failure>;

fn fail(status: StatusCode, message: impl Into<String>) -> Failure {
    (status, Json(json!({ "message": message.into() })))
}

fn validated<T: Validate>(value: &T) -> Reply<()> {
    value.validate().map_err(|errors| {
        let fields = validation::field_messages(&errors);
        let message = fields.first().cloned().unwrap_or_else(|| "Validation failed".to_string());
        (StatusCode::BAD_REQUEST, Json(json!({ "message": message, "details": fields })))
    })
}

fn caller(headers: &HeaderMap) -> String {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty());
    header(USER_ID_HEADER)
        .or_else(|| header("authorization").and_then(|v| v.strip_prefix("Bearer ")))
        .unwrap_or(seed::CLIENT_ID)
        .to_string()
}

pub fn router(state: MockState) -> Router {
    let api = Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/categories", get(list_categories))
        .route("/products/search", get(search_products))
        .route("/products/:id", get(get_product).put(update_product).delete(delete_product))
        .route("/users/:id", get(get_user))
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_cart_item))
        .route("/cart/items/:product_id", patch(update_cart_item).delete(remove_cart_item))
        .route("/orders/checkout", post(checkout))
        .route("/orders/my-orders", get(my_orders))
        .route("/orders/seller", get(seller_orders))
        .route("/orders/stats/buyer", get(buyer_stats))
        .route("/orders/stats/seller", get(seller_stats))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/cancel", patch(cancel_order))
        .route("/orders/:id/redo", post(redo_order));

    Router::new()
        .route("/health", get(|| async { Json(json!({"status": "healthy", "service": "buy01-mock-api"})) }))
        .nest("/api", api)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: MockState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock API listening");
    }
    axum::serve(listener, router(state)).await
}

// ---------------------------------------------------------------- products

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    q: Option<String>,
    category: Option<String>,
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
    page: Option<u32>,
    size: Option<u32>,
    sort: Option<String>,
    direction: Option<String>,
}

async fn list_products(State(s): State<MockState>) -> Json<Vec<Product>> {
    Json(s.db.read().await.products.clone())
}

async fn list_categories(State(s): State<MockState>) -> Json<Vec<String>> {
    let db = s.db.read().await;
    let categories: BTreeSet<String> = db.products.iter().filter_map(|p| p.category.clone()).collect();
    Json(categories.into_iter().collect())
}

async fn search_products(State(s): State<MockState>, Query(p): Query<SearchParams>) -> Json<PagedResponse<Product>> {
    let db = s.db.read().await;
    let keyword = p.q.as_deref().map(str::to_lowercase).filter(|k| !k.is_empty());
    let mut hits: Vec<Product> = db
        .products
        .iter()
        .filter(|prod| {
            keyword.as_ref().map_or(true, |k| {
                prod.name.to_lowercase().contains(k) || prod.description.to_lowercase().contains(k)
            })
        })
        .filter(|prod| {
            p.category.as_deref().map_or(true, |c| prod.category.as_deref().is_some_and(|pc| pc.eq_ignore_ascii_case(c)))
        })
        .filter(|prod| p.min_price.map_or(true, |min| prod.price >= min))
        .filter(|prod| p.max_price.map_or(true, |max| prod.price <= max))
        .cloned()
        .collect();
    match p.sort.as_deref() {
        Some("price") => hits.sort_by(|a, b| a.price.cmp(&b.price)),
        Some("name") => hits.sort_by(|a, b| a.name.cmp(&b.name)),
        Some("createdAt") => hits.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        _ => {}
    }
    if p.direction.as_deref().is_some_and(|d| d.eq_ignore_ascii_case("desc")) {
        hits.reverse();
    }
    Json(PagedResponse::paginate(&hits, p.page.unwrap_or(0), p.size.unwrap_or(20)))
}

async fn get_product(State(s): State<MockState>, Path(id): Path<String>) -> Reply<Json<Product>> {
    let db = s.db.read().await;
    db.products.iter().find(|p| p.id == id).cloned().map(Json).ok_or_else(|| fail(StatusCode::NOT_FOUND, "Product not found"))
}

async fn create_product(
    State(s): State<MockState>,
    headers: HeaderMap,
    Json(r): Json<ProductRequest>,
) -> Reply<(StatusCode, Json<Product>)> {
    validated(&r)?;
    let seller = caller(&headers);
    let mut db = s.db.write().await;
    if !db.users.iter().any(|u| u.id == seller && u.is_seller()) {
        return Err(fail(StatusCode::FORBIDDEN, "Only sellers can create products"));
    }
    let stamp = now();
    let product = Product {
        id: Uuid::now_v7().to_string(),
        name: r.name,
        description: r.description,
        price: r.price,
        stock: Some(r.quantity),
        seller_id: Some(seller),
        category: r.category,
        media_ids: vec![],
        image_urls: vec![],
        created_at: Some(stamp),
        updated_at: Some(stamp),
    };
    db.products.push(product.clone());
    Ok((StatusCode::CREATED, Json(product)))
}

fn owned_product<'a>(db: &'a mut Db, id: &str, seller: &str) -> Reply<&'a mut Product> {
    let product = db.products.iter_mut().find(|p| p.id == id).ok_or_else(|| fail(StatusCode::NOT_FOUND, "Product not found"))?;
    if !product.is_sold_by(seller) {
        return Err(fail(StatusCode::FORBIDDEN, "You can only modify your own products"));
    }
    Ok(product)
}

async fn update_product(
    State(s): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(r): Json<ProductRequest>,
) -> Reply<Json<Product>> {
    validated(&r)?;
    let mut db = s.db.write().await;
    let product = owned_product(&mut db, &id, &caller(&headers))?;
    product.name = r.name;
    product.description = r.description;
    product.price = r.price;
    product.stock = Some(r.quantity);
    product.category = r.category;
    product.updated_at = Some(now());
    Ok(Json(product.clone()))
}

async fn delete_product(State(s): State<MockState>, headers: HeaderMap, Path(id): Path<String>) -> Reply<StatusCode> {
    let mut db = s.db.write().await;
    owned_product(&mut db, &id, &caller(&headers))?;
    db.products.retain(|p| p.id != id);
    Ok(StatusCode::NO_CONTENT)
}

async fn get_user(State(s): State<MockState>, Path(id): Path<String>) -> Reply<Json<User>> {
    let db = s.db.read().await;
    db.users.iter().find(|u| u.id == id).cloned().map(Json).ok_or_else(|| fail(StatusCode::NOT_FOUND, "User not found"))
}

// -------------------------------------------------------------------- cart

#[derive(Debug, Deserialize)]
struct QuantityBody {
    quantity: i64,
}

fn not_enough(available: u32) -> Failure {
    fail(StatusCode::BAD_REQUEST, format!("Not enough stock. Available: {available}"))
}

fn new_cart(user_id: &str) -> Cart {
    let stamp = now();
    Cart { id: Some(Uuid::new_v4().to_string()), created_at: Some(stamp), updated_at: Some(stamp), ..Cart::empty_for(user_id) }
}

fn touched(cart: Cart) -> Cart { Cart { updated_at: Some(now()), ..cart } }

async fn get_cart(State(s): State<MockState>, headers: HeaderMap) -> Reply<Json<Cart>> {
    let db = s.db.read().await;
    db.carts.get(&caller(&headers)).cloned().map(Json).ok_or_else(|| fail(StatusCode::NOT_FOUND, "Cart not found"))
}

/// Display fields and seller always come from the live product.
async fn add_cart_item(
    State(s): State<MockState>,
    headers: HeaderMap,
    Json(r): Json<AddToCartRequest>,
) -> Reply<Json<Cart>> {
    validated(&r)?;
    let user = caller(&headers);
    let mut guard = s.db.write().await;
    let db = &mut *guard;
    let product = db.products.iter().find(|p| p.id == r.product_id).ok_or_else(|| fail(StatusCode::NOT_FOUND, "Product not found"))?;
    let in_cart = db.carts.get(&user).and_then(|c| c.find_item(&r.product_id)).map_or(0, |i| i.quantity);
    if let Some(stock) = product.stock.filter(|stock| in_cart.saturating_add(r.quantity) > *stock) {
        return Err(not_enough(stock));
    }
    let request = AddToCartRequest {
        seller_id: product.seller_id.clone().unwrap_or_else(|| r.seller_id.clone()),
        ..r.clone()
    }
    .with_display(product.name.clone(), product.price);
    let cart = db.carts.entry(user).or_insert_with_key(|user| new_cart(user));
    *cart = touched(cart.with_item_added(&request));
    Ok(Json(cart.clone()))
}

/// A quantity of zero or less removes the line.
async fn update_cart_item(
    State(s): State<MockState>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
    Json(body): Json<QuantityBody>,
) -> Reply<Json<Cart>> {
    let mut guard = s.db.write().await;
    let db = &mut *guard;
    let cart = db.carts.get_mut(&caller(&headers)).ok_or_else(|| fail(StatusCode::NOT_FOUND, "Cart not found"))?;
    let next = if body.quantity <= 0 {
        cart.without_item(&product_id)
    } else {
        let quantity = u32::try_from(body.quantity)
            .ok()
            .filter(|quantity| *quantity <= MAX_LINE_QUANTITY)
            .ok_or_else(|| fail(StatusCode::BAD_REQUEST, format!("Quantity must not exceed {MAX_LINE_QUANTITY}")))?;
        let stock = db.products.iter().find(|p| p.id == product_id).and_then(|p| p.stock);
        if let Some(stock) = stock.filter(|stock| quantity > *stock) {
            return Err(not_enough(stock));
        }
        cart.with_quantity(&product_id, quantity)
    };
    *cart = touched(next);
    Ok(Json(cart.clone()))
}

async fn remove_cart_item(
    State(s): State<MockState>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> Reply<Json<Cart>> {
    let mut db = s.db.write().await;
    let cart = db.carts.get_mut(&caller(&headers)).ok_or_else(|| fail(StatusCode::NOT_FOUND, "Cart not found"))?;
    *cart = touched(cart.without_item(&product_id));
    Ok(Json(cart.clone()))
}

async fn clear_cart(State(s): State<MockState>, headers: HeaderMap) -> StatusCode {
    s.db.write().await.carts.remove(&caller(&headers));
    StatusCode::NO_CONTENT
}

// ------------------------------------------------------------------ orders

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyOrdersParams {
    status: Option<OrderStatus>,
    keyword: Option<String>,
    date_from: Option<String>,
    date_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StatusParam {
    status: Option<OrderStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct ReasonParam {
    reason: Option<String>,
}

enum Shortage {
    Missing,
    Stock { name: String, available: u32 },
}

/// Order lines at today's catalog prices.
fn price_items(products: &[Product], users: &[User], wanted: &[(String, u32)]) -> Result<Vec<OrderItem>, Shortage> {
    wanted
        .iter()
        .map(|(product_id, quantity)| {
            let product = products.iter().find(|p| &p.id == product_id).ok_or(Shortage::Missing)?;
            if let Some(available) = product.stock.filter(|stock| quantity > stock) {
                return Err(Shortage::Stock { name: product.name.clone(), available });
            }
            let seller_id = product.seller_id.clone().unwrap_or_default();
            Ok(OrderItem {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                product_description: Some(product.description.clone()),
                price_at_purchase: product.price,
                quantity: *quantity,
                subtotal: product.price * Decimal::from(*quantity),
                seller_name: users.iter().find(|u| u.id == seller_id).map(|u| u.name.clone()),
                seller_id,
                thumbnail_media_id: product.media_ids.first().cloned(),
            })
        })
        .collect()
}

fn take_stock(products: &mut [Product], items: &[OrderItem]) {
    for item in items {
        if let Some(stock) = products.iter_mut().find(|p| p.id == item.product_id).and_then(|p| p.stock.as_mut()) {
            *stock = stock.saturating_sub(item.quantity);
        }
    }
}

fn restock(products: &mut [Product], items: &[OrderItem]) {
    for item in items {
        if let Some(stock) = products.iter_mut().find(|p| p.id == item.product_id).and_then(|p| p.stock.as_mut()) {
            *stock = stock.saturating_add(item.quantity);
        }
    }
}

fn order_number() -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..5].to_uppercase();
    format!("ORD-{}-{suffix}", now().format("%Y%m%d"))
}

struct Placement {
    address: Option<ShippingAddress>,
    delivery_notes: Option<String>,
    payment_method: String,
    original_order_id: Option<String>,
    reason: String,
}

fn place(buyer_id: &str, users: &[User], items: Vec<OrderItem>, placement: Placement) -> Order {
    let stamp = now();
    let buyer = users.iter().find(|u| u.id == buyer_id);
    let subtotal: Decimal = items.iter().map(|i| i.subtotal).sum();
    Order {
        id: Uuid::now_v7().to_string(),
        order_number: order_number(),
        buyer_id: buyer_id.to_string(),
        buyer_name: buyer.map(|u| u.name.clone()),
        buyer_email: buyer.map(|u| u.email.clone()),
        items,
        subtotal,
        shipping_cost: Decimal::ZERO,
        tax_amount: Decimal::ZERO,
        discount_amount: Decimal::ZERO,
        total_amount: subtotal,
        payment_method: placement.payment_method,
        payment_status: Some("PAID".to_string()),
        shipping_address: placement.address,
        delivery_notes: placement.delivery_notes,
        status: OrderStatus::Confirmed,
        status_history: vec![OrderStatusHistory {
            previous_status: None,
            new_status: OrderStatus::Confirmed,
            changed_at: stamp,
            changed_by: buyer_id.to_string(),
            changed_by_role: Some(Role::Client),
            reason: Some(placement.reason),
        }],
        estimated_delivery_date: Some(stamp + Duration::days(7)),
        actual_delivery_date: None,
        original_order_id: placement.original_order_id,
        created_at: Some(stamp),
        updated_at: Some(stamp),
    }
}

async fn checkout(
    State(s): State<MockState>,
    headers: HeaderMap,
    Json(r): Json<CheckoutRequest>,
) -> Reply<(StatusCode, Json<Order>)> {
    validated(&r)?;
    let buyer = caller(&headers);
    let mut guard = s.db.write().await;
    let db = &mut *guard;
    let cart = db.carts.get(&buyer).filter(|c| !c.is_empty()).ok_or_else(|| fail(StatusCode::BAD_REQUEST, "Cart is empty"))?;
    let wanted: Vec<(String, u32)> = cart.items.iter().map(|i| (i.product_id.clone(), i.quantity)).collect();
    let items = price_items(&db.products, &db.users, &wanted).map_err(|shortage| match shortage {
        Shortage::Missing => fail(StatusCode::NOT_FOUND, "Product not found"),
        Shortage::Stock { available, .. } => not_enough(available),
    })?;
    take_stock(&mut db.products, &items);
    let order = place(&buyer, &db.users, items, Placement {
        address: Some(r.shipping_address),
        delivery_notes: r.delivery_notes,
        payment_method: r.payment_method,
        original_order_id: None,
        reason: "Order placed".to_string(),
    });
    db.carts.remove(&buyer);
    db.orders.push(order.clone());
    info!(order_number = %order.order_number, buyer = %buyer, "checkout");
    Ok((StatusCode::CREATED, Json(order)))
}

fn parse_day(raw: &str) -> Reply<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| fail(StatusCode::BAD_REQUEST, format!("Invalid date: {raw}")))
}

async fn my_orders(
    State(s): State<MockState>,
    headers: HeaderMap,
    Query(p): Query<MyOrdersParams>,
) -> Reply<Json<Vec<Order>>> {
    let from = p.date_from.as_deref().map(parse_day).transpose()?;
    let to = p.date_to.as_deref().map(parse_day).transpose()?;
    let buyer = caller(&headers);
    let db = s.db.read().await;
    let own: Vec<Order> = db.orders.iter().filter(|o| o.buyer_id == buyer).cloned().collect();
    let mut orders: Vec<Order> = domain::filter_orders(&own, p.keyword.as_deref().unwrap_or(""), p.status)
        .into_iter()
        .filter(|o| {
            let day = o.created_at.map(|at| at.date());
            from.map_or(true, |from| day.is_some_and(|d| d >= from)) && to.map_or(true, |to| day.is_some_and(|d| d <= to))
        })
        .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(orders))
}

async fn seller_orders(State(s): State<MockState>, headers: HeaderMap, Query(p): Query<StatusParam>) -> Json<Value> {
    let seller = caller(&headers);
    let db = s.db.read().await;
    let mut orders: Vec<&Order> = db
        .orders
        .iter()
        .filter(|o| o.contains_seller(&seller) && p.status.map_or(true, |s| o.status == s))
        .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(json!({ "content": orders, "totalElements": orders.len() }))
}

async fn get_order(State(s): State<MockState>, headers: HeaderMap, Path(id): Path<String>) -> Reply<Json<Order>> {
    let user = caller(&headers);
    let db = s.db.read().await;
    let order = find_order(&db.orders, &id)?;
    if order.buyer_id != user && !order.contains_seller(&user) {
        return Err(fail(StatusCode::FORBIDDEN, "You don't have permission to view this order"));
    }
    Ok(Json(order.clone()))
}

fn find_order<'a>(orders: &'a [Order], id: &str) -> Reply<&'a Order> {
    orders.iter().find(|o| o.id == id).ok_or_else(|| fail(StatusCode::NOT_FOUND, format!("Order not found with id: {id}")))
}

async fn cancel_order(
    State(s): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(p): Query<ReasonParam>,
) -> Reply<Json<Order>> {
    let user = caller(&headers);
    let mut guard = s.db.write().await;
    let db = &mut *guard;
    let order = db
        .orders
        .iter_mut()
        .find(|o| o.id == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, format!("Order not found with id: {id}")))?;
    if order.buyer_id != user {
        return Err(fail(StatusCode::FORBIDDEN, "Only the buyer can cancel this order"));
    }
    if !order.status.is_cancellable() {
        return Err(fail(StatusCode::CONFLICT, format!("Cannot cancel order with status: {}", order.status)));
    }
    let stamp = now();
    order.status_history.push(OrderStatusHistory {
        previous_status: Some(order.status),
        new_status: OrderStatus::Cancelled,
        changed_at: stamp,
        changed_by: user,
        changed_by_role: Some(Role::Client),
        reason: p.reason,
    });
    order.status = OrderStatus::Cancelled;
    order.updated_at = Some(stamp);
    restock(&mut db.products, &order.items);
    Ok(Json(order.clone()))
}

async fn redo_order(
    State(s): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply<(StatusCode, Json<Order>)> {
    let user = caller(&headers);
    let mut guard = s.db.write().await;
    let db = &mut *guard;
    let original = find_order(&db.orders, &id)?;
    if original.buyer_id != user {
        return Err(fail(StatusCode::FORBIDDEN, "You can only redo your own orders"));
    }
    if original.status != OrderStatus::Cancelled {
        return Err(fail(StatusCode::CONFLICT, "Can only redo cancelled orders"));
    }
    let wanted: Vec<(String, u32)> = original.items.iter().map(|i| (i.product_id.clone(), i.quantity)).collect();
    let items = price_items(&db.products, &db.users, &wanted).map_err(|shortage| {
        let name = match shortage {
            Shortage::Missing => "unknown".to_string(),
            Shortage::Stock { name, .. } => name,
        };
        fail(StatusCode::CONFLICT, format!("Product '{name}' is no longer available or has insufficient stock"))
    })?;
    let placement = Placement {
        address: original.shipping_address.clone(),
        delivery_notes: original.delivery_notes.clone(),
        payment_method: original.payment_method.clone(),
        original_order_id: Some(original.id.clone()),
        reason: format!("Order redone from cancelled order {}", original.order_number),
    };
    take_stock(&mut db.products, &items);
    let order = place(&user, &db.users, items, placement);
    db.orders.push(order.clone());
    Ok((StatusCode::CREATED, Json(order)))
}

// ------------------------------------------------------------------- stats

fn round1(value: f64) -> f64 { (value * 10.0).round() / 10.0 }

async fn buyer_stats(State(s): State<MockState>, headers: HeaderMap) -> Json<BuyerStats> {
    let buyer = caller(&headers);
    let db = s.db.read().await;
    let orders: Vec<&Order> = db.orders.iter().filter(|o| o.buyer_id == buyer && o.status != OrderStatus::Cancelled).collect();

    let mut bought: BTreeMap<&str, u32> = BTreeMap::new();
    let mut by_category: BTreeMap<String, u32> = BTreeMap::new();
    for item in orders.iter().flat_map(|o| &o.items) {
        *bought.entry(item.product_name.as_str()).or_default() += item.quantity;
        let category = db
            .products
            .iter()
            .find(|p| p.id == item.product_id)
            .and_then(|p| p.category.clone())
            .unwrap_or_else(|| "Other".to_string());
        *by_category.entry(category).or_default() += item.quantity;
    }

    let mut most_bought: Vec<ProductCount> = bought.into_iter().map(|(name, count)| ProductCount { name: name.to_string(), count }).collect();
    most_bought.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    most_bought.truncate(5);

    let units: u32 = by_category.values().sum();
    let mut top_categories: Vec<CategoryShare> = by_category
        .into_iter()
        .map(|(name, count)| CategoryShare { name, percentage: round1(f64::from(count) * 100.0 / f64::from(units.max(1))) })
        .collect();
    top_categories.sort_by(|a, b| b.percentage.total_cmp(&a.percentage).then_with(|| a.name.cmp(&b.name)));

    Json(BuyerStats {
        total_spent: orders.iter().map(|o| o.total_amount).sum(),
        total_orders: orders.len() as u32,
        most_bought_products: most_bought,
        top_categories,
    })
}

async fn seller_stats(State(s): State<MockState>, headers: HeaderMap) -> Json<SellerStats> {
    let seller = caller(&headers);
    let db = s.db.read().await;
    let mut per_product: BTreeMap<&str, (Decimal, u32)> = BTreeMap::new();
    let mut per_month: BTreeMap<String, Decimal> = BTreeMap::new();
    for order in db.orders.iter().filter(|o| o.status != OrderStatus::Cancelled) {
        for item in order.items.iter().filter(|i| i.seller_id == seller) {
            let line = item.line_total();
            let entry = per_product.entry(item.product_name.as_str()).or_default();
            entry.0 += line;
            entry.1 += item.quantity;
            if let Some(at) = order.created_at {
                *per_month.entry(at.format("%Y-%m").to_string()).or_default() += line;
            }
        }
    }

    let mut best: Vec<ProductRevenue> =
        per_product.into_iter().map(|(name, (revenue, units))| ProductRevenue { name: name.to_string(), revenue, units }).collect();
    best.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.name.cmp(&b.name)));
    let total_revenue: Decimal = best.iter().map(|p| p.revenue).sum();
    let total_units_sold = best.iter().map(|p| p.units).sum();
    best.truncate(5);

    info!(seller = %seller, revenue = %total_revenue, "seller stats");
    Json(SellerStats {
        total_revenue,
        total_units_sold,
        best_selling_products: best,
        revenue_by_month: per_month.into_iter().map(|(month, amount)| MonthlyRevenue { month, amount }).collect(),
    })
}
