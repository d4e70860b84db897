//! Aggregates module
pub mod cart;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{AddToCartRequest, Cart, CartItem, CartStatus, UpdateCartItemRequest, MAX_LINE_QUANTITY};
pub use order::{
    can_cancel, can_redo, filter_orders, BuyerStats, CategoryShare, CheckoutRequest, MonthlyRevenue,
    Order, OrderFilter, OrderItem, OrderStatus, OrderStatusHistory, ProductCount, ProductRevenue,
    SellerStats, PAY_ON_DELIVERY,
};
pub use product::{PagedResponse, Product, ProductRequest, ProductSearch};
pub use user::User;
