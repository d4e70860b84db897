//! Demo accounts, catalog and order history.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::Db;
use crate::domain::{Order, OrderItem, OrderStatus, Product, Role, Timestamp, User, PAY_ON_DELIVERY};

pub const CLIENT_ID: &str = "mock_client_id";
pub const SELLER_ID: &str = "mock_seller_id";

pub fn populate(db: &mut Db) {
    db.users = vec![
        User::new(CLIENT_ID, "John Client", "client@test.com", Role::Client),
        User::new(SELLER_ID, "Jane Seller", "seller@test.com", Role::Seller),
    ];
    db.products = vec![
        product("prod_1", "Nokia 3310", "Unbreakable phone. Classic blue color.", Decimal::new(1999, 2), 10, "Electronics"),
        product("prod_2", "Bazooka bubble gum 6 pack", "Not sure if safe to eat.", Decimal::new(99, 2), 20, "Food"),
        product(
            "prod_3",
            "Samsung 3.5 inch floppy disk",
            "Save your data on a disk. Safe, durable, ultrathin, and reliable. Nobody is going to steal it!",
            Decimal::new(259, 2),
            5,
            "Electronics",
        ),
    ];
    db.orders = vec![
        delivered("ord_1", "ORD-2024-001", &db.products[0], 1, at(2024, 1, 12)),
        delivered("ord_2", "ORD-2024-002", &db.products[1], 2, at(2024, 2, 3)),
        delivered("ord_3", "ORD-2024-003", &db.products[2], 1, at(2024, 2, 20)),
    ];
}

fn at(year: i32, month: u32, day: u32) -> Option<Timestamp> {
    NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_opt(12, 0, 0))
}

fn product(id: &str, name: &str, description: &str, price: Decimal, stock: u32, category: &str) -> Product {
    Product {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        price,
        stock: Some(stock),
        seller_id: Some(SELLER_ID.into()),
        category: Some(category.into()),
        media_ids: vec![],
        image_urls: vec![],
        created_at: at(2024, 1, 1),
        updated_at: at(2024, 1, 1),
    }
}

fn delivered(id: &str, number: &str, product: &Product, quantity: u32, placed: Option<Timestamp>) -> Order {
    let subtotal = product.price * Decimal::from(quantity);
    Order {
        id: id.into(),
        order_number: number.into(),
        buyer_id: CLIENT_ID.into(),
        buyer_name: Some("John Client".into()),
        buyer_email: Some("client@test.com".into()),
        items: vec![OrderItem {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            product_description: None,
            price_at_purchase: product.price,
            quantity,
            subtotal,
            seller_id: SELLER_ID.into(),
            seller_name: Some("Jane Seller".into()),
            thumbnail_media_id: None,
        }],
        subtotal,
        shipping_cost: Decimal::ZERO,
        tax_amount: Decimal::ZERO,
        discount_amount: Decimal::ZERO,
        total_amount: subtotal,
        payment_method: PAY_ON_DELIVERY.into(),
        payment_status: Some("PAID".into()),
        shipping_address: None,
        delivery_notes: None,
        status: OrderStatus::Delivered,
        status_history: vec![],
        estimated_delivery_date: None,
        actual_delivery_date: None,
        original_order_id: None,
        created_at: placed,
        updated_at: placed,
    }
}
