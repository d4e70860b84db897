//! Domain model shared by the client services and the mock backend.

pub mod aggregates;
pub mod value_objects;

pub use aggregates::*;
pub use value_objects::{now, Role, ShippingAddress, Timestamp};
