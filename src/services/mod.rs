//! Per-domain services: each wraps one REST client and owns the cache its
//! views read from.

pub mod cart;
pub mod order;
pub mod product;
pub mod user;

pub use cart::CartService;
pub use order::OrderService;
pub use product::ProductService;
pub use user::UserService;

use crate::error::{ApiError, ApiResult};
use crate::session::Session;
use crate::store::Store;

/// Holds a loading flag up for as long as it lives.
pub(crate) struct LoadingGuard(Store<bool>);

impl LoadingGuard {
    pub(crate) fn start(flag: &Store<bool>) -> Self {
        flag.set(true);
        Self(flag.clone())
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) { self.0.set(false); }
}

/// Id of the logged-in user, for calls that are meaningless without one.
pub(crate) fn require_user(session: &Session) -> ApiResult<String> {
    session.current_user_id().ok_or(ApiError::NotAuthenticated)
}
