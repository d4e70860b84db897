use std::sync::Arc;
use tracing::instrument;

use crate::api::UserApi;
use crate::domain::User;
use crate::error::ApiResult;

/// Read-only access to user profiles.
pub struct UserService {
    api: Arc<dyn UserApi>,
}

impl UserService {
    pub fn new(api: Arc<dyn UserApi>) -> Self { Self { api } }

    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: &str) -> ApiResult<User> { self.api.get_user(user_id).await }
}
