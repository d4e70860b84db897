//! Authenticated user and bearer token for the current client.

use crate::domain::User;
use crate::store::Store;

#[derive(Clone, Debug, Default)]
pub struct Session {
    user: Store<Option<User>>,
    token: Store<Option<String>>,
}

impl Session {
    pub fn new() -> Self { Self::default() }

    pub fn login(&self, user: User, token: Option<String>) {
        tracing::info!(user_id = %user.id, role = %user.role, "session started");
        self.token.set(token);
        self.user.set(Some(user));
    }

    pub fn logout(&self) {
        if self.is_authenticated() {
            tracing::info!("session cleared");
        }
        self.token.set(None);
        self.user.set(None);
    }

    pub fn current_user(&self) -> Option<User> { self.user.get() }
    pub fn current_user_id(&self) -> Option<String> { self.user.with(|u| u.as_ref().map(|u| u.id.clone())) }
    pub fn token(&self) -> Option<String> { self.token.get() }
    pub fn is_authenticated(&self) -> bool { self.user.with(Option::is_some) }
    pub fn is_seller(&self) -> bool { self.user.with(|u| u.as_ref().is_some_and(User::is_seller)) }
}
