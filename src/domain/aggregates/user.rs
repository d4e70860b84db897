//! User profile as returned by the user service.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Role;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), name: name.into(), email: email.into(), role, avatar: None }
    }

    pub fn is_seller(&self) -> bool { self.role == Role::Seller }
}
