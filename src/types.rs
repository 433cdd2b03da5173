//! Core types for userbase

use serde::{Deserialize, Serialize};

/// Identifier of a stored user; assigned sequentially at insert time
pub type UserId = i64;

/// A user record as stored in the JSON database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub address: String,
    pub phone: String,
}

/// Input for creating a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub address: String,
    pub phone: String,
}

impl NewUser {
    /// Attach an id, producing the stored record
    pub fn with_id(self, id: UserId) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            address: self.address,
            phone: self.phone,
        }
    }
}
