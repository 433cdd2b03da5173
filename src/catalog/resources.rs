//! User resources: the full list and a per-user profile template

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;

use crate::error::Result;
use crate::mcp::protocol::{
    ReadResourceResult, ResourceContents, ResourceDescriptor, ResourceTemplateDescriptor,
};
use crate::mcp::registry::ResourceHandler;
use crate::storage::UserStore;
use crate::types::UserId;

pub const ALL_USERS_URI: &str = "users://all";
pub const USER_PROFILE_TEMPLATE: &str = "users://{userId}/profile";

const JSON_MIME: &str = "application/json";

pub fn all_users_descriptor() -> ResourceDescriptor {
    ResourceDescriptor {
        uri: ALL_USERS_URI.to_string(),
        name: "users".to_string(),
        description: Some("Get all users data from the database".to_string()),
        mime_type: Some(JSON_MIME.to_string()),
    }
}

pub fn user_profile_descriptor() -> ResourceTemplateDescriptor {
    ResourceTemplateDescriptor {
        uri_template: USER_PROFILE_TEMPLATE.to_string(),
        name: "user-details".to_string(),
        description: Some("Get a user's details from the database".to_string()),
        mime_type: Some(JSON_MIME.to_string()),
    }
}

pub struct AllUsers {
    store: UserStore,
}

impl AllUsers {
    pub fn new(store: UserStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResourceHandler for AllUsers {
    async fn read(&self, uri: &str, _params: &HashMap<String, String>) -> Result<ReadResourceResult> {
        let users = self.store.list().await?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::json(uri, serde_json::to_string(&users)?)],
        })
    }
}

pub struct UserProfile {
    store: UserStore,
}

impl UserProfile {
    pub fn new(store: UserStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResourceHandler for UserProfile {
    /// A missing or non-numeric id yields an error payload, not a protocol error
    async fn read(&self, uri: &str, params: &HashMap<String, String>) -> Result<ReadResourceResult> {
        let user = match params.get("userId").and_then(|id| id.parse::<UserId>().ok()) {
            Some(id) => self.store.get(id).await?,
            None => None,
        };
        let text = match user {
            Some(user) => serde_json::to_string(&user)?,
            None => json!({"error": "User not found"}).to_string(),
        };
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::json(uri, text)],
        })
    }
}
