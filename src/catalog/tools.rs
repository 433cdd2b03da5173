//! User creation tools
//!
//! `create-user` stores operator-supplied fields. `create-random-user` asks
//! the connected client to fabricate a user through sampling and stores the
//! result.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{Result, UserbaseError};
use crate::mcp::protocol::{CreateMessageParams, Message, ToolAnnotations, ToolDescriptor};
use crate::mcp::registry::{RequestContext, ToolHandler};
use crate::mcp::schema::{FieldType, InputSchema};
use crate::mcp::ToolCallResult;
use crate::storage::UserStore;
use crate::types::NewUser;

pub const CREATE_USER: &str = "create-user";
pub const CREATE_RANDOM_USER: &str = "create-random-user";

/// Text returned when the store could not be written
pub const SAVE_FAILED: &str = "Failed to save user";
/// Text returned when sampling produced nothing usable
pub const GENERATE_FAILED: &str = "Failed to generate user data";

/// Sampling instruction for `create-random-user`
pub const RANDOM_USER_REQUEST: &str = "Generate fake user data. The user should have a realistic name, email, address, and phone number. Return this data as a JSON object with no other text or formatter so it can be used with JSON.parse.";

const RANDOM_USER_MAX_TOKENS: u32 = 1024;

pub fn user_schema() -> InputSchema {
    InputSchema::new()
        .required("name", FieldType::String, "The user's full name")
        .required("email", FieldType::String, "The user's email address")
        .required("address", FieldType::String, "The user's postal address")
        .required("phone", FieldType::String, "The user's phone number")
}

pub fn create_user_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: CREATE_USER.to_string(),
        title: None,
        description: "Create a new user in the database".to_string(),
        input_schema: Value::Null,
        annotations: Some(ToolAnnotations {
            title: Some("Create User".to_string()),
            read_only_hint: Some(false),
            destructive_hint: Some(false),
            idempotent_hint: Some(false),
            open_world_hint: Some(true),
        }),
    }
}

pub fn create_random_user_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: CREATE_RANDOM_USER.to_string(),
        title: None,
        description: "Create a random user with fake data".to_string(),
        input_schema: Value::Null,
        annotations: Some(ToolAnnotations {
            title: Some("Create Random User".to_string()),
            read_only_hint: Some(false),
            destructive_hint: Some(false),
            idempotent_hint: Some(false),
            open_world_hint: Some(true),
        }),
    }
}

/// Store a user and report the outcome as tool text
async fn save_user(store: &UserStore, user: NewUser) -> ToolCallResult {
    match store.create(user).await {
        Ok(user) => ToolCallResult::text(format!("User {} created successfully", user.id)),
        Err(e) => {
            tracing::error!("Failed to save user: {}", e);
            ToolCallResult::text(SAVE_FAILED)
        }
    }
}

pub struct CreateUser {
    store: UserStore,
}

impl CreateUser {
    pub fn new(store: UserStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ToolHandler for CreateUser {
    async fn call(&self, _ctx: &RequestContext, args: Map<String, Value>) -> ToolCallResult {
        match serde_json::from_value::<NewUser>(Value::Object(args)) {
            Ok(user) => save_user(&self.store, user).await,
            Err(e) => {
                tracing::error!("Unreadable user arguments: {}", e);
                ToolCallResult::text(SAVE_FAILED)
            }
        }
    }
}

pub struct CreateRandomUser {
    store: UserStore,
}

impl CreateRandomUser {
    pub fn new(store: UserStore) -> Self {
        Self { store }
    }

    async fn generate(&self, ctx: &RequestContext) -> Result<NewUser> {
        let params = CreateMessageParams {
            messages: vec![Message::user_text(RANDOM_USER_REQUEST)],
            max_tokens: RANDOM_USER_MAX_TOKENS,
            system_prompt: None,
        };
        let reply = ctx.create_message(&params).await?;
        let text = reply.content.as_text().ok_or_else(|| {
            UserbaseError::Generation("sampling reply carried no text".to_string())
        })?;
        parse_generated_user(text)
    }
}

#[async_trait]
impl ToolHandler for CreateRandomUser {
    async fn call(&self, ctx: &RequestContext, _args: Map<String, Value>) -> ToolCallResult {
        match self.generate(ctx).await {
            Ok(user) => save_user(&self.store, user).await,
            Err(e) => {
                tracing::warn!("Random user generation failed: {}", e);
                ToolCallResult::text(GENERATE_FAILED)
            }
        }
    }
}

/// Remove a surrounding markdown code fence (```` ```json ```` or ```` ``` ````), if any
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Parse a sampling reply into user fields
pub fn parse_generated_user(text: &str) -> Result<NewUser> {
    serde_json::from_str(strip_code_fences(text))
        .map_err(|e| UserbaseError::Generation(format!("generated user is not valid JSON: {}", e)))
}
