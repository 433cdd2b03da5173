//! The server's capability catalog over the user store

pub mod prompts;
pub mod resources;
pub mod tools;

use std::collections::HashMap;

use crate::error::Result;
use crate::mcp::protocol::Implementation;
use crate::mcp::CapabilityRegistry;
use crate::storage::UserStore;

/// Identity reported in the `initialize` handshake
pub fn server_info() -> Implementation {
    Implementation {
        name: "userbase".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// Register every tool, resource and prompt backed by `store`
pub fn build_registry(store: UserStore) -> Result<CapabilityRegistry> {
    let mut registry = CapabilityRegistry::new();

    registry.register_resource(
        resources::all_users_descriptor(),
        resources::AllUsers::new(store.clone()),
    )?;
    registry.register_resource_template(
        resources::user_profile_descriptor(),
        resources::UserProfile::new(store.clone()),
    )?;

    registry.register_tool(
        tools::create_user_descriptor(),
        tools::user_schema(),
        tools::CreateUser::new(store.clone()),
    )?;
    registry.register_tool(
        tools::create_random_user_descriptor(),
        crate::mcp::InputSchema::new(),
        tools::CreateRandomUser::new(store),
    )?;

    registry.register_prompt(
        prompts::generate_fake_user_descriptor(),
        HashMap::new(),
        prompts::generate_fake_user,
    )?;
    registry.register_prompt(
        prompts::welcome_new_hire_descriptor(),
        prompts::welcome_new_hire_completers(),
        prompts::welcome_new_hire,
    )?;

    Ok(registry)
}
