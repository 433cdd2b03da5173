//! userbase - MCP client/server pair over a JSON user store
//!
//! The server exposes user tools, resources and prompts over stdio and calls
//! back into the client for sampling. The client discovers the catalog,
//! drives it from an interactive console, and answers sampling requests and
//! free-text queries with Gemini.

pub mod catalog;
pub mod console;
pub mod error;
pub mod genai;
pub mod mcp;
pub mod storage;
pub mod types;

pub use error::{Result, UserbaseError};
pub use storage::UserStore;
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
