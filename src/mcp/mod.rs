//! MCP (Model Context Protocol) implementation
//!
//! JSON-RPC over stdio, served in both directions: the client calls tools,
//! resources and prompts; the server calls back for sampling.

pub mod client;
pub mod peer;
pub mod protocol;
pub mod registry;
pub mod schema;
pub mod server;
pub mod uri;

pub use client::{Catalog, McpClient};
pub use peer::{McpHandler, Peer};
pub use protocol::{
    methods, Content, InitializeResult, McpRequest, McpResponse, Message, Role, ToolCallResult,
};
pub use registry::{CapabilityRegistry, Completer, RequestContext};
pub use schema::{FieldType, InputSchema, SchemaError};
pub use server::McpServer;
