//! MCP server: routes inbound requests to the capability registry

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;

use super::peer::{McpHandler, Peer};
use super::protocol::{
    methods, CallToolParams, CompleteParams, GetPromptParams, Implementation, InitializeParams,
    InitializeResult, McpRequest, McpResponse, ReadResourceParams,
};
use super::registry::{CapabilityRegistry, RequestContext};
use crate::error::{Result, UserbaseError};

/// MCP server over a duplex channel
pub struct McpServer {
    registry: CapabilityRegistry,
    info: Implementation,
}

impl McpServer {
    pub fn new(registry: CapabilityRegistry, info: Implementation) -> Self {
        Self { registry, info }
    }

    /// Serve on stdin/stdout until the client hangs up
    pub async fn run(self) -> Result<()> {
        let (_peer, task) = self.serve(tokio::io::stdin(), tokio::io::stdout());
        task.await
            .map_err(|e| UserbaseError::Internal(format!("server task failed: {}", e)))
    }

    /// Serve on an arbitrary reader/writer pair
    pub fn serve<R, W>(self, reader: R, writer: W) -> (Peer, JoinHandle<()>)
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Peer::spawn(reader, writer, Arc::new(self))
    }

    async fn dispatch(&self, peer: &Peer, request: &McpRequest) -> Result<Value> {
        match request.method.as_str() {
            methods::INITIALIZE => {
                let params: InitializeParams = request.parse_params()?;
                tracing::info!(
                    client = %params.client_info.name,
                    version = %params.client_info.version,
                    sampling = params.capabilities.sampling.is_some(),
                    "Client connected"
                );
                Ok(json!(InitializeResult::new(self.info.clone())))
            }
            methods::PING => Ok(json!({})),
            methods::LIST_TOOLS => Ok(json!(self.registry.list_tools())),
            methods::CALL_TOOL => {
                let params: CallToolParams = request.parse_params()?;
                let ctx = RequestContext::new(peer.clone());
                Ok(json!(self.registry.call_tool(&ctx, params).await?))
            }
            methods::LIST_RESOURCES => Ok(json!(self.registry.list_resources())),
            methods::LIST_RESOURCE_TEMPLATES => {
                Ok(json!(self.registry.list_resource_templates()))
            }
            methods::READ_RESOURCE => {
                let params: ReadResourceParams = request.parse_params()?;
                Ok(json!(self.registry.read_resource(&params.uri).await?))
            }
            methods::LIST_PROMPTS => Ok(json!(self.registry.list_prompts())),
            methods::GET_PROMPT => {
                let params: GetPromptParams = request.parse_params()?;
                Ok(json!(self.registry.get_prompt(params)?))
            }
            methods::COMPLETE => {
                let params: CompleteParams = request.parse_params()?;
                Ok(json!(self.registry.complete(&params)))
            }
            other => Err(UserbaseError::MethodNotFound(other.to_string())),
        }
    }
}

#[async_trait]
impl McpHandler for McpServer {
    async fn handle_request(&self, peer: &Peer, request: McpRequest) -> McpResponse {
        match self.dispatch(peer, &request).await {
            Ok(result) => McpResponse::success(request.id, result),
            Err(e) => {
                tracing::warn!(method = %request.method, "Request failed: {}", e);
                McpResponse::from_error(request.id, e)
            }
        }
    }

    async fn handle_notification(&self, _peer: &Peer, notification: McpRequest) {
        match notification.method.as_str() {
            methods::INITIALIZED => tracing::info!("Client initialized"),
            other => tracing::debug!(method = other, "Ignoring notification"),
        }
    }
}
