//! MCP client: spawns the server, performs the handshake, discovers the
//! catalogs and issues invocations. Inbound server requests (sampling) are
//! served by the handler passed at connect time.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use super::peer::{McpHandler, Peer};
use super::protocol::{
    methods, CallToolParams, ClientCapabilities, CompleteParams, CompleteResult, Completion,
    CompletionArgument, CompletionContext, CompletionReference, GetPromptParams, GetPromptResult,
    Implementation, InitializeParams, InitializeResult, ListPromptsResult,
    ListResourceTemplatesResult, ListResourcesResult, ListToolsResult, PromptDescriptor,
    ReadResourceParams, ReadResourceResult, ResourceDescriptor, ResourceTemplateDescriptor,
    ToolCallResult, ToolDescriptor, PROTOCOL_VERSION,
};
use super::uri;
use crate::error::{Result, UserbaseError};

/// Everything the server advertises, fetched once at startup
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub tools: Vec<ToolDescriptor>,
    pub prompts: Vec<PromptDescriptor>,
    pub resources: Vec<ResourceDescriptor>,
    pub resource_templates: Vec<ResourceTemplateDescriptor>,
}

pub struct McpClient {
    peer: Peer,
    reader: JoinHandle<()>,
    child: Option<Child>,
}

impl McpClient {
    /// Spawn `command` and speak MCP over its stdio
    pub async fn spawn<H: McpHandler>(
        command: &str,
        args: &[String],
        handler: Arc<H>,
    ) -> Result<Self> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                UserbaseError::Config(format!(
                    "failed to spawn MCP server (command='{}', args={:?}): {}",
                    command, args, e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| UserbaseError::Internal("failed to open server stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| UserbaseError::Internal("failed to open server stdout".into()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "userbase::server", "{}", line);
                }
            });
        }

        tracing::info!(command, "Spawned MCP server");
        let mut client = Self::connect(stdout, stdin, handler);
        client.child = Some(child);
        Ok(client)
    }

    /// Speak MCP over an already-open channel
    pub fn connect<R, W, H>(reader: R, writer: W, handler: Arc<H>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
        H: McpHandler,
    {
        let (peer, reader) = Peer::spawn(reader, writer, handler);
        Self {
            peer,
            reader,
            child: None,
        }
    }

    /// `initialize` handshake followed by `notifications/initialized`.
    /// Advertises the sampling capability.
    pub async fn initialize(&self, client_info: Implementation) -> Result<InitializeResult> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities {
                sampling: Some(json!({})),
            },
            client_info,
        };
        let result: InitializeResult = self
            .peer
            .request_typed(methods::INITIALIZE, &params)
            .await?;
        self.peer.notify(methods::INITIALIZED, json!({})).await?;
        tracing::info!(
            server = %result.server_info.name,
            version = %result.server_info.version,
            "Connected"
        );
        Ok(result)
    }

    /// Fetch the four catalogs concurrently; any failure fails the whole batch
    pub async fn discover(&self) -> Result<Catalog> {
        let (tools, prompts, resources, templates) = tokio::try_join!(
            self.list_tools(),
            self.list_prompts(),
            self.list_resources(),
            self.list_resource_templates(),
        )?;
        Ok(Catalog {
            tools: tools.tools,
            prompts: prompts.prompts,
            resources: resources.resources,
            resource_templates: templates.resource_templates,
        })
    }

    pub async fn list_tools(&self) -> Result<ListToolsResult> {
        self.peer.request_typed(methods::LIST_TOOLS, &json!({})).await
    }

    pub async fn list_prompts(&self) -> Result<ListPromptsResult> {
        self.peer.request_typed(methods::LIST_PROMPTS, &json!({})).await
    }

    pub async fn list_resources(&self) -> Result<ListResourcesResult> {
        self.peer.request_typed(methods::LIST_RESOURCES, &json!({})).await
    }

    pub async fn list_resource_templates(&self) -> Result<ListResourceTemplatesResult> {
        self.peer
            .request_typed(methods::LIST_RESOURCE_TEMPLATES, &json!({}))
            .await
    }

    pub async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<ToolCallResult> {
        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        self.peer.request_typed(methods::CALL_TOOL, &params).await
    }

    /// Read a resource; a URI still carrying `{...}` is refused locally
    pub async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult> {
        uri::ensure_resolved(uri)?;
        let params = ReadResourceParams {
            uri: uri.to_string(),
        };
        self.peer.request_typed(methods::READ_RESOURCE, &params).await
    }

    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: HashMap<String, String>,
    ) -> Result<GetPromptResult> {
        let params = GetPromptParams {
            name: name.to_string(),
            arguments,
        };
        self.peer.request_typed(methods::GET_PROMPT, &params).await
    }

    /// Ask for suggestions for one prompt argument
    pub async fn complete_prompt_argument(
        &self,
        prompt: &str,
        argument: &str,
        value: &str,
        resolved: &HashMap<String, String>,
    ) -> Result<Completion> {
        let params = CompleteParams {
            reference: CompletionReference::Prompt {
                name: prompt.to_string(),
            },
            argument: CompletionArgument {
                name: argument.to_string(),
                value: value.to_string(),
            },
            context: Some(CompletionContext {
                arguments: resolved.clone(),
            }),
        };
        let result: CompleteResult = self.peer.request_typed(methods::COMPLETE, &params).await?;
        Ok(result.completion)
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        self.reader.abort();
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
    }
}
