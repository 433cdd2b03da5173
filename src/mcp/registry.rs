//! Capability registry
//!
//! Static catalog of tools, resources, resource templates and prompts, keyed
//! by name (or URI), each entry carrying the handler that serves it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::peer::Peer;
use super::protocol::{
    methods, CallToolParams, CompleteParams, CompleteResult, Completion, CompletionContext,
    CompletionReference, CreateMessageParams, CreateMessageResult, GetPromptParams,
    GetPromptResult, ListPromptsResult, ListResourceTemplatesResult, ListResourcesResult,
    ListToolsResult, Message, PromptDescriptor, ReadResourceResult, ResourceDescriptor,
    ResourceTemplateDescriptor, ToolCallResult, ToolDescriptor,
};
use super::schema::InputSchema;
use super::uri::UriTemplate;
use crate::error::{Result, UserbaseError};

/// Maximum number of completion values returned in one response
pub const MAX_COMPLETION_VALUES: usize = 100;

/// Per-request view of the connection, handed to tool handlers
#[derive(Clone)]
pub struct RequestContext {
    peer: Peer,
}

impl RequestContext {
    pub fn new(peer: Peer) -> Self {
        Self { peer }
    }

    /// Ask the connected client to generate a message (`sampling/createMessage`)
    pub async fn create_message(&self, params: &CreateMessageParams) -> Result<CreateMessageResult> {
        self.peer
            .request_typed(methods::CREATE_MESSAGE, params)
            .await
    }
}

/// Serves `tools/call` for one tool.
///
/// Arguments arrive already validated against the tool's schema. Failures are
/// reported inside the returned result, never as an error.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, ctx: &RequestContext, args: Map<String, Value>) -> ToolCallResult;
}

/// Serves `resources/read` for a concrete resource or a template.
///
/// `params` holds the extracted placeholder values (empty for concrete URIs).
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn read(&self, uri: &str, params: &HashMap<String, String>) -> Result<ReadResourceResult>;
}

/// Expands a prompt into its message list
pub trait PromptHandler: Send + Sync {
    fn render(&self, args: &HashMap<String, String>) -> Vec<Message>;
}

impl<F> PromptHandler for F
where
    F: Fn(&HashMap<String, String>) -> Vec<Message> + Send + Sync,
{
    fn render(&self, args: &HashMap<String, String>) -> Vec<Message> {
        self(args)
    }
}

/// Suggests values for a prompt argument given the partial value and the
/// arguments chosen so far
pub type Completer = Arc<dyn Fn(&str, &CompletionContext) -> Vec<String> + Send + Sync>;

struct RegisteredTool {
    descriptor: ToolDescriptor,
    schema: InputSchema,
    handler: Arc<dyn ToolHandler>,
}

struct RegisteredResource {
    descriptor: ResourceDescriptor,
    handler: Arc<dyn ResourceHandler>,
}

struct RegisteredTemplate {
    descriptor: ResourceTemplateDescriptor,
    template: UriTemplate,
    handler: Arc<dyn ResourceHandler>,
}

struct RegisteredPrompt {
    descriptor: PromptDescriptor,
    completers: HashMap<String, Completer>,
    handler: Arc<dyn PromptHandler>,
}

/// Name -> handler maps for every capability kind, in registration order
#[derive(Default)]
pub struct CapabilityRegistry {
    tools: Vec<RegisteredTool>,
    resources: Vec<RegisteredResource>,
    templates: Vec<RegisteredTemplate>,
    prompts: Vec<RegisteredPrompt>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. The descriptor's `inputSchema` is rendered from `schema`.
    pub fn register_tool(
        &mut self,
        mut descriptor: ToolDescriptor,
        schema: InputSchema,
        handler: impl ToolHandler + 'static,
    ) -> Result<()> {
        if self.tool(&descriptor.name).is_some() {
            return Err(UserbaseError::InvalidInput(format!(
                "tool '{}' already registered",
                descriptor.name
            )));
        }
        descriptor.input_schema = schema.to_json_schema();
        self.tools.push(RegisteredTool {
            descriptor,
            schema,
            handler: Arc::new(handler),
        });
        Ok(())
    }

    pub fn register_resource(
        &mut self,
        descriptor: ResourceDescriptor,
        handler: impl ResourceHandler + 'static,
    ) -> Result<()> {
        if self.resources.iter().any(|r| r.descriptor.uri == descriptor.uri) {
            return Err(UserbaseError::InvalidInput(format!(
                "resource '{}' already registered",
                descriptor.uri
            )));
        }
        self.resources.push(RegisteredResource {
            descriptor,
            handler: Arc::new(handler),
        });
        Ok(())
    }

    pub fn register_resource_template(
        &mut self,
        descriptor: ResourceTemplateDescriptor,
        handler: impl ResourceHandler + 'static,
    ) -> Result<()> {
        if self
            .templates
            .iter()
            .any(|t| t.descriptor.uri_template == descriptor.uri_template)
        {
            return Err(UserbaseError::InvalidInput(format!(
                "resource template '{}' already registered",
                descriptor.uri_template
            )));
        }
        let template = UriTemplate::parse(&descriptor.uri_template);
        self.templates.push(RegisteredTemplate {
            descriptor,
            template,
            handler: Arc::new(handler),
        });
        Ok(())
    }

    pub fn register_prompt(
        &mut self,
        descriptor: PromptDescriptor,
        completers: HashMap<String, Completer>,
        handler: impl PromptHandler + 'static,
    ) -> Result<()> {
        if self.prompt(&descriptor.name).is_some() {
            return Err(UserbaseError::InvalidInput(format!(
                "prompt '{}' already registered",
                descriptor.name
            )));
        }
        if let Some(unknown) = completers
            .keys()
            .find(|k| !descriptor.arguments.iter().any(|a| &a.name == *k))
        {
            return Err(UserbaseError::InvalidInput(format!(
                "completer for unknown argument '{}' of prompt '{}'",
                unknown, descriptor.name
            )));
        }
        self.prompts.push(RegisteredPrompt {
            descriptor,
            completers,
            handler: Arc::new(handler),
        });
        Ok(())
    }

    fn tool(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|t| t.descriptor.name == name)
    }

    fn prompt(&self, name: &str) -> Option<&RegisteredPrompt> {
        self.prompts.iter().find(|p| p.descriptor.name == name)
    }

    pub fn list_tools(&self) -> ListToolsResult {
        ListToolsResult {
            tools: self.tools.iter().map(|t| t.descriptor.clone()).collect(),
        }
    }

    pub fn list_resources(&self) -> ListResourcesResult {
        ListResourcesResult {
            resources: self.resources.iter().map(|r| r.descriptor.clone()).collect(),
        }
    }

    pub fn list_resource_templates(&self) -> ListResourceTemplatesResult {
        ListResourceTemplatesResult {
            resource_templates: self.templates.iter().map(|t| t.descriptor.clone()).collect(),
        }
    }

    pub fn list_prompts(&self) -> ListPromptsResult {
        ListPromptsResult {
            prompts: self.prompts.iter().map(|p| p.descriptor.clone()).collect(),
        }
    }

    /// Validate arguments and run the tool.
    ///
    /// An unknown tool is an invalid-params error; a schema violation is an
    /// `isError` result so the caller still gets a content block.
    pub async fn call_tool(
        &self,
        ctx: &RequestContext,
        params: CallToolParams,
    ) -> Result<ToolCallResult> {
        let tool = self
            .tool(&params.name)
            .ok_or_else(|| UserbaseError::InvalidInput(format!("Unknown tool: {}", params.name)))?;

        let args = match tool.schema.validate(&params.arguments) {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!(tool = %params.name, "Rejected arguments: {}", e);
                return Ok(ToolCallResult::error(format!(
                    "Invalid arguments for tool {}: {}",
                    params.name, e
                )));
            }
        };

        tracing::info!(tool = %params.name, "Calling tool");
        Ok(tool.handler.call(ctx, args).await)
    }

    /// Exact URI match first, then the first template that matches
    pub async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult> {
        if let Some(resource) = self.resources.iter().find(|r| r.descriptor.uri == uri) {
            return resource.handler.read(uri, &HashMap::new()).await;
        }
        for registered in &self.templates {
            if let Some(values) = registered.template.match_uri(uri) {
                tracing::debug!(template = registered.template.source(), "Matched template");
                return registered.handler.read(uri, &values).await;
            }
        }
        Err(UserbaseError::NotFound(format!("Resource {}", uri)))
    }

    pub fn get_prompt(&self, params: GetPromptParams) -> Result<GetPromptResult> {
        let prompt = self.prompt(&params.name).ok_or_else(|| {
            UserbaseError::InvalidInput(format!("Unknown prompt: {}", params.name))
        })?;

        if let Some(missing) = prompt
            .descriptor
            .arguments
            .iter()
            .find(|a| a.required && !params.arguments.contains_key(&a.name))
        {
            return Err(UserbaseError::InvalidInput(format!(
                "Missing required argument '{}' for prompt {}",
                missing.name, params.name
            )));
        }

        Ok(GetPromptResult {
            description: prompt.descriptor.description.clone(),
            messages: prompt.handler.render(&params.arguments),
        })
    }

    /// Argument completion for prompts; anything unknown completes to nothing
    pub fn complete(&self, params: &CompleteParams) -> CompleteResult {
        let values = match &params.reference {
            CompletionReference::Prompt { name } => self
                .prompt(name)
                .and_then(|p| p.completers.get(&params.argument.name))
                .map(|completer| {
                    let context = params.context.clone().unwrap_or_default();
                    completer(&params.argument.value, &context)
                })
                .unwrap_or_default(),
            CompletionReference::Resource { .. } => Vec::new(),
        };

        let total = values.len();
        CompleteResult {
            completion: Completion {
                values: values.into_iter().take(MAX_COMPLETION_VALUES).collect(),
                total: Some(total),
                has_more: total > MAX_COMPLETION_VALUES,
            },
        }
    }
}
