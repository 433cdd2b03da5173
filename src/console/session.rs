//! Client-side flows: the interactive menu, tool/resource/prompt runs, the
//! free-text query path, and the sampling responder.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::Operator;
use crate::error::{Result, UserbaseError};
use crate::genai::{function_declarations, GenerateRequest, TextGenerator};
use crate::mcp::protocol::{
    codes, methods, Content, CreateMessageParams, CreateMessageResult, McpRequest, McpResponse,
    Message, PromptDescriptor, Role, ToolDescriptor, STOP_REASON_END_TURN,
};
use crate::mcp::schema::InputSchema;
use crate::mcp::{uri, Catalog, McpClient, McpHandler, Peer};

/// Printed when the model returned neither text nor a function call
pub const NO_TEXT_GENERATED: &str = "No text generated.";

const RUN_PROMPT_QUESTION: &str = "Would you like to run the above prompt";
const TYPE_A_VALUE: &str = "(type a value)";

/// Turns one message into an optional completion: non-text messages are
/// skipped, text is shown and only sent to the generator once the operator
/// agrees.
pub struct MessageReducer {
    generator: Arc<dyn TextGenerator>,
    operator: Arc<dyn Operator>,
}

impl MessageReducer {
    pub fn new(generator: Arc<dyn TextGenerator>, operator: Arc<dyn Operator>) -> Self {
        Self {
            generator,
            operator,
        }
    }

    pub fn generator(&self) -> &Arc<dyn TextGenerator> {
        &self.generator
    }

    pub fn operator(&self) -> &Arc<dyn Operator> {
        &self.operator
    }

    pub async fn reduce(&self, message: &Message) -> Result<Option<String>> {
        let Content::Text { text } = &message.content else {
            return Ok(None);
        };
        self.operator.say(text);
        if !self.operator.confirm(RUN_PROMPT_QUESTION, true)? {
            return Ok(None);
        }
        let generation = self.generator.generate(&GenerateRequest::text(text)).await?;
        Ok(Some(generation.text.unwrap_or_default()))
    }
}

/// Serves `sampling/createMessage` requests coming from the server
pub struct SamplingResponder {
    reducer: Arc<MessageReducer>,
}

impl SamplingResponder {
    pub fn new(reducer: Arc<MessageReducer>) -> Self {
        Self { reducer }
    }

    /// Messages are handled one after the other; skipped ones add nothing
    pub async fn create_message(&self, params: CreateMessageParams) -> Result<CreateMessageResult> {
        let mut texts = Vec::new();
        for message in &params.messages {
            if let Some(text) = self.reducer.reduce(message).await? {
                texts.push(text);
            }
        }
        Ok(CreateMessageResult {
            role: Role::Assistant,
            content: Content::text(texts.join("\n")),
            model: self.reducer.generator().model_name().to_string(),
            stop_reason: Some(STOP_REASON_END_TURN.to_string()),
        })
    }
}

#[async_trait]
impl McpHandler for SamplingResponder {
    async fn handle_request(&self, _peer: &Peer, request: McpRequest) -> McpResponse {
        match request.method.as_str() {
            methods::CREATE_MESSAGE => {
                let result = match request.parse_params::<CreateMessageParams>() {
                    Ok(params) => {
                        tracing::info!(messages = params.messages.len(), "Sampling request");
                        self.create_message(params).await
                    }
                    Err(e) => Err(e),
                };
                McpResponse::from_result(request.id, result)
            }
            methods::PING => McpResponse::success(request.id, serde_json::json!({})),
            other => McpResponse::error(
                request.id,
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            ),
        }
    }
}

/// Top-level menu choices
const MENU: [&str; 5] = ["Query", "Tools", "Resources", "Prompts", "Quit"];

/// One connected client session driven by the operator
pub struct Session {
    client: McpClient,
    catalog: Catalog,
    reducer: Arc<MessageReducer>,
}

impl Session {
    pub fn new(client: McpClient, catalog: Catalog, reducer: Arc<MessageReducer>) -> Self {
        Self {
            client,
            catalog,
            reducer,
        }
    }

    fn operator(&self) -> &dyn Operator {
        self.reducer.operator().as_ref()
    }

    /// Menu loop until the operator quits.
    ///
    /// Handler-level failures are printed and the loop continues; a broken
    /// console or a closed channel ends the session.
    pub async fn run(&self) -> Result<()> {
        let menu: Vec<String> = MENU.iter().map(|s| s.to_string()).collect();
        loop {
            let choice = self.operator().select("What would you like to do", &menu)?;
            let outcome = match MENU[choice] {
                "Query" => {
                    let query = self.operator().input("Enter your query")?;
                    self.run_query(&query).await
                }
                "Tools" => self.choose_tool().await,
                "Resources" => self.choose_resource().await,
                "Prompts" => self.choose_prompt().await,
                _ => return Ok(()),
            };

            match outcome {
                Ok(()) => {}
                Err(e @ (UserbaseError::Console(_) | UserbaseError::ChannelClosed)) => {
                    return Err(e)
                }
                Err(e) => {
                    tracing::debug!("Action failed: {}", e);
                    self.operator().warn(&format!("Error: {}", e));
                }
            }
        }
    }

    async fn choose_tool(&self) -> Result<()> {
        if self.catalog.tools.is_empty() {
            self.operator().say("No tools available.");
            return Ok(());
        }
        let items: Vec<String> = self
            .catalog
            .tools
            .iter()
            .map(|t| labelled(t.display_name(), &t.description))
            .collect();
        let index = self.operator().select("Select a tool", &items)?;
        self.run_tool(&self.catalog.tools[index]).await
    }

    async fn choose_resource(&self) -> Result<()> {
        let mut uris = Vec::new();
        let mut items = Vec::new();
        for resource in &self.catalog.resources {
            uris.push(resource.uri.clone());
            items.push(format!("{} ({})", resource.name, resource.uri));
        }
        for template in &self.catalog.resource_templates {
            uris.push(template.uri_template.clone());
            items.push(format!("{} ({})", template.name, template.uri_template));
        }
        if uris.is_empty() {
            self.operator().say("No resources available.");
            return Ok(());
        }
        let index = self.operator().select("Select a resource", &items)?;
        self.read_resource(&uris[index]).await
    }

    async fn choose_prompt(&self) -> Result<()> {
        if self.catalog.prompts.is_empty() {
            self.operator().say("No prompts available.");
            return Ok(());
        }
        let items: Vec<String> = self
            .catalog
            .prompts
            .iter()
            .map(|p| labelled(&p.name, p.description.as_deref().unwrap_or_default()))
            .collect();
        let index = self.operator().select("Select a prompt", &items)?;
        self.run_prompt(&self.catalog.prompts[index]).await
    }

    /// Ask for every declared property, call the tool, show the first text block
    pub async fn run_tool(&self, tool: &ToolDescriptor) -> Result<()> {
        let schema = InputSchema::from_json_schema(&tool.input_schema);
        let mut arguments = serde_json::Map::new();
        for field in schema.fields() {
            let raw = self
                .operator()
                .input(&format!("Enter value for {} ({}):", field.name, field.field_type.as_str()))?;
            arguments.insert(field.name.clone(), schema.coerce(&field.name, &raw));
        }

        let result = self.client.call_tool(&tool.name, arguments).await?;
        self.operator()
            .say(result.first_text().unwrap_or("(no text content)"));
        Ok(())
    }

    /// Fill every placeholder occurrence from the operator, read, pretty-print
    pub async fn read_resource(&self, uri_template: &str) -> Result<()> {
        let mut uri = uri_template.to_string();
        for name in uri::placeholders(uri_template) {
            let value = self.operator().input(&format!("Enter value for {}:", name))?;
            uri = uri::fill_first(&uri, &name, &value);
        }

        let result = self.client.read_resource(&uri).await?;
        let text = result
            .contents
            .first()
            .and_then(|c| c.text.as_deref())
            .unwrap_or_default();
        let shown = match serde_json::from_str::<Value>(text) {
            Ok(json) => serde_json::to_string_pretty(&json)?,
            Err(_) => text.to_string(),
        };
        self.operator().say(&shown);
        Ok(())
    }

    /// Ask for each argument (offering completions), then reduce each message
    pub async fn run_prompt(&self, prompt: &PromptDescriptor) -> Result<()> {
        let mut arguments = HashMap::new();
        for argument in &prompt.arguments {
            let value = self.ask_prompt_argument(prompt, &argument.name, &arguments).await?;
            arguments.insert(argument.name.clone(), value);
        }

        let result = self.client.get_prompt(&prompt.name, arguments).await?;
        for message in &result.messages {
            if let Some(text) = self.reducer.reduce(message).await? {
                self.operator().say(&text);
            }
        }
        Ok(())
    }

    async fn ask_prompt_argument(
        &self,
        prompt: &PromptDescriptor,
        argument: &str,
        resolved: &HashMap<String, String>,
    ) -> Result<String> {
        let question = format!("Enter value for {}:", argument);
        let suggestions = match self
            .client
            .complete_prompt_argument(&prompt.name, argument, "", resolved)
            .await
        {
            Ok(completion) => completion.values,
            Err(e) => {
                tracing::debug!("No completions for {}: {}", argument, e);
                Vec::new()
            }
        };
        if suggestions.is_empty() {
            return self.operator().input(&question);
        }

        let mut items = suggestions;
        items.push(TYPE_A_VALUE.to_string());
        let index = self.operator().select(&question, &items)?;
        if index + 1 == items.len() {
            self.operator().input(&question)
        } else {
            Ok(items.swap_remove(index))
        }
    }

    /// Send free text to the model with the tool catalog attached.
    ///
    /// A function call and plain text are handled independently; both may
    /// be printed for one response.
    pub async fn run_query(&self, query: &str) -> Result<()> {
        let request =
            GenerateRequest::with_functions(query, function_declarations(&self.catalog.tools));
        let generation = self.reducer.generator().generate(&request).await?;

        if let Some(call) = &generation.function_call {
            tracing::info!(tool = %call.name, "Model requested tool call");
            let result = self.client.call_tool(&call.name, call.args.clone()).await?;
            self.operator()
                .say(result.first_text().unwrap_or("(no text content)"));
        }
        if let Some(text) = &generation.text {
            self.operator().say(text);
        }
        if generation.function_call.is_none() && generation.text.is_none() {
            self.operator().say(NO_TEXT_GENERATED);
        }
        Ok(())
    }
}

fn labelled(name: &str, description: &str) -> String {
    if description.is_empty() {
        name.to_string()
    } else {
        format!("{} - {}", name, description)
    }
}
