//! End-to-end tests: client and server wired over an in-memory duplex
//! channel, with a scripted operator and a canned generator.
//!
//! Run with: cargo test --test end_to_end

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use tempfile::{tempdir, TempDir};

use userbase::catalog::{build_registry, server_info};
use userbase::console::{MessageReducer, Operator, SamplingResponder, Session};
use userbase::error::{Result, UserbaseError};
use userbase::genai::{FunctionCall, GenerateRequest, Generation, TextGenerator};
use userbase::mcp::protocol::{
    codes, methods, Content, CreateMessageParams, CreateMessageResult, Implementation,
    ListResourceTemplatesResult, ListResourcesResult, ListToolsResult, McpRequest, McpResponse,
    Message, Role, STOP_REASON_END_TURN,
};
use userbase::mcp::{McpClient, McpHandler, McpServer, Peer};
use userbase::storage::UserStore;
use userbase::types::User;

// ============================================================================
// TEST DOUBLES
// ============================================================================

#[derive(Debug, Clone)]
enum Answer {
    Select(usize),
    Input(&'static str),
    Confirm(bool),
}

/// Replays canned answers and records everything shown
#[derive(Default)]
struct ScriptedOperator {
    answers: Mutex<VecDeque<Answer>>,
    output: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl ScriptedOperator {
    fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            ..Default::default()
        }
    }

    fn next(&self, prompt: &str) -> Result<Answer> {
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| UserbaseError::Console(format!("script exhausted at '{}'", prompt)))
    }

    fn output(&self) -> Vec<String> {
        self.output.lock().unwrap().clone()
    }

    fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Operator for ScriptedOperator {
    fn select(&self, prompt: &str, items: &[String]) -> Result<usize> {
        match self.next(prompt)? {
            Answer::Select(i) if i < items.len() => Ok(i),
            other => panic!("expected select for '{}', got {:?}", prompt, other),
        }
    }

    fn input(&self, prompt: &str) -> Result<String> {
        match self.next(prompt)? {
            Answer::Input(s) => Ok(s.to_string()),
            other => panic!("expected input for '{}', got {:?}", prompt, other),
        }
    }

    fn confirm(&self, prompt: &str, _default: bool) -> Result<bool> {
        match self.next(prompt)? {
            Answer::Confirm(b) => Ok(b),
            other => panic!("expected confirm for '{}', got {:?}", prompt, other),
        }
    }

    fn say(&self, line: &str) {
        self.output.lock().unwrap().push(line.to_string());
    }

    fn warn(&self, line: &str) {
        self.errors.lock().unwrap().push(line.to_string());
    }
}

/// Returns queued generations, then echoes the prompt
#[derive(Default)]
struct CannedGenerator {
    queued: Mutex<VecDeque<Generation>>,
    prompts: Mutex<Vec<String>>,
}

impl CannedGenerator {
    fn new(queued: Vec<Generation>) -> Self {
        Self {
            queued: Mutex::new(queued.into()),
            ..Default::default()
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    fn model_name(&self) -> &str {
        "gemini-2.0-flash"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<Generation> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        let queued = self.queued.lock().unwrap().pop_front();
        Ok(queued.unwrap_or_else(|| Generation {
            text: Some(format!("generated: {}", request.prompt)),
            function_call: None,
        }))
    }
}

/// Client side that answers every sampling request with an image
struct ImageSampler;

#[async_trait]
impl McpHandler for ImageSampler {
    async fn handle_request(&self, _peer: &Peer, request: McpRequest) -> McpResponse {
        match request.method.as_str() {
            methods::CREATE_MESSAGE => {
                let result = CreateMessageResult {
                    role: Role::Assistant,
                    content: Content::Image {
                        data: "AA==".into(),
                        mime_type: "image/png".into(),
                    },
                    model: "image-model".into(),
                    stop_reason: Some(STOP_REASON_END_TURN.into()),
                };
                McpResponse::success(request.id, json!(result))
            }
            other => McpResponse::error(request.id, codes::METHOD_NOT_FOUND, other.to_string()),
        }
    }
}

/// Server side that lists tools and resources but fails `prompts/list`
struct BrokenPromptList;

#[async_trait]
impl McpHandler for BrokenPromptList {
    async fn handle_request(&self, _peer: &Peer, request: McpRequest) -> McpResponse {
        match request.method.as_str() {
            methods::LIST_TOOLS => McpResponse::success(request.id, json!(ListToolsResult::default())),
            methods::LIST_RESOURCES => {
                McpResponse::success(request.id, json!(ListResourcesResult::default()))
            }
            methods::LIST_RESOURCE_TEMPLATES => {
                McpResponse::success(request.id, json!(ListResourceTemplatesResult::default()))
            }
            methods::LIST_PROMPTS => {
                McpResponse::error(
                    request.id,
                    codes::INTERNAL_ERROR,
                    "prompt store offline".to_string(),
                )
            }
            other => McpResponse::error(request.id, codes::METHOD_NOT_FOUND, other.to_string()),
        }
    }
}

fn text(s: &str) -> Generation {
    Generation {
        text: Some(s.to_string()),
        function_call: None,
    }
}

struct Harness {
    client: McpClient,
    store: UserStore,
    operator: Arc<ScriptedOperator>,
    generator: Arc<CannedGenerator>,
    reducer: Arc<MessageReducer>,
    _dir: TempDir,
}

/// Connect a client serving `client_handler` to `server` over an in-memory channel
fn wire<S: McpHandler, C: McpHandler>(server: S, client_handler: Arc<C>) -> McpClient {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_io);
    let _ = Peer::spawn(server_read, server_write, Arc::new(server));

    let (client_read, client_write) = tokio::io::split(client_io);
    McpClient::connect(client_read, client_write, client_handler)
}

async fn connect_to_store<C: McpHandler>(store: &UserStore, client_handler: Arc<C>) -> McpClient {
    let server = McpServer::new(build_registry(store.clone()).unwrap(), server_info());
    let client = wire(server, client_handler);
    client
        .initialize(Implementation {
            name: "test-client".into(),
            version: "0.0.0".into(),
        })
        .await
        .unwrap();
    client
}

async fn harness(answers: Vec<Answer>, generations: Vec<Generation>) -> Harness {
    let dir = tempdir().unwrap();
    let store = UserStore::open(dir.path().join("users.json"));

    let operator = Arc::new(ScriptedOperator::new(answers));
    let generator = Arc::new(CannedGenerator::new(generations));
    let reducer = Arc::new(MessageReducer::new(generator.clone(), operator.clone()));

    let client =
        connect_to_store(&store, Arc::new(SamplingResponder::new(reducer.clone()))).await;

    Harness {
        client,
        store,
        operator,
        generator,
        reducer,
        _dir: dir,
    }
}

fn ana() -> Map<String, Value> {
    json!({"name": "Ana", "email": "a@x.com", "address": "1 Main St", "phone": "555-0100"})
        .as_object()
        .cloned()
        .unwrap()
}

const ANA_JSON: &str =
    r#"{"name":"Ana","email":"a@x.com","address":"1 Main St","phone":"555-0100"}"#;

// ============================================================================
// DISCOVERY
// ============================================================================

#[tokio::test]
async fn discovery_lists_all_four_catalogs() {
    let h = harness(vec![], vec![]).await;
    let catalog = h.client.discover().await.unwrap();

    let tools: Vec<&str> = catalog.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tools, vec!["create-user", "create-random-user"]);
    assert_eq!(
        catalog.tools[0].property_names(),
        vec!["name", "email", "address", "phone"]
    );
    assert_eq!(catalog.tools[0].display_name(), "Create User");

    assert_eq!(catalog.resources[0].uri, "users://all");
    assert_eq!(
        catalog.resource_templates[0].uri_template,
        "users://{userId}/profile"
    );
    let prompts: Vec<&str> = catalog.prompts.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(prompts, vec!["generate-fake-user", "welcome-new-hire"]);
}

#[tokio::test]
async fn discovery_fails_when_any_listing_fails() {
    let client = wire(BrokenPromptList, Arc::new(ImageSampler));

    // the other three listings succeed on their own
    assert!(client.list_tools().await.unwrap().tools.is_empty());

    let err = client.discover().await.unwrap_err();
    assert_eq!(err.code(), codes::INTERNAL_ERROR);
    assert!(err.to_string().contains("prompt store offline"));
}

// ============================================================================
// TOOLS
// ============================================================================

#[tokio::test]
async fn create_user_stores_record_and_reports_id() {
    let h = harness(vec![], vec![]).await;
    let result = h.client.call_tool("create-user", ana()).await.unwrap();
    assert_eq!(result.first_text(), Some("User 1 created successfully"));

    let users = h.store.list().await.unwrap();
    assert_eq!(
        users,
        vec![User {
            id: 1,
            name: "Ana".into(),
            email: "a@x.com".into(),
            address: "1 Main St".into(),
            phone: "555-0100".into(),
        }]
    );
}

#[tokio::test]
async fn create_user_reports_failure_when_store_unwritable() {
    let h = harness(vec![], vec![]).await;
    // a directory where the file should be makes the rewrite fail
    std::fs::create_dir_all(h.store.path()).unwrap();
    let result = h.client.call_tool("create-user", ana()).await.unwrap();
    assert_eq!(result.first_text(), Some("Failed to save user"));
    assert_eq!(result.is_error, None);
}

#[tokio::test]
async fn schema_violation_is_an_error_result_not_a_protocol_error() {
    let h = harness(vec![], vec![]).await;
    let mut args = ana();
    args.remove("phone");
    let result = h.client.call_tool("create-user", args).await.unwrap();
    assert_eq!(result.is_error, Some(true));
    assert!(result.first_text().unwrap().contains("phone"));
    assert!(h.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_tool_is_invalid_params() {
    let h = harness(vec![], vec![]).await;
    let err = h.client.call_tool("drop-tables", Map::new()).await.unwrap_err();
    assert_eq!(err.code(), -32602);
}

#[tokio::test]
async fn undeclared_arguments_are_ignored() {
    let h = harness(vec![], vec![]).await;
    let mut args = ana();
    args.insert("id".into(), json!(7));
    args.insert("nickname".into(), json!("Annie"));

    let result = h.client.call_tool("create-user", args).await.unwrap();
    assert_eq!(result.first_text(), Some("User 1 created successfully"));
    assert_eq!(result.is_error, None);
    assert_eq!(h.store.get(1).await.unwrap().unwrap().name, "Ana");
}

#[tokio::test]
async fn every_tool_returns_content_for_valid_arguments() {
    let h = harness(
        vec![Answer::Confirm(true)],
        vec![text(ANA_JSON)],
    )
    .await;
    let catalog = h.client.discover().await.unwrap();
    for tool in &catalog.tools {
        let args = if tool.property_names().is_empty() {
            Map::new()
        } else {
            ana()
        };
        let result = h.client.call_tool(&tool.name, args).await.unwrap();
        assert!(!result.content.is_empty(), "tool {} returned nothing", tool.name);
    }
}

// ============================================================================
// SAMPLING
// ============================================================================

#[tokio::test]
async fn random_user_via_sampling_accepts_fenced_json() {
    let fenced = format!("```json\n{}\n```", ANA_JSON);
    let h = harness(vec![Answer::Confirm(true)], vec![text(&fenced)]).await;

    let result = h
        .client
        .call_tool("create-random-user", Map::new())
        .await
        .unwrap();
    assert_eq!(result.first_text(), Some("User 1 created successfully"));
    assert_eq!(h.store.get(1).await.unwrap().unwrap().name, "Ana");

    // the operator saw the server's instruction before it was sent
    assert!(h.operator.output()[0].starts_with("Generate fake user data."));
    assert_eq!(h.generator.prompts().len(), 1);
}

#[tokio::test]
async fn random_user_declined_by_operator_fails_cleanly() {
    let h = harness(vec![Answer::Confirm(false)], vec![]).await;
    let result = h
        .client
        .call_tool("create-random-user", Map::new())
        .await
        .unwrap();
    assert_eq!(result.first_text(), Some("Failed to generate user data"));
    assert!(h.generator.prompts().is_empty());
    assert!(h.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn random_user_with_prose_reply_fails_cleanly() {
    let h = harness(
        vec![Answer::Confirm(true)],
        vec![text("Here is a user named Ana who lives on Main St.")],
    )
    .await;
    let result = h
        .client
        .call_tool("create-random-user", Map::new())
        .await
        .unwrap();
    assert_eq!(result.first_text(), Some("Failed to generate user data"));
}

#[tokio::test]
async fn random_user_with_non_text_sampling_reply_fails_cleanly() {
    let dir = tempdir().unwrap();
    let store = UserStore::open(dir.path().join("users.json"));
    let client = connect_to_store(&store, Arc::new(ImageSampler)).await;

    let result = client
        .call_tool("create-random-user", Map::new())
        .await
        .unwrap();
    assert_eq!(result.first_text(), Some("Failed to generate user data"));
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn random_user_reports_failure_when_store_unwritable() {
    let h = harness(vec![Answer::Confirm(true)], vec![text(ANA_JSON)]).await;
    std::fs::create_dir_all(h.store.path()).unwrap();

    let result = h
        .client
        .call_tool("create-random-user", Map::new())
        .await
        .unwrap();
    assert_eq!(result.first_text(), Some("Failed to save user"));
    // generation itself went through
    assert_eq!(h.generator.prompts().len(), 1);
}

#[tokio::test]
async fn sampling_joins_confirmed_texts_and_skips_non_text() {
    let h = harness(
        vec![Answer::Confirm(true), Answer::Confirm(true)],
        vec![text("first"), text("second")],
    )
    .await;
    let responder = SamplingResponder::new(h.reducer.clone());

    let params = CreateMessageParams {
        messages: vec![
            Message::user_text("one"),
            Message {
                role: Role::User,
                content: Content::Image {
                    data: "AA==".into(),
                    mime_type: "image/png".into(),
                },
            },
            Message::user_text("two"),
        ],
        max_tokens: 100,
        system_prompt: None,
    };
    let result = responder.create_message(params).await.unwrap();

    assert_eq!(result.content, Content::text("first\nsecond"));
    assert_eq!(result.model, "gemini-2.0-flash");
    assert_eq!(result.stop_reason.as_deref(), Some(STOP_REASON_END_TURN));
    assert_eq!(h.generator.prompts(), vec!["one", "two"]);
}

// ============================================================================
// PROMPTS
// ============================================================================

#[tokio::test]
async fn unknown_prompt_is_invalid_params() {
    let h = harness(vec![], vec![]).await;
    let err = h
        .client
        .get_prompt("nope", HashMap::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::INVALID_PARAMS);
}

#[tokio::test]
async fn prompt_missing_required_argument_is_invalid_params() {
    let h = harness(vec![], vec![]).await;
    let mut arguments = HashMap::new();
    arguments.insert("department".to_string(), "sales".to_string());
    let err = h
        .client
        .get_prompt("welcome-new-hire", arguments)
        .await
        .unwrap_err();
    assert_eq!(err.code(), codes::INVALID_PARAMS);
}

// ============================================================================
// RESOURCES
// ============================================================================

#[tokio::test]
async fn missing_user_profile_is_error_payload() {
    let h = harness(vec![], vec![]).await;
    let result = h.client.read_resource("users://999/profile").await.unwrap();
    assert_eq!(
        result.contents[0].text.as_deref(),
        Some(r#"{"error":"User not found"}"#)
    );
    assert_eq!(result.contents[0].uri, "users://999/profile");
}

#[tokio::test]
async fn unregistered_uri_is_resource_not_found() {
    let h = harness(vec![], vec![]).await;
    let err = h.client.read_resource("orders://all").await.unwrap_err();
    assert_eq!(err.code(), -32002);
}

#[tokio::test]
async fn client_refuses_uri_with_braces() {
    let h = harness(vec![], vec![]).await;
    let err = h
        .client
        .read_resource("users://{userId}/profile")
        .await
        .unwrap_err();
    assert!(matches!(err, UserbaseError::InvalidInput(_)));
}

#[tokio::test]
async fn session_reads_templated_resource_and_pretty_prints() {
    let h = harness(vec![Answer::Input("1")], vec![]).await;
    h.client.call_tool("create-user", ana()).await.unwrap();
    let catalog = h.client.discover().await.unwrap();
    let operator = h.operator.clone();
    let session = Session::new(h.client, catalog, h.reducer);

    session
        .read_resource("users://{userId}/profile")
        .await
        .unwrap();

    let shown = operator.output();
    let parsed: Value = serde_json::from_str(&shown[0]).unwrap();
    assert_eq!(parsed["id"], 1);
    assert!(shown[0].contains("\n  \"name\": \"Ana\""));
}

// ============================================================================
// SESSION FLOWS
// ============================================================================

#[tokio::test]
async fn session_runs_tool_from_operator_input() {
    let h = harness(
        vec![
            Answer::Input("Ana"),
            Answer::Input("a@x.com"),
            Answer::Input("1 Main St"),
            Answer::Input("555-0100"),
        ],
        vec![],
    )
    .await;
    let catalog = h.client.discover().await.unwrap();
    let operator = h.operator.clone();
    let store = h.store.clone();
    let tool = catalog.tools[0].clone();
    let session = Session::new(h.client, catalog, h.reducer);

    session.run_tool(&tool).await.unwrap();
    assert_eq!(operator.output(), vec!["User 1 created successfully"]);
    assert_eq!(store.get(1).await.unwrap().unwrap().phone, "555-0100");
}

#[tokio::test]
async fn query_prints_tool_result_and_text_from_same_response() {
    let generation = Generation {
        text: Some("Done, Ana is in.".into()),
        function_call: Some(FunctionCall {
            name: "create-user".into(),
            args: ana(),
        }),
    };
    let h = harness(vec![], vec![generation]).await;
    let catalog = h.client.discover().await.unwrap();
    let operator = h.operator.clone();
    let session = Session::new(h.client, catalog, h.reducer);

    session.run_query("add Ana please").await.unwrap();
    assert_eq!(
        operator.output(),
        vec!["User 1 created successfully", "Done, Ana is in."]
    );
}

#[tokio::test]
async fn query_without_text_or_call_says_so() {
    let h = harness(vec![], vec![Generation::default()]).await;
    let catalog = h.client.discover().await.unwrap();
    let operator = h.operator.clone();
    let session = Session::new(h.client, catalog, h.reducer);

    session.run_query("hello").await.unwrap();
    assert_eq!(operator.output(), vec!["No text generated."]);
}

#[tokio::test]
async fn prompt_run_uses_dependent_completions_and_confirmation() {
    let h = harness(
        vec![
            // department: engineering is first of the offered list
            Answer::Select(0),
            // name: roster filtered by engineering; pick Grace Hopper
            Answer::Select(2),
            Answer::Confirm(true),
        ],
        vec![text("Welcome aboard, Grace!")],
    )
    .await;
    let catalog = h.client.discover().await.unwrap();
    let operator = h.operator.clone();
    let generator = h.generator.clone();
    let prompt = catalog.prompts[1].clone();
    let session = Session::new(h.client, catalog, h.reducer);

    session.run_prompt(&prompt).await.unwrap();

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Grace Hopper"));
    assert!(prompts[0].contains("engineering"));
    assert_eq!(operator.output().last().unwrap(), "Welcome aboard, Grace!");
}

#[tokio::test]
async fn declined_prompt_message_is_not_sent() {
    let h = harness(vec![Answer::Input("Ana"), Answer::Confirm(false)], vec![]).await;
    let catalog = h.client.discover().await.unwrap();
    let operator = h.operator.clone();
    let generator = h.generator.clone();
    let prompt = catalog.prompts[0].clone();
    let session = Session::new(h.client, catalog, h.reducer);

    session.run_prompt(&prompt).await.unwrap();
    assert!(generator.prompts().is_empty());
    // only the prompt text itself was shown
    assert_eq!(operator.output().len(), 1);
}

#[tokio::test]
async fn menu_loop_survives_handler_errors_and_quits() {
    let h = harness(
        vec![
            // Resources -> users://{userId}/profile with an id that breaks the URI
            Answer::Select(2),
            Answer::Select(1),
            Answer::Input("{x}"),
            // Quit
            Answer::Select(4),
        ],
        vec![],
    )
    .await;
    let catalog = h.client.discover().await.unwrap();
    let operator = h.operator.clone();
    let session = Session::new(h.client, catalog, h.reducer);

    session.run().await.unwrap();
    let errors = operator.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Error: "));
}
