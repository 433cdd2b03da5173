//! Gemini `generateContent` client

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{FunctionCall, GenerateRequest, Generation, TextGenerator};
use crate::error::{Result, UserbaseError};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Gemini REST client
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Create a client with custom endpoint and model
    pub fn with_config(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    fn request_body(request: &GenerateRequest) -> Value {
        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": request.prompt}]
            }]
        });
        if !request.functions.is_empty() {
            body["tools"] = json!([{ "functionDeclarations": request.functions }]);
        }
        body
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<FunctionCall>,
}

/// Text parts of the first candidate are concatenated; the first function
/// call part wins.
fn into_generation(response: GenerateContentResponse) -> Generation {
    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    let mut text = String::new();
    let mut function_call = None;
    for part in parts {
        if let Some(t) = part.text {
            text.push_str(&t);
        }
        if function_call.is_none() {
            function_call = part.function_call;
        }
    }

    Generation {
        text: Some(text).filter(|t| !t.is_empty()),
        function_call,
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<Generation> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        tracing::debug!(
            model = %self.model,
            functions = request.functions.len(),
            "Calling Gemini"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(UserbaseError::Generation(format!(
                "Gemini API error {}: {}",
                status, text
            )));
        }

        let data: GenerateContentResponse = response.json().await?;
        Ok(into_generation(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::FunctionDeclaration;
    use pretty_assertions::assert_eq;

    fn parse(value: Value) -> Generation {
        into_generation(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_text_and_function_call_both_extracted() {
        let generation = parse(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "Creating "},
                        {"text": "the user."},
                        {"functionCall": {"name": "create-user", "args": {"name": "Ana"}}}
                    ]
                }
            }]
        }));
        assert_eq!(generation.text.as_deref(), Some("Creating the user."));
        let call = generation.function_call.unwrap();
        assert_eq!(call.name, "create-user");
        assert_eq!(call.args["name"], "Ana");
    }

    #[test]
    fn test_empty_response() {
        assert_eq!(parse(json!({})), Generation::default());
        assert_eq!(parse(json!({"candidates": [{}]})), Generation::default());
    }

    #[test]
    fn test_request_body_only_carries_tools_when_present() {
        let plain = GeminiClient::request_body(&GenerateRequest::text("hi"));
        assert_eq!(plain["contents"][0]["parts"][0]["text"], "hi");
        assert!(plain.get("tools").is_none());

        let with_tools = GeminiClient::request_body(&GenerateRequest::with_functions(
            "hi",
            vec![FunctionDeclaration {
                name: "f".into(),
                description: "d".into(),
                parameters: None,
            }],
        ));
        assert_eq!(with_tools["tools"][0]["functionDeclarations"][0]["name"], "f");
    }

    #[tokio::test]
    async fn test_generate_against_mock_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.0-flash:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"hello"}]}}]}"#)
            .create_async()
            .await;

        let client = GeminiClient::with_config("test-key".into(), Some(server.url()), None);
        let generation = client.generate(&GenerateRequest::text("hi")).await.unwrap();
        assert_eq!(generation.text.as_deref(), Some("hello"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_is_generation_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-2.0-flash:generateContent")
            .with_status(403)
            .with_body("denied")
            .create_async()
            .await;

        let client = GeminiClient::with_config("bad".into(), Some(server.url()), None);
        match client.generate(&GenerateRequest::text("hi")).await {
            Err(UserbaseError::Generation(msg)) => assert!(msg.contains("403")),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
