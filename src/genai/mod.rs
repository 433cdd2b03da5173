//! Generative-AI backend
//!
//! A [`TextGenerator`] turns a prompt (optionally with a function catalog)
//! into text and/or a structured function call. Gemini is the only backend.

mod gemini;

pub use gemini::{GeminiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::mcp::protocol::ToolDescriptor;
use crate::mcp::schema::InputSchema;

/// A function the model may choose to call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

/// A call chosen by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub prompt: String,
    pub functions: Vec<FunctionDeclaration>,
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            functions: Vec::new(),
        }
    }

    pub fn with_functions(prompt: impl Into<String>, functions: Vec<FunctionDeclaration>) -> Self {
        Self {
            prompt: prompt.into(),
            functions,
        }
    }
}

/// What came back: text, a function call, both, or neither
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub text: Option<String>,
    pub function_call: Option<FunctionCall>,
}

/// Trait for generative text backends
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier reported back to sampling callers
    fn model_name(&self) -> &str;

    async fn generate(&self, request: &GenerateRequest) -> Result<Generation>;
}

/// Translate the tool catalog into function declarations.
///
/// Parameters are re-rendered from the typed schema so only the primitive
/// subset reaches the model; tools without inputs get no `parameters`.
pub fn function_declarations(tools: &[ToolDescriptor]) -> Vec<FunctionDeclaration> {
    tools
        .iter()
        .map(|tool| {
            let schema = InputSchema::from_json_schema(&tool.input_schema);
            FunctionDeclaration {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: (!schema.fields().is_empty()).then(|| schema.to_json_schema()),
            }
        })
        .collect()
}
