//! Typed tool input schemas
//!
//! A tool declares its arguments as an ordered list of primitive fields.
//! The same description renders to JSON Schema for `tools/list`, validates
//! incoming arguments on the server, and coerces operator text on the client.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Primitive JSON type a field accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
        }
    }

    fn from_schema(ty: &str) -> Option<Self> {
        match ty {
            "string" => Some(FieldType::String),
            "number" => Some(FieldType::Number),
            "integer" => Some(FieldType::Integer),
            "boolean" => Some(FieldType::Boolean),
            _ => None,
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Boolean => value.is_boolean(),
        }
    }
}

/// One declared argument
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaField {
    pub name: String,
    pub field_type: FieldType,
    pub description: Option<String>,
    pub required: bool,
}

/// Argument validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("missing required field '{0}'")]
    Missing(String),
    #[error("field '{field}' must be of type {expected}")]
    WrongType { field: String, expected: &'static str },
}

/// Ordered set of typed fields describing a tool's arguments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSchema {
    fields: Vec<SchemaField>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required field
    pub fn required(mut self, name: &str, field_type: FieldType, description: &str) -> Self {
        self.fields.push(SchemaField {
            name: name.to_string(),
            field_type,
            description: Some(description.to_string()).filter(|d| !d.is_empty()),
            required: true,
        });
        self
    }

    /// Add an optional field
    pub fn optional(mut self, name: &str, field_type: FieldType, description: &str) -> Self {
        self.fields.push(SchemaField {
            name: name.to_string(),
            field_type,
            description: Some(description.to_string()).filter(|d| !d.is_empty()),
            required: false,
        });
        self
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Rebuild a typed schema from a JSON Schema object as advertised by `tools/list`.
    /// Properties with non-primitive types are treated as strings.
    pub fn from_json_schema(schema: &Value) -> Self {
        let required: Vec<&str> = schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();

        let fields = schema
            .get("properties")
            .and_then(|p| p.as_object())
            .map(|props| {
                props
                    .iter()
                    .map(|(name, prop)| SchemaField {
                        name: name.clone(),
                        field_type: prop
                            .get("type")
                            .and_then(|t| t.as_str())
                            .and_then(FieldType::from_schema)
                            .unwrap_or(FieldType::String),
                        description: prop
                            .get("description")
                            .and_then(|d| d.as_str())
                            .map(String::from),
                        required: required.contains(&name.as_str()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self { fields }
    }

    /// Render as a JSON Schema object
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut prop = Map::new();
            prop.insert("type".into(), json!(field.field_type.as_str()));
            if let Some(desc) = &field.description {
                prop.insert("description".into(), json!(desc));
            }
            properties.insert(field.name.clone(), Value::Object(prop));
        }
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check an argument map against the schema.
    ///
    /// Keys the schema does not declare are dropped from the returned map.
    pub fn validate(&self, args: &Map<String, Value>) -> Result<Map<String, Value>, SchemaError> {
        for field in &self.fields {
            match args.get(&field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(SchemaError::Missing(field.name.clone()));
                }
                None | Some(Value::Null) => {}
                Some(value) if !field.field_type.accepts(value) => {
                    return Err(SchemaError::WrongType {
                        field: field.name.clone(),
                        expected: field.field_type.as_str(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(args
            .iter()
            .filter(|(key, _)| self.field(key).is_some())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    /// Turn operator text into the declared type of `name`.
    ///
    /// Unparseable input stays a string; the server is the one that validates.
    pub fn coerce(&self, name: &str, raw: &str) -> Value {
        let field_type = self
            .field(name)
            .map(|f| f.field_type)
            .unwrap_or(FieldType::String);
        let trimmed = raw.trim();
        match field_type {
            FieldType::String => Value::String(raw.to_string()),
            FieldType::Integer => trimmed
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            FieldType::Number => trimmed
                .parse::<f64>()
                .ok()
                .and_then(|n| serde_json::Number::from_f64(n).map(Value::Number))
                .unwrap_or_else(|| Value::String(raw.to_string())),
            FieldType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Value::Bool(true),
                "false" | "no" | "n" | "0" => Value::Bool(false),
                _ => Value::String(raw.to_string()),
            },
        }
    }
}
