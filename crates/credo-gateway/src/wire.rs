//! Request/response types for the Gemini REST API, and the mapping from the
//! backend-agnostic schema description onto the `responseSchema` wire format.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use credo_core::conversation::{Turn, TurnRole};
use credo_core::schema::SchemaNode;

#[derive(Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part { text: text.into() }],
        }
    }

    /// Maps a finalized turn onto the backend's multi-turn structure.
    pub fn from_turn(turn: &Turn) -> Self {
        let role = match turn.role {
            TurnRole::User => "user",
            TurnRole::Model => "model",
        };
        Self {
            role: role.to_string(),
            parts: vec![Part {
                text: turn.text.clone(),
            }],
        }
    }
}

#[derive(Deserialize)]
pub struct GenerateContentResponse {
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
pub struct Candidate {
    pub content: Option<ContentResponse>,
}

#[derive(Deserialize)]
pub struct ContentResponse {
    pub parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
pub struct PartResponse {
    pub text: Option<String>,
}

#[derive(Deserialize)]
pub struct ErrorWrapper {
    pub error: ErrorBody,
}

#[derive(Deserialize)]
pub struct ErrorBody {
    #[allow(dead_code)]
    pub code: Option<i32>,
    pub message: Option<String>,
    pub status: Option<String>,
}

/// First candidate's text, if the backend produced any.
pub fn extract_text(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .and_then(|mut candidates| candidates.pop())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
}

/// Renders a schema description as the Gemini `responseSchema` value.
pub fn schema_to_wire(node: &SchemaNode) -> Value {
    match node {
        SchemaNode::Object {
            required,
            properties,
        } => {
            let mut props = serde_json::Map::new();
            for (name, child) in properties {
                props.insert(name.clone(), schema_to_wire(child));
            }
            json!({
                "type": "OBJECT",
                "required": required,
                "properties": Value::Object(props),
            })
        }
        SchemaNode::Array { items } => json!({
            "type": "ARRAY",
            "items": schema_to_wire(items.as_ref()),
        }),
        SchemaNode::String => json!({ "type": "STRING" }),
        SchemaNode::Number => json!({ "type": "NUMBER" }),
        SchemaNode::Union { variants } => json!({
            "anyOf": variants.iter().map(schema_to_wire).collect::<Vec<_>>(),
        }),
    }
}
