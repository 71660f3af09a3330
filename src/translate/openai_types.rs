//! Type definitions for the OpenAI-compatible relay surface.
//!
//! These are the canonical request/response shapes every channel adapter
//! converges to: what callers send us, and what we hand back regardless of
//! which vendor served the request.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Finish reason attached to the terminal chunk of a completed choice.
pub const FINISH_REASON_STOP: &str = "stop";

// ---------------------------------------------------------------------------
// Request types (what callers send TO the relay)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Fields we don't interpret but shouldn't choke on.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

/// Message content arrives either as a plain string or as a list of typed
/// parts; vendors that only understand flat text get [`MessageContent::as_text`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl MessageContent {
    /// Flatten to plain text, concatenating the text parts and ignoring
    /// everything else (images and the like have no ERNIE equivalent).
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter(|p| p.part_type == "text")
                .filter_map(|p| p.text.as_deref())
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Response types (what the relay hands back)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: ChoiceMessage,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

// ---------------------------------------------------------------------------
// Streaming chunk types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChunkDelta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

// ---------------------------------------------------------------------------
// Embedding types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub model: String,
    pub input: EmbeddingInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

impl EmbeddingInput {
    pub fn texts(&self) -> Vec<String> {
        match self {
            EmbeddingInput::Single(text) => vec![text.clone()],
            EmbeddingInput::Batch(texts) => texts.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub object: String,
    pub data: Vec<EmbeddingItem>,
    pub model: String,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingItem {
    pub object: String,
    pub index: u32,
    pub embedding: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(default)]
    pub param: String,
    #[serde(default)]
    pub code: i64,
}

impl ErrorResponse {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                error_type: error_type.into(),
                param: String::new(),
                code: 0,
            },
        }
    }

    /// An error the vendor itself reported, tagged with its origin.
    pub fn vendor(code: i64, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                error_type: "ernie_error".to_string(),
                param: String::new(),
                code,
            },
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new("invalid_request_error", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_from_string() {
        let content: MessageContent = serde_json::from_str("\"hello\"").unwrap();
        assert_eq!(content.as_text(), "hello");
    }

    #[test]
    fn test_content_from_parts_ignores_non_text() {
        let content: MessageContent = serde_json::from_str(
            r#"[{"type":"text","text":"see "},{"type":"image_url"},{"type":"text","text":"this"}]"#,
        )
        .unwrap();
        assert_eq!(content.as_text(), "see this");
    }

    #[test]
    fn test_embedding_input_forms() {
        let single: EmbeddingInput = serde_json::from_str("\"one\"").unwrap();
        assert_eq!(single.texts(), vec!["one".to_string()]);

        let batch: EmbeddingInput = serde_json::from_str(r#"["a","b"]"#).unwrap();
        assert_eq!(batch.texts().len(), 2);
    }

    #[test]
    fn test_request_tolerates_unknown_fields() {
        let req: ChatCompletionRequest = serde_json::from_str(
            r#"{"model":"ERNIE-Bot","messages":[{"role":"user","content":"hi"}],"logit_bias":{}}"#,
        )
        .unwrap();
        assert_eq!(req.model, "ERNIE-Bot");
        assert!(req.extra.contains_key("logit_bias"));
    }

    #[test]
    fn test_terminal_chunk_serializes_finish_reason() {
        let chunk = ChatCompletionChunk {
            id: "as-1".to_string(),
            object: "chat.completion.chunk".to_string(),
            created: 1,
            model: "ERNIE-Bot".to_string(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: ChunkDelta {
                    content: Some("done".to_string()),
                },
                finish_reason: Some(FINISH_REASON_STOP.to_string()),
            }],
        };

        let json = serde_json::to_string(&chunk).unwrap();
        assert!(json.contains("\"finish_reason\":\"stop\""));
    }
}
