//! Wire types for Baidu's Wenxin Workshop (ERNIE) chat and embedding APIs.
//!
//! Reference: <https://cloud.baidu.com/doc/WENXINWORKSHOP/s/flfmc9do2>

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErnieMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErnieChatRequest {
    pub messages: Vec<ErnieMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty_score: Option<f64>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub disable_search: bool,
    pub enable_citation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// ERNIE reports failures inline in an otherwise ordinary response body,
/// sometimes with HTTP 200.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErnieError {
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub error_msg: String,
}

impl ErnieError {
    pub fn is_set(&self) -> bool {
        !self.error_msg.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErnieChatResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub usage: ErnieUsage,
    #[serde(flatten)]
    pub error: ErnieError,
}

/// One record of a streamed chat response. Usage figures are cumulative
/// totals for the whole response so far, not per-record deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErnieStreamChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub sentence_id: i64,
    #[serde(default)]
    pub is_end: bool,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub usage: ErnieUsage,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ErnieUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErnieEmbeddingRequest {
    pub input: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErnieEmbeddingResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub data: Vec<ErnieEmbeddingData>,
    #[serde(default)]
    pub usage: ErnieUsage,
    #[serde(flatten)]
    pub error: ErnieError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErnieEmbeddingData {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub embedding: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_decodes_alongside_content() {
        let resp: ErnieChatResponse = serde_json::from_str(
            r#"{"id":"as-1","result":"partial","error_code":110,"error_msg":"Access token invalid"}"#,
        )
        .unwrap();
        assert!(resp.error.is_set());
        assert_eq!(resp.error.error_code, 110);
        assert_eq!(resp.result, "partial");
    }

    #[test]
    fn test_clean_response_has_no_error() {
        let resp: ErnieChatResponse = serde_json::from_str(
            r#"{"id":"as-2","object":"chat.completion","created":5,"result":"hi","usage":{"prompt_tokens":1,"completion_tokens":2,"total_tokens":3}}"#,
        )
        .unwrap();
        assert!(!resp.error.is_set());
        assert_eq!(resp.usage.total_tokens, 3);
    }

    #[test]
    fn test_stream_chunk_defaults() {
        let chunk: ErnieStreamChunk =
            serde_json::from_str(r#"{"id":"as-3","result":"hello"}"#).unwrap();
        assert!(!chunk.is_end);
        assert_eq!(chunk.usage.total_tokens, 0);
    }
}
