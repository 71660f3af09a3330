//! Translate OpenAI-compatible requests into ERNIE request bodies.
//!
//! ERNIE takes the system prompt as a dedicated top-level field rather than
//! an inline message, has no concept of search augmentation being on by
//! default, and names its sampling knobs differently. Everything here is a
//! pure field mapping.

use super::ernie_types::{ErnieChatRequest, ErnieEmbeddingRequest, ErnieMessage};
use super::openai_types::{ChatCompletionRequest, EmbeddingRequest};

/// Translate a chat request. Message order is preserved; system-role
/// messages are pulled out of the list into ERNIE's `system` field (the
/// last one wins if a caller sends several).
pub fn chat_request(req: &ChatCompletionRequest) -> ErnieChatRequest {
    let mut messages = Vec::with_capacity(req.messages.len());
    let mut system = None;

    for message in &req.messages {
        if message.role == "system" {
            system = Some(message.content.as_text());
        } else {
            messages.push(ErnieMessage {
                role: message.role.clone(),
                content: message.content.as_text(),
            });
        }
    }

    ErnieChatRequest {
        messages,
        temperature: req.temperature,
        top_p: req.top_p,
        penalty_score: req.frequency_penalty,
        stream: req.stream.unwrap_or(false),
        system,
        disable_search: false,
        enable_citation: false,
        max_output_tokens: req.max_tokens,
        user_id: req.user.clone(),
    }
}

pub fn embedding_request(req: &EmbeddingRequest) -> ErnieEmbeddingRequest {
    ErnieEmbeddingRequest {
        input: req.input.texts(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::openai_types::{ChatMessage, EmbeddingInput, MessageContent};
    use std::collections::HashMap;

    fn message(role: &str, content: &str) -> ChatMessage {
        ChatMessage {
            role: role.to_string(),
            content: MessageContent::Text(content.to_string()),
        }
    }

    fn base_request(messages: Vec<ChatMessage>) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "ERNIE-Bot".to_string(),
            messages,
            max_tokens: None,
            temperature: None,
            top_p: None,
            frequency_penalty: None,
            stream: None,
            user: None,
            extra: HashMap::new(),
        }
    }

    #[test]
    fn test_system_message_extracted() {
        let req = base_request(vec![
            message("system", "Be terse."),
            message("user", "hi"),
            message("assistant", "hello"),
            message("user", "bye"),
        ]);

        let ernie = chat_request(&req);

        assert_eq!(ernie.system.as_deref(), Some("Be terse."));
        assert_eq!(ernie.messages.len(), 3);
        assert_eq!(ernie.messages[0].content, "hi");
        assert_eq!(ernie.messages[1].content, "hello");
        assert_eq!(ernie.messages[2].content, "bye");
    }

    #[test]
    fn test_last_system_message_wins() {
        let req = base_request(vec![
            message("system", "first"),
            message("user", "hi"),
            message("system", "second"),
        ]);

        let ernie = chat_request(&req);

        assert_eq!(ernie.system.as_deref(), Some("second"));
        assert_eq!(ernie.messages.len(), 1);
    }

    #[test]
    fn test_sampling_params_mapped() {
        let mut req = base_request(vec![message("user", "hi")]);
        req.temperature = Some(0.7);
        req.top_p = Some(0.9);
        req.frequency_penalty = Some(1.2);
        req.max_tokens = Some(256);
        req.stream = Some(true);
        req.user = Some("u-42".to_string());

        let ernie = chat_request(&req);

        assert_eq!(ernie.temperature, Some(0.7));
        assert_eq!(ernie.top_p, Some(0.9));
        assert_eq!(ernie.penalty_score, Some(1.2));
        assert_eq!(ernie.max_output_tokens, Some(256));
        assert!(ernie.stream);
        assert_eq!(ernie.user_id.as_deref(), Some("u-42"));
        assert!(!ernie.disable_search);
        assert!(!ernie.enable_citation);
    }

    #[test]
    fn test_embedding_input_flattened() {
        let req = EmbeddingRequest {
            model: "Embedding-V1".to_string(),
            input: EmbeddingInput::Single("hello".to_string()),
            user: None,
        };

        let ernie = embedding_request(&req);
        assert_eq!(ernie.input, vec!["hello".to_string()]);
    }
}
