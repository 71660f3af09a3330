//! Translate ERNIE response bodies into the canonical format.

use super::ernie_types::{ErnieChatResponse, ErnieEmbeddingResponse, ErnieUsage};
use super::openai_types::{
    ChatCompletionResponse, Choice, ChoiceMessage, EmbeddingItem, EmbeddingResponse, Usage,
    FINISH_REASON_STOP,
};

/// Translate a non-streaming chat response. ERNIE returns a single result
/// string, so there is always exactly one choice. Callers must check
/// [`ErnieError::is_set`](super::ernie_types::ErnieError::is_set) first;
/// a response with a vendor error never reaches this function.
pub fn chat_response(resp: &ErnieChatResponse, model: &str) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: resp.id.clone(),
        object: "chat.completion".to_string(),
        created: resp.created,
        model: model.to_string(),
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage {
                role: "assistant".to_string(),
                content: resp.result.clone(),
            },
            finish_reason: FINISH_REASON_STOP.to_string(),
        }],
        usage: usage_from(&resp.usage),
    }
}

pub fn usage_from(usage: &ErnieUsage) -> Usage {
    Usage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    }
}

pub fn embedding_response(resp: &ErnieEmbeddingResponse, model: &str) -> EmbeddingResponse {
    EmbeddingResponse {
        object: "list".to_string(),
        data: resp
            .data
            .iter()
            .map(|item| EmbeddingItem {
                object: item.object.clone(),
                index: item.index,
                embedding: item.embedding.clone(),
            })
            .collect(),
        model: model.to_string(),
        usage: usage_from(&resp.usage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::ernie_types::{ErnieEmbeddingData, ErnieError};

    #[test]
    fn test_result_string_round_trips() {
        let resp = ErnieChatResponse {
            id: "as-abc".to_string(),
            object: "chat.completion".to_string(),
            created: 1700000000,
            result: "The answer is 42.".to_string(),
            usage: ErnieUsage {
                prompt_tokens: 10,
                completion_tokens: 20,
                total_tokens: 30,
            },
            error: ErnieError::default(),
        };

        let canonical = chat_response(&resp, "ERNIE-Bot");

        assert_eq!(canonical.id, "as-abc");
        assert_eq!(canonical.model, "ERNIE-Bot");
        assert_eq!(canonical.choices.len(), 1);
        assert_eq!(canonical.choices[0].index, 0);
        assert_eq!(canonical.choices[0].message.role, "assistant");
        assert_eq!(canonical.choices[0].message.content, "The answer is 42.");
        assert_eq!(canonical.choices[0].finish_reason, "stop");
        assert_eq!(canonical.usage.prompt_tokens, 10);
        assert_eq!(canonical.usage.completion_tokens, 20);
        assert_eq!(canonical.usage.total_tokens, 30);
    }

    #[test]
    fn test_embedding_items_keep_order() {
        let resp = ErnieEmbeddingResponse {
            id: "as-emb".to_string(),
            object: "embedding_list".to_string(),
            created: 1,
            data: vec![
                ErnieEmbeddingData {
                    object: "embedding".to_string(),
                    index: 0,
                    embedding: vec![0.1, 0.2],
                },
                ErnieEmbeddingData {
                    object: "embedding".to_string(),
                    index: 1,
                    embedding: vec![0.3],
                },
            ],
            usage: ErnieUsage {
                prompt_tokens: 4,
                completion_tokens: 0,
                total_tokens: 4,
            },
            error: ErnieError::default(),
        };

        let canonical = embedding_response(&resp, "Embedding-V1");

        assert_eq!(canonical.object, "list");
        assert_eq!(canonical.data.len(), 2);
        assert_eq!(canonical.data[0].index, 0);
        assert_eq!(canonical.data[1].embedding, vec![0.3]);
        assert_eq!(canonical.usage.total_tokens, 4);
    }
}
