//! Upstream call orchestration for the ERNIE channel: resolve a token,
//! build the per-model URL, send the request, and translate what comes
//! back.

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::token::TokenCache;
use crate::translate::ernie_types::{ErnieChatResponse, ErnieEmbeddingResponse, ErnieError};
use crate::translate::openai_types::{
    ChatCompletionRequest, ChatCompletionResponse, EmbeddingRequest, EmbeddingResponse,
};
use crate::translate::{request, response};

/// Wenxin Workshop routes each model family through its own path segment.
const MODEL_ENDPOINTS: &[(&str, &str)] = &[
    ("ERNIE-Bot", "completions"),
    ("ERNIE-Bot-turbo", "eb-instant"),
    ("ERNIE-Bot-4", "completions_pro"),
    ("ERNIE-Speed", "ernie_speed"),
    ("Embedding-V1", "embedding-v1"),
    ("BLOOMZ-7B", "bloomz_7b1"),
];

/// Model names with a built-in endpoint mapping.
pub fn known_models() -> impl Iterator<Item = &'static str> {
    MODEL_ENDPOINTS.iter().map(|(name, _)| *name)
}

/// Resolve the endpoint path segment for a model: config override first,
/// then the built-in table, then the lowercased model name as-is.
pub fn model_endpoint(model: &str, config: &RelayConfig) -> String {
    if let Some(endpoint) = config.models.get(model) {
        return endpoint.clone();
    }
    MODEL_ENDPOINTS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(model))
        .map(|(_, endpoint)| (*endpoint).to_string())
        .unwrap_or_else(|| model.to_lowercase())
}

fn chat_url(config: &RelayConfig, endpoint: &str, token: &str) -> String {
    format!(
        "{}/rpc/2.0/ai_custom/v1/wenxinworkshop/chat/{}?access_token={}",
        config.channel.base_url.trim_end_matches('/'),
        endpoint,
        token
    )
}

fn embedding_url(config: &RelayConfig, endpoint: &str, token: &str) -> String {
    format!(
        "{}/rpc/2.0/ai_custom/v1/wenxinworkshop/embeddings/{}?access_token={}",
        config.channel.base_url.trim_end_matches('/'),
        endpoint,
        token
    )
}

async fn post_json<T: serde::Serialize>(
    url: &str,
    body: &T,
    client: &reqwest::Client,
) -> Result<reqwest::Response> {
    let response = client
        .post(url)
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await?;
    Ok(response)
}

/// Relay a non-streaming chat request. A vendor-reported error always wins
/// over any partial content in the body and surfaces as
/// [`RelayError::Vendor`] with the vendor's HTTP status.
pub async fn relay_chat(
    req: &ChatCompletionRequest,
    config: &RelayConfig,
    client: &reqwest::Client,
    tokens: &TokenCache,
) -> Result<ChatCompletionResponse> {
    let ernie_req = request::chat_request(req);

    let key = config.resolve_credential()?;
    let token = tokens.get_token(&key).await?;
    let endpoint = model_endpoint(&req.model, config);
    tracing::debug!(model = %req.model, %endpoint, "relaying chat request");

    let upstream = post_json(&chat_url(config, &endpoint, &token), &ernie_req, client).await?;
    let status = upstream.status().as_u16();
    let body = upstream.bytes().await?;

    let ernie_resp: ErnieChatResponse = serde_json::from_slice(&body)
        .map_err(|e| RelayError::decode(format!("chat response: {e}")))?;

    if ernie_resp.error.is_set() {
        return Err(RelayError::Vendor {
            code: ernie_resp.error.error_code,
            message: ernie_resp.error.error_msg,
            status,
        });
    }

    Ok(response::chat_response(&ernie_resp, &req.model))
}

/// Send a streaming chat request and hand back the open upstream response.
/// Failures the vendor reports before any stream bytes flow (non-2xx with
/// an error body) surface here, while the stream itself is translated by
/// [`relay_stream`](crate::translate::streaming::relay_stream).
pub async fn open_chat_stream(
    req: &ChatCompletionRequest,
    config: &RelayConfig,
    client: &reqwest::Client,
    tokens: &TokenCache,
) -> Result<reqwest::Response> {
    let mut ernie_req = request::chat_request(req);
    ernie_req.stream = true;

    let key = config.resolve_credential()?;
    let token = tokens.get_token(&key).await?;
    let endpoint = model_endpoint(&req.model, config);
    tracing::debug!(model = %req.model, %endpoint, "opening chat stream");

    let upstream = post_json(&chat_url(config, &endpoint, &token), &ernie_req, client).await?;
    let status = upstream.status();

    if !status.is_success() {
        let code = status.as_u16();
        let body = upstream.bytes().await.unwrap_or_default();
        let error: ErnieError = serde_json::from_slice(&body).unwrap_or_default();
        if error.is_set() {
            return Err(RelayError::Vendor {
                code: error.error_code,
                message: error.error_msg,
                status: code,
            });
        }
        return Err(RelayError::decode(format!(
            "upstream answered status {code} before streaming"
        )));
    }

    Ok(upstream)
}

pub async fn relay_embeddings(
    req: &EmbeddingRequest,
    config: &RelayConfig,
    client: &reqwest::Client,
    tokens: &TokenCache,
) -> Result<EmbeddingResponse> {
    let ernie_req = request::embedding_request(req);

    let key = config.resolve_credential()?;
    let token = tokens.get_token(&key).await?;
    let endpoint = model_endpoint(&req.model, config);
    tracing::debug!(model = %req.model, %endpoint, "relaying embedding request");

    let upstream = post_json(
        &embedding_url(config, &endpoint, &token),
        &ernie_req,
        client,
    )
    .await?;
    let status = upstream.status().as_u16();
    let body = upstream.bytes().await?;

    let ernie_resp: ErnieEmbeddingResponse = serde_json::from_slice(&body)
        .map_err(|e| RelayError::decode(format!("embedding response: {e}")))?;

    if ernie_resp.error.is_set() {
        return Err(RelayError::Vendor {
            code: ernie_resp.error.error_code,
            message: ernie_resp.error.error_msg,
            status,
        });
    }

    Ok(response::embedding_response(&ernie_resp, &req.model))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_endpoint_mapping() {
        let config = RelayConfig::default();

        assert_eq!(model_endpoint("ERNIE-Bot", &config), "completions");
        assert_eq!(model_endpoint("ernie-bot-4", &config), "completions_pro");
        assert_eq!(model_endpoint("Embedding-V1", &config), "embedding-v1");
    }

    #[test]
    fn test_config_override_beats_builtin() {
        let mut config = RelayConfig::default();
        config
            .models
            .insert("ERNIE-Bot".to_string(), "custom_path".to_string());

        assert_eq!(model_endpoint("ERNIE-Bot", &config), "custom_path");
    }

    #[test]
    fn test_unknown_model_falls_back_to_lowercase() {
        let config = RelayConfig::default();
        assert_eq!(model_endpoint("Llama-2-7B", &config), "llama-2-7b");
    }

    #[test]
    fn test_chat_url_shape() {
        let config = RelayConfig::default();
        let url = chat_url(&config, "completions", "tok-1");
        assert_eq!(
            url,
            "https://aip.baidubce.com/rpc/2.0/ai_custom/v1/wenxinworkshop/chat/completions?access_token=tok-1"
        );
    }
}
