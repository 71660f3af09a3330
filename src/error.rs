//! Error types for the relay.
//!
//! The four failure classes that matter to callers: transport trouble
//! reaching Baidu, undecodable vendor bodies, errors the vendor reports
//! explicitly, and credential/token-exchange failures. Config and
//! serialization errors round out the ambient set.

use thiserror::Error;

use crate::translate::openai_types::ErrorResponse;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RelayError {
    /// Network or timeout failure talking to the vendor. Never retried
    /// here; retry and failover belong to the dispatch layer.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Malformed body from the vendor. Fatal on a non-streaming response;
    /// streaming frames that fail to decode are skipped instead.
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// A failure the vendor reported explicitly, with its numeric code and
    /// the HTTP status it arrived under (often 200).
    #[error("ERNIE error {code}: {message}")]
    Vendor {
        code: i64,
        message: String,
        status: u16,
    },

    /// Malformed credential key or failed token exchange.
    #[error("Credential error: {message}")]
    Credential { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl RelayError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Map to the canonical error body plus the HTTP status to send it
    /// under. Vendor errors mirror the vendor's own status; everything
    /// else falls into the usual gateway buckets.
    pub fn to_error_response(&self) -> (u16, ErrorResponse) {
        match self {
            RelayError::Vendor {
                code,
                message,
                status,
            } => (*status, ErrorResponse::vendor(*code, message.clone())),
            RelayError::Credential { message } => (
                401,
                ErrorResponse::new("credential_error", message.clone()),
            ),
            RelayError::Transport(e) => {
                (502, ErrorResponse::new("transport_error", e.to_string()))
            }
            RelayError::Decode { message } => {
                (502, ErrorResponse::new("decode_error", message.clone()))
            }
            other => (500, ErrorResponse::new("internal_error", other.to_string())),
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_error_keeps_code_and_status() {
        let err = RelayError::Vendor {
            code: 110,
            message: "Access token invalid".to_string(),
            status: 200,
        };

        let (status, body) = err.to_error_response();
        assert_eq!(status, 200);
        assert_eq!(body.error.error_type, "ernie_error");
        assert_eq!(body.error.code, 110);
        assert_eq!(body.error.message, "Access token invalid");
    }

    #[test]
    fn test_credential_error_is_401() {
        let err = RelayError::credential("bad key");
        let (status, body) = err.to_error_response();
        assert_eq!(status, 401);
        assert_eq!(body.error.error_type, "credential_error");
    }

    #[test]
    fn test_decode_error_is_502() {
        let (status, body) = RelayError::decode("truncated body").to_error_response();
        assert_eq!(status, 502);
        assert_eq!(body.error.error_type, "decode_error");
    }
}
