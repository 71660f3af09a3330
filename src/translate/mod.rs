//! API translation between the OpenAI-compatible surface and ERNIE.
//!
//! The core of the adapter: converts requests, responses, and streaming
//! events between the two formats. Apart from [`streaming::relay_stream`],
//! every translation function is pure (no I/O).

pub mod ernie_types;
pub mod framing;
pub mod openai_types;
pub mod request;
pub mod response;
pub mod streaming;
