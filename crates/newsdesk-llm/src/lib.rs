//! Text-generation client with schema-constrained output and retry policy.
//!
//! [`TextGenerator`] is the seam every pipeline stage depends on. The
//! production implementation, [`OpenAiClient`], talks to any
//! OpenAI-compatible `/chat/completions` endpoint and wraps each call in
//! [`retry::execute`].

pub mod client;
pub mod error;
pub mod generator;
pub mod retry;
pub mod schema;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use client::OpenAiClient;
pub use error::LlmError;
pub use generator::{
    generate_structured, parse_structured, CallKind, GenerationRequest, TextGenerator,
};
pub use retry::{RetryError, RetryPolicy};
pub use schema::{restrict_field_values, StructuredOutput};
