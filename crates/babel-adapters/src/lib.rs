//! Provider adapter and protocol-normalization layer
//!
//! Translates between each supported vendor's chat-completion wire format
//! (`OpenAI`, Anthropic, Gemini, Bedrock, Cohere, Zhipu, plus the
//! OpenAI-compatible vLLM/Ollama/Mistral dialects) and the common internal
//! representation in `babel-core`. The gateway handler drives this crate
//! through four operations: build a request adapter from an inbound
//! payload, build a response adapter from a complete upstream response,
//! build a stream adapter before issuing a streaming call, and map any
//! failure through the error taxonomy mapper.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod error;
pub mod protocol;
pub mod request;
pub mod response;
pub mod stream;
pub mod transform;

pub use error::map_provider_error;
pub use request::{AdapterError, RequestAdapter};
pub use response::ResponseAdapter;
pub use stream::{ChunkProcessingResult, SseFrameDecoder, StreamAccumulator, StreamAdapter, StreamPhase};
