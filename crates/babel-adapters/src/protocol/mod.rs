//! Wire-format types for the provider API dialects
//!
//! Pure serde structs matching each vendor's JSON shapes, used only at the
//! serialization boundary. Zhipu, vLLM, Ollama, and Mistral speak the
//! `OpenAI` dialect and reuse [`openai`]'s types.

pub mod anthropic;
pub mod bedrock;
pub mod cohere;
pub mod gemini;
pub mod openai;
