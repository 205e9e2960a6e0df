//! Traits for the external collaborators the adapter layer consumes
//!
//! The gateway owns the concrete implementations (tokenizers, price
//! tables, capability lookups); the adapter layer only sees these
//! interfaces.

use async_trait::async_trait;

/// Per-million-token prices for one model
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModelPricing {
    /// Dollars per million input tokens
    pub input_per_million: f64,
    /// Dollars per million output tokens
    pub output_per_million: f64,
}

/// Token counter keyed by provider/model family
#[async_trait]
pub trait Tokenizer: Send + Sync {
    /// Count the tokens in `text` for the tokenizer's model family
    async fn count_tokens(&self, text: &str) -> u32;
}

/// Token-price lookup keyed by model name
#[async_trait]
pub trait PriceLookup: Send + Sync {
    /// Prices for `model`, `None` when the model is unpriced
    async fn price_for(&self, model: &str) -> Option<ModelPricing>;
}

/// Model capability predicate
pub trait ModelCapabilities: Send + Sync {
    /// Whether `model` accepts image input
    fn supports_images(&self, model: &str) -> bool;
}
