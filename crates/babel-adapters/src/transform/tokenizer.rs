//! Tiktoken-backed token counting
//!
//! One `o200k_base` ranking serves every provider here. Counts only feed
//! the compression gain check and the savings estimate, so a few tokens
//! of cross-vendor drift are acceptable; exact billing numbers come from
//! the provider's own usage report.

use async_trait::async_trait;
use thiserror::Error;
use tiktoken_rs::CoreBPE;

use babel_core::Tokenizer;

/// Failure to load the embedded tokenizer ranking
#[derive(Debug, Error)]
#[error("failed to load tokenizer ranking: {0}")]
pub struct TokenizerInitError(String);

/// [`Tokenizer`] over the `o200k_base` BPE ranking
pub struct TiktokenTokenizer {
    bpe: CoreBPE,
}

impl TiktokenTokenizer {
    /// Build the tokenizer from the embedded ranking data
    pub fn new() -> Result<Self, TokenizerInitError> {
        let bpe = tiktoken_rs::o200k_base().map_err(|e| TokenizerInitError(e.to_string()))?;
        Ok(Self { bpe })
    }
}

#[async_trait]
impl Tokenizer for TiktokenTokenizer {
    async fn count_tokens(&self, text: &str) -> u32 {
        u32::try_from(self.bpe.encode_with_special_tokens(text).len()).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_scale_with_input() {
        let tokenizer = TiktokenTokenizer::new().unwrap();
        let short = tokenizer.count_tokens("hello").await;
        let long = tokenizer.count_tokens(&"hello world ".repeat(50)).await;
        assert!(short >= 1);
        assert!(long > short);
    }
}
