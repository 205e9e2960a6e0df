//! Request-side content transforms
//!
//! TOON compression of tool results and the image/large-payload policy.
//! Both run once per request before the outbound call is issued and never
//! touch the stream-processing path. Failures here fall back to the
//! unmodified content; they never abort the outbound call.

pub mod images;
pub mod tokenizer;
pub mod toon;

pub use images::{PolicyBlock, apply_image_policy, truncate_browser_output};
pub use tokenizer::TiktokenTokenizer;
pub use toon::compress_tool_results;
