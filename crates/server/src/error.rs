//! Structured errors raised by the tool layer itself.
//!
//! Errors from the tiers use `slidecache_core::Error`; these cover argument
//! problems only the tool surface can detect.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., unknown cache name).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Navigation target outside the deck.
    #[error("SLIDE_OUT_OF_RANGE: slide {index} of {count}")]
    SlideOutOfRange { index: usize, count: usize },
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let code = match &err {
            ToolError::InvalidInput(_) => -32602,
            ToolError::SlideOutOfRange { .. } => -32017,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
