//! slide_navigate tool implementation.
//!
//! Records a navigation, enqueues adjacent slides and drains the preload
//! queue in the background.

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use slidecache_client::{ResourceManager, SlideDeck};
use slidecache_core::Error;

use crate::deck::ConfiguredDeck;
use crate::error::ToolError;

/// Input parameters for slide_navigate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SlideNavigateParams {
    /// Zero-based index of the slide now shown.
    pub index: usize,
}

/// Output structure for slide_navigate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SlideNavigateOutput {
    pub current: usize,
    pub total: usize,
    /// Slides newly queued for preloading, in priority order.
    pub enqueued: Vec<usize>,
}

pub async fn navigate_impl(
    manager: &Arc<ResourceManager>, deck: &ConfiguredDeck, params: SlideNavigateParams,
) -> Result<CallToolResult, McpError> {
    let total = deck.slide_count();
    if params.index >= total {
        return Err(ToolError::SlideOutOfRange { index: params.index, count: total }.into());
    }

    deck.mark_rendered(params.index);
    let enqueued = manager.navigate(params.index).await;

    if !enqueued.is_empty() {
        let manager = Arc::clone(manager);
        tokio::spawn(async move {
            let report = manager.run_preloads().await;
            tracing::debug!(
                completed = ?report.completed,
                cancelled = ?report.cancelled,
                failed = ?report.failed,
                "preload queue drained"
            );
        });
    }

    let output = SlideNavigateOutput { current: params.index, total, enqueued };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize navigation: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Implementation of the resource_stats tool.
pub async fn stats_impl(manager: &ResourceManager) -> Result<CallToolResult, McpError> {
    let stats = manager.stats().await;
    let json = serde_json::to_string_pretty(&stats)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize stats: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
