//! cache_clear tool implementation.
//!
//! Deletes every store regardless of generation.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use slidecache_core::Error;

use crate::edge::ControlHandle;

pub async fn clear_impl(control: &ControlHandle) -> Result<CallToolResult, McpError> {
    let result = control.clear_all_caches().await?;
    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize clear result: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::control::{ClearResult, spawn};
    use crate::edge::testing::active_service;
    use slidecache_core::AppConfig;

    #[tokio::test]
    async fn test_clear_impl() {
        let (edge, _) = active_service(AppConfig::default()).await;
        let (control, _) = spawn(edge.clone(), 4);

        let result = clear_impl(&control).await.unwrap();
        let text = result.content[0].as_text().unwrap().text.clone();
        let cleared: ClearResult = serde_json::from_str(&text).unwrap();
        assert!(cleared.success);
        assert!(edge.db().store_names().await.unwrap().is_empty());
    }
}
