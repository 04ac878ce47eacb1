//! cache_info tool implementation.
//!
//! Reports every open store with its entry count.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use slidecache_core::Error;

use crate::edge::ControlHandle;

pub async fn info_impl(control: &ControlHandle) -> Result<CallToolResult, McpError> {
    let info = control.cache_info().await?;
    let json = serde_json::to_string_pretty(&info)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize cache info: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::control::{CacheInfo, spawn};
    use crate::edge::testing::active_service;
    use slidecache_core::AppConfig;

    #[tokio::test]
    async fn test_info_impl_lists_stores() {
        let (edge, _) = active_service(AppConfig::default()).await;
        let (control, _) = spawn(edge, 4);

        let result = info_impl(&control).await.unwrap();
        let text = result.content[0].as_text().unwrap().text.clone();
        let info: CacheInfo = serde_json::from_str(&text).unwrap();
        assert_eq!(info.keys().collect::<Vec<_>>(), vec!["slidecache-static-v1"]);
    }
}
