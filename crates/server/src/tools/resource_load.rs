//! resource_load tool implementation.
//!
//! Resolves a resource through the in-page manager, which answers from its
//! memo caches before going to the edge tier.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use slidecache_client::{AssetKind, ResourceManager};
use slidecache_core::Error;

use crate::error::ToolError;

/// Input parameters for resource_load tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResourceLoadParams {
    /// Absolute URL or a path resolved against the configured origin.
    pub url: String,

    /// In-page cache: "image", "component" or "general" (default: general).
    #[serde(default = "default_cache")]
    pub cache: String,
}

fn default_cache() -> String {
    "general".into()
}

fn parse_cache(name: &str) -> Result<AssetKind, ToolError> {
    match name {
        "image" => Ok(AssetKind::Image),
        "component" => Ok(AssetKind::Component),
        "general" => Ok(AssetKind::General),
        other => Err(ToolError::InvalidInput(format!("unknown cache: {other}"))),
    }
}

pub async fn load_impl(manager: &ResourceManager, params: ResourceLoadParams) -> Result<CallToolResult, McpError> {
    let kind = parse_cache(&params.cache)?;
    let resolved = manager.load(&params.url, kind).await?;
    let json = serde_json::to_string_pretty(&resolved)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize resource: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cache() {
        assert_eq!(parse_cache("image").unwrap(), AssetKind::Image);
        assert_eq!(parse_cache("component").unwrap(), AssetKind::Component);
        assert!(parse_cache("disk").is_err());
    }
}
