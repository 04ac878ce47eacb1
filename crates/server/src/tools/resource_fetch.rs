//! resource_fetch tool implementation.
//!
//! Routes one request through the edge tier exactly as an intercepted page
//! request would be.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use slidecache_core::{Error, RequestMode, ResourceRequest};

use crate::edge::{EdgeCacheService, RouteOutcome};

/// Input parameters for resource_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResourceFetchParams {
    /// Absolute URL or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET). Anything else bypasses the cache.
    #[serde(default)]
    pub method: Option<String>,

    /// Treat the request as a full-page navigation.
    #[serde(default)]
    pub navigate: bool,

    /// Optional Accept header.
    #[serde(default)]
    pub accept: Option<String>,
}

/// Output structure for resource_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResourceFetchOutput {
    pub url: String,
    pub status: u16,
    /// One of: cache, network, fallback, bypass.
    pub source: String,
    pub content_type: Option<String>,
    pub size: usize,
    /// Body as text when it is valid UTF-8.
    pub body: Option<String>,
}

pub async fn fetch_impl(edge: &EdgeCacheService, params: ResourceFetchParams) -> Result<CallToolResult, McpError> {
    let url = edge.resolve(&params.url)?;
    let mut request = ResourceRequest::get(url);
    if let Some(method) = params.method {
        if method.trim().is_empty() {
            return Err(Error::InvalidInput("method cannot be empty".into()).into());
        }
        request.method = method.to_ascii_uppercase();
    }
    if params.navigate {
        request.mode = RequestMode::Navigate;
    }
    if let Some(accept) = params.accept {
        request = request.with_accept(accept);
    }

    let (response, source) = match edge.route(&request).await {
        RouteOutcome::Responded { response, source } => (response, source.as_str()),
        RouteOutcome::Bypass => (edge.network().fetch(&request).await?, "bypass"),
    };

    let output = ResourceFetchOutput {
        url: response.url.clone(),
        status: response.status,
        source: source.to_string(),
        content_type: response.content_type().map(str::to_string),
        size: response.body.len(),
        body: String::from_utf8(response.body.to_vec()).ok(),
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize response: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
