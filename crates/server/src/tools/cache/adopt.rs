//! version_adopt tool implementation.
//!
//! Asks the edge to promote its waiting generation. The control message has
//! no reply; the output echoes what was sent.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};

use crate::edge::ControlHandle;

pub async fn adopt_impl(control: &ControlHandle) -> Result<CallToolResult, McpError> {
    control.adopt_new_version().await?;
    Ok(CallToolResult::success(vec![Content::text(r#"{ "sent": "adopt-new-version" }"#)]))
}
