//! Message framing for newline-delimited JSON.

use mcp_wire::{JsonRpcResponse, McpError, McpResult};

/// The message carried by one line, or `None` for a blank line.
pub fn unframe(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Serialize a response to a JSON line (with trailing newline).
pub fn frame_response(response: &JsonRpcResponse) -> McpResult<String> {
    let mut json = serde_json::to_string(response).map_err(McpError::Json)?;
    json.push('\n');
    Ok(json)
}
