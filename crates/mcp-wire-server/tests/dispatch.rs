//! Integration tests for the per-session dispatcher.
//!
//! Drives whole JSON-RPC exchanges through `Dispatcher` with the built-in
//! collaborators plus a few purpose-built ones.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use mcp_wire::{
    DomainError, HandshakeConfig, JsonRpcResponse, McpError, Method, RequestParams,
    SessionState, MCP_VERSION,
};
use mcp_wire_server::config::ServerConfig;
use mcp_wire_server::dispatch::Dispatcher;
use mcp_wire_server::handlers::{handler_fn, HandlerRegistry, SessionRef};

// ─────────────────────── helpers ───────────────────────

fn config_for(handlers: &HandlerRegistry, threshold: u32) -> Arc<HandshakeConfig> {
    let config = ServerConfig {
        max_consecutive_malformed: threshold,
        instructions: Some("Try the echo tool.".into()),
        ..Default::default()
    };
    Arc::new(config.handshake_config(handlers))
}

fn dispatcher_with(handlers: HandlerRegistry) -> Dispatcher {
    let config = config_for(&handlers, 3);
    Dispatcher::new("test-session", config, Arc::new(handlers))
}

fn builtin() -> Dispatcher {
    dispatcher_with(HandlerRegistry::builtin())
}

/// Build an MCP JSON-RPC request.
fn mcp_request(id: i64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
}

/// Build an initialize request.
fn init_request(version: &str) -> Value {
    mcp_request(
        1,
        "initialize",
        json!({
            "protocolVersion": version,
            "capabilities": {},
            "clientInfo": { "name": "c", "version": "1" }
        }),
    )
}

fn initialized() -> Value {
    json!({"jsonrpc": "2.0", "method": "notifications/initialized"})
}

fn call_tool(id: i64, name: &str, arguments: Value) -> Value {
    mcp_request(id, "tools/call", json!({"name": name, "arguments": arguments}))
}

async fn send(dispatcher: &mut Dispatcher, msg: Value) -> Option<Value> {
    dispatcher
        .handle_value(msg)
        .await
        .map(|r| r.to_value().unwrap())
}

async fn send_unwrap(dispatcher: &mut Dispatcher, msg: Value) -> Value {
    send(dispatcher, msg).await.expect("expected response")
}

async fn ready(dispatcher: &mut Dispatcher) {
    let resp = send_unwrap(dispatcher, init_request(MCP_VERSION)).await;
    assert!(resp.get("result").is_some(), "initialize failed: {resp}");
    assert!(send(dispatcher, initialized()).await.is_none());
    assert_eq!(dispatcher.state(), SessionState::Ready);
}

fn error_code(resp: &Value) -> i64 {
    resp["error"]["code"].as_i64().expect("expected error response")
}

// ═══════════════════════════════════════════════════════
// HANDSHAKE
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_handshake_happy_path() {
    let mut d = builtin();
    assert_eq!(d.state(), SessionState::Uninitialized);

    let resp = send_unwrap(&mut d, init_request("2024-11-05")).await;
    assert_eq!(resp["jsonrpc"], "2.0");
    assert_eq!(resp["id"], 1);
    assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(resp["result"]["serverInfo"]["name"], "mcp-wire-server");
    assert_eq!(resp["result"]["instructions"], "Try the echo tool.");
    assert!(resp["result"]["capabilities"]["tools"].is_object());
    assert!(resp["result"]["capabilities"]["prompts"].is_object());
    assert!(resp["result"]["capabilities"]["logging"].is_object());
    assert_eq!(d.state(), SessionState::Initializing);

    let none = send(&mut d, initialized()).await;
    assert!(none.is_none(), "notifications never produce a response");
    assert_eq!(d.state(), SessionState::Ready);
}

#[tokio::test]
async fn test_version_mismatch() {
    let mut d = builtin();
    let resp = send_unwrap(&mut d, init_request("1999-01-01")).await;
    assert!(resp.get("result").is_none());
    assert_eq!(error_code(&resp), -32800);
    assert_eq!(resp["error"]["data"]["requested"], "1999-01-01");
    assert_eq!(resp["error"]["data"]["supported"], json!(["2024-11-05"]));
    assert_eq!(d.state(), SessionState::Uninitialized);

    // A corrected retry still succeeds.
    let resp = send_unwrap(&mut d, init_request(MCP_VERSION)).await;
    assert!(resp.get("result").is_some());
}

#[tokio::test]
async fn test_ordering_guard() {
    let msg = json!({"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"x","arguments":{}}});

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let mut handlers = HandlerRegistry::new();
    handlers
        .register(
            Method::CallTool,
            handler_fn(move |_payload, _session| {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    anyhow::Ok(json!({"content": []}))
                }
            }),
        )
        .unwrap();
    let mut d = dispatcher_with(handlers);

    let resp = send_unwrap(&mut d, msg.clone()).await;
    assert_eq!(error_code(&resp), -32600);
    assert_eq!(resp["id"], 2);
    assert_eq!(d.state(), SessionState::Uninitialized);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    ready(&mut d).await;
    let resp = send_unwrap(&mut d, msg).await;
    assert_eq!(resp["result"], json!({"content": []}));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_request_while_initializing_rejected() {
    let mut d = builtin();
    send_unwrap(&mut d, init_request(MCP_VERSION)).await;
    let resp = send_unwrap(&mut d, call_tool(2, "echo", json!({"text": "hi"}))).await;
    assert_eq!(error_code(&resp), -32600);
    assert!(resp["error"]["message"]
        .as_str()
        .unwrap()
        .contains("not initialized"));
    assert_eq!(d.state(), SessionState::Initializing);
}

#[tokio::test]
async fn test_duplicate_initialize() {
    let mut d = builtin();
    ready(&mut d).await;
    let resp = send_unwrap(&mut d, init_request(MCP_VERSION)).await;
    assert_eq!(error_code(&resp), -32600);
    assert!(resp["error"]["message"]
        .as_str()
        .unwrap()
        .contains("already initialized"));
    assert_eq!(d.state(), SessionState::Ready);
}

// ═══════════════════════════════════════════════════════
// DECODING
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_unknown_method() {
    let mut d = builtin();
    let resp = send_unwrap(
        &mut d,
        json!({"jsonrpc":"2.0","id":3,"method":"nope","params":{}}),
    )
    .await;
    assert_eq!(error_code(&resp), -32601);
    assert_eq!(resp["id"], 3);
}

#[tokio::test]
async fn test_known_method_without_handler() {
    let mut d = builtin();
    ready(&mut d).await;
    let resp = send_unwrap(
        &mut d,
        mcp_request(
            4,
            "sampling/createMessage",
            json!({"messages": [], "maxTokens": 10}),
        ),
    )
    .await;
    assert_eq!(error_code(&resp), -32601);
}

#[tokio::test]
async fn test_invalid_params_carry_path() {
    let mut d = builtin();
    ready(&mut d).await;
    let resp = send_unwrap(
        &mut d,
        mcp_request(
            5,
            "sampling/createMessage",
            json!({
                "messages": [{"role": "user", "content": {"type": "bogus"}}],
                "maxTokens": 10
            }),
        ),
    )
    .await;
    assert_eq!(error_code(&resp), -32602);
    assert_eq!(
        resp["error"]["data"]["path"],
        "params.messages[0].content.type"
    );
    assert_eq!(d.state(), SessionState::Ready);
}

#[tokio::test]
async fn test_ambiguous_resource_contents() {
    let mut d = builtin();
    ready(&mut d).await;
    let resp = send_unwrap(
        &mut d,
        mcp_request(
            6,
            "sampling/createMessage",
            json!({
                "messages": [{
                    "role": "user",
                    "content": {
                        "type": "resource",
                        "resource": {"uri": "u", "mimeType": "m", "text": "t", "blob": "AQID"}
                    }
                }],
                "maxTokens": 10
            }),
        ),
    )
    .await;
    assert_eq!(error_code(&resp), -32602);
    assert_eq!(
        resp["error"]["data"]["path"],
        "params.messages[0].content.resource"
    );
}

#[tokio::test]
async fn test_invalid_params_before_initialize() {
    // Decoding runs before the handshake gate.
    let mut d = builtin();
    let resp = send_unwrap(&mut d, mcp_request(7, "tools/call", json!({}))).await;
    assert_eq!(error_code(&resp), -32602);
    assert_eq!(resp["error"]["data"]["path"], "params.name");
}

// ═══════════════════════════════════════════════════════
// ENVELOPES
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_parse_error_has_null_id() {
    let mut d = builtin();
    let resp = d.handle_text("{not json").await.unwrap().to_value().unwrap();
    assert_eq!(resp["id"], Value::Null);
    assert_eq!(error_code(&resp), -32700);
}

#[tokio::test]
async fn test_unrecognized_envelope() {
    let mut d = builtin();
    let resp = send_unwrap(&mut d, json!({"jsonrpc": "2.0", "id": 9})).await;
    assert_eq!(error_code(&resp), -32700);
    assert_eq!(resp["id"], 9);

    let resp = send_unwrap(&mut d, json!([1, 2, 3])).await;
    assert_eq!(error_code(&resp), -32700);
    assert_eq!(resp["id"], Value::Null);
}

#[tokio::test]
async fn test_bad_version_correlates_id() {
    let mut d = builtin();
    let resp = send_unwrap(
        &mut d,
        json!({"jsonrpc": "1.0", "id": "abc", "method": "initialize"}),
    )
    .await;
    assert_eq!(error_code(&resp), -32600);
    assert_eq!(resp["id"], "abc");
}

#[tokio::test]
async fn test_malformed_notification_is_dropped() {
    let mut d = builtin();
    assert!(send(&mut d, json!({"jsonrpc": "2.0", "method": 7})).await.is_none());
    assert_eq!(d.state(), SessionState::Uninitialized);
}

#[tokio::test]
async fn test_client_responses_are_ignored() {
    let mut d = builtin();
    ready(&mut d).await;
    assert!(send(&mut d, json!({"jsonrpc": "2.0", "id": 1, "result": {}}))
        .await
        .is_none());
    assert!(send(
        &mut d,
        json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -1, "message": "x"}})
    )
    .await
    .is_none());
    assert_eq!(d.state(), SessionState::Ready);
}

#[tokio::test]
async fn test_cancel_and_unknown_notifications_ignored() {
    let mut d = builtin();
    ready(&mut d).await;
    for method in ["notifications/cancelled", "notifications/whatever"] {
        assert!(send(&mut d, json!({"jsonrpc": "2.0", "method": method}))
            .await
            .is_none());
    }
    assert_eq!(d.state(), SessionState::Ready);
}

// ═══════════════════════════════════════════════════════
// SESSION LIFETIME
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_malformed_threshold_closes_session() {
    let mut d = builtin();
    for _ in 0..3 {
        let resp = d.handle_text("garbage").await.unwrap();
        assert!(!resp.is_success());
        assert!(!d.is_closed());
    }
    // The fourth strike exceeds the threshold of 3. It is still answered,
    // then the session closes.
    assert!(d.handle_text("garbage").await.is_some());
    assert!(d.is_closed());

    assert!(send(&mut d, init_request(MCP_VERSION)).await.is_none());
}

#[tokio::test]
async fn test_recoverable_errors_reset_threshold() {
    let mut d = builtin();
    d.handle_text("garbage").await;
    d.handle_text("garbage").await;
    // Has an id, so it is answerable and does not count.
    send_unwrap(&mut d, json!({"jsonrpc": "2.0", "id": 5})).await;
    d.handle_text("garbage").await;
    d.handle_text("garbage").await;
    assert!(!d.is_closed());
}

#[tokio::test]
async fn test_close_drops_everything() {
    let mut d = builtin();
    ready(&mut d).await;
    d.close();
    assert_eq!(d.state(), SessionState::Closed);
    assert!(send(&mut d, call_tool(2, "echo", json!({"text": "x"})))
        .await
        .is_none());
}

// ═══════════════════════════════════════════════════════
// COLLABORATORS
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_builtin_echo_tool() {
    let mut d = builtin();
    ready(&mut d).await;
    let resp = send_unwrap(&mut d, call_tool(2, "echo", json!({"text": "hello"}))).await;
    assert_eq!(resp["id"], 2);
    assert_eq!(resp["result"]["content"][0]["type"], "text");
    assert_eq!(resp["result"]["content"][0]["text"], "hello");
}

#[tokio::test]
async fn test_builtin_unknown_tool_passes_domain_error() {
    let mut d = builtin();
    ready(&mut d).await;
    let resp = send_unwrap(&mut d, call_tool(2, "nope", json!({}))).await;
    assert_eq!(error_code(&resp), -32602);
    assert_eq!(resp["error"]["message"], "Unknown tool: nope");
    assert_eq!(resp["error"]["data"]["available"], json!(["echo", "add"]));
}

#[tokio::test]
async fn test_builtin_prompt_and_completion() {
    let mut d = builtin();
    ready(&mut d).await;

    let resp = send_unwrap(
        &mut d,
        mcp_request(
            2,
            "prompts/get",
            json!({"name": "greeting", "arguments": {"name": "Ada", "style": "pirate"}}),
        ),
    )
    .await;
    assert_eq!(resp["result"]["messages"][0]["role"], "user");
    assert!(resp["result"]["messages"][0]["content"]["text"]
        .as_str()
        .unwrap()
        .contains("pirate"));

    let resp = send_unwrap(
        &mut d,
        mcp_request(
            3,
            "completion/complete",
            json!({
                "ref": {"type": "ref/prompt", "name": "greeting"},
                "argument": {"name": "style", "value": "p"}
            }),
        ),
    )
    .await;
    assert_eq!(resp["result"]["completion"]["values"], json!(["pirate"]));
}

#[tokio::test]
async fn test_domain_error_passthrough() {
    let mut handlers = HandlerRegistry::new();
    handlers
        .register(
            Method::GetPrompt,
            handler_fn(|_payload, _session| async {
                Err::<Value, _>(anyhow::Error::from(
                    DomainError::new(-31001, "prompt quota exhausted")
                        .with_data(json!({"retryAfter": 30})),
                ))
            }),
        )
        .unwrap();
    let mut d = dispatcher_with(handlers);
    ready(&mut d).await;

    let resp = send_unwrap(&mut d, mcp_request(2, "prompts/get", json!({"name": "p"}))).await;
    assert_eq!(
        resp["error"],
        json!({"code": -31001, "message": "prompt quota exhausted", "data": {"retryAfter": 30}})
    );
}

#[tokio::test]
async fn test_handler_mcp_error_keeps_code() {
    let mut handlers = HandlerRegistry::new();
    handlers
        .register(
            Method::CallTool,
            handler_fn(|_payload, _session| async {
                Err::<Value, _>(anyhow::Error::from(McpError::invalid_params(
                    "params.arguments.x",
                    "must be positive",
                )))
            }),
        )
        .unwrap();
    let mut d = dispatcher_with(handlers);
    ready(&mut d).await;

    let resp = send_unwrap(&mut d, call_tool(2, "t", json!({}))).await;
    assert_eq!(error_code(&resp), -32602);
    assert_eq!(resp["error"]["data"]["path"], "params.arguments.x");
}

#[tokio::test]
async fn test_unexpected_failure_is_internal_error() {
    let mut handlers = HandlerRegistry::new();
    handlers
        .register(
            Method::CallTool,
            handler_fn(|_payload, _session| async {
                Err::<Value, _>(anyhow::anyhow!("database unreachable"))
            }),
        )
        .unwrap();
    let mut d = dispatcher_with(handlers);
    ready(&mut d).await;

    let resp = send_unwrap(&mut d, call_tool(2, "t", json!({}))).await;
    assert_eq!(error_code(&resp), -32603);
    assert_eq!(resp["id"], 2);
}

#[tokio::test]
async fn test_panicking_handler_does_not_kill_session() {
    let mut handlers = HandlerRegistry::new();
    handlers
        .register(
            Method::CallTool,
            handler_fn(|payload: RequestParams, _session| async move {
                if let RequestParams::CallTool(call) = &payload {
                    if call.name == "explode" {
                        panic!("handler blew up");
                    }
                }
                anyhow::Ok(json!({"content": []}))
            }),
        )
        .unwrap();
    let mut d = dispatcher_with(handlers);
    ready(&mut d).await;

    let resp = send_unwrap(&mut d, call_tool(2, "explode", json!({}))).await;
    assert_eq!(error_code(&resp), -32603);
    assert_eq!(resp["id"], 2);

    let resp = send_unwrap(&mut d, call_tool(3, "fine", json!({}))).await;
    assert_eq!(resp["result"], json!({"content": []}));
    assert_eq!(d.state(), SessionState::Ready);
}

#[tokio::test]
async fn test_handler_sees_session_snapshot() {
    let mut handlers = HandlerRegistry::new();
    handlers
        .register(
            Method::CallTool,
            handler_fn(|_payload, session: SessionRef| async move {
                anyhow::Ok(serde_json::to_value(session)?)
            }),
        )
        .unwrap();
    let mut d = dispatcher_with(handlers);
    ready(&mut d).await;

    let resp = send_unwrap(&mut d, call_tool(2, "t", json!({}))).await;
    assert_eq!(resp["result"]["sessionId"], "test-session");
    assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(resp["result"]["clientInfo"]["name"], "c");
}

#[tokio::test]
async fn test_one_response_per_request() {
    let mut d = builtin();
    ready(&mut d).await;
    let mut responses: Vec<JsonRpcResponse> = Vec::new();
    for id in 10..20 {
        if let Some(r) = d
            .handle_value(call_tool(id, "add", json!({"a": id, "b": 1})))
            .await
        {
            responses.push(r);
        }
    }
    let ids: Vec<Value> = responses
        .iter()
        .map(|r| r.to_value().unwrap()["id"].clone())
        .collect();
    assert_eq!(ids, (10..20).map(|i| json!(i)).collect::<Vec<_>>());
}
