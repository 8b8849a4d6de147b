//! Transport integration tests: stdio line framing over in-memory pipes and
//! the HTTP router driven in-process.

use std::sync::Arc;

use serde_json::{json, Value};

use mcp_wire::{HandshakeConfig, SessionState};
use mcp_wire_server::config::ServerConfig;
use mcp_wire_server::dispatch::Dispatcher;
use mcp_wire_server::handlers::HandlerRegistry;
use mcp_wire_server::transport::StdioTransport;

// ─────────────────────── helpers ───────────────────────

fn shared() -> (Arc<HandshakeConfig>, Arc<HandlerRegistry>) {
    let handlers = HandlerRegistry::builtin();
    let config = ServerConfig {
        max_consecutive_malformed: 2,
        ..Default::default()
    }
    .handshake_config(&handlers);
    (Arc::new(config), Arc::new(handlers))
}

fn init_line() -> String {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {"name": "c", "version": "1"}
        }
    })
    .to_string()
}

async fn run_stdio(input: String) -> (Vec<Value>, StdioTransport) {
    let (config, handlers) = shared();
    let mut transport = StdioTransport::new(Dispatcher::new("stdio", config, handlers));
    let mut output = Vec::new();
    transport
        .run_with(input.as_bytes(), &mut output)
        .await
        .unwrap();
    let responses = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    (responses, transport)
}

// ═══════════════════════════════════════════════════════
// STDIO
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_stdio_session() {
    let input = [
        init_line(),
        String::new(),
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#.to_string(),
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"echo","arguments":{"text":"hi"}}}"#.to_string(),
    ]
    .join("\n");

    let (responses, transport) = run_stdio(input).await;
    assert_eq!(responses.len(), 2, "blank lines and notifications get no reply");
    assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(responses[1]["id"], 2);
    assert_eq!(responses[1]["result"]["content"][0]["text"], "hi");

    // EOF closes the session.
    assert_eq!(transport.dispatcher().state(), SessionState::Closed);
}

#[tokio::test]
async fn test_stdio_stops_after_threshold() {
    // Threshold 2: the third garbage line closes the session, so the
    // initialize behind it is never read.
    let input = ["garbage", "garbage", "garbage", init_line().as_str()].join("\n");
    let (responses, transport) = run_stdio(input).await;

    assert_eq!(responses.len(), 3);
    for resp in &responses {
        assert_eq!(resp["error"]["code"], -32700);
        assert_eq!(resp["id"], Value::Null);
    }
    assert!(transport.dispatcher().is_closed());
}

// ═══════════════════════════════════════════════════════
// HTTP
// ═══════════════════════════════════════════════════════

#[cfg(feature = "http")]
mod http_transport {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use tower::ServiceExt;

    use mcp_wire_server::session::SessionRegistry;
    use mcp_wire_server::transport::http::SESSION_HEADER;
    use mcp_wire_server::transport::HttpTransport;

    fn app() -> Router {
        let (config, handlers) = shared();
        HttpTransport::new(SessionRegistry::new(config, handlers)).router()
    }

    async fn post(
        app: &Router,
        session: Option<&str>,
        body: String,
    ) -> (StatusCode, Option<String>, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json");
        if let Some(id) = session {
            builder = builder.header(SESSION_HEADER, id);
        }
        let response = app
            .clone()
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let session = response
            .headers()
            .get(SESSION_HEADER)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, session, body)
    }

    async fn health(app: &Router) -> Value {
        let response = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_http_session_lifecycle() {
        let app = app();

        let (status, session, body) = post(&app, None, init_line()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["protocolVersion"], "2024-11-05");
        let session = session.expect("initialize assigns a session id");
        assert_eq!(health(&app).await["sessions"], 1);

        let (status, _, body) = post(
            &app,
            Some(&session),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body, Value::Null);

        let (status, _, body) = post(
            &app,
            Some(&session),
            json!({
                "jsonrpc": "2.0", "id": 2, "method": "tools/call",
                "params": {"name": "add", "arguments": {"a": 1, "b": 2}}
            })
            .to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 2);
        assert!(body["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("3"));

        let response = app
            .clone()
            .oneshot(
                Request::delete("/mcp")
                    .header(SESSION_HEADER, &session)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(health(&app).await["sessions"], 0);

        let (status, _, _) = post(&app, Some(&session), init_line()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_http_requires_session_header() {
        let app = app();
        let (status, session, body) = post(
            &app,
            None,
            json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": {"name": "echo"}})
                .to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(session.is_none());
        assert_eq!(body["id"], 4);
        assert_eq!(body["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_http_rejected_initialize_opens_nothing() {
        let app = app();
        let body = init_line().replace("2024-11-05", "1999-01-01");
        let (status, session, body) = post(&app, None, body).await;
        assert_eq!(status, StatusCode::OK);
        assert!(session.is_none());
        assert_eq!(body["error"]["code"], -32800);
        assert_eq!(health(&app).await["sessions"], 0);
    }

    #[tokio::test]
    async fn test_http_unknown_session() {
        let app = app();
        let (status, _, body) = post(&app, Some("no-such-session"), init_line()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_http_parse_error_without_session() {
        let app = app();
        let (status, _, body) = post(&app, None, "{oops".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], -32700);
        assert_eq!(body["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_http_health() {
        let body = health(&app()).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sessions"], 0);
    }
}
