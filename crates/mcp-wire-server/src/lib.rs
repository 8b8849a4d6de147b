//! mcp-wire server: per-session dispatch of MCP messages to collaborators
//! over stdio or HTTP.

pub mod config;
pub mod dispatch;
pub mod handlers;
pub mod repl;
pub mod session;
pub mod transport;

pub use config::ServerConfig;
pub use dispatch::Dispatcher;
pub use handlers::{handler_fn, BoxFuture, HandlerRegistry, MethodHandler, SessionRef};
pub use session::SessionRegistry;
pub use transport::StdioTransport;
