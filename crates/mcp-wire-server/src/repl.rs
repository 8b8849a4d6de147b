//! Interactive REPL for the mcp-wire server.
//!
//! Launch with `mcp-wire-server repl`. Lines starting with `/` are shell
//! commands; anything else is sent as a JSON-RPC message to a local session
//! and the response, if any, is printed.

use std::sync::Arc;

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};
use serde_json::json;
use tokio::runtime::Handle;

use mcp_wire::{HandshakeConfig, INITIALIZED_NOTIFICATION, MCP_VERSION};

use crate::dispatch::Dispatcher;
use crate::handlers::HandlerRegistry;

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/init", "Run the initialize handshake"),
    ("/state", "Show the session state"),
    ("/reset", "Start a fresh session"),
    ("/info", "Show server info and registered methods"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// REPL helper for tab completion.
#[derive(Default)]
struct WireHelper;

impl Completer for WireHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];
        if !input.starts_with('/') || input.contains(' ') {
            return Ok((pos, Vec::new()));
        }
        let matches: Vec<Pair> = COMMANDS
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(input))
            .map(|(cmd, desc)| Pair {
                display: format!("{cmd:<16} {desc}"),
                replacement: format!("{cmd} "),
            })
            .collect();
        Ok((0, matches))
    }
}

impl Hinter for WireHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .find(|(cmd, _)| cmd.starts_with(line) && *cmd != line)
            .map(|(cmd, _)| cmd[line.len()..].to_string())
    }
}

impl Highlighter for WireHelper {}
impl Validator for WireHelper {}
impl Helper for WireHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

struct ReplState {
    config: Arc<HandshakeConfig>,
    handlers: Arc<HandlerRegistry>,
    dispatcher: Dispatcher,
    next_id: i64,
}

impl ReplState {
    fn new(config: Arc<HandshakeConfig>, handlers: Arc<HandlerRegistry>) -> Self {
        let dispatcher = fresh_dispatcher(&config, &handlers);
        Self {
            config,
            handlers,
            dispatcher,
            next_id: 1,
        }
    }

    fn reset(&mut self) {
        self.dispatcher.close();
        self.dispatcher = fresh_dispatcher(&self.config, &self.handlers);
        self.next_id = 1;
    }
}

fn fresh_dispatcher(config: &Arc<HandshakeConfig>, handlers: &Arc<HandlerRegistry>) -> Dispatcher {
    Dispatcher::new(
        uuid::Uuid::new_v4().to_string(),
        config.clone(),
        handlers.clone(),
    )
}

/// Run the interactive REPL. Must be called off the async runtime's worker
/// threads (e.g. from `spawn_blocking`); `runtime` drives the dispatcher.
pub fn run(
    config: Arc<HandshakeConfig>,
    handlers: Arc<HandlerRegistry>,
    runtime: Handle,
) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1mmcp-wire-server v{}\x1b[0m \x1b[90mMCP over JSON-RPC 2.0\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!(
        "    Type JSON-RPC messages, or \x1b[36m/\x1b[0m for commands. \x1b[90mTab\x1b[0m completes, \x1b[90m/exit\x1b[0m quits."
    );
    eprintln!();

    let rl_config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<WireHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(rl_config)?;
    rl.set_helper(Some(WireHelper));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(".mcp_wire_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let mut state = ReplState::new(config, handlers);
    let prompt = " \x1b[36mmcp>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let Some(input) = line.strip_prefix('/') else {
                    send(&mut state, &runtime, line);
                    continue;
                };

                match input.split_whitespace().next().unwrap_or("") {
                    "exit" | "quit" => {
                        eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                        break;
                    }
                    "" | "help" | "h" | "?" => cmd_help(),
                    "clear" | "cls" => eprint!("\x1b[2J\x1b[H"),
                    "init" => cmd_init(&mut state, &runtime),
                    "state" => cmd_state(&state),
                    "reset" => {
                        state.reset();
                        eprintln!("  New session {}", state.dispatcher.session().id());
                    }
                    "info" => cmd_info(&state),
                    cmd => {
                        eprintln!("  Unknown command '/{cmd}'. Type /help for commands.");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    state.dispatcher.close();
    let _ = rl.save_history(&hist_path);

    Ok(())
}

fn send(state: &mut ReplState, runtime: &Handle, text: &str) {
    if state.dispatcher.is_closed() {
        eprintln!("  Session is closed. Use /reset to start a new one.");
        return;
    }
    match runtime.block_on(state.dispatcher.handle_text(text)) {
        Some(response) => match serde_json::to_string_pretty(&response) {
            Ok(pretty) => println!("{pretty}"),
            Err(e) => eprintln!("  Cannot render response: {e}"),
        },
        None => eprintln!("  \x1b[90m(no response)\x1b[0m"),
    }
    if state.dispatcher.is_closed() {
        eprintln!("  Session closed.");
    }
}

fn cmd_init(state: &mut ReplState, runtime: &Handle) {
    let id = state.next_id;
    state.next_id += 1;
    let request = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "initialize",
        "params": {
            "protocolVersion": MCP_VERSION,
            "capabilities": {},
            "clientInfo": {"name": "mcp-wire-repl", "version": env!("CARGO_PKG_VERSION")}
        }
    });
    send(state, runtime, &request.to_string());

    let initialized = json!({"jsonrpc": "2.0", "method": INITIALIZED_NOTIFICATION});
    runtime.block_on(state.dispatcher.handle_value(initialized));
    cmd_state(state);
}

fn cmd_state(state: &ReplState) {
    let session = state.dispatcher.session();
    eprintln!();
    eprintln!("  Session:  {}", session.id());
    eprintln!("  State:    {}", session.state());
    if let Some(version) = session.negotiated_protocol_version() {
        eprintln!("  Protocol: {version}");
    }
    if let Some(client) = session.client_info() {
        eprintln!("  Client:   {} v{}", client.name, client.version);
    }
    eprintln!();
}

fn cmd_info(state: &ReplState) {
    let result = state.config.initialize_result();
    eprintln!();
    eprintln!(
        "  Server:   {} v{}",
        result.server_info.name, result.server_info.version
    );
    eprintln!("  Protocol: {}", result.protocol_version);
    eprintln!("  Methods:");
    for method in state.handlers.methods() {
        eprintln!("    {method}");
    }
    eprintln!();
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<18} {desc}");
    }
    eprintln!();
    eprintln!("  Anything else is sent to the session as a JSON-RPC message, e.g.");
    eprintln!(r#"    {{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{{"name":"echo","arguments":{{"text":"hi"}}}}}}"#);
    eprintln!();
}
