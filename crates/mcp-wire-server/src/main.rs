//! mcp-wire server entry point.

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use mcp_wire_server::config::ServerConfig;
use mcp_wire_server::dispatch::Dispatcher;
use mcp_wire_server::handlers::HandlerRegistry;
use mcp_wire_server::transport::StdioTransport;

#[derive(Parser)]
#[command(
    name = "mcp-wire-server",
    about = "MCP server speaking JSON-RPC 2.0 over stdio or HTTP",
    version
)]
struct Cli {
    /// Path to a JSON config file. Also reads MCP_WIRE_CONFIG.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server over stdio (default).
    Serve,

    /// Start MCP server over HTTP.
    #[cfg(feature = "http")]
    ServeHttp {
        /// Listen address (host:port).
        #[arg(long, default_value = "127.0.0.1:3100")]
        addr: String,
    },

    /// Print the initialize result and registered methods as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   mcp-wire-server completions bash > ~/.local/share/bash-completion/completions/mcp-wire-server
    ///   mcp-wire-server completions zsh > ~/.zfunc/_mcp-wire-server
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },

    /// Launch interactive REPL mode.
    Repl,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "mcp-wire-server", &mut std::io::stdout());
        return Ok(());
    }

    let server_config = ServerConfig::resolve(cli.config.as_deref())?;
    let handlers = Arc::new(HandlerRegistry::builtin());
    let config = Arc::new(server_config.handshake_config(&handlers));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            tracing::info!(
                "{} v{} on stdio",
                config.server_info.name,
                config.server_info.version
            );
            let dispatcher = Dispatcher::new(uuid::Uuid::new_v4().to_string(), config, handlers);
            let mut transport = StdioTransport::new(dispatcher);
            transport.run().await?;
        }

        #[cfg(feature = "http")]
        Commands::ServeHttp { addr } => {
            use mcp_wire_server::session::SessionRegistry;
            use mcp_wire_server::transport::HttpTransport;

            tracing::info!(
                "{} v{} over HTTP",
                config.server_info.name,
                config.server_info.version
            );
            let transport = HttpTransport::new(SessionRegistry::new(config, handlers));
            transport.run(&addr).await?;
        }

        Commands::Info => {
            let result = config.initialize_result();
            let info = serde_json::json!({
                "server": result.server_info,
                "protocol_version": result.protocol_version,
                "capabilities": result.capabilities,
                "instructions": result.instructions,
                "methods": handlers.methods().iter().map(|m| m.as_str()).collect::<Vec<_>>(),
                "max_consecutive_malformed": config.max_consecutive_malformed,
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { .. } => {}

        Commands::Repl => {
            let runtime = tokio::runtime::Handle::current();
            tokio::task::spawn_blocking(move || {
                mcp_wire_server::repl::run(config, handlers, runtime)
            })
            .await??;
        }
    }

    Ok(())
}
