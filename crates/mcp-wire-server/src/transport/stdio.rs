//! Stdio transport: reads JSON-RPC lines from stdin, writes to stdout.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use mcp_wire::{McpError, McpResult};

use crate::dispatch::Dispatcher;

use super::framing;

/// Stdio transport for desktop MCP clients. One session per process.
pub struct StdioTransport {
    dispatcher: Dispatcher,
}

impl StdioTransport {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run the transport loop over the process's stdin and stdout.
    pub async fn run(&mut self) -> McpResult<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.run_with(stdin, stdout).await
    }

    /// Run the transport loop over any line-oriented reader and writer.
    /// Returns once the reader hits EOF or the session closes.
    pub async fn run_with<R, W>(&mut self, mut reader: R, mut writer: W) -> McpResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();

        tracing::info!(session = %self.dispatcher.session().id(), "Stdio transport started");

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await.map_err(McpError::Io)?;

            if bytes_read == 0 {
                tracing::info!("EOF on stdin, shutting down");
                self.dispatcher.close();
                break;
            }

            let Some(message) = framing::unframe(&line) else {
                continue;
            };

            if let Some(response) = self.dispatcher.handle_text(message).await {
                let framed = framing::frame_response(&response)?;
                writer
                    .write_all(framed.as_bytes())
                    .await
                    .map_err(McpError::Io)?;
                writer.flush().await.map_err(McpError::Io)?;
            }

            if self.dispatcher.is_closed() {
                tracing::warn!("Session closed, stopping stdio transport");
                break;
            }
        }

        Ok(())
    }
}
