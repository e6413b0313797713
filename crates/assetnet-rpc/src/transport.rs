//! Line-delimited stdio transport
//!
//! One JSON-RPC request per input line, one response per output line.

use crate::{Result, RpcError, RpcServer};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::info;

/// STDIO transport for the RPC server
pub struct StdioTransport {
    server: Arc<RpcServer>,
}

impl StdioTransport {
    pub fn new(server: Arc<RpcServer>) -> Self {
        Self { server }
    }

    /// Serve requests from stdin until EOF
    pub async fn run_async(&self) -> Result<()> {
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        self.serve(reader, writer).await
    }

    /// Serve requests from any line-oriented reader
    ///
    /// Blank lines are skipped. Each response is flushed before the next
    /// line is read.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();
        let mut handled = 0usize;

        loop {
            line.clear();
            let n = reader.read_line(&mut line).await.map_err(io_error)?;

            // EOF
            if n == 0 {
                break;
            }

            if line.trim().is_empty() {
                continue;
            }

            let response = self.server.handle_request(line.trim_end()).await?;
            handled += 1;

            writer
                .write_all(response.as_bytes())
                .await
                .map_err(io_error)?;
            writer.write_all(b"\n").await.map_err(io_error)?;
            writer.flush().await.map_err(io_error)?;
        }

        info!(requests = handled, "stdio transport closed");
        Ok(())
    }
}

fn io_error(err: std::io::Error) -> RpcError {
    RpcError::InternalError(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetnet_db::MemoryStore;
    use assetnet_report::ReportOptions;

    fn transport() -> StdioTransport {
        let server = RpcServer::new(Arc::new(MemoryStore::new()), ReportOptions::default());
        StdioTransport::new(Arc::new(server))
    }

    #[tokio::test]
    async fn test_serve_one_response_per_line() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","method":"ping","id":1}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"cidr.expand","params":{"cidr":"10.0.0.0/31"},"id":2}"#,
            "\n",
            "garbage\n",
        );
        let mut output = Vec::new();

        transport().serve(input.as_bytes(), &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["result"]["status"], "ok");
        assert_eq!(lines[1]["result"], serde_json::json!([]));
        assert_eq!(lines[2]["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_serve_empty_input() {
        let mut output = Vec::new();
        transport().serve(&b""[..], &mut output).await.unwrap();
        assert!(output.is_empty());
    }
}
