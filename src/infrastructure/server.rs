// Infrastructure: stdio tool server
// One JSON request per line in, one JSON response per line out

use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio_stream::wrappers::SplitStream;
use tracing::{debug, info, warn};

use crate::application::OptimizationTool;
use crate::domain::SolverConfig;

pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 4;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub solver: SolverConfig,
    pub max_concurrent_requests: usize,
}

impl ServerConfig {
    pub fn new(solver: SolverConfig) -> Self {
        Self {
            solver,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }

    pub fn with_max_concurrent_requests(mut self, limit: usize) -> Self {
        self.max_concurrent_requests = limit.max(1);
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

#[derive(Debug, Deserialize)]
struct ToolRequest {
    #[serde(default)]
    id: Value,
    tool: String,
    #[serde(default)]
    arguments: Value,
}

/// Answer one request line; blank lines get no response
pub async fn handle_line(tool: &OptimizationTool, line: &str) -> Option<Value> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let request: ToolRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "malformed request line");
            return Some(json!({
                "id": Value::Null,
                "error": format!("Error: Malformed request. {}", e),
            }));
        }
    };

    debug!(id = %request.id, tool = %request.tool, "request");
    let response = match tool.call(&request.tool, &request.arguments).await {
        Ok(result) => json!({ "id": request.id, "result": result }),
        Err(error) => json!({ "id": request.id, "error": error }),
    };
    Some(response)
}

/// Serve requests from `reader` until EOF, writing responses to `writer`.
///
/// Up to `max_concurrent_requests` requests are in flight at once, so
/// responses may come back out of order; callers match them by `id`.
pub async fn serve<R, W>(config: &ServerConfig, reader: R, writer: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let tool = OptimizationTool::new(config.solver.clone());
    let writer = Mutex::new(writer);
    let limit = config.max_concurrent_requests.max(1);

    let (tool, writer) = (&tool, &writer);
    // raw lines: a bad byte is a malformed request, not a read error
    SplitStream::new(reader.split(b'\n'))
        .try_for_each_concurrent(limit, move |raw| async move {
            let line = String::from_utf8_lossy(&raw);
            let Some(response) = handle_line(tool, &line).await else {
                return Ok(());
            };
            let mut bytes = serde_json::to_vec(&response).map_err(io::Error::other)?;
            bytes.push(b'\n');

            let mut out = writer.lock().await;
            out.write_all(&bytes).await?;
            out.flush().await
        })
        .await
}

/// Serve on stdin/stdout
pub async fn start_server(config: ServerConfig) -> io::Result<()> {
    info!(
        backend = %config.solver.backend,
        max_concurrent_requests = config.max_concurrent_requests,
        tools = ?OptimizationTool::TOOLS,
        "optool server ready on stdio"
    );
    serve(&config, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    info!("stdin closed, shutting down");
    Ok(())
}
