//! Scripted JSON-RPC endpoint for integration tests.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use evm_mcp::chains::ChainRegistry;
use evm_mcp::clients::ClientManager;
use evm_mcp::config::{Config, EnvSource};
use evm_mcp::handlers::ToolContext;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// 1000 as a 32-byte word.
pub const CALL_RESULT: &str = "0x00000000000000000000000000000000000000000000000000000000000003e8";

/// A local HTTP server answering a fixed set of `eth_*` methods.
pub struct MockRpc {
    pub url: String,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockRpc {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let calls = Arc::new(Mutex::new(Vec::new()));

        let recorded = calls.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(stream, recorded).await;
                });
            }
        });

        Self { url, calls }
    }

    /// Methods received so far, in arrival order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|m| *m == method).count()
    }
}

fn respond(request: &Value, calls: &Mutex<Vec<String>>) -> Value {
    let method = request["method"].as_str().unwrap_or_default();
    calls.lock().unwrap().push(method.to_string());

    let result = match method {
        "eth_chainId" => json!("0x1"),
        "eth_blockNumber" => json!("0x1234"),
        "eth_getBalance" => json!("0xde0b6b3a7640000"),
        "eth_getTransactionCount" => json!("0x5"),
        "eth_getCode" => json!("0x6001"),
        "eth_gasPrice" => json!("0x3b9aca00"),
        "eth_call" => json!(CALL_RESULT),
        _ => {
            return json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "error": {"code": -32601, "message": "method not found"},
            })
        }
    };
    json!({"jsonrpc": "2.0", "id": request["id"], "result": result})
}

async fn handle_connection(
    mut stream: TcpStream,
    calls: Arc<Mutex<Vec<String>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body: Value = serde_json::from_slice(&buf[header_end..]).unwrap_or(Value::Null);
    let reply = match &body {
        Value::Array(batch) => Value::Array(batch.iter().map(|r| respond(r, &calls)).collect()),
        single => respond(single, &calls),
    };
    let payload = reply.to_string();

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        payload.len(),
        payload
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// Tool context whose environment points the named variables at the mock.
pub fn context_with_env(pairs: &[(&str, &str)]) -> ToolContext {
    let mut env: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    env.insert("DISABLE_DYNAMIC_CHAINS".to_string(), "true".to_string());

    let source: Arc<dyn EnvSource> = Arc::new(env);
    let config = Config::from_env(source.as_ref());
    let registry = Arc::new(ChainRegistry::with_builtin_chains(source));
    registry.load_from_environment();
    ToolContext::new(Arc::new(ClientManager::new(registry, &config)))
}

/// Bound a call so a misbehaving mock fails the test instead of hanging it.
pub async fn within<F: std::future::Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(10), future)
        .await
        .expect("timed out waiting for the mock endpoint")
}
