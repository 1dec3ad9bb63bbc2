//! Shared RPC utilities for interacting with Ethereum JSON-RPC endpoints.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

/// Default timeout for RPC requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Create an HTTP client configured for JSON-RPC and explorer requests.
pub fn create_client(timeout: Duration) -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcError>,
}

/// Make a JSON-RPC call and deserialize the result.
///
/// A `null` result deserializes into `Option::None` for callers that ask for an option.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    tracing::trace!(method, ?params, "JSON-RPC request");

    let response: RpcResponse = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {method} request"))?
        .error_for_status()
        .with_context(|| format!("{method} request rejected"))?
        .json()
        .await
        .with_context(|| format!("Failed to parse {method} response"))?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error {} from {method}: {}", error.code, error.message);
    }

    serde_json::from_value(response.result)
        .with_context(|| format!("Failed to deserialize {method} result"))
}

/// Parse a hex quantity (with 0x prefix) as returned by JSON-RPC.
pub fn parse_quantity(s: &str) -> anyhow::Result<u64> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .with_context(|| format!("Invalid hex quantity: {s}"))
}

/// Deserialize a u64 from a hex string (with 0x prefix).
pub(crate) fn deserialize_u64_from_hex<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    parse_quantity(&s).map_err(serde::de::Error::custom)
}

/// Deserialize a receipt status (`0x1` success, `0x0` revert).
pub(crate) fn deserialize_status<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let status: Option<String> = Deserialize::deserialize(deserializer)?;
    match status.as_deref() {
        // Pre-Byzantium receipts carry no status; treat them as successful.
        None => Ok(true),
        Some(s) => parse_quantity(s)
            .map(|v| v == 1)
            .map_err(serde::de::Error::custom),
    }
}
