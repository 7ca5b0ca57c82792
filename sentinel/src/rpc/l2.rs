//! L2 execution-layer height, used to decide whether the latest epoch is current

use anyhow::{anyhow, Result};
use reqwest::Client as HttpClient;
use serde_json::json;

use super::types::RpcResponse;

/// `eth_blockNumber` on the L2 HTTP JSON-RPC
pub async fn fetch_block_number(client: &HttpClient, l2_rpc_url: &str) -> Result<u64> {
    let request_body = json!({
        "jsonrpc": "2.0",
        "method": "eth_blockNumber",
        "params": [],
        "id": 1
    });

    let response = client
        .post(l2_rpc_url)
        .json(&request_body)
        .send()
        .await
        .map_err(|e| anyhow!("L2 height request to {} failed: {}", l2_rpc_url, e))?;

    if !response.status().is_success() {
        return Err(anyhow!("L2 height request returned HTTP {}", response.status()));
    }

    let body: RpcResponse<String> = response
        .json()
        .await
        .map_err(|e| anyhow!("Failed to parse eth_blockNumber response: {}", e))?;

    let hex = match (body.result, body.error) {
        (Some(result), _) => result,
        (None, Some(error)) => return Err(anyhow!("eth_blockNumber error: {}", error.message)),
        (None, None) => return Err(anyhow!("eth_blockNumber returned no result")),
    };

    parse_hex_quantity(&hex)
}

fn parse_hex_quantity(value: &str) -> Result<u64> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| anyhow!("'{}' is not a hex quantity", value))?;
    u64::from_str_radix(digits, 16).map_err(|e| anyhow!("invalid block number '{}': {}", value, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_quantity() {
        assert_eq!(parse_hex_quantity("0x10").unwrap(), 16);
        assert_eq!(parse_hex_quantity("0x1a2b3c").unwrap(), 0x1a2b3c);
        assert!(parse_hex_quantity("1234").is_err());
        assert!(parse_hex_quantity("0xzz").is_err());
    }
}
