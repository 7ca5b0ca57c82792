//! HTTP client for a single Tendermint RPC endpoint

use anyhow::{anyhow, Result};
use base64::Engine;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

use super::types::{AbciQueryResult, RpcResponse, StatusResult, ValidatorSet};
use crate::errors::EndpointError;

/// ABCI path of the staking module's current validator set
pub const VALIDATOR_SET_PATH: &str = "custom/staking/current-validator-set";

#[derive(Debug, Clone)]
pub struct NodeClient {
    http: HttpClient,
    rpc_url: String,
}

impl NodeClient {
    pub fn new(http: HttpClient, rpc_url: &str) -> Self {
        Self {
            http,
            rpc_url: rpc_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// `status` over JSON-RPC POST
    pub async fn status(&self) -> Result<StatusResult> {
        self.call("status", json!([])).await
    }

    /// `GET <url>/status`, for nodes that only answer URI-style requests
    pub async fn raw_status(&self) -> Result<StatusResult> {
        let mut url = Url::parse(&self.rpc_url)
            .map_err(|e| anyhow!("Invalid RPC url {}: {}", self.rpc_url, e))?;
        if url.scheme() == "tcp" {
            url.set_scheme("http")
                .map_err(|_| anyhow!("Cannot rewrite tcp scheme on {}", self.rpc_url))?;
        }
        let status_url = format!("{}/status", url.as_str().trim_end_matches('/'));

        let response = self
            .http
            .get(&status_url)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to fetch {}: {}", status_url, e))?;

        if !response.status().is_success() {
            return Err(anyhow!("RPC status returned HTTP {}", response.status()));
        }

        let body: RpcResponse<StatusResult> = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse status response: {}", e))?;

        into_result(body)
    }

    pub async fn validator_set(&self) -> Result<ValidatorSet> {
        let result: AbciQueryResult = self
            .call(
                "abci_query",
                json!({ "path": VALIDATOR_SET_PATH, "data": "", "height": "0", "prove": false }),
            )
            .await?;

        if result.response.code != 0 {
            return Err(anyhow!(
                "validator set query failed with code {}: {}",
                result.response.code,
                result.response.log
            ));
        }

        let encoded = result
            .response
            .value
            .ok_or_else(|| anyhow!("validator set query returned no value"))?;
        let raw = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| anyhow!("validator set is not valid base64: {}", e))?;

        serde_json::from_slice(&raw).map_err(|e| anyhow!("Failed to decode validator set: {}", e))
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let request_body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": Uuid::new_v4().to_string()
        });

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| anyhow!("HTTP request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            ));
        }

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse JSON response: {}", e))?;

        into_result(body)
    }
}

fn into_result<T>(body: RpcResponse<T>) -> Result<T> {
    match (body.result, body.error) {
        (Some(result), _) => Ok(result),
        (None, Some(error)) => Err(anyhow!("RPC Error: {}", error.message)),
        (None, None) => Err(anyhow!("Unknown RPC response format")),
    }
}

/// Websocket URL for an endpoint: the explicit one, or `<rpc_url>/websocket`
/// with the scheme mapped to ws/wss.
pub fn websocket_url(rpc_url: &str, ws_url: Option<&str>) -> Result<Url, EndpointError> {
    if let Some(ws) = ws_url.filter(|w| !w.is_empty()) {
        return Url::parse(ws).map_err(|e| EndpointError::InvalidUrl {
            url: ws.to_string(),
            reason: e.to_string(),
        });
    }

    // some public rpcs are served under a path prefix, keep it
    let mut remote = rpc_url.trim_end_matches('/').to_string();
    if !remote.ends_with("/websocket") {
        remote.push_str("/websocket");
    }

    let mut endpoint = Url::parse(&remote).map_err(|e| EndpointError::InvalidUrl {
        url: rpc_url.to_string(),
        reason: e.to_string(),
    })?;

    let scheme = match endpoint.scheme() {
        "http" | "tcp" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(EndpointError::InvalidUrl {
                url: rpc_url.to_string(),
                reason: format!(
                    "protocol {} is unknown, valid choices are http, https, tcp, ws, and wss",
                    other
                ),
            })
        }
    };

    endpoint
        .set_scheme(scheme)
        .map_err(|_| EndpointError::InvalidUrl {
            url: rpc_url.to_string(),
            reason: format!("cannot switch scheme to {}", scheme),
        })?;

    Ok(endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://10.0.0.1:26657", "ws://10.0.0.1:26657/websocket")]
    #[case("https://rpc.example.org/", "wss://rpc.example.org/websocket")]
    #[case("tcp://localhost:26657", "ws://localhost:26657/websocket")]
    #[case("https://rpc.example.org/tm/websocket", "wss://rpc.example.org/tm/websocket")]
    fn test_websocket_url_derivation(#[case] rpc: &str, #[case] expected: &str) {
        assert_eq!(websocket_url(rpc, None).unwrap().as_str(), expected);
    }

    #[test]
    fn test_explicit_websocket_url_wins() {
        let url = websocket_url("http://a:26657", Some("ws://b:1234/ws")).unwrap();
        assert_eq!(url.as_str(), "ws://b:1234/ws");
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        let err = websocket_url("ftp://a:21", None).unwrap_err();
        assert!(err.to_string().contains("protocol ftp is unknown"));
    }

    #[test]
    fn test_validator_lookup_is_case_insensitive() {
        let set = ValidatorSet {
            validators: vec![super::super::types::Validator {
                signer: "0xABCDEF".to_string(),
                jailed: true,
                ..Default::default()
            }],
        };
        assert!(set.find("0xabcdef").unwrap().jailed);
        assert!(set.find("0x123").is_none());
    }
}
