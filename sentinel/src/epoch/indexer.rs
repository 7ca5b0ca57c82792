//! Sequencer-set indexer (GraphQL)

use anyhow::{anyhow, Result};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::types::{decimal_epoch_id, Epoch};
use crate::constants::epochs::FETCH_COUNT;

const EPOCHS_QUERY: &str = r#"
query ($skip: Int, $first: Int, $address: String) {
    epoches(
        skip: $skip
        first: $first
        orderBy: block
        orderDirection: desc
        subgraphError: allow
        where: { signer: $address }
    ) {
        id
        startBlock
        endBlock
        signer
        transaction
        recommited
        block
        blockTimestamp
    }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct EpochesData {
    #[serde(default)]
    epoches: Vec<Epoch>,
}

#[derive(Debug, Clone)]
pub struct IndexerClient {
    http: HttpClient,
    url: String,
}

impl IndexerClient {
    pub fn new(http: HttpClient, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
        }
    }

    /// Most recent epochs signed by `address`, newest first, with decimal ids
    pub async fn fetch_epochs(&self, address: &str) -> Result<Vec<Epoch>> {
        let body = json!({
            "query": EPOCHS_QUERY,
            "variables": { "first": FETCH_COUNT, "skip": 0, "address": address },
        });

        let response = self
            .http
            .post(&self.url)
            .header("Cache-Control", "no-cache")
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow!("indexer request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("indexer returned HTTP {}", response.status()));
        }

        let parsed: GraphQlResponse<EpochesData> = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse indexer response: {}", e))?;

        if let Some(first) = parsed.errors.first() {
            return Err(anyhow!("indexer error: {}", first.message));
        }

        let mut epochs = parsed
            .data
            .ok_or_else(|| anyhow!("indexer returned no data"))?
            .epoches;

        for epoch in epochs.iter_mut() {
            match decimal_epoch_id(&epoch.id) {
                Some(id) => epoch.id = id,
                None => warn!("epoch id {} is not hex, keeping it as is", epoch.id),
            }
        }

        Ok(epochs)
    }
}
