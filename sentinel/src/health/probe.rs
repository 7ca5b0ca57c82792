use tracing::debug;
use url::Url;

use super::types::ProbeSummary;
use crate::errors::EndpointError;
use crate::rpc::NodeClient;

/// Lightweight status check of one endpoint.
///
/// Tries JSON-RPC `status` first and falls back to `GET <url>/status`. The
/// node must report `chain_id` as its network and must not be catching up.
pub async fn probe(client: &NodeClient, chain_id: &str) -> Result<ProbeSummary, EndpointError> {
    let url = client.rpc_url();
    Url::parse(url).map_err(|e| EndpointError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let status = match client.status().await {
        Ok(status) => status,
        Err(rpc_err) => {
            debug!("status call on {} failed ({}), trying raw query", url, rpc_err);
            client
                .raw_status()
                .await
                .map_err(|e| EndpointError::Unreachable {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?
        }
    };

    if status.node_info.network != chain_id {
        return Err(EndpointError::WrongNetwork {
            url: url.to_string(),
            expected: chain_id.to_string(),
            actual: status.node_info.network,
        });
    }

    if status.sync_info.catching_up {
        return Err(EndpointError::CatchingUp {
            url: url.to_string(),
        });
    }

    Ok(ProbeSummary {
        latest_height: status.latest_height(),
        network: status.node_info.network,
    })
}
