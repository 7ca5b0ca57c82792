use anyhow::{anyhow, Result};
use reqwest::Client as HttpClient;
use serde::Serialize;

use super::{AlertPayload, RESOLVED_PREFIX};
use crate::config::SlackConfig;

#[derive(Debug, Serialize)]
struct SlackMessage {
    text: String,
    attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize)]
struct Attachment {
    title: String,
    color: &'static str,
}

fn build_message(config: &SlackConfig, payload: &AlertPayload) -> SlackMessage {
    let (text, prefix, color) = if payload.resolved {
        (format!("OK: {}", payload.message), RESOLVED_PREFIX, "good")
    } else {
        (payload.message.clone(), "", "danger")
    };

    SlackMessage {
        text,
        attachments: vec![Attachment {
            title: format!(
                "Sentinel {}{} {}",
                prefix,
                payload.entity,
                config.mentions.join(" ")
            )
            .trim_end()
            .to_string(),
            color,
        }],
    }
}

pub async fn send(client: &HttpClient, config: &SlackConfig, payload: &AlertPayload) -> Result<()> {
    let message = build_message(config, payload);
    let response = client
        .post(&config.webhook)
        .json(&message)
        .send()
        .await
        .map_err(|e| anyhow!("could not notify slack for {}: {}", payload.entity, e))?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "could not notify slack for {} got {} response",
            payload.entity,
            response.status()
        ));
    }
    Ok(())
}
