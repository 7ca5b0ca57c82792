use anyhow::{anyhow, Result};
use reqwest::Client as HttpClient;
use serde::Serialize;

use super::{AlertPayload, RESOLVED_PREFIX};
use crate::config::DiscordConfig;

#[derive(Debug, Serialize, PartialEq)]
struct DiscordMessage {
    username: String,
    content: String,
    embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Serialize, PartialEq)]
struct DiscordEmbed {
    description: String,
    color: u32,
}

fn build_message(config: &DiscordConfig, payload: &AlertPayload) -> DiscordMessage {
    let prefix = if payload.resolved { RESOLVED_PREFIX } else { "" };
    let mut content = format!("{}{}", prefix, payload.entity);
    if !config.mentions.is_empty() {
        content.push(' ');
        content.push_str(&config.mentions.join(" "));
    }

    DiscordMessage {
        username: "Sentinel".to_string(),
        content,
        embeds: vec![DiscordEmbed {
            description: payload.message.clone(),
            color: if payload.resolved { 0x2ecc71 } else { 0xe74c3c },
        }],
    }
}

pub async fn send(client: &HttpClient, config: &DiscordConfig, payload: &AlertPayload) -> Result<()> {
    let message = build_message(config, payload);
    let response = client
        .post(&config.webhook)
        .json(&message)
        .send()
        .await
        .map_err(|e| anyhow!("⚠️ Could not notify discord! {}", e))?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "⚠️ Could not notify discord! Returned {}",
            response.status()
        ));
    }
    Ok(())
}
