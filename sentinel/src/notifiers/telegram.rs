use anyhow::{anyhow, Result};
use reqwest::Client as HttpClient;
use serde_json::json;

use super::{AlertPayload, RESOLVED_PREFIX};
use crate::config::TelegramConfig;
use crate::constants::alerts::TELEGRAM_API_URL;

fn build_text(config: &TelegramConfig, payload: &AlertPayload) -> String {
    let prefix = if payload.resolved { RESOLVED_PREFIX } else { "" };
    let mut text = format!("{}: {} - {}", payload.entity, prefix, payload.message);
    if !config.mentions.is_empty() {
        text.push('\n');
        text.push_str(&config.mentions.join(" "));
    }
    text
}

pub async fn send(client: &HttpClient, config: &TelegramConfig, payload: &AlertPayload) -> Result<()> {
    if config.api_key.is_empty() || config.channel.is_empty() {
        return Err(anyhow!("telegram api_key and channel must both be set"));
    }

    let base = config.api_url.as_deref().unwrap_or(TELEGRAM_API_URL);
    let url = format!("{}/bot{}/sendMessage", base.trim_end_matches('/'), config.api_key);

    let response = client
        .post(&url)
        .json(&json!({
            "chat_id": config.channel,
            "text": build_text(config, payload),
            "disable_web_page_preview": true,
        }))
        .send()
        .await
        .map_err(|e| anyhow!("telegram send: {}", e))?;

    if !response.status().is_success() {
        return Err(anyhow!("telegram send returned {}", response.status()));
    }
    Ok(())
}
