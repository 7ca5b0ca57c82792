use anyhow::{anyhow, Result};
use reqwest::Client as HttpClient;
use serde::Serialize;

use super::AlertPayload;
use crate::config::PagerDutyConfig;
use crate::constants::alerts::{EXAMPLE_PAGERDUTY_KEY, PAGERDUTY_EVENTS_URL};

#[derive(Debug, Serialize)]
struct Event<'a> {
    routing_key: &'a str,
    event_action: &'static str,
    dedup_key: &'a str,
    payload: EventPayload<'a>,
}

#[derive(Debug, Serialize)]
struct EventPayload<'a> {
    summary: &'a str,
    source: &'a str,
    severity: &'static str,
}

/// Events API only accepts these four
fn severity(value: &str) -> &'static str {
    match value.to_ascii_lowercase().as_str() {
        "critical" => "critical",
        "error" => "error",
        "warn" | "warning" => "warning",
        _ => "info",
    }
}

pub async fn send(client: &HttpClient, config: &PagerDutyConfig, payload: &AlertPayload) -> Result<()> {
    if config.api_key == EXAMPLE_PAGERDUTY_KEY {
        return Err(anyhow!("invalid pagerduty key"));
    }

    let event = Event {
        routing_key: &config.api_key,
        event_action: if payload.resolved { "resolve" } else { "trigger" },
        dedup_key: &payload.dedup_id,
        payload: EventPayload {
            summary: &payload.message,
            source: &payload.dedup_id,
            severity: severity(if payload.severity.is_empty() {
                &config.default_severity
            } else {
                &payload.severity
            }),
        },
    };

    let url = config.api_url.as_deref().unwrap_or(PAGERDUTY_EVENTS_URL);
    let response = client
        .post(url)
        .json(&event)
        .send()
        .await
        .map_err(|e| anyhow!("pagerduty request failed: {}", e))?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "could not notify pagerduty for {} got {} response",
            payload.entity,
            response.status()
        ));
    }
    Ok(())
}
