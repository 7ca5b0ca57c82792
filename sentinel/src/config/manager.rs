use super::{Config, SequencerConfig};
use crate::errors::ConfigError;
use anyhow::{anyhow, Result};
use glob::glob;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

/// Extra config files in a config directory only contribute sequencers.
#[derive(Debug, Deserialize)]
struct SequencerConfigFile {
    #[serde(default)]
    sequencers: BTreeMap<String, SequencerConfig>,
}

pub struct ConfigManager {
    current_config: Arc<Config>,
}

impl ConfigManager {
    /// Loads and validates configuration from a directory, a single file or an http(s) URL.
    pub async fn new(source: &str, token: Option<&str>) -> Result<Self> {
        let config = Self::load_configuration(source, token).await?;
        config.validate()?;
        Ok(Self {
            current_config: Arc::new(config),
        })
    }

    pub fn get_current_config(&self) -> Arc<Config> {
        self.current_config.clone()
    }

    async fn load_configuration(source: &str, token: Option<&str>) -> Result<Config> {
        if source.starts_with("http://") || source.starts_with("https://") {
            let content = fetch_remote(source, token).await?;
            return parse(&content, source);
        }

        let path = Path::new(source);
        if !path.is_dir() {
            let content = fs::read_to_string(path)
                .await
                .map_err(|e| load_failed(source, e))?;
            return parse(&content, source);
        }

        let main_config_path = path.join("main.toml");
        let main_config_source = main_config_path.display().to_string();
        let main_config_content = fs::read_to_string(&main_config_path)
            .await
            .map_err(|e| load_failed(&main_config_source, e))?;

        let mut config = parse(&main_config_content, &main_config_source)?;

        let pattern = format!("{}/*.toml", source.trim_end_matches('/'));
        for entry in glob(&pattern).map_err(|e| anyhow!("Glob pattern error: {}", e))? {
            let file = entry.map_err(|e| anyhow!("Glob entry error: {}", e))?;
            let filename = file
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow!("Invalid filename"))?;

            if filename == "main.toml" {
                continue;
            }

            debug!("Loading sequencer config: {}", file.display());

            let content = fs::read_to_string(&file)
                .await
                .map_err(|e| anyhow!("Failed to read {}: {}", file.display(), e))?;

            let extra: SequencerConfigFile = toml::from_str(&content)
                .map_err(|e| anyhow!("Failed to parse {}: {}", file.display(), e))?;

            for (name, sequencer) in extra.sequencers {
                if config.sequencers.contains_key(&name) {
                    return Err(anyhow!(
                        "Sequencer '{}' in {} is already defined",
                        name,
                        file.display()
                    ));
                }
                config.sequencers.insert(name, sequencer);
            }
        }

        info!(
            "Loaded {} sequencers and {} RPC endpoints for {}",
            config.sequencers.len(),
            config.node_infos.len(),
            config.chain_id
        );

        Ok(config)
    }
}

fn load_failed(path: &str, err: std::io::Error) -> ConfigError {
    ConfigError::LoadFailed {
        path: path.to_string(),
        reason: err.to_string(),
    }
}

fn parse(content: &str, source: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| {
        ConfigError::ParseError {
            reason: format!("{}: {}", source, e),
        }
        .into()
    })
}

async fn fetch_remote(url: &str, token: Option<&str>) -> Result<String> {
    let client = reqwest::Client::new();
    let mut request = client.get(url);
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .map_err(|e| anyhow!("Failed to fetch remote config {}: {}", url, e))?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Remote config {} returned HTTP {}",
            url,
            response.status()
        ));
    }

    let content = response.text().await?;
    if content.trim().is_empty() {
        return Err(anyhow!("Remote config {} is empty", url));
    }
    Ok(content)
}
