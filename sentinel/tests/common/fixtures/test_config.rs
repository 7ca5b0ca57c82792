//! Builder writing a config directory (main.toml plus one file per sequencer)

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestConfigBuilder {
    temp_dir: TempDir,
    main_config: MainConfigBuilder,
    sequencer_configs: BTreeMap<String, SequencerConfigBuilder>,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self {
            temp_dir,
            main_config: MainConfigBuilder::default(),
            sequencer_configs: BTreeMap::new(),
        }
    }

    pub fn with_main_config<F>(mut self, f: F) -> Self
    where
        F: FnOnce(MainConfigBuilder) -> MainConfigBuilder,
    {
        self.main_config = f(self.main_config);
        self
    }

    /// Adds `<name>.toml` holding one `[sequencers.<name>]` table
    pub fn with_sequencer<F>(mut self, name: &str, f: F) -> Self
    where
        F: FnOnce(SequencerConfigBuilder) -> SequencerConfigBuilder,
    {
        let builder = f(SequencerConfigBuilder::new(name));
        self.sequencer_configs.insert(name.to_string(), builder);
        self
    }

    pub fn build(self) -> TestConfig {
        let config_dir = self.temp_dir.path().join("config");
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        let state_file = self.temp_dir.path().join("state.json");
        fs::write(config_dir.join("main.toml"), self.main_config.to_toml(&state_file))
            .expect("Failed to write main.toml");

        for (name, builder) in self.sequencer_configs {
            fs::write(config_dir.join(format!("{}.toml", name)), builder.to_toml())
                .expect("Failed to write sequencer config");
        }

        TestConfig {
            _temp_dir: self.temp_dir,
            config_dir,
            state_file,
        }
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct MainConfigBuilder {
    chain_id: String,
    node_down_alert_minutes: u64,
    alert_if_no_servers: bool,
    stalled_enabled: bool,
    sequencer_set_url: Option<String>,
    l2_rpc_url: Option<String>,
    rpc_urls: Vec<String>,
    slack_webhook: Option<String>,
    discord_webhook: Option<String>,
}

impl Default for MainConfigBuilder {
    fn default() -> Self {
        Self {
            chain_id: "andromeda".to_string(),
            node_down_alert_minutes: 3,
            alert_if_no_servers: true,
            stalled_enabled: true,
            sequencer_set_url: None,
            l2_rpc_url: None,
            rpc_urls: vec!["http://127.0.0.1:26657".to_string()],
            slack_webhook: None,
            discord_webhook: None,
        }
    }
}

impl MainConfigBuilder {
    pub fn chain_id(mut self, chain_id: &str) -> Self {
        self.chain_id = chain_id.to_string();
        self
    }

    pub fn node_down_alert_minutes(mut self, minutes: u64) -> Self {
        self.node_down_alert_minutes = minutes;
        self
    }

    pub fn sequencer_set_url(mut self, url: &str) -> Self {
        self.sequencer_set_url = Some(url.to_string());
        self
    }

    pub fn l2_rpc_url(mut self, url: &str) -> Self {
        self.l2_rpc_url = Some(url.to_string());
        self
    }

    pub fn rpc_urls(mut self, urls: &[&str]) -> Self {
        self.rpc_urls = urls.iter().map(|u| u.to_string()).collect();
        self
    }

    pub fn slack_webhook(mut self, url: &str) -> Self {
        self.slack_webhook = Some(url.to_string());
        self
    }

    pub fn discord_webhook(mut self, url: &str) -> Self {
        self.discord_webhook = Some(url.to_string());
        self
    }

    pub fn to_toml(&self, state_file: &PathBuf) -> String {
        let mut toml = format!(
            r#"chain_id = "{}"
node_down_alert_minutes = {}
alert_if_no_servers = {}
stalled_enabled = {}
state_file = "{}"
"#,
            self.chain_id,
            self.node_down_alert_minutes,
            self.alert_if_no_servers,
            self.stalled_enabled,
            state_file.display()
        );

        if let Some(url) = &self.sequencer_set_url {
            toml.push_str(&format!("sequencer_set_url = \"{}\"\n", url));
        }
        if let Some(url) = &self.l2_rpc_url {
            toml.push_str(&format!("l2_rpc_url = \"{}\"\n", url));
        }

        for url in &self.rpc_urls {
            toml.push_str(&format!(
                "\n[[node_infos]]\nrpc_url = \"{}\"\nalert_if_down = true\n",
                url
            ));
        }

        if let Some(webhook) = &self.slack_webhook {
            toml.push_str(&format!("\n[slack]\nenabled = true\nwebhook = \"{}\"\n", webhook));
        }
        if let Some(webhook) = &self.discord_webhook {
            toml.push_str(&format!("\n[discord]\nenabled = true\nwebhook = \"{}\"\n", webhook));
        }

        toml
    }
}

#[derive(Clone)]
pub struct SequencerConfigBuilder {
    name: String,
    address: String,
    consecutive_missed: u32,
    notify_mining: bool,
}

impl SequencerConfigBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            address: super::test_data::SEQUENCER_ADDRESS.to_string(),
            consecutive_missed: 5,
            notify_mining: false,
        }
    }

    pub fn address(mut self, address: &str) -> Self {
        self.address = address.to_string();
        self
    }

    pub fn consecutive_missed(mut self, missed: u32) -> Self {
        self.consecutive_missed = missed;
        self
    }

    pub fn notify_mining(mut self, notify: bool) -> Self {
        self.notify_mining = notify;
        self
    }

    pub fn to_toml(&self) -> String {
        format!(
            r#"[sequencers.{name}]
address = "{address}"

[sequencers.{name}.alerts]
consecutive_enabled = true
consecutive_missed = {missed}
consecutive_priority = "critical"
notify_mining = {mining}
"#,
            name = self.name,
            address = self.address,
            missed = self.consecutive_missed,
            mining = self.notify_mining
        )
    }
}

pub struct TestConfig {
    _temp_dir: TempDir,
    pub config_dir: PathBuf,
    pub state_file: PathBuf,
}

impl TestConfig {
    pub fn config_path(&self) -> String {
        self.config_dir.display().to_string()
    }
}
