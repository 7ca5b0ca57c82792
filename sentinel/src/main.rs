use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use sentinel::{app, ConfigManager};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("sentinel=info".parse()?)
        .add_directive("tower_http=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("tungstenite=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    info!("Starting Sequencer Sentinel");

    let source = std::env::var("CONFIG_FILE_PATH").unwrap_or_else(|_| "config".to_string());
    let token = std::env::var("CONFIG_TOKEN").ok().filter(|t| !t.is_empty());

    let config_manager = ConfigManager::new(&source, token.as_deref()).await?;
    let config = config_manager.get_current_config();
    info!(
        "Configuration loaded from {}: chain {}, {} sequencers, {} RPC endpoints",
        source,
        config.chain_id,
        config.sequencers.len(),
        config.node_infos.len()
    );

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    if let Err(e) = app::run(config, cancel).await {
        error!("❌ {}", e);
        return Err(e);
    }

    info!("Sentinel stopped");
    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                error!("cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown requested, saving state");
    cancel.cancel();
}
