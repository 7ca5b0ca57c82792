//! Epoch tracker polling a mock indexer and L2 node

mod common;

use common::fixtures::*;
use reqwest::Client as HttpClient;
use std::sync::Arc;
use tokio::sync::mpsc;

use sentinel::config::Config;
use sentinel::epoch::tracker::{unavailable_message, RECOMMITTED_MESSAGE};
use sentinel::epoch::{EpochTracker, IndexerClient};
use sentinel::services::AlertEvent;
use sentinel::{AlarmCache, AlertService, SequencerId, SequencerSet};

struct Harness {
    mock: MockIndexerServer,
    tracker: EpochTracker,
    sequencers: Arc<SequencerSet>,
    cache: Arc<AlarmCache>,
    rx: mpsc::Receiver<AlertEvent>,
}

async fn harness(notify_mining: bool) -> Harness {
    let mock = MockIndexerServer::start().await;
    let config: Config = toml::from_str(&format!(
        r#"
chain_id = "{}"
sequencer_set_url = "{}"
l2_rpc_url = "{}"

[[node_infos]]
rpc_url = "http://127.0.0.1:26657"

[sequencers.alpha]
address = "{}"
[sequencers.alpha.alerts]
notify_mining = {}
"#,
        CHAIN_ID,
        mock.indexer_url(),
        mock.l2_url(),
        SEQUENCER_ADDRESS,
        notify_mining
    ))
    .unwrap();

    let http = HttpClient::new();
    let sequencers = Arc::new(SequencerSet::new(&config));
    let cache = Arc::new(AlarmCache::new(config.flap_window()));
    let (tx, rx) = mpsc::channel(16);
    let alerts = AlertService::new(tx, cache.clone(), sequencers.clone());
    let tracker = EpochTracker::new(
        IndexerClient::new(http.clone(), &mock.indexer_url()),
        http,
        &mock.l2_url(),
        sequencers.clone(),
        alerts,
    );

    Harness {
        mock,
        tracker,
        sequencers,
        cache,
        rx,
    }
}

impl Harness {
    async fn serve(&self, epochs: &[(u64, u64, u64)], height: u64) {
        self.mock.reset().await;
        self.mock.mock_block_number(height).await;
        self.mock
            .mock_epochs(
                SEQUENCER_ADDRESS,
                epochs
                    .iter()
                    .map(|(id, start, end)| indexer_epoch(*id, *start, *end))
                    .collect(),
            )
            .await;
    }

    async fn epoch_ids(&self) -> (Vec<String>, bool) {
        self.sequencers
            .with(SequencerId::new(0), |s| (s.epochs.ids(), s.epochs.is_now))
            .await
    }
}

#[tokio::test]
async fn test_first_snapshot_is_stored_without_alerts() {
    let mut h = harness(false).await;
    h.serve(&[(0x5, 100, 300), (0x4, 1, 99)], 200).await;

    h.tracker.poll_once().await;

    assert_eq!(h.epoch_ids().await, (vec!["5".to_string(), "4".to_string()], true));
    assert!(h.rx.try_recv().is_err());
}

#[tokio::test]
async fn test_vanished_epoch_fires_transient_recommit() {
    let mut h = harness(false).await;
    h.serve(&[(5, 100, 300), (4, 1, 99)], 200).await;
    h.tracker.poll_once().await;

    h.serve(&[(6, 301, 500), (5, 100, 300)], 350).await;
    h.tracker.poll_once().await;

    let fire = h.rx.try_recv().unwrap();
    assert_eq!(fire.payload.message, RECOMMITTED_MESSAGE);
    assert_eq!(fire.payload.severity, "critical");
    assert_eq!(fire.payload.dedup_id, format!("{}respan", SEQUENCER_ADDRESS));
    assert!(!fire.silent);

    let forget = h.rx.try_recv().unwrap();
    assert!(forget.silent);
    assert!(forget.payload.resolved);

    assert_eq!(h.epoch_ids().await, (vec!["6".to_string(), "5".to_string()], true));
}

#[tokio::test]
async fn test_unavailable_then_recovered() {
    let mut h = harness(false).await;
    h.serve(&[(1, 1, 100)], 50).await;
    h.tracker.poll_once().await;

    h.serve(&[], 50).await;
    h.tracker.poll_once().await;

    let raised = h.rx.try_recv().unwrap();
    let message = unavailable_message("alpha", SEQUENCER_ADDRESS);
    assert_eq!(raised.payload.message, message);
    assert_eq!(raised.payload.severity, "warn");
    assert_eq!(raised.payload.dedup_id, format!("{}sequencer-set", SEQUENCER_ADDRESS));
    assert!(h.cache.is_active("alpha", &message).await);
    assert_eq!(h.sequencers.status(SequencerId::new(0)).await.active_alerts, 1);

    h.serve(&[(1, 1, 100)], 50).await;
    h.tracker.poll_once().await;

    let resolved = h.rx.try_recv().unwrap();
    assert!(resolved.payload.resolved);
    assert_eq!(resolved.payload.message, message);
    assert!(!h.cache.is_active("alpha", &message).await);
}

#[tokio::test]
async fn test_new_mining_task_only_when_enabled() {
    for notify_mining in [false, true] {
        let mut h = harness(notify_mining).await;
        h.serve(&[(4, 1, 99)], 50).await;
        h.tracker.poll_once().await;

        h.serve(&[(5, 100, 300), (4, 1, 99)], 150).await;
        h.tracker.poll_once().await;

        if notify_mining {
            let fire = h.rx.try_recv().unwrap();
            assert!(fire.payload.message.contains("new mining task"));
            assert_eq!(fire.payload.severity, "info");
            assert_eq!(fire.payload.dedup_id, format!("{}mining", SEQUENCER_ADDRESS));
            assert!(h.rx.try_recv().unwrap().silent);
        } else {
            assert!(h.rx.try_recv().is_err());
        }
        assert_eq!(h.epoch_ids().await.0, vec!["5".to_string(), "4".to_string()]);
    }
}

#[tokio::test]
async fn test_indexer_failure_keeps_snapshot() {
    let mut h = harness(false).await;
    h.serve(&[(2, 1, 100)], 50).await;
    h.tracker.poll_once().await;

    h.mock.reset().await;
    h.mock.mock_block_number(60).await;
    h.mock.mock_indexer_failure(502).await;
    h.tracker.poll_once().await;

    assert_eq!(h.epoch_ids().await, (vec!["2".to_string()], true));
    assert!(h.rx.try_recv().is_err());
}
