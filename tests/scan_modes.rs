use uturn_tracker::scan::{
    classify_failure, FailureKind, RecordedProgress, ScanKind, ScanOutcome, STAGES,
};
use uturn_tracker::state::Config;
use uturn_tracker::store::{LocalStore, API_KEY_SLOT, LAST_SCAN_SLOT};

fn config() -> Config {
    let mut cfg = Config::from_env();
    cfg.scan_stage_ms = 0;
    cfg.anthropic_base = "http://127.0.0.1:9".to_string();
    cfg
}

#[tokio::test]
async fn disabled_scan_shows_links_and_last_update() {
    let cfg = config();
    let provider = ScanKind::parse("disabled")
        .build(&cfg, None, "2025-07-01T09:05:00Z")
        .unwrap();
    let mut progress = RecordedProgress::default();
    match provider.scan(&mut progress).await.unwrap() {
        ScanOutcome::Info { last_updated, links } => {
            assert_eq!(last_updated, "2025-07-01T09:05:00Z");
            assert!(!links.is_empty());
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn unknown_mode_falls_back_to_disabled() {
    assert_eq!(ScanKind::parse("turbo"), ScanKind::Disabled);
    let provider = ScanKind::parse("turbo").build(&config(), None, "").unwrap();
    assert_eq!(provider.kind(), ScanKind::Disabled);
}

#[tokio::test]
async fn simulated_scan_walks_every_stage() {
    let provider = ScanKind::Simulated.build(&config(), None, "").unwrap();
    let mut progress = RecordedProgress::default();
    let outcome = provider.scan(&mut progress).await.unwrap();
    assert_eq!(outcome, ScanOutcome::NoNewUturns);
    assert_eq!(progress.stages.len(), STAGES.len());
}

#[tokio::test]
async fn live_scan_without_stored_key_is_an_auth_failure() {
    let mut store = LocalStore::in_memory().unwrap();
    store.init().unwrap();
    let credential = store.get(API_KEY_SLOT).unwrap();
    assert!(credential.is_none());

    let provider = ScanKind::Live.build(&config(), credential, "").unwrap();
    let err = provider
        .scan(&mut RecordedProgress::default())
        .await
        .unwrap_err();
    assert_eq!(classify_failure(&err), FailureKind::Auth);
    assert!(store.get(LAST_SCAN_SLOT).unwrap().is_none());
}

#[tokio::test]
async fn live_scan_transport_failure_is_not_auth() {
    let mut store = LocalStore::in_memory().unwrap();
    store.init().unwrap();
    store.set(API_KEY_SLOT, "sk-ant-test-key").unwrap();

    let provider = ScanKind::Live
        .build(&config(), store.get(API_KEY_SLOT).unwrap(), "")
        .unwrap();
    let err = provider
        .scan(&mut RecordedProgress::default())
        .await
        .unwrap_err();
    assert_eq!(classify_failure(&err), FailureKind::Other);
}
