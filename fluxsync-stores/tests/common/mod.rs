#![allow(dead_code)]

use std::sync::Arc;

use fluxsync::testing::TestHarness;
use fluxsync::{LocalId, RemoteId};
use fluxsync_stores::app::{AppAction, Changed, Clients, SyncStores};
use fluxsync_stores::mock::MockServer;
use fluxsync_stores::model::Site;
use fluxsync_stores::SyncConfig;
use tokio::runtime::Handle;

pub type Harness = TestHarness<AppAction, Changed>;

/// Recorder first, then every store, all backed by `server`
pub fn setup(server: &Arc<MockServer>) -> (Harness, SyncStores) {
    setup_with(server, &SyncConfig::default())
}

pub fn setup_with(server: &Arc<MockServer>, config: &SyncConfig) -> (Harness, SyncStores) {
    init_tracing();
    let harness = Harness::new();
    let stores = SyncStores::new(Clients::mock(server.clone()), config, Handle::current());
    stores
        .register(&harness.dispatcher)
        .expect("fresh stores register once");
    (harness, stores)
}

pub fn site() -> Site {
    Site {
        local_id: LocalId(1),
        site_id: Some(RemoteId(77)),
        url: "https://shop.example".into(),
        name: "Shop".into(),
        ..Default::default()
    }
}

/// Honors RUST_LOG when set; quiet otherwise
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
