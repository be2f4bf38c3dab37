//! Shared fixtures.

use std::sync::Arc;
use std::time::Duration;

use notes_load_core::{LoadConfig, NotesClient, Workload};
use notes_stub_api::config::StubConfig;
use notes_stub_api::router::Router;
use notes_stub_api::server::Server;
use notes_stub_api::store::NotesStore;
use tokio::task::JoinHandle;

/// A stub service running on an ephemeral loopback port.
pub struct StubService {
    pub base_url: String,
    pub store: Arc<NotesStore>,
    handle: JoinHandle<()>,
}

impl Drop for StubService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn start_stub(config: StubConfig) -> StubService {
    let store = Arc::new(NotesStore::new());
    let router = Router::new(Arc::clone(&store), Arc::new(config));
    let (addr, handle) = Server::spawn("127.0.0.1:0".parse().unwrap(), router)
        .await
        .unwrap();
    StubService {
        base_url: format!("http://{}", addr),
        store,
        handle,
    }
}

/// Config aimed at `base_url` with fast pacing, for one short run.
pub fn test_config(base_url: &str) -> LoadConfig {
    LoadConfig {
        base_url: base_url.to_string(),
        vus: 1,
        duration: None,
        iterations: Some(1),
        pace: Duration::from_millis(10),
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

pub fn workload_for(config: &LoadConfig) -> Workload {
    Workload::new(NotesClient::new(config).unwrap(), config)
}
