//! Test fixtures shared by the engine tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use plugdeck_registry::{FetchError, Fetcher};
use tokio::sync::Notify;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::store::FsStore;

pub const REMOTE_URL: &str = "https://plugins.example.com/plugins.json";

pub const ORIGINAL: &str = r#"{
    "editor": { "url": "https://example.com/tool", "version": "1.0.0", "min_version": "1.0.0" },
    "plugins": [
        {
            "name": "core",
            "version": "1.0.0",
            "can_be_removed": false,
            "code": "class SdkMain { {0} }",
            "download": [{ "url": "https://cdn.example.com/core/Core.cs", "file": "Core/Core.cs" }]
        }
    ]
}"#;

pub const REMOTE: &str = r#"{
    "editor": { "url": "https://example.com/tool/1.0", "version": "1.0.0", "min_version": "1.0.0" },
    "plugins": [
        {
            "name": "core",
            "version": "1.0.0",
            "can_be_removed": false,
            "code": "class SdkMain { {0} }",
            "download": [{ "url": "https://cdn.example.com/core/Core.cs", "file": "Core/Core.cs" }]
        },
        {
            "name": "ads",
            "version": "1.1.0",
            "description": "Advertising",
            "can_be_removed": true,
            "code": "Ads.Init();",
            "dependencies": [{ "name": "core", "version": "1.0.0" }],
            "download": [
                { "url": "https://cdn.example.com/ads/Ads.cs", "file": "Ads/Ads.cs" },
                { "url": "https://cdn.example.com/ads/AdsView.cs", "file": "Ads/AdsView.cs" }
            ]
        },
        {
            "name": "iap",
            "version": "2.0.0",
            "can_be_removed": true,
            "code": "Iap.Init();",
            "dependencies": [{ "name": "ads", "version": "1.1.0" }],
            "download": [{ "url": "https://cdn.example.com/iap/Iap.cs", "file": "Iap/Iap.cs" }]
        }
    ]
}"#;

enum Response {
    Body(Vec<u8>),
    Fail(String),
    Held(Vec<u8>, Arc<Notify>),
    Stall,
}

/// In-memory [`Fetcher`] with scripted responses. Unknown URLs are `NotFound`.
#[derive(Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, Response>>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    /// Fetcher serving [`REMOTE`] and every download item it lists.
    pub fn catalog() -> Self {
        let fetcher = Self::default();
        fetcher.serve(REMOTE_URL, REMOTE);
        for (url, body) in [
            ("https://cdn.example.com/core/Core.cs", "class Core {}"),
            ("https://cdn.example.com/ads/Ads.cs", "class Ads {}"),
            ("https://cdn.example.com/ads/AdsView.cs", "class AdsView {}"),
            ("https://cdn.example.com/iap/Iap.cs", "class Iap {}"),
        ] {
            fetcher.serve(url, body);
        }
        fetcher
    }

    pub fn serve(&self, url: &str, body: impl AsRef<[u8]>) {
        self.set(url, Response::Body(body.as_ref().to_vec()));
    }

    pub fn fail(&self, url: &str, message: &str) {
        self.set(url, Response::Fail(message.to_string()));
    }

    /// Never resolves.
    pub fn stall(&self, url: &str) {
        self.set(url, Response::Stall);
    }

    /// Resolves with `body` once the returned handle is notified.
    pub fn hold(&self, url: &str, body: impl AsRef<[u8]>) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.set(url, Response::Held(body.as_ref().to_vec(), notify.clone()));
        notify
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Requested URLs other than the remote catalog.
    pub fn download_calls(&self) -> Vec<String> {
        self.calls().into_iter().filter(|u| u != REMOTE_URL).collect()
    }

    fn set(&self, url: &str, response: Response) {
        self.responses.lock().insert(url.to_string(), response);
    }
}

enum Plan {
    Ready(Result<Vec<u8>, FetchError>),
    Wait(Vec<u8>, Arc<Notify>),
    Stall,
}

impl Fetcher for MockFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let bytes = self.fetch_bytes(url).await?;
        Ok(String::from_utf8(bytes)?)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.lock().push(url.to_string());
        let plan = match self.responses.lock().get(url) {
            Some(Response::Body(body)) => Plan::Ready(Ok(body.clone())),
            Some(Response::Fail(message)) => Plan::Ready(Err(FetchError::Transport(message.clone()))),
            Some(Response::Held(body, notify)) => Plan::Wait(body.clone(), notify.clone()),
            Some(Response::Stall) => Plan::Stall,
            None => Plan::Ready(Err(FetchError::NotFound(url.to_string()))),
        };

        match plan {
            Plan::Ready(result) => result,
            Plan::Wait(body, notify) => {
                notify.notified().await;
                Ok(body)
            }
            Plan::Stall => std::future::pending().await,
        }
    }
}

/// Engine over a temporary project with the original manifest in place.
pub fn engine_in(root: &Path, fetcher: MockFetcher) -> Engine<MockFetcher, FsStore> {
    engine_with(root, fetcher, |_| {})
}

pub fn engine_with(
    root: &Path,
    fetcher: MockFetcher,
    configure: impl FnOnce(&mut EngineConfig),
) -> Engine<MockFetcher, FsStore> {
    let mut config = EngineConfig {
        project_root: root.to_path_buf(),
        remote_manifest: REMOTE_URL.to_string(),
        ..EngineConfig::default()
    };
    configure(&mut config);

    let original = root.join(&config.original_manifest);
    if let Some(parent) = original.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    if !original.exists() {
        std::fs::write(&original, ORIGINAL).unwrap();
    }

    Engine::new(fetcher, FsStore::new(root), config)
}
