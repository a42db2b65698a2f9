//! End-to-end sessions against an HTTP catalog.

use std::fs;
use std::path::Path;

use plugdeck_core::manifest::Version;
use plugdeck_core::{
    CancellationToken, Engine, EngineConfig, EngineError, GateState, LoadOutcome, SuggestedAction,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORIGINAL: &str = r#"{
    "editor": { "url": "https://example.com/tool", "version": "1.0.0", "min_version": "1.0.0" },
    "plugins": [
        { "name": "core", "version": "1.0.0", "can_be_removed": false, "code": "class SdkMain { {0} }" }
    ]
}"#;

fn remote_json(base: &str, ads_version: &str, editor_version: &str) -> String {
    format!(
        r#"{{
    "editor": {{
        "url": "https://example.com/tool/{editor_version}",
        "version": "{editor_version}",
        "min_version": "1.0.0",
        "message": {{ "text": "Catalog moved", "min_version": "1.0.0", "max_version": "1.0.0" }}
    }},
    "plugins": [
        {{ "name": "core", "version": "1.0.0", "can_be_removed": false, "code": "class SdkMain {{ {{0}} }}" }},
        {{
            "name": "ads",
            "version": "{ads_version}",
            "can_be_removed": true,
            "code": "Ads.Init(\"{ads_version}\");",
            "download": [
                {{ "url": "{base}/ads/{ads_version}/Ads.cs", "file": "Plugins/Ads/Ads.cs" }},
                {{ "url": "{base}/ads/{ads_version}/AdsView.cs", "file": "Plugins/Ads/AdsView.cs" }}
            ]
        }},
        {{
            "name": "iap",
            "version": "2.0.0",
            "can_be_removed": true,
            "documentation": "https://docs.example.com/iap",
            "code": "Iap.Init();",
            "dependencies": [{{ "name": "ads", "version": "1.1.0" }}],
            "download": [{{ "url": "{base}/iap/Iap.cs", "file": "Plugins/Iap/Iap.cs" }}]
        }},
        {{
            "name": "analytics",
            "version": "0.3",
            "can_be_removed": true,
            "code": "Analytics.Init();",
            "download": [{{ "url": "{base}/analytics/Analytics.cs", "file": "Plugins/Analytics.cs" }}]
        }}
    ]
}}"#
    )
}

async fn serve(server: &MockServer, route: &str, body: impl Into<String>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.into()))
        .mount(server)
        .await;
}

async fn serve_catalog(server: &MockServer, ads_version: &str, editor_version: &str) {
    serve(
        server,
        "/plugins.json",
        remote_json(&server.uri(), ads_version, editor_version),
    )
    .await;
    for file in ["Ads.cs", "AdsView.cs"] {
        serve(
            server,
            &format!("/ads/{ads_version}/{file}"),
            format!("// {file} {ads_version}"),
        )
        .await;
    }
    serve(server, "/iap/Iap.cs", "// Iap.cs").await;
    serve(server, "/analytics/Analytics.cs", "// Analytics.cs").await;
}

fn project(server: &MockServer) -> (TempDir, EngineConfig) {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("sdk/editor")).unwrap();
    fs::write(dir.path().join("sdk/editor/bundled_plugins.json"), ORIGINAL).unwrap();

    let config = EngineConfig {
        project_root: dir.path().to_path_buf(),
        remote_manifest: format!("{}/plugins.json", server.uri()),
        allow_local_network: true,
        ..EngineConfig::default()
    };
    (dir, config)
}

fn read(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join(path)).unwrap()
}

fn no_progress(_: &str, _: f32) {}

#[tokio::test]
async fn full_plugin_lifecycle() {
    let server = MockServer::start().await;
    serve_catalog(&server, "1.1.0", "1.0.0").await;
    let (dir, config) = project(&server);
    let root = dir.path();
    let engine = Engine::from_config(config).unwrap();
    let cancel = CancellationToken::new();

    let ctx = engine.open_session().unwrap();
    assert_eq!(ctx.load_outcome(), LoadOutcome::Created);
    engine.refresh_remote(&ctx).await.unwrap();

    let gate = ctx.editor_gate().unwrap();
    assert_eq!(gate.state, GateState::Current);
    assert_eq!(gate.message.map(|m| m.text), Some("Catalog moved".to_string()));

    let ads = ctx.remote_record("ads").unwrap();
    let iap = ctx.remote_record("iap").unwrap();
    engine.install(&ctx, &ads, &no_progress, &cancel).await.unwrap();
    engine.install(&ctx, &iap, &no_progress, &cancel).await.unwrap();

    assert_eq!(read(root, "sdk/Plugins/Ads/AdsView.cs"), "// AdsView.cs 1.1.0");
    assert_eq!(
        read(root, "sdk/Scripts/SdkMain.cs"),
        "class SdkMain { Ads.Init(\"1.1.0\");\n\t\t\tIap.Init(); }"
    );

    let catalog = ctx.catalog().unwrap();
    let iap_row = catalog.iter().find(|e| e.name == "iap").unwrap();
    assert_eq!(iap_row.action, SuggestedAction::UpToDate);
    assert!(iap_row.can_remove);
    assert_eq!(
        iap_row.documentation_url.as_deref(),
        Some("https://docs.example.com/iap")
    );

    // A new session sees the persisted state.
    let ctx = engine.open_session().unwrap();
    assert_eq!(ctx.load_outcome(), LoadOutcome::Reconciled);
    engine.refresh_remote(&ctx).await.unwrap();
    let names: Vec<_> = ctx
        .local_manifest()
        .installed()
        .map(|p| p.name.clone())
        .collect();
    assert_eq!(names, vec!["core", "ads", "iap"]);

    let result = engine.remove(&ctx, &ads).await;
    assert!(matches!(result, Err(EngineError::DependentsExist(_))));

    engine.remove(&ctx, &iap).await.unwrap();
    engine.remove(&ctx, &ads).await.unwrap();
    assert!(!root.join("sdk/Plugins/Ads/Ads.cs").exists());
    assert!(!root.join("sdk/Plugins/Iap/Iap.cs").exists());
    assert_eq!(read(root, "sdk/Scripts/SdkMain.cs"), "class SdkMain {  }");
}

#[tokio::test]
async fn update_to_newer_catalog_version() {
    let server = MockServer::start().await;
    serve_catalog(&server, "1.1.0", "1.0.0").await;
    let (dir, config) = project(&server);
    let root = dir.path();
    let engine = Engine::from_config(config).unwrap();
    let cancel = CancellationToken::new();

    let mut ctx = engine.open_session().unwrap();
    engine.refresh_remote(&ctx).await.unwrap();
    let ads = ctx.remote_record("ads").unwrap();
    engine.install(&ctx, &ads, &no_progress, &cancel).await.unwrap();

    server.reset().await;
    serve_catalog(&server, "1.2.0", "1.1.0").await;
    engine.refresh(&mut ctx).await.unwrap();

    assert_eq!(ctx.editor_gate().unwrap().state, GateState::UpdateAvailable);
    let row = ctx
        .catalog()
        .unwrap()
        .into_iter()
        .find(|e| e.name == "ads")
        .unwrap();
    assert_eq!(row.action, SuggestedAction::Update);

    let newer = ctx.remote_record("ads").unwrap();
    let progress = std::sync::Mutex::new(Vec::new());
    engine
        .update(
            &ctx,
            &newer,
            &|file: &str, fraction: f32| progress.lock().unwrap().push((file.to_string(), fraction)),
            &cancel,
        )
        .await
        .unwrap();

    assert_eq!(
        progress.into_inner().unwrap(),
        vec![
            ("Plugins/Ads/Ads.cs".to_string(), 0.5),
            ("Plugins/Ads/AdsView.cs".to_string(), 1.0)
        ]
    );
    assert_eq!(
        ctx.local_manifest().installed_version("ads"),
        Some(Version::new(1, 2, 0))
    );
    assert_eq!(read(root, "sdk/Plugins/Ads/Ads.cs"), "// Ads.cs 1.2.0");
    assert_eq!(
        read(root, "sdk/Scripts/SdkMain.cs"),
        "class SdkMain { Ads.Init(\"1.2.0\"); }"
    );
}

#[tokio::test]
async fn original_is_the_upgrade_floor() {
    let server = MockServer::start().await;
    serve_catalog(&server, "1.1.0", "1.0.0").await;
    let (dir, config) = project(&server);
    fs::write(
        dir.path().join("sdk/editor/plugins.json"),
        r#"{
            "editor": { "url": null, "version": "0.9.0", "min_version": "0.9.0" },
            "plugins": [
                { "name": "core", "version": "0.9", "can_be_removed": false, "code": "old" },
                { "name": "analytics", "version": "5.0.0", "can_be_removed": true, "code": "A();" }
            ]
        }"#,
    )
    .unwrap();
    let engine = Engine::from_config(config).unwrap();

    let ctx = engine.open_session().unwrap();

    let local = ctx.local_manifest();
    assert_eq!(local.editor.version, Version::new(1, 0, 0));
    assert_eq!(local.installed_version("core"), Some(Version::new(1, 0, 0)));
    assert_eq!(local.get("core").unwrap().code, "class SdkMain { {0} }");
    assert_eq!(local.installed_version("analytics"), Some(Version::new(5, 0, 0)));
}

#[tokio::test]
async fn independent_installs_run_concurrently() {
    let server = MockServer::start().await;
    serve_catalog(&server, "1.1.0", "1.0.0").await;
    let (dir, config) = project(&server);
    let engine = Engine::from_config(config).unwrap();
    let cancel = CancellationToken::new();
    let ctx = engine.open_session().unwrap();
    engine.refresh_remote(&ctx).await.unwrap();
    let ads = ctx.remote_record("ads").unwrap();
    let analytics = ctx.remote_record("analytics").unwrap();

    let (a, b) = tokio::join!(
        engine.install(&ctx, &ads, &no_progress, &cancel),
        engine.install(&ctx, &analytics, &no_progress, &cancel),
    );
    a.unwrap();
    b.unwrap();

    let local = ctx.local_manifest();
    assert!(local.installed_version("ads").is_some());
    assert_eq!(local.installed_version("analytics"), Some(Version::new(0, 3, 0)));
    let composed = read(dir.path(), "sdk/Scripts/SdkMain.cs");
    assert!(composed.contains("Ads.Init(\"1.1.0\");"));
    assert!(composed.contains("Analytics.Init();"));
    assert!(!ctx.operations().any_running());
}

#[tokio::test]
async fn loopback_catalog_is_denied_by_default() {
    let server = MockServer::start().await;
    serve_catalog(&server, "1.1.0", "1.0.0").await;
    let (_dir, config) = project(&server);
    let engine = Engine::from_config(EngineConfig {
        allow_local_network: false,
        ..config
    })
    .unwrap();
    let ctx = engine.open_session().unwrap();

    let result = engine.refresh_remote(&ctx).await;

    match result {
        Err(EngineError::Fetch { url, message }) => {
            assert!(url.ends_with("/plugins.json"));
            assert!(message.contains("loopback"), "unexpected message: {message}");
        }
        res => panic!("Expected Fetch error, got {:?}", res),
    }
    assert!(ctx.remote().is_none());
}
