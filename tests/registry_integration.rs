//! Registry Integration Tests
//!
//! Exercises the registry, loader and slot host together over a real store
//! file.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map};
use tempfile::TempDir;

use slotdeck::plugin::{
    catalog, EntryState, JsonFileStore, LoaderTable, PluginLoader, PluginRegistry, SlotHost,
    SlotView,
};

async fn open(dir: &TempDir) -> Arc<PluginRegistry> {
    let store = Arc::new(JsonFileStore::new(dir.path().join("plugins.json")));
    let registry = PluginRegistry::with_store(store).unwrap();
    registry.hydrate().await;
    Arc::new(registry)
}

fn install(registry: &PluginRegistry, id: &str) {
    registry.install(catalog::find(id).unwrap().clone());
}

#[tokio::test]
async fn test_state_round_trips_through_store() {
    let temp_dir = TempDir::new().unwrap();
    {
        let registry = open(&temp_dir).await;
        install(&registry, "daily-goals");
        install(&registry, "quick-notes");
        registry.enable("daily-goals");

        let mut partial = Map::new();
        partial.insert("units".into(), json!("imperial"));
        registry.update_settings("daily-goals", partial);
        registry.uninstall("quick-notes");
        registry.flush().await;
    }

    let registry = open(&temp_dir).await;
    let ids: Vec<_> = registry.all().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec!["daily-goals", "quick-notes"]);
    assert_eq!(registry.enabled_plugins().len(), 1);
    assert!(!registry.get("quick-notes").unwrap().installed);
    assert_eq!(registry.get_settings("daily-goals")["units"], json!("imperial"));
}

#[tokio::test]
async fn test_legacy_array_file_is_readable() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("plugins.json"),
        r#"[{"id":"greeting","name":"Greeting","installed":true,"enabled":true},
            {"id":"ghost","name":"Ghost","installed":false,"enabled":true}]"#,
    )
    .unwrap();

    let registry = open(&temp_dir).await;
    assert_eq!(registry.len(), 2);
    assert!(registry.get("greeting").unwrap().is_active());
    assert!(!registry.get("ghost").unwrap().enabled);
}

#[tokio::test]
async fn test_newer_store_version_starts_empty() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("plugins.json"), r#"{"version": 7, "plugins": []}"#).unwrap();

    let registry = open(&temp_dir).await;
    assert!(registry.is_empty());
    assert!(registry.is_hydrated());
}

#[tokio::test]
async fn test_dashboard_renders_persisted_settings() {
    let temp_dir = TempDir::new().unwrap();
    {
        let registry = open(&temp_dir).await;
        install(&registry, "daily-goals");
        registry.enable("daily-goals");
        let mut partial = Map::new();
        partial.insert("dailyGoals.steps".into(), json!(12000));
        registry.update_settings("daily-goals", partial);
        registry.flush().await;
    }

    let registry = open(&temp_dir).await;
    let loader = Arc::new(PluginLoader::new(LoaderTable::builtin()).unwrap());
    let mut host = SlotHost::new("dashboard", registry, loader);

    let view = host.settle(Duration::from_secs(1)).await;
    assert_eq!(
        view.entries()[0].state,
        EntryState::Rendered("Steps: 12000\nWater: 8 glasses".into())
    );
}

#[tokio::test]
async fn test_sidebar_and_dashboard_share_loads() {
    let temp_dir = TempDir::new().unwrap();
    let registry = open(&temp_dir).await;
    install(&registry, "pomodoro");
    registry.enable("pomodoro");

    let loader = Arc::new(PluginLoader::new(LoaderTable::builtin()).unwrap());
    let mut dashboard = SlotHost::new("dashboard", Arc::clone(&registry), Arc::clone(&loader));
    let mut sidebar = SlotHost::new("sidebar", Arc::clone(&registry), Arc::clone(&loader));

    let a = dashboard.settle(Duration::from_secs(1)).await;
    let b = sidebar.settle(Duration::from_secs(1)).await;
    assert_eq!(a.plugin_ids(), vec!["pomodoro"]);
    assert_eq!(b.plugin_ids(), vec!["pomodoro"]);
    assert_eq!(loader.loads_started(), 1);

    registry.disable("pomodoro");
    assert_eq!(dashboard.render(), SlotView::Empty);
}

#[test]
fn test_release_profile_unwinds() {
    // Plugin panics are contained with catch_unwind, which needs unwinding.
    let manifest = std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml")).unwrap();
    let manifest: toml::Value = toml::from_str(&manifest).unwrap();
    let panic = manifest
        .get("profile")
        .and_then(|p| p.get("release"))
        .and_then(|r| r.get("panic"))
        .and_then(toml::Value::as_str);
    assert_ne!(panic, Some("abort"));
}
