//! Single-node lifecycle properties exercised through the public API.

mod common;

use std::sync::Arc;

use plugmesh::cluster::{InMemoryBus, InMemoryStore};
use plugmesh::config::{ClusterMode, ClusterRole};
use plugmesh::plugin::content_hash;
use plugmesh::Method;

use common::{node, payload};

fn local_node(plugin_name: &str) -> common::TestNode {
    node(
        "solo",
        ClusterMode::Local,
        ClusterRole::Worker,
        plugin_name,
        Arc::new(InMemoryBus::new()),
        Arc::new(InMemoryStore::new()),
    )
}

#[tokio::test]
async fn greeter_load_registers_action() {
    let n = local_node("greeter");
    std::fs::write(n.dir.path().join("greeter.toml"), payload("greeter", "1.0.0", "/greet"))
        .unwrap();

    assert!(!n.manager.has("greeter").await);
    n.manager.load_plugin("greeter", false).await.unwrap();

    assert!(n.manager.has("greeter").await);
    let result = n.manager.actions().invoke("greeter", serde_json::json!(null));
    assert_eq!(result, Some(serde_json::json!({"from": "greeter"})));
}

#[tokio::test]
async fn double_load_initializes_once() {
    let n = local_node("greeter");
    std::fs::write(n.dir.path().join("greeter.toml"), payload("greeter", "1.0.0", "/greet"))
        .unwrap();

    n.manager.load_plugin("greeter", false).await.unwrap();
    n.manager.load_plugin("greeter", false).await.unwrap();

    assert_eq!(n.counters.inits(), 1);
    assert_eq!(n.manager.routes().lock().await.len(), 1);
}

#[tokio::test]
async fn hash_matches_payload_bytes() {
    let n = local_node("greeter");
    let text = payload("greeter", "1.0.0", "/greet");
    std::fs::write(n.dir.path().join("greeter.toml"), &text).unwrap();

    n.manager.load_plugin("greeter", false).await.unwrap();

    assert_eq!(n.manager.loaded_hash("greeter").await, Some(content_hash(&text)));
}

#[tokio::test]
async fn unload_cleans_registry_routes_and_actions_stay() {
    let n = local_node("greeter");
    std::fs::write(n.dir.path().join("greeter.toml"), payload("greeter", "1.0.0", "/greet"))
        .unwrap();

    n.manager.load_plugin("greeter", false).await.unwrap();
    n.manager.unload_plugin("greeter", false).await.unwrap();

    assert!(!n.manager.has("greeter").await);
    assert!(!n.manager.routes().lock().await.contains(Method::Get, "/greet"));
    assert_eq!(n.counters.cleanups(), 1);

    // A fresh load after unload runs initialize again on new state.
    n.manager.load_plugin("greeter", false).await.unwrap();
    assert_eq!(n.counters.inits(), 2);
}

#[tokio::test]
async fn routes_dispatch_while_loaded() {
    let n = local_node("greeter");
    std::fs::write(n.dir.path().join("greeter.toml"), payload("greeter", "1.0.0", "/greet"))
        .unwrap();

    n.manager.load_plugin("greeter", false).await.unwrap();

    let routes = n.manager.routes();
    let table = routes.lock().await;
    assert_eq!(table.dispatch(Method::Get, "/greet", "hi"), Some("handled: hi".to_string()));
}

#[tokio::test]
async fn autoload_respects_manifest_order() {
    let bus = Arc::new(InMemoryBus::new());
    let store = Arc::new(InMemoryStore::new());
    let n = node("solo", ClusterMode::Local, ClusterRole::Worker, "alpha", bus, store);

    std::fs::write(n.dir.path().join("alpha.toml"), payload("alpha", "0.1.0", "/alpha")).unwrap();
    std::fs::write(n.dir.path().join("autoload.toml"), "plugins = [\"alpha\"]").unwrap();

    n.manager.autoload_plugins().await.unwrap();
    assert!(n.manager.has("alpha").await);
}
