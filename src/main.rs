//! Plugmesh node runner and administrative CLI.
//!
//! The binary is a thin driver over the library: it wires the built-in
//! factories and the in-process transports together and exposes the
//! administrative lifecycle operations. Deployments with a real networked
//! bus and store supply their own `NotificationBus`/`BlobStore`
//! implementations through the library API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use plugmesh::cluster::{InMemoryBus, InMemoryStore};
use plugmesh::config::NodeConfig;
use plugmesh::plugin::{
    FactoryTable, Plugin, PluginFactory, PluginManager, PluginPayload, PluginResult,
};
use plugmesh::{Method, PluginDeps, RouteKey, RouteTable};

/// Distributed plugin lifecycle manager
#[derive(Parser)]
#[command(name = "plugmesh")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Path to the node config file
    #[arg(short, long, global = true, env = "PLUGMESH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a node: autoload plugins, then serve cluster events
    Run,

    /// Load a plugin on this node
    Load {
        /// Plugin name
        name: String,

        /// Announce the load to the cluster (network mode)
        #[arg(short, long)]
        broadcast: bool,
    },

    /// Unload a plugin from this node
    Unload {
        /// Plugin name
        name: String,

        /// Announce the unload to the cluster (network mode)
        #[arg(short, long)]
        broadcast: bool,
    },

    /// Push a payload to the cluster store and announce it (master only)
    Push {
        /// Plugin name
        name: String,

        /// Path to the payload file
        path: PathBuf,
    },

    /// List plugins loaded on this node
    List {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

/// Built-in liveness plugin: one route, one action, no configuration.
struct HeartbeatPlugin;

#[async_trait]
impl Plugin for HeartbeatPlugin {
    async fn initialize(&mut self, deps: &PluginDeps) -> PluginResult<()> {
        deps.actions.register("heartbeat", Arc::new(|_| serde_json::json!("ok")));
        Ok(())
    }

    fn register_routes(&mut self, table: &mut RouteTable) -> Vec<RouteKey> {
        let key = RouteKey::new(Method::Get, "/healthz");
        table.add(key.clone(), Arc::new(|_| "ok".to_string()));
        vec![key]
    }
}

struct HeartbeatFactory;

impl PluginFactory for HeartbeatFactory {
    fn name(&self) -> &str {
        "heartbeat"
    }

    fn build(&self, _payload: &PluginPayload) -> PluginResult<Box<dyn Plugin>> {
        Ok(Box::new(HeartbeatPlugin))
    }
}

fn built_in_factories() -> FactoryTable {
    FactoryTable::new([Arc::new(HeartbeatFactory) as Arc<dyn PluginFactory>])
}

fn load_config(cli: &Cli) -> Result<NodeConfig> {
    let path = cli
        .config
        .clone()
        .or_else(|| dirs::config_dir().map(|d| d.join("plugmesh/config.toml")))
        .unwrap_or_else(|| PathBuf::from("plugmesh.toml"));
    Ok(NodeConfig::load(&path)?)
}

fn build_manager(config: NodeConfig) -> Arc<PluginManager> {
    Arc::new(PluginManager::new(
        config,
        built_in_factories(),
        Arc::new(InMemoryBus::new()),
        Arc::new(InMemoryStore::new()),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = load_config(&cli)?;
    let manager = build_manager(config);

    match cli.command {
        Commands::Run => {
            manager.autoload_plugins().await?;
            Arc::clone(&manager).start_event_loop().await?;
            tracing::info!(
                cluster = %manager.config().cluster_name,
                server_id = %manager.config().server_id,
                "node running, press Ctrl-C to stop"
            );
            tokio::signal::ctrl_c().await?;
            manager.close().await;
        }
        Commands::Load { name, broadcast } => {
            manager.load_plugin(&name, broadcast).await?;
            println!("loaded '{name}'");
        }
        Commands::Unload { name, broadcast } => {
            manager.unload_plugin(&name, broadcast).await?;
            println!("unloaded '{name}'");
        }
        Commands::Push { name, path } => {
            manager.load_and_broadcast(&name, &path, None).await?;
            println!("pushed '{name}'");
        }
        Commands::List { format } => {
            let plugins = manager.list().await;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&plugins)?);
            } else if plugins.is_empty() {
                println!("no plugins loaded");
            } else {
                for p in plugins {
                    println!("{}  {}  {}  ({} routes)", p.name, p.version, p.content_hash, p.routes);
                }
            }
        }
    }

    Ok(())
}
