// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use food_store::config::{
    load_config_with_env, ConfigLoader, FoodServiceConfig, LoggingConfig, SeedConfig, ZenohConfig,
};
use food_store::{read_seed_file, BackendFactory, BulkLoader, FoodService, RpcServer, StorageBackend};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Food Service - Serve food records from a relational or document store
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.yaml")]
    config: PathBuf,

    /// Storage backend (overrides config file): relational or document
    #[arg(short, long)]
    backend: Option<String>,

    /// Seed the store from the configured CSV file before serving
    #[arg(long, conflicts_with = "no_seed")]
    seed: bool,

    /// Skip seeding even if the config enables it
    #[arg(long)]
    no_seed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration from file
    let mut config = load_config_with_env(&args.config)?;

    // Apply CLI overrides
    if let Some(backend) = args.backend {
        config.storage.backend = backend;
        ConfigLoader::validate(&config)?;
    }
    if args.seed {
        config.seed.enabled = true;
    }
    if args.no_seed {
        config.seed.enabled = false;
    }

    init_tracing(&config.logging)?;

    info!("Starting Food Service");
    info!("Loaded configuration from: {:?}", args.config);
    info!("Storage backend: {}", config.storage.backend);

    // Open Zenoh session
    let session = zenoh::open(build_zenoh_config(&config.zenoh)?)
        .await
        .map_err(|e| anyhow!("Failed to open Zenoh session: {}", e))?;

    info!("Zenoh session opened");

    // Create storage backend (schema/database is ensured here)
    let store = match BackendFactory::create(&config.storage).await {
        Ok(store) => store,
        Err(e) => {
            if let Err(close_err) = session.close().await {
                warn!("Failed to close Zenoh session: {}", close_err);
            }
            return Err(e);
        }
    };
    info!("Storage backend initialized: {}", store.backend_type());

    match store.health_check().await {
        Ok(true) => info!("Storage backend is healthy"),
        Ok(false) => warn!("Storage backend health check failed"),
        Err(e) => warn!("Storage backend health check error: {}", e),
    }

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C, shutting down");
                    shutdown.cancel();
                }
                Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
            }
        }
    });

    let outcome = run(&config, store.clone(), session.clone(), shutdown).await;

    // Cleanup: every handler has finished, so the backend can go
    if let Err(e) = store.close().await {
        error!("Failed to close storage backend: {}", e);
    }
    drop(store);

    session
        .close()
        .await
        .map_err(|e| anyhow!("Failed to close Zenoh session: {}", e))?;

    if outcome.is_ok() {
        info!("Food Service shut down successfully");
    }
    outcome
}

/// Seed (if enabled) and serve until shutdown
async fn run(
    config: &FoodServiceConfig,
    store: Arc<dyn StorageBackend>,
    session: zenoh::Session,
    shutdown: CancellationToken,
) -> Result<()> {
    if config.seed.enabled {
        match seed_store(&config.seed, store.clone(), &shutdown).await {
            Ok(()) => {}
            Err(e) if shutdown.is_cancelled() => {
                info!("Seeding interrupted: {:#}", e);
                return Ok(());
            }
            Err(e) if config.seed.fatal => return Err(e),
            Err(e) => warn!("Serving a partially seeded store: {:#}", e),
        }
    }

    let service = FoodService::new(store);
    let server = RpcServer::new(session, service, config.service.key_expr.clone());

    server.run(shutdown).await?;
    info!("Food service stopped");
    Ok(())
}

async fn seed_store(
    config: &SeedConfig,
    store: Arc<dyn StorageBackend>,
    cancel: &CancellationToken,
) -> Result<()> {
    let rows = read_seed_file(&config.path)?;

    let report = BulkLoader::new(store)
        .with_conflict_policy(config.on_conflict)
        .load_until_cancelled(rows, cancel)
        .await;

    report
        .into_result()
        .with_context(|| format!("Failed to seed from {}", config.path))?;
    Ok(())
}

fn build_zenoh_config(config: &ZenohConfig) -> Result<zenoh::Config> {
    let mut zenoh_config = zenoh::Config::default();

    zenoh_config
        .insert_json5("mode", &serde_json::to_string(&config.mode)?)
        .map_err(|e| anyhow!("Invalid zenoh mode: {}", e))?;

    // Set connect endpoints
    if let Some(connect) = &config.connect {
        zenoh_config
            .insert_json5("connect/endpoints", &serde_json::to_string(&connect.endpoints)?)
            .map_err(|e| anyhow!("Invalid connect endpoints: {}", e))?;
    }

    // Set listen endpoints
    if let Some(listen) = &config.listen {
        zenoh_config
            .insert_json5("listen/endpoints", &serde_json::to_string(&listen.endpoints)?)
            .map_err(|e| anyhow!("Invalid listen endpoints: {}", e))?;
    }

    Ok(zenoh_config)
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let log_level = match logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(log_level).into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match logging.format.as_str() {
        "json" => builder.json().try_init(),
        _ => builder.try_init(),
    };

    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}
