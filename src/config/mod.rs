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

// Configuration module for the food service
//
// Provides:
// - YAML configuration file loading
// - Environment variable substitution
// - Configuration validation
// - Default values

pub mod types;
mod loader;

pub use types::*;
pub use loader::ConfigLoader;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FoodServiceConfig> {
    ConfigLoader::load(path).context("Failed to load configuration")
}

/// Load configuration with environment variable overrides
///
/// Connection variables keep the names the deployment already exports:
/// `DB_HOST`, `DB_PORT`, `MYSQL_USER`, `MYSQL_PASSWORD`, `MYSQL_DATABASE`
/// for the relational store and `DOCUMENT_URI` for the document store.
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<FoodServiceConfig> {
    let mut config = load_config(path)?;
    apply_env_overrides(&mut config)?;
    ConfigLoader::validate(&config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut FoodServiceConfig) -> Result<()> {
    if let Some(relational) = config.storage.relational.as_mut() {
        if let Ok(host) = std::env::var("DB_HOST") {
            relational.host = host;
        }

        if let Ok(port) = std::env::var("DB_PORT") {
            relational.port = port
                .parse()
                .with_context(|| format!("DB_PORT is not a valid port: {}", port))?;
        }

        if let Ok(user) = std::env::var("MYSQL_USER") {
            relational.username = user;
        }

        if let Ok(password) = std::env::var("MYSQL_PASSWORD") {
            relational.password = password;
        }

        if let Ok(database) = std::env::var("MYSQL_DATABASE") {
            relational.database = database;
        }
    }

    if let Ok(uri) = std::env::var("DOCUMENT_URI") {
        if let Some(document) = config.storage.document.as_mut() {
            document.uri = uri;
        }
    }

    if let Ok(path) = std::env::var("FOOD_SEED_PATH") {
        config.seed.path = path;
    }

    Ok(())
}
