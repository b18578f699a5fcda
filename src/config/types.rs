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

// Configuration types for the food service

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FoodServiceConfig {
    #[serde(default)]
    pub zenoh: ZenohConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub seed: SeedConfig,
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Zenoh configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZenohConfig {
    #[serde(default = "default_mode")]
    pub mode: String,  // "peer", "client", or "router"

    #[serde(default)]
    pub connect: Option<EndpointsConfig>,

    #[serde(default)]
    pub listen: Option<EndpointsConfig>,
}

impl Default for ZenohConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            connect: None,
            listen: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointsConfig {
    pub endpoints: Vec<String>,
}

/// Storage configuration with backend selection.
///
/// Both engine sections may be present at once; `backend` picks which one is
/// used, so switching engines never requires editing the file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Backend type: "relational" or "document"
    pub backend: String,

    #[serde(default)]
    pub relational: Option<RelationalConfig>,

    #[serde(default)]
    pub document: Option<DocumentConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "relational".to_string(),
            relational: Some(RelationalConfig::default()),
            document: None,
        }
    }
}

impl StorageConfig {
    /// Relational-only settings
    pub fn relational(config: RelationalConfig) -> Self {
        Self {
            backend: "relational".to_string(),
            relational: Some(config),
            document: None,
        }
    }

    /// Document-only settings
    pub fn document(config: DocumentConfig) -> Self {
        Self {
            backend: "document".to_string(),
            relational: None,
            document: Some(config),
        }
    }
}

/// Relational database connection. `url` wins over the individual parts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelationalConfig {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_db_name")]
    pub database: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl Default for RelationalConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: default_db_host(),
            port: default_db_port(),
            username: String::new(),
            password: String::new(),
            database: default_db_name(),
            max_connections: default_max_connections(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl RelationalConfig {
    /// Connection URL handed to the database driver
    pub fn connection_url(&self) -> Result<String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let mut url = Url::parse("mysql://localhost").context("Failed to build MySQL URL")?;
        url.set_host(Some(&self.host))
            .with_context(|| format!("Invalid database host: {}", self.host))?;
        url.set_port(Some(self.port))
            .map_err(|_| anyhow::anyhow!("Invalid database port: {}", self.port))?;
        if !self.username.is_empty() {
            url.set_username(&self.username)
                .map_err(|_| anyhow::anyhow!("Invalid database username"))?;
            url.set_password(Some(&self.password))
                .map_err(|_| anyhow::anyhow!("Invalid database password"))?;
        }
        url.set_path(&self.database);

        Ok(url.to_string())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentConfig {
    pub uri: String,

    #[serde(default = "default_document_db")]
    pub database: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:5984".to_string(),
            database: default_document_db(),
            username: None,
            password: None,
            timeout_seconds: default_timeout(),
        }
    }
}

/// What the bulk loader does with a row whose id is already stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Abort the load (seed data expects an empty store)
    #[default]
    Fail,
    /// Count the row as skipped and keep going
    Skip,
}

/// Startup seeding from a CSV file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeedConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_seed_path")]
    pub path: String,

    #[serde(default)]
    pub on_conflict: ConflictPolicy,

    /// Exit the process when seeding fails instead of serving a partial store
    #[serde(default = "default_true")]
    pub fatal: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_seed_path(),
            on_conflict: ConflictPolicy::default(),
            fatal: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceSettings {
    /// Key expression the food service answers queries on
    #[serde(default = "default_key_expr")]
    pub key_expr: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            key_expr: default_key_expr(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,  // "trace", "debug", "info", "warn", "error"

    #[serde(default = "default_log_format")]
    pub format: String,  // "text", "json"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_mode() -> String { "peer".to_string() }
fn default_db_host() -> String { "localhost".to_string() }
fn default_db_port() -> u16 { 3306 }
fn default_db_name() -> String { "food_db".to_string() }
fn default_max_connections() -> u32 { 10 }
fn default_connect_timeout() -> u64 { 10 }
fn default_document_db() -> String { "food_db".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_seed_path() -> String { "data/food_en.csv".to_string() }
fn default_true() -> bool { true }
fn default_key_expr() -> String { "food/service".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "text".to_string() }
