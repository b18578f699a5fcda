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

// Configuration loader with environment variable substitution

use super::types::*;
use anyhow::{bail, Context, Result};
use regex::Regex;
use reqwest::Url;
use std::path::Path;
use std::sync::OnceLock;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<FoodServiceConfig> {
        let content = std::fs::read_to_string(path.as_ref())
            .context("Failed to read config file")?;

        Self::parse(&content)
    }

    /// Parse and validate YAML configuration text
    pub fn parse(content: &str) -> Result<FoodServiceConfig> {
        let content = Self::substitute_env_vars(content);

        let config: FoodServiceConfig = serde_yaml::from_str(&content)
            .context("Failed to parse YAML configuration")?;

        Self::validate(&config)?;

        Ok(config)
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${HOME} -> /home/user
    /// - ${DB_HOST:-localhost} -> localhost (if DB_HOST not set)
    fn substitute_env_vars(content: &str) -> String {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = PATTERN.get_or_init(|| {
            Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").expect("env var pattern is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => match default_value {
                    Some(default) => default.to_string(),
                    // Keep original if no default and var not found
                    None => format!("${{{}}}", var_name),
                },
            }
        })
        .to_string()
    }

    /// Validate configuration
    pub fn validate(config: &FoodServiceConfig) -> Result<()> {
        match config.zenoh.mode.as_str() {
            "peer" | "client" | "router" => {}
            unknown => bail!("Unknown zenoh.mode: '{}'. Supported: peer, client, router", unknown),
        }

        match config.storage.backend.as_str() {
            "relational" => {
                let Some(relational) = config.storage.relational.as_ref() else {
                    bail!("relational backend selected but relational config missing");
                };
                if relational.url.is_none() {
                    if relational.host.is_empty() {
                        bail!("storage.relational.host cannot be empty");
                    }
                    if relational.port == 0 {
                        bail!("storage.relational.port must be > 0");
                    }
                    if relational.database.is_empty() {
                        bail!("storage.relational.database cannot be empty");
                    }
                }
                if relational.max_connections == 0 {
                    bail!("storage.relational.max_connections must be > 0");
                }
            }
            "document" => {
                let Some(document) = config.storage.document.as_ref() else {
                    bail!("document backend selected but document config missing");
                };
                Url::parse(&document.uri)
                    .with_context(|| format!("storage.document.uri is not a valid URI: {}", document.uri))?;
                if document.database.is_empty() {
                    bail!("storage.document.database cannot be empty");
                }
            }
            unknown => bail!("Unknown backend: '{}'. Supported: relational, document", unknown),
        }

        if config.seed.enabled && config.seed.path.is_empty() {
            bail!("seed.path cannot be empty when seeding is enabled");
        }

        if config.service.key_expr.is_empty() {
            bail!("service.key_expr cannot be empty");
        }

        match config.logging.format.as_str() {
            "text" | "json" => {}
            unknown => bail!("Unknown logging.format: '{}'. Supported: text, json", unknown),
        }

        Ok(())
    }
}
