use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{DEFAULT_ITEMS_PER_PAGE, Endpoint, validate_items_per_page};
use crate::error::ExplorerError;
use crate::gateway::EndpointTable;

pub const DEFAULT_CONFIG_FILE: &str = "idp-explorer.json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub endpoint: Option<Endpoint>,
    #[serde(default)]
    pub items_per_page: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub endpoints: EndpointOverrides,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct EndpointOverrides {
    #[serde(default)]
    pub graphdb: Option<String>,
    #[serde(default)]
    pub virtuoso: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub endpoint: Endpoint,
    pub items_per_page: usize,
    pub timeout: Duration,
    pub endpoints: EndpointTable,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            endpoint: Endpoint::GraphDb,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            endpoints: EndpointTable::default(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, or `idp-explorer.json` when present. Without either the defaults apply.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, ExplorerError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ExplorerError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ExplorerError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, ExplorerError> {
        let items_per_page = config
            .items_per_page
            .map(validate_items_per_page)
            .transpose()?
            .unwrap_or(DEFAULT_ITEMS_PER_PAGE);

        let mut endpoints = EndpointTable::default();
        if let Some(url) = config.endpoints.graphdb {
            endpoints = endpoints.with_override(Endpoint::GraphDb, url);
        }
        if let Some(url) = config.endpoints.virtuoso {
            endpoints = endpoints.with_override(Endpoint::Virtuoso, url);
        }

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            endpoint: config.endpoint.unwrap_or(Endpoint::GraphDb),
            items_per_page,
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            endpoints,
        })
    }
}
