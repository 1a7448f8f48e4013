use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ExplorerError;

pub const ITEMS_PER_PAGE_CHOICES: [usize; 4] = [5, 10, 20, 50];
pub const DEFAULT_ITEMS_PER_PAGE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    #[value(name = "graphdb")]
    GraphDb,
    Virtuoso,
}

impl Endpoint {
    pub const ALL: [Endpoint; 2] = [Endpoint::GraphDb, Endpoint::Virtuoso];

    pub fn default_config(self) -> EndpointConfig {
        let base_url = match self {
            Endpoint::GraphDb => "https://registry.idpcentral.org/graphdb/sparql",
            Endpoint::Virtuoso => "https://registry.idpcentral.org/virtuoso/sparql",
        };
        EndpointConfig {
            base_url: base_url.to_string(),
            content_type: "text/csv".to_string(),
        }
    }

    pub fn other(self) -> Endpoint {
        match self {
            Endpoint::GraphDb => Endpoint::Virtuoso,
            Endpoint::Virtuoso => Endpoint::GraphDb,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::GraphDb => write!(f, "GraphDB"),
            Endpoint::Virtuoso => write!(f, "Virtuoso"),
        }
    }
}

impl FromStr for Endpoint {
    type Err = ExplorerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "graphdb" => Ok(Endpoint::GraphDb),
            "virtuoso" => Ok(Endpoint::Virtuoso),
            _ => Err(ExplorerError::InvalidEndpoint(value.to_string())),
        }
    }
}

/// Where an endpoint lives and which representation it is asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub base_url: String,
    pub content_type: String,
}

/// Upstream dataset an external record comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceName {
    DisProt,
    MobiDb,
    Ped,
}

impl SourceName {
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("disprot") {
            Some(SourceName::DisProt)
        } else if label.eq_ignore_ascii_case("mobidb") {
            Some(SourceName::MobiDb)
        } else if label.eq_ignore_ascii_case("ped") {
            Some(SourceName::Ped)
        } else {
            None
        }
    }

    pub fn entry_url(self, source_id: &str) -> String {
        match self {
            SourceName::DisProt => format!("https://disprot.org/{source_id}"),
            SourceName::MobiDb => format!("https://mobidb.org/{source_id}"),
            SourceName::Ped => format!("https://proteinensemble.org/{source_id}"),
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceName::DisProt => write!(f, "DisProt"),
            SourceName::MobiDb => write!(f, "MobiDB"),
            SourceName::Ped => write!(f, "PED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Unknown names fall back to the default theme.
    pub fn from_name(name: &str) -> Theme {
        match name {
            "light" => Theme::Light,
            "dark" => Theme::Dark,
            _ => Theme::default(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delimiter {
    #[default]
    Comma,
    Tab,
}

impl Delimiter {
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
        }
    }
}

pub fn validate_items_per_page(value: usize) -> Result<usize, ExplorerError> {
    if ITEMS_PER_PAGE_CHOICES.contains(&value) {
        Ok(value)
    } else {
        Err(ExplorerError::InvalidItemsPerPage(value))
    }
}

/// Final path segment of a URI, or the whole value when it has no `/`.
pub fn last_segment(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}
