use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{Endpoint, EndpointConfig};
use crate::error::ExplorerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResponse {
    pub elapsed_ms: u128,
    pub body: String,
}

pub trait QueryGateway: Send + Sync {
    fn execute(&self, query: &str, endpoint: Endpoint) -> Result<QueryResponse, ExplorerError>;
}

impl<T: QueryGateway + ?Sized> QueryGateway for Arc<T> {
    fn execute(&self, query: &str, endpoint: Endpoint) -> Result<QueryResponse, ExplorerError> {
        (**self).execute(query, endpoint)
    }
}

/// Endpoint lookup shared by the HTTP client and the command export.
#[derive(Debug, Clone)]
pub struct EndpointTable {
    entries: HashMap<Endpoint, EndpointConfig>,
}

impl Default for EndpointTable {
    fn default() -> Self {
        Self {
            entries: Endpoint::ALL
                .into_iter()
                .map(|endpoint| (endpoint, endpoint.default_config()))
                .collect(),
        }
    }
}

impl EndpointTable {
    pub fn with_override(mut self, endpoint: Endpoint, base_url: impl Into<String>) -> Self {
        let mut config = self.get(endpoint);
        config.base_url = base_url.into();
        self.entries.insert(endpoint, config);
        self
    }

    pub fn get(&self, endpoint: Endpoint) -> EndpointConfig {
        self.entries
            .get(&endpoint)
            .cloned()
            .unwrap_or_else(|| endpoint.default_config())
    }

    /// Copy-pasteable one-line curl invocation of `query`.
    pub fn curl_command(&self, query: &str, endpoint: Endpoint) -> String {
        let config = self.get(endpoint);
        let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC);
        format!(
            "curl -G -H \"Accept: {}\" --data \"query={encoded}\" {}",
            config.content_type, config.base_url
        )
    }
}

#[derive(Clone)]
pub struct SparqlHttpClient {
    client: Client,
    endpoints: EndpointTable,
}

impl SparqlHttpClient {
    pub fn new(endpoints: EndpointTable, timeout: Duration) -> Result<Self, ExplorerError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("idp-explorer/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ExplorerError::EndpointHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| ExplorerError::EndpointHttp(err.to_string()))?;
        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &EndpointTable {
        &self.endpoints
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, ExplorerError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .ok()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| "endpoint request failed".to_string());
        Err(ExplorerError::EndpointStatus { status, message })
    }
}

impl QueryGateway for SparqlHttpClient {
    fn execute(&self, query: &str, endpoint: Endpoint) -> Result<QueryResponse, ExplorerError> {
        let config = self.endpoints.get(endpoint);
        debug!(endpoint = %endpoint, url = %config.base_url, "sending query");
        let start = Instant::now();
        let response = self
            .client
            .get(&config.base_url)
            .header(ACCEPT, config.content_type.as_str())
            .query(&[("query", query)])
            .send()
            .map_err(|err| ExplorerError::EndpointHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let body = response
            .text()
            .map_err(|err| ExplorerError::EndpointHttp(err.to_string()))?;
        let elapsed_ms = start.elapsed().as_millis();
        info!(endpoint = %endpoint, elapsed_ms, bytes = body.len(), "query answered");
        Ok(QueryResponse { elapsed_ms, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curl_command_is_single_line() {
        let table = EndpointTable::default();
        let command = table.curl_command("SELECT *\nWHERE { ?s ?p ?o }", Endpoint::Virtuoso);
        assert!(!command.contains('\n'));
        assert!(command.starts_with("curl -G -H \"Accept: text/csv\""));
        assert!(command.contains("query=SELECT%20%2A%0AWHERE%20%7B%20%3Fs%20%3Fp%20%3Fo%20%7D"));
        assert!(command.ends_with("https://registry.idpcentral.org/virtuoso/sparql"));
    }

    #[test]
    fn endpoint_override() {
        let table = EndpointTable::default().with_override(Endpoint::GraphDb, "http://localhost:7200/sparql");
        assert_eq!(table.get(Endpoint::GraphDb).base_url, "http://localhost:7200/sparql");
        assert_eq!(table.get(Endpoint::GraphDb).content_type, "text/csv");
        assert_eq!(
            table.get(Endpoint::Virtuoso).base_url,
            "https://registry.idpcentral.org/virtuoso/sparql"
        );
    }
}
