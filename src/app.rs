use std::time::Duration;

use serde::Serialize;

use crate::controller::{Controller, QueryFailure, RequestKind};
use crate::domain::{Delimiter, Endpoint};
use crate::error::ExplorerError;
use crate::gateway::{EndpointTable, QueryGateway};
use crate::protein::Protein;
use crate::query::{SearchFilter, count_query};
use crate::tabular::{RowIssue, TabularDecoder, parse_count};

#[derive(Debug, Clone)]
pub struct BrowseOptions {
    pub endpoint: Endpoint,
    pub page: usize,
    pub items_per_page: usize,
    pub search: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrowseResult {
    pub endpoint: Endpoint,
    pub page: usize,
    pub items_per_page: usize,
    pub search: String,
    pub total: Option<u64>,
    pub total_pages: usize,
    pub page_numbers: Vec<usize>,
    pub elapsed_ms: Option<u128>,
    pub proteins: Vec<Protein>,
    pub skipped: Vec<RowIssue>,
    pub error: Option<QueryFailure>,
    pub fetched_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountResult {
    pub endpoint: Endpoint,
    pub search: String,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub endpoint: Endpoint,
    pub elapsed_ms: u128,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub skipped: Vec<RowIssue>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<G: QueryGateway> {
    gateway: G,
    endpoints: EndpointTable,
}

impl<G: QueryGateway> App<G> {
    pub fn new(gateway: G, endpoints: EndpointTable) -> Self {
        Self { gateway, endpoints }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn endpoints(&self) -> &EndpointTable {
        &self.endpoints
    }

    /// One page of the registry together with the matching total.
    ///
    /// Query failures end up in [`BrowseResult::error`]; only invalid
    /// options are returned as `Err`.
    pub fn browse(
        &self,
        options: BrowseOptions,
        sink: &dyn ProgressSink,
    ) -> Result<BrowseResult, ExplorerError> {
        let mut controller = Controller::new(options.endpoint, options.items_per_page)?;

        emit(
            sink,
            format!("phase=Count; counting proteins on {}", options.endpoint),
        );
        emit(sink, "endpoint.request kind=count");
        let count = controller
            .set_search(options.search.as_str())
            .into_iter()
            .filter(|dispatch| dispatch.kind == RequestKind::Count)
            .collect();
        controller.run(count, &self.gateway);
        if let Some(total) = controller.total() {
            emit(sink, format!("phase=Count; {total} proteins match"));
        }

        let page = controller.set_page(options.page);
        emit(
            sink,
            format!("phase=Page; loading page {}", controller.page()),
        );
        emit(sink, "endpoint.request kind=page");
        controller.run(page, &self.gateway);
        if let Some(elapsed) = controller.elapsed_ms() {
            emit_latency(sink, elapsed);
        }
        if !controller.skipped().is_empty() {
            emit(
                sink,
                format!("phase=Decode; skipped {} rows", controller.skipped().len()),
            );
        }
        if let Some(failure) = controller.error() {
            emit(
                sink,
                format!("phase=Failed; {} (status {})", failure.message, failure.status),
            );
        }

        Ok(BrowseResult {
            endpoint: options.endpoint,
            page: controller.page(),
            items_per_page: controller.items_per_page(),
            search: controller.search().as_str().to_string(),
            total: controller.total(),
            total_pages: controller.total_pages(),
            page_numbers: controller.page_numbers(),
            elapsed_ms: controller.elapsed_ms(),
            proteins: controller.view().proteins().to_vec(),
            skipped: controller.skipped().to_vec(),
            error: controller.error().cloned(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    pub fn count(
        &self,
        search: &str,
        endpoint: Endpoint,
        sink: &dyn ProgressSink,
    ) -> Result<CountResult, ExplorerError> {
        let filter = SearchFilter::new(search);
        emit(sink, format!("phase=Count; counting proteins on {endpoint}"));
        emit(sink, "endpoint.request kind=count");
        let response = self.gateway.execute(&count_query(&filter), endpoint)?;
        emit_latency(sink, response.elapsed_ms);
        Ok(CountResult {
            endpoint,
            search: filter.as_str().to_string(),
            total: parse_count(&response.body)?,
        })
    }

    /// Runs arbitrary query text and decodes whatever table comes back.
    pub fn query(
        &self,
        text: &str,
        endpoint: Endpoint,
        sink: &dyn ProgressSink,
    ) -> Result<QueryResult, ExplorerError> {
        emit(sink, format!("phase=Query; sending query to {endpoint}"));
        emit(sink, "endpoint.request kind=query");
        let response = self.gateway.execute(text, endpoint)?;
        emit_latency(sink, response.elapsed_ms);
        emit(sink, "phase=Decode; decoding results");
        let table = TabularDecoder::new(Delimiter::Comma).table(&response.body)?;
        Ok(QueryResult {
            endpoint,
            elapsed_ms: response.elapsed_ms,
            header: table.header,
            rows: table.rows,
            skipped: table.skipped,
        })
    }

    pub fn curl(&self, text: &str, endpoint: Endpoint) -> String {
        self.endpoints.curl_command(text, endpoint)
    }
}

fn emit(sink: &dyn ProgressSink, message: impl Into<String>) {
    sink.event(ProgressEvent {
        message: message.into(),
        elapsed: None,
    });
}

fn emit_latency(sink: &dyn ProgressSink, elapsed_ms: u128) {
    sink.event(ProgressEvent {
        message: format!("endpoint.response latency_ms={elapsed_ms}"),
        elapsed: u64::try_from(elapsed_ms).ok().map(Duration::from_millis),
    });
}
