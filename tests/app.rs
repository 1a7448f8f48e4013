use std::sync::Mutex;

use assert_matches::assert_matches;

use idp_registry_explorer::app::{App, BrowseOptions};
use idp_registry_explorer::controller::RequestKind;
use idp_registry_explorer::domain::Endpoint;
use idp_registry_explorer::error::ExplorerError;
use idp_registry_explorer::gateway::{EndpointTable, QueryGateway, QueryResponse};
use idp_registry_explorer::output::JsonOutput;

const REGISTRY_PAGE: &str = include_str!("fixtures/registry_page.csv");
const COUNT_JSON: &str = include_str!("fixtures/count.json");

struct MockRegistry {
    count: Result<&'static str, u16>,
    page: Result<&'static str, u16>,
    queries: Mutex<Vec<String>>,
}

impl MockRegistry {
    fn new(count: Result<&'static str, u16>, page: Result<&'static str, u16>) -> Self {
        Self {
            count,
            page,
            queries: Mutex::new(Vec::new()),
        }
    }
}

impl QueryGateway for MockRegistry {
    fn execute(&self, query: &str, _endpoint: Endpoint) -> Result<QueryResponse, ExplorerError> {
        self.queries.lock().unwrap().push(query.to_string());
        let answer = if query.contains("COUNT(DISTINCT ?sequenceID)") {
            self.count
        } else {
            self.page
        };
        match answer {
            Ok(body) => Ok(QueryResponse {
                elapsed_ms: 25,
                body: body.to_string(),
            }),
            Err(status) => Err(ExplorerError::EndpointStatus {
                status,
                message: "upstream failure".to_string(),
            }),
        }
    }
}

fn options(page: usize) -> BrowseOptions {
    BrowseOptions {
        endpoint: Endpoint::GraphDb,
        page,
        items_per_page: 5,
        search: String::new(),
    }
}

#[test]
fn browse_counts_then_loads_clamped_page() {
    let app = App::new(
        MockRegistry::new(Ok("Proteins\n12\n"), Ok(REGISTRY_PAGE)),
        EndpointTable::default(),
    );
    let result = app.browse(options(9), &JsonOutput).unwrap();

    assert_eq!(result.total, Some(12));
    assert_eq!(result.total_pages, 3);
    assert_eq!(result.page, 3);
    assert_eq!(result.page_numbers, vec![1, 2, 3]);
    assert_eq!(result.proteins.len(), 2);
    assert_eq!(result.skipped.len(), 2);
    assert_eq!(result.elapsed_ms, Some(25));
    assert!(result.error.is_none());

    let queries = app.gateway().queries.lock().unwrap();
    assert_eq!(queries.len(), 2);
    assert!(queries[1].contains("OFFSET 10"));
}

#[test]
fn browse_reports_failures_in_result() {
    let app = App::new(
        MockRegistry::new(Ok(COUNT_JSON), Err(502)),
        EndpointTable::default(),
    );
    let result = app.browse(options(1), &JsonOutput).unwrap();
    assert_eq!(result.total, Some(1523));
    assert!(result.proteins.is_empty());
    let failure = result.error.unwrap();
    assert_eq!(failure.kind, RequestKind::Page);
    assert_eq!(failure.status, 502);
}

#[test]
fn browse_rejects_unlisted_page_size() {
    let app = App::new(
        MockRegistry::new(Ok("Proteins\n1\n"), Ok(REGISTRY_PAGE)),
        EndpointTable::default(),
    );
    let mut options = options(1);
    options.items_per_page = 15;
    assert_matches!(
        app.browse(options, &JsonOutput),
        Err(ExplorerError::InvalidItemsPerPage(15))
    );
}

#[test]
fn count_passes_search_into_query() {
    let app = App::new(
        MockRegistry::new(Ok(COUNT_JSON), Ok(REGISTRY_PAGE)),
        EndpointTable::default(),
    );
    let result = app.count("  P04 ", Endpoint::Virtuoso, &JsonOutput).unwrap();
    assert_eq!(result.total, 1523);
    assert_eq!(result.search, "  P04 ");
    assert_eq!(result.endpoint, Endpoint::Virtuoso);
    let queries = app.gateway().queries.lock().unwrap();
    assert!(queries[0].contains("\"  P04 \""));
}

#[test]
fn count_surfaces_remote_error() {
    let app = App::new(
        MockRegistry::new(Err(500), Ok(REGISTRY_PAGE)),
        EndpointTable::default(),
    );
    let err = app.count("", Endpoint::GraphDb, &JsonOutput).unwrap_err();
    assert!(err.is_remote());
    assert_eq!(err.status_code(), Some(500));
}

#[test]
fn query_decodes_any_table() {
    let app = App::new(
        MockRegistry::new(Ok(COUNT_JSON), Ok("graph,Proteins\nhttps://idpcentral.org/registry/disprot,2\nshort\n")),
        EndpointTable::default(),
    );
    let result = app
        .query("SELECT ?graph WHERE { }", Endpoint::GraphDb, &JsonOutput)
        .unwrap();
    assert_eq!(result.header, vec!["graph", "Proteins"]);
    assert_eq!(result.rows, vec![vec!["https://idpcentral.org/registry/disprot", "2"]]);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].line, 3);
}

#[test]
fn curl_uses_configured_endpoint() {
    let endpoints =
        EndpointTable::default().with_override(Endpoint::Virtuoso, "http://localhost:8890/sparql");
    let app = App::new(MockRegistry::new(Err(500), Err(500)), endpoints);
    let command = app.curl("ASK {}", Endpoint::Virtuoso);
    assert_eq!(
        command,
        "curl -G -H \"Accept: text/csv\" --data \"query=ASK%20%7B%7D\" http://localhost:8890/sparql"
    );
}
