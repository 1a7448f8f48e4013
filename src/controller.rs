//! Pagination and search state for the registry listing.
//!
//! Every input change returns the [`Dispatch`]es it requires. Whoever runs
//! them reports back through [`Controller::complete`]; each kind of request
//! only accepts the answer to its most recent dispatch, so a slow response
//! can never overwrite the result of a newer page, page size or search.

use serde::Serialize;
use tracing::{debug, warn};

use crate::aggregate::aggregate_response;
use crate::domain::{DEFAULT_ITEMS_PER_PAGE, Delimiter, Endpoint, validate_items_per_page};
use crate::error::ExplorerError;
use crate::gateway::{QueryGateway, QueryResponse};
use crate::protein::Protein;
use crate::query::{SearchFilter, Window, count_query, registry_query};
use crate::tabular::{RowIssue, parse_count};

const PAGE_WINDOW: usize = 5;
/// Highest page accepted while the total is unknown.
pub const MAX_PAGE: usize = u32::MAX as usize;

pub type RequestToken = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Count,
    Page,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::Count => "count",
            RequestKind::Page => "page",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub token: RequestToken,
    pub kind: RequestKind,
    pub endpoint: Endpoint,
    pub query: String,
}

/// Failed query as shown to the user. `status` is 0 when no HTTP status was received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryFailure {
    pub kind: RequestKind,
    pub message: String,
    pub status: u16,
}

impl QueryFailure {
    fn new(kind: RequestKind, error: &ExplorerError) -> Self {
        let message = match error {
            ExplorerError::EndpointStatus { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self {
            kind,
            message,
            status: error.status_code().unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PageView {
    #[default]
    Idle,
    Loading,
    Loaded(Vec<Protein>),
    Failed,
}

impl PageView {
    pub fn proteins(&self) -> &[Protein] {
        match self {
            PageView::Loaded(proteins) => proteins,
            _ => &[],
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, PageView::Loading)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Stale,
}

#[derive(Debug, Clone)]
pub struct Controller {
    page: usize,
    items_per_page: usize,
    search: SearchFilter,
    endpoint: Endpoint,
    total: Option<u64>,
    count_failed: bool,
    view: PageView,
    error: Option<QueryFailure>,
    skipped: Vec<RowIssue>,
    elapsed_ms: Option<u128>,
    next_token: RequestToken,
    latest_count: Option<RequestToken>,
    latest_page: Option<RequestToken>,
}

impl Default for Controller {
    fn default() -> Self {
        Self {
            page: 1,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            search: SearchFilter::default(),
            endpoint: Endpoint::GraphDb,
            total: None,
            count_failed: false,
            view: PageView::Idle,
            error: None,
            skipped: Vec::new(),
            elapsed_ms: None,
            next_token: 1,
            latest_count: None,
            latest_page: None,
        }
    }
}

impl Controller {
    pub fn new(endpoint: Endpoint, items_per_page: usize) -> Result<Self, ExplorerError> {
        Ok(Self {
            endpoint,
            items_per_page: validate_items_per_page(items_per_page)?,
            ..Self::default()
        })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    pub fn search(&self) -> &SearchFilter {
        &self.search
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn view(&self) -> &PageView {
        &self.view
    }

    pub fn error(&self) -> Option<&QueryFailure> {
        self.error.as_ref()
    }

    pub fn skipped(&self) -> &[RowIssue] {
        &self.skipped
    }

    pub fn elapsed_ms(&self) -> Option<u128> {
        self.elapsed_ms
    }

    pub fn is_pending(&self) -> bool {
        self.latest_count.is_some() || self.latest_page.is_some()
    }

    /// Initial load: the count and the first page.
    pub fn start(&mut self) -> Vec<Dispatch> {
        vec![self.dispatch(RequestKind::Count), self.dispatch(RequestKind::Page)]
    }

    /// New search text. Back to page 1 with the old total and error dropped.
    pub fn set_search(&mut self, text: impl Into<String>) -> Vec<Dispatch> {
        self.search = SearchFilter::new(text);
        self.page = 1;
        self.total = None;
        self.error = None;
        vec![self.dispatch(RequestKind::Count), self.dispatch(RequestKind::Page)]
    }

    pub fn set_page(&mut self, page: usize) -> Vec<Dispatch> {
        let mut page = page.clamp(1, MAX_PAGE);
        let total_pages = self.total_pages();
        if total_pages > 0 {
            page = page.min(total_pages);
        }
        self.page = page;
        vec![self.dispatch(RequestKind::Page)]
    }

    pub fn set_items_per_page(&mut self, items_per_page: usize) -> Result<Vec<Dispatch>, ExplorerError> {
        self.items_per_page = validate_items_per_page(items_per_page)?;
        self.page = 1;
        Ok(vec![self.dispatch(RequestKind::Page)])
    }

    /// Switches backend and runs the current search again there.
    pub fn set_endpoint(&mut self, endpoint: Endpoint) -> Vec<Dispatch> {
        self.endpoint = endpoint;
        let search = self.search.as_str().to_string();
        self.set_search(search)
    }

    pub fn next_page(&mut self) -> Vec<Dispatch> {
        self.set_page(self.page.saturating_add(1))
    }

    pub fn previous_page(&mut self) -> Vec<Dispatch> {
        self.set_page(self.page.saturating_sub(1))
    }

    pub fn first_page(&mut self) -> Vec<Dispatch> {
        self.set_page(1)
    }

    pub fn last_page(&mut self) -> Vec<Dispatch> {
        self.set_page(self.total_pages().max(1))
    }

    pub fn total_pages(&self) -> usize {
        self.total
            .map(|total| total.div_ceil(self.items_per_page as u64) as usize)
            .unwrap_or(0)
    }

    /// Up to five page numbers around the current page.
    pub fn page_numbers(&self) -> Vec<usize> {
        page_numbers(self.page, self.total_pages())
    }

    /// Applies the answer to a dispatch, unless a newer dispatch of the same kind exists.
    pub fn complete(
        &mut self,
        token: RequestToken,
        result: Result<QueryResponse, ExplorerError>,
    ) -> Completion {
        if self.latest_count == Some(token) {
            self.latest_count = None;
            match result.and_then(|response| parse_count(&response.body)) {
                Ok(total) => self.total = Some(total),
                Err(err) => {
                    warn!("count query failed: {err}");
                    self.total = None;
                    self.count_failed = true;
                    self.view = PageView::Failed;
                    self.error = Some(QueryFailure::new(RequestKind::Count, &err));
                }
            }
            return Completion::Applied;
        }

        if self.latest_page == Some(token) {
            self.latest_page = None;
            if self.count_failed {
                debug!(token, "count failed, page result not shown");
                self.view = PageView::Failed;
                return Completion::Applied;
            }
            let outcome = result.and_then(|response| {
                aggregate_response(&response.body, Delimiter::Comma)
                    .map(|aggregation| (response.elapsed_ms, aggregation))
            });
            match outcome {
                Ok((elapsed_ms, aggregation)) => {
                    self.elapsed_ms = Some(elapsed_ms);
                    self.skipped = aggregation.skipped;
                    self.view = PageView::Loaded(aggregation.proteins);
                }
                Err(err) => {
                    warn!("page query failed: {err}");
                    self.view = PageView::Failed;
                    self.error = Some(QueryFailure::new(RequestKind::Page, &err));
                }
            }
            return Completion::Applied;
        }

        debug!(token, "dropping superseded response");
        Completion::Stale
    }

    /// Executes `dispatches` one after another against `gateway`.
    pub fn run<G: QueryGateway + ?Sized>(&mut self, dispatches: Vec<Dispatch>, gateway: &G) {
        for dispatch in dispatches {
            let result = gateway.execute(&dispatch.query, dispatch.endpoint);
            self.complete(dispatch.token, result);
        }
    }

    fn dispatch(&mut self, kind: RequestKind) -> Dispatch {
        let token = self.next_token;
        self.next_token += 1;
        if self.error.as_ref().is_some_and(|failure| failure.kind == kind) {
            self.error = None;
        }
        let query = match kind {
            RequestKind::Count => {
                self.latest_count = Some(token);
                self.count_failed = false;
                count_query(&self.search)
            }
            RequestKind::Page => {
                self.latest_page = Some(token);
                self.view = PageView::Loading;
                self.skipped.clear();
                self.elapsed_ms = None;
                registry_query(Window::for_page(self.page, self.items_per_page), &self.search)
            }
        };
        debug!(token, ?kind, page = self.page, search = self.search.as_str(), "dispatching query");
        Dispatch {
            token,
            kind,
            endpoint: self.endpoint,
            query,
        }
    }
}

pub fn page_numbers(current_page: usize, total_pages: usize) -> Vec<usize> {
    let current = i64::try_from(current_page).unwrap_or(i64::MAX);
    let total = i64::try_from(total_pages).unwrap_or(i64::MAX);
    let span = PAGE_WINDOW as i64 - 1;
    let start = (current - 2).max(1);
    let end = total.min(start.saturating_add(span));
    let start = (end - span).max(1);
    (start..=end).map(|page| page as usize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_number_windows() {
        assert_eq!(page_numbers(1, 5), vec![1, 2, 3, 4, 5]);
        assert_eq!(page_numbers(5, 5), vec![1, 2, 3, 4, 5]);
        assert_eq!(page_numbers(10, 20), vec![8, 9, 10, 11, 12]);
        assert_eq!(page_numbers(19, 20), vec![16, 17, 18, 19, 20]);
        assert_eq!(page_numbers(2, 3), vec![1, 2, 3]);
        assert!(page_numbers(1, 0).is_empty());
        assert_eq!(page_numbers(usize::MAX, usize::MAX).len(), 5);
    }

    #[test]
    fn total_pages_rounds_up() {
        let mut controller = Controller::default();
        controller.total = Some(23);
        assert_eq!(controller.total_pages(), 5);
        assert_eq!(controller.page_numbers(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn page_is_clamped_to_known_total() {
        let mut controller = Controller::default();
        controller.total = Some(12);
        controller.set_page(9);
        assert_eq!(controller.page(), 3);
        controller.set_page(0);
        assert_eq!(controller.page(), 1);
    }

    #[test]
    fn dispatch_shows_loading_and_clears_its_own_error() {
        let mut controller = Controller::default();
        controller.error = Some(QueryFailure {
            kind: RequestKind::Page,
            message: "boom".to_string(),
            status: 500,
        });
        controller.view = PageView::Loaded(Vec::new());
        let dispatches = controller.set_page(2);
        assert_eq!(dispatches.len(), 1);
        assert!(controller.view().is_loading());
        assert!(controller.error().is_none());
        assert!(dispatches[0].query.contains("OFFSET 5"));
    }

    #[test]
    fn page_dispatch_keeps_count_failure() {
        let mut controller = Controller::default();
        controller.error = Some(QueryFailure {
            kind: RequestKind::Count,
            message: "timeout".to_string(),
            status: 0,
        });
        controller.next_page();
        assert_eq!(controller.error().map(|failure| failure.kind), Some(RequestKind::Count));
    }
}
