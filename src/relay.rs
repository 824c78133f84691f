use std::sync::Arc;

use crate::catalog::{CatalogApi, CatalogError, CatalogResponse};
use crate::config::Config;
use crate::extract::{extract_json, ExtractionError};
use crate::models::{AddBookRequest, BookDetail, BookSummary};
use crate::notion::{build_page, NoteError, NoteService};

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{0}")]
    BadRequest(String),
    #[error("malformed upstream response: {0}")]
    UpstreamMalformed(String),
    #[error("upstream reported error {code}: {message}")]
    UpstreamReported { code: String, message: String },
    #[error("{0}")]
    NotFound(String),
    #[error("upstream call failed: {0}")]
    UpstreamCallFailed(String),
}

impl From<ExtractionError> for RelayError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Malformed(msg) => RelayError::UpstreamMalformed(msg),
            ExtractionError::Reported { code, message } => {
                RelayError::UpstreamReported { code, message }
            }
        }
    }
}

impl From<CatalogError> for RelayError {
    fn from(err: CatalogError) -> Self {
        RelayError::UpstreamCallFailed(err.to_string())
    }
}

impl From<NoteError> for RelayError {
    fn from(err: NoteError) -> Self {
        match err {
            NoteError::Status { message, .. } => RelayError::UpstreamCallFailed(message),
            NoteError::Request(msg) => RelayError::UpstreamCallFailed(msg),
        }
    }
}

// ── Relay ────────────────────────────────────────────────────────────────────

/// Stateless request translation between the client page, the catalog and
/// the note database. Every call makes at most one outbound request.
#[derive(Clone)]
pub struct Relay {
    catalog: Arc<dyn CatalogApi>,
    notes: Arc<dyn NoteService>,
    database_id: String,
    title_property: String,
    max_results: u32,
}

impl Relay {
    pub fn new(
        config: &Config,
        catalog: Arc<dyn CatalogApi>,
        notes: Arc<dyn NoteService>,
    ) -> Self {
        Relay {
            catalog,
            notes,
            database_id: config.notion_database_id.clone(),
            title_property: config.notion_title_property.clone(),
            max_results: config.search_max_results,
        }
    }

    pub async fn search(&self, query: Option<&str>) -> Result<Vec<BookSummary>, RelayError> {
        let query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| RelayError::BadRequest("검색어를 입력해주세요".to_string()))?;

        let raw = self.catalog.search(query, self.max_results).await?;
        let response = parse_catalog(&raw)?;
        let books: Vec<BookSummary> = response
            .item
            .into_iter()
            .map(|item| item.into_summary())
            .collect();

        tracing::info!(query, results = books.len(), "search relayed");
        Ok(books)
    }

    pub async fn detail(&self, isbn: Option<&str>) -> Result<BookDetail, RelayError> {
        let isbn: String = isbn
            .unwrap_or_default()
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .collect();
        if isbn.is_empty() {
            return Err(RelayError::BadRequest("ISBN을 입력해주세요".to_string()));
        }

        let raw = self.catalog.lookup(&isbn).await?;
        let item = parse_catalog(&raw)?
            .item
            .into_iter()
            .next()
            .ok_or_else(|| RelayError::NotFound(format!("no item for isbn {isbn}")))?;

        tracing::info!(%isbn, "detail relayed");
        Ok(item.into_detail())
    }

    /// Create one page per call. Identical requests create separate pages.
    pub async fn add(&self, book: &AddBookRequest) -> Result<String, RelayError> {
        let page = build_page(&self.database_id, &self.title_property, book);
        let page_id = self.notes.create_page(&page).await?;
        tracing::info!(%page_id, "page created");
        Ok(page_id)
    }
}

fn parse_catalog(raw: &str) -> Result<CatalogResponse, RelayError> {
    let value = extract_json(raw)?;
    serde_json::from_value(value).map_err(|e| RelayError::UpstreamMalformed(e.to_string()))
}
