use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::Config;
use crate::models::{AddBookRequest, UNKNOWN_AUTHOR, UNKNOWN_TITLE};
use crate::sanitize::truncate_chars;

// ── Constants ────────────────────────────────────────────────────────────────

const USER_AGENT: &str = "aladin-notion-relay/1.0";
const PAGES_URL: &str = "https://api.notion.com/v1/pages";

/// Per-text-object limit of the pages API.
pub const MAX_TEXT_LEN: usize = 2000;

const AUTHOR_PROPERTY: &str = "author";
const PUBLISHER_PROPERTY: &str = "publisher";
const DATE_PROPERTY: &str = "pubDate";
const CATEGORY_PROPERTY: &str = "category";
const ISBN_PROPERTY: &str = "isbn";
const LINK_PROPERTY: &str = "link";
const COVER_PROPERTY: &str = "cover";

static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    #[error("note service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("{0}")]
    Request(String),
}

// ── Capability ───────────────────────────────────────────────────────────────

/// Creates pages in the external note database and returns the new page id.
#[async_trait]
pub trait NoteService: Send + Sync {
    async fn create_page(&self, page: &Value) -> Result<String, NoteError>;
}

// ── Notion client ────────────────────────────────────────────────────────────

pub struct NotionClient {
    http: reqwest::Client,
    token: String,
    version: String,
}

#[derive(Deserialize)]
struct CreatedPage {
    id: String,
}

#[derive(Deserialize)]
struct ApiError {
    code: Option<String>,
    message: Option<String>,
}

impl NotionClient {
    pub fn new(config: &Config) -> Result<Self, NoteError> {
        let http = reqwest::ClientBuilder::new()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| NoteError::Request(e.to_string()))?;
        Ok(NotionClient {
            http,
            token: config.notion_token.clone(),
            version: config.notion_version.clone(),
        })
    }
}

#[async_trait]
impl NoteService for NotionClient {
    async fn create_page(&self, page: &Value) -> Result<String, NoteError> {
        let response = self
            .http
            .post(PAGES_URL)
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.version)
            .json(page)
            .send()
            .await
            .map_err(|e| NoteError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NoteError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(NoteError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        serde_json::from_str::<CreatedPage>(&body)
            .map(|p| p.id)
            .map_err(|e| NoteError::Request(format!("unexpected page response: {e}")))
    }
}

/// The service's own `code: message` when the body carries one, otherwise
/// the status line's reason phrase.
pub fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<ApiError>(body)
        .ok()
        .and_then(|e| match (e.code, e.message) {
            (Some(code), Some(message)) => Some(format!("{code}: {message}")),
            (None, Some(message)) => Some(message),
            _ => None,
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string())
}

// ── Page construction ────────────────────────────────────────────────────────

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn text(content: &str) -> Value {
    json!([{ "type": "text", "text": { "content": truncate_chars(content, MAX_TEXT_LEN) } }])
}

fn external_file(url: &str) -> Value {
    json!({ "type": "external", "external": { "url": url } })
}

/// Build the page-creation body for one book. Absent or blank title and
/// author fall back to placeholder text; every other empty field is left
/// out so the database keeps its column defaults.
pub fn build_page(database_id: &str, title_property: &str, book: &AddBookRequest) -> Value {
    let title = non_empty(book.title.as_deref()).unwrap_or(UNKNOWN_TITLE);
    let author = non_empty(book.author.as_deref()).unwrap_or(UNKNOWN_AUTHOR);

    let mut properties = Map::new();
    properties.insert(title_property.to_string(), json!({ "title": text(title) }));
    properties.insert(AUTHOR_PROPERTY.to_string(), json!({ "rich_text": text(author) }));

    for (name, value) in [
        (PUBLISHER_PROPERTY, &book.publisher),
        (CATEGORY_PROPERTY, &book.category),
        (ISBN_PROPERTY, &book.isbn),
    ] {
        if let Some(value) = non_empty(value.as_deref()) {
            properties.insert(name.to_string(), json!({ "rich_text": text(value) }));
        }
    }

    if let Some(date) = non_empty(book.pub_date.as_deref()) {
        if ISO_DATE_RE.is_match(date) {
            properties.insert(DATE_PROPERTY.to_string(), json!({ "date": { "start": date } }));
        } else {
            tracing::debug!(date, "skipping non-ISO publication date");
        }
    }

    if let Some(link) = non_empty(book.link.as_deref()) {
        properties.insert(LINK_PROPERTY.to_string(), json!({ "url": link }));
    }

    let cover = non_empty(book.cover.as_deref());
    if let Some(cover) = cover {
        let mut file = external_file(cover);
        file["name"] = json!("cover");
        properties.insert(COVER_PROPERTY.to_string(), json!({ "files": [file] }));
    }

    let mut page = json!({
        "parent": { "database_id": database_id },
        "properties": properties,
    });

    if let Some(cover) = cover {
        page["cover"] = external_file(cover);
    }

    if let Some(description) = non_empty(book.description.as_deref()) {
        page["children"] = json!([{
            "object": "block",
            "type": "quote",
            "quote": { "rich_text": text(description) },
        }]);
    }

    page
}
