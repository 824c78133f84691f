use async_trait::async_trait;
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::config::Config;
use crate::models::{BookDetail, BookSummary, UNKNOWN_AUTHOR, UNKNOWN_TITLE};
use crate::sanitize::{clean_text, upgrade_cover_url};

// ── Constants ────────────────────────────────────────────────────────────────

const USER_AGENT: &str = "aladin-notion-relay/1.0";
const SEARCH_URL: &str = "https://www.aladin.co.kr/ttb/api/ItemSearch.aspx";
const LOOKUP_URL: &str = "https://www.aladin.co.kr/ttb/api/ItemLookUp.aspx";
const API_VERSION: &str = "20131101";
pub const NO_DESCRIPTION: &str = "설명이 없습니다.";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog returned HTTP {0}")]
    Status(u16),
    #[error("{0}")]
    Request(String),
}

// ── Capability ───────────────────────────────────────────────────────────────

/// Raw access to the bookstore catalog. Implementations return the response
/// body untouched; callers run it through [`crate::extract::extract_json`].
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn search(&self, query: &str, max_results: u32) -> Result<String, CatalogError>;
    async fn lookup(&self, isbn: &str) -> Result<String, CatalogError>;
}

// ── Aladin TTB client ────────────────────────────────────────────────────────

pub struct AladinClient {
    http: reqwest::Client,
    ttb_key: String,
}

impl AladinClient {
    pub fn new(config: &Config) -> Result<Self, CatalogError> {
        let http = reqwest::ClientBuilder::new()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CatalogError::Request(e.to_string()))?;
        Ok(AladinClient {
            http,
            ttb_key: config.aladin_ttb_key.clone(),
        })
    }

    async fn fetch_text(&self, url: Url) -> Result<String, CatalogError> {
        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_connect() {
                CatalogError::Request(format!("ConnectError: {}", e))
            } else {
                CatalogError::Request(format!("RequestError: {}", e))
            }
        })?;

        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status().as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| CatalogError::Request(e.to_string()))
    }
}

#[async_trait]
impl CatalogApi for AladinClient {
    async fn search(&self, query: &str, max_results: u32) -> Result<String, CatalogError> {
        let url = search_url(&self.ttb_key, query, max_results)?;
        tracing::debug!(query, "catalog search");
        self.fetch_text(url).await
    }

    async fn lookup(&self, isbn: &str) -> Result<String, CatalogError> {
        let url = lookup_url(&self.ttb_key, isbn)?;
        tracing::debug!(isbn, "catalog lookup");
        self.fetch_text(url).await
    }
}

// ── Request URLs ─────────────────────────────────────────────────────────────

/// Title search over books only, first page of `max_results` items.
pub fn search_url(ttb_key: &str, query: &str, max_results: u32) -> Result<Url, CatalogError> {
    let max_results = max_results.to_string();
    Url::parse_with_params(
        SEARCH_URL,
        &[
            ("ttbkey", ttb_key),
            ("Query", query),
            ("QueryType", "Title"),
            ("MaxResults", max_results.as_str()),
            ("start", "1"),
            ("SearchTarget", "Book"),
            ("output", "js"),
            ("Version", API_VERSION),
        ],
    )
    .map_err(|e| CatalogError::Request(e.to_string()))
}

/// Single-item lookup. Thirteen-character ids are looked up as ISBN-13.
pub fn lookup_url(ttb_key: &str, isbn: &str) -> Result<Url, CatalogError> {
    let id_type = if isbn.len() == 13 { "ISBN13" } else { "ISBN" };
    Url::parse_with_params(
        LOOKUP_URL,
        &[
            ("ttbkey", ttb_key),
            ("itemIdType", id_type),
            ("ItemId", isbn),
            ("Cover", "Big"),
            ("output", "js"),
            ("Version", API_VERSION),
        ],
    )
    .map_err(|e| CatalogError::Request(e.to_string()))
}

// ── Response shape ───────────────────────────────────────────────────────────

// The catalog is loose about types: `item` may be null, and a field can
// arrive as a string where a number is expected. A bad field is dropped
// rather than failing the whole response.

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct CatalogResponse {
    #[serde(deserialize_with = "null_as_empty")]
    pub item: Vec<CatalogItem>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogItem {
    #[serde(deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub author: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub publisher: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub pub_date: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub cover: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub category_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub isbn: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub isbn13: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub link: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub price_standard: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub price_sales: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub customer_review_rank: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub sub_info: Option<SubInfo>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SubInfo {
    #[serde(deserialize_with = "lenient")]
    pub item_page: Option<u32>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

// ── Item mapping ─────────────────────────────────────────────────────────────

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl CatalogItem {
    pub fn into_summary(self) -> BookSummary {
        let title = self.title.as_deref().map(clean_text).unwrap_or_default();
        let author = self.author.as_deref().map(clean_text).unwrap_or_default();
        let description = self
            .description
            .as_deref()
            .map(clean_text)
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());

        BookSummary {
            title: if title.is_empty() { UNKNOWN_TITLE.to_string() } else { title },
            author: if author.is_empty() { UNKNOWN_AUTHOR.to_string() } else { author },
            publisher: non_empty(self.publisher),
            pub_date: non_empty(self.pub_date),
            cover: non_empty(self.cover).map(|c| upgrade_cover_url(&c)),
            description: Some(description),
            category: non_empty(self.category_name),
            isbn: non_empty(self.isbn13).or_else(|| non_empty(self.isbn)),
            link: non_empty(self.link),
        }
    }

    pub fn into_detail(mut self) -> BookDetail {
        let price_standard = self.price_standard;
        let price_sales = self.price_sales;
        let rating = self.customer_review_rank;
        let page_count = self.sub_info.take().and_then(|s| s.item_page);
        BookDetail {
            summary: self.into_summary(),
            price_standard,
            price_sales,
            rating,
            page_count,
        }
    }
}
