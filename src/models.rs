use serde::{Deserialize, Serialize};

/// One normalized catalog result, as sent to the client page.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub title: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Lookup result: the summary plus the commercial fields only the item
/// lookup endpoint returns.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookDetail {
    #[serde(flatten)]
    pub summary: BookSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_standard: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_sales: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DetailParams {
    pub isbn: Option<String>,
}

/// Client-chosen fields to persist. Nothing is validated beyond presence;
/// blanks are treated the same as absent values.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AddBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub pub_date: Option<String>,
    pub cover: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub isbn: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBookResponse {
    pub ok: bool,
    pub page_id: String,
}

pub const UNKNOWN_TITLE: &str = "제목 없음";
pub const UNKNOWN_AUTHOR: &str = "저자 미상";
