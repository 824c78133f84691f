//! In-process stand-ins for the catalog and the note service.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::catalog::{CatalogApi, CatalogError};
use crate::config::Config;
use crate::notion::{NoteError, NoteService};

pub fn test_config() -> Config {
    Config {
        aladin_ttb_key: "ttb-test".to_string(),
        notion_token: "secret_test".to_string(),
        notion_database_id: "db-test".to_string(),
        notion_version: "2022-06-28".to_string(),
        notion_title_property: "이름".to_string(),
        search_max_results: 10,
        port: 0,
        static_dir: PathBuf::from("public"),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogCall {
    Search { query: String, max_results: u32 },
    Lookup { isbn: String },
}

/// Answers every request with the same body, or the same HTTP failure.
pub struct StubCatalog {
    reply: Result<String, u16>,
    calls: Mutex<Vec<CatalogCall>>,
}

impl StubCatalog {
    pub fn responding(body: &str) -> Self {
        StubCatalog {
            reply: Ok(body.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16) -> Self {
        StubCatalog {
            reply: Err(status),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<CatalogCall> {
        self.calls.lock().unwrap().last().cloned()
    }

    fn answer(&self, call: CatalogCall) -> Result<String, CatalogError> {
        self.calls.lock().unwrap().push(call);
        self.reply.clone().map_err(CatalogError::Status)
    }
}

#[async_trait]
impl CatalogApi for StubCatalog {
    async fn search(&self, query: &str, max_results: u32) -> Result<String, CatalogError> {
        self.answer(CatalogCall::Search {
            query: query.to_string(),
            max_results,
        })
    }

    async fn lookup(&self, isbn: &str) -> Result<String, CatalogError> {
        self.answer(CatalogCall::Lookup {
            isbn: isbn.to_string(),
        })
    }
}

/// Records every page body and hands out sequential ids, or rejects every
/// page with the given message.
#[derive(Default)]
pub struct StubNotes {
    rejection: Option<String>,
    pages: Mutex<Vec<Value>>,
}

impl StubNotes {
    pub fn rejecting(message: &str) -> Self {
        StubNotes {
            rejection: Some(message.to_string()),
            pages: Mutex::new(Vec::new()),
        }
    }

    pub fn pages(&self) -> Vec<Value> {
        self.pages.lock().unwrap().clone()
    }
}

#[async_trait]
impl NoteService for StubNotes {
    async fn create_page(&self, page: &Value) -> Result<String, NoteError> {
        if let Some(message) = &self.rejection {
            return Err(NoteError::Status {
                status: 400,
                message: message.clone(),
            });
        }
        let mut pages = self.pages.lock().unwrap();
        pages.push(page.clone());
        Ok(format!("page-{}", pages.len()))
    }
}
