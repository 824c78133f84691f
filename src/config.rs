use std::path::PathBuf;

// ── Defaults ─────────────────────────────────────────────────────────────────

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_STATIC_DIR: &str = "public";
const DEFAULT_MAX_RESULTS: u32 = 10;
const MAX_RESULTS_CEILING: u32 = 50;
const DEFAULT_NOTION_VERSION: &str = "2022-06-28";
const DEFAULT_TITLE_PROPERTY: &str = "이름";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

// ── Config ───────────────────────────────────────────────────────────────────

/// Everything the relays need from the outside world, resolved once at
/// startup and handed to the clients explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub aladin_ttb_key: String,
    pub notion_token: String,
    pub notion_database_id: String,
    pub notion_version: String,
    pub notion_title_property: String,
    pub search_max_results: u32,
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Config {
    /// Read the process environment, honouring an optional `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing `.env` is fine; real deployments set the variables directly.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let port = match get("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value: raw })?,
            None => DEFAULT_PORT,
        };

        let search_max_results = match get("SEARCH_MAX_RESULTS") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if (1..=MAX_RESULTS_CEILING).contains(&n) => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "SEARCH_MAX_RESULTS",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_MAX_RESULTS,
        };

        Ok(Config {
            aladin_ttb_key: required("ALADIN_TTB_KEY")?,
            notion_token: required("NOTION_TOKEN")?,
            notion_database_id: required("NOTION_DB_ID")?,
            notion_version: get("NOTION_VERSION")
                .unwrap_or_else(|| DEFAULT_NOTION_VERSION.to_string()),
            notion_title_property: get("NOTION_TITLE_PROPERTY")
                .unwrap_or_else(|| DEFAULT_TITLE_PROPERTY.to_string()),
            search_max_results,
            port,
            static_dir: get("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
        })
    }
}
