use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use paintbot_contracts::catalog::CatalogRecord;
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::NotionConfig;
use crate::error::ApiError;
use crate::response_json_or_error;

const SERVICE: &str = "Notion";
const NOTION_VERSION: &str = "2022-06-28";
const PAGE_SIZE: u64 = 100;

/// Where catalog rows come from. Implementations return the rows of one
/// query, in the order the source returned them.
pub trait CatalogSource: Send + Sync {
    fn fetch_records(&self) -> Result<Vec<CatalogRecord>>;
}

pub struct NotionCatalog {
    config: NotionConfig,
    http: HttpClient,
}

impl NotionCatalog {
    pub fn new(config: NotionConfig) -> Result<Self, ApiError> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| ApiError::Client {
                service: SERVICE,
                source,
            })?;
        Ok(Self { config, http })
    }

    fn query(&self) -> Result<Value, ApiError> {
        let endpoint = format!(
            "{}/databases/{}/query",
            self.config.api_base, self.config.database_id
        );
        debug!(endpoint = %endpoint, "querying catalog database");
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.config.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&json!({ "page_size": PAGE_SIZE }))
            .send()
            .map_err(|source| ApiError::Transport {
                service: SERVICE,
                endpoint: endpoint.clone(),
                source,
            })?;
        response_json_or_error(SERVICE, response)
    }
}

impl CatalogSource for NotionCatalog {
    fn fetch_records(&self) -> Result<Vec<CatalogRecord>> {
        let payload = self.query().with_context(|| {
            format!("catalog query failed for database {}", self.config.database_id)
        })?;
        if payload.get("has_more").and_then(Value::as_bool) == Some(true) {
            warn!(
                database_id = %self.config.database_id,
                "catalog has more rows than one page; only the first page is used"
            );
        }
        records_from_query_response(&payload)
    }
}

/// Reads rows from a saved query response on disk.
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogSource for FileCatalog {
    fn fetch_records(&self) -> Result<Vec<CatalogRecord>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        let payload: Value = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not valid JSON", self.path.display()))?;
        records_from_query_response(&payload)
    }
}

/// Accepts either a full query response (`{"results": [...]}`) or a bare
/// array of page objects.
pub fn records_from_query_response(payload: &Value) -> Result<Vec<CatalogRecord>> {
    let rows = match payload {
        Value::Array(rows) => rows,
        _ => payload
            .get("results")
            .and_then(Value::as_array)
            .ok_or(ApiError::MissingField {
                service: SERVICE,
                field: "results",
            })?,
    };
    Ok(rows.iter().map(CatalogRecord::from_page).collect())
}
