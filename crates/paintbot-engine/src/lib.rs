use std::env;
use std::path::Path;

use reqwest::blocking::Response as HttpResponse;
use serde_json::Value;
use sha2::{Digest, Sha256};

pub mod bot;
pub mod catalog;
pub mod config;
pub mod deploy;
pub mod dryrun;
pub mod error;
pub mod platform;
pub mod router;

pub use bot::{Bot, EventOutcome};
pub use catalog::{records_from_query_response, CatalogSource, FileCatalog, NotionCatalog};
pub use config::{BotSettings, LineConfig, NotionConfig};
pub use deploy::{DeployOptions, MenuDeployer};
pub use dryrun::DryrunPlatform;
pub use error::{ApiError, ConfigError, DeployError};
pub use platform::{LineClient, MessagingApi, RichMenuApi, RichMenuSummary};
pub use router::{PostbackRouter, RouteAction};

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Reads the body once; non-2xx becomes `ApiError::Status`, an empty 2xx body becomes `Null`.
pub(crate) fn response_json_or_error(
    service: &'static str,
    response: HttpResponse,
) -> Result<Value, ApiError> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .map_err(|source| ApiError::Body { service, source })?;
    if !status.is_success() {
        return Err(ApiError::Status {
            service,
            status: code,
            body: truncate_text(&body, 512),
        });
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|source| ApiError::Decode { service, source })
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

pub(crate) fn short_id(seed: &str, idx: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(idx.to_be_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..4])
}

pub(crate) fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        _ => None,
    }
}
