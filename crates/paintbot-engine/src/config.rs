use std::path::PathBuf;
use std::time::Duration;

use paintbot_contracts::catalog::{clamp_max_cards, OverflowPolicy, DEFAULT_MAX_CARDS};

use crate::error::ConfigError;
use crate::non_empty_env;

pub const DEFAULT_LINE_API_BASE: &str = "https://api.line.me/v2/bot";
pub const DEFAULT_LINE_DATA_API_BASE: &str = "https://api-data.line.me/v2/bot";
pub const DEFAULT_NOTION_API_BASE: &str = "https://api.notion.com/v1";
pub const DEFAULT_MENU_DIR: &str = "Richmenu";
pub const DEFAULT_CATALOG_TIMEOUT: Duration = Duration::from_millis(8000);

#[derive(Debug, Clone)]
pub struct LineConfig {
    pub access_token: String,
    pub api_base: String,
    pub data_api_base: String,
}

impl LineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(non_empty_env)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            access_token: lookup("LINE_CHANNEL_ACCESS_TOKEN")
                .ok_or(ConfigError::Missing("LINE_CHANNEL_ACCESS_TOKEN"))?,
            api_base: base_url(lookup("LINE_API_BASE"), DEFAULT_LINE_API_BASE),
            data_api_base: base_url(lookup("LINE_DATA_API_BASE"), DEFAULT_LINE_DATA_API_BASE),
        })
    }
}

#[derive(Debug, Clone)]
pub struct NotionConfig {
    pub token: String,
    pub database_id: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl NotionConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(non_empty_env)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let timeout = match lookup("PAINTBOT_CATALOG_TIMEOUT_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|value| *value > 0)
                .map(Duration::from_millis)
                .ok_or(ConfigError::Invalid {
                    key: "PAINTBOT_CATALOG_TIMEOUT_MS",
                    value: raw,
                })?,
            None => DEFAULT_CATALOG_TIMEOUT,
        };
        Ok(Self {
            token: lookup("NOTION_API_KEY").ok_or(ConfigError::Missing("NOTION_API_KEY"))?,
            database_id: lookup("NOTION_PAINT_TABLE_DB")
                .ok_or(ConfigError::Missing("NOTION_PAINT_TABLE_DB"))?,
            api_base: base_url(lookup("NOTION_API_BASE"), DEFAULT_NOTION_API_BASE),
            timeout,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotSettings {
    pub max_cards: usize,
    pub overflow: OverflowPolicy,
    pub brand_identity_template: Option<PathBuf>,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            max_cards: DEFAULT_MAX_CARDS,
            overflow: OverflowPolicy::default(),
            brand_identity_template: None,
        }
    }
}

impl BotSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(non_empty_env)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let max_cards = match lookup("PAINTBOT_MAX_CARDS") {
            Some(raw) => raw
                .parse::<usize>()
                .map(clamp_max_cards)
                .map_err(|_| ConfigError::Invalid {
                    key: "PAINTBOT_MAX_CARDS",
                    value: raw,
                })?,
            None => DEFAULT_MAX_CARDS,
        };
        let overflow = match lookup("PAINTBOT_OVERFLOW") {
            Some(raw) => OverflowPolicy::parse(&raw).ok_or(ConfigError::Invalid {
                key: "PAINTBOT_OVERFLOW",
                value: raw,
            })?,
            None => OverflowPolicy::default(),
        };
        Ok(Self {
            max_cards,
            overflow,
            brand_identity_template: lookup("PAINTBOT_CIS_TEMPLATE").map(PathBuf::from),
        })
    }
}

pub fn menu_dir_from_env() -> PathBuf {
    non_empty_env("PAINTBOT_MENU_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MENU_DIR))
}

fn base_url(value: Option<String>, default: &str) -> String {
    value
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}
