use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::menus::MenuStage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupEntry {
    pub resource_id: String,
    pub name: Option<String>,
    pub deleted: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedMenu {
    pub name: String,
    pub alias: String,
    pub resource_id: Option<String>,
    pub stage: MenuStage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentReport {
    pub started_at: String,
    pub finished_at: Option<String>,
    pub cleanup_requested: bool,
    /// Set when the existing menus could not even be listed.
    #[serde(default)]
    pub cleanup_error: Option<String>,
    #[serde(default)]
    pub cleanup: Vec<CleanupEntry>,
    #[serde(default)]
    pub menus: Vec<DeployedMenu>,
    pub default_menu: Option<String>,
}

impl DeploymentReport {
    pub fn start(cleanup_requested: bool) -> Self {
        Self {
            started_at: now_utc_iso(),
            finished_at: None,
            cleanup_requested,
            cleanup_error: None,
            cleanup: Vec::new(),
            menus: Vec::new(),
            default_menu: None,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(now_utc_iso());
    }

    pub fn cleanup_failures(&self) -> usize {
        self.cleanup.iter().filter(|entry| !entry.deleted).count()
    }

    pub fn menu(&self, name: &str) -> Option<&DeployedMenu> {
        self.menus.iter().find(|menu| menu.name == name)
    }
}

pub fn write_report(
    path: &Path,
    report: &DeploymentReport,
    extra: Option<&Map<String, Value>>,
) -> anyhow::Result<()> {
    let mut payload = match serde_json::to_value(report)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    payload.insert("ts".to_string(), Value::String(now_utc_iso()));
    if let Some(extra) = extra {
        for (key, value) in extra {
            payload.insert(key.clone(), value.clone());
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&Value::Object(payload))?)?;
    Ok(())
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
