use std::path::PathBuf;

use paintbot_contracts::menus::MenuStage;

/// Failure talking to the catalog source or the messaging platform.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{service} HTTP client could not be built")]
    Client {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} request could not be sent ({endpoint})")]
    Transport {
        service: &'static str,
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} response body read failed")]
    Body {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} request failed ({status}): {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("{service} returned invalid JSON payload")]
    Decode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{service} response is missing `{field}`")]
    MissingField {
        service: &'static str,
        field: &'static str,
    },
}

impl ApiError {
    /// The platform answers an alias create for an existing alias with 400
    /// ("conflict richmenu alias id"); a plain 409 is accepted too.
    pub fn is_conflict(&self) -> bool {
        match self {
            ApiError::Status { status: 409, .. } => true,
            ApiError::Status { status: 400, body, .. } => {
                let lower = body.to_ascii_lowercase();
                lower.contains("conflict") || lower.contains("already exists")
            }
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            ApiError::Transport { source, .. } | ApiError::Body { source, .. } => {
                source.is_timeout()
            }
            _ => false,
        }
    }
}

/// A deployment step that could not complete. Nothing is rolled back: the
/// resource created so far (if any) stays on the platform until the next
/// delete-all redeploy.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("menu '{menu}': cannot read asset {}", .path.display())]
    Asset {
        menu: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("menu '{menu}': layout {} is not valid JSON", .path.display())]
    Layout {
        menu: String,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("menu '{menu}' stopped at stage '{reached}' (resource: {})", .resource_id.as_deref().unwrap_or("none"))]
    Step {
        menu: String,
        reached: MenuStage,
        resource_id: Option<String>,
        #[source]
        source: ApiError,
    },
}

impl DeployError {
    pub fn menu(&self) -> &str {
        match self {
            DeployError::Asset { menu, .. }
            | DeployError::Layout { menu, .. }
            | DeployError::Step { menu, .. } => menu,
        }
    }

    pub fn reached(&self) -> MenuStage {
        match self {
            DeployError::Step { reached, .. } => *reached,
            _ => MenuStage::Absent,
        }
    }

    /// Resource left on the platform by the failed deployment, if any.
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            DeployError::Step { resource_id, .. } => resource_id.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use paintbot_contracts::menus::MenuStage;

    use super::{ApiError, DeployError};

    fn status(status: u16, body: &str) -> ApiError {
        ApiError::Status {
            service: "LINE",
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn conflict_detection_matches_platform_responses() {
        assert!(status(400, r#"{"message":"conflict richmenu alias id"}"#).is_conflict());
        assert!(status(409, "").is_conflict());
        assert!(!status(400, r#"{"message":"invalid alias"}"#).is_conflict());
        assert!(!status(500, "conflict").is_conflict());
        assert!(status(404, "").is_not_found());
    }

    #[test]
    fn step_error_reports_menu_stage_and_resource() {
        let err = DeployError::Step {
            menu: "richmenu1".to_string(),
            reached: MenuStage::Created,
            resource_id: Some("richmenu-abc".to_string()),
            source: status(400, "bad image"),
        };
        assert_eq!(
            err.to_string(),
            "menu 'richmenu1' stopped at stage 'created' (resource: richmenu-abc)"
        );
        assert_eq!(err.menu(), "richmenu1");
        assert_eq!(err.reached(), MenuStage::Created);
        assert_eq!(err.resource_id(), Some("richmenu-abc"));
    }
}
