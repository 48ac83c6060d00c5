use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::LineConfig;
use crate::error::ApiError;
use crate::response_json_or_error;

const SERVICE: &str = "LINE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichMenuSummary {
    pub rich_menu_id: String,
    pub name: Option<String>,
}

/// Request-time operations: replying to an event and switching a user's menu.
pub trait MessagingApi: Send + Sync {
    fn reply(&self, reply_token: &str, messages: &[Value]) -> Result<(), ApiError>;
    fn link_menu_to_user(&self, user_id: &str, resource_id: &str) -> Result<(), ApiError>;
}

/// Deployment-time operations on rich menu resources and their aliases.
pub trait RichMenuApi: Send + Sync {
    fn list_menus(&self) -> Result<Vec<RichMenuSummary>, ApiError>;
    fn delete_menu(&self, resource_id: &str) -> Result<(), ApiError>;
    fn create_menu(&self, layout: &Value) -> Result<String, ApiError>;
    fn upload_image(
        &self,
        resource_id: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ApiError>;
    fn create_alias(&self, alias: &str, resource_id: &str) -> Result<(), ApiError>;
    fn update_alias(&self, alias: &str, resource_id: &str) -> Result<(), ApiError>;
    /// Resource currently bound to `alias`, `None` when the alias does not exist.
    fn get_alias(&self, alias: &str) -> Result<Option<String>, ApiError>;
    fn set_default(&self, resource_id: &str) -> Result<(), ApiError>;
}

pub struct LineClient {
    api_base: String,
    data_api_base: String,
    access_token: String,
    http: HttpClient,
}

impl LineClient {
    pub fn new(config: &LineConfig) -> Self {
        Self {
            api_base: config.api_base.clone(),
            data_api_base: config.data_api_base.clone(),
            access_token: config.access_token.clone(),
            http: HttpClient::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Value, ApiError> {
        debug!(endpoint, "LINE request");
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .map_err(|source| ApiError::Transport {
                service: SERVICE,
                endpoint: endpoint.to_string(),
                source,
            })?;
        response_json_or_error(SERVICE, response)
    }

    fn post_json(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let endpoint = self.endpoint(path);
        self.send(&endpoint, self.http.post(&endpoint).json(body))
    }

    fn post_empty(&self, path: &str) -> Result<Value, ApiError> {
        let endpoint = self.endpoint(path);
        self.send(&endpoint, self.http.post(&endpoint))
    }
}

impl MessagingApi for LineClient {
    fn reply(&self, reply_token: &str, messages: &[Value]) -> Result<(), ApiError> {
        self.post_json(
            "message/reply",
            &json!({
                "replyToken": reply_token,
                "messages": messages,
            }),
        )?;
        Ok(())
    }

    fn link_menu_to_user(&self, user_id: &str, resource_id: &str) -> Result<(), ApiError> {
        self.post_empty(&format!("user/{user_id}/richmenu/{resource_id}"))?;
        Ok(())
    }
}

impl RichMenuApi for LineClient {
    fn list_menus(&self) -> Result<Vec<RichMenuSummary>, ApiError> {
        let endpoint = self.endpoint("richmenu/list");
        let payload = self.send(&endpoint, self.http.get(&endpoint))?;
        let menus = payload
            .get("richmenus")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| {
                        let rich_menu_id = row.get("richMenuId").and_then(Value::as_str)?;
                        Some(RichMenuSummary {
                            rich_menu_id: rich_menu_id.to_string(),
                            name: row.get("name").and_then(Value::as_str).map(str::to_string),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(menus)
    }

    fn delete_menu(&self, resource_id: &str) -> Result<(), ApiError> {
        let endpoint = self.endpoint(&format!("richmenu/{resource_id}"));
        self.send(&endpoint, self.http.delete(&endpoint))?;
        Ok(())
    }

    fn create_menu(&self, layout: &Value) -> Result<String, ApiError> {
        let payload = self.post_json("richmenu", layout)?;
        payload
            .get("richMenuId")
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or(ApiError::MissingField {
                service: SERVICE,
                field: "richMenuId",
            })
    }

    fn upload_image(
        &self,
        resource_id: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ApiError> {
        let endpoint = format!("{}/richmenu/{resource_id}/content", self.data_api_base);
        let request = self
            .http
            .post(&endpoint)
            .header(CONTENT_TYPE, content_type)
            .body(bytes);
        self.send(&endpoint, request)?;
        Ok(())
    }

    fn create_alias(&self, alias: &str, resource_id: &str) -> Result<(), ApiError> {
        self.post_json(
            "richmenu/alias",
            &json!({
                "richMenuAliasId": alias,
                "richMenuId": resource_id,
            }),
        )?;
        Ok(())
    }

    fn update_alias(&self, alias: &str, resource_id: &str) -> Result<(), ApiError> {
        self.post_json(
            &format!("richmenu/alias/{alias}"),
            &json!({ "richMenuId": resource_id }),
        )?;
        Ok(())
    }

    fn get_alias(&self, alias: &str) -> Result<Option<String>, ApiError> {
        let endpoint = self.endpoint(&format!("richmenu/alias/{alias}"));
        match self.send(&endpoint, self.http.get(&endpoint)) {
            Ok(payload) => Ok(payload
                .get("richMenuId")
                .and_then(Value::as_str)
                .map(str::to_string)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn set_default(&self, resource_id: &str) -> Result<(), ApiError> {
        self.post_empty(&format!("user/all/richmenu/{resource_id}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::{LineClient, MessagingApi, RichMenuApi};
    use crate::config::LineConfig;

    fn client(server: &MockServer) -> LineClient {
        LineClient::new(&LineConfig {
            access_token: "token-abc".to_string(),
            api_base: server.url("/v2/bot"),
            data_api_base: server.url("/data/v2/bot"),
        })
    }

    #[test]
    fn reply_posts_token_and_messages() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v2/bot/message/reply")
                .header("authorization", "Bearer token-abc")
                .json_body(json!({
                    "replyToken": "reply-1",
                    "messages": [{"type": "text", "text": "hi"}]
                }));
            then.status(200).json_body(json!({}));
        });

        let result = client(&server).reply("reply-1", &[json!({"type": "text", "text": "hi"})]);
        assert!(result.is_ok());
        mock.assert();
    }

    #[test]
    fn create_menu_returns_resource_id() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v2/bot/richmenu")
                .json_body(json!({"name": "menu", "size": {"width": 2500, "height": 1686}}));
            then.status(200).json_body(json!({"richMenuId": "richmenu-123"}));
        });

        let id = client(&server)
            .create_menu(&json!({"name": "menu", "size": {"width": 2500, "height": 1686}}))
            .ok();
        assert_eq!(id.as_deref(), Some("richmenu-123"));
    }

    #[test]
    fn create_menu_surfaces_rejection_with_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v2/bot/richmenu");
            then.status(400)
                .json_body(json!({"message": "must be specified", "details": []}));
        });

        let err = client(&server)
            .create_menu(&json!({}))
            .err()
            .map(|err| err.to_string())
            .unwrap_or_default();
        assert!(err.starts_with("LINE request failed (400)"), "{err}");
        assert!(err.contains("must be specified"), "{err}");
    }

    #[test]
    fn image_upload_goes_to_data_host_with_content_type() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/data/v2/bot/richmenu/richmenu-1/content")
                .header("content-type", "image/png")
                .body("PNGDATA");
            then.status(200).body("{}");
        });

        let result = client(&server).upload_image("richmenu-1", b"PNGDATA".to_vec(), "image/png");
        assert!(result.is_ok());
        mock.assert();
    }

    #[test]
    fn list_menus_reads_ids_and_names() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v2/bot/richmenu/list");
            then.status(200).json_body(json!({
                "richmenus": [
                    {"richMenuId": "richmenu-a", "name": "first"},
                    {"richMenuId": "richmenu-b"},
                    {"name": "no id"}
                ]
            }));
        });

        let menus = client(&server).list_menus().unwrap_or_default();
        assert_eq!(menus.len(), 2);
        assert_eq!(menus[0].rich_menu_id, "richmenu-a");
        assert_eq!(menus[0].name.as_deref(), Some("first"));
        assert_eq!(menus[1].name, None);
    }

    #[test]
    fn alias_conflict_is_detectable_and_update_hits_alias_path() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v2/bot/richmenu/alias");
            then.status(400)
                .json_body(json!({"message": "conflict richmenu alias id"}));
        });
        let update = server.mock(|when, then| {
            when.method(POST)
                .path("/v2/bot/richmenu/alias/richmenu-1")
                .json_body(json!({"richMenuId": "richmenu-a"}));
            then.status(200).json_body(json!({}));
        });

        let line = client(&server);
        let conflict = line.create_alias("richmenu-1", "richmenu-a").err();
        assert!(conflict.map(|err| err.is_conflict()).unwrap_or(false));
        assert!(line.update_alias("richmenu-1", "richmenu-a").is_ok());
        update.assert();
    }

    #[test]
    fn get_alias_maps_missing_alias_to_none() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v2/bot/richmenu/alias/richmenu-1");
            then.status(200)
                .json_body(json!({"richMenuAliasId": "richmenu-1", "richMenuId": "richmenu-a"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/v2/bot/richmenu/alias/richmenu-9");
            then.status(404).json_body(json!({"message": "Not found"}));
        });

        let line = client(&server);
        assert_eq!(
            line.get_alias("richmenu-1").ok().flatten().as_deref(),
            Some("richmenu-a")
        );
        assert_eq!(line.get_alias("richmenu-9").ok(), Some(None));
    }

    #[test]
    fn user_binding_and_default_use_empty_posts() {
        let server = MockServer::start();
        let link = server.mock(|when, then| {
            when.method(POST).path("/v2/bot/user/U123/richmenu/richmenu-a");
            then.status(200).json_body(json!({}));
        });
        let default = server.mock(|when, then| {
            when.method(POST).path("/v2/bot/user/all/richmenu/richmenu-a");
            then.status(200).body("");
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/v2/bot/richmenu/richmenu-z");
            then.status(200).json_body(json!({}));
        });

        let line = client(&server);
        assert!(line.link_menu_to_user("U123", "richmenu-a").is_ok());
        assert!(line.set_default("richmenu-a").is_ok());
        assert!(line.delete_menu("richmenu-z").is_ok());
        link.assert();
        default.assert();
        delete.assert();
    }
}
