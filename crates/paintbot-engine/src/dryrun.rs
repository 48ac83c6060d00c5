use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::info;

use crate::error::ApiError;
use crate::platform::{MessagingApi, RichMenuApi, RichMenuSummary};
use crate::short_id;

const SERVICE: &str = "dryrun";

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedReply {
    pub reply_token: String,
    pub messages: Vec<Value>,
}

#[derive(Debug, Default)]
struct DryrunState {
    next_id: u64,
    menus: IndexMap<String, Option<String>>,
    images: IndexMap<String, String>,
    aliases: IndexMap<String, String>,
    default_menu: Option<String>,
    replies: Vec<RecordedReply>,
    links: Vec<(String, String)>,
}

/// In-memory platform used by `chat` and by tests. It enforces the same
/// rules the real platform does for the operations the bot relies on:
/// unknown resources are 404s and a duplicate alias is a conflict.
#[derive(Debug, Default)]
pub struct DryrunPlatform {
    state: Mutex<DryrunState>,
}

impl DryrunPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, DryrunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn take_replies(&self) -> Vec<RecordedReply> {
        std::mem::take(&mut self.state().replies)
    }

    pub fn links(&self) -> Vec<(String, String)> {
        self.state().links.clone()
    }

    pub fn menu_ids(&self) -> Vec<String> {
        self.state().menus.keys().cloned().collect()
    }

    pub fn alias_target(&self, alias: &str) -> Option<String> {
        self.state().aliases.get(alias).cloned()
    }

    pub fn default_menu(&self) -> Option<String> {
        self.state().default_menu.clone()
    }

    pub fn has_image(&self, resource_id: &str) -> bool {
        self.state().images.contains_key(resource_id)
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::Status {
        service: SERVICE,
        status: 404,
        body: format!("{what} not found"),
    }
}

fn require_menu(state: &DryrunState, resource_id: &str) -> Result<(), ApiError> {
    if state.menus.contains_key(resource_id) {
        Ok(())
    } else {
        Err(not_found(&format!("rich menu {resource_id}")))
    }
}

impl MessagingApi for DryrunPlatform {
    fn reply(&self, reply_token: &str, messages: &[Value]) -> Result<(), ApiError> {
        info!(reply_token, messages = messages.len(), "dryrun reply");
        self.state().replies.push(RecordedReply {
            reply_token: reply_token.to_string(),
            messages: messages.to_vec(),
        });
        Ok(())
    }

    fn link_menu_to_user(&self, user_id: &str, resource_id: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        require_menu(&state, resource_id)?;
        info!(user_id, resource_id, "dryrun link menu");
        state
            .links
            .push((user_id.to_string(), resource_id.to_string()));
        Ok(())
    }
}

impl RichMenuApi for DryrunPlatform {
    fn list_menus(&self) -> Result<Vec<RichMenuSummary>, ApiError> {
        Ok(self
            .state()
            .menus
            .iter()
            .map(|(id, name)| RichMenuSummary {
                rich_menu_id: id.clone(),
                name: name.clone(),
            })
            .collect())
    }

    fn delete_menu(&self, resource_id: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        require_menu(&state, resource_id)?;
        state.menus.shift_remove(resource_id);
        state.images.shift_remove(resource_id);
        state.aliases.retain(|_, target| *target != resource_id);
        if state.default_menu.as_deref() == Some(resource_id) {
            state.default_menu = None;
        }
        Ok(())
    }

    fn create_menu(&self, layout: &Value) -> Result<String, ApiError> {
        let name = layout.get("name").and_then(Value::as_str).map(str::to_string);
        let mut state = self.state();
        let idx = state.next_id;
        state.next_id += 1;
        let id = format!(
            "richmenu-{}",
            short_id(name.as_deref().unwrap_or("richmenu"), idx)
        );
        state.menus.insert(id.clone(), name);
        Ok(id)
    }

    fn upload_image(
        &self,
        resource_id: &str,
        _bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ApiError> {
        let mut state = self.state();
        require_menu(&state, resource_id)?;
        if state.images.contains_key(resource_id) {
            return Err(ApiError::Status {
                service: SERVICE,
                status: 400,
                body: "An image has already been uploaded to the richmenu".to_string(),
            });
        }
        state
            .images
            .insert(resource_id.to_string(), content_type.to_string());
        Ok(())
    }

    fn create_alias(&self, alias: &str, resource_id: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        require_menu(&state, resource_id)?;
        if state.aliases.contains_key(alias) {
            return Err(ApiError::Status {
                service: SERVICE,
                status: 400,
                body: "conflict richmenu alias id".to_string(),
            });
        }
        state
            .aliases
            .insert(alias.to_string(), resource_id.to_string());
        Ok(())
    }

    fn update_alias(&self, alias: &str, resource_id: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        require_menu(&state, resource_id)?;
        match state.aliases.get_mut(alias) {
            Some(target) => {
                *target = resource_id.to_string();
                Ok(())
            }
            None => Err(not_found(&format!("rich menu alias {alias}"))),
        }
    }

    fn get_alias(&self, alias: &str) -> Result<Option<String>, ApiError> {
        Ok(self.state().aliases.get(alias).cloned())
    }

    fn set_default(&self, resource_id: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        require_menu(&state, resource_id)?;
        state.default_menu = Some(resource_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::DryrunPlatform;
    use crate::platform::{MessagingApi, RichMenuApi};

    #[test]
    fn duplicate_alias_conflicts_like_the_platform() -> anyhow::Result<()> {
        let platform = DryrunPlatform::new();
        let first = platform.create_menu(&json!({"name": "one"}))?;
        let second = platform.create_menu(&json!({"name": "two"}))?;
        assert_ne!(first, second);
        assert!(first.starts_with("richmenu-"));

        platform.create_alias("richmenu-1", &first)?;
        let err = platform.create_alias("richmenu-1", &second).err();
        assert!(err.map(|err| err.is_conflict()).unwrap_or(false));

        platform.update_alias("richmenu-1", &second)?;
        assert_eq!(platform.alias_target("richmenu-1"), Some(second));
        Ok(())
    }

    #[test]
    fn unknown_resources_are_not_found() {
        let platform = DryrunPlatform::new();
        let err = platform.link_menu_to_user("U1", "richmenu-missing").err();
        assert!(err.map(|err| err.is_not_found()).unwrap_or(false));
        assert!(platform.set_default("richmenu-missing").is_err());
    }

    #[test]
    fn delete_drops_aliases_and_default() -> anyhow::Result<()> {
        let platform = DryrunPlatform::new();
        let id = platform.create_menu(&json!({"name": "one"}))?;
        platform.upload_image(&id, vec![1, 2, 3], "image/png")?;
        assert!(platform.upload_image(&id, vec![1], "image/png").is_err());
        platform.create_alias("richmenu-1", &id)?;
        platform.set_default(&id)?;

        platform.delete_menu(&id)?;
        assert!(platform.menu_ids().is_empty());
        assert_eq!(platform.alias_target("richmenu-1"), None);
        assert_eq!(platform.default_menu(), None);
        assert!(!platform.has_image(&id));
        Ok(())
    }

    #[test]
    fn replies_are_recorded_and_drained() -> anyhow::Result<()> {
        let platform = DryrunPlatform::new();
        platform.reply("token-1", &[json!({"type": "text", "text": "hi"})])?;
        let replies = platform.take_replies();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].reply_token, "token-1");
        assert!(platform.take_replies().is_empty());
        Ok(())
    }
}
