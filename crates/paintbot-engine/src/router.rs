use std::sync::Arc;

use paintbot_contracts::chat::{parse_postback, PostbackCommand};
use paintbot_contracts::events::PostbackEvent;
use paintbot_contracts::menus::MenuRegistry;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAction {
    LinkMenu {
        user_id: String,
        menu: String,
        resource_id: String,
    },
    NoOp {
        reason: String,
    },
}

/// Turns postback signals into menu switches using the deployed registry.
/// Misses are logged and become `NoOp`; routing never fails.
#[derive(Debug, Clone)]
pub struct PostbackRouter {
    registry: Arc<MenuRegistry>,
}

impl PostbackRouter {
    pub fn new(registry: Arc<MenuRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<MenuRegistry> {
        &self.registry
    }

    pub fn route(&self, event: &PostbackEvent) -> RouteAction {
        match parse_postback(&event.data) {
            PostbackCommand::Goto(menu) => self.route_menu(&event.user_id, &menu),
            PostbackCommand::Unrecognized(data) => {
                warn!(user_id = %event.user_id, data = %data, "unrecognized postback");
                RouteAction::NoOp {
                    reason: format!("unrecognized postback '{data}'"),
                }
            }
        }
    }

    pub fn route_menu(&self, user_id: &str, menu: &str) -> RouteAction {
        match self.registry.resolve(menu) {
            Some(resource_id) => {
                debug!(user_id, menu, resource_id = %resource_id, "routing menu switch");
                RouteAction::LinkMenu {
                    user_id: user_id.to_string(),
                    menu: menu.to_string(),
                    resource_id,
                }
            }
            None => {
                warn!(user_id, menu, "menu is not deployed; ignoring switch");
                RouteAction::NoOp {
                    reason: format!("menu '{menu}' is not deployed"),
                }
            }
        }
    }
}
