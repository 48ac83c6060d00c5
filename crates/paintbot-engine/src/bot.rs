use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use paintbot_contracts::catalog::{build_carousel, Carousel, OverflowPolicy};
use paintbot_contracts::chat::{parse_text_command, TextCommand, FEATURE_INDEX_TEXT};
use paintbot_contracts::events::{text_message, InboundEvent, PostbackEvent, TextEvent};
use paintbot_contracts::menus::MenuRegistry;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::catalog::CatalogSource;
use crate::config::BotSettings;
use crate::error::ApiError;
use crate::platform::MessagingApi;
use crate::router::{PostbackRouter, RouteAction};

pub const CATALOG_ALT_TEXT: &str = "油漆色號清單";
const CATALOG_UNAVAILABLE_TEXT: &str = "抱歉，目前無法取得油漆色號資料，請稍後再試。";
const CATALOG_EMPTY_TEXT: &str = "目前沒有可顯示的油漆色號資料。";
const BRAND_IDENTITY_FALLBACK_TEXT: &str = "企業識別資料尚未提供，請稍後再試。";

#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Replied { messages: Vec<Value> },
    MenuLinked { menu: String, resource_id: String },
    Ignored { reason: String },
    Failed { reason: String },
}

/// Dispatches inbound events. Every outcome, including platform failures,
/// is reported through `EventOutcome`.
pub struct Bot {
    catalog: Arc<dyn CatalogSource>,
    messaging: Arc<dyn MessagingApi>,
    router: PostbackRouter,
    settings: BotSettings,
}

impl Bot {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        messaging: Arc<dyn MessagingApi>,
        registry: Arc<MenuRegistry>,
        settings: BotSettings,
    ) -> Self {
        Self {
            catalog,
            messaging,
            router: PostbackRouter::new(registry),
            settings,
        }
    }

    pub fn handle(&self, event: &InboundEvent) -> EventOutcome {
        debug!(kind = event.kind(), "handling event");
        match event {
            InboundEvent::Text(text) => self.handle_text(text),
            InboundEvent::Postback(postback) => self.handle_postback(postback),
        }
    }

    fn handle_text(&self, event: &TextEvent) -> EventOutcome {
        match parse_text_command(&event.text) {
            TextCommand::PaintCatalog => {
                let messages = self.catalog_messages();
                self.reply(&event.reply_token, messages)
            }
            TextCommand::BrandIdentity => {
                let messages = self.brand_identity_messages();
                self.reply(&event.reply_token, messages)
            }
            TextCommand::FeatureIndex => {
                self.reply(&event.reply_token, vec![text_message(FEATURE_INDEX_TEXT)])
            }
            TextCommand::SwitchMenu(menu) => match event.user_id.as_deref() {
                Some(user_id) => self.execute(self.router.route_menu(user_id, &menu)),
                None => EventOutcome::Ignored {
                    reason: format!("menu switch to '{menu}' without a user id"),
                },
            },
            TextCommand::Unrecognized => EventOutcome::Ignored {
                reason: "unrecognized text".to_string(),
            },
        }
    }

    fn handle_postback(&self, event: &PostbackEvent) -> EventOutcome {
        self.execute(self.router.route(event))
    }

    fn execute(&self, action: RouteAction) -> EventOutcome {
        match action {
            RouteAction::LinkMenu {
                user_id,
                menu,
                resource_id,
            } => match self.messaging.link_menu_to_user(&user_id, &resource_id) {
                Ok(()) => {
                    info!(user_id = %user_id, menu = %menu, "switched user menu");
                    EventOutcome::MenuLinked { menu, resource_id }
                }
                Err(err) => {
                    error!(user_id = %user_id, menu = %menu, error = %err, "menu switch failed");
                    EventOutcome::Failed {
                        reason: err.to_string(),
                    }
                }
            },
            RouteAction::NoOp { reason } => EventOutcome::Ignored { reason },
        }
    }

    fn reply(&self, reply_token: &str, messages: Vec<Value>) -> EventOutcome {
        match self.messaging.reply(reply_token, &messages) {
            Ok(()) => EventOutcome::Replied { messages },
            Err(err) => {
                error!(error = %err, "reply failed");
                EventOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    pub fn render_catalog(&self) -> Result<Carousel> {
        let records = self.catalog.fetch_records()?;
        let carousel = build_carousel(&records, self.settings.max_cards);
        debug!(
            records = records.len(),
            cards = carousel.len(),
            omitted = carousel.omitted,
            "assembled catalog carousel"
        );
        Ok(carousel)
    }

    /// Reply for the catalog command. Fetch failures and an empty catalog
    /// become fixed text replies.
    pub fn catalog_messages(&self) -> Vec<Value> {
        let carousel = match self.render_catalog() {
            Ok(carousel) => carousel,
            Err(err) => {
                let timeout = err.chain().any(|cause| {
                    cause
                        .downcast_ref::<ApiError>()
                        .map(ApiError::is_timeout)
                        .unwrap_or(false)
                });
                warn!(error = %format!("{err:#}"), timeout, "catalog unavailable");
                return vec![text_message(CATALOG_UNAVAILABLE_TEXT)];
            }
        };
        if carousel.is_empty() {
            return vec![text_message(CATALOG_EMPTY_TEXT)];
        }

        let mut messages = vec![carousel.to_flex_message(CATALOG_ALT_TEXT)];
        if self.settings.overflow == OverflowPolicy::Notice && carousel.omitted > 0 {
            messages.push(text_message(&format!(
                "另有 {} 筆色號未顯示。",
                carousel.omitted
            )));
        }
        messages
    }

    fn brand_identity_messages(&self) -> Vec<Value> {
        let Some(path) = self.settings.brand_identity_template.as_deref() else {
            return vec![text_message(BRAND_IDENTITY_FALLBACK_TEXT)];
        };
        let loaded = fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))
            .and_then(|raw| {
                serde_json::from_str::<Value>(&raw)
                    .with_context(|| format!("{} is not valid JSON", path.display()))
            });
        match loaded {
            Ok(Value::Object(message)) => vec![Value::Object(message)],
            Ok(Value::Array(messages)) if !messages.is_empty() => messages,
            Ok(_) => {
                warn!(path = %path.display(), "brand identity template is not a message");
                vec![text_message(BRAND_IDENTITY_FALLBACK_TEXT)]
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "brand identity template unavailable");
                vec![text_message(BRAND_IDENTITY_FALLBACK_TEXT)]
            }
        }
    }
}
