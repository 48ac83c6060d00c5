use serde_json::{json, Value};

use super::color::{is_light, normalize_hex, text_color};
use super::fields::{CatalogRecord, FieldKind};

pub const DEFAULT_TITLE: &str = "未命名";
pub const DEFAULT_NAME: &str = "unnamed";
pub const DEFAULT_LOCATION: &str = "-";
pub const DEFAULT_BRAND: &str = "品牌未定";
pub const DEFAULT_COLOR_LABEL: &str = "色號未定";
pub const DEFAULT_HEX_COLOR: &str = "#CCCCCC";

/// Postback payload sent by cards whose record has no external link.
pub const DETAIL_POSTBACK_DATA: &str = "action=detail";

const LOCATION_FIELDS: [&str; 3] = ["Site1", "Site2", "Site3"];
const LOCATION_LABELS: [&str; 3] = ["位置1", "位置2", "位置3"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCard {
    pub title: String,
    pub subtitle: String,
    pub locations: [String; 3],
    pub brand: String,
    pub color_label: String,
    pub hex_color: String,
    pub link: Option<String>,
    pub text_color: String,
}

impl NormalizedCard {
    pub fn from_record(record: &CatalogRecord) -> Self {
        let raw_color = record.text("ColorCode", FieldKind::RichText, DEFAULT_HEX_COLOR);
        let hex_color = normalize_hex(&raw_color).unwrap_or_else(|| DEFAULT_HEX_COLOR.to_string());
        Self {
            title: record.text("Title", FieldKind::Title, DEFAULT_TITLE),
            subtitle: record.text("Name", FieldKind::RichText, DEFAULT_NAME),
            locations: LOCATION_FIELDS
                .map(|field| record.text(field, FieldKind::RichText, DEFAULT_LOCATION)),
            brand: record.text("Brand", FieldKind::RichText, DEFAULT_BRAND),
            color_label: record.text("ColorNumber", FieldKind::RichText, DEFAULT_COLOR_LABEL),
            text_color: text_color(&hex_color).to_string(),
            link: record.url("uri"),
            hex_color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FooterAction {
    Link {
        label: String,
        uri: String,
    },
    Postback {
        label: String,
        data: String,
        display_text: String,
    },
}

impl FooterAction {
    pub fn to_json(&self) -> Value {
        match self {
            FooterAction::Link { label, uri } => json!({
                "type": "uri",
                "label": label,
                "uri": uri,
            }),
            FooterAction::Postback {
                label,
                data,
                display_text,
            } => json!({
                "type": "postback",
                "label": label,
                "data": data,
                "displayText": display_text,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDescriptor {
    pub title: String,
    pub subtitle: String,
    pub header_background: String,
    pub header_text_color: String,
    pub rows: Vec<(String, String)>,
    pub brand: String,
    pub button_color: String,
    pub button_style: &'static str,
    pub footer_action: FooterAction,
}

impl CardDescriptor {
    /// Flex "bubble" container for this card.
    pub fn to_bubble(&self) -> Value {
        let rows = self
            .rows
            .iter()
            .map(|(label, value)| {
                json!({
                    "type": "box",
                    "layout": "baseline",
                    "contents": [
                        {
                            "type": "text",
                            "text": label,
                            "color": "#8C8C8C",
                            "size": "sm",
                            "wrap": true,
                            "flex": 1
                        },
                        {
                            "type": "text",
                            "text": value,
                            "flex": 2,
                            "size": "sm",
                            "color": "#666666"
                        }
                    ]
                })
            })
            .collect::<Vec<Value>>();

        json!({
            "type": "bubble",
            "size": "deca",
            "header": {
                "type": "box",
                "layout": "vertical",
                "contents": [
                    {
                        "type": "text",
                        "text": self.title,
                        "color": self.header_text_color,
                        "align": "start",
                        "size": "xxl",
                        "gravity": "center",
                        "weight": "bold"
                    },
                    {
                        "type": "text",
                        "text": self.subtitle,
                        "color": self.header_text_color,
                        "align": "start",
                        "size": "lg",
                        "gravity": "center",
                        "margin": "lg"
                    }
                ],
                "paddingTop": "19px",
                "paddingAll": "12px",
                "paddingBottom": "16px",
                "height": "150px"
            },
            "body": {
                "type": "box",
                "layout": "vertical",
                "spacing": "md",
                "paddingAll": "12px",
                "contents": rows
            },
            "footer": {
                "type": "box",
                "layout": "vertical",
                "contents": [
                    {
                        "type": "text",
                        "text": self.brand,
                        "align": "center",
                        "weight": "bold"
                    },
                    {
                        "type": "button",
                        "action": self.footer_action.to_json(),
                        "style": self.button_style,
                        "color": self.button_color
                    }
                ]
            },
            "styles": {
                "header": {
                    "backgroundColor": self.header_background
                },
                "footer": {
                    "separator": false
                }
            }
        })
    }
}

pub fn build_card(card: &NormalizedCard) -> CardDescriptor {
    let footer_action = match card.link.as_deref().map(str::trim) {
        Some(uri) if !uri.is_empty() => FooterAction::Link {
            label: card.color_label.clone(),
            uri: uri.to_string(),
        },
        _ => FooterAction::Postback {
            label: card.color_label.clone(),
            data: DETAIL_POSTBACK_DATA.to_string(),
            display_text: card.color_label.clone(),
        },
    };
    let button_style = if is_light(&card.hex_color) {
        "secondary"
    } else {
        "primary"
    };

    CardDescriptor {
        title: card.title.clone(),
        subtitle: card.subtitle.clone(),
        header_background: card.hex_color.clone(),
        header_text_color: card.text_color.clone(),
        rows: LOCATION_LABELS
            .iter()
            .zip(card.locations.iter())
            .map(|(label, value)| ((*label).to_string(), value.clone()))
            .collect(),
        brand: card.brand.clone(),
        button_color: card.hex_color.clone(),
        button_style,
        footer_action,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{build_card, FooterAction, NormalizedCard, DETAIL_POSTBACK_DATA};
    use crate::catalog::fields::CatalogRecord;

    fn paint_row(color_code: &str, uri: Option<&str>) -> CatalogRecord {
        CatalogRecord::from_page(&json!({
            "id": "row",
            "properties": {
                "Title": {"title": [{"plain_text": "外牆"}]},
                "Name": {"rich_text": [{"plain_text": "Ocean"}]},
                "Site1": {"rich_text": [{"plain_text": "A棟"}]},
                "Brand": {"rich_text": [{"plain_text": "Nippon"}]},
                "ColorNumber": {"rich_text": [{"plain_text": "NP BGG 1234"}]},
                "ColorCode": {"rich_text": [{"plain_text": color_code}]},
                "uri": {"url": uri}
            }
        }))
    }

    #[test]
    fn normalization_applies_defaults_per_field() {
        let card = NormalizedCard::from_record(&CatalogRecord::default());
        assert_eq!(card.title, "未命名");
        assert_eq!(card.subtitle, "unnamed");
        assert_eq!(card.locations, ["-", "-", "-"].map(str::to_string));
        assert_eq!(card.brand, "品牌未定");
        assert_eq!(card.color_label, "色號未定");
        assert_eq!(card.hex_color, "#CCCCCC");
        assert_eq!(card.text_color, "#000000");
        assert_eq!(card.link, None);
    }

    #[test]
    fn link_record_gets_uri_footer_with_exact_url() {
        let card = NormalizedCard::from_record(&paint_row("#123456", Some("https://paint.example/np")));
        let descriptor = build_card(&card);
        assert_eq!(
            descriptor.footer_action,
            FooterAction::Link {
                label: "NP BGG 1234".to_string(),
                uri: "https://paint.example/np".to_string(),
            }
        );
        let bubble = descriptor.to_bubble();
        assert_eq!(bubble["footer"]["contents"][1]["action"]["type"], json!("uri"));
        assert_eq!(
            bubble["footer"]["contents"][1]["action"]["uri"],
            json!("https://paint.example/np")
        );
    }

    #[test]
    fn record_without_link_gets_postback_footer() {
        let card = NormalizedCard::from_record(&paint_row("#123456", Some("")));
        let descriptor = build_card(&card);
        let FooterAction::Postback { data, .. } = &descriptor.footer_action else {
            panic!("expected postback footer, got {:?}", descriptor.footer_action);
        };
        assert_eq!(data, DETAIL_POSTBACK_DATA);

        let bubble = descriptor.to_bubble();
        let action = &bubble["footer"]["contents"][1]["action"];
        assert_eq!(action["type"], json!("postback"));
        assert!(action.get("uri").is_none());
    }

    #[test]
    fn header_colors_follow_classifier() {
        let dark = build_card(&NormalizedCard::from_record(&paint_row("#1a2b3c", None)));
        assert_eq!(dark.header_background, "#1A2B3C");
        assert_eq!(dark.header_text_color, "#ffffff");
        assert_eq!(dark.button_style, "primary");

        let light = build_card(&NormalizedCard::from_record(&paint_row("fafafa", None)));
        assert_eq!(light.header_text_color, "#000000");
        assert_eq!(light.button_style, "secondary");

        let bubble = light.to_bubble();
        assert_eq!(bubble["styles"]["header"]["backgroundColor"], json!("#FAFAFA"));
        assert_eq!(bubble["header"]["contents"][0]["color"], json!("#000000"));
        assert_eq!(bubble["header"]["contents"][0]["text"], json!("外牆"));
        assert_eq!(bubble["body"]["contents"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn malformed_hex_falls_back_to_default_color() {
        let card = NormalizedCard::from_record(&paint_row("teal", None));
        assert_eq!(card.hex_color, "#CCCCCC");
    }
}
