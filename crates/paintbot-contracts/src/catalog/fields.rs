use serde_json::{Map, Value};

/// Rank given to records without a usable rank so they sort after every ranked row.
pub const RANK_LAST: i64 = i64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Title,
    RichText,
    Url,
    Number,
}

impl FieldKind {
    fn property_key(self) -> &'static str {
        match self {
            FieldKind::Title => "title",
            FieldKind::RichText => "rich_text",
            FieldKind::Url => "url",
            FieldKind::Number => "number",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Url(Option<String>),
    Number(Option<f64>),
}

impl FieldValue {
    pub fn into_text(self) -> Option<String> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_url(self) -> Option<String> {
        match self {
            FieldValue::Url(url) => url,
            _ => None,
        }
    }

    pub fn into_number(self) -> Option<f64> {
        match self {
            FieldValue::Number(number) => number,
            _ => None,
        }
    }
}

/// One row of the catalog database, as returned by the query endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogRecord {
    pub id: Option<String>,
    properties: Map<String, Value>,
}

impl CatalogRecord {
    /// Builds a record from a raw page object. Anything without a
    /// `properties` object becomes an empty record, which renders with defaults.
    pub fn from_page(page: &Value) -> Self {
        Self {
            id: page.get("id").and_then(Value::as_str).map(str::to_string),
            properties: page
                .get("properties")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        }
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Reads `name` as `kind`; absent, empty or mistyped fields yield `default`.
    pub fn extract(&self, name: &str, kind: FieldKind, default: FieldValue) -> FieldValue {
        let Some(raw) = self
            .properties
            .get(name)
            .and_then(Value::as_object)
            .and_then(|property| property.get(kind.property_key()))
        else {
            return default;
        };

        let extracted = match kind {
            FieldKind::Title | FieldKind::RichText => {
                join_plain_text(raw).map(FieldValue::Text)
            }
            FieldKind::Url => raw
                .as_str()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(|value| FieldValue::Url(Some(value.to_string()))),
            FieldKind::Number => raw
                .as_f64()
                .filter(|value| value.is_finite())
                .map(|value| FieldValue::Number(Some(value))),
        };
        extracted.unwrap_or(default)
    }

    pub fn text(&self, name: &str, kind: FieldKind, default: &str) -> String {
        self.extract(name, kind, FieldValue::Text(default.to_string()))
            .into_text()
            .unwrap_or_else(|| default.to_string())
    }

    pub fn url(&self, name: &str) -> Option<String> {
        self.extract(name, FieldKind::Url, FieldValue::Url(None))
            .into_url()
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.extract(name, FieldKind::Number, FieldValue::Number(None))
            .into_number()
    }

    pub fn rank(&self, name: &str) -> i64 {
        // `as` saturates, so huge ranks land on RANK_LAST rather than wrapping.
        self.number(name)
            .map(|value| value.round() as i64)
            .unwrap_or(RANK_LAST)
    }
}

fn join_plain_text(runs: &Value) -> Option<String> {
    let runs = runs.as_array()?;
    let joined = runs
        .iter()
        .filter_map(|run| run.get("plain_text").and_then(Value::as_str))
        .collect::<String>();
    if joined.trim().is_empty() {
        return None;
    }
    Some(joined)
}
