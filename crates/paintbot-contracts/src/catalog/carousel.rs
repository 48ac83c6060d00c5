use serde_json::{json, Value};

use super::card::{build_card, CardDescriptor, NormalizedCard};
use super::fields::CatalogRecord;

pub const RANK_FIELD: &str = "Rank";
pub const DEFAULT_MAX_CARDS: usize = 10;
/// Hard limit on bubbles per carousel imposed by the messaging platform.
pub const PLATFORM_MAX_CARDS: usize = 12;

/// What happens to records beyond the card limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    #[default]
    Drop,
    Notice,
}

impl OverflowPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "drop" | "silent" => Some(Self::Drop),
            "notice" | "warn" => Some(Self::Notice),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Carousel {
    pub cards: Vec<CardDescriptor>,
    pub omitted: usize,
}

impl Carousel {
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn to_contents(&self) -> Value {
        json!({
            "type": "carousel",
            "contents": self.cards.iter().map(CardDescriptor::to_bubble).collect::<Vec<Value>>(),
        })
    }

    pub fn to_flex_message(&self, alt_text: &str) -> Value {
        json!({
            "type": "flex",
            "altText": alt_text,
            "contents": self.to_contents(),
        })
    }
}

pub fn clamp_max_cards(requested: usize) -> usize {
    requested.clamp(1, PLATFORM_MAX_CARDS)
}

pub fn build_carousel(records: &[CatalogRecord], max_cards: usize) -> Carousel {
    let mut ranked = records
        .iter()
        .map(|record| (record.rank(RANK_FIELD), record))
        .collect::<Vec<(i64, &CatalogRecord)>>();
    // sort_by_key is stable: equal ranks keep fetch order
    ranked.sort_by_key(|(rank, _)| *rank);

    let cards = ranked
        .iter()
        .take(max_cards)
        .map(|(_, record)| build_card(&NormalizedCard::from_record(record)))
        .collect::<Vec<CardDescriptor>>();
    Carousel {
        omitted: records.len().saturating_sub(cards.len()),
        cards,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{build_carousel, clamp_max_cards, OverflowPolicy};
    use crate::catalog::fields::CatalogRecord;

    fn row(title: &str, rank: Option<i64>) -> CatalogRecord {
        let mut properties = json!({
            "Title": {"title": [{"plain_text": title}]}
        });
        if let Some(rank) = rank {
            properties["Rank"] = json!({"type": "number", "number": rank});
        }
        CatalogRecord::from_page(&json!({ "properties": properties }))
    }

    fn titles(records: &[CatalogRecord], max: usize) -> Vec<String> {
        build_carousel(records, max)
            .cards
            .iter()
            .map(|card| card.title.clone())
            .collect()
    }

    #[test]
    fn orders_by_rank_with_unranked_rows_last() {
        let records = vec![row("two", Some(2)), row("none", None), row("one", Some(1))];
        assert_eq!(titles(&records, 10), vec!["one", "two", "none"]);
    }

    #[test]
    fn unranked_rows_keep_fetch_order() {
        let records = vec![
            row("a", None),
            row("ranked", Some(5)),
            row("b", None),
            row("c", None),
            row("tie-1", Some(5)),
        ];
        assert_eq!(
            titles(&records, 10),
            vec!["ranked", "tie-1", "a", "b", "c"]
        );
    }

    #[test]
    fn length_is_min_of_records_and_limit() {
        let records = (0..15)
            .map(|idx| row(&format!("r{idx}"), Some(idx)))
            .collect::<Vec<CatalogRecord>>();
        let carousel = build_carousel(&records, 10);
        assert_eq!(carousel.len(), 10);
        assert_eq!(carousel.omitted, 5);
        assert_eq!(carousel.cards[9].title, "r9");

        let short = build_carousel(&records[..3], 10);
        assert_eq!(short.len(), 3);
        assert_eq!(short.omitted, 0);
    }

    #[test]
    fn empty_input_gives_empty_carousel() {
        let carousel = build_carousel(&[], 10);
        assert!(carousel.is_empty());
        assert_eq!(carousel.omitted, 0);
        assert_eq!(carousel.to_contents()["contents"], json!([]));
    }

    #[test]
    fn flex_message_wraps_carousel() {
        let message = build_carousel(&[row("x", Some(1))], 10).to_flex_message("油漆色號");
        assert_eq!(message["type"], json!("flex"));
        assert_eq!(message["altText"], json!("油漆色號"));
        assert_eq!(message["contents"]["type"], json!("carousel"));
        assert_eq!(
            message["contents"]["contents"]
                .as_array()
                .map(Vec::len),
            Some(1)
        );
        assert_eq!(
            message["contents"]["contents"][0]["type"],
            Value::String("bubble".to_string())
        );
    }

    #[test]
    fn limits_and_policies_parse() {
        assert_eq!(clamp_max_cards(0), 1);
        assert_eq!(clamp_max_cards(50), 12);
        assert_eq!(clamp_max_cards(10), 10);
        assert_eq!(OverflowPolicy::parse("Notice"), Some(OverflowPolicy::Notice));
        assert_eq!(OverflowPolicy::parse("drop"), Some(OverflowPolicy::Drop));
        assert_eq!(OverflowPolicy::parse("loud"), None);
        assert_eq!(OverflowPolicy::default(), OverflowPolicy::Drop);
    }
}
