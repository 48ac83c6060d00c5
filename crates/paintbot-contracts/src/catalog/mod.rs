mod card;
mod carousel;
mod color;
mod fields;

pub use card::{
    build_card, CardDescriptor, FooterAction, NormalizedCard, DEFAULT_HEX_COLOR,
    DETAIL_POSTBACK_DATA,
};
pub use carousel::{
    build_carousel, clamp_max_cards, Carousel, OverflowPolicy, DEFAULT_MAX_CARDS,
    PLATFORM_MAX_CARDS, RANK_FIELD,
};
pub use color::{is_light, lightness, normalize_hex, text_color};
pub use fields::{CatalogRecord, FieldKind, FieldValue, RANK_LAST};
