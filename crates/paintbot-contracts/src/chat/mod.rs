mod command_registry;
mod intent_parser;

pub use command_registry::FEATURE_INDEX_TEXT;
pub use intent_parser::{parse_postback, parse_text_command, PostbackCommand, TextCommand};
