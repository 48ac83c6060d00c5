use super::command_registry::{
    CommandAction, MENU_COMMAND_PREFIX, POSTBACK_GOTO_KEY, TEXT_COMMANDS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextCommand {
    PaintCatalog,
    BrandIdentity,
    FeatureIndex,
    /// Typed menu name such as `richmenu2`.
    SwitchMenu(String),
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostbackCommand {
    Goto(String),
    Unrecognized(String),
}

pub fn parse_text_command(text: &str) -> TextCommand {
    let normalized = text.trim().to_lowercase();
    if normalized.is_empty() {
        return TextCommand::Unrecognized;
    }

    if let Some(spec) = TEXT_COMMANDS.iter().find(|spec| spec.command == normalized) {
        return match spec.action {
            CommandAction::PaintCatalog => TextCommand::PaintCatalog,
            CommandAction::BrandIdentity => TextCommand::BrandIdentity,
            CommandAction::FeatureIndex => TextCommand::FeatureIndex,
        };
    }

    if let Some(suffix) = normalized.strip_prefix(MENU_COMMAND_PREFIX) {
        if !suffix.is_empty() && suffix.chars().all(|ch| ch.is_ascii_digit()) {
            return TextCommand::SwitchMenu(normalized);
        }
    }

    TextCommand::Unrecognized
}

/// Postback data is a `key=value` list joined by `&`; only `goto` carries meaning.
pub fn parse_postback(data: &str) -> PostbackCommand {
    let target = data
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == POSTBACK_GOTO_KEY)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty());
    match target {
        Some(target) => PostbackCommand::Goto(target.to_string()),
        None => PostbackCommand::Unrecognized(data.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_postback, parse_text_command, PostbackCommand, TextCommand};

    #[test]
    fn parse_catalog_and_index_commands() {
        assert_eq!(parse_text_command("油漆色號"), TextCommand::PaintCatalog);
        assert_eq!(parse_text_command("  油漆色號\n"), TextCommand::PaintCatalog);
        assert_eq!(parse_text_command("查詢功能索引"), TextCommand::FeatureIndex);
    }

    #[test]
    fn parse_brand_identity_aliases() {
        assert_eq!(parse_text_command("企業識別"), TextCommand::BrandIdentity);
        assert_eq!(parse_text_command("CIS"), TextCommand::BrandIdentity);
        assert_eq!(parse_text_command("cis"), TextCommand::BrandIdentity);
    }

    #[test]
    fn parse_menu_switch_is_case_insensitive() {
        assert_eq!(
            parse_text_command("RichMenu2"),
            TextCommand::SwitchMenu("richmenu2".to_string())
        );
        assert_eq!(parse_text_command("richmenu"), TextCommand::Unrecognized);
        assert_eq!(parse_text_command("richmenu-x"), TextCommand::Unrecognized);
    }

    #[test]
    fn parse_unknown_text() {
        assert_eq!(parse_text_command(""), TextCommand::Unrecognized);
        assert_eq!(parse_text_command("hello"), TextCommand::Unrecognized);
    }

    #[test]
    fn parse_goto_postbacks() {
        assert_eq!(
            parse_postback("goto=richmenu2"),
            PostbackCommand::Goto("richmenu2".to_string())
        );
        assert_eq!(
            parse_postback("source=menu&goto=richmenu1"),
            PostbackCommand::Goto("richmenu1".to_string())
        );
    }

    #[test]
    fn parse_unrecognized_postbacks() {
        for raw in ["action=detail", "goto=", "goto", "", "richmenu2"] {
            assert_eq!(
                parse_postback(raw),
                PostbackCommand::Unrecognized(raw.to_string())
            );
        }
    }
}
