#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CommandAction {
    PaintCatalog,
    BrandIdentity,
    FeatureIndex,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: CommandAction,
}

pub(crate) const TEXT_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "油漆色號",
        action: CommandAction::PaintCatalog,
    },
    CommandSpec {
        command: "企業識別",
        action: CommandAction::BrandIdentity,
    },
    CommandSpec {
        command: "cis",
        action: CommandAction::BrandIdentity,
    },
    CommandSpec {
        command: "查詢功能索引",
        action: CommandAction::FeatureIndex,
    },
];

pub(crate) const MENU_COMMAND_PREFIX: &str = "richmenu";

pub(crate) const POSTBACK_GOTO_KEY: &str = "goto";

pub const FEATURE_INDEX_TEXT: &str = "請輸入以下指令之一：\n- 油漆色號\n- 企業識別 or CIS";
