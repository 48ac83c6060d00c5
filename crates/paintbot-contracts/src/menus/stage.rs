use std::fmt;

use serde::{Deserialize, Serialize};

/// How far one menu got through deployment: `absent → created → imaged → aliased [→ default]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuStage {
    Absent,
    Created,
    Imaged,
    Aliased,
    Default,
}

impl MenuStage {
    pub fn as_str(self) -> &'static str {
        match self {
            MenuStage::Absent => "absent",
            MenuStage::Created => "created",
            MenuStage::Imaged => "imaged",
            MenuStage::Aliased => "aliased",
            MenuStage::Default => "default",
        }
    }

    /// A menu is routable once its alias is bound.
    pub fn is_routable(self) -> bool {
        self >= MenuStage::Aliased
    }
}

impl fmt::Display for MenuStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
