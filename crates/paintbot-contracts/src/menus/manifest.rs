use std::path::{Path, PathBuf};

use anyhow::Context;
use indexmap::IndexMap;
use serde::Deserialize;

pub const MANIFEST_FILE: &str = "menus.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuDefinition {
    pub name: String,
    pub alias: String,
    pub layout_path: PathBuf,
    pub image_path: PathBuf,
    pub default: bool,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    name: String,
    alias: Option<String>,
    layout: String,
    image: String,
    #[serde(default)]
    default: bool,
}

#[derive(Debug, Clone)]
pub struct MenuManifest {
    menus: IndexMap<String, MenuDefinition>,
}

impl MenuManifest {
    pub fn new(menus: Option<IndexMap<String, MenuDefinition>>, menu_dir: &Path) -> Self {
        Self {
            menus: menus.unwrap_or_else(|| default_menus(menu_dir)),
        }
    }

    /// Reads `<menu_dir>/menus.json`, or falls back to the built-in two-menu set.
    pub fn load(menu_dir: &Path) -> anyhow::Result<Self> {
        let path = menu_dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(Self::new(None, menu_dir));
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        let entries: Vec<ManifestEntry> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid menu manifest {}", path.display()))?;

        let mut menus = IndexMap::new();
        for entry in entries {
            let alias = entry
                .alias
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| alias_for(&entry.name));
            menus.insert(
                entry.name.clone(),
                MenuDefinition {
                    name: entry.name,
                    alias,
                    layout_path: menu_dir.join(entry.layout),
                    image_path: menu_dir.join(entry.image),
                    default: entry.default,
                },
            );
        }
        Ok(Self::new(Some(menus), menu_dir))
    }

    pub fn get(&self, name: &str) -> Option<&MenuDefinition> {
        self.menus.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.menus.keys().cloned().collect()
    }

    pub fn default_menu(&self) -> Option<&MenuDefinition> {
        self.menus.values().find(|menu| menu.default)
    }

    /// Definitions for `names` in the order given; unknown names are an error.
    pub fn select(&self, names: &[String]) -> anyhow::Result<Vec<MenuDefinition>> {
        if names.is_empty() {
            return Ok(self.menus.values().cloned().collect());
        }
        names
            .iter()
            .map(|name| {
                self.get(name).cloned().ok_or_else(|| {
                    anyhow::anyhow!(
                        "unknown menu '{name}' (expected one of: {})",
                        self.names().join(", ")
                    )
                })
            })
            .collect()
    }
}

/// `richmenu1` → `richmenu-1`
fn alias_for(name: &str) -> String {
    let prefix = name.trim_end_matches(|ch: char| ch.is_ascii_digit());
    if prefix.is_empty() || prefix.len() == name.len() {
        return name.to_string();
    }
    format!("{prefix}-{}", &name[prefix.len()..])
}

fn default_menus(menu_dir: &Path) -> IndexMap<String, MenuDefinition> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str, layout: &str, image: &str, default: bool| {
        map.insert(
            name.to_string(),
            MenuDefinition {
                name: name.to_string(),
                alias: alias_for(name),
                layout_path: menu_dir.join(layout),
                image_path: menu_dir.join(image),
                default,
            },
        );
    };

    insert(
        "richmenu1",
        "richmenu1.json",
        "OPMS_Richmenu_Advanced-1.png",
        true,
    );
    insert(
        "richmenu2",
        "richmenu2.json",
        "OPMS_Richmenu_Advanced-2.png",
        false,
    );

    map
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{alias_for, MenuManifest};

    #[test]
    fn built_in_manifest_lists_both_menus() {
        let manifest = MenuManifest::new(None, Path::new("Richmenu"));
        assert_eq!(manifest.names(), vec!["richmenu1", "richmenu2"]);
        let first = manifest.get("richmenu1").cloned().unwrap_or_else(|| panic!("richmenu1"));
        assert_eq!(first.alias, "richmenu-1");
        assert_eq!(first.layout_path, Path::new("Richmenu/richmenu1.json"));
        assert_eq!(
            first.image_path,
            Path::new("Richmenu/OPMS_Richmenu_Advanced-1.png")
        );
        assert_eq!(
            manifest.default_menu().map(|menu| menu.name.as_str()),
            Some("richmenu1")
        );
    }

    #[test]
    fn manifest_file_overrides_defaults() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        std::fs::write(
            temp.path().join("menus.json"),
            r#"[
                {"name": "main", "layout": "main.json", "image": "main.jpg", "default": true},
                {"name": "richmenu7", "layout": "seven.json", "image": "seven.png"},
                {"name": "promo", "alias": "promo-alias", "layout": "p.json", "image": "p.png"}
            ]"#,
        )?;
        let manifest = MenuManifest::load(temp.path())?;
        assert_eq!(manifest.names(), vec!["main", "richmenu7", "promo"]);
        assert_eq!(manifest.get("main").map(|menu| menu.alias.as_str()), Some("main"));
        assert_eq!(
            manifest.get("richmenu7").map(|menu| menu.alias.as_str()),
            Some("richmenu-7")
        );
        assert_eq!(
            manifest.get("promo").map(|menu| menu.alias.as_str()),
            Some("promo-alias")
        );
        assert_eq!(
            manifest.get("main").map(|menu| menu.image_path.clone()),
            Some(temp.path().join("main.jpg"))
        );
        Ok(())
    }

    #[test]
    fn missing_manifest_file_uses_defaults() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let manifest = MenuManifest::load(temp.path())?;
        assert_eq!(manifest.names(), vec!["richmenu1", "richmenu2"]);
        Ok(())
    }

    #[test]
    fn select_preserves_requested_order_and_rejects_unknown() -> anyhow::Result<()> {
        let manifest = MenuManifest::new(None, Path::new("menus"));
        let picked = manifest.select(&["richmenu2".to_string(), "richmenu1".to_string()])?;
        assert_eq!(picked[0].name, "richmenu2");
        assert_eq!(manifest.select(&[])?.len(), 2);

        let err = manifest
            .select(&["richmenu9".to_string()])
            .err()
            .map(|err| err.to_string())
            .unwrap_or_default();
        assert_eq!(
            err,
            "unknown menu 'richmenu9' (expected one of: richmenu1, richmenu2)"
        );
        Ok(())
    }

    #[test]
    fn alias_inserts_dash_before_trailing_digits() {
        assert_eq!(alias_for("richmenu12"), "richmenu-12");
        assert_eq!(alias_for("main"), "main");
        assert_eq!(alias_for("42"), "42");
    }
}
