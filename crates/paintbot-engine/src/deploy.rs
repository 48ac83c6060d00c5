use std::fs;
use std::io::Cursor;
use std::sync::Arc;

use image::{ImageFormat, ImageReader};
use paintbot_contracts::menus::{MenuDefinition, MenuRegistry, MenuSnapshot, MenuStage};
use paintbot_contracts::runs::{CleanupEntry, DeployedMenu, DeploymentReport};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::{ApiError, DeployError};
use crate::mime_for_path;
use crate::platform::RichMenuApi;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployOptions {
    /// Delete every menu already on the platform before creating new ones.
    pub delete_old: bool,
    /// Overrides the manifest's default flag.
    pub default_menu: Option<String>,
}

struct MenuAssets {
    layout: Value,
    image: Vec<u8>,
    content_type: &'static str,
}

pub struct MenuDeployer {
    api: Arc<dyn RichMenuApi>,
    registry: Arc<MenuRegistry>,
}

impl MenuDeployer {
    pub fn new(api: Arc<dyn RichMenuApi>, registry: Arc<MenuRegistry>) -> Self {
        Self { api, registry }
    }

    pub fn registry(&self) -> &Arc<MenuRegistry> {
        &self.registry
    }

    /// Deletes every menu on the platform. Failures are logged and recorded,
    /// never returned.
    #[instrument(skip(self))]
    pub fn clear_existing(&self) -> (Vec<CleanupEntry>, Option<String>) {
        let menus = match self.api.list_menus() {
            Ok(menus) => menus,
            Err(err) => {
                warn!(error = %err, "failed to list existing rich menus; skipping cleanup");
                return (Vec::new(), Some(err.to_string()));
            }
        };

        let entries = menus
            .into_iter()
            .map(|menu| match self.api.delete_menu(&menu.rich_menu_id) {
                Ok(()) => {
                    debug!(resource_id = %menu.rich_menu_id, "deleted rich menu");
                    CleanupEntry {
                        resource_id: menu.rich_menu_id,
                        name: menu.name,
                        deleted: true,
                        error: None,
                    }
                }
                Err(err) => {
                    warn!(
                        resource_id = %menu.rich_menu_id,
                        error = %err,
                        "failed to delete rich menu"
                    );
                    CleanupEntry {
                        resource_id: menu.rich_menu_id,
                        name: menu.name,
                        deleted: false,
                        error: Some(err.to_string()),
                    }
                }
            })
            .collect::<Vec<CleanupEntry>>();
        info!(
            deleted = entries.iter().filter(|entry| entry.deleted).count(),
            failed = entries.iter().filter(|entry| !entry.deleted).count(),
            "cleared existing rich menus"
        );
        (entries, None)
    }

    /// Points `alias` at `resource_id`, creating it or moving an existing one.
    #[instrument(skip(self))]
    pub fn bind_alias(&self, alias: &str, resource_id: &str) -> Result<(), ApiError> {
        match self.api.create_alias(alias, resource_id) {
            Ok(()) => Ok(()),
            Err(err) if err.is_conflict() => {
                debug!("alias exists; updating target");
                self.api.update_alias(alias, resource_id)
            }
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, definition), fields(menu = %definition.name))]
    pub fn deploy_menu(
        &self,
        definition: &MenuDefinition,
        make_default: bool,
    ) -> Result<DeployedMenu, DeployError> {
        let assets = load_assets(definition)?;
        let step = |reached: MenuStage, resource_id: Option<&str>, source: ApiError| {
            DeployError::Step {
                menu: definition.name.clone(),
                reached,
                resource_id: resource_id.map(str::to_string),
                source,
            }
        };

        let resource_id = self
            .api
            .create_menu(&assets.layout)
            .map_err(|source| step(MenuStage::Absent, None, source))?;
        info!(resource_id = %resource_id, "created rich menu");

        self.api
            .upload_image(&resource_id, assets.image, assets.content_type)
            .map_err(|source| step(MenuStage::Created, Some(&resource_id), source))?;
        self.bind_alias(&definition.alias, &resource_id)
            .map_err(|source| step(MenuStage::Imaged, Some(&resource_id), source))?;

        let mut stage = MenuStage::Aliased;
        if make_default {
            self.api
                .set_default(&resource_id)
                .map_err(|source| step(MenuStage::Aliased, Some(&resource_id), source))?;
            stage = MenuStage::Default;
        }
        info!(resource_id = %resource_id, alias = %definition.alias, stage = %stage, "deployed rich menu");

        Ok(DeployedMenu {
            name: definition.name.clone(),
            alias: definition.alias.clone(),
            resource_id: Some(resource_id),
            stage,
        })
    }

    pub fn deploy(
        &self,
        definitions: &[MenuDefinition],
        options: &DeployOptions,
    ) -> Result<DeploymentReport, DeployError> {
        let mut report = DeploymentReport::start(options.delete_old);
        self.deploy_into(definitions, options, &mut report)?;
        Ok(report)
    }

    /// Runs a deployment, filling `report` as it goes so the caller still has
    /// the partial record when a menu fails. Menus that reached their alias
    /// are published to the registry either way.
    ///
    /// The default menu is `options.default_menu`, else the flagged
    /// definition, else the only definition when exactly one is deployed.
    pub fn deploy_into(
        &self,
        definitions: &[MenuDefinition],
        options: &DeployOptions,
        report: &mut DeploymentReport,
    ) -> Result<(), DeployError> {
        let default_name = options
            .default_menu
            .clone()
            .or_else(|| {
                definitions
                    .iter()
                    .find(|definition| definition.default)
                    .map(|definition| definition.name.clone())
            })
            .or_else(|| match definitions {
                [only] => Some(only.name.clone()),
                _ => None,
            });
        if let Some(name) = default_name.as_deref() {
            if !definitions.iter().any(|definition| definition.name == name) {
                warn!(menu = name, "default menu is not part of this deployment");
            }
        }

        if options.delete_old {
            let (entries, list_error) = self.clear_existing();
            report.cleanup = entries;
            report.cleanup_error = list_error;
        }

        let mut outcome = Ok(());
        for definition in definitions {
            let make_default = default_name.as_deref() == Some(definition.name.as_str());
            match self.deploy_menu(definition, make_default) {
                Ok(deployed) => {
                    if deployed.stage == MenuStage::Default {
                        report.default_menu = Some(deployed.name.clone());
                    }
                    report.menus.push(deployed);
                }
                Err(err) => {
                    warn!(error = %err, "menu deployment failed");
                    report.menus.push(DeployedMenu {
                        name: definition.name.clone(),
                        alias: definition.alias.clone(),
                        resource_id: err.resource_id().map(str::to_string),
                        stage: err.reached(),
                    });
                    outcome = Err(err);
                    break;
                }
            }
        }

        self.publish(report, options.delete_old);
        report.finish();
        outcome
    }

    /// Fills the registry from aliases already bound on the platform, for
    /// processes that serve events without having deployed.
    pub fn adopt_existing(&self, definitions: &[MenuDefinition]) -> usize {
        let mut found = MenuSnapshot::new();
        for definition in definitions {
            match self.api.get_alias(&definition.alias) {
                Ok(Some(resource_id)) => {
                    found.insert(definition.name.clone(), resource_id);
                }
                Ok(None) => debug!(alias = %definition.alias, "alias not bound on platform"),
                Err(err) => warn!(alias = %definition.alias, error = %err, "alias lookup failed"),
            }
        }
        self.registry.merge(&found);
        found.len()
    }

    fn publish(&self, report: &DeploymentReport, replace: bool) {
        let entries = report
            .menus
            .iter()
            .filter(|menu| menu.stage.is_routable())
            .filter_map(|menu| {
                menu.resource_id
                    .clone()
                    .map(|resource_id| (menu.name.clone(), resource_id))
            })
            .collect::<MenuSnapshot>();
        info!(menus = entries.len(), replace, "publishing menu registry");
        if replace {
            self.registry.replace_all(entries);
        } else {
            self.registry.merge(&entries);
        }
    }
}

fn load_assets(definition: &MenuDefinition) -> Result<MenuAssets, DeployError> {
    let asset_error = |path: &std::path::Path, source| DeployError::Asset {
        menu: definition.name.clone(),
        path: path.to_path_buf(),
        source,
    };
    let raw = fs::read_to_string(&definition.layout_path)
        .map_err(|source| asset_error(&definition.layout_path, source))?;
    let layout: Value = serde_json::from_str(&raw).map_err(|source| DeployError::Layout {
        menu: definition.name.clone(),
        path: definition.layout_path.clone(),
        source,
    })?;
    let image = fs::read(&definition.image_path)
        .map_err(|source| asset_error(&definition.image_path, source))?;

    let content_type = match image::guess_format(&image) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        _ => mime_for_path(&definition.image_path).unwrap_or("image/png"),
    };
    check_dimensions(definition, &layout, &image);

    Ok(MenuAssets {
        layout,
        image,
        content_type,
    })
}

fn check_dimensions(definition: &MenuDefinition, layout: &Value, image: &[u8]) {
    let declared = layout.get("size").and_then(|size| {
        Some((
            size.get("width")?.as_u64()?,
            size.get("height")?.as_u64()?,
        ))
    });
    let Some((width, height)) = declared else {
        return;
    };
    let actual = ImageReader::new(Cursor::new(image))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok());
    match actual {
        Some((w, h)) if u64::from(w) == width && u64::from(h) == height => {}
        Some((w, h)) => warn!(
            menu = %definition.name,
            layout = %format!("{width}x{height}"),
            image = %format!("{w}x{h}"),
            "rich menu image size does not match layout size"
        ),
        None => warn!(menu = %definition.name, "rich menu image could not be decoded"),
    }
}
