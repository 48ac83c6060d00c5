mod manifest;
mod registry;
mod stage;

pub use manifest::{MenuDefinition, MenuManifest, MANIFEST_FILE};
pub use registry::{MenuRegistry, MenuSnapshot};
pub use stage::MenuStage;
