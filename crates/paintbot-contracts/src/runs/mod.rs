mod report;

pub use report::{write_report, CleanupEntry, DeployedMenu, DeploymentReport};
