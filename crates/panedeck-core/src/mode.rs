use serde::{Deserialize, Serialize};

/// Whether the host runs from a bundled distribution or from live sources.
///
/// Decided once at startup and handed to every component that resolves paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    Packaged,
    Development,
}

impl DeploymentMode {
    pub fn from_packaged(packaged: bool) -> Self {
        if packaged {
            DeploymentMode::Packaged
        } else {
            DeploymentMode::Development
        }
    }

    pub fn is_packaged(&self) -> bool {
        matches!(self, DeploymentMode::Packaged)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentMode::Packaged => "packaged",
            DeploymentMode::Development => "development",
        }
    }
}
