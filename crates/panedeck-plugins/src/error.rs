use std::path::PathBuf;
use thiserror::Error;

pub type PluginResult<T> = Result<T, PluginError>;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugins directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("failed to list {}: {source}", path.display())]
    ListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {}: {source}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Panel ID is required")]
    MissingPanelId,
    #[error("Panel not found: {0}")]
    PanelNotFound(String),
    #[error("registry channel closed")]
    ChannelClosed,
    #[error("registry unavailable: {0}")]
    RegistryUnavailable(String),
    #[error("Missing required panels: {}", .0.join(", "))]
    MissingPanels(Vec<String>),
}
