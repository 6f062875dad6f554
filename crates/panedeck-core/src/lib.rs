pub mod config;
pub mod error;
pub mod logging;
pub mod mode;

pub use config::{HostConfig, PanelSeed, PathsConfig, WorkspaceConfig};
pub use error::{format_error_chain, log_error, result_to_string, CoreError, CoreResult};
pub use mode::DeploymentMode;
