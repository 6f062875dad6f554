pub mod backend_log;
pub mod channel;
pub mod client;
pub mod error;
pub mod events;
pub mod loader;
pub mod manifest;
pub mod registry;
pub mod resolver;
pub mod source;

pub use backend_log::{log_plugin_message, PluginLogLevel};
pub use channel::{
    PanelConfig, PanelDescriptor, RegisterResponse, RegistryChannel, RegistryHandle,
    UnregisterResponse,
};
pub use client::{fetch_required_panels, PanelMap, RegistryApi, RetryPolicy};
pub use error::{PluginError, PluginResult};
pub use events::{RegistryEvent, REGISTRY_CHANGED_EVENT};
pub use loader::{
    FallbackPlan, FsModuleLoader, LoadFailure, ModuleLoader, PanelComponent, PanelLoader,
    PanelModule,
};
pub use manifest::{extract_panels, PanelContribution};
pub use registry::{PanelRegistry, RegistryBuilder, RegistryEntry};
pub use resolver::{resolve_plugins_dir, AppLayout, PluginsDir};
pub use source::{DirEntryInfo, EntryKind, FsPluginSource, PluginSource};
