use serde::{Deserialize, Serialize};

/// Name under which registry changes are forwarded to presentation contexts.
pub const REGISTRY_CHANGED_EVENT: &str = "ui-panel:changed";

/// One-way notification published after a runtime registry change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RegistryEvent {
    Registered { id: String },
    Unregistered { id: String },
}
