use crate::manifest::{extract_panels, MANIFEST_FILE_NAME};
use crate::resolver::{resolve_plugins_dir, AppLayout, PluginsDir};
use crate::source::{EntryKind, PluginSource};
use panedeck_core::{log_error, DeploymentMode};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    pub path: PathBuf,
    pub plugin: String,
}

/// Panel id to resolved component path, as found by the startup scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PanelRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl PanelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins; the replaced entry is returned.
    pub fn insert(&mut self, panel_id: String, entry: RegistryEntry) -> Option<RegistryEntry> {
        self.entries.insert(panel_id, entry)
    }

    pub fn get(&self, panel_id: &str) -> Option<&Path> {
        self.entries.get(panel_id).map(|e| e.path.as_path())
    }

    pub fn entry(&self, panel_id: &str) -> Option<&RegistryEntry> {
        self.entries.get(panel_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RegistryEntry)> {
        self.entries.iter()
    }
}

pub struct RegistryBuilder<S> {
    source: S,
    mode: DeploymentMode,
    layout: AppLayout,
}

impl<S: PluginSource> RegistryBuilder<S> {
    pub fn new(source: S, mode: DeploymentMode, layout: AppLayout) -> Self {
        Self {
            source,
            mode,
            layout,
        }
    }

    pub async fn build(&self) -> PanelRegistry {
        let dir = resolve_plugins_dir(self.mode, &self.layout);
        self.scan(&dir).await
    }

    /// Scans one directory level below `dir`. Never fails: a missing
    /// directory or broken plugin only means fewer panels.
    ///
    /// Plugins are processed in listing order, which depends on the platform.
    /// When two plugins declare the same panel id the one listed later wins.
    pub async fn scan(&self, dir: &PluginsDir) -> PanelRegistry {
        let root = dir.path();
        let mut registry = PanelRegistry::new();
        tracing::info!(path = %root.display(), "scanning for ui plugins");

        if !self.source.exists(root).await {
            tracing::error!(path = %root.display(), "plugins directory does not exist");
            return registry;
        }

        let entries = match self.source.list_dir(root).await {
            Ok(entries) => entries,
            Err(err) => {
                log_error("listing plugins directory", &err);
                return registry;
            }
        };
        tracing::debug!(
            plugins = ?entries.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            "found plugin directory entries"
        );

        for entry in entries {
            if entry.kind != EntryKind::Directory {
                continue;
            }
            let manifest_path = root.join(&entry.name).join(MANIFEST_FILE_NAME);
            let manifest = match self.source.read_manifest(&manifest_path).await {
                Ok(manifest) => manifest,
                Err(err) => {
                    tracing::error!(plugin = %entry.name, "skipping plugin");
                    log_error("reading plugin manifest", &err);
                    continue;
                }
            };

            for (panel_id, panel) in extract_panels(&manifest, &entry.name) {
                let resolved = dir.resolve_component(&panel.plugin_dir, &panel.path);
                tracing::debug!(
                    panel_id = %panel_id,
                    component = %panel.path,
                    resolved = %resolved.display(),
                    "registering panel"
                );
                let replaced = registry.insert(
                    panel_id.clone(),
                    RegistryEntry {
                        path: resolved,
                        plugin: panel.plugin_dir,
                    },
                );
                if let Some(previous) = replaced {
                    tracing::warn!(
                        panel_id = %panel_id,
                        replaced_plugin = %previous.plugin,
                        plugin = %entry.name,
                        "panel id declared by more than one plugin, keeping the later one"
                    );
                }
            }
        }

        if registry.is_empty() {
            tracing::warn!(
                path = %root.display(),
                mode = dir.mode().as_str(),
                "no ui panels were registered"
            );
        } else {
            tracing::info!(count = registry.len(), "registered ui panels");
        }
        registry
    }
}
