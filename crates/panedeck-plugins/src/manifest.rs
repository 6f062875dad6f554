//! Panel contributions declared in a plugin's `package.json`.
//!
//! Two schema generations are understood:
//!
//! ```json
//! { "electronPlugin": { "contributes": { "uiPanels": [
//!     { "id": "...", "componentPath": "..." }
//! ] } } }
//! { "uiPanels": { "<panel-id>": { "component": "..." } } }
//! ```
//!
//! Manifests are untrusted. Anything that does not match is skipped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MANIFEST_FILE_NAME: &str = "package.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelContribution {
    /// Relative to the plugin root.
    pub path: String,
    pub plugin_dir: String,
}

pub type PanelContributions = BTreeMap<String, PanelContribution>;

#[derive(Debug, Deserialize)]
struct ContributedPanel {
    id: Option<String>,
    #[serde(rename = "componentPath")]
    component_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyPanel {
    component: Option<String>,
}

/// Panels from both schema generations. The legacy block is consulted only
/// when the current one contributes nothing.
pub fn extract_panels(manifest: &serde_json::Value, plugin_dir: &str) -> PanelContributions {
    let panels = contributed_panels(manifest, plugin_dir);
    if !panels.is_empty() {
        tracing::debug!(plugin = plugin_dir, count = panels.len(), "found ui panels");
        return panels;
    }
    let legacy = legacy_panels(manifest, plugin_dir);
    if !legacy.is_empty() {
        tracing::debug!(plugin = plugin_dir, count = legacy.len(), "found legacy ui panels");
    }
    legacy
}

pub fn contributed_panels(manifest: &serde_json::Value, plugin_dir: &str) -> PanelContributions {
    let mut panels = PanelContributions::new();
    let Some(entries) = manifest
        .pointer("/electronPlugin/contributes/uiPanels")
        .and_then(|v| v.as_array())
    else {
        return panels;
    };

    for entry in entries {
        let Ok(panel) = ContributedPanel::deserialize(entry) else {
            continue;
        };
        if let (Some(id), Some(path)) = (non_empty(panel.id), non_empty(panel.component_path)) {
            panels.insert(
                id,
                PanelContribution {
                    path,
                    plugin_dir: plugin_dir.to_string(),
                },
            );
        }
    }
    panels
}

pub fn legacy_panels(manifest: &serde_json::Value, plugin_dir: &str) -> PanelContributions {
    let mut panels = PanelContributions::new();
    let Some(entries) = manifest.get("uiPanels").and_then(|v| v.as_object()) else {
        return panels;
    };

    for (panel_id, entry) in entries {
        let Ok(panel) = LegacyPanel::deserialize(entry) else {
            continue;
        };
        if let Some(path) = non_empty(panel.component) {
            panels.insert(
                panel_id.clone(),
                PanelContribution {
                    path,
                    plugin_dir: plugin_dir.to_string(),
                },
            );
        }
    }
    panels
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_current_schema() {
        let manifest = json!({
            "name": "explorer",
            "electronPlugin": { "contributes": { "uiPanels": [
                { "id": "file-explorer", "componentPath": "FileExplorerPanel.jsx" },
                { "id": "outline", "componentPath": "dist/outline.js" }
            ]}}
        });
        let panels = extract_panels(&manifest, "explorer");
        assert_eq!(panels.len(), 2);
        assert_eq!(
            panels["file-explorer"],
            PanelContribution {
                path: "FileExplorerPanel.jsx".to_string(),
                plugin_dir: "explorer".to_string(),
            }
        );
        assert_eq!(panels["outline"].path, "dist/outline.js");
    }

    #[test]
    fn current_schema_hides_legacy_entirely() {
        let manifest = json!({
            "electronPlugin": { "contributes": { "uiPanels": [
                { "id": "editor", "componentPath": "index.js" }
            ]}},
            "uiPanels": {
                "editor": { "component": "old.js" },
                "terminal": { "component": "term.js" }
            }
        });
        let panels = extract_panels(&manifest, "p");
        assert_eq!(panels.len(), 1);
        assert_eq!(panels["editor"].path, "index.js");
        assert!(!panels.contains_key("terminal"));
    }

    #[test]
    fn falls_back_to_legacy_schema() {
        let manifest = json!({
            "uiPanels": {
                "terminal": { "component": "Terminal.jsx" },
                "console": { "component": "Console.jsx" }
            }
        });
        let panels = extract_panels(&manifest, "shell");
        assert_eq!(panels.len(), 2);
        assert_eq!(panels["terminal"].path, "Terminal.jsx");
        assert_eq!(panels["console"].plugin_dir, "shell");
    }

    #[test]
    fn legacy_used_when_current_entries_are_all_invalid() {
        let manifest = json!({
            "electronPlugin": { "contributes": { "uiPanels": [ { "id": "editor" } ] } },
            "uiPanels": { "editor": { "component": "legacy.js" } }
        });
        let panels = extract_panels(&manifest, "p");
        assert_eq!(panels["editor"].path, "legacy.js");
    }

    #[test]
    fn incomplete_entries_are_skipped() {
        let manifest = json!({
            "electronPlugin": { "contributes": { "uiPanels": [
                { "id": "a" },
                { "componentPath": "b.js" },
                { "id": "", "componentPath": "c.js" },
                { "id": 42, "componentPath": "d.js" },
                "not an object",
                { "id": "ok", "componentPath": "ok.js" }
            ]}}
        });
        let panels = extract_panels(&manifest, "p");
        assert_eq!(panels.keys().collect::<Vec<_>>(), vec!["ok"]);

        let legacy = json!({ "uiPanels": {
            "x": {},
            "y": { "component": null },
            "z": { "component": "z.js" }
        } });
        let panels = extract_panels(&legacy, "p");
        assert_eq!(panels.keys().collect::<Vec<_>>(), vec!["z"]);
    }

    #[test]
    fn unrelated_shapes_yield_nothing() {
        for manifest in [
            json!(null),
            json!([1, 2, 3]),
            json!({ "name": "plain-npm-package" }),
            json!({ "electronPlugin": { "contributes": { "uiPanels": { "id": "not-a-list" } } } }),
            json!({ "uiPanels": ["not", "a", "map"] }),
        ] {
            assert!(extract_panels(&manifest, "p").is_empty(), "{manifest}");
        }
    }
}
