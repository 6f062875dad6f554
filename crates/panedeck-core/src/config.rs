use crate::error::{log_error, CoreError, CoreResult};
use crate::mode::DeploymentMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PACKAGED: &str = "PANEDECK_PACKAGED";
pub const ENV_APP_ROOT: &str = "PANEDECK_APP_ROOT";
pub const ENV_RESOURCES_DIR: &str = "PANEDECK_RESOURCES_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub deployment: DeploymentConfig,
    pub paths: PathsConfig,
    pub workspace: WorkspaceConfig,
    pub default_panels: Vec<PanelSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DeploymentConfig {
    pub packaged: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PathsConfig {
    pub app_root: Option<PathBuf>,
    pub resources_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub required_panels: Vec<String>,
    pub fetch_retries: u32,
    pub fetch_retry_delay_ms: u64,
}

/// A panel installed into the registry channel before scanned entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelSeed {
    pub id: String,
    pub name: String,
    pub component: String,
    pub position: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            deployment: DeploymentConfig::default(),
            paths: PathsConfig::default(),
            workspace: WorkspaceConfig::default(),
            default_panels: vec![
                PanelSeed {
                    id: "file-explorer".to_string(),
                    name: "File Explorer".to_string(),
                    component: "plugins/file-explorer/index".to_string(),
                    position: "left".to_string(),
                },
                PanelSeed {
                    id: "editor".to_string(),
                    name: "Monaco Editor".to_string(),
                    component: "plugins/monaco-editor/index".to_string(),
                    position: "center".to_string(),
                },
            ],
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            required_panels: vec!["file-explorer".to_string(), "editor".to_string()],
            fetch_retries: 3,
            fetch_retry_delay_ms: 1000,
        }
    }
}

impl HostConfig {
    /// Reads a JSON config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: HostConfig = serde_json::from_str(&data)?;
        Ok(cfg)
    }

    /// Loads `path` and applies the environment. Any failure is logged and
    /// yields the defaults, so a bad config never stops the host.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load_or_default_with(path, |key| std::env::var(key).ok())
    }

    pub fn load_or_default_with<F>(path: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let loaded = Self::load(path).and_then(|mut cfg| {
            cfg.apply_env_from(lookup)?;
            Ok(cfg)
        });
        loaded.unwrap_or_else(|err| {
            log_error("loading host config, using defaults", &err);
            Self::default()
        })
    }

    pub fn apply_env(&mut self) -> CoreResult<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from<F>(&mut self, lookup: F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_PACKAGED) {
            self.deployment.packaged = Some(parse_flag(&raw)?);
        }
        if let Some(root) = lookup(ENV_APP_ROOT) {
            self.paths.app_root = Some(PathBuf::from(root));
        }
        if let Some(dir) = lookup(ENV_RESOURCES_DIR) {
            self.paths.resources_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// The configured flag wins; otherwise the caller's build-derived default.
    pub fn deployment_mode(&self, default_packaged: bool) -> DeploymentMode {
        DeploymentMode::from_packaged(self.deployment.packaged.unwrap_or(default_packaged))
    }
}

fn parse_flag(raw: &str) -> CoreResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(CoreError::Config(format!(
            "{ENV_PACKAGED} must be a boolean, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = HostConfig::load(&dir.path().join("panedeck.json")).unwrap();
        assert_eq!(cfg.workspace.fetch_retries, 3);
        assert_eq!(cfg.workspace.fetch_retry_delay_ms, 1000);
        assert_eq!(cfg.default_panels.len(), 2);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panedeck.json");
        let body = r#"{"deployment": {"packaged": true}, "workspace": {"fetch_retries": 5}}"#;
        std::fs::write(&path, body).unwrap();
        let cfg = HostConfig::load(&path).unwrap();
        assert_eq!(cfg.deployment.packaged, Some(true));
        assert_eq!(cfg.workspace.fetch_retries, 5);
        assert_eq!(cfg.workspace.required_panels, vec!["file-explorer", "editor"]);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panedeck.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(HostConfig::load(&path), Err(CoreError::Serde(_))));
    }

    #[test]
    fn broken_config_degrades_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panedeck.json");
        std::fs::write(&path, "{ not json").unwrap();
        let cfg = HostConfig::load_or_default_with(&path, |_| None);
        assert_eq!(cfg.deployment.packaged, None);
        assert_eq!(cfg.default_panels, HostConfig::default().default_panels);

        std::fs::write(&path, r#"{"workspace": {"fetch_retries": 9}}"#).unwrap();
        let cfg = HostConfig::load_or_default_with(&path, |k| {
            (k == ENV_PACKAGED).then(|| "sometimes".to_string())
        });
        assert_eq!(cfg.workspace.fetch_retries, 3);

        let cfg = HostConfig::load_or_default_with(&path, |k| {
            (k == ENV_PACKAGED).then(|| "1".to_string())
        });
        assert_eq!(cfg.workspace.fetch_retries, 9);
        assert_eq!(cfg.deployment.packaged, Some(true));
    }

    #[test]
    fn env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_PACKAGED, "false"),
            (ENV_APP_ROOT, "/opt/panedeck"),
        ]);
        let mut cfg = HostConfig::default();
        cfg.deployment.packaged = Some(true);
        cfg.apply_env_from(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.deployment.packaged, Some(false));
        assert_eq!(cfg.paths.app_root, Some(PathBuf::from("/opt/panedeck")));
        assert_eq!(cfg.paths.resources_dir, None);
    }

    #[test]
    fn bad_packaged_flag_is_rejected() {
        let mut cfg = HostConfig::default();
        let err = cfg
            .apply_env_from(|k| (k == ENV_PACKAGED).then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn deployment_mode_prefers_config() {
        let mut cfg = HostConfig::default();
        assert_eq!(cfg.deployment_mode(true), DeploymentMode::Packaged);
        cfg.deployment.packaged = Some(false);
        assert_eq!(cfg.deployment_mode(true), DeploymentMode::Development);
    }
}
