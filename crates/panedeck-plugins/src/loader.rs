//! Lazy loading of panel code with an ordered fallback chain.
//!
//! The candidate paths for a registry entry are plain data ([`FallbackPlan`]);
//! the [`PanelLoader`] walks them in order through a [`ModuleLoader`] and
//! turns total failure into a placeholder instead of an error.

use anyhow::Context;
use async_trait::async_trait;
use panedeck_core::DeploymentMode;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

const MISSING_ENTRY_REASON: &str = "Plugin path not found in registry";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackPlan {
    pub primary: String,
    /// Tried in order after the primary fails. Never repeats the primary.
    pub fallbacks: Vec<String>,
}

impl FallbackPlan {
    pub fn for_entry(registry_path: &str, mode: DeploymentMode, resources_dir: &Path) -> Self {
        let component = component_name(registry_path);
        let plugin = component.to_lowercase();

        let (primary, mut fallbacks) = match mode {
            DeploymentMode::Packaged => {
                let primary = format!("./dist/plugins/{plugin}/index.js");
                let fallbacks = vec![
                    format!("../dist/plugins/{plugin}/index.js"),
                    format!(
                        "{}/app/dist/plugins/{plugin}/index.js",
                        resources_dir.display()
                    ),
                    format!("./plugins/{plugin}/index.js"),
                    format!("../plugins/{plugin}/index.js"),
                    format!("./assets/plugins/{plugin}/index.js"),
                ];
                (primary, fallbacks)
            }
            DeploymentMode::Development => {
                let primary = format!("./src/plugins/{plugin}/index.jsx");
                let mut fallbacks = vec![format!("../src/plugins/{plugin}/index.jsx")];
                if plugin.contains("editor") {
                    fallbacks.push(format!("./src/plugins/{plugin}/index.tsx"));
                    fallbacks.push(format!("../src/plugins/{plugin}/index.tsx"));
                }
                (primary, fallbacks)
            }
        };
        fallbacks.retain(|candidate| candidate != &primary);
        Self { primary, fallbacks }
    }

    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.fallbacks.iter().map(String::as_str))
    }

    pub fn candidate_count(&self) -> usize {
        1 + self.fallbacks.len()
    }
}

/// Name a panel's code is published under: the file stem of the registry
/// path, or its parent directory when the file is an `index` module.
fn component_name(registry_path: &str) -> String {
    let mut segments = registry_path
        .rsplit(['/', '\\'])
        .filter(|segment| !segment.is_empty());
    let last = segments.next().unwrap_or(registry_path);
    let stem = last.split('.').next().unwrap_or(last);
    if stem.eq_ignore_ascii_case("index") {
        if let Some(parent) = segments.next() {
            return parent.to_string();
        }
    }
    stem.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelModule {
    /// The candidate that loaded.
    pub specifier: String,
    pub location: PathBuf,
    pub source: String,
}

#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, candidate: &str) -> anyhow::Result<PanelModule>;
}

/// Reads panel modules from disk, relative candidates against `base`.
#[derive(Debug, Clone)]
pub struct FsModuleLoader {
    base: PathBuf,
}

impl FsModuleLoader {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    fn locate(&self, candidate: &str) -> PathBuf {
        let path = Path::new(candidate);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }
}

#[async_trait]
impl ModuleLoader for FsModuleLoader {
    async fn load(&self, candidate: &str) -> anyhow::Result<PanelModule> {
        let location = self.locate(candidate);
        let source = tokio::fs::read_to_string(&location)
            .await
            .with_context(|| format!("failed to import {}", location.display()))?;
        Ok(PanelModule {
            specifier: candidate.to_string(),
            location,
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadFailure {
    pub reason: String,
    pub attempted: Vec<String>,
}

impl LoadFailure {
    pub fn render(&self) -> String {
        let mut out = format!("Error Loading Component: {}\nAttempted paths:", self.reason);
        for path in &self.attempted {
            let _ = write!(out, "\n- {path}");
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PanelComponent {
    Loaded { module: PanelModule },
    Failed { failure: LoadFailure, rendered: String },
}

impl PanelComponent {
    fn placeholder(failure: LoadFailure) -> Self {
        let rendered = failure.render();
        PanelComponent::Failed { failure, rendered }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, PanelComponent::Loaded { .. })
    }
}

/// Loads panels for one workspace. Outcomes are remembered per registry
/// path, so a failed panel keeps its placeholder until a new loader is made.
pub struct PanelLoader<L> {
    loader: L,
    mode: DeploymentMode,
    resources_dir: PathBuf,
    loaded: Mutex<HashMap<String, PanelComponent>>,
}

impl<L: ModuleLoader> PanelLoader<L> {
    pub fn new(loader: L, mode: DeploymentMode, resources_dir: PathBuf) -> Self {
        Self {
            loader,
            mode,
            resources_dir,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn plan(&self, registry_path: &str) -> FallbackPlan {
        FallbackPlan::for_entry(registry_path, self.mode, &self.resources_dir)
    }

    pub async fn load_panel(&self, registry_path: Option<&str>) -> PanelComponent {
        let Some(registry_path) = registry_path else {
            tracing::error!("no registry entry for panel");
            return PanelComponent::placeholder(LoadFailure {
                reason: MISSING_ENTRY_REASON.to_string(),
                attempted: Vec::new(),
            });
        };

        if let Some(done) = self.cached(registry_path) {
            return done;
        }
        let plan = self.plan(registry_path);
        let component = self.load_with_plan(&plan).await;
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(registry_path.to_string(), component.clone());
        component
    }

    pub async fn load_with_plan(&self, plan: &FallbackPlan) -> PanelComponent {
        tracing::debug!(candidate = %plan.primary, "loading panel");
        let primary_error = match self.loader.load(&plan.primary).await {
            Ok(module) => return PanelComponent::Loaded { module },
            Err(err) => err,
        };
        tracing::warn!(
            candidate = %plan.primary,
            error = %format!("{primary_error:#}"),
            "primary panel load failed, trying fallbacks"
        );

        for candidate in &plan.fallbacks {
            match self.loader.load(candidate).await {
                Ok(module) => {
                    tracing::info!(candidate = %candidate, "panel loaded from fallback path");
                    return PanelComponent::Loaded { module };
                }
                Err(err) => {
                    tracing::debug!(
                        candidate = %candidate,
                        error = %format!("{err:#}"),
                        "fallback path failed"
                    );
                }
            }
        }

        let attempted: Vec<String> = plan.candidates().map(str::to_string).collect();
        tracing::error!(attempted = ?attempted, "all panel load paths failed");
        PanelComponent::placeholder(LoadFailure {
            reason: format!("{primary_error:#}"),
            attempted,
        })
    }

    fn cached(&self, registry_path: &str) -> Option<PanelComponent> {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(registry_path)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Succeeds for a fixed set of candidates and records every attempt.
    #[derive(Default)]
    struct RecordingLoader {
        good: HashSet<String>,
        attempts: Mutex<Vec<String>>,
    }

    impl RecordingLoader {
        fn with_good(paths: &[&str]) -> Self {
            Self {
                good: paths.iter().map(|p| p.to_string()).collect(),
                attempts: Mutex::default(),
            }
        }

        fn attempts(&self) -> Vec<String> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModuleLoader for RecordingLoader {
        async fn load(&self, candidate: &str) -> anyhow::Result<PanelModule> {
            self.attempts.lock().unwrap().push(candidate.to_string());
            if self.good.contains(candidate) {
                Ok(PanelModule {
                    specifier: candidate.to_string(),
                    location: PathBuf::from(candidate),
                    source: "export default {}".to_string(),
                })
            } else {
                anyhow::bail!("module not found: {candidate}")
            }
        }
    }

    fn loader(good: &[&str], mode: DeploymentMode) -> PanelLoader<RecordingLoader> {
        PanelLoader::new(RecordingLoader::with_good(good), mode, PathBuf::from("/res"))
    }

    #[test]
    fn packaged_plan() {
        let plan = FallbackPlan::for_entry(
            "plugins/file-explorer/index",
            DeploymentMode::Packaged,
            Path::new("/res"),
        );
        assert_eq!(plan.primary, "./dist/plugins/file-explorer/index.js");
        assert_eq!(
            plan.fallbacks,
            vec![
                "../dist/plugins/file-explorer/index.js",
                "/res/app/dist/plugins/file-explorer/index.js",
                "./plugins/file-explorer/index.js",
                "../plugins/file-explorer/index.js",
                "./assets/plugins/file-explorer/index.js",
            ]
        );
    }

    #[test]
    fn development_plan_adds_typescript_for_editors() {
        let plan = FallbackPlan::for_entry(
            "/app/plugins/monaco/MonacoEditor.jsx",
            DeploymentMode::Development,
            Path::new("/res"),
        );
        assert_eq!(plan.primary, "./src/plugins/monacoeditor/index.jsx");
        assert_eq!(plan.candidate_count(), 4);
        assert!(plan.fallbacks.contains(&"./src/plugins/monacoeditor/index.tsx".to_string()));

        let plan = FallbackPlan::for_entry(
            "/app/plugins/explorer/FileExplorerPanel.jsx",
            DeploymentMode::Development,
            Path::new("/res"),
        );
        assert_eq!(plan.fallbacks, vec!["../src/plugins/fileexplorerpanel/index.jsx"]);
    }

    #[test]
    fn component_names() {
        assert_eq!(component_name("plugins/monaco-editor/index"), "monaco-editor");
        assert_eq!(component_name(r"C:\app\plugins\x\Terminal.jsx"), "Terminal");
        assert_eq!(component_name("index.js"), "index");
    }

    #[tokio::test]
    async fn good_primary_needs_no_fallbacks() {
        let loader = loader(&["./dist/plugins/terminal/index.js"], DeploymentMode::Packaged);
        let component = loader.load_panel(Some("plugins/terminal/index")).await;
        assert!(component.is_loaded());
        assert_eq!(loader.loader.attempts(), vec!["./dist/plugins/terminal/index.js"]);
    }

    #[tokio::test]
    async fn first_working_fallback_wins() {
        let loader = loader(
            &["./plugins/terminal/index.js", "./assets/plugins/terminal/index.js"],
            DeploymentMode::Packaged,
        );
        match loader.load_panel(Some("plugins/terminal/index")).await {
            PanelComponent::Loaded { module } => {
                assert_eq!(module.specifier, "./plugins/terminal/index.js")
            }
            other => panic!("expected a loaded panel, got {other:?}"),
        }
        assert_eq!(loader.loader.attempts().len(), 4);
    }

    #[tokio::test]
    async fn exhausted_chain_yields_placeholder() {
        let loader = loader(&[], DeploymentMode::Development);
        let entry = "/app/plugins/monaco/EditorPanel.jsx";
        let plan = loader.plan(entry);

        let PanelComponent::Failed { failure, rendered } = loader.load_panel(Some(entry)).await
        else {
            panic!("expected a placeholder");
        };
        assert_eq!(failure.attempted.len(), plan.fallbacks.len() + 1);
        assert_eq!(failure.attempted.len(), plan.candidate_count());
        assert_eq!(failure.attempted, loader.loader.attempts());
        assert!(failure.reason.contains("./src/plugins/editorpanel/index.jsx"));
        assert!(rendered.starts_with("Error Loading Component: module not found"));
        for path in &failure.attempted {
            assert!(rendered.contains(&format!("\n- {path}")));
        }
    }

    #[tokio::test]
    async fn failure_is_remembered() {
        let loader = loader(&[], DeploymentMode::Packaged);
        let first = loader.load_panel(Some("plugins/x/index")).await;
        let tried = loader.loader.attempts().len();
        let second = loader.load_panel(Some("plugins/x/index")).await;
        assert_eq!(first, second);
        assert_eq!(loader.loader.attempts().len(), tried);
    }

    #[tokio::test]
    async fn missing_registry_entry() {
        let loader = loader(&[], DeploymentMode::Packaged);
        let PanelComponent::Failed { failure, .. } = loader.load_panel(None).await else {
            panic!("expected a placeholder");
        };
        assert_eq!(failure.reason, MISSING_ENTRY_REASON);
        assert!(failure.attempted.is_empty());
        assert!(loader.loader.attempts().is_empty());
    }

    #[tokio::test]
    async fn reads_modules_from_disk() {
        let base = tempfile::tempdir().unwrap();
        let module_dir = base.path().join("dist/plugins/terminal");
        std::fs::create_dir_all(&module_dir).unwrap();
        std::fs::write(module_dir.join("index.js"), "export default 1;").unwrap();

        let loader = PanelLoader::new(
            FsModuleLoader::new(base.path().to_path_buf()),
            DeploymentMode::Packaged,
            base.path().join("resources"),
        );
        match loader.load_panel(Some("plugins/terminal/index")).await {
            PanelComponent::Loaded { module } => {
                assert_eq!(module.source, "export default 1;");
                assert_eq!(module.location, base.path().join("./dist/plugins/terminal/index.js"));
            }
            other => panic!("expected a loaded panel, got {other:?}"),
        }
    }
}
