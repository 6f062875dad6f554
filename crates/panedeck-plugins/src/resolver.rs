use panedeck_core::DeploymentMode;
use std::path::{Component, Path, PathBuf};

pub const PLUGINS_DIR_NAME: &str = "plugins";
pub const UNPACKED_DIR_NAME: &str = "app-unpacked";

/// Filesystem roots the host knows about at startup.
#[derive(Debug, Clone)]
pub struct AppLayout {
    pub app_root: PathBuf,
    pub resources_dir: PathBuf,
}

/// The plugins directory, tagged with the deployment mode that chose it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginsDir {
    Packaged(PathBuf),
    Development(PathBuf),
}

impl PluginsDir {
    pub fn path(&self) -> &Path {
        match self {
            PluginsDir::Packaged(path) | PluginsDir::Development(path) => path,
        }
    }

    pub fn mode(&self) -> DeploymentMode {
        match self {
            PluginsDir::Packaged(_) => DeploymentMode::Packaged,
            PluginsDir::Development(_) => DeploymentMode::Development,
        }
    }

    /// Path recorded in the registry for a component of `plugin`.
    ///
    /// Packaged builds get a path relative to the bundled `plugins` root,
    /// development builds get an absolute path.
    /// The component path is confined to the plugin directory.
    pub fn resolve_component(&self, plugin: &str, component_path: &str) -> PathBuf {
        let relative = confine_to_plugin(component_path);
        match self {
            PluginsDir::Packaged(_) => Path::new(PLUGINS_DIR_NAME).join(plugin).join(relative),
            PluginsDir::Development(root) => root.join(plugin).join(relative),
        }
    }
}

/// Lexically normalises a manifest path: roots and `.` are dropped, `..`
/// never climbs above the plugin directory.
fn confine_to_plugin(component_path: &str) -> PathBuf {
    let mut out = PathBuf::new();
    let mut escaped = false;
    for component in Path::new(component_path).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::ParentDir => escaped |= !out.pop(),
            Component::RootDir | Component::Prefix(_) => escaped = true,
            Component::CurDir => {}
        }
    }
    if escaped {
        tracing::warn!(
            component = component_path,
            confined = %out.display(),
            "component path points outside its plugin"
        );
    }
    out
}

pub fn packaged_candidates(layout: &AppLayout) -> [PathBuf; 3] {
    [
        layout.resources_dir.join(PLUGINS_DIR_NAME),
        layout
            .resources_dir
            .join(UNPACKED_DIR_NAME)
            .join(PLUGINS_DIR_NAME),
        layout.app_root.join(PLUGINS_DIR_NAME),
    ]
}

pub fn resolve_plugins_dir(mode: DeploymentMode, layout: &AppLayout) -> PluginsDir {
    resolve_plugins_dir_with(mode, layout, |path| path.exists())
}

/// Never fails: when no packaged candidate exists the first one is returned
/// and the scan reports the missing directory.
pub fn resolve_plugins_dir_with<F>(
    mode: DeploymentMode,
    layout: &AppLayout,
    exists: F,
) -> PluginsDir
where
    F: Fn(&Path) -> bool,
{
    let dir = match mode {
        DeploymentMode::Development => {
            PluginsDir::Development(layout.app_root.join(PLUGINS_DIR_NAME))
        }
        DeploymentMode::Packaged => {
            let candidates = packaged_candidates(layout);
            let found = candidates.iter().find(|path| exists(path)).cloned();
            match found {
                Some(found) => PluginsDir::Packaged(found),
                None => {
                    tracing::error!(
                        tried = ?candidates,
                        "no plugins directory found in packaged layout"
                    );
                    let [first, ..] = candidates;
                    PluginsDir::Packaged(first)
                }
            }
        }
    };
    tracing::info!(
        path = %dir.path().display(),
        mode = dir.mode().as_str(),
        "using plugins directory"
    );
    dir
}
