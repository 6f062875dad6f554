#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use panedeck_core::{log_error, result_to_string, DeploymentMode, HostConfig, WorkspaceConfig};
use panedeck_plugins::{
    fetch_required_panels, log_plugin_message, AppLayout, FsModuleLoader, FsPluginSource,
    PanelComponent, PanelConfig, PanelDescriptor, PanelLoader, RegisterResponse, RegistryBuilder,
    RegistryChannel, RegistryHandle, RetryPolicy, UnregisterResponse, REGISTRY_CHANGED_EVENT,
};
use std::path::PathBuf;
use std::sync::Arc;
use tauri::{AppHandle, Emitter, Manager};
use tokio::sync::broadcast::error::RecvError;

const CONFIG_FILE_NAME: &str = "panedeck.json";
const ENV_CONFIG: &str = "PANEDECK_CONFIG";

type SharedHost = Arc<PanelHost>;

struct PanelHost {
    registry: RegistryHandle,
    loader: PanelLoader<FsModuleLoader>,
    workspace: WorkspaceConfig,
    mode: DeploymentMode,
}

#[derive(Clone, serde::Serialize)]
struct WorkspacePanel {
    id: String,
    component: PanelComponent,
}

#[tauri::command]
async fn get_registry(host: tauri::State<'_, SharedHost>) -> Result<Vec<PanelDescriptor>, String> {
    tracing::debug!("getting ui panel registry");
    result_to_string(host.registry.get_registry().await)
}

#[tauri::command]
async fn register_panel(
    host: tauri::State<'_, SharedHost>,
    panel_config: PanelConfig,
) -> Result<RegisterResponse, String> {
    result_to_string(host.registry.register(panel_config).await)
}

#[tauri::command]
async fn unregister_panel(
    host: tauri::State<'_, SharedHost>,
    panel_id: String,
) -> Result<UnregisterResponse, String> {
    result_to_string(host.registry.unregister(&panel_id).await)
}

#[tauri::command]
async fn load_panel(
    host: tauri::State<'_, SharedHost>,
    path: Option<String>,
) -> Result<PanelComponent, String> {
    Ok(host.loader.load_panel(path.as_deref()).await)
}

/// Waits for the required panels to appear in the registry, then loads each.
#[tauri::command]
async fn open_workspace(host: tauri::State<'_, SharedHost>) -> Result<Vec<WorkspacePanel>, String> {
    let required = &host.workspace.required_panels;
    let policy = RetryPolicy::from(&host.workspace);
    let panels = result_to_string(fetch_required_panels(&host.registry, required, policy).await)?;

    let mut out = Vec::with_capacity(required.len());
    for id in required {
        let path = panels.get(id).and_then(PanelDescriptor::component);
        let component = host.loader.load_panel(path).await;
        out.push(WorkspacePanel {
            id: id.clone(),
            component,
        });
    }
    Ok(out)
}

/// Backend plugin scripts run in their own webview; the label names the plugin.
#[tauri::command]
fn plugin_log(window: tauri::WebviewWindow, level: String, message: String) {
    log_plugin_message(window.label(), &level, &message);
}

#[tauri::command]
fn is_packaged(host: tauri::State<'_, SharedHost>) -> bool {
    host.mode.is_packaged()
}

fn config_path() -> PathBuf {
    match std::env::var(ENV_CONFIG) {
        Ok(path) => PathBuf::from(path),
        Err(_) => PathBuf::from(CONFIG_FILE_NAME),
    }
}

/// Never fails: a broken config or unknown directory degrades to defaults.
async fn start_host(app: &AppHandle) -> PanelHost {
    let cfg = HostConfig::load_or_default(&config_path());
    let mode = cfg.deployment_mode(!cfg!(debug_assertions));

    let app_root = cfg.paths.app_root.clone().unwrap_or_else(|| {
        std::env::current_dir().unwrap_or_else(|err| {
            log_error("resolving working directory", &err);
            PathBuf::from(".")
        })
    });
    let resources_dir = match cfg.paths.resources_dir.clone() {
        Some(dir) => dir,
        None => app.path().resource_dir().unwrap_or_else(|err| {
            log_error("resolving resource directory", &err);
            app_root.join("resources")
        }),
    };
    tracing::info!(
        mode = mode.as_str(),
        app_root = %app_root.display(),
        resources_dir = %resources_dir.display(),
        "starting panel host"
    );
    let layout = AppLayout {
        app_root: app_root.clone(),
        resources_dir: resources_dir.clone(),
    };

    let scanned = RegistryBuilder::new(FsPluginSource, mode, layout).build().await;
    let seeds = cfg.default_panels.into_iter().map(PanelDescriptor::from);
    let registry = RegistryChannel::new(seeds, &scanned).spawn();

    let module_base = if mode.is_packaged() {
        resources_dir.clone()
    } else {
        app_root
    };
    let loader = PanelLoader::new(FsModuleLoader::new(module_base), mode, resources_dir);

    PanelHost {
        registry,
        loader,
        workspace: cfg.workspace,
        mode,
    }
}

fn forward_registry_events(app: AppHandle, registry: &RegistryHandle) {
    let mut events = registry.subscribe();
    tauri::async_runtime::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let _ = app.emit(REGISTRY_CHANGED_EVENT, event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "dropped registry notifications");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

fn main() {
    panedeck_core::logging::init_logging();

    tauri::Builder::default()
        .setup(|app| {
            let host = tauri::async_runtime::block_on(start_host(app.handle()));
            forward_registry_events(app.handle().clone(), &host.registry);
            app.manage(Arc::new(host));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            get_registry,
            register_panel,
            unregister_panel,
            load_panel,
            open_workspace,
            plugin_log,
            is_packaged
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
