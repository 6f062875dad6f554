//! Log forwarding for sandboxed backend plugin scripts.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl PluginLogLevel {
    /// Unknown levels are logged as `info`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "error" => PluginLogLevel::Error,
            "warn" | "warning" => PluginLogLevel::Warn,
            "debug" => PluginLogLevel::Debug,
            "trace" => PluginLogLevel::Trace,
            _ => PluginLogLevel::Info,
        }
    }
}

/// Writes a plugin's message into the host log, tagged with the plugin name.
pub fn log_plugin_message(plugin: &str, level: &str, message: &str) -> PluginLogLevel {
    let level = PluginLogLevel::parse(level);
    match level {
        PluginLogLevel::Error => tracing::error!(plugin, "{message}"),
        PluginLogLevel::Warn => tracing::warn!(plugin, "{message}"),
        PluginLogLevel::Info => tracing::info!(plugin, "{message}"),
        PluginLogLevel::Debug => tracing::debug!(plugin, "{message}"),
        PluginLogLevel::Trace => tracing::trace!(plugin, "{message}"),
    }
    level
}
