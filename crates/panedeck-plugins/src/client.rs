use crate::channel::{
    PanelConfig, PanelDescriptor, RegisterResponse, RegistryHandle, UnregisterResponse,
};
use crate::error::{PluginError, PluginResult};
use async_trait::async_trait;
use panedeck_core::WorkspaceConfig;
use std::collections::BTreeMap;
use std::time::Duration;

/// The registry operations available to a presentation context.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    async fn get_registry(&self) -> PluginResult<Vec<PanelDescriptor>>;
    async fn register(&self, config: PanelConfig) -> PluginResult<RegisterResponse>;
    async fn unregister(&self, panel_id: &str) -> PluginResult<UnregisterResponse>;
}

#[async_trait]
impl RegistryApi for RegistryHandle {
    async fn get_registry(&self) -> PluginResult<Vec<PanelDescriptor>> {
        RegistryHandle::get_registry(self).await
    }

    async fn register(&self, config: PanelConfig) -> PluginResult<RegisterResponse> {
        RegistryHandle::register(self, config).await
    }

    async fn unregister(&self, panel_id: &str) -> PluginResult<UnregisterResponse> {
        RegistryHandle::unregister(self, panel_id).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

impl From<&WorkspaceConfig> for RetryPolicy {
    fn from(cfg: &WorkspaceConfig) -> Self {
        Self {
            retries: cfg.fetch_retries,
            delay: Duration::from_millis(cfg.fetch_retry_delay_ms),
        }
    }
}

pub type PanelMap = BTreeMap<String, PanelDescriptor>;

/// Fetches the registry until every id in `required` is present.
///
/// The host may still be scanning when the first request arrives, so a
/// failed fetch or a missing panel is retried after `policy.delay`. Once the
/// retries are spent the last failure is returned.
pub async fn fetch_required_panels<A>(
    api: &A,
    required: &[String],
    policy: RetryPolicy,
) -> PluginResult<PanelMap>
where
    A: RegistryApi + ?Sized,
{
    let attempts = policy.retries.saturating_add(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        tracing::debug!(attempt, attempts, "fetching ui panel registry");

        let failure = match api.get_registry().await {
            Ok(panels) => {
                let map: PanelMap = panels.into_iter().map(|p| (p.id.clone(), p)).collect();
                let missing: Vec<String> = required
                    .iter()
                    .filter(|id| !map.contains_key(id.as_str()))
                    .cloned()
                    .collect();
                if missing.is_empty() {
                    return Ok(map);
                }
                tracing::warn!(missing = ?missing, "registry is missing required panels");
                PluginError::MissingPanels(missing)
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to fetch ui panel registry");
                let reason = match err {
                    PluginError::RegistryUnavailable(reason) => reason,
                    other => other.to_string(),
                };
                PluginError::RegistryUnavailable(reason)
            }
        };

        if attempt >= attempts {
            tracing::error!(attempts, error = %failure, "giving up on ui panel registry");
            return Err(failure);
        }
        tokio::time::sleep(policy.delay).await;
    }
}
