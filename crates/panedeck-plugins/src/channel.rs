//! The host-side owner of the panel registry.
//!
//! A single task holds the map and answers requests one at a time, so every
//! `register`/`unregister` is applied atomically in arrival order. Callers
//! only ever receive copies.

use crate::error::{PluginError, PluginResult};
use crate::events::RegistryEvent;
use crate::registry::PanelRegistry;
use panedeck_core::PanelSeed;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tokio::sync::{broadcast, mpsc, oneshot};

const REQUEST_QUEUE: usize = 64;
const EVENT_QUEUE: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelDescriptor {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PanelDescriptor {
    pub fn component(&self) -> Option<&str> {
        self.fields.get("component").and_then(Value::as_str)
    }
}

impl From<PanelSeed> for PanelDescriptor {
    fn from(seed: PanelSeed) -> Self {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String(seed.name));
        fields.insert("component".to_string(), Value::String(seed.component));
        fields.insert("position".to_string(), Value::String(seed.position));
        Self {
            id: seed.id,
            fields,
        }
    }
}

/// Panel configuration as submitted by a presentation context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnregisterResponse {
    pub success: bool,
}

enum Request {
    GetRegistry(oneshot::Sender<Vec<PanelDescriptor>>),
    Register(PanelConfig, oneshot::Sender<PluginResult<RegisterResponse>>),
    Unregister(String, oneshot::Sender<PluginResult<UnregisterResponse>>),
}

pub struct RegistryChannel {
    panels: BTreeMap<String, PanelDescriptor>,
    events: broadcast::Sender<RegistryEvent>,
}

impl RegistryChannel {
    /// Seeds go in first, scanned panels replace seeds with the same id.
    pub fn new<I>(seeds: I, scanned: &PanelRegistry) -> Self
    where
        I: IntoIterator<Item = PanelDescriptor>,
    {
        let mut panels: BTreeMap<String, PanelDescriptor> =
            seeds.into_iter().map(|d| (d.id.clone(), d)).collect();

        for (id, entry) in scanned.iter() {
            let mut fields = Map::new();
            fields.insert(
                "component".to_string(),
                Value::String(entry.path.to_string_lossy().into_owned()),
            );
            fields.insert("plugin".to_string(), Value::String(entry.plugin.clone()));
            panels.insert(
                id.clone(),
                PanelDescriptor {
                    id: id.clone(),
                    fields,
                },
            );
        }

        let (events, _) = broadcast::channel(EVENT_QUEUE);
        Self { panels, events }
    }

    pub fn get_registry(&self) -> Vec<PanelDescriptor> {
        self.panels.values().cloned().collect()
    }

    pub fn register(&mut self, config: PanelConfig) -> PluginResult<RegisterResponse> {
        let id = config
            .id
            .filter(|id| !id.is_empty())
            .ok_or(PluginError::MissingPanelId)?;
        tracing::info!(panel_id = %id, "registering panel");
        self.panels.insert(
            id.clone(),
            PanelDescriptor {
                id: id.clone(),
                fields: config.fields,
            },
        );
        let _ = self.events.send(RegistryEvent::Registered { id: id.clone() });
        Ok(RegisterResponse { success: true, id })
    }

    pub fn unregister(&mut self, panel_id: &str) -> PluginResult<UnregisterResponse> {
        if self.panels.remove(panel_id).is_none() {
            return Err(PluginError::PanelNotFound(panel_id.to_string()));
        }
        tracing::info!(panel_id = %panel_id, "unregistered panel");
        let _ = self.events.send(RegistryEvent::Unregistered {
            id: panel_id.to_string(),
        });
        Ok(UnregisterResponse { success: true })
    }

    /// Moves the registry onto its own task. Must be called inside a tokio runtime.
    pub fn spawn(self) -> RegistryHandle {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE);
        let events = self.events.clone();
        tokio::spawn(self.run(rx));
        RegistryHandle { tx, events }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Request>) {
        while let Some(request) = rx.recv().await {
            match request {
                Request::GetRegistry(reply) => {
                    tracing::debug!("getting ui panel registry");
                    let _ = reply.send(self.get_registry());
                }
                Request::Register(config, reply) => {
                    let _ = reply.send(self.register(config));
                }
                Request::Unregister(panel_id, reply) => {
                    let _ = reply.send(self.unregister(&panel_id));
                }
            }
        }
        tracing::debug!("registry channel stopped");
    }
}

/// Cloneable client of a spawned [`RegistryChannel`].
#[derive(Clone)]
pub struct RegistryHandle {
    tx: mpsc::Sender<Request>,
    events: broadcast::Sender<RegistryEvent>,
}

impl RegistryHandle {
    pub async fn get_registry(&self) -> PluginResult<Vec<PanelDescriptor>> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::GetRegistry(reply)).await?;
        rx.await.map_err(|_| PluginError::ChannelClosed)
    }

    pub async fn register(&self, config: PanelConfig) -> PluginResult<RegisterResponse> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Register(config, reply)).await?;
        rx.await.map_err(|_| PluginError::ChannelClosed)?
    }

    pub async fn unregister(&self, panel_id: &str) -> PluginResult<UnregisterResponse> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Unregister(panel_id.to_string(), reply))
            .await?;
        rx.await.map_err(|_| PluginError::ChannelClosed)?
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    async fn send(&self, request: Request) -> PluginResult<()> {
        self.tx
            .send(request)
            .await
            .map_err(|_| PluginError::ChannelClosed)
    }
}
