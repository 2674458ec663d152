//! A strand of lights addressed by socket position

use super::identity_map::{Displaced, IdentityMap};
use super::mapping::{MappingReport, MappingSession, SignalStates, SocketOracle};
use super::socket::{valid_socket_id, SocketId};
use crate::Result;
use async_trait::async_trait;
use hue::{Controller, Light, LightAttributes, LightId, LightState, NewLights};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};

/// Fixed-length strand of lights in front of one bridge
///
/// Holds the socket ⇄ light mapping for the strand and implements
/// [`Controller`] itself, with socket ids in place of light ids, so it can be
/// used wherever a bridge is expected.
pub struct LightStrand {
    controller: RwLock<Arc<dyn Controller>>,
    length: u32,
    lights: RwLock<IdentityMap>,
    signals: SignalStates,
    session: Mutex<()>,
}

impl LightStrand {
    /// Create a strand with `length` sockets delegating to `controller`
    pub fn new(length: u32, controller: Arc<dyn Controller>) -> Self {
        Self {
            controller: RwLock::new(controller),
            length,
            lights: RwLock::new(IdentityMap::new()),
            signals: SignalStates::default(),
            session: Mutex::new(()),
        }
    }

    /// Use custom signal states during mapping
    pub fn with_signals(mut self, signals: SignalStates) -> Self {
        self.signals = signals;
        self
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn signals(&self) -> &SignalStates {
        &self.signals
    }

    /// Change the bridge this strand delegates to
    pub async fn set_controller(&self, controller: Arc<dyn Controller>) {
        *self.controller.write().await = controller;
    }

    pub async fn controller(&self) -> Arc<dyn Controller> {
        Arc::clone(&*self.controller.read().await)
    }

    /// Snapshot of the current mapping
    pub async fn identity_map(&self) -> IdentityMap {
        self.lights.read().await.clone()
    }

    pub async fn light_for(&self, socket: SocketId) -> Option<LightId> {
        self.lights.read().await.get(socket).cloned()
    }

    pub fn valid_socket_id(&self, socket_id: &str) -> bool {
        valid_socket_id(socket_id, self.length)
    }

    /// Bridge lights not yet mapped to a socket, in bridge order
    pub async fn unmapped_light_ids(&self) -> Result<Vec<LightId>> {
        let controller = self.controller().await;
        let all_lights = controller.get_lights().await?;
        let mapped = self.lights.read().await.values();
        Ok(unmapped(all_lights, &mapped))
    }

    /// Interactively map every unmapped light
    ///
    /// See [`MappingSession`] for the protocol.
    pub async fn map_unmapped_lights<O: SocketOracle>(&self, oracle: O) -> Result<MappingReport> {
        MappingSession::new(self, oracle).run().await
    }

    pub(crate) async fn commit(&self, socket: SocketId, light: LightId) -> Displaced {
        self.lights.write().await.set(socket, light)
    }

    pub(crate) async fn lock_session(&self) -> MutexGuard<'_, ()> {
        self.session.lock().await
    }

    /// Resolve a socket id string to the bridge's light id
    async fn resolve(&self, socket_id: &str) -> hue::Result<LightId> {
        let socket = SocketId::parse(socket_id, self.length)
            .map_err(|_| hue::Error::LightNotFound(socket_id.to_string()))?;
        self.light_for(socket)
            .await
            .ok_or_else(|| hue::Error::LightNotFound(socket_id.to_string()))
    }

    /// Rewrite bridge light ids as socket ids, dropping unmapped lights
    async fn to_socket_space(&self, lights: Vec<Light>) -> Vec<Light> {
        let map = self.lights.read().await;
        let total = lights.len();
        let translated: Vec<Light> = lights
            .into_iter()
            .filter_map(|light| {
                let socket = map.socket_of(&light.id)?;
                Some(Light {
                    id: LightId::new(socket.to_string()),
                    ..light
                })
            })
            .collect();

        if translated.len() < total {
            tracing::debug!(
                omitted = total - translated.len(),
                "Omitting lights without a socket"
            );
        }
        translated
    }
}

fn unmapped(all_lights: Vec<Light>, mapped: &HashSet<LightId>) -> Vec<LightId> {
    all_lights
        .into_iter()
        .map(|light| light.id)
        .filter(|id| !mapped.contains(id))
        .collect()
}

#[async_trait]
impl Controller for LightStrand {
    async fn get_lights(&self) -> hue::Result<Vec<Light>> {
        let lights = self.controller().await.get_lights().await?;
        Ok(self.to_socket_space(lights).await)
    }

    /// New lights that already have a socket; the scan time passes through
    async fn get_new_lights(&self) -> hue::Result<NewLights> {
        let new_lights = self.controller().await.get_new_lights().await?;
        Ok(NewLights {
            lights: self.to_socket_space(new_lights.lights).await,
            last_scan: new_lights.last_scan,
        })
    }

    async fn search_for_new_lights(&self) -> hue::Result<()> {
        self.controller().await.search_for_new_lights().await
    }

    async fn get_light_attributes(&self, socket_id: &str) -> hue::Result<LightAttributes> {
        let light = self.resolve(socket_id).await?;
        self.controller()
            .await
            .get_light_attributes(light.as_str())
            .await
    }

    async fn set_light_name(&self, socket_id: &str, name: &str) -> hue::Result<()> {
        let light = self.resolve(socket_id).await?;
        self.controller()
            .await
            .set_light_name(light.as_str(), name)
            .await
    }

    async fn set_light_state(&self, socket_id: &str, state: &LightState) -> hue::Result<()> {
        let light = self.resolve(socket_id).await?;
        self.controller()
            .await
            .set_light_state(light.as_str(), state)
            .await
    }
}
