//! In-memory bridge
//!
//! Keeps lights in process and records every call made against it. Useful
//! for dry runs without hardware and as a test double.

use crate::{
    Controller, Error, LastScan, Light, LightAttributes, LightId, LightState, NewLights, Result,
};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

/// A call received by a [`MemoryBridge`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCall {
    GetLights,
    GetNewLights,
    SearchForNewLights,
    GetLightAttributes(LightId),
    SetLightName(LightId, String),
    SetLightState(LightId, LightState),
}

struct Inner {
    lights: Vec<Light>,
    new_lights: Vec<LightId>,
    last_scan: LastScan,
    calls: Vec<BridgeCall>,
    failure: Option<String>,
    /// State changes accepted before every further one is rejected
    set_state_budget: Option<usize>,
    stalled: bool,
}

/// Bridge that lives entirely in memory
pub struct MemoryBridge {
    inner: Mutex<Inner>,
}

impl Default for MemoryBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBridge {
    /// Create a bridge with no lights
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                lights: Vec::new(),
                new_lights: Vec::new(),
                last_scan: LastScan::Never,
                calls: Vec::new(),
                failure: None,
                set_state_budget: None,
                stalled: false,
            }),
        }
    }

    /// Create a bridge holding one light per id, in the given order
    pub fn with_lights<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut bridge = Self::new();
        for id in ids {
            let id = LightId::new(id);
            let mut light = Light::new(id.clone(), format!("Light {}", id));
            light.state = Some(LightState::new().with_on(true));
            bridge.inner.get_mut().lights.push(light);
        }
        bridge
    }

    /// Mark existing lights as found by the last search
    pub fn with_new_lights<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let inner = self.inner.get_mut();
        inner.new_lights = ids.into_iter().map(LightId::new).collect();
        self
    }

    pub fn with_last_scan(mut self, last_scan: LastScan) -> Self {
        self.inner.get_mut().last_scan = last_scan;
        self
    }

    /// Make every call fail with [`Error::Unavailable`]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.inner.get_mut().failure = Some(message.into());
        self
    }

    /// Accept `count` state changes, then reject the rest with [`Error::Unavailable`]
    ///
    /// Rejected calls are still recorded. Other operations keep working.
    pub fn fail_set_state_after(mut self, count: usize) -> Self {
        self.inner.get_mut().set_state_budget = Some(count);
        self
    }

    /// Make every call hang forever after being recorded
    pub fn stalled(mut self) -> Self {
        self.inner.get_mut().stalled = true;
        self
    }

    /// Calls received so far, oldest first
    pub async fn calls(&self) -> Vec<BridgeCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Current state of a light
    pub async fn state_of(&self, light_id: &str) -> Option<LightState> {
        let inner = self.inner.lock().await;
        inner
            .lights
            .iter()
            .find(|l| l.id.as_str() == light_id)
            .and_then(|l| l.state.clone())
    }

    /// Current name of a light
    pub async fn name_of(&self, light_id: &str) -> Option<String> {
        let inner = self.inner.lock().await;
        inner
            .lights
            .iter()
            .find(|l| l.id.as_str() == light_id)
            .map(|l| l.name.clone())
    }

    /// Record the call, then apply configured failure or stall behaviour
    async fn enter(&self, call: BridgeCall) -> Result<()> {
        let stalled = {
            let mut inner = self.inner.lock().await;
            inner.calls.push(call);
            if let Some(ref message) = inner.failure {
                return Err(Error::Unavailable(message.clone()));
            }
            inner.stalled
        };

        if stalled {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

#[async_trait]
impl Controller for MemoryBridge {
    async fn get_lights(&self) -> Result<Vec<Light>> {
        self.enter(BridgeCall::GetLights).await?;
        Ok(self.inner.lock().await.lights.clone())
    }

    async fn get_new_lights(&self) -> Result<NewLights> {
        self.enter(BridgeCall::GetNewLights).await?;
        let inner = self.inner.lock().await;
        let lights = inner
            .lights
            .iter()
            .filter(|l| inner.new_lights.contains(&l.id))
            .cloned()
            .collect();
        Ok(NewLights {
            lights,
            last_scan: inner.last_scan,
        })
    }

    async fn search_for_new_lights(&self) -> Result<()> {
        self.enter(BridgeCall::SearchForNewLights).await?;
        self.inner.lock().await.last_scan = LastScan::At(Utc::now().naive_utc());
        Ok(())
    }

    async fn get_light_attributes(&self, light_id: &str) -> Result<LightAttributes> {
        self.enter(BridgeCall::GetLightAttributes(LightId::new(light_id)))
            .await?;
        let inner = self.inner.lock().await;
        let light = inner
            .lights
            .iter()
            .find(|l| l.id.as_str() == light_id)
            .ok_or_else(|| Error::LightNotFound(light_id.to_string()))?;
        Ok(LightAttributes {
            state: light.state.clone().unwrap_or_default(),
            light_type: "Memory light".to_string(),
            name: light.name.clone(),
            model_id: "MEM001".to_string(),
            sw_version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    async fn set_light_name(&self, light_id: &str, name: &str) -> Result<()> {
        self.enter(BridgeCall::SetLightName(
            LightId::new(light_id),
            name.to_string(),
        ))
        .await?;
        let mut inner = self.inner.lock().await;
        let light = inner
            .lights
            .iter_mut()
            .find(|l| l.id.as_str() == light_id)
            .ok_or_else(|| Error::LightNotFound(light_id.to_string()))?;
        light.name = name.to_string();
        Ok(())
    }

    async fn set_light_state(&self, light_id: &str, state: &LightState) -> Result<()> {
        self.enter(BridgeCall::SetLightState(
            LightId::new(light_id),
            state.clone(),
        ))
        .await?;
        let mut inner = self.inner.lock().await;
        match inner.set_state_budget {
            Some(0) => {
                return Err(Error::Unavailable(format!(
                    "state change for light {} rejected",
                    light_id
                )))
            }
            Some(ref mut remaining) => *remaining -= 1,
            None => {}
        }
        let light = inner
            .lights
            .iter_mut()
            .find(|l| l.id.as_str() == light_id)
            .ok_or_else(|| Error::LightNotFound(light_id.to_string()))?;
        light.state.get_or_insert_with(LightState::new).apply(state);
        Ok(())
    }
}
