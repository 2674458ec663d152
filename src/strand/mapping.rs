//! Interactive socket mapping
//!
//! Walks the unmapped lights of a strand one at a time, turns each one red,
//! asks an oracle (usually a person looking at the strand) which socket lit
//! up, records the answer and turns the light white again.
//!
//! The walk is strictly sequential: only one light may be signalling at a
//! time, otherwise the answer would be ambiguous.

use super::identity_map::Displaced;
use super::light_strand::LightStrand;
use super::socket::SocketId;
use crate::Result;
use async_trait::async_trait;
use hue::{LightId, LightState};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Light states used to signal a light during mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalStates {
    /// State of the light being identified
    #[serde(default = "default_red")]
    pub red: LightState,

    /// State a light returns to once mapped
    #[serde(default = "default_white")]
    pub white: LightState,
}

fn default_red() -> LightState {
    LightState::new()
        .with_brightness(255)
        .with_saturation(255)
        .with_hue(65535)
}

fn default_white() -> LightState {
    LightState::new().with_color_temp(1800)
}

impl Default for SignalStates {
    fn default() -> Self {
        Self {
            red: default_red(),
            white: default_white(),
        }
    }
}

/// Answers "which socket is the red light in?"
///
/// Called once per unmapped light. The answer is validated by the session,
/// so implementations return whatever the user typed.
#[async_trait]
pub trait SocketOracle: Send {
    async fn which_socket(&mut self, light: &LightId) -> String;
}

#[async_trait]
impl<F> SocketOracle for F
where
    F: FnMut() -> String + Send,
{
    async fn which_socket(&mut self, _light: &LightId) -> String {
        (self)()
    }
}

/// Where a mapping session currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingState {
    Idle,
    ComputingUnmapped,
    SignalRed(LightId),
    AwaitOracle(LightId),
    Validate(LightId),
    Commit(SocketId, LightId),
    SignalWhite(LightId),
    Done,
    Failed,
}

impl fmt::Display for MappingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingState::Idle => write!(f, "idle"),
            MappingState::ComputingUnmapped => write!(f, "computing_unmapped"),
            MappingState::SignalRed(light) => write!(f, "signal_red({})", light),
            MappingState::AwaitOracle(light) => write!(f, "await_oracle({})", light),
            MappingState::Validate(light) => write!(f, "validate({})", light),
            MappingState::Commit(socket, light) => write!(f, "commit({} -> {})", socket, light),
            MappingState::SignalWhite(light) => write!(f, "signal_white({})", light),
            MappingState::Done => write!(f, "done"),
            MappingState::Failed => write!(f, "failed"),
        }
    }
}

/// One light committed by a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedLight {
    pub socket: SocketId,
    pub light: LightId,
    pub displaced: Displaced,
}

/// Outcome of a completed session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingReport {
    pub mapped: Vec<MappedLight>,
}

impl MappingReport {
    pub fn len(&self) -> usize {
        self.mapped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapped.is_empty()
    }
}

/// A single run of the mapping protocol against one strand
///
/// Failures abort the run immediately. Lights committed before the failure
/// stay mapped, so running a new session resumes with whatever is left.
/// Sessions on the same strand are serialized.
pub struct MappingSession<'a, O> {
    strand: &'a LightStrand,
    oracle: O,
    state: MappingState,
    report: MappingReport,
}

impl<'a, O: SocketOracle> MappingSession<'a, O> {
    pub fn new(strand: &'a LightStrand, oracle: O) -> Self {
        Self {
            strand,
            oracle,
            state: MappingState::Idle,
            report: MappingReport::default(),
        }
    }

    pub fn state(&self) -> &MappingState {
        &self.state
    }

    /// Lights committed so far by this session
    pub fn report(&self) -> &MappingReport {
        &self.report
    }

    /// Run the protocol to completion
    pub async fn run(&mut self) -> Result<MappingReport> {
        let strand = self.strand;
        let _session = strand.lock_session().await;

        match self.map_all().await {
            Ok(()) => {
                self.transition(MappingState::Done);
                info!(mapped = self.report.len(), "Mapping session complete");
                Ok(self.report.clone())
            }
            Err(e) => {
                self.transition(MappingState::Failed);
                warn!(
                    error = %e,
                    mapped = self.report.len(),
                    "Mapping session aborted"
                );
                Err(e)
            }
        }
    }

    async fn map_all(&mut self) -> Result<()> {
        self.transition(MappingState::ComputingUnmapped);
        let unmapped = self.strand.unmapped_light_ids().await?;
        info!(
            unmapped = unmapped.len(),
            length = self.strand.length(),
            "Starting mapping session"
        );

        let controller = self.strand.controller().await;
        let signals = self.strand.signals().clone();

        for light in unmapped {
            self.transition(MappingState::SignalRed(light.clone()));
            controller
                .set_light_state(light.as_str(), &signals.red)
                .await?;

            self.transition(MappingState::AwaitOracle(light.clone()));
            let answer = self.oracle.which_socket(&light).await;

            self.transition(MappingState::Validate(light.clone()));
            let socket = SocketId::parse(&answer, self.strand.length())?;

            self.transition(MappingState::Commit(socket, light.clone()));
            let displaced = self.strand.commit(socket, light.clone()).await;
            if !displaced.is_empty() {
                warn!(
                    socket = %socket,
                    light = %light,
                    previous_light = ?displaced.previous_light,
                    evicted_socket = ?displaced.evicted_socket,
                    "Mapping replaced an existing entry"
                );
            }
            self.report.mapped.push(MappedLight {
                socket,
                light: light.clone(),
                displaced,
            });

            self.transition(MappingState::SignalWhite(light.clone()));
            controller
                .set_light_state(light.as_str(), &signals.white)
                .await?;
        }

        Ok(())
    }

    fn transition(&mut self, next: MappingState) {
        debug!(from = %self.state, to = %next, "Mapping state change");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StrandError;
    use hue::{BridgeCall, MemoryBridge};
    use std::sync::Arc;

    fn answers(values: &[&str]) -> impl FnMut() -> String + Send {
        let mut values: Vec<String> = values.iter().rev().map(|s| s.to_string()).collect();
        move || values.pop().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_maps_all_lights_in_order() {
        let bridge = Arc::new(MemoryBridge::with_lights(["L1", "L2"]));
        let strand = LightStrand::new(2, bridge.clone());

        let report = strand.map_unmapped_lights(answers(&["2", "1"])).await.unwrap();
        assert_eq!(report.len(), 2);

        let map = strand.identity_map().await;
        assert_eq!(map.get(SocketId::new(2).unwrap()), Some(&LightId::new("L1")));
        assert_eq!(map.get(SocketId::new(1).unwrap()), Some(&LightId::new("L2")));

        let signals = SignalStates::default();
        assert_eq!(
            bridge.calls().await,
            vec![
                BridgeCall::GetLights,
                BridgeCall::SetLightState(LightId::new("L1"), signals.red.clone()),
                BridgeCall::SetLightState(LightId::new("L1"), signals.white.clone()),
                BridgeCall::SetLightState(LightId::new("L2"), signals.red),
                BridgeCall::SetLightState(LightId::new("L2"), signals.white),
            ]
        );
    }

    #[tokio::test]
    async fn test_out_of_range_answer_aborts_without_commit() {
        let bridge = Arc::new(MemoryBridge::with_lights(["L1", "L2"]));
        let strand = LightStrand::new(2, bridge.clone());

        let mut session = MappingSession::new(&strand, answers(&["9"]));
        let result = session.run().await;

        assert!(matches!(result, Err(StrandError::Validation(_))));
        assert_eq!(session.state(), &MappingState::Failed);
        assert!(strand.identity_map().await.is_empty());

        // left red, white restore never ran
        let red = SignalStates::default().red;
        assert_eq!(
            bridge.calls().await,
            vec![
                BridgeCall::GetLights,
                BridgeCall::SetLightState(LightId::new("L1"), red.clone()),
            ]
        );
        assert_eq!(bridge.state_of("L1").await.unwrap().hue, red.hue);
    }

    #[tokio::test]
    async fn test_failure_keeps_earlier_commits_and_resumes() {
        let bridge = Arc::new(MemoryBridge::with_lights(["L1", "L2", "L3"]));
        let strand = LightStrand::new(3, bridge.clone());

        let result = strand.map_unmapped_lights(answers(&["3", "abc"])).await;
        assert!(result.is_err());
        assert_eq!(strand.identity_map().await.len(), 1);

        let report = strand.map_unmapped_lights(answers(&["1", "2"])).await.unwrap();
        let lights: Vec<&str> = report.mapped.iter().map(|m| m.light.as_str()).collect();
        assert_eq!(lights, vec!["L2", "L3"]);
        assert_eq!(strand.identity_map().await.len(), 3);
    }

    #[tokio::test]
    async fn test_controller_failure_aborts() {
        let bridge = Arc::new(MemoryBridge::with_lights(["L1"]).failing("offline"));
        let strand = LightStrand::new(1, bridge);

        let result = strand.map_unmapped_lights(answers(&["1"])).await;
        assert!(matches!(
            result,
            Err(StrandError::Controller(hue::Error::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_red_signal_failure_keeps_earlier_commits() {
        // red + white for L1 succeed, red for L2 is rejected
        let bridge = Arc::new(MemoryBridge::with_lights(["L1", "L2"]).fail_set_state_after(2));
        let strand = LightStrand::new(2, bridge.clone());

        let mut session = MappingSession::new(&strand, answers(&["2", "1"]));
        let result = session.run().await;

        assert!(matches!(
            result,
            Err(StrandError::Controller(hue::Error::Unavailable(_)))
        ));
        assert_eq!(session.state(), &MappingState::Failed);
        assert_eq!(session.report().len(), 1);

        let map = strand.identity_map().await;
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(SocketId::new(2).unwrap()), Some(&LightId::new("L1")));
        assert!(!map.contains_light(&LightId::new("L2")));
    }

    #[tokio::test]
    async fn test_white_signal_failure_keeps_commit() {
        // red for L1 succeeds, white for L1 is rejected after the commit
        let bridge = Arc::new(MemoryBridge::with_lights(["L1", "L2"]).fail_set_state_after(1));
        let strand = LightStrand::new(2, bridge.clone());

        let result = strand.map_unmapped_lights(answers(&["2", "1"])).await;
        assert!(matches!(result, Err(StrandError::Controller(_))));

        let map = strand.identity_map().await;
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(SocketId::new(2).unwrap()), Some(&LightId::new("L1")));

        let signals = SignalStates::default();
        assert_eq!(
            bridge.calls().await,
            vec![
                BridgeCall::GetLights,
                BridgeCall::SetLightState(LightId::new("L1"), signals.red),
                BridgeCall::SetLightState(LightId::new("L1"), signals.white),
            ]
        );
    }

    #[tokio::test]
    async fn test_nothing_to_map() {
        let bridge = Arc::new(MemoryBridge::with_lights(["L1"]));
        let strand = LightStrand::new(1, bridge.clone());
        strand.map_unmapped_lights(answers(&["1"])).await.unwrap();

        let mut session = MappingSession::new(&strand, answers(&[]));
        let report = session.run().await.unwrap();
        assert!(report.is_empty());
        assert_eq!(session.state(), &MappingState::Done);
    }

    #[tokio::test]
    async fn test_custom_signals() {
        let bridge = Arc::new(MemoryBridge::with_lights(["L1"]));
        let signals = SignalStates {
            red: LightState::new().with_hue(0),
            white: LightState::new().with_color_temp(250),
        };
        let strand = LightStrand::new(1, bridge.clone()).with_signals(signals);
        strand.map_unmapped_lights(answers(&["1"])).await.unwrap();

        assert_eq!(bridge.state_of("L1").await.unwrap().color_temp, Some(250));
    }

    #[tokio::test]
    async fn test_oracle_sees_light_id() {
        struct Recording(Arc<std::sync::Mutex<Vec<LightId>>>);

        #[async_trait]
        impl SocketOracle for Recording {
            async fn which_socket(&mut self, light: &LightId) -> String {
                let mut seen = self.0.lock().unwrap();
                seen.push(light.clone());
                seen.len().to_string()
            }
        }

        let bridge = Arc::new(MemoryBridge::with_lights(["L1", "L2"]));
        let strand = LightStrand::new(2, bridge);
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        strand
            .map_unmapped_lights(Recording(seen.clone()))
            .await
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![LightId::new("L1"), LightId::new("L2")]
        );
    }
}
