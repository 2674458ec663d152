//! Integration tests for Lightstrand
//!
//! These tests drive the full workflow from config loading through mapping
//! and multi-bridge aggregation, using in-memory bridges.

use hue::{BridgeCall, Controller, LastScan, LightId, LightState, MemoryBridge};
use lightstrand::config::{BridgeConfig, StrandConfig};
use lightstrand::multi::{AggregatorConfig, FailureKind, Member, MultiController};
use lightstrand::strand::{SignalStates, ValidationError};
use lightstrand::{LightStrand, SocketId, StrandError};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Oracle that replays canned answers, then answers ""
fn answers(values: &[&str]) -> impl FnMut() -> String + Send {
    let mut values: Vec<String> = values.iter().rev().map(|s| s.to_string()).collect();
    move || values.pop().unwrap_or_default()
}

fn ids(lights: &[hue::Light]) -> Vec<&str> {
    lights.iter().map(|l| l.id.as_str()).collect()
}

mod config_tests {
    use super::*;

    #[test]
    fn test_config_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("lightstrand").join("config.yaml");

        let mut config = StrandConfig::new();
        config.add_bridge(BridgeConfig::new("porch", "10.0.0.2", "$PORCH_USER", 12));
        config.add_bridge(BridgeConfig::new("garden", "http://10.0.0.3:8080", "abc", 8));
        config.aggregator.member_timeout_secs = Some(3);

        config.save(&config_path).unwrap();
        let loaded = StrandConfig::load(&config_path).unwrap();

        assert_eq!(loaded.bridge_names(), vec!["porch", "garden"]);
        assert_eq!(
            loaded.aggregator.to_aggregator_config().member_timeout,
            Some(Duration::from_secs(3))
        );
        assert!(lightstrand::config::validate_config(&loaded).is_ok());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = StrandConfig::new();
        config.add_bridge(BridgeConfig::new("porch", "", "abc", 0));

        let err = lightstrand::config::validate_config_result(&config).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("[porch] address"));
        assert!(message.contains("[porch] sockets"));
    }
}

mod mapping_tests {
    use super::*;

    #[tokio::test]
    async fn test_map_then_control_by_socket() {
        let bridge = Arc::new(MemoryBridge::with_lights(["A", "B"]));
        let strand = LightStrand::new(2, bridge.clone());

        let report = strand
            .map_unmapped_lights(answers(&["2", "1"]))
            .await
            .unwrap();
        assert_eq!(report.len(), 2);

        let signals = SignalStates::default();
        assert_eq!(
            bridge.calls().await,
            vec![
                BridgeCall::GetLights,
                BridgeCall::SetLightState(LightId::new("A"), signals.red.clone()),
                BridgeCall::SetLightState(LightId::new("A"), signals.white.clone()),
                BridgeCall::SetLightState(LightId::new("B"), signals.red.clone()),
                BridgeCall::SetLightState(LightId::new("B"), signals.white.clone()),
            ]
        );

        // Lights now answer to their sockets
        let lights = strand.get_lights().await.unwrap();
        assert_eq!(ids(&lights), vec!["2", "1"]);

        strand.set_light_name("1", "Doorway").await.unwrap();
        assert_eq!(bridge.name_of("B").await.as_deref(), Some("Doorway"));

        // Nothing left to map
        assert!(strand.unmapped_light_ids().await.unwrap().is_empty());
        let again = strand.map_unmapped_lights(answers(&[])).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_answer_aborts_session() {
        let bridge = Arc::new(MemoryBridge::with_lights(["A", "B"]));
        let strand = LightStrand::new(2, bridge.clone());

        let err = strand
            .map_unmapped_lights(answers(&["9"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StrandError::Validation(ValidationError::OutOfRange { value: 9, length: 2 })
        ));

        // The light stays red and nothing was committed
        assert!(strand.identity_map().await.is_empty());
        assert_eq!(
            bridge.state_of("A").await.and_then(|s| s.hue),
            SignalStates::default().red.hue
        );
        assert!(!bridge
            .calls()
            .await
            .iter()
            .any(|call| matches!(call, BridgeCall::SetLightState(id, _) if id.as_str() == "B")));

        // A later session picks up where this one stopped
        strand
            .map_unmapped_lights(answers(&["1", "2"]))
            .await
            .unwrap();
        let map = strand.identity_map().await;
        assert_eq!(map.get(SocketId::new(1).unwrap()), Some(&LightId::new("A")));
        assert_eq!(map.get(SocketId::new(2).unwrap()), Some(&LightId::new("B")));
    }

    #[tokio::test]
    async fn test_swapping_controller_keeps_mapping() {
        let first = Arc::new(MemoryBridge::with_lights(["A"]));
        let strand = LightStrand::new(1, first.clone());
        strand.map_unmapped_lights(answers(&["1"])).await.unwrap();

        let replacement = Arc::new(MemoryBridge::with_lights(["A"]));
        strand.set_controller(replacement.clone()).await;

        strand
            .set_light_state("1", &LightState::new().with_on(false))
            .await
            .unwrap();
        assert_eq!(
            replacement.state_of("A").await.and_then(|s| s.on),
            Some(false)
        );
    }
}

mod aggregation_tests {
    use super::*;

    #[tokio::test]
    async fn test_lights_concatenate_in_registration_order() {
        let first = Arc::new(MemoryBridge::with_lights(["1", "2"]));
        let second = Arc::new(MemoryBridge::with_lights(["7"]));
        let third = Arc::new(MemoryBridge::with_lights(["3", "4", "5"]));

        let multi = MultiController::new(
            vec![
                Member::passthrough("first", first),
                Member::passthrough("second", second),
                Member::passthrough("third", third),
            ],
            AggregatorConfig::default(),
        );

        let lights = multi.get_lights().await;
        assert!(lights.is_complete());
        assert_eq!(ids(&lights.value), vec!["1", "2", "7", "3", "4", "5"]);
    }

    #[tokio::test]
    async fn test_partial_failure_and_timeout_are_reported() {
        let healthy = Arc::new(MemoryBridge::with_lights(["1"]));
        let broken = Arc::new(MemoryBridge::with_lights(["2"]).failing("bridge rebooting"));
        let stalled = Arc::new(MemoryBridge::with_lights(["3"]).stalled());

        let multi = MultiController::new(
            vec![
                Member::passthrough("healthy", healthy),
                Member::passthrough("broken", broken),
                Member::passthrough("stalled", stalled),
            ],
            AggregatorConfig::default().with_member_timeout(Duration::from_millis(50)),
        );

        let lights = multi.get_lights().await;
        assert!(lights.is_partial());
        assert!(lights.timed_out());
        assert_eq!(ids(&lights.value), vec!["1"]);

        let members: Vec<&str> = lights.failures.iter().map(|f| f.member.as_str()).collect();
        assert_eq!(members, vec!["broken", "stalled"]);
        assert!(matches!(lights.failures[0].kind, FailureKind::Controller(_)));

        let err = lights.into_result().unwrap_err();
        assert!(err.to_string().starts_with("2 bridge(s) failed"));
    }

    #[tokio::test]
    async fn test_strands_share_one_socket_space() {
        let porch_bridge = Arc::new(MemoryBridge::with_lights(["P1", "P2"]));
        let porch = Arc::new(LightStrand::new(2, porch_bridge.clone()));
        porch.map_unmapped_lights(answers(&["1", "2"])).await.unwrap();

        let garden_bridge = Arc::new(MemoryBridge::with_lights(["G1", "G2", "G3"]));
        let garden = Arc::new(LightStrand::new(3, garden_bridge.clone()));
        garden
            .map_unmapped_lights(answers(&["3", "1", "2"]))
            .await
            .unwrap();

        let multi = MultiController::new(
            vec![Member::strand("porch", porch), Member::strand("garden", garden)],
            AggregatorConfig::default(),
        );
        assert_eq!(multi.total_sockets(), 5);
        assert_eq!(multi.socket_range("garden"), Some(3..=5));

        let lights = multi.get_lights().await.into_result().unwrap();
        assert_eq!(ids(&lights), vec!["1", "2", "5", "3", "4"]);

        // Global socket 3 is garden socket 1, which holds G2
        multi
            .set_light_state("3", &LightState::new().with_brightness(42))
            .await
            .unwrap();
        assert_eq!(
            garden_bridge.state_of("G2").await.and_then(|s| s.brightness),
            Some(42)
        );

        let err = multi.set_light_name("6", "Nowhere").await.unwrap_err();
        assert!(matches!(err, StrandError::UnknownSocket(ref id) if id == "6"));
    }

    #[tokio::test]
    async fn test_search_then_new_lights_reports_latest_scan() {
        let searched = Arc::new(MemoryBridge::with_lights(["1"]).with_new_lights(["1"]));
        let idle = Arc::new(MemoryBridge::with_lights(["2"]));

        let multi = MultiController::new(
            vec![
                Member::passthrough("searched", searched.clone()),
                Member::passthrough("idle", idle),
            ],
            AggregatorConfig::default(),
        );

        let before = multi.get_new_lights().await.into_result().unwrap();
        assert_eq!(before.last_scan, LastScan::Never);

        multi.search_for_new_lights().await.into_result().unwrap();
        assert!(searched
            .calls()
            .await
            .contains(&BridgeCall::SearchForNewLights));

        let after = multi.get_new_lights().await.into_result().unwrap();
        assert_eq!(ids(&after.lights), vec!["1"]);
        assert!(matches!(after.last_scan, LastScan::At(_)));
    }
}
