//! Configuration validation
//!
//! Validates Lightstrand configuration for correctness:
//! - At least one bridge, with unique names
//! - Non-empty address and username
//! - Strands have at least one socket, and all sockets fit one u32 range
//! - Timeouts are positive

use super::bridge_config::BridgeConfig;
use super::strand_config::StrandConfig;
use crate::StrandError;
use std::collections::HashSet;

/// One problem found in a configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub bridge: Option<String>,
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            bridge: None,
            field: field.into(),
            message: message.into(),
        }
    }

    fn with_bridge(mut self, bridge: impl Into<String>) -> Self {
        self.bridge = Some(bridge.into());
        self
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref bridge) = self.bridge {
            write!(f, "[{}] {}: {}", bridge, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ConfigIssue>>;

/// Validate a Lightstrand configuration
pub fn validate_config(config: &StrandConfig) -> ValidationResult {
    let mut issues = Vec::new();

    if config.bridges.is_empty() {
        issues.push(ConfigIssue::new(
            "bridges",
            "At least one bridge must be defined",
        ));
    }

    let mut seen_names = HashSet::new();
    for bridge in &config.bridges {
        if !seen_names.insert(&bridge.name) {
            issues.push(ConfigIssue::new(
                "bridges",
                format!("Duplicate bridge name: {}", bridge.name),
            ));
        }
        issues.extend(validate_bridge(bridge));
    }

    let total_sockets: u64 = config.bridges.iter().map(|b| u64::from(b.sockets)).sum();
    if total_sockets > u64::from(u32::MAX) {
        issues.push(ConfigIssue::new(
            "bridges",
            format!(
                "Total sockets across bridges ({}) exceed {}",
                total_sockets,
                u32::MAX
            ),
        ));
    }

    if config.aggregator.member_timeout_secs == Some(0) {
        issues.push(ConfigIssue::new(
            "aggregator.member_timeout_secs",
            "Timeout must be greater than 0 (omit it to wait forever)",
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

fn validate_bridge(bridge: &BridgeConfig) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();

    if bridge.name.is_empty() {
        issues.push(ConfigIssue::new("name", "Bridge name cannot be empty"));
    }
    if bridge.address.trim().is_empty() {
        issues.push(ConfigIssue::new("address", "Bridge address cannot be empty"));
    }
    if bridge.username.is_empty() || bridge.username == "$" {
        issues.push(ConfigIssue::new("username", "Bridge username cannot be empty"));
    }
    if bridge.sockets == 0 {
        issues.push(ConfigIssue::new(
            "sockets",
            "A strand needs at least one socket",
        ));
    }

    issues
        .into_iter()
        .map(|issue| issue.with_bridge(&bridge.name))
        .collect()
}

/// Validate configuration and return a Result
pub fn validate_config_result(config: &StrandConfig) -> crate::Result<()> {
    validate_config(config).map_err(|issues| {
        let messages: Vec<String> = issues.iter().map(|e| e.to_string()).collect();
        StrandError::Config(format!(
            "Configuration validation failed:\n  - {}",
            messages.join("\n  - ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(bridges: Vec<BridgeConfig>) -> StrandConfig {
        let mut config = StrandConfig::new();
        for bridge in bridges {
            config.add_bridge(bridge);
        }
        config
    }

    #[test]
    fn test_valid_config() {
        let config = config_with(vec![BridgeConfig::new("porch", "10.0.0.2", "user", 12)]);
        assert!(validate_config(&config).is_ok());
        assert!(validate_config_result(&config).is_ok());
    }

    #[test]
    fn test_empty_config() {
        let issues = validate_config(&StrandConfig::new()).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "bridges");
    }

    #[test]
    fn test_duplicate_names() {
        let config = config_with(vec![
            BridgeConfig::new("porch", "10.0.0.2", "user", 12),
            BridgeConfig::new("porch", "10.0.0.3", "user", 12),
        ]);
        let issues = validate_config(&config).unwrap_err();
        assert!(issues.iter().any(|i| i.message.contains("Duplicate bridge name")));
    }

    #[test]
    fn test_bridge_field_issues_are_tagged() {
        let config = config_with(vec![BridgeConfig::new("porch", " ", "", 0)]);
        let issues = validate_config(&config).unwrap_err();
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| i.bridge.as_deref() == Some("porch")));
        assert_eq!(
            issues[2].to_string(),
            "[porch] sockets: A strand needs at least one socket"
        );
    }

    #[test]
    fn test_total_sockets_must_fit() {
        let config = config_with(vec![
            BridgeConfig::new("porch", "10.0.0.2", "user", 4_000_000_000),
            BridgeConfig::new("garden", "10.0.0.3", "user", 500_000_000),
        ]);
        let issues = validate_config(&config).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("4500000000"));

        let config = config_with(vec![
            BridgeConfig::new("porch", "10.0.0.2", "user", u32::MAX - 1),
            BridgeConfig::new("garden", "10.0.0.3", "user", 1),
        ]);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = config_with(vec![BridgeConfig::new("porch", "10.0.0.2", "user", 12)]);
        config.aggregator.member_timeout_secs = Some(0);
        let err = validate_config_result(&config).unwrap_err();
        assert!(err.to_string().contains("aggregator.member_timeout_secs"));
    }
}
