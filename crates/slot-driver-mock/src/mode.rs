//! Operational modes for the mock wheel.
//!
//! - **Instant**: completes every move before `begin_move` returns
//! - **Realistic**: completes on a tokio task after a travel delay

use serde::{Deserialize, Serialize};

/// Operational modes for mock devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MockMode {
    /// Zero delays, deterministic - for unit tests
    #[default]
    Instant,
    /// Hardware-like timing - for integration tests
    Realistic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode() {
        assert_eq!(MockMode::default(), MockMode::Instant);
    }

    #[test]
    fn test_mode_from_config_string() {
        #[derive(Deserialize)]
        struct Holder {
            mode: MockMode,
        }
        let holder: Holder = toml::from_str("mode = \"realistic\"").unwrap();
        assert_eq!(holder.mode, MockMode::Realistic);
    }
}
