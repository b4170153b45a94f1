//! Queue lanes.
//!
//! Jobs are partitioned into priority lanes, each drained by its own
//! worker. Severity-derived work (mail delivery) runs on the four priority
//! lanes; alert listeners and the failed-job monitor get dedicated lanes so
//! a flood of ordinary jobs cannot starve them.

use std::fmt;

use serde::{Deserialize, Serialize};

use opsdesk_alerts::Severity;

/// A queue lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    /// Most urgent severity-derived work.
    Critical,
    /// High-priority severity-derived work.
    High,
    /// Default lane for medium-priority work.
    Default,
    /// Throttleable low-priority work.
    Low,
    /// Dedicated lane for administrative alert listeners.
    Alerts,
    /// Dedicated lane for failed-job reports.
    Monitoring,
}

impl Lane {
    /// Returns the lane name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Default => "default",
            Self::Low => "low",
            Self::Alerts => "alerts",
            Self::Monitoring => "monitoring",
        }
    }

    /// Lane that severity-derived work (mail delivery) runs on.
    ///
    /// Medium folds into the default lane; the dedicated alerts and
    /// monitoring lanes are never severity-derived.
    #[must_use]
    pub const fn for_severity(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Self::Critical,
            Severity::High => Self::High,
            Severity::Medium => Self::Default,
            Severity::Low => Self::Low,
        }
    }

    /// All lanes, in priority order.
    #[must_use]
    pub const fn all() -> [Self; 6] {
        [
            Self::Critical,
            Self::High,
            Self::Default,
            Self::Low,
            Self::Alerts,
            Self::Monitoring,
        ]
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Severity::Critical, Lane::Critical ; "critical severity")]
    #[test_case(Severity::High, Lane::High ; "high severity")]
    #[test_case(Severity::Medium, Lane::Default ; "medium folds into default")]
    #[test_case(Severity::Low, Lane::Low ; "low severity")]
    fn severity_lane_mapping(severity: Severity, expected: Lane) {
        assert_eq!(Lane::for_severity(severity), expected);
    }

    #[test]
    fn lane_as_str() {
        assert_eq!(Lane::Critical.as_str(), "critical");
        assert_eq!(Lane::Alerts.as_str(), "alerts");
        assert_eq!(Lane::Monitoring.as_str(), "monitoring");
    }

    #[test]
    fn all_lanes_distinct() {
        let lanes = Lane::all();
        for (i, a) in lanes.iter().enumerate() {
            for b in &lanes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn lane_serialization_roundtrip() {
        for lane in Lane::all() {
            let json = serde_json::to_string(&lane);
            assert!(json.is_ok());
            let parsed: serde_json::Result<Lane> = serde_json::from_str(&json.unwrap());
            assert!(parsed.is_ok());
            assert_eq!(parsed.unwrap(), lane);
        }
    }
}
