//! Shared types used across Stellar crates.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Unique, stable identifier of a monitored node.
pub type NodeId = String;

/// Role a node plays in the storage cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Storage,
    Compute,
    Gateway,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Storage => "storage",
            NodeType::Compute => "compute",
            NodeType::Gateway => "gateway",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "storage" => Ok(NodeType::Storage),
            "compute" => Ok(NodeType::Compute),
            "gateway" => Ok(NodeType::Gateway),
            other => Err(format!("unknown node type: {other}")),
        }
    }
}

/// Whether a value is a valid percentage in `[0, 100]`.
///
/// NaN is rejected.
pub fn is_percentage(value: f64) -> bool {
    (0.0..=100.0).contains(&value)
}

/// Parse a duration string like "500ms", "5s", "10m", "24h".
///
/// A bare integer is read as seconds. Returns `None` on anything else,
/// including values too large to represent.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else if let Some(hours) = s.strip_suffix('h') {
        hours
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|h| h.checked_mul(3600))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

/// Render a duration back into the shortest exact form `parse_duration` accepts.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis % 1000 != 0 {
        return format!("{millis}ms");
    }
    let secs = d.as_secs();
    if secs != 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_values() {
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("10m"), Some(Duration::from_secs(600)));
        assert_eq!(parse_duration("24h"), Some(Duration::from_secs(86_400)));
        assert_eq!(parse_duration("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("-5s"), None);
    }

    #[test]
    fn parse_duration_rejects_overflow() {
        assert_eq!(parse_duration("5124095576030432h"), None);
        assert_eq!(parse_duration("307445734561825861m"), None);
        assert_eq!(
            parse_duration("5124095576030431h"),
            Some(Duration::from_secs(5_124_095_576_030_431 * 3600))
        );
    }

    #[test]
    fn format_duration_is_parseable() {
        for s in ["250ms", "5s", "10m", "24h", "0s", "90s"] {
            let d = parse_duration(s).unwrap();
            assert_eq!(parse_duration(&format_duration(d)), Some(d));
        }
        assert_eq!(format_duration(Duration::from_secs(86_400)), "24h");
    }

    #[test]
    fn node_type_from_str() {
        assert_eq!("storage".parse::<NodeType>(), Ok(NodeType::Storage));
        assert_eq!(" Gateway ".parse::<NodeType>(), Ok(NodeType::Gateway));
        assert!("database".parse::<NodeType>().is_err());
    }

    #[test]
    fn percentage_bounds() {
        assert!(is_percentage(0.0));
        assert!(is_percentage(100.0));
        assert!(!is_percentage(100.1));
        assert!(!is_percentage(-0.5));
        assert!(!is_percentage(f64::NAN));
    }
}
