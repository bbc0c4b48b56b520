use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Kind of scan engine a request can select.
///
/// The concrete tool bound to a kind is an adapter detail, see the `engine`
/// module. The legacy tool names are accepted as aliases when parsing because
/// older clients addressed engines by executable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Service/version port scan (nmap)
    PortScan,
    /// High-rate port sweep (masscan)
    FastPortScan,
    /// Web vulnerability scan (nikto)
    WebScan,
}

impl EngineKind {
    /// All known engine kinds.
    pub const ALL: &'static [EngineKind] =
        &[Self::PortScan, Self::FastPortScan, Self::WebScan];
}

impl FromStr for EngineKind {
    type Err = ();

    fn from_str(kind: &str) -> Result<EngineKind, ()> {
        match kind.to_lowercase().as_str() {
            "port_scan" | "nmap" => Ok(EngineKind::PortScan),
            "fast_port_scan" | "masscan" => Ok(EngineKind::FastPortScan),
            "web_scan" | "nikto" => Ok(EngineKind::WebScan),
            _ => Err(()),
        }
    }
}

impl Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PortScan => write!(f, "port_scan"),
            Self::FastPortScan => write!(f, "fast_port_scan"),
            Self::WebScan => write!(f, "web_scan"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names_and_aliases() {
        assert_eq!("port_scan".parse(), Ok(EngineKind::PortScan));
        assert_eq!("nmap".parse(), Ok(EngineKind::PortScan));
        assert_eq!("masscan".parse(), Ok(EngineKind::FastPortScan));
        assert_eq!("NIKTO".parse(), Ok(EngineKind::WebScan));
        assert_eq!("nessus".parse::<EngineKind>(), Err(()));
    }

    #[test]
    fn display_roundtrips() {
        for kind in EngineKind::ALL {
            assert_eq!(kind.to_string().parse(), Ok(*kind));
        }
    }
}
