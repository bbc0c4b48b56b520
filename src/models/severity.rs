// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Severity tier of a normalized finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

/// Ports exposing plaintext-credential or remote-admin protocols (FTP, Telnet, RDP)
const CRITICAL_PORTS: &[u16] = &[21, 23, 3389];
/// Remote-shell, file-share and database ports
const HIGH_PORTS: &[u16] = &[22, 445, 1433, 3306, 5432];
/// Common web server ports
const MEDIUM_PORTS: &[u16] = &[80, 443, 8080, 8443];

impl Severity {
    /// Maps a CVSS base score (0.0-10.0) to a tier.
    ///
    /// Bands are inclusive on their lower bound, exactly 9.0 is Critical,
    /// exactly 7.0 is High.
    pub fn from_score(score: f64) -> Self {
        if score >= 9.0 {
            Self::Critical
        } else if score >= 7.0 {
            Self::High
        } else if score >= 4.0 {
            Self::Medium
        } else if score >= 0.1 {
            Self::Low
        } else {
            Self::Info
        }
    }

    /// Classifies an open port by a fixed policy table.
    ///
    /// Ports not listed in any table are Low; an open port is always at least
    /// worth reporting.
    pub fn from_port(port: u16) -> Self {
        if CRITICAL_PORTS.contains(&port) {
            Self::Critical
        } else if HIGH_PORTS.contains(&port) {
            Self::High
        } else if MEDIUM_PORTS.contains(&port) {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl FromStr for Severity {
    type Err = ();

    fn from_str(severity: &str) -> Result<Severity, ()> {
        match severity.to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            "info" => Ok(Severity::Info),
            _ => Err(()),
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
            Self::Info => write!(f, "info"),
        }
    }
}
