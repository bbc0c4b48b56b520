// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{engine::EngineKind, severity::Severity};

/// Protocol a port finding corresponds to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl FromStr for Protocol {
    type Err = ();

    fn from_str(protocol: &str) -> Result<Protocol, ()> {
        match protocol.to_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            _ => Err(()),
        }
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
        }
    }
}

/// Engine output before normalization.
///
/// A parser emits these from one tool invocation; the scan service turns each
/// into a [`Vulnerability`]. Raw findings are never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFinding {
    /// Port the finding was observed on, when the engine reports one
    pub port: Option<u16>,
    pub protocol: Protocol,
    /// Service name as reported by the engine, e.g. `ssh`
    pub service: Option<String>,
    /// Product and version string as reported by the engine
    pub product: Option<String>,
    /// Description, usually the raw output line
    pub description: String,
    /// Numeric score (0.0-10.0) when the engine reports one
    pub score: Option<f64>,
    /// Qualitative severity label reported by the engine itself
    pub severity_hint: Option<Severity>,
}

/// Workflow state of a vulnerability.
///
/// The engine path only ever produces `Open`; the other states are set by
/// workflow actions outside of this crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VulnStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
}

/// Normalized finding as attached to a scan job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    /// Unique ID of the finding
    pub id: String,
    /// Derived display name, e.g. `Open Port 22 - ssh`
    pub name: String,
    /// Target the finding belongs to
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub port: Option<u16>,
    pub protocol: Protocol,
    pub description: String,
    pub severity: Severity,
    pub status: VulnStatus,
    pub discovered_at: DateTime<Utc>,
    /// Engine that produced the finding
    pub engine: EngineKind,
}

impl Vulnerability {
    /// Normalizes a raw engine finding.
    ///
    /// Severity is resolved from the strongest available signal: a numeric
    /// score wins over an explicit engine label, which wins over the port
    /// heuristic. A finding without any signal is informational.
    pub fn normalize(target: &str, engine: EngineKind, raw: RawFinding) -> Self {
        let severity = match (raw.score, raw.severity_hint, raw.port) {
            (Some(score), _, _) => Severity::from_score(score),
            (None, Some(hint), _) => hint,
            (None, None, Some(port)) => Severity::from_port(port),
            (None, None, None) => Severity::Info,
        };
        let name = match raw.port {
            Some(port) => format!(
                "Open Port {} - {}",
                port,
                raw.service.as_deref().unwrap_or("Unknown Service")
            ),
            None => match engine {
                EngineKind::WebScan => "Web Vulnerability".to_string(),
                _ => "Unidentified Finding".to_string(),
            },
        };
        let description = describe(&raw);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            target: target.to_string(),
            port: raw.port,
            protocol: raw.protocol,
            description,
            severity,
            status: VulnStatus::Open,
            discovered_at: Utc::now(),
            engine,
        }
    }
}

/// Builds the description out of service, product and the raw line.
fn describe(raw: &RawFinding) -> String {
    let detail = [raw.service.as_deref(), raw.product.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let base = if raw.description.is_empty() {
        "Port is open"
    } else {
        raw.description.as_str()
    };
    if detail.is_empty() {
        base.to_string()
    } else {
        format!("{detail} - {base}")
    }
}
