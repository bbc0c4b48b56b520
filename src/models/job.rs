// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

use std::{
    collections::BTreeMap,
    fmt::Display,
    str::FromStr,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{engine::EngineKind, finding::Vulnerability, severity::Severity};

/// Phase of a scan job.
///
/// `Running` is the only initial state; `Completed` and `Failed` are
/// terminal, a job never leaves them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Running,
    Completed,
    Failed,
}

impl Phase {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_done(&self) -> bool {
        !self.is_running()
    }
}

impl FromStr for Phase {
    type Err = ();

    fn from_str(phase: &str) -> Result<Phase, ()> {
        match phase {
            "running" => Ok(Phase::Running),
            "completed" => Ok(Phase::Completed),
            "failed" => Ok(Phase::Failed),
            _ => Err(()),
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One execution of a scan request across one or more engines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanJob {
    /// Unique ID of the job
    pub id: String,
    /// Target the job scans
    pub target: String,
    /// Engines the request selected
    pub engines: Vec<EngineKind>,
    pub status: Phase,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Findings in the order engines completed, append-only while running
    pub findings: Vec<Vulnerability>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    /// Engines that failed without aborting the job
    pub engine_errors: BTreeMap<EngineKind, String>,
}

impl ScanJob {
    /// Creates a fresh job in the `Running` phase.
    ///
    /// Duplicate engine selections are collapsed, a scan request is a set.
    pub fn new(target: &str, engines: &[EngineKind]) -> Self {
        let mut unique = Vec::with_capacity(engines.len());
        for kind in engines {
            if !unique.contains(kind) {
                unique.push(*kind);
            }
        }
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            target: target.to_string(),
            engines: unique,
            status: Phase::Running,
            started_at: Utc::now(),
            completed_at: None,
            findings: Vec::new(),
            engine_errors: BTreeMap::new(),
        }
    }

    pub fn statistics(&self) -> ScanStatistics {
        ScanStatistics::from_findings(&self.findings)
    }
}

/// Counts of findings per severity tier, derived on demand
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatistics {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub total: usize,
}

impl ScanStatistics {
    pub fn from_findings(findings: &[Vulnerability]) -> Self {
        let mut stats = Self::default();
        for finding in findings {
            match finding.severity {
                Severity::Critical => stats.critical += 1,
                Severity::High => stats.high += 1,
                Severity::Medium => stats.medium += 1,
                Severity::Low => stats.low += 1,
                Severity::Info => stats.info += 1,
            }
            stats.total += 1;
        }
        stats
    }
}
