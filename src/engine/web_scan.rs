// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

use std::time::Duration;

use async_trait::async_trait;

use super::{Adapter, Error, cmd};
use crate::models::{EngineKind, RawFinding, Severity};

/// Markers nikto attaches to lines describing a vulnerability
const MARKERS: &[&str] = &["OSVDB", "VULN"];

/// Web vulnerability scan backed by nikto.
///
/// Invoked as `nikto -h <target> -o -` so the report lands on stdout. A line
/// is a finding iff it carries one of the reference-database markers; the
/// whole line becomes the description and the engine's own severity label
/// is reported as a hint.
#[derive(Debug, Clone)]
pub struct WebScan {
    path: String,
}

impl WebScan {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }
}

#[async_trait]
impl Adapter for WebScan {
    fn kind(&self) -> EngineKind {
        EngineKind::WebScan
    }

    async fn invoke(&self, target: &str, timeout: Duration) -> Result<String, Error> {
        cmd::capture(&self.path, &["-h", target, "-o", "-"], timeout).await
    }

    fn parse(&self, output: &str) -> Vec<RawFinding> {
        output
            .lines()
            .filter(|line| MARKERS.iter().any(|marker| line.contains(marker)))
            .map(|line| RawFinding {
                description: line.trim().to_string(),
                severity_hint: Some(Severity::High),
                ..Default::default()
            })
            .collect()
    }
}
