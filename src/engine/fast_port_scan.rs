// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

use std::time::Duration;

use async_trait::async_trait;

use super::{Adapter, Error, cmd};
use crate::models::{EngineKind, RawFinding};

/// High-rate port sweep backed by masscan.
///
/// Invoked as `masscan <target> --ports 1-65535 --rate 1000`. Findings are
/// the `Discovered open port <port>/<proto> on <ip>` lines; masscan does not
/// identify services, so classification falls back to the port heuristic.
#[derive(Debug, Clone)]
pub struct FastPortScan {
    path: String,
}

impl FastPortScan {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }
}

#[async_trait]
impl Adapter for FastPortScan {
    fn kind(&self) -> EngineKind {
        EngineKind::FastPortScan
    }

    async fn invoke(&self, target: &str, timeout: Duration) -> Result<String, Error> {
        cmd::capture(
            &self.path,
            &[target, "--ports", "1-65535", "--rate", "1000"],
            timeout,
        )
        .await
    }

    fn parse(&self, output: &str) -> Vec<RawFinding> {
        output.lines().filter_map(parse_line).collect()
    }
}

fn parse_line(line: &str) -> Option<RawFinding> {
    let rest = line.trim().strip_prefix("Discovered open port ")?;
    let (port, protocol) = rest.split_whitespace().next()?.split_once('/')?;
    Some(RawFinding {
        port: Some(port.parse().ok()?),
        protocol: protocol.parse().ok()?,
        service: None,
        product: None,
        description: line.trim().to_string(),
        score: None,
        severity_hint: None,
    })
}
