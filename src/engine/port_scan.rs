// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

use std::time::Duration;

use async_trait::async_trait;

use super::{Adapter, Error, cmd};
use crate::models::{EngineKind, RawFinding};

/// Service/version port scan backed by nmap.
///
/// Invoked as `nmap -sV -p- <target>`. A line is a finding iff its state
/// column (second whitespace token) is `open`; port and protocol come from
/// the leading `<port>/<proto>` field, service and product from the trailing
/// columns.
#[derive(Debug, Clone)]
pub struct PortScan {
    path: String,
}

impl PortScan {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }
}

#[async_trait]
impl Adapter for PortScan {
    fn kind(&self) -> EngineKind {
        EngineKind::PortScan
    }

    async fn invoke(&self, target: &str, timeout: Duration) -> Result<String, Error> {
        cmd::capture(&self.path, &["-sV", "-p-", target], timeout).await
    }

    fn parse(&self, output: &str) -> Vec<RawFinding> {
        output.lines().filter_map(parse_line).collect()
    }
}

fn parse_line(line: &str) -> Option<RawFinding> {
    let mut tokens = line.split_whitespace();
    let (port, protocol) = tokens.next()?.split_once('/')?;
    if tokens.next()? != "open" {
        return None;
    }
    let port = port.parse().ok()?;
    let protocol = protocol.parse().ok()?;
    let service = tokens.next().map(str::to_string);
    let product = tokens.collect::<Vec<_>>().join(" ");
    Some(RawFinding {
        port: Some(port),
        protocol,
        service,
        product: (!product.is_empty()).then_some(product),
        description: line.trim().to_string(),
        score: None,
        severity_hint: None,
    })
}
