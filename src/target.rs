// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Scan target validation.
//!
//! Two gates run before any engine: a syntactic check on the target string
//! and the operator-configured allow-list. The allow-list denies everything
//! when it is empty, scanning has to be enabled explicitly.

use std::{
    net::{IpAddr, Ipv4Addr},
    str::FromStr,
};

/// Checks that a target is an IP literal, an IPv4 CIDR range or a hostname.
pub fn valid_grammar(target: &str) -> bool {
    IpAddr::from_str(target).is_ok() || parse_cidr(target).is_some() || valid_hostname(target)
}

fn valid_hostname(host: &str) -> bool {
    !host.is_empty()
        && host.len() <= 253
        && !host.starts_with('.')
        && !host.ends_with('.')
        && !host.starts_with('-')
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

fn parse_cidr(entry: &str) -> Option<(Ipv4Addr, u8)> {
    let (addr, prefix) = entry.split_once('/')?;
    let addr = Ipv4Addr::from_str(addr).ok()?;
    let prefix: u8 = prefix.parse().ok()?;
    if prefix > 32 {
        return None;
    }
    Some((addr, prefix))
}

fn cidr_contains(net: Ipv4Addr, prefix: u8, ip: Ipv4Addr) -> bool {
    if prefix == 0 {
        return true;
    }
    let mask = u32::MAX << (32 - prefix);
    u32::from(net) & mask == u32::from(ip) & mask
}

#[derive(Debug, Clone)]
struct Entry {
    raw: String,
    net: Option<(Ipv4Addr, u8)>,
}

/// Operator-configured set of targets that may be scanned.
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    entries: Vec<Entry>,
}

impl Allowlist {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(Into::into)
            .map(|raw| {
                let raw = raw.trim().to_string();
                let net = parse_cidr(&raw);
                Entry { raw, net }
            })
            .filter(|e| !e.raw.is_empty())
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a target may be scanned.
    ///
    /// An empty list denies all targets. A target matches an entry by exact
    /// name (case-insensitive) or, for IPv4 targets, by CIDR containment.
    pub fn is_allowed(&self, target: &str) -> bool {
        let target = target.trim();
        let ip = Ipv4Addr::from_str(target).ok();
        self.entries.iter().any(|entry| {
            if entry.raw.eq_ignore_ascii_case(target) {
                return true;
            }
            match (entry.net, ip) {
                (Some((net, prefix)), Some(ip)) => cidr_contains(net, prefix, ip),
                _ => false,
            }
        })
    }
}
