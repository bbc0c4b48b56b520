// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

use std::{
    fmt::{self, Display, Formatter},
    path::Path,
    time::Duration,
};

use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Scanner {
    /// Hard per-engine timeout; expiry terminates only that engine's process
    pub timeout: Duration,
    /// Executable used for the port_scan engine
    pub nmap: String,
    /// Executable used for the fast_port_scan engine
    pub masscan: String,
    /// Executable used for the web_scan engine
    pub nikto: String,
}

impl Default for Scanner {
    fn default() -> Self {
        Scanner {
            timeout: Duration::from_secs(300),
            nmap: "nmap".to_string(),
            masscan: "masscan".to_string(),
            nikto: "nikto".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Allowlist {
    /// Hostnames, IPs and IPv4 CIDR ranges that may be scanned.
    /// Scanning is disabled while this list is empty.
    #[serde(default)]
    pub targets: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub scanner: Scanner,
    #[serde(default)]
    pub allowlist: Allowlist,
}

impl Display for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", toml::to_string_pretty(self).unwrap_or_default())
    }
}

impl Config {
    fn load_etc() -> Option<Self> {
        let config = std::fs::read_to_string("/etc/scand/scand.toml").unwrap_or_default();
        toml::from_str(&config).ok()
    }

    fn load_user() -> Option<Self> {
        match std::env::var("HOME") {
            Ok(home) => {
                let path = format!("{}/.config/scand/scand.toml", home);
                let config = std::fs::read_to_string(path).unwrap_or_default();
                toml::from_str(&config).ok()
            }
            Err(_) => None,
        }
    }

    fn from_file<P>(path: P) -> Option<Self>
    where
        P: AsRef<Path>,
    {
        let config = std::fs::read_to_string(path).ok()?;
        toml::from_str(&config).ok()
    }

    /// Loads the configuration.
    ///
    /// An explicitly given file wins over the user configuration, which wins
    /// over `/etc/scand/scand.toml`; without any of them the defaults apply.
    pub fn load<P>(path: Option<P>) -> Self
    where
        P: AsRef<Path>,
    {
        path.and_then(Self::from_file)
            .or_else(Self::load_user)
            .or_else(Self::load_etc)
            .unwrap_or_default()
    }
}
