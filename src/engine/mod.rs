// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Adapters over the external scan tools.
//!
//! Each [`EngineKind`] is served by one adapter that knows how to invoke its
//! tool and how to parse the tool's output. Adapters are looked up through a
//! [`Registry`] so that adding an engine does not grow a conditional chain in
//! the scan service.

pub mod cmd;
pub mod fast_port_scan;
pub mod port_scan;
pub mod web_scan;

use std::{collections::BTreeMap, fmt::Display, time::Duration};

use async_trait::async_trait;

use crate::{
    config,
    models::{EngineKind, RawFinding},
};

/// Failure of a single engine invocation.
///
/// These are recovered locally by the scan service: a failing engine is
/// recorded on the job and never aborts its siblings.
#[derive(Debug)]
pub enum Error {
    /// The tool process could not be started
    ProcessStart(String),
    /// The invocation exceeded its timeout and was terminated
    Timeout(Duration),
    /// The tool exited non-zero without producing usable output
    NonZeroExit(Option<i32>),
    /// The tool produced output that could not be decoded
    UnparsableOutput(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ProcessStart(e) => write!(f, "unable to start scanner: {e}"),
            Error::Timeout(t) => write!(f, "scanner timed out after {}s", t.as_secs()),
            Error::NonZeroExit(Some(code)) => write!(f, "scanner exited with code {code}"),
            Error::NonZeroExit(None) => write!(f, "scanner was terminated by a signal"),
            Error::UnparsableOutput(e) => write!(f, "unable to decode scanner output: {e}"),
        }
    }
}

impl std::error::Error for Error {}

/// Capability of running a scan of a target and returning raw findings.
#[async_trait]
pub trait Adapter {
    /// Engine kind this adapter serves.
    fn kind(&self) -> EngineKind;

    /// Invokes the external tool and captures its output.
    async fn invoke(&self, target: &str, timeout: Duration) -> Result<String, Error>;

    /// Parses raw tool output into findings.
    ///
    /// Never fails: unparsable lines are skipped and output without any
    /// finding yields an empty sequence.
    fn parse(&self, output: &str) -> Vec<RawFinding>;

    /// Runs the engine end to end.
    async fn run(&self, target: &str, timeout: Duration) -> Result<Vec<RawFinding>, Error> {
        let output = self.invoke(target, timeout).await?;
        Ok(self.parse(&output))
    }
}

/// Adapter lookup keyed by engine kind.
#[derive(Default)]
pub struct Registry {
    adapters: BTreeMap<EngineKind, Box<dyn Adapter + Send + Sync>>,
}

impl Registry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a registry with the production tool bindings.
    pub fn with_defaults(config: &config::Scanner) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(port_scan::PortScan::new(&config.nmap)));
        registry.register(Box::new(fast_port_scan::FastPortScan::new(&config.masscan)));
        registry.register(Box::new(web_scan::WebScan::new(&config.nikto)));
        registry
    }

    /// Registers an adapter under its own kind, replacing any previous one.
    pub fn register(&mut self, adapter: Box<dyn Adapter + Send + Sync>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn get(&self, kind: EngineKind) -> Option<&(dyn Adapter + Send + Sync)> {
        self.adapters.get(&kind).map(Box::as_ref)
    }

    pub fn kinds(&self) -> impl Iterator<Item = EngineKind> + '_ {
        self.adapters.keys().copied()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("kinds", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}

type InvokeFn = Box<dyn Fn(&str) -> Result<String, Error> + Send + Sync>;
type ParseFn = Box<dyn Fn(&str) -> Vec<RawFinding> + Send + Sync>;

/// A closure based adapter for testing purposes.
pub struct Lambda {
    kind: EngineKind,
    invoke: InvokeFn,
    parse: ParseFn,
    calls: std::sync::atomic::AtomicUsize,
}

impl Lambda {
    /// Number of times `invoke` was called.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl Adapter for Lambda {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    async fn invoke(&self, target: &str, _timeout: Duration) -> Result<String, Error> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        (self.invoke)(target)
    }

    fn parse(&self, output: &str) -> Vec<RawFinding> {
        (self.parse)(output)
    }
}

/// Builder for [`Lambda`].
pub struct LambdaBuilder {
    kind: EngineKind,
    invoke: InvokeFn,
    parse: ParseFn,
}

impl LambdaBuilder {
    pub fn new(kind: EngineKind) -> Self {
        Self {
            kind,
            invoke: Box::new(|_| Ok(String::new())),
            parse: Box::new(|_| Vec::new()),
        }
    }

    pub fn with_invoke<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<String, Error> + Send + Sync + 'static,
    {
        self.invoke = Box::new(f);
        self
    }

    pub fn with_parse<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Vec<RawFinding> + Send + Sync + 'static,
    {
        self.parse = Box::new(f);
        self
    }

    pub fn build(self) -> Lambda {
        Lambda {
            kind: self.kind,
            invoke: self.invoke,
            parse: self.parse,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}
