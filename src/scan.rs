// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Coordinates scans across the requested engines.
//!
//! Engines run as independent tasks; a failing engine is recorded on the job
//! and never aborts its siblings. Only request validation and persistence
//! faults fail the operation as a whole.

use std::{fmt::Display, sync::Arc, time::Duration};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::{
    config,
    engine::{self, Registry},
    models::{EngineKind, Phase, ScanJob, ScanStatistics, Vulnerability},
    storage::{self, Storage},
    target::{self, Allowlist},
};

#[derive(Debug)]
pub enum Error {
    /// The request was rejected before a job was created
    InvalidRequest(String),
    /// Job to handle is not found in the store
    NotFound,
    /// The store failed; the job, if created, was marked failed
    Storage(storage::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidRequest(reason) => write!(f, "invalid scan request: {reason}"),
            Error::NotFound => write!(f, "scan job was not found"),
            Error::Storage(e) => write!(f, "storage error occurred: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<storage::Error> for Error {
    fn from(value: storage::Error) -> Self {
        match value {
            storage::Error::NotFound => Self::NotFound,
            value => Self::Storage(value),
        }
    }
}

/// A scan request as submitted by a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Host, IP or CIDR range to scan
    pub target: String,
    /// Engines to run against the target
    pub engines: Vec<EngineKind>,
}

/// The externally callable scan operation.
///
/// Holds the persistence port, the adapter registry and the allow-list.
/// Everything behind it is swappable; tests wire an in-memory store and
/// closure adapters.
#[derive(Debug)]
pub struct ScanService<DB> {
    db: DB,
    registry: Arc<Registry>,
    allowlist: Allowlist,
    timeout: Duration,
}

impl<DB> ScanService<DB>
where
    DB: Storage + Send + Sync + 'static,
{
    pub fn new(db: DB, registry: Arc<Registry>, allowlist: Allowlist, timeout: Duration) -> Self {
        Self {
            db,
            registry,
            allowlist,
            timeout,
        }
    }

    /// Wires the production adapters out of a configuration.
    pub fn from_config(db: DB, config: &config::Config) -> Self {
        Self::new(
            db,
            Arc::new(Registry::with_defaults(&config.scanner)),
            Allowlist::new(config.allowlist.targets.iter().cloned()),
            config.scanner.timeout,
        )
    }

    /// Rejects a request before any job record exists or any adapter runs.
    fn validate(&self, request: &ScanRequest) -> Result<(), Error> {
        let target = request.target.trim();
        if target.is_empty() {
            return Err(Error::InvalidRequest("missing target".to_string()));
        }
        if !target::valid_grammar(target) {
            return Err(Error::InvalidRequest(format!(
                "target {target} is not a valid IP, CIDR range or hostname"
            )));
        }
        if !self.allowlist.is_allowed(target) {
            return Err(Error::InvalidRequest(format!(
                "target {target} is not allow-listed"
            )));
        }
        if request.engines.is_empty() {
            return Err(Error::InvalidRequest(
                "at least one engine is required".to_string(),
            ));
        }
        for kind in &request.engines {
            if self.registry.get(*kind).is_none() {
                return Err(Error::InvalidRequest(format!("unknown engine {kind}")));
            }
        }
        Ok(())
    }

    /// Runs a scan to completion and returns the finished job.
    pub async fn start_scan(&self, request: ScanRequest) -> Result<ScanJob, Error> {
        self.validate(&request)?;
        let job = ScanJob::new(request.target.trim(), &request.engines);
        let id = job.id.clone();
        self.db.insert_job(job).await?;
        tracing::info!(%id, target = %request.target, "scan started");
        if let Err(e) = self.execute(&id, &request).await {
            tracing::warn!(%id, %e, "scan failed, marking job as failed");
            // best effort, the store already failed once
            let _ = self
                .db
                .update_status(&id, Phase::Failed, Some(Utc::now()))
                .await;
            return Err(e.into());
        }
        Ok(self.db.get_job(&id).await?)
    }

    /// Creates the job record and runs the scan in the background.
    ///
    /// Returns the job id immediately; progress and results are retrievable
    /// through [`Self::get_job`].
    pub async fn start_scan_detached(self: Arc<Self>, request: ScanRequest) -> Result<String, Error> {
        self.validate(&request)?;
        let job = ScanJob::new(request.target.trim(), &request.engines);
        let id = job.id.clone();
        self.db.insert_job(job).await?;
        tracing::info!(%id, target = %request.target, "scan started in background");
        let service = Arc::clone(&self);
        let job_id = id.clone();
        tokio::spawn(async move {
            if let Err(e) = service.execute(&job_id, &request).await {
                tracing::warn!(%job_id, %e, "scan failed, marking job as failed");
                let _ = service
                    .db
                    .update_status(&job_id, Phase::Failed, Some(Utc::now()))
                    .await;
            }
        });
        Ok(id)
    }

    /// Returns the job with the given id.
    pub async fn get_job(&self, id: &str) -> Result<ScanJob, Error> {
        Ok(self.db.get_job(id).await?)
    }

    /// Returns the ids of all stored jobs.
    pub async fn get_job_ids(&self) -> Result<Vec<String>, Error> {
        Ok(self.db.get_job_ids().await?)
    }

    /// Returns the per-tier finding counts of a job.
    pub async fn get_statistics(&self, id: &str) -> Result<ScanStatistics, Error> {
        let job = self.db.get_job(id).await?;
        Ok(job.statistics())
    }

    /// Dispatches every requested engine, merges their findings and marks the
    /// job completed.
    ///
    /// Engines run concurrently and are merged in completion order; findings
    /// within one engine keep the order its parser emitted them. Engine
    /// failures land in the job's error map, only store failures bubble up.
    async fn execute(&self, id: &str, request: &ScanRequest) -> Result<(), storage::Error> {
        let target = request.target.trim().to_string();
        let mut tasks = JoinSet::new();
        let mut dispatched = Vec::new();
        for kind in request.engines.iter().copied() {
            if dispatched.contains(&kind) {
                continue;
            }
            dispatched.push(kind);
            let registry = Arc::clone(&self.registry);
            let target = target.clone();
            let timeout = self.timeout;
            tasks.spawn(async move {
                let result = match registry.get(kind) {
                    Some(adapter) => adapter.run(&target, timeout).await,
                    // validated upfront, a vanished adapter is still an engine failure
                    None => Err(engine::Error::ProcessStart(format!(
                        "no adapter registered for {kind}"
                    ))),
                };
                (kind, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((kind, Ok(raw_findings))) => {
                    let findings = raw_findings
                        .into_iter()
                        .map(|raw| Vulnerability::normalize(&target, kind, raw))
                        .collect::<Vec<_>>();
                    tracing::debug!(%id, engine = %kind, count = findings.len(), "engine finished");
                    self.db.append_findings(id, findings).await?;
                }
                Ok((kind, Err(e))) => {
                    tracing::warn!(%id, engine = %kind, %e, "engine failed");
                    self.db.append_engine_error(id, kind, e.to_string()).await?;
                }
                Err(e) => {
                    tracing::warn!(%id, %e, "engine task aborted");
                }
            }
        }

        self.db
            .update_status(id, Phase::Completed, Some(Utc::now()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use tracing_test::traced_test;

    use super::*;
    use crate::{
        engine::{Lambda, LambdaBuilder},
        models::RawFinding,
        storage::inmemory,
    };

    const TARGET: &str = "scanme.example.com";

    fn port_findings(ports: &[u16]) -> Vec<RawFinding> {
        ports
            .iter()
            .map(|port| RawFinding {
                port: Some(*port),
                description: format!("{port}/tcp open"),
                ..Default::default()
            })
            .collect()
    }

    fn failing(kind: EngineKind) -> Lambda {
        LambdaBuilder::new(kind)
            .with_invoke(|_| Err(engine::Error::NonZeroExit(Some(1))))
            .build()
    }

    fn service_with(adapters: Vec<Lambda>) -> ScanService<inmemory::Storage> {
        let mut registry = Registry::new();
        for adapter in adapters {
            registry.register(Box::new(adapter));
        }
        ScanService::new(
            inmemory::Storage::default(),
            Arc::new(registry),
            Allowlist::new([TARGET]),
            Duration::from_secs(5),
        )
    }

    fn request(engines: &[EngineKind]) -> ScanRequest {
        ScanRequest {
            target: TARGET.to_string(),
            engines: engines.to_vec(),
        }
    }

    mod validation {
        use super::*;

        #[traced_test]
        #[tokio::test]
        async fn empty_engine_set_creates_no_job() {
            let service = service_with(vec![LambdaBuilder::new(EngineKind::PortScan).build()]);
            match service.start_scan(request(&[])).await {
                Err(Error::InvalidRequest(_)) => {}
                other => panic!("expected InvalidRequest, got {other:?}"),
            }
            assert!(service.get_job_ids().await.unwrap().is_empty());
        }

        #[traced_test]
        #[tokio::test]
        async fn missing_target_is_rejected() {
            let service = service_with(vec![LambdaBuilder::new(EngineKind::PortScan).build()]);
            let req = ScanRequest {
                target: "  ".to_string(),
                engines: vec![EngineKind::PortScan],
            };
            assert!(matches!(
                service.start_scan(req).await,
                Err(Error::InvalidRequest(_))
            ));
        }

        #[traced_test]
        #[tokio::test]
        async fn disallowed_target_never_invokes_an_adapter() {
            let calls = Arc::new(AtomicUsize::new(0));
            let spy_calls = Arc::clone(&calls);
            let spy = LambdaBuilder::new(EngineKind::PortScan)
                .with_invoke(move |_| {
                    spy_calls.fetch_add(1, Ordering::SeqCst);
                    Ok(String::new())
                })
                .build();
            let mut registry = Registry::new();
            registry.register(Box::new(spy));
            // no allow-list configured: deny all
            let service = ScanService::new(
                inmemory::Storage::default(),
                Arc::new(registry),
                Allowlist::default(),
                Duration::from_secs(5),
            );
            let req = ScanRequest {
                target: "10.0.0.5".to_string(),
                engines: vec![EngineKind::PortScan],
            };
            assert!(matches!(
                service.start_scan(req).await,
                Err(Error::InvalidRequest(_))
            ));
            assert_eq!(calls.load(Ordering::SeqCst), 0);
            assert!(service.get_job_ids().await.unwrap().is_empty());
        }

        #[traced_test]
        #[tokio::test]
        async fn unregistered_engine_is_rejected() {
            let service = service_with(vec![LambdaBuilder::new(EngineKind::PortScan).build()]);
            assert!(matches!(
                service.start_scan(request(&[EngineKind::WebScan])).await,
                Err(Error::InvalidRequest(_))
            ));
        }
    }

    mod execution {
        use super::*;

        #[traced_test]
        #[tokio::test]
        async fn one_failing_engine_does_not_abort_the_others() {
            let port = LambdaBuilder::new(EngineKind::PortScan)
                .with_parse(|_| port_findings(&[22]))
                .build();
            let web = LambdaBuilder::new(EngineKind::WebScan)
                .with_parse(|_| {
                    vec![RawFinding {
                        description: "VULN: something".to_string(),
                        ..Default::default()
                    }]
                })
                .build();
            let service = service_with(vec![port, failing(EngineKind::FastPortScan), web]);
            let job = service
                .start_scan(request(&[
                    EngineKind::PortScan,
                    EngineKind::FastPortScan,
                    EngineKind::WebScan,
                ]))
                .await
                .unwrap();
            assert_eq!(job.status, Phase::Completed);
            assert_eq!(job.findings.len(), 2);
            assert_eq!(job.engine_errors.len(), 1);
            assert!(job.engine_errors.contains_key(&EngineKind::FastPortScan));
        }

        #[traced_test]
        #[tokio::test]
        async fn all_engines_failing_still_completes_the_job() {
            let service = service_with(vec![
                failing(EngineKind::PortScan),
                failing(EngineKind::WebScan),
            ]);
            let job = service
                .start_scan(request(&[EngineKind::PortScan, EngineKind::WebScan]))
                .await
                .unwrap();
            assert_eq!(job.status, Phase::Completed);
            assert!(job.completed_at.is_some());
            assert!(job.findings.is_empty());
            assert_eq!(job.engine_errors.len(), 2);
        }

        #[traced_test]
        #[tokio::test]
        async fn findings_keep_parser_emission_order() {
            let port = LambdaBuilder::new(EngineKind::PortScan)
                .with_parse(|_| port_findings(&[80, 22, 443]))
                .build();
            let service = service_with(vec![port]);
            let job = service
                .start_scan(request(&[EngineKind::PortScan]))
                .await
                .unwrap();
            let ports = job.findings.iter().map(|f| f.port).collect::<Vec<_>>();
            assert_eq!(ports, vec![Some(80), Some(22), Some(443)]);
        }

        #[traced_test]
        #[tokio::test]
        async fn statistics_count_findings_per_tier() {
            let web = LambdaBuilder::new(EngineKind::WebScan)
                .with_parse(|_| {
                    [9.5, 9.1, 7.5, 0.5]
                        .iter()
                        .map(|score| RawFinding {
                            score: Some(*score),
                            description: "scored".to_string(),
                            ..Default::default()
                        })
                        .collect()
                })
                .build();
            let service = service_with(vec![web]);
            let job = service
                .start_scan(request(&[EngineKind::WebScan]))
                .await
                .unwrap();
            let stats = service.get_statistics(&job.id).await.unwrap();
            assert_eq!(
                stats,
                ScanStatistics {
                    critical: 2,
                    high: 1,
                    medium: 0,
                    low: 1,
                    info: 0,
                    total: 4,
                }
            );
        }

        #[traced_test]
        #[tokio::test]
        async fn duplicate_engine_selection_runs_once() {
            let port = LambdaBuilder::new(EngineKind::PortScan)
                .with_parse(|_| port_findings(&[22]))
                .build();
            let service = service_with(vec![port]);
            let job = service
                .start_scan(request(&[EngineKind::PortScan, EngineKind::PortScan]))
                .await
                .unwrap();
            assert_eq!(job.findings.len(), 1);
        }
    }

    mod detached {
        use super::*;

        #[traced_test]
        #[tokio::test]
        async fn job_is_retrievable_by_the_returned_id() {
            let port = LambdaBuilder::new(EngineKind::PortScan)
                .with_parse(|_| port_findings(&[22]))
                .build();
            let service = Arc::new(service_with(vec![port]));
            let id = Arc::clone(&service)
                .start_scan_detached(request(&[EngineKind::PortScan]))
                .await
                .unwrap();
            let mut job = service.get_job(&id).await.unwrap();
            for _ in 0..100 {
                if job.status.is_done() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
                job = service.get_job(&id).await.unwrap();
            }
            assert_eq!(job.status, Phase::Completed);
            assert_eq!(job.findings.len(), 1);
        }

        #[traced_test]
        #[tokio::test]
        async fn invalid_detached_request_creates_no_job() {
            let service = Arc::new(service_with(vec![
                LambdaBuilder::new(EngineKind::PortScan).build(),
            ]));
            assert!(matches!(
                Arc::clone(&service).start_scan_detached(request(&[])).await,
                Err(Error::InvalidRequest(_))
            ));
            assert!(service.get_job_ids().await.unwrap().is_empty());
        }
    }

    mod persistence_failure {
        use async_trait::async_trait;
        use chrono::{DateTime, Utc};

        use super::*;
        use crate::storage::{JobFetcher, JobStorer};

        /// Store that fails on `append_findings` once armed.
        #[derive(Debug, Default)]
        struct Flaky {
            inner: inmemory::Storage,
            broken: AtomicBool,
        }

        impl Flaky {
            fn arm(&self) {
                self.broken.store(true, Ordering::SeqCst);
            }
        }

        #[async_trait]
        impl JobStorer for Flaky {
            async fn insert_job(&self, job: ScanJob) -> Result<(), storage::Error> {
                self.inner.insert_job(job).await
            }

            async fn update_status(
                &self,
                id: &str,
                status: Phase,
                completed_at: Option<DateTime<Utc>>,
            ) -> Result<(), storage::Error> {
                self.inner.update_status(id, status, completed_at).await
            }

            async fn append_findings(
                &self,
                id: &str,
                findings: Vec<Vulnerability>,
            ) -> Result<(), storage::Error> {
                if self.broken.load(Ordering::SeqCst) {
                    return Err(storage::Error::Storage("disk full".into()));
                }
                self.inner.append_findings(id, findings).await
            }

            async fn append_engine_error(
                &self,
                id: &str,
                engine: EngineKind,
                message: String,
            ) -> Result<(), storage::Error> {
                self.inner.append_engine_error(id, engine, message).await
            }
        }

        #[async_trait]
        impl JobFetcher for Flaky {
            async fn get_job(&self, id: &str) -> Result<ScanJob, storage::Error> {
                self.inner.get_job(id).await
            }

            async fn get_job_ids(&self) -> Result<Vec<String>, storage::Error> {
                self.inner.get_job_ids().await
            }
        }

        #[traced_test]
        #[tokio::test]
        async fn store_failure_marks_the_job_failed() {
            let port = LambdaBuilder::new(EngineKind::PortScan)
                .with_parse(|_| port_findings(&[22]))
                .build();
            let mut registry = Registry::new();
            registry.register(Box::new(port));
            let db = Flaky::default();
            db.arm();
            let service = ScanService::new(
                db,
                Arc::new(registry),
                Allowlist::new([TARGET]),
                Duration::from_secs(5),
            );
            match service.start_scan(request(&[EngineKind::PortScan])).await {
                Err(Error::Storage(_)) => {}
                other => panic!("expected Storage error, got {other:?}"),
            }
            let ids = service.get_job_ids().await.unwrap();
            assert_eq!(ids.len(), 1);
            let job = service.get_job(&ids[0]).await.unwrap();
            assert_eq!(job.status, Phase::Failed);
        }
    }
}
