// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Persistence port for scan jobs.
//!
//! The scan service only depends on the traits in here; the in-memory
//! implementation is the reference store, real databases are external
//! collaborators implementing the same traits.

pub mod inmemory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{EngineKind, Phase, ScanJob, Vulnerability};

#[derive(Debug)]
pub enum Error {
    NotFound,
    /// Mutation of a job that already reached a terminal phase
    AlreadyFinished,
    Storage(Box<dyn std::error::Error + Send + Sync>),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Error::*;
        match self {
            NotFound => write!(f, "not found"),
            AlreadyFinished => write!(f, "job already reached a terminal phase"),
            Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

#[async_trait]
/// A trait for creating and mutating scan job records.
///
/// All mutations of a job that already reached `Completed` or `Failed` must
/// be rejected with [`Error::AlreadyFinished`]; terminal phases are final.
pub trait JobStorer {
    /// Inserts a new job record.
    async fn insert_job(&self, job: ScanJob) -> Result<(), Error>;
    /// Transitions the phase of a job.
    async fn update_status(
        &self,
        id: &str,
        status: Phase,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), Error>;
    /// Appends findings to a running job.
    async fn append_findings(&self, id: &str, findings: Vec<Vulnerability>) -> Result<(), Error>;
    /// Records an engine that failed without failing the job.
    async fn append_engine_error(
        &self,
        id: &str,
        engine: EngineKind,
        message: String,
    ) -> Result<(), Error>;
}

#[async_trait]
/// A trait for reading scan job records.
pub trait JobFetcher {
    /// Returns the job with the given id.
    async fn get_job(&self, id: &str) -> Result<ScanJob, Error>;
    /// Returns the ids of all stored jobs.
    async fn get_job_ids(&self) -> Result<Vec<String>, Error>;
}

#[async_trait]
/// Combines the traits `JobStorer` and `JobFetcher`.
pub trait Storage: JobStorer + JobFetcher {}

#[async_trait]
impl<T> Storage for T where T: JobStorer + JobFetcher {}
