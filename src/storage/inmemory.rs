use std::collections::HashMap;

use tokio::sync::RwLock;

use super::*;

/// Keeps all scan jobs in memory.
#[derive(Debug, Default)]
pub struct Storage {
    jobs: RwLock<HashMap<String, ScanJob>>,
}

impl Storage {
    pub fn new() -> Self {
        Default::default()
    }
}

#[async_trait]
impl JobStorer for Storage {
    async fn insert_job(&self, job: ScanJob) -> Result<(), Error> {
        let mut jobs = self.jobs.write().await;
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    async fn update_status(
        &self,
        id: &str,
        status: Phase,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), Error> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(id).ok_or(Error::NotFound)?;
        if job.status.is_done() {
            return Err(Error::AlreadyFinished);
        }
        job.status = status;
        job.completed_at = completed_at;
        Ok(())
    }

    async fn append_findings(&self, id: &str, findings: Vec<Vulnerability>) -> Result<(), Error> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(id).ok_or(Error::NotFound)?;
        if job.status.is_done() {
            return Err(Error::AlreadyFinished);
        }
        job.findings.extend(findings);
        Ok(())
    }

    async fn append_engine_error(
        &self,
        id: &str,
        engine: EngineKind,
        message: String,
    ) -> Result<(), Error> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(id).ok_or(Error::NotFound)?;
        if job.status.is_done() {
            return Err(Error::AlreadyFinished);
        }
        job.engine_errors.insert(engine, message);
        Ok(())
    }
}

#[async_trait]
impl JobFetcher for Storage {
    async fn get_job(&self, id: &str) -> Result<ScanJob, Error> {
        let jobs = self.jobs.read().await;
        jobs.get(id).cloned().ok_or(Error::NotFound)
    }

    async fn get_job_ids(&self) -> Result<Vec<String>, Error> {
        let jobs = self.jobs.read().await;
        Ok(jobs.keys().cloned().collect())
    }
}
