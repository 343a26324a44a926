use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Number of reduce tasks (R).
    pub nreduce: usize,
    /// How long a task may stay in progress before it is handed to someone else.
    pub task_timeout: Duration,
    /// Period of the failure detector scan.
    pub scan_interval: Duration,
    /// How long the server keeps answering after the job is done, so that
    /// polling workers get to see `PhaseComplete`.
    pub linger: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            nreduce: 10,
            task_timeout: Duration::from_secs(10),
            scan_interval: Duration::from_millis(500),
            linger: Duration::from_secs(1),
        }
    }
}

impl CoordinatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.nreduce == 0 {
            return Err(Error::Config("nreduce must be non-zero".into()));
        }
        if self.task_timeout.is_zero() {
            return Err(Error::Config("task timeout must be non-zero".into()));
        }
        if self.scan_interval.is_zero() {
            return Err(Error::Config("scan interval must be non-zero".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory holding intermediate and output files.
    pub dir: PathBuf,
    /// Pause between two requests answered with `Wait`.
    pub retry_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            retry_interval: Duration::from_millis(500),
        }
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.retry_interval.is_zero() {
            return Err(Error::Config("retry interval must be non-zero".into()));
        }
        Ok(())
    }
}
