use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod app;
mod config;
mod coordinator;
mod error;
pub mod partition;
mod registry;
pub mod transport;
mod worker;

pub use config::{CoordinatorConfig, WorkerConfig};
pub use coordinator::Coordinator;
pub use error::{Error, Result};
pub use registry::{Completion, Phase, Registry, TaskStatus};
pub use worker::{execute_map, execute_reduce, MapFn, ReduceFn, Worker, WorkerStats};

/// Operations the coordinator exposes to workers.
#[tarpc::service]
pub trait Service {
    /// Number of reduce buckets, fixed for the whole job.
    async fn reducer_count() -> usize;
    async fn request_map_task() -> Assignment<MapTask>;
    /// Never assigns while any map task is not completed.
    async fn request_reduce_task() -> Assignment<ReduceTask>;
    async fn report_completion(id: usize, kind: TaskKind) -> ReportReply;
    async fn job_done() -> bool;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Map,
    Reduce,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MapTask {
    pub id: usize,
    pub input: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReduceTask {
    pub id: usize,
    pub bucket: usize,
    /// Number of map tasks, i.e. how many intermediate files may exist for `bucket`.
    pub nmap: usize,
}

/// Answer to a task request.
///
/// `Wait` and `PhaseComplete` are distinct on purpose: a worker that took
/// "nothing pending right now" for "phase over" would start reducing early.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Assignment<T> {
    Assigned(T),
    Wait,
    PhaseComplete,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportReply {
    /// False when the task was already completed (or unknown).
    pub recorded: bool,
}

/// A record emitted by a map function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}
