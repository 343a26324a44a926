use std::fs;
use std::path::Path;

use log::{debug, info, trace};
use tarpc::context;
use tokio::time;

use crate::partition::{
    group_sorted, intermediate_path, output_path, partition, read_intermediate,
    write_intermediate, write_output,
};
use crate::{
    Assignment, Error, KeyValue, MapTask, ReduceTask, Result, ServiceClient, TaskKind,
    WorkerConfig,
};

/// `(input name, input content) -> records`
pub type MapFn = fn(&Path, &str) -> Vec<KeyValue>;
/// `(key, all values of key) -> reduced value`
pub type ReduceFn = fn(&str, &[String]) -> String;

/// Tasks executed by one worker.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub maps: usize,
    pub reduces: usize,
}

pub struct Worker {
    client: ServiceClient,
    config: WorkerConfig,
    map: MapFn,
    reduce: ReduceFn,
}

impl Worker {
    pub fn new(client: ServiceClient, config: WorkerConfig, map: MapFn, reduce: ReduceFn) -> Self {
        Self {
            client,
            config,
            map,
            reduce,
        }
    }

    /// Run the map phase, then the reduce phase, as directed by the coordinator.
    ///
    /// An invalid config is rejected before contacting the coordinator. Any
    /// failed call or I/O error ends the worker; whatever task it was
    /// holding gets reassigned once its lease expires.
    pub async fn launch(&self) -> Result<WorkerStats> {
        self.config.validate()?;
        let nreduce = self.client.reducer_count(context::current()).await?;
        let mut stats = WorkerStats::default();

        loop {
            match self.client.request_map_task(context::current()).await? {
                Assignment::Assigned(task) => {
                    self.run_map(task, nreduce).await?;
                    stats.maps += 1;
                }
                Assignment::Wait => time::sleep(self.config.retry_interval).await,
                Assignment::PhaseComplete => break,
            }
        }
        debug!("map phase complete");

        loop {
            match self.client.request_reduce_task(context::current()).await? {
                Assignment::Assigned(task) => {
                    self.run_reduce(task).await?;
                    stats.reduces += 1;
                }
                Assignment::Wait => time::sleep(self.config.retry_interval).await,
                Assignment::PhaseComplete => break,
            }
        }
        info!(
            "worker finished after {} map and {} reduce tasks",
            stats.maps, stats.reduces
        );
        Ok(stats)
    }

    async fn run_map(&self, task: MapTask, nreduce: usize) -> Result<()> {
        let id = task.id;
        let dir = self.config.dir.clone();
        let map = self.map;
        let n = tokio::task::spawn_blocking(move || execute_map(&dir, &task, nreduce, map)).await??;
        trace!("map task {} emitted {} records", id, n);
        self.report(id, TaskKind::Map).await
    }

    async fn run_reduce(&self, task: ReduceTask) -> Result<()> {
        let id = task.id;
        let dir = self.config.dir.clone();
        let reduce = self.reduce;
        let n = tokio::task::spawn_blocking(move || execute_reduce(&dir, &task, reduce)).await??;
        trace!("reduce task {} wrote {} keys", id, n);
        self.report(id, TaskKind::Reduce).await
    }

    async fn report(&self, id: usize, kind: TaskKind) -> Result<()> {
        let reply = self
            .client
            .report_completion(context::current(), id, kind)
            .await?;
        if !reply.recorded {
            debug!("{:?} task {} was completed by someone else", kind, id);
        }
        Ok(())
    }
}

/// Map one input file and write all of its buckets. Returns the number of
/// records emitted.
///
/// Empty buckets are written too, so files left in `dir` by an earlier job
/// never reach a reducer. Running the same task twice leaves identical files
/// behind.
pub fn execute_map(dir: &Path, task: &MapTask, nreduce: usize, map: MapFn) -> Result<usize> {
    let content = fs::read_to_string(&task.input).map_err(|e| Error::io(&task.input, e))?;
    let records = map(&task.input, &content);
    let n = records.len();
    for (bucket, records) in partition(records, nreduce).into_iter().enumerate() {
        write_intermediate(&intermediate_path(dir, task.id, bucket), &records)?;
    }
    Ok(n)
}

/// Reduce one bucket over the output of every map task. Returns the number
/// of distinct keys written.
pub fn execute_reduce(dir: &Path, task: &ReduceTask, reduce: ReduceFn) -> Result<usize> {
    let mut records = Vec::new();
    for map_id in 0..task.nmap {
        records.extend(read_intermediate(&intermediate_path(dir, map_id, task.bucket))?);
    }
    let lines: Vec<(String, String)> = group_sorted(records)
        .into_iter()
        .map(|(key, values)| {
            let value = reduce(&key, &values);
            (key, value)
        })
        .collect();
    write_output(&output_path(dir, task.bucket), &lines)?;
    Ok(lines.len())
}
