use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use log::{debug, info, warn};
use tarpc::context;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::registry::{Completion, Registry, TaskStatus};
use crate::{
    transport, Assignment, CoordinatorConfig, MapTask, ReduceTask, ReportReply, Result, Service,
    TaskKind,
};

/// Owns the task registry of one job and hands tasks out to workers.
///
/// Cloning is cheap; every clone shares the same registry. All access goes
/// through one mutex that is never held across an `.await`.
#[derive(Debug, Clone)]
pub struct Coordinator {
    registry: Arc<Mutex<Registry>>,
    config: Arc<CoordinatorConfig>,
    done: Arc<watch::Sender<bool>>,
}

impl Coordinator {
    pub fn new(inputs: Vec<PathBuf>, config: CoordinatorConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "new job: {} map tasks, {} reduce tasks, timeout {:?}",
            inputs.len(),
            config.nreduce,
            config.task_timeout
        );
        let registry = Registry::new(inputs, config.nreduce);
        let (done, _) = watch::channel(false);
        Ok(Self {
            registry: Arc::new(Mutex::new(registry)),
            config: Arc::new(config),
            done: Arc::new(done),
        })
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn nreduce(&self) -> usize {
        self.registry().nreduce()
    }

    pub fn next_map_task(&self) -> Assignment<MapTask> {
        let assignment = self.registry().assign_map(Instant::now());
        if let Assignment::Assigned(t) = &assignment {
            info!("assigned map task {} ({})", t.id, t.input.display());
        }
        assignment
    }

    pub fn next_reduce_task(&self) -> Assignment<ReduceTask> {
        let assignment = self.registry().assign_reduce(Instant::now());
        if let Assignment::Assigned(t) = &assignment {
            info!("assigned reduce task {}", t.id);
        }
        assignment
    }

    pub fn report(&self, kind: TaskKind, id: usize) -> Completion {
        let (outcome, done) = {
            let mut registry = self.registry();
            let outcome = registry.complete(kind, id);
            (outcome, registry.is_done())
        };
        match outcome {
            Completion::Recorded => info!("{:?} task {} completed", kind, id),
            Completion::Duplicate => debug!("{:?} task {} already completed, ignored", kind, id),
            Completion::Unknown => warn!("completion for unknown {:?} task {}", kind, id),
        }
        if done {
            self.done.send_replace(true);
        }
        outcome
    }

    pub fn status(&self, kind: TaskKind, id: usize) -> Option<TaskStatus> {
        self.registry().status(kind, id)
    }

    pub fn is_done(&self) -> bool {
        self.registry().is_done()
    }

    /// Resolves once every reduce task is completed.
    pub async fn wait_done(&self) {
        let mut rx = self.done.subscribe();
        // The sender lives in `self`, so this cannot fail.
        let _ = rx.wait_for(|done| *done).await;
    }

    /// One failure detector pass. Returns false once the job is done.
    pub fn scan(&self) -> bool {
        let reclaimed = {
            let mut registry = self.registry();
            if registry.is_done() {
                return false;
            }
            registry.reclaim_expired(Instant::now(), self.config.task_timeout)
        };
        for (kind, id) in reclaimed {
            warn!("{:?} task {} timed out, back to pending", kind, id);
        }
        true
    }

    pub fn spawn_failure_detector(&self) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval(this.config.scan_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !this.scan() {
                    debug!("failure detector stopped");
                    break;
                }
            }
        })
    }

    /// Serve workers over TCP until the job is done.
    pub async fn launch(self, addr: SocketAddr) -> io::Result<()> {
        let (local, accept) = transport::listen(self.clone(), addr).await?;
        info!("coordinator listening on {}", local);
        let server = tokio::spawn(accept);
        let detector = self.spawn_failure_detector();

        self.wait_done().await;
        info!("job done, exiting in {:?}", self.config.linger);
        time::sleep(self.config.linger).await;

        server.abort();
        detector.abort();
        Ok(())
    }
}

impl Service for Coordinator {
    async fn reducer_count(self, _: context::Context) -> usize {
        self.nreduce()
    }

    async fn request_map_task(self, _: context::Context) -> Assignment<MapTask> {
        self.next_map_task()
    }

    async fn request_reduce_task(self, _: context::Context) -> Assignment<ReduceTask> {
        self.next_reduce_task()
    }

    async fn report_completion(
        self,
        _: context::Context,
        id: usize,
        kind: TaskKind,
    ) -> ReportReply {
        let recorded = self.report(kind, id) == Completion::Recorded;
        ReportReply { recorded }
    }

    async fn job_done(self, _: context::Context) -> bool {
        self.is_done()
    }
}
