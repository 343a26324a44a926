use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{trace, warn};

use crate::{Assignment, MapTask, ReduceTask, TaskKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    InProgress { since: Instant },
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Map,
    Reduce,
    Done,
}

/// Outcome of a completion report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Recorded,
    Duplicate,
    Unknown,
}

#[derive(Debug, Clone)]
struct Entry<T> {
    task: T,
    status: TaskStatus,
    attempts: u32,
}

impl<T> Entry<T> {
    fn new(task: T) -> Self {
        Self {
            task,
            status: TaskStatus::Pending,
            attempts: 0,
        }
    }
}

/// Status of every map and reduce task of one job.
///
/// Map ids follow the order of the input files, reduce ids are the bucket
/// indices. Nothing here reads the clock; callers pass `now` in.
#[derive(Debug, Clone)]
pub struct Registry {
    maps: Vec<Entry<MapTask>>,
    reduces: Vec<Entry<ReduceTask>>,
}

impl Registry {
    pub fn new(inputs: Vec<PathBuf>, nreduce: usize) -> Self {
        let nmap = inputs.len();
        let maps = inputs
            .into_iter()
            .enumerate()
            .map(|(id, input)| Entry::new(MapTask { id, input }))
            .collect();
        let reduces = (0..nreduce)
            .map(|id| {
                Entry::new(ReduceTask {
                    id,
                    bucket: id,
                    nmap,
                })
            })
            .collect();
        Self { maps, reduces }
    }

    pub fn nmap(&self) -> usize {
        self.maps.len()
    }

    pub fn nreduce(&self) -> usize {
        self.reduces.len()
    }

    pub fn phase(&self) -> Phase {
        if !all_completed(&self.maps) {
            Phase::Map
        } else if !all_completed(&self.reduces) {
            Phase::Reduce
        } else {
            Phase::Done
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase() == Phase::Done
    }

    pub fn status(&self, kind: TaskKind, id: usize) -> Option<TaskStatus> {
        match kind {
            TaskKind::Map => self.maps.get(id).map(|e| e.status),
            TaskKind::Reduce => self.reduces.get(id).map(|e| e.status),
        }
    }

    /// How many times the task has been handed out.
    pub fn attempts(&self, kind: TaskKind, id: usize) -> Option<u32> {
        match kind {
            TaskKind::Map => self.maps.get(id).map(|e| e.attempts),
            TaskKind::Reduce => self.reduces.get(id).map(|e| e.attempts),
        }
    }

    pub fn assign_map(&mut self, now: Instant) -> Assignment<MapTask> {
        assign(&mut self.maps, now)
    }

    pub fn assign_reduce(&mut self, now: Instant) -> Assignment<ReduceTask> {
        if !all_completed(&self.maps) {
            warn!("reduce task requested before map phase completed, refusing");
            return Assignment::Wait;
        }
        assign(&mut self.reduces, now)
    }

    pub fn complete(&mut self, kind: TaskKind, id: usize) -> Completion {
        let entry = match kind {
            TaskKind::Map => self.maps.get_mut(id).map(|e| &mut e.status),
            TaskKind::Reduce => self.reduces.get_mut(id).map(|e| &mut e.status),
        };
        match entry {
            None => Completion::Unknown,
            Some(TaskStatus::Completed) => Completion::Duplicate,
            Some(status) => {
                // A reclaimed (pending) task may still be reported by its
                // first worker; its output was written atomically, keep it.
                *status = TaskStatus::Completed;
                Completion::Recorded
            }
        }
    }

    /// Put every task in progress for longer than `timeout` back to pending.
    pub fn reclaim_expired(&mut self, now: Instant, timeout: Duration) -> Vec<(TaskKind, usize)> {
        let mut reclaimed = Vec::new();
        reclaimed.extend(
            reclaim(&mut self.maps, now, timeout)
                .into_iter()
                .map(|id| (TaskKind::Map, id)),
        );
        reclaimed.extend(
            reclaim(&mut self.reduces, now, timeout)
                .into_iter()
                .map(|id| (TaskKind::Reduce, id)),
        );
        reclaimed
    }
}

fn all_completed<T>(entries: &[Entry<T>]) -> bool {
    entries.iter().all(|e| e.status == TaskStatus::Completed)
}

fn assign<T: Clone>(entries: &mut [Entry<T>], now: Instant) -> Assignment<T> {
    let pending = entries
        .iter_mut()
        .enumerate()
        .find(|(_, e)| e.status == TaskStatus::Pending);
    if let Some((id, e)) = pending {
        e.status = TaskStatus::InProgress { since: now };
        e.attempts += 1;
        trace!("task {} assigned, attempt {}", id, e.attempts);
        return Assignment::Assigned(e.task.clone());
    }
    if all_completed(entries) {
        Assignment::PhaseComplete
    } else {
        Assignment::Wait
    }
}

fn reclaim<T>(entries: &mut [Entry<T>], now: Instant, timeout: Duration) -> Vec<usize> {
    let mut ids = Vec::new();
    for (id, e) in entries.iter_mut().enumerate() {
        if let TaskStatus::InProgress { since } = e.status {
            if now.saturating_duration_since(since) > timeout {
                e.status = TaskStatus::Pending;
                ids.push(id);
            }
        }
    }
    ids
}
