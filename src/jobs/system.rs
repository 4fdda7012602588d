//! # Job System
//!
//! Worker pool draining a blocking ready queue of job handles, with
//! cooperative work-borrowing on every waiting path.
//!
//! ## Scheduling model
//! Construction spawns `max(1, available_parallelism - 1)` workers, each
//! blocking on the ready queue and executing one job at a time. Caller
//! threads never park: [`JobSystem::wait`] and [`JobSystem::wait_all`]
//! drain the ready queue themselves while the awaited condition holds, and
//! [`JobSystem::create`] borrows work whenever the pool is saturated. This
//! keeps the system live even when every worker is blocked on children of
//! the job the caller waits for.
//!
//! ## Ordering guarantees
//! - A job's task runs to completion before its handle reports finished.
//! - A continuation runs strictly after its dependency completes.
//! - A parent completes only after its own task and every child.
//! - No ordering exists between sibling jobs scheduled independently.
//!
//! ## Shutdown
//! Workers are joinable: dropping the system sends one shutdown message
//! per worker and joins them. Jobs already on the ready queue drain before
//! the shutdown messages are reached.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;

use crate::jobs::pool::{ContinuationStatus, JobHandle, JobPool, Task};

enum JobMessage {
    Run(JobHandle),
    Shutdown,
}

struct Shared {
    pool: JobPool,
    sender: Sender<JobMessage>,
    receiver: Receiver<JobMessage>,
    pending: AtomicI64,
}

impl Shared {
    fn send(&self, handle: JobHandle) {
        // The receiver lives in this struct, so the channel cannot be
        // disconnected while the system exists.
        let _ = self.sender.send(JobMessage::Run(handle));
    }

    fn try_work(&self) {
        match self.receiver.try_recv() {
            Ok(JobMessage::Run(handle)) => self.work_one(handle),
            Ok(JobMessage::Shutdown) => {
                // Not addressed to a borrowing caller; pass it on.
                let _ = self.sender.send(JobMessage::Shutdown);
            }
            Err(_) => thread::yield_now(),
        }
    }

    fn work_one(&self, handle: JobHandle) {
        let continuations = self.pool.invoke(handle);

        // One decrement for this job; continuations were already counted
        // when they were scheduled.
        self.pending.fetch_sub(1, Ordering::Release);

        for continuation in continuations {
            self.send(continuation);
        }
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        match shared.receiver.recv() {
            Ok(JobMessage::Run(handle)) => shared.work_one(handle),
            Ok(JobMessage::Shutdown) | Err(_) => break,
        }
    }
}

/// Handle-addressed task scheduler backed by a fixed worker pool.
///
/// See the module docs for the scheduling and ordering model.
pub struct JobSystem {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl Default for JobSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl JobSystem {
    /// Creates a system with `max(1, available_parallelism - 1)` workers.
    pub fn new() -> Self {
        let worker_count = thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1).max(1))
            .unwrap_or(1);
        Self::with_workers(worker_count)
    }

    /// Creates a system with an explicit worker count (at least 1).
    pub fn with_workers(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (sender, receiver) = unbounded();

        let shared = Arc::new(Shared {
            pool: JobPool::new(),
            sender,
            receiver,
            pending: AtomicI64::new(0),
        });

        debug!("spawning {} job workers", worker_count);

        let workers = (0..worker_count)
            .map(|index| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("job-worker-{index}"))
                    .spawn(move || worker_loop(&shared))
                    .expect("failed to spawn job worker")
            })
            .collect();

        Self { shared, workers }
    }

    /// Creates a job for `task` and returns its handle.
    ///
    /// The job does not run until [`JobSystem::schedule`]d. If the pool is
    /// saturated the calling thread executes queued work until a slot
    /// frees up; exhaustion is never surfaced.
    pub fn create(&self, task: impl FnOnce() + Send + 'static) -> JobHandle {
        let mut task: Task = Box::new(task);
        loop {
            match self.shared.pool.create(task) {
                Ok(handle) => return handle,
                Err(returned) => {
                    task = returned.0;
                    self.shared.try_work();
                }
            }
        }
    }

    /// Creates a job for `task` as a child of `parent`.
    ///
    /// The parent completes only after all its children. Children must be
    /// created before the parent is scheduled.
    pub fn create_with_parent(
        &self,
        task: impl FnOnce() + Send + 'static,
        parent: JobHandle,
    ) -> JobHandle {
        let mut task: Task = Box::new(task);
        loop {
            match self.shared.pool.create_with_parent(task, parent) {
                Ok(handle) => return handle,
                Err(returned) => {
                    task = returned.0;
                    self.shared.try_work();
                }
            }
        }
    }

    /// Makes `handle` runnable.
    pub fn schedule(&self, handle: JobHandle) {
        self.shared.pending.fetch_add(1, Ordering::Release);
        self.shared.send(handle);
    }

    /// Makes `handle` runnable once `dependency` has completed.
    ///
    /// If the dependency already finished the job is enqueued immediately;
    /// otherwise it is registered as a continuation. A registration that
    /// loses the race with the dependency's completion is detected and the
    /// job is enqueued directly, so it can never be lost.
    pub fn schedule_after(&self, handle: JobHandle, dependency: JobHandle) {
        self.shared.pending.fetch_add(1, Ordering::Release);

        if self.shared.pool.finished(dependency) {
            self.shared.send(handle);
            return;
        }

        if self.shared.pool.add_continuation(dependency, handle)
            == ContinuationStatus::AlreadyFinished
        {
            self.shared.send(handle);
        }
    }

    /// Returns `true` iff the job referenced by `handle` has completed.
    #[inline]
    pub fn finished(&self, handle: JobHandle) -> bool {
        self.shared.pool.finished(handle)
    }

    /// Blocks until `handle` completes, executing queued work meanwhile.
    ///
    /// The calling thread never parks; it borrows work from the ready
    /// queue until the job reports finished.
    pub fn wait(&self, handle: JobHandle) {
        while !self.shared.pool.finished(handle) {
            self.shared.try_work();
        }
    }

    /// Blocks until every scheduled job completes, executing queued work
    /// meanwhile.
    pub fn wait_all(&self) {
        while self.shared.pending.load(Ordering::Acquire) > 0 {
            self.shared.try_work();
        }
    }
}

impl Drop for JobSystem {
    fn drop(&mut self) {
        for _ in &self.workers {
            let _ = self.shared.sender.send(JobMessage::Shutdown);
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        debug!("job workers joined");
    }
}
