//! # Job Pool
//!
//! Fixed-capacity table of job slots addressed by generation-stamped
//! handles, with a lock-free queue of free slot ids.
//!
//! ## Handle recycling
//! A [`JobHandle`] pairs a slot id with the slot's version at creation
//! time. Completing a job increments the slot's version counter before the
//! id returns to the free queue, so any stale handle observes
//! `version_now > handle.version` and reports the job as finished. Slot
//! reuse can never resurrect an old handle.
//!
//! ## Finish protocol
//! Every slot carries an `unfinished` counter, starting at 1 for the job
//! itself plus 1 per child created against it. The counter is decremented
//! once when the job's own task completes and once per completed child;
//! the slot transitions to *complete* exactly when the counter reaches 0,
//! at which point its continuations become runnable and the completion
//! recursively propagates to the parent.
//!
//! ## Memory ordering
//! - The version read in [`JobPool::finished`] is acquire.
//! - The version increment in the completion path is release and happens
//!   before the free-id enqueue.
//! - The `unfinished` decrement is release; the read deciding the zero
//!   transition is acquire (one `AcqRel` read-modify-write).
//!
//! ## Continuation hazard
//! Registering a continuation races with the dependency's completion. Both
//! paths take the slot's mutex: a registration either lands before the
//! completion drains the list, or observes the version already advanced
//! and reports [`ContinuationStatus::AlreadyFinished`] so the caller
//! schedules the continuation directly. A continuation is never dropped.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crossbeam_queue::ArrayQueue;
use log::error;

use crate::engine::types::{JobId, JobVersion, POOL_SIZE};

/// A unit of work executed by the job system.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Generation-stamped reference to a job slot.
///
/// Valid until the job it refers to completes; afterwards the handle only
/// answers [`JobPool::finished`] with `true`.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JobHandle {
    /// Slot index in the pool.
    pub id: JobId,

    /// Slot version at creation time.
    pub version: JobVersion,
}

/// Returned by [`JobPool::create`] when no free slot is available.
///
/// Carries the task back to the caller so it can be retried, the same way
/// a channel's send error returns the unsent value.
pub struct PoolExhausted(pub Task);

impl fmt::Debug for PoolExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PoolExhausted(..)")
    }
}

impl fmt::Display for PoolExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job pool exhausted ({} slots in use)", POOL_SIZE)
    }
}

impl std::error::Error for PoolExhausted {}

/// Outcome of a continuation registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationStatus {
    /// The continuation was appended to the dependency's list and will be
    /// released when the dependency completes.
    Registered,

    /// The dependency had already completed; the caller must schedule the
    /// continuation itself.
    AlreadyFinished,
}

struct SlotInner {
    task: Option<Task>,
    parent: Option<JobHandle>,
    continuations: Vec<JobHandle>,
}

struct JobSlot {
    inner: Mutex<SlotInner>,
    unfinished: AtomicU32,
}

impl JobSlot {
    fn new() -> Self {
        Self {
            inner: Mutex::new(SlotInner {
                task: None,
                parent: None,
                continuations: Vec::new(),
            }),
            unfinished: AtomicU32::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed table of [`POOL_SIZE`] job slots with generation-stamped handles.
///
/// All operations are thread-safe; see the module docs for the ordering
/// guarantees.
pub struct JobPool {
    slots: Box<[JobSlot]>,
    versions: Box<[AtomicU64]>,
    available: ArrayQueue<JobId>,
}

impl Default for JobPool {
    fn default() -> Self {
        Self::new()
    }
}

impl JobPool {
    /// Creates a pool with every slot free.
    pub fn new() -> Self {
        let slots: Box<[JobSlot]> = (0..POOL_SIZE).map(|_| JobSlot::new()).collect();
        let versions: Box<[AtomicU64]> = (0..POOL_SIZE).map(|_| AtomicU64::new(0)).collect();

        let available = ArrayQueue::new(POOL_SIZE);
        for id in 0..POOL_SIZE {
            available
                .push(id as JobId)
                .expect("free queue sized to hold every id");
        }

        Self { slots, versions, available }
    }

    /// Allocates a slot for `task` and returns its handle.
    ///
    /// ## Errors
    /// [`PoolExhausted`] when every slot is in use; the task is handed
    /// back for retry. Callers should perform other work and try again
    /// rather than block.
    pub fn create(&self, task: Task) -> Result<JobHandle, PoolExhausted> {
        let Some(id) = self.available.pop() else {
            return Err(PoolExhausted(task));
        };

        let version = self.versions[id as usize].load(Ordering::Acquire);

        let slot = &self.slots[id as usize];
        {
            let mut inner = slot.lock();
            inner.task = Some(task);
            inner.parent = None;
            inner.continuations.clear();
        }
        slot.unfinished.store(1, Ordering::Release);

        Ok(JobHandle { id, version })
    }

    /// Allocates a slot for `task` as a child of `parent`.
    ///
    /// Atomically increments the parent's unfinished counter, so the
    /// parent cannot complete before this child does. The caller must
    /// guarantee the parent has not yet begun completing; the usual
    /// discipline is to create all children before scheduling the parent.
    ///
    /// ## Errors
    /// As [`JobPool::create`].
    pub fn create_with_parent(
        &self,
        task: Task,
        parent: JobHandle,
    ) -> Result<JobHandle, PoolExhausted> {
        debug_assert!(!self.finished(parent), "parent already completed");

        let handle = self.create(task)?;
        self.slots[handle.id as usize].lock().parent = Some(parent);
        self.slots[parent.id as usize]
            .unfinished
            .fetch_add(1, Ordering::AcqRel);
        Ok(handle)
    }

    /// Appends `continuation` to `parent`'s continuation list.
    ///
    /// Returns [`ContinuationStatus::AlreadyFinished`] if `parent`
    /// completed before the registration could land, in which case the
    /// caller is responsible for scheduling the continuation directly.
    pub fn add_continuation(
        &self,
        parent: JobHandle,
        continuation: JobHandle,
    ) -> ContinuationStatus {
        let slot = &self.slots[parent.id as usize];
        let mut inner = slot.lock();

        // Checked under the slot lock: completion drains the list and
        // advances the version while holding the same lock.
        if self.finished(parent) {
            return ContinuationStatus::AlreadyFinished;
        }

        inner.continuations.push(continuation);
        ContinuationStatus::Registered
    }

    /// Runs the slot's task, then finishes the job.
    ///
    /// Returns every continuation that became runnable, including those of
    /// parents completed transitively. Must be called at most once per
    /// handle.
    ///
    /// A panicking task is caught and logged; the job still completes
    /// through the normal finish path so counters stay consistent.
    pub fn invoke(&self, handle: JobHandle) -> Vec<JobHandle> {
        let task = self.slots[handle.id as usize].lock().task.take();

        if let Some(task) = task {
            if catch_unwind(AssertUnwindSafe(task)).is_err() {
                error!("job task panicked; job {} completes anyway", handle.id);
            }
        }

        self.finish(handle)
    }

    /// Records one completion against `handle`'s unfinished counter.
    ///
    /// When the counter reaches zero the slot completes: its continuations
    /// are captured, the version advances (invalidating the handle), the
    /// id returns to the free queue, and the parent is finished
    /// recursively. Returns the continuations released by every slot
    /// completed in this call.
    pub fn finish(&self, handle: JobHandle) -> Vec<JobHandle> {
        let mut runnable = Vec::new();
        self.finish_into(handle, &mut runnable);
        runnable
    }

    fn finish_into(&self, handle: JobHandle, runnable: &mut Vec<JobHandle>) {
        let slot = &self.slots[handle.id as usize];

        if slot.unfinished.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }

        // Counter hit zero: this slot is complete.
        let parent;
        {
            let mut inner = slot.lock();
            runnable.append(&mut inner.continuations);
            parent = inner.parent.take();
            inner.task = None;

            // The version advance must happen before the id is observable
            // on the free queue, and under the lock so registration cannot
            // interleave with the drain above.
            self.versions[handle.id as usize].fetch_add(1, Ordering::Release);
        }

        self.available
            .push(handle.id)
            .expect("free queue sized to hold every id");

        if let Some(parent) = parent {
            self.finish_into(parent, runnable);
        }
    }

    /// Returns `true` iff the job referenced by `handle` has completed.
    #[inline]
    pub fn finished(&self, handle: JobHandle) -> bool {
        self.versions[handle.id as usize].load(Ordering::Acquire) > handle.version
    }
}
