use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sim_engine::engine::types::POOL_SIZE;
use sim_engine::jobs::pool::{ContinuationStatus, JobPool};
use sim_engine::jobs::system::JobSystem;

#[test]
fn scheduled_job_runs_before_wait_returns() {
    let system = JobSystem::new();
    let ran = Arc::new(AtomicBool::new(false));

    let flag = Arc::clone(&ran);
    let handle = system.create(move || flag.store(true, Ordering::Release));

    assert!(!system.finished(handle));
    system.schedule(handle);
    system.wait(handle);

    assert!(ran.load(Ordering::Acquire));
    assert!(system.finished(handle));
}

#[test]
fn wait_all_drains_every_pending_job() {
    let system = JobSystem::new();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..1_000 {
        let counter = Arc::clone(&counter);
        let handle = system.create(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        system.schedule(handle);
    }

    system.wait_all();
    assert_eq!(counter.load(Ordering::Relaxed), 1_000);
}

#[test]
fn parent_completes_only_after_all_children() {
    let system = JobSystem::new();
    let completed = Arc::new(AtomicUsize::new(0));

    let root_counter = Arc::clone(&completed);
    let root = system.create(move || {
        root_counter.fetch_add(1, Ordering::SeqCst);
    });

    let mut children = Vec::new();
    for _ in 0..3 {
        let child_counter = Arc::clone(&completed);
        children.push(system.create_with_parent(
            move || {
                thread::sleep(Duration::from_millis(20));
                child_counter.fetch_add(1, Ordering::SeqCst);
            },
            root,
        ));
    }

    for &child in &children {
        system.schedule(child);
    }
    system.schedule(root);

    system.wait(root);

    // The root handle reports finished only once its own task and all
    // three children have completed.
    assert_eq!(completed.load(Ordering::SeqCst), 4);
    for &child in &children {
        assert!(system.finished(child));
    }
}

#[test]
fn continuation_runs_strictly_after_its_dependency() {
    let system = JobSystem::new();

    let first_done = Arc::new(AtomicBool::new(false));
    let observed = Arc::new(AtomicBool::new(false));

    let first_flag = Arc::clone(&first_done);
    let slow = system.create(move || {
        thread::sleep(Duration::from_millis(200));
        first_flag.store(true, Ordering::SeqCst);
    });

    let first_flag = Arc::clone(&first_done);
    let observed_flag = Arc::clone(&observed);
    let follow = system.create(move || {
        // Records whether the dependency's side effect was visible when
        // this task ran.
        observed_flag.store(first_flag.load(Ordering::SeqCst), Ordering::SeqCst);
    });

    system.schedule(slow);
    system.schedule_after(follow, slow);

    system.wait(follow);
    assert!(observed.load(Ordering::SeqCst));
    assert!(system.finished(slow));
}

#[test]
fn continuation_on_finished_dependency_runs_immediately() {
    let system = JobSystem::new();

    let first = system.create(|| {});
    system.schedule(first);
    system.wait(first);

    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    let follow = system.create(move || flag.store(true, Ordering::SeqCst));

    system.schedule_after(follow, first);
    system.wait(follow);
    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn dependency_on_aggregate_parent_orders_after_whole_tree() {
    let system = JobSystem::new();
    let tasks_done = Arc::new(AtomicUsize::new(0));
    let seen_at_d = Arc::new(AtomicUsize::new(usize::MAX));

    let root = system.create(|| {});

    let mut leaves = Vec::new();
    for _ in 0..3 {
        let counter = Arc::clone(&tasks_done);
        leaves.push(system.create_with_parent(
            move || {
                thread::sleep(Duration::from_millis(10));
                counter.fetch_add(1, Ordering::SeqCst);
            },
            root,
        ));
    }

    let counter = Arc::clone(&tasks_done);
    let seen = Arc::clone(&seen_at_d);
    let dependent = system.create(move || {
        seen.store(counter.load(Ordering::SeqCst), Ordering::SeqCst);
    });

    system.schedule_after(dependent, root);
    for &leaf in &leaves {
        system.schedule(leaf);
    }
    system.schedule(root);

    system.wait(dependent);

    // All three leaves had completed by the time the dependent ran.
    assert_eq!(seen_at_d.load(Ordering::SeqCst), 3);
}

#[test]
fn saturating_the_pool_never_blocks_the_caller() {
    let system = JobSystem::new();
    let counter = Arc::new(AtomicUsize::new(0));

    // More create calls than pool slots from a single thread; the caller
    // borrows work whenever the pool is momentarily full.
    let total = POOL_SIZE + POOL_SIZE / 2;
    for _ in 0..total {
        let counter = Arc::clone(&counter);
        let handle = system.create(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        system.schedule(handle);
    }

    system.wait_all();
    assert_eq!(counter.load(Ordering::Relaxed), total);
}

#[test]
fn pool_handles_report_completion_exactly_once() {
    let pool = JobPool::new();

    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    let handle = pool.create(Box::new(move || flag.store(true, Ordering::SeqCst))).unwrap();

    assert!(!pool.finished(handle));
    let continuations = pool.invoke(handle);

    assert!(ran.load(Ordering::SeqCst));
    assert!(pool.finished(handle));
    assert!(continuations.is_empty());
}

#[test]
fn pool_releases_continuations_on_completion() {
    let pool = JobPool::new();

    let dependency = pool.create(Box::new(|| {})).unwrap();
    let follow = pool.create(Box::new(|| {})).unwrap();

    assert_eq!(
        pool.add_continuation(dependency, follow),
        ContinuationStatus::Registered
    );

    let runnable = pool.invoke(dependency);
    assert_eq!(runnable, vec![follow]);

    // Registration against a completed dependency is refused so the
    // caller can schedule directly.
    let late = pool.create(Box::new(|| {})).unwrap();
    assert_eq!(
        pool.add_continuation(dependency, late),
        ContinuationStatus::AlreadyFinished
    );
}

#[test]
fn panicking_tasks_still_complete() {
    let system = JobSystem::new();

    let handle = system.create(|| panic!("task failure"));
    system.schedule(handle);
    system.wait(handle);
    assert!(system.finished(handle));

    // The system stays consistent afterwards.
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    let next = system.create(move || flag.store(true, Ordering::SeqCst));
    system.schedule(next);
    system.wait_all();
    assert!(ran.load(Ordering::SeqCst));
}
