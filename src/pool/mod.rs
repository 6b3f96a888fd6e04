/*!
A bounded worker pool driving every parallel phase of the simplifier.

A single coordinator (the thread calling [`WorkerPool::join`]) and a fixed
set of worker threads that block on a condition variable between jobs. Two
primitives are exposed:

- [`WorkerPool::do_work`] broadcasts one job to every worker.
- [`WorkerPool::do_work_for_each`] partitions an index range into contiguous
  batches and hands one batch to each worker as a single job.

Every worker has a stable id in `0..worker_count`, available from inside a
running job via [`WorkerPool::worker_id`] -- used only to index per-worker
scratch buffers (BVE's resolvent buffers, for instance).

# Safety note on job lifetimes

Every phase (`createOT`, BCP, IGR, BVE, ...) runs a job that borrows the
shared clause database / trail / implication graph for the duration of one
dispatch, rather than owning an `Arc` of it: workers read and write the
shared structures under per-object locks, so forcing every call site to
clone an `Arc` just to satisfy `'static` would be pure overhead. To let a
job borrow `&self`-rooted data without requiring `'static`,
[`WorkerPool::do_work`] and [`WorkerPool::do_work_for_each`] erase the
borrow's lifetime internally and block until every dispatched copy has
finished *before returning*, so no job can outlive the data it borrows.
This is the same "erase then wait inside one call" discipline
`std::thread::scope` uses; it's implemented by hand here (rather than via
`scope`) to keep worker threads long-lived across many dispatches (condvar
wait / wake) instead of spawning fresh OS threads per call.
*/
use std::cell::Cell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::misc::log::targets;
use crate::types::err::PoolError;

thread_local! {
    static WORKER_ID: Cell<Option<usize>> = const { Cell::new(None) };
}

type Job = Box<dyn FnOnce(usize) + Send + 'static>;

struct Shared {
    queue: Mutex<VecDeque<Job>>,
    cv_work: Condvar,
    cv_idle: Condvar,
    active: AtomicUsize,
    terminate: AtomicBool,
    interrupted: AtomicBool,
}

/// A bounded set of worker threads accepting jobs from a single coordinator.
pub struct WorkerPool {
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
    worker_count: usize,
}

impl WorkerPool {
    /// Spawns `worker_count` threads (minimum 1), each waiting for work.
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            cv_work: Condvar::new(),
            cv_idle: Condvar::new(),
            active: AtomicUsize::new(0),
            terminate: AtomicBool::new(false),
            interrupted: AtomicBool::new(false),
        });

        let mut handles = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let shared = Arc::clone(&shared);
            handles.push(
                std::thread::Builder::new()
                    .name(format!("parasimp-worker-{id}"))
                    .spawn(move || worker_loop(id, shared))
                    .expect("failed to spawn worker thread"),
            );
        }

        log::debug!(target: targets::WORKER_POOL, "spawned {worker_count} workers");

        WorkerPool {
            shared,
            handles,
            worker_count,
        }
    }

    /// The number of workers in the pool.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// The stable id of the worker executing the current job, or `None` from
    /// the coordinator thread.
    pub fn worker_id() -> Option<usize> {
        WORKER_ID.with(|id| id.get())
    }

    /// Pushes one copy of `job` per worker onto the queue, and blocks until
    /// every copy has run (see the module-level safety note: this is what
    /// makes it sound for `job` to borrow `self`-rooted state without `'static`).
    pub fn do_work<'a, F>(&'a self, job: F)
    where
        F: Fn(usize) + Send + Sync + 'a,
    {
        // SAFETY: `run_jobs_and_wait` does not return until every dispatched
        // copy of `job` has completed, so the erased `'static` bound never
        // outlives the real `'a` borrow `job` carries.
        let job: Arc<dyn Fn(usize) + Send + Sync + 'a> = Arc::new(job);
        let job: Arc<dyn Fn(usize) + Send + Sync + 'static> = unsafe { std::mem::transmute(job) };

        let worker_count = self.worker_count;
        self.run_jobs_and_wait(worker_count, move |queue| {
            for _ in 0..worker_count {
                let job = Arc::clone(&job);
                queue.push_back(Box::new(move |id| job(id)) as Job);
            }
        });
    }

    /// Partitions `[begin, end)` into contiguous batches whose base size is
    /// `ceil((end-begin)/worker_count)`, capped at `max_batch`. The remainder
    /// `(end-begin) mod worker_count` is spread one extra unit to the first
    /// `remainder` batches. Each batch is a single job calling `job(i)` for
    /// every `i` in its range.
    pub fn do_work_for_each<'a, F>(&'a self, begin: usize, end: usize, max_batch: usize, job: F)
    where
        F: Fn(usize) + Send + Sync + 'a,
    {
        if end <= begin {
            return;
        }
        let total = end - begin;
        let n = self.worker_count;
        let base = total.div_ceil(n).min(max_batch.max(1));

        let mut batches = Vec::new();
        let mut cursor = begin;
        // Recompute how many batches of `base` size are needed: the remainder
        // is distributed one extra unit to the first `remainder` batches when
        // exactly `n` batches are formed (base not capped by max_batch); once
        // capped, extra batches are appended at `base` size instead.
        let uncapped_base = total.div_ceil(n);
        if base == uncapped_base {
            let remainder = total % n;
            for i in 0..n {
                let size = base + if i < remainder { 1 } else { 0 };
                if size == 0 {
                    continue;
                }
                let batch_end = (cursor + size).min(end);
                batches.push((cursor, batch_end));
                cursor = batch_end;
            }
        } else {
            while cursor < end {
                let batch_end = (cursor + base).min(end);
                batches.push((cursor, batch_end));
                cursor = batch_end;
            }
        }

        // SAFETY: see `do_work` -- `run_jobs_and_wait` blocks until every
        // batch has completed before this function returns.
        let job: Arc<dyn Fn(usize) + Send + Sync + 'a> = Arc::new(job);
        let job: Arc<dyn Fn(usize) + Send + Sync + 'static> = unsafe { std::mem::transmute(job) };

        let count = batches.len();
        self.run_jobs_and_wait(count, move |queue| {
            for (b, e) in batches {
                let job = Arc::clone(&job);
                queue.push_back(Box::new(move |_id| {
                    for i in b..e {
                        job(i);
                    }
                }) as Job);
            }
        });
    }

    /// Locks the queue, lets `fill` push `count` jobs while bumping the active
    /// counter accordingly, wakes the workers, then blocks until all of them
    /// have finished. Shared by `do_work` and `do_work_for_each`.
    fn run_jobs_and_wait(&self, count: usize, fill: impl FnOnce(&mut VecDeque<Job>)) {
        let mut queue = self.shared.queue.lock().unwrap();
        fill(&mut queue);
        self.shared.active.fetch_add(count, Ordering::SeqCst);
        self.shared.cv_work.notify_all();
        drop(queue);

        let guard = self.shared.queue.lock().unwrap();
        let _guard = self
            .shared
            .cv_idle
            .wait_while(guard, |_| self.shared.active.load(Ordering::SeqCst) != 0)
            .unwrap();
    }

    /// Blocks until the queue is empty and every pushed job has completed.
    ///
    /// Returns `Err(PoolError::Interrupted)` if [`WorkerPool::interrupt`] was
    /// called since the pool was created or last cleared, instead of
    /// returning normally.
    pub fn join(&self) -> Result<(), PoolError> {
        let guard = self.shared.queue.lock().unwrap();
        let _unused = self
            .shared
            .cv_idle
            .wait_while(guard, |_| self.shared.active.load(Ordering::SeqCst) != 0)
            .unwrap();

        if self.shared.interrupted.swap(false, Ordering::SeqCst) {
            return Err(PoolError::Interrupted);
        }
        Ok(())
    }

    /// Requests cancellation: the next [`WorkerPool::join`] returns an error
    /// instead of completing normally. Jobs already queued still run to
    /// completion (no job may block on external I/O, so this is bounded).
    pub fn interrupt(&self) {
        self.shared.interrupted.store(true, Ordering::SeqCst);
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shared.terminate.store(true, Ordering::SeqCst);
        self.shared.cv_work.notify_all();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(id: usize, shared: Arc<Shared>) {
    WORKER_ID.with(|cell| cell.set(Some(id)));

    loop {
        let mut guard = shared.queue.lock().unwrap();
        loop {
            if let Some(job) = guard.pop_front() {
                drop(guard);
                job(id);
                shared.active.fetch_sub(1, Ordering::SeqCst);
                shared.cv_idle.notify_all();
                break;
            }
            if shared.terminate.load(Ordering::SeqCst) {
                return;
            }
            guard = shared.cv_work.wait(guard).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn do_work_runs_once_per_worker() {
        let pool = WorkerPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        pool.do_work(move |_id| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        pool.join().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn do_work_for_each_covers_every_index_exactly_once() {
        let pool = WorkerPool::new(3);
        let hits = Arc::new(Mutex::new(vec![0i32; 100]));
        let h = Arc::clone(&hits);
        pool.do_work_for_each(0, 100, usize::MAX, move |i| {
            h.lock().unwrap()[i] += 1;
        });
        pool.join().unwrap();
        assert!(hits.lock().unwrap().iter().all(|&c| c == 1));
    }

    #[test]
    fn do_work_for_each_covers_every_index_when_capped() {
        let pool = WorkerPool::new(2);
        // max_batch of 5 over a range of 20 with 2 workers forces more than 2 batches.
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        pool.do_work_for_each(0, 20, 5, move |i| {
            s.lock().unwrap().push(i);
        });
        pool.join().unwrap();
        let mut v = seen.lock().unwrap().clone();
        v.sort_unstable();
        assert_eq!(v, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn interrupt_causes_join_to_error() {
        let pool = WorkerPool::new(2);
        pool.interrupt();
        assert_eq!(pool.join(), Err(PoolError::Interrupted));
        // Subsequent join without a new interrupt behaves normally.
        assert_eq!(pool.join(), Ok(()));
    }

    #[test]
    fn worker_id_is_stable_within_a_job() {
        let pool = WorkerPool::new(4);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        pool.do_work(move |id| {
            assert_eq!(WorkerPool::worker_id(), Some(id));
            s.lock().unwrap().push(id);
        });
        pool.join().unwrap();
        let mut ids = seen.lock().unwrap().clone();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }
}
