//! A prioritized task pool.
//!
//! The pool keeps a priority queue of jobs. Jobs either run on worker
//! threads ([`PriorityTaskPool::start`] followed by
//! [`PriorityTaskPool::wait`]) or are stepped synchronously one at a time
//! ([`PriorityTaskPool::step`]), which keeps runs deterministic for testing.
//!
//! Jobs may enqueue further jobs; [`PriorityTaskPool::wait`] only returns
//! once the queue is empty and no job is running. Higher priorities run
//! first; jobs with equal priority run in insertion order.

use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use log::trace;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct PrioritizedJob<P> {
    priority: P,
    sequence: u64,
    job: Job,
}

impl<P: Ord> PartialEq for PrioritizedJob<P> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl<P: Ord> Eq for PrioritizedJob<P> {}

impl<P: Ord> PartialOrd for PrioritizedJob<P> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<P: Ord> Ord for PrioritizedJob<P> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Max-heap on the priority; earlier sequence numbers win ties.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

struct PoolState<P> {
    queue: BinaryHeap<PrioritizedJob<P>>,
    next_sequence: u64,
    active_jobs: usize,
    shutting_down: bool,
}

struct PoolInner<P> {
    state: Mutex<PoolState<P>>,
    job_available: Condvar,
    quiescent: Condvar,
}

/// A pool executing prioritized jobs.
pub struct PriorityTaskPool<P> {
    inner: Arc<PoolInner<P>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<P: Ord + Send + 'static> PriorityTaskPool<P> {
    /// Create a pool without worker threads.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(PoolInner {
                state: Mutex::new(PoolState {
                    queue: BinaryHeap::new(),
                    next_sequence: 0,
                    active_jobs: 0,
                    shutting_down: false,
                }),
                job_available: Condvar::new(),
                quiescent: Condvar::new(),
            }),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Enqueue a job with the given priority.
    pub fn add_job(&self, priority: P, job: impl FnOnce() + Send + 'static) {
        let mut state = self.inner.state.lock().expect("pool state lock poisoned");
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.queue.push(PrioritizedJob {
            priority,
            sequence,
            job: Box::new(job),
        });
        drop(state);
        self.inner.job_available.notify_one();
    }

    /// The number of currently queued jobs.
    pub fn queue_len(&self) -> usize {
        self.inner
            .state
            .lock()
            .expect("pool state lock poisoned")
            .queue
            .len()
    }

    /// Start the given number of worker threads.
    pub fn start(&self, worker_count: usize) {
        let mut workers = self.workers.lock().expect("pool worker lock poisoned");
        for id in 0..worker_count {
            let inner = Arc::clone(&self.inner);
            workers.push(std::thread::spawn(move || Self::worker_loop(id, &inner)));
        }
    }

    fn worker_loop(id: usize, inner: &PoolInner<P>) {
        trace!("worker {id} started");
        loop {
            let mut state = inner.state.lock().expect("pool state lock poisoned");
            let job = loop {
                if let Some(entry) = state.queue.pop() {
                    break entry.job;
                }
                if state.shutting_down {
                    trace!("worker {id} exiting");
                    return;
                }
                state = inner
                    .job_available
                    .wait(state)
                    .expect("pool state lock poisoned");
            };
            state.active_jobs += 1;
            drop(state);

            job();

            let mut state = inner.state.lock().expect("pool state lock poisoned");
            state.active_jobs -= 1;
            if state.active_jobs == 0 && state.queue.is_empty() {
                inner.quiescent.notify_all();
            }
        }
    }

    /// Block until the queue is empty and no job is running, then stop all
    /// worker threads.
    ///
    /// Only meaningful after [`PriorityTaskPool::start`]; without workers
    /// and with a non-empty queue this would block forever.
    pub fn wait(&self) {
        let mut state = self.inner.state.lock().expect("pool state lock poisoned");
        while state.active_jobs > 0 || !state.queue.is_empty() {
            state = self
                .inner
                .quiescent
                .wait(state)
                .expect("pool state lock poisoned");
        }
        state.shutting_down = true;
        drop(state);
        self.inner.job_available.notify_all();
        let mut workers = self.workers.lock().expect("pool worker lock poisoned");
        for worker in workers.drain(..) {
            worker.join().expect("pool worker panicked");
        }
    }

    /// Pop the highest-priority job and run it on the calling thread.
    ///
    /// Returns `false` if the queue was empty.
    pub fn step(&self) -> bool {
        let job = {
            let mut state = self.inner.state.lock().expect("pool state lock poisoned");
            match state.queue.pop() {
                Some(entry) => entry.job,
                None => return false,
            }
        };
        job();
        true
    }
}

impl<P: Ord + Send + 'static> Default for PriorityTaskPool<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Drop for PriorityTaskPool<P> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.inner.state.lock() {
            state.shutting_down = true;
        }
        self.inner.job_available.notify_all();
        if let Ok(mut workers) = self.workers.lock() {
            for worker in workers.drain(..) {
                let _ = worker.join();
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn step_runs_jobs_in_priority_order() {
        let pool = PriorityTaskPool::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for (priority, tag) in [(1, "low"), (3, "high"), (2, "mid")] {
            let order = Arc::clone(&order);
            pool.add_job(priority, move || order.lock().unwrap().push(tag));
        }
        while pool.step() {}
        assert_eq!(*order.lock().unwrap(), vec!["high", "mid", "low"]);
        assert!(!pool.step());
    }

    #[test]
    fn equal_priorities_run_in_insertion_order() {
        let pool = PriorityTaskPool::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            pool.add_job(0, move || order.lock().unwrap().push(tag));
        }
        while pool.step() {}
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn jobs_may_enqueue_more_jobs() {
        let pool = Arc::new(PriorityTaskPool::new());
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = Arc::clone(&pool);
            let counter = Arc::clone(&counter);
            pool.clone().add_job(0, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                for _ in 0..3 {
                    let counter = Arc::clone(&counter);
                    pool.add_job(0, move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    });
                }
            });
        }
        while pool.step() {}
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn workers_drain_the_queue() {
        let pool = Arc::new(PriorityTaskPool::new());
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            pool.add_job(0, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.start(4);
        pool.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn wait_covers_recursively_added_jobs() {
        let pool = Arc::new(PriorityTaskPool::new());
        let counter = Arc::new(AtomicUsize::new(0));
        fn spawn(
            pool: &Arc<PriorityTaskPool<i64>>,
            counter: &Arc<AtomicUsize>,
            depth: usize,
        ) {
            let pool_clone = Arc::clone(pool);
            let counter = Arc::clone(counter);
            pool.add_job(depth as i64, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                if depth > 0 {
                    spawn(&pool_clone, &counter, depth - 1);
                    spawn(&pool_clone, &counter, depth - 1);
                }
            });
        }
        spawn(&pool, &counter, 5);
        pool.start(3);
        pool.wait();
        // A complete binary recursion of depth 5.
        assert_eq!(counter.load(Ordering::SeqCst), 63);
    }
}
