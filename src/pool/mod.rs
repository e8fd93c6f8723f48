//! C4 -- a lazily-grown thread pool with bounded in-flight work.

mod queue;
mod task;

pub use task::{JoinHandle, Task, TaskError};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle as ThreadHandle;

use thiserror::Error;

use queue::TaskQueue;

/// Hard ceiling on in-flight (pending + running) tasks, regardless of
/// `max_threads`.
pub const TPOOL_MAX_TASKS: usize = 1024;
/// Hard ceiling a pool's `max_threads` may not exceed.
pub const TPOOL_MAX_THREADS: usize = 512;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    #[error("max_threads must be between 1 and {TPOOL_MAX_THREADS}")]
    InvalidThreadCount,
    #[error("too many in-flight tasks (limit {TPOOL_MAX_TASKS})")]
    TooManyTasks,
    #[error("cannot shut down while tasks are in flight")]
    TasksInFlight,
}

type Job = Box<dyn FnOnce() + Send>;

struct Workers {
    handles: Vec<ThreadHandle<()>>,
}

pub struct Pool {
    max_threads: usize,
    queue: Arc<TaskQueue<Job>>,
    workers: Mutex<Workers>,
    live: Arc<AtomicUsize>,
    busy: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
}

impl Pool {
    pub fn new(max_threads: usize) -> Result<Pool, PoolError> {
        if max_threads == 0 || max_threads > TPOOL_MAX_THREADS {
            return Err(PoolError::InvalidThreadCount);
        }
        Ok(Pool {
            max_threads,
            queue: Arc::new(TaskQueue::new()),
            workers: Mutex::new(Workers { handles: Vec::new() }),
            live: Arc::new(AtomicUsize::new(0)),
            busy: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    pub fn busy(&self) -> usize {
        self.busy.load(Ordering::Acquire)
    }

    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Enqueues `task`, lazily spawning a new worker if every currently
    /// alive worker is busy and the pool is below `max_threads`. The
    /// returned handle can be joined independently of the pool.
    pub fn push<T: Send + 'static>(&self, task: Task<T>) -> Result<JoinHandle<T>, PoolError> {
        if self.in_flight.load(Ordering::Acquire) >= TPOOL_MAX_TASKS {
            return Err(PoolError::TooManyTasks);
        }
        self.in_flight.fetch_add(1, Ordering::AcqRel);

        let (runnable, handle) = task.into_parts();
        let in_flight = Arc::clone(&self.in_flight);
        let job: Job = Box::new(move || {
            runnable();
            in_flight.fetch_sub(1, Ordering::AcqRel);
        });

        let pending = self.in_flight.load(Ordering::Acquire);
        self.maybe_spawn_worker(pending);
        self.queue.enqueue(job);
        Ok(handle)
    }

    /// `pending` is the in-flight count as of this push, including itself --
    /// used instead of the `busy` counter (which only updates once a worker
    /// actually dequeues) so a burst of pushes spawns workers deterministically
    /// rather than racing the OS scheduler.
    fn maybe_spawn_worker(&self, pending: usize) {
        // Serialise spawn decisions through the same lock that guards the
        // handle vector, so two pushers can't both decide to spawn.
        let mut workers = self.workers.lock().unwrap();
        let live = self.live.load(Ordering::Acquire);
        if pending <= live || live >= self.max_threads {
            return;
        }

        let queue = Arc::clone(&self.queue);
        let live_counter = Arc::clone(&self.live);
        let busy_counter = Arc::clone(&self.busy);
        live_counter.fetch_add(1, Ordering::AcqRel);

        let handle = std::thread::spawn(move || worker_loop(queue, busy_counter, live_counter));
        workers.handles.push(handle);
    }

    /// Shuts the pool down, joining every worker. Fails without side
    /// effects if any task is still pending or running.
    pub fn shutdown(&self) -> Result<(), PoolError> {
        if self.in_flight.load(Ordering::Acquire) > 0 {
            return Err(PoolError::TasksInFlight);
        }
        self.queue.shutdown();
        let mut workers = self.workers.lock().unwrap();
        for handle in workers.handles.drain(..) {
            let _ = handle.join();
        }
        Ok(())
    }
}

fn worker_loop(queue: Arc<TaskQueue<Job>>, busy: Arc<AtomicUsize>, live: Arc<AtomicUsize>) {
    while let Some(job) = queue.dequeue() {
        busy.fetch_add(1, Ordering::AcqRel);
        job();
        busy.fetch_sub(1, Ordering::AcqRel);
    }
    live.fetch_sub(1, Ordering::AcqRel);
}

impl Drop for Pool {
    fn drop(&mut self) {
        if self.in_flight.load(Ordering::Acquire) > 0 {
            log::warn!("pool dropped with tasks still in flight; workers are detached, not joined");
        }
        self.queue.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn runs_a_single_task_and_joins_its_result() {
        let pool = Pool::new(2).unwrap();
        let handle = pool.push(Task::new(|| 2 + 2)).unwrap();
        assert_eq!(handle.join().unwrap(), 4);
        pool.shutdown().unwrap();
    }

    #[test]
    fn lazily_grows_workers_up_to_max() {
        let pool = Pool::new(4).unwrap();
        let release = Arc::new(std::sync::Mutex::new(false));
        let cv = Arc::new(std::sync::Condvar::new());

        let mut handles = Vec::new();
        for _ in 0..4 {
            let release = Arc::clone(&release);
            let cv = Arc::clone(&cv);
            handles.push(
                pool.push(Task::new(move || {
                    let mut guard = release.lock().unwrap();
                    while !*guard {
                        guard = cv.wait(guard).unwrap();
                    }
                }))
                .unwrap(),
            );
        }

        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(pool.live_workers(), 4);

        *release.lock().unwrap() = true;
        cv.notify_all();
        for h in handles {
            h.join().unwrap();
        }
        pool.shutdown().unwrap();
    }

    #[test]
    fn shutdown_refuses_while_a_task_is_in_flight() {
        let pool = Pool::new(1).unwrap();
        let release = Arc::new(std::sync::Mutex::new(false));
        let cv = Arc::new(std::sync::Condvar::new());
        let (r2, c2) = (Arc::clone(&release), Arc::clone(&cv));

        let handle = pool
            .push(Task::new(move || {
                let mut guard = r2.lock().unwrap();
                while !*guard {
                    guard = c2.wait(guard).unwrap();
                }
            }))
            .unwrap();

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(pool.shutdown(), Err(PoolError::TasksInFlight));

        *release.lock().unwrap() = true;
        cv.notify_all();
        handle.join().unwrap();
        pool.shutdown().unwrap();
    }

    #[test]
    fn invalid_thread_count_is_rejected() {
        assert_eq!(Pool::new(0), Err(PoolError::InvalidThreadCount));
        assert_eq!(Pool::new(TPOOL_MAX_THREADS + 1), Err(PoolError::InvalidThreadCount));
    }
}
