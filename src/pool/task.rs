//! A unit of work submitted to a [`super::Pool`], carrying its own result
//! slot and completion signal.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum State {
    Created = 0,
    Pending = 1,
    Running = 2,
    Finished = 3,
    Joined = 4,
    Destroyed = 5,
}

impl State {
    fn from_u8(v: u8) -> State {
        match v {
            0 => State::Created,
            1 => State::Pending,
            2 => State::Running,
            3 => State::Finished,
            4 => State::Joined,
            _ => State::Destroyed,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TaskError {
    #[error("task was never pushed to a pool")]
    NotPushed,
    #[error("task is still queued or running and cannot be destroyed")]
    InPool,
}

struct Shared<T> {
    state: AtomicU8,
    result: Mutex<Option<T>>,
    completion: Condvar,
}

/// A unit of work not yet submitted to a pool.
pub struct Task<T> {
    shared: Arc<Shared<T>>,
    job: Box<dyn FnOnce() -> T + Send>,
}

impl<T: Send + 'static> Task<T> {
    pub fn new<F>(job: F) -> Task<T>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        Task {
            shared: Arc::new(Shared {
                state: AtomicU8::new(State::Created as u8),
                result: Mutex::new(None),
                completion: Condvar::new(),
            }),
            job: Box::new(job),
        }
    }

    /// A handle usable before the task is ever pushed; `join()` on it fails
    /// with [`TaskError::NotPushed`] unless the pool's `push` has run.
    pub fn handle(&self) -> JoinHandle<T> {
        JoinHandle { shared: Arc::clone(&self.shared), pushed: Arc::new(AtomicU8::new(0)) }
    }

    /// Consumed by [`super::Pool::push`]: marks the task `Pending` and
    /// returns the boxed closure the worker will run, plus a linked
    /// [`JoinHandle`] the caller can use to wait for the result.
    pub(super) fn into_parts(self) -> (Box<dyn FnOnce() + Send>, JoinHandle<T>) {
        self.shared.state.store(State::Pending as u8, Ordering::Release);
        let shared = self.shared;
        let handle_shared = Arc::clone(&shared);
        let runnable: Box<dyn FnOnce() + Send> = Box::new(move || {
            shared.state.store(State::Running as u8, Ordering::Release);
            let result = (self.job)();
            *shared.result.lock().unwrap() = Some(result);
            shared.state.store(State::Finished as u8, Ordering::Release);
            shared.completion.notify_all();
        });
        (runnable, JoinHandle { shared: handle_shared, pushed: Arc::new(AtomicU8::new(1)) })
    }
}

/// Returned by [`super::Pool::push`]; lets the caller wait for the task's
/// result independently of the pool.
pub struct JoinHandle<T> {
    shared: Arc<Shared<T>>,
    pushed: Arc<AtomicU8>,
}

impl<T> JoinHandle<T> {
    fn state(&self) -> State {
        State::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state(), State::Finished | State::Joined)
    }

    pub fn is_running(&self) -> bool {
        self.state() == State::Running
    }

    /// Blocks until the task finishes and returns its result, transitioning
    /// it to `Joined`. Fails if the task was never pushed to a pool.
    pub fn join(&self) -> Result<T, TaskError> {
        if self.pushed.load(Ordering::Acquire) == 0 {
            return Err(TaskError::NotPushed);
        }
        let mut guard = self.shared.result.lock().unwrap();
        while guard.is_none() {
            guard = self.shared.completion.wait(guard).unwrap();
        }
        let result = guard.take().expect("result present once state is Finished");
        self.shared.state.store(State::Joined as u8, Ordering::Release);
        Ok(result)
    }

    /// Only `Created` or `Joined` tasks may be destroyed; anything still
    /// live in a pool's queue or running refuses.
    pub fn destroy(self) -> Result<(), TaskError> {
        match self.state() {
            State::Created | State::Joined => {
                self.shared.state.store(State::Destroyed as u8, Ordering::Release);
                Ok(())
            }
            _ => Err(TaskError::InPool),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_before_push_reports_not_finished() {
        let t = Task::new(|| 1);
        let h = t.handle();
        assert!(!h.is_finished());
    }

    #[test]
    fn join_without_push_fails() {
        let t: Task<i32> = Task::new(|| 1);
        let h = t.handle();
        assert_eq!(h.join(), Err(TaskError::NotPushed));
    }

    #[test]
    fn into_parts_runs_job_and_handle_observes_result() {
        let t = Task::new(|| 42);
        let (runnable, handle) = t.into_parts();
        runnable();
        assert!(handle.is_finished());
        assert_eq!(handle.join().unwrap(), 42);
    }
}
