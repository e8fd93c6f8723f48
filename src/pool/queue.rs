//! FIFO task queue behind a `Mutex`/`Condvar`, as named in §4.4 -- the
//! source repository's lock-free MS-queue experiment is not ported (see
//! DESIGN.md).

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

pub struct TaskQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
}

struct Inner<T> {
    items: VecDeque<T>,
    shutdown: bool,
}

impl<T> TaskQueue<T> {
    pub fn new() -> TaskQueue<T> {
        TaskQueue {
            inner: Mutex::new(Inner { items: VecDeque::new(), shutdown: false }),
            not_empty: Condvar::new(),
        }
    }

    pub fn enqueue(&self, item: T) {
        let mut inner = self.inner.lock().unwrap();
        inner.items.push_back(item);
        self.not_empty.notify_one();
    }

    /// Blocks until an item is available or the queue is shut down, in
    /// which case it returns `None`.
    pub fn dequeue(&self) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(item) = inner.items.pop_front() {
                return Some(item);
            }
            if inner.shutdown {
                return None;
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shutdown(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.shutdown = true;
        self.not_empty.notify_all();
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> TaskQueue<T> {
        TaskQueue::new()
    }
}
