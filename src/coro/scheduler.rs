// The MIT License (MIT)

// Copyright (c) 2015 Rustcc Developers

// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:

// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! FIFO cooperative scheduler.
//!
//! Deliberately not a `thread_local!` global: one scheduler exists per sort
//! run, constructed and owned by the caller, so it is just a plain struct.

use std::collections::VecDeque;
use std::time::Duration;

use log::debug;

use super::coroutine::{Coroutine, Stats, Yielder};
use super::stack::DEFAULT_STACK_SIZE;

pub struct Scheduler {
    quantum: Duration,
    ready: VecDeque<Coroutine>,
    spawned: usize,
}

impl Scheduler {
    /// Create a scheduler with a fixed per-coroutine time quantum.
    pub fn new(quantum: Duration) -> Scheduler {
        Scheduler {
            quantum,
            ready: VecDeque::new(),
            spawned: 0,
        }
    }

    pub fn quantum(&self) -> Duration {
        self.quantum
    }

    /// Add a new, not-yet-started coroutine to the ready list.
    pub fn spawn<F>(&mut self, name: Option<String>, f: F)
    where
        F: FnOnce(Yielder) + 'static,
    {
        let coro = Coroutine::new(name, self.quantum, DEFAULT_STACK_SIZE, f);
        self.spawned += 1;
        debug!(
            "scheduler: spawned coroutine {:?} (total spawned: {})",
            coro.name(),
            self.spawned
        );
        self.ready.push_back(coro);
    }

    /// Run the ready list until one coroutine finishes, returning its final
    /// stats. Returns `None` once every spawned coroutine has finished.
    ///
    /// Calling this repeatedly drains the scheduler: each call resumes
    /// coroutines FIFO until exactly one of them completes.
    pub fn sched_wait(&mut self) -> Option<Stats> {
        while let Some(mut coro) = self.ready.pop_front() {
            let name = coro.name().map(str::to_owned);
            let finished = coro.step();

            if finished {
                debug!("scheduler: coroutine {:?} finished: {:?}", name, coro.stats());
                return Some(coro.stats());
            }

            debug!("scheduler: coroutine {:?} suspended: {:?}", name, coro.stats());
            self.ready.push_back(coro);
        }

        None
    }

    /// Run every spawned coroutine to completion, in finish order.
    pub fn run_to_completion(&mut self) -> Vec<Stats> {
        let mut finished = Vec::with_capacity(self.spawned);
        while let Some(stats) = self.sched_wait() {
            finished.push(stats);
        }
        finished
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn runs_coroutines_to_completion() {
        let mut sched = Scheduler::new(Duration::from_micros(100));
        let log = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let log = log.clone();
            sched.spawn(Some(format!("c{}", i)), move |yielder| {
                log.borrow_mut().push(i);
                yielder.maybe_yield();
                log.borrow_mut().push(i + 10);
            });
        }

        let finished = sched.run_to_completion();
        assert_eq!(finished.len(), 3);
        assert!(sched.is_empty());
        // every coroutine ran both halves of its body
        let log = log.borrow();
        for i in 0..3 {
            assert!(log.contains(&i));
            assert!(log.contains(&(i + 10)));
        }
    }

    #[test]
    fn quantum_fairness_within_one_switch() {
        // With a zero quantum every `maybe_yield()` is a real switch, so two
        // coroutines doing the same number of yields should end up with
        // switch counts within 1 of each other (FIFO round-robin).
        let mut sched = Scheduler::new(Duration::from_nanos(0));

        for i in 0..2usize {
            sched.spawn(Some(format!("c{}", i)), move |yielder| {
                for _ in 0..50 {
                    yielder.maybe_yield();
                }
            });
        }

        let finished = sched.run_to_completion();
        assert_eq!(finished.len(), 2);
        assert_eq!(finished[0].false_switch_count, 0);
        let diff = finished[0].switch_count.abs_diff(finished[1].switch_count);
        assert!(diff <= 1, "switch counts should be within 1: {:?}", finished);
    }
}
