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

//! A single cooperatively-scheduled coroutine.
//!
//! A `Coroutine` is an ordinary owned value: the `Scheduler` holds it in its
//! ready list and nobody else needs to reach it through global state. The
//! one genuinely global piece of state is the thread-local "where do I jump
//! back to" context, which is unavoidable because that's the one thing the
//! *running* coroutine body can't be handed as a plain argument without
//! threading it through every call in the stack.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use context::stack::ProtectedFixedSizeStack;
use context::{Context, Transfer};

use super::stack;

thread_local! {
    /// The context to resume into when the running coroutine yields or
    /// finishes. Swapped in right before a coroutine is stepped, and taken
    /// back out (and replaced with the fresh one handed back by `resume`)
    /// every time control returns here.
    static YIELD_BACK: RefCell<Option<Context>> = RefCell::new(None);
}

/// Sentinel `Transfer::data` value used by the entry trampoline to signal
/// that the coroutine's function has returned and the coroutine is done.
const DATA_FINISHED: usize = 1;
const DATA_YIELD: usize = 0;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub switch_count: u64,
    pub false_switch_count: u64,
    pub work_time: Duration,
}

/// Handle passed into a coroutine's body, used to cooperatively yield.
///
/// Cloneable (it's just a few `Rc<Cell<_>>`s) so the spawned closure can move
/// it into sub-helpers freely.
#[derive(Clone)]
pub struct Yielder {
    quantum: Duration,
    false_switch_count: Rc<Cell<u64>>,
}

impl Yielder {
    /// Yield to the scheduler if this coroutine's current time slice has run
    /// at least `quantum`; otherwise returns immediately without switching
    /// (a "false switch").
    pub fn maybe_yield(&self) {
        // `Coroutine::step` re-stamps the start time immediately before
        // every real switch into this coroutine, so we don't need our own
        // clock state here: we just ask whether *this* slice has run long
        // enough. A false switch never leaves this function via
        // `yield_now`, so the scheduler never observes it.
        if !self.quantum_elapsed() {
            self.false_switch_count.set(self.false_switch_count.get() + 1);
            return;
        }
        yield_now();
    }

    fn quantum_elapsed(&self) -> bool {
        SLICE_START.with(|s| match s.get() {
            Some(start) => start.elapsed() >= self.quantum,
            None => true,
        })
    }
}

thread_local! {
    /// When the currently-running coroutine's time slice started. Re-armed
    /// by `Coroutine::step` right before every step.
    static SLICE_START: Cell<Option<Instant>> = Cell::new(None);
}

pub(crate) fn arm_slice_start(now: Instant) {
    SLICE_START.with(|s| s.set(Some(now)));
}

/// Unconditionally switch back to the scheduler. Only valid while running
/// inside a coroutine body (i.e. between `coroutine_entry` being invoked and
/// the body returning).
fn yield_now() {
    YIELD_BACK.with(|cell| {
        let ctx = cell
            .borrow_mut()
            .take()
            .expect("yield_now() called outside of a running coroutine");
        let t = unsafe { ctx.resume(DATA_YIELD) };
        *cell.borrow_mut() = Some(t.context);
    });
}

/// The boxed job smuggled into the entry trampoline via `Transfer::data`.
type Job = Box<dyn FnOnce(Yielder) + 'static>;

extern "C" fn coroutine_entry(t: Transfer) -> ! {
    let job_ptr = t.data as *mut (Job, Yielder);
    let (job, yielder) = *unsafe { Box::from_raw(job_ptr) };

    YIELD_BACK.with(|cell| *cell.borrow_mut() = Some(t.context));

    job(yielder);

    let ctx = YIELD_BACK.with(|cell| {
        cell.borrow_mut()
            .take()
            .expect("yield-back context vanished before coroutine could finish")
    });
    // Never returns: the scheduler sees `DATA_FINISHED` and will not step
    // this coroutine again.
    unsafe {
        ctx.resume(DATA_FINISHED);
    }
    unreachable!("resumed a finished coroutine");
}

/// A single coroutine: a dedicated stack, a saved context, and the
/// bookkeeping the scheduler needs for fairness accounting.
pub struct Coroutine {
    name: Option<String>,
    stack: Option<ProtectedFixedSizeStack>,
    context: Option<Context>,
    /// Argument for the *next* `resume()` call. Only ever non-zero for the
    /// very first step, where it carries the pointer to the boxed job.
    next_resume_arg: usize,
    finished: bool,
    switch_count: u64,
    work_time: Duration,
    false_switch_count: Rc<Cell<u64>>,
}

impl Coroutine {
    /// Create a new coroutine. It is not started: it only becomes runnable
    /// once handed to a `Scheduler`.
    pub fn new<F>(name: Option<String>, quantum: Duration, stack_size: usize, f: F) -> Coroutine
    where
        F: FnOnce(Yielder) + 'static,
    {
        let stack = stack::allocate(stack_size);
        let context = Context::new(&stack, coroutine_entry);

        let false_switch_count = Rc::new(Cell::new(0));
        let yielder = Yielder {
            quantum,
            false_switch_count: false_switch_count.clone(),
        };

        let job: Job = Box::new(f);
        let boxed = Box::new((job, yielder));
        let next_resume_arg = Box::into_raw(boxed) as usize;

        Coroutine {
            name,
            stack: Some(stack),
            context: Some(context),
            next_resume_arg,
            finished: false,
            switch_count: 0,
            work_time: Duration::ZERO,
            false_switch_count,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn stats(&self) -> Stats {
        Stats {
            switch_count: self.switch_count,
            false_switch_count: self.false_switch_count.get(),
            work_time: self.work_time,
        }
    }

    /// Resume this coroutine for one slice. Returns `true` if the coroutine
    /// finished during this step.
    pub(crate) fn step(&mut self) -> bool {
        debug_assert!(!self.finished, "stepping a finished coroutine");

        let start = Instant::now();
        arm_slice_start(start);

        let ctx = self
            .context
            .take()
            .expect("coroutine context missing: stepped while already running?");
        let arg = std::mem::replace(&mut self.next_resume_arg, DATA_YIELD);
        let t = unsafe { ctx.resume(arg) };

        self.switch_count += 1;
        self.work_time += start.elapsed();

        if t.data == DATA_FINISHED {
            self.finished = true;
            // The coroutine's stack is never reused again; drop it together
            // with the (now invalid) context.
            self.stack.take();
        } else {
            self.context = Some(t.context);
        }

        self.finished
    }
}

