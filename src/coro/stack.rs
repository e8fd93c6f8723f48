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

//! Guard-paged coroutine stacks.
//!
//! A coroutine stack is just memory with a red zone at one end; `context`'s
//! `ProtectedFixedSizeStack` already does the `mmap`/`mprotect` dance, so
//! this module only wraps it with the default size policy this crate uses.

use context::stack::ProtectedFixedSizeStack;

/// Default stack size for a spawned coroutine: 2 MiB.
pub const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Allocate a guard-paged stack of `size` bytes.
///
/// Allocation failure (OOM, or the platform refusing the guard-page
/// `mprotect`) is fatal: there's nothing sensible to do but abort.
pub fn allocate(size: usize) -> ProtectedFixedSizeStack {
    match ProtectedFixedSizeStack::new(size) {
        Ok(stack) => stack,
        Err(err) => panic!("failed to allocate a {}-byte coroutine stack: {}", size, err),
    }
}
