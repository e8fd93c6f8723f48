//! End-to-end checks for the thread pool's join/shutdown contract.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sysprog_lab::pool::{Pool, PoolError, Task};

#[test]
fn runs_many_tasks_and_collects_their_results() {
    let pool = Pool::new(8).unwrap();
    let handles: Vec<_> = (0..50)
        .map(|i| pool.push(Task::new(move || i * i)).unwrap())
        .collect();

    let results: Vec<i32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let expected: Vec<i32> = (0..50).map(|i| i * i).collect();
    assert_eq!(results, expected);

    pool.shutdown().unwrap();
}

#[test]
fn shared_counter_sees_exactly_one_increment_per_task() {
    let pool = Pool::new(4).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let counter = Arc::clone(&counter);
            pool.push(Task::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap()
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(counter.load(Ordering::SeqCst), 100);
    pool.shutdown().unwrap();
}

#[test]
fn destroying_a_joined_task_handle_succeeds() {
    let pool = Pool::new(1).unwrap();
    let handle = pool.push(Task::new(|| 1)).unwrap();
    handle.join().unwrap();
    handle.destroy().unwrap();
    pool.shutdown().unwrap();
}

#[test]
fn invalid_pool_size_is_rejected() {
    assert_eq!(Pool::new(0), Err(PoolError::InvalidThreadCount));
}
