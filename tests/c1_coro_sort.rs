//! End-to-end checks for the coroutine-driven external sort.

use std::fs;
use std::io::Write;
use std::time::Duration;

use sysprog_lab::coro::run_external_sort;

fn write_numbers(dir: &std::path::Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut f = fs::File::create(&path).unwrap();
    f.write_all(text.as_bytes()).unwrap();
    path
}

#[test]
fn sorts_a_single_scrambled_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_numbers(dir.path(), "a.txt", "5 -3 8 0 1\n");
    let output = dir.path().join("out.txt");

    run_external_sort(&[input], 1, Duration::from_millis(10), dir.path(), &output).unwrap();

    let result = fs::read_to_string(&output).unwrap();
    assert_eq!(result, "-3 0 1 5 8 ");
}

#[test]
fn merges_several_files_with_fewer_workers_than_files() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = vec![
        write_numbers(dir.path(), "a.txt", "9 2\n"),
        write_numbers(dir.path(), "b.txt", "4 1\n"),
        write_numbers(dir.path(), "c.txt", "7 3\n"),
        write_numbers(dir.path(), "d.txt", "6 5\n"),
    ];
    let output = dir.path().join("out.txt");

    run_external_sort(&inputs, 2, Duration::from_millis(5), dir.path(), &output).unwrap();

    let result = fs::read_to_string(&output).unwrap();
    let values: Vec<i32> = result
        .split_whitespace()
        .map(|s| s.parse().unwrap())
        .collect();
    let mut sorted = values.clone();
    sorted.sort();
    assert_eq!(values, sorted);
    assert_eq!(values, vec![1, 2, 3, 4, 5, 6, 7, 9]);
}

#[test]
fn handles_empty_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_numbers(dir.path(), "empty.txt", "");
    let output = dir.path().join("out.txt");

    run_external_sort(&[input], 1, Duration::from_millis(10), dir.path(), &output).unwrap();
    assert_eq!(fs::read_to_string(&output).unwrap(), "");
}
