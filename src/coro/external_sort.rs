//! The C1 driver: sort N integer files with a pool of cooperative
//! coroutines, then merge the per-file sorted runs into one text output.

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use log::{debug, info};

use super::coroutine::Yielder;
use super::merge_heap::MergeHeap;
use super::number_reader::FileNumberReader;
use super::scheduler::Scheduler;
use super::sorted_run::SortedRun;

/// One input file's assignment: where to read from, where to stash the
/// sorted run before merging.
struct SortJob {
    input: PathBuf,
    run_path: PathBuf,
}

/// Sort `inputs` with `coro_count` worker coroutines sharing `total_latency`
/// (split evenly over `inputs.len()` the way the original divides the
/// overall budget by file count, not worker count), writing the final
/// merged, space-separated ascending sequence to `output_path`.
pub fn run(
    inputs: &[PathBuf],
    coro_count: usize,
    total_latency: Duration,
    temp_dir: &Path,
    output_path: &Path,
) -> io::Result<()> {
    assert!(!inputs.is_empty(), "at least one input file is required");
    assert!(coro_count > 0, "coro_count must be positive");

    let quantum = total_latency / inputs.len() as u32;
    info!(
        "coro-sort: {} files, {} workers, quantum {:?}",
        inputs.len(),
        coro_count,
        quantum
    );

    let jobs: Vec<SortJob> = inputs
        .iter()
        .enumerate()
        .map(|(i, input)| SortJob {
            input: input.clone(),
            run_path: temp_dir.join(format!("run-{i}.bin")),
        })
        .collect();

    // A shared work stack of job indices: each worker coroutine pops until
    // it's empty, so `coro_count` may be smaller than the file count.
    let work: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new((0..jobs.len()).rev().collect()));
    let jobs = Rc::new(jobs);

    let mut scheduler = Scheduler::new(quantum);
    for worker_id in 0..coro_count {
        let work = work.clone();
        let jobs = jobs.clone();
        scheduler.spawn(Some(format!("sort-worker-{worker_id}")), move |yielder| {
            loop {
                let next = work.borrow_mut().pop();
                let Some(job_idx) = next else { break };
                let job = &jobs[job_idx];
                sort_one_file(&job.input, &job.run_path, &yielder)
                    .unwrap_or_else(|e| panic!("sorting {:?} failed: {}", job.input, e));
                yielder.maybe_yield();
            }
        });
    }

    for stats in scheduler.run_to_completion() {
        debug!("coro-sort: worker finished: {:?}", stats);
    }

    let run_paths: Vec<PathBuf> = jobs.iter().map(|j| j.run_path.clone()).collect();
    merge_runs(&run_paths, output_path)
}

/// Stream-parse integers out of `input`, keep them in a `SortedRun`, then
/// write the sorted array as raw little-endian `i32`s to `run_path`,
/// yielding after every parsed integer and after the write.
fn sort_one_file(input: &Path, run_path: &Path, yielder: &Yielder) -> io::Result<()> {
    let f = File::open(input)?;
    let mut reader = FileNumberReader::new(f);
    let mut run = SortedRun::new();

    while let Some(n) = reader.next_number()? {
        run.insert(n);
        yielder.maybe_yield();
    }

    let mut out = BufWriter::new(File::create(run_path)?);
    for v in run.as_slice() {
        out.write_all(&v.to_le_bytes())?;
    }
    out.flush()?;
    yielder.maybe_yield();

    Ok(())
}

const OUTPUT_BUF_SIZE: usize = 4096;

/// Multi-way merge of the per-file little-endian `i32` runs into a
/// space-separated ascending text file.
fn merge_runs(run_paths: &[PathBuf], output_path: &Path) -> io::Result<()> {
    let mut sources: Vec<File> = run_paths
        .iter()
        .map(File::open)
        .collect::<io::Result<_>>()?;

    let mut heap = MergeHeap::new();
    for (idx, f) in sources.iter_mut().enumerate() {
        if let Some(v) = read_i32(f)? {
            heap.push(v, idx);
        }
    }

    let out = File::create(output_path)?;
    let mut out = BufWriter::with_capacity(OUTPUT_BUF_SIZE, out);

    while let Some((value, source)) = heap.pop() {
        write!(out, "{value} ")?;
        if let Some(next) = read_i32(&mut sources[source])? {
            heap.push(next, source);
        }
    }

    out.flush()
}

fn read_i32(f: &mut File) -> io::Result<Option<i32>> {
    let mut buf = [0u8; 4];
    match f.read_exact(&mut buf) {
        Ok(()) => Ok(Some(i32::from_le_bytes(buf))),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn sorts_and_merges_scenario_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, "3 1 2\n").unwrap();
        let output = dir.path().join("result.txt");

        run(&[input], 1, Duration::from_micros(100_000), dir.path(), &output).unwrap();

        let contents = fs::read_to_string(&output).unwrap();
        assert_eq!(contents, "1 2 3 ");
    }

    #[test]
    fn merges_multiple_files_as_sorted_permutation() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "5 2 8 1").unwrap();
        fs::write(&b, "9 0 -3").unwrap();
        let output = dir.path().join("result.txt");

        run(
            &[a, b],
            2,
            Duration::from_micros(100_000),
            dir.path(),
            &output,
        )
        .unwrap();

        let contents = fs::read_to_string(&output).unwrap();
        let got: Vec<i32> = contents.split_whitespace().map(|s| s.parse().unwrap()).collect();
        let mut expected = vec![5, 2, 8, 1, 9, 0, -3];
        expected.sort();
        assert_eq!(got, expected);
    }

    #[test]
    fn worker_count_can_be_fewer_than_files() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = (0..5)
            .map(|i| {
                let p = dir.path().join(format!("f{i}.txt"));
                fs::write(&p, format!("{} {}", i, -(i as i64))).unwrap();
                p
            })
            .collect();
        let output = dir.path().join("result.txt");

        run(&files, 2, Duration::from_micros(100_000), dir.path(), &output).unwrap();

        let contents = fs::read_to_string(&output).unwrap();
        let got: Vec<i64> = contents.split_whitespace().map(|s| s.parse().unwrap()).collect();
        assert_eq!(got.len(), 10);
        let mut sorted = got.clone();
        sorted.sort();
        assert_eq!(got, sorted);
    }
}
