//! Orchestrates a full [`Command`]: `first` pipeline, then each chained
//! pipeline short-circuited by `&&`/`||`, with the trailing redirection (if
//! any) applied only to the last pipeline that actually runs, and the whole
//! thing forked off as a background job when `is_bg` is set.

use std::io;
use std::os::unix::io::RawFd;

use super::command::{ChainKind, Command};
use super::pipeline::{self, RunOutcome};

/// What the shell's read loop should do after running a command.
#[derive(Debug, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Ran to completion (status of the last pipeline actually executed).
    Exited(i32),
    /// Spawned as a background job with this PID; foreground loop continues
    /// immediately.
    Backgrounded(libc::pid_t),
    /// An `exit` built-in fired; the shell should stop reading input.
    ShellExit(i32),
}

/// Runs `command`'s chain of pipelines, applying `&&`/`||` short-circuiting.
pub fn run(command: &Command) -> io::Result<ChainOutcome> {
    if command.is_bg {
        return fork_background(command);
    }
    run_foreground(command).map(|status| match status {
        RunOutcome::Exited(code) => ChainOutcome::Exited(code),
        RunOutcome::ShellExit(code) => ChainOutcome::ShellExit(code),
    })
}

fn run_foreground(command: &Command) -> io::Result<RunOutcome> {
    let redirect_fd = command
        .redirect_filename
        .as_deref()
        .map(|path| open_redirect_target(path, command.append))
        .transpose()?;

    let last_index = command.chained.len();
    let mut status = run_one(&command.first, if last_index == 0 { redirect_fd } else { None })?;

    for (i, cond) in command.chained.iter().enumerate() {
        let succeeded = matches!(status, RunOutcome::Exited(0));
        let should_run = match cond.kind {
            ChainKind::And => succeeded,
            ChainKind::Or => !succeeded,
        };
        if !should_run {
            continue;
        }
        let is_last = i + 1 == last_index;
        status = run_one(&cond.pipeline, if is_last { redirect_fd } else { None })?;
    }

    if let Some(fd) = redirect_fd {
        unsafe {
            libc::close(fd);
        }
    }
    Ok(status)
}

fn run_one(p: &super::command::Pipeline, fd: Option<RawFd>) -> io::Result<RunOutcome> {
    pipeline::run(p, fd)
}

fn open_redirect_target(path: &str, append: bool) -> io::Result<RawFd> {
    let c_path = std::ffi::CString::new(path)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "redirect path contains a NUL byte"))?;
    let flags = libc::O_WRONLY | libc::O_CREAT | if append { libc::O_APPEND } else { libc::O_TRUNC };
    let fd = unsafe { libc::open(c_path.as_ptr(), flags, 0o644) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(fd)
}

/// Forks the whole command chain into a background job and returns
/// immediately with its PID; the caller is responsible for reaping it (see
/// [`super::reaper`]).
fn fork_background(command: &Command) -> io::Result<ChainOutcome> {
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(io::Error::last_os_error());
    }
    if pid == 0 {
        let status = run_foreground(command).unwrap_or(RunOutcome::Exited(1));
        let code = match status {
            RunOutcome::Exited(c) => c,
            RunOutcome::ShellExit(c) => c,
        };
        std::process::exit(code);
    }
    log::debug!("backgrounded pid {pid}");
    Ok(ChainOutcome::Backgrounded(pid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::command::{Exe, Pipeline};

    fn single(name: &str, args: &[&str]) -> Command {
        Command::new(Pipeline::single(Exe::new(
            name,
            args.iter().map(|s| s.to_string()).collect(),
        )))
    }

    #[test]
    fn and_chain_runs_second_only_on_success() {
        let mut cmd = single("true", &[]);
        cmd.chained.push(super::super::command::PipelineCondition {
            kind: ChainKind::And,
            pipeline: Pipeline::single(Exe::new("false", vec![])),
        });
        assert_eq!(run(&cmd).unwrap(), ChainOutcome::Exited(1));
    }

    #[test]
    fn and_chain_skips_second_on_failure() {
        let mut cmd = single("false", &[]);
        cmd.chained.push(super::super::command::PipelineCondition {
            kind: ChainKind::And,
            pipeline: Pipeline::single(Exe::new("true", vec![])),
        });
        assert_eq!(run(&cmd).unwrap(), ChainOutcome::Exited(1));
    }

    #[test]
    fn or_chain_runs_second_only_on_failure() {
        let mut cmd = single("false", &[]);
        cmd.chained.push(super::super::command::PipelineCondition {
            kind: ChainKind::Or,
            pipeline: Pipeline::single(Exe::new("true", vec![])),
        });
        assert_eq!(run(&cmd).unwrap(), ChainOutcome::Exited(0));
    }

    #[test]
    fn background_returns_immediately_with_a_pid() {
        let mut cmd = single("true", &[]);
        cmd.is_bg = true;
        match run(&cmd).unwrap() {
            ChainOutcome::Backgrounded(pid) => {
                let mut status = 0;
                unsafe { libc::waitpid(pid, &mut status, 0) };
            }
            other => panic!("expected Backgrounded, got {other:?}"),
        }
    }
}
