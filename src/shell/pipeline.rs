//! Forks and wires up one [`Pipeline`]'s stages with `pipe`/`dup2`, the way
//! the original coursework's `exec_command.c` does it, plus the one
//! Rust-shaped deviation the original doesn't need: when the *last* stage of
//! a pipeline is a built-in, it runs in the shell's own process instead of
//! being forked, so `cd`/`exit` take effect. Its stdin/stdout are redirected
//! for the duration of the call (via `dup`/`dup2`, saved and restored
//! afterward) exactly as they would be for a forked stage.

use std::ffi::CString;
use std::io;
use std::os::unix::io::RawFd;

use super::builtins::{self, BuiltinOutcome};
use super::command::{Exe, Pipeline};

/// What happened to the shell process itself while running a pipeline.
#[derive(Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The pipeline ran (possibly as a mix of forked children and, for a
    /// trailing built-in, in-process) and finished with this exit status.
    Exited(i32),
    /// A trailing built-in was `exit`; the shell should stop.
    ShellExit(i32),
}

/// Runs one pipeline to completion and returns the exit status of its last
/// stage. `stdout_fd`, when set, redirects only the *last* stage's stdout
/// (e.g. for `>`/`>>` redirection); `None` means inherit the shell's.
pub fn run(pipeline: &Pipeline, stdout_fd: Option<RawFd>) -> io::Result<RunOutcome> {
    let stages: Vec<&Exe> = pipeline.stages().collect();
    let last_idx = stages.len() - 1;
    let last_is_builtin = builtins::is_builtin(&stages[last_idx].name);

    let mut prev_read: Option<RawFd> = None;
    let mut pids = Vec::with_capacity(stages.len());

    for (i, exe) in stages.iter().enumerate() {
        let is_last = i == last_idx;

        if is_last && last_is_builtin {
            let outcome = run_builtin_in_process(exe, prev_read, stdout_fd)?;
            close_quietly(prev_read);
            for pid in pids {
                waitpid_status(pid)?;
            }
            return Ok(match outcome {
                BuiltinOutcome::Ran(code) => RunOutcome::Exited(code),
                BuiltinOutcome::Exit(code) => RunOutcome::ShellExit(code),
            });
        }

        let pipe_fds = if !is_last { Some(make_pipe()?) } else { None };

        let pid = unsafe { libc::fork() };
        if pid < 0 {
            return Err(io::Error::last_os_error());
        }

        if pid == 0 {
            if let Some(read_fd) = prev_read {
                dup2_or_abort(read_fd, libc::STDIN_FILENO);
            }
            if let Some((_, write_fd)) = pipe_fds {
                dup2_or_abort(write_fd, libc::STDOUT_FILENO);
            } else if let Some(fd) = stdout_fd {
                dup2_or_abort(fd, libc::STDOUT_FILENO);
            }
            close_quietly(prev_read);
            if let Some((read_fd, write_fd)) = pipe_fds {
                close_quietly(Some(read_fd));
                close_quietly(Some(write_fd));
            }
            exec_or_abort(exe);
        }

        close_quietly(prev_read);
        if let Some((read_fd, write_fd)) = pipe_fds {
            close_quietly(Some(write_fd));
            prev_read = Some(read_fd);
        } else {
            prev_read = None;
        }
        pids.push(pid);
    }

    let mut last_status = 1;
    for (i, pid) in pids.into_iter().enumerate() {
        let status = waitpid_status(pid)?;
        if i == last_idx {
            last_status = status;
        }
    }
    Ok(RunOutcome::Exited(last_status))
}

/// Runs a built-in in the shell's own process, temporarily redirecting its
/// stdin (to `prev_read`, the previous stage's pipe) and stdout (to
/// `stdout_fd`, a `>`/`>>` redirect target) when set, restoring both
/// afterward.
fn run_builtin_in_process(
    exe: &Exe,
    prev_read: Option<RawFd>,
    stdout_fd: Option<RawFd>,
) -> io::Result<BuiltinOutcome> {
    let saved_stdin = match prev_read {
        Some(_) => Some(unsafe { libc::dup(libc::STDIN_FILENO) }),
        None => None,
    };
    let saved_stdout = match stdout_fd {
        Some(_) => Some(unsafe { libc::dup(libc::STDOUT_FILENO) }),
        None => None,
    };

    if let Some(read_fd) = prev_read {
        dup2_checked(read_fd, libc::STDIN_FILENO)?;
    }
    if let Some(fd) = stdout_fd {
        dup2_checked(fd, libc::STDOUT_FILENO)?;
    }

    let outcome =
        builtins::run(&exe.name, &exe.args).expect("caller already confirmed this is a built-in");

    if let Some(saved) = saved_stdin {
        dup2_checked(saved, libc::STDIN_FILENO)?;
        close_quietly(Some(saved));
    }
    if let Some(saved) = saved_stdout {
        dup2_checked(saved, libc::STDOUT_FILENO)?;
        close_quietly(Some(saved));
    }

    Ok(outcome)
}

fn make_pipe() -> io::Result<(RawFd, RawFd)> {
    let mut fds = [0; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok((fds[0], fds[1]))
}

fn dup2_or_abort(from: RawFd, to: RawFd) {
    if unsafe { libc::dup2(from, to) } < 0 {
        libc_abort();
    }
}

/// Like `dup2_or_abort`, but for use in the shell's own process: a failure
/// here must not take the whole shell down, so it returns an error instead.
fn dup2_checked(from: RawFd, to: RawFd) -> io::Result<()> {
    if unsafe { libc::dup2(from, to) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn close_quietly(fd: Option<RawFd>) {
    if let Some(fd) = fd {
        unsafe {
            libc::close(fd);
        }
    }
}

/// Runs in the child between `fork` and `execvp`; never returns.
fn exec_or_abort(exe: &Exe) -> ! {
    let argv = exe.argv();
    let c_strings: Vec<CString> = argv
        .iter()
        .map(|s| CString::new(*s).unwrap_or_else(|_| libc_abort()))
        .collect();
    let mut c_ptrs: Vec<*const libc::c_char> = c_strings.iter().map(|s| s.as_ptr()).collect();
    c_ptrs.push(std::ptr::null());

    unsafe {
        libc::execvp(c_ptrs[0], c_ptrs.as_ptr());
    }
    // execvp only returns on failure.
    eprintln!("{}: command not found", exe.name);
    std::process::exit(127);
}

fn libc_abort() -> ! {
    std::process::abort();
}

fn waitpid_status(pid: libc::pid_t) -> io::Result<i32> {
    let mut status = 0;
    loop {
        let r = unsafe { libc::waitpid(pid, &mut status, 0) };
        if r < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(err);
        }
        break;
    }
    if unsafe { libc::WIFEXITED(status) } {
        Ok(unsafe { libc::WEXITSTATUS(status) })
    } else {
        log::warn!("pid {pid} terminated by signal {}", unsafe { libc::WTERMSIG(status) });
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::command::Exe;

    #[test]
    fn single_external_command_runs_and_exits_zero() {
        let pipeline = Pipeline::single(Exe::new("true", vec![]));
        let outcome = run(&pipeline, None).unwrap();
        assert_eq!(outcome, RunOutcome::Exited(0));
    }

    #[test]
    fn failing_command_reports_nonzero_status() {
        let pipeline = Pipeline::single(Exe::new("false", vec![]));
        let outcome = run(&pipeline, None).unwrap();
        assert_eq!(outcome, RunOutcome::Exited(1));
    }

    #[test]
    fn trailing_builtin_runs_in_process() {
        let before = std::env::current_dir().unwrap();
        let pipeline = Pipeline::single(Exe::new(
            "cd",
            vec![std::env::temp_dir().to_string_lossy().into_owned()],
        ));
        let outcome = run(&pipeline, None).unwrap();
        assert_eq!(outcome, RunOutcome::Exited(0));
        std::env::set_current_dir(before).unwrap();
    }

    #[test]
    fn missing_command_exits_127() {
        let pipeline = Pipeline::single(Exe::new("definitely-not-a-real-command", vec![]));
        let outcome = run(&pipeline, None).unwrap();
        assert_eq!(outcome, RunOutcome::Exited(127));
    }

    #[test]
    fn trailing_builtin_after_a_piped_stage_runs_in_process() {
        let pipeline = Pipeline {
            first: Exe::new("echo", vec!["hi".to_string()]),
            piped: vec![Exe::new("cd", vec![std::env::temp_dir().to_string_lossy().into_owned()])],
        };
        let before = std::env::current_dir().unwrap();
        let outcome = run(&pipeline, None).unwrap();
        assert_eq!(outcome, RunOutcome::Exited(0));
        std::env::set_current_dir(before).unwrap();
    }
}
