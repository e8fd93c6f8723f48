//! Built-in commands that must run in the shell's own process rather than a
//! forked child: `exit` and `cd` (a subprocess changing its own cwd would
//! have no observable effect on the shell).

use std::env;
use std::ffi::CStr;
use std::path::PathBuf;

/// Outcome of running a built-in, mirroring the exit-status contract the
/// pipeline executor expects from an external command.
#[derive(Debug, PartialEq, Eq)]
pub enum BuiltinOutcome {
    /// Ran to completion with this exit code.
    Ran(i32),
    /// The shell itself should stop reading more input, with this exit code.
    Exit(i32),
}

/// Returns `Some` with the outcome if `name` is a built-in, `None` if the
/// caller should fall through to `execvp`.
pub fn run(name: &str, args: &[String]) -> Option<BuiltinOutcome> {
    match name {
        "exit" => Some(BuiltinOutcome::Exit(parse_exit_code(args))),
        "cd" => Some(BuiltinOutcome::Ran(do_cd(args))),
        _ => None,
    }
}

/// Whether `name` names a built-in, without running it -- used by the
/// pipeline executor to decide whether a stage should be forked at all.
pub fn is_builtin(name: &str) -> bool {
    matches!(name, "exit" | "cd")
}

fn parse_exit_code(args: &[String]) -> i32 {
    args.first()
        .and_then(|s| s.parse::<i32>().ok())
        .unwrap_or(0)
}

fn do_cd(args: &[String]) -> i32 {
    let target = match args.first() {
        Some(dir) => PathBuf::from(dir),
        None => match home_dir() {
            Some(dir) => dir,
            None => {
                log::error!("cd: could not determine home directory");
                return 1;
            }
        },
    };

    match env::set_current_dir(&target) {
        Ok(()) => 0,
        Err(e) => {
            log::error!("cd: {}: {e}", target.display());
            1
        }
    }
}

/// `$HOME`, falling back to the passwd database entry for the effective
/// user, matching the original's `getenv` then `getpwuid` fallback.
fn home_dir() -> Option<PathBuf> {
    if let Ok(home) = env::var("HOME") {
        if !home.is_empty() {
            return Some(PathBuf::from(home));
        }
    }
    passwd_home_dir()
}

fn passwd_home_dir() -> Option<PathBuf> {
    unsafe {
        let uid = libc::geteuid();
        let pw = libc::getpwuid(uid);
        if pw.is_null() {
            return None;
        }
        let dir = (*pw).pw_dir;
        if dir.is_null() {
            return None;
        }
        let c_str = CStr::from_ptr(dir);
        Some(PathBuf::from(c_str.to_string_lossy().into_owned()))
    }
}
