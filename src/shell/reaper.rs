//! Reaps backgrounded children without blocking the foreground read loop.
//!
//! Uses the self-pipe trick: the `SIGCHLD` handler does nothing but write a
//! single byte to a pipe (the only kind of thing that's async-signal-safe),
//! and [`ChildReaper::drain`] -- called from the main loop between prompts --
//! does the actual `waitpid`/logging once control is back in normal code.

use std::io::{self, Read};
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicI32, Ordering};

static SELF_PIPE_WRITE: AtomicI32 = AtomicI32::new(-1);

extern "C" fn on_sigchld(_sig: libc::c_int) {
    let fd = SELF_PIPE_WRITE.load(Ordering::Relaxed);
    if fd >= 0 {
        let byte = [0u8; 1];
        unsafe {
            libc::write(fd, byte.as_ptr() as *const libc::c_void, 1);
        }
    }
}

pub struct ChildReaper {
    read_fd: RawFd,
}

impl ChildReaper {
    /// Installs the `SIGCHLD` handler and opens the self-pipe. Only one
    /// instance should exist per process.
    pub fn install() -> io::Result<ChildReaper> {
        let mut fds = [0; 2];
        if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
            return Err(io::Error::last_os_error());
        }
        let (read_fd, write_fd) = (fds[0], fds[1]);
        set_nonblocking(read_fd)?;
        SELF_PIPE_WRITE.store(write_fd, Ordering::Relaxed);

        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = on_sigchld as usize;
            libc::sigemptyset(&mut action.sa_mask);
            action.sa_flags = libc::SA_RESTART;
            if libc::sigaction(libc::SIGCHLD, &action, std::ptr::null_mut()) < 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(ChildReaper { read_fd })
    }

    /// The self-pipe's read end, so the main loop can include it in a
    /// `poll`/`select` set alongside stdin.
    pub fn notify_fd(&self) -> RawFd {
        self.read_fd
    }

    /// Drains the self-pipe and reaps every exited (or signalled) child that
    /// is ready, without blocking. Returns the `(pid, exit_status)` pairs
    /// reaped, for logging.
    pub fn drain(&self) -> Vec<(libc::pid_t, i32)> {
        let mut buf = [0u8; 64];
        loop {
            let n = unsafe {
                libc::read(self.read_fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len())
            };
            if n <= 0 {
                break;
            }
        }

        let mut reaped = Vec::new();
        loop {
            let mut status = 0;
            let pid = unsafe { libc::waitpid(-1, &mut status, libc::WNOHANG) };
            if pid <= 0 {
                break;
            }
            let code = if unsafe { libc::WIFEXITED(status) } {
                unsafe { libc::WEXITSTATUS(status) }
            } else {
                128 + unsafe { libc::WTERMSIG(status) }
            };
            log::info!("background job {pid} finished with status {code}");
            reaped.push((pid, code));
        }
        reaped
    }
}

impl Drop for ChildReaper {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.read_fd);
        }
    }
}

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL, 0);
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_reaps_a_finished_child() {
        let reaper = ChildReaper::install().expect("install reaper");
        let pid = unsafe { libc::fork() };
        if pid == 0 {
            std::process::exit(0);
        }
        std::thread::sleep(std::time::Duration::from_millis(100));
        let reaped = reaper.drain();
        assert!(reaped.iter().any(|&(p, code)| p == pid && code == 0));
    }
}
