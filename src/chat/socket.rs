//! Thin raw-`libc` socket helpers shared by the server and client event
//! loops. Every socket handled here is non-blocking; `recv_into` reports
//! `EAGAIN`/`EWOULDBLOCK` and an orderly peer shutdown as distinct
//! [`RecvStatus`] variants rather than folding both into success.

use std::io;
use std::mem;
use std::net::Ipv4Addr;
use std::os::unix::io::RawFd;

pub fn set_nonblocking(fd: RawFd) -> io::Result<()> {
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

pub fn listen(port: u16) -> io::Result<RawFd> {
    unsafe {
        let fd = libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0);
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        let one: libc::c_int = 1;
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &one as *const _ as *const libc::c_void,
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        );

        let mut addr: libc::sockaddr_in = mem::zeroed();
        addr.sin_family = libc::AF_INET as libc::sa_family_t;
        addr.sin_port = port.to_be();
        addr.sin_addr.s_addr = u32::from(Ipv4Addr::UNSPECIFIED).to_be();

        let bind_result = libc::bind(
            fd,
            &addr as *const _ as *const libc::sockaddr,
            mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        );
        if bind_result < 0 {
            let err = io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }

        if libc::listen(fd, 128) < 0 {
            let err = io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }

        set_nonblocking(fd)?;
        Ok(fd)
    }
}

pub fn connect(addr: &str) -> io::Result<RawFd> {
    let sock_addr = std::net::SocketAddrV4::from(parse_addr(addr)?);
    unsafe {
        let fd = libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0);
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        let mut raw: libc::sockaddr_in = mem::zeroed();
        raw.sin_family = libc::AF_INET as libc::sa_family_t;
        raw.sin_port = sock_addr.port().to_be();
        raw.sin_addr.s_addr = u32::from(*sock_addr.ip()).to_be();

        let r = libc::connect(
            fd,
            &raw as *const _ as *const libc::sockaddr,
            mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        );
        if r < 0 {
            let err = io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }

        set_nonblocking(fd)?;
        Ok(fd)
    }
}

fn parse_addr(addr: &str) -> io::Result<std::net::SocketAddrV4> {
    use std::net::ToSocketAddrs;
    addr.to_socket_addrs()?
        .find_map(|a| match a {
            std::net::SocketAddr::V4(v4) => Some(v4),
            std::net::SocketAddr::V6(_) => None,
        })
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no IPv4 address"))
}

/// Accepts one pending connection, if any. `Ok(None)` means nothing was
/// waiting (`EAGAIN`); any other error is genuine.
pub fn accept(listen_fd: RawFd) -> io::Result<Option<RawFd>> {
    unsafe {
        let fd = libc::accept(listen_fd, std::ptr::null_mut(), std::ptr::null_mut());
        if fd < 0 {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::EAGAIN) | Some(libc::EWOULDBLOCK) => Ok(None),
                _ => Err(err),
            };
        }
        set_nonblocking(fd)?;
        Ok(Some(fd))
    }
}

/// Outcome of one non-blocking `recv` call. `EAGAIN`/`EWOULDBLOCK` and a
/// genuine orderly shutdown both used to collapse to `Ok(0)`, which left
/// callers unable to tell "nothing to read yet" from "the peer hung up" --
/// this type keeps them apart.
#[derive(Debug, PartialEq, Eq)]
pub enum RecvStatus {
    /// `n` bytes were read.
    Data(usize),
    /// No data was available right now; the connection is still open.
    WouldBlock,
    /// The peer performed an orderly shutdown.
    Closed,
}

/// Reads up to `buf.len()` bytes.
pub fn recv_into(fd: RawFd, buf: &mut [u8]) -> io::Result<RecvStatus> {
    unsafe {
        let n = libc::recv(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), 0);
        if n < 0 {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::EAGAIN) | Some(libc::EWOULDBLOCK) => Ok(RecvStatus::WouldBlock),
                _ => Err(err),
            };
        }
        if n == 0 {
            return Ok(RecvStatus::Closed);
        }
        Ok(RecvStatus::Data(n as usize))
    }
}

pub fn send_from(fd: RawFd, buf: &[u8]) -> io::Result<usize> {
    unsafe {
        let n = libc::send(fd, buf.as_ptr() as *const libc::c_void, buf.len(), libc::MSG_NOSIGNAL);
        if n < 0 {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::EAGAIN) | Some(libc::EWOULDBLOCK) => Ok(0),
                _ => Err(err),
            };
        }
        Ok(n as usize)
    }
}

/// `pollfd` events bitmask built from `(fd, readable, writable)` triples.
/// Blocks up to `timeout_ms` (negative means forever). Returns the number
/// of fds with ready events, or `Ok(0)` on timeout.
pub fn poll(entries: &mut [libc::pollfd], timeout_ms: i32) -> io::Result<usize> {
    let r = unsafe { libc::poll(entries.as_mut_ptr(), entries.len() as libc::nfds_t, timeout_ms) };
    if r < 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            return Ok(0);
        }
        return Err(err);
    }
    Ok(r as usize)
}

pub fn pollfd(fd: RawFd, writable: bool) -> libc::pollfd {
    libc::pollfd {
        fd,
        events: libc::POLLIN | if writable { libc::POLLOUT } else { 0 },
        revents: 0,
    }
}
