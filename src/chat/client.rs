//! A single-connection chat client: one socket, newline-delimited user
//! input framed and queued for send, inbound frames assembled into a
//! pending-message queue.

use std::collections::VecDeque;
use std::io;
use std::os::unix::io::RawFd;

use super::error::ChatError;
use super::frame;
use super::message::Events;
use super::recv_buffer::RecvBuffer;
use super::send_queue::SendQueue;
use super::socket;

const RECV_CHUNK: usize = 4096;

pub struct Client {
    name: String,
    socket: Option<RawFd>,
    send_queue: SendQueue,
    recv_buf: RecvBuffer,
    pending: VecDeque<String>,
    input_tail: Vec<u8>,
}

impl Client {
    pub fn new(name: impl Into<String>) -> Client {
        Client {
            name: name.into(),
            socket: None,
            send_queue: SendQueue::new(),
            recv_buf: RecvBuffer::new(),
            pending: VecDeque::new(),
            input_tail: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connect(&mut self, addr: &str) -> Result<(), ChatError> {
        if self.socket.is_some() {
            return Err(ChatError::AlreadyStarted);
        }
        let fd = socket::connect(addr)?;
        self.socket = Some(fd);
        Ok(())
    }

    /// Runs one `poll` iteration against the single connection socket.
    pub fn update(&mut self, timeout_ms: i32) -> Result<(), ChatError> {
        let fd = self.socket.ok_or(ChatError::NotStarted)?;
        let mut entries = [socket::pollfd(fd, !self.send_queue.is_empty())];

        let ready = socket::poll(&mut entries, timeout_ms)?;
        if ready == 0 {
            return Err(ChatError::Timeout);
        }

        if entries[0].revents & libc::POLLOUT != 0 {
            self.flush_writable()?;
        }
        if entries[0].revents & libc::POLLIN != 0 {
            self.drain_readable()?;
        }
        Ok(())
    }

    fn flush_writable(&mut self) -> Result<(), ChatError> {
        let fd = self.socket.expect("checked by caller");
        while let Some(chunk) = self.send_queue.head_remaining() {
            let n = socket::send_from(fd, chunk)?;
            if n == 0 {
                break;
            }
            self.send_queue.advance(n);
        }
        Ok(())
    }

    fn drain_readable(&mut self) -> Result<(), ChatError> {
        let fd = self.socket.expect("checked by caller");
        loop {
            let needed = self.recv_buf.needed();
            let mut buf = vec![0u8; needed.min(RECV_CHUNK)];
            match socket::recv_into(fd, &mut buf)? {
                socket::RecvStatus::Data(n) => {
                    if let Some(body) = self.recv_buf.feed(&buf[..n]) {
                        self.pending.push_back(String::from_utf8_lossy(&body).into_owned());
                    }
                }
                socket::RecvStatus::WouldBlock => break,
                socket::RecvStatus::Closed => {
                    self.close_socket();
                    return Err(ChatError::Sys(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "server closed the connection",
                    )));
                }
            }
        }
        Ok(())
    }

    /// Closes and forgets the connection socket; subsequent calls report
    /// [`ChatError::NotStarted`] instead of touching a dead fd.
    fn close_socket(&mut self) {
        if let Some(fd) = self.socket.take() {
            unsafe {
                libc::close(fd);
            }
        }
    }

    /// Feeds raw user input (e.g. from stdin), newline-delimiting it into
    /// messages; the incomplete trailing fragment is kept for the next
    /// call. Empty/whitespace-only lines are discarded.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.input_tail.extend_from_slice(bytes);
        while let Some(pos) = self.input_tail.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.input_tail.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                self.send_queue.push(frame::encode(trimmed));
            }
        }
    }

    pub fn pop_next(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    pub fn events(&self) -> Events {
        let mut events = Events::empty();
        if self.socket.is_some() {
            events |= Events::INPUT;
            if !self.send_queue.is_empty() {
                events |= Events::OUTPUT;
            }
        }
        events
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close_socket();
    }
}
