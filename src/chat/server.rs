//! A single-threaded, `poll`-driven chat server broadcasting every message
//! it receives to every other connected peer.

use std::collections::VecDeque;
use std::os::unix::io::RawFd;

use super::error::ChatError;
use super::message::{Events, Message};
use super::peer::Peer;
use super::socket;

const RECV_CHUNK: usize = 4096;

pub struct Server {
    listen_fd: Option<RawFd>,
    peers: Vec<Peer>,
    pending: VecDeque<Message>,
}

impl Server {
    pub fn new() -> Server {
        Server { listen_fd: None, peers: Vec::new(), pending: VecDeque::new() }
    }

    pub fn listen(&mut self, port: u16) -> Result<(), ChatError> {
        if self.listen_fd.is_some() {
            return Err(ChatError::AlreadyStarted);
        }
        let fd = socket::listen(port).map_err(|e| {
            if e.raw_os_error() == Some(libc::EADDRINUSE) {
                ChatError::PortBusy
            } else {
                ChatError::Sys(e)
            }
        })?;
        self.listen_fd = Some(fd);
        Ok(())
    }

    /// Runs one `poll` iteration: accepts new peers, drains readable
    /// sockets into complete messages, flushes writable peers' send
    /// queues. Blocks up to `timeout_ms` (negative = forever); returns
    /// [`ChatError::Timeout`] if nothing was ready within the deadline.
    pub fn update(&mut self, timeout_ms: i32) -> Result<(), ChatError> {
        let listen_fd = self.listen_fd.ok_or(ChatError::NotStarted)?;

        let mut entries = Vec::with_capacity(1 + self.peers.len());
        entries.push(socket::pollfd(listen_fd, false));
        for peer in &self.peers {
            entries.push(socket::pollfd(peer.socket, !peer.send_queue.is_empty()));
        }

        let ready = socket::poll(&mut entries, timeout_ms)?;
        if ready == 0 {
            return Err(ChatError::Timeout);
        }

        if entries[0].revents & libc::POLLIN != 0 {
            self.accept_all()?;
        }

        let mut dead = Vec::new();
        for (i, entry) in entries.iter().enumerate().skip(1) {
            let peer_idx = i - 1;
            if entry.revents & libc::POLLIN != 0 {
                if let Err(()) = self.drain_readable(peer_idx) {
                    dead.push(peer_idx);
                    continue;
                }
            }
            if entry.revents & libc::POLLOUT != 0 {
                if self.flush_writable(peer_idx).is_err() {
                    dead.push(peer_idx);
                }
            }
        }

        dead.sort_unstable();
        dead.dedup();
        for idx in dead.into_iter().rev() {
            self.peers.remove(idx);
        }
        Ok(())
    }

    fn accept_all(&mut self) -> Result<(), ChatError> {
        let listen_fd = self.listen_fd.expect("checked by caller");
        loop {
            match socket::accept(listen_fd) {
                Ok(Some(fd)) => self.peers.push(Peer::new(fd)),
                Ok(None) => break,
                Err(e) => {
                    log::warn!("accept failed: {e}");
                    break;
                }
            }
        }
        Ok(())
    }

    fn drain_readable(&mut self, idx: usize) -> Result<(), ()> {
        let mut completed = Vec::new();
        let mut closed = false;
        loop {
            let needed = self.peers[idx].recv_buf.needed();
            let mut buf = vec![0u8; needed.min(RECV_CHUNK)];
            match socket::recv_into(self.peers[idx].socket, &mut buf).map_err(|_| ())? {
                socket::RecvStatus::Data(n) => {
                    if let Some(body) = self.peers[idx].recv_buf.feed(&buf[..n]) {
                        let text = String::from_utf8_lossy(&body).into_owned();
                        completed.push(text);
                    }
                }
                socket::RecvStatus::WouldBlock => break,
                socket::RecvStatus::Closed => {
                    closed = true;
                    break;
                }
            }
        }
        let author = self.peers[idx].socket;
        for text in completed {
            self.register_message(author, text);
        }
        if closed {
            return Err(());
        }
        Ok(())
    }

    fn register_message(&mut self, author: RawFd, body: String) {
        let framed = super::frame::encode(&body);
        for peer in self.peers.iter_mut() {
            if peer.socket != author {
                peer.send_queue.push(framed.clone());
            }
        }
        self.pending.push_back(Message { author, body });
    }

    fn flush_writable(&mut self, idx: usize) -> Result<(), ()> {
        let peer = &mut self.peers[idx];
        while let Some(chunk) = peer.send_queue.head_remaining() {
            let n = socket::send_from(peer.socket, chunk).map_err(|_| ())?;
            if n == 0 {
                break;
            }
            peer.send_queue.advance(n);
        }
        Ok(())
    }

    /// Returns the oldest unconsumed message, if any.
    pub fn pop_next(&mut self) -> Option<Message> {
        self.pending.pop_front()
    }

    pub fn events(&self, peer_fd: RawFd) -> Events {
        let mut events = Events::empty();
        if let Some(peer) = self.peers.iter().find(|p| p.socket == peer_fd) {
            events |= Events::INPUT;
            if !peer.send_queue.is_empty() {
                events |= Events::OUTPUT;
            }
        }
        events
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}

impl Default for Server {
    fn default() -> Server {
        Server::new()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(fd) = self.listen_fd {
            unsafe {
                libc::close(fd);
            }
        }
    }
}
