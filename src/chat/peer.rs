//! Server-side per-connection state: socket, outbound queue, inbound
//! assembly buffer.

use std::os::unix::io::RawFd;

use super::recv_buffer::RecvBuffer;
use super::send_queue::SendQueue;

pub struct Peer {
    pub socket: RawFd,
    pub send_queue: SendQueue,
    pub recv_buf: RecvBuffer,
    /// Carried but never read back out; see DESIGN.md.
    pub username: Option<String>,
}

impl Peer {
    pub fn new(socket: RawFd) -> Peer {
        Peer { socket, send_queue: SendQueue::new(), recv_buf: RecvBuffer::new(), username: None }
    }
}

impl Drop for Peer {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.socket);
        }
    }
}
