use std::os::unix::io::RawFd;

/// A fully assembled chat message, tagged with the peer that sent it (the
/// server's broadcast needs this to avoid echoing back to the author).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub author: RawFd,
    pub body: String,
}

bitflags::bitflags! {
    /// What a connection is currently ready to do, mirroring `poll`'s
    /// `POLLIN`/`POLLOUT`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Events: u8 {
        const INPUT  = 0b01;
        const OUTPUT = 0b10;
    }
}
