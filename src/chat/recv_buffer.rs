//! Accumulates one in-progress frame: first its 4-byte length header, then
//! exactly that many body bytes.

use super::frame::HEADER_LEN;

enum State {
    HeaderPending { have: [u8; HEADER_LEN], filled: usize },
    BodyPending { body: Vec<u8>, filled: usize },
}

pub struct RecvBuffer {
    state: State,
}

impl RecvBuffer {
    pub fn new() -> RecvBuffer {
        RecvBuffer { state: State::HeaderPending { have: [0; HEADER_LEN], filled: 0 } }
    }

    /// How many more bytes this buffer wants before its current stage
    /// (header or body) completes. Callers must `recv` at most this many
    /// bytes per call -- `feed` assumes it is never handed more than one
    /// stage's worth of data at once.
    pub fn needed(&self) -> usize {
        match &self.state {
            State::HeaderPending { filled, .. } => HEADER_LEN - filled,
            State::BodyPending { body, filled } => body.len() - filled,
        }
    }

    /// Feeds newly-read bytes in (at most [`Self::needed`] of them);
    /// returns a completed frame's payload once the body is fully
    /// assembled.
    pub fn feed(&mut self, mut bytes: &[u8]) -> Option<Vec<u8>> {
        debug_assert!(bytes.len() <= self.needed());
        loop {
            match &mut self.state {
                State::HeaderPending { have, filled } => {
                    if bytes.is_empty() {
                        return None;
                    }
                    let take = bytes.len().min(HEADER_LEN - *filled);
                    have[*filled..*filled + take].copy_from_slice(&bytes[..take]);
                    *filled += take;
                    bytes = &bytes[take..];
                    if *filled != HEADER_LEN {
                        return None;
                    }
                    let len = u32::from_be_bytes(*have) as usize;
                    self.state = State::BodyPending { body: vec![0; len], filled: 0 };
                    // An empty body completes right here -- there are no
                    // more bytes coming for this frame, so the loop must
                    // not fall through to the empty-`bytes` check above.
                }
                State::BodyPending { body, filled } => {
                    if body.is_empty() {
                        self.state = State::HeaderPending { have: [0; HEADER_LEN], filled: 0 };
                        return Some(Vec::new());
                    }
                    if bytes.is_empty() {
                        return None;
                    }
                    let take = bytes.len().min(body.len() - *filled);
                    body[*filled..*filled + take].copy_from_slice(&bytes[..take]);
                    *filled += take;
                    bytes = &bytes[take..];
                    if *filled == body.len() {
                        let completed = std::mem::take(body);
                        self.state =
                            State::HeaderPending { have: [0; HEADER_LEN], filled: 0 };
                        return Some(completed);
                    }
                    return None;
                }
            }
        }
    }
}

impl Default for RecvBuffer {
    fn default() -> RecvBuffer {
        RecvBuffer::new()
    }
}
