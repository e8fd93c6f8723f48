//! Wire framing: a 4-byte big-endian length prefix followed by that many
//! payload bytes.

pub const HEADER_LEN: usize = 4;

/// Encodes `payload` as a length-prefixed frame ready to push onto a
/// [`super::send_queue::SendQueue`].
pub fn encode(payload: &str) -> Vec<u8> {
    let trimmed = payload.trim();
    let mut framed = Vec::with_capacity(HEADER_LEN + trimmed.len());
    framed.extend_from_slice(&(trimmed.len() as u32).to_be_bytes());
    framed.extend_from_slice(trimmed.as_bytes());
    framed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_length_prefix_and_trims_whitespace() {
        let framed = encode("  hello  \n");
        assert_eq!(&framed[..4], &5u32.to_be_bytes());
        assert_eq!(&framed[4..], b"hello");
    }

    #[test]
    fn empty_payload_encodes_to_a_zero_length_frame() {
        let framed = encode("");
        assert_eq!(framed, 0u32.to_be_bytes().to_vec());
    }
}
