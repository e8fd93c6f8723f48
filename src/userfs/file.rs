//! A named sequence of blocks with reference counting and tombstone
//! deletion.

use super::block::{Block, BLOCK_SIZE};

/// Maximum total size a file may grow to, matching `UFS_CONSTR_MAX_FILE_SIZE`.
pub const MAX_FILE_SIZE: usize = 100 * 1024 * 1024;

#[derive(Debug)]
pub struct File {
    pub name: String,
    blocks: Vec<Block>,
    size: usize,
    pub refs: usize,
    pub deleted: bool,
}

impl File {
    pub fn new(name: impl Into<String>) -> File {
        File { name: name.into(), blocks: Vec::new(), size: 0, refs: 0, deleted: false }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Writes `data` at `pos`, extending the file with new blocks as needed.
    /// `pos` must not exceed the current size. Returns `Err` if the
    /// resulting size would exceed [`MAX_FILE_SIZE`]; the file is left
    /// unchanged in that case (all-or-nothing).
    pub fn write(&mut self, pos: usize, data: &[u8]) -> Result<usize, ()> {
        assert!(pos <= self.size);
        if pos + data.len() > MAX_FILE_SIZE {
            return Err(());
        }
        if data.is_empty() {
            return Ok(0);
        }

        if pos == self.size && pos % BLOCK_SIZE == 0 {
            self.blocks.push(Block::new());
        }

        let mut block_idx = pos / BLOCK_SIZE;
        let mut offset = pos % BLOCK_SIZE;
        let mut written = 0;

        while written < data.len() {
            if block_idx == self.blocks.len() {
                self.blocks.push(Block::new());
            }
            let n = self.blocks[block_idx].write(offset, &data[written..]);
            written += n;
            if written < data.len() || n == 0 {
                block_idx += 1;
                offset = 0;
            }
        }

        if self.size < pos + written {
            self.size = pos + written;
        }
        Ok(written)
    }

    /// Reads up to `buf.len()` bytes starting at `pos`. `pos` must not
    /// exceed the current size.
    pub fn read(&self, pos: usize, buf: &mut [u8]) -> usize {
        assert!(pos <= self.size);
        if buf.is_empty() || pos == self.size {
            return 0;
        }

        let mut block_idx = pos / BLOCK_SIZE;
        let mut offset = pos % BLOCK_SIZE;
        let mut read = 0;

        while read < buf.len() && block_idx < self.blocks.len() {
            let n = self.blocks[block_idx].read(offset, &mut buf[read..]);
            read += n;
            block_idx += 1;
            offset = 0;
        }
        read
    }

    /// Grows (zero-filling) or shrinks the file to exactly `size` bytes.
    pub fn resize(&mut self, size: usize) -> Result<(), ()> {
        if size > MAX_FILE_SIZE {
            return Err(());
        }
        if size == self.size {
            return Ok(());
        }

        if size > self.size {
            if self.size > 0 && self.size % BLOCK_SIZE != 0 {
                let last_used = (self.size - 1) / BLOCK_SIZE;
                self.blocks[last_used].resize(BLOCK_SIZE);
            }
            let target_blocks = size.div_ceil(BLOCK_SIZE);
            while self.blocks.len() < target_blocks {
                self.blocks.push(Block::new());
            }
            if let Some(last) = self.blocks.last_mut() {
                let last_size = size - (self.blocks.len() - 1) * BLOCK_SIZE;
                last.resize(last_size);
            }
        } else {
            let keep_blocks = size.div_ceil(BLOCK_SIZE);
            self.blocks.truncate(keep_blocks);
            if let Some(last) = self.blocks.last_mut() {
                let last_size = size - (keep_blocks - 1) * BLOCK_SIZE;
                last.resize(last_size);
            }
        }

        self.size = size;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_within_one_block() {
        let mut f = File::new("a");
        assert_eq!(f.write(0, b"hello").unwrap(), 5);
        let mut buf = [0u8; 5];
        assert_eq!(f.read(0, &mut buf), 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn write_spanning_multiple_blocks() {
        let mut f = File::new("a");
        let data = vec![7u8; BLOCK_SIZE * 2 + 3];
        f.write(0, &data).unwrap();
        assert_eq!(f.size(), data.len());
        let mut buf = vec![0u8; data.len()];
        assert_eq!(f.read(0, &mut buf), data.len());
        assert_eq!(buf, data);
    }

    #[test]
    fn write_exceeding_max_size_is_rejected_wholesale() {
        let mut f = File::new("a");
        assert!(f.write(0, b"preexisting").is_ok());
        let huge = vec![0u8; MAX_FILE_SIZE];
        assert!(f.write(11, &huge).is_err());
        assert_eq!(f.size(), 11);
    }

    #[test]
    fn resize_grows_with_zeros_and_shrinks_discarding_tail() {
        let mut f = File::new("a");
        f.write(0, b"hi").unwrap();
        f.resize(BLOCK_SIZE + 10).unwrap();
        assert_eq!(f.size(), BLOCK_SIZE + 10);
        let mut buf = [0xffu8; 4];
        f.read(BLOCK_SIZE, &mut buf);
        assert_eq!(buf, [0, 0, 0, 0]);

        f.resize(1).unwrap();
        assert_eq!(f.size(), 1);
        let mut buf = [0u8; 1];
        assert_eq!(f.read(0, &mut buf), 1);
        assert_eq!(buf, [b'h']);
    }
}
