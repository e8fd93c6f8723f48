//! Owner of every live and pending-deletion file plus the descriptor slab
//! handed out by `open`. A context-handle replacement for the original's
//! process-global singleton (see DESIGN.md).

use thiserror::Error;

use super::descriptor::{Descriptor, OpenFlags};
use super::file::{File, MAX_FILE_SIZE};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum UfsError {
    #[error("no such file")]
    NoFile,
    #[error("operation not permitted by descriptor flags")]
    NoPermission,
    #[error("file would exceed the maximum size")]
    NoMem,
}

pub struct FileTable {
    files: Vec<File>,
    descriptors: Vec<Option<Descriptor>>,
    last_error: Option<UfsError>,
}

impl FileTable {
    pub fn new() -> FileTable {
        FileTable { files: Vec::new(), descriptors: Vec::new(), last_error: None }
    }

    pub fn errno(&self) -> Option<UfsError> {
        self.last_error
    }

    fn fail(&mut self, e: UfsError) -> UfsError {
        self.last_error = Some(e);
        e
    }

    fn find_live_file(&self, name: &str) -> Option<usize> {
        self.files.iter().position(|f| f.name == name && !f.deleted)
    }

    pub fn open(&mut self, name: &str, flags: OpenFlags) -> Result<i32, UfsError> {
        let file_id = match self.find_live_file(name) {
            Some(id) => id,
            None => {
                if !flags.contains(OpenFlags::CREATE) {
                    return Err(self.fail(UfsError::NoFile));
                }
                self.files.push(File::new(name));
                self.files.len() - 1
            }
        };
        self.files[file_id].refs += 1;

        let slot = self.descriptors.iter().position(Option::is_none);
        let descriptor = Descriptor::new(file_id, flags);
        let fd = match slot {
            Some(i) => {
                self.descriptors[i] = Some(descriptor);
                i
            }
            None => {
                self.descriptors.push(Some(descriptor));
                self.descriptors.len() - 1
            }
        };
        Ok(fd as i32)
    }

    fn descriptor(&self, fd: i32) -> Result<&Descriptor, UfsError> {
        usize::try_from(fd)
            .ok()
            .and_then(|i| self.descriptors.get(i))
            .and_then(Option::as_ref)
            .ok_or(UfsError::NoFile)
    }

    fn descriptor_mut(&mut self, fd: i32) -> Result<&mut Descriptor, UfsError> {
        usize::try_from(fd)
            .ok()
            .and_then(|i| self.descriptors.get_mut(i))
            .and_then(Option::as_mut)
            .ok_or(UfsError::NoFile)
    }

    fn adjust_pos(&mut self, fd: i32) -> Result<(), UfsError> {
        let size = {
            let d = self.descriptor(fd)?;
            self.files[d.file_id].size()
        };
        let d = self.descriptor_mut(fd)?;
        if d.pos > size {
            d.pos = size;
        }
        Ok(())
    }

    pub fn read(&mut self, fd: i32, buf: &mut [u8]) -> Result<usize, UfsError> {
        if !self.descriptor(fd)?.flags.can_read() {
            return Err(self.fail(UfsError::NoPermission));
        }
        if buf.is_empty() {
            return Ok(0);
        }
        self.adjust_pos(fd)?;

        let d = self.descriptor(fd)?;
        let (file_id, pos) = (d.file_id, d.pos);
        let n = self.files[file_id].read(pos, buf);
        self.descriptor_mut(fd)?.pos += n;
        Ok(n)
    }

    pub fn write(&mut self, fd: i32, buf: &[u8]) -> Result<usize, UfsError> {
        if !self.descriptor(fd)?.flags.can_write() {
            return Err(self.fail(UfsError::NoPermission));
        }
        self.adjust_pos(fd)?;

        let d = self.descriptor(fd)?;
        let (file_id, pos) = (d.file_id, d.pos);
        if pos + buf.len() > MAX_FILE_SIZE {
            return Err(self.fail(UfsError::NoMem));
        }
        let n = self.files[file_id]
            .write(pos, buf)
            .map_err(|()| self.fail(UfsError::NoMem))?;
        self.descriptor_mut(fd)?.pos += n;
        Ok(n)
    }

    pub fn resize(&mut self, fd: i32, new_size: usize) -> Result<(), UfsError> {
        if !self.descriptor(fd)?.flags.can_write() {
            return Err(self.fail(UfsError::NoPermission));
        }
        let file_id = self.descriptor(fd)?.file_id;
        self.files[file_id]
            .resize(new_size)
            .map_err(|()| self.fail(UfsError::NoMem))?;

        let d = self.descriptor_mut(fd)?;
        if d.pos > new_size {
            d.pos = new_size;
        }
        Ok(())
    }

    pub fn close(&mut self, fd: i32) -> Result<(), UfsError> {
        let file_id = {
            let d = self
                .descriptors
                .get(usize::try_from(fd).map_err(|_| UfsError::NoFile)?)
                .and_then(Option::as_ref)
                .ok_or(UfsError::NoFile)?;
            d.file_id
        };
        self.descriptors[fd as usize] = None;

        let file = &mut self.files[file_id];
        file.refs -= 1;
        if file.refs == 0 && file.deleted {
            self.files.remove(file_id);
            self.shift_file_ids_after_removal(file_id);
        }
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<(), UfsError> {
        let file_id = self.find_live_file(name).ok_or(UfsError::NoFile)?;
        let file = &mut self.files[file_id];
        if file.deleted {
            return Ok(());
        }
        file.deleted = true;
        if file.refs == 0 {
            self.files.remove(file_id);
            self.shift_file_ids_after_removal(file_id);
        }
        Ok(())
    }

    /// Descriptors reference files by index into `self.files`; removing a
    /// file shifts every later index down by one.
    fn shift_file_ids_after_removal(&mut self, removed_id: usize) {
        for d in self.descriptors.iter_mut().flatten() {
            if d.file_id > removed_id {
                d.file_id -= 1;
            }
        }
    }

    /// Frees every file and descriptor, for test teardown/reset.
    pub fn destroy(&mut self) {
        self.files.clear();
        self.descriptors.clear();
        self.last_error = None;
    }
}

impl Default for FileTable {
    fn default() -> FileTable {
        FileTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_without_create_on_missing_file_fails() {
        let mut t = FileTable::new();
        assert_eq!(t.open("nope", OpenFlags::empty()), Err(UfsError::NoFile));
    }

    #[test]
    fn open_with_create_then_write_then_resize_down() {
        let mut t = FileTable::new();
        let fd = t.open("a", OpenFlags::CREATE).unwrap();
        assert_eq!(t.write(fd, b"hello").unwrap(), 5);
        t.resize(fd, 0).unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(t.read(fd, &mut buf).unwrap(), 0);
    }

    #[test]
    fn write_then_read_from_start_via_new_descriptor() {
        let mut t = FileTable::new();
        let fd = t.open("a", OpenFlags::CREATE).unwrap();
        t.write(fd, b"hello").unwrap();
        t.close(fd).unwrap();

        let fd2 = t.open("a", OpenFlags::empty()).unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(t.read(fd2, &mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn write_only_descriptor_cannot_read() {
        let mut t = FileTable::new();
        let fd = t.open("a", OpenFlags::CREATE | OpenFlags::WRITE_ONLY).unwrap();
        t.write(fd, b"x").unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(t.read(fd, &mut buf), Err(UfsError::NoPermission));
    }

    #[test]
    fn read_only_descriptor_cannot_write() {
        let mut t = FileTable::new();
        let fd = t.open("a", OpenFlags::CREATE | OpenFlags::READ_ONLY).unwrap();
        assert_eq!(t.write(fd, b"x"), Err(UfsError::NoPermission));
    }

    #[test]
    fn delete_with_open_descriptor_frees_only_on_last_close() {
        let mut t = FileTable::new();
        let fd = t.open("a", OpenFlags::CREATE).unwrap();
        t.delete("a").unwrap();
        // Deleted but still referenced: a fresh create succeeds on the name.
        let fd2 = t.open("a", OpenFlags::CREATE).unwrap();
        t.write(fd2, b"new").unwrap();
        t.close(fd).unwrap();

        let mut buf = [0u8; 3];
        t.read(fd2, &mut buf).unwrap();
        assert_eq!(&buf, b"new");
    }

    #[test]
    fn write_beyond_max_size_fails() {
        let mut t = FileTable::new();
        let fd = t.open("a", OpenFlags::CREATE).unwrap();
        let huge = vec![0u8; MAX_FILE_SIZE + 1];
        assert_eq!(t.write(fd, &huge), Err(UfsError::NoMem));
    }
}
