//! Open-file handles: position plus permission flags.

bitflags::bitflags! {
    /// Permission and creation flags for [`super::FileTable::open`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        const CREATE     = 0b0001;
        const READ_ONLY  = 0b0010;
        const WRITE_ONLY = 0b0100;
        const READ_WRITE = 0b1000;
    }
}

impl OpenFlags {
    pub fn can_read(self) -> bool {
        !self.contains(OpenFlags::WRITE_ONLY) || self.contains(OpenFlags::READ_WRITE)
    }

    pub fn can_write(self) -> bool {
        !self.contains(OpenFlags::READ_ONLY) || self.contains(OpenFlags::READ_WRITE)
    }
}

#[derive(Debug)]
pub struct Descriptor {
    pub file_id: usize,
    pub pos: usize,
    pub flags: OpenFlags,
}

impl Descriptor {
    pub fn new(file_id: usize, flags: OpenFlags) -> Descriptor {
        Descriptor { file_id, pos: 0, flags }
    }
}
