use core::fmt::Display;

use axerrno::{LinuxError, LinuxResult};
use bitflags::bitflags;

use crate::{ThisModule, UserSliceWriter};

bitflags! {
    /// Access mode a device file was opened with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileMode: u32 {
        const READ = 0x1;
        const WRITE = 0x2;
    }
}

impl Display for FileMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let r = if self.contains(FileMode::READ) { 'r' } else { '-' };
        let w = if self.contains(FileMode::WRITE) { 'w' } else { '-' };
        write!(f, "{}{}", r, w)
    }
}

/// An open instance of a device file.
#[derive(Debug)]
pub struct File {
    mode: FileMode,
    minor: u32,
}

impl File {
    pub fn new(mode: FileMode, minor: u32) -> Self {
        Self { mode, minor }
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }
}

/// Entry points a character device exposes to callers.
///
/// Operations a driver leaves out behave like a NULL slot in
/// `struct file_operations`.
///
/// See <https://elixir.bootlin.com/linux/v6.6/source/include/linux/fs.h#L1852>
pub trait FileOperations: Send + Sync {
    /// Module that must stay loaded while a file is open.
    fn owner(&self) -> Option<&'static ThisModule> {
        None
    }

    fn open(&self, _file: &File) -> LinuxResult<()> {
        Ok(())
    }

    fn release(&self, _file: &File) -> LinuxResult<()> {
        Ok(())
    }

    fn read(
        &self,
        _file: &File,
        _buf: &mut UserSliceWriter<'_>,
        _pos: &mut i64,
    ) -> LinuxResult<usize> {
        Err(LinuxError::EINVAL)
    }

    fn write(&self, _file: &File, _data: &[u8], _pos: &mut i64) -> LinuxResult<usize> {
        Err(LinuxError::EINVAL)
    }
}
