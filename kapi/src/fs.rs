//! Opening character device files by device number.
//!
//! References: <https://elixir.bootlin.com/linux/v6.6/source/fs/char_dev.c#L373>

use alloc::{sync::Arc, vec::Vec};

use axerrno::LinuxError;
use kmod::{File, FileMode, FileOperations, ThisModule, UserSliceWriter};

use crate::{ChrdevTable, Result};

/// Chunk size used by [`DeviceFile::read_to_end`].
const READ_CHUNK: usize = 4096;

/// An open handle on a character device. Dropping it releases the device.
pub struct DeviceFile {
    fops: Arc<dyn FileOperations>,
    owner: Option<&'static ThisModule>,
    file: File,
    pos: i64,
    released: bool,
}

/// Open device `major:minor` with `mode`.
///
/// The owning module is pinned for as long as the handle lives. If the
/// driver's `open` fails its error is returned unchanged.
pub fn chrdev_open(
    table: &ChrdevTable,
    major: u32,
    minor: u32,
    mode: FileMode,
) -> Result<DeviceFile> {
    let fops = table.lookup(major).ok_or(LinuxError::ENXIO)?;
    let owner = fops.owner();
    if let Some(module) = owner {
        if !module.try_get() {
            log::warn!("Module({}) is going away, refusing open", module.name());
            return Err(LinuxError::ENXIO);
        }
    }

    let file = File::new(mode, minor);
    if let Err(e) = fops.open(&file) {
        if let Some(module) = owner {
            module.put();
        }
        return Err(e);
    }
    log::debug!("opened {}:{} ({})", major, minor, mode);
    Ok(DeviceFile {
        fops,
        owner,
        file,
        pos: 0,
        released: false,
    })
}

impl DeviceFile {
    pub fn file(&self) -> &File {
        &self.file
    }

    /// Read into the whole of `buf`.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let len = buf.len();
        self.read_len(buf, len)
    }

    /// Read at most `len` bytes into `buf`.
    pub fn read_len(&mut self, buf: &mut [u8], len: usize) -> Result<usize> {
        if !self.file.mode().contains(FileMode::READ) {
            return Err(LinuxError::EBADF);
        }
        let mut writer = UserSliceWriter::new(buf, len);
        self.fops.read(&self.file, &mut writer, &mut self.pos)
    }

    /// Keep reading until the device reports end of stream.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = self.read(&mut chunk)?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&chunk[..n]);
        }
    }

    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        if !self.file.mode().contains(FileMode::WRITE) {
            return Err(LinuxError::EBADF);
        }
        self.fops.write(&self.file, data, &mut self.pos)
    }

    /// Release the device now and report the driver's verdict.
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let res = self.fops.release(&self.file);
        if let Some(module) = self.owner {
            module.put();
        }
        res
    }
}

impl Drop for DeviceFile {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("release of device file failed: {:?}", e);
        }
    }
}
