//! Copying data out to a caller-supplied buffer.
//!
//! References: <https://elixir.bootlin.com/linux/v6.6/source/include/linux/uaccess.h>

use axerrno::{LinuxError, LinuxResult};

/// Destination of a read: a caller buffer limited to the length the caller
/// asked for. Nothing is ever written past that limit.
pub struct UserSliceWriter<'a> {
    buf: &'a mut [u8],
    written: usize,
}

impl<'a> UserSliceWriter<'a> {
    /// The usable capacity is `min(len, buf.len())`.
    pub fn new(buf: &'a mut [u8], len: usize) -> Self {
        let len = len.min(buf.len());
        Self {
            buf: &mut buf[..len],
            written: 0,
        }
    }

    /// Bytes still writable.
    pub fn capacity(&self) -> usize {
        self.buf.len() - self.written
    }

    pub fn is_full(&self) -> bool {
        self.capacity() == 0
    }

    /// Bytes written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Copy as much of `src` as fits and return the count copied.
    pub fn write_slice(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.capacity());
        self.buf[self.written..self.written + n].copy_from_slice(&src[..n]);
        self.written += n;
        n
    }

    /// Store a single byte; `EFAULT` once the buffer is full.
    pub fn put_user(&mut self, byte: u8) -> LinuxResult<()> {
        if self.is_full() {
            return Err(LinuxError::EFAULT);
        }
        self.buf[self.written] = byte;
        self.written += 1;
        Ok(())
    }
}
