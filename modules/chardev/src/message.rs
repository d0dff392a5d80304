//! The greeting handed out to each session and the cursor walking over it.

use core::fmt;

use kmod::UserSliceWriter;

/// Capacity of the message, terminator included.
pub const BUF_LEN: usize = 80;

/// How many sessions have been opened since load.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VisitCounter(u64);

impl VisitCounter {
    pub const fn new() -> Self {
        Self(0)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Current value, then advance by one.
    pub fn next(&mut self) -> u64 {
        let n = self.0;
        self.0 = self.0.wrapping_add(1);
        n
    }
}

/// Fixed-capacity text with a forward-only read offset.
pub struct MessageBuffer {
    text: [u8; BUF_LEN],
    len: usize,
    cursor: usize,
}

/// `snprintf` into a slice: output past the end is dropped.
struct Truncating<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl fmt::Write for Truncating<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.buf.len() - self.len;
        let n = s.len().min(room);
        self.buf[self.len..self.len + n].copy_from_slice(&s.as_bytes()[..n]);
        self.len += n;
        Ok(())
    }
}

impl MessageBuffer {
    /// An empty buffer; reads report end of stream.
    pub const fn new() -> Self {
        Self {
            text: [0; BUF_LEN],
            len: 0,
            cursor: 0,
        }
    }

    /// Replace the contents and rewind the cursor.
    pub fn render(&mut self, args: fmt::Arguments<'_>) {
        let mut out = Truncating {
            buf: &mut self.text[..BUF_LEN - 1],
            len: 0,
        };
        // Truncating never fails.
        let _ = fmt::write(&mut out, args);
        let written = out.len;
        // Content ends at the first terminator.
        self.len = self.text[..written]
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(written);
        self.text[self.len] = 0;
        self.cursor = 0;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.text[..self.len]
    }

    /// Bytes not yet delivered.
    pub fn remaining(&self) -> &[u8] {
        &self.text[self.cursor..self.len]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.len
    }

    /// Copy the next bytes into `out`. Returns 0 once exhausted.
    pub fn read(&mut self, out: &mut UserSliceWriter<'_>) -> usize {
        if self.is_exhausted() {
            return 0;
        }
        let n = out.write_slice(&self.text[self.cursor..self.len]);
        self.cursor += n;
        n
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Message generation plus the read loop over it.
#[derive(Default)]
pub struct MessageCursor {
    counter: VisitCounter,
    buffer: MessageBuffer,
}

impl MessageCursor {
    pub const fn new() -> Self {
        Self {
            counter: VisitCounter::new(),
            buffer: MessageBuffer::new(),
        }
    }

    /// Render the greeting for a fresh session. Must only follow a
    /// successful gate acquire.
    pub fn initialize(&mut self) {
        let n = self.counter.next();
        self.buffer
            .render(format_args!("I already told you {} times Hello world!\n", n));
    }

    pub fn read(&mut self, out: &mut UserSliceWriter<'_>) -> usize {
        self.buffer.read(out)
    }

    /// Sessions opened so far.
    pub fn visits(&self) -> u64 {
        self.counter.value()
    }

    pub fn buffer(&self) -> &MessageBuffer {
        &self.buffer
    }
}
