use axerrno::LinuxResult;
use kmod::{File, FileOperations, ThisModule, UserSliceWriter, pr_alert, pr_debug};
use spin::Mutex;

use crate::{ChardevError, MessageCursor, SessionGate};

/// The device: one session at a time, each greeted with a fresh message.
pub struct Chardev {
    owner: &'static ThisModule,
    gate: SessionGate,
    cursor: Mutex<MessageCursor>,
}

impl Chardev {
    pub fn new(owner: &'static ThisModule) -> Self {
        Self {
            owner,
            gate: SessionGate::new(),
            cursor: Mutex::new(MessageCursor::new()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.gate.is_open()
    }

    /// Sessions opened so far.
    pub fn visits(&self) -> u64 {
        self.cursor.lock().visits()
    }
}

impl FileOperations for Chardev {
    fn owner(&self) -> Option<&'static ThisModule> {
        Some(self.owner)
    }

    fn open(&self, file: &File) -> LinuxResult<()> {
        self.gate.acquire().inspect_err(|_| {
            pr_debug!("open of minor {} refused: device busy", file.minor());
        })?;
        // Held until release so the module cannot go away mid-session.
        self.owner.get();
        self.cursor.lock().initialize();
        Ok(())
    }

    fn release(&self, _file: &File) -> LinuxResult<()> {
        self.gate.release();
        self.owner.put();
        Ok(())
    }

    // The file position is not used; the cursor tracks progress.
    fn read(
        &self,
        _file: &File,
        buf: &mut UserSliceWriter<'_>,
        _pos: &mut i64,
    ) -> LinuxResult<usize> {
        Ok(self.cursor.lock().read(buf))
    }

    fn write(&self, _file: &File, _data: &[u8], _pos: &mut i64) -> LinuxResult<usize> {
        pr_alert!("Sorry, this operation isn't supported.");
        Err(ChardevError::Unsupported.into())
    }
}
