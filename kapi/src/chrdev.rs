//! Character device major number table.
//!
//! References: <https://elixir.bootlin.com/linux/v6.6/source/fs/char_dev.c>

use alloc::{collections::BTreeMap, string::String, sync::Arc};
use core::fmt::Write;

use axerrno::LinuxError;
use kmod::{CharDevRegistry, FileOperations};
use spin::Mutex;

use crate::Result;

/// Majors must stay below this.
pub const CHRDEV_MAJOR_MAX: u32 = 512;
/// Highest major handed out dynamically; the search walks downwards.
pub const CHRDEV_MAJOR_DYN_START: u32 = 254;
/// Lowest major handed out dynamically.
pub const CHRDEV_MAJOR_DYN_END: u32 = 234;

struct ChrdevEntry {
    name: &'static str,
    fops: Arc<dyn FileOperations>,
}

/// The host's registry of character device majors.
pub struct ChrdevTable {
    majors: Mutex<BTreeMap<u32, ChrdevEntry>>,
}

impl ChrdevTable {
    pub const fn new() -> Self {
        Self {
            majors: Mutex::new(BTreeMap::new()),
        }
    }

    /// File operations registered under `major`.
    pub fn lookup(&self, major: u32) -> Option<Arc<dyn FileOperations>> {
        self.majors.lock().get(&major).map(|e| e.fops.clone())
    }

    /// Major of the first device registered as `name`.
    pub fn major_of(&self, name: &str) -> Option<u32> {
        self.majors
            .lock()
            .iter()
            .find(|(_, e)| e.name == name)
            .map(|(major, _)| *major)
    }

    pub fn is_empty(&self) -> bool {
        self.majors.lock().is_empty()
    }

    /// The character device part of `/proc/devices`.
    pub fn proc_devices(&self) -> String {
        let mut out = String::from("Character devices:\n");
        for (major, entry) in self.majors.lock().iter() {
            // Writing into a String cannot fail.
            let _ = writeln!(out, "{:>3} {}", major, entry.name);
        }
        out
    }

    fn find_dynamic_major(majors: &BTreeMap<u32, ChrdevEntry>) -> Option<u32> {
        (CHRDEV_MAJOR_DYN_END..=CHRDEV_MAJOR_DYN_START)
            .rev()
            .find(|major| !majors.contains_key(major))
    }
}

impl Default for ChrdevTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CharDevRegistry for ChrdevTable {
    fn register_chrdev(
        &self,
        major: u32,
        name: &'static str,
        fops: Arc<dyn FileOperations>,
    ) -> Result<u32> {
        if name.is_empty() {
            log::error!("refusing to register a character device without a name");
            return Err(LinuxError::EINVAL);
        }
        if major >= CHRDEV_MAJOR_MAX {
            log::error!(
                "CHRDEV \"{}\" major requested ({}) is greater than the maximum ({})",
                name,
                major,
                CHRDEV_MAJOR_MAX - 1
            );
            return Err(LinuxError::EINVAL);
        }

        let mut majors = self.majors.lock();
        let major = if major == 0 {
            match Self::find_dynamic_major(&majors) {
                Some(major) => major,
                None => {
                    log::error!("CHRDEV \"{}\" dynamic allocation region is full", name);
                    return Err(LinuxError::EBUSY);
                }
            }
        } else {
            if let Some(existing) = majors.get(&major) {
                log::error!(
                    "CHRDEV \"{}\" major {} is already taken by \"{}\"",
                    name,
                    major,
                    existing.name
                );
                return Err(LinuxError::EBUSY);
            }
            major
        };
        majors.insert(major, ChrdevEntry { name, fops });
        log::debug!("CHRDEV \"{}\" registered with major {}", name, major);
        Ok(major)
    }

    fn unregister_chrdev(&self, major: u32, name: &str) {
        let mut majors = self.majors.lock();
        match majors.get(&major) {
            Some(entry) if entry.name == name => {
                majors.remove(&major);
                log::debug!("CHRDEV \"{}\" released major {}", name, major);
            }
            Some(entry) => log::warn!(
                "CHRDEV \"{}\" tried to release major {} owned by \"{}\"",
                name,
                major,
                entry.name
            ),
            None => log::warn!("CHRDEV \"{}\" major {} was not registered", name, major),
        }
    }
}
