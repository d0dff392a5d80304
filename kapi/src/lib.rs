#![no_std]
extern crate alloc;

use axerrno::LinuxResult;

type Result<T> = LinuxResult<T>;

pub mod chrdev;
pub mod fs;
pub mod module;

pub use chrdev::ChrdevTable;
pub use fs::{DeviceFile, chrdev_open};
pub use module::ModuleOwner;
