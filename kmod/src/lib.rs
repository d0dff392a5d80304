#![no_std]
extern crate alloc;

mod chrdev;
mod file;
mod module;
pub mod param;
mod print;
mod uaccess;

pub use axerrno::{LinuxError, LinuxResult};
pub use chrdev::CharDevRegistry;
pub use file::{File, FileMode, FileOperations};
pub use kmacro::module;
pub use module::{
    ExitFn, InitFn, KernelModule, ModuleContext, ModuleSlot, ModuleState, ThisModule,
};
pub use param::{ModuleArgs, ParamValue};
pub use uaccess::UserSliceWriter;

#[doc(hidden)]
pub use log;
