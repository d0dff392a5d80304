//! A read-only character device that tells you how many times it has been
//! opened.
//!
//! Only one session may hold the device at a time. Every successful open
//! renders a fresh greeting embedding the visit count, and reads walk
//! through it until end of stream. Writes are rejected.
#![no_std]
extern crate alloc;

mod device;
mod error;
mod gate;
mod message;

use alloc::sync::Arc;

use axerrno::{LinuxError, LinuxResult};
use kmod::{
    CharDevRegistry, KernelModule, ModuleArgs, ModuleContext, module, pr_alert, pr_info,
};

pub use device::Chardev;
pub use error::ChardevError;
pub use gate::SessionGate;
pub use message::{BUF_LEN, MessageBuffer, MessageCursor, VisitCounter};

/// Name as it appears in /proc/devices.
pub const DEVICE_NAME: &str = "chardev";

/// Load-time parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChardevParams {
    /// Major to request; 0 lets the host pick one.
    pub major: u32,
}

impl ChardevParams {
    const KNOWN: &'static [&'static str] = &["major"];

    pub fn from_args(args: &ModuleArgs) -> LinuxResult<Self> {
        args.reject_unknown(Self::KNOWN)?;
        Ok(Self {
            major: args.get::<u32>("major")?.unwrap_or(0),
        })
    }
}

/// The loaded module: owns the registered major until exit.
pub struct ChardevModule {
    major: u32,
    device: Arc<Chardev>,
}

impl ChardevModule {
    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn device(&self) -> &Arc<Chardev> {
        &self.device
    }
}

impl KernelModule for ChardevModule {
    fn init(ctx: &ModuleContext<'_>) -> LinuxResult<Self> {
        let params = ChardevParams::from_args(ctx.args)?;
        let device = Arc::new(Chardev::new(ctx.module));

        let major = ctx
            .chrdev
            .register_chrdev(params.major, DEVICE_NAME, device.clone())
            .map_err(|err| {
                pr_alert!("Registering char device failed with {:?}", err);
                LinuxError::from(ChardevError::RegistrationFailed(err))
            })?;

        pr_info!("I was assigned major number {}. To talk to", major);
        pr_info!("the driver, create a dev file with");
        pr_info!("'mknod /dev/{} c {} 0'.", DEVICE_NAME, major);
        pr_info!("Try various minor numbers. Try to cat and echo to");
        pr_info!("the device file.");
        pr_info!("Remove the device file and module when done.");

        Ok(Self { major, device })
    }

    fn exit(self, chrdev: &dyn CharDevRegistry) {
        chrdev.unregister_chrdev(self.major, DEVICE_NAME);
        pr_info!(
            "{} released major {} after {} visits",
            DEVICE_NAME,
            self.major,
            self.device.visits()
        );
    }
}

module! {
    type: ChardevModule,
    name: "chardev",
    license: "GPL",
    description: "Creates a read-only char device that says how many times you've read from the dev file",
    version: "0.1.0",
}
