//! Loading and unloading statically linked modules.

use axerrno::LinuxError;
use kmod::{CharDevRegistry, ModuleArgs, ModuleContext, ModuleState, ThisModule};

use crate::Result;

/// A module the host has initialized and may later unload.
pub struct ModuleOwner<'a> {
    module: &'static ThisModule,
    chrdev: &'a dyn CharDevRegistry,
}

impl<'a> ModuleOwner<'a> {
    /// Parse `args` and run the module's init hook.
    ///
    /// On failure the module is left [`ModuleState::Going`] and cannot be
    /// loaded again.
    pub fn load(
        module: &'static ThisModule,
        args: &str,
        chrdev: &'a dyn CharDevRegistry,
    ) -> Result<Self> {
        if !module.try_begin_load() {
            log::warn!("Module({}) is already loaded", module.name());
            return Err(LinuxError::EEXIST);
        }
        let args = ModuleArgs::parse(module.name(), args);

        let owner = ModuleOwner { module, chrdev };
        if let Err(e) = owner.call_init(&args) {
            log::error!("Module({}) init failed: {:?}", module.name(), e);
            module.set_state(ModuleState::Going);
            return Err(e);
        }
        module.set_state(ModuleState::Live);
        log::info!("Module({}) loaded successfully!", module.name());
        Ok(owner)
    }

    /// Get the name of the module
    pub fn name(&self) -> &str {
        self.module.name()
    }

    pub fn module(&self) -> &'static ThisModule {
        self.module
    }

    /// Run the exit hook unless something still holds the module.
    pub fn unload(&self) -> Result<()> {
        if self.module.state() != ModuleState::Live {
            log::warn!("Module({}) is not live", self.name());
            return Err(LinuxError::ENOENT);
        }
        if !self.module.try_stop() {
            if self.module.is_stopping() {
                log::warn!("Module({}) is already going away", self.name());
                return Err(LinuxError::ENOENT);
            }
            log::warn!(
                "Module({}) is in use ({} references)",
                self.name(),
                self.module.refcount()
            );
            return Err(LinuxError::EBUSY);
        }
        self.call_exit();
        log::info!("Module({}) unloaded", self.name());
        Ok(())
    }

    /// Call the module's init function
    fn call_init(&self, args: &ModuleArgs) -> Result<()> {
        let Some(init_fn) = self.module.take_init() else {
            log::warn!("The init function can only be called once.");
            return Err(LinuxError::EINVAL);
        };
        let ctx = ModuleContext {
            module: self.module,
            args,
            chrdev: self.chrdev,
        };
        init_fn(&ctx)
    }

    /// Call the module's exit function
    fn call_exit(&self) {
        if let Some(exit_fn) = self.module.take_exit() {
            exit_fn(self.chrdev);
        } else {
            log::warn!("The exit function can only be called once.");
        }
    }
}
