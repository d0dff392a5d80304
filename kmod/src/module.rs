use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use axerrno::LinuxResult;
use int_enum::IntEnum;
use spin::Mutex;

use crate::{CharDevRegistry, ModuleArgs};

/// Lifecycle of a module as seen by its host.
///
/// See <https://elixir.bootlin.com/linux/v6.6/source/include/linux/module.h#L317>
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntEnum)]
pub enum ModuleState {
    /// Normal state.
    Live = 0,
    /// Fully formed, running the init hook.
    Coming = 1,
    /// Going away.
    Going = 2,
    /// Still setting it up.
    Unformed = 3,
}

/// Set in the reference count once unload has begun; pins are refused after.
const MODULE_GOING: usize = 1 << (usize::BITS - 1);

pub type InitFn = fn(&ModuleContext<'_>) -> LinuxResult<()>;
pub type ExitFn = fn(&dyn CharDevRegistry);

/// What the host hands a module while it initializes.
pub struct ModuleContext<'a> {
    pub module: &'static ThisModule,
    pub args: &'a ModuleArgs,
    pub chrdev: &'a dyn CharDevRegistry,
}

/// A loadable module: built by the init hook, torn down by the exit hook.
pub trait KernelModule: Sized + Send {
    fn init(ctx: &ModuleContext<'_>) -> LinuxResult<Self>;
    fn exit(self, chrdev: &dyn CharDevRegistry);
}

/// Holds the live [`KernelModule`] instance between init and exit.
pub struct ModuleSlot<T>(Mutex<Option<T>>);

impl<T: KernelModule> ModuleSlot<T> {
    pub const fn new() -> Self {
        Self(Mutex::new(None))
    }

    pub fn init(&self, ctx: &ModuleContext<'_>) -> LinuxResult<()> {
        let instance = T::init(ctx)?;
        *self.0.lock() = Some(instance);
        Ok(())
    }

    pub fn exit(&self, chrdev: &dyn CharDevRegistry) {
        let instance = self.0.lock().take();
        match instance {
            Some(instance) => instance.exit(chrdev),
            None => log::warn!("exit requested for a module that never initialized"),
        }
    }
}

impl<T: KernelModule> Default for ModuleSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The `ThisModule` struct represents a kernel module.
///
/// See <https://elixir.bootlin.com/linux/v6.6/source/include/linux/module.h#L402>
pub struct ThisModule {
    name: &'static str,
    state: AtomicU32,
    refcnt: AtomicUsize,
    init: Mutex<Option<InitFn>>,
    exit: Mutex<Option<ExitFn>>,
}

impl ThisModule {
    /// Creates a new `ThisModule` instance with the given initialization and exit functions.
    pub const fn new(name: &'static str, init: Option<InitFn>, exit: Option<ExitFn>) -> Self {
        Self {
            name,
            state: AtomicU32::new(ModuleState::Unformed as u32),
            refcnt: AtomicUsize::new(0),
            init: Mutex::new(init),
            exit: Mutex::new(exit),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> ModuleState {
        ModuleState::try_from(self.state.load(Ordering::Acquire)).unwrap_or(ModuleState::Unformed)
    }

    pub fn set_state(&self, state: ModuleState) {
        self.state.store(state as u32, Ordering::Release);
    }

    /// Move from [`ModuleState::Unformed`] to [`ModuleState::Coming`] in one
    /// step. Only one loader can win.
    pub fn try_begin_load(&self) -> bool {
        self.state
            .compare_exchange(
                ModuleState::Unformed as u32,
                ModuleState::Coming as u32,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Number of outstanding pins.
    pub fn refcount(&self) -> usize {
        self.refcnt.load(Ordering::Acquire) & !MODULE_GOING
    }

    /// Pin the module so it cannot be unloaded. Fails once unload has begun.
    ///
    /// See <https://elixir.bootlin.com/linux/v6.6/source/kernel/module/main.c#L896>
    pub fn try_get(&self) -> bool {
        self.refcnt
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cnt| {
                if cnt & MODULE_GOING != 0 {
                    None
                } else {
                    Some(cnt + 1)
                }
            })
            .is_ok()
    }

    /// Take an extra pin. Only meaningful while the caller already holds one.
    pub fn get(&self) {
        self.refcnt.fetch_add(1, Ordering::AcqRel);
    }

    /// Drop a pin taken with [`ThisModule::try_get`] or [`ThisModule::get`].
    pub fn put(&self) {
        let res = self
            .refcnt
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cnt| {
                if cnt & !MODULE_GOING == 0 {
                    None
                } else {
                    Some(cnt - 1)
                }
            });
        if res.is_err() {
            log::warn!("Module({}): unbalanced module put", self.name);
        }
    }

    /// Atomically refuse further pins if nobody holds one. On success the
    /// module is marked [`ModuleState::Going`].
    pub fn try_stop(&self) -> bool {
        let stopped = self
            .refcnt
            .compare_exchange(0, MODULE_GOING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if stopped {
            self.set_state(ModuleState::Going);
        }
        stopped
    }

    /// Whether unload has begun and pins are refused.
    pub fn is_stopping(&self) -> bool {
        self.refcnt.load(Ordering::Acquire) & MODULE_GOING != 0
    }

    pub fn take_init(&self) -> Option<InitFn> {
        self.init.lock().take()
    }

    pub fn take_exit(&self) -> Option<ExitFn> {
        self.exit.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_starts_unformed() {
        let module = ThisModule::new("test", None, None);
        assert_eq!(module.state(), ModuleState::Unformed);
        module.set_state(ModuleState::Live);
        assert_eq!(module.state(), ModuleState::Live);
        assert!(matches!(ModuleState::try_from(2), Ok(ModuleState::Going)));
    }

    #[test]
    fn test_refcount_pins() {
        let module = ThisModule::new("test", None, None);
        assert!(module.try_get());
        module.get();
        assert_eq!(module.refcount(), 2);
        module.put();
        module.put();
        assert_eq!(module.refcount(), 0);
        // unbalanced put is ignored
        module.put();
        assert_eq!(module.refcount(), 0);
    }

    #[test]
    fn test_try_stop() {
        let module = ThisModule::new("test", None, None);
        assert!(module.try_get());
        assert!(!module.try_stop());
        assert_eq!(module.state(), ModuleState::Unformed);
        module.put();
        assert!(module.try_stop());
        assert_eq!(module.state(), ModuleState::Going);
        assert!(!module.try_get());
        assert!(module.is_stopping());
        assert_eq!(module.refcount(), 0);
        // a second stop finds the module already going
        assert!(!module.try_stop());
    }

    #[test]
    fn test_begin_load_once() {
        let module = ThisModule::new("test", None, None);
        assert!(module.try_begin_load());
        assert_eq!(module.state(), ModuleState::Coming);
        assert!(!module.try_begin_load());
        module.set_state(ModuleState::Live);
        assert!(!module.try_begin_load());
        assert_eq!(module.state(), ModuleState::Live);
    }

    fn noop_init(_ctx: &ModuleContext<'_>) -> LinuxResult<()> {
        Ok(())
    }

    fn noop_exit(_chrdev: &dyn CharDevRegistry) {}

    #[test]
    fn test_hooks_taken_once() {
        let module = ThisModule::new("test", Some(noop_init), Some(noop_exit));
        assert!(module.take_init().is_some());
        assert!(module.take_init().is_none());
        assert!(module.take_exit().is_some());
        assert!(module.take_exit().is_none());
    }
}
