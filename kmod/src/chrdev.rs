use alloc::sync::Arc;

use axerrno::LinuxResult;

use crate::FileOperations;

/// Host registry handing out character device majors.
///
/// See <https://elixir.bootlin.com/linux/v6.6/source/include/linux/fs.h#L2786>
pub trait CharDevRegistry: Send + Sync {
    /// Register `fops` under `major`. A `major` of 0 asks the host to pick a
    /// free one. Returns the major actually in use.
    fn register_chrdev(
        &self,
        major: u32,
        name: &'static str,
        fops: Arc<dyn FileOperations>,
    ) -> LinuxResult<u32>;

    /// Give back a major obtained from [`CharDevRegistry::register_chrdev`].
    fn unregister_chrdev(&self, major: u32, name: &str);
}
