//! `printk`-style helpers on top of the `log` facade.

/// `KERN_INFO`
#[macro_export]
macro_rules! pr_info {
    ($($arg:tt)*) => {
        $crate::log::info!($($arg)*)
    };
}

/// `KERN_WARNING`
#[macro_export]
macro_rules! pr_warn {
    ($($arg:tt)*) => {
        $crate::log::warn!($($arg)*)
    };
}

/// `KERN_ALERT`
#[macro_export]
macro_rules! pr_alert {
    ($($arg:tt)*) => {
        $crate::log::error!($($arg)*)
    };
}

/// `KERN_DEBUG`
#[macro_export]
macro_rules! pr_debug {
    ($($arg:tt)*) => {
        $crate::log::debug!($($arg)*)
    };
}
