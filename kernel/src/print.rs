//! Printing facilities.
//!
//! Messages go to the host console (stderr), one `printk` call per write, prefixed with the
//! `KERN_*` level tag the way `dmesg --raw` shows them.

use core::{cmp, fmt};
use std::io::Write;

pub const KERN_EMERG: &str = "<0>";
pub const KERN_ALERT: &str = "<1>";
pub const KERN_CRIT: &str = "<2>";
pub const KERN_ERR: &str = "<3>";
pub const KERN_WARNING: &str = "<4>";
pub const KERN_NOTICE: &str = "<5>";
pub const KERN_INFO: &str = "<6>";
pub const KERN_DEBUG: &str = "<7>";
/// Continuation of the previous line, no level tag.
pub const KERN_CONT: &str = "";

// From kernel/printk/printk.c
pub const LOG_LINE_MAX: usize = 1024 - 32;

#[doc(hidden)]
pub fn printk(klevel: &str, args: fmt::Arguments<'_>) {
    let mut writer = LogLineWriter::new();
    let _ = fmt::write(&mut writer, args);
    let mut console = std::io::stderr().lock();
    // printk never fails
    let _ = console.write_all(klevel.as_bytes());
    let _ = console.write_all(writer.as_bytes());
}

/// Fixed-size line buffer; output past [`LOG_LINE_MAX`] is silently dropped.
#[doc(hidden)]
pub struct LogLineWriter {
    data: [u8; LOG_LINE_MAX],
    pos: usize,
}

#[allow(clippy::new_without_default)]
impl LogLineWriter {
    pub fn new() -> LogLineWriter {
        LogLineWriter {
            data: [0u8; LOG_LINE_MAX],
            pos: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.pos]
    }
}

impl fmt::Write for LogLineWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let copy_len = cmp::min(LOG_LINE_MAX - self.pos, s.len());
        self.data[self.pos..self.pos + copy_len].copy_from_slice(&s.as_bytes()[..copy_len]);
        self.pos += copy_len;
        Ok(())
    }
}

#[macro_export]
macro_rules! pr_emerg {
    ($($arg:tt)*) => {
        $crate::print::printk($crate::print::KERN_EMERG, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! pr_alert {
    ($($arg:tt)*) => {
        $crate::print::printk($crate::print::KERN_ALERT, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! pr_crit {
    ($($arg:tt)*) => {
        $crate::print::printk($crate::print::KERN_CRIT, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! pr_err {
    ($($arg:tt)*) => {
        $crate::print::printk($crate::print::KERN_ERR, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! pr_warn {
    ($($arg:tt)*) => {
        $crate::print::printk($crate::print::KERN_WARNING, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! pr_notice {
    ($($arg:tt)*) => {
        $crate::print::printk($crate::print::KERN_NOTICE, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! pr_info {
    ($($arg:tt)*) => {
        $crate::print::printk($crate::print::KERN_INFO, format_args!($($arg)*))
    };
}

/// Compiled out of release builds, like `pr_debug` without `DEBUG` defined. `log::debug!`
/// records do not go through here; the logger prints them at `KERN_DEBUG` directly.
#[macro_export]
macro_rules! pr_debug {
    ($($arg:tt)*) => {
        if cfg!(debug_assertions) {
            $crate::print::printk($crate::print::KERN_DEBUG, format_args!($($arg)*))
        }
    };
}

#[macro_export]
macro_rules! pr_cont {
    ($($arg:tt)*) => {
        $crate::print::printk($crate::print::KERN_CONT, format_args!($($arg)*))
    };
}

/// [`println!`] functions the same as it does in `std`, except instead of
/// printing to `stdout`, it writes to the kernel console at the `KERN_INFO`
/// level.
///
/// [`println!`]: https://doc.rust-lang.org/stable/std/macro.println.html
#[macro_export]
macro_rules! println {
    () => ({
        $crate::print::printk($crate::print::KERN_INFO, format_args!("\n"));
    });
    ($fmt:expr) => ({
        $crate::print::printk($crate::print::KERN_INFO, format_args!(concat!($fmt, "\n")));
    });
    ($fmt:expr, $($arg:tt)*) => ({
        $crate::print::printk($crate::print::KERN_INFO, format_args!(concat!($fmt, "\n"), $($arg)*));
    });
}
