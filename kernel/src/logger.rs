use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::{
    pr_info,
    print::{printk, KERN_CONT, KERN_DEBUG, KERN_ERR, KERN_INFO, KERN_WARNING},
};

struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }
    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let module_path = record.module_path().unwrap_or_default();
        let (klevel, tag) = console_level(record.level());
        printk(
            klevel,
            format_args!("[{}] [{}] {}\n", tag, module_path, record.args()),
        );
    }
    fn flush(&self) {}
}

/// Console level and tag for a record. Debug records are printed whenever the max level lets
/// them through, unlike `pr_debug!`, which release builds compile out.
fn console_level(level: Level) -> (&'static str, &'static str) {
    match level {
        Level::Error => (KERN_ERR, "ERROR"),
        Level::Warn => (KERN_WARNING, " WARN"),
        Level::Info => (KERN_INFO, " INFO"),
        Level::Debug => (KERN_DEBUG, "DEBUG"),
        Level::Trace => (KERN_CONT, "TRACE"),
    }
}

/// Maps a `LOG` setting to a filter; anything unrecognised means `INFO`.
pub fn level_filter(setting: Option<&str>) -> LevelFilter {
    match setting.map(str::trim) {
        Some("OFF") => LevelFilter::Off,
        Some("ERROR") => LevelFilter::Error,
        Some("WARN") => LevelFilter::Warn,
        Some("INFO") => LevelFilter::Info,
        Some("DEBUG") => LevelFilter::Debug,
        Some("TRACE") => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Installs the console logger. Later calls return without touching it.
///
/// The level comes from `LOG` in the environment, falling back to the value `LOG` had at build
/// time. `LOG=DEBUG` shows the registrar's per-call tracing in release builds too.
pub fn init_logger() {
    if log::set_logger(&SimpleLogger).is_err() {
        return;
    }
    let runtime = std::env::var("LOG").ok();
    let setting = runtime.as_deref().or(option_env!("LOG"));
    let filter = level_filter(setting);
    log::set_max_level(filter);
    pr_info!("Init logger {:?} ({})\n", setting, filter);
}
