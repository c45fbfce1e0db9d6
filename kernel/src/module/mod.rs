use crate::error::KernelResult as Result;

/// The top level entrypoint to implementing a kernel module.
///
/// For any teardown or cleanup operations, your type may implement [`Drop`].
pub trait Module: Sized + Sync {
    /// Called at module initialization time.
    ///
    /// Use this method to perform whatever setup or registration your module
    /// should do.
    ///
    /// Equivalent to the `module_init` macro in the C API.
    fn init(module: &'static ThisModule) -> Result<Self>;
}

/// Equivalent to `THIS_MODULE` in the C API.
pub struct ThisModule {
    name: &'static str,
    params: &'static str,
}

impl ThisModule {
    pub const fn new(name: &'static str) -> ThisModule {
        ThisModule::with_params(name, "")
    }

    /// A module loaded with `params`, the `key=value` list `insmod` would pass after the
    /// module name.
    pub const fn with_params(name: &'static str, params: &'static str) -> ThisModule {
        ThisModule { name, params }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn params(&self) -> &'static str {
        self.params
    }
}

#[cfg(test)]
mod tests {
    use super::ThisModule;

    static PLAIN: ThisModule = ThisModule::new("plain");
    static TUNED: ThisModule = ThisModule::with_params("tuned", "size=8");

    #[test]
    fn params_default_to_empty() {
        assert_eq!(PLAIN.name(), "plain");
        assert_eq!(PLAIN.params(), "");
        assert_eq!(TUNED.params(), "size=8");
    }
}
