use kernel::{chrdev::MAX_MINORS, code::EINVAL, error::KernelResult};

pub const DEVICE_NAME: &str = "memchardev";
pub const BUFFER_SIZE: usize = 1024;

/// Load-time parameters of the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Name of the registration and of the device node.
    pub name: &'static str,
    /// Size of each device buffer in bytes. Fixed for the lifetime of the device.
    pub capacity: usize,
    /// How many independent devices (minors) to create.
    pub minors: u16,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            name: DEVICE_NAME,
            capacity: BUFFER_SIZE,
            minors: 1,
        }
    }
}

impl DeviceConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_minors(mut self, minors: u16) -> Self {
        self.minors = minors;
        self
    }

    pub fn validate(&self) -> KernelResult {
        if self.name.is_empty()
            || self.capacity == 0
            || self.minors == 0
            || usize::from(self.minors) > MAX_MINORS
        {
            return Err(EINVAL);
        }
        Ok(())
    }

    /// Parses a module parameter string such as `"capacity=4096 minors=2"` on top of the
    /// defaults.
    ///
    /// The device name is fixed at build time, so `name=` is only accepted when it repeats it.
    pub fn from_params(params: &str) -> KernelResult<Self> {
        let mut config = DeviceConfig::default();
        for param in params.split_whitespace() {
            let (key, value) = param.split_once('=').ok_or(EINVAL)?;
            match key {
                "capacity" => config.capacity = value.parse().map_err(|_| EINVAL)?,
                "minors" => config.minors = value.parse().map_err(|_| EINVAL)?,
                "name" if value == config.name => {}
                _ => return Err(EINVAL),
            }
        }
        config.validate()?;
        Ok(config)
    }
}
