//! memchardev: a simple in-memory character device.
//!
//! Each minor is a fixed-size buffer. One process at a time may hold it open; whatever it
//! writes can be read back (after seeking) until the device is opened again, which starts over
//! with an empty device.

mod config;
mod device;
mod file;

use std::sync::Arc;

use kernel::{chrdev, error::KernelResult as Result, logger, pr_info, Module, ThisModule};
use log::info;

pub use crate::{
    config::{DeviceConfig, BUFFER_SIZE, DEVICE_NAME},
    device::{Device, Session},
    file::MemCharFile,
};

/// Parameters come from `MEMCHARDEV_PARAMS` at build time, e.g. `"capacity=4096 minors=2"`.
pub static THIS_MODULE: ThisModule = ThisModule::with_params(
    DEVICE_NAME,
    match option_env!("MEMCHARDEV_PARAMS") {
        Some(params) => params,
        None => "",
    },
);

/// The loaded module: one [`Device`] per minor behind a character device registration.
pub struct MemCharDev {
    devices: Vec<Arc<Device>>,
    registration: chrdev::Registration,
}

impl MemCharDev {
    pub fn with_config(config: &DeviceConfig) -> Result<Self> {
        config.validate()?;
        info!("{}: initializing module", config.name);
        let devices = (0..config.minors)
            .map(|_| Device::try_new(config.capacity))
            .collect::<Result<Vec<_>>>()?;
        let registration = devices
            .iter()
            .fold(
                chrdev::builder(config.name, 0..config.minors)?,
                |builder, device| builder.register_device::<MemCharFile>(device.clone()),
            )
            .build()?;
        info!(
            "{}: major number {}, {} byte buffer per device",
            config.name,
            registration.major(),
            config.capacity
        );
        Ok(MemCharDev {
            devices,
            registration,
        })
    }

    pub fn registration(&self) -> &chrdev::Registration {
        &self.registration
    }

    /// The device behind `minor`, if there is one.
    pub fn device(&self, minor: u16) -> Option<&Arc<Device>> {
        self.devices.get(usize::from(minor))
    }
}

impl Module for MemCharDev {
    fn init(module: &'static ThisModule) -> Result<Self> {
        logger::init_logger();
        let config = DeviceConfig {
            name: module.name(),
            ..DeviceConfig::from_params(module.params())?
        };
        MemCharDev::with_config(&config)
    }
}

impl Drop for MemCharDev {
    fn drop(&mut self) {
        pr_info!("{}: module unloaded\n", self.registration.name());
    }
}
