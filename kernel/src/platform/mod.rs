//! Kernel platform services consumed by the drivers.
//!
//! The USB host and PMU drivers never reach into a clock tree, GPIO bank or
//! runtime-PM core directly. They call the traits in this module, which the
//! hosting kernel implements once per board.

pub mod clk;
pub mod gpio;
pub mod pinmux;
pub mod pm_runtime;
pub mod regulator;

use crate::mmio::MemResource;
use crate::time::TimeSource;

pub use clk::{Clk, ClockFramework};
pub use gpio::GpioController;
pub use pinmux::{PadMode, PinMux};
pub use pm_runtime::RuntimePm;
pub use regulator::{Regulator, RegulatorFramework};

/// Identity of a device as known to the platform services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub u32);

/// A platform device handed to a driver's probe routine.
#[derive(Debug, Clone, Copy)]
pub struct PlatformDevice<'a> {
    pub id: DeviceId,
    pub name: &'static str,
    pub resources: &'a [MemResource],
}

impl<'a> PlatformDevice<'a> {
    /// The `index`-th memory resource, if the device has one.
    pub fn resource(&self, index: usize) -> Option<&'a MemResource> {
        self.resources.get(index)
    }
}

/// Services the USB host sequencer runs on.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub clocks: &'a dyn ClockFramework,
    pub gpio: &'a dyn GpioController,
    pub regulators: &'a dyn RegulatorFramework,
    pub pm: &'a dyn RuntimePm,
    pub time: &'a dyn TimeSource,
}
