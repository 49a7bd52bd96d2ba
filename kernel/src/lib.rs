//! OMAP34xx/36xx/44xx platform support
//!
//! Two pieces of SoC plumbing a kernel needs on these chips:
//! - `drivers::usb::uhhtll`: power sequencing and port routing of the USB
//!   Host Hub and Transceiver-Less Link shared by the EHCI and OHCI drivers
//! - `oprofile`: ARMv7 PMU sampling on every CPU, with the OMAP44xx
//!   cross-trigger path for the overflow interrupt
//!
//! Hardware and kernel services are reached through the traits in
//! `platform`, `mmio`, `time` and `arch_impl`, so the drivers run unchanged
//! against the board's implementations or the host-side fakes in the tests.

#![cfg_attr(not(test), no_std)]

pub mod arch_impl;
pub mod drivers;
pub mod error;
pub mod logger;
pub mod mmio;
pub mod oprofile;
pub mod platform;
pub mod platform_config;
pub mod time;

#[cfg(test)]
mod mock;
#[cfg(test)]
mod tests;

pub use error::{HwError, HwResult};
