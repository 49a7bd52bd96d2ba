//! Device drivers subsystem
//!
//! Board drivers for the OMAP platform. The USB host sequencer is the only
//! bus driver here; the PMU sampling driver lives in `oprofile`.

pub mod usb;
