//! Runtime power management interface.
//!
//! `get_sync`/`put_sync` take and drop a hold that keeps the device's power
//! domain on. The core counts holds per device.

use super::DeviceId;

pub trait RuntimePm: Sync {
    fn enable(&self, dev: DeviceId);
    fn disable(&self, dev: DeviceId);
    fn get_sync(&self, dev: DeviceId);
    fn put_sync(&self, dev: DeviceId);
}
