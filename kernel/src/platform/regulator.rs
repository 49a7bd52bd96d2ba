//! Voltage regulator interface.

use crate::error::HwResult;

use super::DeviceId;

/// Opaque handle to a supply obtained from [`RegulatorFramework::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Regulator(pub u32);

pub trait RegulatorFramework: Sync {
    fn get(&self, dev: DeviceId, supply: &str) -> HwResult<Regulator>;
    fn enable(&self, reg: Regulator) -> HwResult<()>;
    fn disable(&self, reg: Regulator);
    fn put(&self, reg: Regulator);
}
