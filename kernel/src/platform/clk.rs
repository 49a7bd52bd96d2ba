//! Clock framework interface.

use crate::error::HwResult;

use super::DeviceId;

/// Opaque handle to a clock obtained from [`ClockFramework::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Clk(pub u32);

pub trait ClockFramework: Sync {
    /// Look up a clock by connection name. Fails with
    /// [`HwError::ClockUnavailable`](crate::error::HwError::ClockUnavailable).
    fn get(&self, dev: DeviceId, name: &str) -> HwResult<Clk>;

    fn enable(&self, clk: Clk) -> HwResult<()>;

    fn disable(&self, clk: Clk);

    /// Drop the reference taken by `get`.
    fn put(&self, clk: Clk);

    /// Reparent `clk` onto `parent`.
    fn set_parent(&self, clk: Clk, parent: Clk) -> HwResult<()>;
}

/// Get and enable `name`, dropping the reference again if enabling fails.
pub fn get_enabled(clocks: &dyn ClockFramework, dev: DeviceId, name: &str) -> HwResult<Clk> {
    let clk = clocks.get(dev, name)?;
    if let Err(e) = clocks.enable(clk) {
        clocks.put(clk);
        return Err(e);
    }
    Ok(clk)
}

/// Disable and put a clock held in `slot`, leaving `None` behind.
pub fn release(clocks: &dyn ClockFramework, slot: &mut Option<Clk>) {
    if let Some(clk) = slot.take() {
        clocks.disable(clk);
        clocks.put(clk);
    }
}

/// Put a clock that was looked up but never enabled.
pub fn put(clocks: &dyn ClockFramework, slot: &mut Option<Clk>) {
    if let Some(clk) = slot.take() {
        clocks.put(clk);
    }
}
