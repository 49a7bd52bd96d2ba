//! Interrupt line ownership.
//!
//! The hosting kernel owns the interrupt controller and dispatches a
//! requested line to the driver that requested it. Drivers here only claim,
//! pin and release lines.

use crate::error::HwResult;

pub trait IrqChip: Sync {
    /// Claim `irq` under `name`. Fails with `Busy` if the line is taken.
    fn request_irq(&self, irq: u32, name: &'static str) -> HwResult<()>;

    fn free_irq(&self, irq: u32);

    /// Route `irq` to `cpu` only.
    fn set_affinity(&self, irq: u32, cpu: usize) -> HwResult<()>;
}

/// Outcome of an interrupt handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    /// The interrupt was not ours
    None,
    Handled,
}
