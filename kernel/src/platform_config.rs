//! Platform hardware configuration for OMAP.
//!
//! Holds the SoC identity detected by early boot code and the fixed
//! physical addresses the USB host and PMU drivers need. Defaults describe
//! an OMAP44xx so the PMU path works before `init()` runs.
//!
//! Board code calls `init()` once, before probing any driver, and drivers
//! take a `SocInfo` snapshot from `soc_info()`.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::mmio::MemResource;

// =============================================================================
// SoC identity
// =============================================================================

/// SoC family, the main capability switch of the USB host sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SocFamily {
    Omap3430 = 0,
    Omap3630 = 1,
    Omap44xx = 2,
}

impl SocFamily {
    const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => SocFamily::Omap3430,
            1 => SocFamily::Omap3630,
            _ => SocFamily::Omap44xx,
        }
    }
}

/// Silicon revision. Ordered, so `rev <= SiliconRev::Es2_1` reads like the
/// errata sheets do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum SiliconRev {
    Es1_0 = 0,
    Es2_0 = 1,
    Es2_1 = 2,
    Es3_0 = 3,
    Es3_1 = 4,
}

impl SiliconRev {
    const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => SiliconRev::Es1_0,
            1 => SiliconRev::Es2_0,
            2 => SiliconRev::Es2_1,
            3 => SiliconRev::Es3_0,
            _ => SiliconRev::Es3_1,
        }
    }
}

/// Snapshot of the running SoC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocInfo {
    pub family: SocFamily,
    pub rev: SiliconRev,
}

impl SocInfo {
    pub const fn new(family: SocFamily, rev: SiliconRev) -> Self {
        Self { family, rev }
    }

    /// OMAP44xx: the UHH is brought up with plain register writes.
    #[inline]
    pub fn is_omap4(&self) -> bool {
        self.family == SocFamily::Omap44xx
    }

    /// OMAP3430 up to ES2.1 only has the global ULPI bypass bit.
    #[inline]
    pub fn has_global_ulpi_bypass_only(&self) -> bool {
        self.family == SocFamily::Omap3430 && self.rev <= SiliconRev::Es2_1
    }

    /// Number of TLL channels wired to host ports.
    #[inline]
    pub fn tll_channel_count(&self) -> usize {
        if self.is_omap4() {
            OMAP4_TLL_CHANNEL_COUNT
        } else {
            OMAP3_TLL_CHANNEL_COUNT
        }
    }

    /// PMU overflow interrupt of each CPU, indexed by CPU number.
    pub fn pmu_irqs(&self) -> &'static [u32] {
        if self.is_omap4() {
            &[OMAP44XX_IRQ_CTI0, OMAP44XX_IRQ_CTI1]
        } else {
            &[INT_34XX_BENCH_MPU_EMUL]
        }
    }

    /// UHH and TLL register windows, in platform-device resource order.
    pub fn usbhs_resources(&self) -> [MemResource; 2] {
        if self.is_omap4() {
            [
                MemResource::new(OMAP44XX_UHH_CONFIG_BASE, UHH_WINDOW_SIZE),
                MemResource::new(OMAP44XX_USBTLL_BASE, TLL_WINDOW_SIZE),
            ]
        } else {
            [
                MemResource::new(OMAP34XX_UHH_CONFIG_BASE, UHH_WINDOW_SIZE),
                MemResource::new(OMAP34XX_USBTLL_BASE, TLL_WINDOW_SIZE),
            ]
        }
    }
}

static SOC_FAMILY: AtomicU8 = AtomicU8::new(SocFamily::Omap44xx as u8);
static SOC_REV: AtomicU8 = AtomicU8::new(SiliconRev::Es1_0 as u8);

/// Record the SoC detected by early boot code.
pub fn init(info: SocInfo) {
    SOC_FAMILY.store(info.family as u8, Ordering::Relaxed);
    SOC_REV.store(info.rev as u8, Ordering::Relaxed);
    log::info!("platform: {:?} {:?}", info.family, info.rev);
}

/// Current SoC snapshot.
#[inline]
pub fn soc_info() -> SocInfo {
    SocInfo {
        family: SocFamily::from_raw(SOC_FAMILY.load(Ordering::Relaxed)),
        rev: SiliconRev::from_raw(SOC_REV.load(Ordering::Relaxed)),
    }
}

// =============================================================================
// USB host subsystem
// =============================================================================

pub const OMAP34XX_UHH_CONFIG_BASE: u64 = 0x4806_4000;
pub const OMAP34XX_USBTLL_BASE: u64 = 0x4806_2000;
pub const OMAP44XX_UHH_CONFIG_BASE: u64 = 0x4A06_4000;
pub const OMAP44XX_USBTLL_BASE: u64 = 0x4A06_2000;

pub const UHH_WINDOW_SIZE: usize = 0x400;
pub const TLL_WINDOW_SIZE: usize = 0x1000;

/// Host ports on OMAP3 (and the size of every per-port table).
pub const OMAP3_HS_USB_PORTS: usize = 3;
pub const OMAP3_TLL_CHANNEL_COUNT: usize = 3;
pub const OMAP4_TLL_CHANNEL_COUNT: usize = 2;

// =============================================================================
// Debug/trace subsystem (PMU overflow routing, OMAP44xx)
// =============================================================================

/// CM_L3INSTR instance; holds the L3_3 and L3_INSTR clock controls.
pub const CM_L3INSTR_BASE: u64 = 0x4A00_8E00;
pub const CM_L3INSTR_L3_3_CLKCTRL: usize = 0x20;
pub const CM_L3INSTR_L3_INSTR_CLKCTRL: usize = 0x28;

/// CM_EMU instance; CLKSTCTRL is its first register.
pub const CM_EMU_BASE: u64 = 0x4A30_7A00;
pub const CM_EMU_CLKSTCTRL: usize = 0x00;
pub const CM_WINDOW_SIZE: usize = 0x100;

/// Cross trigger interface of each Cortex-A9 core.
pub const CTI_BASE: [u64; 2] = [0x5414_8000, 0x5414_9000];
pub const CTI_WINDOW_SIZE: usize = 0x1000;

pub const OMAP44XX_IRQ_GIC_START: u32 = 32;
/// TRIGOUT[6] of CTI0
pub const OMAP44XX_IRQ_CTI0: u32 = OMAP44XX_IRQ_GIC_START + 1;
/// TRIGOUT[6] of CTI1
pub const OMAP44XX_IRQ_CTI1: u32 = OMAP44XX_IRQ_GIC_START + 2;
/// MPU emulation interrupt used for PMU overflow on OMAP34xx
pub const INT_34XX_BENCH_MPU_EMUL: u32 = 3;
