//! UHH and TLL register map
//!
//! Offsets are relative to the UHH_CONFIG and USBTLL windows. Field layouts
//! follow the OMAP34xx/OMAP44xx TRMs; where the two generations differ the
//! register gets one bitfield block per generation.

use tock_registers::fields::Field;
use tock_registers::{register_bitfields, LocalRegisterCopy};

use crate::mmio::RegisterIo;

// =============================================================================
// Offsets
// =============================================================================

pub mod offset {
    pub const TLL_SYSCONFIG: usize = 0x10;
    pub const TLL_SYSSTATUS: usize = 0x14;
    pub const TLL_IRQSTATUS: usize = 0x18;
    pub const TLL_IRQENABLE: usize = 0x1C;
    pub const TLL_SHARED_CONF: usize = 0x30;

    /// Per-channel configuration, one word per TLL channel.
    #[inline]
    pub const fn tll_channel_conf(channel: usize) -> usize {
        0x40 + 0x4 * channel
    }

    /// ULPI scratch register of a TLL channel (byte access).
    #[inline]
    pub const fn ulpi_scratch(channel: usize) -> usize {
        0x816 + 0x100 * channel
    }

    pub const UHH_SYSCONFIG: usize = 0x10;
    pub const UHH_SYSSTATUS: usize = 0x14;
    pub const UHH_HOSTCONFIG: usize = 0x40;
    pub const UHH_DEBUG_CSR: usize = 0x44;
}

/// Value written to a ULPI scratch register to check the channel responds.
pub const ULPI_SCRATCH_PATTERN: u8 = 0xBE;

// =============================================================================
// Bitfields
// =============================================================================

register_bitfields![u32,
    pub TLL_SYSCONFIG [
        AUTOIDLE OFFSET(0) NUMBITS(1) [],
        SOFTRESET OFFSET(1) NUMBITS(1) [],
        ENAWAKEUP OFFSET(2) NUMBITS(1) [],
        SIDLEMODE OFFSET(3) NUMBITS(2) [
            ForceIdle = 0,
            NoIdle = 1,
            SmartIdle = 2
        ],
        /// Keep the interface clock running while the module is active
        CACTIVITY OFFSET(8) NUMBITS(1) []
    ],

    pub TLL_SYSSTATUS [
        RESETDONE OFFSET(0) NUMBITS(1) []
    ],

    pub TLL_SHARED_CONF [
        FCLK_IS_ON OFFSET(0) NUMBITS(1) [],
        FCLK_REQ OFFSET(1) NUMBITS(1) [],
        USB_DIVRATION OFFSET(2) NUMBITS(1) [],
        USB_180D_SDR_EN OFFSET(5) NUMBITS(1) [],
        USB_90D_DDR_EN OFFSET(6) NUMBITS(1) []
    ],

    pub TLL_CHANNEL_CONF [
        CHANEN OFFSET(0) NUMBITS(1) [],
        CHANMODE OFFSET(1) NUMBITS(2) [
            Ulpi = 0,
            FsLs = 1
        ],
        ULPIDDRMODE OFFSET(8) NUMBITS(1) [],
        UTMIAUTOIDLE OFFSET(9) NUMBITS(1) [],
        ULPIAUTOIDLE OFFSET(10) NUMBITS(1) [],
        ULPINOBITSTUFF OFFSET(11) NUMBITS(1) [],
        /// Full/low-speed serial signalling variant, see `PortMode::fslsmode`
        FSLSMODE OFFSET(24) NUMBITS(4) []
    ],

    /// UHH_SYSCONFIG on OMAP34xx/36xx
    pub UHH_SYSCONFIG_OMAP3 [
        AUTOIDLE OFFSET(0) NUMBITS(1) [],
        SOFTRESET OFFSET(1) NUMBITS(1) [],
        ENAWAKEUP OFFSET(2) NUMBITS(1) [],
        SIDLEMODE OFFSET(3) NUMBITS(2) [
            ForceIdle = 0,
            NoIdle = 1,
            SmartIdle = 2
        ],
        CACTIVITY OFFSET(8) NUMBITS(1) [],
        MIDLEMODE OFFSET(12) NUMBITS(2) [
            ForceStandby = 0,
            NoStandby = 1,
            SmartStandby = 2
        ]
    ],

    /// UHH_SYSCONFIG on OMAP44xx
    pub UHH_SYSCONFIG_OMAP4 [
        SOFTRESET OFFSET(0) NUMBITS(1) [],
        IDLEMODE OFFSET(2) NUMBITS(2) [
            ForceIdle = 0,
            NoIdle = 1,
            SmartIdle = 2
        ],
        STANDBYMODE OFFSET(4) NUMBITS(2) [
            ForceStandby = 0,
            NoStandby = 1,
            SmartStandby = 2
        ]
    ],

    pub UHH_SYSSTATUS [
        RESETDONE OFFSET(0) NUMBITS(1) [],
        OHCI_RESETDONE OFFSET(1) NUMBITS(1) [],
        EHCI_RESETDONE OFFSET(2) NUMBITS(1) []
    ],

    pub UHH_HOSTCONFIG [
        /// Port 1 bypass; the only (global) bypass bit on OMAP3430 <= ES2.1
        P1_ULPI_BYPASS OFFSET(0) NUMBITS(1) [],
        INCR4_BURST_EN OFFSET(2) NUMBITS(1) [],
        INCR8_BURST_EN OFFSET(3) NUMBITS(1) [],
        INCR16_BURST_EN OFFSET(4) NUMBITS(1) [],
        INCRX_ALIGN_EN OFFSET(5) NUMBITS(1) [],
        P1_CONNECT_STATUS OFFSET(8) NUMBITS(1) [],
        P2_CONNECT_STATUS OFFSET(9) NUMBITS(1) [],
        P3_CONNECT_STATUS OFFSET(10) NUMBITS(1) [],
        P2_ULPI_BYPASS OFFSET(11) NUMBITS(1) [],
        P3_ULPI_BYPASS OFFSET(12) NUMBITS(1) [],
        /// OMAP44xx port 1 routing
        P1_MODE OFFSET(16) NUMBITS(2) [
            UlpiPhy = 0,
            UlpiTll = 1,
            Hsic = 3
        ],
        /// OMAP44xx port 2 routing
        P2_MODE OFFSET(18) NUMBITS(2) [
            UlpiPhy = 0,
            UlpiTll = 1,
            Hsic = 3
        ],
        /// OMAP44xx: start the application clock
        APP_START_CLK OFFSET(31) NUMBITS(1) []
    ]
];

pub type TllSysconfig = LocalRegisterCopy<u32, TLL_SYSCONFIG::Register>;
pub type TllSysstatus = LocalRegisterCopy<u32, TLL_SYSSTATUS::Register>;
pub type TllSharedConf = LocalRegisterCopy<u32, TLL_SHARED_CONF::Register>;
pub type TllChannelConf = LocalRegisterCopy<u32, TLL_CHANNEL_CONF::Register>;
pub type UhhSysconfigOmap3 = LocalRegisterCopy<u32, UHH_SYSCONFIG_OMAP3::Register>;
pub type UhhSysconfigOmap4 = LocalRegisterCopy<u32, UHH_SYSCONFIG_OMAP4::Register>;
pub type UhhSysstatus = LocalRegisterCopy<u32, UHH_SYSSTATUS::Register>;
pub type UhhHostConfig = LocalRegisterCopy<u32, UHH_HOSTCONFIG::Register>;

/// ULPI bypass bit of host port `port` (0-based).
pub const fn ulpi_bypass(port: usize) -> Field<u32, UHH_HOSTCONFIG::Register> {
    match port {
        0 => UHH_HOSTCONFIG::P1_ULPI_BYPASS,
        1 => UHH_HOSTCONFIG::P2_ULPI_BYPASS,
        _ => UHH_HOSTCONFIG::P3_ULPI_BYPASS,
    }
}

/// Connect-status bit of host port `port` (0-based).
pub const fn connect_status(port: usize) -> Field<u32, UHH_HOSTCONFIG::Register> {
    match port {
        0 => UHH_HOSTCONFIG::P1_CONNECT_STATUS,
        1 => UHH_HOSTCONFIG::P2_CONNECT_STATUS,
        _ => UHH_HOSTCONFIG::P3_CONNECT_STATUS,
    }
}

/// OMAP44xx routing field of host port `port` (0 or 1).
pub const fn port_mode(port: usize) -> Field<u32, UHH_HOSTCONFIG::Register> {
    match port {
        0 => UHH_HOSTCONFIG::P1_MODE,
        _ => UHH_HOSTCONFIG::P2_MODE,
    }
}

/// Encodings of the OMAP44xx `Pn_MODE` fields.
pub mod port_routing {
    pub const ULPI_PHY: u32 = 0;
    pub const ULPI_TLL: u32 = 1;
    pub const HSIC: u32 = 3;
}

// =============================================================================
// Typed access
// =============================================================================

#[inline]
pub fn read_hostconfig<R: RegisterIo>(uhh: &R) -> UhhHostConfig {
    UhhHostConfig::new(uhh.read32(offset::UHH_HOSTCONFIG))
}

#[inline]
pub fn write_hostconfig<R: RegisterIo>(uhh: &R, cfg: UhhHostConfig) {
    uhh.write32(offset::UHH_HOSTCONFIG, cfg.get());
}

#[inline]
pub fn read_channel_conf<R: RegisterIo>(tll: &R, channel: usize) -> TllChannelConf {
    TllChannelConf::new(tll.read32(offset::tll_channel_conf(channel)))
}

#[inline]
pub fn write_channel_conf<R: RegisterIo>(tll: &R, channel: usize, conf: TllChannelConf) {
    tll.write32(offset::tll_channel_conf(channel), conf.get());
}
