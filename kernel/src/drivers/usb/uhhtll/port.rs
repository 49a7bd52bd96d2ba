//! Host port modes and board configuration.

use crate::platform_config::OMAP3_HS_USB_PORTS;

/// How a host port is wired on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortMode {
    #[default]
    Unused,
    /// EHCI through an external ULPI PHY
    EhciPhy,
    /// EHCI through the TLL (PHY-less ULPI link)
    EhciTll,
    OhciPhy6PinDatSe0,
    OhciPhy6PinDpDm,
    OhciPhy3PinDatSe0,
    OhciPhy4PinDpDm,
    OhciTll6PinDatSe0,
    OhciTll6PinDpDm,
    OhciTll3PinDatSe0,
    OhciTll4PinDpDm,
    OhciTll2PinDatSe0,
    OhciTll2PinDpDm,
}

impl PortMode {
    /// Every OHCI signalling variant, in FSLSMODE code order.
    pub const OHCI_MODES: [PortMode; 10] = [
        PortMode::OhciPhy6PinDatSe0,
        PortMode::OhciPhy6PinDpDm,
        PortMode::OhciPhy3PinDatSe0,
        PortMode::OhciPhy4PinDpDm,
        PortMode::OhciTll6PinDatSe0,
        PortMode::OhciTll6PinDpDm,
        PortMode::OhciTll3PinDatSe0,
        PortMode::OhciTll4PinDpDm,
        PortMode::OhciTll2PinDatSe0,
        PortMode::OhciTll2PinDpDm,
    ];

    #[inline]
    pub fn is_unused(self) -> bool {
        self == PortMode::Unused
    }

    /// Port driven by the EHCI controller.
    #[inline]
    pub fn is_ehci(self) -> bool {
        matches!(self, PortMode::EhciPhy | PortMode::EhciTll)
    }

    /// Port driven by the OHCI controller.
    pub fn is_ohci(self) -> bool {
        matches!(
            self,
            PortMode::OhciPhy6PinDatSe0
                | PortMode::OhciPhy6PinDpDm
                | PortMode::OhciPhy3PinDatSe0
                | PortMode::OhciPhy4PinDpDm
                | PortMode::OhciTll6PinDatSe0
                | PortMode::OhciTll6PinDpDm
                | PortMode::OhciTll3PinDatSe0
                | PortMode::OhciTll4PinDpDm
                | PortMode::OhciTll2PinDatSe0
                | PortMode::OhciTll2PinDpDm
        )
    }

    /// TLL channel FSLSMODE encoding. Non-OHCI modes encode as 0.
    pub fn fslsmode(self) -> u32 {
        match self {
            PortMode::OhciPhy6PinDatSe0 => 0x0,
            PortMode::OhciPhy6PinDpDm => 0x1,
            PortMode::OhciPhy3PinDatSe0 => 0x2,
            PortMode::OhciPhy4PinDpDm => 0x3,
            PortMode::OhciTll6PinDatSe0 => 0x4,
            PortMode::OhciTll6PinDpDm => 0x5,
            PortMode::OhciTll3PinDatSe0 => 0x6,
            PortMode::OhciTll4PinDpDm => 0x7,
            PortMode::OhciTll2PinDatSe0 => 0xA,
            PortMode::OhciTll2PinDpDm => 0xB,
            PortMode::Unused => 0x0,
            PortMode::EhciPhy | PortMode::EhciTll => {
                log::warn!("usbhs: {:?} has no FSLSMODE encoding, using 0", self);
                0x0
            }
        }
    }
}

/// The two host controllers sharing the UHH/TLL blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverType {
    Ehci,
    Ohci,
}

/// Board configuration of the USB host subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbhsPlatformData {
    pub port_mode: [PortMode; OMAP3_HS_USB_PORTS],
    /// Drive the PHY reset lines around EHCI bring-up
    pub phy_reset: bool,
    /// PHY reset GPIO of ports 1 and 2; negative when not wired
    pub reset_gpio_port: [i32; 2],
    /// Route every OHCI port through the global ULPI bypass
    pub es2_compatibility: bool,
}

impl UsbhsPlatformData {
    pub const fn new(port_mode: [PortMode; OMAP3_HS_USB_PORTS]) -> Self {
        Self {
            port_mode,
            phy_reset: false,
            reset_gpio_port: [-1, -1],
            es2_compatibility: false,
        }
    }

    /// Bitmask of ports whose mode is `mode`, bit `n` for port `n`.
    pub fn ports_in_mode(&self, mode: PortMode) -> u8 {
        self.port_mode
            .iter()
            .enumerate()
            .filter(|(_, m)| **m == mode)
            .fold(0, |mask, (port, _)| mask | (1 << port))
    }

    pub fn any_port(&self, mode: PortMode) -> bool {
        self.port_mode.contains(&mode)
    }
}

impl Default for UsbhsPlatformData {
    fn default() -> Self {
        Self::new([PortMode::Unused; OMAP3_HS_USB_PORTS])
    }
}
