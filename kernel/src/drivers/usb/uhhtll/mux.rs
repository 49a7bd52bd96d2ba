//! Pad multiplexing for the USB host ports.
//!
//! OMAP34xx pads are routed by signal name through the mux framework.
//! OMAP44xx pads are programmed with raw writes to their 16-bit
//! configuration registers.

use crate::platform::{PadMode, PinMux};
use crate::platform_config::{SocInfo, OMAP3_HS_USB_PORTS};

use super::PortMode;

// =============================================================================
// OMAP34xx
// =============================================================================

/// ULPI signals of one port, STP and CLK first.
type UlpiSignals = [&'static str; 12];

const HSUSB_PHY_SIGNALS: [UlpiSignals; 2] = [
    [
        "hsusb1_stp", "hsusb1_clk", "hsusb1_dir", "hsusb1_nxt", "hsusb1_data0", "hsusb1_data1",
        "hsusb1_data2", "hsusb1_data3", "hsusb1_data4", "hsusb1_data5", "hsusb1_data6", "hsusb1_data7",
    ],
    [
        "hsusb2_stp", "hsusb2_clk", "hsusb2_dir", "hsusb2_nxt", "hsusb2_data0", "hsusb2_data1",
        "hsusb2_data2", "hsusb2_data3", "hsusb2_data4", "hsusb2_data5", "hsusb2_data6", "hsusb2_data7",
    ],
];

const HSUSB_TLL_SIGNALS: [UlpiSignals; 3] = [
    [
        "hsusb1_tll_stp", "hsusb1_tll_clk", "hsusb1_tll_dir", "hsusb1_tll_nxt",
        "hsusb1_tll_data0", "hsusb1_tll_data1", "hsusb1_tll_data2", "hsusb1_tll_data3",
        "hsusb1_tll_data4", "hsusb1_tll_data5", "hsusb1_tll_data6", "hsusb1_tll_data7",
    ],
    [
        "hsusb2_tll_stp", "hsusb2_tll_clk", "hsusb2_tll_dir", "hsusb2_tll_nxt",
        "hsusb2_tll_data0", "hsusb2_tll_data1", "hsusb2_tll_data2", "hsusb2_tll_data3",
        "hsusb2_tll_data4", "hsusb2_tll_data5", "hsusb2_tll_data6", "hsusb2_tll_data7",
    ],
    [
        "hsusb3_tll_stp", "hsusb3_tll_clk", "hsusb3_tll_dir", "hsusb3_tll_nxt",
        "hsusb3_tll_data0", "hsusb3_tll_data1", "hsusb3_tll_data2", "hsusb3_tll_data3",
        "hsusb3_tll_data4", "hsusb3_tll_data5", "hsusb3_tll_data6", "hsusb3_tll_data7",
    ],
];

/// Serial FS/LS signals of one port: rxdp, rxdm, rxrcv, txen_n, txse0, txdat.
const MM_SIGNALS: [[&str; 6]; 3] = [
    ["mm1_rxdp", "mm1_rxdm", "mm1_rxrcv", "mm1_txen_n", "mm1_txse0", "mm1_txdat"],
    ["mm2_rxdp", "mm2_rxdm", "mm2_rxrcv", "mm2_txen_n", "mm2_txse0", "mm2_txdat"],
    ["mm3_rxdp", "mm3_rxdm", "mm3_rxrcv", "mm3_txen_n", "mm3_txse0", "mm3_txdat"],
];

/// Index of `txen_n` in a serial signal row; the only output.
const TXEN: usize = 3;

/// First serial signal a mode uses. Modes with fewer pins drop signals
/// from the front of the row.
fn first_serial_signal(mode: PortMode) -> Option<usize> {
    match mode {
        PortMode::OhciPhy6PinDatSe0
        | PortMode::OhciPhy6PinDpDm
        | PortMode::OhciTll6PinDatSe0
        | PortMode::OhciTll6PinDpDm => Some(0),
        PortMode::OhciPhy4PinDpDm | PortMode::OhciTll4PinDpDm => Some(2),
        PortMode::OhciPhy3PinDatSe0 | PortMode::OhciTll3PinDatSe0 => Some(3),
        PortMode::OhciTll2PinDatSe0 | PortMode::OhciTll2PinDpDm => Some(4),
        _ => None,
    }
}

fn omap3_ehci_signals(mux: &dyn PinMux, port_mode: &[PortMode; OMAP3_HS_USB_PORTS]) {
    for (port, mode) in port_mode.iter().enumerate() {
        match mode {
            PortMode::EhciPhy => match HSUSB_PHY_SIGNALS.get(port) {
                Some(signals) => {
                    for (i, &signal) in signals.iter().enumerate() {
                        let pad = if i < 2 { PadMode::Output } else { PadMode::InputPulldown };
                        mux.init_signal(signal, pad);
                    }
                }
                None => log::warn!("usbhs: Port{} can't be used in PHY mode", port + 1),
            },
            PortMode::EhciTll => {
                for (i, &signal) in HSUSB_TLL_SIGNALS[port].iter().enumerate() {
                    let pad = if i == 0 { PadMode::InputPullup } else { PadMode::InputPulldown };
                    mux.init_signal(signal, pad);
                }
            }
            _ => {}
        }
    }
}

fn omap3_ohci_signals(mux: &dyn PinMux, port_mode: &[PortMode; OMAP3_HS_USB_PORTS]) {
    for (port, mode) in port_mode.iter().enumerate() {
        let Some(first) = first_serial_signal(*mode) else {
            continue;
        };
        for (i, &signal) in MM_SIGNALS[port].iter().enumerate().skip(first) {
            let pad = if i == TXEN { PadMode::Output } else { PadMode::InputPulldown };
            mux.init_signal(signal, pad);
        }
    }
}

// =============================================================================
// OMAP44xx
// =============================================================================

/// ULPI pad bank of one port: CLK at `base`, STP next, then DIR, NXT and
/// DAT0..DAT7 at consecutive 16-bit registers.
struct UlpiPadBank {
    base: u32,
    clk: u16,
    stp: u16,
    data: u16,
}

const OMAP4_EHCI_PHY_PADS: [UlpiPadBank; 2] = [
    UlpiPadBank { base: 0x4A10_00C2, clk: 0x010C, stp: 0x0004, data: 0x010C },
    UlpiPadBank { base: 0x4A10_0160, clk: 0x010C, stp: 0x0002, data: 0x010A },
];

/// Serial pads of one port, in the same order as [`MM_SIGNALS`] except
/// that txdat is programmed before txse0.
const OMAP4_OHCI_PADS: [[(u32, u16); 6]; 2] = [
    [
        (0x4A10_00C4, 0x001D),
        (0x4A10_00C8, 0x001D),
        (0x4A10_00CA, 0x001D),
        (0x4A10_00D0, 0x001D),
        (0x4A10_00CE, 0x001D),
        (0x4A10_00CC, 0x001D),
    ],
    [
        (0x4A10_00F8, 0x010C),
        (0x4A10_00F6, 0x010C),
        (0x4A10_00FA, 0x010C),
        (0x4A10_00FC, 0x080C),
        (0x4A10_0112, 0x000C),
        (0x4A10_0110, 0x000C),
    ],
];

fn omap4_ehci_pads(mux: &dyn PinMux, port_mode: &[PortMode; OMAP3_HS_USB_PORTS]) {
    for (port, bank) in OMAP4_EHCI_PHY_PADS.iter().enumerate() {
        match port_mode[port] {
            PortMode::EhciPhy => {
                mux.write_pad(bank.base, bank.clk);
                mux.write_pad(bank.base + 2, bank.stp);
                for pad in 0..10 {
                    mux.write_pad(bank.base + 4 + 2 * pad, bank.data);
                }
            }
            PortMode::EhciTll => log::debug!("usbhs: port {} TLL pads left as configured", port + 1),
            _ => {}
        }
    }
}

fn omap4_ohci_pads(mux: &dyn PinMux, port_mode: &[PortMode; OMAP3_HS_USB_PORTS]) {
    for (port, pads) in OMAP4_OHCI_PADS.iter().enumerate() {
        let Some(first) = first_serial_signal(port_mode[port]) else {
            continue;
        };
        for &(addr, value) in &pads[first..] {
            mux.write_pad(addr, value);
        }
    }
}

/// Route the pads of every used host port for the running SoC.
pub fn setup_io_mux(mux: &dyn PinMux, soc: SocInfo, port_mode: &[PortMode; OMAP3_HS_USB_PORTS]) {
    if soc.is_omap4() {
        omap4_ehci_pads(mux, port_mode);
        omap4_ohci_pads(mux, port_mode);
    } else {
        omap3_ehci_signals(mux, port_mode);
        omap3_ohci_signals(mux, port_mode);
    }
}
