//! USB subsystem for OMAP boards
//!
//! Provides the shared host-controller plumbing the EHCI and OHCI drivers
//! sit on:
//! - UHH/TLL power sequencing and port routing (`uhhtll`)
//! - Board pad multiplexing for the host ports (`uhhtll::mux`)

pub mod uhhtll;

use crate::error::HwResult;
use crate::mmio::IoMapper;
use crate::platform::{PinMux, PlatformDevice};

use uhhtll::{UhhTll, UsbhsPlatformData};

/// Board-level USB host bring-up: route the pads of every used port, then
/// probe the UHH/TLL device.
pub fn usb_uhhtll_init<M: IoMapper>(
    host: &UhhTll<'_, M>,
    mux: &dyn PinMux,
    pdev: &PlatformDevice<'_>,
    pdata: UsbhsPlatformData,
) -> HwResult<()> {
    uhhtll::mux::setup_io_mux(mux, host.soc(), &pdata.port_mode);

    match host.probe(Some(pdev), pdata) {
        Ok(()) => {
            log::info!("usbhs: {} registered", pdev.name);
            Ok(())
        }
        Err(e) => {
            log::error!("usbhs: unable to register {}: {}", pdev.name, e);
            Err(e)
        }
    }
}
