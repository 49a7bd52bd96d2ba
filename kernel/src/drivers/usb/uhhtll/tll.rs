//! TLL (transceiver-less link) programming.
//!
//! The TLL sits between the host controllers and the port pads. EHCI ports
//! in TLL mode need their channel switched to UTMI operation; OHCI ports
//! always go through the TLL and need the matching FS/LS serial mode.

use crate::error::HwResult;
use crate::mmio::RegisterIo;
use crate::time::{poll_until, TimeSource};

use super::port::PortMode;
use super::regs::{
    self, offset, TllSharedConf, TllSysconfig, TllSysstatus, TLL_CHANNEL_CONF, TLL_SHARED_CONF,
    TLL_SYSCONFIG, TLL_SYSSTATUS,
};

/// Reset timeout while powering up the shared blocks.
pub const SHARED_RESET_TIMEOUT_MS: u32 = 100;

/// Reset timeout while bringing up TLL ports in a controller resume.
pub const PORT_RESET_TIMEOUT_MS: u32 = 1000;

/// Whether the TLL reports its last soft reset as complete.
#[inline]
pub fn reset_done<R: RegisterIo>(tll: &R) -> bool {
    TllSysstatus::new(tll.read32(offset::TLL_SYSSTATUS)).is_set(TLL_SYSSTATUS::RESETDONE)
}

/// Issue a TLL soft reset without waiting for it.
pub fn request_soft_reset<R: RegisterIo>(tll: &R) {
    let mut sys = TllSysconfig::new(0);
    sys.modify(TLL_SYSCONFIG::SOFTRESET::SET);
    tll.write32(offset::TLL_SYSCONFIG, sys.get());
}

/// Soft reset the TLL and wait up to `timeout_ms` for RESETDONE.
pub fn soft_reset<R, T>(tll: &R, time: &T, timeout_ms: u32) -> HwResult<()>
where
    R: RegisterIo,
    T: TimeSource + ?Sized,
{
    request_soft_reset(tll);
    poll_until(time, timeout_ms, || reset_done(tll))?;
    log::debug!("usbhs: TLL reset done");
    Ok(())
}

/// Post-reset configuration: wakeup enabled, never idle, interface clock
/// kept running.
pub fn configure_no_idle<R: RegisterIo>(tll: &R) {
    let mut sys = TllSysconfig::new(0);
    sys.modify(
        TLL_SYSCONFIG::ENAWAKEUP::SET + TLL_SYSCONFIG::SIDLEMODE::NoIdle + TLL_SYSCONFIG::CACTIVITY::SET,
    );
    tll.write32(offset::TLL_SYSCONFIG, sys.get());
}

/// Switch the channels in `channel_mask` (bit `n` for channel `n`) to UTMI
/// operation.
///
/// All `channel_count` channels lose auto-idle, bit stuffing and DDR mode;
/// only the masked ones are enabled and get the scratch-register check.
pub fn utmi_init<R: RegisterIo>(tll: &R, channel_mask: u8, channel_count: usize) {
    for channel in 0..channel_count {
        let mut conf = regs::read_channel_conf(tll, channel);
        conf.modify(
            TLL_CHANNEL_CONF::UTMIAUTOIDLE::CLEAR
                + TLL_CHANNEL_CONF::ULPINOBITSTUFF::CLEAR
                + TLL_CHANNEL_CONF::ULPIDDRMODE::CLEAR,
        );
        regs::write_channel_conf(tll, channel, conf);
    }

    let mut shared = TllSharedConf::new(tll.read32(offset::TLL_SHARED_CONF));
    shared.modify(
        TLL_SHARED_CONF::FCLK_IS_ON::SET
            + TLL_SHARED_CONF::USB_DIVRATION::SET
            + TLL_SHARED_CONF::USB_180D_SDR_EN::SET
            + TLL_SHARED_CONF::USB_90D_DDR_EN::CLEAR,
    );
    tll.write32(offset::TLL_SHARED_CONF, shared.get());

    for channel in (0..channel_count).filter(|c| channel_mask & (1 << c) != 0) {
        let mut conf = regs::read_channel_conf(tll, channel);
        conf.modify(TLL_CHANNEL_CONF::CHANEN::SET);
        regs::write_channel_conf(tll, channel, conf);

        tll.write8(offset::ulpi_scratch(channel), regs::ULPI_SCRATCH_PATTERN);
        log::debug!(
            "usbhs: ULPI_SCRATCH_REG[ch={}] = {:#04x}",
            channel + 1,
            tll.read8(offset::ulpi_scratch(channel))
        );
    }
}

/// Put the TLL channels of the OHCI ports into FS/LS serial mode.
///
/// Channels of EHCI ports keep their UTMI setup.
pub fn fsls_config<R: RegisterIo>(tll: &R, port_mode: &[PortMode], channel_count: usize) {
    let mut shared = TllSharedConf::new(tll.read32(offset::TLL_SHARED_CONF));
    shared.modify(
        TLL_SHARED_CONF::USB_90D_DDR_EN::CLEAR
            + TLL_SHARED_CONF::USB_180D_SDR_EN::CLEAR
            + TLL_SHARED_CONF::USB_DIVRATION::SET
            + TLL_SHARED_CONF::FCLK_IS_ON::SET,
    );
    tll.write32(offset::TLL_SHARED_CONF, shared.get());

    for (channel, mode) in port_mode.iter().enumerate().take(channel_count) {
        if !mode.is_ohci() {
            continue;
        }
        let mut conf = regs::read_channel_conf(tll, channel);
        conf.modify(
            TLL_CHANNEL_CONF::FSLSMODE.val(mode.fslsmode())
                + TLL_CHANNEL_CONF::CHANMODE::FsLs
                + TLL_CHANNEL_CONF::CHANEN::SET,
        );
        regs::write_channel_conf(tll, channel, conf);
    }
}
