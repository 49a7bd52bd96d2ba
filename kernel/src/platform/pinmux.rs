//! Pad multiplexing interface.

/// Electrical configuration of a muxed pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadMode {
    Output,
    InputPulldown,
    InputPullup,
}

pub trait PinMux {
    /// Route the named signal to its pad with the given configuration.
    fn init_signal(&self, signal: &'static str, mode: PadMode);

    /// Raw 16-bit write to a pad configuration register.
    fn write_pad(&self, addr: u32, value: u16);
}
