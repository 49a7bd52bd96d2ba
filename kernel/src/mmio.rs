//! Memory-mapped register windows
//!
//! Drivers address their registers by byte offset from the start of a
//! window. The window itself is anything implementing [`RegisterIo`]:
//! [`MmioRegion`] on hardware, a memory-backed fake in host tests.

use core::ptr::{read_volatile, write_volatile};

/// Offset-addressed register access.
pub trait RegisterIo {
    fn read32(&self, offset: usize) -> u32;
    fn write32(&self, offset: usize, value: u32);
    fn read8(&self, offset: usize) -> u8;
    fn write8(&self, offset: usize, value: u8);
}

impl<T: RegisterIo + ?Sized> RegisterIo for &T {
    #[inline]
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    #[inline]
    fn write32(&self, offset: usize, value: u32) {
        (**self).write32(offset, value)
    }

    #[inline]
    fn read8(&self, offset: usize) -> u8 {
        (**self).read8(offset)
    }

    #[inline]
    fn write8(&self, offset: usize, value: u8) {
        (**self).write8(offset, value)
    }
}

/// A mapped physical register window.
#[derive(Debug)]
pub struct MmioRegion {
    base: usize,
    len: usize,
}

impl MmioRegion {
    /// Wrap an already mapped window.
    ///
    /// # Safety
    ///
    /// `base..base + len` must be a device mapping that stays valid for the
    /// lifetime of the returned value, and nothing else may hand out
    /// overlapping `MmioRegion`s.
    pub const unsafe fn new(base: usize, len: usize) -> Self {
        Self { base, len }
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn addr(&self, offset: usize, width: usize) -> usize {
        debug_assert!(offset + width <= self.len, "MMIO access past window end");
        self.base + offset
    }
}

impl RegisterIo for MmioRegion {
    #[inline]
    fn read32(&self, offset: usize) -> u32 {
        unsafe { read_volatile(self.addr(offset, 4) as *const u32) }
    }

    #[inline]
    fn write32(&self, offset: usize, value: u32) {
        unsafe { write_volatile(self.addr(offset, 4) as *mut u32, value) }
    }

    #[inline]
    fn read8(&self, offset: usize) -> u8 {
        unsafe { read_volatile(self.addr(offset, 1) as *const u8) }
    }

    #[inline]
    fn write8(&self, offset: usize, value: u8) {
        unsafe { write_volatile(self.addr(offset, 1) as *mut u8, value) }
    }
}

/// A physical memory resource of a platform device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemResource {
    pub start: u64,
    pub size: usize,
}

impl MemResource {
    pub const fn new(start: u64, size: usize) -> Self {
        Self { start, size }
    }
}

/// Maps and unmaps physical register windows (`ioremap`/`iounmap`).
pub trait IoMapper: Sync {
    type Region: RegisterIo;

    /// Map `res`, or `None` when no virtual space is available.
    fn ioremap(&self, res: &MemResource) -> Option<Self::Region>;

    fn iounmap(&self, region: Self::Region);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mmio_region_reads_and_writes_memory() {
        let mut backing = [0u32; 4];
        let region = unsafe { MmioRegion::new(backing.as_mut_ptr() as usize, 16) };

        region.write32(0x8, 0xDEAD_BEEF);
        assert_eq!(region.read32(0x8), 0xDEAD_BEEF);

        region.write8(0x0, 0xBE);
        assert_eq!(region.read8(0x0), 0xBE);
        assert_eq!(region.len(), 16);
        assert!(!region.is_empty());

        drop(region);
        assert_eq!(backing[2], 0xDEAD_BEEF);
        assert_eq!(backing[0] & 0xFF, 0xBE);
    }

    #[test]
    fn reference_forwards_to_region() {
        let mut backing = [0u32; 2];
        let region = unsafe { MmioRegion::new(backing.as_mut_ptr() as usize, 8) };
        fn poke<R: RegisterIo>(io: R) {
            io.write32(4, 7);
        }
        poke(&region);
        assert_eq!(region.read32(4), 7);
    }
}
