//! Backplane window manager (spec §4.2) and chip register facade (spec
//! §4.3). Translates the chip's 32-bit internal address space into
//! `(function 1, offset)` pairs, caching the window register so repeated
//! accesses within one 32 KiB page cost no extra SDIO transactions.

use crate::bus::{HostBus, FUNC_BACKPLANE};
use crate::consts::*;
use crate::error::{Error, Result};
use crate::fmt::trace;

/// Owns the cached backplane window and mediates all function-1 accesses.
///
/// Invariant (spec §3): `window_valid` implies the chip's three SBADDR
/// byte registers hold `window`. Any I/O failure clears `window_valid` so
/// the next access reprograms the window defensively (spec §4.2 Errors).
pub struct Backplane {
    window: u32,
    window_valid: bool,
}

impl Backplane {
    pub const fn new() -> Self {
        Self {
            window: 0,
            window_valid: false,
        }
    }

    /// Program the window register for `addr` if it isn't already cached.
    fn set_window<B: HostBus>(&mut self, bus: &mut B, addr: u32) -> Result<()> {
        let window = addr & SBSDIO_SBWINDOW_MASK;
        if self.window_valid && self.window == window {
            return Ok(());
        }

        let result = (|| -> Result<()> {
            bus.write_byte(
                FUNC_BACKPLANE,
                SBSDIO_FUNC1_SBADDRLOW,
                ((window >> 8) & 0xFF) as u8,
            )?;
            bus.write_byte(
                FUNC_BACKPLANE,
                SBSDIO_FUNC1_SBADDRMID,
                ((window >> 16) & 0xFF) as u8,
            )?;
            bus.write_byte(
                FUNC_BACKPLANE,
                SBSDIO_FUNC1_SBADDRHIGH,
                ((window >> 24) & 0xFF) as u8,
            )
        })();

        match result {
            Ok(()) => {
                self.window = window;
                self.window_valid = true;
                Ok(())
            }
            Err(e) => {
                self.window_valid = false;
                Err(e)
            }
        }
    }

    /// Read `data.len()` bytes starting at backplane address `addr`,
    /// chunking at 32 KiB window boundaries (spec §4.2 Chunking, §8
    /// scenario 2).
    pub fn read_bulk<B: HostBus>(&mut self, bus: &mut B, mut addr: u32, mut data: &mut [u8]) -> Result<()> {
        while !data.is_empty() {
            let window_offset = addr & SBSDIO_SB_OFT_ADDR_MASK;
            let chunk = data.len().min((SBSDIO_SB_OFT_ADDR_LIMIT - window_offset) as usize);

            self.set_window(bus, addr)?;
            let offset = window_offset | SBSDIO_SB_ACCESS_2_4B_FLAG;
            bus.read_bulk(FUNC_BACKPLANE, offset, &mut data[..chunk], true)?;

            addr += chunk as u32;
            data = &mut data[chunk..];
        }
        Ok(())
    }

    /// Write `data` starting at backplane address `addr`, chunking at
    /// 32 KiB window boundaries.
    pub fn write_bulk<B: HostBus>(&mut self, bus: &mut B, mut addr: u32, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let window_offset = addr & SBSDIO_SB_OFT_ADDR_MASK;
            let chunk = data.len().min((SBSDIO_SB_OFT_ADDR_LIMIT - window_offset) as usize);

            self.set_window(bus, addr)?;
            let offset = window_offset | SBSDIO_SB_ACCESS_2_4B_FLAG;
            bus.write_bulk(FUNC_BACKPLANE, offset, &data[..chunk], true)?;

            trace!("bp write {:08x} ({} bytes)", addr, chunk);

            addr += chunk as u32;
            data = &data[chunk..];
        }
        Ok(())
    }

    pub fn read_u32<B: HostBus>(&mut self, bus: &mut B, addr: u32) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_bulk(bus, addr, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn write_u32<B: HostBus>(&mut self, bus: &mut B, addr: u32, val: u32) -> Result<()> {
        self.write_bulk(bus, addr, &val.to_le_bytes())
    }

    pub fn read_u16<B: HostBus>(&mut self, bus: &mut B, addr: u32) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_bulk(bus, addr, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Direct byte read on an arbitrary function (not windowed; used for
    /// CCCR / function-1 misc-block registers, which sit below the 17-bit
    /// function-local address space and need no window).
    pub fn read_u8<B: HostBus>(bus: &mut B, function: u8, addr: u32) -> Result<u8> {
        bus.read_byte(function, addr)
    }

    pub fn write_u8<B: HostBus>(bus: &mut B, function: u8, addr: u32, val: u8) -> Result<()> {
        bus.write_byte(function, addr, val)
    }

    /// True if the cache currently holds a valid window (exposed for
    /// tests; not part of the public API).
    #[cfg(test)]
    pub(crate) fn window_cache(&self) -> Option<u32> {
        self.window_valid.then_some(self.window)
    }
}

impl Default for Backplane {
    fn default() -> Self {
        Self::new()
    }
}

/// Halts or releases a backplane AI-wrapped core (ARM, SOCSRAM) by
/// manipulating its `AI_IOCTRL`/`AI_RESETCTRL` registers (spec §4.5 step 1
/// and 4), structured as the disable/reset/is-up split used by sibling
/// WLAN-core bring-up code for the same register dance.
pub(crate) fn core_disable<B: HostBus>(bus: &mut B, bp: &mut Backplane, core_base: u32) -> Result<()> {
    let ioctrl = bp.read_bp_u8(bus, core_base + AI_IOCTRL_OFFSET)?;
    let resetctrl = bp.read_bp_u8(bus, core_base + AI_RESETCTRL_OFFSET)?;
    if resetctrl & AI_RESETCTRL_BIT_RESET != 0 {
        return Ok(());
    }
    let _ = ioctrl;

    bp.write_bp_u8(bus, core_base + AI_IOCTRL_OFFSET, 0)?;
    bus.delay_us(10);
    bp.write_bp_u8(bus, core_base + AI_RESETCTRL_OFFSET, AI_RESETCTRL_BIT_RESET)?;
    bus.delay_us(10);
    Ok(())
}

pub(crate) fn core_reset<B: HostBus>(bus: &mut B, bp: &mut Backplane, core_base: u32) -> Result<()> {
    core_disable(bus, bp, core_base)?;

    bp.write_bp_u8(
        bus,
        core_base + AI_IOCTRL_OFFSET,
        AI_IOCTRL_BIT_FGC | AI_IOCTRL_BIT_CLOCK_EN,
    )?;
    bus.delay_us(10);

    bp.write_bp_u8(bus, core_base + AI_RESETCTRL_OFFSET, 0)?;
    bus.delay_us(10);

    bp.write_bp_u8(bus, core_base + AI_IOCTRL_OFFSET, AI_IOCTRL_BIT_CLOCK_EN)?;
    bus.delay_us(10);

    Ok(())
}

pub(crate) fn core_is_up<B: HostBus>(bus: &mut B, bp: &mut Backplane, core_base: u32) -> Result<bool> {
    let ioctrl = bp.read_bp_u8(bus, core_base + AI_IOCTRL_OFFSET)?;
    if ioctrl & (AI_IOCTRL_BIT_FGC | AI_IOCTRL_BIT_CLOCK_EN) != AI_IOCTRL_BIT_CLOCK_EN {
        return Ok(false);
    }
    let resetctrl = bp.read_bp_u8(bus, core_base + AI_RESETCTRL_OFFSET)?;
    Ok(resetctrl & AI_RESETCTRL_BIT_RESET == 0)
}

impl Backplane {
    fn read_bp_u8<B: HostBus>(&mut self, bus: &mut B, addr: u32) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_bulk(bus, addr, &mut buf)?;
        Ok(buf[0])
    }

    fn write_bp_u8<B: HostBus>(&mut self, bus: &mut B, addr: u32, val: u8) -> Result<()> {
        self.write_bulk(bus, addr, &[val])
    }
}

/// Validates a function number is in the legal 0..=7 range (spec
/// `InvalidArgument`: "illegal function number").
pub(crate) fn check_function(function: u8) -> Result<()> {
    if function > 7 {
        Err(Error::InvalidArgument)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeBus;

    #[test]
    fn window_reprogrammed_only_on_crossing() {
        let mut bus = FakeBus::new();
        let mut bp = Backplane::new();

        // Two addresses in the same 32 KiB window: exactly one window program.
        let mut buf = [0u8; 4];
        bp.read_bulk(&mut bus, 0x1000, &mut buf).unwrap();
        let writes_after_first = bus.f1_byte_writes;
        bp.read_bulk(&mut bus, 0x1100, &mut buf).unwrap();
        assert_eq!(bus.f1_byte_writes, writes_after_first, "same window: no new SBADDR writes");

        // A different window: exactly 3 more byte writes (LOW/MID/HIGH).
        bp.read_bulk(&mut bus, 0x9000, &mut buf).unwrap();
        assert_eq!(bus.f1_byte_writes, writes_after_first + 3);
    }

    #[test]
    fn bulk_write_crossing_window_boundary_splits_in_two() {
        let mut bus = FakeBus::new();
        let mut bp = Backplane::new();

        let data = [0xAAu8; 32];
        bp.write_bulk(&mut bus, 0x3A_7FF0, &data).unwrap();

        assert_eq!(bus.f1_bulk_calls.len(), 2);
        assert_eq!(bus.f1_bulk_calls[0].1, 16);
        assert_eq!(bus.f1_bulk_calls[1].1, 16);
        // First chunk at offset 0x7FF0|0x8000, second at 0x0000|0x8000.
        assert_eq!(bus.f1_bulk_calls[0].0, 0x7FF0 | 0x8000);
        assert_eq!(bus.f1_bulk_calls[1].0, 0x0000 | 0x8000);
    }

    #[test]
    fn failed_write_invalidates_window_cache() {
        let mut bus = FakeBus::new();
        bus.fail_next_byte_write = true;
        let mut bp = Backplane::new();

        let data = [0u8; 4];
        assert!(bp.write_bulk(&mut bus, 0x1000, &data).is_err());
        assert_eq!(bp.window_cache(), None);
    }

    #[test]
    fn u32_round_trips() {
        let mut bus = FakeBus::new();
        let mut bp = Backplane::new();
        bp.write_u32(&mut bus, 0x1800_0000, 0xDEAD_BEEF).unwrap();
        assert_eq!(bp.read_u32(&mut bus, 0x1800_0000).unwrap(), 0xDEAD_BEEF);
    }
}
