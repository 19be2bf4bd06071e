//! Clock request/chip detection (spec §4.4) and firmware/NVRAM download
//! (spec §4.5).

use crate::backplane::{self, Backplane};
use crate::bus::{poll_until, HostBus, FUNC_BACKPLANE};
use crate::consts::*;
use crate::error::{Error, Result};
use crate::fmt::{debug, info, warn};

/// Populated chip identity (spec §3 "Chip identity"). Immutable for the
/// life of the driver context once `detect` has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChipIdentity {
    pub chip_id: u16,
    pub chip_rev: u8,
    pub ram_base: u32,
}

/// Request the ALP clock and poll up to 100 ms for it to become available
/// (spec §4.4 steps 1-2).
pub(crate) fn request_alp_clock<B: HostBus>(bus: &mut B) -> Result<()> {
    bus.write_byte(FUNC_BACKPLANE, SBSDIO_FUNC1_CHIPCLKCSR, SBSDIO_ALP_AVAIL_REQ)?;
    poll_until(bus, BUDGET_ALP_MS, POLL_STEP_MS, |bus| {
        let val = bus.read_byte(FUNC_BACKPLANE, SBSDIO_FUNC1_CHIPCLKCSR)?;
        Ok((val & SBSDIO_ALP_AVAIL != 0).then_some(()))
    })?;
    debug!("ALP clock ready");
    Ok(())
}

/// Request the HT clock and poll up to `budget_ms` for it to become
/// available — the same request-then-poll shape as `request_alp_clock`,
/// writing `SBSDIO_HT_AVAIL_REQ` before waiting on `SBSDIO_HT_AVAIL`.
fn wait_ht_clock<B: HostBus>(bus: &mut B, budget_ms: u32) -> Result<()> {
    bus.write_byte(FUNC_BACKPLANE, SBSDIO_FUNC1_CHIPCLKCSR, SBSDIO_HT_AVAIL_REQ)?;
    poll_until(bus, budget_ms, POLL_STEP_SLOW_MS, |bus| {
        let val = bus.read_byte(FUNC_BACKPLANE, SBSDIO_FUNC1_CHIPCLKCSR)?;
        Ok((val & SBSDIO_HT_AVAIL != 0).then_some(()))
    })
}

/// Read and validate the chip-id word at the ChipCommon base, then select
/// the RAM base by revision (spec §4.4 steps 3-5).
pub(crate) fn detect<B: HostBus>(bus: &mut B, bp: &mut Backplane) -> Result<ChipIdentity> {
    let val = bp.read_u32(bus, CHIPCOMMON_BASE)?;
    let chip_id = (val & CHIP_ID_MASK) as u16;
    let chip_rev = ((val & CHIP_REV_MASK) >> CHIP_REV_SHIFT) as u8;

    if chip_id != CYW55500_CHIP_ID {
        warn!("unexpected chip id {:04x}", chip_id);
        return Err(Error::FwLoadFailed);
    }

    let ram_base = if chip_rev == 0 { RAM_BASE_REV_A } else { RAM_BASE_REV_B };

    info!("chip id={:04x} rev={} ram_base={:08x}", chip_id, chip_rev, ram_base);
    Ok(ChipIdentity { chip_id, chip_rev, ram_base })
}

/// Total chip RAM available for firmware + NVRAM (fixed per the CYW55500
/// family; spec §3 "ram_size").
pub const CHIP_RAM_SIZE: u32 = 0x6_0000;

/// ARM core and SOCSRAM core backplane base addresses (spec §4.5 step 1).
/// Two divergent bring-up strategies exist for this chip family: one halts
/// and releases both cores explicitly around the download, one leans on
/// the bootloader to do it implicitly. This driver always performs the
/// explicit halt/release dance, since a bootloader shortcut isn't
/// something a host-side driver can safely assume.
const ARM_CORE_BASE: u32 = 0x1800_0000 + 0x3E * 0x1000;
const SOCSRAM_CORE_BASE: u32 = 0x1800_0000 + 0x49 * 0x1000;

/// Download firmware and (optional) NVRAM into chip RAM, release the CPU,
/// and wait for the firmware-ready mailbox bit (spec §4.5 entire
/// sequence). Any failure here is the caller's cue to transition the
/// driver to `State::Error` (spec §7 promotion policy).
pub(crate) fn load_firmware<B: HostBus>(
    bus: &mut B,
    bp: &mut Backplane,
    chip: &ChipIdentity,
    firmware: &[u8],
    nvram: &[u8],
) -> Result<()> {
    if firmware.is_empty() {
        warn!("empty firmware image rejected");
        return Err(Error::FwLoadFailed);
    }

    backplane::core_disable(bus, bp, SOCSRAM_CORE_BASE)?;
    backplane::core_reset(bus, bp, SOCSRAM_CORE_BASE)?;

    backplane::core_disable(bus, bp, ARM_CORE_BASE).map_err(|_| Error::FwLoadFailed)?;

    info!("loading firmware ({} bytes)", firmware.len());
    bp.write_bulk(bus, chip.ram_base, firmware).map_err(|_| Error::FwLoadFailed)?;

    if !nvram.is_empty() {
        let nvram_len = (nvram.len() + 3) / 4 * 4;
        let nvram_addr = chip.ram_base + CHIP_RAM_SIZE - 4 - nvram_len as u32;

        info!("loading nvram ({} bytes)", nvram.len());
        bp.write_bulk(bus, nvram_addr, nvram).map_err(|_| Error::FwLoadFailed)?;

        let words = (nvram_len / 4) as u32;
        let footer = (!words << 16) | words;
        bp.write_u32(bus, nvram_addr + nvram_len as u32, footer)
            .map_err(|_| Error::FwLoadFailed)?;
    }

    backplane::core_reset(bus, bp, ARM_CORE_BASE).map_err(|_| Error::FwLoadFailed)?;
    if !backplane::core_is_up(bus, bp, ARM_CORE_BASE).unwrap_or(false) {
        warn!("ARM core did not come up after release");
        return Err(Error::FwLoadFailed);
    }

    wait_ht_clock(bus, BUDGET_HT_MS).map_err(|_| Error::FwLoadFailed)?;

    let mailbox_addr = sdio_core_mailbox_addr();
    poll_until(bus, BUDGET_MAILBOX_MS, POLL_STEP_SLOW_MS, |bus| {
        let mbox = bp.read_u32(bus, mailbox_addr)?;
        Ok((mbox & HMB_DATA_FWREADY != 0).then_some(()))
    })
    .map_err(|_| Error::FwLoadFailed)?;

    info!("firmware ready");
    Ok(())
}

/// SDIO core base (spec §9 Open Question: derive the mailbox address
/// relative to the enumerated SDIO core rather than hardcoding
/// ChipCommon-relative `0x18002048`, per the resolved Open Question in
/// DESIGN.md).
const SDIO_CORE_BASE: u32 = 0x1800_0000 + 0x29 * 0x1000;

fn sdio_core_mailbox_addr() -> u32 {
    SDIO_CORE_BASE + SDIO_CORE_TOHOSTMAILBOXDATA_OFFSET
}
