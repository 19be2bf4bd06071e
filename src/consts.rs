//! Chip-facing register addresses, bit flags, and protocol constants.
//!
//! Grounded in `baremetal/cyw55500_regs.h` and spec §6. Only the subset the
//! core actually touches is carried; the source header has a much larger
//! register map (BCMA core IDs, D11 MAC, GPIO, PMU internals, ...) that this
//! crate has no use for.

#![allow(dead_code)]

// ---- Chip identification -------------------------------------------------

pub const CYW55500_CHIP_ID: u16 = 0xD8CC;
pub const CHIP_ID_MASK: u32 = 0x0000_FFFF;
pub const CHIP_REV_MASK: u32 = 0x000F_0000;
pub const CHIP_REV_SHIFT: u32 = 16;

pub const CHIPCOMMON_BASE: u32 = 0x1800_0000;

// ---- SDIO function numbers & CCCR (function 0) --------------------------

pub const CCCR_IO_ENABLE: u32 = 0x02;
pub const CCCR_IO_READY: u32 = 0x03;
pub const CCCR_INT_ENABLE: u32 = 0x04;
pub const CCCR_BUS_IF_CTRL: u32 = 0x07;

pub const SDIO_FUNC_READY_1: u8 = 0x02;
pub const SDIO_FUNC_READY_2: u8 = 0x04;

pub const CCCR_IEN_FUNC0: u8 = 1 << 0;
pub const CCCR_IEN_FUNC1: u8 = 1 << 1;
pub const CCCR_IEN_FUNC2: u8 = 1 << 2;

// ---- Function-1 misc block (backplane window + clock) -------------------

pub const SBSDIO_WATERMARK: u32 = 0x1_0008;
pub const SBSDIO_FUNC1_SBADDRLOW: u32 = 0x1_000A;
pub const SBSDIO_FUNC1_SBADDRMID: u32 = 0x1_000B;
pub const SBSDIO_FUNC1_SBADDRHIGH: u32 = 0x1_000C;
pub const SBSDIO_FUNC1_CHIPCLKCSR: u32 = 0x1_000E;

pub const SBSDIO_ALP_AVAIL_REQ: u8 = 0x08;
pub const SBSDIO_HT_AVAIL_REQ: u8 = 0x10;
pub const SBSDIO_ALP_AVAIL: u8 = 0x40;
pub const SBSDIO_HT_AVAIL: u8 = 0x80;

/// Default SDIO block sizes for function 1 / function 2.
pub const SDIO_F1_BLOCK_SIZE: u16 = 64;
pub const SDIO_F2_BLOCK_SIZE: u16 = 512;
pub const CYW55500_F2_WATERMARK: u8 = 0x40;

// ---- Backplane window -----------------------------------------------------

pub const SBSDIO_SB_OFT_ADDR_MASK: u32 = 0x07FFF;
pub const SBSDIO_SB_OFT_ADDR_LIMIT: u32 = 0x08000;
pub const SBSDIO_SB_ACCESS_2_4B_FLAG: u32 = 0x08000;
pub const SBSDIO_SBWINDOW_MASK: u32 = 0xFFFF_8000;

// ---- Host mailbox ---------------------------------------------------------

/// Relative to the SDIO core's enumerated base (spec §9 Open Question:
/// the source has two divergent hardcodes for this register, `0x18002048`
/// and an SDIO-core-local offset; this crate resolves it by deriving the
/// address from the enumerated SDIO core base rather than hardcoding the
/// ChipCommon-relative address, see DESIGN.md).
pub const SDIO_CORE_TOHOSTMAILBOXDATA_OFFSET: u32 = 0x04C;

pub const HMB_DATA_FWREADY: u32 = 0x0008;

// ---- AI (backplane core wrapper) register offsets ------------------------
// Used to halt/reset a core (ARM, SOCSRAM) before/after firmware load.

pub const AI_IOCTRL_OFFSET: u32 = 0x408;
pub const AI_RESETCTRL_OFFSET: u32 = 0x800;

pub const AI_IOCTRL_BIT_FGC: u8 = 0x02;
pub const AI_IOCTRL_BIT_CLOCK_EN: u8 = 0x01;
pub const AI_RESETCTRL_BIT_RESET: u8 = 0x01;

// ---- Chip RAM layout --------------------------------------------------

/// A-variant RAM base (see spec §3 "Chip identity": the 4-bit revision
/// selects one of two RAM base constants).
pub const RAM_BASE_REV_A: u32 = 0x3A_0000;
/// B-variant RAM base.
pub const RAM_BASE_REV_B: u32 = 0x3C_0000;

// ---- SDPCM ----------------------------------------------------------------

pub const SDPCM_HEADER_SIZE: usize = 12;

pub const CHANNEL_TYPE_CONTROL: u8 = 0;
pub const CHANNEL_TYPE_EVENT: u8 = 1;
pub const CHANNEL_TYPE_DATA: u8 = 2;
pub const CHANNEL_TYPE_GLOM: u8 = 3;

// ---- BCDC -------------------------------------------------------------

pub const BCDC_HEADER_SIZE: usize = 16;
pub const BCDC_PROTO_VERSION: u32 = 2;
pub const BCDC_FLAG_VER_SHIFT: u32 = 4;
pub const BCDC_FLAG_SET: u32 = 0x02;
pub const BCDC_FLAG_REQID_SHIFT: u32 = 16;

// ---- WLAN ioctls (subset the core issues) --------------------------------

pub const WLC_GET_VERSION: u32 = 1;
pub const WLC_UP: u32 = 2;
pub const WLC_DOWN: u32 = 3;
pub const WLC_GET_SSID: u32 = 25;
pub const WLC_SET_SSID: u32 = 26;
pub const WLC_GET_INFRA: u32 = 19;
pub const WLC_SET_INFRA: u32 = 20;
pub const WLC_GET_AUTH: u32 = 21;
pub const WLC_SET_AUTH: u32 = 22;
pub const WLC_GET_BSSID: u32 = 23;
pub const WLC_DISASSOC: u32 = 52;
pub const WLC_GET_RSSI: u32 = 127;
pub const WLC_GET_WSEC: u32 = 133;
pub const WLC_SET_WSEC: u32 = 134;
pub const WLC_SET_WSEC_PMK: u32 = 268;
pub const WLC_GET_VAR: u32 = 262;
pub const WLC_SET_VAR: u32 = 263;

// ---- Security / auth values used by `connect` ----------------------------

pub const WPA_AUTH_DISABLED: u32 = 0x0000;
pub const WPA2_AUTH_PSK: u32 = 0x0080;
pub const WSEC_NONE: u32 = 0;
pub const WSEC_AES: u32 = 4;

// ---- Polling budgets (ms) --------------------------------------------------
// spec §4.4/§4.5: ALP 100ms, HT 500ms (2s during firmware start), mailbox 1s,
// BCDC transaction 100ms, scan 10s, connect 10s.

pub const BUDGET_ALP_MS: u32 = 100;
pub const BUDGET_HT_MS: u32 = 2_000;
pub const BUDGET_MAILBOX_MS: u32 = 1_000;
pub const BUDGET_BCDC_MS: u32 = 100;
pub const BUDGET_CREDIT_MS: u32 = 100;
pub const BUDGET_SCAN_MS: u32 = 10_000;
pub const BUDGET_CONNECT_MS: u32 = 10_000;
pub const BUDGET_FUNC_READY_MS: u32 = 100;

pub const POLL_STEP_MS: u32 = 1;
pub const POLL_STEP_SLOW_MS: u32 = 10;
