//! The host SDIO capability: the only boundary the core depends on (spec
//! §4.1, §6). Implemented by the embedding application, either over
//! bit-banged GPIO or a memory-mapped SDIO host controller; the core is
//! indifferent to which.

use crate::error::Result;

/// An SDIO function number. Function 0 is CCCR, function 1 is the chip
/// backplane, function 2 is the WLAN data path (spec GLOSSARY).
pub type Function = u8;

pub const FUNC_BUS: Function = 0;
pub const FUNC_BACKPLANE: Function = 1;
pub const FUNC_WLAN: Function = 2;

/// Capability the core requires of the host SDIO controller.
///
/// Bulk operations may be executed as byte-mode or block-mode transfers at
/// the implementation's discretion; the core only ever passes a logical
/// byte length. The implementation owns CRC7/CRC16 and SDIO response
/// parsing, and must collapse any wire-level error into `Err(Error::IoError)`
/// (or map it via its own error type, see `HostBus::Error`).
pub trait HostBus {
    /// Single-byte read at a 17-bit function-local address.
    fn read_byte(&mut self, function: Function, addr: u32) -> Result<u8>;

    /// Single-byte write at a 17-bit function-local address.
    fn write_byte(&mut self, function: Function, addr: u32, val: u8) -> Result<()>;

    /// Multi-byte read. `address_incrementing` selects whether successive
    /// bytes are read from successive addresses (true) or the same address
    /// repeatedly (false, used for FIFO-style function-2 reads).
    fn read_bulk(
        &mut self,
        function: Function,
        addr: u32,
        buffer: &mut [u8],
        address_incrementing: bool,
    ) -> Result<()>;

    /// Multi-byte write; same addressing semantics as `read_bulk`.
    fn write_bulk(
        &mut self,
        function: Function,
        addr: u32,
        buffer: &[u8],
        address_incrementing: bool,
    ) -> Result<()>;

    /// Configure the SDIO block size used for a function's bulk transfers.
    fn set_block_size(&mut self, function: Function, block_size: u16) -> Result<()>;

    /// Enable or disable a function via the CCCR IO_ENABLE register.
    fn enable_function(&mut self, function: Function, enable: bool) -> Result<()>;

    /// Enable or disable card-level interrupt generation.
    fn enable_irq(&mut self, enable: bool) -> Result<()>;

    /// Non-blocking poll of whether an interrupt is currently pending.
    fn irq_pending(&mut self) -> bool;

    /// Busy-wait for at least `us` microseconds.
    fn delay_us(&mut self, us: u32);

    /// Busy-wait for at least `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

/// Runs `poll_until` iterations of `step_ms` each until `predicate` returns
/// `Some(value)` or the iteration budget is exhausted, in which case
/// `Error::Timeout` is returned. Used by every bounded polling loop in the
/// core (spec §9 design note).
pub(crate) fn poll_until<B, F, T>(
    bus: &mut B,
    budget_ms: u32,
    step_ms: u32,
    mut predicate: F,
) -> Result<T>
where
    B: HostBus,
    F: FnMut(&mut B) -> Result<Option<T>>,
{
    let step_ms = step_ms.max(1);
    let mut elapsed = 0u32;
    loop {
        if let Some(value) = predicate(bus)? {
            return Ok(value);
        }
        if elapsed >= budget_ms {
            return Err(crate::error::Error::Timeout);
        }
        bus.delay_ms(step_ms);
        elapsed += step_ms;
    }
}
