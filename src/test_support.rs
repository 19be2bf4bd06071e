//! In-memory `HostBus` fake used by unit tests across the crate. Not a
//! mocking framework — a hand-rolled fake shaped like the sibling
//! SDIO/SPI drivers in the reference pack test against, backed by plain
//! `std` collections (this module only compiles under `#[cfg(test)]`,
//! where the `no_std` attribute on the crate is lifted).

use std::collections::{HashMap, VecDeque};

use crate::bus::{Function, HostBus};
use crate::consts::{SBSDIO_FUNC1_SBADDRHIGH, SBSDIO_FUNC1_SBADDRLOW, SBSDIO_FUNC1_SBADDRMID};
use crate::error::{Error, Result};

pub struct FakeBus {
    /// Generic function-local byte registers, keyed by (function, addr).
    pub regs: HashMap<(Function, u32), u8>,
    /// Backplane linear memory (function-1 windowed access lands here).
    pub mem: HashMap<u32, u8>,
    window: [u8; 3],

    pub f1_byte_writes: usize,
    pub f1_bulk_calls: Vec<(u32, usize)>,

    pub fail_next_byte_write: bool,
    pub fail_next_bulk: bool,

    /// Queue of SDPCM frames waiting to be "received" on function 2.
    pub f2_rx_frames: VecDeque<Vec<u8>>,
    /// Each function-2 bulk write, recorded as one frame.
    pub f2_tx_frames: Vec<Vec<u8>>,

    pub irq_pending: bool,
    pub delay_calls: usize,
}

impl FakeBus {
    pub fn new() -> Self {
        let _ = env_logger::try_init();
        Self {
            regs: HashMap::new(),
            mem: HashMap::new(),
            window: [0; 3],
            f1_byte_writes: 0,
            f1_bulk_calls: Vec::new(),
            fail_next_byte_write: false,
            fail_next_bulk: false,
            f2_rx_frames: VecDeque::new(),
            f2_tx_frames: Vec::new(),
            irq_pending: false,
            delay_calls: 0,
        }
    }

    fn window_addr(&self) -> u32 {
        (self.window[0] as u32) << 8 | (self.window[1] as u32) << 16 | (self.window[2] as u32) << 24
    }

    /// Directly set a backplane (chip-address-space) memory region, bypassing
    /// the windowing dance, for test setup.
    pub fn poke_bp(&mut self, addr: u32, data: &[u8]) {
        for (i, b) in data.iter().enumerate() {
            self.mem.insert(addr + i as u32, *b);
        }
    }

    pub fn poke_reg(&mut self, function: Function, addr: u32, val: u8) {
        self.regs.insert((function, addr), val);
    }

    /// Queue a complete SDPCM frame (header + payload bytes) to be returned
    /// by the next `recv` on function 2.
    pub fn push_rx_frame(&mut self, frame: Vec<u8>) {
        self.f2_rx_frames.push_back(frame);
    }
}

impl Default for FakeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBus for FakeBus {
    fn read_byte(&mut self, function: Function, addr: u32) -> Result<u8> {
        if function == 1 && addr == SBSDIO_FUNC1_SBADDRLOW {
            return Ok(self.window[0]);
        }
        if function == 1 && addr == SBSDIO_FUNC1_SBADDRMID {
            return Ok(self.window[1]);
        }
        if function == 1 && addr == SBSDIO_FUNC1_SBADDRHIGH {
            return Ok(self.window[2]);
        }
        Ok(*self.regs.get(&(function, addr)).unwrap_or(&0))
    }

    fn write_byte(&mut self, function: Function, addr: u32, val: u8) -> Result<()> {
        if self.fail_next_byte_write {
            self.fail_next_byte_write = false;
            return Err(Error::IoError);
        }
        if function == 1 && addr == SBSDIO_FUNC1_SBADDRLOW {
            self.window[0] = val;
            self.f1_byte_writes += 1;
            return Ok(());
        }
        if function == 1 && addr == SBSDIO_FUNC1_SBADDRMID {
            self.window[1] = val;
            self.f1_byte_writes += 1;
            return Ok(());
        }
        if function == 1 && addr == SBSDIO_FUNC1_SBADDRHIGH {
            self.window[2] = val;
            self.f1_byte_writes += 1;
            return Ok(());
        }
        if function == 1 && addr == SBSDIO_FUNC1_CHIPCLKCSR {
            // Real hardware sets the AVAIL bits independently of the host's
            // REQ write; merge rather than clobber so a test can pre-poke
            // "already available" before the driver issues its own request.
            let prev = *self.regs.get(&(function, addr)).unwrap_or(&0);
            self.regs.insert((function, addr), prev | val);
            return Ok(());
        }
        self.regs.insert((function, addr), val);
        Ok(())
    }

    fn read_bulk(&mut self, function: Function, addr: u32, buffer: &mut [u8], _incr: bool) -> Result<()> {
        if self.fail_next_bulk {
            self.fail_next_bulk = false;
            return Err(Error::IoError);
        }
        match function {
            1 => {
                self.f1_bulk_calls.push((addr, buffer.len()));
                let offset = addr & 0x7FFF;
                let base = self.window_addr() | offset;
                for (i, b) in buffer.iter_mut().enumerate() {
                    *b = *self.mem.get(&(base + i as u32)).unwrap_or(&0);
                }
                Ok(())
            }
            2 => {
                if let Some(frame) = self.f2_rx_frames.front() {
                    let n = buffer.len().min(frame.len());
                    buffer[..n].copy_from_slice(&frame[..n]);
                    if buffer.len() >= frame.len() {
                        self.f2_rx_frames.pop_front();
                    }
                } else {
                    buffer.fill(0);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn write_bulk(&mut self, function: Function, addr: u32, buffer: &[u8], _incr: bool) -> Result<()> {
        if self.fail_next_bulk {
            self.fail_next_bulk = false;
            return Err(Error::IoError);
        }
        match function {
            1 => {
                self.f1_bulk_calls.push((addr, buffer.len()));
                let offset = addr & 0x7FFF;
                let base = self.window_addr() | offset;
                for (i, b) in buffer.iter().enumerate() {
                    self.mem.insert(base + i as u32, *b);
                }
                Ok(())
            }
            2 => {
                self.f2_tx_frames.push(buffer.to_vec());
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn set_block_size(&mut self, _function: Function, _block_size: u16) -> Result<()> {
        Ok(())
    }

    fn enable_function(&mut self, _function: Function, _enable: bool) -> Result<()> {
        Ok(())
    }

    fn enable_irq(&mut self, _enable: bool) -> Result<()> {
        Ok(())
    }

    fn irq_pending(&mut self) -> bool {
        self.irq_pending
    }

    fn delay_us(&mut self, _us: u32) {
        self.delay_calls += 1;
    }

    fn delay_ms(&mut self, _ms: u32) {
        self.delay_calls += 1;
    }
}
