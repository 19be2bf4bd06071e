//! SDPCM framer (spec §4.6): builds, sends, receives, and validates framed
//! packets on function 2, and tracks the TX/RX sequence and credit state.

use crate::bus::{poll_until, HostBus, FUNC_WLAN};
use crate::config::{RX_BUF_SIZE, TX_BUF_SIZE};
use crate::consts::{BUDGET_CREDIT_MS, POLL_STEP_MS, SDPCM_HEADER_SIZE};
use crate::error::{Error, Result};
use crate::fmt::{trace, warn};
use crate::structs::SdpcmHeader;

/// TX sequence, RX sequence, and flow-control state (spec §3 "SDPCM
/// state"), owned by the driver context.
#[derive(Debug, Default)]
pub struct SdpcmState {
    pub tx_seq: u8,
    pub rx_seq: u8,
    pub tx_max: u8,
    pub flow_ctrl: u8,
}

impl SdpcmState {
    pub const fn new() -> Self {
        Self {
            tx_seq: 0,
            rx_seq: 0,
            tx_max: 1,
            flow_ctrl: 0,
        }
    }

    /// Sendable while `tx_seq` has not caught up to the chip-granted
    /// credit, with modular-256 wraparound (spec §9 design note).
    pub fn has_credit(&self) -> bool {
        self.tx_seq != self.tx_max && self.tx_max.wrapping_sub(self.tx_seq) & 0x80 == 0
    }

    fn update_credit(&mut self, hdr: &SdpcmHeader) {
        let mut tx_max = hdr.max_seq;
        // Defend against a chip granting implausibly large credit jumps.
        if tx_max.wrapping_sub(self.tx_seq) > 0x40 {
            tx_max = self.tx_seq.wrapping_add(2);
        }
        self.tx_max = tx_max;
        self.flow_ctrl = hdr.flow_control;
    }
}

/// Describes a received frame that has been copied, payload-first, to the
/// front of the caller-supplied RX buffer.
#[derive(Debug, Clone, Copy)]
pub struct RxFrame {
    pub channel: u8,
    pub len: usize,
}

/// Build and send one SDPCM frame carrying `payload` on `channel` (spec
/// §4.6 TX). `payload.len()` must leave room for the 12-byte header inside
/// `TX_BUF_SIZE`.
pub(crate) fn send<B: HostBus>(bus: &mut B, state: &mut SdpcmState, channel: u8, payload: &[u8]) -> Result<()> {
    let total = SDPCM_HEADER_SIZE + payload.len();
    if total > TX_BUF_SIZE {
        return Err(Error::OutOfMemory);
    }

    let seq = state.tx_seq;
    state.tx_seq = state.tx_seq.wrapping_add(1);

    let header = SdpcmHeader {
        len: total as u16,
        len_check: !(total as u16),
        sequence: seq,
        channel,
        next_length: 0,
        data_offset: SDPCM_HEADER_SIZE as u8,
        flow_control: 0,
        max_seq: 0,
        reserved: [0, 0],
    };

    let mut buf = [0u8; TX_BUF_SIZE];
    buf[..SdpcmHeader::SIZE].copy_from_slice(&header.to_bytes());
    buf[SdpcmHeader::SIZE..total].copy_from_slice(payload);

    // Pad the wire transfer up to a 4-byte multiple (spec §4.6 TX).
    let padded = (total + 3) & !3;

    trace!("sdpcm tx ch={} seq={} len={}", channel, seq, total);
    bus.write_bulk(FUNC_WLAN, 0, &buf[..padded], true)
}

/// Send `payload` on `channel`, honoring the spec §4.6 flow-control
/// invariant: "the caller may send only while tx_seq has not advanced past
/// tx_max; when blocked, it receives frames to pick up credit updates or
/// waits for a timeout". BCDC control traffic never needs this (its
/// request/response wait already drains frames and picks up credit before
/// the next transaction), but the data channel has no such wait built in,
/// so it blocks here instead.
pub(crate) fn send_blocking<B: HostBus>(
    bus: &mut B,
    state: &mut SdpcmState,
    rx_buf: &mut [u8; RX_BUF_SIZE],
    channel: u8,
    payload: &[u8],
) -> Result<()> {
    poll_until(bus, BUDGET_CREDIT_MS, POLL_STEP_MS, |bus| {
        if state.has_credit() {
            return Ok(Some(()));
        }
        recv(bus, state, rx_buf)?;
        Ok(None)
    })?;
    send(bus, state, channel, payload)
}

/// Receive and validate one SDPCM frame (spec §4.6 RX), copying the
/// payload to the front of `rx_buf`. Returns `Ok(None)` when nothing is
/// currently framed (zero-length probe) rather than an error, since "no
/// frame yet" is a normal poll outcome, not a failure.
pub(crate) fn recv<B: HostBus>(
    bus: &mut B,
    state: &mut SdpcmState,
    rx_buf: &mut [u8; RX_BUF_SIZE],
) -> Result<Option<RxFrame>> {
    let mut probe = [0u8; 4];
    bus.read_bulk(FUNC_WLAN, 0, &mut probe, true)?;
    let total_len = u16::from_le_bytes([probe[0], probe[1]]) as usize;

    if total_len == 0 || total_len > RX_BUF_SIZE {
        return Ok(None);
    }

    bus.read_bulk(FUNC_WLAN, 0, &mut rx_buf[..total_len], true)?;

    let header = SdpcmHeader::from_bytes(rx_buf[..SdpcmHeader::SIZE].try_into().unwrap());
    if !header.checksum_ok() {
        warn!("sdpcm rx checksum mismatch");
        return Ok(None);
    }
    if header.len as usize != total_len {
        warn!("sdpcm rx length mismatch");
        return Ok(None);
    }

    state.update_credit(&header);
    state.rx_seq = header.sequence;

    let data_offset = header.data_offset as usize;
    if data_offset > total_len {
        warn!("sdpcm rx bad data_offset");
        return Ok(None);
    }

    let channel = header.channel;
    let len = total_len - data_offset;
    rx_buf.copy_within(data_offset..total_len, 0);

    trace!("sdpcm rx ch={} seq={} len={}", channel, header.sequence, len);
    Ok(Some(RxFrame { channel, len }))
}
