//! BCDC request/response layer (spec §4.7): wraps SDPCM control-channel
//! traffic with an ioctl command code, payload length, flags, and request
//! id, and layers named iovar get/set on top.

use crate::bus::{poll_until, HostBus};
use crate::config::{BCDC_BUF_SIZE, IOVAR_BUF_SIZE, RX_BUF_SIZE};
use crate::consts::{
    BCDC_FLAG_REQID_SHIFT, BCDC_FLAG_SET, BCDC_FLAG_VER_SHIFT, BCDC_PROTO_VERSION, BUDGET_BCDC_MS,
    CHANNEL_TYPE_CONTROL, POLL_STEP_MS, WLC_GET_VAR, WLC_SET_VAR,
};
use crate::error::{Error, Result};
use crate::fmt::{trace, warn};
use crate::sdpcm::{self, SdpcmState};
use crate::structs::BcdcHeader;

/// Monotonically increasing (and wrapping) request id counter (spec §3
/// "BCDC request counter").
#[derive(Debug, Default)]
pub struct BcdcState {
    next_reqid: u16,
}

impl BcdcState {
    pub const fn new() -> Self {
        Self { next_reqid: 0 }
    }

    fn allocate(&mut self) -> u16 {
        let id = self.next_reqid;
        self.next_reqid = self.next_reqid.wrapping_add(1);
        id
    }
}

/// Maximum payload `transaction` can carry, reserving room for the BCDC
/// header inside the fixed scratch buffer (spec §8: "A BCDC payload
/// exactly equal to the internal buffer size succeeds; one byte larger
/// returns OutOfMemory").
pub const MAX_BCDC_PAYLOAD: usize = BCDC_BUF_SIZE - BcdcHeader::SIZE;

/// One full ioctl request/response. `out` is `Some` for a GET (the
/// response payload is copied into it, truncated to `out.len()`) and
/// `None` for a SET. Returns the number of bytes copied into `out` (0 for
/// a SET).
#[allow(clippy::too_many_arguments)]
pub(crate) fn transaction<B: HostBus>(
    bus: &mut B,
    sdpcm: &mut SdpcmState,
    bcdc: &mut BcdcState,
    rx_buf: &mut [u8; RX_BUF_SIZE],
    cmd: u32,
    payload: &[u8],
    set: bool,
    mut out: Option<&mut [u8]>,
) -> Result<usize> {
    if payload.len() > MAX_BCDC_PAYLOAD {
        return Err(Error::OutOfMemory);
    }

    let reqid = bcdc.allocate();
    let header = BcdcHeader {
        cmd,
        len: payload.len() as u32,
        flags: (BCDC_PROTO_VERSION << BCDC_FLAG_VER_SHIFT)
            | (if set { BCDC_FLAG_SET } else { 0 })
            | ((reqid as u32) << BCDC_FLAG_REQID_SHIFT),
        status: 0,
    };

    let mut scratch = [0u8; BCDC_BUF_SIZE];
    let total = BcdcHeader::SIZE + payload.len();
    scratch[..BcdcHeader::SIZE].copy_from_slice(&header.to_bytes());
    scratch[BcdcHeader::SIZE..total].copy_from_slice(payload);

    trace!("bcdc tx cmd={} reqid={} set={} len={}", cmd, reqid, set, payload.len());
    sdpcm::send(bus, sdpcm, CHANNEL_TYPE_CONTROL, &scratch[..total])?;

    poll_until(bus, BUDGET_BCDC_MS, POLL_STEP_MS, |bus| {
        let Some(frame) = sdpcm::recv(bus, sdpcm, rx_buf)? else {
            return Ok(None);
        };
        if frame.channel != CHANNEL_TYPE_CONTROL || frame.len < BcdcHeader::SIZE {
            return Ok(None);
        }

        let resp = BcdcHeader::from_bytes(rx_buf[..BcdcHeader::SIZE].try_into().unwrap());
        if resp.request_id() != reqid {
            // Not ours; it has already updated credit/flow-control via
            // `sdpcm::recv` but is otherwise discarded (spec §4.7
            // invariant).
            return Ok(None);
        }

        if resp.status != 0 {
            warn!("bcdc ioctl {} failed, status={}", cmd, resp.status as i32);
            return Err(Error::IoctlError(resp.status as i32));
        }

        let resp_len = (resp.len as usize).min(frame.len - BcdcHeader::SIZE);
        let copied = match out.as_deref_mut() {
            Some(buf) => {
                let n = resp_len.min(buf.len());
                buf[..n].copy_from_slice(&rx_buf[BcdcHeader::SIZE..][..n]);
                n
            }
            None => 0,
        };
        Ok(Some(copied))
    })
}

/// `name`-then-value iovar SET (spec §4.7 iovar).
pub(crate) fn iovar_set<B: HostBus>(
    bus: &mut B,
    sdpcm: &mut SdpcmState,
    bcdc: &mut BcdcState,
    rx_buf: &mut [u8; RX_BUF_SIZE],
    name: &str,
    value: &[u8],
) -> Result<()> {
    let mut buf = [0u8; IOVAR_BUF_SIZE];
    let total = build_iovar_payload(&mut buf, name, value)?;
    transaction(bus, sdpcm, bcdc, rx_buf, WLC_SET_VAR, &buf[..total], true, None)?;
    Ok(())
}

/// `name`-only iovar GET; the response is the value alone (the name is not
/// echoed back).
pub(crate) fn iovar_get<B: HostBus>(
    bus: &mut B,
    sdpcm: &mut SdpcmState,
    bcdc: &mut BcdcState,
    rx_buf: &mut [u8; RX_BUF_SIZE],
    name: &str,
    out: &mut [u8],
) -> Result<usize> {
    let mut buf = [0u8; IOVAR_BUF_SIZE];
    let total = build_iovar_payload(&mut buf, name, &[])?;
    transaction(bus, sdpcm, bcdc, rx_buf, WLC_GET_VAR, &buf[..total], false, Some(out))
}

fn build_iovar_payload(buf: &mut [u8; IOVAR_BUF_SIZE], name: &str, value: &[u8]) -> Result<usize> {
    let name_len = name.len() + 1; // + NUL
    let total = name_len + value.len();
    if total > buf.len() {
        return Err(Error::OutOfMemory);
    }
    buf[..name.len()].copy_from_slice(name.as_bytes());
    buf[name.len()] = 0;
    buf[name_len..total].copy_from_slice(value);
    Ok(total)
}
