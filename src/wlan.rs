//! WLAN control-plane operations (spec §4.8): up/down, scan, connect,
//! disconnect, link status and RSSI, all layered on BCDC ioctl/iovar
//! transactions. The `connect` sequence and `is_connected`/`rssi` shapes
//! follow the literal ioctl sequence this chip family expects: set INFRA,
//! set AUTH, the `wpa_auth` iovar, set WSEC, the WSEC PMK, then set SSID.

use heapless::Vec as HVec;

use crate::bcdc::{self, BcdcState};
use crate::bus::{poll_until, HostBus};
use crate::config::{MAX_PASSPHRASE_LEN, MAX_SCAN_RESULTS, MAX_SSID_LEN, RX_BUF_SIZE};
use crate::consts::*;
use crate::error::{Error, Result};
use crate::events::{self, ParsedEvent};
use crate::fmt::{debug, info, warn};
use crate::sdpcm::SdpcmState;

pub use crate::events::{ScanResult, Security};

/// Bring the WLAN interface up (spec §4.8 `up`).
pub(crate) fn up<B: HostBus>(
    bus: &mut B,
    sdpcm: &mut SdpcmState,
    bcdc: &mut BcdcState,
    rx_buf: &mut [u8; RX_BUF_SIZE],
) -> Result<()> {
    bcdc::transaction(bus, sdpcm, bcdc, rx_buf, WLC_UP, &[], true, None)?;
    info!("wlan up");
    Ok(())
}

/// Bring the WLAN interface down (spec §4.8 `down`).
pub(crate) fn down<B: HostBus>(
    bus: &mut B,
    sdpcm: &mut SdpcmState,
    bcdc: &mut BcdcState,
    rx_buf: &mut [u8; RX_BUF_SIZE],
) -> Result<()> {
    bcdc::transaction(bus, sdpcm, bcdc, rx_buf, WLC_DOWN, &[], true, None)?;
    info!("wlan down");
    Ok(())
}

/// Disassociate from the current network (spec §4.8 `disconnect`).
pub(crate) fn disconnect<B: HostBus>(
    bus: &mut B,
    sdpcm: &mut SdpcmState,
    bcdc: &mut BcdcState,
    rx_buf: &mut [u8; RX_BUF_SIZE],
) -> Result<()> {
    bcdc::transaction(bus, sdpcm, bcdc, rx_buf, WLC_DISASSOC, &[], true, None)?;
    info!("disassociated");
    Ok(())
}

/// `true` once the BSSID ioctl reports a non-zero address (spec §4.8
/// `is_connected`).
pub(crate) fn is_connected<B: HostBus>(
    bus: &mut B,
    sdpcm: &mut SdpcmState,
    bcdc: &mut BcdcState,
    rx_buf: &mut [u8; RX_BUF_SIZE],
) -> Result<bool> {
    let mut bssid = [0u8; 6];
    bcdc::transaction(bus, sdpcm, bcdc, rx_buf, WLC_GET_BSSID, &[], false, Some(&mut bssid))?;
    Ok(bssid != [0u8; 6])
}

/// Current RSSI in dBm (spec §4.8 `rssi`).
pub(crate) fn rssi<B: HostBus>(
    bus: &mut B,
    sdpcm: &mut SdpcmState,
    bcdc: &mut BcdcState,
    rx_buf: &mut [u8; RX_BUF_SIZE],
) -> Result<i32> {
    let mut raw = [0u8; 4];
    bcdc::transaction(bus, sdpcm, bcdc, rx_buf, WLC_GET_RSSI, &[], false, Some(&mut raw))?;
    Ok(i32::from_le_bytes(raw))
}

/// Join `ssid`, optionally with a WPA2-PSK `passphrase` (spec §4.8
/// `connect`, §8 scenario 5): set infrastructure mode, open-system auth,
/// WPA2-PSK auth and the PMK when a passphrase is given (otherwise auth and
/// WSEC are left disabled), then SSID — setting the SSID is what actually
/// kicks off the association attempt on this chip. Blocks, polling the event
/// channel, until a link-up event arrives or `BUDGET_CONNECT_MS` elapses
/// (spec §4.8: "Wait ≤10 s polling for Link-Up").
pub(crate) fn connect<B: HostBus>(
    bus: &mut B,
    sdpcm: &mut SdpcmState,
    bcdc: &mut BcdcState,
    rx_buf: &mut [u8; RX_BUF_SIZE],
    ssid: &str,
    passphrase: Option<&str>,
) -> Result<()> {
    if ssid.is_empty() || ssid.len() > MAX_SSID_LEN {
        return Err(Error::InvalidArgument);
    }
    if let Some(p) = passphrase {
        if p.len() > MAX_PASSPHRASE_LEN {
            return Err(Error::InvalidArgument);
        }
    }

    bcdc::transaction(bus, sdpcm, bcdc, rx_buf, WLC_SET_INFRA, &1u32.to_le_bytes(), true, None)?;
    bcdc::transaction(bus, sdpcm, bcdc, rx_buf, WLC_SET_AUTH, &0u32.to_le_bytes(), true, None)?;

    let wpa_auth = passphrase.map_or(WPA_AUTH_DISABLED, |_| WPA2_AUTH_PSK);
    bcdc::iovar_set(bus, sdpcm, bcdc, rx_buf, "wpa_auth", &wpa_auth.to_le_bytes())?;

    let wsec = passphrase.map_or(WSEC_NONE, |_| WSEC_AES);
    bcdc::transaction(bus, sdpcm, bcdc, rx_buf, WLC_SET_WSEC, &wsec.to_le_bytes(), true, None)?;

    if let Some(passphrase) = passphrase {
        let mut pmk = [0u8; 2 + 2 + 64];
        pmk[0..2].copy_from_slice(&(passphrase.len() as u16).to_le_bytes());
        pmk[4..4 + passphrase.len()].copy_from_slice(passphrase.as_bytes());
        bcdc::transaction(bus, sdpcm, bcdc, rx_buf, WLC_SET_WSEC_PMK, &pmk, true, None)?;
    }

    let mut wlc_ssid = [0u8; 4 + MAX_SSID_LEN];
    wlc_ssid[0..4].copy_from_slice(&(ssid.len() as u32).to_le_bytes());
    wlc_ssid[4..4 + ssid.len()].copy_from_slice(ssid.as_bytes());
    bcdc::transaction(bus, sdpcm, bcdc, rx_buf, WLC_SET_SSID, &wlc_ssid, true, None)?;

    debug!("connect issued for ssid len={}", ssid.len());

    poll_until(bus, BUDGET_CONNECT_MS, POLL_STEP_MS, |bus| {
        let Some(frame) = crate::sdpcm::recv(bus, sdpcm, rx_buf)? else {
            return Ok(None);
        };
        if frame.channel != CHANNEL_TYPE_EVENT {
            return Ok(None);
        }
        match events::parse(&rx_buf[..frame.len]) {
            Some(ParsedEvent::Link { connected: true }) => Ok(Some(())),
            _ => Ok(None),
        }
    })
}

/// Start an escan (spec §4.8 `scan`) and drain its result events off the
/// event channel until `WLC_E_ESCANRESULT` reports completion or
/// `BUDGET_SCAN_MS` elapses. Collected results are bounded to
/// `max_results` (spec §8 scenario 6: excess results are discarded, not
/// buffered past the cap); duplicate BSSIDs coalesce to their most recent
/// sighting.
pub(crate) fn scan<B: HostBus>(
    bus: &mut B,
    sdpcm: &mut SdpcmState,
    bcdc: &mut BcdcState,
    rx_buf: &mut [u8; RX_BUF_SIZE],
    max_results: usize,
) -> Result<HVec<ScanResult, MAX_SCAN_RESULTS>> {
    let max_results = max_results.min(MAX_SCAN_RESULTS);
    let params = build_escan_params();
    bcdc::iovar_set(bus, sdpcm, bcdc, rx_buf, "escan", &params)?;

    let mut results: HVec<ScanResult, MAX_SCAN_RESULTS> = HVec::new();
    poll_until(bus, BUDGET_SCAN_MS, POLL_STEP_MS, |bus| {
        let Some(frame) = crate::sdpcm::recv(bus, sdpcm, rx_buf)? else {
            return Ok(None);
        };
        if frame.channel != CHANNEL_TYPE_EVENT {
            return Ok(None);
        }
        match events::parse(&rx_buf[..frame.len]) {
            Some(ParsedEvent::ScanComplete) => Ok(Some(())),
            Some(ParsedEvent::ScanResult(result)) => {
                if let Some(existing) = results.iter_mut().find(|r| r.bssid == result.bssid) {
                    *existing = result;
                } else if results.len() < max_results {
                    let _ = results.push(result);
                } else {
                    warn!("scan result dropped: cap of {} reached", max_results);
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    })?;

    Ok(results)
}

/// `struct wl_escan_params` with an unbounded active scan across all
/// channels: version=1, action=START, bss_type=any, nprobes/active/
/// passive/home_time=-1 meaning "firmware default".
const ESCAN_PARAMS_SIZE: usize = 4 + 2 + 2 + 4 + 32 + 6 + 1 + 1 + 4 + 4 + 4 + 4 + 4 + 2;

fn build_escan_params() -> [u8; ESCAN_PARAMS_SIZE] {
    const SCAN_ACTION_START: u16 = 1;
    let mut p = [0u8; ESCAN_PARAMS_SIZE];
    p[0..4].copy_from_slice(&1u32.to_le_bytes()); // version
    p[4..6].copy_from_slice(&SCAN_ACTION_START.to_le_bytes());
    // sync_id at 6..8 left 0.
    // params.ssid (4-byte len + 32 bytes) at 8..44, left empty -> match-all.
    // params.bssid at 44..50, left broadcast/zero.
    p[50] = 0xFF; // bss_type = -1 (any)
    // scan_type (active) at 51 left 0.
    p[52..56].copy_from_slice(&(-1i32).to_le_bytes()); // nprobes
    p[56..60].copy_from_slice(&(-1i32).to_le_bytes()); // active_time
    p[60..64].copy_from_slice(&(-1i32).to_le_bytes()); // passive_time
    p[64..68].copy_from_slice(&(-1i32).to_le_bytes()); // home_time
    // channel_num=0 at 68..72, channel_list empty at 72..74 -> scan all channels.
    p
}
