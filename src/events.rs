//! Event-channel parsing: link-state notifications and scan results.
//!
//! Decodes the event-channel wrapper (a Broadcom vendor-specific ethertype
//! frame carrying a BCMILCP event message) into link-up/down notifications
//! and `escan` scan records (BSSID/SSID/RSSI/channel/security, spec §3).
//! The firmware's exact scan-record struct isn't fully known; the layout
//! here is a best-effort reconstruction, documented in DESIGN.md.

use heapless::String;
use num_enum::FromPrimitive;

use crate::config::MAX_SSID_LEN;
use crate::structs::EventMessage;

const ETH_HEADER_SIZE: usize = 14;
const BCM_VENDOR_HEADER_SIZE: usize = 7;
const EVENT_HEADER_SIZE: usize = ETH_HEADER_SIZE + BCM_VENDOR_HEADER_SIZE + EventMessage::SIZE;

const ETH_P_LINK_CTL: u16 = 0x886c;
const BROADCOM_OUI: [u8; 3] = [0x00, 0x10, 0x18];
const BCMILCP_SUBTYPE_VENDOR_LONG: u16 = 32769;
const BCMILCP_BCM_SUBTYPE_EVENT: u16 = 1;

const WLC_E_STATUS_SUCCESS: u32 = 0;

/// Broadcom firmware event type codes this crate recognizes (spec §4.8
/// scan, §9 Open Question). Anything else is preserved as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum Event {
    Join = 1,
    Auth = 3,
    Deauth = 5,
    Disassoc = 6,
    Link = 16,
    EscanResult = 69,
    #[num_enum(default)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Security {
    Open,
    Wep,
    WpaPsk,
    Wpa2Psk,
    Wpa3Sae,
}

impl Security {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Security::Wep,
            2 => Security::WpaPsk,
            3 => Security::Wpa2Psk,
            4 => Security::Wpa3Sae,
            _ => Security::Open,
        }
    }
}

/// One discovered network (spec §3 "Scan result").
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanResult {
    pub bssid: [u8; 6],
    pub ssid: String<MAX_SSID_LEN>,
    pub rssi: i16,
    pub channel: u16,
    pub security: Security,
}

/// The scan-record payload following the event header in an `EscanResult`
/// event whose status is `WLC_E_STATUS_PARTIAL` (anything non-zero and
/// non-success, per this reconstruction).
const SCAN_RECORD_SIZE: usize = 6 + 1 + MAX_SSID_LEN + 2 + 2 + 1;

fn parse_scan_record(data: &[u8]) -> Option<ScanResult> {
    if data.len() < SCAN_RECORD_SIZE {
        return None;
    }
    let bssid: [u8; 6] = data[0..6].try_into().unwrap();
    let ssid_len = (data[6] as usize).min(MAX_SSID_LEN);
    let ssid_bytes = &data[7..7 + ssid_len];
    let ssid = core::str::from_utf8(ssid_bytes).ok()?;
    let mut ssid_owned = String::new();
    ssid_owned.push_str(ssid).ok()?;

    let rssi_off = 7 + MAX_SSID_LEN;
    let rssi = i16::from_be_bytes([data[rssi_off], data[rssi_off + 1]]);
    let channel = u16::from_be_bytes([data[rssi_off + 2], data[rssi_off + 3]]);
    let security = Security::from_u8(data[rssi_off + 4]);

    Some(ScanResult { bssid, ssid: ssid_owned, rssi, channel, security })
}

/// Outcome of successfully decoding one event-channel frame.
pub enum ParsedEvent {
    Link { connected: bool },
    ScanResult(ScanResult),
    ScanComplete,
}

/// Decode a BCMILCP vendor event wrapper + message out of an SDPCM
/// event-channel payload. Returns `None` for anything malformed or not
/// recognized, rather than propagating an error for frames that are
/// simply not an event this driver understands.
pub(crate) fn parse(payload: &[u8]) -> Option<ParsedEvent> {
    if payload.len() < EVENT_HEADER_SIZE {
        return None;
    }

    let ether_type = u16::from_be_bytes([payload[12], payload[13]]);
    if ether_type != ETH_P_LINK_CTL {
        return None;
    }

    let oui = &payload[ETH_HEADER_SIZE..ETH_HEADER_SIZE + 3];
    if oui != BROADCOM_OUI {
        return None;
    }
    let subtype = u16::from_be_bytes([payload[ETH_HEADER_SIZE + 3], payload[ETH_HEADER_SIZE + 4]]);
    if subtype != BCMILCP_SUBTYPE_VENDOR_LONG {
        return None;
    }
    let user_subtype = u16::from_be_bytes([payload[ETH_HEADER_SIZE + 5], payload[ETH_HEADER_SIZE + 6]]);
    if user_subtype != BCMILCP_BCM_SUBTYPE_EVENT {
        return None;
    }

    let msg_start = ETH_HEADER_SIZE + BCM_VENDOR_HEADER_SIZE;
    let msg = EventMessage::from_bytes(payload[msg_start..msg_start + EventMessage::SIZE].try_into().ok()?);

    let data_start = EVENT_HEADER_SIZE;
    if msg.datalen as usize > payload.len() - data_start {
        return None;
    }
    let data = &payload[data_start..][..msg.datalen as usize];

    match Event::from(msg.event_type) {
        Event::Auth | Event::Join | Event::Link => {
            Some(ParsedEvent::Link { connected: msg.status == WLC_E_STATUS_SUCCESS })
        }
        // A successful deauth/disassoc (status == WLC_E_STATUS_SUCCESS) means the
        // link dropped, not that it came up; these always report `connected: false`
        // regardless of status.
        Event::Deauth | Event::Disassoc => Some(ParsedEvent::Link { connected: false }),
        Event::EscanResult => {
            if msg.status == WLC_E_STATUS_SUCCESS && data.is_empty() {
                Some(ParsedEvent::ScanComplete)
            } else {
                parse_scan_record(data).map(ParsedEvent::ScanResult)
            }
        }
        Event::Other => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_frame(event_type: u32, status: u32, data: &[u8]) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&[0u8; 12]); // dst+src
        v.extend_from_slice(&ETH_P_LINK_CTL.to_be_bytes());
        v.extend_from_slice(&BROADCOM_OUI);
        v.extend_from_slice(&BCMILCP_SUBTYPE_VENDOR_LONG.to_be_bytes());
        v.extend_from_slice(&BCMILCP_BCM_SUBTYPE_EVENT.to_be_bytes());

        let mut msg = vec![0u8; EventMessage::SIZE];
        msg[4..8].copy_from_slice(&event_type.to_be_bytes());
        msg[8..12].copy_from_slice(&status.to_be_bytes());
        msg[20..24].copy_from_slice(&(data.len() as u32).to_be_bytes());
        v.extend_from_slice(&msg);
        v.extend_from_slice(data);
        v
    }

    fn build_scan_record(bssid: [u8; 6], ssid: &str, rssi: i16, channel: u16, sec: u8) -> Vec<u8> {
        let mut v = vec![0u8; SCAN_RECORD_SIZE];
        v[0..6].copy_from_slice(&bssid);
        v[6] = ssid.len() as u8;
        v[7..7 + ssid.len()].copy_from_slice(ssid.as_bytes());
        let rssi_off = 7 + MAX_SSID_LEN;
        v[rssi_off..rssi_off + 2].copy_from_slice(&rssi.to_be_bytes());
        v[rssi_off + 2..rssi_off + 4].copy_from_slice(&channel.to_be_bytes());
        v[rssi_off + 4] = sec;
        v
    }

    #[test]
    fn link_event_reports_connected_from_status() {
        let frame = build_frame(Event::Join as u32, WLC_E_STATUS_SUCCESS, &[]);
        match parse(&frame) {
            Some(ParsedEvent::Link { connected }) => assert!(connected),
            _ => panic!("expected link event"),
        }
    }

    #[test]
    fn successful_disassoc_still_reports_disconnected() {
        // WLC_E_STATUS_SUCCESS on a deauth/disassoc means the link dropped
        // cleanly, not that it came back up.
        let frame = build_frame(Event::Disassoc as u32, WLC_E_STATUS_SUCCESS, &[]);
        match parse(&frame) {
            Some(ParsedEvent::Link { connected }) => assert!(!connected),
            _ => panic!("expected link event"),
        }

        let frame = build_frame(Event::Deauth as u32, WLC_E_STATUS_SUCCESS, &[]);
        match parse(&frame) {
            Some(ParsedEvent::Link { connected }) => assert!(!connected),
            _ => panic!("expected link event"),
        }
    }

    #[test]
    fn unrecognized_ether_type_is_ignored() {
        let mut frame = build_frame(Event::Join as u32, WLC_E_STATUS_SUCCESS, &[]);
        frame[13] = 0x00; // corrupt ethertype
        assert!(parse(&frame).is_none());
    }

    #[test]
    fn escan_result_parses_scan_record() {
        let record = build_scan_record([1, 2, 3, 4, 5, 6], "TestAP", -42, 6, 3);
        let frame = build_frame(Event::EscanResult as u32, 8, &record);
        match parse(&frame) {
            Some(ParsedEvent::ScanResult(r)) => {
                assert_eq!(r.bssid, [1, 2, 3, 4, 5, 6]);
                assert_eq!(r.ssid.as_str(), "TestAP");
                assert_eq!(r.rssi, -42);
                assert_eq!(r.channel, 6);
                assert_eq!(r.security, Security::Wpa2Psk);
            }
            _ => panic!("expected scan result"),
        }
    }

    #[test]
    fn escan_success_with_no_data_is_scan_complete() {
        let frame = build_frame(Event::EscanResult as u32, WLC_E_STATUS_SUCCESS, &[]);
        assert!(matches!(parse(&frame), Some(ParsedEvent::ScanComplete)));
    }
}
