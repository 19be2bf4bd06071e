//! The driver context (spec §3 "Driver context (singleton per chip)"):
//! owns the host bus, the backplane window, SDPCM/BCDC protocol state, the
//! lifecycle state machine, and the fixed RX staging buffer, and exposes
//! the public operation surface (spec §4.9).

use crate::backplane::Backplane;
use crate::bcdc::BcdcState;
use crate::bus::{poll_until, HostBus, FUNC_BACKPLANE, FUNC_BUS, FUNC_WLAN};
use crate::chip::{self, ChipIdentity};
use crate::config::RX_BUF_SIZE;
use crate::consts::{
    BUDGET_FUNC_READY_MS, CCCR_IEN_FUNC0, CCCR_IEN_FUNC1, CCCR_IEN_FUNC2, CCCR_INT_ENABLE,
    CCCR_IO_READY, CHANNEL_TYPE_DATA, CYW55500_F2_WATERMARK, POLL_STEP_MS, SBSDIO_WATERMARK,
    SDIO_F1_BLOCK_SIZE, SDIO_F2_BLOCK_SIZE, SDIO_FUNC_READY_1, SDIO_FUNC_READY_2,
};
use crate::error::Result;
use crate::events::{ParsedEvent, ScanResult};
use crate::fmt::info;
use crate::sdpcm::{self, SdpcmState};
use crate::state::State;
use crate::wlan;

pub use crate::consts::CHANNEL_TYPE_EVENT;

/// Outcome of a single `poll` call (spec §4.9 `poll`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollEvent {
    Linked,
    Unlinked,
    /// A data-channel frame arrived; its `len` bytes are available via
    /// [`Driver::data`] until the next `poll` (spec §1: "the data channel is
    /// a byte-stream hand-off", not a queued network-stack integration).
    Data(usize),
}

/// Host driver for a CYW55500 over 4-wire SDIO, generic over the
/// embedding application's `HostBus` implementation.
pub struct Driver<B: HostBus> {
    bus: B,
    backplane: Backplane,
    sdpcm: SdpcmState,
    bcdc: BcdcState,
    state: State,
    chip: Option<ChipIdentity>,
    rx_buf: [u8; RX_BUF_SIZE],
    data_len: usize,
}

/// Poll CCCR `IO_READY` (function-0 address `0x03`) until the given
/// function-ready bits are set, up to `BUDGET_FUNC_READY_MS` (spec §6
/// "Function-enable CCCR"; the edge case that enabling an already-enabled
/// function leaves `IO_READY` unchanged is what makes this worth polling
/// rather than assuming `enable_function` takes effect synchronously).
fn wait_function_ready<B: HostBus>(bus: &mut B, want: u8) -> Result<()> {
    poll_until(bus, BUDGET_FUNC_READY_MS, POLL_STEP_MS, |bus| {
        let val = bus.read_byte(FUNC_BUS, CCCR_IO_READY)?;
        Ok((val & want == want).then_some(()))
    })
}

impl<B: HostBus> Driver<B> {
    /// Bring up SDIO function enablement, block sizes, and the ALP clock,
    /// and move the driver from `Off` to `Init` (spec §4.1/§4.4).
    pub fn init(mut bus: B) -> Result<Self> {
        bus.enable_function(FUNC_BACKPLANE, true)?;
        bus.enable_function(FUNC_WLAN, true)?;
        wait_function_ready(&mut bus, SDIO_FUNC_READY_1 | SDIO_FUNC_READY_2)?;
        bus.set_block_size(FUNC_BACKPLANE, SDIO_F1_BLOCK_SIZE)?;
        bus.set_block_size(FUNC_WLAN, SDIO_F2_BLOCK_SIZE)?;
        bus.write_byte(FUNC_BACKPLANE, SBSDIO_WATERMARK, CYW55500_F2_WATERMARK)?;
        bus.write_byte(
            0,
            CCCR_INT_ENABLE,
            CCCR_IEN_FUNC0 | CCCR_IEN_FUNC1 | CCCR_IEN_FUNC2,
        )?;
        bus.enable_irq(true)?;

        chip::request_alp_clock(&mut bus)?;

        info!("driver initialized");
        Ok(Self {
            bus,
            backplane: Backplane::new(),
            sdpcm: SdpcmState::new(),
            bcdc: BcdcState::new(),
            state: State::Init,
            chip: None,
            rx_buf: [0u8; RX_BUF_SIZE],
            data_len: 0,
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Identify the chip and stream firmware/NVRAM into RAM (spec §4.4,
    /// §4.5). Moves `Init` -> `FwReady` on success; any failure moves the
    /// driver to the terminal `Error` state (spec §7 promotion policy).
    pub fn load_firmware(&mut self, firmware: &[u8], nvram: &[u8]) -> Result<()> {
        self.state.require(State::Init)?;
        self.state = State::FwLoading;

        let result = (|| {
            let chip = chip::detect(&mut self.bus, &mut self.backplane)?;
            chip::load_firmware(&mut self.bus, &mut self.backplane, &chip, firmware, nvram)?;
            Ok(chip)
        })();

        match result {
            Ok(chip) => {
                self.chip = Some(chip);
                self.state = State::FwReady;
                Ok(())
            }
            Err(e) => {
                self.state = State::Error;
                Err(e)
            }
        }
    }

    /// The chip identity populated by `load_firmware`, once reached
    /// `FwReady` or later.
    pub fn chip_identity(&self) -> Option<ChipIdentity> {
        self.chip
    }

    /// Bring the WLAN interface up (spec §4.9 `up`; `FwReady` -> `Up`).
    pub fn up(&mut self) -> Result<()> {
        self.state.require(State::FwReady)?;
        wlan::up(&mut self.bus, &mut self.sdpcm, &mut self.bcdc, &mut self.rx_buf)?;
        self.state = State::Up;
        Ok(())
    }

    /// Bring the WLAN interface down (spec §4.9 `down`; `Up` -> `FwReady`).
    pub fn down(&mut self) -> Result<()> {
        self.state.require(State::Up)?;
        wlan::down(&mut self.bus, &mut self.sdpcm, &mut self.bcdc, &mut self.rx_buf)?;
        self.state = State::FwReady;
        Ok(())
    }

    /// Scan for networks, collecting up to `max_results` (spec §4.9 `scan`).
    pub fn scan(&mut self, max_results: usize) -> Result<heapless::Vec<ScanResult, { crate::config::MAX_SCAN_RESULTS }>> {
        self.state.require(State::Up)?;
        wlan::scan(&mut self.bus, &mut self.sdpcm, &mut self.bcdc, &mut self.rx_buf, max_results)
    }

    /// Join `ssid`, optionally with a WPA2-PSK `passphrase` (spec §4.9
    /// `connect`; `None` joins an open network).
    pub fn connect(&mut self, ssid: &str, passphrase: Option<&str>) -> Result<()> {
        self.state.require(State::Up)?;
        wlan::connect(&mut self.bus, &mut self.sdpcm, &mut self.bcdc, &mut self.rx_buf, ssid, passphrase)
    }

    /// Disassociate from the current network (spec §4.9 `disconnect`).
    pub fn disconnect(&mut self) -> Result<()> {
        self.state.require(State::Up)?;
        wlan::disconnect(&mut self.bus, &mut self.sdpcm, &mut self.bcdc, &mut self.rx_buf)
    }

    /// `true` if currently associated (spec §4.9 `is_connected`).
    pub fn is_connected(&mut self) -> Result<bool> {
        self.state.require(State::Up)?;
        wlan::is_connected(&mut self.bus, &mut self.sdpcm, &mut self.bcdc, &mut self.rx_buf)
    }

    /// Current RSSI in dBm (spec §4.9 `rssi`).
    pub fn rssi(&mut self) -> Result<i32> {
        self.state.require(State::Up)?;
        wlan::rssi(&mut self.bus, &mut self.sdpcm, &mut self.bcdc, &mut self.rx_buf)
    }

    /// Cooperative, non-blocking drain of one pending SDPCM frame (spec §4.6
    /// RX, §4.9 `poll`). Returns `Ok(None)` when there is nothing to
    /// report: no frame pending, or an event this crate doesn't recognize.
    /// A data-channel frame is surfaced as `PollEvent::Data(len)`, with the
    /// payload readable via [`Driver::data`] until the next call.
    pub fn poll(&mut self) -> Result<Option<PollEvent>> {
        self.state.require(State::FwReady)?;

        let Some(frame) = sdpcm::recv(&mut self.bus, &mut self.sdpcm, &mut self.rx_buf)? else {
            return Ok(None);
        };

        if frame.channel == CHANNEL_TYPE_DATA {
            self.data_len = frame.len;
            return Ok(Some(PollEvent::Data(frame.len)));
        }
        if frame.channel != CHANNEL_TYPE_EVENT {
            return Ok(None);
        }

        match crate::events::parse(&self.rx_buf[..frame.len]) {
            Some(ParsedEvent::Link { connected: true }) => Ok(Some(PollEvent::Linked)),
            Some(ParsedEvent::Link { connected: false }) => Ok(Some(PollEvent::Unlinked)),
            _ => Ok(None),
        }
    }

    /// The payload of the most recent `PollEvent::Data` (spec §1: "the data
    /// channel is a byte-stream hand-off"). Empty until the first data frame
    /// arrives, and overwritten by the next `poll` or data-channel
    /// transaction.
    pub fn data(&self) -> &[u8] {
        &self.rx_buf[..self.data_len]
    }

    /// Send a raw payload on the SDPCM data channel (spec §1 data-path
    /// hand-off). Requires `State::Up`, like the other WLAN operations.
    /// Blocks on TX credit (spec §4.6 flow control) rather than overrunning
    /// `tx_max`: if the chip hasn't granted credit, frames are drained off
    /// the bus to pick up a credit update, up to a bounded budget.
    pub fn send_data(&mut self, payload: &[u8]) -> Result<()> {
        self.state.require(State::Up)?;
        sdpcm::send_blocking(&mut self.bus, &mut self.sdpcm, &mut self.rx_buf, CHANNEL_TYPE_DATA, payload)
    }

    /// Tear the driver down and return it to `Off` (spec §4.9 `deinit`;
    /// legal from any state, including `Error`).
    pub fn deinit(mut self) -> Result<B> {
        let _ = self.bus.enable_irq(false);
        let _ = self.bus.enable_function(FUNC_WLAN, false);
        let _ = self.bus.enable_function(FUNC_BACKPLANE, false);
        self.state = State::Off;
        Ok(self.bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::FUNC_BACKPLANE;
    use crate::consts::*;
    use crate::error::Error;
    use crate::test_support::FakeBus;

    fn bus_with_alp_and_ht_ready() -> FakeBus {
        let mut bus = FakeBus::new();
        bus.poke_reg(FUNC_BACKPLANE, SBSDIO_FUNC1_CHIPCLKCSR, SBSDIO_ALP_AVAIL | SBSDIO_HT_AVAIL);
        bus.poke_reg(FUNC_BUS, CCCR_IO_READY, SDIO_FUNC_READY_1 | SDIO_FUNC_READY_2);
        bus
    }

    #[test]
    fn calls_in_wrong_state_return_not_ready_without_issuing_io() {
        let bus = bus_with_alp_and_ht_ready();
        let mut drv = Driver::init(bus).unwrap();
        assert_eq!(drv.state(), State::Init);

        let before = drv.bus.f2_tx_frames.len();
        assert_eq!(drv.up().unwrap_err(), Error::NotReady);
        assert_eq!(drv.scan(1).unwrap_err(), Error::NotReady);
        assert_eq!(drv.connect("ssid", None).unwrap_err(), Error::NotReady);
        assert_eq!(drv.send_data(&[1, 2, 3]).unwrap_err(), Error::NotReady);
        assert_eq!(drv.bus.f2_tx_frames.len(), before, "no SDPCM traffic on a rejected call");
    }

    /// Drives `init` -> `load_firmware` -> `up`, mirroring the lower-level
    /// firmware-load integration test in `chip.rs`, then exercises the
    /// data-channel hand-off (spec §1) end to end.
    #[test]
    fn full_bring_up_then_data_channel_roundtrip() {
        let mut bus = bus_with_alp_and_ht_ready();
        bus.poke_bp(CHIPCOMMON_BASE, &(CYW55500_CHIP_ID as u32).to_le_bytes());

        let mailbox_addr = 0x1800_0000 + 0x29 * 0x1000 + SDIO_CORE_TOHOSTMAILBOXDATA_OFFSET;
        bus.poke_bp(mailbox_addr, &HMB_DATA_FWREADY.to_le_bytes());

        let mut drv = Driver::init(bus).unwrap();
        drv.load_firmware(&[0xAAu8; 32], &[]).unwrap();
        assert_eq!(drv.state(), State::FwReady);

        drv.bus.push_rx_frame(up_ack_frame());
        drv.up().unwrap();
        assert_eq!(drv.state(), State::Up);

        drv.send_data(&[1, 2, 3, 4]).unwrap();
        let tx = drv.bus.f2_tx_frames.last().unwrap();
        assert_eq!(&tx[crate::structs::SdpcmHeader::SIZE..], &[1, 2, 3, 4]);

        drv.bus.push_rx_frame(data_frame(&[9, 8, 7]));
        assert_eq!(drv.poll().unwrap(), Some(PollEvent::Data(3)));
        assert_eq!(drv.data(), &[9, 8, 7]);
    }

    fn up_ack_frame() -> Vec<u8> {
        use crate::structs::{BcdcHeader, SdpcmHeader};
        let bcdc = BcdcHeader { cmd: WLC_UP, len: 0, flags: 0, status: 0 };
        let payload = bcdc.to_bytes().to_vec();
        let total = SdpcmHeader::SIZE + payload.len();
        let hdr = SdpcmHeader {
            len: total as u16,
            len_check: !(total as u16),
            sequence: 0,
            channel: CHANNEL_TYPE_CONTROL,
            next_length: 0,
            data_offset: SdpcmHeader::SIZE as u8,
            flow_control: 0,
            max_seq: 4,
            reserved: [0, 0],
        };
        let mut v = hdr.to_bytes().to_vec();
        v.extend_from_slice(&payload);
        v
    }

    fn data_frame(payload: &[u8]) -> Vec<u8> {
        use crate::structs::SdpcmHeader;
        let total = SdpcmHeader::SIZE + payload.len();
        let hdr = SdpcmHeader {
            len: total as u16,
            len_check: !(total as u16),
            sequence: 0,
            channel: CHANNEL_TYPE_DATA,
            next_length: 0,
            data_offset: SdpcmHeader::SIZE as u8,
            flow_control: 0,
            max_seq: 4,
            reserved: [0, 0],
        };
        let mut v = hdr.to_bytes().to_vec();
        v.extend_from_slice(payload);
        v
    }
}
