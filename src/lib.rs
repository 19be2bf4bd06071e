//! Host-side driver for a Cypress/Infineon CYW55500 WiFi module over a
//! four-wire SDIO bus.
//!
//! This crate brings a raw SDIO host controller up into a usable 802.11
//! station: chip reset and enumeration, firmware/NVRAM download, the
//! SDPCM/BCDC transport, and the WLAN control-plane operations (scan,
//! connect, disassociate, RSSI, link events) built on top of it. It targets
//! a bare-metal or single-threaded embedded host; the only thing it needs
//! from the embedding application is an implementation of [`HostBus`] (the
//! SDIO capability) and the firmware/NVRAM images.
//!
//! ```ignore
//! let mut drv = Driver::init(my_host_bus)?;
//! drv.load_firmware(FW, NVRAM)?;
//! drv.up()?;
//! drv.connect("my-ssid", Some("my-passphrase"))?;
//! loop {
//!     if let Some(PollEvent::Linked) = drv.poll()? {
//!         break;
//!     }
//! }
//! ```
#![cfg_attr(not(test), no_std)]

mod backplane;
mod bcdc;
mod bus;
mod chip;
mod config;
mod consts;
mod driver;
mod error;
mod events;
mod fmt;
mod sdpcm;
mod state;
mod structs;
#[cfg(test)]
mod test_support;
mod wlan;

pub use bus::{Function, HostBus, FUNC_BACKPLANE, FUNC_BUS, FUNC_WLAN};
pub use chip::ChipIdentity;
pub use driver::{Driver, PollEvent};
pub use error::{Error, Result};
pub use state::State;
pub use wlan::{ScanResult, Security};
