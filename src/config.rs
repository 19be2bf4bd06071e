//! Compile-time tunables. Bare-metal targets don't allocate a runtime
//! config struct for these; they're plain `const`s instead.

/// Size of the fixed TX staging buffer inside the driver context (spec §3).
pub const TX_BUF_SIZE: usize = 2048;
/// Size of the fixed RX staging buffer inside the driver context (spec §3).
pub const RX_BUF_SIZE: usize = 2048;

/// Maximum scan results retained before truncation (spec §3, §8 scenario 6).
pub const MAX_SCAN_RESULTS: usize = 16;

/// Maximum SSID length in bytes (802.11 limit).
pub const MAX_SSID_LEN: usize = 32;

/// Maximum passphrase length accepted by `connect` (WPA2 PSK key cap).
pub const MAX_PASSPHRASE_LEN: usize = 64;

/// Scratch buffer size for a single BCDC transaction payload (header +
/// iovar name + value all have to fit here).
pub const BCDC_BUF_SIZE: usize = 512;

/// Scratch buffer size for `iovar` name+value payloads.
pub const IOVAR_BUF_SIZE: usize = 256;
