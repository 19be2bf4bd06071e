//! Error taxonomy (spec §7). Every fallible operation in this crate returns
//! one of these as a tagged value; there is no unwinding.

use core::fmt;

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// A single tagged failure value. See spec §7 for the propagation policy:
/// `IoError`/`Timeout` encountered during firmware load are promoted to
/// `FwLoadFailed` and drive the lifecycle to `State::Error`; every other
/// variant is local to the call that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Called in a lifecycle state that doesn't permit this operation.
    NotReady,
    /// Null buffer, oversize payload, or illegal function number.
    InvalidArgument,
    /// The host SDIO capability reported a transaction failure.
    IoError,
    /// A bounded polling loop exhausted its iteration budget.
    Timeout,
    /// The firmware download / bring-up sequence failed.
    FwLoadFailed,
    /// The chip replied to a BCDC transaction with non-zero status.
    IoctlError(i32),
    /// A bounded internal buffer was too small for the requested payload.
    OutOfMemory,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotReady => write!(f, "driver not ready for this operation"),
            Error::InvalidArgument => write!(f, "invalid argument"),
            Error::IoError => write!(f, "SDIO transaction failed"),
            Error::Timeout => write!(f, "operation timed out"),
            Error::FwLoadFailed => write!(f, "firmware load failed"),
            Error::IoctlError(status) => write!(f, "ioctl returned status {status}"),
            Error::OutOfMemory => write!(f, "payload exceeds internal buffer"),
        }
    }
}
