//! Driver error types.

use core::fmt;

/// Errors reported by board-core registration and configuration paths.
///
/// Interrupt handlers never produce these; they only flag state and
/// return an [`crate::IrqReturn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// The board description has no entry for the requested unit.
    NotConfigured,
    /// An index (button, MoCA device, interrupt line) is out of range.
    InvalidId,
    /// The unit has no GPIO bound to it.
    MissingGpio,
    /// The unit has no interrupt line bound to it.
    MissingInterrupt,
    /// GPIO polarity and interrupt trigger polarity disagree.
    PolarityMismatch,
    /// The interrupt line was registered with incompatible trigger types.
    IrqConflict,
    /// The unit or name is already registered.
    AlreadyRegistered,
    /// No registration matches the request.
    NotFound,
    /// An argument was malformed (empty name, bad format).
    InvalidArgument,
    /// The requested operation is not supported by this platform.
    Unsupported,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured => f.write_str("not described by the board"),
            Self::InvalidId => f.write_str("index out of range"),
            Self::MissingGpio => f.write_str("no gpio bound"),
            Self::MissingInterrupt => f.write_str("no interrupt line bound"),
            Self::PolarityMismatch => f.write_str("gpio and interrupt polarity disagree"),
            Self::IrqConflict => f.write_str("interrupt line conflict"),
            Self::AlreadyRegistered => f.write_str("already registered"),
            Self::NotFound => f.write_str("not registered"),
            Self::InvalidArgument => f.write_str("invalid argument"),
            Self::Unsupported => f.write_str("operation not supported"),
        }
    }
}
