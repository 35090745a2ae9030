//! Core types for the CAN codec library
//!
//! This module defines the error taxonomy and the transient value types that
//! cross the codec API boundary. The schema model itself lives in
//! [`crate::schema`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// A set of signal values, keyed by signal name.
///
/// Produced by the decoder and consumed by the encoder. Values are physical
/// quantities (after factor/offset conversion), not raw bit patterns.
pub type SignalValues = HashMap<String, f64>;

/// Errors that can occur during schema loading, decoding, or encoding.
///
/// Every failure is a distinct variant so that calling control loops can
/// apply frame-drop vs. fatal-abort policy per kind.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Malformed or contradictory DBC source. The schema is unusable.
    #[error("DBC parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// A bit range does not fit the frame buffer. Schema or programming
    /// defect, always fatal to the call.
    #[error("bit range {start_bit}+{length} exceeds {capacity_bits}-bit frame")]
    BitRange {
        start_bit: u16,
        length: u16,
        capacity_bits: usize,
    },

    /// Frame ID not present in the loaded schema.
    #[error("unknown frame ID 0x{0:X}")]
    UnknownFrame(u32),

    /// Frame payload length differs from the declared message size.
    #[error("frame 0x{id:X} declares {expected} bytes, got {actual}")]
    SizeMismatch {
        id: u32,
        expected: usize,
        actual: usize,
    },

    /// A value was supplied for a signal the message does not carry, or one
    /// that is inactive under the current multiplexer selector value.
    #[error("unknown signal '{signal}' for frame 0x{id:X}")]
    UnknownSignal { id: u32, signal: String },

    /// No multiplex case is declared for the observed selector value.
    #[error("no multiplex case for selector value {selector_value} in frame 0x{id:X}")]
    UnknownMultiplexValue { id: u32, selector_value: u64 },

    /// Checksum or counter validation failed in strict decode. The frame
    /// must be treated as untrusted and dropped.
    #[error("{check} validation failed for frame 0x{id:X}: expected {expected}, observed {observed}")]
    Integrity {
        id: u32,
        check: IntegrityCheck,
        expected: u64,
        observed: u64,
    },

    /// Encode-time guard: physical value outside the signal's declared range.
    #[error("value {value} for signal '{signal}' outside declared range [{min}, {max}]")]
    ValueOutOfRange {
        signal: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Failed to read a DBC file from disk.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which integrity mechanism rejected a frame in strict decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityCheck {
    /// The checksum signal did not match the recomputed value.
    Checksum,
    /// The rolling counter did not advance by one from the previous frame.
    Counter,
}

impl fmt::Display for IntegrityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityCheck::Checksum => write!(f, "checksum"),
            IntegrityCheck::Counter => write!(f, "counter"),
        }
    }
}

/// A fully decoded CAN frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedFrame {
    /// CAN message ID
    pub can_id: u32,
    /// Message name from the schema
    pub message_name: String,
    /// Decoded physical values, keyed by signal name
    pub signals: SignalValues,
    /// Active multiplexer selector value (if the message is multiplexed)
    pub multiplexer_value: Option<u64>,
}

impl DecodedFrame {
    /// Fetch a single decoded value by signal name.
    pub fn get(&self, signal: &str) -> Option<f64> {
        self.signals.get(signal).copied()
    }
}
