//! CAN Frame Codec Library
//!
//! A DBC-driven codec engine for CAN bus traffic. The library parses DBC
//! bus description files into an immutable in-memory schema, then uses that
//! schema to decode raw CAN frames into named physical values and to encode
//! named physical values back into raw frames, computing checksum and
//! rolling-counter signals automatically.
//!
//! # Architecture
//!
//! This library is intentionally minimal and focused on the codec:
//! - Parses DBC source text into a [`SignalDatabase`] (once, at load time)
//! - Decodes frames with multiplexing and optional strict integrity checks
//! - Encodes frames with automatic checksum/counter derivation
//!
//! The library does NOT:
//! - Read frames from a physical or virtual bus interface
//! - Discover DBC files or associate them with vehicles
//! - Implement any control logic on top of decoded signals
//!
//! A loaded [`SignalDatabase`] is immutable and safe to share across
//! threads; [`Decoder`] and [`Encoder`] are cheap per-stream values
//! borrowing it.
//!
//! # Example Usage
//!
//! ```
//! use can_codec::{Decoder, Encoder, SignalDatabase, SignalValues};
//!
//! let db = SignalDatabase::from_dbc_str(
//!     "BO_ 512 SpeedMsg: 8 ECU1\n SG_ Speed : 0|16@1+ (0.01,0) [0|655.35] \"km/h\" ECU2\n",
//! )
//! .unwrap();
//!
//! let mut encoder = Encoder::new(&db);
//! let mut values = SignalValues::new();
//! values.insert("Speed".to_string(), 100.0);
//! let data = encoder.encode(0x200, &values).unwrap();
//! assert_eq!(&data[..2], &[0x10, 0x27]);
//!
//! let mut decoder = Decoder::new(&db);
//! let frame = decoder.decode(0x200, &data).unwrap();
//! assert_eq!(frame.get("Speed"), Some(100.0));
//! ```

// Public modules
pub mod bits;
pub mod decoder;
pub mod encoder;
pub mod integrity;
pub mod schema;
pub mod types;

// Re-export main types for convenience
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use integrity::ChecksumKind;
pub use schema::{
    ByteOrder, ChecksumSpec, DatabaseStats, MessageDefinition, SignalDatabase, SignalDefinition,
    SignalRole, ValueType,
};
pub use types::{CodecError, DecodedFrame, IntegrityCheck, Result, SignalValues};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: load a one-message schema and inspect it
        let db = SignalDatabase::from_dbc_str(
            "BO_ 291 EngineData: 8 ECU1\n SG_ EngineSpeed : 0|16@1+ (1,0) [0|8000] \"rpm\" ECU2\n",
        )
        .unwrap();
        let stats = db.stats();
        assert_eq!(stats.num_messages, 1);
        assert_eq!(stats.num_signals, 1);
        assert!(!VERSION.is_empty());
    }
}
