//! Frame decoding engine
//!
//! Extracts signal values from raw CAN frames based on the signal database.
//! Handles bit extraction, endianness, multiplexing, and physical value
//! conversion. In strict mode the decoder additionally validates checksum
//! and rolling-counter signals before returning any values: a frame that
//! fails validation yields no partial result, because treating unvalidated
//! safety-relevant signals as trustworthy is the primary risk this component
//! exists to prevent.

use crate::bits;
use crate::integrity;
use crate::schema::{MessageDefinition, SignalDatabase, SignalDefinition, SignalRole, ValueType};
use crate::types::{CodecError, DecodedFrame, IntegrityCheck, Result, SignalValues};
use std::collections::HashMap;

/// Frame decoder for one receive stream.
///
/// Borrows the shared signal database; carries per-frame-ID counter history
/// for strict sequence validation, so use one decoder per bus stream.
pub struct Decoder<'a> {
    db: &'a SignalDatabase,
    strict: bool,
    /// Last observed counter value per frame ID
    last_counters: HashMap<u32, u64>,
}

impl<'a> Decoder<'a> {
    /// Create a decoder over a loaded database.
    pub fn new(db: &'a SignalDatabase) -> Self {
        Self {
            db,
            strict: false,
            last_counters: HashMap::new(),
        }
    }

    /// Enable or disable strict integrity validation.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Decode a raw frame into named physical values.
    pub fn decode(&mut self, can_id: u32, data: &[u8]) -> Result<DecodedFrame> {
        let message = self
            .db
            .message(can_id)
            .ok_or(CodecError::UnknownFrame(can_id))?;
        if data.len() != message.size {
            return Err(CodecError::SizeMismatch {
                id: can_id,
                expected: message.size,
                actual: data.len(),
            });
        }

        if self.strict {
            self.verify_integrity(message, data)?;
        }

        // For multiplexed messages the selector decides which subset exists
        // in this frame, so it is extracted first.
        let multiplexer_value = match message.multiplexor {
            Some(idx) => {
                let selector = &message.signals[idx];
                Some(bits::read_bits(
                    data,
                    selector.start_bit,
                    selector.length,
                    selector.byte_order,
                )?)
            }
            None => None,
        };

        let active_subset = match multiplexer_value {
            Some(value) => match message.mux_cases.get(&value) {
                Some(indices) => Some(indices.as_slice()),
                None => {
                    if self.strict {
                        return Err(CodecError::UnknownMultiplexValue {
                            id: can_id,
                            selector_value: value,
                        });
                    }
                    log::warn!(
                        "frame 0x{:X}: no multiplex case for selector value {}, returning shared signals only",
                        can_id,
                        value
                    );
                    None
                }
            },
            None => None,
        };

        let mut signals = SignalValues::new();
        for (idx, signal) in message.signals.iter().enumerate() {
            if let SignalRole::Multiplexed { .. } = signal.role {
                let active = active_subset.map_or(false, |subset| subset.contains(&idx));
                if !active {
                    continue;
                }
            }
            signals.insert(signal.name.clone(), decode_signal(data, signal)?);
        }

        Ok(DecodedFrame {
            can_id,
            message_name: message.name.clone(),
            signals,
            multiplexer_value,
        })
    }

    /// Validate checksum and counter before any value is returned.
    fn verify_integrity(&mut self, message: &MessageDefinition, data: &[u8]) -> Result<()> {
        if let Some(checksum) = &message.checksum {
            let expected = integrity::compute_checksum(checksum.kind, data, checksum.byte);
            let observed = data[checksum.byte];
            if observed != expected {
                return Err(CodecError::Integrity {
                    id: message.id,
                    check: IntegrityCheck::Checksum,
                    expected: expected as u64,
                    observed: observed as u64,
                });
            }
        }

        if let Some(idx) = message.counter {
            let signal = &message.signals[idx];
            let observed =
                bits::read_bits(data, signal.start_bit, signal.length, signal.byte_order)?;
            // First observation seeds the history; afterwards the counter
            // must advance by exactly one, wrapping at its width. The
            // history is resynced even on failure so a single dropped frame
            // does not poison the rest of the stream.
            let previous = self.last_counters.insert(message.id, observed);
            if let Some(previous) = previous {
                let expected = integrity::next_counter(previous, signal.length);
                if observed != expected {
                    return Err(CodecError::Integrity {
                        id: message.id,
                        check: IntegrityCheck::Counter,
                        expected,
                        observed,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Decode a single signal into its physical value.
fn decode_signal(data: &[u8], signal: &SignalDefinition) -> Result<f64> {
    let raw = bits::read_bits(data, signal.start_bit, signal.length, signal.byte_order)?;
    let raw = match signal.value_type {
        ValueType::Unsigned => raw as f64,
        ValueType::Signed => bits::sign_extend(raw, signal.length) as f64,
    };
    Ok(raw * signal.factor + signal.offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(dbc: &str) -> SignalDatabase {
        SignalDatabase::from_dbc_str(dbc).unwrap()
    }

    #[test]
    fn test_decode_simple_message() {
        let db = load(
            r#"
BO_ 512 SpeedMsg: 8 ECU1
 SG_ Speed : 0|16@1+ (0.01,0) [0|655.35] "km/h" ECU2
 SG_ Temp : 16|8@1- (1,0) [-128|127] "C" ECU2
"#,
        );
        let mut decoder = Decoder::new(&db);

        let data = [0x10, 0x27, 0xFE, 0, 0, 0, 0, 0];
        let frame = decoder.decode(0x200, &data).unwrap();
        assert_eq!(frame.message_name, "SpeedMsg");
        assert_eq!(frame.get("Speed"), Some(100.0));
        assert_eq!(frame.get("Temp"), Some(-2.0));
        assert_eq!(frame.multiplexer_value, None);
    }

    #[test]
    fn test_unknown_frame_and_size_mismatch() {
        let db = load(
            r#"
BO_ 512 SpeedMsg: 8 ECU1
 SG_ Speed : 0|16@1+ (0.01,0) [0|655.35] "km/h" ECU2
"#,
        );
        let mut decoder = Decoder::new(&db);

        assert!(matches!(
            decoder.decode(0x300, &[0u8; 8]),
            Err(CodecError::UnknownFrame(0x300))
        ));
        assert!(matches!(
            decoder.decode(0x200, &[0u8; 4]),
            Err(CodecError::SizeMismatch {
                expected: 8,
                actual: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_decode_multiplexed_subsets() {
        let db = load(
            r#"
BO_ 768 MuxMsg: 8 ECU1
 SG_ Mode M : 0|8@1+ (1,0) [0|3] "" ECU2
 SG_ Shared : 8|8@1+ (1,0) [0|255] "" ECU2
 SG_ TempA m0 : 16|16@1+ (0.1,-40) [-40|6513.5] "C" ECU2
 SG_ PressB m1 : 16|16@1+ (1,0) [0|65535] "kPa" ECU2
"#,
        );
        let mut decoder = Decoder::new(&db);

        let data = [0x00, 0x42, 0x90, 0x01, 0, 0, 0, 0];
        let frame = decoder.decode(0x300, &data).unwrap();
        assert_eq!(frame.multiplexer_value, Some(0));
        assert_eq!(frame.get("Shared"), Some(0x42 as f64));
        assert_eq!(frame.get("TempA"), Some(0.0));
        assert_eq!(frame.get("PressB"), None);

        let data = [0x01, 0x42, 0x90, 0x01, 0, 0, 0, 0];
        let frame = decoder.decode(0x300, &data).unwrap();
        assert_eq!(frame.get("TempA"), None);
        assert_eq!(frame.get("PressB"), Some(0x190 as f64));
    }

    #[test]
    fn test_unknown_selector_value() {
        let db = load(
            r#"
BO_ 768 MuxMsg: 8 ECU1
 SG_ Mode M : 0|8@1+ (1,0) [0|3] "" ECU2
 SG_ TempA m0 : 16|16@1+ (1,0) [0|65535] "" ECU2
"#,
        );

        let data = [0x07, 0, 0, 0, 0, 0, 0, 0];

        // non-strict: shared signals only
        let mut decoder = Decoder::new(&db);
        let frame = decoder.decode(0x300, &data).unwrap();
        assert_eq!(frame.multiplexer_value, Some(7));
        assert_eq!(frame.get("Mode"), Some(7.0));
        assert_eq!(frame.get("TempA"), None);

        // strict: the whole call fails
        let mut decoder = Decoder::new(&db).with_strict(true);
        assert!(matches!(
            decoder.decode(0x300, &data),
            Err(CodecError::UnknownMultiplexValue {
                selector_value: 7,
                ..
            })
        ));
    }

    #[test]
    fn test_non_strict_returns_integrity_fields() {
        let db = load(
            r#"
BO_ 299 SafetyCmd: 4 ECU1
 SG_ CHECKSUM : 0|8@1+ (1,0) [0|255] "" ECU2
 SG_ COUNTER : 8|4@1+ (1,0) [0|15] "" ECU2
 SG_ Torque : 16|16@1+ (1,0) [0|65535] "" ECU2
"#,
        );
        let mut decoder = Decoder::new(&db);

        // wrong checksum on purpose; non-strict decode must not care
        let data = [0xEE, 0x05, 0x34, 0x12];
        let frame = decoder.decode(299, &data).unwrap();
        assert_eq!(frame.get("CHECKSUM"), Some(0xEE as f64));
        assert_eq!(frame.get("COUNTER"), Some(5.0));
        assert_eq!(frame.get("Torque"), Some(0x1234 as f64));
    }

    #[test]
    fn test_strict_checksum_validation() {
        let db = load(
            r#"
BO_ 299 SafetyCmd: 4 ECU1
 SG_ CHECKSUM : 0|8@1+ (1,0) [0|255] "" ECU2
 SG_ Torque : 8|16@1+ (1,0) [0|65535] "" ECU2
"#,
        );
        let mut decoder = Decoder::new(&db).with_strict(true);

        // xor checksum over bytes 1..4 = 0x34 ^ 0x12 ^ 0x00 = 0x26
        let good = [0x26, 0x34, 0x12, 0x00];
        assert!(decoder.decode(299, &good).is_ok());

        let bad = [0x27, 0x34, 0x12, 0x00];
        assert!(matches!(
            decoder.decode(299, &bad),
            Err(CodecError::Integrity {
                check: IntegrityCheck::Checksum,
                ..
            })
        ));
    }

    #[test]
    fn test_strict_counter_sequencing() {
        let db = load(
            r#"
BO_ 299 SafetyCmd: 2 ECU1
 SG_ COUNTER : 0|4@1+ (1,0) [0|15] "" ECU2
 SG_ Flag : 4|1@1+ (1,0) [0|1] "" ECU2
"#,
        );
        let mut decoder = Decoder::new(&db).with_strict(true);

        // first observation seeds the sequence
        assert!(decoder.decode(299, &[0x03, 0]).is_ok());
        // +1 passes
        assert!(decoder.decode(299, &[0x04, 0]).is_ok());
        // repeat fails
        assert!(matches!(
            decoder.decode(299, &[0x04, 0]),
            Err(CodecError::Integrity {
                check: IntegrityCheck::Counter,
                expected: 5,
                observed: 4,
                ..
            })
        ));
        // history resynced on failure: the next in-sequence frame passes
        assert!(decoder.decode(299, &[0x05, 0]).is_ok());
        // wrap at the 4-bit width
        for value in 6..=15 {
            assert!(decoder.decode(299, &[value, 0]).is_ok());
        }
        assert!(decoder.decode(299, &[0x00, 0]).is_ok());
    }
}
