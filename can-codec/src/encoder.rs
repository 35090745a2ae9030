//! Frame encoding engine
//!
//! Packs named physical values into raw CAN frames based on the signal
//! database. Checksum and rolling-counter signals are derived fields: the
//! encoder advances the counter and recomputes the checksum over the
//! finished buffer after all payload signals are written, overriding any
//! caller-supplied value for them.

use crate::bits;
use crate::integrity;
use crate::schema::{SignalDatabase, SignalDefinition, SignalRole, ValueType};
use crate::types::{CodecError, Result, SignalValues};
use std::collections::HashMap;

/// Frame encoder for one transmit stream.
///
/// Borrows the shared signal database; carries the next counter value per
/// frame ID, so use one encoder per bus stream.
pub struct Encoder<'a> {
    db: &'a SignalDatabase,
    strict: bool,
    /// Next counter value to transmit per frame ID
    next_counters: HashMap<u32, u64>,
}

impl<'a> Encoder<'a> {
    /// Create an encoder over a loaded database.
    pub fn new(db: &'a SignalDatabase) -> Self {
        Self {
            db,
            strict: false,
            next_counters: HashMap::new(),
        }
    }

    /// Enable or disable strict [min, max] range checking.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Encode named physical values into a raw frame.
    pub fn encode(&mut self, can_id: u32, values: &SignalValues) -> Result<Vec<u8>> {
        let message = self
            .db
            .message(can_id)
            .ok_or(CodecError::UnknownFrame(can_id))?;
        let mut data = vec![0u8; message.size];

        // The caller-selected selector value fixes the writable subset.
        let selector_value = match message.multiplexor {
            Some(idx) => {
                let selector = &message.signals[idx];
                match values.get(&selector.name) {
                    Some(&physical) => {
                        let raw = physical_to_raw(selector, physical, self.strict)?;
                        if !message.mux_cases.is_empty() && !message.mux_cases.contains_key(&raw) {
                            return Err(CodecError::UnknownMultiplexValue {
                                id: can_id,
                                selector_value: raw,
                            });
                        }
                        Some(raw)
                    }
                    None => None,
                }
            }
            None => None,
        };

        for (name, &physical) in values {
            let (_, signal) = message.signal(name).ok_or_else(|| CodecError::UnknownSignal {
                id: can_id,
                signal: name.clone(),
            })?;

            match &signal.role {
                // Derived fields are written below, whatever the caller sent.
                SignalRole::Checksum | SignalRole::Counter => {
                    log::debug!(
                        "frame 0x{:X}: overriding caller-supplied value for derived signal '{}'",
                        can_id,
                        name
                    );
                    continue;
                }
                SignalRole::Multiplexed { .. } => {
                    if !signal.is_active_for(selector_value) {
                        return Err(CodecError::UnknownSignal {
                            id: can_id,
                            signal: name.clone(),
                        });
                    }
                }
                SignalRole::Plain | SignalRole::MuxSelector => {}
            }

            let raw = physical_to_raw(signal, physical, self.strict)?;
            bits::write_bits(&mut data, signal.start_bit, signal.length, signal.byte_order, raw)?;
        }

        // Counter first, then the checksum over the finished frame.
        if let Some(idx) = message.counter {
            let signal = &message.signals[idx];
            let count = *self.next_counters.entry(can_id).or_insert(0);
            bits::write_bits(&mut data, signal.start_bit, signal.length, signal.byte_order, count)?;
            self.next_counters
                .insert(can_id, integrity::next_counter(count, signal.length));
        }
        if let Some(checksum) = &message.checksum {
            let signal = &message.signals[checksum.signal];
            let value = integrity::compute_checksum(checksum.kind, &data, checksum.byte);
            bits::write_bits(
                &mut data,
                signal.start_bit,
                signal.length,
                signal.byte_order,
                value as u64,
            )?;
        }

        Ok(data)
    }
}

/// Convert a physical value to the raw bit pattern for one signal.
///
/// Strict mode rejects values outside the declared [min, max]; otherwise
/// the raw integer saturates at the representable range of the bit width.
fn physical_to_raw(signal: &SignalDefinition, physical: f64, strict: bool) -> Result<u64> {
    if strict && signal.has_range() && (physical < signal.min || physical > signal.max) {
        return Err(CodecError::ValueOutOfRange {
            signal: signal.name.clone(),
            value: physical,
            min: signal.min,
            max: signal.max,
        });
    }

    let raw = ((physical - signal.offset) / signal.factor).round();

    Ok(match signal.value_type {
        ValueType::Signed => {
            let half = 2f64.powi(signal.length as i32 - 1);
            let clamped = raw.clamp(-half, half - 1.0) as i64;
            let mask = if signal.length == 64 {
                u64::MAX
            } else {
                (1u64 << signal.length) - 1
            };
            (clamped as u64) & mask
        }
        ValueType::Unsigned => {
            let max = if signal.length == 64 {
                u64::MAX as f64
            } else {
                ((1u64 << signal.length) - 1) as f64
            };
            raw.clamp(0.0, max) as u64
        }
    })
}
