//! Immutable CAN schema model
//!
//! The schema is built once by the DBC parser and then only read. It is the
//! shared artifact consulted by the encoder and decoder on the per-frame hot
//! path, so every cross-reference (multiplex cases, checksum/counter
//! placement, name lookups) is resolved here at load time.

use crate::integrity::ChecksumKind;
use crate::types::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Byte order for signal extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrder {
    /// Little-endian (Intel format)
    LittleEndian,
    /// Big-endian (Motorola format)
    BigEndian,
}

/// Value type for signal interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    /// Signed integer
    Signed,
    /// Unsigned integer
    Unsigned,
}

/// What a signal carries within its message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SignalRole {
    /// Ordinary payload signal, always active.
    Plain,
    /// Derived checksum field, recomputed on encode and verified in strict
    /// decode.
    Checksum,
    /// Rolling counter field, advanced on encode and sequence-checked in
    /// strict decode.
    Counter,
    /// Multiplexer selector: its raw value picks the active signal subset.
    MuxSelector,
    /// Active only when the selector holds one of these raw values.
    Multiplexed { selector_values: Vec<u64> },
}

/// A CAN signal definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDefinition {
    /// Signal name (unique within its message)
    pub name: String,
    /// Start bit in the CAN frame (lsb0 numbering; MSB position for
    /// big-endian signals)
    pub start_bit: u16,
    /// Length in bits
    pub length: u16,
    /// Byte order
    pub byte_order: ByteOrder,
    /// Value type (signed/unsigned)
    pub value_type: ValueType,
    /// Scale factor to convert raw value to physical value
    pub factor: f64,
    /// Offset to add after scaling
    pub offset: f64,
    /// Minimum physical value
    pub min: f64,
    /// Maximum physical value
    pub max: f64,
    /// Engineering unit (e.g., "km/h", "V")
    pub unit: Option<String>,
    /// Role within the message
    pub role: SignalRole,
}

impl SignalDefinition {
    /// True when the signal declares a usable [min, max] range.
    ///
    /// DBC files carry `[0|0]` for "no range declared".
    pub fn has_range(&self) -> bool {
        self.min != self.max
    }

    /// True when the signal is decoded for the given selector value.
    pub fn is_active_for(&self, selector_value: Option<u64>) -> bool {
        match &self.role {
            SignalRole::Multiplexed { selector_values } => match selector_value {
                Some(v) => selector_values.contains(&v),
                None => false,
            },
            _ => true,
        }
    }
}

/// Checksum placement and algorithm for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumSpec {
    /// Index of the checksum signal within [`MessageDefinition::signals`]
    pub signal: usize,
    /// Frame byte holding the checksum (the byte excluded from computation)
    pub byte: usize,
    /// Algorithm for this message
    pub kind: ChecksumKind,
}

/// A complete CAN message definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDefinition {
    /// CAN message ID
    pub id: u32,
    /// True if this is an extended (29-bit) CAN ID
    pub is_extended: bool,
    /// Message name
    pub name: String,
    /// Message size in bytes
    pub size: usize,
    /// Sender ECU name (optional)
    pub sender: Option<String>,
    /// All signals in this message
    pub signals: Vec<SignalDefinition>,
    /// Index of the multiplexer selector signal (if multiplexed)
    pub multiplexor: Option<usize>,
    /// Selector value -> indices of the signals active under it
    pub mux_cases: HashMap<u64, Vec<usize>>,
    /// Checksum placement (if the message declares a CHECKSUM signal)
    pub checksum: Option<ChecksumSpec>,
    /// Index of the rolling-counter signal (if declared)
    pub counter: Option<usize>,
}

impl MessageDefinition {
    /// True if this message carries multiplexed signals.
    pub fn is_multiplexed(&self) -> bool {
        self.multiplexor.is_some()
    }

    /// Look up a signal by name, returning its index and definition.
    pub fn signal(&self, name: &str) -> Option<(usize, &SignalDefinition)> {
        self.signals
            .iter()
            .enumerate()
            .find(|(_, s)| s.name == name)
    }
}

/// The immutable signal database for one bus.
///
/// Built once from DBC source, then shared read-only by encoders and
/// decoders; no internal mutation after construction.
#[derive(Debug, Clone, Serialize)]
pub struct SignalDatabase {
    /// All message definitions by CAN ID
    messages: HashMap<u32, MessageDefinition>,

    /// Message name -> CAN ID, for name-keyed access
    name_lookup: HashMap<String, u32>,
}

impl SignalDatabase {
    /// Build a database from DBC source text.
    pub fn from_dbc_str(text: &str) -> Result<Self> {
        let messages = crate::schema::dbc::parse_dbc(text)?;
        Ok(Self::from_messages(messages))
    }

    /// Build a database from a DBC file on disk.
    pub fn from_dbc_file(path: &Path) -> Result<Self> {
        let messages = crate::schema::dbc::parse_dbc_file(path)?;
        Ok(Self::from_messages(messages))
    }

    fn from_messages(messages: Vec<MessageDefinition>) -> Self {
        let mut by_id = HashMap::new();
        let mut name_lookup = HashMap::new();
        for message in messages {
            name_lookup.insert(message.name.clone(), message.id);
            by_id.insert(message.id, message);
        }
        Self {
            messages: by_id,
            name_lookup,
        }
    }

    /// Get the message definition for a CAN ID.
    pub fn message(&self, can_id: u32) -> Option<&MessageDefinition> {
        self.messages.get(&can_id)
    }

    /// Get a message definition by name.
    pub fn message_by_name(&self, name: &str) -> Option<&MessageDefinition> {
        self.name_lookup.get(name).and_then(|id| self.messages.get(id))
    }

    /// All CAN IDs in the database, sorted.
    pub fn message_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.messages.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Get database statistics
    pub fn stats(&self) -> DatabaseStats {
        let num_messages = self.messages.len();
        let num_signals = self.messages.values().map(|m| m.signals.len()).sum();
        let num_multiplexed = self
            .messages
            .values()
            .filter(|m| m.is_multiplexed())
            .count();
        DatabaseStats {
            num_messages,
            num_signals,
            num_multiplexed,
        }
    }
}

/// Database statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatabaseStats {
    /// Total number of message definitions
    pub num_messages: usize,
    /// Total number of signal definitions
    pub num_signals: usize,
    /// Number of multiplexed messages
    pub num_multiplexed: usize,
}
