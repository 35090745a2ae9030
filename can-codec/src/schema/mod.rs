//! Schema model and DBC parser
//!
//! This module contains the DBC source parser and the immutable signal
//! database it produces.

pub mod database;
pub mod dbc;

// Re-export key types for convenience
pub use database::{
    ByteOrder, ChecksumSpec, DatabaseStats, MessageDefinition, SignalDatabase, SignalDefinition,
    SignalRole, ValueType,
};
