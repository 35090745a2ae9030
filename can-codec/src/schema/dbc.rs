//! DBC file parser
//!
//! Parses DBC source text into message definitions in a single forward pass.
//! Message (`BO_`) and signal (`SG_`) declarations are consumed directly;
//! extended multiplexing (`SG_MUL_VAL_`) and checksum-algorithm attributes
//! (`BA_ "ChecksumKind"`) are collected during the pass and cross-validated
//! once all messages have been seen, so they may reference messages declared
//! later in the file. Any unresolved reference is a hard parse failure:
//! schemas feed safety-relevant decode paths and must fail closed.
//!
//! Lines starting with keywords the codec has no use for (`VERSION`, `NS_`,
//! `BU_`, `CM_`, `VAL_`, ...) are skipped, which is standard practice for
//! DBC consumers.

use crate::bits;
use crate::integrity::ChecksumKind;
use crate::schema::database::{
    ByteOrder, ChecksumSpec, MessageDefinition, SignalDefinition, SignalRole, ValueType,
};
use crate::types::{CodecError, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Bit 31 marks an extended (29-bit) CAN ID in DBC message IDs.
const EXTENDED_ID_FLAG: u32 = 0x8000_0000;
const EXTENDED_ID_MASK: u32 = 0x1FFF_FFFF;

/// Cap on how many discrete selector values one SG_MUL_VAL_ entry may expand
/// to; ranges beyond this are treated as schema defects.
const MAX_SELECTOR_VALUES: usize = 1024;

/// Parse a DBC file and return message definitions
pub fn parse_dbc_file(path: &Path) -> Result<Vec<MessageDefinition>> {
    log::info!("Parsing DBC file: {:?}", path);

    // Read as bytes first (handle non-UTF8 encodings)
    let bytes = std::fs::read(path)?;

    // Try UTF-8 first, then fall back to Latin-1 (compatible with
    // Windows-1252 exports from common DBC tooling)
    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("DBC file is not UTF-8, trying Latin-1 encoding");
            e.into_bytes().iter().map(|&b| b as char).collect()
        }
    };

    let messages = parse_dbc(&text)?;
    log::info!("Parsed {} messages from {:?}", messages.len(), path);
    Ok(messages)
}

/// Parse DBC source text and return message definitions
pub fn parse_dbc(text: &str) -> Result<Vec<MessageDefinition>> {
    let mut messages: Vec<(usize, MessageDefinition)> = Vec::new();
    let mut seen_ids: HashSet<u32> = HashSet::new();
    let mut current: Option<(usize, MessageDefinition)> = None;
    let mut mul_vals: Vec<MulValEntry> = Vec::new();
    let mut checksum_attrs: Vec<ChecksumAttr> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.starts_with("BO_ ") {
            if let Some(finished) = current.take() {
                messages.push(finished);
            }
            let message = parse_message_header(line_no, line)?;
            if !seen_ids.insert(message.id) {
                return Err(parse_error(
                    line_no,
                    format!("duplicate frame ID 0x{:X}", message.id),
                ));
            }
            current = Some((line_no, message));
        } else if line.starts_with("SG_MUL_VAL_ ") {
            mul_vals.push(parse_mul_val(line_no, line)?);
        } else if line.starts_with("SG_ ") {
            let signal = parse_signal_line(line_no, line)?;
            match current.as_mut() {
                Some((_, message)) => {
                    if message.signals.iter().any(|s| s.name == signal.name) {
                        return Err(parse_error(
                            line_no,
                            format!(
                                "duplicate signal name '{}' in message '{}'",
                                signal.name, message.name
                            ),
                        ));
                    }
                    message.signals.push(signal);
                }
                None => {
                    return Err(parse_error(line_no, "SG_ line outside of a BO_ message block"))
                }
            }
        } else if line.starts_with("BA_ ") {
            if let Some(attr) = parse_checksum_attr(line_no, line)? {
                checksum_attrs.push(attr);
            }
        }
        // every other keyword is not ours to interpret
    }
    if let Some(finished) = current.take() {
        messages.push(finished);
    }

    apply_mul_vals(&mut messages, mul_vals)?;
    let attrs = collect_checksum_attrs(&messages, checksum_attrs)?;
    for (line, message) in &mut messages {
        finalize_message(*line, message, attrs.get(&message.id).copied())?;
    }

    Ok(messages.into_iter().map(|(_, m)| m).collect())
}

fn parse_error(line: usize, reason: impl Into<String>) -> CodecError {
    CodecError::Parse {
        line,
        reason: reason.into(),
    }
}

fn normalize_id(raw: u32) -> (u32, bool) {
    if raw & EXTENDED_ID_FLAG != 0 {
        (raw & EXTENDED_ID_MASK, true)
    } else {
        (raw, false)
    }
}

/// Parse `BO_ <id> <name>: <size> <sender>`
fn parse_message_header(line_no: usize, line: &str) -> Result<MessageDefinition> {
    let rest = line["BO_".len()..].trim_start();
    let (head, tail) = rest
        .split_once(':')
        .ok_or_else(|| parse_error(line_no, "malformed BO_ line: missing ':'"))?;

    let mut head_parts = head.split_whitespace();
    let raw_id: u32 = head_parts
        .next()
        .ok_or_else(|| parse_error(line_no, "BO_ line missing frame ID"))?
        .parse()
        .map_err(|_| parse_error(line_no, "BO_ frame ID is not a number"))?;
    let name = head_parts
        .next()
        .ok_or_else(|| parse_error(line_no, "BO_ line missing message name"))?;
    if head_parts.next().is_some() {
        return Err(parse_error(line_no, "unexpected token before ':' in BO_ line"));
    }

    let mut tail_parts = tail.split_whitespace();
    let size: usize = tail_parts
        .next()
        .ok_or_else(|| parse_error(line_no, "BO_ line missing message size"))?
        .parse()
        .map_err(|_| parse_error(line_no, "BO_ message size is not a number"))?;
    if !(1..=64).contains(&size) {
        return Err(parse_error(
            line_no,
            format!("message size {} outside supported range 1..=64", size),
        ));
    }
    let sender = tail_parts
        .next()
        .filter(|s| *s != "Vector__XXX")
        .map(String::from);

    let (id, is_extended) = normalize_id(raw_id);
    Ok(MessageDefinition {
        id,
        is_extended,
        name: name.to_string(),
        size,
        sender,
        signals: Vec::new(),
        multiplexor: None,
        mux_cases: HashMap::new(),
        checksum: None,
        counter: None,
    })
}

/// Parse `SG_ <name> [M|m<N>] : <start>|<len>@<order><sign> (<factor>,<offset>) [<min>|<max>] "<unit>" <receivers>`
fn parse_signal_line(line_no: usize, line: &str) -> Result<SignalDefinition> {
    let rest = line["SG_".len()..].trim_start();
    let (head, tail) = rest
        .split_once(':')
        .ok_or_else(|| parse_error(line_no, "malformed SG_ line: missing ':'"))?;

    let mut head_parts = head.split_whitespace();
    let name = head_parts
        .next()
        .ok_or_else(|| parse_error(line_no, "SG_ line missing signal name"))?
        .to_string();
    let mux_token = head_parts.next();
    if head_parts.next().is_some() {
        return Err(parse_error(line_no, "unexpected token before ':' in SG_ line"));
    }

    let mut parts = tail.split_whitespace();

    // <start>|<len>@<order><sign>
    let layout = parts
        .next()
        .ok_or_else(|| parse_error(line_no, "SG_ line missing bit layout"))?;
    let (start_s, rest) = layout
        .split_once('|')
        .ok_or_else(|| parse_error(line_no, "malformed bit layout: missing '|'"))?;
    let (len_s, order_sign) = rest
        .split_once('@')
        .ok_or_else(|| parse_error(line_no, "malformed bit layout: missing '@'"))?;
    let start_bit: u16 = start_s
        .parse()
        .map_err(|_| parse_error(line_no, "signal start bit is not a number"))?;
    let length: u16 = len_s
        .parse()
        .map_err(|_| parse_error(line_no, "signal length is not a number"))?;
    if length == 0 || length > 64 {
        return Err(parse_error(
            line_no,
            format!("signal length {} outside supported range 1..=64", length),
        ));
    }
    let mut order_sign_chars = order_sign.chars();
    let byte_order = match order_sign_chars.next() {
        Some('1') => ByteOrder::LittleEndian,
        Some('0') => ByteOrder::BigEndian,
        _ => return Err(parse_error(line_no, "byte order token must be '0' or '1'")),
    };
    let value_type = match order_sign_chars.next() {
        Some('+') => ValueType::Unsigned,
        Some('-') => ValueType::Signed,
        _ => return Err(parse_error(line_no, "sign token must be '+' or '-'")),
    };
    if order_sign_chars.next().is_some() {
        return Err(parse_error(line_no, "trailing characters after sign token"));
    }

    // (<factor>,<offset>)
    let scaling = parts
        .next()
        .ok_or_else(|| parse_error(line_no, "SG_ line missing (factor,offset)"))?;
    let scaling = scaling
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| parse_error(line_no, "malformed (factor,offset) group"))?;
    let (factor_s, offset_s) = scaling
        .split_once(',')
        .ok_or_else(|| parse_error(line_no, "malformed (factor,offset) group"))?;
    let factor: f64 = factor_s
        .parse()
        .map_err(|_| parse_error(line_no, "signal factor is not a number"))?;
    let offset: f64 = offset_s
        .parse()
        .map_err(|_| parse_error(line_no, "signal offset is not a number"))?;
    if factor == 0.0 {
        return Err(parse_error(line_no, "signal factor must be non-zero"));
    }

    // [<min>|<max>]
    let range = parts
        .next()
        .ok_or_else(|| parse_error(line_no, "SG_ line missing [min|max]"))?;
    let range = range
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| parse_error(line_no, "malformed [min|max] group"))?;
    let (min_s, max_s) = range
        .split_once('|')
        .ok_or_else(|| parse_error(line_no, "malformed [min|max] group"))?;
    let min: f64 = min_s
        .parse()
        .map_err(|_| parse_error(line_no, "signal min is not a number"))?;
    let max: f64 = max_s
        .parse()
        .map_err(|_| parse_error(line_no, "signal max is not a number"))?;

    // "<unit>" -- scanned by quotes since units may contain spaces
    let unit = match tail.find('"') {
        Some(open) => {
            let after = &tail[open + 1..];
            let close = after
                .find('"')
                .ok_or_else(|| parse_error(line_no, "unterminated unit string"))?;
            let unit = &after[..close];
            if unit.is_empty() {
                None
            } else {
                Some(unit.to_string())
            }
        }
        None => return Err(parse_error(line_no, "SG_ line missing unit string")),
    };

    // Checksum/counter roles follow the naming convention; they are never
    // multiplexed.
    let role = if name == "CHECKSUM" || name == "COUNTER" {
        if mux_token.is_some() {
            return Err(parse_error(
                line_no,
                format!("integrity signal '{}' cannot carry a multiplex marker", name),
            ));
        }
        if name == "CHECKSUM" {
            SignalRole::Checksum
        } else {
            SignalRole::Counter
        }
    } else {
        match mux_token {
            None => SignalRole::Plain,
            Some("M") => SignalRole::MuxSelector,
            Some(tok) if tok.starts_with('m') => {
                if tok.ends_with('M') {
                    return Err(parse_error(line_no, "nested multiplexing is not supported"));
                }
                let value: u64 = tok[1..]
                    .parse()
                    .map_err(|_| parse_error(line_no, "multiplex marker value is not a number"))?;
                SignalRole::Multiplexed {
                    selector_values: vec![value],
                }
            }
            Some(tok) => {
                return Err(parse_error(
                    line_no,
                    format!("unrecognized multiplex marker '{}'", tok),
                ))
            }
        }
    };

    Ok(SignalDefinition {
        name,
        start_bit,
        length,
        byte_order,
        value_type,
        factor,
        offset,
        min,
        max,
        unit,
        role,
    })
}

struct MulValEntry {
    line: usize,
    message_id: u32,
    signal: String,
    selector: String,
    values: Vec<u64>,
}

/// Parse `SG_MUL_VAL_ <id> <signal> <selector> <lo>-<hi>[, ...];`
fn parse_mul_val(line_no: usize, line: &str) -> Result<MulValEntry> {
    let rest = line["SG_MUL_VAL_".len()..].trim();
    let rest = rest
        .strip_suffix(';')
        .ok_or_else(|| parse_error(line_no, "SG_MUL_VAL_ line must end with ';'"))?;

    let mut parts = rest.split_whitespace();
    let raw_id: u32 = parts
        .next()
        .ok_or_else(|| parse_error(line_no, "SG_MUL_VAL_ missing frame ID"))?
        .parse()
        .map_err(|_| parse_error(line_no, "SG_MUL_VAL_ frame ID is not a number"))?;
    let signal = parts
        .next()
        .ok_or_else(|| parse_error(line_no, "SG_MUL_VAL_ missing signal name"))?
        .to_string();
    let selector = parts
        .next()
        .ok_or_else(|| parse_error(line_no, "SG_MUL_VAL_ missing selector name"))?
        .to_string();

    // remaining tokens are "lo-hi" ranges, comma separated, spaces allowed
    let ranges: String = parts.collect();
    if ranges.is_empty() {
        return Err(parse_error(line_no, "SG_MUL_VAL_ missing selector value ranges"));
    }

    let mut values = Vec::new();
    for range in ranges.split(',') {
        let (lo_s, hi_s) = range
            .split_once('-')
            .ok_or_else(|| parse_error(line_no, "malformed selector value range"))?;
        let lo: u64 = lo_s
            .parse()
            .map_err(|_| parse_error(line_no, "selector range bound is not a number"))?;
        let hi: u64 = hi_s
            .parse()
            .map_err(|_| parse_error(line_no, "selector range bound is not a number"))?;
        if hi < lo {
            return Err(parse_error(line_no, "selector value range is inverted"));
        }
        let span = hi - lo;
        if span >= MAX_SELECTOR_VALUES as u64
            || values.len() + span as usize + 1 > MAX_SELECTOR_VALUES
        {
            return Err(parse_error(
                line_no,
                format!("selector value range expands past {} values", MAX_SELECTOR_VALUES),
            ));
        }
        values.extend(lo..=hi);
    }

    Ok(MulValEntry {
        line: line_no,
        message_id: normalize_id(raw_id).0,
        signal,
        selector,
        values,
    })
}

struct ChecksumAttr {
    line: usize,
    message_id: u32,
    kind: ChecksumKind,
}

/// Recognize `BA_ "ChecksumKind" BO_ <id> "<algorithm>";`; any other BA_
/// attribute is skipped.
fn parse_checksum_attr(line_no: usize, line: &str) -> Result<Option<ChecksumAttr>> {
    let rest = line["BA_".len()..].trim_start();
    let rest = match rest.strip_prefix("\"ChecksumKind\"") {
        Some(r) => r.trim_start(),
        None => return Ok(None),
    };

    let rest = rest
        .strip_suffix(';')
        .ok_or_else(|| parse_error(line_no, "ChecksumKind attribute must end with ';'"))?;
    let rest = rest
        .strip_prefix("BO_")
        .ok_or_else(|| parse_error(line_no, "ChecksumKind attribute must target a BO_ message"))?
        .trim();

    let (id_s, value_s) = rest
        .split_once(char::is_whitespace)
        .ok_or_else(|| parse_error(line_no, "ChecksumKind attribute missing value"))?;
    let raw_id: u32 = id_s
        .parse()
        .map_err(|_| parse_error(line_no, "ChecksumKind frame ID is not a number"))?;
    let value = value_s
        .trim()
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| parse_error(line_no, "ChecksumKind value must be a quoted string"))?;
    let kind = ChecksumKind::from_attribute(value)
        .ok_or_else(|| parse_error(line_no, format!("unknown checksum algorithm '{}'", value)))?;

    Ok(Some(ChecksumAttr {
        line: line_no,
        message_id: normalize_id(raw_id).0,
        kind,
    }))
}

/// Rewrite multiplexed signals' selector values from SG_MUL_VAL_ entries.
fn apply_mul_vals(
    messages: &mut [(usize, MessageDefinition)],
    entries: Vec<MulValEntry>,
) -> Result<()> {
    for entry in entries {
        let (_, message) = messages
            .iter_mut()
            .find(|(_, m)| m.id == entry.message_id)
            .ok_or_else(|| {
                parse_error(
                    entry.line,
                    format!("SG_MUL_VAL_ references unknown frame ID 0x{:X}", entry.message_id),
                )
            })?;

        let selector_ok = message
            .signals
            .iter()
            .any(|s| s.name == entry.selector && matches!(s.role, SignalRole::MuxSelector));
        if !selector_ok {
            return Err(parse_error(
                entry.line,
                format!(
                    "SG_MUL_VAL_ references '{}' which is not the multiplexor of message '{}'",
                    entry.selector, message.name
                ),
            ));
        }

        let message_name = message.name.clone();
        let signal = message
            .signals
            .iter_mut()
            .find(|s| s.name == entry.signal)
            .ok_or_else(|| {
                parse_error(
                    entry.line,
                    format!(
                        "SG_MUL_VAL_ references unknown signal '{}' in message '{}'",
                        entry.signal, message_name
                    ),
                )
            })?;
        match &mut signal.role {
            SignalRole::Multiplexed { selector_values } => {
                *selector_values = entry.values;
            }
            _ => {
                return Err(parse_error(
                    entry.line,
                    format!("SG_MUL_VAL_ targets non-multiplexed signal '{}'", entry.signal),
                ))
            }
        }
    }
    Ok(())
}

fn collect_checksum_attrs(
    messages: &[(usize, MessageDefinition)],
    attrs: Vec<ChecksumAttr>,
) -> Result<HashMap<u32, (usize, ChecksumKind)>> {
    let mut by_id: HashMap<u32, (usize, ChecksumKind)> = HashMap::new();
    for attr in attrs {
        if !messages.iter().any(|(_, m)| m.id == attr.message_id) {
            return Err(parse_error(
                attr.line,
                format!("ChecksumKind attribute references unknown frame ID 0x{:X}", attr.message_id),
            ));
        }
        if by_id.insert(attr.message_id, (attr.line, attr.kind)).is_some() {
            return Err(parse_error(
                attr.line,
                format!("duplicate ChecksumKind attribute for frame ID 0x{:X}", attr.message_id),
            ));
        }
    }
    Ok(by_id)
}

/// Resolve multiplexing, integrity roles, and geometry for one message.
///
/// Runs after SG_MUL_VAL_ and attribute application, so the full signal set
/// and selector values are known.
fn finalize_message(
    line: usize,
    message: &mut MessageDefinition,
    checksum_attr: Option<(usize, ChecksumKind)>,
) -> Result<()> {
    // multiplexing structure
    let selectors: Vec<usize> = message
        .signals
        .iter()
        .enumerate()
        .filter(|(_, s)| matches!(s.role, SignalRole::MuxSelector))
        .map(|(i, _)| i)
        .collect();
    if selectors.len() > 1 {
        return Err(parse_error(
            line,
            format!("message '{}' declares more than one multiplexor", message.name),
        ));
    }
    message.multiplexor = selectors.first().copied();

    let has_multiplexed = message
        .signals
        .iter()
        .any(|s| matches!(s.role, SignalRole::Multiplexed { .. }));
    if has_multiplexed && message.multiplexor.is_none() {
        return Err(parse_error(
            line,
            format!(
                "message '{}' has multiplexed signals but no multiplexor",
                message.name
            ),
        ));
    }
    if message.multiplexor.is_some() && !has_multiplexed {
        log::warn!(
            "message '{}' declares a multiplexor but no multiplexed signals",
            message.name
        );
    }
    if let Some(idx) = message.multiplexor {
        if message.signals[idx].value_type != ValueType::Unsigned {
            return Err(parse_error(
                line,
                format!("multiplexor '{}' must be unsigned", message.signals[idx].name),
            ));
        }
    }

    let mut mux_cases: HashMap<u64, Vec<usize>> = HashMap::new();
    for (idx, signal) in message.signals.iter().enumerate() {
        if let SignalRole::Multiplexed { selector_values } = &signal.role {
            for value in selector_values {
                mux_cases.entry(*value).or_default().push(idx);
            }
        }
    }
    message.mux_cases = mux_cases;

    // integrity roles (at most one of each; signal names are unique)
    for (idx, signal) in message.signals.iter().enumerate() {
        match signal.role {
            SignalRole::Checksum => {
                let aligned = match signal.byte_order {
                    ByteOrder::LittleEndian => signal.start_bit % 8 == 0,
                    ByteOrder::BigEndian => signal.start_bit % 8 == 7,
                };
                if signal.length != 8 || !aligned {
                    return Err(parse_error(
                        line,
                        format!(
                            "checksum signal in message '{}' must be one byte-aligned byte",
                            message.name
                        ),
                    ));
                }
                if signal.value_type != ValueType::Unsigned
                    || signal.factor != 1.0
                    || signal.offset != 0.0
                {
                    return Err(parse_error(
                        line,
                        format!(
                            "checksum signal in message '{}' must be a raw unsigned byte",
                            message.name
                        ),
                    ));
                }
                message.checksum = Some(ChecksumSpec {
                    signal: idx,
                    byte: signal.start_bit as usize / 8,
                    kind: checksum_attr.map(|(_, k)| k).unwrap_or(ChecksumKind::Xor),
                });
            }
            SignalRole::Counter => {
                if signal.length > 8
                    || signal.value_type != ValueType::Unsigned
                    || signal.factor != 1.0
                    || signal.offset != 0.0
                {
                    return Err(parse_error(
                        line,
                        format!(
                            "counter signal in message '{}' must be a raw unsigned field of at most 8 bits",
                            message.name
                        ),
                    ));
                }
                message.counter = Some(idx);
            }
            _ => {}
        }
    }
    if let Some((attr_line, _)) = checksum_attr {
        if message.checksum.is_none() {
            return Err(parse_error(
                attr_line,
                format!(
                    "ChecksumKind attribute on message '{}' which has no CHECKSUM signal",
                    message.name
                ),
            ));
        }
    }

    // geometry: every signal must fit the frame, and signals that can be
    // active at the same time must not overlap. Masks are produced by the
    // same bit writer the codec uses at runtime.
    let mut masks: Vec<Vec<u8>> = Vec::with_capacity(message.signals.len());
    for signal in &message.signals {
        let mut mask = vec![0u8; message.size];
        let ones = if signal.length == 64 {
            u64::MAX
        } else {
            (1u64 << signal.length) - 1
        };
        bits::write_bits(&mut mask, signal.start_bit, signal.length, signal.byte_order, ones)
            .map_err(|_| {
                parse_error(
                    line,
                    format!(
                        "signal '{}' exceeds the {}-byte frame of message '{}'",
                        signal.name, message.size, message.name
                    ),
                )
            })?;
        masks.push(mask);
    }
    for i in 0..message.signals.len() {
        for j in (i + 1)..message.signals.len() {
            if !can_coexist(&message.signals[i], &message.signals[j]) {
                continue;
            }
            let overlapping = masks[i]
                .iter()
                .zip(masks[j].iter())
                .any(|(a, b)| a & b != 0);
            if overlapping {
                return Err(parse_error(
                    line,
                    format!(
                        "signals '{}' and '{}' overlap in message '{}'",
                        message.signals[i].name, message.signals[j].name, message.name
                    ),
                ));
            }
        }
    }

    Ok(())
}

/// Two signals can be simultaneously active unless they are multiplexed
/// under disjoint selector values.
fn can_coexist(a: &SignalDefinition, b: &SignalDefinition) -> bool {
    match (&a.role, &b.role) {
        (
            SignalRole::Multiplexed { selector_values: va },
            SignalRole::Multiplexed { selector_values: vb },
        ) => va.iter().any(|v| vb.contains(v)),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_simple_dbc() {
        let dbc_content = r#"
VERSION ""

NS_ :
    NS_DESC_
    CM_
    BA_DEF_

BS_:

BU_: ECU1 ECU2

BO_ 291 EngineData: 8 ECU1
 SG_ EngineSpeed : 0|16@1+ (1,0) [0|8000] "rpm" ECU2
 SG_ EngineTemp : 16|8@1+ (1,-40) [-40|215] "C" ECU2

BO_ 512 BatteryStatus: 8 ECU1
 SG_ BatteryVoltage : 0|16@1+ (0.01,0) [0|16] "V" ECU2
"#;

        let messages = parse_dbc(dbc_content).unwrap();
        assert_eq!(messages.len(), 2);

        let msg = &messages[0];
        assert_eq!(msg.id, 291);
        assert_eq!(msg.name, "EngineData");
        assert_eq!(msg.size, 8);
        assert_eq!(msg.sender, Some("ECU1".to_string()));
        assert!(!msg.is_extended);
        assert_eq!(msg.signals.len(), 2);

        let sig = &msg.signals[0];
        assert_eq!(sig.name, "EngineSpeed");
        assert_eq!(sig.start_bit, 0);
        assert_eq!(sig.length, 16);
        assert_eq!(sig.byte_order, ByteOrder::LittleEndian);
        assert_eq!(sig.value_type, ValueType::Unsigned);
        assert_eq!(sig.factor, 1.0);
        assert_eq!(sig.offset, 0.0);
        assert_eq!(sig.unit, Some("rpm".to_string()));
        assert_eq!(sig.role, SignalRole::Plain);

        let temp = &msg.signals[1];
        assert_eq!(temp.offset, -40.0);
    }

    #[test]
    fn test_parse_dbc_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"BO_ 291 EngineData: 8 ECU1\n SG_ EngineSpeed : 0|16@1+ (1,0) [0|8000] \"rpm\" ECU2\n")
            .unwrap();
        temp_file.flush().unwrap();

        let messages = parse_dbc_file(temp_file.path()).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].name, "EngineData");
    }

    #[test]
    fn test_parse_multiplexed_message() {
        let dbc_content = r#"
BO_ 512 MultiplexedMsg: 8 ECU1
 SG_ Mode M : 0|8@1+ (1,0) [0|3] "" ECU1
 SG_ SignalA m0 : 8|16@1+ (1,0) [0|100] "%" ECU1
 SG_ SignalB m1 : 8|16@1+ (0.1,0) [0|1000] "mV" ECU1
"#;

        let messages = parse_dbc(dbc_content).unwrap();
        let msg = &messages[0];
        assert!(msg.is_multiplexed());
        assert_eq!(msg.multiplexor, Some(0));
        assert_eq!(msg.mux_cases[&0], vec![1]);
        assert_eq!(msg.mux_cases[&1], vec![2]);
    }

    #[test]
    fn test_extended_multiplexing() {
        let dbc_content = r#"
BO_ 512 MultiplexedMsg: 8 ECU1
 SG_ Mode M : 0|8@1+ (1,0) [0|7] "" ECU1
 SG_ SignalA m0 : 8|16@1+ (1,0) [0|100] "%" ECU1

SG_MUL_VAL_ 512 SignalA Mode 0-2, 5-5;
"#;

        let messages = parse_dbc(dbc_content).unwrap();
        let msg = &messages[0];
        assert_eq!(
            msg.signals[1].role,
            SignalRole::Multiplexed {
                selector_values: vec![0, 1, 2, 5]
            }
        );
        assert_eq!(msg.mux_cases.len(), 4);
    }

    #[test]
    fn test_checksum_and_counter_roles() {
        let dbc_content = r#"
BO_ 299 SafetyCmd: 8 ECU1
 SG_ CHECKSUM : 0|8@1+ (1,0) [0|255] "" ECU2
 SG_ COUNTER : 8|4@1+ (1,0) [0|15] "" ECU2
 SG_ Torque : 16|12@1+ (0.5,0) [0|2047.5] "Nm" ECU2

BA_ "ChecksumKind" BO_ 299 "crc8_h2f";
"#;

        let messages = parse_dbc(dbc_content).unwrap();
        let msg = &messages[0];
        let checksum = msg.checksum.unwrap();
        assert_eq!(checksum.signal, 0);
        assert_eq!(checksum.byte, 0);
        assert_eq!(checksum.kind, ChecksumKind::Crc8Autosar);
        assert_eq!(msg.counter, Some(1));
    }

    #[test]
    fn test_checksum_defaults_to_xor() {
        let dbc_content = r#"
BO_ 299 SafetyCmd: 8 ECU1
 SG_ CHECKSUM : 0|8@1+ (1,0) [0|255] "" ECU2
"#;

        let messages = parse_dbc(dbc_content).unwrap();
        assert_eq!(messages[0].checksum.unwrap().kind, ChecksumKind::Xor);
    }

    #[test]
    fn test_extended_id_flag() {
        let dbc_content = r#"
BO_ 2566844934 DiagMsg: 8 ECU1
 SG_ Status : 0|8@1+ (1,0) [0|255] "" ECU2
"#;

        let messages = parse_dbc(dbc_content).unwrap();
        assert!(messages[0].is_extended);
        assert_eq!(messages[0].id, 2566844934 & 0x1FFF_FFFF);
    }

    #[test]
    fn test_duplicate_frame_id_rejected() {
        let dbc_content = r#"
BO_ 291 First: 8 ECU1
 SG_ A : 0|8@1+ (1,0) [0|255] "" ECU2

BO_ 291 Second: 8 ECU1
 SG_ B : 0|8@1+ (1,0) [0|255] "" ECU2
"#;

        assert!(matches!(
            parse_dbc(dbc_content),
            Err(CodecError::Parse { .. })
        ));
    }

    #[test]
    fn test_duplicate_signal_name_rejected() {
        let dbc_content = r#"
BO_ 291 EngineData: 8 ECU1
 SG_ Speed : 0|8@1+ (1,0) [0|255] "" ECU2
 SG_ Speed : 8|8@1+ (1,0) [0|255] "" ECU2
"#;

        assert!(matches!(
            parse_dbc(dbc_content),
            Err(CodecError::Parse { .. })
        ));
    }

    #[test]
    fn test_signal_exceeding_frame_rejected() {
        let dbc_content = r#"
BO_ 291 EngineData: 2 ECU1
 SG_ Speed : 8|16@1+ (1,0) [0|65535] "" ECU2
"#;

        let err = parse_dbc(dbc_content).unwrap_err();
        match err {
            CodecError::Parse { reason, .. } => assert!(reason.contains("exceeds")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_overlapping_shared_signals_rejected() {
        let dbc_content = r#"
BO_ 291 EngineData: 8 ECU1
 SG_ A : 0|12@1+ (1,0) [0|4095] "" ECU2
 SG_ B : 8|8@1+ (1,0) [0|255] "" ECU2
"#;

        let err = parse_dbc(dbc_content).unwrap_err();
        match err {
            CodecError::Parse { reason, .. } => assert!(reason.contains("overlap")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_multiplexed_variants_may_share_bits() {
        let dbc_content = r#"
BO_ 512 MultiplexedMsg: 8 ECU1
 SG_ Mode M : 0|8@1+ (1,0) [0|3] "" ECU1
 SG_ SignalA m0 : 8|16@1+ (1,0) [0|100] "%" ECU1
 SG_ SignalB m1 : 8|16@1+ (0.1,0) [0|1000] "mV" ECU1
"#;

        assert!(parse_dbc(dbc_content).is_ok());
    }

    #[test]
    fn test_shared_overlapping_multiplexed_rejected() {
        let dbc_content = r#"
BO_ 512 MultiplexedMsg: 8 ECU1
 SG_ Mode M : 0|8@1+ (1,0) [0|3] "" ECU1
 SG_ Shared : 8|16@1+ (1,0) [0|100] "" ECU1
 SG_ SignalA m0 : 16|16@1+ (1,0) [0|100] "%" ECU1
"#;

        let err = parse_dbc(dbc_content).unwrap_err();
        match err {
            CodecError::Parse { reason, .. } => assert!(reason.contains("overlap")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_multiplexed_without_multiplexor_rejected() {
        let dbc_content = r#"
BO_ 512 MultiplexedMsg: 8 ECU1
 SG_ SignalA m0 : 8|16@1+ (1,0) [0|100] "%" ECU1
"#;

        let err = parse_dbc(dbc_content).unwrap_err();
        match err {
            CodecError::Parse { reason, .. } => assert!(reason.contains("no multiplexor")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_mul_val_unknown_selector_rejected() {
        let dbc_content = r#"
BO_ 512 MultiplexedMsg: 8 ECU1
 SG_ Mode M : 0|8@1+ (1,0) [0|3] "" ECU1
 SG_ SignalA m0 : 8|16@1+ (1,0) [0|100] "%" ECU1

SG_MUL_VAL_ 512 SignalA Missing 0-1;
"#;

        assert!(matches!(
            parse_dbc(dbc_content),
            Err(CodecError::Parse { .. })
        ));
    }

    #[test]
    fn test_unknown_checksum_algorithm_rejected() {
        let dbc_content = r#"
BO_ 299 SafetyCmd: 8 ECU1
 SG_ CHECKSUM : 0|8@1+ (1,0) [0|255] "" ECU2

BA_ "ChecksumKind" BO_ 299 "crc16";
"#;

        assert!(matches!(
            parse_dbc(dbc_content),
            Err(CodecError::Parse { .. })
        ));
    }

    #[test]
    fn test_misaligned_checksum_rejected() {
        let dbc_content = r#"
BO_ 299 SafetyCmd: 8 ECU1
 SG_ CHECKSUM : 4|8@1+ (1,0) [0|255] "" ECU2
"#;

        assert!(matches!(
            parse_dbc(dbc_content),
            Err(CodecError::Parse { .. })
        ));
    }

    #[test]
    fn test_signal_outside_message_rejected() {
        let dbc_content = r#" SG_ Orphan : 0|8@1+ (1,0) [0|255] "" ECU2"#;

        assert!(matches!(
            parse_dbc(dbc_content),
            Err(CodecError::Parse { .. })
        ));
    }

    #[test]
    fn test_big_endian_signal_geometry() {
        // Motorola start bit 7 = MSB of byte 0; a 16-bit signal reaches the
        // end of a 2-byte frame exactly.
        let dbc_content = r#"
BO_ 291 Short: 2 ECU1
 SG_ Wide : 7|16@0+ (1,0) [0|65535] "" ECU2
"#;

        let messages = parse_dbc(dbc_content).unwrap();
        assert_eq!(messages[0].signals[0].byte_order, ByteOrder::BigEndian);
    }
}
