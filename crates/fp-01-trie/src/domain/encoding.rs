//! Byte-exact node encodings.
//!
//! These are consumed by external verifiers that recompute node hashes, so
//! the layout and tag values must never change.

use shared_types::{keccak256, Hash};

pub const LEAF_TAG: u8 = 1;
pub const BRANCH_TAG: u8 = 2;
pub const EXTENSION_TAG: u8 = 3;

/// Longest varint accepted when decoding (enough for a 63-bit length).
const MAX_VARINT_BYTES: usize = 9;

/// Append `n` as a varint: one byte below 128, otherwise big-endian
/// base-128 digits with 0x80 set on every byte but the last.
pub fn encode_length(n: usize, out: &mut Vec<u8>) {
    if n < 128 {
        out.push(n as u8);
        return;
    }
    let mut digits = Vec::with_capacity(MAX_VARINT_BYTES);
    let mut rest = n;
    while rest > 0 {
        digits.push((rest & 0x7f) as u8);
        rest >>= 7;
    }
    let last = digits.len() - 1;
    for (i, digit) in digits.iter().rev().enumerate() {
        out.push(if i < last { digit | 0x80 } else { *digit });
    }
}

/// Decode a varint from the front of `input`, returning the value and the
/// number of bytes consumed.
pub fn decode_length(input: &[u8]) -> Option<(usize, usize)> {
    let mut value: usize = 0;
    for (i, byte) in input.iter().take(MAX_VARINT_BYTES).enumerate() {
        value = (value << 7) | (byte & 0x7f) as usize;
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

fn write_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    encode_length(bytes.len(), out);
    out.extend_from_slice(bytes);
}

pub fn leaf_hash(path: &[u8], value: &[u8]) -> Hash {
    let mut buf = Vec::with_capacity(2 + path.len() + value.len() + 4);
    buf.push(LEAF_TAG);
    write_bytes(path, &mut buf);
    write_bytes(value, &mut buf);
    keccak256(&buf)
}

pub fn branch_hash(children: &[Hash; 16], value: Option<&[u8]>) -> Hash {
    let mut buf = Vec::with_capacity(1 + 16 * 32 + value.map_or(0, |v| v.len() + 4));
    buf.push(BRANCH_TAG);
    for child in children {
        buf.extend_from_slice(child);
    }
    if let Some(value) = value {
        write_bytes(value, &mut buf);
    }
    keccak256(&buf)
}

pub fn extension_hash(path: &[u8], child: &Hash) -> Hash {
    let mut buf = Vec::with_capacity(2 + path.len() + 32);
    buf.push(EXTENSION_TAG);
    write_bytes(path, &mut buf);
    buf.extend_from_slice(child);
    keccak256(&buf)
}
