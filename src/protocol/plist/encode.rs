use std::collections::HashMap;

use thiserror::Error;

use super::PlistValue;

/// Errors that can occur during plist encoding
#[derive(Debug, Error)]
pub enum PlistEncodeError {
    /// Too many objects for an 8-byte reference
    #[error("too many objects: {0}")]
    TooManyObjects(usize),
}

/// Encode a `PlistValue` to binary plist format
///
/// Dictionary keys are written in sorted order and identical strings share
/// one object, so equal values always encode to identical bytes.
///
/// # Errors
///
/// Returns [`PlistEncodeError`] if the object graph cannot be addressed.
pub fn encode(value: &PlistValue) -> Result<Vec<u8>, PlistEncodeError> {
    let mut encoder = Encoder::default();
    let root = encoder.add(value);
    encoder.finish(root)
}

enum Node {
    Leaf(Vec<u8>),
    Array(Vec<usize>),
    Dict(Vec<usize>, Vec<usize>),
}

#[derive(Default)]
struct Encoder {
    nodes: Vec<Node>,
    strings: HashMap<String, usize>,
}

impl Encoder {
    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn add_string(&mut self, s: &str) -> usize {
        if let Some(&index) = self.strings.get(s) {
            return index;
        }
        let index = self.push(Node::Leaf(string_bytes(s)));
        self.strings.insert(s.to_string(), index);
        index
    }

    fn add(&mut self, value: &PlistValue) -> usize {
        match value {
            PlistValue::String(s) => self.add_string(s),
            PlistValue::Array(items) => {
                let index = self.push(Node::Array(Vec::new()));
                let refs = items.iter().map(|item| self.add(item)).collect();
                self.nodes[index] = Node::Array(refs);
                index
            }
            PlistValue::Dictionary(dict) => {
                let index = self.push(Node::Dict(Vec::new(), Vec::new()));
                let mut keys: Vec<&String> = dict.keys().collect();
                keys.sort();
                let key_refs = keys.iter().map(|k| self.add_string(k)).collect();
                let value_refs = keys.iter().map(|k| self.add(&dict[*k])).collect();
                self.nodes[index] = Node::Dict(key_refs, value_refs);
                index
            }
            leaf => self.push(Node::Leaf(leaf_bytes(leaf))),
        }
    }

    fn finish(self, root: usize) -> Result<Vec<u8>, PlistEncodeError> {
        let count = self.nodes.len();
        let ref_size = min_width(count as u64);
        if ref_size > 8 {
            return Err(PlistEncodeError::TooManyObjects(count));
        }

        let mut out = b"bplist00".to_vec();
        let mut offsets = Vec::with_capacity(count);
        for node in &self.nodes {
            offsets.push(out.len() as u64);
            match node {
                Node::Leaf(bytes) => out.extend_from_slice(bytes),
                Node::Array(refs) => {
                    write_header(&mut out, 0xA, refs.len());
                    for r in refs {
                        write_uint(&mut out, *r as u64, ref_size);
                    }
                }
                Node::Dict(keys, values) => {
                    write_header(&mut out, 0xD, keys.len());
                    for r in keys.iter().chain(values) {
                        write_uint(&mut out, *r as u64, ref_size);
                    }
                }
            }
        }

        let table_offset = out.len() as u64;
        let offset_size = min_width(table_offset);
        for offset in offsets {
            write_uint(&mut out, offset, offset_size);
        }

        // Trailer: 6 unused bytes, offset size, ref size, then three u64 fields
        out.extend_from_slice(&[0u8; 6]);
        #[allow(clippy::cast_possible_truncation)]
        {
            out.push(offset_size as u8);
            out.push(ref_size as u8);
        }
        out.extend_from_slice(&(count as u64).to_be_bytes());
        out.extend_from_slice(&(root as u64).to_be_bytes());
        out.extend_from_slice(&table_offset.to_be_bytes());
        Ok(out)
    }
}

/// Smallest of 1, 2, 4 or 8 bytes able to hold `value`
fn min_width(value: u64) -> usize {
    match value {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFFFF_FFFF => 4,
        _ => 8,
    }
}

fn write_uint(out: &mut Vec<u8>, value: u64, width: usize) {
    out.extend_from_slice(&value.to_be_bytes()[8 - width..]);
}

fn write_header(out: &mut Vec<u8>, kind: u8, len: usize) {
    if len < 0x0F {
        #[allow(clippy::cast_possible_truncation)]
        out.push((kind << 4) | len as u8);
    } else {
        out.push((kind << 4) | 0x0F);
        write_int(out, len as u64);
    }
}

fn write_int(out: &mut Vec<u8>, value: u64) {
    let width = min_width(value);
    let exp = match width {
        1 => 0,
        2 => 1,
        4 => 2,
        _ => 3,
    };
    out.push(0x10 | exp);
    write_uint(out, value, width);
}

fn string_bytes(s: &str) -> Vec<u8> {
    let mut out = Vec::new();
    if s.is_ascii() {
        write_header(&mut out, 0x5, s.len());
        out.extend_from_slice(s.as_bytes());
    } else {
        let units: Vec<u16> = s.encode_utf16().collect();
        write_header(&mut out, 0x6, units.len());
        for unit in units {
            out.extend_from_slice(&unit.to_be_bytes());
        }
    }
    out
}

fn leaf_bytes(value: &PlistValue) -> Vec<u8> {
    let mut out = Vec::new();
    match value {
        PlistValue::Boolean(b) => out.push(if *b { 0x09 } else { 0x08 }),
        PlistValue::Integer(i) => match u64::try_from(*i) {
            Ok(v) if v <= 0xFFFF_FFFF => write_int(&mut out, v),
            // Negative and large values take the signed 8-byte form
            _ => {
                out.push(0x13);
                out.extend_from_slice(&i.to_be_bytes());
            }
        },
        PlistValue::UnsignedInteger(u) => {
            out.push(0x14);
            out.extend_from_slice(&u128::from(*u).to_be_bytes());
        }
        PlistValue::Real(f) => {
            out.push(0x23);
            out.extend_from_slice(&f.to_bits().to_be_bytes());
        }
        PlistValue::Date(d) => {
            out.push(0x33);
            out.extend_from_slice(&d.to_bits().to_be_bytes());
        }
        PlistValue::Data(d) => {
            write_header(&mut out, 0x4, d.len());
            out.extend_from_slice(d);
        }
        PlistValue::String(s) => out = string_bytes(s),
        PlistValue::Array(_) | PlistValue::Dictionary(_) => {}
    }
    out
}
