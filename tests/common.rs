//! Common test utilities shared between integration tests

#![allow(dead_code)]

pub const SECTION_CUSTOM: u8 = 0;
pub const SECTION_TYPE: u8 = 1;
pub const SECTION_IMPORT: u8 = 2;
pub const SECTION_FUNCTION: u8 = 3;
pub const SECTION_TABLE: u8 = 4;
pub const SECTION_MEMORY: u8 = 5;
pub const SECTION_GLOBAL: u8 = 6;
pub const SECTION_EXPORT: u8 = 7;
pub const SECTION_START: u8 = 8;
pub const SECTION_ELEMENT: u8 = 9;
pub const SECTION_CODE: u8 = 10;
pub const SECTION_DATA: u8 = 11;
pub const SECTION_DATA_COUNT: u8 = 12;

/// Bytes from a hex string; whitespace is ignored so fixtures can be laid out
/// one field per group.
pub fn hex(text: &str) -> Vec<u8> {
    let compact: String = text.split_whitespace().collect();
    hex::decode(compact).expect("valid hex fixture")
}

pub fn vu32(mut value: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return buf;
        }
        buf.push(byte | 0x80);
    }
}

pub fn name(value: &str) -> Vec<u8> {
    let mut buf = vu32(value.len() as u32);
    buf.extend_from_slice(value.as_bytes());
    buf
}

pub fn vector(entries: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = vu32(entries.len() as u32);
    for entry in entries {
        buf.extend_from_slice(entry);
    }
    buf
}

pub fn section(id: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![id];
    buf.extend(vu32(payload.len() as u32));
    buf.extend_from_slice(payload);
    buf
}

pub fn module(sections: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = hex("0061736d 01000000");
    for section in sections {
        buf.extend_from_slice(section);
    }
    buf
}

/// Every section kind once, in the canonical order:
///
/// ```text
/// (type (func (param i32) (result i32)))
/// (type (func))
/// (import "env" "log" (func (type 1)))
/// (func $add (type 0) local.get 0 i32.const 1 i32.add)
/// (func $run (type 1) call 0)
/// (table 2 funcref) (memory 1 2)
/// (global i32 (i32.const 42))
/// (export "add" (func 1)) (export "mem" (memory 0))
/// (start 2)
/// (elem (i32.const 0) 1 2)
/// (data (i32.const 0) "hi")
/// ```
///
/// plus a data count and a trailing custom section.
pub fn full_module() -> Vec<u8> {
    module(&[
        section(SECTION_TYPE, &hex("02 60017f017f 600000")),
        section(SECTION_IMPORT, &hex("01 03656e76 036c6f67 00 01")),
        section(SECTION_FUNCTION, &hex("02 00 01")),
        section(SECTION_TABLE, &hex("01 70 00 02")),
        section(SECTION_MEMORY, &hex("01 01 01 02")),
        section(SECTION_GLOBAL, &hex("01 7f00 412a0b")),
        section(SECTION_EXPORT, &hex("02 03616464 00 01 036d656d 02 00")),
        section(SECTION_START, &hex("02")),
        section(SECTION_ELEMENT, &hex("01 00 41000b 02 01 02")),
        section(SECTION_DATA_COUNT, &hex("01")),
        section(SECTION_CODE, &hex("02 07 00 2000 4101 6a 0b 04 00 1000 0b")),
        section(SECTION_DATA, &hex("01 00 41000b 02 6869")),
        section(SECTION_CUSTOM, &hex("04 6e616d65 010203")),
    ])
}

/// Byte offsets just past the header and past each complete section, where a
/// cut leaves a well-formed (shorter) module behind.
pub fn section_boundaries(bytes: &[u8]) -> Vec<usize> {
    let mut boundaries = vec![8];
    let mut pos = 8;
    while pos < bytes.len() {
        pos += 1;
        let mut size = 0usize;
        let mut shift = 0;
        loop {
            let byte = bytes[pos];
            pos += 1;
            size |= ((byte & 0x7f) as usize) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                break;
            }
        }
        pos += size;
        boundaries.push(pos);
    }
    boundaries
}
