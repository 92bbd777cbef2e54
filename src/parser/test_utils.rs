//! Encoders for building binary test inputs by hand.

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

pub fn write_vu32(buf: &mut Vec<u8>, mut value: u32) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

pub fn write_vs64(buf: &mut Vec<u8>, mut value: i64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if (value == 0 && (byte & 0x40) == 0) || (value == -1 && (byte & 0x40) != 0) {
            buf.push(byte);
            break;
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

pub fn vu32(value: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    write_vu32(&mut buf, value);
    buf
}

/// A length-prefixed name or byte string.
pub fn name(value: &str) -> Vec<u8> {
    bytes(value.as_bytes())
}

pub fn bytes(value: &[u8]) -> Vec<u8> {
    let mut buf = vu32(value.len() as u32);
    buf.extend_from_slice(value);
    buf
}

/// A count prefix followed by the already encoded entries.
pub fn vector(entries: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = vu32(entries.len() as u32);
    for entry in entries {
        buf.extend_from_slice(entry);
    }
    buf
}

/// `i32.const value` followed by `end`.
pub fn i32_const_expression(value: i32) -> Vec<u8> {
    let mut buf = vec![0x41];
    write_vs64(&mut buf, value as i64);
    buf.push(0x0b);
    buf
}

/// A size-prefixed code entry from runs of `(count, value type byte)` and a
/// body that includes its closing `end`.
pub fn code_entry(locals: &[(u32, u8)], body: &[u8]) -> Vec<u8> {
    let mut func = vu32(locals.len() as u32);
    for (count, value_type) in locals {
        write_vu32(&mut func, *count);
        func.push(*value_type);
    }
    func.extend_from_slice(body);
    bytes(&func)
}

pub fn section(id: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![id];
    buf.extend(bytes(payload));
    buf
}

pub fn module(sections: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];
    for section in sections {
        buf.extend_from_slice(section);
    }
    buf
}
