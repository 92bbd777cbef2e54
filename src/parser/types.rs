//! The small fixed-shape structures every section is built from.

use std::fmt;

use serde::{Serialize, Serializer};

use super::error::{with_eof_check, ParseError, ParseResult};
use super::limits::{MAX_FUNCTION_PARAMS, MAX_FUNCTION_RETURNS, MAX_STRING_LENGTH};
use super::reader::{read_byte_vector, read_vector, read_vs33, read_vu32};
use super::stream::{ReconsumableStream, Stream};

macro_rules! index_type {
    ($($(#[$doc:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
            #[serde(transparent)]
            pub struct $name(pub u32);

            impl $name {
                pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<$name> {
                    read_vu32(stream)
                        .map($name)
                        .map_err(|_| with_eof_check(stream, ParseError::ExpectedIndex))
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )+
    };
}

index_type!(
    /// Index into the type section
    TypeIndex,
    /// Index into the function space (imported functions first)
    FunctionIndex,
    TableIndex,
    MemoryIndex,
    /// Index into a function's parameters followed by its declared locals
    LocalIndex,
    GlobalIndex,
    /// Relative depth of an enclosing structured instruction
    LabelIndex,
    DataIndex,
    ElementIndex,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
    FuncRef,
    ExternRef,
}

impl ValueType {
    pub fn from_byte(byte: u8) -> Option<ValueType> {
        match byte {
            0x7f => Some(ValueType::I32),
            0x7e => Some(ValueType::I64),
            0x7d => Some(ValueType::F32),
            0x7c => Some(ValueType::F64),
            0x70 => Some(ValueType::FuncRef),
            0x6f => Some(ValueType::ExternRef),
            _ => None,
        }
    }

    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<ValueType> {
        let byte = stream
            .read_byte()
            .map_err(|_| with_eof_check(stream, ParseError::InvalidType))?;
        ValueType::from_byte(byte).ok_or(ParseError::InvalidType)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, ValueType::FuncRef | ValueType::ExternRef)
    }

    pub fn is_numeric(&self) -> bool {
        !self.is_reference()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ValueType::I32 => "i32",
                ValueType::I64 => "i64",
                ValueType::F32 => "f32",
                ValueType::F64 => "f64",
                ValueType::FuncRef => "funcref",
                ValueType::ExternRef => "externref",
            }
        )
    }
}

/// An ordered parameter or result list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ResultType {
    pub types: Vec<ValueType>,
}

impl ResultType {
    pub fn parse<S: Stream + ?Sized>(stream: &mut S, limit: u32) -> ParseResult<ResultType> {
        let types = read_vector(stream, limit, ValueType::parse)?;
        Ok(ResultType { types })
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            self.types
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<String>>()
                .join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionType {
    pub parameters: ResultType,
    pub results: ResultType,
}

impl FunctionType {
    const MARKER: u8 = 0x60;

    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<FunctionType> {
        let marker = stream
            .read_byte()
            .map_err(|_| with_eof_check(stream, ParseError::InvalidTag))?;
        if marker != FunctionType::MARKER {
            return Err(ParseError::InvalidTag);
        }
        let parameters = ResultType::parse(stream, MAX_FUNCTION_PARAMS)?;
        let results = ResultType::parse(stream, MAX_FUNCTION_RETURNS)?;
        Ok(FunctionType { parameters, results })
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}) -> ", self.parameters)?;
        match self.results.len() {
            0 => write!(f, "nil"),
            1 => write!(f, "{}", self.results),
            _ => write!(f, "({})", self.results),
        }
    }
}

/// Size bounds of a memory (in pages) or a table (in elements). A missing
/// `max` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Limits {
    pub min: u32,
    pub max: Option<u32>,
}

impl Limits {
    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<Limits> {
        let flag = stream
            .read_byte()
            .map_err(|_| with_eof_check(stream, ParseError::ExpectedKindTag))?;
        if flag > 1 {
            return Err(ParseError::InvalidTag);
        }
        let min = read_vu32(stream).map_err(|_| with_eof_check(stream, ParseError::ExpectedSize))?;
        let max = if flag == 1 {
            Some(read_vu32(stream).map_err(|_| with_eof_check(stream, ParseError::ExpectedSize))?)
        } else {
            None
        };
        Ok(Limits { min, max })
    }
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "initial={}", self.min)?;
        if let Some(max) = self.max {
            write!(f, " max={}", max)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryType {
    pub limits: Limits,
}

impl MemoryType {
    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<MemoryType> {
        Ok(MemoryType {
            limits: Limits::parse(stream)?,
        })
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "pages: {}", self.limits)
    }
}

/// A table's element type and size bounds. The element type is always a
/// reference type; there is no way to build one holding a numeric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableType {
    element_type: ValueType,
    limits: Limits,
}

impl TableType {
    pub fn new(element_type: ValueType, limits: Limits) -> ParseResult<TableType> {
        if !element_type.is_reference() {
            return Err(ParseError::InvalidType);
        }
        Ok(TableType {
            element_type,
            limits,
        })
    }

    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<TableType> {
        let element_type = ValueType::parse(stream)?;
        let limits = Limits::parse(stream)?;
        TableType::new(element_type, limits)
    }

    pub fn element_type(&self) -> ValueType {
        self.element_type
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "type={} {}", self.element_type, self.limits)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GlobalType {
    pub value_type: ValueType,
    pub mutable: bool,
}

impl GlobalType {
    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<GlobalType> {
        let value_type = ValueType::parse(stream)?;
        let mutable = match stream
            .read_byte()
            .map_err(|_| with_eof_check(stream, ParseError::ExpectedKindTag))?
        {
            0x00 => false,
            0x01 => true,
            _ => return Err(ParseError::InvalidTag),
        };
        Ok(GlobalType {
            value_type,
            mutable,
        })
    }
}

impl fmt::Display for GlobalType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} mutable={}", self.value_type, self.mutable as u8)
    }
}

/// The signature attached to `block`, `loop` and `if`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockType {
    Empty,
    Type(ValueType),
    Index(TypeIndex),
}

impl BlockType {
    const EMPTY: u8 = 0x40;

    /// The encoding is a signed 33 bit integer: `-64` is the empty block, the
    /// single-byte negatives are inline value types, and anything
    /// non-negative is a type index.
    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<BlockType> {
        let mut stream = ReconsumableStream::new(stream);
        let kind = stream
            .read_byte()
            .map_err(|_| with_eof_check(&stream, ParseError::ExpectedKindTag))?;
        if kind == BlockType::EMPTY {
            return Ok(BlockType::Empty);
        }

        stream.unread(&[kind]);
        let value = read_vs33(&mut stream).map_err(|_| with_eof_check(&stream, ParseError::ExpectedIndex))?;
        if value == -64 {
            return Ok(BlockType::Empty);
        }
        if value < 0 {
            if value < -64 {
                return Err(ParseError::InvalidType);
            }
            return ValueType::from_byte((value & 0x7f) as u8)
                .map(BlockType::Type)
                .ok_or(ParseError::InvalidType);
        }
        Ok(BlockType::Index(TypeIndex(value as u32)))
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BlockType::Empty => Ok(()),
            BlockType::Type(value_type) => write!(f, " {value_type}"),
            BlockType::Index(index) => write!(f, " type[{index}]"),
        }
    }
}

/// A length-prefixed name. The bytes are kept as they appear in the module;
/// they are not required to be valid UTF-8 at this layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Name(Vec<u8>);

impl Name {
    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<Name> {
        Ok(Name(read_byte_vector(stream, MAX_STRING_LENGTH)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The name as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl From<&str> for Name {
    fn from(name: &str) -> Name {
        Name(name.as_bytes().to_vec())
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(&self.0))
    }
}
