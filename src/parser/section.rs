//! Section payload decoders.
//!
//! Every `parse` here is handed a stream constrained to the section's declared
//! length; checking that the payload was consumed exactly is left to the
//! caller driving the section loop.

use std::fmt;

use log::trace;
use serde::{Serialize, Serializer};

use super::error::{with_eof_check, ParseError, ParseResult};
use super::instruction::Expression;
use super::limits::{
    MAX_DATA_SEGMENTS, MAX_DATA_SEGMENT_SIZE, MAX_ELEMENT_SEGMENTS, MAX_EXPORTS, MAX_FUNCTIONS,
    MAX_FUNCTION_LOCALS, MAX_FUNCTION_SIZE, MAX_GLOBALS, MAX_IMPORTS, MAX_MEMORIES, MAX_TABLES,
    MAX_TABLE_INIT_ENTRIES, MAX_TYPES,
};
use super::reader::{read_byte_vector, read_to_end, read_vector, read_vu32};
use super::stream::{ConstrainedStream, Stream};
use super::types::{
    FunctionIndex, FunctionType, GlobalIndex, GlobalType, MemoryIndex, MemoryType, Name, TableIndex,
    TableType, TypeIndex, ValueType,
};

fn serialize_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

fn read_kind_tag<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<u8> {
    stream
        .read_byte()
        .map_err(|_| with_eof_check(stream, ParseError::ExpectedKindTag))
}

fn read_flags<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<u32> {
    read_vu32(stream).map_err(|_| with_eof_check(stream, ParseError::ExpectedKindTag))
}

pub trait SectionToString {
    /// A one line summary: entry counts and the like.
    fn to_header_string(&self) -> String;
    /// One line per entry.
    fn to_details_string(&self) -> String;
}

// =============================================================================
// Custom
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomSection {
    pub name: Name,
    #[serde(serialize_with = "serialize_hex")]
    pub contents: Vec<u8>,
}

impl CustomSection {
    pub const ID: u8 = 0;

    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<CustomSection> {
        let name = Name::parse(stream)?;
        let contents = read_to_end(stream);
        trace!("custom section \"{}\": {} bytes", name, contents.len());
        Ok(CustomSection { name, contents })
    }
}

impl SectionToString for CustomSection {
    fn to_header_string(&self) -> String {
        format!("\"{}\" size: {}", self.name, self.contents.len())
    }

    fn to_details_string(&self) -> String {
        format!(" - name: \"{}\"\n", self.name)
    }
}

// =============================================================================
// Type
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSection {
    pub types: Vec<FunctionType>,
}

impl TypeSection {
    pub const ID: u8 = 1;

    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<TypeSection> {
        let types = read_vector(stream, MAX_TYPES, FunctionType::parse)?;
        trace!("type section: {} entries", types.len());
        Ok(TypeSection { types })
    }

    pub fn get(&self, index: TypeIndex) -> Option<&FunctionType> {
        self.types.get(index.0 as usize)
    }
}

impl SectionToString for TypeSection {
    fn to_header_string(&self) -> String {
        format!("count: {}", self.types.len())
    }

    fn to_details_string(&self) -> String {
        let mut result = String::new();
        for (index, function_type) in self.types.iter().enumerate() {
            result.push_str(&format!(" - type[{}] {}\n", index, function_type));
        }
        result
    }
}

// =============================================================================
// Import
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImportDescription {
    Function(TypeIndex),
    Table(TableType),
    Memory(MemoryType),
    Global(GlobalType),
}

impl ImportDescription {
    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<ImportDescription> {
        match read_kind_tag(stream)? {
            0x00 => Ok(ImportDescription::Function(TypeIndex::parse(stream)?)),
            0x01 => Ok(ImportDescription::Table(TableType::parse(stream)?)),
            0x02 => Ok(ImportDescription::Memory(MemoryType::parse(stream)?)),
            0x03 => Ok(ImportDescription::Global(GlobalType::parse(stream)?)),
            _ => Err(ParseError::InvalidTag),
        }
    }
}

impl fmt::Display for ImportDescription {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ImportDescription::Function(index) => write!(f, "func sig={}", index),
            ImportDescription::Table(table_type) => write!(f, "table {}", table_type),
            ImportDescription::Memory(memory_type) => write!(f, "memory {}", memory_type),
            ImportDescription::Global(global_type) => write!(f, "global {}", global_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Import {
    pub module: Name,
    pub name: Name,
    pub description: ImportDescription,
}

impl Import {
    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<Import> {
        let module = Name::parse(stream)?;
        let name = Name::parse(stream)?;
        let description = ImportDescription::parse(stream)?;
        Ok(Import {
            module,
            name,
            description,
        })
    }
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} <- {}.{}", self.description, self.module, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSection {
    pub imports: Vec<Import>,
}

impl ImportSection {
    pub const ID: u8 = 2;

    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<ImportSection> {
        let imports = read_vector(stream, MAX_IMPORTS, Import::parse)?;
        trace!("import section: {} entries", imports.len());
        Ok(ImportSection { imports })
    }

    /// Imported functions come first in the function index space.
    pub fn function_count(&self) -> usize {
        self.imports
            .iter()
            .filter(|import| matches!(import.description, ImportDescription::Function(_)))
            .count()
    }
}

impl SectionToString for ImportSection {
    fn to_header_string(&self) -> String {
        format!("count: {}", self.imports.len())
    }

    fn to_details_string(&self) -> String {
        let mut result = String::new();
        for (index, import) in self.imports.iter().enumerate() {
            result.push_str(&format!(" - import[{}] {}\n", index, import));
        }
        result
    }
}

// =============================================================================
// Function
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSection {
    pub types: Vec<TypeIndex>,
}

impl FunctionSection {
    pub const ID: u8 = 3;

    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<FunctionSection> {
        let types = read_vector(stream, MAX_FUNCTIONS, TypeIndex::parse)?;
        trace!("function section: {} entries", types.len());
        Ok(FunctionSection { types })
    }
}

impl SectionToString for FunctionSection {
    fn to_header_string(&self) -> String {
        format!("count: {}", self.types.len())
    }

    fn to_details_string(&self) -> String {
        let mut result = String::new();
        for (index, type_index) in self.types.iter().enumerate() {
            result.push_str(&format!(" - func[{}] sig={}\n", index, type_index));
        }
        result
    }
}

// =============================================================================
// Table
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSection {
    pub tables: Vec<TableType>,
}

impl TableSection {
    pub const ID: u8 = 4;

    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<TableSection> {
        let tables = read_vector(stream, MAX_TABLES, TableType::parse)?;
        trace!("table section: {} entries", tables.len());
        Ok(TableSection { tables })
    }
}

impl SectionToString for TableSection {
    fn to_header_string(&self) -> String {
        format!("count: {}", self.tables.len())
    }

    fn to_details_string(&self) -> String {
        let mut result = String::new();
        for (index, table) in self.tables.iter().enumerate() {
            result.push_str(&format!(" - table[{}] {}\n", index, table));
        }
        result
    }
}

// =============================================================================
// Memory
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemorySection {
    pub memories: Vec<MemoryType>,
}

impl MemorySection {
    pub const ID: u8 = 5;

    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<MemorySection> {
        let memories = read_vector(stream, MAX_MEMORIES, MemoryType::parse)?;
        trace!("memory section: {} entries", memories.len());
        Ok(MemorySection { memories })
    }
}

impl SectionToString for MemorySection {
    fn to_header_string(&self) -> String {
        format!("count: {}", self.memories.len())
    }

    fn to_details_string(&self) -> String {
        let mut result = String::new();
        for (index, memory) in self.memories.iter().enumerate() {
            result.push_str(&format!(" - memory[{}] {}\n", index, memory));
        }
        result
    }
}

// =============================================================================
// Global
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Global {
    pub global_type: GlobalType,
    pub init: Expression,
}

impl Global {
    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<Global> {
        let global_type = GlobalType::parse(stream)?;
        let init = Expression::parse(stream)?;
        Ok(Global { global_type, init })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalSection {
    pub globals: Vec<Global>,
}

impl GlobalSection {
    pub const ID: u8 = 6;

    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<GlobalSection> {
        let globals = read_vector(stream, MAX_GLOBALS, Global::parse)?;
        trace!("global section: {} entries", globals.len());
        Ok(GlobalSection { globals })
    }
}

impl SectionToString for GlobalSection {
    fn to_header_string(&self) -> String {
        format!("count: {}", self.globals.len())
    }

    fn to_details_string(&self) -> String {
        let mut result = String::new();
        for (index, global) in self.globals.iter().enumerate() {
            result.push_str(&format!(
                " - global[{}] {} - init {}\n",
                index,
                global.global_type,
                global.init.to_inline_string()
            ));
        }
        result
    }
}

// =============================================================================
// Export
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExportDescription {
    Function(FunctionIndex),
    Table(TableIndex),
    Memory(MemoryIndex),
    Global(GlobalIndex),
}

impl ExportDescription {
    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<ExportDescription> {
        match read_kind_tag(stream)? {
            0x00 => Ok(ExportDescription::Function(FunctionIndex::parse(stream)?)),
            0x01 => Ok(ExportDescription::Table(TableIndex::parse(stream)?)),
            0x02 => Ok(ExportDescription::Memory(MemoryIndex::parse(stream)?)),
            0x03 => Ok(ExportDescription::Global(GlobalIndex::parse(stream)?)),
            _ => Err(ParseError::InvalidTag),
        }
    }
}

impl fmt::Display for ExportDescription {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExportDescription::Function(index) => write!(f, "func[{}]", index),
            ExportDescription::Table(index) => write!(f, "table[{}]", index),
            ExportDescription::Memory(index) => write!(f, "memory[{}]", index),
            ExportDescription::Global(index) => write!(f, "global[{}]", index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Export {
    pub name: Name,
    pub description: ExportDescription,
}

impl Export {
    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<Export> {
        let name = Name::parse(stream)?;
        let description = ExportDescription::parse(stream)?;
        Ok(Export { name, description })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSection {
    pub exports: Vec<Export>,
}

impl ExportSection {
    pub const ID: u8 = 7;

    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<ExportSection> {
        let exports = read_vector(stream, MAX_EXPORTS, Export::parse)?;
        trace!("export section: {} entries", exports.len());
        Ok(ExportSection { exports })
    }

    pub fn get_function_name(&self, index: FunctionIndex) -> Option<&Name> {
        self.exports
            .iter()
            .find(|export| export.description == ExportDescription::Function(index))
            .map(|export| &export.name)
    }
}

impl SectionToString for ExportSection {
    fn to_header_string(&self) -> String {
        format!("count: {}", self.exports.len())
    }

    fn to_details_string(&self) -> String {
        let mut result = String::new();
        for export in &self.exports {
            result.push_str(&format!(" - {} -> \"{}\"\n", export.description, export.name));
        }
        result
    }
}

// =============================================================================
// Start
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartSection {
    pub function: FunctionIndex,
}

impl StartSection {
    pub const ID: u8 = 8;

    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<StartSection> {
        Ok(StartSection {
            function: FunctionIndex::parse(stream)?,
        })
    }
}

impl SectionToString for StartSection {
    fn to_header_string(&self) -> String {
        format!("start: {}", self.function)
    }

    fn to_details_string(&self) -> String {
        format!(" - start function: {}\n", self.function)
    }
}

// =============================================================================
// Element
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ElementMode {
    Passive,
    Declarative,
    Active { table: TableIndex, offset: Expression },
}

impl fmt::Display for ElementMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ElementMode::Passive => write!(f, "passive"),
            ElementMode::Declarative => write!(f, "declarative"),
            ElementMode::Active { table, offset } => {
                write!(f, "table={} - init {}", table, offset.to_inline_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ElementInit {
    Functions(Vec<FunctionIndex>),
    Expressions(Vec<Expression>),
}

impl ElementInit {
    pub fn len(&self) -> usize {
        match self {
            ElementInit::Functions(functions) => functions.len(),
            ElementInit::Expressions(expressions) => expressions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub mode: ElementMode,
    pub element_type: ValueType,
    pub init: ElementInit,
}

impl Element {
    // flag bits: 0 = not active, 1 = explicit table (or declarative when not
    // active), 2 = initialisers are expressions
    const NOT_ACTIVE: u32 = 0b001;
    const EXPLICIT_TABLE: u32 = 0b010;
    const EXPRESSIONS: u32 = 0b100;

    /// The only element kind the binary format defines, standing for funcref.
    const ELEMKIND_FUNCREF: u8 = 0x00;

    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<Element> {
        let flags = read_flags(stream)?;
        if flags > 7 {
            return Err(ParseError::InvalidTag);
        }

        let mode = if flags & Element::NOT_ACTIVE == 0 {
            let table = if flags & Element::EXPLICIT_TABLE != 0 {
                TableIndex::parse(stream)?
            } else {
                TableIndex(0)
            };
            let offset = Expression::parse(stream)?;
            ElementMode::Active { table, offset }
        } else if flags & Element::EXPLICIT_TABLE == 0 {
            ElementMode::Passive
        } else {
            ElementMode::Declarative
        };

        let uses_expressions = flags & Element::EXPRESSIONS != 0;
        let element_type = if flags & (Element::NOT_ACTIVE | Element::EXPLICIT_TABLE) == 0 {
            ValueType::FuncRef
        } else if uses_expressions {
            let value_type = ValueType::parse(stream)?;
            if !value_type.is_reference() {
                return Err(ParseError::InvalidType);
            }
            value_type
        } else {
            if read_kind_tag(stream)? != Element::ELEMKIND_FUNCREF {
                return Err(ParseError::InvalidTag);
            }
            ValueType::FuncRef
        };

        let init = if uses_expressions {
            ElementInit::Expressions(read_vector(stream, MAX_TABLE_INIT_ENTRIES, Expression::parse)?)
        } else {
            ElementInit::Functions(read_vector(stream, MAX_TABLE_INIT_ENTRIES, FunctionIndex::parse)?)
        };

        Ok(Element {
            mode,
            element_type,
            init,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementSection {
    pub elements: Vec<Element>,
}

impl ElementSection {
    pub const ID: u8 = 9;

    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<ElementSection> {
        let elements = read_vector(stream, MAX_ELEMENT_SEGMENTS, Element::parse)?;
        trace!("element section: {} entries", elements.len());
        Ok(ElementSection { elements })
    }
}

impl SectionToString for ElementSection {
    fn to_header_string(&self) -> String {
        format!("count: {}", self.elements.len())
    }

    fn to_details_string(&self) -> String {
        let mut result = String::new();
        for (index, element) in self.elements.iter().enumerate() {
            result.push_str(&format!(
                " - segment[{}] {} {} count={}\n",
                index,
                element.element_type,
                element.mode,
                element.init.len()
            ));
            match &element.init {
                ElementInit::Functions(functions) => {
                    for (offset, function) in functions.iter().enumerate() {
                        result.push_str(&format!("  - elem[{}] = func[{}]\n", offset, function));
                    }
                }
                ElementInit::Expressions(expressions) => {
                    for (offset, expression) in expressions.iter().enumerate() {
                        result.push_str(&format!("  - elem[{}] = {}\n", offset, expression.to_inline_string()));
                    }
                }
            }
        }
        result
    }
}

// =============================================================================
// Code
// =============================================================================

/// A run of `count` locals sharing one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Locals {
    pub count: u32,
    pub value_type: ValueType,
}

impl Locals {
    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<Locals> {
        let count = read_vu32(stream).map_err(|_| with_eof_check(stream, ParseError::ExpectedSize))?;
        let value_type = ValueType::parse(stream)?;
        Ok(Locals { count, value_type })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Func {
    pub locals: Vec<Locals>,
    pub body: Expression,
}

impl Func {
    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<Func> {
        let locals = read_vector(stream, MAX_FUNCTION_LOCALS, Locals::parse)?;
        let total: u64 = locals.iter().map(|run| run.count as u64).sum();
        if total > MAX_FUNCTION_LOCALS as u64 {
            return Err(ParseError::HugeAllocationRequested);
        }
        let body = Expression::parse(stream)?;
        Ok(Func { locals, body })
    }

    /// The declared locals with every run expanded, in declaration order.
    /// Parameters are not included.
    pub fn local_types(&self) -> Vec<ValueType> {
        self.locals
            .iter()
            .flat_map(|run| std::iter::repeat(run.value_type).take(run.count as usize))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Code {
    pub size: u32,
    pub func: Func,
}

impl Code {
    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<Code> {
        let size = read_vu32(stream).map_err(|_| with_eof_check(stream, ParseError::ExpectedSize))?;
        if size > MAX_FUNCTION_SIZE {
            return Err(ParseError::InvalidSize);
        }
        trace!("code entry: {} bytes", size);

        let mut body_stream = ConstrainedStream::new(stream, size as usize);
        let func = Func::parse(&mut body_stream)?;
        if body_stream.remaining() > 0 {
            return Err(with_eof_check(&body_stream, ParseError::InvalidSize));
        }
        Ok(Code { size, func })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeSection {
    pub functions: Vec<Code>,
}

impl CodeSection {
    pub const ID: u8 = 10;

    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<CodeSection> {
        let functions = read_vector(stream, MAX_FUNCTIONS, Code::parse)?;
        trace!("code section: {} entries", functions.len());
        Ok(CodeSection { functions })
    }
}

impl SectionToString for CodeSection {
    fn to_header_string(&self) -> String {
        format!("count: {}", self.functions.len())
    }

    fn to_details_string(&self) -> String {
        let mut result = String::new();
        for (index, code) in self.functions.iter().enumerate() {
            result.push_str(&format!(
                " - func[{}] size={} locals={}\n",
                index,
                code.size,
                code.func.local_types().len()
            ));
        }
        result
    }
}

// =============================================================================
// Data
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Data {
    Passive {
        #[serde(serialize_with = "serialize_hex")]
        init: Vec<u8>,
    },
    Active {
        #[serde(serialize_with = "serialize_hex")]
        init: Vec<u8>,
        memory: MemoryIndex,
        offset: Expression,
    },
}

impl Data {
    const ACTIVE: u32 = 0;
    const PASSIVE: u32 = 1;
    const ACTIVE_EXPLICIT: u32 = 2;

    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<Data> {
        match read_flags(stream)? {
            Data::ACTIVE => {
                let offset = Expression::parse(stream)?;
                let init = read_byte_vector(stream, MAX_DATA_SEGMENT_SIZE)?;
                Ok(Data::Active {
                    init,
                    memory: MemoryIndex(0),
                    offset,
                })
            }
            Data::PASSIVE => Ok(Data::Passive {
                init: read_byte_vector(stream, MAX_DATA_SEGMENT_SIZE)?,
            }),
            Data::ACTIVE_EXPLICIT => {
                let memory = MemoryIndex::parse(stream)?;
                let offset = Expression::parse(stream)?;
                let init = read_byte_vector(stream, MAX_DATA_SEGMENT_SIZE)?;
                Ok(Data::Active { init, memory, offset })
            }
            _ => Err(ParseError::InvalidTag),
        }
    }

    pub fn init(&self) -> &[u8] {
        match self {
            Data::Passive { init } | Data::Active { init, .. } => init,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSection {
    pub data: Vec<Data>,
}

impl DataSection {
    pub const ID: u8 = 11;

    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<DataSection> {
        let data = read_vector(stream, MAX_DATA_SEGMENTS, Data::parse)?;
        trace!("data section: {} entries", data.len());
        Ok(DataSection { data })
    }
}

impl SectionToString for DataSection {
    fn to_header_string(&self) -> String {
        format!("count: {}", self.data.len())
    }

    fn to_details_string(&self) -> String {
        let mut result = String::new();
        for (index, data) in self.data.iter().enumerate() {
            match data {
                Data::Passive { init } => {
                    result.push_str(&format!(" - segment[{}] passive size={}\n", index, init.len()));
                }
                Data::Active { init, memory, offset } => {
                    result.push_str(&format!(
                        " - segment[{}] memory={} size={} - init {}\n",
                        index,
                        memory,
                        init.len(),
                        offset.to_inline_string()
                    ));
                }
            }
        }
        result
    }
}

// =============================================================================
// Data count
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataCountSection {
    pub count: Option<u32>,
}

impl DataCountSection {
    pub const ID: u8 = 12;

    /// An empty payload decodes as a section without a count.
    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<DataCountSection> {
        if stream.unreliable_eof() {
            return Ok(DataCountSection { count: None });
        }
        let count = read_vu32(stream).map_err(|_| with_eof_check(stream, ParseError::ExpectedSize))?;
        Ok(DataCountSection { count: Some(count) })
    }
}

impl SectionToString for DataCountSection {
    fn to_header_string(&self) -> String {
        match self.count {
            Some(count) => format!("count: {}", count),
            None => "count: none".to_string(),
        }
    }

    fn to_details_string(&self) -> String {
        format!(" - data count: {}\n", self.to_header_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::instruction::{Arguments, Instruction, OpCode};
    use crate::parser::stream::ByteStream;
    use crate::parser::test_utils::*;
    use crate::parser::types::Limits;

    fn parse_all<'a, T>(bytes: &'a [u8], parse: fn(&mut ByteStream<'a>) -> ParseResult<T>) -> ParseResult<T> {
        let mut stream = ByteStream::new(bytes);
        parse(&mut stream)
    }

    #[test]
    fn test_custom_section() {
        let mut payload = name("producers");
        payload.extend_from_slice(&[1, 2, 3]);
        let section = parse_all(&payload, CustomSection::parse).unwrap();
        assert_eq!(section.name, "producers");
        assert_eq!(section.contents, vec![1, 2, 3]);
    }

    #[test]
    fn test_type_section() {
        let payload = vector(&[vec![0x60, 0x01, 0x7f, 0x00], vec![0x60, 0x00, 0x01, 0x7e]]);
        let section = parse_all(&payload, TypeSection::parse).unwrap();
        assert_eq!(section.types.len(), 2);
        assert_eq!(section.types[0].to_string(), "(i32) -> nil");
        assert_eq!(section.get(TypeIndex(1)).map(ToString::to_string), Some("() -> i64".to_string()));
        assert_eq!(section.get(TypeIndex(2)), None);
    }

    #[test]
    fn test_import_section() {
        let mut function = name("env");
        function.extend(name("log"));
        function.extend([0x00, 0x02]);
        let mut memory = name("env");
        memory.extend(name("memory"));
        memory.extend([0x02, 0x01, 0x01, 0x02]);
        let mut global = name("env");
        global.extend(name("sp"));
        global.extend([0x03, 0x7f, 0x01]);

        let section = parse_all(&vector(&[function, memory, global]), ImportSection::parse).unwrap();
        assert_eq!(section.imports.len(), 3);
        assert_eq!(section.imports[0].module, "env");
        assert_eq!(section.imports[0].name, "log");
        assert_eq!(section.imports[0].description, ImportDescription::Function(TypeIndex(2)));
        assert_eq!(
            section.imports[1].description,
            ImportDescription::Memory(MemoryType {
                limits: Limits { min: 1, max: Some(2) }
            })
        );
        assert_eq!(section.function_count(), 1);
        assert_eq!(section.imports[0].to_string(), "func sig=2 <- env.log");
    }

    #[test]
    fn test_import_bad_tag() {
        let mut entry = name("env");
        entry.extend(name("x"));
        entry.extend([0x04, 0x00]);
        assert_eq!(parse_all(&vector(&[entry]), ImportSection::parse), Err(ParseError::InvalidTag));

        let mut truncated = name("env");
        truncated.extend(name("x"));
        assert_eq!(
            parse_all(&vector(&[truncated]), ImportSection::parse),
            Err(ParseError::UnexpectedEof)
        );
    }

    #[test]
    fn test_function_table_memory_sections() {
        let functions = parse_all(&[0x02, 0x00, 0x01], FunctionSection::parse).unwrap();
        assert_eq!(functions.types, vec![TypeIndex(0), TypeIndex(1)]);

        let tables = parse_all(&[0x01, 0x6f, 0x01, 0x00, 0x10], TableSection::parse).unwrap();
        assert_eq!(tables.tables[0].element_type(), ValueType::ExternRef);
        assert_eq!(tables.tables[0].limits().max, Some(16));
        assert_eq!(parse_all(&[0x01, 0x7c, 0x00, 0x00], TableSection::parse), Err(ParseError::InvalidType));

        let memories = parse_all(&[0x01, 0x00, 0x01], MemorySection::parse).unwrap();
        assert_eq!(memories.memories[0].limits, Limits { min: 1, max: None });
    }

    #[test]
    fn test_global_section() {
        let mut entry = vec![0x7f, 0x00];
        entry.extend(i32_const_expression(42));
        let section = parse_all(&vector(&[entry]), GlobalSection::parse).unwrap();
        assert_eq!(section.globals[0].global_type.value_type, ValueType::I32);
        assert!(!section.globals[0].global_type.mutable);
        assert_eq!(
            section.globals[0].init.instructions,
            vec![Instruction::new(OpCode::I32_CONST, Arguments::I32(42))]
        );
    }

    #[test]
    fn test_export_section() {
        let mut main = name("main");
        main.extend([0x00, 0x03]);
        let mut memory = name("memory");
        memory.extend([0x02, 0x00]);
        let section = parse_all(&vector(&[main, memory]), ExportSection::parse).unwrap();
        assert_eq!(section.exports[0].description, ExportDescription::Function(FunctionIndex(3)));
        assert_eq!(section.exports[1].description, ExportDescription::Memory(MemoryIndex(0)));
        assert_eq!(
            section.get_function_name(FunctionIndex(3)).and_then(Name::as_str),
            Some("main")
        );

        let mut bad = name("x");
        bad.extend([0x09, 0x00]);
        assert_eq!(parse_all(&vector(&[bad]), ExportSection::parse), Err(ParseError::InvalidTag));
    }

    #[test]
    fn test_start_section() {
        assert_eq!(
            parse_all(&[0x05], StartSection::parse),
            Ok(StartSection {
                function: FunctionIndex(5)
            })
        );
        assert_eq!(parse_all(&[], StartSection::parse), Err(ParseError::UnexpectedEof));
    }

    #[test]
    fn test_element_active_functions() {
        let mut entry = vec![0x00];
        entry.extend(i32_const_expression(1));
        entry.extend(vector(&[vec![0x00], vec![0x02]]));
        let section = parse_all(&vector(&[entry]), ElementSection::parse).unwrap();
        let element = &section.elements[0];
        assert_eq!(element.element_type, ValueType::FuncRef);
        assert_eq!(element.init, ElementInit::Functions(vec![FunctionIndex(0), FunctionIndex(2)]));
        match &element.mode {
            ElementMode::Active { table, offset } => {
                assert_eq!(*table, TableIndex(0));
                assert_eq!(offset.to_inline_string(), "i32.const 1");
            }
            mode => panic!("unexpected mode {:?}", mode),
        }
    }

    #[test]
    fn test_element_modes() {
        // passive, elemkind, functions
        let passive = parse_all(&[0x01, 0x00, 0x01, 0x04], Element::parse).unwrap();
        assert_eq!(passive.mode, ElementMode::Passive);
        assert_eq!(passive.init, ElementInit::Functions(vec![FunctionIndex(4)]));

        // declarative, elemkind, functions
        let declarative = parse_all(&[0x03, 0x00, 0x00], Element::parse).unwrap();
        assert_eq!(declarative.mode, ElementMode::Declarative);
        assert!(declarative.init.is_empty());

        // active with an explicit table
        let mut explicit = vec![0x02, 0x01];
        explicit.extend(i32_const_expression(0));
        explicit.extend([0x00, 0x01, 0x07]);
        let explicit = parse_all(&explicit, Element::parse).unwrap();
        assert!(matches!(explicit.mode, ElementMode::Active { table: TableIndex(1), .. }));

        // passive, externref, expressions
        let expressions = parse_all(&[0x05, 0x6f, 0x01, 0xd0, 0x6f, 0x0b], Element::parse).unwrap();
        assert_eq!(expressions.element_type, ValueType::ExternRef);
        assert_eq!(
            expressions.init,
            ElementInit::Expressions(vec![Expression::new(vec![Instruction::new(
                OpCode::REF_NULL,
                Arguments::ValueType(ValueType::ExternRef)
            )])])
        );

        // active, table 0, expressions with an implied funcref
        let mut implied = vec![0x04];
        implied.extend(i32_const_expression(0));
        implied.extend([0x01, 0xd2, 0x00, 0x0b]);
        let implied = parse_all(&implied, Element::parse).unwrap();
        assert_eq!(implied.element_type, ValueType::FuncRef);
    }

    #[test]
    fn test_element_errors() {
        assert_eq!(parse_all(&[0x08], Element::parse), Err(ParseError::InvalidTag));
        assert_eq!(parse_all(&[0x01, 0x01, 0x00], Element::parse), Err(ParseError::InvalidTag));
        assert_eq!(parse_all(&[0x05, 0x7f, 0x00], Element::parse), Err(ParseError::InvalidType));
    }

    #[test]
    fn test_code_entry() {
        let entry = code_entry(&[(2, 0x7f), (1, 0x7e)], &[0x20, 0x00, 0x0b]);
        let code = parse_all(&entry, Code::parse).unwrap();
        assert_eq!(code.size as usize, entry.len() - 1);
        assert_eq!(code.func.local_types(), vec![ValueType::I32, ValueType::I32, ValueType::I64]);
        assert_eq!(code.func.body.len(), 1);
    }

    #[test]
    fn test_code_size_mismatch() {
        // declared one byte longer than the function
        let mut too_long = vec![0x05, 0x00, 0x01, 0x01, 0x0b, 0x01];
        assert_eq!(parse_all(&too_long, Code::parse), Err(ParseError::InvalidSize));
        too_long.truncate(5);
        assert_eq!(parse_all(&too_long, Code::parse), Err(ParseError::UnexpectedEof));

        // declared too short for the body to reach its end
        let too_short = [0x02, 0x00, 0x01, 0x0b];
        assert_eq!(parse_all(&too_short, Code::parse), Err(ParseError::UnexpectedEof));
    }

    #[test]
    fn test_code_limits() {
        let mut huge = vu32(MAX_FUNCTION_SIZE + 1);
        huge.push(0x00);
        assert_eq!(parse_all(&huge, Code::parse), Err(ParseError::InvalidSize));

        let too_many_locals = code_entry(&[(MAX_FUNCTION_LOCALS, 0x7f), (1, 0x7f)], &[0x0b]);
        assert_eq!(
            parse_all(&too_many_locals, Code::parse),
            Err(ParseError::HugeAllocationRequested)
        );
    }

    #[test]
    fn test_data_segments() {
        let mut active = vec![0x00];
        active.extend(i32_const_expression(8));
        active.extend(bytes(b"hi"));
        let mut explicit = vec![0x02, 0x01];
        explicit.extend(i32_const_expression(0));
        explicit.extend(bytes(&[0xff]));
        let passive = [vec![0x01], bytes(b"abc")].concat();

        let section = parse_all(&vector(&[active, explicit, passive]), DataSection::parse).unwrap();
        assert_eq!(section.data.len(), 3);
        assert!(matches!(&section.data[0], Data::Active { memory: MemoryIndex(0), .. }));
        assert_eq!(section.data[0].init(), b"hi");
        assert!(matches!(&section.data[1], Data::Active { memory: MemoryIndex(1), .. }));
        assert_eq!(
            section.data[2],
            Data::Passive {
                init: b"abc".to_vec()
            }
        );

        assert_eq!(parse_all(&[0x01, 0x03], DataSection::parse), Err(ParseError::InvalidTag));
    }

    #[test]
    fn test_data_count_section() {
        assert_eq!(
            parse_all(&[0x03], DataCountSection::parse),
            Ok(DataCountSection { count: Some(3) })
        );
        assert_eq!(parse_all(&[], DataCountSection::parse), Ok(DataCountSection { count: None }));
    }

    #[test]
    fn test_details_strings() {
        let payload = vector(&[vec![0x60, 0x02, 0x7f, 0x7f, 0x01, 0x7f]]);
        let section = parse_all(&payload, TypeSection::parse).unwrap();
        assert_eq!(section.to_header_string(), "count: 1");
        assert_eq!(section.to_details_string(), " - type[0] (i32, i32) -> i32\n");
    }
}
