use std::fmt;

use log::debug;
use serde::Serialize;

use super::error::{with_eof_check, ParseError, ParseResult};
use super::reader::read_vu32;
use super::section::{
    CodeSection, CustomSection, DataCountSection, DataSection, ElementSection, ExportSection, FunctionSection,
    GlobalSection, ImportSection, MemorySection, SectionToString, StartSection, TableSection, TypeSection,
};
use super::stream::{ConstrainedStream, Stream};
use super::types::{FunctionIndex, Name};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Section {
    Custom(CustomSection),
    Type(TypeSection),
    Import(ImportSection),
    Function(FunctionSection),
    Table(TableSection),
    Memory(MemorySection),
    Global(GlobalSection),
    Export(ExportSection),
    Start(StartSection),
    Element(ElementSection),
    Code(CodeSection),
    Data(DataSection),
    DataCount(DataCountSection),
}

impl Section {
    /// Decodes the payload of the section with the given id. `stream` must be
    /// limited to the section's declared length.
    pub fn parse<S: Stream + ?Sized>(id: u8, stream: &mut S) -> ParseResult<Section> {
        Ok(match id {
            CustomSection::ID => Section::Custom(CustomSection::parse(stream)?),
            TypeSection::ID => Section::Type(TypeSection::parse(stream)?),
            ImportSection::ID => Section::Import(ImportSection::parse(stream)?),
            FunctionSection::ID => Section::Function(FunctionSection::parse(stream)?),
            TableSection::ID => Section::Table(TableSection::parse(stream)?),
            MemorySection::ID => Section::Memory(MemorySection::parse(stream)?),
            GlobalSection::ID => Section::Global(GlobalSection::parse(stream)?),
            ExportSection::ID => Section::Export(ExportSection::parse(stream)?),
            StartSection::ID => Section::Start(StartSection::parse(stream)?),
            ElementSection::ID => Section::Element(ElementSection::parse(stream)?),
            CodeSection::ID => Section::Code(CodeSection::parse(stream)?),
            DataSection::ID => Section::Data(DataSection::parse(stream)?),
            DataCountSection::ID => Section::DataCount(DataCountSection::parse(stream)?),
            _ => return Err(ParseError::InvalidTag),
        })
    }

    pub fn id(&self) -> u8 {
        match self {
            Section::Custom(_) => CustomSection::ID,
            Section::Type(_) => TypeSection::ID,
            Section::Import(_) => ImportSection::ID,
            Section::Function(_) => FunctionSection::ID,
            Section::Table(_) => TableSection::ID,
            Section::Memory(_) => MemorySection::ID,
            Section::Global(_) => GlobalSection::ID,
            Section::Export(_) => ExportSection::ID,
            Section::Start(_) => StartSection::ID,
            Section::Element(_) => ElementSection::ID,
            Section::Code(_) => CodeSection::ID,
            Section::Data(_) => DataSection::ID,
            Section::DataCount(_) => DataCountSection::ID,
        }
    }

    pub fn name(&self) -> &'static str {
        section_name(self.id())
    }

    fn as_section_to_string(&self) -> &dyn SectionToString {
        match self {
            Section::Custom(section) => section,
            Section::Type(section) => section,
            Section::Import(section) => section,
            Section::Function(section) => section,
            Section::Table(section) => section,
            Section::Memory(section) => section,
            Section::Global(section) => section,
            Section::Export(section) => section,
            Section::Start(section) => section,
            Section::Element(section) => section,
            Section::Code(section) => section,
            Section::Data(section) => section,
            Section::DataCount(section) => section,
        }
    }
}

impl SectionToString for Section {
    fn to_header_string(&self) -> String {
        self.as_section_to_string().to_header_string()
    }

    fn to_details_string(&self) -> String {
        self.as_section_to_string().to_details_string()
    }
}

fn section_name(id: u8) -> &'static str {
    match id {
        CustomSection::ID => "Custom",
        TypeSection::ID => "Type",
        ImportSection::ID => "Import",
        FunctionSection::ID => "Function",
        TableSection::ID => "Table",
        MemorySection::ID => "Memory",
        GlobalSection::ID => "Global",
        ExportSection::ID => "Export",
        StartSection::ID => "Start",
        ElementSection::ID => "Elem",
        CodeSection::ID => "Code",
        DataSection::ID => "Data",
        DataCountSection::ID => "DataCount",
        _ => "Unknown",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ExpectMagic,
    ExpectVersion,
    ReadingSections,
    Done,
}

/// A decoded module: its sections in the order they were encoded.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Module {
    sections: Vec<Section>,
}

macro_rules! first_section {
    ($($(#[$doc:meta])* $method:ident => $variant:ident($section:ty),)+) => {
        $(
            $(#[$doc])*
            pub fn $method(&self) -> Option<&$section> {
                self.sections.iter().find_map(|section| match section {
                    Section::$variant(inner) => Some(inner),
                    _ => None,
                })
            }
        )+
    };
}

impl Module {
    pub const MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];
    pub const VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

    pub fn new(sections: Vec<Section>) -> Module {
        Module { sections }
    }

    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<Module> {
        let mut sections = Vec::new();
        let mut state = State::ExpectMagic;

        loop {
            state = match state {
                State::ExpectMagic => {
                    let mut magic = [0u8; 4];
                    stream
                        .read_exact(&mut magic)
                        .map_err(|_| with_eof_check(stream, ParseError::InvalidModuleMagic))?;
                    if magic != Module::MAGIC {
                        return Err(ParseError::InvalidModuleMagic);
                    }
                    State::ExpectVersion
                }
                State::ExpectVersion => {
                    let mut version = [0u8; 4];
                    stream
                        .read_exact(&mut version)
                        .map_err(|_| with_eof_check(stream, ParseError::InvalidModuleVersion))?;
                    if version != Module::VERSION {
                        return Err(ParseError::InvalidModuleVersion);
                    }
                    debug!("module header accepted, version {}", u32::from_le_bytes(version));
                    State::ReadingSections
                }
                State::ReadingSections => {
                    if stream.unreliable_eof() {
                        State::Done
                    } else {
                        let mut id = [0u8; 1];
                        // the eof hint may lag; a zero-byte read is the real end
                        if stream.read(&mut id) == 0 {
                            State::Done
                        } else {
                            sections.push(Module::parse_section(id[0], stream)?);
                            State::ReadingSections
                        }
                    }
                }
                State::Done => {
                    debug!("module decoded: {} sections", sections.len());
                    return Ok(Module { sections });
                }
            };
        }
    }

    fn parse_section<S: Stream + ?Sized>(id: u8, stream: &mut S) -> ParseResult<Section> {
        let size = read_vu32(stream).map_err(|_| with_eof_check(stream, ParseError::ExpectedSize))?;
        debug!("section {} ({}): {} bytes", id, section_name(id), size);

        let mut section_stream = ConstrainedStream::new(stream, size as usize);
        let section = Section::parse(id, &mut section_stream)?;
        if section_stream.remaining() > 0 {
            return Err(with_eof_check(&section_stream, ParseError::InvalidSize));
        }
        Ok(section)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn into_sections(self) -> Vec<Section> {
        self.sections
    }

    first_section! {
        type_section => Type(TypeSection),
        import_section => Import(ImportSection),
        function_section => Function(FunctionSection),
        table_section => Table(TableSection),
        memory_section => Memory(MemorySection),
        global_section => Global(GlobalSection),
        export_section => Export(ExportSection),
        start_section => Start(StartSection),
        element_section => Element(ElementSection),
        code_section => Code(CodeSection),
        data_section => Data(DataSection),
        data_count_section => DataCount(DataCountSection),
    }

    /// Custom sections can appear any number of times, anywhere.
    pub fn custom_sections(&self) -> impl Iterator<Item = &CustomSection> {
        self.sections.iter().filter_map(|section| match section {
            Section::Custom(custom) => Some(custom),
            _ => None,
        })
    }

    pub fn get_function_name(&self, index: FunctionIndex) -> Option<&Name> {
        self.export_section()?.get_function_name(index)
    }

    pub fn to_details_string(&self) -> String {
        let mut result = String::new();
        for section in &self.sections {
            result.push_str(&format!("{}:\n", section.name()));
            result.push_str(&section.to_details_string());
        }
        result
    }

    /// Function bodies as indented instruction trees, numbered in the
    /// function index space (after any imported functions).
    pub fn disassemble(&self) -> String {
        let mut result = String::new();
        let code = match self.code_section() {
            Some(code) => code,
            None => return result,
        };
        let imported = self.import_section().map_or(0, ImportSection::function_count);

        for (offset, entry) in code.functions.iter().enumerate() {
            let index = FunctionIndex((imported + offset) as u32);
            match self.get_function_name(index) {
                Some(name) => result.push_str(&format!("func[{}] <{}>:\n", index, name)),
                None => result.push_str(&format!("func[{}]:\n", index)),
            }
            for run in &entry.func.locals {
                result.push_str(&format!("  locals: {} x {}\n", run.count, run.value_type));
            }
            // writing into a String can't fail
            let _ = entry.func.body.write_tree(&mut result, 1);
        }
        result
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Sections:")?;
        for section in &self.sections {
            writeln!(f, "{:>9} {}", section.name(), section.to_header_string())?;
        }
        Ok(())
    }
}
