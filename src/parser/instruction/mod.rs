//! WebAssembly instruction representation
//!
//! An [`Instruction`] is an opcode plus exactly one [`Arguments`] payload. The
//! payload shape is decided by the opcode alone; structured instructions own
//! their nested instruction sequences, so a function body is a tree.

pub mod decode;
pub mod opcode;

pub use decode::Terminator;
pub use opcode::OpCode;

use fhex::ToHex;
use serde::Serialize;
use std::fmt;

use super::types::{
    BlockType, DataIndex, ElementIndex, FunctionIndex, GlobalIndex, LabelIndex, LocalIndex, TableIndex,
    TypeIndex, ValueType,
};

/// Memory argument for loads and stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryArgument {
    /// Alignment hint, as a power of 2
    pub align: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Arguments {
    None,
    /// `block` and `loop`
    Block {
        block_type: BlockType,
        instructions: Vec<Instruction>,
    },
    /// `if`, with the `else` arm present only when it was encoded
    IfElse {
        block_type: BlockType,
        then_instructions: Vec<Instruction>,
        else_instructions: Option<Vec<Instruction>>,
    },
    DataIndex(DataIndex),
    ElementIndex(ElementIndex),
    FunctionIndex(FunctionIndex),
    IndirectCall {
        type_index: TypeIndex,
        table_index: TableIndex,
    },
    LabelIndex(LabelIndex),
    LocalIndex(LocalIndex),
    GlobalIndex(GlobalIndex),
    MemoryArgument(MemoryArgument),
    TableBranch {
        labels: Vec<LabelIndex>,
        default: LabelIndex,
    },
    /// The table-element payload. `table.init` is the only instruction that
    /// pairs a table with element data, and it encodes the element segment
    /// index followed by the table index, so that is what is kept here rather
    /// than a table index with an element value type.
    TableElement {
        element: ElementIndex,
        table: TableIndex,
    },
    TableIndex(TableIndex),
    /// `table.copy`: destination then source
    TableTable {
        lhs: TableIndex,
        rhs: TableIndex,
    },
    ValueType(ValueType),
    ValueTypes(Vec<ValueType>),
    F32(f32),
    F64(f64),
    I32(i32),
    I64(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instruction {
    pub opcode: OpCode,
    pub arguments: Arguments,
}

impl Instruction {
    pub fn new(opcode: OpCode, arguments: Arguments) -> Instruction {
        Instruction { opcode, arguments }
    }

    /// The instruction sequences nested directly inside this one.
    pub fn nested(&self) -> Vec<&[Instruction]> {
        match &self.arguments {
            Arguments::Block { instructions, .. } => vec![instructions.as_slice()],
            Arguments::IfElse {
                then_instructions,
                else_instructions,
                ..
            } => match else_instructions {
                Some(else_instructions) => vec![then_instructions.as_slice(), else_instructions.as_slice()],
                None => vec![then_instructions.as_slice()],
            },
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;

        match &self.arguments {
            Arguments::None => {
                if self.opcode == OpCode::MEMORY_COPY {
                    write!(f, " 0 0")
                } else if matches!(
                    self.opcode,
                    OpCode::MEMORY_SIZE | OpCode::MEMORY_GROW | OpCode::MEMORY_FILL
                ) {
                    write!(f, " 0")
                } else {
                    Ok(())
                }
            }
            Arguments::Block { block_type, .. } | Arguments::IfElse { block_type, .. } => {
                write!(f, "{block_type}")
            }
            Arguments::DataIndex(index) => {
                if self.opcode == OpCode::MEMORY_INIT {
                    write!(f, " {index} 0")
                } else {
                    write!(f, " {index}")
                }
            }
            Arguments::ElementIndex(index) => write!(f, " {index}"),
            Arguments::FunctionIndex(index) => write!(f, " {index}"),
            Arguments::IndirectCall {
                type_index,
                table_index,
            } => write!(f, " {table_index} (type {type_index})"),
            Arguments::LabelIndex(index) => write!(f, " {index}"),
            Arguments::LocalIndex(index) => write!(f, " {index}"),
            Arguments::GlobalIndex(index) => write!(f, " {index}"),
            // align as log2, then offset
            Arguments::MemoryArgument(memarg) => write!(f, " {} {}", memarg.align, memarg.offset),
            Arguments::TableBranch { labels, default } => {
                for label in labels {
                    write!(f, " {label}")?;
                }
                write!(f, " {default}")
            }
            Arguments::TableElement { element, table } => write!(f, " {element} {table}"),
            Arguments::TableIndex(index) => write!(f, " {index}"),
            Arguments::TableTable { lhs, rhs } => write!(f, " {lhs} {rhs}"),
            Arguments::ValueType(value_type) => match value_type {
                ValueType::FuncRef => write!(f, " func"),
                ValueType::ExternRef => write!(f, " extern"),
                _ => write!(f, " {value_type}"),
            },
            Arguments::ValueTypes(value_types) => {
                for value_type in value_types {
                    write!(f, " {value_type}")?;
                }
                Ok(())
            }
            Arguments::F32(value) => write!(f, " {}", value.to_hex()),
            Arguments::F64(value) => write!(f, " {}", value.to_hex()),
            Arguments::I32(value) => write!(f, " {value}"),
            Arguments::I64(value) => write!(f, " {value}"),
        }
    }
}

/// An instruction sequence whose encoding ends with `end`. The terminator is
/// consumed while decoding and is not kept.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Expression {
    pub instructions: Vec<Instruction>,
}

impl Expression {
    pub fn new(instructions: Vec<Instruction>) -> Expression {
        Expression { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Writes the expression one instruction per line, nested sequences
    /// indented, with the `else` and `end` markers the encoding carried.
    pub fn write_tree(&self, f: &mut dyn fmt::Write, indent: usize) -> fmt::Result {
        write_sequence(f, &self.instructions, indent)
    }

    /// The expression on a single line, as used for initialisers and offsets.
    pub fn to_inline_string(&self) -> String {
        self.instructions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<String>>()
            .join(" ")
    }
}

fn write_sequence(f: &mut dyn fmt::Write, instructions: &[Instruction], indent: usize) -> fmt::Result {
    for instruction in instructions {
        writeln!(f, "{:indent$}{instruction}", "", indent = indent * 2)?;
        match &instruction.arguments {
            Arguments::Block { instructions, .. } => {
                write_sequence(f, instructions, indent + 1)?;
                writeln!(f, "{:indent$}end", "", indent = indent * 2)?;
            }
            Arguments::IfElse {
                then_instructions,
                else_instructions,
                ..
            } => {
                write_sequence(f, then_instructions, indent + 1)?;
                if let Some(else_instructions) = else_instructions {
                    writeln!(f, "{:indent$}else", "", indent = indent * 2)?;
                    write_sequence(f, else_instructions, indent + 1)?;
                }
                writeln!(f, "{:indent$}end", "", indent = indent * 2)?;
            }
            _ => {}
        }
    }
    Ok(())
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}
