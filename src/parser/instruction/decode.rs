//! Instruction decoding from binary format

use super::{Arguments, Expression, Instruction, MemoryArgument, OpCode};
use crate::parser::error::{with_eof_check, ParseError, ParseResult};
use crate::parser::limits::{MAX_BR_TABLE_LABELS, MAX_NESTING_DEPTH, MAX_SELECT_TYPED_VALUES};
use crate::parser::reader::{read_f32, read_f64, read_vector, read_vs32, read_vs64, read_vu32};
use crate::parser::stream::Stream;
use crate::parser::types::{
    BlockType, DataIndex, ElementIndex, FunctionIndex, GlobalIndex, LabelIndex, LocalIndex, TableIndex,
    TypeIndex, ValueType,
};

/// The opcode that closed an instruction sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    End,
    Else,
}

impl MemoryArgument {
    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<MemoryArgument> {
        let align = read_vu32(stream).map_err(|_| with_eof_check(stream, ParseError::InvalidInput))?;
        let offset = read_vu32(stream).map_err(|_| with_eof_check(stream, ParseError::InvalidInput))?;
        Ok(MemoryArgument { align, offset })
    }
}

impl Instruction {
    /// Decodes one instruction, including everything nested inside it when it
    /// is a structured instruction. A bare `end` or `else` is not an
    /// instruction on its own and is rejected.
    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<Instruction> {
        let opcode = read_opcode(stream)?;
        if opcode == OpCode::END || opcode == OpCode::ELSE {
            return Err(ParseError::InvalidInput);
        }
        parse_instruction(stream, opcode, 0)
    }
}

impl Expression {
    /// Decodes instructions up to and including the closing `end`.
    pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<Expression> {
        let (instructions, _) = parse_sequence(stream, 0, false)?;
        Ok(Expression { instructions })
    }
}

/// Decodes instructions until `end`, or until `else` when `allow_else` is set,
/// and reports which of the two closed the sequence.
pub fn parse_sequence<S: Stream + ?Sized>(
    stream: &mut S,
    depth: u32,
    allow_else: bool,
) -> ParseResult<(Vec<Instruction>, Terminator)> {
    let mut instructions = Vec::new();
    loop {
        let opcode = read_opcode(stream)?;
        match opcode {
            OpCode::END => return Ok((instructions, Terminator::End)),
            OpCode::ELSE if allow_else => return Ok((instructions, Terminator::Else)),
            OpCode::ELSE => return Err(ParseError::InvalidInput),
            _ => instructions.push(parse_instruction(stream, opcode, depth)?),
        }
    }
}

fn read_opcode<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<OpCode> {
    let byte = stream
        .read_byte()
        .map_err(|_| with_eof_check(stream, ParseError::ExpectedValueOrTerminator))?;
    match byte {
        OpCode::EXTENDED_PREFIX => {
            let sub_opcode = read_vu32(stream).map_err(|_| with_eof_check(stream, ParseError::InvalidInput))?;
            if sub_opcode > OpCode::MAX_EXTENDED_SUB_OPCODE {
                return Err(ParseError::InvalidTag);
            }
            Ok(OpCode::extended(sub_opcode))
        }
        OpCode::SIMD_PREFIX | OpCode::THREADS_PREFIX => Err(ParseError::NotImplemented),
        _ => Ok(OpCode(byte as u32)),
    }
}

/// `memory.size`, `memory.grow` and the bulk memory instructions carry a
/// memory index that must be zero.
fn read_reserved_byte<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<()> {
    let byte = stream
        .read_byte()
        .map_err(|_| with_eof_check(stream, ParseError::ExpectedIndex))?;
    if byte != 0 {
        return Err(ParseError::InvalidIndex);
    }
    Ok(())
}

fn parse_nested<S: Stream + ?Sized>(stream: &mut S, opcode: OpCode, depth: u32) -> ParseResult<Arguments> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(ParseError::InvalidInput);
    }
    let block_type = BlockType::parse(stream)?;

    if opcode == OpCode::IF {
        let (then_instructions, terminator) = parse_sequence(stream, depth + 1, true)?;
        let else_instructions = match terminator {
            Terminator::Else => Some(parse_sequence(stream, depth + 1, false)?.0),
            Terminator::End => None,
        };
        return Ok(Arguments::IfElse {
            block_type,
            then_instructions,
            else_instructions,
        });
    }

    let (instructions, _) = parse_sequence(stream, depth + 1, false)?;
    Ok(Arguments::Block {
        block_type,
        instructions,
    })
}

fn parse_instruction<S: Stream + ?Sized>(stream: &mut S, opcode: OpCode, depth: u32) -> ParseResult<Instruction> {
    let arguments = match opcode {
        OpCode::BLOCK | OpCode::LOOP | OpCode::IF => parse_nested(stream, opcode, depth)?,
        OpCode::BR | OpCode::BR_IF => Arguments::LabelIndex(LabelIndex::parse(stream)?),
        OpCode::BR_TABLE => {
            let labels = read_vector(stream, MAX_BR_TABLE_LABELS, LabelIndex::parse)?;
            let default = LabelIndex::parse(stream)?;
            Arguments::TableBranch { labels, default }
        }
        OpCode::CALL | OpCode::REF_FUNC => Arguments::FunctionIndex(FunctionIndex::parse(stream)?),
        OpCode::CALL_INDIRECT => Arguments::IndirectCall {
            type_index: TypeIndex::parse(stream)?,
            table_index: TableIndex::parse(stream)?,
        },
        OpCode::SELECT_TYPED => Arguments::ValueTypes(read_vector(stream, MAX_SELECT_TYPED_VALUES, ValueType::parse)?),
        OpCode::LOCAL_GET | OpCode::LOCAL_SET | OpCode::LOCAL_TEE => Arguments::LocalIndex(LocalIndex::parse(stream)?),
        OpCode::GLOBAL_GET | OpCode::GLOBAL_SET => Arguments::GlobalIndex(GlobalIndex::parse(stream)?),
        OpCode::TABLE_GET | OpCode::TABLE_SET | OpCode::TABLE_GROW | OpCode::TABLE_SIZE | OpCode::TABLE_FILL => {
            Arguments::TableIndex(TableIndex::parse(stream)?)
        }
        op if op.is_memory_access() => Arguments::MemoryArgument(MemoryArgument::parse(stream)?),
        OpCode::MEMORY_SIZE | OpCode::MEMORY_GROW | OpCode::MEMORY_FILL => {
            read_reserved_byte(stream)?;
            Arguments::None
        }
        OpCode::MEMORY_COPY => {
            read_reserved_byte(stream)?;
            read_reserved_byte(stream)?;
            Arguments::None
        }
        OpCode::MEMORY_INIT => {
            let index = DataIndex::parse(stream)?;
            read_reserved_byte(stream)?;
            Arguments::DataIndex(index)
        }
        OpCode::DATA_DROP => Arguments::DataIndex(DataIndex::parse(stream)?),
        OpCode::TABLE_INIT => Arguments::TableElement {
            element: ElementIndex::parse(stream)?,
            table: TableIndex::parse(stream)?,
        },
        OpCode::ELEM_DROP => Arguments::ElementIndex(ElementIndex::parse(stream)?),
        OpCode::TABLE_COPY => Arguments::TableTable {
            lhs: TableIndex::parse(stream)?,
            rhs: TableIndex::parse(stream)?,
        },
        OpCode::I32_CONST => {
            Arguments::I32(read_vs32(stream).map_err(|_| with_eof_check(stream, ParseError::InvalidInput))?)
        }
        OpCode::I64_CONST => {
            Arguments::I64(read_vs64(stream).map_err(|_| with_eof_check(stream, ParseError::InvalidInput))?)
        }
        OpCode::F32_CONST => Arguments::F32(read_f32(stream)?),
        OpCode::F64_CONST => Arguments::F64(read_f64(stream)?),
        OpCode::REF_NULL => {
            let value_type = ValueType::parse(stream)?;
            if !value_type.is_reference() {
                return Err(ParseError::InvalidType);
            }
            Arguments::ValueType(value_type)
        }
        op if op.is_known() => Arguments::None,
        _ => return Err(ParseError::InvalidTag),
    };
    Ok(Instruction { opcode, arguments })
}
