//! A WebAssembly binary format decoder.
//!
//! wasmdec reads `.wasm` bytes into an in-memory [`parser::module::Module`]:
//! the header is checked, every section is decoded into a structured value,
//! and function bodies and constant expressions become nested instruction
//! trees. Decoding stops at the first malformed byte and reports why.
//!
//! # Modules
//!
//! - [`parser::stream`] -- Byte sources with look-back and length limits.
//! - [`parser::reader`] -- LEB128, float, and vector primitives.
//! - [`parser::types`] -- Value, function, table, memory, and global types.
//! - [`parser::instruction`] -- Opcodes and the structured instruction decoder.
//! - [`parser::section`] -- The thirteen section kinds.
//! - [`parser::module`] -- Header checking and section dispatch.
//!
//! # Example
//!
//! ```
//! use wasmdec::parser;
//!
//! let bytes = [0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];
//! let module = parser::decode(&bytes).unwrap();
//! assert!(module.sections().is_empty());
//! ```
//!
//! # Specification
//!
//! Targets the binary format of the [WebAssembly 2.0
//! specification](https://webassembly.github.io/spec/core/binary/index.html),
//! without the SIMD and threads proposals.

pub mod parser;
