//! Ceilings on every count and length the decoder trusts from its input.
//!
//! Values follow V8 (`src/wasm/wasm-limits.h`) so that a module this crate
//! accepts is one an engine would also be willing to load. A prefix above its
//! ceiling fails with `HugeAllocationRequested` before any storage is
//! reserved for it.

// =============================================================================
// Section entry counts
// =============================================================================

/// Entries in the type section
pub const MAX_TYPES: u32 = 1_000_000;
/// Entries in the function and code sections
pub const MAX_FUNCTIONS: u32 = 1_000_000;
pub const MAX_IMPORTS: u32 = 1_000_000;
pub const MAX_EXPORTS: u32 = 1_000_000;
pub const MAX_GLOBALS: u32 = 1_000_000;
pub const MAX_DATA_SEGMENTS: u32 = 100_000;
pub const MAX_ELEMENT_SEGMENTS: u32 = 100_000;
pub const MAX_TABLES: u32 = 100_000;
pub const MAX_MEMORIES: u32 = 100_000;

// =============================================================================
// Byte lengths
// =============================================================================

/// Import, export and custom section names
pub const MAX_STRING_LENGTH: u32 = 100_000;
/// The payload of one data segment (1 GiB)
pub const MAX_DATA_SEGMENT_SIZE: u32 = 1 << 30;
/// The declared size of one code entry
pub const MAX_FUNCTION_SIZE: u32 = 7_654_321;

// =============================================================================
// Signatures and bodies
// =============================================================================

pub const MAX_FUNCTION_PARAMS: u32 = 1_000;
pub const MAX_FUNCTION_RETURNS: u32 = 1_000;
/// Declared locals of one function, summed across all runs
pub const MAX_FUNCTION_LOCALS: u32 = 50_000;
/// `block`, `loop` and `if` nested inside one another
pub const MAX_NESTING_DEPTH: u32 = 256;

// =============================================================================
// Immediates and segment initialisers
// =============================================================================

/// Targets of one `br_table`, not counting the default
pub const MAX_BR_TABLE_LABELS: u32 = 65_536;
/// Result types of one typed `select`
pub const MAX_SELECT_TYPED_VALUES: u32 = 1_000;
/// Initialisers in one element segment
pub const MAX_TABLE_INIT_ENTRIES: u32 = 10_000_000;
