//! Opcode decoding: the format table (bit geometry) and the catalog
//! (mnemonic identity, legality range, semantics metadata) that sits on
//! top of it.

pub mod catalog;
pub mod format;

pub use catalog::{
    lookup_by_name, lookup_by_opcode, opcode_in_mid_range, OpcodeDef, PlatformMask, ALL_PLATFORMS,
    MID_RANGES, TMS99105_ONLY,
};
pub use format::{lookup as lookup_format, FormatDescriptor};
