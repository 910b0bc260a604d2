//! The two-pass TI-style assembler: line parsing, a symbol table, segment
//! tracking, and the pass 1/pass 2 driver that ties them together.

pub mod line;
pub mod pass;
pub mod segment;
pub mod symbol;

pub use pass::{assemble, AssembleOutput};
