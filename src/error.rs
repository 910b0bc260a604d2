//! Error types for assembly and simulation.
//!
//! `PhaseMisuse` is not a variant here: calling an execution phase out of
//! order is a programming error in the caller, not a recoverable runtime
//! condition, so it panics instead of round-tripping through `Result`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum AssembleError {
    #[error("line {line}: unknown mnemonic '{mnemonic}'")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("line {line}: undefined symbol '{symbol}'")]
    UndefinedSymbol { line: usize, symbol: String },

    #[error("line {line}: symbol '{symbol}' already defined")]
    DuplicateSymbol { line: usize, symbol: String },

    #[error("line {line}: malformed operand '{operand}'")]
    MalformedOperand { line: usize, operand: String },

    #[error("line {line}: jump displacement to '{target}' is out of range")]
    DisplacementOutOfRange { line: usize, target: String },

    #[error("line {line}: wrong number of operands for '{mnemonic}'")]
    OperandCountMismatch { line: usize, mnemonic: String },

    #[error("symbol resolution did not converge after {passes} passes")]
    ResolutionDidNotConverge { passes: usize },

    #[error("line {line}: directive '{directive}' used outside a segment")]
    DirectiveOutsideSegment { line: usize, directive: String },

    #[error("assembled image exceeds memory: {size} bytes")]
    ImageTooLarge { size: usize },
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RuntimeError {
    #[error("word {word:#06x} at PC {pc:#06x} is not a legal opcode")]
    IllegalOpcode { pc: u16, word: u16 },

    #[error("word {word:#06x} at PC {pc:#06x} falls in a declared MID gap")]
    MacroInstructionGap { pc: u16, word: u16 },

    #[error("'{mnemonic}' at PC {pc:#06x} requires privileged mode")]
    PrivilegeViolation { pc: u16, mnemonic: String },

    #[error("'{mnemonic}' is decoded but not executable on this simulator")]
    MIDNotImplemented { mnemonic: String },
}
