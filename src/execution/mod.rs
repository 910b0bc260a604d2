//! Per-instruction-family execution units: a shared four-phase contract
//! (`validate_opcode → fetch_operands → execute → write_results`) with one
//! concrete family implementation per instruction shape, dispatched by
//! mnemonic from the catalog entry the Execution Process already holds.

pub mod process;
pub mod units;

use crate::error::RuntimeError;
use crate::instruction::Instruction;
use crate::memory::Memory;
use crate::status::StatusRegister;

/// Addressing mode digit, per §4.1: 0 register direct, 1 register
/// indirect, 2 symbolic/indexed, 3 register indirect with post-increment.
pub const MODE_REGISTER: u32 = 0;
pub const MODE_INDIRECT: u32 = 1;
pub const MODE_SYMBOLIC_OR_INDEXED: u32 = 2;
pub const MODE_INDIRECT_AUTOINCREMENT: u32 = 3;

/// Everything an execution unit needs to read/write memory and registers.
/// Registers R0..R15 live in memory at `wp + 2*n`. `pc` is the address of
/// the instruction following the one in flight — the return address a
/// branch-and-link or context-switching unit saves.
pub struct Context<'a> {
    pub memory: &'a mut Memory,
    pub wp: u16,
    pub pc: u16,
}

impl<'a> Context<'a> {
    pub fn register_addr(&self, reg: u8) -> u16 {
        self.wp.wrapping_add(2 * u16::from(reg))
    }

    pub fn register(&self, reg: u8) -> u16 {
        self.memory.get_word(self.register_addr(reg))
    }

    pub fn set_register(&mut self, reg: u8, value: u16) {
        let addr = self.register_addr(reg);
        self.memory.set_word(addr, value);
    }
}

/// A resolved operand: the effective address (for writeback) and the value
/// found there, plus the follow-on words consumed finding it (used by the
/// Execution Process to advance the PC offset).
///
/// For a byte operand, `value` holds the byte in its low 8 bits regardless
/// of which half of the containing word it came from — callers never need
/// to know the address parity to read it.
#[derive(Debug, Clone, Copy)]
pub struct Operand {
    pub address: u16,
    pub value: u16,
    pub reg: u8,
    pub mode: u32,
    pub is_byte: bool,
}

/// Resolve a source/destination operand given its addressing-mode digit,
/// register number, and (for mode 2) the follow-on word already fetched
/// into the instruction's immediate-source/dest slot.
pub fn resolve_operand(
    ctx: &Context,
    mode: u32,
    reg: u8,
    follow_on: Option<u16>,
    is_byte: bool,
) -> Operand {
    let address = match mode {
        MODE_REGISTER => ctx.register_addr(reg),
        MODE_INDIRECT | MODE_INDIRECT_AUTOINCREMENT => ctx.register(reg),
        MODE_SYMBOLIC_OR_INDEXED => {
            let base = follow_on.unwrap_or(0);
            if reg == 0 {
                base
            } else {
                base.wrapping_add(ctx.register(reg))
            }
        }
        _ => unreachable!("addressing mode is a 2-bit field"),
    };
    let word = if mode == MODE_REGISTER {
        ctx.register(reg)
    } else {
        ctx.memory.get_word(address)
    };
    let value = if is_byte {
        if address & 1 == 0 {
            word >> 8
        } else {
            word & 0x00FF
        }
    } else {
        word
    };
    Operand {
        address,
        value,
        reg,
        mode,
        is_byte,
    }
}

/// Commit a value to a resolved operand, then apply post-increment if the
/// operand used that addressing mode. For a byte operand, `value`'s low 8
/// bits are written into whichever half of the word `op.address` selects,
/// leaving the other half untouched.
pub fn write_operand(ctx: &mut Context, op: &Operand, value: u16) {
    if op.is_byte {
        let word_addr = op.address & !1;
        let current = ctx.memory.get_word(word_addr);
        let byte = (value & 0x00FF) as u8;
        let merged = if op.address & 1 == 0 {
            (u16::from(byte) << 8) | (current & 0x00FF)
        } else {
            (current & 0xFF00) | u16::from(byte)
        };
        ctx.memory.set_word(word_addr, merged);
    } else if op.mode == MODE_REGISTER {
        ctx.set_register(op.reg, value);
    } else {
        ctx.memory.set_word(op.address, value);
    }
    if op.mode == MODE_INDIRECT_AUTOINCREMENT {
        let step = if op.is_byte { 1 } else { 2 };
        let updated = ctx.register(op.reg).wrapping_add(step);
        ctx.set_register(op.reg, updated);
    }
}

/// The four-phase contract every instruction family implements.
pub trait ExecutionUnit {
    fn validate_opcode(&self, instr: &Instruction) -> Result<(), RuntimeError>;
    fn fetch_operands(&mut self, instr: &Instruction, ctx: &Context) -> Result<(), RuntimeError>;
    fn execute(&mut self, instr: &Instruction, status: &mut StatusRegister);
    fn write_results(&mut self, instr: &Instruction, ctx: &mut Context);
    fn requires_privilege(&self) -> bool;
}

pub use units::unit_for;
