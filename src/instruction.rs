//! The mutable opcode+operand object both the simulator and the assembler
//! build up one param at a time, then `finalize()` into its word sequence.

use crate::error::RuntimeError;
use crate::opcode::{self, lookup_by_opcode, opcode_in_mid_range, OpcodeDef};

#[derive(Debug, Clone)]
pub struct Instruction {
    pub def: &'static OpcodeDef,
    working_opcode: u16,
    second_word: u16,
    immediate_operand: Option<u16>,
    immediate_source_operand: Option<u16>,
    immediate_dest_operand: Option<u16>,
    finalized: bool,
}

impl Instruction {
    /// Start building an instruction from a mnemonic, with every param bit
    /// left at the opcode's minimum encoding.
    pub fn from_mnemonic(mnemonic: &str) -> Option<Instruction> {
        let def = opcode::lookup_by_name(mnemonic)?;
        Some(Instruction {
            def,
            working_opcode: def.opcode,
            second_word: 0,
            immediate_operand: None,
            immediate_source_operand: None,
            immediate_dest_operand: None,
            finalized: false,
        })
    }

    /// Decode a first opcode word fetched from memory at `pc` (folded into
    /// any resulting error so the host can report where the fault happened).
    /// The caller supplies `second_word` up front since whether one exists,
    /// and its value, is only known after the format lookup this
    /// constructor performs.
    pub fn decode(word: u16, second_word: u16, pc: u16) -> Result<Instruction, RuntimeError> {
        let def = lookup_by_opcode(word).ok_or_else(|| {
            if opcode_in_mid_range(word) {
                log::debug!(target: "cpudec", "macro instruction gap at pc={:#06x} opcode word 0x{:04X}", pc, word);
                RuntimeError::MacroInstructionGap { pc, word }
            } else {
                log::debug!(target: "cpudec", "illegal opcode encountered at pc={:#06x}: 0x{:04X}", pc, word);
                RuntimeError::IllegalOpcode { pc, word }
            }
        })?;
        let second_word = if def.has_second_opcode_word() {
            second_word
        } else {
            0
        };
        Ok(Instruction {
            def,
            working_opcode: word,
            second_word,
            immediate_operand: None,
            immediate_source_operand: None,
            immediate_dest_operand: None,
            finalized: false,
        })
    }

    fn packed(&self) -> u32 {
        (u32::from(self.working_opcode) << 16) | u32::from(self.second_word)
    }

    fn set_packed(&mut self, packed: u32) {
        self.working_opcode = (packed >> 16) as u16;
        self.second_word = packed as u16;
    }

    pub fn get_param(&self, name: &str) -> u32 {
        self.def.format().read(self.packed(), name)
    }

    pub fn set_param(&mut self, name: &str, value: u32) {
        assert!(!self.finalized, "cannot mutate a finalized instruction");
        let packed = self.def.format().write(self.packed(), name, value);
        self.set_packed(packed);
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.def.format().has_param(name)
    }

    pub fn immediate_operand(&self) -> Option<u16> {
        self.immediate_operand
    }

    pub fn set_immediate_operand(&mut self, value: u16) {
        assert!(!self.finalized, "cannot mutate a finalized instruction");
        assert!(
            self.def.format().has_immediate_word(),
            "{} has no immediate word slot",
            self.def.name
        );
        self.immediate_operand = Some(value);
    }

    pub fn immediate_source_operand(&self) -> Option<u16> {
        self.immediate_source_operand
    }

    pub fn set_immediate_source_operand(&mut self, value: u16) {
        assert!(!self.finalized, "cannot mutate a finalized instruction");
        assert!(
            self.def.has_possible_immediate_source(),
            "{} has no Ts operand",
            self.def.name
        );
        self.immediate_source_operand = Some(value);
    }

    pub fn immediate_dest_operand(&self) -> Option<u16> {
        self.immediate_dest_operand
    }

    pub fn set_immediate_dest_operand(&mut self, value: u16) {
        assert!(!self.finalized, "cannot mutate a finalized instruction");
        assert!(
            self.def.has_possible_immediate_dest(),
            "{} has no Td operand",
            self.def.name
        );
        self.immediate_dest_operand = Some(value);
    }

    pub fn working_opcode(&self) -> u16 {
        self.working_opcode
    }

    pub fn second_word(&self) -> u16 {
        self.second_word
    }

    /// Lock the instruction against further param mutation. Idempotent
    /// calls are a phase misuse and panic, same as the execution process's
    /// phase ordering.
    pub fn finalize(&mut self) {
        assert!(!self.finalized, "instruction already finalized");
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// The word sequence this instruction encodes to, in memory order:
    /// working opcode, optional second opcode word, then any follow-on
    /// immediate/address words a symbolic or indexed Ts/Td consumed.
    pub fn words(&self) -> Vec<u16> {
        let mut words = vec![self.working_opcode];
        if self.def.has_second_opcode_word() {
            words.push(self.second_word);
        }
        if let Some(w) = self.immediate_operand {
            words.push(w);
        }
        if let Some(w) = self.immediate_source_operand {
            words.push(w);
        }
        if let Some(w) = self.immediate_dest_operand {
            words.push(w);
        }
        words
    }
}
