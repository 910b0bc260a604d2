//! Holds the in-flight instruction and drives it through its four phases
//! in strict order, tracking the PC offset that follow-on words accrue.

use super::units::{unit_for, GeneralUnit};
use super::{Context, ExecutionUnit};
use crate::error::RuntimeError;
use crate::instruction::Instruction;
use crate::memory::Memory;
use crate::status::StatusRegister;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingBegin,
    AwaitingFetch,
    AwaitingExecute,
    AwaitingWrite,
    Retired,
}

pub struct ExecutionProcess {
    current_pc: u16,
    current: Option<Instruction>,
    unit: Option<GeneralUnit>,
    phase: Phase,
    pc_offset: u16,
}

impl ExecutionProcess {
    pub fn new() -> ExecutionProcess {
        ExecutionProcess {
            current_pc: 0,
            current: None,
            unit: None,
            phase: Phase::Retired,
            pc_offset: 0,
        }
    }

    /// Decode the opcode word at `pc` (peeking a second opcode word from
    /// memory if the format needs one) and make it the current instruction.
    pub fn load(&mut self, pc: u16, memory: &Memory) -> Result<(), RuntimeError> {
        assert!(
            matches!(self.phase, Phase::Retired),
            "phase misuse: load() called before the previous instruction retired"
        );
        let word = memory.get_word(pc);
        let peek = memory.get_word(pc.wrapping_add(2));
        let instr = Instruction::decode(word, peek, pc)?;
        self.current_pc = pc;
        self.pc_offset = 0;
        self.unit = Some(unit_for(&instr));
        self.current = Some(instr);
        self.phase = Phase::AwaitingBegin;
        Ok(())
    }

    pub fn begin(&mut self) -> Result<(), RuntimeError> {
        assert_eq!(
            self.phase,
            Phase::AwaitingBegin,
            "phase misuse: begin() called out of order"
        );
        let instr = self.current.as_ref().expect("load() not called");
        self.unit.as_ref().unwrap().validate_opcode(instr)?;
        if instr.def.has_second_opcode_word() {
            self.pc_offset += 2;
        }
        self.phase = Phase::AwaitingFetch;
        Ok(())
    }

    pub fn fetch_operands(
        &mut self,
        memory: &mut Memory,
        wp: u16,
    ) -> Result<(), RuntimeError> {
        assert_eq!(
            self.phase,
            Phase::AwaitingFetch,
            "phase misuse: fetch_operands() called out of order"
        );
        {
            let instr = self.current.as_mut().expect("load() not called");
            let format = instr.def.format();
            if format.has_immediate_word() {
                let word = memory.get_word(self.current_pc.wrapping_add(2).wrapping_add(self.pc_offset));
                instr.set_immediate_operand(word);
                self.pc_offset += 2;
            }
            if instr.def.has_possible_immediate_source() && instr.get_param("Ts") == super::MODE_SYMBOLIC_OR_INDEXED {
                let word = memory.get_word(self.current_pc.wrapping_add(2).wrapping_add(self.pc_offset));
                instr.set_immediate_source_operand(word);
                self.pc_offset += 2;
            }
            if instr.def.has_possible_immediate_dest() && instr.get_param("Td") == super::MODE_SYMBOLIC_OR_INDEXED {
                let word = memory.get_word(self.current_pc.wrapping_add(2).wrapping_add(self.pc_offset));
                instr.set_immediate_dest_operand(word);
                self.pc_offset += 2;
            }
        }
        let instr = self.current.as_ref().unwrap();
        let ctx = Context {
            memory,
            wp,
            pc: self.current_pc.wrapping_add(2).wrapping_add(self.pc_offset),
        };
        self.unit.as_mut().unwrap().fetch_operands(instr, &ctx)?;
        self.phase = Phase::AwaitingExecute;
        Ok(())
    }

    pub fn execute(&mut self, status: &mut StatusRegister) {
        assert_eq!(
            self.phase,
            Phase::AwaitingExecute,
            "phase misuse: execute() called out of order"
        );
        let instr = self.current.as_ref().expect("load() not called");
        self.unit.as_mut().unwrap().execute(instr, status);
        self.phase = Phase::AwaitingWrite;
    }

    pub fn write_results(&mut self, memory: &mut Memory, wp: u16) {
        assert_eq!(
            self.phase,
            Phase::AwaitingWrite,
            "phase misuse: write_results() called out of order"
        );
        let instr = self.current.as_ref().expect("load() not called");
        let mut ctx = Context {
            memory,
            wp,
            pc: self.current_pc.wrapping_add(2).wrapping_add(self.pc_offset),
        };
        self.unit.as_mut().unwrap().write_results(instr, &mut ctx);
        self.phase = Phase::Retired;
    }

    pub fn is_retired(&self) -> bool {
        matches!(self.phase, Phase::Retired)
    }

    pub fn pc_offset(&self) -> u16 {
        self.pc_offset
    }

    pub fn current_pc(&self) -> u16 {
        self.current_pc
    }

    pub fn requires_privilege(&self) -> bool {
        self.unit.as_ref().is_some_and(|u| u.requires_privilege())
    }

    pub fn current_instruction(&self) -> Option<&Instruction> {
        self.current.as_ref()
    }

    pub fn unit(&self) -> Option<&GeneralUnit> {
        self.unit.as_ref()
    }
}

impl Default for ExecutionProcess {
    fn default() -> ExecutionProcess {
        ExecutionProcess::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    #[should_panic]
    fn begin_before_load_panics() {
        let mut process = ExecutionProcess::new();
        process.begin().ok();
    }

    #[test]
    fn li_walks_all_four_phases() {
        let mut mem = Memory::new();
        mem.set_word(0x0100, 0x0201); // LI R1,...
        mem.set_word(0x0102, 0x1234);
        let mut status = StatusRegister::new();
        let mut process = ExecutionProcess::new();
        process.load(0x0100, &mem).unwrap();
        process.begin().unwrap();
        process.fetch_operands(&mut mem, 0x0080).unwrap();
        process.execute(&mut status);
        process.write_results(&mut mem, 0x0080);
        assert!(process.is_retired());
        assert_eq!(process.pc_offset(), 2);
        assert_eq!(mem.get_word(0x0080 + 2), 0x1234);
    }
}
