//! The top-level state machine: interrupt check → fetch → decode → execute
//! → writeback → jump resolution → prefetch, looping back to interrupt
//! check. `step()` advances exactly one state; `step_instruction()` runs
//! until the next writeback-then-prefetch boundary.

use crate::error::RuntimeError;
use crate::execution::process::ExecutionProcess;
use crate::memory::Memory;
use crate::status::{ErrorFlags, InterruptList, StatusRegister, ERROR_FLAG_ILLEGAL_OPCODE, ERROR_FLAG_PRIVILEGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    IntCheck,
    IntService,
    Fetch,
    Begin,
    OperandFetch,
    Execute,
    Writeback,
    JumpResolve,
    Prefetch,
    Error,
}

pub struct Flow {
    pub pc: u16,
    pub wp: u16,
    state: FlowState,
    next_pc: u16,
    process: ExecutionProcess,
    last_error: Option<RuntimeError>,
}

impl Flow {
    pub fn new(pc: u16, wp: u16) -> Flow {
        Flow {
            pc,
            wp,
            state: FlowState::IntCheck,
            next_pc: pc,
            process: ExecutionProcess::new(),
            last_error: None,
        }
    }

    pub fn reset(&mut self, pc: u16, wp: u16) {
        self.pc = pc;
        self.wp = wp;
        self.next_pc = pc;
        self.state = FlowState::IntCheck;
        self.process = ExecutionProcess::new();
        self.last_error = None;
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn last_error(&self) -> Option<&RuntimeError> {
        self.last_error.as_ref()
    }

    pub fn current_mnemonic(&self) -> Option<&'static str> {
        self.process.current_instruction().map(|i| i.def.name)
    }

    pub fn current_opcode_word(&self) -> Option<u16> {
        self.process.current_instruction().map(|i| i.working_opcode())
    }

    /// Advance exactly one state transition. Returns the state the machine
    /// was in *before* this call, matching the host API's `step()` contract.
    pub fn step(
        &mut self,
        memory: &mut Memory,
        status: &mut StatusRegister,
        interrupts: &mut InterruptList,
        error_flags: &mut ErrorFlags,
    ) -> FlowState {
        let previous = self.state;
        match self.state {
            FlowState::Idle => {
                if interrupts.nmi_pending()
                    || interrupts.lowest_servable(status.interrupt_mask()).is_some()
                {
                    self.state = FlowState::IntCheck;
                }
            }
            FlowState::IntCheck => {
                if interrupts.nmi_pending()
                    || interrupts.lowest_servable(status.interrupt_mask()).is_some()
                {
                    self.state = FlowState::IntService;
                } else {
                    self.state = FlowState::Fetch;
                }
            }
            FlowState::IntService => {
                self.service_interrupt(memory, status, interrupts);
                self.state = FlowState::Fetch;
            }
            FlowState::Fetch => {
                self.pc = self.next_pc;
                match self.process.load(self.pc, memory) {
                    Ok(()) => {
                        if self.process.requires_privilege() && !status.privileged() {
                            let mnemonic = self.current_mnemonic().unwrap_or("?").to_string();
                            log::warn!(target: "flow", "privilege violation at pc={:#06x}: {}", self.pc, mnemonic);
                            error_flags.set(ERROR_FLAG_PRIVILEGE);
                            self.last_error = Some(RuntimeError::PrivilegeViolation {
                                pc: self.pc,
                                mnemonic,
                            });
                            self.state = FlowState::Error;
                        } else {
                            self.state = FlowState::Begin;
                        }
                    }
                    Err(e) => {
                        self.state = self.handle_runtime_error(e, error_flags, interrupts);
                    }
                }
            }
            FlowState::Begin => match self.process.begin() {
                Ok(()) => self.state = FlowState::OperandFetch,
                Err(e) => self.state = self.handle_runtime_error(e, error_flags, interrupts),
            },
            FlowState::OperandFetch => match self.process.fetch_operands(memory, self.wp) {
                Ok(()) => self.state = FlowState::Execute,
                Err(e) => self.state = self.handle_runtime_error(e, error_flags, interrupts),
            },
            FlowState::Execute => {
                self.process.execute(status);
                self.state = FlowState::Writeback;
            }
            FlowState::Writeback => {
                self.process.write_results(memory, self.wp);
                self.state = FlowState::JumpResolve;
            }
            FlowState::JumpResolve => {
                self.resolve_jump_and_pc();
                self.state = FlowState::Prefetch;
            }
            FlowState::Prefetch => {
                self.state = FlowState::IntCheck;
            }
            FlowState::Error => {}
        }
        log::trace!(target: "flow", "{:?} -> {:?} (pc={:#06x})", previous, self.state, self.pc);
        previous
    }

    /// Run `step()` until a full begin→...→prefetch cycle has completed (or
    /// the machine enters the error state).
    pub fn step_instruction(
        &mut self,
        memory: &mut Memory,
        status: &mut StatusRegister,
        interrupts: &mut InterruptList,
        error_flags: &mut ErrorFlags,
    ) -> FlowState {
        let first = self.state;
        loop {
            let previous = self.step(memory, status, interrupts, error_flags);
            if matches!(previous, FlowState::Prefetch) || self.state == FlowState::Error {
                return first;
            }
        }
    }

    fn handle_runtime_error(
        &mut self,
        error: RuntimeError,
        error_flags: &mut ErrorFlags,
        interrupts: &InterruptList,
    ) -> FlowState {
        log::warn!(target: "flow", "runtime error at pc={:#06x}: {:?}", self.pc, error);
        error_flags.set(ERROR_FLAG_ILLEGAL_OPCODE);
        self.last_error = Some(error);
        if interrupts.is_raised(2) {
            FlowState::IntService
        } else {
            FlowState::Error
        }
    }

    fn service_interrupt(
        &mut self,
        memory: &mut Memory,
        status: &mut StatusRegister,
        interrupts: &mut InterruptList,
    ) {
        let level = if interrupts.nmi_pending() {
            None
        } else {
            interrupts.lowest_servable(status.interrupt_mask())
        };
        let (vector_wp, vector_pc) = match level {
            Some(n) => (
                memory.get_word(4 * u16::from(n)),
                memory.get_word(4 * u16::from(n) + 2),
            ),
            None => (memory.get_word(0xFFFC), memory.get_word(0xFFFE)),
        };
        let old_wp = self.wp;
        let old_pc = self.pc;
        let old_status = status.word();
        memory.set_word(vector_wp.wrapping_add(2 * 13), old_wp);
        memory.set_word(vector_wp.wrapping_add(2 * 14), old_pc);
        memory.set_word(vector_wp.wrapping_add(2 * 15), old_status);
        self.wp = vector_wp;
        self.pc = vector_pc;
        self.next_pc = vector_pc;
        if let Some(n) = level {
            status.set_interrupt_mask(n.saturating_sub(1));
            interrupts.clear(n);
        }
    }

    fn resolve_jump_and_pc(&mut self) {
        let pc_before = self.process.current_pc();
        let offset = self.process.pc_offset();
        let mut pc_after = pc_before.wrapping_add(2).wrapping_add(offset);
        if let Some(unit) = self.process.unit() {
            if let Some((taken, disp)) = unit.jump_result() {
                if taken {
                    let delta: i32 = 2 + 2 * disp;
                    pc_after = (i32::from(pc_before) + delta) as u16;
                }
            } else if let Some(new_pc) = unit.new_pc() {
                pc_after = new_pc;
            }
            if let Some(new_wp) = unit.new_wp() {
                self.wp = new_wp;
            }
        }
        self.pc = pc_after;
        self.next_pc = pc_after;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn boot() -> (Flow, Memory, StatusRegister, InterruptList, ErrorFlags) {
        (
            Flow::new(0x0100, 0x0080),
            Memory::new(),
            StatusRegister::new(),
            InterruptList::new(),
            ErrorFlags::new(),
        )
    }

    #[test]
    fn load_immediate_then_step_instruction_sets_register() {
        let (mut flow, mut mem, mut status, mut interrupts, mut errors) = boot();
        mem.set_word(0x0100, 0x0201); // LI R1,>1234
        mem.set_word(0x0102, 0x1234);
        flow.step_instruction(&mut mem, &mut status, &mut interrupts, &mut errors);
        assert_eq!(mem.get_word(0x0080 + 2), 0x1234);
        assert_eq!(flow.pc, 0x0104);
        assert!(status.a_gt());
    }

    #[test]
    fn jump_target_matches_the_stated_law() {
        let (mut flow, mut mem, mut status, mut interrupts, mut errors) = boot();
        mem.set_word(0x0100, 0x1305); // JMP, disp=5
        flow.step_instruction(&mut mem, &mut status, &mut interrupts, &mut errors);
        assert_eq!(flow.pc, 0x0100 + 2 + 2 * 5);
    }

    #[test]
    fn illegal_opcode_sets_error_flag_and_halts() {
        let (mut flow, mut mem, mut status, mut interrupts, mut errors) = boot();
        mem.set_word(0x0100, 0x0010); // inside the declared MID gap
        flow.step_instruction(&mut mem, &mut status, &mut interrupts, &mut errors);
        assert_eq!(flow.state(), FlowState::Error);
        assert!(errors.get(crate::status::ERROR_FLAG_ILLEGAL_OPCODE));
    }
}
