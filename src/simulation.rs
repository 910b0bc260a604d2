//! Owns the machine state — memory, status register, error flags,
//! interrupt list, and the Flow state machine — and exposes the host-facing
//! API: reset, step, run, load a byte image, assemble source text.

use crate::assembler::{self, AssembleOutput};
use crate::error::RuntimeError;
use crate::flow::{Flow, FlowState};
use crate::memory::{Memory, MEMORY_SIZE};
use crate::status::{ErrorFlags, InterruptList, StatusFlags, StatusRegister};

/// Default boot vectors per the external interface: every interrupt slot
/// (including NMI) starts out pointing at WP=0x0080, PC=0x0100.
const DEFAULT_WP: u16 = 0x0080;
const DEFAULT_PC: u16 = 0x0100;

/// Reset boots in privileged mode with every other flag clear, so a
/// freshly-booted machine can execute privileged instructions (LWPI, BLWP,
/// LIMI, ...) without first needing to elevate itself.
fn boot_status() -> StatusRegister {
    let mut status = StatusRegister::new();
    status.set_flag(StatusFlags::PRIV, true);
    status
}

pub struct Simulation {
    memory: Memory,
    status: StatusRegister,
    error_flags: ErrorFlags,
    interrupts: InterruptList,
    flow: Flow,
}

impl Simulation {
    pub fn new() -> Simulation {
        let mut sim = Simulation {
            memory: Memory::new(),
            status: boot_status(),
            error_flags: ErrorFlags::new(),
            interrupts: InterruptList::new(),
            flow: Flow::new(DEFAULT_PC, DEFAULT_WP),
        };
        sim.reset_interrupt_vectors();
        sim
    }

    /// Clear memory, status, error flags, and interrupts, and reboot Flow
    /// at the default vectors.
    pub fn reset(&mut self) {
        self.memory.reset();
        self.status = boot_status();
        self.error_flags.clear_all();
        self.interrupts = InterruptList::new();
        self.flow.reset(DEFAULT_PC, DEFAULT_WP);
        self.reset_interrupt_vectors();
    }

    /// Write every interrupt vector (WP at `4*N`, PC at `4*N+2`, for
    /// N in 0..16) plus the NMI vector (0xFFFC/0xFFFE) to the default boot
    /// values, without otherwise disturbing memory.
    pub fn reset_interrupt_vectors(&mut self) {
        for n in 0..16u16 {
            self.memory.set_word(4 * n, DEFAULT_WP);
            self.memory.set_word(4 * n + 2, DEFAULT_PC);
        }
        self.memory.set_word(0xFFFC, DEFAULT_WP);
        self.memory.set_word(0xFFFE, DEFAULT_PC);
    }

    pub fn load_bytes(&mut self, image: &[u8]) {
        self.memory.load(image);
    }

    pub fn step(&mut self) -> FlowState {
        self.flow.step(&mut self.memory, &mut self.status, &mut self.interrupts, &mut self.error_flags)
    }

    pub fn step_instruction(&mut self) -> FlowState {
        self.flow
            .step_instruction(&mut self.memory, &mut self.status, &mut self.interrupts, &mut self.error_flags)
    }

    /// Run `step_instruction` up to `limit` times, stopping early if Flow
    /// enters the error state. Returns the number of instructions retired.
    pub fn run(&mut self, limit: usize) -> usize {
        let mut retired = 0;
        for _ in 0..limit {
            if self.flow.state() == FlowState::Error {
                break;
            }
            self.step_instruction();
            retired += 1;
        }
        retired
    }

    pub fn assemble(&self, source: &str) -> AssembleOutput {
        assembler::assemble(source)
    }

    pub fn pc(&self) -> u16 {
        self.flow.pc
    }

    pub fn wp(&self) -> u16 {
        self.flow.wp
    }

    pub fn status(&self) -> StatusRegister {
        self.status
    }

    pub fn error_flags(&self) -> ErrorFlags {
        self.error_flags
    }

    pub fn interrupts_mut(&mut self) -> &mut InterruptList {
        &mut self.interrupts
    }

    pub fn flow_state(&self) -> FlowState {
        self.flow.state()
    }

    pub fn last_error(&self) -> Option<&RuntimeError> {
        self.flow.last_error()
    }

    pub fn current_mnemonic(&self) -> Option<&'static str> {
        self.flow.current_mnemonic()
    }

    pub fn current_opcode_word(&self) -> Option<u16> {
        self.flow.current_opcode_word()
    }

    /// Register `n` (0..=15), read out of its backing memory word at
    /// `wp + 2*n`.
    pub fn register(&self, n: u8) -> u16 {
        self.memory.get_word(self.flow.wp.wrapping_add(2 * u16::from(n)))
    }

    pub fn memory_image(&self) -> &[u8; MEMORY_SIZE] {
        self.memory.as_bytes()
    }
}

impl Default for Simulation {
    fn default() -> Simulation {
        Simulation::new()
    }
}
