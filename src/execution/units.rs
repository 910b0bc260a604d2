//! Concrete instruction families. One `Family` variant per instruction
//! shape; `GeneralUnit` carries the scratch state a single instruction's
//! four phases pass between each other.

use super::{resolve_operand, write_operand, Context, ExecutionUnit, Operand, MODE_REGISTER};
use crate::error::RuntimeError;
use crate::instruction::Instruction;
use crate::status::StatusRegister;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    TwoAddress(TwoAddressOp),
    CompareOrBoolean(CompareOrBooleanOp),
    SingleAddress(SingleAddressOp),
    Immediate(ImmediateOp),
    PureImmediate(PureImmediateOp),
    Shift(ShiftOp),
    Jump(JumpCond),
    LongJump(LongJumpCond),
    CruBit(CruBitOp),
    CruMulti(CruMultiOp),
    Xop,
    Rtwp,
    Mpys,
    Ldd,
    Tmb,
    Lwp,
    Blm,
    Bmw,
    PrivilegedNoOp,
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoAddressOp {
    Szc,
    S,
    C,
    A,
    Mov,
    Soc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOrBooleanOp {
    Coc,
    Czc,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleAddressOp {
    Stwp,
    Stst,
    Blwp,
    B,
    X,
    Clr,
    Neg,
    Inv,
    Inc,
    Inct,
    Dec,
    Dect,
    Bl,
    Swpb,
    Seto,
    Abs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateOp {
    Li,
    Ai,
    Andi,
    Ori,
    Ci,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PureImmediateOp {
    Lwpi,
    Limi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    Sla,
    Sra,
    Src,
    Srl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpCond {
    Always,
    Lt,
    Le,
    Eq,
    He,
    Gt,
    Ne,
    Nc,
    Oc,
    No,
    L,
    H,
    Op,
}

/// The two-instruction long-jump family (JMPL, JNEL): same condition
/// shape as the short jumps but with a full 16-bit displacement word
/// instead of an 8-bit field packed into the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongJumpCond {
    Always,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CruBitOp {
    Sbo,
    Sbz,
    Tb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CruMultiOp {
    Ldcr,
    Stcr,
}

fn family_for(name: &str) -> Family {
    use CompareOrBooleanOp::*;
    use CruBitOp::*;
    use CruMultiOp::*;
    use Family::*;
    use ImmediateOp::*;
    use JumpCond::*;
    use PureImmediateOp::*;
    use ShiftOp::*;
    use SingleAddressOp::*;
    use TwoAddressOp::*;

    match name {
        "SZC" | "SZCB" => TwoAddress(Szc),
        "S" | "SB" => TwoAddress(S),
        "C" | "CB" => TwoAddress(C),
        "A" | "AB" => TwoAddress(A),
        "MOV" | "MOVB" => TwoAddress(Mov),
        "SOC" | "SOCB" => TwoAddress(Soc),
        "COC" => CompareOrBoolean(Coc),
        "CZC" => CompareOrBoolean(Czc),
        "XOR" => CompareOrBoolean(Xor),
        "STWP" => SingleAddress(Stwp),
        "STST" => SingleAddress(Stst),
        "BLWP" => SingleAddress(Blwp),
        "B" => SingleAddress(SingleAddressOp::B),
        "X" => SingleAddress(SingleAddressOp::X),
        "CLR" => SingleAddress(Clr),
        "NEG" => SingleAddress(Neg),
        "INV" => SingleAddress(Inv),
        "INC" => SingleAddress(Inc),
        "INCT" => SingleAddress(Inct),
        "DEC" => SingleAddress(Dec),
        "DECT" => SingleAddress(Dect),
        "BL" => SingleAddress(Bl),
        "SWPB" => SingleAddress(Swpb),
        "SETO" => SingleAddress(Seto),
        "ABS" => SingleAddress(Abs),
        "LI" => Immediate(Li),
        "AI" => Immediate(Ai),
        "ANDI" => Immediate(Andi),
        "ORI" => Immediate(Ori),
        "CI" => Immediate(Ci),
        "LWPI" => PureImmediate(Lwpi),
        "LIMI" => PureImmediate(Limi),
        "SLA" => Shift(Sla),
        "SRA" => Shift(Sra),
        "SRC" => Shift(Src),
        "SRL" => Shift(Srl),
        "JMP" => Jump(Always),
        "JLT" => Jump(Lt),
        "JLE" => Jump(Le),
        "JEQ" => Jump(Eq),
        "JHE" => Jump(He),
        "JGT" => Jump(Gt),
        "JNE" => Jump(Ne),
        "JNC" => Jump(Nc),
        "JOC" => Jump(Oc),
        "JNO" => Jump(No),
        "JL" => Jump(L),
        "JH" => Jump(H),
        "JOP" => Jump(Op),
        "JMPL" => LongJump(LongJumpCond::Always),
        "JNEL" => LongJump(LongJumpCond::Ne),
        "SBO" => CruBit(Sbo),
        "SBZ" => CruBit(Sbz),
        "TB" => CruBit(Tb),
        "LDCR" => CruMulti(Ldcr),
        "STCR" => CruMulti(Stcr),
        "XOP" => Xop,
        "RTWP" => Rtwp,
        "MPYS" => Mpys,
        "LDD" => Ldd,
        "TMB" => Tmb,
        "LWP" => Lwp,
        "BLM" => Blm,
        "BMW" => Bmw,
        "IDLE" | "RSET" | "CKON" | "CKOF" | "LREX" => PrivilegedNoOp,
        _ => Deferred,
    }
}

fn is_byte_op(name: &str) -> bool {
    name != "B" && (name.ends_with('B') || name == "SB")
}

fn parity_odd(byte: u8) -> bool {
    byte.count_ones() % 2 == 1
}

fn set_compare_flags(status: &mut StatusRegister, a: u16, b: u16) {
    status.set_flag(crate::status::StatusFlags::L_GT, a > b);
    status.set_flag(crate::status::StatusFlags::A_GT, (a as i16) > (b as i16));
    status.set_flag(crate::status::StatusFlags::EQ, a == b);
}

/// `value` holds a byte operand's low 8 bits, or a full word for non-byte
/// operands, matching the `Operand`/writeback convention.
fn set_logic_flags(status: &mut StatusRegister, value: u16, is_byte: bool) {
    let a = if is_byte { value & 0x00FF } else { value };
    set_compare_flags(status, a, 0);
    if is_byte {
        status.set_flag(crate::status::StatusFlags::P, parity_odd(a as u8));
    }
}

fn set_arith_flags(status: &mut StatusRegister, wide_result: i32, is_byte: bool, carry: bool) {
    let truncated = if is_byte {
        (wide_result as u16) & 0x00FF
    } else {
        wide_result as u16
    };
    set_logic_flags(status, truncated, is_byte);
    status.set_flag(crate::status::StatusFlags::C, carry);
    let overflow = if is_byte {
        !(-0x80..=0x7F).contains(&wide_result)
    } else {
        wide_result > i16::MAX as i32 || wide_result < i16::MIN as i32
    };
    status.set_flag(crate::status::StatusFlags::O, overflow);
}

/// Write the old WP/PC/status into the incoming workspace's R13/R14/R15,
/// the same layout `Flow::service_interrupt` uses for a real interrupt
/// vector. Shared by BLWP and XOP; RTWP is the inverse (reads instead of
/// writes) and is handled in its own family arm.
fn save_context_into_workspace(ctx: &mut Context, new_wp: u16, old_wp: u16, old_pc: u16, old_status: u16) {
    ctx.memory.set_word(new_wp.wrapping_add(2 * 13), old_wp);
    ctx.memory.set_word(new_wp.wrapping_add(2 * 14), old_pc);
    ctx.memory.set_word(new_wp.wrapping_add(2 * 15), old_status);
}

pub struct GeneralUnit {
    family: Family,
    is_byte: bool,
    source: Option<Operand>,
    dest: Option<Operand>,
    dest_reg: u8,
    result: u16,
    result_lo: u16,
    privileged: bool,
    jump_taken: bool,
    new_wp: Option<u16>,
    new_pc: Option<u16>,
    pending_wp: Option<u16>,
    pending_pc: Option<u16>,
    pending_status: Option<u16>,
    saved_status: Option<u16>,
    sub_instr: Option<Instruction>,
    sub_unit: Option<Box<GeneralUnit>>,
    mnemonic: String,
}

pub fn unit_for(instr: &Instruction) -> GeneralUnit {
    GeneralUnit {
        family: family_for(instr.def.name),
        is_byte: is_byte_op(instr.def.name),
        source: None,
        dest: None,
        dest_reg: 0,
        result: 0,
        result_lo: 0,
        privileged: instr.def.performs_privilege_check,
        jump_taken: false,
        new_wp: None,
        new_pc: None,
        pending_wp: None,
        pending_pc: None,
        pending_status: None,
        saved_status: None,
        sub_instr: None,
        sub_unit: None,
        mnemonic: instr.def.name.to_string(),
    }
}

impl GeneralUnit {
    pub fn jump_taken(&self) -> bool {
        self.jump_taken
    }

    pub fn new_wp(&self) -> Option<u16> {
        self.new_wp
    }

    pub fn new_pc(&self) -> Option<u16> {
        self.new_pc
    }

    /// For a jump family unit, whether the branch was taken and its signed
    /// displacement (8 bits for the short jumps, 16 for JMPL/JNEL); `None`
    /// for every other family.
    pub fn jump_result(&self) -> Option<(bool, i32)> {
        match self.family {
            Family::Jump(_) => Some((self.jump_taken, self.result as u8 as i8 as i32)),
            Family::LongJump(_) => Some((self.jump_taken, self.result as i16 as i32)),
            _ => None,
        }
    }
}

impl ExecutionUnit for GeneralUnit {
    fn validate_opcode(&self, _instr: &Instruction) -> Result<(), RuntimeError> {
        if self.family == Family::Deferred {
            return Err(RuntimeError::MIDNotImplemented {
                mnemonic: self.mnemonic.clone(),
            });
        }
        Ok(())
    }

    fn fetch_operands(&mut self, instr: &Instruction, ctx: &Context) -> Result<(), RuntimeError> {
        match self.family {
            Family::TwoAddress(_) => {
                let ts = instr.get_param("Ts");
                let s = instr.get_param("S") as u8;
                let td = instr.get_param("Td");
                let d = instr.get_param("D") as u8;
                self.source = Some(resolve_operand(
                    ctx,
                    ts,
                    s,
                    instr.immediate_source_operand(),
                    self.is_byte,
                ));
                self.dest = Some(resolve_operand(
                    ctx,
                    td,
                    d,
                    instr.immediate_dest_operand(),
                    self.is_byte,
                ));
            }
            Family::CompareOrBoolean(_) => {
                let ts = instr.get_param("Ts");
                let s = instr.get_param("S") as u8;
                let d = instr.get_param("D") as u8;
                self.source = Some(resolve_operand(
                    ctx,
                    ts,
                    s,
                    instr.immediate_source_operand(),
                    false,
                ));
                self.dest = Some(resolve_operand(ctx, MODE_REGISTER, d, None, false));
            }
            Family::SingleAddress(op) => {
                let ts = instr.get_param("Ts");
                let s = instr.get_param("S") as u8;
                let src = resolve_operand(
                    ctx,
                    ts,
                    s,
                    instr.immediate_source_operand(),
                    self.is_byte,
                );
                match op {
                    SingleAddressOp::Blwp => {
                        self.pending_wp = Some(ctx.memory.get_word(src.address));
                        self.pending_pc = Some(ctx.memory.get_word(src.address.wrapping_add(2)));
                    }
                    SingleAddressOp::X => {
                        let addr = src.address;
                        let word = ctx.memory.get_word(addr);
                        let peek = ctx.memory.get_word(addr.wrapping_add(2));
                        let mut sub_instr = Instruction::decode(word, peek, addr)?;
                        if sub_instr.def.name == "X" {
                            return Err(RuntimeError::IllegalOpcode { pc: addr, word });
                        }
                        let mut sub_unit = unit_for(&sub_instr);
                        sub_unit.validate_opcode(&sub_instr)?;

                        let mut off: u16 = 2;
                        if sub_instr.def.has_second_opcode_word() {
                            off += 2;
                        }
                        if sub_instr.def.format().has_immediate_word() {
                            let w = ctx.memory.get_word(addr.wrapping_add(off));
                            sub_instr.set_immediate_operand(w);
                            off += 2;
                        }
                        if sub_instr.def.has_possible_immediate_source()
                            && sub_instr.get_param("Ts") == super::MODE_SYMBOLIC_OR_INDEXED
                        {
                            let w = ctx.memory.get_word(addr.wrapping_add(off));
                            sub_instr.set_immediate_source_operand(w);
                            off += 2;
                        }
                        if sub_instr.def.has_possible_immediate_dest()
                            && sub_instr.get_param("Td") == super::MODE_SYMBOLIC_OR_INDEXED
                        {
                            let w = ctx.memory.get_word(addr.wrapping_add(off));
                            sub_instr.set_immediate_dest_operand(w);
                        }

                        sub_unit.fetch_operands(&sub_instr, ctx)?;
                        self.sub_instr = Some(sub_instr);
                        self.sub_unit = Some(Box::new(sub_unit));
                    }
                    _ => {}
                }
                self.source = Some(src);
            }
            Family::Immediate(_) => {
                let w = instr.get_param("W") as u8;
                self.dest_reg = w;
                self.dest = Some(resolve_operand(ctx, MODE_REGISTER, w, None, false));
                self.result = instr.immediate_operand().unwrap_or(0);
            }
            Family::PureImmediate(_) => {
                self.result = instr.immediate_operand().unwrap_or(0);
            }
            Family::Shift(_) => {
                let w = instr.get_param("W") as u8;
                let mut count = instr.get_param("C") as u8;
                if count == 0 {
                    count = (ctx.register(0) & 0x000F) as u8;
                    if count == 0 {
                        count = 16;
                    }
                }
                self.dest_reg = w;
                self.dest = Some(resolve_operand(ctx, MODE_REGISTER, w, None, false));
                self.result = u16::from(count);
            }
            Family::Jump(_) => {
                self.result = instr.get_param("disp") as u16;
            }
            Family::LongJump(_) => {
                self.result = instr.get_param("disp") as u16;
            }
            Family::CruBit(_) | Family::CruMulti(_) => {
                // CRU hardware is not simulated; only status side effects apply.
            }
            Family::Xop => {
                let ts = instr.get_param("Ts");
                let s = instr.get_param("S") as u8;
                self.source = Some(resolve_operand(
                    ctx,
                    ts,
                    s,
                    instr.immediate_source_operand(),
                    false,
                ));
                let number = instr.get_param("number") as u8;
                self.pending_wp = Some(ctx.memory.get_word(super::units::xop_vector_wp(number)));
                self.pending_pc = Some(ctx.memory.get_word(super::units::xop_vector_pc(number)));
            }
            Family::Rtwp => {
                self.pending_wp = Some(ctx.register(13));
                self.pending_pc = Some(ctx.register(14));
                self.pending_status = Some(ctx.register(15));
            }
            Family::Mpys => {
                let ts = instr.get_param("Ts");
                let s = instr.get_param("S") as u8;
                let d = instr.get_param("D") as u8;
                self.source = Some(resolve_operand(
                    ctx,
                    ts,
                    s,
                    instr.immediate_source_operand(),
                    false,
                ));
                self.dest = Some(resolve_operand(ctx, MODE_REGISTER, d, None, false));
                self.dest_reg = d;
            }
            Family::Ldd => {
                let ts = instr.get_param("Ts");
                let s = instr.get_param("S") as u8;
                self.dest = Some(resolve_operand(
                    ctx,
                    ts,
                    s,
                    instr.immediate_source_operand(),
                    false,
                ));
                self.result = instr.get_param("base") as u16;
            }
            Family::Tmb => {
                let ts = instr.get_param("Ts");
                let s = instr.get_param("S") as u8;
                self.source = Some(resolve_operand(
                    ctx,
                    ts,
                    s,
                    instr.immediate_source_operand(),
                    false,
                ));
                self.dest_reg = instr.get_param("bit_number") as u8;
            }
            Family::Lwp => {
                let ts = instr.get_param("Ts");
                let s = instr.get_param("S") as u8;
                self.source = Some(resolve_operand(
                    ctx,
                    ts,
                    s,
                    instr.immediate_source_operand(),
                    false,
                ));
            }
            Family::Blm => {
                let ts = instr.get_param("Ts");
                let s = instr.get_param("S") as u8;
                let td = instr.get_param("Td");
                let d = instr.get_param("D") as u8;
                self.source = Some(resolve_operand(
                    ctx,
                    ts,
                    s,
                    instr.immediate_source_operand(),
                    false,
                ));
                self.dest = Some(resolve_operand(
                    ctx,
                    td,
                    d,
                    instr.immediate_dest_operand(),
                    false,
                ));
                self.result = instr.get_param("count") as u16;
                self.dest_reg = instr.get_param("CKPT") as u8;
            }
            Family::Bmw => {
                let ts = instr.get_param("Ts");
                let s = instr.get_param("S") as u8;
                let td = instr.get_param("Td");
                let d = instr.get_param("D") as u8;
                self.source = Some(resolve_operand(
                    ctx,
                    ts,
                    s,
                    instr.immediate_source_operand(),
                    false,
                ));
                self.dest = Some(resolve_operand(
                    ctx,
                    td,
                    d,
                    instr.immediate_dest_operand(),
                    false,
                ));
                self.result = instr.get_param("count") as u16;
            }
            Family::PrivilegedNoOp | Family::Deferred => {}
        }
        Ok(())
    }

    fn execute(&mut self, instr: &Instruction, status: &mut StatusRegister) {
        match self.family {
            Family::TwoAddress(op) => {
                let src = self.source.unwrap();
                let dest = self.dest.unwrap();
                let (a, b) = (i32::from(src.value), i32::from(dest.value));
                let wide = match op {
                    TwoAddressOp::Szc => !a & b,
                    TwoAddressOp::S => b - a,
                    TwoAddressOp::C => {
                        set_compare_flags(status, src.value, dest.value);
                        self.result = dest.value;
                        return;
                    }
                    TwoAddressOp::A => b + a,
                    TwoAddressOp::Mov => a,
                    TwoAddressOp::Soc => a | b,
                };
                let carry = match op {
                    TwoAddressOp::A => wide > if self.is_byte { 0xFF } else { 0xFFFF },
                    TwoAddressOp::S => b >= a,
                    _ => false,
                };
                self.result = if self.is_byte {
                    (wide as u16) & 0x00FF
                } else {
                    wide as u16
                };
                set_arith_flags(status, wide, self.is_byte, carry);
            }
            Family::CompareOrBoolean(op) => {
                let src = self.source.unwrap().value;
                let dest = self.dest.unwrap().value;
                let eq = match op {
                    CompareOrBooleanOp::Coc => src & dest == src,
                    CompareOrBooleanOp::Czc => !src & dest == src,
                    CompareOrBooleanOp::Xor => {
                        self.result = src ^ dest;
                        set_logic_flags(status, self.result, false);
                        return;
                    }
                };
                status.set_flag(crate::status::StatusFlags::EQ, eq);
            }
            Family::SingleAddress(op) => {
                let src = self.source.unwrap();
                let value = src.value;
                self.result = match op {
                    SingleAddressOp::Clr | SingleAddressOp::Stwp | SingleAddressOp::Stst => 0,
                    SingleAddressOp::Neg => {
                        let wide = -(value as i32);
                        set_arith_flags(status, wide, false, value != 0);
                        wide as u16
                    }
                    SingleAddressOp::Inv => !value,
                    SingleAddressOp::Inc => {
                        let wide = i32::from(value) + 1;
                        set_arith_flags(status, wide, false, wide > 0xFFFF);
                        wide as u16
                    }
                    SingleAddressOp::Inct => {
                        let wide = i32::from(value) + 2;
                        set_arith_flags(status, wide, false, wide > 0xFFFF);
                        wide as u16
                    }
                    SingleAddressOp::Dec => {
                        let wide = i32::from(value) - 1;
                        set_arith_flags(status, wide, false, value >= 1);
                        wide as u16
                    }
                    SingleAddressOp::Dect => {
                        let wide = i32::from(value) - 2;
                        set_arith_flags(status, wide, false, value >= 2);
                        wide as u16
                    }
                    SingleAddressOp::Swpb => value.rotate_left(8),
                    SingleAddressOp::Seto => 0xFFFF,
                    SingleAddressOp::Abs => {
                        let wide = (value as i16).unsigned_abs();
                        set_compare_flags(status, wide, 0);
                        wide
                    }
                    SingleAddressOp::B | SingleAddressOp::Bl => {
                        self.new_pc = Some(src.address);
                        0
                    }
                    SingleAddressOp::Blwp => {
                        self.saved_status = Some(status.word());
                        self.new_wp = self.pending_wp;
                        self.new_pc = self.pending_pc;
                        0
                    }
                    SingleAddressOp::X => {
                        let addr = src.address;
                        let sub_instr = self.sub_instr.clone();
                        if let (Some(sub_instr), Some(sub)) = (sub_instr, self.sub_unit.as_mut()) {
                            sub.execute(&sub_instr, status);
                            if let Some((taken, disp)) = sub.jump_result() {
                                if taken {
                                    let delta: i32 = 2 + 2 * disp;
                                    self.new_pc = Some((i32::from(addr) + delta) as u16);
                                }
                            } else if let Some(new_pc) = sub.new_pc() {
                                self.new_pc = Some(new_pc);
                            }
                            if let Some(new_wp) = sub.new_wp() {
                                self.new_wp = Some(new_wp);
                            }
                        }
                        0
                    }
                };
                let _ = instr;
            }
            Family::Immediate(op) => {
                let dest = self.dest.unwrap().value;
                let imm = self.result;
                match op {
                    ImmediateOp::Li => {
                        self.result = imm;
                        set_logic_flags(status, imm, false);
                    }
                    ImmediateOp::Ai => {
                        let wide = i32::from(dest) + i32::from(imm);
                        set_arith_flags(status, wide, false, wide > 0xFFFF);
                        self.result = wide as u16;
                    }
                    ImmediateOp::Andi => {
                        self.result = dest & imm;
                        set_logic_flags(status, self.result, false);
                    }
                    ImmediateOp::Ori => {
                        self.result = dest | imm;
                        set_logic_flags(status, self.result, false);
                    }
                    ImmediateOp::Ci => {
                        set_compare_flags(status, dest, imm);
                        self.result = dest;
                    }
                }
            }
            Family::PureImmediate(op) => match op {
                PureImmediateOp::Lwpi => self.new_wp = Some(self.result),
                PureImmediateOp::Limi => {
                    status.set_interrupt_mask((self.result & 0x0F) as u8);
                }
            },
            Family::Shift(op) => {
                let value = self.dest.unwrap().value;
                let count = self.result;
                let (wide, carry) = match op {
                    ShiftOp::Sla => {
                        let w = (value as i32) << count;
                        (w, (value as u32).wrapping_shl(u32::from(count) - 1) & 0x8000 != 0)
                    }
                    ShiftOp::Sra => {
                        let w = (value as i16 as i32) >> count;
                        (w, ((value as i32) >> (count - 1)) & 1 != 0)
                    }
                    ShiftOp::Srl => {
                        let w = (value as u32) >> count;
                        (w as i32, ((value as u32) >> (count - 1)) & 1 != 0)
                    }
                    ShiftOp::Src => {
                        let rotated = value.rotate_right(u32::from(count));
                        (rotated as i32, (value >> (count - 1)) & 1 != 0)
                    }
                };
                self.result = wide as u16;
                set_logic_flags(status, self.result, false);
                status.set_flag(crate::status::StatusFlags::C, carry);
                status.set_flag(crate::status::StatusFlags::O, false);
            }
            Family::Jump(cond) => {
                let status_word = status.flags();
                self.jump_taken = match cond {
                    JumpCond::Always => true,
                    JumpCond::Lt => {
                        !status_word.contains(crate::status::StatusFlags::A_GT)
                            && !status_word.contains(crate::status::StatusFlags::EQ)
                    }
                    JumpCond::Le => {
                        !status_word.contains(crate::status::StatusFlags::L_GT)
                            || status_word.contains(crate::status::StatusFlags::EQ)
                    }
                    JumpCond::Eq => status_word.contains(crate::status::StatusFlags::EQ),
                    JumpCond::He => {
                        status_word.contains(crate::status::StatusFlags::L_GT)
                            || status_word.contains(crate::status::StatusFlags::EQ)
                    }
                    JumpCond::Gt => status_word.contains(crate::status::StatusFlags::A_GT),
                    JumpCond::Ne => !status_word.contains(crate::status::StatusFlags::EQ),
                    JumpCond::Nc => !status_word.contains(crate::status::StatusFlags::C),
                    JumpCond::Oc => status_word.contains(crate::status::StatusFlags::C),
                    JumpCond::No => !status_word.contains(crate::status::StatusFlags::O),
                    JumpCond::L => {
                        !status_word.contains(crate::status::StatusFlags::L_GT)
                            && !status_word.contains(crate::status::StatusFlags::EQ)
                    }
                    JumpCond::H => status_word.contains(crate::status::StatusFlags::L_GT),
                    JumpCond::Op => status_word.contains(crate::status::StatusFlags::P),
                };
            }
            Family::LongJump(cond) => {
                let status_word = status.flags();
                self.jump_taken = match cond {
                    LongJumpCond::Always => true,
                    LongJumpCond::Ne => !status_word.contains(crate::status::StatusFlags::EQ),
                };
            }
            Family::CruBit(op) => match op {
                CruBitOp::Tb => status.set_flag(crate::status::StatusFlags::EQ, false),
                CruBitOp::Sbo | CruBitOp::Sbz => {}
            },
            Family::CruMulti(_) => {}
            Family::Xop => {
                self.saved_status = Some(status.word());
                self.new_wp = self.pending_wp;
                self.new_pc = self.pending_pc;
                status.set_flag(crate::status::StatusFlags::X, true);
            }
            Family::Rtwp => {
                self.new_wp = self.pending_wp;
                self.new_pc = self.pending_pc;
                *status = StatusRegister::from_word(self.pending_status.unwrap());
            }
            Family::Mpys => {
                let a = i32::from(self.source.unwrap().value as i16);
                let b = i32::from(self.dest.unwrap().value as i16);
                let product = a * b;
                self.result = (product >> 16) as u16;
                self.result_lo = product as u16;
                status.set_flag(crate::status::StatusFlags::EQ, product == 0);
                status.set_flag(crate::status::StatusFlags::A_GT, product > 0);
                status.set_flag(crate::status::StatusFlags::L_GT, product != 0);
                status.set_flag(crate::status::StatusFlags::C, false);
                status.set_flag(crate::status::StatusFlags::O, false);
            }
            Family::Ldd => {}
            Family::Tmb => {
                let value = self.source.unwrap().value;
                let bit_number = self.dest_reg;
                let set = (value >> (15 - bit_number)) & 1 != 0;
                status.set_flag(crate::status::StatusFlags::EQ, !set);
            }
            Family::Lwp => {
                self.new_wp = Some(self.source.unwrap().value);
            }
            Family::Blm | Family::Bmw => {}
            Family::PrivilegedNoOp | Family::Deferred => {}
        }
    }

    fn write_results(&mut self, instr: &Instruction, ctx: &mut Context) {
        match self.family {
            Family::TwoAddress(op) => {
                if op != TwoAddressOp::C {
                    write_operand(ctx, &self.dest.unwrap(), self.result);
                }
                if self.source.unwrap().mode == super::MODE_INDIRECT_AUTOINCREMENT {
                    write_operand(ctx, &self.source.unwrap(), self.source.unwrap().value);
                }
            }
            Family::CompareOrBoolean(op) => {
                if op == CompareOrBooleanOp::Xor {
                    write_operand(ctx, &self.dest.unwrap(), self.result);
                }
                if self.source.unwrap().mode == super::MODE_INDIRECT_AUTOINCREMENT {
                    write_operand(ctx, &self.source.unwrap(), self.source.unwrap().value);
                }
            }
            Family::SingleAddress(op) => match op {
                SingleAddressOp::Stwp => write_operand(ctx, &self.source.unwrap(), ctx.wp),
                SingleAddressOp::Stst => {}
                SingleAddressOp::B => {
                    if self.source.unwrap().mode == super::MODE_INDIRECT_AUTOINCREMENT {
                        write_operand(ctx, &self.source.unwrap(), self.source.unwrap().value);
                    }
                }
                SingleAddressOp::Bl => {
                    ctx.set_register(11, ctx.pc);
                    if self.source.unwrap().mode == super::MODE_INDIRECT_AUTOINCREMENT {
                        write_operand(ctx, &self.source.unwrap(), self.source.unwrap().value);
                    }
                }
                SingleAddressOp::Blwp => {
                    let new_wp = self.pending_wp.unwrap();
                    let old_status = self.saved_status.unwrap();
                    save_context_into_workspace(ctx, new_wp, ctx.wp, ctx.pc, old_status);
                    if self.source.unwrap().mode == super::MODE_INDIRECT_AUTOINCREMENT {
                        write_operand(ctx, &self.source.unwrap(), self.source.unwrap().value);
                    }
                }
                SingleAddressOp::X => {
                    if let (Some(sub_instr), Some(mut sub)) =
                        (self.sub_instr.take(), self.sub_unit.take())
                    {
                        sub.write_results(&sub_instr, ctx);
                    }
                    if self.source.unwrap().mode == super::MODE_INDIRECT_AUTOINCREMENT {
                        write_operand(ctx, &self.source.unwrap(), self.source.unwrap().value);
                    }
                }
                _ => write_operand(ctx, &self.source.unwrap(), self.result),
            },
            Family::Immediate(_) => write_operand(ctx, &self.dest.unwrap(), self.result),
            Family::PureImmediate(_) => {}
            Family::Shift(_) => write_operand(ctx, &self.dest.unwrap(), self.result),
            Family::Jump(_) | Family::LongJump(_) | Family::CruBit(_) | Family::CruMulti(_) => {}
            Family::Xop => {
                let new_wp = self.pending_wp.unwrap();
                let old_status = self.saved_status.unwrap();
                let src = self.source.unwrap();
                ctx.memory.set_word(new_wp.wrapping_add(2 * 11), src.address);
                save_context_into_workspace(ctx, new_wp, ctx.wp, ctx.pc, old_status);
                if src.mode == super::MODE_INDIRECT_AUTOINCREMENT {
                    write_operand(ctx, &src, src.value);
                }
            }
            Family::Rtwp => {}
            Family::Mpys => {
                ctx.set_register(self.dest_reg, self.result);
                ctx.set_register(self.dest_reg.wrapping_add(1), self.result_lo);
                let src = self.source.unwrap();
                if src.mode == super::MODE_INDIRECT_AUTOINCREMENT {
                    write_operand(ctx, &src, src.value);
                }
            }
            Family::Ldd => {
                write_operand(ctx, &self.dest.unwrap(), self.result);
            }
            Family::Tmb | Family::Lwp => {
                let src = self.source.unwrap();
                if src.mode == super::MODE_INDIRECT_AUTOINCREMENT {
                    write_operand(ctx, &src, src.value);
                }
            }
            Family::Blm | Family::Bmw => {
                let count = self.result;
                let src = self.source.unwrap();
                let dest = self.dest.unwrap();
                for i in 0..count {
                    let word = ctx.memory.get_word(src.address.wrapping_add(2 * i));
                    ctx.memory.set_word(dest.address.wrapping_add(2 * i), word);
                }
                if src.mode == super::MODE_INDIRECT || src.mode == super::MODE_INDIRECT_AUTOINCREMENT {
                    ctx.set_register(src.reg, src.address.wrapping_add(2 * count));
                }
                if dest.mode == super::MODE_INDIRECT || dest.mode == super::MODE_INDIRECT_AUTOINCREMENT {
                    ctx.set_register(dest.reg, dest.address.wrapping_add(2 * count));
                }
                if self.family == Family::Blm {
                    ctx.set_register(self.dest_reg, 0);
                }
            }
            Family::PrivilegedNoOp | Family::Deferred => {}
        }
        let _ = instr;
    }

    fn requires_privilege(&self) -> bool {
        self.privileged
    }
}

pub fn xop_vector_wp(number: u8) -> u16 {
    0x0040 + 4 * u16::from(number)
}

pub fn xop_vector_pc(number: u8) -> u16 {
    0x0040 + 4 * u16::from(number) + 2
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::execution::MODE_SYMBOLIC_OR_INDEXED;
    use crate::memory::Memory;
    use crate::status::StatusRegister;

    fn run(mnemonic: &str, build: impl FnOnce(&mut Instruction)) -> (GeneralUnit, Memory, StatusRegister) {
        let mut instr = Instruction::from_mnemonic(mnemonic).unwrap();
        build(&mut instr);
        instr.finalize();
        let mut mem = Memory::new();
        let mut status = StatusRegister::new();
        let mut unit = unit_for(&instr);
        {
            let ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.validate_opcode(&instr).unwrap();
            unit.fetch_operands(&instr, &ctx).unwrap();
        }
        unit.execute(&instr, &mut status);
        {
            let mut ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.write_results(&instr, &mut ctx);
        }
        (unit, mem, status)
    }

    #[test]
    fn li_loads_register_and_sets_status() {
        let mut mem = Memory::new();
        mem.set_word(0x0080 + 2, 0);
        let (_, mem, status) = run("LI", |i| {
            i.set_param("W", 1);
            i.set_immediate_operand(0x1234);
        });
        assert_eq!(mem.get_word(0x0080 + 2), 0x1234);
        assert!(status.a_gt());
    }

    #[test]
    fn add_sets_register_two_to_eight() {
        let mut mem = Memory::new();
        mem.set_word(0x0080 + 2, 3);
        mem.set_word(0x0080 + 4, 5);
        let mut instr = Instruction::from_mnemonic("A").unwrap();
        instr.set_param("Ts", 0);
        instr.set_param("S", 1);
        instr.set_param("Td", 0);
        instr.set_param("D", 2);
        instr.finalize();
        let mut status = StatusRegister::new();
        let mut unit = unit_for(&instr);
        {
            let ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.fetch_operands(&instr, &ctx).unwrap();
        }
        unit.execute(&instr, &mut status);
        {
            let mut ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.write_results(&instr, &mut ctx);
        }
        assert_eq!(mem.get_word(0x0080 + 4), 8);
        assert!(!status.carry());
        assert!(!status.overflow());
    }

    #[test]
    fn clr_is_idempotent() {
        let mut mem = Memory::new();
        mem.set_word(0x0080, 0x1234);
        let run_once = |mem: &mut Memory| {
            let mut instr = Instruction::from_mnemonic("CLR").unwrap();
            instr.set_param("Ts", 0);
            instr.set_param("S", 0);
            instr.finalize();
            let mut status = StatusRegister::new();
            let mut unit = unit_for(&instr);
            {
                let ctx = Context { memory: mem, wp: 0x0080, pc: 0x0104 };
                unit.fetch_operands(&instr, &ctx).unwrap();
            }
            unit.execute(&instr, &mut status);
            let mut ctx = Context { memory: mem, wp: 0x0080, pc: 0x0104 };
            unit.write_results(&instr, &mut ctx);
        };
        run_once(&mut mem);
        assert_eq!(mem.get_word(0x0080), 0);
        run_once(&mut mem);
        assert_eq!(mem.get_word(0x0080), 0);
    }

    #[test]
    fn movb_writes_only_the_target_byte() {
        let mut mem = Memory::new();
        mem.set_word(0x0080 + 2, 0xAB00);
        let mut instr = Instruction::from_mnemonic("MOVB").unwrap();
        instr.set_param("Ts", 0);
        instr.set_param("S", 1);
        instr.set_param("Td", MODE_SYMBOLIC_OR_INDEXED);
        instr.set_param("D", 0);
        instr.set_immediate_dest_operand(0x0200);
        instr.finalize();
        let mut status = StatusRegister::new();
        let mut unit = unit_for(&instr);
        {
            let ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.fetch_operands(&instr, &ctx).unwrap();
        }
        unit.execute(&instr, &mut status);
        {
            let mut ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.write_results(&instr, &mut ctx);
        }
        assert_eq!(mem.get_byte(0x0200), 0xAB);
        assert_eq!(mem.get_byte(0x0201), 0);
        assert!(status.parity());
    }

    #[test]
    fn lwpi_sets_pending_workspace_pointer() {
        let (unit, _, _) = run("LWPI", |i| {
            i.set_immediate_operand(0x00C0);
        });
        assert_eq!(unit.new_wp(), Some(0x00C0));
    }

    #[test]
    fn b_does_not_misclassify_as_a_byte_op_and_bumps_by_a_full_word() {
        let mut mem = Memory::new();
        mem.set_word(0x0080 + 2, 0x0050); // R1: both the branch target and the autoincrement pointer
        let mut instr = Instruction::from_mnemonic("B").unwrap();
        instr.set_param("Ts", 3); // *R1+
        instr.set_param("S", 1);
        instr.finalize();
        let mut status = StatusRegister::new();
        let mut unit = unit_for(&instr);
        {
            let ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.fetch_operands(&instr, &ctx).unwrap();
        }
        unit.execute(&instr, &mut status);
        {
            let mut ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.write_results(&instr, &mut ctx);
        }
        assert_eq!(unit.new_pc(), Some(0x0050));
        // A byte-op misclassification would bump R1 by 1 instead of 2.
        assert_eq!(mem.get_word(0x0080 + 2), 0x0052);
    }

    #[test]
    fn bl_writes_return_address_into_r11() {
        let mut mem = Memory::new();
        let mut instr = Instruction::from_mnemonic("BL").unwrap();
        instr.set_param("Ts", MODE_SYMBOLIC_OR_INDEXED);
        instr.set_param("S", 0);
        instr.set_immediate_source_operand(0x0300);
        instr.finalize();
        let mut status = StatusRegister::new();
        let mut unit = unit_for(&instr);
        {
            let ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.fetch_operands(&instr, &ctx).unwrap();
        }
        unit.execute(&instr, &mut status);
        {
            let mut ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.write_results(&instr, &mut ctx);
        }
        assert_eq!(unit.new_pc(), Some(0x0300));
        assert_eq!(mem.get_word(0x0080 + 2 * 11), 0x0104);
    }

    #[test]
    fn blwp_switches_workspace_and_saves_old_context() {
        let mut mem = Memory::new();
        mem.set_word(0x0300, 0x00A0); // vector: new WP
        mem.set_word(0x0302, 0x0400); // vector: new PC
        let mut instr = Instruction::from_mnemonic("BLWP").unwrap();
        instr.set_param("Ts", MODE_SYMBOLIC_OR_INDEXED);
        instr.set_param("S", 0);
        instr.set_immediate_source_operand(0x0300);
        instr.finalize();
        let mut status = StatusRegister::new();
        status.set_flag(crate::status::StatusFlags::EQ, true);
        let mut unit = unit_for(&instr);
        {
            let ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.fetch_operands(&instr, &ctx).unwrap();
        }
        unit.execute(&instr, &mut status);
        {
            let mut ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.write_results(&instr, &mut ctx);
        }
        assert_eq!(unit.new_wp(), Some(0x00A0));
        assert_eq!(unit.new_pc(), Some(0x0400));
        assert_eq!(mem.get_word(0x00A0 + 2 * 13), 0x0080);
        assert_eq!(mem.get_word(0x00A0 + 2 * 14), 0x0104);
        assert_eq!(mem.get_word(0x00A0 + 2 * 15), status.word());
    }

    #[test]
    fn rtwp_restores_wp_pc_and_status_from_the_workspace() {
        let mut mem = Memory::new();
        mem.set_word(0x0080 + 2 * 13, 0x00A0);
        mem.set_word(0x0080 + 2 * 14, 0x0400);
        mem.set_word(0x0080 + 2 * 15, 0x8000);
        let instr = Instruction::from_mnemonic("RTWP").unwrap();
        let mut status = StatusRegister::new();
        let mut unit = unit_for(&instr);
        {
            let ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.fetch_operands(&instr, &ctx).unwrap();
        }
        unit.execute(&instr, &mut status);
        {
            let mut ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.write_results(&instr, &mut ctx);
        }
        assert_eq!(unit.new_wp(), Some(0x00A0));
        assert_eq!(unit.new_pc(), Some(0x0400));
        assert_eq!(status.word(), 0x8000);
    }

    #[test]
    fn xop_switches_workspace_and_stores_source_ea_in_r11() {
        let mut mem = Memory::new();
        let addr_wp = xop_vector_wp(1);
        let addr_pc = xop_vector_pc(1);
        mem.set_word(addr_wp, 0x00A0);
        mem.set_word(addr_pc, 0x0400);
        mem.set_word(0x0080 + 2, 0x0050); // R1 = operand address for *R1
        let mut instr = Instruction::from_mnemonic("XOP").unwrap();
        instr.set_param("Ts", 1);
        instr.set_param("S", 1);
        instr.set_param("number", 1);
        instr.finalize();
        let mut status = StatusRegister::new();
        let mut unit = unit_for(&instr);
        {
            let ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.fetch_operands(&instr, &ctx).unwrap();
        }
        unit.execute(&instr, &mut status);
        {
            let mut ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.write_results(&instr, &mut ctx);
        }
        assert_eq!(unit.new_wp(), Some(0x00A0));
        assert_eq!(unit.new_pc(), Some(0x0400));
        assert_eq!(mem.get_word(0x00A0 + 2 * 11), 0x0050);
        assert_eq!(mem.get_word(0x00A0 + 2 * 13), 0x0080);
        assert_eq!(mem.get_word(0x00A0 + 2 * 14), 0x0104);
        assert!(status.is_set(crate::status::StatusFlags::X));
    }

    #[test]
    fn x_executes_the_addressed_instruction_in_place() {
        let mut mem = Memory::new();
        mem.set_word(0x0080 + 2, 3); // R1
        mem.set_word(0x0080 + 4, 5); // R2
        let mut sub = Instruction::from_mnemonic("A").unwrap();
        sub.set_param("Ts", 0);
        sub.set_param("S", 1);
        sub.set_param("Td", 0);
        sub.set_param("D", 2);
        mem.set_word(0x0300, sub.working_opcode()); // A R1,R2
        let mut instr = Instruction::from_mnemonic("X").unwrap();
        instr.set_param("Ts", MODE_SYMBOLIC_OR_INDEXED);
        instr.set_param("S", 0);
        instr.set_immediate_source_operand(0x0300);
        instr.finalize();
        let mut status = StatusRegister::new();
        let mut unit = unit_for(&instr);
        {
            let ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.fetch_operands(&instr, &ctx).unwrap();
        }
        unit.execute(&instr, &mut status);
        {
            let mut ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.write_results(&instr, &mut ctx);
        }
        assert_eq!(mem.get_word(0x0080 + 4), 8);
        assert_eq!(unit.new_pc(), None);
    }

    #[test]
    fn xor_applies_source_post_increment() {
        let mut mem = Memory::new();
        mem.set_word(0x0080 + 2, 0x0200); // R1, the autoincrement pointer
        mem.set_word(0x0200, 0x00FF);
        mem.set_word(0x0080 + 4, 0x0F0F); // R2, dest register
        let mut instr = Instruction::from_mnemonic("XOR").unwrap();
        instr.set_param("Ts", 3); // *R1+
        instr.set_param("S", 1);
        instr.set_param("D", 2);
        instr.finalize();
        let mut status = StatusRegister::new();
        let mut unit = unit_for(&instr);
        {
            let ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.fetch_operands(&instr, &ctx).unwrap();
        }
        unit.execute(&instr, &mut status);
        {
            let mut ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.write_results(&instr, &mut ctx);
        }
        assert_eq!(mem.get_word(0x0080 + 2), 0x0202);
    }

    #[test]
    fn mpys_produces_a_32_bit_signed_product() {
        let mut mem = Memory::new();
        mem.set_word(0x0080 + 2, (-3i16) as u16); // R1
        mem.set_word(0x0080 + 4, 5); // R2
        let mut instr = Instruction::from_mnemonic("MPYS").unwrap();
        instr.set_param("Ts", 0);
        instr.set_param("S", 1);
        instr.set_param("D", 2);
        instr.finalize();
        let mut status = StatusRegister::new();
        let mut unit = unit_for(&instr);
        {
            let ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.fetch_operands(&instr, &ctx).unwrap();
        }
        unit.execute(&instr, &mut status);
        {
            let mut ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.write_results(&instr, &mut ctx);
        }
        assert_eq!(mem.get_word(0x0080 + 4), 0xFFFF);
        assert_eq!(mem.get_word(0x0080 + 6), (-15i16) as u16);
        assert!(!status.is_set(crate::status::StatusFlags::A_GT));
    }

    #[test]
    fn tmb_sets_eq_when_the_tested_bit_is_zero() {
        let mut mem = Memory::new();
        mem.set_word(0x0080, 0x4000); // bit 1 (MSB-numbered) is set, bit 0 is clear
        let mut instr = Instruction::from_mnemonic("TMB").unwrap();
        instr.set_param("Ts", 0);
        instr.set_param("S", 0);
        instr.set_param("bit_number", 0);
        instr.finalize();
        let mut status = StatusRegister::new();
        let mut unit = unit_for(&instr);
        {
            let ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.fetch_operands(&instr, &ctx).unwrap();
        }
        unit.execute(&instr, &mut status);
        assert!(status.is_set(crate::status::StatusFlags::EQ));
    }

    #[test]
    fn lwp_loads_workspace_pointer_directly() {
        let mut mem = Memory::new();
        mem.set_word(0x0080 + 2, 0x00C0);
        let mut instr = Instruction::from_mnemonic("LWP").unwrap();
        instr.set_param("Ts", 0);
        instr.set_param("S", 1);
        instr.finalize();
        let mut status = StatusRegister::new();
        let mut unit = unit_for(&instr);
        {
            let ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.fetch_operands(&instr, &ctx).unwrap();
        }
        unit.execute(&instr, &mut status);
        assert_eq!(unit.new_wp(), Some(0x00C0));
    }

    #[test]
    fn blm_copies_words_and_clears_the_checkpoint_register() {
        let mut mem = Memory::new();
        mem.set_word(0x0300, 0x1111);
        mem.set_word(0x0302, 0x2222);
        mem.set_word(0x0080 + 2 * 10, 7); // CKPT register R10
        let mut instr = Instruction::from_mnemonic("BLM").unwrap();
        instr.set_param("Ts", MODE_SYMBOLIC_OR_INDEXED);
        instr.set_param("S", 0);
        instr.set_immediate_source_operand(0x0300);
        instr.set_param("Td", MODE_SYMBOLIC_OR_INDEXED);
        instr.set_param("D", 0);
        instr.set_immediate_dest_operand(0x0500);
        instr.set_param("count", 2);
        instr.set_param("CKPT", 10);
        instr.finalize();
        let mut status = StatusRegister::new();
        let mut unit = unit_for(&instr);
        {
            let ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.fetch_operands(&instr, &ctx).unwrap();
        }
        unit.execute(&instr, &mut status);
        {
            let mut ctx = Context { memory: &mut mem, wp: 0x0080, pc: 0x0104 };
            unit.write_results(&instr, &mut ctx);
        }
        assert_eq!(mem.get_word(0x0500), 0x1111);
        assert_eq!(mem.get_word(0x0502), 0x2222);
        assert_eq!(mem.get_word(0x0080 + 2 * 10), 0);
    }
}
