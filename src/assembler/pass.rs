//! The two-pass driver: pass 1 walks every line estimating the location
//! counter and collecting symbols; pass 2 re-walks it, now with symbols
//! resolved, building instructions and emitting bytes into segments.

use std::collections::HashMap;

use crate::error::AssembleError;
use crate::instruction::Instruction;
use crate::opcode::{self, format::IMMEDIATE_WORD, OpcodeDef};

use super::line::{parse_line, split_source_lines, AssemblerLine, LineKind, OperandKind};
use super::segment::{build_image, AssemblerSegment, SegmentKind};
use super::symbol::{SymbolKind, SymbolTable};

pub struct AssembleOutput {
    pub lines: Vec<AssemblerLine>,
    pub symbols: SymbolTable,
    pub image: Vec<u8>,
    pub errors: Vec<AssembleError>,
}

/// How an instruction's parsed operands map onto its format's param list:
/// an addressing pair (`Ts`/`S` or `Td`/`D`) consumes one user operand and
/// may need a follow-on word; every other named param consumes one operand
/// standalone.
enum Slot {
    Addressing(&'static str, &'static str),
    Plain(&'static str),
}

fn slots_for(order: &'static [&'static str]) -> Vec<Slot> {
    let mut slots = Vec::new();
    let mut i = 0;
    while i < order.len() {
        let name = order[i];
        if (name == "Ts" || name == "Td") && i + 1 < order.len() {
            slots.push(Slot::Addressing(name, order[i + 1]));
            i += 2;
        } else {
            slots.push(Slot::Plain(name));
            i += 1;
        }
    }
    slots
}

fn operand_needs_follow_on_word(op: &OperandKind) -> bool {
    matches!(
        op,
        OperandKind::Indexed { .. }
            | OperandKind::Symbolic(_)
            | OperandKind::Unknown(_)
            | OperandKind::Number(_)
    )
}

/// Word count this instruction will actually emit, derived purely from
/// operand shape (which addressing operands are symbolic/indexed is known
/// at parse time, not only once their symbols resolve).
fn word_count_for(def: &OpcodeDef, operands: &[OperandKind]) -> u8 {
    let slots = slots_for(def.format().asm_param_order);
    let mut words = def.minimum_instruction_words();
    for (idx, slot) in slots.iter().enumerate() {
        if let Slot::Addressing(..) = slot {
            if let Some(op) = operands.get(idx) {
                if operand_needs_follow_on_word(op) {
                    words += 1;
                }
            }
        }
    }
    words
}

/// Expand the `NOP`/`RT` macros and `DFOP`/`DXOP` aliases into their real
/// mnemonic and operand list. Returns the (possibly rewritten) mnemonic and
/// operands without mutating `line`, since pass 1 and pass 2 both need this
/// and only pass 2 keeps the rewritten form around for encoding.
fn resolve_mnemonic(
    line: &AssemblerLine,
    alias_table: &HashMap<String, String>,
    dxop_table: &HashMap<String, i64>,
) -> Result<(String, Vec<OperandKind>), AssembleError> {
    let mnemonic = line.mnemonic.clone().unwrap_or_default();
    match mnemonic.as_str() {
        "NOP" => Ok(("JMP".to_string(), vec![OperandKind::Unknown("$+2".to_string())])),
        "RT" => Ok(("B".to_string(), vec![OperandKind::RegisterIndirect(11)])),
        _ => {
            if opcode::lookup_by_name(&mnemonic).is_some() {
                return Ok((mnemonic, line.operands.clone()));
            }
            if let Some(real) = alias_table.get(&mnemonic) {
                return Ok((real.clone(), line.operands.clone()));
            }
            if let Some(number) = dxop_table.get(&mnemonic) {
                let s_operand = line
                    .operands
                    .first()
                    .cloned()
                    .ok_or_else(|| AssembleError::OperandCountMismatch {
                        line: line.line_number,
                        mnemonic: mnemonic.clone(),
                    })?;
                return Ok(("XOP".to_string(), vec![s_operand, OperandKind::Number(*number)]));
            }
            Err(AssembleError::UnknownMnemonic {
                line: line.line_number,
                mnemonic,
            })
        }
    }
}

fn resolve_symbol_expr(
    name: &str,
    current_addr: u16,
    symbols: &SymbolTable,
    line_number: usize,
) -> Result<i64, AssembleError> {
    if let Some(rest) = name.strip_prefix('$') {
        let rest = rest.strip_prefix('+').unwrap_or(rest);
        let offset = if rest.is_empty() {
            0
        } else {
            super::line::parse_number(rest).ok_or_else(|| AssembleError::MalformedOperand {
                line: line_number,
                operand: name.to_string(),
            })?
        };
        return Ok(i64::from(current_addr) + offset);
    }
    if let Some(n) = super::line::parse_number(name) {
        return Ok(n);
    }
    symbols
        .get(name)
        .filter(|s| s.value_assigned)
        .map(|s| i64::from(s.value))
        .ok_or_else(|| AssembleError::UndefinedSymbol {
            line: line_number,
            symbol: name.to_string(),
        })
}

fn resolve_value(
    op: &OperandKind,
    current_addr: u16,
    symbols: &SymbolTable,
    line_number: usize,
) -> Result<i64, AssembleError> {
    match op {
        OperandKind::Number(n) => Ok(*n),
        OperandKind::Register(n) => Ok(i64::from(*n)),
        OperandKind::Unknown(name) => resolve_symbol_expr(name, current_addr, symbols, line_number),
        OperandKind::Symbolic(name) => resolve_symbol_expr(name, current_addr, symbols, line_number),
        other => Err(AssembleError::MalformedOperand {
            line: line_number,
            operand: format!("{:?}", other),
        }),
    }
}

fn register_value(op: &OperandKind, line_number: usize) -> Result<u8, AssembleError> {
    match op {
        OperandKind::Register(n) => Ok(*n),
        OperandKind::Number(n) if (0..=15).contains(n) => Ok(*n as u8),
        other => Err(AssembleError::MalformedOperand {
            line: line_number,
            operand: format!("{:?}", other),
        }),
    }
}

use crate::execution::{MODE_INDIRECT, MODE_INDIRECT_AUTOINCREMENT, MODE_REGISTER, MODE_SYMBOLIC_OR_INDEXED};

fn addressing_operand(
    op: &OperandKind,
    current_addr: u16,
    symbols: &SymbolTable,
    line_number: usize,
) -> Result<(u32, u8, Option<u16>), AssembleError> {
    match op {
        OperandKind::Register(n) => Ok((MODE_REGISTER, *n, None)),
        OperandKind::RegisterIndirect(n) => Ok((MODE_INDIRECT, *n, None)),
        OperandKind::RegisterIndirectAutoInc(n) => Ok((MODE_INDIRECT_AUTOINCREMENT, *n, None)),
        OperandKind::Indexed { symbol, reg } => {
            let value = resolve_symbol_expr(symbol, current_addr, symbols, line_number)?;
            Ok((MODE_SYMBOLIC_OR_INDEXED, *reg, Some(value as u16)))
        }
        OperandKind::Symbolic(symbol) => {
            let value = resolve_symbol_expr(symbol, current_addr, symbols, line_number)?;
            Ok((MODE_SYMBOLIC_OR_INDEXED, 0, Some(value as u16)))
        }
        OperandKind::Unknown(name) => {
            let value = resolve_symbol_expr(name, current_addr, symbols, line_number)?;
            Ok((MODE_SYMBOLIC_OR_INDEXED, 0, Some(value as u16)))
        }
        OperandKind::Number(n) => Ok((MODE_SYMBOLIC_OR_INDEXED, 0, Some(*n as u16))),
        other => Err(AssembleError::MalformedOperand {
            line: line_number,
            operand: format!("{:?}", other),
        }),
    }
}

/// Convert a jump target (absolute address, `$`-relative, or symbol) into
/// the signed displacement a format-2/17 instruction encodes.
fn jump_displacement(
    op: &OperandKind,
    current_addr: u16,
    symbols: &SymbolTable,
    line_number: usize,
    format_number: u8,
) -> Result<u32, AssembleError> {
    let target = match op {
        OperandKind::Number(n) => *n,
        OperandKind::Unknown(name) => resolve_symbol_expr(name, current_addr, symbols, line_number)?,
        OperandKind::Symbolic(name) => resolve_symbol_expr(name, current_addr, symbols, line_number)?,
        other => {
            return Err(AssembleError::MalformedOperand {
                line: line_number,
                operand: format!("{:?}", other),
            })
        }
    };
    let base = i64::from(current_addr) + 2;
    let delta = target - base;
    if delta % 2 != 0 {
        return Err(AssembleError::MalformedOperand {
            line: line_number,
            operand: format!("{:?}", op),
        });
    }
    let disp = delta / 2;
    let in_range = if format_number == 2 {
        (-128..=127).contains(&disp)
    } else {
        (-32768..=32767).contains(&disp)
    };
    if !in_range {
        return Err(AssembleError::DisplacementOutOfRange {
            line: line_number,
            target: format!("{:?}", op),
        });
    }
    Ok(disp as i32 as u32)
}

#[allow(clippy::too_many_arguments)]
fn encode_instruction(
    mnemonic: &str,
    operands: &[OperandKind],
    location: u16,
    symbols: &SymbolTable,
    default_ckpt: u8,
    line_number: usize,
) -> Result<Instruction, AssembleError> {
    let def = opcode::lookup_by_name(mnemonic).ok_or_else(|| AssembleError::UnknownMnemonic {
        line: line_number,
        mnemonic: mnemonic.to_string(),
    })?;
    let format = def.format();
    let slots = slots_for(format.asm_param_order);
    let allow_ckpt_default = matches!(slots.last(), Some(Slot::Plain("CKPT")));
    let expected = slots.len();
    if operands.len() != expected && !(allow_ckpt_default && operands.len() + 1 == expected) {
        return Err(AssembleError::OperandCountMismatch {
            line: line_number,
            mnemonic: mnemonic.to_string(),
        });
    }

    let mut instr = Instruction::from_mnemonic(mnemonic).ok_or_else(|| AssembleError::UnknownMnemonic {
        line: line_number,
        mnemonic: mnemonic.to_string(),
    })?;
    let mut operand_iter = operands.iter().peekable();

    for slot in &slots {
        match slot {
            Slot::Addressing(mode_name, reg_name) => {
                let op = operand_iter.next().ok_or_else(|| AssembleError::OperandCountMismatch {
                    line: line_number,
                    mnemonic: mnemonic.to_string(),
                })?;
                let (mode, reg, follow_on) = addressing_operand(op, location, symbols, line_number)?;
                instr.set_param(mode_name, mode);
                instr.set_param(reg_name, u32::from(reg));
                if let Some(value) = follow_on {
                    if *mode_name == "Ts" {
                        instr.set_immediate_source_operand(value);
                    } else {
                        instr.set_immediate_dest_operand(value);
                    }
                }
            }
            Slot::Plain(name) if *name == IMMEDIATE_WORD => {
                let op = operand_iter.next().ok_or_else(|| AssembleError::OperandCountMismatch {
                    line: line_number,
                    mnemonic: mnemonic.to_string(),
                })?;
                let value = resolve_value(op, location, symbols, line_number)?;
                instr.set_immediate_operand(value as u16);
            }
            Slot::Plain(name) if *name == "disp" => {
                let op = operand_iter.next().ok_or_else(|| AssembleError::OperandCountMismatch {
                    line: line_number,
                    mnemonic: mnemonic.to_string(),
                })?;
                let value = if def.format_number == 4 {
                    resolve_value(op, location, symbols, line_number)? as u32
                } else {
                    jump_displacement(op, location, symbols, line_number, def.format_number)?
                };
                instr.set_param("disp", value);
            }
            Slot::Plain(name) if *name == "W" => {
                let op = operand_iter.next().ok_or_else(|| AssembleError::OperandCountMismatch {
                    line: line_number,
                    mnemonic: mnemonic.to_string(),
                })?;
                let reg = register_value(op, line_number)?;
                instr.set_param("W", u32::from(reg));
            }
            Slot::Plain(name) => {
                let value = if *name == "CKPT" && operand_iter.peek().is_none() {
                    u32::from(default_ckpt)
                } else {
                    let op = operand_iter.next().ok_or_else(|| AssembleError::OperandCountMismatch {
                        line: line_number,
                        mnemonic: mnemonic.to_string(),
                    })?;
                    resolve_value(op, location, symbols, line_number)? as u32
                };
                instr.set_param(name, value);
            }
        }
    }
    instr.finalize();
    Ok(instr)
}

struct AssemblerState {
    location: u16,
    current_segment: AssemblerSegment,
    segments: Vec<AssemblerSegment>,
    default_ckpt: u8,
    alias_table: HashMap<String, String>,
    dxop_table: HashMap<String, i64>,
}

impl AssemblerState {
    fn new() -> AssemblerState {
        AssemblerState {
            location: 0,
            current_segment: AssemblerSegment::new(SegmentKind::Aorg, 0),
            segments: Vec::new(),
            default_ckpt: 10,
            alias_table: HashMap::new(),
            dxop_table: HashMap::new(),
        }
    }

    fn close_segment(&mut self, next_kind: SegmentKind, next_start: u16) {
        let finished = std::mem::replace(&mut self.current_segment, AssemblerSegment::new(next_kind, next_start));
        self.segments.push(finished);
    }

    fn finish(mut self) -> Vec<AssemblerSegment> {
        self.segments.push(self.current_segment);
        self.segments
    }
}

/// Apply a PI's location-counter and segment effects. `emit` is `None`
/// during pass 1 (symbol collection only) and `Some(bytes)` during pass 2.
fn apply_pi(
    state: &mut AssemblerState,
    line: &mut AssemblerLine,
    symbols: &mut SymbolTable,
    errors: &mut Vec<AssembleError>,
    mut emit: Option<&mut Vec<u8>>,
) {
    let mnemonic = line.mnemonic.as_deref().unwrap_or("");
    let is_pass2 = emit.is_some();

    fn operand_value(
        line: &AssemblerLine,
        idx: usize,
        location: u16,
        symbols: &SymbolTable,
        errors: &mut Vec<AssembleError>,
    ) -> Option<i64> {
        match line.operands.get(idx) {
            Some(op) => match resolve_value(op, location, symbols, line.line_number) {
                Ok(v) => Some(v),
                Err(e) => {
                    errors.push(e);
                    None
                }
            },
            None => None,
        }
    }

    fn define(
        symbols: &mut SymbolTable,
        name: &str,
        value: u16,
        line_number: usize,
        is_pass2: bool,
        errors: &mut Vec<AssembleError>,
    ) {
        // Symbols are collected once, in pass 1; pass 2 only reads them.
        if is_pass2 {
            return;
        }
        if !symbols.define(name, SymbolKind::Location, value, true, vec![], line_number) {
            errors.push(AssembleError::DuplicateSymbol {
                line: line_number,
                symbol: name.to_string(),
            });
        }
    }

    match mnemonic {
        "BYTE" => {
            let mut bytes = Vec::with_capacity(line.operands.len());
            for idx in 0..line.operands.len() {
                if let Some(v) = operand_value(line, idx, state.location, symbols, errors) {
                    bytes.push(v as u8);
                }
            }
            state.location = state.location.wrapping_add(bytes.len() as u16);
            if let Some(out) = emit.as_deref_mut() {
                out.extend_from_slice(&bytes);
            }
        }
        "DATA" => {
            let mut bytes = Vec::with_capacity(line.operands.len() * 2);
            for idx in 0..line.operands.len() {
                if let Some(v) = operand_value(line, idx, state.location, symbols, errors) {
                    let word = v as u16;
                    bytes.push((word >> 8) as u8);
                    bytes.push((word & 0xFF) as u8);
                }
            }
            state.location = state.location.wrapping_add(bytes.len() as u16);
            if let Some(out) = emit.as_deref_mut() {
                out.extend_from_slice(&bytes);
            }
        }
        "TEXT" => {
            let bytes = match line.operands.first() {
                Some(OperandKind::Text(s)) => s.as_bytes().to_vec(),
                _ => {
                    errors.push(AssembleError::MalformedOperand {
                        line: line.line_number,
                        operand: line.raw_operands.clone(),
                    });
                    Vec::new()
                }
            };
            state.location = state.location.wrapping_add(bytes.len() as u16);
            if let Some(out) = emit {
                out.extend_from_slice(&bytes);
            }
        }
        "BSS" => {
            let before = state.location;
            if let Some(label) = &line.label {
                define(symbols, label, before, line.line_number, is_pass2, errors);
            }
            if let Some(n) = operand_value(line, 0, state.location, symbols, errors) {
                state.location = state.location.wrapping_add(n as u16);
            }
        }
        "BES" => {
            if let Some(n) = operand_value(line, 0, state.location, symbols, errors) {
                state.location = state.location.wrapping_add(n as u16);
            }
            if let Some(label) = &line.label {
                define(symbols, label, state.location, line.line_number, is_pass2, errors);
            }
        }
        "EVEN" => {
            if !state.location.is_multiple_of(2) {
                state.location = state.location.wrapping_add(1);
            }
            if let Some(label) = &line.label {
                define(symbols, label, state.location, line.line_number, is_pass2, errors);
            }
        }
        "AORG" | "DORG" => {
            if let Some(n) = operand_value(line, 0, state.location, symbols, errors) {
                state.location = n as u16;
            }
            let kind = if mnemonic == "AORG" { SegmentKind::Aorg } else { SegmentKind::Dorg };
            state.close_segment(kind, state.location);
            if let Some(label) = &line.label {
                define(symbols, label, state.location, line.line_number, is_pass2, errors);
            }
        }
        "PSEG" | "DSEG" | "CSEG" => {
            let kind = match mnemonic {
                "PSEG" => SegmentKind::Pseg,
                "DSEG" => SegmentKind::Dseg,
                _ => SegmentKind::Cseg,
            };
            state.close_segment(kind, state.location);
        }
        "PEND" | "DEND" | "CEND" => {
            let expected = match mnemonic {
                "PEND" => SegmentKind::Pseg,
                "DEND" => SegmentKind::Dseg,
                _ => SegmentKind::Cseg,
            };
            if state.current_segment.kind != expected {
                errors.push(AssembleError::DirectiveOutsideSegment {
                    line: line.line_number,
                    directive: mnemonic.to_string(),
                });
            }
            state.close_segment(SegmentKind::Aorg, state.location);
        }
        "END" => {
            state.close_segment(SegmentKind::Aorg, state.location);
        }
        "EQU" => {
            if is_pass2 {
                // Collected and resolved in pass 1.
            } else if let Some(label) = &line.label {
                if let Some(op) = line.operands.first() {
                    match resolve_value(op, state.location, symbols, line.line_number) {
                        Ok(v) => {
                            if !symbols.define(label, SymbolKind::Assign, v as u16, true, vec![line.raw_operands.clone()], line.line_number) {
                                errors.push(AssembleError::DuplicateSymbol {
                                    line: line.line_number,
                                    symbol: label.clone(),
                                });
                            }
                        }
                        Err(_) => {
                            if !symbols.define(label, SymbolKind::Assign, 0, false, vec![line.raw_operands.clone()], line.line_number) {
                                errors.push(AssembleError::DuplicateSymbol {
                                    line: line.line_number,
                                    symbol: label.clone(),
                                });
                            }
                        }
                    }
                }
            }
        }
        "CKPT" => {
            if let Some(n) = operand_value(line, 0, state.location, symbols, errors) {
                state.default_ckpt = n as u8;
            }
        }
        "DFOP" => {
            if let (Some(label), Some(OperandKind::Unknown(target))) = (&line.label, line.operands.first()) {
                state.alias_table.insert(label.clone(), target.clone());
            }
        }
        "DXOP" => {
            if let (Some(label), Some(n)) = (line.label.clone(), operand_value(line, 0, state.location, symbols, errors)) {
                state.dxop_table.insert(label, n);
            }
        }
        _ => {
            log::warn!(target: "asm", "line {}: unsupported directive '{}', treated as a comment", line.line_number, mnemonic);
            line.kind = LineKind::Comment;
        }
    }
}

pub fn assemble(source: &str) -> AssembleOutput {
    let mut lines: Vec<AssemblerLine> = split_source_lines(source)
        .iter()
        .enumerate()
        .map(|(i, raw)| parse_line(i + 1, raw))
        .collect();

    let mut errors: Vec<AssembleError> = Vec::new();
    let mut symbols = SymbolTable::new();
    let mut state = AssemblerState::new();

    log::debug!(target: "asm", "pass 1: {} source lines", lines.len());

    // Pass 1: walk every line, advancing the location counter and
    // collecting every symbol definition this program makes.
    for line in lines.iter_mut() {
        match line.kind {
            LineKind::Comment | LineKind::Fallthrough | LineKind::Label => {
                if line.kind == LineKind::Label {
                    if let Some(label) = &line.label {
                        if !symbols.define(label, SymbolKind::Location, state.location, true, vec![], line.line_number) {
                            errors.push(AssembleError::DuplicateSymbol {
                                line: line.line_number,
                                symbol: label.clone(),
                            });
                        }
                    }
                }
            }
            LineKind::Pi => apply_pi(&mut state, line, &mut symbols, &mut errors, None),
            LineKind::Instruction => match resolve_mnemonic(line, &state.alias_table, &state.dxop_table) {
                Ok((mnemonic, operands)) => {
                    if let Some(label) = &line.label {
                        if !symbols.define(label, SymbolKind::Location, state.location, true, vec![], line.line_number) {
                            errors.push(AssembleError::DuplicateSymbol {
                                line: line.line_number,
                                symbol: label.clone(),
                            });
                        }
                    }
                    match opcode::lookup_by_name(&mnemonic) {
                        Some(def) => {
                            let words = word_count_for(def, &operands);
                            state.location = state.location.wrapping_add(2 * u16::from(words));
                        }
                        None => errors.push(AssembleError::UnknownMnemonic {
                            line: line.line_number,
                            mnemonic,
                        }),
                    }
                }
                Err(e) => errors.push(e),
            },
        }
    }

    resolve_assign_symbols(&mut symbols, lines.len(), &mut errors);

    log::debug!(target: "asm", "pass 2: {} symbols resolved, {} pass-1 errors", symbols.len(), errors.len());

    // Pass 2: re-walk with the same deterministic location-counter
    // trajectory, now building instructions and emitting bytes.
    let mut state = AssemblerState::new();
    state.default_ckpt = 10;
    for line in lines.iter_mut() {
        match line.kind {
            LineKind::Comment | LineKind::Fallthrough | LineKind::Label => {}
            LineKind::Pi => {
                let mut bytes = Vec::new();
                apply_pi(&mut state, line, &mut symbols, &mut errors, Some(&mut bytes));
                if !bytes.is_empty() {
                    state.current_segment.push(line.line_number, bytes);
                }
            }
            LineKind::Instruction => match resolve_mnemonic(line, &state.alias_table, &state.dxop_table) {
                Ok((mnemonic, operands)) => {
                    let location = state.location;
                    match encode_instruction(&mnemonic, &operands, location, &symbols, state.default_ckpt, line.line_number) {
                        Ok(instr) => {
                            let words = instr.words();
                            state.location = state.location.wrapping_add(2 * words.len() as u16);
                            let mut bytes = Vec::with_capacity(words.len() * 2);
                            for w in &words {
                                bytes.push((w >> 8) as u8);
                                bytes.push((w & 0xFF) as u8);
                            }
                            state.current_segment.push(line.line_number, bytes);
                            line.instruction = Some(instr);
                        }
                        Err(e) => errors.push(e),
                    }
                }
                Err(e) => errors.push(e),
            },
        }
    }

    let segments = state.finish();
    let image = match build_image(&segments) {
        Ok(image) => image,
        Err(e) => {
            errors.push(e);
            vec![0u8; crate::memory::MEMORY_SIZE]
        }
    };

    AssembleOutput {
        lines,
        symbols,
        image,
        errors,
    }
}

/// Resolve assign-type (EQU/DXOP) symbols that reference other symbols, by
/// repeated substitution, bounded at `10 * line_count` iterations.
fn resolve_assign_symbols(symbols: &mut SymbolTable, line_count: usize, errors: &mut Vec<AssembleError>) {
    let budget = 10 * line_count.max(1);
    for _ in 0..budget {
        if symbols.unresolved().next().is_none() {
            return;
        }
        let pending: Vec<(String, String, usize)> = symbols
            .unresolved()
            .filter(|s| s.kind == SymbolKind::Assign)
            .filter_map(|s| s.params.first().map(|p| (s.name.clone(), p.clone(), s.defined_at)))
            .collect();
        if pending.is_empty() {
            break;
        }
        let mut progressed = false;
        for (name, expr, line_number) in pending {
            if let Ok(value) = resolve_symbol_expr(&expr, 0, symbols, line_number) {
                symbols.set_value(&name, value as u16);
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    if symbols.unresolved().next().is_some() {
        errors.push(AssembleError::ResolutionDidNotConverge { passes: budget });
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn load_immediate_assembles_to_the_worked_example() {
        let out = assemble("  LI R1,>1234\n");
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        assert_eq!(out.image[0], 0x02);
        assert_eq!(out.image[1], 0x01);
        assert_eq!(out.image[2], 0x12);
        assert_eq!(out.image[3], 0x34);
    }

    #[test]
    fn unsupported_pi_downgrades_the_line_to_a_comment() {
        let out = assemble("  IDT 'PROG'\n  LI R1,>0001\n");
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        assert_eq!(out.lines[0].kind, LineKind::Comment);
        assert_eq!(out.image[0], 0x02);
    }

    #[test]
    fn bss_binds_label_pre_add_and_bes_post_add() {
        let out = assemble("BUF  BSS  4\nEND2 BES  4\n");
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        assert_eq!(out.symbols.get("BUF").unwrap().value, 0);
        assert_eq!(out.symbols.get("END2").unwrap().value, 8);
    }

    #[test]
    fn jump_to_a_forward_equ_label_resolves_to_zero_displacement() {
        let out = assemble("     JMP  TARGET\nTARGET EQU $\n");
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        assert_eq!(out.image[0], 0x13);
        assert_eq!(out.image[1], 0x00);
    }

    #[test]
    fn jump_loop_back_to_self_has_displacement_minus_one() {
        let out = assemble("LOOP JMP LOOP\n");
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        assert_eq!(out.image[0], 0x13);
        assert_eq!(out.image[1], 0xFF);
    }

    #[test]
    fn duplicate_label_is_reported() {
        let out = assemble("A LI R0,1\nA LI R0,2\n");
        assert!(out
            .errors
            .iter()
            .any(|e| matches!(e, AssembleError::DuplicateSymbol { .. })));
    }

    #[test]
    fn unknown_mnemonic_is_reported() {
        let out = assemble("   FROB R1,R2\n");
        assert!(out
            .errors
            .iter()
            .any(|e| matches!(e, AssembleError::UnknownMnemonic { .. })));
    }

    #[test]
    fn nop_expands_to_jmp_dollar_plus_two() {
        let out = assemble("  NOP\n");
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        assert_eq!(out.image[0], 0x13);
        assert_eq!(out.image[1], 0x00);
    }

    #[test]
    fn dend_without_a_matching_dseg_is_reported() {
        let out = assemble("  DEND\n");
        assert!(out
            .errors
            .iter()
            .any(|e| matches!(e, AssembleError::DirectiveOutsideSegment { directive, .. } if directive == "DEND")));
    }

    #[test]
    fn pend_closing_a_pseg_it_actually_opened_is_clean() {
        let out = assemble("  PSEG\n  LI R1,>0001\n  PEND\n");
        assert!(!out
            .errors
            .iter()
            .any(|e| matches!(e, AssembleError::DirectiveOutsideSegment { .. })));
    }
}
