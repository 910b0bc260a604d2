//! The static table of every TMS99105 mnemonic: base opcode, legal-max
//! range, format, platform availability, and the status bits it touches.
//!
//! Every entry's bit geometry is owned by the format table (`super::format`)
//! — this table only records identity, legality range, and semantic
//! metadata. `opcode`/`opcode_legal_max` ranges are disjoint by
//! construction: each mnemonic claims one aligned, format-sized block of
//! the 16-bit opcode space.

use super::format::{self, FormatDescriptor};
use crate::status::StatusFlags;
use bitflags::bitflags;

bitflags! {
    /// Which hardware variants implement a given mnemonic.
    pub struct PlatformMask: u8 {
        const TMS9900  = 0b0001;
        const TMS9995  = 0b0010;
        const TMS99000 = 0b0100;
        const TMS99105 = 0b1000;
    }
}

pub const ALL_PLATFORMS: PlatformMask = PlatformMask::from_bits_truncate(0b1111);
pub const TMS99105_ONLY: PlatformMask = PlatformMask::TMS99105;

/// Declared Macro-Instruction-Definition gaps: opcode ranges deliberately
/// left without a catalog entry, reserved for host-defined macros. Unlike
/// an ordinary unassigned word (which also decodes to nothing), a MID gap
/// is a *named* range a caller can query for explicitly.
pub static MID_RANGES: [(u16, u16); 3] = [(0x0000, 0x003F), (0x00E0, 0x00FF), (0x0250, 0x027F)];

pub fn opcode_in_mid_range(word: u16) -> bool {
    MID_RANGES.iter().any(|&(lo, hi)| word >= lo && word <= hi)
}

#[derive(Debug, Clone, Copy)]
pub struct OpcodeDef {
    pub name: &'static str,
    pub short_description: &'static str,
    pub opcode: u16,
    pub opcode_legal_max: u16,
    pub arg_start_bit: u8,
    pub format_number: u8,
    pub platforms: PlatformMask,
    pub performs_privilege_check: bool,
    pub touches_status_bits: StatusFlags,
}

impl OpcodeDef {
    pub fn format(&self) -> &'static FormatDescriptor {
        format::lookup(self.format_number)
            .unwrap_or_else(|| panic!("{} references unknown format {}", self.name, self.format_number))
    }

    pub fn has_immediate_operand(&self) -> bool {
        self.format_number == 8
    }

    pub fn has_possible_immediate_source(&self) -> bool {
        self.format().has_param("Ts")
    }

    pub fn has_possible_immediate_dest(&self) -> bool {
        self.format().has_param("Td")
    }

    pub fn has_second_opcode_word(&self) -> bool {
        self.format().has_second_opcode_word()
    }

    /// Words assuming no conditional (symbolic/indexed) operands resolve.
    pub fn minimum_instruction_words(&self) -> u8 {
        1 + u8::from(self.has_second_opcode_word()) + u8::from(self.format().has_immediate_word())
    }

    /// Words assuming every Ts/Td that could be symbolic/indexed is.
    pub fn maximum_instruction_words(&self) -> u8 {
        self.minimum_instruction_words()
            + u8::from(self.has_possible_immediate_source())
            + u8::from(self.has_possible_immediate_dest())
    }

    pub fn is_enabled_for(&self, platform: PlatformMask) -> bool {
        self.platforms.contains(platform)
    }
}

macro_rules! op {
    ($name:literal, $desc:literal, $opcode:literal, $legal_max:literal, $start:literal, $fmt:literal, $plat:expr, $priv:literal, $status:expr) => {
        OpcodeDef {
            name: $name,
            short_description: $desc,
            opcode: $opcode,
            opcode_legal_max: $legal_max,
            arg_start_bit: $start,
            format_number: $fmt,
            platforms: $plat,
            performs_privilege_check: $priv,
            touches_status_bits: $status,
        }
    };
}

const ARITH: StatusFlags = StatusFlags::from_bits_truncate(
    StatusFlags::L_GT.bits() | StatusFlags::A_GT.bits() | StatusFlags::EQ.bits()
        | StatusFlags::C.bits() | StatusFlags::O.bits(),
);
const ARITH_BYTE: StatusFlags =
    StatusFlags::from_bits_truncate(ARITH.bits() | StatusFlags::P.bits());
const LOGIC: StatusFlags = StatusFlags::from_bits_truncate(
    StatusFlags::L_GT.bits() | StatusFlags::A_GT.bits() | StatusFlags::EQ.bits(),
);
const LOGIC_BYTE: StatusFlags =
    StatusFlags::from_bits_truncate(LOGIC.bits() | StatusFlags::P.bits());
const COMPARE_ONLY: StatusFlags = LOGIC;
const EQ_ONLY: StatusFlags = StatusFlags::EQ;
const NONE: StatusFlags = StatusFlags::empty();

pub static CATALOG: &[OpcodeDef] = &[
    // --- format 1: general two-address ---
    op!("SZC", "Set zeros corresponding", 0x4000, 0x4FFF, 4, 1, ALL_PLATFORMS, false, LOGIC),
    op!("SZCB", "Set zeros corresponding, byte", 0x5000, 0x5FFF, 4, 1, ALL_PLATFORMS, false, LOGIC_BYTE),
    op!("S", "Subtract", 0x6000, 0x6FFF, 4, 1, ALL_PLATFORMS, false, ARITH),
    op!("SB", "Subtract, byte", 0x7000, 0x7FFF, 4, 1, ALL_PLATFORMS, false, ARITH_BYTE),
    op!("C", "Compare", 0x8000, 0x8FFF, 4, 1, ALL_PLATFORMS, false, COMPARE_ONLY),
    op!("CB", "Compare, byte", 0x9000, 0x9FFF, 4, 1, ALL_PLATFORMS, false, StatusFlags::from_bits_truncate(LOGIC.bits() | StatusFlags::P.bits())),
    op!("A", "Add", 0xA000, 0xAFFF, 4, 1, ALL_PLATFORMS, false, ARITH),
    op!("AB", "Add, byte", 0xB000, 0xBFFF, 4, 1, ALL_PLATFORMS, false, ARITH_BYTE),
    op!("MOV", "Move", 0xC000, 0xCFFF, 4, 1, ALL_PLATFORMS, false, LOGIC),
    op!("MOVB", "Move, byte", 0xD000, 0xDFFF, 4, 1, ALL_PLATFORMS, false, LOGIC_BYTE),
    op!("SOC", "Set ones corresponding", 0xE000, 0xEFFF, 4, 1, ALL_PLATFORMS, false, LOGIC),
    op!("SOCB", "Set ones corresponding, byte", 0xF000, 0xFFFF, 4, 1, ALL_PLATFORMS, false, LOGIC_BYTE),
    // --- format 16: no-operand control ---
    op!("IDLE", "Idle until interrupt", 0x0040, 0x0040, 16, 7, ALL_PLATFORMS, true, NONE),
    op!("RSET", "Reset interrupt mask", 0x0050, 0x0050, 16, 7, ALL_PLATFORMS, true, NONE),
    op!("RTWP", "Return with workspace pointer", 0x0060, 0x0060, 16, 7, ALL_PLATFORMS, false, NONE),
    op!("CKON", "CRU clock on", 0x0070, 0x0070, 16, 7, ALL_PLATFORMS, true, NONE),
    op!("CKOF", "CRU clock off", 0x0080, 0x0080, 16, 7, ALL_PLATFORMS, true, NONE),
    op!("LREX", "Load and REX", 0x0090, 0x0090, 16, 7, ALL_PLATFORMS, true, NONE),
    op!("LWPI", "Load workspace pointer immediate", 0x00A0, 0x00A0, 16, 9, ALL_PLATFORMS, true, NONE),
    op!("LIMI", "Load interrupt mask immediate", 0x00B0, 0x00B0, 16, 9, ALL_PLATFORMS, true, NONE),
    op!("JMPL", "Long jump", 0x00C0, 0x00C0, 16, 17, TMS99105_ONLY, false, NONE),
    op!("JNEL", "Long jump if not equal", 0x00D0, 0x00D0, 16, 17, TMS99105_ONLY, false, NONE),
    // --- format 6: single general address ---
    op!("STWP", "Store workspace pointer", 0x0100, 0x013F, 10, 6, ALL_PLATFORMS, false, NONE),
    op!("STST", "Store status register", 0x0140, 0x017F, 10, 6, ALL_PLATFORMS, false, NONE),
    op!("BLWP", "Branch and load workspace pointer", 0x0180, 0x01BF, 10, 6, ALL_PLATFORMS, false, NONE),
    op!("B", "Branch", 0x01C0, 0x01FF, 10, 6, ALL_PLATFORMS, false, NONE),
    op!("X", "Execute", 0x0280, 0x02BF, 10, 6, ALL_PLATFORMS, false, NONE),
    op!("CLR", "Clear", 0x02C0, 0x02FF, 10, 6, ALL_PLATFORMS, false, NONE),
    op!("NEG", "Negate", 0x0300, 0x033F, 10, 6, ALL_PLATFORMS, false, ARITH),
    op!("INV", "Invert", 0x0340, 0x037F, 10, 6, ALL_PLATFORMS, false, LOGIC),
    op!("INC", "Increment", 0x0380, 0x03BF, 10, 6, ALL_PLATFORMS, false, ARITH),
    op!("INCT", "Increment by two", 0x03C0, 0x03FF, 10, 6, ALL_PLATFORMS, false, ARITH),
    op!("DEC", "Decrement", 0x0400, 0x043F, 10, 6, ALL_PLATFORMS, false, ARITH),
    op!("DECT", "Decrement by two", 0x0440, 0x047F, 10, 6, ALL_PLATFORMS, false, ARITH),
    op!("BL", "Branch and link", 0x0480, 0x04BF, 10, 6, ALL_PLATFORMS, false, NONE),
    op!("SWPB", "Swap bytes", 0x04C0, 0x04FF, 10, 6, ALL_PLATFORMS, false, NONE),
    op!("SETO", "Set to ones", 0x0500, 0x053F, 10, 6, ALL_PLATFORMS, false, NONE),
    op!("ABS", "Absolute value", 0x0540, 0x057F, 10, 6, ALL_PLATFORMS, false, ARITH),
    // --- format 13: signed multiply ---
    op!("MPYS", "Signed multiply", 0x0580, 0x05BF, 10, 13, TMS99105_ONLY, false, ARITH),
    // --- format 14: CRU base load ---
    op!("LDD", "Load CRU base, direct", 0x05C0, 0x05FF, 10, 14, TMS99105_ONLY, true, NONE),
    // --- format 15: memory-bit test ---
    op!("TMB", "Test memory bit", 0x0600, 0x063F, 10, 15, TMS99105_ONLY, false, EQ_ONLY),
    // --- format 16: single-precision float register-register ---
    op!("AR", "Add, real", 0x0640, 0x067F, 10, 16, TMS99105_ONLY, false, ARITH),
    op!("SR", "Subtract, real", 0x0680, 0x06BF, 10, 16, TMS99105_ONLY, false, ARITH),
    op!("MR", "Multiply, real", 0x06C0, 0x06FF, 10, 16, TMS99105_ONLY, false, ARITH),
    op!("DR", "Divide, real", 0x0700, 0x073F, 10, 16, TMS99105_ONLY, false, ARITH),
    op!("NEGR", "Negate, real", 0x0740, 0x077F, 10, 16, TMS99105_ONLY, false, ARITH),
    op!("LR", "Load, real", 0x0780, 0x07BF, 10, 16, TMS99105_ONLY, false, NONE),
    op!("STR", "Store, real", 0x07C0, 0x07FF, 10, 16, TMS99105_ONLY, false, NONE),
    // --- format 18: direct workspace-pointer load ---
    op!("LWP", "Load workspace pointer, direct", 0x0800, 0x083F, 10, 18, TMS99105_ONLY, true, NONE),
    // --- format 19: floating point conversions ---
    op!("CDE", "Convert double to extended", 0x0840, 0x087F, 10, 19, TMS99105_ONLY, false, NONE),
    op!("CER", "Convert extended to real", 0x0880, 0x08BF, 10, 19, TMS99105_ONLY, false, NONE),
    op!("CDI", "Convert double to integer", 0x08C0, 0x08FF, 10, 19, TMS99105_ONLY, false, ARITH),
    op!("CID", "Convert integer to double", 0x0900, 0x093F, 10, 19, TMS99105_ONLY, false, NONE),
    op!("CIR", "Convert integer to real", 0x0940, 0x097F, 10, 19, TMS99105_ONLY, false, NONE),
    op!("CRI", "Convert real to integer", 0x0980, 0x09BF, 10, 19, TMS99105_ONLY, false, ARITH),
    op!("CRE", "Convert real to extended", 0x09C0, 0x09FF, 10, 19, TMS99105_ONLY, false, NONE),
    op!("CED", "Convert extended to double", 0x0A00, 0x0A3F, 10, 19, TMS99105_ONLY, false, NONE),
    // --- format 20: double-precision float register-register ---
    op!("AD", "Add, double", 0x0A40, 0x0A7F, 10, 20, TMS99105_ONLY, false, ARITH),
    op!("SD", "Subtract, double", 0x0A80, 0x0ABF, 10, 20, TMS99105_ONLY, false, ARITH),
    op!("MD", "Multiply, double", 0x0AC0, 0x0AFF, 10, 20, TMS99105_ONLY, false, ARITH),
    op!("DD", "Divide, double", 0x0B00, 0x0B3F, 10, 20, TMS99105_ONLY, false, ARITH),
    op!("NEGD", "Negate, double", 0x0B40, 0x0B7F, 10, 20, TMS99105_ONLY, false, ARITH),
    op!("LD", "Load, double", 0x0B80, 0x0BBF, 10, 20, TMS99105_ONLY, false, NONE),
    op!("STD", "Store, double", 0x0BC0, 0x0BFF, 10, 20, TMS99105_ONLY, false, NONE),
    // --- format 10: register shift ---
    op!("SRA", "Shift right arithmetic", 0x0C00, 0x0CFF, 8, 10, ALL_PLATFORMS, false, ARITH),
    op!("SRL", "Shift right logical", 0x0D00, 0x0DFF, 8, 10, ALL_PLATFORMS, false, StatusFlags::from_bits_truncate(ARITH.bits() & !StatusFlags::O.bits()) ),
    op!("SLA", "Shift left arithmetic", 0x0E00, 0x0EFF, 8, 10, ALL_PLATFORMS, false, ARITH),
    op!("SRC", "Shift right circular", 0x0F00, 0x0FFF, 8, 10, ALL_PLATFORMS, false, StatusFlags::from_bits_truncate(ARITH.bits() & !StatusFlags::O.bits()) ),
    // --- format 4: CRU single-bit ---
    op!("SBO", "Set CRU bit to one", 0x1000, 0x10FF, 8, 4, ALL_PLATFORMS, false, NONE),
    op!("SBZ", "Set CRU bit to zero", 0x1100, 0x11FF, 8, 4, ALL_PLATFORMS, false, NONE),
    op!("TB", "Test CRU bit", 0x1200, 0x12FF, 8, 4, ALL_PLATFORMS, false, EQ_ONLY),
    // --- format 2: short jump ---
    op!("JMP", "Unconditional jump", 0x1300, 0x13FF, 8, 2, ALL_PLATFORMS, false, NONE),
    op!("JLT", "Jump if less than (arithmetic)", 0x1400, 0x14FF, 8, 2, ALL_PLATFORMS, false, NONE),
    op!("JLE", "Jump if less or equal (logical)", 0x1500, 0x15FF, 8, 2, ALL_PLATFORMS, false, NONE),
    op!("JEQ", "Jump if equal", 0x1600, 0x16FF, 8, 2, ALL_PLATFORMS, false, NONE),
    op!("JHE", "Jump if higher or equal (logical)", 0x1700, 0x17FF, 8, 2, ALL_PLATFORMS, false, NONE),
    op!("JGT", "Jump if greater than (arithmetic)", 0x1800, 0x18FF, 8, 2, ALL_PLATFORMS, false, NONE),
    op!("JNE", "Jump if not equal", 0x1900, 0x19FF, 8, 2, ALL_PLATFORMS, false, NONE),
    op!("JNC", "Jump if no carry", 0x1A00, 0x1AFF, 8, 2, ALL_PLATFORMS, false, NONE),
    op!("JOC", "Jump on carry", 0x1B00, 0x1BFF, 8, 2, ALL_PLATFORMS, false, NONE),
    op!("JNO", "Jump if no overflow", 0x1C00, 0x1CFF, 8, 2, ALL_PLATFORMS, false, NONE),
    op!("JL", "Jump if lower (logical)", 0x1D00, 0x1DFF, 8, 2, ALL_PLATFORMS, false, NONE),
    op!("JH", "Jump if higher (logical)", 0x1E00, 0x1EFF, 8, 2, ALL_PLATFORMS, false, NONE),
    op!("JOP", "Jump if odd parity", 0x1F00, 0x1FFF, 8, 2, ALL_PLATFORMS, false, NONE),
    // --- format 3: general-address-to-register compare ---
    op!("COC", "Compare ones corresponding", 0x2000, 0x23FF, 6, 3, ALL_PLATFORMS, false, EQ_ONLY),
    op!("CZC", "Compare zeros corresponding", 0x2400, 0x27FF, 6, 3, ALL_PLATFORMS, false, EQ_ONLY),
    op!("XOR", "Exclusive or", 0x2800, 0x2BFF, 6, 3, ALL_PLATFORMS, false, LOGIC),
    // --- format 11: XOP ---
    op!("XOP", "Extended operation", 0x2C00, 0x2FFF, 6, 11, ALL_PLATFORMS, false, NONE),
    // --- format 5: CRU multi-bit transfer ---
    op!("LDCR", "Load CRU", 0x3000, 0x33FF, 6, 5, ALL_PLATFORMS, false, LOGIC_BYTE),
    op!("STCR", "Store CRU", 0x3400, 0x37FF, 6, 5, ALL_PLATFORMS, false, LOGIC_BYTE),
    // --- format 12: checkpointed block move ---
    op!("BLM", "Block move with checkpoint", 0x3800, 0x3BFF, 6, 12, TMS99105_ONLY, false, NONE),
    // --- format 21: block move of words ---
    op!("BMW", "Block move words", 0x3C00, 0x3FFF, 6, 21, TMS99105_ONLY, false, NONE),
    // --- format 8: immediate-to-register ---
    op!("LI", "Load immediate", 0x0200, 0x020F, 12, 8, ALL_PLATFORMS, false, LOGIC),
    op!("AI", "Add immediate", 0x0210, 0x021F, 12, 8, ALL_PLATFORMS, false, ARITH),
    op!("ANDI", "And immediate", 0x0220, 0x022F, 12, 8, ALL_PLATFORMS, false, LOGIC),
    op!("ORI", "Or immediate", 0x0230, 0x023F, 12, 8, ALL_PLATFORMS, false, LOGIC),
    op!("CI", "Compare immediate", 0x0240, 0x024F, 12, 8, ALL_PLATFORMS, false, COMPARE_ONLY),
];

pub fn lookup_by_name(mnemonic: &str) -> Option<&'static OpcodeDef> {
    CATALOG.iter().find(|def| def.name.eq_ignore_ascii_case(mnemonic))
}

pub fn lookup_by_opcode(word: u16) -> Option<&'static OpcodeDef> {
    CATALOG
        .iter()
        .find(|def| word >= def.opcode && word <= def.opcode_legal_max)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ranges_are_pairwise_disjoint() {
        for (i, a) in CATALOG.iter().enumerate() {
            assert!(
                a.opcode <= a.opcode_legal_max,
                "{} has inverted range",
                a.name
            );
            for b in CATALOG.iter().skip(i + 1) {
                let overlap = a.opcode <= b.opcode_legal_max && b.opcode <= a.opcode_legal_max;
                assert!(!overlap, "{} and {} overlap", a.name, b.name);
            }
        }
    }

    #[test]
    fn every_entry_references_a_real_format() {
        for def in CATALOG {
            assert!(format::lookup(def.format_number).is_some(), "{}", def.name);
        }
    }

    #[test]
    fn lookup_by_opcode_matches_the_range_invariant() {
        for word in (0..=0xFFFFu32).step_by(97) {
            if let Some(def) = lookup_by_opcode(word as u16) {
                assert!(word as u16 >= def.opcode && word as u16 <= def.opcode_legal_max);
            }
        }
    }

    #[test]
    fn li_lands_where_the_worked_example_expects() {
        let li = lookup_by_name("LI").unwrap();
        assert_eq!(li.opcode, 0x0200);
    }

    #[test]
    fn mid_ranges_have_no_catalog_entry() {
        for &(lo, hi) in MID_RANGES.iter() {
            let mut w = lo;
            loop {
                assert!(lookup_by_opcode(w).is_none());
                if w == hi {
                    break;
                }
                w += 1;
            }
        }
    }
}
