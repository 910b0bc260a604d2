//! Pass 1 line tokenizing: split a source line into its label, mnemonic,
//! and classified operands, with quote- and comment-aware splitting.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Comment,
    Label,
    Instruction,
    Pi,
    Fallthrough,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandKind {
    Number(i64),
    Register(u8),
    RegisterIndirect(u8),
    RegisterIndirectAutoInc(u8),
    Indexed { symbol: String, reg: u8 },
    Symbolic(String),
    Text(String),
    Unknown(String),
}

#[derive(Debug, Clone)]
pub struct AssemblerLine {
    pub line_number: usize,
    pub kind: LineKind,
    pub text: String,
    pub label: Option<String>,
    pub mnemonic: Option<String>,
    pub raw_operands: String,
    pub operands: Vec<OperandKind>,
    pub instruction: Option<crate::instruction::Instruction>,
    pub data_word: Option<u16>,
}

pub const PI_NAMES: &[&str] = &[
    "AORG", "DORG", "BSS", "BES", "EVEN", "END", "PSEG", "PEND", "DSEG", "DEND", "CSEG", "CEND",
    "BYTE", "DATA", "TEXT", "EQU", "CKPT", "DFOP", "DXOP",
    // Recognized but not implemented: listing/linkage directives with no
    // meaning for a single in-memory image. Downgraded to a comment.
    "IDT", "TITL", "PAGE", "UNL", "LIST", "DEF", "REF", "SREF", "COPY", "WIDTH",
];

/// `NOP` expands to `JMP $+2`, `RT` to `B *R11`. Both are handled before
/// catalog lookup since neither is itself a mnemonic.
pub const MACRO_NAMES: &[&str] = &["NOP", "RT"];

fn is_label_start(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Strip a trailing comment. `*` only introduces a comment at column 1;
/// `;` does so anywhere, as long as it is not inside a quoted string.
fn strip_comment(text: &str) -> (&str, bool) {
    if text.starts_with('*') {
        return ("", true);
    }
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                } else if c == ';' {
                    return (&text[..i], false);
                }
            }
        }
    }
    (text, false)
}

/// Split a comma-separated operand list, treating quoted substrings as
/// atomic (a comma inside a quote does not end an operand).
pub fn split_operands(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in raw.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                    current.push(c);
                } else if c == ',' {
                    out.push(current.trim().to_string());
                    current.clear();
                } else {
                    current.push(c);
                }
            }
        }
    }
    let tail = current.trim().to_string();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

fn parse_register(s: &str) -> Option<u8> {
    let digits = s.strip_prefix("WR").or_else(|| s.strip_prefix('R'))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u8>().ok().filter(|&n| n <= 15)
}

/// Parse an integer literal per the conventions shared with `Instruction`
/// parameter setters: optional leading `-`, then `>` / `0x` / `0b` prefix
/// or plain decimal.
pub fn parse_number(s: &str) -> Option<i64> {
    let (neg, rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s),
    };
    let value = if let Some(hex) = rest.strip_prefix('>') {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = rest.strip_prefix("0b").or_else(|| rest.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()?
    } else if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
        rest.parse::<i64>().ok()?
    } else {
        return None;
    };
    Some(if neg { -value } else { value })
}

pub fn classify_operand(raw: &str) -> OperandKind {
    let raw = raw.trim();
    if raw.len() >= 2
        && ((raw.starts_with('"') && raw.ends_with('"'))
            || (raw.starts_with('\'') && raw.ends_with('\'')))
    {
        return OperandKind::Text(raw[1..raw.len() - 1].to_string());
    }
    if let Some(rest) = raw.strip_prefix('@') {
        if let Some(open) = rest.find('(') {
            if rest.ends_with(')') {
                let symbol = rest[..open].to_string();
                let reg_text = &rest[open + 1..rest.len() - 1];
                if let Some(reg) = parse_register(reg_text) {
                    return OperandKind::Indexed { symbol, reg };
                }
            }
        }
        return OperandKind::Symbolic(rest.to_string());
    }
    if let Some(rest) = raw.strip_prefix('*') {
        if let Some(base) = rest.strip_suffix('+') {
            if let Some(reg) = parse_register(base) {
                return OperandKind::RegisterIndirectAutoInc(reg);
            }
        }
        if let Some(reg) = parse_register(rest) {
            return OperandKind::RegisterIndirect(reg);
        }
    }
    if let Some(reg) = parse_register(raw) {
        return OperandKind::Register(reg);
    }
    if let Some(n) = parse_number(raw) {
        return OperandKind::Number(n);
    }
    OperandKind::Unknown(raw.to_string())
}

/// Parse a single source line (CR/LF already stripped by the caller).
pub fn parse_line(line_number: usize, raw: &str) -> AssemblerLine {
    let (body, is_full_comment) = strip_comment(raw);
    if is_full_comment || body.trim().is_empty() {
        return AssemblerLine {
            line_number,
            kind: if raw.trim().is_empty() && !is_full_comment {
                LineKind::Fallthrough
            } else {
                LineKind::Comment
            },
            text: raw.to_string(),
            label: None,
            mnemonic: None,
            raw_operands: String::new(),
            operands: Vec::new(),
            instruction: None,
            data_word: None,
        };
    }

    let starts_with_label = body
        .chars()
        .next()
        .map(is_label_start)
        .unwrap_or(false);

    let mut rest = body;
    let mut label = None;
    if starts_with_label {
        let end = rest
            .find(|c: char| !is_label_char(c))
            .unwrap_or(rest.len());
        label = Some(rest[..end].to_string());
        rest = &rest[end..];
        rest = rest.strip_prefix(':').unwrap_or(rest);
    }

    let rest = rest.trim_start();
    if rest.is_empty() {
        return AssemblerLine {
            line_number,
            kind: LineKind::Label,
            text: raw.to_string(),
            label,
            mnemonic: None,
            raw_operands: String::new(),
            operands: Vec::new(),
            instruction: None,
            data_word: None,
        };
    }

    let collapsed = rest.split_whitespace().collect::<Vec<_>>().join(" ");
    let (mnemonic_text, operand_text) = match collapsed.find(' ') {
        Some(idx) => (&collapsed[..idx], collapsed[idx + 1..].trim()),
        None => (collapsed.as_str(), ""),
    };
    let mnemonic = mnemonic_text.to_string();
    let operands: Vec<OperandKind> = split_operands(operand_text)
        .iter()
        .map(|s| classify_operand(s))
        .collect();

    let kind = if PI_NAMES.contains(&mnemonic.as_str()) {
        LineKind::Pi
    } else {
        LineKind::Instruction
    };

    AssemblerLine {
        line_number,
        kind,
        text: raw.to_string(),
        label,
        mnemonic: Some(mnemonic),
        raw_operands: operand_text.to_string(),
        operands,
        instruction: None,
        data_word: None,
    }
}

/// Split source text on CR, LF, or CRLF.
pub fn split_source_lines(source: &str) -> Vec<String> {
    source
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn label_and_mnemonic_split() {
        let line = parse_line(1, "BUF  BSS  4");
        assert_eq!(line.label.as_deref(), Some("BUF"));
        assert_eq!(line.mnemonic.as_deref(), Some("BSS"));
        assert_eq!(line.operands, vec![OperandKind::Number(4)]);
    }

    #[test]
    fn star_comment_only_at_column_one() {
        let line = parse_line(1, "* a whole-line comment");
        assert_eq!(line.kind, LineKind::Comment);
    }

    #[test]
    fn semicolon_comment_trims_trailing_text() {
        let line = parse_line(1, "  LI R1,>1234 ; load it");
        assert_eq!(line.mnemonic.as_deref(), Some("LI"));
        assert_eq!(line.operands.len(), 2);
    }

    #[test]
    fn quoted_operand_may_contain_commas() {
        let line = parse_line(1, "  TEXT 'a, b, c'");
        assert_eq!(
            line.operands,
            vec![OperandKind::Text("a, b, c".to_string())]
        );
    }

    #[test]
    fn indexed_and_symbolic_operands() {
        assert_eq!(
            classify_operand("@>0200(R1)"),
            OperandKind::Indexed {
                symbol: ">0200".to_string(),
                reg: 1
            }
        );
        assert_eq!(
            classify_operand("@>0200"),
            OperandKind::Symbolic(">0200".to_string())
        );
    }

    #[test]
    fn register_indirect_operands() {
        assert_eq!(classify_operand("*R11"), OperandKind::RegisterIndirect(11));
        assert_eq!(
            classify_operand("*R1+"),
            OperandKind::RegisterIndirectAutoInc(1)
        );
    }
}
