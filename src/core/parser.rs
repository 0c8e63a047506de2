// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Line parsing: comments, labels, mnemonics, and the two-operand grammar.
//!
//! A line splits into at most three fields: the mnemonic, the first
//! operand, and the remainder of the line. The remainder is kept whole so
//! string literals may contain whitespace.

use crate::core::error::{AsmError, AsmErrorKind};
use crate::core::opcode::Opcode;

/// Strip everything from the first `//` onward.
#[must_use]
pub fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn take_token(input: &str) -> (Option<&str>, &str) {
    let input = input.trim_start();
    if input.is_empty() {
        return (None, "");
    }
    let end = input
        .find(|c: char| c.is_whitespace())
        .unwrap_or(input.len());
    (Some(&input[..end]), &input[end..])
}

/// Assembly mnemonics accepted by the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Put,
    Mov,
    Cmp,
    Jmp,
    Je,
    Jne,
    Jg,
    Jge,
    Jl,
    Jle,
    Call,
    And,
    Or,
    Xor,
    Not,
    Lsh,
    Rsh,
    Add,
    Sub,
    Mul,
    Div,
    Ret,
    Out,
    Hlt,
}

/// How a mnemonic lowers: no operands, a single operand-consuming
/// micro-op, or the two-cell read-then-op form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MnemonicClass {
    Plain(Opcode),
    Single(Opcode),
    Binary(Opcode),
    Put,
}

impl Mnemonic {
    #[must_use]
    pub fn from_token(tok: &str) -> Option<Self> {
        match tok {
            "put" => Some(Self::Put),
            "mov" => Some(Self::Mov),
            "cmp" => Some(Self::Cmp),
            "jmp" => Some(Self::Jmp),
            "je" => Some(Self::Je),
            "jne" => Some(Self::Jne),
            "jg" => Some(Self::Jg),
            "jge" => Some(Self::Jge),
            "jl" => Some(Self::Jl),
            "jle" => Some(Self::Jle),
            "call" => Some(Self::Call),
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "xor" => Some(Self::Xor),
            "not" => Some(Self::Not),
            "lsh" => Some(Self::Lsh),
            "rsh" => Some(Self::Rsh),
            "add" => Some(Self::Add),
            "sub" => Some(Self::Sub),
            "mul" => Some(Self::Mul),
            "div" => Some(Self::Div),
            "ret" => Some(Self::Ret),
            "out" => Some(Self::Out),
            "hlt" => Some(Self::Hlt),
            _ => None,
        }
    }

    #[must_use]
    pub fn class(self) -> MnemonicClass {
        match self {
            Self::Hlt => MnemonicClass::Plain(Opcode::Halt),
            Self::Out => MnemonicClass::Plain(Opcode::Out),
            Self::Ret => MnemonicClass::Plain(Opcode::Ret),
            Self::Not => MnemonicClass::Single(Opcode::Not),
            Self::Jmp => MnemonicClass::Single(Opcode::Jump),
            Self::Call => MnemonicClass::Single(Opcode::Call),
            Self::Je => MnemonicClass::Single(Opcode::Je),
            Self::Jne => MnemonicClass::Single(Opcode::Jne),
            Self::Jg => MnemonicClass::Single(Opcode::Jg),
            Self::Jge => MnemonicClass::Single(Opcode::Jge),
            Self::Jl => MnemonicClass::Single(Opcode::Jl),
            Self::Jle => MnemonicClass::Single(Opcode::Jle),
            Self::Mov => MnemonicClass::Binary(Opcode::Write),
            Self::Cmp => MnemonicClass::Binary(Opcode::Cmp),
            Self::And => MnemonicClass::Binary(Opcode::And),
            Self::Or => MnemonicClass::Binary(Opcode::Or),
            Self::Xor => MnemonicClass::Binary(Opcode::Xor),
            Self::Lsh => MnemonicClass::Binary(Opcode::Lshift),
            Self::Rsh => MnemonicClass::Binary(Opcode::Rshift),
            Self::Add => MnemonicClass::Binary(Opcode::Add),
            Self::Sub => MnemonicClass::Binary(Opcode::Sub),
            Self::Mul => MnemonicClass::Binary(Opcode::Mul),
            Self::Div => MnemonicClass::Binary(Opcode::Div),
            Self::Put => MnemonicClass::Put,
        }
    }
}

/// First-operand forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddrOperand {
    /// `0x…`: absolute address.
    Abs(u32),
    /// `[0x…]`: the cell at this address supplies the effective address
    /// at runtime.
    Indirect(u32),
    /// Symbolic label, resolved against the label table.
    Label(String),
}

/// Second-operand forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueOperand {
    /// Immediate unsigned integer.
    Number(u32),
    /// `[…]`: the cell at this address supplies the datum at runtime.
    Cell(u32),
    /// `"…"`: character string, backslashes kept verbatim.
    Str(String),
}

/// One parsed source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Empty,
    Label(String),
    Statement(Statement),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub mnemonic: Mnemonic,
    pub first: Option<AddrOperand>,
    pub second: Option<ValueOperand>,
}

impl Statement {
    /// Number of instruction cells this statement lowers to. Widths are
    /// fixed per form so pass 1 can lay out labels without emitting.
    #[must_use]
    pub fn width(&self) -> u32 {
        match self.mnemonic.class() {
            MnemonicClass::Plain(_) | MnemonicClass::Single(_) => 1,
            MnemonicClass::Binary(_) => 2,
            MnemonicClass::Put => match &self.second {
                Some(ValueOperand::Number(_)) => 3,
                Some(ValueOperand::Cell(_)) => 2,
                Some(ValueOperand::Str(s)) => 3 * s.len() as u32,
                None => 0,
            },
        }
    }
}

/// Parse one source line into a label definition, a statement, or nothing.
pub fn parse_line(line: &str, line_num: u32) -> Result<Line, AsmError> {
    let code = strip_comment(line);
    let (tok, rest) = take_token(code);
    let Some(tok) = tok else {
        return Ok(Line::Empty);
    };

    if let Some(name) = tok.strip_suffix(':') {
        if name.is_empty() || name.contains(':') {
            return Err(malformed("Invalid label definition", Some(tok), line_num));
        }
        if !rest.trim().is_empty() {
            return Err(malformed(
                "Label definition must be alone on its line",
                Some(name),
                line_num,
            ));
        }
        return Ok(Line::Label(name.to_string()));
    }

    let mnemonic = Mnemonic::from_token(tok)
        .ok_or_else(|| malformed("Unknown mnemonic", Some(tok), line_num))?;
    let (first_tok, rest) = take_token(rest);
    let second_txt = rest.trim();

    let statement = match mnemonic.class() {
        MnemonicClass::Plain(_) => {
            if first_tok.is_some() {
                return Err(malformed("Unexpected operand", first_tok, line_num));
            }
            Statement {
                mnemonic,
                first: None,
                second: None,
            }
        }
        MnemonicClass::Single(_) => {
            let tok = first_tok.ok_or_else(|| malformed("Missing operand", None, line_num))?;
            if !second_txt.is_empty() {
                return Err(malformed("Unexpected operand", Some(second_txt), line_num));
            }
            Statement {
                mnemonic,
                first: Some(parse_addr_operand(tok, line_num)?),
                second: None,
            }
        }
        MnemonicClass::Binary(_) => {
            let tok = first_tok.ok_or_else(|| malformed("Missing operand", None, line_num))?;
            if second_txt.is_empty() {
                return Err(malformed("Missing source operand", None, line_num));
            }
            let second = parse_value_operand(second_txt, line_num)?;
            if matches!(second, ValueOperand::Str(_)) {
                return Err(malformed(
                    "String operand is only valid with put",
                    None,
                    line_num,
                ));
            }
            Statement {
                mnemonic,
                first: Some(parse_addr_operand(tok, line_num)?),
                second: Some(second),
            }
        }
        MnemonicClass::Put => {
            let tok = first_tok.ok_or_else(|| malformed("Missing operand", None, line_num))?;
            if second_txt.is_empty() {
                return Err(malformed("Missing value operand", None, line_num));
            }
            Statement {
                mnemonic,
                first: Some(parse_addr_operand(tok, line_num)?),
                second: Some(parse_value_operand(second_txt, line_num)?),
            }
        }
    };
    Ok(Line::Statement(statement))
}

fn parse_addr_operand(tok: &str, line_num: u32) -> Result<AddrOperand, AsmError> {
    if let Some(digits) = tok.strip_prefix("0x") {
        return parse_hex(digits, tok, line_num).map(AddrOperand::Abs);
    }
    if tok.starts_with('[') {
        let inner = tok
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .ok_or_else(|| malformed("Malformed address operand", Some(tok), line_num))?;
        let digits = inner
            .strip_prefix("0x")
            .ok_or_else(|| malformed("Malformed address operand", Some(tok), line_num))?;
        return parse_hex(digits, tok, line_num).map(AddrOperand::Indirect);
    }
    // Anything else names a label; resolution happens against the table.
    Ok(AddrOperand::Label(tok.to_string()))
}

fn parse_value_operand(txt: &str, line_num: u32) -> Result<ValueOperand, AsmError> {
    if let Some(body) = txt.strip_prefix('"') {
        let body = body
            .strip_suffix('"')
            .ok_or_else(|| malformed("Unterminated string literal", Some(txt), line_num))?;
        if body.contains('"') {
            return Err(malformed(
                "String literal contains an embedded quote",
                Some(txt),
                line_num,
            ));
        }
        return Ok(ValueOperand::Str(body.to_string()));
    }
    if txt.starts_with('[') {
        let inner = txt
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .ok_or_else(|| malformed("Malformed value operand", Some(txt), line_num))?;
        let value = parse_uint(inner)
            .ok_or_else(|| malformed("Malformed value operand", Some(txt), line_num))?;
        return Ok(ValueOperand::Cell(value));
    }
    let value =
        parse_uint(txt).ok_or_else(|| malformed("Malformed value operand", Some(txt), line_num))?;
    Ok(ValueOperand::Number(value))
}

fn parse_hex(digits: &str, tok: &str, line_num: u32) -> Result<u32, AsmError> {
    u32::from_str_radix(digits, 16)
        .map_err(|_| malformed("Malformed address operand", Some(tok), line_num))
}

/// Unsigned integer with base autodetection: `0x` hex, leading `0` octal,
/// decimal otherwise.
fn parse_uint(tok: &str) -> Option<u32> {
    if let Some(digits) = tok.strip_prefix("0x").or_else(|| tok.strip_prefix("0X")) {
        return u32::from_str_radix(digits, 16).ok();
    }
    if tok.len() > 1 && tok.starts_with('0') {
        return u32::from_str_radix(&tok[1..], 8).ok();
    }
    tok.parse::<u32>().ok()
}

fn malformed(msg: &str, param: Option<&str>, line_num: u32) -> AsmError {
    AsmError::at_line(AsmErrorKind::MalformedOperand, msg, param, line_num)
}
