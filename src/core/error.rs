// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Error types for the assembly and execution stages.

use std::fmt;

/// Categories of assembly-stage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsmErrorKind {
    Cli,
    Io,
    FileNotFound,
    DuplicateLabel,
    UndefinedLabel,
    MissingMain,
    MalformedOperand,
    InstructionOverflow,
}

/// An assembly error with a kind, message, and the offending source line.
#[derive(Debug, Clone)]
pub struct AsmError {
    kind: AsmErrorKind,
    message: String,
    line: Option<u32>,
}

impl AsmError {
    pub fn new(kind: AsmErrorKind, msg: &str, param: Option<&str>) -> Self {
        Self {
            kind,
            message: format_error(msg, param),
            line: None,
        }
    }

    pub fn at_line(kind: AsmErrorKind, msg: &str, param: Option<&str>, line: u32) -> Self {
        Self {
            kind,
            message: format_error(msg, param),
            line: Some(line),
        }
    }

    pub fn kind(&self) -> AsmErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} [Line {}]", self.message, line),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for AsmError {}

/// Categories of runtime errors raised by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    OutOfBounds,
    InvalidInstruction,
    StackOverflow,
    StackUnderflow,
    ArithmeticError,
}

/// A runtime error citing the offending tape address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeError {
    kind: RuntimeErrorKind,
    addr: u32,
}

impl RuntimeError {
    #[must_use]
    pub fn new(kind: RuntimeErrorKind, addr: u32) -> Self {
        Self { kind, addr }
    }

    #[must_use]
    pub fn out_of_bounds(addr: u32) -> Self {
        Self::new(RuntimeErrorKind::OutOfBounds, addr)
    }

    pub fn kind(&self) -> RuntimeErrorKind {
        self.kind
    }

    pub fn addr(&self) -> u32 {
        self.addr
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RuntimeErrorKind::OutOfBounds => write!(
                f,
                "Memory out of bounds. Address {:#x} [{}] does not exist",
                self.addr, self.addr
            ),
            RuntimeErrorKind::InvalidInstruction => {
                write!(f, "Invalid instruction at {:#x}", self.addr)
            }
            RuntimeErrorKind::StackOverflow => write!(
                f,
                "Stack overflow occurred at {:#x}. Execution terminated.",
                self.addr
            ),
            RuntimeErrorKind::StackUnderflow => write!(
                f,
                "Stack underflow occurred at {:#x}. Execution terminated.",
                self.addr
            ),
            RuntimeErrorKind::ArithmeticError => {
                write!(f, "Division by zero at {:#x}", self.addr)
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Top-level error of one `tasm` invocation. `Display` carries the fixed
/// stderr prefix of the stage that failed.
#[derive(Debug)]
pub enum RunError {
    Assembly(AsmError),
    Runtime(RuntimeError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assembly(err) => write!(f, "ERROR: {err}"),
            Self::Runtime(err) => write!(f, "RUNTIME ERROR: {err}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Assembly(err) => Some(err),
            Self::Runtime(err) => Some(err),
        }
    }
}

impl From<AsmError> for RunError {
    fn from(err: AsmError) -> Self {
        Self::Assembly(err)
    }
}

impl From<RuntimeError> for RunError {
    fn from(err: RuntimeError) -> Self {
        Self::Runtime(err)
    }
}

/// Format an error message with an optional parameter.
pub fn format_error(msg: &str, param: Option<&str>) -> String {
    match param {
        Some(p) => format!("{msg}: {p}"),
        None => msg.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asm_error_cites_the_source_line() {
        let err = AsmError::at_line(AsmErrorKind::DuplicateLabel, "Duplicate label", Some("x"), 7);
        assert_eq!(err.to_string(), "Duplicate label: x [Line 7]");
        assert_eq!(err.kind(), AsmErrorKind::DuplicateLabel);
        assert_eq!(err.line(), Some(7));
    }

    #[test]
    fn runtime_error_cites_the_address_in_hex() {
        let err = RuntimeError::out_of_bounds(0x4a38f);
        assert_eq!(
            err.to_string(),
            "Memory out of bounds. Address 0x4a38f [304015] does not exist"
        );
    }

    #[test]
    fn run_error_prefixes_by_stage() {
        let asm: RunError = AsmError::new(AsmErrorKind::MissingMain, "Could not find \"main\"", None).into();
        assert!(asm.to_string().starts_with("ERROR: "));
        let rt: RunError = RuntimeError::new(RuntimeErrorKind::ArithmeticError, 0x10).into();
        assert!(rt.to_string().starts_with("RUNTIME ERROR: "));
    }
}
