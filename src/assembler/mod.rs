// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! TASM assembler - main entry point.
//!
//! Ties together line parsing, label resolution, micro-op emission, and
//! the tape machine that executes the result. The assembler runs two
//! passes: pass 1 records label addresses (emission widths are fixed per
//! lowering form, so labels lay out without emitting), pass 2 emits cells
//! into the instruction region.

pub mod cli;

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use clap::Parser;

use crate::core::error::{AsmError, AsmErrorKind, RunError};
use crate::core::machine::Machine;
use crate::core::memdump::write_memory_dumps;
use crate::core::opcode::{AddrMode, DataType, Opcode};
use crate::core::parser::{parse_line, AddrOperand, Line, MnemonicClass, Statement, ValueOperand};
use crate::core::symbol_table::{LabelTable, LabelTableResult};
use crate::core::tape::{
    Cell, Tape, DISPLAY_BASE, INSTR_BASE, INSTR_END, REG_DISP, REG_STK, STACK_START,
};

pub use cli::VERSION;

/// Run the assembler and machine with command-line arguments.
pub fn run() -> Result<(), RunError> {
    let cli = match cli::Cli::try_parse() {
        Ok(cli) => cli,
        // Usage errors exit 1 with the fixed message; --help and
        // --version print normally and exit 0.
        Err(err) if err.use_stderr() => {
            return Err(AsmError::new(
                AsmErrorKind::Cli,
                "Provide the .tasm file name in the argument",
                None,
            )
            .into());
        }
        Err(err) => {
            let _ = err.print();
            return Ok(());
        }
    };
    let config = cli::validate_cli(&cli)?;
    run_one(&config.path, config.memdump, &mut io::stdout().lock())
}

/// Assemble and execute one source file, honoring the memdump hook.
pub fn run_one<W: Write>(path: &Path, memdump: bool, out: &mut W) -> Result<(), RunError> {
    let lines = read_source_lines(path)?;

    let mut assembler = Assembler::new();
    if let Err(err) = assembler.assemble(&lines) {
        // The dump hook covers error exits that occur once the tape is
        // being populated.
        if memdump && err.kind() == AsmErrorKind::InstructionOverflow {
            let _ = write_memory_dumps(assembler.tape(), Path::new("."));
        }
        return Err(err.into());
    }

    let mut machine = assembler.into_machine();
    match machine.run(out) {
        Ok(()) => {
            if memdump {
                write_memory_dumps(machine.tape(), Path::new(".")).map_err(|_| {
                    AsmError::new(AsmErrorKind::Io, "Failed to create memory dump files", None)
                })?;
            }
            Ok(())
        }
        Err(err) => {
            if memdump {
                let _ = write_memory_dumps(machine.tape(), Path::new("."));
            }
            Err(err.into())
        }
    }
}

fn read_source_lines(path: &Path) -> Result<Vec<String>, AsmError> {
    let bytes = fs::read(path).map_err(|_| {
        AsmError::new(
            AsmErrorKind::FileNotFound,
            ".tasm file not found",
            path.to_str(),
        )
    })?;
    Ok(split_lines(&bytes))
}

/// Split raw source bytes on newlines, decoding each line lossily so
/// stray non-UTF-8 bytes cannot abort assembly.
fn split_lines(bytes: &[u8]) -> Vec<String> {
    bytes
        .split(|&b| b == b'\n')
        .map(|line| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            String::from_utf8_lossy(line).into_owned()
        })
        .collect()
}

/// Core assembler state: the label table and the tape being populated.
pub struct Assembler {
    labels: LabelTable,
    tape: Tape,
    pos: u32,
    entry: u32,
}

impl Assembler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            labels: LabelTable::new(),
            tape: Tape::new(),
            pos: INSTR_BASE,
            entry: INSTR_BASE,
        }
    }

    #[must_use]
    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    #[must_use]
    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Assemble source lines into the instruction region and initialize
    /// the register cells.
    pub fn assemble(&mut self, lines: &[String]) -> Result<(), AsmError> {
        self.pass1(lines)?;
        self.pass2(lines)?;
        self.finish()
    }

    /// Consume the assembler, producing a machine positioned at `main`.
    #[must_use]
    pub fn into_machine(self) -> Machine {
        Machine::new(self.tape, self.entry)
    }

    fn pass1(&mut self, lines: &[String]) -> Result<(), AsmError> {
        self.pos = INSTR_BASE;
        for (ix, src) in lines.iter().enumerate() {
            let line_num = ix as u32 + 1;
            match parse_line(src, line_num)? {
                Line::Empty => {}
                Line::Label(name) => {
                    self.check_room(0, line_num)?;
                    if self.labels.add(&name, self.pos) == LabelTableResult::Duplicate {
                        return Err(AsmError::at_line(
                            AsmErrorKind::DuplicateLabel,
                            "Duplicate label definitions encountered",
                            Some(&name),
                            line_num,
                        ));
                    }
                }
                Line::Statement(stmt) => {
                    let width = stmt.width();
                    self.check_room(width, line_num)?;
                    self.pos += width;
                }
            }
        }
        Ok(())
    }

    fn pass2(&mut self, lines: &[String]) -> Result<(), AsmError> {
        self.pos = INSTR_BASE;
        for (ix, src) in lines.iter().enumerate() {
            let line_num = ix as u32 + 1;
            if let Line::Statement(stmt) = parse_line(src, line_num)? {
                self.emit_statement(&stmt, line_num)?;
            }
        }
        Ok(())
    }

    /// Final HALT safety net, entry resolution, register initialization.
    fn finish(&mut self) -> Result<(), AsmError> {
        if self.pos <= INSTR_END {
            let halt = Cell {
                op: Opcode::Halt,
                ..Cell::default()
            };
            self.tape.write(self.pos, halt).map_err(|_| {
                AsmError::new(
                    AsmErrorKind::InstructionOverflow,
                    "Instruction memory limit exceeded",
                    None,
                )
            })?;
        }

        self.entry = self.labels.lookup("main").ok_or_else(|| {
            AsmError::new(AsmErrorKind::MissingMain, "Could not find \"main\"", None)
        })?;
        self.tape.set_reg(REG_DISP, DISPLAY_BASE);
        self.tape.set_reg(REG_STK, STACK_START);
        Ok(())
    }

    /// The emission cursor is checked before any non-empty line is laid
    /// out; a single statement crossing the region bound fails on its own
    /// line.
    fn check_room(&self, width: u32, line_num: u32) -> Result<(), AsmError> {
        if self.pos > INSTR_END || (width > 0 && self.pos + width - 1 > INSTR_END) {
            return Err(overflow(line_num));
        }
        Ok(())
    }

    fn emit(&mut self, cell: Cell, line_num: u32) -> Result<(), AsmError> {
        if self.pos > INSTR_END || self.tape.write(self.pos, cell).is_err() {
            return Err(overflow(line_num));
        }
        self.pos += 1;
        Ok(())
    }

    fn emit_statement(&mut self, stmt: &Statement, line_num: u32) -> Result<(), AsmError> {
        match stmt.mnemonic.class() {
            MnemonicClass::Plain(op) => self.emit(
                Cell {
                    op,
                    ..Cell::default()
                },
                line_num,
            ),
            MnemonicClass::Single(op) => {
                let (data, mode) = self.resolve_first(stmt, line_num)?;
                self.emit(
                    Cell {
                        op,
                        mode,
                        data,
                        ..Cell::default()
                    },
                    line_num,
                )
            }
            MnemonicClass::Binary(op) => {
                let (dst, mode) = self.resolve_first(stmt, line_num)?;
                // A bare number and a bracketed cell reference both name
                // the address whose datum feeds the operation.
                let src = match &stmt.second {
                    Some(ValueOperand::Number(addr) | ValueOperand::Cell(addr)) => *addr,
                    _ => return Err(missing_operand(line_num)),
                };
                self.emit(
                    Cell {
                        op: Opcode::Read,
                        data: src,
                        ..Cell::default()
                    },
                    line_num,
                )?;
                self.emit(
                    Cell {
                        op,
                        mode,
                        data: dst,
                        ..Cell::default()
                    },
                    line_num,
                )
            }
            MnemonicClass::Put => self.emit_put(stmt, line_num),
        }
    }

    fn emit_put(&mut self, stmt: &Statement, line_num: u32) -> Result<(), AsmError> {
        let (dst, mode) = self.resolve_first(stmt, line_num)?;
        match &stmt.second {
            Some(ValueOperand::Number(value)) => {
                self.emit_store(dst, mode, *value, DataType::Uint, line_num)
            }
            Some(ValueOperand::Str(s)) => {
                for (ix, byte) in s.bytes().enumerate() {
                    self.emit_store(
                        dst.wrapping_add(ix as u32),
                        mode,
                        u32::from(byte),
                        DataType::Char,
                        line_num,
                    )?;
                }
                Ok(())
            }
            Some(ValueOperand::Cell(src)) => {
                self.emit(
                    Cell {
                        op: Opcode::Read,
                        data: *src,
                        ..Cell::default()
                    },
                    line_num,
                )?;
                self.emit(
                    Cell {
                        op: Opcode::Write,
                        mode,
                        data: dst,
                        ..Cell::default()
                    },
                    line_num,
                )
            }
            None => Err(missing_operand(line_num)),
        }
    }

    /// The literal rides in an inert NONE cell so the READ/WRITE pair
    /// preserves its dtype.
    fn emit_store(
        &mut self,
        dst: u32,
        mode: AddrMode,
        value: u32,
        dtype: DataType,
        line_num: u32,
    ) -> Result<(), AsmError> {
        let literal_at = self.pos;
        self.emit(
            Cell {
                op: Opcode::None,
                data: value,
                dtype,
                ..Cell::default()
            },
            line_num,
        )?;
        self.emit(
            Cell {
                op: Opcode::Read,
                data: literal_at,
                ..Cell::default()
            },
            line_num,
        )?;
        self.emit(
            Cell {
                op: Opcode::Write,
                mode,
                data: dst,
                ..Cell::default()
            },
            line_num,
        )
    }

    fn resolve_first(
        &self,
        stmt: &Statement,
        line_num: u32,
    ) -> Result<(u32, AddrMode), AsmError> {
        match &stmt.first {
            Some(AddrOperand::Abs(addr)) => Ok((*addr, AddrMode::Direct)),
            Some(AddrOperand::Indirect(addr)) => Ok((*addr, AddrMode::Indirect)),
            Some(AddrOperand::Label(name)) => match self.labels.lookup(name) {
                Some(addr) => Ok((addr, AddrMode::Direct)),
                None => Err(AsmError::at_line(
                    AsmErrorKind::UndefinedLabel,
                    "Undefined label encountered",
                    Some(name),
                    line_num,
                )),
            },
            None => Err(missing_operand(line_num)),
        }
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

fn overflow(line_num: u32) -> AsmError {
    AsmError::at_line(
        AsmErrorKind::InstructionOverflow,
        "Memory overflow occurred. Instruction memory limit exceeded",
        None,
        line_num,
    )
}

fn missing_operand(line_num: u32) -> AsmError {
    AsmError::at_line(AsmErrorKind::MalformedOperand, "Missing operand", None, line_num)
}
