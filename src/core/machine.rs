// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The tape machine: a fetch-execute loop over micro-op cells.
//!
//! The executor resolves indirect operands at dispatch time; the
//! instruction region is never rewritten while running.

use std::io::Write;

use crate::core::error::{RuntimeError, RuntimeErrorKind};
use crate::core::opcode::{AddrMode, DataType, Opcode};
use crate::core::tape::{
    Tape, DISPLAY_BASE, DISPLAY_END, INSTR_END, REG_CF, REG_DISP, REG_STK, REG_ZF, STACK_END,
    STACK_START,
};

/// Execution cursor: the current tape address plus the scratch
/// accumulator carried between `READ` and its consumer micro-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor {
    pub pos: u32,
    pub data: u32,
    pub dtype: DataType,
}

/// The executor. Owns the populated tape and runs until HALT or error.
pub struct Machine {
    tape: Tape,
    cursor: Cursor,
    halted: bool,
}

impl Machine {
    #[must_use]
    pub fn new(tape: Tape, entry: u32) -> Self {
        Self {
            tape,
            cursor: Cursor {
                pos: entry,
                ..Cursor::default()
            },
            halted: false,
        }
    }

    #[must_use]
    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    #[must_use]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    #[must_use]
    pub fn halted(&self) -> bool {
        self.halted
    }

    pub fn disp(&self) -> u32 {
        self.tape.reg(REG_DISP)
    }

    pub fn stk(&self) -> u32 {
        self.tape.reg(REG_STK)
    }

    pub fn zf(&self) -> u32 {
        self.tape.reg(REG_ZF)
    }

    pub fn cf(&self) -> u32 {
        self.tape.reg(REG_CF)
    }

    /// Run micro-ops until the halt signal is set. Display flushes go to
    /// `out`.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<(), RuntimeError> {
        while !self.halted {
            self.step(out)?;
        }
        Ok(())
    }

    /// Execute a single micro-op.
    pub fn step<W: Write>(&mut self, out: &mut W) -> Result<(), RuntimeError> {
        let pos = self.cursor.pos;
        if pos > INSTR_END {
            return Err(RuntimeError::out_of_bounds(pos));
        }
        let cell = self.tape.read(pos)?;

        // The operand check applies uniformly before dispatch, to the raw
        // datum of every cell the cursor crosses.
        let raw = cell.data;
        if raw > INSTR_END {
            return Err(RuntimeError::out_of_bounds(raw));
        }
        let addr = match cell.mode {
            AddrMode::Direct => raw,
            AddrMode::Indirect => {
                let resolved = self.tape.data(raw)?;
                if resolved > INSTR_END {
                    return Err(RuntimeError::out_of_bounds(resolved));
                }
                resolved
            }
        };

        let (zf, cf) = (self.zf(), self.cf());
        match cell.op {
            Opcode::None => self.cursor.pos += 1,
            Opcode::Halt => self.halted = true,
            Opcode::Jump => self.cursor.pos = addr,
            Opcode::Je => self.branch(addr, zf == 1),
            Opcode::Jne => self.branch(addr, zf == 0),
            Opcode::Jg => self.branch(addr, zf == 0 && cf == 0),
            Opcode::Jge => self.branch(addr, cf == 0),
            Opcode::Jl => self.branch(addr, cf == 1),
            Opcode::Jle => self.branch(addr, zf == 1 || cf == 1),
            Opcode::Read => {
                let src = self.tape.read(addr)?;
                self.cursor.data = src.data;
                self.cursor.dtype = src.dtype;
                self.cursor.pos += 1;
            }
            Opcode::Write => {
                let mut dst = self.tape.read(addr)?;
                dst.data = self.cursor.data;
                dst.dtype = self.cursor.dtype;
                self.tape.write(addr, dst)?;
                if addr >= self.disp() && addr <= DISPLAY_END {
                    self.tape.set_reg(REG_DISP, addr + 1);
                }
                self.cursor.pos += 1;
            }
            Opcode::Cmp => {
                let val = self.tape.data(addr)?;
                self.tape.set_reg(REG_ZF, u32::from(val == self.cursor.data));
                self.tape.set_reg(REG_CF, u32::from(val < self.cursor.data));
                self.cursor.pos += 1;
            }
            Opcode::And => self.modify(addr, |v, s| v & s)?,
            Opcode::Or => self.modify(addr, |v, s| v | s)?,
            Opcode::Xor => self.modify(addr, |v, s| v ^ s)?,
            // Logical not, not a bitwise complement: 0 becomes 1,
            // anything else becomes 0.
            Opcode::Not => self.modify(addr, |v, _| u32::from(v == 0))?,
            Opcode::Lshift => self.modify(addr, |v, s| v.checked_shl(s).unwrap_or(0))?,
            Opcode::Rshift => self.modify(addr, |v, s| v.checked_shr(s).unwrap_or(0))?,
            Opcode::Add => self.modify(addr, u32::wrapping_add)?,
            Opcode::Sub => self.modify(addr, u32::wrapping_sub)?,
            Opcode::Mul => self.modify(addr, u32::wrapping_mul)?,
            Opcode::Div => {
                if self.cursor.data == 0 {
                    return Err(RuntimeError::new(RuntimeErrorKind::ArithmeticError, pos));
                }
                self.modify(addr, |v, s| v / s)?;
            }
            Opcode::Call => {
                let stk = self.stk();
                if stk < STACK_END {
                    return Err(RuntimeError::new(RuntimeErrorKind::StackOverflow, pos));
                }
                self.tape.set_data(stk, pos + 1)?;
                self.tape.set_reg(REG_STK, stk - 1);
                self.cursor.pos = addr;
            }
            Opcode::Ret => {
                let stk = self.stk();
                if stk >= STACK_START {
                    return Err(RuntimeError::new(RuntimeErrorKind::StackUnderflow, pos));
                }
                self.tape.set_reg(REG_STK, stk + 1);
                self.cursor.pos = self.tape.data(stk + 1)?;
            }
            Opcode::Out => {
                self.flush_display(out)?;
                self.cursor.pos += 1;
            }
        }
        Ok(())
    }

    fn branch(&mut self, target: u32, taken: bool) {
        self.cursor.pos = if taken { target } else { self.cursor.pos + 1 };
    }

    fn modify<F: Fn(u32, u32) -> u32>(&mut self, addr: u32, f: F) -> Result<(), RuntimeError> {
        let val = self.tape.data(addr)?;
        self.tape.set_data(addr, f(val, self.cursor.data))?;
        self.cursor.pos += 1;
        Ok(())
    }

    /// Emit the display buffer up to DISP. Non-destructive: cells remain
    /// and DISP is untouched, so a repeated OUT re-emits everything.
    /// Sink errors do not abort execution.
    fn flush_display<W: Write>(&mut self, out: &mut W) -> Result<(), RuntimeError> {
        let disp = self.disp();
        let mut pos = DISPLAY_BASE;
        let mut escaped = false;
        while pos < DISPLAY_END && pos < disp {
            let cell = self.tape.read(pos)?;
            if escaped {
                if cell.data == u32::from(b'n') {
                    let _ = out.write_all(b"\n");
                } else if cell.data == u32::from(b'r') {
                    let _ = out.write_all(b"\r");
                }
                escaped = false;
                pos += 1;
                continue;
            }
            if cell.dtype == DataType::Char {
                if cell.data == u32::from(b'\\') {
                    escaped = true;
                    pos += 1;
                    continue;
                }
                let _ = out.write_all(&[(cell.data & 0xff) as u8]);
            } else {
                let _ = write!(out, "{}", cell.data);
            }
            pos += 1;
        }
        Ok(())
    }
}
