// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Memory dump files written on exit when -memdump is passed.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::core::tape::{Tape, DISPLAY_BASE, DISPLAY_END, INSTR_BASE, INSTR_END, MEM_END};

pub const STORE_DUMP_NAME: &str = "__STORE_DUMP.tasm.txt";
pub const DISPLAY_DUMP_NAME: &str = "__DISPLAY_DUMP.tasm.txt";
pub const INSTRUCTION_DUMP_NAME: &str = "__INSTRUCTION_DUMP.tasm.txt";

/// Write the three region dump files into `dir`, one line per cell.
pub fn write_memory_dumps(tape: &Tape, dir: &Path) -> io::Result<()> {
    dump_region(tape, &dir.join(STORE_DUMP_NAME), "_MEM", 0, MEM_END)?;
    dump_region(
        tape,
        &dir.join(DISPLAY_DUMP_NAME),
        "_OUT",
        DISPLAY_BASE,
        DISPLAY_END,
    )?;
    dump_region(
        tape,
        &dir.join(INSTRUCTION_DUMP_NAME),
        "_MAIN",
        INSTR_BASE,
        INSTR_END,
    )?;
    Ok(())
}

fn dump_region(tape: &Tape, path: &Path, tag: &str, base: u32, end: u32) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    let cells = &tape.cells()[base as usize..=end as usize];
    for (offset, cell) in cells.iter().enumerate() {
        writeln!(
            out,
            "0x{:08x} [{} + {:010}] \t0x{:08x}  0x{:08x}  {}",
            base as usize + offset,
            tag,
            offset,
            cell.op.code(),
            cell.data,
            cell.dtype.code()
        )?;
    }
    out.flush()
}
