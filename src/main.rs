// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for tasm.

fn main() {
    if let Err(err) = tasm::assembler::run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
