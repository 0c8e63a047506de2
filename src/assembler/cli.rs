// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and argument validation.

use std::path::PathBuf;

use clap::Parser;

use crate::core::error::{AsmError, AsmErrorKind};

pub const VERSION: &str = "1.0";

const LONG_ABOUT: &str = "TASM assembler and tape machine.

Assembles the given .tasm source into micro-ops, then executes them and
prints the display buffer on each `out` instruction. With -memdump, the
__STORE_DUMP/__DISPLAY_DUMP/__INSTRUCTION_DUMP files are written to the
current directory on exit.";

#[derive(Parser, Debug)]
#[command(
    name = "tasm",
    version = VERSION,
    about = "TASM assembler and tape machine",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    /// Path to the .tasm source file.
    pub path: PathBuf,
    /// Optional trailing option; only `-memdump` is recognized.
    #[arg(allow_hyphen_values = true)]
    pub option: Option<String>,
}

/// Validated CLI configuration.
#[derive(Debug)]
pub struct CliConfig {
    pub path: PathBuf,
    pub memdump: bool,
}

/// Validate CLI arguments and return parsed configuration.
pub fn validate_cli(cli: &Cli) -> Result<CliConfig, AsmError> {
    if cli.path.extension().and_then(|ext| ext.to_str()) != Some("tasm") {
        return Err(AsmError::new(
            AsmErrorKind::Cli,
            "Provide the .tasm file name in the argument",
            None,
        ));
    }
    let memdump = match cli.option.as_deref() {
        None => false,
        Some("-memdump") => true,
        Some(other) => {
            return Err(AsmError::new(AsmErrorKind::Cli, "Unknown option", Some(other)));
        }
    };
    Ok(CliConfig {
        path: cli.path.clone(),
        memdump,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cli_parses_path_and_memdump() {
        let cli = Cli::parse_from(["tasm", "prog.tasm", "-memdump"]);
        assert_eq!(cli.path, PathBuf::from("prog.tasm"));
        assert_eq!(cli.option.as_deref(), Some("-memdump"));
        let config = validate_cli(&cli).expect("valid arguments");
        assert!(config.memdump);
    }

    #[test]
    fn memdump_defaults_off() {
        let cli = Cli::parse_from(["tasm", "prog.tasm"]);
        let config = validate_cli(&cli).expect("valid arguments");
        assert!(!config.memdump);
    }

    #[test]
    fn rejects_wrong_extension() {
        let cli = Cli::parse_from(["tasm", "prog.asm"]);
        let err = validate_cli(&cli).unwrap_err();
        assert_eq!(err.kind(), AsmErrorKind::Cli);
        assert_eq!(err.to_string(), "Provide the .tasm file name in the argument");
    }

    #[test]
    fn rejects_extension_only_names() {
        let cli = Cli::parse_from(["tasm", ".tasm"]);
        assert!(validate_cli(&cli).is_err());
    }

    #[test]
    fn rejects_unknown_options() {
        let cli = Cli::parse_from(["tasm", "prog.tasm", "-trace"]);
        let err = validate_cli(&cli).unwrap_err();
        assert_eq!(err.to_string(), "Unknown option: -trace");
    }
}
