// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Property tests for the machine invariants: flag outcomes, round-trips,
//! stack balance, and display-cursor movement.

use proptest::prelude::*;

use tasm::assembler::Assembler;
use tasm::machine::Machine;
use tasm::tape::{DISPLAY_BASE, INSTR_BASE, INSTR_END, STACK_START};

fn run_source(src: &str) -> Machine {
    let lines: Vec<String> = src.lines().map(|s| s.to_string()).collect();
    let mut assembler = Assembler::new();
    assembler.assemble(&lines).expect("assembly should succeed");
    let mut machine = assembler.into_machine();
    let mut out = Vec::new();
    machine.run(&mut out).expect("execution should halt");
    machine
}

// Literals are capped at the top tape address: the executor rejects any
// cell whose datum lies past it before dispatch.
const MAX_LITERAL: u32 = INSTR_END;

proptest! {
    #[test]
    fn assembled_programs_start_at_main(pad in 0u32..8) {
        let mut src = String::new();
        for _ in 0..pad {
            src.push_str("hlt\n");
        }
        src.push_str("main:\nhlt\n");
        let lines: Vec<String> = src.lines().map(|s| s.to_string()).collect();
        let mut assembler = Assembler::new();
        assembler.assemble(&lines).expect("assembly should succeed");
        let machine = assembler.into_machine();
        prop_assert_eq!(machine.cursor().pos, INSTR_BASE + pad);
        prop_assert_eq!(machine.disp(), DISPLAY_BASE);
        prop_assert_eq!(machine.stk(), STACK_START);
    }

    #[test]
    fn cmp_orders_values(x in 0u32..=MAX_LITERAL, y in 0u32..=MAX_LITERAL) {
        let src = format!(
            "main:\nput 0x10 {x}\nput 0x11 {y}\ncmp 0x10 0x11\nhlt\n"
        );
        let machine = run_source(&src);
        let expected = if x == y {
            (1, 0)
        } else if x < y {
            (0, 1)
        } else {
            (0, 0)
        };
        prop_assert_eq!((machine.zf(), machine.cf()), expected);
    }

    #[test]
    fn put_then_mov_round_trips(v in 0u32..=MAX_LITERAL) {
        let src = format!("main:\nput 0x20 {v}\nmov 0x21 0x20\nhlt\n");
        let machine = run_source(&src);
        let a = machine.tape().read(0x20).unwrap();
        let b = machine.tape().read(0x21).unwrap();
        prop_assert_eq!(b.data, v);
        prop_assert_eq!(a.data, b.data);
        prop_assert_eq!(a.dtype, b.dtype);
    }

    #[test]
    fn balanced_calls_restore_the_stack(depth in 1u32..=8, repeats in 1u32..=4) {
        let mut src = String::from("main:\n");
        for _ in 0..repeats {
            src.push_str("call sub1\n");
        }
        src.push_str("hlt\n");
        for level in 1..=depth {
            src.push_str(&format!("sub{level}:\n"));
            if level < depth {
                src.push_str(&format!("call sub{}\n", level + 1));
            }
            src.push_str("ret\n");
        }
        let machine = run_source(&src);
        prop_assert_eq!(machine.stk(), STACK_START);
    }

    #[test]
    fn display_writes_advance_disp_to_one_past(len in 1usize..=24) {
        let text: String = std::iter::repeat('a').take(len).collect();
        let src = format!("main:\nput 0x18a88 \"{text}\"\nhlt\n");
        let machine = run_source(&src);
        prop_assert_eq!(machine.disp(), DISPLAY_BASE + len as u32);
    }

    #[test]
    fn storage_writes_leave_disp_alone(addr in 0x10u32..0x1000) {
        let src = format!("main:\nput 0x{addr:x} 1\nhlt\n");
        let machine = run_source(&src);
        prop_assert_eq!(machine.disp(), DISPLAY_BASE);
    }

    #[test]
    fn add_matches_wrapping_arithmetic(x in 0u32..=MAX_LITERAL, y in 0u32..=MAX_LITERAL) {
        let src = format!(
            "main:\nput 0x10 {x}\nput 0x11 {y}\nadd 0x10 [0x11]\nhlt\n"
        );
        let machine = run_source(&src);
        prop_assert_eq!(machine.tape().data(0x10).unwrap(), x.wrapping_add(y));
    }
}
