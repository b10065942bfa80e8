#![allow(dead_code)]

//! Helpers that synthesize iNES images in memory for end-to-end tests.

use ferrite_core::{Console, ConsoleConfig};

pub const PRG_BANK: usize = 16 * 1024;
pub const CHR_BANK: usize = 8 * 1024;

/// Builds an iNES header.
pub fn ines_header(prg_banks: u8, chr_banks: u8, flags6: u8, flags7: u8) -> Vec<u8> {
    vec![
        b'N', b'E', b'S', 0x1A, prg_banks, chr_banks, flags6, flags7, 0, 0, 0, 0, 0, 0, 0, 0,
    ]
}

/// Builds a single-bank NROM image whose reset vector points at `$8000`,
/// with `program` copied there.
pub fn nrom_with_program(program: &[u8], chr_banks: u8) -> Vec<u8> {
    let mut prg = vec![0u8; PRG_BANK];
    prg[..program.len()].copy_from_slice(program);
    // Reset vector: $8000 (PRG offset $3FFC mirrors to $FFFC).
    prg[0x3FFC] = 0x00;
    prg[0x3FFD] = 0x80;

    let mut rom = ines_header(1, chr_banks, 0, 0);
    rom.extend(prg);
    rom.extend(vec![0u8; chr_banks as usize * CHR_BANK]);
    rom
}

/// Loads `program` into a fresh console, reset and ready to step.
pub fn console_with_program(program: &[u8]) -> Console {
    let mut console = Console::new(ConsoleConfig::default());
    console
        .load_cartridge(&nrom_with_program(program, 0))
        .expect("load test cartridge");
    console
}

/// Steps until the program writes a non-zero byte to `done_addr` or the
/// instruction budget runs out.
pub fn run_until_done(console: &mut Console, done_addr: u16, max_instructions: usize) {
    for _ in 0..max_instructions {
        console.step_instruction().expect("step");
        if console.peek_cpu_byte(done_addr).expect("peek") != 0 {
            return;
        }
    }
    panic!("program did not finish within {max_instructions} instructions");
}
