//! Save-state bundle tests: bit-identical capture and restore.

mod common;

use common::{console_with_program, ines_header};
use ferrite_core::{Console, ConsoleConfig, SaveState, error::Error};

#[test]
fn save_then_load_without_stepping_is_bit_identical() {
    let mut console = console_with_program(&[0x78, 0x4C, 0x01, 0x80]);
    // Accumulate some non-trivial state first.
    for _ in 0..500 {
        console.step_instruction().expect("step");
    }

    let first = console.save().expect("save");
    console.load(&first).expect("load");
    let second = console.save().expect("save again");

    assert_eq!(first, second);
}

#[test]
fn restore_rewinds_execution_exactly() {
    // A counter loop: INC $40; JMP back.
    let mut console = console_with_program(&[0xE6, 0x40, 0x4C, 0x00, 0x80]);
    for _ in 0..100 {
        console.step_instruction().expect("step");
    }
    let snapshot = console.save().expect("save");
    let counter_at_save = console.peek_cpu_byte(0x40).expect("peek");

    // Diverge, then rewind.
    for _ in 0..300 {
        console.step_instruction().expect("step");
    }
    assert_ne!(console.peek_cpu_byte(0x40).expect("peek"), counter_at_save);

    console.load(&snapshot).expect("load");
    assert_eq!(console.peek_cpu_byte(0x40).expect("peek"), counter_at_save);
    assert_eq!(console.save().expect("resave"), snapshot);
}

#[test]
fn mmc1_shift_register_survives_the_round_trip() {
    // MMC1 image: two writes feed the serial shift register, then the
    // program parks. The half-loaded register must survive a save/load.
    let mut prg = vec![0u8; 2 * common::PRG_BANK];
    let program: [u8; 13] = [
        0xA9, 0x01, // LDA #$01
        0x8D, 0x00, 0xA0, // STA $A000 (bit 0 of a CHR register value)
        0xA9, 0x00, // LDA #$00
        0x8D, 0x00, 0xA0, // STA $A000 (second bit)
        0x4C, 0x0A, 0x80, // parked loop
    ];
    prg[..program.len()].copy_from_slice(&program);
    // Reset vector in the fixed last bank.
    prg[2 * common::PRG_BANK - 4] = 0x00;
    prg[2 * common::PRG_BANK - 3] = 0x80;
    let mut image = ines_header(2, 0, 0x10, 0);
    image.extend(prg);

    let mut console = Console::new(ConsoleConfig::default());
    console.load_cartridge(&image).expect("load MMC1 image");
    for _ in 0..6 {
        console.step_instruction().expect("step");
    }

    let snapshot = console.save().expect("save");
    console.load(&snapshot).expect("load");
    assert_eq!(console.save().expect("resave"), snapshot);
}

#[test]
fn snapshot_rejects_a_different_cartridge() {
    let mut console = console_with_program(&[0x78, 0x4C, 0x01, 0x80]);
    let snapshot = console.save().expect("save");

    // Same program, different PRG contents -> different CRC.
    let mut other = common::nrom_with_program(&[0x78, 0x4C, 0x01, 0x80], 0);
    let len = other.len();
    other[len - 1] = 0x77;
    console.load_cartridge(&other).expect("swap cartridge");

    let err = console.load(&snapshot).expect_err("mismatched state");
    assert!(matches!(err, Error::StateMismatch));
}

#[test]
fn save_without_cartridge_is_an_error() {
    let console = Console::new(ConsoleConfig::default());
    assert!(matches!(
        console.save().expect_err("no cartridge"),
        Error::NoCartridge
    ));
}
