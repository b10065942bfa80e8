//! End-to-end console tests over synthesized NROM images.

mod common;

use common::{console_with_program, ines_header, nrom_with_program, run_until_done};
use ferrite_core::{
    Console, ConsoleConfig,
    controller::Button,
    error::Error,
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

#[test]
fn sei_jmp_loop_parks_the_cpu() {
    // SEI; loop: JMP loop
    let mut console = console_with_program(&[0x78, 0x4C, 0x01, 0x80]);

    console.step_instruction().expect("sei");
    console.step_instruction().expect("jmp");
    assert_eq!(console.cpu_pc(), 0x8001);

    for _ in 0..16 {
        console.step_instruction().expect("loop");
        assert_eq!(console.cpu_pc(), 0x8001);
    }
}

#[test]
fn chr_ram_header_allocates_writable_chr() {
    let image = nrom_with_program(&[0x78, 0x4C, 0x01, 0x80], 0);
    let mut cartridge = ferrite_core::cartridge::load_cartridge(&image).expect("load");

    assert!(cartridge.header().uses_chr_ram);
    assert_eq!(cartridge.chr_len(), 8 * 1024);
    cartridge.write_chr(0x1000, 0x5A).expect("CHR RAM write");
    assert_eq!(cartridge.read_chr(0x1000), 0x5A);
}

#[test]
fn chr_rom_header_rejects_chr_writes() {
    let image = nrom_with_program(&[0x78, 0x4C, 0x01, 0x80], 1);
    let mut cartridge = ferrite_core::cartridge::load_cartridge(&image).expect("load");

    assert!(!cartridge.header().uses_chr_ram);
    let err = cartridge.write_chr(0x1000, 0x5A).expect_err("CHR ROM write");
    assert!(matches!(err, Error::ReadOnlyMemory { .. }));
}

#[test]
fn bad_magic_fails_with_invalid_format() {
    let mut image = nrom_with_program(&[0x78], 0);
    image[0] = b'X';

    let mut console = Console::new(ConsoleConfig::default());
    let err = console.load_cartridge(&image).expect_err("bad magic");
    assert!(matches!(err, Error::InvalidFormat));
    assert!(console.cartridge().is_none());
}

#[test]
fn unknown_mapper_fails_before_stepping() {
    // Mapper 90 (flags6 high nibble = 0xA, flags7 high nibble = 0x5).
    let mut image = ines_header(1, 0, 0xA0, 0x50);
    image.extend(vec![0u8; common::PRG_BANK]);

    let mut console = Console::new(ConsoleConfig::default());
    let err = console.load_cartridge(&image).expect_err("mapper 90");
    assert!(matches!(err, Error::UnsupportedMapper { mapper: 90 }));
}

#[test]
fn jam_opcode_surfaces_illegal_opcode() {
    let mut console = console_with_program(&[0x02]);
    let err = console.step_instruction().expect_err("jam");
    assert!(matches!(err, Error::IllegalOpcode { opcode: 0x02, .. }));
}

#[test]
fn oam_dma_stalls_for_513_or_514_cycles() {
    // LDA #$02; STA $4014; then NOPs.
    let mut console = console_with_program(&[0xA9, 0x02, 0x8D, 0x14, 0x40, 0xEA, 0xEA]);

    console.step_instruction().expect("lda");
    console.step_instruction().expect("sta + dma");

    // The stall drains one cycle per step.
    let mut stall_steps = 0;
    loop {
        let cycles = console.step_instruction().expect("stall/next");
        if cycles == 1 {
            stall_steps += 1;
        } else {
            break;
        }
    }
    assert!(
        stall_steps == 513 || stall_steps == 514,
        "unexpected stall length {stall_steps}"
    );
}

#[test]
fn controller_bits_shift_out_in_hardware_order() {
    // Strobe the pads, then serially read eight bits into $10-$17:
    //   LDA #$01; STA $4016; LDA #$00; STA $4016
    //   LDX #$00
    // read: LDA $4016; AND #$01; STA $10,X; INX; CPX #$08; BNE read
    //   LDA #$01; STA $00FF  (done marker)
    let program = [
        0xA9, 0x01, 0x8D, 0x16, 0x40, // LDA #$01; STA $4016
        0xA9, 0x00, 0x8D, 0x16, 0x40, // LDA #$00; STA $4016
        0xA2, 0x00, // LDX #$00
        0xAD, 0x16, 0x40, // read: LDA $4016
        0x29, 0x01, // AND #$01
        0x95, 0x10, // STA $10,X
        0xE8, // INX
        0xE0, 0x08, // CPX #$08
        0xD0, 0xF4, // BNE read
        0xA9, 0x01, 0x85, 0xFF, // LDA #$01; STA $FF
        0x4C, 0x1C, 0x80, // parked loop
    ];
    let mut console = console_with_program(&program);
    console.set_button(0, Button::A, true);
    console.set_button(0, Button::Select, true);
    console.set_button(0, Button::Down, true);

    run_until_done(&mut console, 0x00FF, 500);

    let mut bits = [0u8; 8];
    console.peek_cpu_slice(0x0010, &mut bits).expect("peek");
    // A, B, Select, Start, Up, Down, Left, Right.
    assert_eq!(bits, [1, 0, 1, 0, 0, 1, 0, 0]);
}

#[test]
fn palette_mirror_slots_alias_through_2007() {
    // Write $2A to $3F10 via $2006/$2007, read $3F00 back into $20.
    //   LDA #$3F; STA $2006; LDA #$10; STA $2006; LDA #$2A; STA $2007
    //   LDA #$3F; STA $2006; LDA #$00; STA $2006; LDA $2007; STA $20
    //   LDA #$01; STA $FF
    let program = [
        0xA9, 0x3F, 0x8D, 0x06, 0x20, // LDA #$3F; STA $2006
        0xA9, 0x10, 0x8D, 0x06, 0x20, // LDA #$10; STA $2006
        0xA9, 0x2A, 0x8D, 0x07, 0x20, // LDA #$2A; STA $2007
        0xA9, 0x3F, 0x8D, 0x06, 0x20, // LDA #$3F; STA $2006
        0xA9, 0x00, 0x8D, 0x06, 0x20, // LDA #$00; STA $2006
        0xAD, 0x07, 0x20, // LDA $2007 (palette reads bypass the buffer)
        0x85, 0x20, // STA $20
        0xA9, 0x01, 0x85, 0xFF, // done marker
        0x4C, 0x22, 0x80, // parked loop
    ];
    let mut console = console_with_program(&program);
    run_until_done(&mut console, 0x00FF, 200);

    assert_eq!(console.peek_cpu_byte(0x0020).expect("peek"), 0x2A);
}

#[test]
fn run_frame_invokes_the_draw_callback_once() {
    let mut console = console_with_program(&[0x78, 0x4C, 0x01, 0x80]);

    let frames = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&frames);
    console.set_draw_callback(Box::new(move |frame| {
        assert_eq!(frame.len(), ferrite_core::FRAME_SIZE);
        counter.fetch_add(1, Ordering::Relaxed);
    }));

    console.run_frame().expect("frame 1");
    assert_eq!(frames.load(Ordering::Relaxed), 1);
    assert_eq!(console.frame_count(), 1);

    console.run_frame().expect("frame 2");
    assert_eq!(frames.load(Ordering::Relaxed), 2);
    assert_eq!(console.frame_count(), 2);
}

#[test]
fn run_frame_without_cartridge_is_an_error() {
    let mut console = Console::new(ConsoleConfig::default());
    assert!(matches!(
        console.run_frame().expect_err("no cartridge"),
        Error::NoCartridge
    ));
}

#[test]
fn ram_mirrors_repeat_every_2k() {
    // LDA #$AB; STA $0005; LDA #$01; STA $FF
    let program = [0xA9, 0xAB, 0x85, 0x05, 0xA9, 0x01, 0x85, 0xFF, 0x4C, 0x08, 0x80];
    let mut console = console_with_program(&program);
    run_until_done(&mut console, 0x00FF, 50);

    for mirror in [0x0005u16, 0x0805, 0x1005, 0x1805] {
        assert_eq!(console.peek_cpu_byte(mirror).expect("peek"), 0xAB);
    }
}
