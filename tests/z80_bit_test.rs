use spectrum48_core::cpu::z80::Flag;
use spectrum48_core::prelude::*;
mod common;
use common::{TestIo, TestMemory};

#[test]
fn bit_instruction_sets_zero_flag_when_clear() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.b = 0x00;
    mem.load(0, &[0xCB, 0x40]); // BIT 0,B

    let tstates = cpu.step(&mut mem, &mut io);
    assert_eq!(tstates, 8);
    assert!((cpu.f & Flag::Z as u8) != 0);
    assert!((cpu.f & Flag::H as u8) != 0);
}

#[test]
fn set_and_res_toggle_individual_bits() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.b = 0x00;
    mem.load(0, &[0xCB, 0xC0]); // SET 0,B
    cpu.step(&mut mem, &mut io);
    assert_eq!(cpu.b, 0x01);

    mem.load(2, &[0xCB, 0x80]); // RES 0,B
    cpu.step(&mut mem, &mut io);
    assert_eq!(cpu.b, 0x00);
}

#[test]
fn rlc_r_rotates_through_carry() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.b = 0x80;
    mem.load(0, &[0xCB, 0x00]); // RLC B

    cpu.step(&mut mem, &mut io);
    assert_eq!(cpu.b, 0x01);
    assert!((cpu.f & Flag::C as u8) != 0);
}

#[test]
fn bit_hl_indirect_costs_12_tstates() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.set_hl(0x8000);
    mem.write(0x8000, 0xFF);
    mem.load(0, &[0xCB, 0x7E]); // BIT 7,(HL)

    let tstates = cpu.step(&mut mem, &mut io);
    assert_eq!(tstates, 12);
    assert!((cpu.f & Flag::Z as u8) == 0);
}

#[test]
fn ddcb_bit_on_indexed_operand() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.ix = 0x8000;
    mem.write(0x8005, 0x01);
    mem.load(0, &[0xDD, 0xCB, 0x05, 0x46]); // BIT 0,(IX+5)

    let tstates = cpu.step(&mut mem, &mut io);
    assert_eq!(tstates, 20);
    assert!((cpu.f & Flag::Z as u8) == 0);
}

#[test]
fn ddcb_set_writes_back_and_copies_to_register() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.ix = 0x8000;
    mem.write(0x8005, 0x00);
    mem.load(0, &[0xDD, 0xCB, 0x05, 0xC6]); // SET 0,(IX+5)

    let tstates = cpu.step(&mut mem, &mut io);
    assert_eq!(tstates, 23);
    assert_eq!(mem.read(0x8005), 0x01);
}

#[test]
fn undocumented_sll_shifts_in_a_one() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.b = 0x01;
    mem.load(0, &[0xCB, 0x30]); // SLL B (undocumented)

    cpu.step(&mut mem, &mut io);
    assert_eq!(cpu.b, 0x03);
}
