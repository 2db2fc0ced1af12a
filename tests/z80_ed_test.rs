use spectrum48_core::cpu::z80::Flag;
use spectrum48_core::prelude::*;
mod common;
use common::{TestIo, TestMemory};

#[test]
fn neg_negates_a_and_sets_carry_unless_zero() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.a = 0x01;
    mem.load(0, &[0xED, 0x44]); // NEG

    cpu.step(&mut mem, &mut io);
    assert_eq!(cpu.a, 0xFF);
    assert!((cpu.f & Flag::C as u8) != 0);
    assert!((cpu.f & Flag::N as u8) != 0);
}

#[test]
fn neg_of_zero_clears_carry() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.a = 0x00;
    mem.load(0, &[0xED, 0x44]);

    cpu.step(&mut mem, &mut io);
    assert_eq!(cpu.a, 0x00);
    assert!((cpu.f & Flag::C as u8) == 0);
    assert!((cpu.f & Flag::Z as u8) != 0);
}

#[test]
fn rrd_rotates_nibbles_between_a_and_memory() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.a = 0x84;
    cpu.set_hl(0x8000);
    mem.write(0x8000, 0x20);
    mem.load(0, &[0xED, 0x67]); // RRD

    let tstates = cpu.step(&mut mem, &mut io);
    assert_eq!(tstates, 18);
    assert_eq!(cpu.a, 0x80);
    assert_eq!(mem.read(0x8000), 0x42);
}

#[test]
fn ld_nn_rr_and_back_round_trips() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.set_bc(0xBEEF);
    mem.load(0, &[0xED, 0x43, 0x00, 0x90]); // LD (0x9000),BC

    cpu.step(&mut mem, &mut io);
    assert_eq!(mem.read_word(0x9000), 0xBEEF);

    cpu.set_bc(0);
    mem.load(4, &[0xED, 0x4B, 0x00, 0x90]); // LD BC,(0x9000)
    cpu.step(&mut mem, &mut io);
    assert_eq!(cpu.get_bc(), 0xBEEF);
}

#[test]
fn in_r_c_reads_port_and_sets_flags() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.c = 0x10;
    io.ports[0x10] = 0x00;
    mem.load(0, &[0xED, 0x40]); // IN B,(C)

    cpu.step(&mut mem, &mut io);
    assert_eq!(cpu.b, 0x00);
    assert!((cpu.f & Flag::Z as u8) != 0);
}

#[test]
fn out_c_r_writes_register_to_port() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.b = 0x7A;
    cpu.c = 0x20;
    mem.load(0, &[0xED, 0x41]); // OUT (C),B

    cpu.step(&mut mem, &mut io);
    assert_eq!(io.ports[0x20], 0x7A);
}

#[test]
fn retn_restores_iff1_from_iff2() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.sp = 0xFFFE;
    mem.write(0xFFFE, 0x00);
    mem.write(0xFFFF, 0x80);
    cpu.iff2 = true;
    cpu.iff1 = false;
    mem.load(0, &[0xED, 0x45]); // RETN

    cpu.step(&mut mem, &mut io);
    assert!(cpu.iff1);
    assert_eq!(cpu.pc, 0x8000);
}
