use spectrum48_core::cpu::z80::Flag;
use spectrum48_core::prelude::*;
mod common;
use common::{TestIo, TestMemory};

#[test]
fn ld_a_ix_plus_d_reads_indexed_memory() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.ix = 0x8000;
    mem.write(0x8005, 0x42);
    mem.load(0, &[0xDD, 0x7E, 0x05]); // LD A,(IX+5)

    let tstates = cpu.step(&mut mem, &mut io);
    assert_eq!(tstates, 19);
    assert_eq!(cpu.a, 0x42);
}

#[test]
fn ld_iy_plus_d_b_writes_indexed_memory() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.iy = 0x9000;
    cpu.b = 0x77;
    mem.load(0, &[0xFD, 0x70, 0xFE]); // LD (IY-2),B

    let tstates = cpu.step(&mut mem, &mut io);
    assert_eq!(tstates, 19);
    assert_eq!(mem.read(0x8FFE), 0x77);
}

#[test]
fn ld_ix_plus_d_n_writes_immediate() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.ix = 0x8000;
    mem.load(0, &[0xDD, 0x36, 0x02, 0x99]); // LD (IX+2),0x99

    let tstates = cpu.step(&mut mem, &mut io);
    assert_eq!(tstates, 19);
    assert_eq!(mem.read(0x8002), 0x99);
}

#[test]
fn add_a_ix_plus_d_costs_19_tstates() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.ix = 0x8000;
    cpu.a = 0x01;
    mem.write(0x8003, 0x01);
    mem.load(0, &[0xDD, 0x86, 0x03]); // ADD A,(IX+3)

    let tstates = cpu.step(&mut mem, &mut io);
    assert_eq!(tstates, 19);
    assert_eq!(cpu.a, 0x02);
}

#[test]
fn undocumented_ixh_ixl_are_independently_addressable() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.ix = 0x1234;
    mem.load(0, &[0xDD, 0x26, 0xAA]); // LD IXH,0xAA
    cpu.step(&mut mem, &mut io);
    assert_eq!(cpu.ix, 0xAA34);

    mem.load(3, &[0xDD, 0x2E, 0xBB]); // LD IXL,0xBB
    cpu.step(&mut mem, &mut io);
    assert_eq!(cpu.ix, 0xAABB);
}

#[test]
fn ld_ixh_a_copies_high_byte_without_touching_h() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.ix = 0x0000;
    cpu.a = 0x5A;
    cpu.h = 0x11;
    mem.load(0, &[0xDD, 0x67]); // LD IXH,A: dst=4 (IXH under DD prefix), src=7 (A)
    cpu.step(&mut mem, &mut io);
    assert_eq!(cpu.ix, 0x5A00);
    assert_eq!(cpu.h, 0x11); // plain H untouched; IX shadowing is separate storage
}

#[test]
fn plain_hl_instruction_is_unaffected_by_prior_index_prefix() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.set_hl(0x8000);
    cpu.ix = 0x9000;
    mem.write(0x8000, 0x64);
    mem.load(0, &[0xDD, 0x7E, 0x00, 0x7E]); // LD A,(IX+0) then plain LD A,(HL)

    cpu.step(&mut mem, &mut io); // consumes the DD-prefixed instruction
    mem.write(0x8000, 0x99);
    let tstates = cpu.step(&mut mem, &mut io); // plain LD A,(HL), index_mode reset to HL
    assert_eq!(tstates, 7);
    assert_eq!(cpu.a, 0x99);
}
