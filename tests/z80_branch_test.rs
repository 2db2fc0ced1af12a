use spectrum48_core::cpu::z80::Flag;
use spectrum48_core::prelude::*;
mod common;
use common::{TestIo, TestMemory};

#[test]
fn jp_nn_sets_pc_and_memptr() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    mem.load(0, &[0xC3, 0x34, 0x12]); // JP 0x1234

    let tstates = cpu.step(&mut mem, &mut io);
    assert_eq!(tstates, 10);
    assert_eq!(cpu.pc, 0x1234);
    assert_eq!(cpu.memptr, 0x1234);
}

#[test]
fn jr_cc_not_taken_costs_fewer_tstates() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.f = 0; // Z clear
    mem.load(0, &[0x28, 0x10]); // JR Z,+16 (not taken)

    let tstates = cpu.step(&mut mem, &mut io);
    assert_eq!(tstates, 7);
    assert_eq!(cpu.pc, 2);
}

#[test]
fn jr_cc_taken_jumps() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.f = Flag::Z as u8;
    mem.load(0, &[0x28, 0x10]); // JR Z,+16

    let tstates = cpu.step(&mut mem, &mut io);
    assert_eq!(tstates, 12);
    assert_eq!(cpu.pc, 18);
}

#[test]
fn djnz_loops_until_b_zero() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.b = 3;
    mem.load(0, &[0x10, 0xFE]); // DJNZ -2 (back to itself)

    cpu.step(&mut mem, &mut io); // b: 3->2, taken
    assert_eq!(cpu.pc, 0);
    cpu.step(&mut mem, &mut io); // b: 2->1, taken
    assert_eq!(cpu.pc, 0);
    cpu.step(&mut mem, &mut io); // b: 1->0, not taken
    assert_eq!(cpu.b, 0);
    assert_eq!(cpu.pc, 2);
}

#[test]
fn call_and_ret_round_trip_through_stack() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.sp = 0xFFFE;
    mem.load(0, &[0xCD, 0x00, 0x90]); // CALL 0x9000
    mem.load(0x9000, &[0xC9]); // RET

    let call_tstates = cpu.step(&mut mem, &mut io);
    assert_eq!(call_tstates, 17);
    assert_eq!(cpu.pc, 0x9000);
    assert_eq!(cpu.sp, 0xFFFC);

    let ret_tstates = cpu.step(&mut mem, &mut io);
    assert_eq!(ret_tstates, 10);
    assert_eq!(cpu.pc, 0x0003);
    assert_eq!(cpu.sp, 0xFFFE);
}

#[test]
fn rst_pushes_return_address_and_jumps() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    cpu.sp = 0xFFFE;
    mem.load(0x10, &[0xEF]); // RST 28h at address 0x10 for a nonzero return addr
    cpu.pc = 0x10;

    cpu.step(&mut mem, &mut io);
    assert_eq!(cpu.pc, 0x28);
    assert_eq!(mem.read(0xFFFC), 0x11);
    assert_eq!(mem.read(0xFFFD), 0x00);
}
