use spectrum48_core::cpu::z80::Flag;
use spectrum48_core::prelude::*;
mod common;
use common::{TestIo, TestMemory};

#[test]
fn ldir_copies_block_and_clears_bc() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    mem.load(0x8000, &[0x11, 0x22, 0x33]);
    cpu.set_hl(0x8000);
    cpu.set_de(0x9000);
    cpu.set_bc(3);
    mem.load(0, &[0xED, 0xB0]); // LDIR

    loop {
        cpu.step(&mut mem, &mut io);
        if cpu.get_bc() == 0 {
            break;
        }
    }
    assert_eq!(mem.read(0x9000), 0x11);
    assert_eq!(mem.read(0x9001), 0x22);
    assert_eq!(mem.read(0x9002), 0x33);
    assert_eq!(cpu.get_hl(), 0x8003);
    assert_eq!(cpu.get_de(), 0x9003);
}

#[test]
fn cpir_stops_on_match() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    mem.load(0x8000, &[0x01, 0x02, 0x42, 0x03]);
    cpu.a = 0x42;
    cpu.set_hl(0x8000);
    cpu.set_bc(4);
    mem.load(0, &[0xED, 0xB1]); // CPIR

    loop {
        cpu.step(&mut mem, &mut io);
        if (cpu.f & Flag::Z as u8) != 0 || cpu.get_bc() == 0 {
            break;
        }
    }
    assert!((cpu.f & Flag::Z as u8) != 0);
    assert_eq!(cpu.get_hl(), 0x8003); // stopped right after the matching byte
    assert_eq!(cpu.get_bc(), 1);
}

#[test]
fn ini_reads_port_into_memory_and_decrements_b() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    io.ports[0xFE] = 0x77;
    cpu.b = 1;
    cpu.c = 0xFE;
    cpu.set_hl(0x8000);
    mem.load(0, &[0xED, 0xA2]); // INI

    cpu.step(&mut mem, &mut io);
    assert_eq!(mem.read(0x8000), 0x77);
    assert_eq!(cpu.b, 0);
    assert_eq!(cpu.get_hl(), 0x8001);
    assert!((cpu.f & Flag::Z as u8) != 0);
}

#[test]
fn outi_writes_memory_byte_to_port() {
    let mut cpu = Z80::new();
    let mut mem = TestMemory::new();
    let mut io = TestIo::new();
    mem.write(0x8000, 0x99);
    cpu.b = 1;
    cpu.c = 0xFE;
    cpu.set_hl(0x8000);
    mem.load(0, &[0xED, 0xA3]); // OUTI

    cpu.step(&mut mem, &mut io);
    assert_eq!(io.writes.last(), Some(&(0x00FE, 0x99)));
    assert_eq!(cpu.get_hl(), 0x8001);
}
