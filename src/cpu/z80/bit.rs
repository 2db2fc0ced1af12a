use crate::cpu::z80::{Flag, IndexMode, Z80};
use crate::memory::Memory;

impl Z80 {
    /// Perform CB rotate/shift operation on a value.
    /// op: 0=RLC, 1=RRC, 2=RL, 3=RR, 4=SLA, 5=SRA, 6=SLL(undoc), 7=SRL.
    /// Returns (result, new_flags). Flags: S, Z, PV(parity), C from shifted bit. H=0, N=0.
    fn do_cb_rotate_shift(&self, op: u8, val: u8) -> (u8, u8) {
        let (result, carry) = match op {
            0 => {
                let c = (val >> 7) & 1;
                ((val << 1) | c, c)
            }
            1 => {
                let c = val & 1;
                ((val >> 1) | (c << 7), c)
            }
            2 => {
                let old_c = if (self.f & Flag::C as u8) != 0 { 1 } else { 0 };
                let c = (val >> 7) & 1;
                ((val << 1) | old_c, c)
            }
            3 => {
                let old_c = if (self.f & Flag::C as u8) != 0 { 0x80 } else { 0 };
                let c = val & 1;
                ((val >> 1) | old_c, c)
            }
            4 => {
                let c = (val >> 7) & 1;
                (val << 1, c)
            }
            5 => {
                let c = val & 1;
                (((val as i8) >> 1) as u8, c)
            }
            6 => {
                let c = (val >> 7) & 1;
                ((val << 1) | 1, c)
            }
            7 => {
                let c = val & 1;
                (val >> 1, c)
            }
            _ => unreachable!(),
        };

        let mut f = 0;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if Self::get_parity(result) {
            f |= Flag::PV as u8;
        }
        if carry != 0 {
            f |= Flag::C as u8;
        }
        f |= result & (Flag::X as u8 | Flag::Y as u8);

        (result, f)
    }

    fn bit_flags(&self, val: u8, bit: u8, xy_source: u8) -> u8 {
        let tested = val & (1 << bit);
        let mut f = self.f & Flag::C as u8;
        f |= Flag::H as u8;
        if tested == 0 {
            f |= Flag::Z as u8;
            f |= Flag::PV as u8;
        }
        if bit == 7 && tested != 0 {
            f |= Flag::S as u8;
        }
        f |= xy_source & (Flag::X as u8 | Flag::Y as u8);
        f
    }

    /// Dispatch a CB-prefixed instruction. Reads the sub-opcode (and, for
    /// DD CB d / FD CB d, the displacement byte first) itself and returns
    /// the full t-state cost of that fetch plus the body — the caller only
    /// credits the 4T already spent on the `0xCB` byte.
    ///
    /// Totals: register op 8T (returns 4), BIT b,(HL) 12T (returns 8),
    /// rotate/shift/SET/RES (HL) 15T (returns 11), indexed BIT 20T
    /// (returns 12), indexed other 23T (returns 15).
    pub fn dispatch_cb(&mut self, mem: &mut dyn Memory) -> u32 {
        if self.index_mode == IndexMode::HL {
            let op = mem.read(self.pc);
            self.pc = self.pc.wrapping_add(1);
            self.r = super::bump_r(self.r);

            let xx = (op >> 6) & 0x03;
            let yyy = (op >> 3) & 0x07;
            let zzz = op & 0x07;

            if zzz == 6 {
                let addr = self.get_hl();
                if xx == 1 {
                    let val = mem.read(addr);
                    let f = self.bit_flags(val, yyy, (self.memptr >> 8) as u8);
                    self.f = f;
                    self.q = self.f;
                    4 + 4
                } else {
                    let val = mem.read(addr);
                    let result = match xx {
                        0 => {
                            let (r, f) = self.do_cb_rotate_shift(yyy, val);
                            self.f = f;
                            self.q = self.f;
                            r
                        }
                        2 => val & !(1 << yyy),
                        3 => val | (1 << yyy),
                        _ => unreachable!(),
                    };
                    mem.write(addr, result);
                    4 + 7
                }
            } else {
                let val = self.get_reg8(zzz);
                match xx {
                    0 => {
                        let (result, f) = self.do_cb_rotate_shift(yyy, val);
                        self.f = f;
                        self.q = self.f;
                        self.set_reg8(zzz, result);
                    }
                    1 => {
                        let f = self.bit_flags(val, yyy, val);
                        self.f = f;
                        self.q = self.f;
                    }
                    2 => self.set_reg8(zzz, val & !(1 << yyy)),
                    3 => self.set_reg8(zzz, val | (1 << yyy)),
                    _ => unreachable!(),
                }
                4
            }
        } else {
            // DD CB d op / FD CB d op: displacement precedes the sub-opcode.
            let d = mem.read(self.pc) as i8;
            self.pc = self.pc.wrapping_add(1);
            let op = mem.read(self.pc);
            self.pc = self.pc.wrapping_add(1);

            let base = if self.index_mode == IndexMode::IX { self.ix } else { self.iy };
            let addr = base.wrapping_add(d as i16 as u16);
            self.memptr = addr;

            let xx = (op >> 6) & 0x03;
            let yyy = (op >> 3) & 0x07;
            let zzz = op & 0x07;

            if xx == 1 {
                let val = mem.read(addr);
                let f = self.bit_flags(val, yyy, (addr >> 8) as u8);
                self.f = f;
                self.q = self.f;
                8 + 4
            } else {
                let val = mem.read(addr);
                let result = match xx {
                    0 => {
                        let (r, f) = self.do_cb_rotate_shift(yyy, val);
                        self.f = f;
                        self.q = self.f;
                        r
                    }
                    2 => val & !(1 << yyy),
                    3 => val | (1 << yyy),
                    _ => unreachable!(),
                };
                mem.write(addr, result);
                if zzz != 6 {
                    self.set_reg8(zzz, result);
                }
                8 + 7
            }
        }
    }
}
