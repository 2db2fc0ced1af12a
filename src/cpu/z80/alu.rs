use crate::cpu::z80::{Flag, Z80};
use crate::memory::Memory;

impl Z80 {
    // --- Flag Helpers ---

    pub(crate) fn get_parity(val: u8) -> bool {
        val.count_ones() % 2 == 0
    }

    fn update_flags_logic(&mut self, result: u8, is_and: bool) {
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
        if is_and {
            f |= Flag::H as u8; // AND sets H, others clear it
        }
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.q = self.f;
    }

    fn do_add(&mut self, val: u8, carry_in: bool) {
        let a = self.a;
        let c_val = if carry_in && (self.f & Flag::C as u8) != 0 {
            1
        } else {
            0
        };
        let result_u16 = (a as u16) + (val as u16) + (c_val as u16);
        let result = result_u16 as u8;

        let mut f = 0;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if ((a & 0xF) + (val & 0xF) + c_val) > 0xF {
            f |= Flag::H as u8;
        }
        if ((a ^ result) & (val ^ result) & 0x80) != 0 {
            f |= Flag::PV as u8;
        }
        if result_u16 > 0xFF {
            f |= Flag::C as u8;
        }

        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.a = result;
        self.f = f;
        self.q = self.f;
    }

    fn do_sub(&mut self, val: u8, carry_in: bool) {
        let a = self.a;
        let c_val = if carry_in && (self.f & Flag::C as u8) != 0 {
            1
        } else {
            0
        };
        let result_u16 = (a as u16)
            .wrapping_sub(val as u16)
            .wrapping_sub(c_val as u16);
        let result = result_u16 as u8;

        let mut f = Flag::N as u8;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if (a & 0xF) < ((val & 0xF) + c_val) {
            f |= Flag::H as u8;
        }
        if ((a ^ val) & (a ^ result) & 0x80) != 0 {
            f |= Flag::PV as u8;
        }
        if result_u16 > 0xFF {
            f |= Flag::C as u8;
        }

        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.a = result;
        self.f = f;
        self.q = self.f;
    }

    fn do_cp(&mut self, val: u8) {
        let a = self.a;
        let result_u16 = (a as u16).wrapping_sub(val as u16);
        let result = result_u16 as u8;

        let mut f = Flag::N as u8;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if (a & 0xF) < (val & 0xF) {
            f |= Flag::H as u8;
        }
        if ((a ^ val) & (a ^ result) & 0x80) != 0 {
            f |= Flag::PV as u8;
        }
        if result_u16 > 0xFF {
            f |= Flag::C as u8;
        }

        // X/Y for CP come from the operand, not the (discarded) result.
        f |= val & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.q = self.f;
    }

    fn perform_alu_op(&mut self, op: u8, val: u8) {
        match op {
            0 => self.do_add(val, false),
            1 => self.do_add(val, true),
            2 => self.do_sub(val, false),
            3 => self.do_sub(val, true),
            4 => {
                self.a &= val;
                self.update_flags_logic(self.a, true);
            }
            5 => {
                self.a ^= val;
                self.update_flags_logic(self.a, false);
            }
            6 => {
                self.a |= val;
                self.update_flags_logic(self.a, false);
            }
            7 => self.do_cp(val),
            _ => unreachable!(),
        }
    }

    // --- Instructions ---

    /// ALU A, r / ALU A, (HL) / ALU A, (IX+d) — 4 / 7 / 19 T total.
    /// Opcode mask: 10 xxx zzz.
    pub fn op_alu_r(&mut self, opcode: u8, mem: &mut dyn Memory) -> u32 {
        let alu_op = (opcode >> 3) & 0x07;
        let r = opcode & 0x07;

        if r == 6 {
            let (addr, extra) = self.hl_operand_addr(mem);
            let val = mem.read(addr);
            self.perform_alu_op(alu_op, val);
            3 + extra
        } else {
            let val = self.get_reg8_ix(r);
            self.perform_alu_op(alu_op, val);
            0
        }
    }

    /// ALU A, n — 7 T total. Opcode mask: 11 xxx 110.
    pub fn op_alu_n(&mut self, opcode: u8, mem: &mut dyn Memory) -> u32 {
        let alu_op = (opcode >> 3) & 0x07;
        let val = mem.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        self.perform_alu_op(alu_op, val);
        3
    }

    /// INC/DEC r / (HL) / (IX+d) — 4 / 11 / 23 T total. Opcode mask: 00 rrr 10x.
    pub fn op_inc_dec_r(&mut self, opcode: u8, mem: &mut dyn Memory) -> u32 {
        let r = (opcode >> 3) & 0x07;
        let is_dec = (opcode & 0x01) != 0;

        if r == 6 {
            let (addr, extra) = self.hl_operand_addr(mem);
            let val = mem.read(addr);
            let result = if is_dec {
                self.calc_dec_flags(val)
            } else {
                self.calc_inc_flags(val)
            };
            mem.write(addr, result);
            7 + extra
        } else {
            let val = self.get_reg8_ix(r);
            let result = if is_dec {
                self.calc_dec_flags(val)
            } else {
                self.calc_inc_flags(val)
            };
            self.set_reg8_ix(r, result);
            0
        }
    }

    fn calc_inc_flags(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        let mut f = self.f & Flag::C as u8; // Preserve C
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if (val & 0xF) == 0xF {
            f |= Flag::H as u8;
        }
        if val == 0x7F {
            f |= Flag::PV as u8;
        }
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.q = self.f;
        result
    }

    fn calc_dec_flags(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        let mut f = (self.f & Flag::C as u8) | Flag::N as u8;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if (val & 0xF) == 0x0 {
            f |= Flag::H as u8;
        }
        if val == 0x80 {
            f |= Flag::PV as u8;
        }
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.q = self.f;
        result
    }

    // --- Accumulator rotates — 4 T total, M1 only ---

    /// RLCA: rotate A left circular. Unlike `RLC r`, S/Z/PV are untouched.
    pub fn op_rlca(&mut self) -> u32 {
        let c = (self.a >> 7) & 1;
        self.a = (self.a << 1) | c;
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if c != 0 {
            f |= Flag::C as u8;
        }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.q = self.f;
        0
    }

    pub fn op_rrca(&mut self) -> u32 {
        let c = self.a & 1;
        self.a = (self.a >> 1) | (c << 7);
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if c != 0 {
            f |= Flag::C as u8;
        }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.q = self.f;
        0
    }

    pub fn op_rla(&mut self) -> u32 {
        let old_c = if (self.f & Flag::C as u8) != 0 { 1 } else { 0 };
        let c = (self.a >> 7) & 1;
        self.a = (self.a << 1) | old_c;
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if c != 0 {
            f |= Flag::C as u8;
        }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.q = self.f;
        0
    }

    pub fn op_rra(&mut self) -> u32 {
        let old_c = if (self.f & Flag::C as u8) != 0 { 0x80 } else { 0 };
        let c = self.a & 1;
        self.a = (self.a >> 1) | old_c;
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if c != 0 {
            f |= Flag::C as u8;
        }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.q = self.f;
        0
    }

    /// DAA: decimal-adjust A after a BCD add/subtract. The correction term
    /// depends on N (was the last op a subtraction), the current C/H flags,
    /// and which nibble of A is out of BCD range — the classic six-case
    /// table from the Zilog data sheet.
    pub fn op_daa(&mut self) -> u32 {
        let a = self.a;
        let n = (self.f & Flag::N as u8) != 0;
        let c = (self.f & Flag::C as u8) != 0;
        let h = (self.f & Flag::H as u8) != 0;

        let mut correction = 0u8;
        let mut new_c = c;
        if h || (a & 0x0F) > 9 {
            correction |= 0x06;
        }
        if c || a > 0x99 {
            correction |= 0x60;
            new_c = true;
        }

        let result = if n {
            a.wrapping_sub(correction)
        } else {
            a.wrapping_add(correction)
        };

        let new_h = if n {
            h && (a & 0x0F) < 6
        } else {
            (a & 0x0F) + (correction & 0x0F) > 0x0F
        };

        let mut f = if n { Flag::N as u8 } else { 0 };
        if new_c {
            f |= Flag::C as u8;
        }
        if new_h {
            f |= Flag::H as u8;
        }
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if Self::get_parity(result) {
            f |= Flag::PV as u8;
        }
        f |= result & (Flag::X as u8 | Flag::Y as u8);

        self.a = result;
        self.f = f;
        self.q = self.f;
        0
    }

    /// CPL: complement A. H and N set, S/Z/PV/C preserved.
    pub fn op_cpl(&mut self) -> u32 {
        self.a = !self.a;
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8 | Flag::C as u8);
        f |= Flag::H as u8 | Flag::N as u8;
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.q = self.f;
        0
    }

    /// Undocumented X/Y behavior shared by SCF/CCF: if the immediately
    /// preceding instruction left the flags register in the state recorded
    /// by `prev_q` (i.e. it was itself the last one to touch flags), X/Y
    /// become `(prev_q | A) & 0x28`; otherwise they come from A alone.
    fn scf_ccf_xy(&self) -> u8 {
        let xy = Flag::X as u8 | Flag::Y as u8;
        if self.prev_q != 0 && self.prev_q == self.f {
            (self.prev_q | self.a) & xy
        } else {
            self.a & xy
        }
    }

    /// SCF: set carry. H and N cleared, S/Z/PV preserved.
    pub fn op_scf(&mut self) -> u32 {
        let xy = self.scf_ccf_xy();
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        f |= Flag::C as u8;
        f |= xy;
        self.f = f;
        self.q = self.f;
        0
    }

    /// CCF: complement carry. H = old C, N cleared, S/Z/PV preserved.
    pub fn op_ccf(&mut self) -> u32 {
        let xy = self.scf_ccf_xy();
        let old_c = (self.f & Flag::C as u8) != 0;
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if old_c {
            f |= Flag::H as u8;
        } else {
            f |= Flag::C as u8;
        }
        f |= xy;
        self.f = f;
        self.q = self.f;
        0
    }

    /// ADD HL,rr / ADD IX,rr / ADD IY,rr — 11 T total. Flags: S/Z/PV
    /// preserved, H from bit-11 carry, N=0, C from bit-15 carry. X/Y from
    /// the high byte of the result.
    pub fn op_add_hl_rr(&mut self, opcode: u8) -> u32 {
        let rp = (opcode >> 4) & 0x03;
        let hl = self.get_rp(2);
        let val = if rp == 2 { hl } else { self.get_rp(rp) };

        let result = (hl as u32) + (val as u32);
        let half = ((hl & 0x0FFF) + (val & 0x0FFF)) > 0x0FFF;

        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if half {
            f |= Flag::H as u8;
        }
        if result > 0xFFFF {
            f |= Flag::C as u8;
        }
        let result = result as u16;
        f |= ((result >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.q = self.f;

        self.memptr = hl.wrapping_add(1);
        self.set_rp(2, result);
        7
    }

    /// ADC HL,rr (ED-prefixed) — 15T total (counted by the ED dispatcher:
    /// this returns the body after the 8T base). Full flags, unlike ADD HL,rr.
    pub fn op_adc_hl_rr(&mut self, opcode: u8) -> u32 {
        let rp = (opcode >> 4) & 0x03;
        let hl = self.get_hl();
        let val = self.get_rp(rp);
        let c_in = if (self.f & Flag::C as u8) != 0 { 1u32 } else { 0 };

        let result_u32 = (hl as u32) + (val as u32) + c_in;
        let result = result_u32 as u16;
        let half = ((hl & 0x0FFF) + (val & 0x0FFF) + c_in as u16) > 0x0FFF;
        let overflow = ((hl ^ result) & (val ^ result) & 0x8000) != 0;

        let mut f = 0u8;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x8000) != 0 {
            f |= Flag::S as u8;
        }
        if half {
            f |= Flag::H as u8;
        }
        if overflow {
            f |= Flag::PV as u8;
        }
        if result_u32 > 0xFFFF {
            f |= Flag::C as u8;
        }
        f |= ((result >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.q = self.f;

        self.memptr = hl.wrapping_add(1);
        self.set_hl(result);
        7
    }

    /// SBC HL,rr (ED-prefixed) — 15T total. Same flag shape as ADC HL,rr
    /// with subtraction semantics (N set).
    pub fn op_sbc_hl_rr(&mut self, opcode: u8) -> u32 {
        let rp = (opcode >> 4) & 0x03;
        let hl = self.get_hl();
        let val = self.get_rp(rp);
        let c_in = if (self.f & Flag::C as u8) != 0 { 1u32 } else { 0 };

        let result_i = (hl as i32) - (val as i32) - c_in as i32;
        let result = result_i as u16;
        let half = (hl & 0x0FFF) < ((val & 0x0FFF) + c_in as u16);
        let overflow = ((hl ^ val) & (hl ^ result) & 0x8000) != 0;

        let mut f = Flag::N as u8;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x8000) != 0 {
            f |= Flag::S as u8;
        }
        if half {
            f |= Flag::H as u8;
        }
        if overflow {
            f |= Flag::PV as u8;
        }
        if result_i < 0 {
            f |= Flag::C as u8;
        }
        f |= ((result >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.q = self.f;

        self.memptr = hl.wrapping_add(1);
        self.set_hl(result);
        7
    }

    /// INC rr / DEC rr — 6 T total. No flags affected.
    pub fn op_inc_dec_rr(&mut self, opcode: u8) -> u32 {
        let rp = (opcode >> 4) & 0x03;
        let is_dec = (opcode & 0x08) != 0;
        let val = self.get_rp(rp);
        self.set_rp(rp, if is_dec { val.wrapping_sub(1) } else { val.wrapping_add(1) });
        2
    }

    /// NEG (ED-prefixed) — 8T total: A = 0 - A.
    pub fn op_neg(&mut self) -> u32 {
        let a = self.a;
        let result = 0u8.wrapping_sub(a);
        let mut f = Flag::N as u8;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if (0u8 & 0xF) < (a & 0xF) {
            f |= Flag::H as u8;
        }
        if a == 0x80 {
            f |= Flag::PV as u8;
        }
        if a != 0 {
            f |= Flag::C as u8;
        }
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.a = result;
        self.f = f;
        self.q = self.f;
        0
    }

    /// RRD (ED-prefixed) — 18T total: rotate the low nibble of A with both
    /// nibbles of (HL), right. S/Z/PV from the new A, H=0, N=0, C preserved.
    pub fn op_rrd(&mut self, mem: &mut dyn Memory) -> u32 {
        let addr = self.get_hl();
        let hl_val = mem.read(addr);
        let a_lo = self.a & 0x0F;
        let new_a = (self.a & 0xF0) | (hl_val & 0x0F);
        let new_hl = (a_lo << 4) | (hl_val >> 4);
        mem.write(addr, new_hl);
        self.a = new_a;
        self.memptr = addr.wrapping_add(1);

        let mut f = self.f & Flag::C as u8;
        if self.a == 0 {
            f |= Flag::Z as u8;
        }
        if (self.a & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if Self::get_parity(self.a) {
            f |= Flag::PV as u8;
        }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.q = self.f;
        10
    }

    /// RLD (ED-prefixed) — 18T total: same as RRD but rotating left.
    pub fn op_rld(&mut self, mem: &mut dyn Memory) -> u32 {
        let addr = self.get_hl();
        let hl_val = mem.read(addr);
        let a_lo = self.a & 0x0F;
        let new_a = (self.a & 0xF0) | (hl_val >> 4);
        let new_hl = ((hl_val << 4) & 0xF0) | a_lo;
        mem.write(addr, new_hl);
        self.a = new_a;
        self.memptr = addr.wrapping_add(1);

        let mut f = self.f & Flag::C as u8;
        if self.a == 0 {
            f |= Flag::Z as u8;
        }
        if (self.a & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if Self::get_parity(self.a) {
            f |= Flag::PV as u8;
        }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.q = self.f;
        10
    }
}
