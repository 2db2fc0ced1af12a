use crate::cpu::z80::{Flag, Z80};
use crate::memory::Memory;

impl Z80 {
    /// Evaluate a condition code (3 bits from opcode bits 5-3).
    /// 0=NZ, 1=Z, 2=NC, 3=C, 4=PO, 5=PE, 6=P, 7=M
    pub(crate) fn eval_condition(&self, cc: u8) -> bool {
        match cc {
            0 => (self.f & Flag::Z as u8) == 0,
            1 => (self.f & Flag::Z as u8) != 0,
            2 => (self.f & Flag::C as u8) == 0,
            3 => (self.f & Flag::C as u8) != 0,
            4 => (self.f & Flag::PV as u8) == 0,
            5 => (self.f & Flag::PV as u8) != 0,
            6 => (self.f & Flag::S as u8) == 0,
            7 => (self.f & Flag::S as u8) != 0,
            _ => unreachable!(),
        }
    }

    fn read_nn(&mut self, mem: &mut dyn Memory) -> u16 {
        let lo = mem.read(self.pc) as u16;
        self.pc = self.pc.wrapping_add(1);
        let hi = mem.read(self.pc) as u16;
        self.pc = self.pc.wrapping_add(1);
        (hi << 8) | lo
    }

    /// JP nn — 10T total.
    pub fn op_jp_nn(&mut self, mem: &mut dyn Memory) -> u32 {
        let addr = self.read_nn(mem);
        self.memptr = addr;
        self.pc = addr;
        6
    }

    /// JP cc,nn — 10T total whether taken or not (both bytes always read).
    pub fn op_jp_cc_nn(&mut self, opcode: u8, mem: &mut dyn Memory) -> u32 {
        let cc = (opcode >> 3) & 0x07;
        let addr = self.read_nn(mem);
        self.memptr = addr;
        if self.eval_condition(cc) {
            self.pc = addr;
        }
        6
    }

    /// JR e — 12T total.
    pub fn op_jr_e(&mut self, mem: &mut dyn Memory) -> u32 {
        let disp = mem.read(self.pc) as i8;
        self.pc = self.pc.wrapping_add(1);
        self.pc = self.pc.wrapping_add(disp as i16 as u16);
        self.memptr = self.pc;
        8
    }

    /// JR cc,e — 12T taken / 7T not taken. Only NZ/Z/NC/C (2-bit cc).
    pub fn op_jr_cc_e(&mut self, opcode: u8, mem: &mut dyn Memory) -> u32 {
        let cc = (opcode >> 3) & 0x03;
        let disp = mem.read(self.pc) as i8;
        self.pc = self.pc.wrapping_add(1);
        if self.eval_condition(cc) {
            self.pc = self.pc.wrapping_add(disp as i16 as u16);
            self.memptr = self.pc;
            8
        } else {
            3
        }
    }

    /// JP (HL) / JP (IX) / JP (IY) — 4T total. Loads the register's raw
    /// value, not a dereference, so no extra t-states for indexed forms.
    pub fn op_jp_hl(&mut self) -> u32 {
        self.pc = self.get_rp(2);
        0
    }

    /// DJNZ e — 13T taken / 8T not taken.
    pub fn op_djnz(&mut self, mem: &mut dyn Memory) -> u32 {
        self.b = self.b.wrapping_sub(1);
        let disp = mem.read(self.pc) as i8;
        self.pc = self.pc.wrapping_add(1);
        if self.b != 0 {
            self.pc = self.pc.wrapping_add(disp as i16 as u16);
            self.memptr = self.pc;
            9
        } else {
            4
        }
    }

    /// CALL nn — 17T total.
    pub fn op_call_nn(&mut self, mem: &mut dyn Memory) -> u32 {
        let addr = self.read_nn(mem);
        self.memptr = addr;
        self.sp = self.sp.wrapping_sub(1);
        mem.write(self.sp, (self.pc >> 8) as u8);
        self.sp = self.sp.wrapping_sub(1);
        mem.write(self.sp, self.pc as u8);
        self.pc = addr;
        13
    }

    /// CALL cc,nn — 17T taken / 10T not taken (nn always read).
    pub fn op_call_cc_nn(&mut self, opcode: u8, mem: &mut dyn Memory) -> u32 {
        let cc = (opcode >> 3) & 0x07;
        let addr = self.read_nn(mem);
        self.memptr = addr;
        if self.eval_condition(cc) {
            self.sp = self.sp.wrapping_sub(1);
            mem.write(self.sp, (self.pc >> 8) as u8);
            self.sp = self.sp.wrapping_sub(1);
            mem.write(self.sp, self.pc as u8);
            self.pc = addr;
            13
        } else {
            6
        }
    }

    fn pop_pc(&mut self, mem: &mut dyn Memory) {
        let lo = mem.read(self.sp) as u16;
        self.sp = self.sp.wrapping_add(1);
        let hi = mem.read(self.sp) as u16;
        self.sp = self.sp.wrapping_add(1);
        self.pc = (hi << 8) | lo;
        self.memptr = self.pc;
    }

    /// RET — 10T total.
    pub fn op_ret(&mut self, mem: &mut dyn Memory) -> u32 {
        self.pop_pc(mem);
        6
    }

    /// RET cc — 11T taken / 5T not taken.
    pub fn op_ret_cc(&mut self, opcode: u8, mem: &mut dyn Memory) -> u32 {
        let cc = (opcode >> 3) & 0x07;
        if self.eval_condition(cc) {
            self.pop_pc(mem);
            7
        } else {
            1
        }
    }

    /// RST p — 11T total. Target = opcode & 0x38.
    pub fn op_rst(&mut self, opcode: u8, mem: &mut dyn Memory) -> u32 {
        let target = (opcode & 0x38) as u16;
        self.sp = self.sp.wrapping_sub(1);
        mem.write(self.sp, (self.pc >> 8) as u8);
        self.sp = self.sp.wrapping_sub(1);
        mem.write(self.sp, self.pc as u8);
        self.pc = target;
        self.memptr = self.pc;
        7
    }

    /// DI — 4T total.
    pub fn op_di(&mut self) -> u32 {
        self.iff1 = false;
        self.iff2 = false;
        0
    }

    /// EI — 4T total. Interrupt acceptance is deferred for one `step` call.
    pub fn op_ei(&mut self) -> u32 {
        self.iff1 = true;
        self.iff2 = true;
        self.ei_delay = true;
        0
    }

    // --- ED Control Flow ---

    /// RETN/RETI (ED-prefixed) — 14T total: copy IFF2 -> IFF1, pop PC.
    pub fn op_retn(&mut self, mem: &mut dyn Memory) -> u32 {
        self.iff1 = self.iff2;
        self.pop_pc(mem);
        6
    }

    /// IM 0/1/2 (ED-prefixed) — 8T total.
    /// Bits 4-3: 00/01->IM 0, 10->IM 1, 11->IM 2.
    pub fn op_im(&mut self, opcode: u8) -> u32 {
        self.im = match (opcode >> 3) & 0x03 {
            0 | 1 => 0,
            2 => 1,
            3 => 2,
            _ => unreachable!(),
        };
        0
    }
}
