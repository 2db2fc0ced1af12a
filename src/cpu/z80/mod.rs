mod alu;
mod bit;
mod block;
mod branch;
mod load_store;
mod stack;

use crate::cpu::trace::{CpuTrace, NullTrace};
use crate::cpu::{
    Cpu,
    state::{CpuStateTrait, Z80State},
};
use crate::io::{InterruptSink, Io};
use crate::memory::Memory;

#[repr(u8)]
#[derive(Copy, Clone, Debug)]
pub enum Flag {
    C = 0x01,  // Carry
    N = 0x02,  // Add/Subtract
    PV = 0x04, // Parity/Overflow
    X = 0x08,  // Unused (copy of bit 3)
    H = 0x10,  // Half Carry
    Y = 0x20,  // Unused (copy of bit 5)
    Z = 0x40,  // Zero
    S = 0x80,  // Sign
}

/// A cycle-timed Z80, minus the teacher's bus-arbiter granularity: `step`
/// fetches and runs exactly one instruction (or services one pending
/// interrupt) per call and returns the t-states it cost (`SPEC_FULL.md` §2).
pub struct Z80 {
    // Registers
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    // Shadow Registers
    pub a_prime: u8,
    pub f_prime: u8,
    pub b_prime: u8,
    pub c_prime: u8,
    pub d_prime: u8,
    pub e_prime: u8,
    pub h_prime: u8,
    pub l_prime: u8,
    // Index & Special Registers
    pub ix: u16,
    pub iy: u16,
    pub i: u8,
    pub r: u8,
    pub sp: u16,
    pub pc: u16,

    // Internal state
    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,
    pub memptr: u16, // Hidden WZ register
    pub halted: bool,
    pub ei_delay: bool,
    pub p: bool, // Set after LD A,I / LD A,R for interrupt PV behavior
    pub q: u8,             // Copy of F when instruction modifies flags, 0 otherwise
    pub(crate) prev_q: u8, // Previous instruction's q value (for SCF/CCF X/Y)

    // Prefix handling (reset to HL at the start of every `step` call)
    pub(crate) index_mode: IndexMode,

    // Interrupt latches, set by the `InterruptSink` capability the host/ULA
    // drives. NMI is edge-triggered and always serviced; IRQ is level-
    // triggered and stays latched until IFF1 is set and it's accepted.
    pub(crate) irq_pending: bool,
    pub(crate) nmi_pending: bool,

    /// Free-running t-state counter, used only to timestamp port writes for
    /// the ULA (`Io::write`'s `tstates` argument). The host/ULA is
    /// responsible for reducing this mod 69,888 to a frame-relative position;
    /// the CPU itself has no notion of frame boundaries.
    pub tstates: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IndexMode {
    HL,
    IX,
    IY,
}

fn bump_r(r: u8) -> u8 {
    (r & 0x80) | (r.wrapping_add(1) & 0x7F)
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    pub fn new() -> Self {
        Self {
            a: 0xFF,
            f: 0xFF,
            b: 0xFF,
            c: 0xFF,
            d: 0xFF,
            e: 0xFF,
            h: 0xFF,
            l: 0xFF,
            a_prime: 0xFF,
            f_prime: 0xFF,
            b_prime: 0xFF,
            c_prime: 0xFF,
            d_prime: 0xFF,
            e_prime: 0xFF,
            h_prime: 0xFF,
            l_prime: 0xFF,
            ix: 0xFFFF,
            iy: 0xFFFF,
            i: 0x3F,
            r: 0,
            sp: 0xFFFF,
            pc: 0x0000,
            iff1: false,
            iff2: false,
            im: 0,
            memptr: 0,
            halted: false,
            ei_delay: false,
            p: false,
            q: 0,
            prev_q: 0,
            index_mode: IndexMode::HL,
            irq_pending: false,
            nmi_pending: false,
            tstates: 0,
        }
    }

    // --- 16-bit register pair helpers ---

    pub fn get_bc(&self) -> u16 {
        ((self.b as u16) << 8) | self.c as u16
    }
    pub fn set_bc(&mut self, val: u16) {
        self.b = (val >> 8) as u8;
        self.c = val as u8;
    }

    pub fn get_de(&self) -> u16 {
        ((self.d as u16) << 8) | self.e as u16
    }
    pub fn set_de(&mut self, val: u16) {
        self.d = (val >> 8) as u8;
        self.e = val as u8;
    }

    pub fn get_hl(&self) -> u16 {
        ((self.h as u16) << 8) | self.l as u16
    }
    pub fn set_hl(&mut self, val: u16) {
        self.h = (val >> 8) as u8;
        self.l = val as u8;
    }

    pub fn get_af(&self) -> u16 {
        ((self.a as u16) << 8) | self.f as u16
    }
    pub fn set_af(&mut self, val: u16) {
        self.a = (val >> 8) as u8;
        self.f = val as u8;
    }

    /// Get 8-bit register by index, respecting IX/IY prefix for H/L
    /// (undocumented IXH/IXL/IYH/IYL). Index 6 is never passed here —
    /// callers handle (HL)/(IX+d)/(IY+d) separately via [`Self::hl_operand_addr`].
    pub fn get_reg8_ix(&self, index: u8) -> u8 {
        match (index, self.index_mode) {
            (4, IndexMode::IX) => (self.ix >> 8) as u8,
            (5, IndexMode::IX) => self.ix as u8,
            (4, IndexMode::IY) => (self.iy >> 8) as u8,
            (5, IndexMode::IY) => self.iy as u8,
            _ => self.get_reg8(index),
        }
    }

    pub fn set_reg8_ix(&mut self, index: u8, val: u8) {
        match (index, self.index_mode) {
            (4, IndexMode::IX) => self.ix = (self.ix & 0x00FF) | ((val as u16) << 8),
            (5, IndexMode::IX) => self.ix = (self.ix & 0xFF00) | val as u16,
            (4, IndexMode::IY) => self.iy = (self.iy & 0x00FF) | ((val as u16) << 8),
            (5, IndexMode::IY) => self.iy = (self.iy & 0xFF00) | val as u16,
            _ => self.set_reg8(index, val),
        }
    }

    /// Effective address for (HL)/(IX+d)/(IY+d), fetching and consuming the
    /// displacement byte from `pc` when indexed. Returns the address and the
    /// extra t-states the displacement fetch costs (0 for plain HL, 8 for
    /// IX/IY — matching documented `LD r,(IX+d)` = 19T vs `LD r,(HL)` = 7T
    /// once the 4T DD/FD prefix is added on top by the caller's fetch loop).
    pub(crate) fn hl_operand_addr(&mut self, mem: &mut dyn Memory) -> (u16, u32) {
        match self.index_mode {
            IndexMode::HL => (self.get_hl(), 0),
            IndexMode::IX | IndexMode::IY => {
                let d = mem.read(self.pc) as i8;
                self.pc = self.pc.wrapping_add(1);
                let base = if self.index_mode == IndexMode::IX {
                    self.ix
                } else {
                    self.iy
                };
                let addr = base.wrapping_add(d as i16 as u16);
                self.memptr = addr;
                (addr, 8)
            }
        }
    }

    /// Get 16-bit register pair by index (0=BC, 1=DE, 2=HL/IX/IY, 3=SP).
    pub(crate) fn get_rp(&self, index: u8) -> u16 {
        match index {
            0 => self.get_bc(),
            1 => self.get_de(),
            2 => match self.index_mode {
                IndexMode::HL => self.get_hl(),
                IndexMode::IX => self.ix,
                IndexMode::IY => self.iy,
            },
            3 => self.sp,
            _ => unreachable!("get_rp called with index {}", index),
        }
    }

    pub(crate) fn set_rp(&mut self, index: u8, val: u16) {
        match index {
            0 => self.set_bc(val),
            1 => self.set_de(val),
            2 => match self.index_mode {
                IndexMode::HL => self.set_hl(val),
                IndexMode::IX => self.ix = val,
                IndexMode::IY => self.iy = val,
            },
            3 => self.sp = val,
            _ => unreachable!("set_rp called with index {}", index),
        }
    }

    /// 16-bit register pair by index for PUSH/POP (0=BC, 1=DE, 2=HL/IX/IY, 3=AF).
    pub(crate) fn get_rp_af(&self, index: u8) -> u16 {
        match index {
            0 => self.get_bc(),
            1 => self.get_de(),
            2 => match self.index_mode {
                IndexMode::HL => self.get_hl(),
                IndexMode::IX => self.ix,
                IndexMode::IY => self.iy,
            },
            3 => self.get_af(),
            _ => unreachable!("get_rp_af called with index {}", index),
        }
    }

    pub(crate) fn set_rp_af(&mut self, index: u8, val: u16) {
        match index {
            0 => self.set_bc(val),
            1 => self.set_de(val),
            2 => match self.index_mode {
                IndexMode::HL => self.set_hl(val),
                IndexMode::IX => self.ix = val,
                IndexMode::IY => self.iy = val,
            },
            3 => self.set_af(val),
            _ => unreachable!("set_rp_af called with index {}", index),
        }
    }

    pub fn get_reg8(&self, index: u8) -> u8 {
        match index {
            0 => self.b,
            1 => self.c,
            2 => self.d,
            3 => self.e,
            4 => self.h,
            5 => self.l,
            7 => self.a,
            _ => unreachable!("get_reg8 called with index {}", index),
        }
    }

    pub fn set_reg8(&mut self, index: u8, val: u8) {
        match index {
            0 => self.b = val,
            1 => self.c = val,
            2 => self.d = val,
            3 => self.e = val,
            4 => self.h = val,
            5 => self.l = val,
            7 => self.a = val,
            _ => unreachable!("set_reg8 called with index {}", index),
        }
    }

    /// Fetch-execute one instruction or service one pending interrupt,
    /// returning the t-states it cost. Uses a no-op [`CpuTrace`].
    pub fn step(&mut self, mem: &mut dyn Memory, io: &mut dyn Io) -> u32 {
        self.step_traced(mem, io, &mut NullTrace)
    }

    /// Run instructions until the cumulative t-state count reaches `budget`,
    /// returning the actual total (which may overshoot `budget` by at most
    /// one instruction's worth of t-states, per `spec.md` §4.2). The host
    /// frame loop calls this once per 69,888T video frame.
    pub fn run_for(&mut self, budget: u32, mem: &mut dyn Memory, io: &mut dyn Io) -> u32 {
        let mut total = 0u32;
        while total < budget {
            total += self.step(mem, io);
        }
        total
    }

    /// Same as [`Self::step`], reporting the opcode fetch to `trace`.
    pub fn step_traced(
        &mut self,
        mem: &mut dyn Memory,
        io: &mut dyn Io,
        trace: &mut dyn CpuTrace,
    ) -> u32 {
        if let Some(tstates) = self.service_interrupt(mem) {
            self.tstates = self.tstates.wrapping_add(tstates as u64);
            return tstates;
        }

        if self.halted {
            self.r = bump_r(self.r);
            self.tstates = self.tstates.wrapping_add(4);
            return 4;
        }

        self.index_mode = IndexMode::HL;
        self.p = false;
        self.prev_q = self.q;
        self.q = 0;

        let instr_pc = self.pc;
        let mut opcode = mem.read(self.pc);
        trace.on_fetch(instr_pc, opcode);
        self.pc = self.pc.wrapping_add(1);
        self.r = bump_r(self.r);
        let mut tstates = 4u32;

        while matches!(opcode, 0xDD | 0xFD) {
            self.index_mode = if opcode == 0xDD {
                IndexMode::IX
            } else {
                IndexMode::IY
            };
            opcode = mem.read(self.pc);
            self.pc = self.pc.wrapping_add(1);
            self.r = bump_r(self.r);
            tstates += 4;
        }

        let total = tstates + self.execute_main(opcode, mem, io);
        self.tstates = self.tstates.wrapping_add(total as u64);
        total
    }

    /// NMI is always serviced; IRQ only when IFF1 is set (and stays latched
    /// otherwise, per `spec.md` §7). `ei_delay` blocks acceptance for exactly
    /// the one `step` call following `EI`.
    fn service_interrupt(&mut self, mem: &mut dyn Memory) -> Option<u32> {
        if self.ei_delay {
            self.ei_delay = false;
            return None;
        }
        if self.nmi_pending {
            self.nmi_pending = false;
            self.halted = false;
            let tstates = self.accept_nmi(mem);
            log::trace!("NMI accepted, pc -> {:#06x} ({tstates}T)", self.pc);
            return Some(tstates);
        }
        if self.irq_pending && self.iff1 {
            self.irq_pending = false;
            self.halted = false;
            let tstates = self.accept_irq(mem);
            log::trace!(
                "IRQ accepted in IM{}, pc -> {:#06x} ({tstates}T)",
                self.im,
                self.pc
            );
            return Some(tstates);
        }
        None
    }

    /// NMI acknowledge — 11T: push PC, jump to 0x0066. IFF2←IFF1, then
    /// IFF1←false, so RETN restores whatever IFF1 held at the moment of
    /// acceptance rather than whatever IFF2 happened to hold already.
    fn accept_nmi(&mut self, mem: &mut dyn Memory) -> u32 {
        self.r = bump_r(self.r);
        self.iff2 = self.iff1;
        self.iff1 = false;
        self.sp = self.sp.wrapping_sub(1);
        mem.write(self.sp, (self.pc >> 8) as u8);
        self.sp = self.sp.wrapping_sub(1);
        mem.write(self.sp, self.pc as u8);
        self.pc = 0x0066;
        self.memptr = self.pc;
        11
    }

    /// Maskable interrupt acknowledge. IM 0/1 — 13T, force RST 38h. IM 2 —
    /// 19T, read a vector from `(I<<8)|0xFF`; the low byte of that address
    /// assumes a floating data bus of 0xFF since no daisy-chained device
    /// drives it on this machine (`spec.md` §9 Non-goals: floating-bus
    /// behavior on unattached ports is out of scope, so a fixed value is used
    /// rather than modeling it).
    fn accept_irq(&mut self, mem: &mut dyn Memory) -> u32 {
        self.r = bump_r(self.r);
        self.iff1 = false;
        self.iff2 = false;
        self.sp = self.sp.wrapping_sub(1);
        mem.write(self.sp, (self.pc >> 8) as u8);
        self.sp = self.sp.wrapping_sub(1);
        mem.write(self.sp, self.pc as u8);

        if self.im == 2 {
            let vector_addr = ((self.i as u16) << 8) | 0x00FF;
            let lo = mem.read(vector_addr) as u16;
            let hi = mem.read(vector_addr.wrapping_add(1)) as u16;
            self.pc = (hi << 8) | lo;
            self.memptr = self.pc;
            19
        } else {
            self.pc = 0x0038;
            self.memptr = self.pc;
            13
        }
    }

    /// Main (non-CB/ED-prefixed) opcode dispatch. Returns the t-states
    /// consumed beyond the opcode's own 4T fetch (already accounted for by
    /// the caller).
    fn execute_main(&mut self, opcode: u8, mem: &mut dyn Memory, io: &mut dyn Io) -> u32 {
        match opcode {
            // NOP — 4 T total
            0x00 => 0,

            // HALT — 4 T total. PC stays where FetchRead already left it;
            // `step` re-executes this no-op in place until unhalted.
            0x76 => {
                self.halted = true;
                0
            }

            // CB prefix
            0xCB => self.dispatch_cb(mem),
            // ED prefix
            0xED => self.dispatch_ed(opcode, mem, io),

            // --- Load/Store ---
            0x02 => self.op_ld_bc_a(mem),
            0x12 => self.op_ld_de_a(mem),
            0x22 => self.op_ld_nn_hl(mem),
            0x32 => self.op_ld_nn_a(mem),

            0x08 => self.op_ex_af_af(),

            0x0A => self.op_ld_a_bc(mem),
            0x1A => self.op_ld_a_de(mem),
            0x2A => self.op_ld_hl_nn_ind(mem),
            0x3A => self.op_ld_a_nn(mem),

            op if (op & 0xCF) == 0x01 => self.op_ld_rr_nn(op, mem),
            op if (op & 0xC7) == 0x06 => self.op_ld_r_n(op, mem),
            op if (op & 0xC0) == 0x40 => self.op_ld_r_r(op, mem),

            0xF9 => self.op_ld_sp_hl(),

            0xEB => self.op_ex_de_hl(),
            0xD9 => self.op_exx(),
            0xE3 => self.op_ex_sp_hl(mem),

            // --- Stack ---
            op if (op & 0xCF) == 0xC5 => self.op_push(op, mem),
            op if (op & 0xCF) == 0xC1 => self.op_pop(op, mem),

            // --- ALU ---
            op if (op & 0xC0) == 0x80 => self.op_alu_r(op, mem),
            op if (op & 0xC7) == 0xC6 => self.op_alu_n(op, mem),

            op if (op & 0xC7) == 0x04 => self.op_inc_dec_r(op, mem),
            op if (op & 0xC7) == 0x05 => self.op_inc_dec_r(op, mem),

            op if (op & 0xCF) == 0x09 => self.op_add_hl_rr(op),
            op if (op & 0xCF) == 0x03 => self.op_inc_dec_rr(op),
            op if (op & 0xCF) == 0x0B => self.op_inc_dec_rr(op),

            0x07 => self.op_rlca(),
            0x0F => self.op_rrca(),
            0x17 => self.op_rla(),
            0x1F => self.op_rra(),

            0x27 => self.op_daa(),
            0x2F => self.op_cpl(),
            0x37 => self.op_scf(),
            0x3F => self.op_ccf(),

            // --- Branch/Control Flow ---
            0xC3 => self.op_jp_nn(mem),
            0xE9 => self.op_jp_hl(),
            0x18 => self.op_jr_e(mem),
            0x10 => self.op_djnz(mem),
            0xCD => self.op_call_nn(mem),
            0xC9 => self.op_ret(mem),
            0xDB => self.op_in_a_n(mem, io),
            0xD3 => self.op_out_n_a(mem, io),

            0xF3 => self.op_di(),
            0xFB => self.op_ei(),

            op if (op & 0xC7) == 0xC2 => self.op_jp_cc_nn(op, mem),
            op if (op & 0xE7) == 0x20 => self.op_jr_cc_e(op, mem),
            op if (op & 0xC7) == 0xC4 => self.op_call_cc_nn(op, mem),
            op if (op & 0xC7) == 0xC0 => self.op_ret_cc(op, mem),
            op if (op & 0xC7) == 0xC7 => self.op_rst(op, mem),

            _ => 0,
        }
    }

    /// ED-prefixed opcode dispatch. Fetches the ED sub-opcode itself and
    /// returns the t-states consumed beyond the 4T `ED` byte fetch already
    /// counted by the caller (so 4T for the sub-opcode fetch plus its body).
    fn dispatch_ed(&mut self, _ed_byte: u8, mem: &mut dyn Memory, io: &mut dyn Io) -> u32 {
        let op = mem.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        self.r = bump_r(self.r);

        4 + match op {
            0x47 => self.op_ld_i_a(),
            0x4F => self.op_ld_r_a(),
            0x57 => self.op_ld_a_i(),
            0x5F => self.op_ld_a_r(),
            0x67 => self.op_rrd(mem),
            0x6F => self.op_rld(mem),

            0xA0 | 0xA8 => self.op_ldi_ldd(op, mem),
            0xA1 | 0xA9 => self.op_cpi_cpd(op, mem),
            0xA2 | 0xAA => self.op_ini_ind(op, mem, io),
            0xA3 | 0xAB => self.op_outi_outd(op, mem, io),
            0xB0 | 0xB8 => self.op_ldir_lddr(op, mem),
            0xB1 | 0xB9 => self.op_cpir_cpdr(op, mem),
            0xB2 | 0xBA => self.op_inir_indr(op, mem, io),
            0xB3 | 0xBB => self.op_otir_otdr(op, mem, io),

            op if (op & 0xC7) == 0x40 => self.op_in_r_c(op, io),
            op if (op & 0xC7) == 0x41 => self.op_out_c_r(op, io),
            op if (op & 0xCF) == 0x42 => self.op_sbc_hl_rr(op),
            op if (op & 0xCF) == 0x43 => self.op_ld_nn_rr_ed(op, mem),
            op if (op & 0xC7) == 0x44 => self.op_neg(),
            op if (op & 0xC7) == 0x45 => self.op_retn(mem),
            op if (op & 0xC7) == 0x46 => self.op_im(op),
            op if (op & 0xCF) == 0x4A => self.op_adc_hl_rr(op),
            op if (op & 0xCF) == 0x4B => self.op_ld_rr_nn_ed(op, mem),

            // Undefined ED opcodes act as an 8T NOP.
            _ => 0,
        }
    }
}

impl InterruptSink for Z80 {
    fn request_interrupt(&mut self) {
        self.irq_pending = true;
    }

    fn request_nmi(&mut self) {
        self.nmi_pending = true;
    }
}

impl Cpu for Z80 {
    fn step(&mut self, mem: &mut dyn Memory, io: &mut dyn Io) -> u32 {
        Z80::step(self, mem, io)
    }

    /// Power-on/soft reset (`spec.md` §3): PC=0, SP=0xFFFF, I=0x3F (the ROM's
    /// IM 2 jump table is assembled at `(I<<8)|0xFF` = 0x3FFF), R=0,
    /// IFF1=IFF2=false, IM=0. Everything else is arbitrary but conventionally
    /// left at the all-ones pattern `new()` starts with.
    fn reset(&mut self) {
        *self = Z80::new();
    }

    fn is_halted(&self) -> bool {
        self.halted
    }
}

impl CpuStateTrait for Z80 {
    type Snapshot = Z80State;

    fn snapshot(&self) -> Z80State {
        Z80State {
            a: self.a,
            f: self.f,
            b: self.b,
            c: self.c,
            d: self.d,
            e: self.e,
            h: self.h,
            l: self.l,
            a_prime: self.a_prime,
            f_prime: self.f_prime,
            b_prime: self.b_prime,
            c_prime: self.c_prime,
            d_prime: self.d_prime,
            e_prime: self.e_prime,
            h_prime: self.h_prime,
            l_prime: self.l_prime,
            ix: self.ix,
            iy: self.iy,
            sp: self.sp,
            pc: self.pc,
            i: self.i,
            r: self.r,
            iff1: self.iff1,
            iff2: self.iff2,
            im: self.im,
            memptr: self.memptr,
            p: self.p,
            q: self.q,
        }
    }
}
