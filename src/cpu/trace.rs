//! Typed, no-op-by-default opcode tracing (`spec.md` §9, Design Notes item 1:
//! replaces a duck-typed debug-hook closure with a trait the optimizer can
//! inline away entirely when the host doesn't care).

/// Invoked once per instruction fetch, before the opcode's effects are
/// applied. `opcode` is the first byte fetched (a prefix byte for
/// CB/ED/DD/FD-prefixed instructions, not the final opcode).
pub trait CpuTrace {
    fn on_fetch(&mut self, pc: u16, opcode: u8);
}

/// Default tracer: does nothing. `Z80::step` is generic over `CpuTrace`, so
/// a `NullTrace` call site compiles down to no code at all.
#[derive(Default)]
pub struct NullTrace;

impl CpuTrace for NullTrace {
    #[inline(always)]
    fn on_fetch(&mut self, _pc: u16, _opcode: u8) {}
}
