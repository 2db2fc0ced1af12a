//! CPU-facing port I/O (`spec.md` §6). Port 0xFE is the only port the core
//! guarantees; everything else reads as 0xFF and ignores writes.

/// CPU→host/ULA port access.
pub trait Io {
    fn read(&mut self, port: u16) -> u8;
    /// `tstates` is the CPU's running t-state counter at the moment of the
    /// write, used by the ULA to timestamp speaker-bit transitions.
    fn write(&mut self, port: u16, value: u8, tstates: u32);
}

/// A capability the CPU exposes so the ULA can raise interrupts on it
/// without holding a back-reference to the CPU itself (`spec.md` §9, Design
/// Notes: "No cyclic ownership").
pub trait InterruptSink {
    /// Latch a maskable interrupt request. Idempotent while already pending.
    fn request_interrupt(&mut self);
    /// Latch a non-maskable interrupt request (edge-triggered).
    fn request_nmi(&mut self);
}
