//! The Sinclair ULA: border/speaker/mic/keyboard port 0xFE, the maskable
//! interrupt generator, and video decoding (`spec.md` §3, §4.3).
//!
//! Unlike the teacher's bus-arbitrated devices, the ULA here is driven once
//! per video frame rather than once per T-state: the host calls
//! [`Ula::on_frame_boundary`] after [`crate::cpu::z80::Z80::run_for`] completes
//! 69,888 T-states, then [`Ula::render`] to decode the framebuffer. Per-T-state
//! memory contention and the floating-bus/"snow" effect are out of scope
//! (`spec.md` §9 Non-goals) — this ULA has no beam position to consult.

use crate::io::{InterruptSink, Io};

/// Visible display area, in pixels.
pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 192;
const SCREEN_PIXELS: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

const BITMAP_SIZE: usize = 6144;
const ATTR_SIZE: usize = 768;

/// Frames between FLASH phase toggles (~320ms at 50Hz).
const FLASH_FRAME_COUNT: u32 = 16;

/// Capacity of the speaker-event ring buffer before the oldest entry is
/// dropped (`spec.md` §7: speaker buffer overflow is non-fatal).
const SPEAKER_BUFFER_CAPACITY: usize = 1024;

/// RGB triples for ink/paper indices 0-7 (normal) and 8-15 (BRIGHT), alpha
/// channel filled in separately by [`Ula::render`]. Grounded on the
/// `PALETTE` table used by the `emu198x`/`sinclair-ula` Spectrum ULA crates.
const PALETTE: [(u8, u8, u8); 16] = [
    (0x00, 0x00, 0x00),
    (0x00, 0x00, 0xC0),
    (0xC0, 0x00, 0x00),
    (0xC0, 0x00, 0xC0),
    (0x00, 0xC0, 0x00),
    (0x00, 0xC0, 0xC0),
    (0xC0, 0xC0, 0x00),
    (0xC0, 0xC0, 0xC0),
    (0x00, 0x00, 0x00),
    (0x00, 0x00, 0xFF),
    (0xFF, 0x00, 0x00),
    (0xFF, 0x00, 0xFF),
    (0x00, 0xFF, 0x00),
    (0x00, 0xFF, 0xFF),
    (0xFF, 0xFF, 0x00),
    (0xFF, 0xFF, 0xFF),
];

/// Keyboard matrix rows, indexed by which high-address bit (A8-A15) selects
/// them (`spec.md` §6). Each row holds 5 keys, bit 0 = leftmost column.
pub const KEYBOARD_ROWS: [[&str; 5]; 8] = [
    ["Caps Shift", "Z", "X", "C", "V"],
    ["A", "S", "D", "F", "G"],
    ["Q", "W", "E", "R", "T"],
    ["1", "2", "3", "4", "5"],
    ["0", "9", "8", "7", "6"],
    ["P", "O", "I", "U", "Y"],
    ["Enter", "L", "K", "J", "H"],
    ["Space", "Sym Shift", "M", "N", "B"],
];

/// A `(t-state, speaker level)` sample, timestamped against
/// [`crate::cpu::z80::Z80::tstates`] for host audio resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeakerEvent {
    pub tstate: u64,
    pub level: bool,
}

/// The Spectrum 48K ULA: port 0xFE, interrupt generation, FLASH timing, and
/// video decoding. Holds no reference to memory — [`Ula::render`] is handed
/// the bitmap/attribute windows explicitly, keeping this struct independent
/// of any particular `Memory` implementation.
pub struct Ula {
    border: u8,
    speaker: bool,
    mic: bool,
    /// 8 rows x 5 keys, active-low (`true` = pressed) for readability; port
    /// reads invert this back to the real hardware's active-low convention.
    keys: [[bool; 5]; 8],
    flash_phase: bool,
    flash_counter: u32,
    frame_counter: u64,
    interrupt_pending: bool,
    speaker_log: std::collections::VecDeque<SpeakerEvent>,
}

impl Ula {
    pub fn new() -> Self {
        Self {
            border: 0,
            speaker: false,
            mic: false,
            keys: [[false; 5]; 8],
            flash_phase: false,
            flash_counter: 0,
            frame_counter: 0,
            interrupt_pending: false,
            speaker_log: std::collections::VecDeque::with_capacity(SPEAKER_BUFFER_CAPACITY),
        }
    }

    /// Reset ULA state without touching RAM/video memory (`spec.md` §3
    /// Lifecycles — the caller owns the bitmap/attribute bytes, the ULA only
    /// owns its own latches).
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn border(&self) -> u8 {
        self.border
    }

    /// Port 0xFE write: bits 0-2 border, bit 3 mic, bit 4 speaker.
    pub fn write_port(&mut self, value: u8, tstate: u64) {
        self.border = value & 0x07;
        self.mic = (value >> 3) & 1 != 0;
        let level = (value >> 4) & 1 != 0;
        if level != self.speaker {
            self.speaker = level;
            if self.speaker_log.len() == SPEAKER_BUFFER_CAPACITY {
                self.speaker_log.pop_front();
            }
            self.speaker_log.push_back(SpeakerEvent { tstate, level });
        }
    }

    /// Port 0xFE read: AND of the keyboard rows selected by the high byte of
    /// the requesting address (`addr_high` = bits A15-A8, 0 selects a row).
    /// Bits 5 and 7 always read 1; bit 6 carries the EAR input, which this
    /// core has no tape deck to drive, so it is fixed at 1 (`spec.md` §9).
    pub fn read_port(&self, addr_high: u8) -> u8 {
        let mut bits = 0x1Fu8;
        for row in 0..8 {
            if addr_high & (1 << row) == 0 {
                bits &= self.row_bits(row);
            }
        }
        (bits & 0x1F) | 0xE0
    }

    fn row_bits(&self, row: usize) -> u8 {
        let mut bits = 0x1Fu8;
        for (i, &pressed) in self.keys[row].iter().enumerate() {
            if pressed {
                bits &= !(1 << i);
            }
        }
        bits
    }

    /// Mark a key pressed. Out-of-range `row`/`bit` is silently ignored
    /// (`spec.md` §7). Idempotent.
    pub fn press_key(&mut self, row: u8, bit: u8) {
        if let Some(r) = self.keys.get_mut(row as usize) {
            if let Some(k) = r.get_mut(bit as usize) {
                *k = true;
            }
        }
    }

    /// Mark a key released. Out-of-range is silently ignored. Idempotent.
    pub fn release_key(&mut self, row: u8, bit: u8) {
        if let Some(r) = self.keys.get_mut(row as usize) {
            if let Some(k) = r.get_mut(bit as usize) {
                *k = false;
            }
        }
    }

    /// Drain accumulated speaker transitions since the last call. Intended
    /// for a host audio backend; the ring buffer silently drops the oldest
    /// entry once full rather than growing unbounded.
    pub fn take_speaker_events(&mut self) -> Vec<SpeakerEvent> {
        self.speaker_log.drain(..).collect()
    }

    /// Called once every 69,888 T-states: raises the maskable interrupt,
    /// advances the frame counter, and toggles FLASH every 16 frames.
    pub fn on_frame_boundary(&mut self, interrupts: &mut dyn InterruptSink) {
        interrupts.request_interrupt();
        self.interrupt_pending = true;
        self.frame_counter = self.frame_counter.wrapping_add(1);
        self.flash_counter += 1;
        if self.flash_counter >= FLASH_FRAME_COUNT {
            self.flash_counter = 0;
            self.flash_phase = !self.flash_phase;
        }
        log::trace!(
            "frame {} complete, flash={}",
            self.frame_counter,
            self.flash_phase
        );
    }

    /// Cleared once the CPU has actually serviced the interrupt (so a host
    /// can distinguish "raised this frame" from "still unacknowledged").
    pub fn acknowledge_interrupt(&mut self) {
        self.interrupt_pending = false;
    }

    pub fn interrupt_pending(&self) -> bool {
        self.interrupt_pending
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Decode the bitmap+attribute windows into an RGBA32 framebuffer
    /// (`spec.md` §4.3, §6). `out` is row-major, 256x192.
    pub fn render(
        &self,
        bitmap: &[u8; BITMAP_SIZE],
        attrs: &[u8; ATTR_SIZE],
        out: &mut [u32; SCREEN_PIXELS],
    ) {
        for y in 0..SCREEN_HEIGHT {
            let row_base = bitmap_row_offset(y as u16);
            for col in 0..32usize {
                let byte = bitmap[row_base + col];
                let attr = attrs[(y / 8) * 32 + col];

                let ink = attr & 0x07;
                let paper = (attr >> 3) & 0x07;
                let bright = (attr & 0x40) != 0;
                let flash = (attr & 0x80) != 0;

                let (fg, bg) = if flash && self.flash_phase {
                    (paper, ink)
                } else {
                    (ink, paper)
                };
                let offset = if bright { 8 } else { 0 };
                let fg_rgb = PALETTE[(fg + offset) as usize];
                let bg_rgb = PALETTE[(bg + offset) as usize];

                for bit in 0..8usize {
                    let set = (byte >> (7 - bit)) & 1 != 0;
                    let (r, g, b) = if set { fg_rgb } else { bg_rgb };
                    out[y * SCREEN_WIDTH + col * 8 + bit] = pack_rgba(r, g, b);
                }
            }
        }
    }
}

impl Default for Ula {
    fn default() -> Self {
        Self::new()
    }
}

/// The ULA is the only device on the I/O bus this core models: it decodes
/// port 0xFE off the low address byte (real hardware ignores A1-A7) and
/// leaves every other port floating at 0xFF, matching `spec.md` §6's "no
/// other peripherals" stance.
impl Io for Ula {
    fn read(&mut self, port: u16) -> u8 {
        if port & 0x00FF == 0x00FE {
            self.read_port((port >> 8) as u8)
        } else {
            0xFF
        }
    }

    fn write(&mut self, port: u16, value: u8, tstates: u32) {
        if port & 0x00FF == 0x00FE {
            self.write_port(value, tstates as u64);
        }
    }
}

/// Bitmap byte offset (within the 6144-byte bitmap window) of character
/// column 0 on pixel row `y`: `((y&7)<<8) | ((y&0x38)<<2) | ((y&0xC0)<<5)`.
fn bitmap_row_offset(y: u16) -> usize {
    ((y & 0x07) << 8 | (y & 0x38) << 2 | (y & 0xC0) << 5) as usize
}

fn pack_rgba(r: u8, g: u8, b: u8) -> u32 {
    u32::from_le_bytes([r, g, b, 0xFF])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::InterruptSink;

    #[test]
    fn io_forwards_only_port_0xfe() {
        let mut ula = Ula::new();
        Io::write(&mut ula, 0x7FFE, 0x03, 0);
        assert_eq!(ula.border(), 3);
        Io::write(&mut ula, 0x1234, 0xFF, 0);
        assert_eq!(ula.border(), 3);
        assert_eq!(Io::read(&mut ula, 0x1234), 0xFF);
    }

    struct RecordingSink {
        interrupt: bool,
    }

    impl InterruptSink for RecordingSink {
        fn request_interrupt(&mut self) {
            self.interrupt = true;
        }
        fn request_nmi(&mut self) {}
    }

    #[test]
    fn border_write_and_speaker_edge_detect() {
        let mut ula = Ula::new();
        ula.write_port(0x02, 0);
        assert_eq!(ula.border(), 2);
        ula.write_port(0x07, 1);
        assert_eq!(ula.border(), 7);

        ula.write_port(0x10, 100);
        let events = ula.take_speaker_events();
        assert_eq!(events, vec![SpeakerEvent { tstate: 100, level: true }]);

        // Writing the same speaker bit again doesn't log a second event.
        ula.write_port(0x10, 200);
        assert!(ula.take_speaker_events().is_empty());
    }

    #[test]
    fn keyboard_row_and_bit_select() {
        let mut ula = Ula::new();
        // Row 0xFE = Caps/Z/X/C/V; press 'X' (bit 2).
        ula.press_key(0, 2);
        // Selecting row 0 (A8=0, all other bits set -> addr_high = 0xFE).
        let result = ula.read_port(0xFE);
        assert_eq!(result & 0x1F, 0b1_1011);
        ula.release_key(0, 2);
        assert_eq!(ula.read_port(0xFE) & 0x1F, 0x1F);
    }

    #[test]
    fn keyboard_out_of_range_is_ignored() {
        let mut ula = Ula::new();
        ula.press_key(8, 0);
        ula.press_key(0, 5);
        assert_eq!(ula.read_port(0xFE), 0xFF);
    }

    #[test]
    fn frame_boundary_raises_interrupt_and_toggles_flash() {
        let mut ula = Ula::new();
        let mut sink = RecordingSink { interrupt: false };
        for _ in 0..15 {
            ula.on_frame_boundary(&mut sink);
        }
        assert!(sink.interrupt);
        assert_eq!(ula.frame_counter(), 15);

        sink.interrupt = false;
        ula.on_frame_boundary(&mut sink);
        assert_eq!(ula.frame_counter(), 16);
    }

    #[test]
    fn render_decodes_solid_ink_block() {
        let ula = Ula::new();
        let bitmap = [0xFFu8; BITMAP_SIZE];
        let mut attrs = [0u8; ATTR_SIZE];
        attrs[0] = 0x07; // ink=7 (white), paper=0 (black), not bright
        let mut out = [0u32; SCREEN_PIXELS];
        ula.render(&bitmap, &attrs, &mut out);
        assert_eq!(out[0], pack_rgba(0xC0, 0xC0, 0xC0));
    }

    #[test]
    fn speaker_buffer_drops_oldest_when_full() {
        let mut ula = Ula::new();
        for i in 0..(SPEAKER_BUFFER_CAPACITY as u64 + 10) {
            ula.write_port(if i % 2 == 0 { 0x10 } else { 0x00 }, i);
        }
        let events = ula.take_speaker_events();
        assert_eq!(events.len(), SPEAKER_BUFFER_CAPACITY);
        assert!(events[0].tstate >= 10);
    }
}
