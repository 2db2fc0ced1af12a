//! `Spectrum48`: wires `Memory48k` + `Z80` + `Ula` into the host-facing
//! `Machine` trait (`spec.md` §4.4, `core::machine::Machine`).
//!
//! This is the only place in the crate that sees all three components at
//! once — `Z80::step` depends only on `&mut dyn Memory`/`&mut dyn Io`, and
//! `Ula` is independent of `Memory48k`. Keeping the composition here, rather
//! than threading a bus object through the CPU as the teacher's arcade
//! machines do, is `SPEC_FULL.md` §2's redesign: a single video frame is one
//! `run_for` call, not a stream of per-T-state bus arbitrations.

use crate::core::machine::{InputButton, Machine};
use crate::cpu::Cpu;
use crate::cpu::z80::Z80;
use crate::error::CoreError;
use crate::memory::{Memory, Memory48k};
use crate::ula::{KEYBOARD_ROWS, SCREEN_HEIGHT, SCREEN_WIDTH, Ula};

/// T-states in one 50Hz PAL video frame (`spec.md` §3).
const TSTATES_PER_FRAME: u32 = 69_888;

/// The 40 keys of the Spectrum's matrix, flattened row-major into
/// `InputButton` IDs `row * 5 + column` for [`Machine::input_map`].
fn build_input_map() -> Vec<InputButton> {
    let mut buttons = Vec::with_capacity(40);
    for (row, keys) in KEYBOARD_ROWS.iter().enumerate() {
        for (col, name) in keys.iter().enumerate() {
            buttons.push(InputButton {
                id: (row * 5 + col) as u8,
                name,
            });
        }
    }
    buttons
}

/// A complete ZX Spectrum 48K: ROM+RAM, cycle-timed Z80, and ULA.
pub struct Spectrum48 {
    memory: Memory48k,
    cpu: Z80,
    ula: Ula,
    input_map: Vec<InputButton>,
}

impl Spectrum48 {
    pub fn new() -> Self {
        Self {
            memory: Memory48k::new(),
            cpu: Z80::new(),
            ula: Ula::new(),
            input_map: build_input_map(),
        }
    }

    /// Load the 16 KiB ROM image. Must be called before the first
    /// [`Machine::run_frame`] to get sensible behavior, though nothing
    /// prevents running with an all-zero ROM for CPU-only testing.
    pub fn load_rom(&mut self, bytes: &[u8]) -> Result<(), CoreError> {
        self.memory.load_rom(bytes)
    }

    pub fn memory(&self) -> &Memory48k {
        &self.memory
    }

    pub fn cpu(&self) -> &Z80 {
        &self.cpu
    }

    pub fn ula(&self) -> &Ula {
        &self.ula
    }
}

impl Default for Spectrum48 {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine for Spectrum48 {
    fn display_size(&self) -> (u32, u32) {
        (SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32)
    }

    /// Run one 69,888 T-state frame, then latch the maskable interrupt and
    /// advance FLASH timing (`spec.md` §4.4 host frame loop).
    fn run_frame(&mut self) {
        self.cpu.run_for(TSTATES_PER_FRAME, &mut self.memory, &mut self.ula);
        self.ula.on_frame_boundary(&mut self.cpu);
    }

    /// Decode the current video RAM into an RGBA32 buffer — 4 bytes per
    /// pixel (R, G, B, A), not the teacher's RGB24, since the Spectrum's
    /// attribute-driven palette has no natural alpha channel of its own and
    /// RGBA32 is what every host windowing surface this core targets expects.
    /// `buffer` must be at least `width * height * 4` bytes.
    fn render_frame(&self, buffer: &mut [u8]) {
        let mut pixels = [0u32; SCREEN_WIDTH * SCREEN_HEIGHT];
        self.ula
            .render(self.memory.bitmap_view(), self.memory.attribute_view(), &mut pixels);
        for (i, pixel) in pixels.iter().enumerate() {
            buffer[i * 4..i * 4 + 4].copy_from_slice(&pixel.to_le_bytes());
        }
    }

    /// `button` is `row * 5 + column` into the 8x5 keyboard matrix built by
    /// [`build_input_map`].
    fn set_input(&mut self, button: u8, pressed: bool) {
        let row = button / 5;
        let col = button % 5;
        if pressed {
            self.ula.press_key(row, col);
        } else {
            self.ula.release_key(row, col);
        }
    }

    fn input_map(&self) -> &[InputButton] {
        &self.input_map
    }

    /// Power-on/soft reset: resets the CPU and ULA latches, but leaves RAM
    /// (and therefore video memory) untouched (`spec.md` §3 Lifecycles).
    fn reset(&mut self) {
        self.cpu.reset();
        self.ula.reset();
    }
}
