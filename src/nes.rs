use tracing::{debug, trace};

use crate::apu::Apu;
use crate::cartridge::Cartridge;
use crate::config::Config;
use crate::cpu::Cpu;
use crate::error::Result;
use crate::joypad::{Joypad, Pads};
use crate::mem_controller::MemController;
use crate::ppu::Ppu;
use crate::screen_buffer;

/// The console: CPU plus everything on its bus.
///
/// Each [`Nes::step`] emulates exactly one video frame and leaves its
/// picture and sound in [`Nes::output_pixels`] and [`Nes::output_samples`].
pub struct Nes {
    cpu: Cpu,
    board: MemController,
    frame: u64,
}

impl Nes {
    pub fn new(config: &Config, rom: &[u8]) -> Result<Self> {
        config.validate()?;
        let cartridge = Cartridge::new(rom)?;
        let board = MemController::new(
            Ppu::new(config),
            Apu::new(config)?,
            Pads::new(),
            cartridge.into_mapper(),
        );
        let mut nes = Self {
            cpu: Cpu::new(),
            board,
            frame: 0,
        };
        nes.reset();
        Ok(nes)
    }

    /// Power cycle. Every device installs its handlers over the CPU's
    /// default map, the cartridge last but for the pads.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.board.apu.reset(&mut self.cpu);
        self.board.ppu.reset(&mut self.cpu);
        self.board.mapper.reset(&mut self.cpu, &mut self.board.ppu);
        self.board.pads.reset(&mut self.cpu);
        self.cpu.boot(&mut self.board);
        self.frame = 0;
        debug!("nes reset");
    }

    /// Emulate one frame
    pub fn step(&mut self) {
        self.board.ppu.setup_frame(&mut self.cpu);
        self.cpu.run(&mut self.board);
        self.board.ppu.vsync(&mut self.cpu);
        self.board.apu.vsync(&self.cpu);
        self.cpu.vsync();
        self.board.mapper.vsync();
        self.frame += 1;
        trace!(frame = self.frame, "frame done");
    }

    /// Picture of the last frame, 256x240 0x00RRGGBB pixels
    pub fn output_pixels(&self) -> &[u32] {
        self.board.ppu.output_pixels()
    }

    /// Sound of the last frame
    pub fn output_samples(&self) -> &[i16] {
        self.board.apu.output()
    }

    pub fn pad_mut(&mut self, port: usize) -> &mut Joypad {
        self.board.pads.pad_mut(port)
    }

    /// Frames emulated since reset
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// 16-bit sum of the RGB bytes of the last frame
    pub fn video_checksum(&self) -> u16 {
        screen_buffer::checksum(self.output_pixels())
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// Read a byte the way the CPU would. Reads of I/O registers have their
    /// usual side effects.
    pub fn read_memory(&mut self, addr: u16) -> u8 {
        self.cpu.fetch(&mut self.board, addr)
    }
}
