use tracing::debug;

use super::background::Background;
use super::memory::Memory;
use super::registers::{self, Mask, Registers};
use super::sprites::{OAM_ATTRIBUTE_MASK, Sprites};
use super::status::Status;
use super::timing::{SCANLINE_VBLANK, Timing};
use super::{CpuLink, RP2C02_CC, RP2C02_HVINT, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::cartridge::MirroringMode;
use crate::clock::{Clock, FOREVER_CLOCK};
use crate::config::Config;
use crate::cpu::{Cpu, Peek, Poke, PpuReg};
use crate::palette::PALETTE;

/// Lazily clocked PPU.
///
/// Nothing happens on its own: register accesses call [`Ppu::update`] to
/// catch up with the CPU first, and [`Ppu::vsync`] finishes the frame.
pub struct Ppu {
    pub(super) timing: Timing,
    pub(super) status: Status,
    pub(super) regs: Registers,
    pub(super) memory: Memory,
    pub(super) background: Background,
    pub(super) sprites: Sprites,
    /// Address on the PPU bus
    pub(super) io_addr: u16,
    /// Pattern address of the background tile being fetched, or the low
    /// plane byte of a sprite
    pub(super) io_pattern: u16,
    /// Pixels of the frame in progress, 0x00RRGGBB
    pub(super) output: Vec<u32>,
}

impl Ppu {
    pub fn new(config: &Config) -> Self {
        let sprite_limit = if config.sprite_limit { 8 } else { 32 };
        Self {
            timing: Timing::new(),
            status: Status::new(),
            regs: Registers::new(),
            memory: Memory::new(),
            background: Background::new(),
            sprites: Sprites::new(sprite_limit),
            io_addr: 0,
            io_pattern: 0,
            output: Vec::with_capacity(SCREEN_WIDTH * SCREEN_HEIGHT),
        }
    }

    /// Power-on state, and the $2000-$3FFF and $4014 handlers
    pub fn reset(&mut self, cpu: &mut Cpu) {
        self.timing.reset();
        self.status.reset();
        self.regs.reset();
        self.memory.reset();
        self.background.reset();
        self.sprites.reset();
        self.io_addr = 0;
        self.io_pattern = 0;
        self.output.clear();

        let registers = [
            (PpuReg::Latch, PpuReg::Ctrl),
            (PpuReg::Latch, PpuReg::Mask),
            (PpuReg::Status, PpuReg::Latch),
            (PpuReg::Latch, PpuReg::OamAddr),
            (PpuReg::OamData, PpuReg::OamData),
            (PpuReg::Latch, PpuReg::Scroll),
            (PpuReg::Latch, PpuReg::Addr),
            (PpuReg::Data, PpuReg::Data),
        ];
        for (offset, (peek, poke)) in registers.into_iter().enumerate() {
            cpu.add_mappings_step(
                0x2000 + offset as u16..=0x3fff,
                8,
                Peek::Ppu(peek),
                Poke::Ppu(poke),
            );
        }
        cpu.add_mappings(
            [0x3000],
            Peek::Ppu(PpuReg::SyncLatch),
            Poke::Ppu(PpuReg::Ctrl),
        );
        cpu.add_mappings(
            [0x4014],
            Peek::Ppu(PpuReg::OamDma),
            Poke::Ppu(PpuReg::OamDma),
        );
        debug!("ppu reset");
    }

    /// Hand over the cartridge's pattern tables
    pub fn set_pattern_memory(&mut self, chr: Vec<u8>, writable: bool) {
        self.memory.set_pattern_memory(chr, writable);
    }

    pub fn pattern_memory(&self) -> &[u8] {
        self.memory.pattern_memory()
    }

    pub fn pattern_memory_writable(&self) -> bool {
        self.memory.pattern_memory_writable()
    }

    pub fn set_mirroring(&mut self, mirroring: MirroringMode) {
        self.memory.set_mirroring(mirroring);
    }

    // ---------------------------------------------------------------------
    // frame

    /// Start a frame and tell the CPU where it ends
    pub fn setup_frame(&mut self, cpu: &mut Cpu) {
        self.output.clear();
        self.timing.odd_frame = !self.timing.odd_frame;
        let (vclk, hclk_target, frame_end) = self.timing.frame_start();
        self.timing.vclk = vclk;
        self.timing.hclk_target = hclk_target;
        cpu.set_next_frame_clock(frame_end);
    }

    /// Run to the end of the frame; short frames are padded with black
    pub fn vsync(&mut self, cpu: &mut Cpu) {
        if self.timing.hclk_target != FOREVER_CLOCK {
            self.timing.hclk_target = FOREVER_CLOCK;
            self.run(cpu);
        }
        self.output.resize(SCREEN_WIDTH * SCREEN_HEIGHT, PALETTE[0x0f]);
    }

    /// Catch up with master clock `elapsed`
    pub fn sync(&mut self, cpu: &mut Cpu, elapsed: Clock) {
        if self.timing.hclk_target < elapsed {
            self.timing.hclk_target = elapsed / RP2C02_CC - self.timing.vclk;
            self.run(cpu);
        }
    }

    /// Bring the CPU side up to date, then catch up with it plus
    /// `data_setup` clocks
    pub fn update<L: CpuLink + ?Sized>(&mut self, link: &mut L, data_setup: Clock) {
        let elapsed = link.update() + data_setup;
        self.sync(link.cpu(), elapsed);
    }

    /// Pixels of the last completed frame, 0x00RRGGBB
    pub fn output_pixels(&self) -> &[u32] {
        &self.output
    }

    // ---------------------------------------------------------------------
    // OAM DMA

    pub fn oam_address(&self) -> u8 {
        self.regs.oam_address
    }

    pub fn any_show(&self) -> bool {
        self.regs.mask.any_show()
    }

    pub fn read_oam(&self, addr: u8) -> u8 {
        self.sprites.read_oam(addr)
    }

    /// Copy a whole page into OAM at once
    pub fn oam_dma_page(&mut self, page: &[u8]) {
        self.sprites.dma(page);
        self.regs.io_latch = self.sprites.read_oam(0xff);
    }

    /// One byte of a cycle-by-cycle OAM DMA
    pub fn oam_dma_write(&mut self, data: u8) {
        self.write_oam(data);
    }

    // ---------------------------------------------------------------------
    // registers

    /// Read through a PPU handler
    pub fn peek<L: CpuLink + ?Sized>(&mut self, link: &mut L, reg: PpuReg) -> u8 {
        match reg {
            PpuReg::Status => self.peek_status(link),
            PpuReg::OamData => self.peek_oam_data(link),
            PpuReg::Data => self.peek_data(link),
            PpuReg::SyncLatch => {
                self.update(link, RP2C02_CC);
                self.regs.io_latch
            }
            PpuReg::OamDma => 0x40,
            _ => self.regs.io_latch,
        }
    }

    /// Write through a PPU handler. $4014 is handled by the bus, which can
    /// read memory for the transfer.
    pub fn poke<L: CpuLink + ?Sized>(&mut self, link: &mut L, reg: PpuReg, data: u8) {
        match reg {
            PpuReg::Ctrl => self.poke_control(link, data),
            PpuReg::Mask => self.poke_mask(link, data),
            PpuReg::OamAddr => {
                self.update(link, RP2C02_CC);
                self.regs.oam_address = data;
                self.regs.io_latch = data;
            }
            PpuReg::OamData => {
                self.update(link, RP2C02_CC);
                self.write_oam(data);
            }
            PpuReg::Scroll => {
                self.update(link, RP2C02_CC);
                if let Some(fine_x) = self.regs.write_scroll(data) {
                    self.background.set_fine_x(fine_x);
                }
            }
            PpuReg::Addr => {
                self.update(link, RP2C02_CC);
                self.regs.write_address(data);
            }
            PpuReg::Data => self.poke_data(link, data),
            PpuReg::Latch => self.regs.io_latch = data,
            PpuReg::Status | PpuReg::SyncLatch | PpuReg::OamDma => {}
        }
    }

    fn poke_control<L: CpuLink + ?Sized>(&mut self, link: &mut L, data: u8) {
        self.update(link, RP2C02_CC);
        let need_nmi_old = self.regs.write_control(data);
        // enabling NMI inside vertical blank raises it right away
        if self.regs.need_nmi && self.status.vblank && !need_nmi_old {
            let cpu = link.cpu();
            let clk = cpu.current_clock() + RP2C02_CC;
            if clk < RP2C02_HVINT {
                cpu.request_nmi(clk);
            }
        }
    }

    fn poke_mask<L: CpuLink + ?Sized>(&mut self, link: &mut L, data: u8) {
        self.update(link, RP2C02_CC);
        let old = self.regs.mask;
        self.regs.mask = Mask::from_bits(data);
        self.regs.io_latch = data;

        if old != self.regs.mask {
            if self.timing.hclk < 8 || self.timing.hclk >= 248 {
                self.update_enabled_flags_edge();
            } else {
                self.update_enabled_flags();
            }
            if old.any_show() && !self.regs.mask.any_show() {
                self.regs.update_name_io_addr();
            }
        }
        self.memory
            .set_coloring(registers::coloring(data), registers::emphasis(data));
    }

    fn peek_status<L: CpuLink + ?Sized>(&mut self, link: &mut L) -> u8 {
        self.update(link, RP2C02_CC);
        self.regs.io_latch = self.status.read(self.regs.io_latch);
        self.regs.scroll_toggle = false;
        self.regs.io_latch
    }

    fn peek_oam_data<L: CpuLink + ?Sized>(&mut self, link: &mut L) -> u8 {
        let cpu = link.cpu();
        let render_start = cpu.next_frame_clock() - (341 * 241) * RP2C02_CC;
        let outside_render =
            cpu.current_clock() - render_start >= (341 * 240) * RP2C02_CC;
        if !self.regs.mask.any_show() || outside_render {
            self.regs.io_latch = self.sprites.read_oam(self.regs.oam_address);
        } else {
            // rendering: the bus shows whatever the sprite scan last read
            self.update(link, RP2C02_CC);
            self.regs.io_latch = self.sprites.latch;
        }
        self.regs.io_latch
    }

    fn poke_data<L: CpuLink + ?Sized>(&mut self, link: &mut L, data: u8) {
        self.update(link, RP2C02_CC * 4);
        let addr = self.regs.vram_addr();
        self.regs.increment_vram_addr(self.active());
        self.regs.io_latch = data;
        if addr & 0x3f00 == 0x3f00 {
            self.memory.write_palette(addr, data);
        } else {
            let addr = addr & 0x3fff;
            if addr >= 0x2000 {
                self.memory.write_nametable(addr, data);
            } else {
                self.memory.write_chr(addr, data);
            }
        }
    }

    fn peek_data<L: CpuLink + ?Sized>(&mut self, link: &mut L) -> u8 {
        self.update(link, RP2C02_CC);
        let addr = self.regs.vram_addr() & 0x3fff;
        self.regs.increment_vram_addr(self.active());
        // palette reads skip the buffer; the buffer still loads the
        // nametable byte underneath
        self.regs.io_latch = if addr & 0x3f00 != 0x3f00 {
            self.regs.io_buffer
        } else {
            self.memory.read_palette(addr)
        };
        self.regs.io_buffer = if addr >= 0x2000 {
            self.memory.read_nametable(addr)
        } else {
            self.memory.read_chr(addr)
        };
        self.regs.io_latch
    }

    fn write_oam(&mut self, data: u8) {
        let data = self.oam_latch_mask(data);
        self.regs.io_latch = data;
        self.sprites.write_oam(self.regs.oam_address, data);
        self.regs.oam_address = self.regs.oam_address.wrapping_add(1);
    }

    /// Value an OAM write stores: 0xFF while rendering, the attribute byte
    /// without its unimplemented bits, anything else as is
    fn oam_latch_mask(&self, data: u8) -> u8 {
        if self.active() {
            0xff
        } else if self.regs.oam_address & 0x03 == 0x02 {
            data & OAM_ATTRIBUTE_MASK
        } else {
            data
        }
    }

    /// Rendering is on and the PPU is not in vertical blank
    fn active(&self) -> bool {
        self.timing.scanline != SCANLINE_VBLANK && self.regs.mask.any_show()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::CLK_1;
    use crate::ppu::{RP2C02_HVSYNC_0, RP2C02_HVSYNC_1};

    fn setup() -> (Ppu, Cpu) {
        let mut cpu = Cpu::new();
        let mut ppu = Ppu::new(&Config::default());
        ppu.reset(&mut cpu);
        (ppu, cpu)
    }

    fn run_frame(ppu: &mut Ppu, cpu: &mut Cpu) {
        ppu.setup_frame(cpu);
        ppu.vsync(cpu);
    }

    #[test]
    fn test_reset_maps_registers() {
        let (_, cpu) = setup();
        assert_eq!(cpu.peek_handler(0x2002), Peek::Ppu(PpuReg::Status));
        assert_eq!(cpu.peek_handler(0x3ffa), Peek::Ppu(PpuReg::Status));
        assert_eq!(cpu.poke_handler(0x2fff), Poke::Ppu(PpuReg::Data));
        assert_eq!(cpu.peek_handler(0x2000), Peek::Ppu(PpuReg::Latch));
        assert_eq!(cpu.peek_handler(0x3000), Peek::Ppu(PpuReg::SyncLatch));
        assert_eq!(cpu.poke_handler(0x3000), Poke::Ppu(PpuReg::Ctrl));
        assert_eq!(cpu.poke_handler(0x4014), Poke::Ppu(PpuReg::OamDma));
    }

    #[test]
    fn test_boot_frame_is_black() {
        let (mut ppu, mut cpu) = setup();
        run_frame(&mut ppu, &mut cpu);
        assert_eq!(ppu.output_pixels().len(), SCREEN_WIDTH * SCREEN_HEIGHT);
        assert!(ppu.output_pixels().iter().all(|&p| p == PALETTE[0x0f]));
        // vertical blank is up once the power-on frame is over
        assert!(ppu.status.vblank);
    }

    #[test]
    fn test_rendering_off_shows_backdrop() {
        let (mut ppu, mut cpu) = setup();
        run_frame(&mut ppu, &mut cpu);

        ppu.poke(&mut cpu, PpuReg::Addr, 0x3f);
        ppu.poke(&mut cpu, PpuReg::Addr, 0x00);
        ppu.poke(&mut cpu, PpuReg::Data, 0x21);
        ppu.poke(&mut cpu, PpuReg::Addr, 0x20);
        ppu.poke(&mut cpu, PpuReg::Addr, 0x00);

        run_frame(&mut ppu, &mut cpu);
        assert_eq!(ppu.output_pixels().len(), SCREEN_WIDTH * SCREEN_HEIGHT);
        assert!(ppu.output_pixels().iter().all(|&p| p == PALETTE[0x21]));
    }

    #[test]
    fn test_palette_address_in_v_picks_color() {
        let (mut ppu, mut cpu) = setup();
        run_frame(&mut ppu, &mut cpu);

        ppu.poke(&mut cpu, PpuReg::Addr, 0x3f);
        ppu.poke(&mut cpu, PpuReg::Addr, 0x05);
        ppu.poke(&mut cpu, PpuReg::Data, 0x16);
        ppu.poke(&mut cpu, PpuReg::Addr, 0x3f);
        ppu.poke(&mut cpu, PpuReg::Addr, 0x05);

        run_frame(&mut ppu, &mut cpu);
        assert!(ppu.output_pixels().iter().all(|&p| p == PALETTE[0x16]));
    }

    #[test]
    fn test_data_reads_are_buffered() {
        let (mut ppu, mut cpu) = setup();
        ppu.poke(&mut cpu, PpuReg::Addr, 0x20);
        ppu.poke(&mut cpu, PpuReg::Addr, 0x00);
        ppu.poke(&mut cpu, PpuReg::Data, 0x42);
        ppu.poke(&mut cpu, PpuReg::Data, 0x43);

        ppu.poke(&mut cpu, PpuReg::Addr, 0x20);
        ppu.poke(&mut cpu, PpuReg::Addr, 0x00);
        assert_eq!(ppu.peek(&mut cpu, PpuReg::Data), 0xe8);
        assert_eq!(ppu.peek(&mut cpu, PpuReg::Data), 0x42);
        assert_eq!(ppu.peek(&mut cpu, PpuReg::Data), 0x43);
    }

    #[test]
    fn test_palette_reads_are_immediate() {
        let (mut ppu, mut cpu) = setup();
        ppu.poke(&mut cpu, PpuReg::Addr, 0x3f);
        ppu.poke(&mut cpu, PpuReg::Addr, 0x01);
        ppu.poke(&mut cpu, PpuReg::Data, 0x2c);
        ppu.poke(&mut cpu, PpuReg::Addr, 0x3f);
        ppu.poke(&mut cpu, PpuReg::Addr, 0x01);
        assert_eq!(ppu.peek(&mut cpu, PpuReg::Data), 0x2c);
    }

    #[test]
    fn test_data_increment_32() {
        let (mut ppu, mut cpu) = setup();
        ppu.poke(&mut cpu, PpuReg::Ctrl, 0x04);
        ppu.poke(&mut cpu, PpuReg::Addr, 0x20);
        ppu.poke(&mut cpu, PpuReg::Addr, 0x00);
        ppu.poke(&mut cpu, PpuReg::Data, 0x11);
        ppu.poke(&mut cpu, PpuReg::Data, 0x22);
        assert_eq!(ppu.memory.read_nametable(0x2000), 0x11);
        assert_eq!(ppu.memory.read_nametable(0x2020), 0x22);
    }

    #[test]
    fn test_status_read_clears_vblank_and_toggle() {
        let (mut ppu, mut cpu) = setup();
        run_frame(&mut ppu, &mut cpu);
        ppu.poke(&mut cpu, PpuReg::Scroll, 0x10);
        assert!(ppu.regs.scroll_toggle);

        ppu.poke(&mut cpu, PpuReg::Latch, 0x1f);
        assert_eq!(ppu.peek(&mut cpu, PpuReg::Status), 0x9f);
        assert!(!ppu.regs.scroll_toggle);
        assert_eq!(ppu.peek(&mut cpu, PpuReg::Status) & 0x80, 0);
    }

    #[test]
    fn test_write_only_registers_return_latch() {
        let (mut ppu, mut cpu) = setup();
        ppu.poke(&mut cpu, PpuReg::Ctrl, 0x5a);
        assert_eq!(ppu.peek(&mut cpu, PpuReg::Latch), 0x5a);
        assert_eq!(ppu.peek(&mut cpu, PpuReg::OamDma), 0x40);
    }

    #[test]
    fn test_oam_data_writes() {
        let (mut ppu, mut cpu) = setup();
        ppu.poke(&mut cpu, PpuReg::OamAddr, 0x10);
        for data in [0x20, 0x01, 0xff, 0x30] {
            ppu.poke(&mut cpu, PpuReg::OamData, data);
        }
        assert_eq!(ppu.oam_address(), 0x14);
        assert_eq!(ppu.sprites.read_oam(0x12), OAM_ATTRIBUTE_MASK);

        ppu.poke(&mut cpu, PpuReg::OamAddr, 0x11);
        assert_eq!(ppu.peek(&mut cpu, PpuReg::OamData), 0x01);
        // reads do not advance the address
        assert_eq!(ppu.oam_address(), 0x11);
    }

    #[test]
    fn test_oam_address_wraps() {
        let (mut ppu, mut cpu) = setup();
        ppu.poke(&mut cpu, PpuReg::OamAddr, 0xff);
        ppu.poke(&mut cpu, PpuReg::OamData, 0x77);
        assert_eq!(ppu.oam_address(), 0x00);
        assert_eq!(ppu.sprites.read_oam(0xff), 0x77);
    }

    #[test]
    fn test_oam_dma_page() {
        let (mut ppu, _) = setup();
        let page: Vec<u8> = (0..=255).collect();
        ppu.oam_dma_page(&page);
        assert_eq!(ppu.sprites.read_oam(0x01), 0x01);
        assert_eq!(ppu.sprites.read_oam(0x02), 0x02 & OAM_ATTRIBUTE_MASK);
        assert_eq!(ppu.regs.io_latch, 0xff);
    }

    #[test]
    fn test_nmi_at_vblank() {
        let (mut ppu, mut cpu) = setup();
        ppu.poke(&mut cpu, PpuReg::Ctrl, 0x80);
        run_frame(&mut ppu, &mut cpu);
        assert_eq!(cpu.scheduled_nmi(), None);

        run_frame(&mut ppu, &mut cpu);
        assert_eq!(
            cpu.scheduled_nmi(),
            Some(RP2C02_HVSYNC_0 + CLK_1 + CLK_1 / 2)
        );
    }

    #[test]
    fn test_no_nmi_when_disabled() {
        let (mut ppu, mut cpu) = setup();
        run_frame(&mut ppu, &mut cpu);
        run_frame(&mut ppu, &mut cpu);
        assert_eq!(cpu.scheduled_nmi(), None);
        assert!(ppu.status.vblank);
    }

    #[test]
    fn test_odd_frame_is_one_dot_short_with_rendering() {
        let (mut ppu, mut cpu) = setup();
        ppu.poke(&mut cpu, PpuReg::Mask, 0x08);
        run_frame(&mut ppu, &mut cpu);
        run_frame(&mut ppu, &mut cpu);
        assert_eq!(cpu.next_frame_clock(), RP2C02_HVSYNC_0);
        run_frame(&mut ppu, &mut cpu);
        assert_eq!(cpu.next_frame_clock(), RP2C02_HVSYNC_1);
    }

    #[test]
    fn test_odd_frame_full_length_without_rendering() {
        let (mut ppu, mut cpu) = setup();
        for _ in 0..3 {
            run_frame(&mut ppu, &mut cpu);
            assert_ne!(cpu.next_frame_clock(), RP2C02_HVSYNC_1);
        }
    }

    /// Solid background everywhere and one solid sprite 0 at (16, 16)
    fn sprite_zero_scene(ppu: &mut Ppu, cpu: &mut Cpu, mask: u8) {
        let mut chr = vec![0; 0x2000];
        chr[0x10..0x18].fill(0xff);
        chr[0xff0..0xff8].fill(0xff);
        ppu.set_pattern_memory(chr, false);
        ppu.poke(cpu, PpuReg::OamAddr, 0);
        for data in [0x10, 0x01, 0x00, 0x10] {
            ppu.poke(cpu, PpuReg::OamData, data);
        }
        ppu.poke(cpu, PpuReg::Mask, mask);
    }

    #[test]
    fn test_sprite_zero_hit() {
        let (mut ppu, mut cpu) = setup();
        sprite_zero_scene(&mut ppu, &mut cpu, 0x1e);
        run_frame(&mut ppu, &mut cpu);
        assert!(!ppu.status.sprite_zero_hit);
        run_frame(&mut ppu, &mut cpu);
        assert!(ppu.status.sprite_zero_hit);
        assert_eq!(ppu.peek(&mut cpu, PpuReg::Status) & 0x40, 0x40);
    }

    #[test]
    fn test_no_sprite_zero_hit_without_background() {
        let (mut ppu, mut cpu) = setup();
        sprite_zero_scene(&mut ppu, &mut cpu, 0x14);
        run_frame(&mut ppu, &mut cpu);
        run_frame(&mut ppu, &mut cpu);
        assert!(!ppu.status.sprite_zero_hit);
        // the sprite is drawn over the backdrop
        let sprite_color = ppu.memory.color(0x11);
        let row = 17 * SCREEN_WIDTH;
        assert!(ppu.output_pixels()[row + 16..row + 24].iter().all(|&p| p == sprite_color));
    }

    #[test]
    fn test_sync_runs_to_clock() {
        let (mut ppu, mut cpu) = setup();
        run_frame(&mut ppu, &mut cpu);
        ppu.setup_frame(&mut cpu);

        // into the second visible line
        let clk = RP2C02_HVINT + (341 + 341 + 100) * RP2C02_CC;
        ppu.sync(&mut cpu, clk);
        assert_eq!(ppu.timing.scanline, 1);
        assert_eq!(ppu.output_pixels().len(), 256 + 100);

        // earlier clocks are a no-op
        ppu.sync(&mut cpu, clk - RP2C02_CC);
        assert_eq!(ppu.output_pixels().len(), 256 + 100);

        ppu.vsync(&mut cpu);
        assert_eq!(ppu.output_pixels().len(), SCREEN_WIDTH * SCREEN_HEIGHT);
    }

    #[test]
    fn test_stepped_sync_matches_whole_frame() {
        for step in [1, 7, 12] {
            let (mut whole, mut whole_cpu) = setup();
            let (mut stepped, mut stepped_cpu) = setup();
            sprite_zero_scene(&mut whole, &mut whole_cpu, 0x1e);
            sprite_zero_scene(&mut stepped, &mut stepped_cpu, 0x1e);

            for frame in 0..3 {
                run_frame(&mut whole, &mut whole_cpu);

                stepped.setup_frame(&mut stepped_cpu);
                let frame_end = stepped_cpu.next_frame_clock();
                let mut clk = 0;
                while clk < frame_end {
                    clk += step * RP2C02_CC;
                    stepped.sync(&mut stepped_cpu, clk.min(frame_end));
                }
                stepped.vsync(&mut stepped_cpu);

                assert!(
                    whole.output_pixels() == stepped.output_pixels(),
                    "step {} frame {}: pixels differ",
                    step,
                    frame
                );
                assert_eq!(whole.timing.scanline, stepped.timing.scanline);
                assert_eq!(whole.timing.hclk, stepped.timing.hclk);
                assert_eq!(
                    whole.peek(&mut whole_cpu, PpuReg::Status),
                    stepped.peek(&mut stepped_cpu, PpuReg::Status),
                    "step {} frame {}",
                    step,
                    frame
                );
            }
            assert!(stepped.status.sprite_zero_hit);
        }
    }
}
