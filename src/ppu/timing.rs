use tracing::trace;

use super::{Ppu, RP2C02_CC, RP2C02_HVINT, RP2C02_HVSYNC_0, RP2C02_HVSYNC_1, RP2C02_HVSYNCBOOT};
use crate::clock::{Clock, FOREVER_CLOCK};
use crate::cpu::Cpu;

/// Scanline number of the pre-render line
pub const SCANLINE_HDUMMY: i32 = -1;
/// Scanline number of the post-render line
pub const SCANLINE_VBLANK: i32 = 240;

/// First dot of the pre-render line. Its 320 fetch dots run as 341-659 so
/// that the walk reaches dot 320 of the next visible line.
const HCLOCK_DUMMY: Clock = 341;
const HCLOCK_VBLANK_0: Clock = 681;
const HCLOCK_VBLANK_1: Clock = 682;
const HCLOCK_VBLANK_2: Clock = 684;
const HCLOCK_BOOT: Clock = 685;

/// Frame start state: (vclk, hclk_target, CPU frame end)
const DUMMY_FRAME: (Clock, Clock, Clock) = (
    RP2C02_HVINT / RP2C02_CC - HCLOCK_DUMMY,
    RP2C02_HVINT,
    RP2C02_HVSYNC_0,
);
const BOOT_FRAME: (Clock, Clock, Clock) = (
    RP2C02_HVSYNCBOOT / RP2C02_CC - HCLOCK_BOOT,
    RP2C02_HVSYNCBOOT,
    RP2C02_HVSYNCBOOT,
);

/// How a dot handler hands control back to the run loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    /// Stop here if the target has been reached
    Dot,
    /// As `Dot`, but the target is checked once more on resume
    TwoChecks,
    /// The frame is complete
    Frame,
}

/// Where the PPU stands in the frame.
///
/// `hclk` is the resume point of the scanline walk; every dot handler is
/// keyed by it. Between runs `hclk_target` is a master clock (the CPU time
/// up to which the PPU is current); while running it counts dots from
/// `vclk`.
pub struct Timing {
    pub hclk: Clock,
    /// Dots elapsed before the current line
    pub vclk: Clock,
    pub hclk_target: Clock,
    pub scanline: i32,
    pub odd_frame: bool,
    /// Suspended between the two checks of a `TwoChecks` wait
    zero_wait: bool,
}

impl Timing {
    pub fn new() -> Self {
        Self {
            hclk: HCLOCK_BOOT,
            vclk: 0,
            hclk_target: FOREVER_CLOCK,
            scanline: SCANLINE_VBLANK,
            odd_frame: false,
            zero_wait: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// (vclk, hclk_target, CPU frame end) for the frame about to start
    pub fn frame_start(&self) -> (Clock, Clock, Clock) {
        if self.hclk == HCLOCK_DUMMY {
            DUMMY_FRAME
        } else {
            BOOT_FRAME
        }
    }

    /// Master clock the PPU has reached
    pub fn current_clock(&self) -> Clock {
        (self.vclk + self.hclk) * RP2C02_CC
    }
}

impl Ppu {
    /// Walk the scanline state machine up to `hclk_target`, or to the end
    /// of the frame.
    pub(super) fn run(&mut self, cpu: &mut Cpu) {
        trace!(
            scanline = self.timing.scanline,
            hclk = %clock_label(self.timing.hclk),
            target = %clock_label(self.timing.hclk_target),
            "ppu run"
        );
        self.make_sure_invariants();
        if !self.resume(cpu) {
            self.timing.hclk_target = self.timing.current_clock();
        }
    }

    /// Returns true once the frame completes
    fn resume(&mut self, cpu: &mut Cpu) -> bool {
        if std::mem::take(&mut self.timing.zero_wait)
            && self.timing.hclk_target <= self.timing.hclk
        {
            return false;
        }
        loop {
            let wait = self.step(cpu);
            if wait == Wait::Frame {
                return true;
            }
            if self.timing.hclk_target <= self.timing.hclk {
                self.timing.zero_wait = wait == Wait::TwoChecks;
                return false;
            }
        }
    }

    /// Cached values derived from the scroll address and the bus
    fn make_sure_invariants(&mut self) {
        self.regs.update_name_io_addr();
        let attr = self.memory.attribute_at(self.io_addr, self.regs.vram_addr());
        self.background.set_fetched_attr(attr);
    }

    fn step(&mut self, cpu: &mut Cpu) -> Wait {
        let hclk = self.timing.hclk;
        match hclk {
            0..=255 => {
                self.visible_dot(hclk);
                Wait::Dot
            }
            256..=319 => {
                self.sprite_fetch_dot(hclk);
                Wait::Dot
            }
            320..=338 => {
                self.line_end_dot(cpu, hclk);
                Wait::Dot
            }
            341..=595 => {
                self.prerender_background_dot(hclk);
                Wait::Dot
            }
            597..=659 => self.prerender_sprite_dot(hclk),
            HCLOCK_VBLANK_0 => {
                self.status.vblanking = true;
                self.timing.hclk = HCLOCK_VBLANK_1;
                Wait::Dot
            }
            HCLOCK_VBLANK_1 => {
                self.status.settle_vblank();
                self.sprites.visible = false;
                self.sprites.active = false;
                self.timing.hclk = HCLOCK_VBLANK_2;
                Wait::Dot
            }
            HCLOCK_VBLANK_2 => {
                self.status.settle_vblank();
                self.timing.hclk = HCLOCK_DUMMY;
                self.timing.hclk_target = FOREVER_CLOCK;
                if self.regs.need_nmi && self.status.vblank {
                    cpu.request_nmi(cpu.next_frame_clock());
                }
                Wait::Frame
            }
            HCLOCK_BOOT => {
                self.status.vblank = true;
                self.timing.hclk = HCLOCK_DUMMY;
                self.timing.hclk_target = FOREVER_CLOCK;
                Wait::Frame
            }
            _ => unreachable!("ppu: no handler for dot {hclk}"),
        }
    }

    /// Dots 0-255 of a visible line: background fetches, sprite
    /// evaluation from dot 64 and one output pixel each
    fn visible_dot(&mut self, hclk: Clock) {
        let show = self.regs.mask.any_show();
        let evaluating = hclk >= 64;
        if show {
            match hclk % 8 {
                0 => {
                    if hclk == 64 {
                        self.sprites.start_evaluation(self.regs.oam_address);
                    }
                    self.background.load();
                    if evaluating {
                        self.sprites.evaluate_even();
                    }
                    self.open_name();
                }
                1 => {
                    self.fetch_name();
                    if evaluating {
                        self.evaluate_sprites_odd();
                    }
                }
                2 => {
                    if evaluating {
                        self.sprites.evaluate_even();
                    }
                    self.open_attr();
                }
                3 => {
                    self.background.latch_attr();
                    if evaluating {
                        self.evaluate_sprites_odd();
                    }
                    if hclk == 251 {
                        self.regs.scroll_clock_y();
                    }
                    self.regs.scroll_clock_x();
                }
                4 => {
                    if evaluating {
                        self.sprites.evaluate_even();
                    }
                    self.open_pattern(self.io_pattern);
                }
                5 => {
                    self.fetch_bg_pattern_low();
                    if evaluating {
                        self.evaluate_sprites_odd();
                    }
                }
                6 => {
                    if evaluating {
                        self.sprites.evaluate_even();
                    }
                    self.open_pattern(self.io_pattern | 8);
                }
                _ => {
                    self.fetch_bg_pattern_high();
                    if evaluating {
                        self.evaluate_sprites_odd();
                    }
                }
            }
        }
        self.render_pixel(hclk as usize);
        if show && hclk % 8 == 7 && hclk != 255 {
            self.update_enabled_flags();
        }
        self.timing.hclk += 1;
    }

    /// Dots 256-319: pattern fetches for the sprites found on this line
    fn sprite_fetch_dot(&mut self, hclk: Clock) {
        let show = self.regs.mask.any_show();
        let buffered = self.sprites.buffered();
        match (hclk - 256) % 8 {
            0 => {
                self.open_name();
                if hclk == 256 {
                    if show {
                        self.sprites.latch = 0xff;
                    }
                    self.timing.hclk += 1;
                } else {
                    self.timing.hclk += 2;
                }
            }
            1 => {
                self.scroll_reset_x();
                self.sprites.visible = false;
                self.sprites.active = false;
                self.timing.hclk += 1;
            }
            2 => {
                self.open_attr();
                self.timing.hclk += 2;
            }
            4 => {
                if show {
                    let idx = ((hclk - 260) / 2) as usize;
                    let addr = if idx >= buffered {
                        self.regs.pattern_end
                    } else {
                        self.sprites.pattern_addr(
                            idx,
                            self.timing.scanline,
                            self.regs.sp_height,
                            self.regs.sp_base,
                        )
                    };
                    self.open_pattern(addr);
                    if hclk == 316 && self.timing.scanline == 238 {
                        self.regs.oam_address = 0;
                    }
                }
                self.timing.hclk += 1;
            }
            5 => {
                if show && (((hclk - 261) / 2) as usize) < buffered {
                    self.io_pattern = self.memory.read_chr(self.io_addr) as u16;
                }
                self.timing.hclk += 1;
            }
            6 => {
                self.open_pattern(self.io_addr | 8);
                self.timing.hclk += 1;
            }
            _ => {
                if show {
                    let idx = ((hclk - 263) / 2) as usize;
                    if idx < buffered {
                        let pat0 = self.io_pattern as u8;
                        let pat1 = self.memory.read_chr(self.io_addr);
                        if pat0 != 0 || pat1 != 0 {
                            self.sprites.load(pat0, pat1, idx);
                        }
                    }
                }
                self.timing.hclk += 1;
            }
        }
    }

    /// Dots 320-340: first two tiles of the next line, then on to it
    fn line_end_dot(&mut self, cpu: &mut Cpu, hclk: Clock) {
        match hclk {
            320 => {
                self.load_extended_sprites();
                self.open_name();
                if self.regs.mask.any_show() {
                    self.sprites.latch = self.sprites.read_oam(0);
                }
                self.sprites.begin_line();
            }
            321 | 329 => self.fetch_name(),
            322 | 330 => self.open_attr(),
            323 | 331 => {
                if self.regs.mask.any_show() {
                    self.background.latch_attr();
                    self.regs.scroll_clock_x();
                }
            }
            324 | 332 => self.open_pattern(self.io_pattern),
            325 | 333 => self.fetch_bg_pattern_low(),
            326 | 334 => self.open_pattern(self.io_pattern | 8),
            327 | 335 => self.fetch_bg_pattern_high(),
            328 => {
                if self.regs.mask.any_show() {
                    self.background.preload();
                }
                self.open_name();
            }
            336 => self.open_name(),
            337 => {
                if self.regs.mask.any_show() {
                    self.update_enabled_flags_edge();
                    if self.timing.scanline == SCANLINE_HDUMMY && self.timing.odd_frame {
                        cpu.set_next_frame_clock(RP2C02_HVSYNC_1);
                    }
                }
            }
            _ => {
                self.open_name();
                self.timing.scanline += 1;
                if self.timing.scanline != SCANLINE_VBLANK {
                    let line = if self.regs.mask.any_show() {
                        // the pre-render line of an odd frame is one dot short
                        if self.timing.scanline != 0 || !self.timing.odd_frame {
                            341
                        } else {
                            340
                        }
                    } else {
                        self.update_enabled_flags_edge();
                        341
                    };
                    self.timing.hclk = 0;
                    self.timing.vclk += line;
                    self.timing.hclk_target = if self.timing.hclk_target <= line {
                        0
                    } else {
                        self.timing.hclk_target - line
                    };
                } else {
                    self.timing.hclk = HCLOCK_VBLANK_0;
                }
                return;
            }
        }
        self.timing.hclk += 1;
    }

    /// Pre-render dots 0-255 (341-595): dummy background fetches
    fn prerender_background_dot(&mut self, hclk: Clock) {
        match (hclk - HCLOCK_DUMMY) % 8 {
            0 => {
                if hclk == HCLOCK_DUMMY {
                    self.status.clear();
                    self.timing.scanline = SCANLINE_HDUMMY;
                }
                self.open_name();
            }
            2 => self.open_attr(),
            4 => self.open_pattern(self.regs.bg_pattern_base),
            _ => self.open_pattern(self.io_addr | 8),
        }
        self.timing.hclk += 2;
    }

    /// Pre-render dots 256-319 (597-659): dummy sprite fetches and the
    /// vertical scroll copy
    fn prerender_sprite_dot(&mut self, hclk: Clock) -> Wait {
        match (hclk - 597) % 8 {
            0 => {
                if self.regs.mask.any_show() && hclk == 645 {
                    self.regs.scroll_reset_y();
                }
                self.open_name();
            }
            2 => self.open_attr(),
            4 => self.open_pattern(self.regs.pattern_end),
            _ => {
                self.open_pattern(self.io_addr | 8);
                if hclk == 659 {
                    self.timing.hclk = 320;
                    self.timing.vclk += HCLOCK_DUMMY;
                    self.timing.hclk_target -= HCLOCK_DUMMY;
                    return Wait::Dot;
                }
                self.timing.hclk += 2;
                return Wait::TwoChecks;
            }
        }
        self.timing.hclk += 2;
        Wait::Dot
    }

    fn evaluate_sprites_odd(&mut self) {
        if self
            .sprites
            .evaluate_odd(self.timing.scanline, self.regs.sp_height)
        {
            self.status.sprite_overflow = true;
        }
    }

    /// Sprites past the eighth are fetched all at once when the sprite
    /// limit is off
    fn load_extended_sprites(&mut self) {
        if !self.regs.mask.any_show() {
            return;
        }
        let buffered = self.sprites.buffered();
        for idx in (32..buffered).step_by(4) {
            let addr = self.sprites.pattern_addr(
                idx,
                self.timing.scanline,
                self.regs.sp_height,
                self.regs.sp_base,
            );
            let pat0 = self.memory.read_chr(addr);
            let pat1 = self.memory.read_chr(addr | 8);
            if pat0 != 0 || pat1 != 0 {
                self.sprites.load(pat0, pat1, idx);
            }
        }
    }

    fn open_name(&mut self) {
        if self.regs.mask.any_show() {
            self.io_addr = self.regs.name_io_addr;
        }
    }

    fn open_attr(&mut self) {
        if self.regs.mask.any_show() {
            let (addr, attr) = self.memory.attribute(self.regs.vram_addr());
            self.io_addr = addr;
            self.background.set_fetched_attr(attr);
        }
    }

    fn open_pattern(&mut self, addr: u16) {
        if self.regs.mask.any_show() {
            self.io_addr = addr;
        }
    }

    fn fetch_name(&mut self) {
        if self.regs.mask.any_show() {
            self.io_pattern = self
                .memory
                .name_pattern(self.regs.vram_addr(), self.regs.bg_pattern_base);
        }
    }

    fn fetch_bg_pattern_low(&mut self) {
        if self.regs.mask.any_show() {
            let data = self.memory.read_chr(self.io_addr);
            self.background.fetch_pattern_low(data);
        }
    }

    fn fetch_bg_pattern_high(&mut self) {
        if self.regs.mask.any_show() {
            let data = self.memory.read_chr(self.io_addr);
            self.background.fetch_pattern_high(data);
        }
    }

    fn scroll_reset_x(&mut self) {
        if self.regs.mask.any_show() {
            self.regs.scroll_reset_x();
        }
    }

    /// Composite background and sprite for dot `x` and emit its color
    fn render_pixel(&mut self, x: usize) {
        let pixel = if self.regs.mask.any_show() {
            let mut pixel = if self.background.enabled {
                self.background.pixel(x)
            } else {
                0
            };
            if let Some(sprite) = self.sprites.pixel(x).filter(|_| self.sprites.active) {
                if pixel % 4 == 0 {
                    pixel = sprite.color;
                } else {
                    if sprite.zero && x != 255 {
                        self.status.sprite_zero_hit = true;
                    }
                    if !sprite.behind {
                        pixel = sprite.color;
                    }
                }
            }
            pixel
        } else {
            // with rendering off, a palette address in v selects the color
            self.background.clear_pixel(x);
            if self.regs.addr_5_14 & 0x3f00 == 0x3f00 {
                self.regs.addr_0_4 as u8
            } else {
                0
            }
        };
        self.output.push(self.memory.color(pixel));
    }

    pub(super) fn update_enabled_flags(&mut self) {
        if self.regs.mask.any_show() {
            self.background.enabled = self.regs.mask.bg_show;
            self.sprites.enabled = self.regs.mask.sp_show;
            self.sprites.active = self.sprites.enabled && self.sprites.visible;
        }
    }

    /// As `update_enabled_flags`, with left edge clipping
    pub(super) fn update_enabled_flags_edge(&mut self) {
        self.background.enabled = self.regs.mask.bg_show_edge;
        self.sprites.enabled = self.regs.mask.sp_show_edge;
        self.sprites.active = self.sprites.enabled && self.sprites.visible;
    }
}

fn clock_label(clk: Clock) -> String {
    if clk == FOREVER_CLOCK {
        "forever".to_string()
    } else {
        clk.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_start_constants() {
        assert_eq!(DUMMY_FRAME, (6479, 27280, 357368));
        assert_eq!(BOOT_FRAME, (81467, 328608, 328608));
    }

    #[test]
    fn test_boot_then_dummy_frame() {
        let mut timing = Timing::new();
        assert_eq!(timing.frame_start(), BOOT_FRAME);
        timing.hclk = HCLOCK_DUMMY;
        assert_eq!(timing.frame_start(), DUMMY_FRAME);
    }

    #[test]
    fn test_prerender_line_lands_on_dot_320() {
        // 341 + 320 dots of pre-render fetches end where dot 320 of the
        // following line begins
        assert_eq!(659 + 2 - HCLOCK_DUMMY, 320);
        assert_eq!(DUMMY_FRAME.0 + HCLOCK_DUMMY, RP2C02_HVINT / RP2C02_CC);
    }
}
