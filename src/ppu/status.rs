/// PPUSTATUS bit constants
const VBLANK: u8 = 0b1000_0000;
const SPRITE_ZERO_HIT: u8 = 0b0100_0000;
const SPRITE_OVERFLOW: u8 = 0b0010_0000;

/// Manages PPU status flags: vertical blank, sprite 0 hit and overflow
#[derive(Default)]
pub struct Status {
    /// VBlank flag (bit 7 of status register)
    pub vblank: bool,
    /// Set on the first vblank dot and folded into `vblank` two dots later,
    /// unless a status read clears it in between
    pub vblanking: bool,
    /// Sprite 0 hit flag (bit 6 of status register)
    pub sprite_zero_hit: bool,
    /// Sprite overflow flag (bit 5 of status register)
    pub sprite_overflow: bool,
}

impl Status {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Flags cleared at the start of the pre-render line
    pub fn clear(&mut self) {
        self.sprite_overflow = false;
        self.sprite_zero_hit = false;
        self.vblanking = false;
        self.vblank = false;
    }

    /// Compose PPUSTATUS over the low bits of the I/O latch and clear
    /// vertical blank
    pub fn read(&mut self, io_latch: u8) -> u8 {
        let mut value = io_latch & 0x1f;
        if self.vblank {
            value |= VBLANK;
        }
        if self.sprite_zero_hit {
            value |= SPRITE_ZERO_HIT;
        }
        if self.sprite_overflow {
            value |= SPRITE_OVERFLOW;
        }
        self.vblanking = false;
        self.vblank = false;
        value
    }

    /// Latch the vertical blank that started on an earlier dot
    pub fn settle_vblank(&mut self) {
        self.vblank |= self.vblanking;
        self.vblanking = false;
    }
}
