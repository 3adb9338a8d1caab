/// Background tile pipeline.
///
/// Sixteen pixels are kept in flight: the tile being drawn and the one
/// fetched behind it. Fine X scroll is applied by placing each freshly
/// decoded tile `xfine` pixels into the buffer, so drawing always reads
/// slot `hclk % 8`.
pub struct Background {
    /// Background drawn on the current dot (left edge clipping applied)
    pub enabled: bool,
    pixels: [u8; 16],
    /// 8 - fine X scroll, or 0 before the first PPUSCROLL write
    xfine: usize,
    /// Pattern bytes of the next tile, high plane in the upper byte
    pattern: u16,
    /// Palette bits of the next tile, in pixel position
    attr: u8,
    /// Palette bits read on the attribute fetch, applied one dot later
    attr_fetched: u8,
}

impl Background {
    pub fn new() -> Self {
        Self {
            enabled: false,
            pixels: [0; 16],
            xfine: 0,
            pattern: 0,
            attr: 0,
            attr_fetched: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Move the pipeline to a new fine X scroll
    pub fn set_fine_x(&mut self, fine_x: u8) {
        let xfine = 8 - (fine_x & 7) as usize;
        if xfine > self.xfine {
            self.pixels.rotate_right(xfine - self.xfine);
        } else {
            self.pixels.rotate_left(self.xfine - xfine);
        }
        self.xfine = xfine;
    }

    pub fn set_fetched_attr(&mut self, attr: u8) {
        self.attr_fetched = attr;
    }

    pub fn latch_attr(&mut self) {
        self.attr = self.attr_fetched;
    }

    pub fn fetch_pattern_low(&mut self, data: u8) {
        self.pattern = data as u16;
    }

    pub fn fetch_pattern_high(&mut self, data: u8) {
        self.pattern |= (data as u16) << 8;
    }

    /// Decode the fetched tile into the pipeline without shifting
    pub fn preload(&mut self) {
        let tile = decode_tile(self.pattern, self.attr);
        self.pixels[self.xfine..self.xfine + 8].copy_from_slice(&tile);
    }

    /// Shift out the tile just drawn and decode the fetched one
    pub fn load(&mut self) {
        self.pixels.rotate_left(8);
        self.preload();
    }

    pub fn pixel(&self, hclk: usize) -> u8 {
        self.pixels[hclk % 8]
    }

    pub fn clear_pixel(&mut self, hclk: usize) {
        self.pixels[hclk % 8] = 0;
    }
}

/// Eight palette indexes for one tile row; transparent pixels are 0
fn decode_tile(pattern: u16, attr: u8) -> [u8; 8] {
    let mut out = [0; 8];
    for (j, pixel) in out.iter_mut().enumerate() {
        let color = ((pattern >> (15 - j) & 1) << 1 | (pattern >> (7 - j) & 1)) as u8;
        *pixel = if color != 0 { attr | color } else { 0 };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_tile() {
        // low plane 0b1010_0000, high plane 0b1100_0000
        let tile = decode_tile(0xc0a0, 0x4);
        assert_eq!(tile, [7, 6, 5, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_load_shifts_previous_tile() {
        let mut bg = Background::new();
        bg.set_fine_x(0);
        bg.fetch_pattern_low(0xff);
        bg.fetch_pattern_high(0x00);
        bg.preload();
        assert_eq!(bg.pixels[8..], [1; 8]);

        bg.fetch_pattern_low(0x00);
        bg.fetch_pattern_high(0xff);
        bg.load();
        assert_eq!(bg.pixels[..8], [1; 8]);
        assert_eq!(bg.pixels[8..], [2; 8]);
    }

    #[test]
    fn test_fine_x_offsets_pipeline() {
        let mut bg = Background::new();
        bg.set_fine_x(3);
        bg.fetch_pattern_low(0x80);
        bg.preload();
        // the leftmost pixel of the tile lands 5 slots in
        assert_eq!(bg.pixel(5), 1);
        assert_eq!(bg.pixel(4), 0);

        // moving the scroll slides what is already buffered
        bg.set_fine_x(0);
        assert_eq!(bg.pixels[8], 1);
    }

    #[test]
    fn test_attribute_applies_after_latch() {
        let mut bg = Background::new();
        bg.set_fetched_attr(0xc);
        bg.fetch_pattern_low(0xff);
        bg.preload();
        assert_eq!(bg.pixel(0), 1);
        bg.latch_attr();
        bg.preload();
        assert_eq!(bg.pixel(0), 0xd);
    }
}
