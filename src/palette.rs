//! RGB output palette.
//!
//! Entries are `0x00RRGGBB`. The table is indexed by a 6-bit color plus
//! the PPUMASK emphasis bits moved up to bits 6-8, giving 512 entries.

/// 2C02 master palette
const BASE: [[u8; 3]; 64] = [
    [0x75, 0x75, 0x75],
    [0x27, 0x1B, 0x8F],
    [0x00, 0x00, 0xAB],
    [0x47, 0x00, 0x9F],
    [0x8F, 0x00, 0x77],
    [0xAB, 0x00, 0x13],
    [0xA7, 0x00, 0x00],
    [0x7F, 0x0B, 0x00],
    [0x43, 0x2F, 0x00],
    [0x00, 0x47, 0x00],
    [0x00, 0x51, 0x00],
    [0x00, 0x3F, 0x17],
    [0x1B, 0x3F, 0x5F],
    [0x00, 0x00, 0x00],
    [0x00, 0x00, 0x00],
    [0x00, 0x00, 0x00],
    [0xBC, 0xBC, 0xBC],
    [0x00, 0x73, 0xEF],
    [0x23, 0x3B, 0xEF],
    [0x83, 0x00, 0xF3],
    [0xBF, 0x00, 0xBF],
    [0xE7, 0x00, 0x5B],
    [0xDB, 0x2B, 0x00],
    [0xCB, 0x4F, 0x0F],
    [0x8B, 0x73, 0x00],
    [0x00, 0x97, 0x00],
    [0x00, 0xAB, 0x00],
    [0x00, 0x93, 0x3B],
    [0x00, 0x83, 0x8B],
    [0x00, 0x00, 0x00],
    [0x00, 0x00, 0x00],
    [0x00, 0x00, 0x00],
    [0xFF, 0xFF, 0xFF],
    [0x3F, 0xBF, 0xFF],
    [0x5F, 0x97, 0xFF],
    [0xA7, 0x8B, 0xFD],
    [0xF7, 0x7B, 0xFF],
    [0xFF, 0x77, 0xB7],
    [0xFF, 0x77, 0x63],
    [0xFF, 0x9B, 0x3B],
    [0xF3, 0xBF, 0x3F],
    [0x83, 0xD3, 0x13],
    [0x4F, 0xDF, 0x4B],
    [0x58, 0xF8, 0x98],
    [0x00, 0xEB, 0xDB],
    [0x00, 0x00, 0x00],
    [0x00, 0x00, 0x00],
    [0x00, 0x00, 0x00],
    [0xFF, 0xFF, 0xFF],
    [0xAB, 0xE7, 0xFF],
    [0xC7, 0xD7, 0xFF],
    [0xD7, 0xCB, 0xFF],
    [0xFF, 0xC7, 0xFF],
    [0xFF, 0xC7, 0xDB],
    [0xFF, 0xBF, 0xB3],
    [0xFF, 0xDB, 0xAB],
    [0xFF, 0xE7, 0xA3],
    [0xE3, 0xFF, 0xA3],
    [0xAB, 0xF3, 0xBF],
    [0xB3, 0xFF, 0xCF],
    [0x9F, 0xFF, 0xF3],
    [0x00, 0x00, 0x00],
    [0x00, 0x00, 0x00],
    [0x00, 0x00, 0x00],
];

pub const PALETTE_SIZE: usize = 512;

/// Emphasis bits as they appear in a palette index
pub const EMPHASIZE_RED: u16 = 0x040;
pub const EMPHASIZE_GREEN: u16 = 0x080;
pub const EMPHASIZE_BLUE: u16 = 0x100;

const fn build() -> [u32; PALETTE_SIZE] {
    let mut table = [0; PALETTE_SIZE];
    let mut i = 0;
    while i < PALETTE_SIZE {
        let [mut r, mut g, mut b] = BASE[i & 0x3f];
        let emphasis = (i as u16) & (EMPHASIZE_RED | EMPHASIZE_GREEN | EMPHASIZE_BLUE);
        if emphasis != 0 {
            // an emphasized channel keeps its level, the others drop to 3/4
            if emphasis & EMPHASIZE_RED == 0 {
                r = (r as u16 * 3 / 4) as u8;
            }
            if emphasis & EMPHASIZE_GREEN == 0 {
                g = (g as u16 * 3 / 4) as u8;
            }
            if emphasis & EMPHASIZE_BLUE == 0 {
                b = (b as u16 * 3 / 4) as u8;
            }
        }
        table[i] = (r as u32) << 16 | (g as u32) << 8 | b as u32;
        i += 1;
    }
    table
}

/// Output colors for every color/emphasis combination
pub static PALETTE: [u32; PALETTE_SIZE] = build();

/// Split an output color into its bytes
pub fn rgb(color: u32) -> [u8; 3] {
    [(color >> 16) as u8, (color >> 8) as u8, color as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_entries() {
        assert_eq!(PALETTE[0x0f], 0);
        assert_eq!(PALETTE[0x3f], 0);
    }

    #[test]
    fn test_plain_colors_match_base() {
        assert_eq!(PALETTE[0x00], 0x757575);
        assert_eq!(PALETTE[0x30], 0xffffff);
        assert_eq!(rgb(PALETTE[0x21]), [0x3f, 0xbf, 0xff]);
    }

    #[test]
    fn test_emphasis_attenuates_other_channels() {
        let white = 0x30;
        assert_eq!(rgb(PALETTE[white | EMPHASIZE_RED as usize]), [0xff, 0xbf, 0xbf]);
        assert_eq!(rgb(PALETTE[white | EMPHASIZE_GREEN as usize]), [0xbf, 0xff, 0xbf]);
        assert_eq!(rgb(PALETTE[white | EMPHASIZE_BLUE as usize]), [0xbf, 0xbf, 0xff]);
        // all three emphasized: nothing is attenuated
        assert_eq!(PALETTE[white | 0x1c0], 0xffffff);
    }
}
