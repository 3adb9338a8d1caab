use crate::palette;
use crate::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};

const BYTES_PER_PIXEL: usize = 3;
const PITCH: usize = SCREEN_WIDTH * BYTES_PER_PIXEL;

/// The last frame as packed RGB24 rows, ready for an SDL2 streaming texture
pub struct ScreenBuffer {
    buffer: Vec<u8>,
}

impl ScreenBuffer {
    pub fn new() -> Self {
        ScreenBuffer {
            buffer: vec![0; PITCH * SCREEN_HEIGHT],
        }
    }

    /// Bytes per row
    pub fn pitch(&self) -> usize {
        PITCH
    }

    /// Replace the whole picture with a frame of 0x00RRGGBB pixels
    pub fn update(&mut self, pixels: &[u32]) {
        for (dest, &pixel) in self.buffer.chunks_exact_mut(BYTES_PER_PIXEL).zip(pixels) {
            dest.copy_from_slice(&palette::rgb(pixel));
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Copy the picture into `dest`, which must hold at least
    /// 256 * 240 * 3 bytes
    pub fn copy_buffer(&self, dest: &mut [u8]) {
        dest[..self.buffer.len()].copy_from_slice(&self.buffer);
    }
}

impl Default for ScreenBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// 16-bit wrapping sum of the R, G and B bytes of a frame
pub fn checksum(pixels: &[u32]) -> u16 {
    pixels
        .iter()
        .flat_map(|&pixel| palette::rgb(pixel))
        .fold(0u16, |sum, byte| sum.wrapping_add(byte as u16))
}
