use crate::error::{Error, Result};

pub const MIN_SAMPLE_RATE: u32 = 11050;

/// Emulator settings, built once and handed to [`crate::Nes::new`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Keep the hardware limit of 8 sprites per scanline (32 otherwise)
    pub sprite_limit: bool,
    pub audio_sample_rate: u32,
    /// 8 or 16
    pub audio_bit_depth: u32,
    /// Frames to run; 0 runs until the frontend quits
    pub frames: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sprite_limit: false,
            audio_sample_rate: 44100,
            audio_bit_depth: 16,
            frames: 0,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.audio_sample_rate < MIN_SAMPLE_RATE {
            return Err(Error::SampleRate(self.audio_sample_rate));
        }
        if self.audio_bit_depth != 8 && self.audio_bit_depth != 16 {
            return Err(Error::BitDepth(self.audio_bit_depth));
        }
        Ok(())
    }

    /// Audio samples produced per frame
    pub fn samples_per_frame(&self) -> usize {
        (self.audio_sample_rate / 60) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(!config.sprite_limit);
        assert_eq!(config.samples_per_frame(), 735);
    }

    #[test]
    fn test_rejects_low_sample_rate() {
        let config = Config {
            audio_sample_rate: 11049,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::SampleRate(11049))));
    }

    #[test]
    fn test_rejects_odd_bit_depth() {
        for bits in [0, 4, 12, 24, 32] {
            let config = Config {
                audio_bit_depth: bits,
                ..Config::default()
            };
            assert!(matches!(config.validate(), Err(Error::BitDepth(b)) if b == bits));
        }
        let config = Config {
            audio_bit_depth: 8,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }
}
