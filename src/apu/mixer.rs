use crate::clock::Clock;

use super::CHANNEL_OUTPUT_MUL;

const VOL: i64 = 192;
const P_F: i64 = 900;
const P_0: i64 = 9552 * CHANNEL_OUTPUT_MUL * VOL * (P_F / 100);
const P_1: i64 = 8128 * CHANNEL_OUTPUT_MUL * P_F;
const P_2: i64 = P_F * 100;
const TND_F: i64 = 500;
const TND_0: i64 = 16367 * CHANNEL_OUTPUT_MUL * VOL * (TND_F / 100);
const TND_1: i64 = 24329 * CHANNEL_OUTPUT_MUL * TND_F;
const TND_2: i64 = TND_F * 100;

/// Non-linear channel mixer followed by a DC blocking filter
#[derive(Default)]
pub struct Mixer {
    acc: i64,
    prev: i64,
    next: i64,
}

impl Mixer {
    pub fn reset(&mut self) {
        self.acc = 0;
        self.prev = 0;
        self.next = 0;
    }

    /// Mix the pulse sum and the triangle/noise/DMC sum into one sample
    pub fn mix(&mut self, pulse: Clock, tnd: Clock) -> i16 {
        let sample = P_0 * pulse / (P_1 + P_2 * pulse) + TND_0 * tnd / (TND_1 + TND_2 * tnd);

        self.acc -= self.prev;
        self.prev = sample << 15;
        self.acc += self.prev - self.next * 3;
        self.next = self.acc >> 15;

        self.next.clamp(-0x7fff, 0x7fff) as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_stays_silent() {
        let mut mixer = Mixer::default();
        for _ in 0..10 {
            assert_eq!(mixer.mix(0, 0), 0);
        }
    }

    #[test]
    fn test_dc_offset_decays() {
        let mut mixer = Mixer::default();
        let first = mixer.mix(15 * CHANNEL_OUTPUT_MUL, 0);
        assert!(first > 0);
        let mut last = first;
        for _ in 0..30000 {
            last = mixer.mix(15 * CHANNEL_OUTPUT_MUL, 0);
        }
        assert!(last.abs() < first / 4);
    }

    #[test]
    fn test_loud_input_is_clamped() {
        let mut mixer = Mixer::default();
        let s = mixer.mix(2 * 15 * CHANNEL_OUTPUT_MUL, 0x7f * CHANNEL_OUTPUT_MUL * 4);
        assert_eq!(s, 0x7fff);
    }
}
