/// Length counter load table (indexed by bits 7-3 of $4003/$4007/$400B/$400F)
const LENGTH_COUNTER_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 12, 16, 24, 18, 48, 20, 96, 22,
    192, 24, 72, 26, 16, 28, 32, 30,
];

/// Note length counter
#[derive(Default)]
pub struct LengthCounter {
    enabled: bool,
    count: u8,
}

impl LengthCounter {
    pub fn reset(&mut self) {
        self.enabled = false;
        self.count = 0;
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    /// $4015 enable bit; disabling silences the channel at once
    pub fn enable(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.count = 0;
        }
    }

    /// Load from the table. A write on the same clock as a half-frame tick
    /// only lands when the counter was already zero.
    pub fn write(&mut self, index: u8, frame_counter_delta: bool) {
        if frame_counter_delta || self.count == 0 {
            self.count = if self.enabled {
                LENGTH_COUNTER_TABLE[index as usize & 0x1f]
            } else {
                0
            };
        }
    }

    /// Half-frame clock; true when the count just reached zero
    pub fn clock(&mut self) -> bool {
        if self.count == 0 {
            return false;
        }
        self.count -= 1;
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_counter_ignores_loads() {
        let mut counter = LengthCounter::default();
        counter.write(1, true);
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn test_load_and_expire() {
        let mut counter = LengthCounter::default();
        counter.enable(true);
        // index 3 loads 2
        counter.write(3, true);
        assert_eq!(counter.count(), 2);
        assert!(!counter.clock());
        assert!(counter.clock());
        assert!(!counter.clock());
    }

    #[test]
    fn test_reload_suppressed_on_frame_edge() {
        let mut counter = LengthCounter::default();
        counter.enable(true);
        counter.write(1, true);
        counter.write(0, false);
        assert_eq!(counter.count(), 254);
        counter.write(0, true);
        assert_eq!(counter.count(), 10);
    }

    #[test]
    fn test_disable_clears() {
        let mut counter = LengthCounter::default();
        counter.enable(true);
        counter.write(1, true);
        counter.enable(false);
        assert_eq!(counter.count(), 0);
    }
}
