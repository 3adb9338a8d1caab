use crate::clock::Clock;

/// Timer state shared by the pulse, triangle and noise channels.
///
/// `timer` and `freq` count in `fixed` units per CPU cycle; one output
/// sample consumes `rate` of them.
pub struct Oscillator {
    pub rate: Clock,
    pub fixed: Clock,
    pub timer: Clock,
    pub freq: Clock,
    pub amp: Clock,
    pub active: bool,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self {
            rate: 1,
            fixed: 1,
            timer: 0,
            freq: 0,
            amp: 0,
            active: false,
        }
    }
}

impl Oscillator {
    pub fn reset(&mut self) {
        // 2048 reset cycles before the first step
        self.timer = 2048 * self.fixed;
        self.freq = self.fixed;
        self.amp = 0;
    }

    /// Rescale to a new output rate
    pub fn update_settings(&mut self, rate: Clock, fixed: Clock) {
        self.freq = self.freq / self.fixed * fixed;
        self.timer = self.timer / self.fixed * fixed;
        self.rate = rate;
        self.fixed = fixed;
    }
}
