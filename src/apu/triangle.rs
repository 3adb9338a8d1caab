use crate::clock::Clock;

use super::length_counter::LengthCounter;
use super::oscillator::Oscillator;
use super::{CHANNEL_OUTPUT_DECAY, CHANNEL_OUTPUT_MUL};

const MIN_FREQ: u16 = 2 + 1;

const WAVE_FORM: [Clock; 32] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4,
    3, 2, 1, 0,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinearStatus {
    Counting,
    Reload,
}

/// Triangle wave channel ($4008-$400B)
pub struct Triangle {
    osc: Oscillator,
    length_counter: LengthCounter,
    wave_length: u16,
    step: usize,
    status: LinearStatus,
    linear_counter_load: u8,
    // control flag clear: reload ends after one clock, length counter runs
    linear_counter_start: bool,
    linear_counter: u8,
}

impl Default for Triangle {
    fn default() -> Self {
        Self::new()
    }
}

impl Triangle {
    pub fn new() -> Self {
        let mut triangle = Self {
            osc: Oscillator::default(),
            length_counter: LengthCounter::default(),
            wave_length: 0,
            step: 7,
            status: LinearStatus::Counting,
            linear_counter_load: 0,
            linear_counter_start: true,
            linear_counter: 0,
        };
        triangle.reset();
        triangle
    }

    pub fn reset(&mut self) {
        self.osc.reset();
        self.wave_length = 0;
        self.length_counter.reset();
        self.step = 7;
        self.status = LinearStatus::Counting;
        self.linear_counter_load = 0;
        self.linear_counter_start = true;
        self.linear_counter = 0;
        self.osc.active = self.is_active();
    }

    pub fn update_settings(&mut self, rate: Clock, fixed: Clock) {
        self.osc.update_settings(rate, fixed);
    }

    fn is_active(&self) -> bool {
        self.length_counter.count() != 0
            && self.linear_counter != 0
            && self.wave_length >= MIN_FREQ
    }

    fn update_freq(&mut self) {
        self.osc.freq = (self.wave_length as Clock + 1) * self.osc.fixed;
        self.osc.active = self.is_active();
    }

    /// $4008: control flag and linear counter reload value
    pub fn write_linear_counter(&mut self, data: u8) {
        self.linear_counter_load = data & 0x7f;
        self.linear_counter_start = data & 0x80 == 0;
    }

    /// $400A
    pub fn write_timer_low(&mut self, data: u8) {
        self.wave_length = (self.wave_length & 0x0700) | data as u16;
        self.update_freq();
    }

    /// $400B
    pub fn write_length_counter_timer_high(&mut self, data: u8, frame_counter_delta: bool) {
        self.wave_length = (self.wave_length & 0x00ff) | ((data as u16 & 0x07) << 8);
        self.update_freq();
        self.length_counter.write(data >> 3, frame_counter_delta);
        self.osc.active = self.is_active();
        self.status = LinearStatus::Reload;
    }

    pub fn enable(&mut self, enabled: bool) {
        self.length_counter.enable(enabled);
        self.osc.active = self.is_active();
    }

    pub fn status(&self) -> bool {
        self.length_counter.count() > 0
    }

    /// Quarter-frame clock
    pub fn clock_linear_counter(&mut self) {
        if self.status == LinearStatus::Counting {
            if self.linear_counter != 0 {
                self.linear_counter -= 1;
            }
        } else {
            if self.linear_counter_start {
                self.status = LinearStatus::Counting;
            }
            self.linear_counter = self.linear_counter_load;
        }
        self.osc.active = self.is_active();
    }

    /// Half-frame clock
    pub fn clock_length_counter(&mut self) {
        if self.linear_counter_start && self.length_counter.clock() {
            self.osc.active = false;
        }
    }

    pub fn sample(&mut self) -> Clock {
        let osc = &mut self.osc;
        if osc.active {
            let mut sum = osc.timer;
            osc.timer -= osc.rate;
            if osc.timer < 0 {
                sum *= WAVE_FORM[self.step];
                loop {
                    let v = (-osc.timer).min(osc.freq);
                    self.step = (self.step + 1) & 0x1f;
                    sum += v * WAVE_FORM[self.step];
                    osc.timer += osc.freq;
                    if osc.timer >= 0 {
                        break;
                    }
                }
                osc.amp = (sum * CHANNEL_OUTPUT_MUL + osc.rate / 2) / osc.rate * 3;
            } else {
                osc.amp = WAVE_FORM[self.step] * CHANNEL_OUTPUT_MUL * 3;
            }
        } else {
            if osc.amp < CHANNEL_OUTPUT_DECAY {
                return 0;
            }
            osc.amp -= CHANNEL_OUTPUT_DECAY;
            self.step = 0;
        }
        osc.amp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing_triangle() -> Triangle {
        let mut triangle = Triangle::new();
        triangle.update_settings(37500, 924);
        triangle.reset();
        triangle.enable(true);
        triangle.write_linear_counter(0x7f);
        triangle.write_timer_low(0x40);
        triangle.write_length_counter_timer_high(0x08, true);
        triangle.clock_linear_counter();
        triangle
    }

    #[test]
    fn test_wave_form_is_symmetric() {
        for i in 0..16 {
            assert_eq!(WAVE_FORM[i], WAVE_FORM[31 - i]);
        }
    }

    #[test]
    fn test_linear_counter_reload_then_count() {
        let mut triangle = playing_triangle();
        assert_eq!(triangle.linear_counter, 0x7f);
        assert_eq!(triangle.status, LinearStatus::Counting);
        triangle.clock_linear_counter();
        assert_eq!(triangle.linear_counter, 0x7e);
        assert!(triangle.osc.active);
    }

    #[test]
    fn test_control_flag_holds_reload() {
        let mut triangle = playing_triangle();
        triangle.write_linear_counter(0x85);
        triangle.write_length_counter_timer_high(0x08, false);
        triangle.clock_linear_counter();
        triangle.clock_linear_counter();
        assert_eq!(triangle.linear_counter, 5);
        assert_eq!(triangle.status, LinearStatus::Reload);
    }

    #[test]
    fn test_ultrasonic_period_is_inactive() {
        let mut triangle = playing_triangle();
        triangle.write_timer_low(0x02);
        triangle.write_length_counter_timer_high(0x08, false);
        triangle.clock_linear_counter();
        assert!(!triangle.osc.active);
    }

    #[test]
    fn test_output_range() {
        let mut triangle = playing_triangle();
        for _ in 0..5000 {
            let s = triangle.sample();
            assert!((0..=15 * CHANNEL_OUTPUT_MUL * 3).contains(&s));
        }
    }
}
