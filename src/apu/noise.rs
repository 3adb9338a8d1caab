use crate::clock::Clock;

use super::envelope::Envelope;
use super::length_counter::LengthCounter;
use super::oscillator::Oscillator;

/// Timer periods in CPU cycles, indexed by $400E bits 0-3
const NOISE_PERIOD_TABLE: [Clock; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];

/// Noise channel ($400C-$400F), a 15-bit LFSR feeding the envelope
pub struct Noise {
    osc: Oscillator,
    envelope: Envelope,
    length_counter: LengthCounter,
    bits: u16,
    // feedback tap: bit 1 in long mode, bit 6 in short mode
    tap: u32,
}

impl Default for Noise {
    fn default() -> Self {
        Self::new()
    }
}

impl Noise {
    pub fn new() -> Self {
        let mut noise = Self {
            osc: Oscillator::default(),
            envelope: Envelope::new(),
            length_counter: LengthCounter::default(),
            bits: 0x4000,
            tap: 1,
        };
        noise.reset();
        noise
    }

    pub fn reset(&mut self) {
        self.osc.reset();
        self.envelope.reset();
        self.length_counter.reset();
        self.osc.freq = NOISE_PERIOD_TABLE[0] * self.osc.fixed;
        self.bits = 0x4000;
        self.tap = 1;
        self.osc.active = self.is_active();
    }

    pub fn update_settings(&mut self, rate: Clock, fixed: Clock) {
        self.osc.update_settings(rate, fixed);
    }

    fn is_active(&self) -> bool {
        self.length_counter.count() != 0 && self.envelope.output() != 0
    }

    fn next_bits(&self) -> u16 {
        let feedback = (self.bits ^ (self.bits >> self.tap)) & 1;
        self.bits >> 1 | feedback << 14
    }

    /// $400C
    pub fn write_control(&mut self, data: u8) {
        self.envelope.write(data);
        self.osc.active = self.is_active();
    }

    /// $400E: mode and period
    pub fn write_period(&mut self, data: u8) {
        self.osc.freq = NOISE_PERIOD_TABLE[(data & 0x0f) as usize] * self.osc.fixed;
        self.tap = if data & 0x80 != 0 { 6 } else { 1 };
    }

    /// $400F
    pub fn write_length_counter(&mut self, data: u8, frame_counter_delta: bool) {
        self.envelope.reset_clock();
        self.length_counter.write(data >> 3, frame_counter_delta);
        self.osc.active = self.is_active();
    }

    pub fn enable(&mut self, enabled: bool) {
        self.length_counter.enable(enabled);
        self.osc.active = self.is_active();
    }

    pub fn status(&self) -> bool {
        self.length_counter.count() > 0
    }

    pub fn clock_envelope(&mut self) {
        self.envelope.clock();
        self.osc.active = self.is_active();
    }

    pub fn clock_length_counter(&mut self) {
        if !self.envelope.looping() && self.length_counter.clock() {
            self.osc.active = false;
        }
    }

    pub fn sample(&mut self) -> Clock {
        self.osc.timer -= self.osc.rate;
        if !self.osc.active {
            while self.osc.timer < 0 {
                self.bits = self.next_bits();
                self.osc.timer += self.osc.freq;
            }
            return 0;
        }

        let output = self.envelope.output();
        if self.osc.timer >= 0 {
            return if self.bits & 1 == 0 { output * 2 } else { 0 };
        }

        let mut sum = if self.bits & 1 == 0 { self.osc.timer } else { 0 };
        loop {
            self.bits = self.next_bits();
            if self.bits & 1 == 0 {
                sum += (-self.osc.timer).min(self.osc.freq);
            }
            self.osc.timer += self.osc.freq;
            if self.osc.timer >= 0 {
                break;
            }
        }
        (sum * output + self.osc.rate / 2).div_euclid(self.osc.rate) * 2
    }
}
