use crate::clock::Clock;

use super::CHANNEL_OUTPUT_DECAY;
use super::envelope::Envelope;
use super::length_counter::LengthCounter;
use super::oscillator::Oscillator;

const MIN_FREQ: i32 = 0x0008;
const MAX_FREQ: i32 = 0x07ff;

/// Duty cycle sequences as shift amounts: 0 passes a step through, 31
/// silences it
const WAVE_FORM: [[u32; 8]; 4] = [
    duty(0b1111_1101),
    duty(0b1111_1001),
    duty(0b1110_0001),
    duty(0b0000_0110),
];

const fn duty(bits: u8) -> [u32; 8] {
    let mut form = [0; 8];
    let mut i = 0;
    while i < 8 {
        form[i] = ((bits >> i) & 1) as u32 * 0x1f;
        i += 1;
    }
    form
}

/// Pulse wave channel ($4000-$4003, $4004-$4007)
pub struct Pulse {
    osc: Oscillator,
    envelope: Envelope,
    length_counter: LengthCounter,
    wave_length: i32,
    valid_freq: bool,
    step: usize,
    form: usize,

    sweep_rate: u8,
    sweep_count: u8,
    sweep_reload: bool,
    // -1 adds the shifted period, 0 subtracts it
    sweep_increase: i32,
    sweep_shift: u32,
}

impl Default for Pulse {
    fn default() -> Self {
        Self::new()
    }
}

impl Pulse {
    pub fn new() -> Self {
        let mut pulse = Self {
            osc: Oscillator::default(),
            envelope: Envelope::new(),
            length_counter: LengthCounter::default(),
            wave_length: 0,
            valid_freq: false,
            step: 0,
            form: 0,
            sweep_rate: 0,
            sweep_count: 1,
            sweep_reload: false,
            sweep_increase: -1,
            sweep_shift: 0,
        };
        pulse.reset();
        pulse
    }

    pub fn reset(&mut self) {
        self.osc.reset();
        self.wave_length = 0;
        self.envelope.reset();
        self.length_counter.reset();
        self.osc.freq = self.osc.fixed * 2;
        self.valid_freq = false;
        self.step = 0;
        self.form = 0;
        self.sweep_rate = 0;
        self.sweep_count = 1;
        self.sweep_reload = false;
        self.sweep_increase = -1;
        self.sweep_shift = 0;
        self.osc.active = self.is_active();
    }

    pub fn update_settings(&mut self, rate: Clock, fixed: Clock) {
        self.osc.update_settings(rate, fixed);
    }

    fn is_active(&self) -> bool {
        self.length_counter.count() != 0 && self.envelope.output() != 0 && self.valid_freq
    }

    fn update_freq(&mut self) {
        let shifted = self.sweep_increase & (self.wave_length >> self.sweep_shift);
        if self.wave_length >= MIN_FREQ && self.wave_length + shifted <= MAX_FREQ {
            self.osc.freq = (self.wave_length as Clock + 1) * 2 * self.osc.fixed;
            self.valid_freq = true;
        } else {
            self.valid_freq = false;
        }
        self.osc.active = self.is_active();
    }

    /// $4000: duty, envelope loop, constant volume, volume
    pub fn write_control(&mut self, data: u8) {
        self.envelope.write(data);
        self.form = (data >> 6 & 3) as usize;
        self.osc.active = self.is_active();
    }

    /// $4001: sweep unit
    pub fn write_sweep(&mut self, data: u8) {
        self.sweep_increase = if data & 0x08 != 0 { 0 } else { -1 };
        self.sweep_shift = (data & 0x07) as u32;
        self.sweep_rate = 0;
        if data & 0x80 != 0 && self.sweep_shift > 0 {
            self.sweep_rate = ((data >> 4) & 0x07) + 1;
            self.sweep_reload = true;
        }
        self.update_freq();
    }

    /// $4002: timer low
    pub fn write_timer_low(&mut self, data: u8) {
        self.wave_length = (self.wave_length & 0x0700) | data as i32;
        self.update_freq();
    }

    /// $4003: timer high and length counter load
    pub fn write_length_counter_timer_high(&mut self, data: u8, frame_counter_delta: bool) {
        self.wave_length = (self.wave_length & 0x00ff) | ((data as i32 & 0x07) << 8);
        self.update_freq();
        self.envelope.reset_clock();
        self.length_counter.write(data >> 3, frame_counter_delta);
        self.osc.active = self.is_active();
        self.step = 0;
    }

    pub fn enable(&mut self, enabled: bool) {
        self.length_counter.enable(enabled);
        self.osc.active = self.is_active();
    }

    /// $4015 read bit
    pub fn status(&self) -> bool {
        self.length_counter.count() > 0
    }

    pub fn clock_envelope(&mut self) {
        self.envelope.clock();
        self.osc.active = self.is_active();
    }

    /// Half-frame clock: length counter and sweep. Pulse 1 negates with
    /// one's complement (`complement` = -1), pulse 2 with two's (0).
    pub fn clock_sweep(&mut self, complement: i32) {
        if !self.envelope.looping() && self.length_counter.clock() {
            self.osc.active = false;
        }
        if self.sweep_rate != 0 {
            self.sweep_count -= 1;
            if self.sweep_count == 0 {
                self.sweep_count = self.sweep_rate;
                if self.wave_length >= MIN_FREQ {
                    let shifted = self.wave_length >> self.sweep_shift;
                    if self.sweep_increase == 0 {
                        self.wave_length += complement - shifted;
                        self.update_freq();
                    } else if self.wave_length + shifted <= MAX_FREQ {
                        self.wave_length += shifted;
                        self.update_freq();
                    }
                }
            }
        }

        if self.sweep_reload {
            self.sweep_reload = false;
            self.sweep_count = self.sweep_rate;
        }
    }

    /// Average output over one sample period
    pub fn sample(&mut self) -> Clock {
        let form = &WAVE_FORM[self.form];
        let osc = &mut self.osc;
        let mut sum = osc.timer;
        osc.timer -= osc.rate;
        if osc.active {
            if osc.timer < 0 {
                sum >>= form[self.step];
                loop {
                    let v = (-osc.timer).min(osc.freq);
                    self.step = (self.step + 1) & 7;
                    sum += v >> form[self.step];
                    osc.timer += osc.freq;
                    if osc.timer >= 0 {
                        break;
                    }
                }
                osc.amp = (sum * self.envelope.output() + osc.rate / 2) / osc.rate;
            } else {
                osc.amp = self.envelope.output() >> form[self.step];
            }
        } else {
            if osc.timer < 0 {
                let count = (-osc.timer + osc.freq - 1) / osc.freq;
                self.step = (self.step + count as usize) & 7;
                osc.timer += count * osc.freq;
            }
            if osc.amp < CHANNEL_OUTPUT_DECAY {
                return 0;
            }
            osc.amp -= CHANNEL_OUTPUT_DECAY;
        }
        osc.amp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apu::CHANNEL_OUTPUT_MUL;

    fn playing_pulse() -> Pulse {
        let mut pulse = Pulse::new();
        pulse.update_settings(37500, 924);
        pulse.reset();
        pulse.enable(true);
        // 50% duty, constant volume 15
        pulse.write_control(0xbf);
        pulse.write_timer_low(0xfd);
        pulse.write_length_counter_timer_high(0x08, true);
        pulse
    }

    #[test]
    fn test_duty_tables() {
        assert_eq!(WAVE_FORM[0], [31, 0, 31, 31, 31, 31, 31, 31]);
        assert_eq!(WAVE_FORM[3], [0, 31, 31, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_active_needs_length_volume_and_period() {
        let mut pulse = playing_pulse();
        assert!(pulse.osc.active);
        assert!(pulse.status());

        // periods under 8 mute the channel
        pulse.write_timer_low(0x07);
        pulse.write_length_counter_timer_high(0x08, false);
        assert!(!pulse.osc.active);
    }

    #[test]
    fn test_sweep_overflow_mutes() {
        let mut pulse = playing_pulse();
        pulse.write_timer_low(0xff);
        pulse.write_length_counter_timer_high(0x07, false);
        // shift 1, adding: 0x7ff + 0x3ff overflows the 11-bit period
        pulse.write_sweep(0x81);
        assert!(!pulse.osc.active);
    }

    #[test]
    fn test_sweep_negate_differs_between_channels() {
        let mut one = playing_pulse();
        let mut two = playing_pulse();
        for pulse in [&mut one, &mut two] {
            pulse.write_timer_low(0x00);
            pulse.write_length_counter_timer_high(0x09, false);
            // enabled, period 0, negate, shift 1
            pulse.write_sweep(0x89);
        }
        one.clock_sweep(-1);
        two.clock_sweep(0);
        assert_eq!(one.wave_length, 0x100 - 0x80 - 1);
        assert_eq!(two.wave_length, 0x100 - 0x80);
    }

    #[test]
    fn test_output_stays_in_range() {
        let mut pulse = playing_pulse();
        for _ in 0..2000 {
            let s = pulse.sample();
            assert!((0..=15 * CHANNEL_OUTPUT_MUL).contains(&s));
        }
    }

    #[test]
    fn test_silenced_channel_decays() {
        let mut pulse = playing_pulse();
        for _ in 0..100 {
            pulse.sample();
        }
        pulse.enable(false);
        let mut last = i64::MAX;
        for _ in 0..100 {
            let s = pulse.sample();
            assert!(s <= last);
            last = s;
        }
        assert_eq!(last, 0);
    }
}
