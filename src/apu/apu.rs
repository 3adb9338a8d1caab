use tracing::debug;

use crate::cartridge::Mapper;
use crate::clock::{CLK_1, Clock};
use crate::config::Config;
use crate::cpu::{ApuReg, Cpu, Irq, Peek, Poke};
use crate::error::Result;

use super::dmc::{DMC_PERIOD_TABLE, Dmc};
use super::frame_counter::FrameCounter;
use super::mixer::Mixer;
use super::noise::Noise;
use super::pulse::Pulse;
use super::triangle::Triangle;

const CLK_M2_MUL: Clock = 6;
const CLK_NTSC: Clock = 39_375_000 * CLK_M2_MUL;
const CLK_NTSC_DIV: Clock = 11;

/// Main APU module integrating the frame sequencer, the five sound channels
/// and the mixer.
///
/// The APU never runs on its own. Register accesses and the end of each
/// frame pull it forward to the CPU clock, producing exactly as many samples
/// as fit in one frame of audio.
pub struct Apu {
    pulse: [Pulse; 2],
    triangle: Triangle,
    noise: Noise,
    dmc: Dmc,
    mixer: Mixer,
    frame_counter: FrameCounter,

    settings_rate: u32,
    samples_per_frame: usize,
    output: Vec<i16>,
    buffer: Vec<i16>,

    fixed_clock: Clock,
    rate_clock: Clock,
    rate_counter: Clock,
    dmc_clock: Clock,
}

impl Apu {
    /// Create an APU producing `config.audio_sample_rate` samples per second
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let samples_per_frame = config.samples_per_frame();
        let mut apu = Self {
            pulse: [Pulse::new(), Pulse::new()],
            triangle: Triangle::new(),
            noise: Noise::new(),
            dmc: Dmc::new(),
            mixer: Mixer::default(),
            frame_counter: FrameCounter::new(),
            settings_rate: config.audio_sample_rate,
            samples_per_frame,
            output: Vec::with_capacity(samples_per_frame),
            buffer: Vec::with_capacity(samples_per_frame),
            fixed_clock: 1,
            rate_clock: 1,
            rate_counter: 0,
            dmc_clock: 0,
        };
        apu.reset_state();
        Ok(apu)
    }

    /// Reset every channel and install the APU registers on the CPU bus
    pub fn reset(&mut self, cpu: &mut Cpu) {
        self.reset_state();
        self.reset_mapping(cpu);
    }

    fn reset_state(&mut self) {
        self.dmc_clock = DMC_PERIOD_TABLE[0];
        self.frame_counter.reset(self.fixed_clock);
        for pulse in &mut self.pulse {
            pulse.reset();
        }
        self.triangle.reset();
        self.noise.reset();
        self.dmc.reset();
        self.mixer.reset();
        self.buffer.clear();
    }

    fn reset_mapping(&mut self, cpu: &mut Cpu) {
        let rate = self.settings_rate as Clock;
        let old_fixed = self.fixed_clock;
        self.rate_counter /= old_fixed;

        let mut multiplier = 1;
        while multiplier < 512 && CLK_NTSC * multiplier % rate != 0 {
            multiplier += 1;
        }
        self.rate_clock = CLK_NTSC * multiplier / rate;
        self.fixed_clock = CLK_NTSC_DIV * multiplier;
        self.frame_counter.rescale(old_fixed, self.fixed_clock);
        self.rate_counter *= self.fixed_clock;

        self.mixer.reset();
        self.buffer.clear();

        let mut multiplier = 1;
        while multiplier < 0x1000
            && CLK_NTSC * (multiplier + 1) / rate <= 0x7ffff
            && CLK_NTSC * multiplier % rate != 0
        {
            multiplier += 1;
        }
        let osc_rate = CLK_NTSC * multiplier / rate;
        let osc_fixed = CLK_NTSC_DIV * CLK_1 * multiplier;
        for pulse in &mut self.pulse {
            pulse.update_settings(osc_rate, osc_fixed);
        }
        self.triangle.update_settings(osc_rate, osc_fixed);
        self.noise.update_settings(osc_rate, osc_fixed);
        debug!(
            "apu mapping: rate {} Hz, rate clock {}, fixed clock {}, oscillator {}/{}",
            self.settings_rate, self.rate_clock, self.fixed_clock, osc_rate, osc_fixed
        );

        let open = Peek::Apu(ApuReg::Open);
        for n in 0..2 {
            let base = 0x4000 + 4 * n as u16;
            for r in 0..4 {
                cpu.add_mappings(base + r..=base + r, open, Poke::Apu(ApuReg::Pulse(n, r as u8)));
            }
        }
        for (addr, r) in [(0x4008, 0), (0x400a, 2), (0x400b, 3)] {
            cpu.add_mappings(addr..=addr, open, Poke::Apu(ApuReg::Triangle(r)));
        }
        for (addr, r) in [(0x400c, 0), (0x400e, 2), (0x400f, 3)] {
            cpu.add_mappings(addr..=addr, open, Poke::Apu(ApuReg::Noise(r)));
        }
        for r in 0..4u16 {
            cpu.add_mappings(0x4010 + r..=0x4010 + r, open, Poke::Apu(ApuReg::Dmc(r as u8)));
        }
        cpu.add_mappings(
            0x4015..=0x4015,
            Peek::Apu(ApuReg::Status),
            Poke::Apu(ApuReg::Status),
        );
        self.frame_counter.arm_irq(self.fixed_clock);
    }

    /// Samples of the last completed frame
    pub fn output(&self) -> &[i16] {
        &self.output
    }

    pub fn samples_per_frame(&self) -> usize {
        self.samples_per_frame
    }

    // ---------------------------------------------------------------------
    // catching up

    /// Run pending DMC fetches and frame IRQs, then report the next clock
    /// the CPU must stop at for the APU
    pub fn next_event_clock(&mut self, cpu: &mut Cpu, mapper: &mut dyn Mapper) -> Clock {
        let clk = cpu.current_clock();
        self.clock_dma(cpu, mapper, clk);
        if self.frame_counter.irq_clock() <= clk {
            self.frame_counter.clock_irq(cpu, clk);
        }
        self.dmc_clock.min(self.frame_counter.irq_clock())
    }

    /// Catch the DMC up to `clk`
    pub fn clock_dma(&mut self, cpu: &mut Cpu, mapper: &mut dyn Mapper, clk: Clock) {
        if self.dmc_clock <= clk {
            self.clock_dmc(cpu, mapper, clk);
        }
    }

    /// Current CPU clock, after the DMC has stolen whatever it needed
    fn cpu_update(&mut self, cpu: &mut Cpu, mapper: &mut dyn Mapper) -> Clock {
        let clk = cpu.current_clock();
        self.clock_dma(cpu, mapper, clk);
        cpu.current_clock()
    }

    fn update(&mut self, cpu: &mut Cpu, mapper: &mut dyn Mapper) {
        let target = self.cpu_update(cpu, mapper);
        self.update_to(target);
    }

    /// Register writes that take effect one cycle late
    fn update_latency(&mut self, cpu: &mut Cpu, mapper: &mut dyn Mapper) {
        let target = self.cpu_update(cpu, mapper) + 1;
        self.update_to(target);
    }

    /// Like `update_latency`, reporting whether the write missed the
    /// sequencer step landing on this very clock
    fn update_delta(&mut self, cpu: &mut Cpu, mapper: &mut dyn Mapper) -> bool {
        let elapsed = self.cpu_update(cpu, mapper);
        let delta = self.frame_counter.counter() != elapsed * self.fixed_clock;
        self.update_to(elapsed + 1);
        delta
    }

    fn update_to(&mut self, target: Clock) {
        let target = target * self.fixed_clock;
        self.proceed(target);
        if self.frame_counter.counter() < target {
            self.clock_frame_counter();
        }
    }

    /// Emit samples up to `target`, never past one frame's worth
    fn proceed(&mut self, target: Clock) {
        while self.rate_counter < target && self.buffer.len() < self.samples_per_frame {
            let sample = self.sample();
            self.buffer.push(sample);
            if self.frame_counter.counter() <= self.rate_counter {
                self.clock_frame_counter();
            }
            self.rate_counter += self.rate_clock;
        }
    }

    fn sample(&mut self) -> i16 {
        let [pulse_0, pulse_1] = &mut self.pulse;
        let pulse = pulse_0.sample() + pulse_1.sample();
        let tnd = self.triangle.sample() + self.noise.sample() + self.dmc.sample();
        self.mixer.mix(pulse, tnd)
    }

    fn clock_oscillators(&mut self, half_frame: bool) {
        for pulse in &mut self.pulse {
            pulse.clock_envelope();
        }
        self.triangle.clock_linear_counter();
        self.noise.clock_envelope();
        if !half_frame {
            return;
        }
        self.pulse[0].clock_sweep(-1);
        self.pulse[1].clock_sweep(0);
        self.triangle.clock_length_counter();
        self.noise.clock_length_counter();
    }

    fn clock_frame_counter(&mut self) {
        let half_frame = self.frame_counter.step(self.fixed_clock);
        self.clock_oscillators(half_frame);
    }

    fn clock_dmc(&mut self, cpu: &mut Cpu, mapper: &mut dyn Mapper, target: Clock) {
        loop {
            if self.dmc.clock_dac() {
                self.update_to(self.dmc_clock);
                self.dmc.update();
            }
            self.dmc_clock += self.dmc.freq();
            self.dmc.clock_dma(cpu, mapper);
            if self.dmc_clock > target {
                break;
            }
        }
    }

    /// Close the frame: pad the sample buffer to a full frame, publish it,
    /// and rebase every clock onto the next frame
    pub fn vsync(&mut self, cpu: &Cpu) {
        self.flush_sound(cpu);
        self.update_to(cpu.current_clock());
        let frame = cpu.next_frame_clock();
        self.dmc_clock -= frame;
        self.frame_counter.vsync(frame, self.fixed_clock);
        self.rate_counter -= frame * self.fixed_clock;
    }

    fn flush_sound(&mut self, cpu: &Cpu) {
        if self.buffer.len() < self.samples_per_frame {
            let target = cpu.current_clock() * self.fixed_clock;
            self.proceed(target);
            if self.buffer.len() < self.samples_per_frame {
                if self.frame_counter.counter() < target {
                    self.clock_frame_counter();
                }
                while self.buffer.len() < self.samples_per_frame {
                    let sample = self.sample();
                    self.buffer.push(sample);
                }
            }
        }
        self.output.clear();
        self.output.append(&mut self.buffer);
    }

    // ---------------------------------------------------------------------
    // registers

    /// Read through an APU handler
    pub fn peek(&mut self, cpu: &mut Cpu, mapper: &mut dyn Mapper, reg: ApuReg) -> u8 {
        match reg {
            ApuReg::Status => self.peek_4015(cpu, mapper),
            _ => 0x40,
        }
    }

    /// Write through an APU handler
    pub fn poke(&mut self, cpu: &mut Cpu, mapper: &mut dyn Mapper, reg: ApuReg, data: u8) {
        match reg {
            ApuReg::Pulse(n, 0) => {
                self.update_latency(cpu, mapper);
                self.pulse[n].write_control(data);
            }
            ApuReg::Pulse(n, 1) => {
                self.update(cpu, mapper);
                self.pulse[n].write_sweep(data);
            }
            ApuReg::Pulse(n, 2) => {
                self.update(cpu, mapper);
                self.pulse[n].write_timer_low(data);
            }
            ApuReg::Pulse(n, _) => {
                let delta = self.update_delta(cpu, mapper);
                self.pulse[n].write_length_counter_timer_high(data, delta);
            }
            ApuReg::Triangle(0) => {
                self.update(cpu, mapper);
                self.triangle.write_linear_counter(data);
            }
            ApuReg::Triangle(2) => {
                self.update(cpu, mapper);
                self.triangle.write_timer_low(data);
            }
            ApuReg::Triangle(_) => {
                let delta = self.update_delta(cpu, mapper);
                self.triangle.write_length_counter_timer_high(data, delta);
            }
            ApuReg::Noise(0) => {
                self.update_latency(cpu, mapper);
                self.noise.write_control(data);
            }
            ApuReg::Noise(2) => {
                self.update(cpu, mapper);
                self.noise.write_period(data);
            }
            ApuReg::Noise(_) => {
                let delta = self.update_delta(cpu, mapper);
                self.noise.write_length_counter(data, delta);
            }
            ApuReg::Dmc(0) => self.dmc.write_control(cpu, data),
            ApuReg::Dmc(1) => {
                self.update(cpu, mapper);
                self.dmc.write_dac(data);
            }
            ApuReg::Dmc(2) => self.dmc.write_address(data),
            ApuReg::Dmc(_) => self.dmc.write_length(data),
            ApuReg::Status => self.poke_4015(cpu, mapper, data),
            ApuReg::FrameCounter => self.poke_4017(cpu, mapper, data),
            ApuReg::Open => {}
        }
    }

    fn poke_4015(&mut self, cpu: &mut Cpu, mapper: &mut dyn Mapper, data: u8) {
        self.update(cpu, mapper);
        self.pulse[0].enable(data & 0x01 != 0);
        self.pulse[1].enable(data & 0x02 != 0);
        self.triangle.enable(data & 0x04 != 0);
        self.noise.enable(data & 0x08 != 0);
        self.dmc.enable(cpu, mapper, data & 0x10 != 0);
    }

    fn peek_4015(&mut self, cpu: &mut Cpu, mapper: &mut dyn Mapper) -> u8 {
        let elapsed = self.cpu_update(cpu, mapper);
        if self.frame_counter.irq_clock() <= elapsed {
            self.frame_counter.clock_irq(cpu, elapsed);
        }
        if self.frame_counter.counter() < elapsed * self.fixed_clock {
            self.update_to(elapsed);
        }
        cpu.clear_irq(Irq::FRAME)
            | u8::from(self.pulse[0].status())
            | u8::from(self.pulse[1].status()) << 1
            | u8::from(self.triangle.status()) << 2
            | u8::from(self.noise.status()) << 3
            | u8::from(self.dmc.status()) << 4
    }

    /// $4017, reached through the second pad port
    fn poke_4017(&mut self, cpu: &mut Cpu, mapper: &mut dyn Mapper, data: u8) {
        let mut n = self.cpu_update(cpu, mapper);
        if cpu.odd_clock() {
            n += CLK_1;
        }
        self.update_to(n);
        if self.frame_counter.irq_clock() <= n {
            self.frame_counter.clock_irq(cpu, n);
        }
        n += CLK_1;
        self.frame_counter.write(data, n, self.fixed_clock);
        if data & 0x40 != 0 {
            cpu.clear_irq(Irq::FRAME);
        }
        if data & 0x80 != 0 {
            self.clock_oscillators(true);
        }
    }
}
