use crate::clock::{CLK_1, Clock, FOREVER_CLOCK, RP2A03_CC};
use crate::cpu::{Cpu, Irq};

const fn cycles<const N: usize>(n: [Clock; N]) -> [Clock; N] {
    let mut out = [0; N];
    let mut i = 0;
    while i < N {
        out[i] = n[i] * RP2A03_CC;
        i += 1;
    }
    out
}

/// Frame IRQ schedule: first assertion, then the three clocks it stays
/// asserted for before the sequence repeats
const FRAME_CLOCKS: [Clock; 4] = cycles([29830, 1, 1, 29828]);

/// Clocks between sequencer steps in 4-step and 5-step mode
const OSCILLATOR_CLOCKS: [[Clock; 4]; 2] = [
    cycles([7458, 7456, 7458, 7458]),
    cycles([7458, 7456, 7458, 7458 + 7452]),
];

/// Frame sequencer for the APU.
///
/// `counter` is kept in master clocks scaled by the APU fixed-point factor
/// so it can be compared against the sample rate counter directly. The IRQ
/// clock is in plain master clocks.
pub struct FrameCounter {
    counter: Clock,
    divider: u8,
    irq_clock: Clock,
    irq_repeat: usize,
    five_step: bool,
}

impl Default for FrameCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCounter {
    pub fn new() -> Self {
        Self {
            counter: 0,
            divider: 0,
            irq_clock: 0,
            irq_repeat: 0,
            five_step: false,
        }
    }

    pub fn reset(&mut self, fixed_clock: Clock) {
        self.divider = 0;
        self.irq_clock = FOREVER_CLOCK;
        self.irq_repeat = 0;
        self.counter = FRAME_CLOCKS[0] * fixed_clock;
        self.five_step = false;
    }

    /// Move the counter to a new fixed-point factor
    pub fn rescale(&mut self, old_fixed: Clock, new_fixed: Clock) {
        self.counter = self.counter / old_fixed * new_fixed;
    }

    /// Schedule the first frame IRQ after power-on
    pub fn arm_irq(&mut self, fixed_clock: Clock) {
        self.irq_clock = self.counter / fixed_clock - CLK_1;
    }

    /// Next step, fixed-point scaled
    pub fn counter(&self) -> Clock {
        self.counter
    }

    pub fn irq_clock(&self) -> Clock {
        self.irq_clock
    }

    pub fn is_five_step(&self) -> bool {
        self.five_step
    }

    /// Advance one sequencer step. Returns true on half-frame steps, which
    /// also clock length counters and sweeps.
    pub fn step(&mut self, fixed_clock: Clock) -> bool {
        let half_frame = self.divider & 1 == 1;
        self.divider = (self.divider + 1) & 3;
        let clocks = &OSCILLATOR_CLOCKS[self.five_step as usize];
        self.counter += clocks[self.divider as usize] * fixed_clock;
        half_frame
    }

    /// Assert the frame IRQ and move to the next assertion after `target`
    pub fn clock_irq(&mut self, cpu: &mut Cpu, target: Clock) {
        cpu.request_irq(Irq::FRAME, self.irq_clock);
        loop {
            self.irq_clock += FRAME_CLOCKS[1 + self.irq_repeat % 3];
            self.irq_repeat += 1;
            if self.irq_clock > target {
                break;
            }
        }
    }

    /// $4017 write, taking effect at master clock `clk`
    pub fn write(&mut self, data: u8, clk: Clock, fixed_clock: Clock) {
        self.five_step = data & 0x80 != 0;
        let clocks = &OSCILLATOR_CLOCKS[self.five_step as usize];
        self.counter = (clk + clocks[0]) * fixed_clock;
        self.divider = 0;
        self.irq_clock = if data & 0xc0 != 0 {
            FOREVER_CLOCK
        } else {
            clk + FRAME_CLOCKS[0]
        };
        self.irq_repeat = 0;
    }

    /// Rebase onto the next frame
    pub fn vsync(&mut self, frame: Clock, fixed_clock: Clock) {
        if self.irq_clock != FOREVER_CLOCK {
            self.irq_clock -= frame;
        }
        self.counter -= frame * fixed_clock;
    }
}
