use tracing::debug;

use crate::cpu::{ApuReg, Cpu, Peek, Poke};

/// NES Controller Button
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Button {
    A = 0,
    B = 1,
    Select = 2,
    Start = 3,
    Up = 4,
    Down = 5,
    Left = 6,
    Right = 7,
}

const UP_DOWN: u8 = 1 << Button::Up as u8 | 1 << Button::Down as u8;
const LEFT_RIGHT: u8 = 1 << Button::Left as u8 | 1 << Button::Right as u8;

/// NES Standard Controller (Joypad)
///
/// The controller uses a shift register that returns button states sequentially.
/// Releasing the strobe (bit 0 of $4016) latches the buttons into it.
pub struct Joypad {
    strobe: bool,
    /// Bitfield: [Right, Left, Down, Up, Start, Select, B, A]
    button_states: u8,
    /// Latched buttons above a zero bit, padded with ones; shifted right on
    /// every read
    stream: i32,
}

impl Joypad {
    pub fn new() -> Self {
        Self {
            strobe: false,
            button_states: 0,
            stream: 0,
        }
    }

    pub fn reset(&mut self) {
        self.strobe = false;
        self.button_states = 0;
        self.stream = 0;
    }

    /// Write to strobe register ($4016)
    pub fn write_strobe(&mut self, value: u8) {
        let prev = self.strobe;
        self.strobe = value & 0x01 != 0;
        if prev && !self.strobe {
            self.stream = ((self.poll_state() as i32) << 1) ^ -512;
        }
    }

    /// Read from controller register ($4016/$4017)
    /// Returns the current button state in bit 0
    pub fn read(&mut self) -> u8 {
        if self.strobe {
            return self.button_states & 1;
        }
        self.stream >>= 1;
        (self.stream & 1) as u8
    }

    /// Set the state of a button
    pub fn set_button(&mut self, button: Button, pressed: bool) {
        let bit = button as u8;
        if pressed {
            self.button_states |= 1 << bit;
        } else {
            self.button_states &= !(1 << bit);
        }
    }

    /// Replace all buttons at once, A in bit 0
    pub fn set_buttons(&mut self, state: u8) {
        self.button_states = state;
    }

    pub fn buttons(&self) -> u8 {
        self.button_states
    }

    /// Buttons as the console sees them; opposite directions cancel
    fn poll_state(&self) -> u8 {
        let mut state = self.button_states;
        if state & UP_DOWN == UP_DOWN {
            state &= !UP_DOWN;
        }
        if state & LEFT_RIGHT == LEFT_RIGHT {
            state &= !LEFT_RIGHT;
        }
        state
    }
}

/// The two controller ports
pub struct Pads {
    pads: [Joypad; 2],
}

impl Pads {
    pub fn new() -> Self {
        Self {
            pads: [Joypad::new(), Joypad::new()],
        }
    }

    /// Clear both pads and map $4016/$4017. The $4017 write side belongs to
    /// the APU frame counter.
    pub fn reset(&mut self, cpu: &mut Cpu) {
        for pad in &mut self.pads {
            pad.reset();
        }
        cpu.add_mappings([0x4016], Peek::Pad(0), Poke::PadStrobe);
        cpu.add_mappings([0x4017], Peek::Pad(1), Poke::Apu(ApuReg::FrameCounter));
        debug!("pads reset");
    }

    /// Bit 0 of the pad's shift register, with the open bus bit 6 set
    pub fn peek(&mut self, port: usize) -> u8 {
        self.pads[port].read() | 0x40
    }

    /// $4016 writes strobe both pads
    pub fn poke_strobe(&mut self, data: u8) {
        for pad in &mut self.pads {
            pad.write_strobe(data);
        }
    }

    pub fn pad_mut(&mut self, port: usize) -> &mut Joypad {
        &mut self.pads[port]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latch(joypad: &mut Joypad) {
        joypad.write_strobe(1);
        joypad.write_strobe(0);
    }

    #[test]
    fn test_new_joypad() {
        let joypad = Joypad::new();
        assert!(!joypad.strobe);
        assert_eq!(joypad.button_states, 0);
        assert_eq!(joypad.stream, 0);
    }

    #[test]
    fn test_sequential_button_reading() {
        let mut joypad = Joypad::new();

        // Press A, Start, and Right
        joypad.set_button(Button::A, true);
        joypad.set_button(Button::Start, true);
        joypad.set_button(Button::Right, true);
        latch(&mut joypad);

        // Read buttons in order: A, B, Select, Start, Up, Down, Left, Right
        let reads: Vec<u8> = (0..8).map(|_| joypad.read()).collect();
        assert_eq!(reads, [1, 0, 0, 1, 0, 0, 0, 1]);
    }

    #[test]
    fn test_ninth_read_returns_one() {
        let mut joypad = Joypad::new();
        latch(&mut joypad);

        for _ in 0..8 {
            assert_eq!(joypad.read(), 0);
        }

        // 9th and subsequent reads should return 1
        for _ in 0..16 {
            assert_eq!(joypad.read(), 1);
        }
    }

    #[test]
    fn test_strobe_holds_button_a() {
        let mut joypad = Joypad::new();
        joypad.set_button(Button::A, true);
        joypad.write_strobe(1);

        // Reading while strobe=1 should keep returning A
        assert_eq!(joypad.read(), 1);
        assert_eq!(joypad.read(), 1);

        // Pressing while strobed is seen straight away
        joypad.set_button(Button::A, false);
        assert_eq!(joypad.read(), 0);
    }

    #[test]
    fn test_buttons_latched_on_falling_edge() {
        let mut joypad = Joypad::new();
        joypad.set_button(Button::B, true);
        latch(&mut joypad);

        // Changes after the latch wait for the next strobe
        joypad.set_button(Button::B, false);
        joypad.set_button(Button::A, true);
        assert_eq!(joypad.read(), 0);
        assert_eq!(joypad.read(), 1);

        latch(&mut joypad);
        assert_eq!(joypad.read(), 1);
        assert_eq!(joypad.read(), 0);
    }

    #[test]
    fn test_opposite_directions_cancel() {
        let mut joypad = Joypad::new();
        joypad.set_buttons(0xff);
        latch(&mut joypad);
        let reads: Vec<u8> = (0..8).map(|_| joypad.read()).collect();
        assert_eq!(reads, [1, 1, 1, 1, 0, 0, 0, 0]);

        joypad.set_buttons(1 << Button::Up as u8 | 1 << Button::Left as u8);
        latch(&mut joypad);
        let reads: Vec<u8> = (0..8).map(|_| joypad.read()).collect();
        assert_eq!(reads, [0, 0, 0, 0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_pads_share_strobe() {
        let mut cpu = Cpu::new();
        let mut pads = Pads::new();
        pads.reset(&mut cpu);
        assert_eq!(cpu.peek_handler(0x4017), Peek::Pad(1));
        assert_eq!(cpu.poke_handler(0x4017), Poke::Apu(ApuReg::FrameCounter));

        pads.pad_mut(1).set_button(Button::A, true);
        pads.poke_strobe(1);
        pads.poke_strobe(0);
        assert_eq!(pads.peek(0), 0x40);
        assert_eq!(pads.peek(1), 0x41);
    }
}
