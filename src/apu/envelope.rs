use super::CHANNEL_OUTPUT_MUL;

/// Volume envelope shared by the pulse and noise channels
pub struct Envelope {
    output: i64,
    count: u8,
    volume_base: u8,
    volume: u8,
    constant: bool,
    looping: bool,
    reset: bool,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

impl Envelope {
    pub fn new() -> Self {
        let mut envelope = Self {
            output: 0,
            count: 0,
            volume_base: 0,
            volume: 0,
            constant: true,
            looping: false,
            reset: false,
        };
        envelope.reset();
        envelope
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.volume_base = 0;
        self.volume = 0;
        self.constant = true;
        self.looping = false;
        self.reset = false;
        self.update_output();
    }

    /// Current volume scaled to the channel output range
    pub fn output(&self) -> i64 {
        self.output
    }

    /// Loop flag, which doubles as the length counter halt flag
    pub fn looping(&self) -> bool {
        self.looping
    }

    /// Restart the decay on the next quarter frame ($4003/$4007/$400F write)
    pub fn reset_clock(&mut self) {
        self.reset = true;
    }

    /// Quarter-frame clock
    pub fn clock(&mut self) {
        if self.reset {
            self.reset = false;
            self.volume = 0x0f;
        } else {
            if self.count != 0 {
                self.count -= 1;
                return;
            }
            if self.volume != 0 || self.looping {
                self.volume = self.volume.wrapping_sub(1) & 0x0f;
            }
        }
        self.count = self.volume_base;
        self.update_output();
    }

    /// $4000/$4004/$400C
    pub fn write(&mut self, data: u8) {
        self.volume_base = data & 0x0f;
        self.constant = data & 0x10 != 0;
        self.looping = data & 0x20 != 0;
        self.update_output();
    }

    fn update_output(&mut self) {
        let volume = if self.constant {
            self.volume_base
        } else {
            self.volume
        };
        self.output = volume as i64 * CHANNEL_OUTPUT_MUL;
    }
}
