//! Master clock units shared by the CPU, PPU and APU.
//!
//! All scheduling happens on one timeline measured in master clocks. One CPU
//! cycle is 12 master clocks and one PPU dot is 4, so every component can
//! compare its own position against the CPU clock without conversion.

/// A point on the master timeline, relative to the start of the current frame.
pub type Clock = i64;

/// Sentinel meaning "not scheduled".
pub const FOREVER_CLOCK: Clock = 0xffff_ffff;

/// Master clocks per CPU cycle.
pub const RP2A03_CC: Clock = 12;

/// Master clocks per PPU dot.
pub const RP2C02_CC: Clock = 4;

pub const CLK_1: Clock = RP2A03_CC;
pub const CLK_2: Clock = 2 * RP2A03_CC;
pub const CLK_3: Clock = 3 * RP2A03_CC;
pub const CLK_4: Clock = 4 * RP2A03_CC;
pub const CLK_5: Clock = 5 * RP2A03_CC;
pub const CLK_6: Clock = 6 * RP2A03_CC;
pub const CLK_7: Clock = 7 * RP2A03_CC;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_cycle_is_three_dots() {
        assert_eq!(CLK_1, 3 * RP2C02_CC);
        assert_eq!(CLK_7, 84);
    }
}
