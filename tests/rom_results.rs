mod common;

use common::{RomBuilder, RomResult, count_pixels, run_until_result};
use nestep::palette::PALETTE;
use nestep::{Config, Nes};

/// Waits for two vblanks, then reports `status` through $6000
#[rustfmt::skip]
fn reporter(status: u8) -> Vec<u8> {
    vec![
        0xa9, 0x80,             // $8000 LDA #$80
        0x8d, 0x00, 0x60,       //       STA $6000
        0xad, 0x02, 0x20,       // $8005 LDA $2002
        0x10, 0xfb,             //       BPL $8005
        0xad, 0x02, 0x20,       // $800A LDA $2002
        0x10, 0xfb,             //       BPL $800A
        0xa9, 0xde, 0x8d, 0x01, 0x60,
        0xa9, 0xb0, 0x8d, 0x02, 0x60,
        0xa9, 0x61, 0x8d, 0x03, 0x60,
        0xa9, status, 0x8d, 0x00, 0x60,
        0x4c, 0x23, 0x80,       // $8023 JMP $8023
    ]
}

#[test]
fn test_rom_reports_pass() {
    let rom = RomBuilder::new(&reporter(0x00)).build();
    let mut nes = Nes::new(&Config::default(), &rom).unwrap();
    assert_eq!(run_until_result(&mut nes, 10), RomResult::Pass);
    assert!(nes.frame() >= 2);
}

#[test]
fn test_rom_reports_failure_code() {
    let rom = RomBuilder::new(&reporter(0x03)).build();
    let mut nes = Nes::new(&Config::default(), &rom).unwrap();
    assert_eq!(run_until_result(&mut nes, 10), RomResult::Fail(0x03));
}

#[test]
fn test_silent_rom_times_out() {
    let rom = RomBuilder::new(&[0x4c, 0x00, 0x80]).build();
    let mut nes = Nes::new(&Config::default(), &rom).unwrap();
    assert_eq!(run_until_result(&mut nes, 5), RomResult::Timeout);
}

/// Sixteen solid white sprites side by side on lines $41-$48, copied into
/// OAM by DMA on every NMI.
#[rustfmt::skip]
const SPRITE_ROW: [u8; 88] = [
    0xa2, 0x00,             // $8000 LDX #$00
    0xa9, 0xff,             //       LDA #$FF
    0x9d, 0x00, 0x02,       // $8004 STA $0200,X
    0xe8,                   //       INX
    0xd0, 0xfa,             //       BNE $8004
    0xa2, 0x00,             //       LDX #$00
    0xa9, 0x40,             // $800C LDA #$40
    0x9d, 0x00, 0x02,       //       STA $0200,X
    0xa9, 0x01,             //       LDA #$01
    0x9d, 0x01, 0x02,       //       STA $0201,X
    0xa9, 0x00,             //       LDA #$00
    0x9d, 0x02, 0x02,       //       STA $0202,X
    0x8a,                   //       TXA
    0x0a,                   //       ASL A
    0x0a,                   //       ASL A
    0x9d, 0x03, 0x02,       //       STA $0203,X
    0xe8, 0xe8, 0xe8, 0xe8, //       INX * 4
    0xe0, 0x40,             //       CPX #$40
    0xd0, 0xe3,             //       BNE $800C
    0xa9, 0x3f, 0x8d, 0x06, 0x20,
    0xa9, 0x11, 0x8d, 0x06, 0x20,
    0xa9, 0x30, 0x8d, 0x07, 0x20, // $3F11 = white
    0xa9, 0x00, 0x8d, 0x06, 0x20, 0x8d, 0x06, 0x20,
    0xa9, 0x14, 0x8d, 0x01, 0x20, // sprites only, left edge too
    0xa9, 0x80, 0x8d, 0x00, 0x20, // NMI on
    0x4c, 0x4a, 0x80,       // $804A JMP $804A
    // NMI
    0xa9, 0x00, 0x8d, 0x03, 0x20,
    0xa9, 0x02, 0x8d, 0x14, 0x40,
    0x40,                   //       RTI
];

fn sprite_row_frame(sprite_limit: bool) -> Nes {
    let rom = RomBuilder::new(&SPRITE_ROW)
        .nmi(0x804d)
        .chr(|addr| if (0x10..0x18).contains(&addr) { 0xff } else { 0x00 })
        .build();
    let config = Config {
        sprite_limit,
        ..Config::default()
    };
    let mut nes = Nes::new(&config, &rom).unwrap();
    for _ in 0..5 {
        nes.step();
    }
    nes
}

#[test]
fn test_sprites_drawn_from_dma() {
    let nes = sprite_row_frame(false);
    assert_eq!(count_pixels(&nes, PALETTE[0x30]), 16 * 8 * 8);
}

#[test]
fn test_sprite_limit_drops_ninth_sprite() {
    let nes = sprite_row_frame(true);
    assert_eq!(count_pixels(&nes, PALETTE[0x30]), 8 * 8 * 8);
}
