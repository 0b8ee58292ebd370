use dotmatrix::Emulator;

mod common;
use common::{ROM_BANK_SIZE, RomBuilder};

#[test]
fn mbc1_low_field_zero_quirk() {
    // distinct marker at the start of every interesting bank
    let rom = RomBuilder::new()
        .kind(0x01)
        .banks(64)
        .at(0x01 * ROM_BANK_SIZE, &[0x11])
        .at(0x20 * ROM_BANK_SIZE, &[0xaa])
        .at(0x21 * ROM_BANK_SIZE, &[0xbb])
        .build();
    let mut emulator = Emulator::new();
    emulator.load_rom(&rom).unwrap();
    assert_eq!(64, emulator.cartridge().rom_banks());

    // writing 0x20 leaves the 5-bit field at zero, which maps to one
    emulator.mmu_mut().write(0x2100, 0x20);
    assert_eq!(0x11, emulator.mmu().read(0x4000));

    // with the upper field set, the quirk lands on 0x21, never 0x20
    emulator.mmu_mut().write(0x4000, 0x01);
    assert_eq!(0xbb, emulator.mmu().read(0x4000));
}

#[test]
fn mbc1_ram_enable_gate() {
    let rom = RomBuilder::new().kind(0x03).ram_code(3).build();
    let mut emulator = Emulator::new();
    emulator.load_rom(&rom).unwrap();

    emulator.mmu_mut().write(0xa000, 0x42);
    assert_eq!(0xff, emulator.mmu().read(0xa000)); // disabled: dropped

    emulator.mmu_mut().write(0x0000, 0x0a);
    emulator.mmu_mut().write(0xa000, 0x42);
    assert_eq!(0x42, emulator.mmu().read(0xa000));

    emulator.mmu_mut().write(0x0000, 0x00);
    assert_eq!(0xff, emulator.mmu().read(0xa000));
}

#[test]
fn mbc1_ram_banking_in_ram_mode() {
    let rom = RomBuilder::new().kind(0x03).ram_code(3).build();
    let mut emulator = Emulator::new();
    emulator.load_rom(&rom).unwrap();

    emulator.mmu_mut().write(0x0000, 0x0a);
    emulator.mmu_mut().write(0x6000, 0x01); // ram-oriented mode
    emulator.mmu_mut().write(0x4000, 0x02);
    emulator.mmu_mut().write(0xa000, 0x22);
    emulator.mmu_mut().write(0x4000, 0x00);
    emulator.mmu_mut().write(0xa000, 0x00);
    emulator.mmu_mut().write(0x4000, 0x02);
    assert_eq!(0x22, emulator.mmu().read(0xa000));
}

#[test]
fn mbc3_rtc_latch_sequence() {
    let rom = RomBuilder::new().kind(0x10).ram_code(3).build();
    let mut emulator = Emulator::new();
    emulator.load_rom(&rom).unwrap();

    emulator.mmu_mut().write(0x0000, 0x0a);
    emulator.mmu_mut().write(0x4000, 0x08); // seconds register
    emulator.mmu_mut().write(0xa000, 33);
    // visible value is the latch snapshot, still zero
    assert_eq!(0, emulator.mmu().read(0xa000));
    emulator.mmu_mut().write(0x6000, 0x00);
    emulator.mmu_mut().write(0x6000, 0x01);
    assert_eq!(33, emulator.mmu().read(0xa000));
}

#[test]
fn mbc5_selects_bank_zero_directly() {
    let rom = RomBuilder::new()
        .kind(0x19)
        .banks(4)
        .at(0x123, &[0x77])
        .at(ROM_BANK_SIZE, &[0x11])
        .build();
    let mut emulator = Emulator::new();
    emulator.load_rom(&rom).unwrap();

    assert_eq!(0x11, emulator.mmu().read(0x4000));
    emulator.mmu_mut().write(0x2000, 0x00);
    assert_eq!(0x77, emulator.mmu().read(0x4000 + 0x123));
}

#[test]
fn battery_ram_round_trip() {
    let rom = RomBuilder::new().kind(0x03).ram_code(2).build();
    let mut emulator = Emulator::new();
    emulator.load_rom(&rom).unwrap();

    emulator.mmu_mut().write(0x0000, 0x0a);
    emulator.mmu_mut().write(0xa000, 0x5a);
    let snapshot = emulator.battery_ram().unwrap().to_vec();
    assert_eq!(0x5a, snapshot[0]);

    let mut fresh = Emulator::new();
    fresh.load_rom(&rom).unwrap();
    fresh.load_battery_ram(&snapshot).unwrap();
    fresh.mmu_mut().write(0x0000, 0x0a);
    assert_eq!(0x5a, fresh.mmu().read(0xa000));
}

#[test]
fn non_battery_cartridge_has_no_snapshot() {
    let rom = RomBuilder::new().kind(0x01).ram_code(2).build();
    let mut emulator = Emulator::new();
    emulator.load_rom(&rom).unwrap();
    assert!(emulator.battery_ram().is_none());
}
