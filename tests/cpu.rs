use dotmatrix::Emulator;

mod common;
use common::RomBuilder;

fn boot(program: &[u8]) -> Emulator {
    let rom = RomBuilder::new().program(program).build();
    let mut emulator = Emulator::new();
    emulator.load_rom(&rom).unwrap();
    emulator
}

#[test]
fn post_boot_fetch_of_ld_a_d8() {
    let mut emulator = boot(&[0x3e, 0x42]);
    let flags_before = emulator.cpu().af() as u8;
    let cycles = emulator.step();
    assert_eq!(8, cycles);
    assert_eq!(0x42, emulator.cpu().af() >> 8);
    assert_eq!(0x0102, emulator.cpu().pc());
    assert_eq!(flags_before, emulator.cpu().af() as u8);
}

#[test]
fn conditional_relative_jump() {
    // post-boot F has Z set, so NZ falls through
    let mut emulator = boot(&[0x20, 0x10]);
    assert_eq!(8, emulator.step());
    assert_eq!(0x0102, emulator.cpu().pc());

    // and Z takes the branch, costing the extra machine cycle
    let mut emulator = boot(&[0x28, 0x10]);
    assert_eq!(12, emulator.step());
    assert_eq!(0x0112, emulator.cpu().pc());
}

#[test]
fn halt_wakes_without_service_when_ime_is_off() {
    // DI; HALT; INC A
    let mut emulator = boot(&[0xf3, 0x76, 0x3c]);
    emulator.mmu_mut().write(0xff0f, 0x00);
    emulator.mmu_mut().write(0xffff, 0x01);
    emulator.step(); // DI
    emulator.step(); // HALT
    assert_eq!(0x0102, emulator.cpu().pc()); // parked past HALT
    assert_eq!(4, emulator.step()); // still asleep

    emulator.mmu_mut().write(0xff0f, 0x01);
    emulator.step();
    // woke and ran INC A without taking the vector
    assert_eq!(0x0103, emulator.cpu().pc());
    assert_eq!(0x02, emulator.cpu().af() >> 8); // post-boot A incremented
    assert_eq!(0x01, emulator.mmu().read(0xff0f) & 0x01);
}

#[test]
fn dispatch_services_the_highest_priority_request() {
    // DI so we can stage IF/IE, then EI; NOP; NOP
    let mut emulator = boot(&[0xf3, 0xfb, 0x00, 0x00]);
    emulator.step(); // DI
    emulator.mmu_mut().write(0xffff, 0x1f);
    emulator.mmu_mut().write(0xff0f, 0x14); // timer and joypad both pending
    emulator.step(); // EI
    emulator.step(); // NOP, after which IME is live
    let cycles = emulator.step();
    assert_eq!(20, cycles);
    assert_eq!(0x0050, emulator.cpu().pc()); // timer vector wins
    assert_eq!(0xf0, emulator.mmu().read(0xff0f)); // its IF bit is gone
}

#[test]
fn bcd_addition_through_daa() {
    // 0x19 + 0x28 adjusted to decimal 47: LD A, 0x19; ADD A, 0x28; DAA
    let mut emulator = boot(&[0x3e, 0x19, 0xc6, 0x28, 0x27]);
    emulator.step();
    emulator.step();
    emulator.step();
    assert_eq!(0x47, emulator.cpu().af() >> 8);
}

#[test]
fn sp_relative_addressing() {
    // LD SP, 0xCFF0; LD HL, SP+0x12; ADD SP, -0x10
    let mut emulator = boot(&[0x31, 0xf0, 0xcf, 0xf8, 0x12, 0xe8, 0xf0]);
    emulator.step();
    assert_eq!(12, emulator.step());
    assert_eq!(0xd002, emulator.cpu().hl());
    assert_eq!(0xcff0, emulator.cpu().sp());
    assert_eq!(16, emulator.step());
    assert_eq!(0xcfe0, emulator.cpu().sp());
}

#[test]
fn stack_round_trip_through_rom_program() {
    // LD BC, 0x1234; PUSH BC; POP DE
    let mut emulator = boot(&[0x01, 0x34, 0x12, 0xc5, 0xd1]);
    emulator.step();
    emulator.step();
    emulator.step();
    assert_eq!(0x1234, emulator.cpu().de());
    assert_eq!(0xfffe, emulator.cpu().sp());
}
