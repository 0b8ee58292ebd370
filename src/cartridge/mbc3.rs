use crate::cartridge::{RAM_BANK_SIZE, ROM_BANK_SIZE};

/// Seconds, minutes, hours, day-low, day-high — the five clock counter
/// registers, selectable in the external-ram window at 0x08..=0x0c.
pub type RtcRegisters = [u8; 5];

#[derive(Clone)]
pub struct Mbc3 {
    pub(crate) ram_and_timer_enabled: bool,
    // 7 bits, writing 0 selects 1
    pub(crate) rom_bank: u8,
    // 0..=3 selects a ram bank, 0x08..=0x0c selects a clock register
    pub(crate) ram_bank_or_rtc_select: u8,
    // The clock does not advance; it only holds whatever was written.
    pub(crate) rtc: RtcRegisters,
    pub(crate) latched_rtc: RtcRegisters,
    // the latch is armed by writing 0 and fired by writing 1
    pub(crate) rtc_latch_armed: bool,
}

impl Default for Mbc3 {
    fn default() -> Self {
        Self {
            ram_and_timer_enabled: false,
            rom_bank: 1,
            ram_bank_or_rtc_select: 0,
            rtc: [0; 5],
            latched_rtc: [0; 5],
            rtc_latch_armed: false,
        }
    }
}

impl Mbc3 {
    pub fn write_control(&mut self, address: u16, value: u8) {
        match address {
            0x0000..0x2000 => self.ram_and_timer_enabled = value & 0x0f == 0x0a,
            0x2000..0x4000 => {
                let bank = value & 0x7f;
                self.rom_bank = if bank == 0 { 1 } else { bank };
            }
            0x4000..0x6000 => self.ram_bank_or_rtc_select = value & 0x0f,
            0x6000..0x8000 => {
                // https://gbdev.io/pandocs/MBC3.html#6000-7fff---latch-clock-data-write-only
                if self.rtc_latch_armed && value == 0x01 {
                    self.latched_rtc = self.rtc;
                }
                self.rtc_latch_armed = value == 0x00;
            }
            _ => {}
        }
    }

    pub fn rom_offset(&self, address: u16) -> usize {
        usize::from(self.rom_bank) * ROM_BANK_SIZE + usize::from(address) - 0x4000
    }

    pub fn read_ram_or_rtc(&self, ram: &[u8], offset: usize) -> u8 {
        if !self.ram_and_timer_enabled {
            return 0xff;
        }
        match self.ram_bank_or_rtc_select {
            bank @ 0..=3 => ram
                .get(usize::from(bank) * RAM_BANK_SIZE + offset)
                .copied()
                .unwrap_or(0xff),
            select @ 0x08..=0x0c => self.latched_rtc[usize::from(select) - 8],
            _ => 0xff,
        }
    }

    pub fn write_ram_or_rtc(&mut self, ram: &mut [u8], offset: usize, value: u8) {
        if !self.ram_and_timer_enabled {
            return;
        }
        match self.ram_bank_or_rtc_select {
            bank @ 0..=3 => {
                if let Some(slot) = ram.get_mut(usize::from(bank) * RAM_BANK_SIZE + offset) {
                    *slot = value;
                }
            }
            select @ 0x08..=0x0c => self.rtc[usize::from(select) - 8] = value,
            _ => {}
        }
    }
}
