mod mbc1;
mod mbc3;
mod mbc5;

pub use mbc1::Mbc1;
pub use mbc3::{Mbc3, RtcRegisters};
pub use mbc5::Mbc5;

use crate::error::CoreError;

pub const ROM_BANK_SIZE: usize = 0x4000;
pub const RAM_BANK_SIZE: usize = 0x2000;

const HEADER_END: usize = 0x150;
const TITLE_RANGE: core::ops::Range<usize> = 0x134..0x144;

// https://gbdev.io/pandocs/The_Cartridge_Header.html#0147--cartridge-type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartridgeKind {
    RomOnly,
    Mbc1,
    Mbc1Ram,
    Mbc1RamBattery,
    RomRam,
    RomRamBattery,
    Mbc3TimerBattery,
    Mbc3TimerRamBattery,
    Mbc3,
    Mbc3Ram,
    Mbc3RamBattery,
    Mbc5,
    Mbc5Ram,
    Mbc5RamBattery,
    Mbc5Rumble,
    Mbc5RumbleRam,
    Mbc5RumbleRamBattery,
}

impl CartridgeKind {
    pub fn has_battery(self) -> bool {
        use CartridgeKind::*;
        matches!(
            self,
            Mbc1RamBattery
                | RomRamBattery
                | Mbc3TimerBattery
                | Mbc3TimerRamBattery
                | Mbc3RamBattery
                | Mbc5RamBattery
                | Mbc5RumbleRamBattery
        )
    }

    pub fn has_rtc(self) -> bool {
        matches!(
            self,
            CartridgeKind::Mbc3TimerBattery | CartridgeKind::Mbc3TimerRamBattery
        )
    }
}

impl TryFrom<u8> for CartridgeKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::RomOnly),
            0x01 => Ok(Self::Mbc1),
            0x02 => Ok(Self::Mbc1Ram),
            0x03 => Ok(Self::Mbc1RamBattery),
            0x08 => Ok(Self::RomRam),
            0x09 => Ok(Self::RomRamBattery),
            0x0f => Ok(Self::Mbc3TimerBattery),
            0x10 => Ok(Self::Mbc3TimerRamBattery),
            0x11 => Ok(Self::Mbc3),
            0x12 => Ok(Self::Mbc3Ram),
            0x13 => Ok(Self::Mbc3RamBattery),
            0x19 => Ok(Self::Mbc5),
            0x1a => Ok(Self::Mbc5Ram),
            0x1b => Ok(Self::Mbc5RamBattery),
            0x1c => Ok(Self::Mbc5Rumble),
            0x1d => Ok(Self::Mbc5RumbleRam),
            0x1e => Ok(Self::Mbc5RumbleRamBattery),
            _ => Err(value),
        }
    }
}

// https://gbdev.io/pandocs/The_Cartridge_Header.html#0149--ram-size
fn ram_size(code: u8) -> usize {
    match code {
        1 => 0x800,
        2 => 0x2000,
        3 => 0x8000,
        4 => 0x20000,
        5 => 0x10000,
        _ => 0,
    }
}

#[derive(Clone)]
pub enum Controller {
    None,
    Mbc1(Mbc1),
    Mbc3(Mbc3),
    Mbc5(Mbc5),
}

#[derive(Clone)]
pub struct Cartridge {
    rom: Vec<u8>,
    ram: Vec<u8>,
    kind: CartridgeKind,
    title: String,
    rom_banks: usize,
    pub(crate) controller: Controller,
}

impl Default for Cartridge {
    /// An empty slot: every read is open bus, every write is dropped.
    fn default() -> Self {
        Self {
            rom: Vec::new(),
            ram: Vec::new(),
            kind: CartridgeKind::RomOnly,
            title: String::new(),
            rom_banks: 0,
            controller: Controller::None,
        }
    }
}

impl Cartridge {
    pub fn from_bytes(rom: Vec<u8>) -> Result<Self, CoreError> {
        if rom.len() < HEADER_END {
            return Err(CoreError::RomTooShort(rom.len()));
        }

        let kind = CartridgeKind::try_from(rom[0x147])
            .map_err(CoreError::UnsupportedCartridgeType)?;

        let title = rom[TITLE_RANGE]
            .iter()
            .take_while(|&&byte| byte != 0)
            .map(|&byte| char::from(byte))
            .collect::<String>()
            .trim()
            .to_string();

        // https://gbdev.io/pandocs/The_Cartridge_Header.html#014d--header-checksum
        let checksum = rom[0x134..=0x14c]
            .iter()
            .fold(0u8, |sum, &byte| sum.wrapping_sub(byte).wrapping_sub(1));
        if checksum != rom[0x14d] {
            log::warn!(
                "header checksum mismatch: computed 0x{checksum:02x}, header says 0x{:02x}",
                rom[0x14d]
            );
        }

        // https://gbdev.io/pandocs/The_Cartridge_Header.html#0148--rom-size
        let rom_banks = 2usize << rom[0x148];
        if rom.len() != rom_banks * ROM_BANK_SIZE {
            log::warn!(
                "header declares {rom_banks} rom banks, image holds {} bytes",
                rom.len()
            );
        }

        let ram = vec![0; ram_size(rom[0x149])];
        let controller = match kind {
            CartridgeKind::RomOnly | CartridgeKind::RomRam | CartridgeKind::RomRamBattery => {
                Controller::None
            }
            CartridgeKind::Mbc1 | CartridgeKind::Mbc1Ram | CartridgeKind::Mbc1RamBattery => {
                Controller::Mbc1(Mbc1::default())
            }
            CartridgeKind::Mbc3TimerBattery
            | CartridgeKind::Mbc3TimerRamBattery
            | CartridgeKind::Mbc3
            | CartridgeKind::Mbc3Ram
            | CartridgeKind::Mbc3RamBattery => Controller::Mbc3(Mbc3::default()),
            _ => Controller::Mbc5(Mbc5::default()),
        };

        log::info!(
            "loaded \"{title}\" ({kind:?}), {rom_banks} rom banks, {} ram bytes",
            ram.len()
        );

        Ok(Self {
            rom,
            ram,
            kind,
            title,
            rom_banks,
            controller,
        })
    }

    pub fn kind(&self) -> CartridgeKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Bank count declared by the header, `2 << code`.
    pub fn rom_banks(&self) -> usize {
        self.rom_banks
    }

    pub fn rom(&self) -> &[u8] {
        &self.rom
    }

    pub fn read_rom(&self, address: u16) -> u8 {
        let offset = match &self.controller {
            _ if address < 0x4000 => usize::from(address),
            Controller::None => usize::from(address),
            Controller::Mbc1(mbc) => mbc.rom_offset(address),
            Controller::Mbc3(mbc) => mbc.rom_offset(address),
            Controller::Mbc5(mbc) => mbc.rom_offset(address),
        };
        // out-of-range reads float high, as on hardware
        self.rom.get(offset).copied().unwrap_or(0xff)
    }

    /// ROM-region writes never touch the image; they drive bank-switch
    /// state on the controller.
    pub fn write_rom(&mut self, address: u16, value: u8) {
        match &mut self.controller {
            Controller::None => {}
            Controller::Mbc1(mbc) => mbc.write_control(address, value),
            Controller::Mbc3(mbc) => mbc.write_control(address, value),
            Controller::Mbc5(mbc) => mbc.write_control(address, value),
        }
    }

    pub fn read_ext_ram(&self, address: u16) -> u8 {
        let offset = usize::from(address & 0x1fff);
        match &self.controller {
            Controller::None => self.ram.get(offset).copied().unwrap_or(0xff),
            Controller::Mbc1(mbc) => match mbc.ram_offset(offset) {
                Some(offset) => self.ram.get(offset).copied().unwrap_or(0xff),
                None => 0xff,
            },
            Controller::Mbc3(mbc) => mbc.read_ram_or_rtc(&self.ram, offset),
            Controller::Mbc5(mbc) => match mbc.ram_offset(offset) {
                Some(offset) => self.ram.get(offset).copied().unwrap_or(0xff),
                None => 0xff,
            },
        }
    }

    pub fn write_ext_ram(&mut self, address: u16, value: u8) {
        let offset = usize::from(address & 0x1fff);
        match &mut self.controller {
            Controller::None => {
                if let Some(slot) = self.ram.get_mut(offset) {
                    *slot = value;
                }
            }
            Controller::Mbc1(mbc) => {
                if let Some(offset) = mbc.ram_offset(offset)
                    && let Some(slot) = self.ram.get_mut(offset)
                {
                    *slot = value;
                }
            }
            Controller::Mbc3(mbc) => mbc.write_ram_or_rtc(&mut self.ram, offset, value),
            Controller::Mbc5(mbc) => {
                if let Some(offset) = mbc.ram_offset(offset)
                    && let Some(slot) = self.ram.get_mut(offset)
                {
                    *slot = value;
                }
            }
        }
    }

    pub fn battery_ram_snapshot(&self) -> Option<&[u8]> {
        (self.kind.has_battery() && !self.ram.is_empty()).then_some(self.ram.as_slice())
    }

    pub fn load_battery_ram(&mut self, bytes: &[u8]) -> Result<(), CoreError> {
        if bytes.len() > self.ram.len() {
            return Err(CoreError::InvalidBatteryRamSize {
                got: bytes.len(),
                declared: self.ram.len(),
            });
        }
        self.ram[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub(crate) fn ram(&self) -> &[u8] {
        &self.ram
    }

    pub(crate) fn ram_mut(&mut self) -> &mut Vec<u8> {
        &mut self.ram
    }
}
