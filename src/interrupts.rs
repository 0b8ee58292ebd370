bitflags::bitflags! {
    #[derive(Debug, Clone, Default, Copy, PartialEq, Eq)]
    pub struct Interrupts: u8 {
        const VBLANK = 1;
        const LCD_STAT = 1 << 1;
        const TIMER = 1 << 2;
        const SERIAL = 1 << 3;
        const JOYPAD = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    VBlank,
    LcdStat,
    Timer,
    Serial,
    Joypad,
}

impl Interrupt {
    pub fn mask(self) -> Interrupts {
        match self {
            Interrupt::VBlank => Interrupts::VBLANK,
            Interrupt::LcdStat => Interrupts::LCD_STAT,
            Interrupt::Timer => Interrupts::TIMER,
            Interrupt::Serial => Interrupts::SERIAL,
            Interrupt::Joypad => Interrupts::JOYPAD,
        }
    }

    // https://gbdev.io/pandocs/Interrupts.html#interrupt-handling
    pub fn vector(self) -> u16 {
        match self {
            Interrupt::VBlank => 0x40,
            Interrupt::LcdStat => 0x48,
            Interrupt::Timer => 0x50,
            Interrupt::Serial => 0x58,
            Interrupt::Joypad => 0x60,
        }
    }
}

/// The single shared interrupt controller. IF keeps 5 bits, IE keeps all 8
/// written bits even though only the low 5 matter for dispatch.
#[derive(Clone, Default)]
pub struct InterruptController {
    pub(crate) flag: Interrupts,
    pub(crate) enable: u8,
}

impl InterruptController {
    pub fn request(&mut self, interrupt: Interrupt) {
        self.flag.insert(interrupt.mask());
    }

    /// Upper three bits always read as set.
    pub fn read_flag(&self) -> u8 {
        self.flag.bits() | 0b11100000
    }

    pub fn write_flag(&mut self, value: u8) {
        self.flag = Interrupts::from_bits_truncate(value);
    }

    pub fn read_enable(&self) -> u8 {
        self.enable
    }

    pub fn write_enable(&mut self, value: u8) {
        self.enable = value;
    }

    /// Highest-priority pending interrupt, i.e. the lowest set bit of
    /// `IF & IE`.
    pub fn pending(&self) -> Option<Interrupt> {
        match (self.flag.bits() & self.enable & 0x1f).trailing_zeros() {
            0 => Some(Interrupt::VBlank),
            1 => Some(Interrupt::LcdStat),
            2 => Some(Interrupt::Timer),
            3 => Some(Interrupt::Serial),
            4 => Some(Interrupt::Joypad),
            _ => None,
        }
    }

    /// Acknowledge an interrupt: clear its IF bit and hand back the vector.
    pub fn service(&mut self, interrupt: Interrupt) -> u16 {
        self.flag.remove(interrupt.mask());
        interrupt.vector()
    }
}
