use crate::interrupts::{Interrupt, InterruptController};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SerialControl: u8 {
        const TRANSFER_ENABLE = 1 << 7;
        const CLOCK_SELECT = 1;
    }
}

// There is no peer on the other end of the link; a transfer shifts out its
// 8 bits at 8192 Hz and then completes locally with 0xff shifted in.
const TRANSFER_DURATION: u32 = 8 * 512;

#[derive(Clone, Default)]
pub struct Serial {
    pub(crate) data: u8,
    pub(crate) control: SerialControl,
    pub(crate) remaining: u32,
}

impl Serial {
    pub fn advance(&mut self, cycles: u32, interrupts: &mut InterruptController) {
        if self.remaining == 0 {
            return;
        }
        self.remaining = self.remaining.saturating_sub(cycles);
        if self.remaining == 0 {
            log::info!("serial transfer of 0x{:02x} completed", self.data);
            self.data = 0xff;
            self.control.remove(SerialControl::TRANSFER_ENABLE);
            interrupts.request(Interrupt::Serial);
        }
    }

    pub fn read_data(&self) -> u8 {
        self.data
    }

    pub fn write_data(&mut self, value: u8) {
        self.data = value;
    }

    pub fn read_control(&self) -> u8 {
        self.control.bits() | 0b01111110
    }

    pub fn write_control(&mut self, value: u8) {
        self.control = SerialControl::from_bits_truncate(value);
        if self.control.contains(SerialControl::TRANSFER_ENABLE) {
            self.remaining = TRANSFER_DURATION;
        }
    }
}
