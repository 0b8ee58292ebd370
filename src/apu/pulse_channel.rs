use crate::apu::{
    envelope::VolumeEnvelope,
    length::LengthCounter,
    sweep::{FrequencySweep, SweepUnit},
};

// https://gbdev.io/pandocs/Audio_Registers.html#ff11--nr11-channel-1-length-timer--duty-cycle
// 12.5%, 25%, 50% and 75% of a duty step octet.
const DUTY_PATTERNS: [[u8; 8]; 4] = [
    [0, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 1, 1, 1],
    [0, 1, 1, 1, 1, 1, 1, 0],
];

/// Square channel; channel 1 carries a `FrequencySweep` in its sweep slot,
/// channel 2 carries `()`.
#[derive(Clone, Default)]
pub struct PulseChannel<S> {
    pub(crate) length: LengthCounter<64>,
    pub(crate) envelope: VolumeEnvelope,
    pub(crate) sweep: S,
    pub(crate) duty: u8,
    pub(crate) duty_step: u8,
    pub(crate) frequency: u16,
    pub(crate) timer: u32,
    pub(crate) enabled: bool,
}

impl<S: SweepUnit + Default> PulseChannel<S> {
    fn period_cycles(&self) -> u32 {
        (2048 - u32::from(self.frequency)) * 4
    }

    /// Advance the frequency timer; every expiry moves the duty pointer.
    pub fn step(&mut self, cycles: u32) {
        let mut remaining = cycles;
        while remaining >= self.timer {
            remaining -= self.timer;
            self.timer = self.period_cycles();
            self.duty_step = (self.duty_step + 1) & 7;
        }
        self.timer -= remaining;
    }

    pub fn tick_length(&mut self) {
        if self.length.tick() {
            self.enabled = false;
        }
    }

    pub fn tick_envelope(&mut self) {
        if self.enabled {
            self.envelope.tick();
        }
    }

    pub fn tick_sweep(&mut self) {
        if !self.enabled {
            return;
        }
        let (alive, written_back) = self.sweep.tick();
        if let Some(frequency) = written_back {
            self.frequency = frequency;
        }
        self.enabled &= alive;
    }

    pub fn is_on(&self) -> bool {
        self.enabled
    }

    /// Digital output in 0.0..=1.0; a silent or DAC-less channel
    /// contributes nothing to the mix.
    pub fn output(&self) -> f32 {
        if !self.enabled || !self.envelope.is_dac_on() {
            return 0.0;
        }
        let bit = DUTY_PATTERNS[usize::from(self.duty)][usize::from(self.duty_step)];
        f32::from(bit * self.envelope.volume()) / 15.0
    }

    fn trigger(&mut self) {
        self.length.trigger();
        self.timer = self.period_cycles();
        self.envelope.trigger();
        self.enabled = self.envelope.is_dac_on();
        if self.enabled {
            self.enabled = self.sweep.trigger(self.frequency);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn read_nrx1(&self) -> u8 {
        self.duty << 6 | 0b00111111
    }

    pub fn write_nrx1(&mut self, value: u8) {
        self.duty = value >> 6;
        self.length.load(u16::from(value & 0x3f));
    }

    pub fn read_nrx2(&self) -> u8 {
        self.envelope.register()
    }

    pub fn write_nrx2(&mut self, value: u8) {
        self.envelope.write_register(value);
        // killing the dac kills the channel
        self.enabled &= self.envelope.is_dac_on();
    }

    pub fn read_nrx3(&self) -> u8 {
        0xff
    }

    pub fn write_nrx3(&mut self, value: u8) {
        self.frequency = self.frequency & 0x700 | u16::from(value);
    }

    pub fn read_nrx4(&self) -> u8 {
        (self.length.is_enabled() as u8) << 6 | 0b10111111
    }

    pub fn write_nrx4(&mut self, value: u8) {
        self.frequency = u16::from(value & 0x07) << 8 | self.frequency & 0xff;
        self.length.set_enabled(value & 0x40 != 0);
        if value & 0x80 != 0 {
            self.trigger();
        }
    }
}

impl PulseChannel<FrequencySweep> {
    pub fn read_nr10(&self) -> u8 {
        self.sweep.register() | 0x80
    }

    pub fn write_nr10(&mut self, value: u8) {
        self.sweep.write_register(value);
    }
}
