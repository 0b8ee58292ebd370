pub(crate) mod envelope;
pub(crate) mod length;
mod noise_channel;
mod pulse_channel;
mod sweep;
mod wave_channel;

pub use noise_channel::NoiseChannel;
pub use pulse_channel::PulseChannel;
pub use sweep::{FrequencySweep, SweepUnit};
pub use wave_channel::WaveChannel;

// https://gbdev.io/pandocs/Audio_details.html#div-apu
// The frame sequencer steps at 512 Hz and distributes length, sweep and
// envelope clocks over an eight-step cycle.
const SEQUENCER_PERIOD: u32 = 8192;

pub const SAMPLE_RATE: u32 = 44100;
const CYCLES_PER_SAMPLE: f64 = 4_194_304.0 / SAMPLE_RATE as f64;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Nr52: u8 {
        const AUDIO_ON_OFF = 1 << 7;
        const CH4_ON = 1 << 3;
        const CH3_ON = 1 << 2;
        const CH2_ON = 1 << 1;
        const CH1_ON = 1;
    }
}

#[derive(Clone)]
pub struct Apu {
    pub(crate) enabled: bool,
    pub(crate) nr50: u8,
    pub(crate) nr51: u8,
    pub(crate) ch1: PulseChannel<FrequencySweep>,
    pub(crate) ch2: PulseChannel<()>,
    pub(crate) ch3: WaveChannel,
    pub(crate) ch4: NoiseChannel,
    pub(crate) sequencer_timer: u32,
    pub(crate) sequencer_step: u8,
    pub(crate) sample_counter: f64,
    pub(crate) samples: Vec<f32>,
}

impl Default for Apu {
    fn default() -> Self {
        Self {
            enabled: false,
            nr50: 0,
            nr51: 0,
            ch1: PulseChannel::default(),
            ch2: PulseChannel::default(),
            ch3: WaveChannel::default(),
            ch4: NoiseChannel::default(),
            sequencer_timer: SEQUENCER_PERIOD,
            sequencer_step: 0,
            sample_counter: 0.0,
            samples: Vec::new(),
        }
    }
}

impl Apu {
    pub fn advance(&mut self, cycles: u32) {
        let mut remaining = cycles;
        while remaining > 0 {
            let step = remaining.min(self.sequencer_timer);
            if self.enabled {
                self.ch1.step(step);
                self.ch2.step(step);
                self.ch3.step(step);
                self.ch4.step(step);
            }
            self.sequencer_timer -= step;
            if self.sequencer_timer == 0 {
                self.sequencer_timer = SEQUENCER_PERIOD;
                if self.enabled {
                    self.tick_sequencer();
                }
            }

            // sample cadence keeps running with the master switch off, the
            // stream just carries silence
            self.sample_counter += f64::from(step);
            while self.sample_counter >= CYCLES_PER_SAMPLE {
                self.sample_counter -= CYCLES_PER_SAMPLE;
                let (left, right) = self.mix();
                self.samples.push(left);
                self.samples.push(right);
            }

            remaining -= step;
        }
    }

    fn tick_sequencer(&mut self) {
        if self.sequencer_step % 2 == 0 {
            self.ch1.tick_length();
            self.ch2.tick_length();
            self.ch3.tick_length();
            self.ch4.tick_length();
        }
        if self.sequencer_step == 2 || self.sequencer_step == 6 {
            self.ch1.tick_sweep();
        }
        if self.sequencer_step == 7 {
            self.ch1.tick_envelope();
            self.ch2.tick_envelope();
            self.ch4.tick_envelope();
        }
        self.sequencer_step = (self.sequencer_step + 1) & 7;
    }

    fn mix(&self) -> (f32, f32) {
        let outputs = [
            self.ch1.output(),
            self.ch2.output(),
            self.ch3.output(),
            self.ch4.output(),
        ];
        let mut left = 0.0;
        let mut right = 0.0;
        for (channel, output) in outputs.into_iter().enumerate() {
            if self.nr51 & 1 << (4 + channel) != 0 {
                left += output;
            }
            if self.nr51 & 1 << channel != 0 {
                right += output;
            }
        }
        left *= f32::from(self.nr50 >> 4 & 0x07) / 7.0;
        right *= f32::from(self.nr50 & 0x07) / 7.0;
        // quarter-scale headroom against four channels summing
        (
            (left * 0.25).clamp(-1.0, 1.0),
            (right * 0.25).clamp(-1.0, 1.0),
        )
    }

    /// Drain the interleaved stereo stream accumulated since the last call.
    pub fn take_samples(&mut self) -> Vec<f32> {
        core::mem::take(&mut self.samples)
    }

    pub fn read_nr52(&self) -> u8 {
        let mut flags = Nr52::empty();
        flags.set(Nr52::AUDIO_ON_OFF, self.enabled);
        flags.set(Nr52::CH4_ON, self.ch4.is_on());
        flags.set(Nr52::CH3_ON, self.ch3.is_on());
        flags.set(Nr52::CH2_ON, self.ch2.is_on());
        flags.set(Nr52::CH1_ON, self.ch1.is_on());
        flags.bits() | 0b01110000
    }

    /// Turning the master switch off clears every channel register and
    /// disables the channels; while it is off nothing but NR52 itself is
    /// writable.
    pub fn write_nr52(&mut self, value: u8) {
        let enabled = Nr52::from_bits_retain(value).contains(Nr52::AUDIO_ON_OFF);
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if !enabled {
            log::info!("audio master off, clearing channel registers");
            self.ch1.reset();
            self.ch2.reset();
            self.ch3.reset();
            self.ch4.reset();
            self.nr50 = 0;
            self.nr51 = 0;
        } else {
            self.sequencer_timer = SEQUENCER_PERIOD;
            self.sequencer_step = 0;
        }
    }

    pub fn read(&self, index: u16) -> u8 {
        match index {
            0xff10 => self.ch1.read_nr10(),
            0xff11 => self.ch1.read_nrx1(),
            0xff12 => self.ch1.read_nrx2(),
            0xff13 => self.ch1.read_nrx3(),
            0xff14 => self.ch1.read_nrx4(),
            0xff16 => self.ch2.read_nrx1(),
            0xff17 => self.ch2.read_nrx2(),
            0xff18 => self.ch2.read_nrx3(),
            0xff19 => self.ch2.read_nrx4(),
            0xff1a => self.ch3.read_nr30(),
            0xff1b => self.ch3.read_nr31(),
            0xff1c => self.ch3.read_nr32(),
            0xff1d => self.ch3.read_nr33(),
            0xff1e => self.ch3.read_nr34(),
            0xff20 => self.ch4.read_nr41(),
            0xff21 => self.ch4.read_nr42(),
            0xff22 => self.ch4.read_nr43(),
            0xff23 => self.ch4.read_nr44(),
            0xff24 => self.nr50,
            0xff25 => self.nr51,
            0xff26 => self.read_nr52(),
            0xff30..=0xff3f => self.ch3.read_ram((index - 0xff30) as u8),
            _ => 0xff,
        }
    }

    pub fn write(&mut self, index: u16, value: u8) {
        // wave ram and the master switch stay reachable with the apu off
        match (index, self.enabled) {
            (0xff10, true) => self.ch1.write_nr10(value),
            (0xff11, true) => self.ch1.write_nrx1(value),
            (0xff12, true) => self.ch1.write_nrx2(value),
            (0xff13, true) => self.ch1.write_nrx3(value),
            (0xff14, true) => self.ch1.write_nrx4(value),
            (0xff16, true) => self.ch2.write_nrx1(value),
            (0xff17, true) => self.ch2.write_nrx2(value),
            (0xff18, true) => self.ch2.write_nrx3(value),
            (0xff19, true) => self.ch2.write_nrx4(value),
            (0xff1a, true) => self.ch3.write_nr30(value),
            (0xff1b, true) => self.ch3.write_nr31(value),
            (0xff1c, true) => self.ch3.write_nr32(value),
            (0xff1d, true) => self.ch3.write_nr33(value),
            (0xff1e, true) => self.ch3.write_nr34(value),
            (0xff20, true) => self.ch4.write_nr41(value),
            (0xff21, true) => self.ch4.write_nr42(value),
            (0xff22, true) => self.ch4.write_nr43(value),
            (0xff23, true) => self.ch4.write_nr44(value),
            (0xff24, true) => self.nr50 = value,
            (0xff25, true) => self.nr51 = value,
            (0xff26, _) => self.write_nr52(value),
            (0xff30..=0xff3f, _) => self.ch3.write_ram((index - 0xff30) as u8, value),
            _ => {}
        }
    }
}
