//! Save-state codec. The wire format is a one-byte magic, a one-byte
//! version, the little-endian uncompressed size, the DEFLATE-compressed
//! JSON document, and the first four bytes of a SHA-256 digest over
//! everything before them.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use flate2::{Compression, read::DeflateDecoder, write::DeflateEncoder};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    Emulator,
    cartridge::Controller,
    cpu::Flags,
    error::CoreError,
    interrupts::Interrupts,
    mmu::{HRAM_SIZE, WRAM_SIZE},
    ppu::{FRAME_BYTES, LcdControl, LcdStatus, Mode, OAM_SIZE, VRAM_SIZE},
    serial::SerialControl,
};

const MAGIC: u8 = 0x47;
const VERSION: u8 = 1;
// magic + version + size + checksum around an empty payload
const MIN_LEN: usize = 1 + 1 + 4 + 4;
const MAX_UNCOMPRESSED: u32 = 10 * 1024 * 1024;
const CHECKSUM_LEN: usize = 4;
const HASHED_ROM_PREFIX: usize = 0x8000;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateJson {
    version: u8,
    created_at: u64,
    cartridge_title: String,
    cartridge_hash: Vec<u8>,
    cpu: CpuState,
    work_ram: Vec<u8>,
    video_ram: Vec<u8>,
    oam_ram: Vec<u8>,
    external_ram: Vec<u8>,
    high_ram: Vec<u8>,
    timer: TimerState,
    ppu: PpuState,
    apu: ApuState,
    mbc: MbcState,
    io_registers: BTreeMap<u16, u8>,
    interrupts: InterruptState,
    joypad: JoypadState,
    serial: SerialState,
    dma: DmaState,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CpuState {
    a: u8,
    b: u8,
    c: u8,
    d: u8,
    e: u8,
    h: u8,
    l: u8,
    f: u8,
    sp: u16,
    pc: u16,
    ime: bool,
    ei_delay: u8,
    halted: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimerState {
    divider: u16,
    prescaler: u32,
    tima: u8,
    tma: u8,
    tac: u8,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PpuState {
    lcdc: u8,
    stat: u8,
    scy: u8,
    scx: u8,
    ly: u8,
    lyc: u8,
    wy: u8,
    wx: u8,
    bgp: u8,
    obp0: u8,
    obp1: u8,
    mode: u8,
    dot: u32,
    stat_line: bool,
    framebuffer: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApuState {
    enabled: bool,
    nr50: u8,
    nr51: u8,
    sequencer_timer: u32,
    sequencer_step: u8,
    wave_pattern: Vec<u8>,
    ch1: PulseState,
    ch2: PulseState,
    ch3: WaveState,
    ch4: NoiseState,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PulseState {
    duty: u8,
    duty_step: u8,
    frequency: u16,
    timer: u32,
    enabled: bool,
    length: LengthState,
    envelope: EnvelopeState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sweep: Option<SweepState>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WaveState {
    dac_enabled: bool,
    output_level: u8,
    frequency: u16,
    timer: u32,
    position: u8,
    enabled: bool,
    length: LengthState,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoiseState {
    nr43: u8,
    lfsr: u16,
    timer: u32,
    enabled: bool,
    length: LengthState,
    envelope: EnvelopeState,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LengthState {
    enabled: bool,
    counter: u16,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeState {
    register: u8,
    volume: u8,
    timer: u8,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SweepState {
    register: u8,
    shadow: u16,
    timer: u8,
    enabled: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum MbcState {
    None,
    #[serde(rename_all = "camelCase")]
    Mbc1 {
        ram_enabled: bool,
        rom_bank_low: u8,
        ram_bank_or_rom_high: u8,
        mode: u8,
    },
    #[serde(rename_all = "camelCase")]
    Mbc3 {
        ram_and_timer_enabled: bool,
        rom_bank: u8,
        ram_bank_or_rtc_select: u8,
        rtc: Vec<u8>,
        latched_rtc: Vec<u8>,
        rtc_latch_armed: bool,
    },
    #[serde(rename_all = "camelCase")]
    Mbc5 {
        ram_enabled: bool,
        rom_bank: u16,
        ram_bank: u8,
    },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InterruptState {
    flag: u8,
    enable: u8,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoypadState {
    a: bool,
    b: bool,
    select: bool,
    start: bool,
    right: bool,
    left: bool,
    up: bool,
    down: bool,
    dpad_selected: bool,
    buttons_selected: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SerialState {
    data: u8,
    control: u8,
    remaining: u32,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DmaState {
    active: bool,
    register: u8,
    index: u16,
}

fn cartridge_hash(rom: &[u8]) -> Vec<u8> {
    let prefix = &rom[..rom.len().min(HASHED_ROM_PREFIX)];
    Sha256::digest(prefix)[..CHECKSUM_LEN].to_vec()
}

// The documented register window, captured for hosts that want a raw view.
const IO_SNAPSHOT: [u16; 22] = [
    0xff00, 0xff01, 0xff02, 0xff04, 0xff05, 0xff06, 0xff07, 0xff0f, 0xff40, 0xff41, 0xff42,
    0xff43, 0xff44, 0xff45, 0xff46, 0xff47, 0xff48, 0xff49, 0xff4a, 0xff4b, 0xff24, 0xff25,
];

pub fn save(emulator: &Emulator) -> Vec<u8> {
    let payload =
        serde_json::to_vec(&capture(emulator)).expect("state snapshot always serializes");

    let mut data = vec![MAGIC, VERSION];
    data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    let mut encoder = DeflateEncoder::new(&mut data, Compression::default());
    encoder
        .write_all(&payload)
        .expect("deflate into memory never fails");
    encoder.finish().expect("deflate into memory never fails");

    let checksum = Sha256::digest(&data);
    data.extend_from_slice(&checksum[..CHECKSUM_LEN]);
    data
}

pub fn load(emulator: &mut Emulator, bytes: &[u8]) -> Result<(), CoreError> {
    if bytes.first() != Some(&MAGIC) {
        return Err(CoreError::SaveStateMagicInvalid);
    }
    if bytes.len() < MIN_LEN {
        return Err(CoreError::SaveStateMalformedJson);
    }
    if bytes[1] != VERSION {
        return Err(CoreError::SaveStateVersionUnsupported(bytes[1]));
    }

    let size = u32::from_le_bytes(bytes[2..6].try_into().expect("fixed slice"));
    if size == 0 || size > MAX_UNCOMPRESSED {
        return Err(CoreError::SaveStateMalformedJson);
    }

    let (framed, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    if Sha256::digest(framed)[..CHECKSUM_LEN] != *checksum {
        return Err(CoreError::SaveStateChecksumMismatch);
    }

    let mut payload = Vec::with_capacity(size as usize);
    DeflateDecoder::new(&framed[6..])
        .take(u64::from(size) + 1)
        .read_to_end(&mut payload)
        .map_err(|_| CoreError::SaveStateMalformedJson)?;
    if payload.len() != size as usize {
        return Err(CoreError::SaveStateMalformedJson);
    }

    let state: StateJson =
        serde_json::from_slice(&payload).map_err(|_| CoreError::SaveStateMalformedJson)?;
    if state.version != VERSION {
        return Err(CoreError::SaveStateVersionUnsupported(state.version));
    }
    if state.cartridge_hash != cartridge_hash(emulator.mmu.cartridge.rom()) {
        return Err(CoreError::SaveStateIncompatibleWithRom);
    }

    apply(emulator, state)
}

fn capture(emulator: &Emulator) -> StateJson {
    let cpu = &emulator.cpu;
    let mmu = &emulator.mmu;
    let created_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);

    StateJson {
        version: VERSION,
        created_at,
        cartridge_title: mmu.cartridge.title().to_string(),
        cartridge_hash: cartridge_hash(mmu.cartridge.rom()),
        cpu: CpuState {
            a: cpu.a,
            b: cpu.b,
            c: cpu.c,
            d: cpu.d,
            e: cpu.e,
            h: cpu.h,
            l: cpu.l,
            f: cpu.f.bits(),
            sp: cpu.sp,
            pc: cpu.pc,
            ime: cpu.ime,
            ei_delay: cpu.ei_delay,
            halted: cpu.halted,
        },
        work_ram: mmu.wram.to_vec(),
        video_ram: mmu.video_ram.to_vec(),
        oam_ram: mmu.oam.to_vec(),
        external_ram: mmu.cartridge.ram().to_vec(),
        high_ram: mmu.hram.to_vec(),
        timer: TimerState {
            divider: mmu.timer.divider,
            prescaler: mmu.timer.prescaler,
            tima: mmu.timer.tima,
            tma: mmu.timer.tma,
            tac: mmu.timer.tac,
        },
        ppu: PpuState {
            lcdc: mmu.ppu.lcdc.bits(),
            stat: mmu.ppu.stat.bits(),
            scy: mmu.ppu.scy,
            scx: mmu.ppu.scx,
            ly: mmu.ppu.ly,
            lyc: mmu.ppu.lyc,
            wy: mmu.ppu.wy,
            wx: mmu.ppu.wx,
            bgp: mmu.ppu.bgp,
            obp0: mmu.ppu.obp0,
            obp1: mmu.ppu.obp1,
            mode: mmu.ppu.mode as u8,
            dot: mmu.ppu.dot,
            stat_line: mmu.ppu.stat_line,
            framebuffer: mmu.ppu.rgba.to_vec(),
        },
        apu: ApuState {
            enabled: mmu.apu.enabled,
            nr50: mmu.apu.nr50,
            nr51: mmu.apu.nr51,
            sequencer_timer: mmu.apu.sequencer_timer,
            sequencer_step: mmu.apu.sequencer_step,
            wave_pattern: mmu.apu.ch3.ram.to_vec(),
            ch1: PulseState {
                duty: mmu.apu.ch1.duty,
                duty_step: mmu.apu.ch1.duty_step,
                frequency: mmu.apu.ch1.frequency,
                timer: mmu.apu.ch1.timer,
                enabled: mmu.apu.ch1.enabled,
                length: LengthState {
                    enabled: mmu.apu.ch1.length.enabled,
                    counter: mmu.apu.ch1.length.counter,
                },
                envelope: EnvelopeState {
                    register: mmu.apu.ch1.envelope.register,
                    volume: mmu.apu.ch1.envelope.volume,
                    timer: mmu.apu.ch1.envelope.timer,
                },
                sweep: Some(SweepState {
                    register: mmu.apu.ch1.sweep.register,
                    shadow: mmu.apu.ch1.sweep.shadow,
                    timer: mmu.apu.ch1.sweep.timer,
                    enabled: mmu.apu.ch1.sweep.enabled,
                }),
            },
            ch2: PulseState {
                duty: mmu.apu.ch2.duty,
                duty_step: mmu.apu.ch2.duty_step,
                frequency: mmu.apu.ch2.frequency,
                timer: mmu.apu.ch2.timer,
                enabled: mmu.apu.ch2.enabled,
                length: LengthState {
                    enabled: mmu.apu.ch2.length.enabled,
                    counter: mmu.apu.ch2.length.counter,
                },
                envelope: EnvelopeState {
                    register: mmu.apu.ch2.envelope.register,
                    volume: mmu.apu.ch2.envelope.volume,
                    timer: mmu.apu.ch2.envelope.timer,
                },
                sweep: None,
            },
            ch3: WaveState {
                dac_enabled: mmu.apu.ch3.dac_enabled,
                output_level: mmu.apu.ch3.output_level,
                frequency: mmu.apu.ch3.frequency,
                timer: mmu.apu.ch3.timer,
                position: mmu.apu.ch3.position,
                enabled: mmu.apu.ch3.enabled,
                length: LengthState {
                    enabled: mmu.apu.ch3.length.enabled,
                    counter: mmu.apu.ch3.length.counter,
                },
            },
            ch4: NoiseState {
                nr43: mmu.apu.ch4.nr43,
                lfsr: mmu.apu.ch4.lfsr,
                timer: mmu.apu.ch4.timer,
                enabled: mmu.apu.ch4.enabled,
                length: LengthState {
                    enabled: mmu.apu.ch4.length.enabled,
                    counter: mmu.apu.ch4.length.counter,
                },
                envelope: EnvelopeState {
                    register: mmu.apu.ch4.envelope.register,
                    volume: mmu.apu.ch4.envelope.volume,
                    timer: mmu.apu.ch4.envelope.timer,
                },
            },
        },
        mbc: match &mmu.cartridge.controller {
            Controller::None => MbcState::None,
            Controller::Mbc1(mbc) => MbcState::Mbc1 {
                ram_enabled: mbc.ram_enabled,
                rom_bank_low: mbc.rom_bank_low,
                ram_bank_or_rom_high: mbc.ram_bank_or_rom_high,
                mode: mbc.mode,
            },
            Controller::Mbc3(mbc) => MbcState::Mbc3 {
                ram_and_timer_enabled: mbc.ram_and_timer_enabled,
                rom_bank: mbc.rom_bank,
                ram_bank_or_rtc_select: mbc.ram_bank_or_rtc_select,
                rtc: mbc.rtc.to_vec(),
                latched_rtc: mbc.latched_rtc.to_vec(),
                rtc_latch_armed: mbc.rtc_latch_armed,
            },
            Controller::Mbc5(mbc) => MbcState::Mbc5 {
                ram_enabled: mbc.ram_enabled,
                rom_bank: mbc.rom_bank,
                ram_bank: mbc.ram_bank,
            },
        },
        io_registers: IO_SNAPSHOT
            .iter()
            .map(|&index| (index, mmu.read_io(index)))
            .collect(),
        interrupts: InterruptState {
            flag: mmu.interrupts.flag.bits(),
            enable: mmu.interrupts.enable,
        },
        joypad: JoypadState {
            a: mmu.joypad.input.a,
            b: mmu.joypad.input.b,
            select: mmu.joypad.input.select,
            start: mmu.joypad.input.start,
            right: mmu.joypad.input.right,
            left: mmu.joypad.input.left,
            up: mmu.joypad.input.up,
            down: mmu.joypad.input.down,
            dpad_selected: mmu.joypad.dpad_selected,
            buttons_selected: mmu.joypad.buttons_selected,
        },
        serial: SerialState {
            data: mmu.serial.data,
            control: mmu.serial.control.bits(),
            remaining: mmu.serial.remaining,
        },
        dma: DmaState {
            active: mmu.dma.active,
            register: mmu.dma.register,
            index: mmu.dma.index,
        },
    }
}

fn apply(emulator: &mut Emulator, state: StateJson) -> Result<(), CoreError> {
    let malformed = || CoreError::SaveStateMalformedJson;

    // reject before mutating anything, so a bad blob leaves the machine
    // untouched
    if state.work_ram.len() != WRAM_SIZE
        || state.video_ram.len() != VRAM_SIZE
        || state.oam_ram.len() != OAM_SIZE
        || state.high_ram.len() != HRAM_SIZE
        || state.ppu.framebuffer.len() != FRAME_BYTES
        || state.apu.wave_pattern.len() != 16
        || state.apu.ch1.sweep.is_none()
        || state.external_ram.len() != emulator.mmu.cartridge.ram().len()
    {
        return Err(malformed());
    }
    let controller_matches = matches!(
        (&emulator.mmu.cartridge.controller, &state.mbc),
        (Controller::None, MbcState::None)
            | (Controller::Mbc1(_), MbcState::Mbc1 { .. })
            | (Controller::Mbc3(_), MbcState::Mbc3 { .. })
            | (Controller::Mbc5(_), MbcState::Mbc5 { .. })
    );
    if !controller_matches {
        return Err(malformed());
    }
    if let MbcState::Mbc3 {
        rtc, latched_rtc, ..
    } = &state.mbc
        && (rtc.len() != 5 || latched_rtc.len() != 5)
    {
        return Err(malformed());
    }

    let mode = match state.ppu.mode {
        0 => Mode::HBlank,
        1 => Mode::VBlank,
        2 => Mode::OamScan,
        3 => Mode::Drawing,
        _ => return Err(malformed()),
    };

    let cpu = &mut emulator.cpu;
    cpu.a = state.cpu.a;
    cpu.b = state.cpu.b;
    cpu.c = state.cpu.c;
    cpu.d = state.cpu.d;
    cpu.e = state.cpu.e;
    cpu.h = state.cpu.h;
    cpu.l = state.cpu.l;
    cpu.f = Flags::from_bits_truncate(state.cpu.f);
    cpu.sp = state.cpu.sp;
    cpu.pc = state.cpu.pc;
    cpu.ime = state.cpu.ime;
    cpu.ei_delay = state.cpu.ei_delay;
    cpu.halted = state.cpu.halted;

    let mmu = &mut emulator.mmu;
    mmu.wram.copy_from_slice(&state.work_ram);
    mmu.video_ram.copy_from_slice(&state.video_ram);
    mmu.oam.copy_from_slice(&state.oam_ram);
    mmu.hram.copy_from_slice(&state.high_ram);
    mmu.cartridge.ram_mut().copy_from_slice(&state.external_ram);

    mmu.timer.divider = state.timer.divider;
    mmu.timer.prescaler = state.timer.prescaler;
    mmu.timer.tima = state.timer.tima;
    mmu.timer.tma = state.timer.tma;
    mmu.timer.tac = state.timer.tac;

    let ppu = &mut mmu.ppu;
    ppu.lcdc = LcdControl::from_bits_retain(state.ppu.lcdc);
    ppu.stat = LcdStatus::from_bits_truncate(state.ppu.stat);
    ppu.scy = state.ppu.scy;
    ppu.scx = state.ppu.scx;
    ppu.ly = state.ppu.ly;
    ppu.lyc = state.ppu.lyc;
    ppu.wy = state.ppu.wy;
    ppu.wx = state.ppu.wx;
    ppu.bgp = state.ppu.bgp;
    ppu.obp0 = state.ppu.obp0;
    ppu.obp1 = state.ppu.obp1;
    ppu.mode = mode;
    ppu.dot = state.ppu.dot;
    ppu.stat_line = state.ppu.stat_line;
    ppu.frame_done = false;
    ppu.rgba.copy_from_slice(&state.ppu.framebuffer);
    for (pixel, rgba) in state.ppu.framebuffer.chunks_exact(4).enumerate() {
        ppu.argb[pixel] = u32::from_be_bytes([rgba[3], rgba[0], rgba[1], rgba[2]]);
    }

    let apu = &mut mmu.apu;
    apu.enabled = state.apu.enabled;
    apu.nr50 = state.apu.nr50;
    apu.nr51 = state.apu.nr51;
    apu.sequencer_timer = state.apu.sequencer_timer;
    apu.sequencer_step = state.apu.sequencer_step;
    apu.sample_counter = 0.0;
    apu.samples.clear();
    apu.ch3.ram.copy_from_slice(&state.apu.wave_pattern);

    apu.ch1.duty = state.apu.ch1.duty;
    apu.ch1.duty_step = state.apu.ch1.duty_step;
    apu.ch1.frequency = state.apu.ch1.frequency;
    apu.ch1.timer = state.apu.ch1.timer;
    apu.ch1.enabled = state.apu.ch1.enabled;
    apu.ch1.length.enabled = state.apu.ch1.length.enabled;
    apu.ch1.length.counter = state.apu.ch1.length.counter;
    apu.ch1.envelope.register = state.apu.ch1.envelope.register;
    apu.ch1.envelope.volume = state.apu.ch1.envelope.volume;
    apu.ch1.envelope.timer = state.apu.ch1.envelope.timer;
    let sweep = state.apu.ch1.sweep.ok_or_else(malformed)?;
    apu.ch1.sweep.register = sweep.register;
    apu.ch1.sweep.shadow = sweep.shadow;
    apu.ch1.sweep.timer = sweep.timer;
    apu.ch1.sweep.enabled = sweep.enabled;

    apu.ch2.duty = state.apu.ch2.duty;
    apu.ch2.duty_step = state.apu.ch2.duty_step;
    apu.ch2.frequency = state.apu.ch2.frequency;
    apu.ch2.timer = state.apu.ch2.timer;
    apu.ch2.enabled = state.apu.ch2.enabled;
    apu.ch2.length.enabled = state.apu.ch2.length.enabled;
    apu.ch2.length.counter = state.apu.ch2.length.counter;
    apu.ch2.envelope.register = state.apu.ch2.envelope.register;
    apu.ch2.envelope.volume = state.apu.ch2.envelope.volume;
    apu.ch2.envelope.timer = state.apu.ch2.envelope.timer;

    apu.ch3.dac_enabled = state.apu.ch3.dac_enabled;
    apu.ch3.output_level = state.apu.ch3.output_level;
    apu.ch3.frequency = state.apu.ch3.frequency;
    apu.ch3.timer = state.apu.ch3.timer;
    apu.ch3.position = state.apu.ch3.position;
    apu.ch3.enabled = state.apu.ch3.enabled;
    apu.ch3.length.enabled = state.apu.ch3.length.enabled;
    apu.ch3.length.counter = state.apu.ch3.length.counter;

    apu.ch4.nr43 = state.apu.ch4.nr43;
    apu.ch4.lfsr = state.apu.ch4.lfsr;
    apu.ch4.timer = state.apu.ch4.timer;
    apu.ch4.enabled = state.apu.ch4.enabled;
    apu.ch4.length.enabled = state.apu.ch4.length.enabled;
    apu.ch4.length.counter = state.apu.ch4.length.counter;
    apu.ch4.envelope.register = state.apu.ch4.envelope.register;
    apu.ch4.envelope.volume = state.apu.ch4.envelope.volume;
    apu.ch4.envelope.timer = state.apu.ch4.envelope.timer;

    match (&mut mmu.cartridge.controller, state.mbc) {
        (Controller::None, MbcState::None) => {}
        (
            Controller::Mbc1(mbc),
            MbcState::Mbc1 {
                ram_enabled,
                rom_bank_low,
                ram_bank_or_rom_high,
                mode,
            },
        ) => {
            mbc.ram_enabled = ram_enabled;
            mbc.rom_bank_low = rom_bank_low;
            mbc.ram_bank_or_rom_high = ram_bank_or_rom_high;
            mbc.mode = mode;
        }
        (
            Controller::Mbc3(mbc),
            MbcState::Mbc3 {
                ram_and_timer_enabled,
                rom_bank,
                ram_bank_or_rtc_select,
                rtc,
                latched_rtc,
                rtc_latch_armed,
            },
        ) => {
            mbc.ram_and_timer_enabled = ram_and_timer_enabled;
            mbc.rom_bank = rom_bank;
            mbc.ram_bank_or_rtc_select = ram_bank_or_rtc_select;
            mbc.rtc = rtc.try_into().map_err(|_| malformed())?;
            mbc.latched_rtc = latched_rtc.try_into().map_err(|_| malformed())?;
            mbc.rtc_latch_armed = rtc_latch_armed;
        }
        (
            Controller::Mbc5(mbc),
            MbcState::Mbc5 {
                ram_enabled,
                rom_bank,
                ram_bank,
            },
        ) => {
            mbc.ram_enabled = ram_enabled;
            mbc.rom_bank = rom_bank;
            mbc.ram_bank = ram_bank;
        }
        _ => return Err(malformed()),
    }

    mmu.interrupts.flag = Interrupts::from_bits_truncate(state.interrupts.flag);
    mmu.interrupts.enable = state.interrupts.enable;

    mmu.joypad.input.a = state.joypad.a;
    mmu.joypad.input.b = state.joypad.b;
    mmu.joypad.input.select = state.joypad.select;
    mmu.joypad.input.start = state.joypad.start;
    mmu.joypad.input.right = state.joypad.right;
    mmu.joypad.input.left = state.joypad.left;
    mmu.joypad.input.up = state.joypad.up;
    mmu.joypad.input.down = state.joypad.down;
    mmu.joypad.dpad_selected = state.joypad.dpad_selected;
    mmu.joypad.buttons_selected = state.joypad.buttons_selected;

    mmu.serial.data = state.serial.data;
    mmu.serial.control = SerialControl::from_bits_truncate(state.serial.control);
    mmu.serial.remaining = state.serial.remaining;

    mmu.dma.active = state.dma.active;
    mmu.dma.register = state.dma.register;
    mmu.dma.index = state.dma.index;

    Ok(())
}
