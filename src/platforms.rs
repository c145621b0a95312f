// The platform table binds each machine model to its CPU, clock and MMU
// flavor, and the assembly code here turns a Configuration into a fully
// wired bus: RAM/ROM arenas, initial page map, and the soft-switch handler
// registrations each model carries.

use std::fs;
use std::path::PathBuf;

use log::info;
use thiserror::Error;

use crate::audio::SAMPLE_RATE;
use crate::clock::{Clock, ClockMode, ClockSet};
use crate::iiememory::{self, IieMemory, MAIN_BANK};
use crate::iigsmemory::{self, IigsMemory, GS_BANK1, GS_BANK_E0, GS_BANK_E1};
use crate::languagecard::{self, LanguageCard};
use crate::memory::{Bus, MachineKind, Mmu, PageRead, PageWrite, SwitchOwner, PAGE_SIZE};
use crate::processor::ProcessorType;
use crate::speaker::Speaker;

pub const DISK_SLOT: u8 = 6;

#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error("ROM file {0} not found")]
    RomMissing(PathBuf),
    #[error("ROM file {path} is {actual} bytes, expected {wanted}")]
    BadRomSize { path: PathBuf, actual: usize, wanted: usize },
    #[error("disk image {0} not found")]
    MediaNotFound(PathBuf),
    #[error("disk image {path} is {actual} bytes, expected {wanted}")]
    BadMediaSize { path: PathBuf, actual: usize, wanted: usize },
    #[error("unrecognized disk image type .{0}")]
    UnknownMediaType(String),
    #[error("not a usable WOZ2 image: {0}")]
    BadWozImage(PathBuf),
    #[error("unknown platform id {0}")]
    UnknownPlatform(i32),
    #[error("could not open audio device: {0}")]
    AudioInit(String),
    #[error("could not open window: {0}")]
    VideoInit(String),
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PlatformId {
    AppleII = 0,
    AppleIIPlus = 1,
    AppleIIe = 2,
    AppleIIeEnhanced = 3,
    AppleIIe65816 = 4,
    AppleIIgs = 5,
}

pub struct PlatformInfo {
    pub id: PlatformId,
    pub name: &'static str,
    pub rom_dir: &'static str,
    pub processor: ProcessorType,
    pub clock_mode: ClockMode,
    pub machine: MachineKind,
}

pub static PLATFORMS: [PlatformInfo; 6] = [
    PlatformInfo {
        id: PlatformId::AppleII,
        name: "Apple II",
        rom_dir: "apple2",
        processor: ProcessorType::Nmos6502,
        clock_mode: ClockMode::Mhz1_0205,
        machine: MachineKind::IiPlus,
    },
    PlatformInfo {
        id: PlatformId::AppleIIPlus,
        name: "Apple II Plus",
        rom_dir: "apple2_plus",
        processor: ProcessorType::Nmos6502,
        clock_mode: ClockMode::Mhz1_0205,
        machine: MachineKind::IiPlus,
    },
    PlatformInfo {
        id: PlatformId::AppleIIe,
        name: "Apple IIe",
        rom_dir: "apple2e",
        processor: ProcessorType::Nmos6502,
        clock_mode: ClockMode::Mhz1_0205,
        machine: MachineKind::Iie,
    },
    PlatformInfo {
        id: PlatformId::AppleIIeEnhanced,
        name: "Apple IIe Enhanced",
        rom_dir: "apple2e_enh",
        // The enhancement swapped in a WDC part, bit ops included.
        processor: ProcessorType::Wdc65c02,
        clock_mode: ClockMode::Mhz1_0205,
        machine: MachineKind::Iie,
    },
    PlatformInfo {
        id: PlatformId::AppleIIe65816,
        name: "Apple IIe Enhanced 65816",
        rom_dir: "apple2e_enh",
        processor: ProcessorType::Wdc65816,
        clock_mode: ClockMode::Mhz1_0205,
        machine: MachineKind::Iie,
    },
    PlatformInfo {
        id: PlatformId::AppleIIgs,
        name: "Apple IIgs",
        rom_dir: "apple2gs",
        processor: ProcessorType::Wdc65816,
        clock_mode: ClockMode::Mhz2_8,
        machine: MachineKind::Iigs,
    },
];

pub fn platform_by_id(id: i32) -> Result<&'static PlatformInfo, EmulatorError> {
    PLATFORMS
        .iter()
        .find(|p| p.id as i32 == id)
        .ok_or(EmulatorError::UnknownPlatform(id))
}

const II_ROM_SIZE: usize = 12 * 1024;
const IIGS_ROM_SIZE: usize = 128 * 1024;

// RAM arena sizes: main (+ LC card / aux / IIgs banks).
const IIPLUS_RAM: usize = 0x1_4000;
pub const IIPLUS_LC_OFFSET: u32 = 0x1_0000;
const IIE_RAM: usize = 0x2_0000;
const IIGS_RAM: usize = 0x4_0000;

pub struct Configuration {
    pub platform: &'static PlatformInfo,
    pub main_rom: Vec<u8>,
    pub char_rom: Vec<u8>,
    pub clock_set: ClockSet,
    pub trace: bool,
}

impl Configuration {
    /// Load ROMs for a platform from `roms/<dir>/`. Missing or mis-sized
    /// files are fatal here; there is no machine without its ROM.
    pub fn load(
        platform: &'static PlatformInfo,
        runtime: &crate::paths::RuntimeConfig,
    ) -> Result<Configuration, EmulatorError> {
        let main_path = runtime.rom_path(platform.rom_dir, "main.rom");
        let main_rom =
            fs::read(&main_path).map_err(|_| EmulatorError::RomMissing(main_path.clone()))?;
        let wanted = match platform.machine {
            MachineKind::Iigs => IIGS_ROM_SIZE,
            _ => II_ROM_SIZE,
        };
        if main_rom.len() != wanted {
            return Err(EmulatorError::BadRomSize { path: main_path, actual: main_rom.len(), wanted });
        }
        let char_path = runtime.rom_path(platform.rom_dir, "char.rom");
        let char_rom =
            fs::read(&char_path).map_err(|_| EmulatorError::RomMissing(char_path.clone()))?;
        match char_rom.len() {
            0x800 | 0x1000 | 0x2000 | 0x4000 => {}
            actual => {
                return Err(EmulatorError::BadRomSize { path: char_path, actual, wanted: 0x1000 })
            }
        }
        info!("platform: {}  roms: {}", platform.name, platform.rom_dir);
        Ok(Configuration {
            platform,
            main_rom,
            char_rom,
            clock_set: ClockSet::Us,
            trace: runtime.trace,
        })
    }

    /// A machine built around synthetic ROM images, for the test suite.
    pub fn synthetic(platform: &'static PlatformInfo, main_rom: Vec<u8>) -> Configuration {
        Configuration {
            platform,
            main_rom,
            char_rom: vec![0; 0x800],
            clock_set: ClockSet::Us,
            trace: false,
        }
    }
}

/// Build and wire the bus for a configuration: arenas, initial page map,
/// device registrations.
pub fn assemble_bus(config: &Configuration) -> Bus {
    let platform = config.platform;
    let clock = Clock::new(config.clock_set, platform.clock_mode);
    let c14m_per_second = clock.info().c14m_per_second;
    let speaker = Speaker::new(c14m_per_second, SAMPLE_RATE as u64);

    let (ram_size, banks): (usize, &[u8]) = match platform.machine {
        MachineKind::IiPlus => (IIPLUS_RAM, &[0x00]),
        MachineKind::Iie => (IIE_RAM, &[0x00]),
        MachineKind::Iigs => (IIGS_RAM, &[0x00, 0x01, 0xE0, 0xE1, 0xFE, 0xFF]),
    };
    let mmu = Mmu::new(ram_size, config.main_rom.clone(), banks);
    let mut bus = Bus::new(platform.machine, clock, mmu, speaker);

    // Pages 00-BF of the main bank, the soft-switch page, and the empty
    // slot-ROM window.
    for page in 0x00..=0xBF {
        bus.mmu.map_page_read(0, page, PageRead::Ram(MAIN_BANK + page as u32 * PAGE_SIZE as u32), "MAIN");
        bus.mmu.map_page_write(0, page, PageWrite::Ram(MAIN_BANK + page as u32 * PAGE_SIZE as u32), "MAIN");
    }
    bus.mmu.map_page_read(0, 0xC0, PageRead::C0xx, "C0XX");
    bus.mmu.map_page_write(0, 0xC0, PageWrite::C0xx, "C0XX");
    for page in 0xC1..=0xCF {
        bus.mmu.map_page_read(0, page, PageRead::FloatingBus, "SLOT");
        bus.mmu.map_page_write(0, page, PageWrite::Discard, "SLOT");
    }

    // Universal soft switches.
    bus.set_c0xx_read_handler(0xC000, SwitchOwner::Keyboard);
    bus.set_c0xx_read_handler(0xC010, SwitchOwner::KeyboardStrobe);
    bus.set_c0xx_write_handler(0xC010, SwitchOwner::KeyboardStrobe);
    let speaker_top = if platform.machine == MachineKind::Iigs { 0xC030 } else { 0xC03F };
    for addr in 0xC030..=speaker_top {
        bus.set_c0xx_read_handler(addr, SwitchOwner::Speaker);
        bus.set_c0xx_write_handler(addr, SwitchOwner::Speaker);
    }
    for addr in 0xC050..=0xC057 {
        bus.set_c0xx_read_handler(addr, SwitchOwner::VideoMode);
        bus.set_c0xx_write_handler(addr, SwitchOwner::VideoMode);
    }
    for addr in 0xC080..=0xC08F {
        bus.set_c0xx_read_handler(addr, SwitchOwner::LanguageCard);
        bus.set_c0xx_write_handler(addr, SwitchOwner::LanguageCard);
    }

    match platform.machine {
        MachineKind::IiPlus => {
            let lc = LanguageCard::new(IIPLUS_LC_OFFSET);
            bus.lc = Some(lc);
            if let Some(lc) = bus.lc.as_ref() {
                languagecard::remap_iiplus(&mut bus.mmu, lc);
            }
        }
        MachineKind::Iie | MachineKind::Iigs => {
            // Aux bank steering and built-in bank-switched RAM.
            let mut iie = IieMemory::new();
            if platform.machine == MachineKind::Iigs {
                iie.rom_lc_base = (config.main_rom.len() - 0x3000) as u32;
            }
            iiememory::compose(&mut bus.mmu, &mut iie, false, false);
            iiememory::bsr_map_memory(&mut bus.mmu, &iie);
            bus.iie = Some(iie);

            for addr in 0xC000..=0xC00B {
                bus.set_c0xx_write_handler(addr, SwitchOwner::MemoryFlag);
            }
            bus.set_c0xx_write_handler(0xC00C, SwitchOwner::Col80);
            bus.set_c0xx_write_handler(0xC00D, SwitchOwner::Col80);
            bus.set_c0xx_write_handler(0xC00E, SwitchOwner::AltChar);
            bus.set_c0xx_write_handler(0xC00F, SwitchOwner::AltChar);
            for addr in 0xC011..=0xC018 {
                bus.set_c0xx_read_handler(addr, SwitchOwner::MemoryStatus);
            }
            bus.set_c0xx_read_handler(0xC019, SwitchOwner::VblStatus);
            for addr in 0xC01A..=0xC01F {
                bus.set_c0xx_read_handler(addr, SwitchOwner::VideoStatus);
            }
        }
    }

    if platform.machine == MachineKind::Iigs {
        // Fast RAM bank 1, the mega-II banks, and the ROM banks.
        for page in 0x00..=0xFF {
            bus.mmu.map_page_read(0x01, page, PageRead::Ram(GS_BANK1 + page as u32 * PAGE_SIZE as u32), "BANK1");
            bus.mmu.map_page_write(0x01, page, PageWrite::Ram(GS_BANK1 + page as u32 * PAGE_SIZE as u32), "BANK1");
            bus.mmu.map_page_read(0xE0, page, PageRead::Ram(GS_BANK_E0 + page as u32 * PAGE_SIZE as u32), "E0");
            bus.mmu.map_page_write(0xE0, page, PageWrite::Ram(GS_BANK_E0 + page as u32 * PAGE_SIZE as u32), "E0");
            bus.mmu.map_page_read(0xE1, page, PageRead::Ram(GS_BANK_E1 + page as u32 * PAGE_SIZE as u32), "E1");
            bus.mmu.map_page_write(0xE1, page, PageWrite::Ram(GS_BANK_E1 + page as u32 * PAGE_SIZE as u32), "E1");
            bus.mmu.map_page_read(0xFE, page, PageRead::Rom(page as u32 * PAGE_SIZE as u32), "ROM_FE");
            bus.mmu.map_page_write(0xFE, page, PageWrite::Discard, "ROM");
            bus.mmu.map_page_read(0xFF, page, PageRead::Rom(0x1_0000 + page as u32 * PAGE_SIZE as u32), "ROM_FF");
            bus.mmu.map_page_write(0xFF, page, PageWrite::Discard, "ROM");
        }
        // The soft-switch window is alive in the mega-II bank too.
        bus.mmu.map_page_read(0xE0, 0xC0, PageRead::C0xx, "C0XX");
        bus.mmu.map_page_write(0xE0, 0xC0, PageWrite::C0xx, "C0XX");

        let gs = IigsMemory::new();
        iigsmemory::compose_shadow(&mut bus.mmu, &gs);
        bus.gs = Some(gs);

        bus.set_c0xx_read_handler(0xC029, SwitchOwner::GsNewVideo);
        bus.set_c0xx_write_handler(0xC029, SwitchOwner::GsNewVideo);
        bus.set_c0xx_read_handler(0xC035, SwitchOwner::GsShadow);
        bus.set_c0xx_write_handler(0xC035, SwitchOwner::GsShadow);
        bus.set_c0xx_read_handler(0xC036, SwitchOwner::GsSpeed);
        bus.set_c0xx_write_handler(0xC036, SwitchOwner::GsSpeed);
        bus.set_c0xx_read_handler(0xC068, SwitchOwner::GsState);
        bus.set_c0xx_write_handler(0xC068, SwitchOwner::GsState);
    } else {
        // On the II-class machines the top 12 KiB of ROM sits at D0-FF until
        // the language card swaps RAM in; the initial LC state has already
        // mapped it through remap/bsr above.
    }

    bus
}

/// Wire a Disk II controller into its slot's soft-switch window.
pub fn attach_disk_controller(bus: &mut Bus, slot: u8) {
    let base = 0xC080 + (slot as u16) * 0x10;
    for addr in base..base + 0x10 {
        bus.set_c0xx_read_handler(addr, SwitchOwner::Disk { slot });
        bus.set_c0xx_write_handler(addr, SwitchOwner::Disk { slot });
    }
    bus.disk = Some(crate::diskii::DiskController::new(slot));
}
