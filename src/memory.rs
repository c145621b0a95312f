// The bus and the MMU. The MMU owns RAM and ROM outright and maps them
// through a 256-entry page table per active bank; the bus wires the CPU's
// reads and writes through that table, advances the clock on every access,
// and dispatches the $C000-$C0FF soft-switch page through two per-address
// handler tables. The page table is only ever mutated from here, in response
// to soft-switch traffic.

use log::debug;

use crate::clock::Clock;
use crate::diskii::DiskController;
use crate::iiememory::{self, IieMemory};
use crate::iigsmemory::{self, IigsMemory};
use crate::keyboard::Keyboard;
use crate::languagecard::{self, LanguageCard};
use crate::scanner::VideoScanner;
use crate::speaker::Speaker;
use crate::timer::{EventTimer, TimerEvent};

pub const PAGE_SIZE: usize = 0x100;
pub const PAGES_PER_BANK: usize = 0x100;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PageRead {
    Ram(u32),
    Rom(u32),
    C0xx,
    FloatingBus,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PageWrite {
    Ram(u32),
    Discard,
    C0xx,
}

#[derive(Debug, Copy, Clone)]
pub struct PageEntry {
    pub read: PageRead,
    pub write: PageWrite,
    pub read_tag: &'static str,
    pub write_tag: &'static str,
    /// Write-through mirror: offset of a second RAM region that receives a
    /// copy of every byte written through this page (IIgs shadowing).
    pub shadow: Option<u32>,
}

impl PageEntry {
    fn unmapped() -> Self {
        PageEntry {
            read: PageRead::FloatingBus,
            write: PageWrite::Discard,
            read_tag: "NONE",
            write_tag: "NONE",
            shadow: None,
        }
    }
}

pub struct Mmu {
    pub ram: Vec<u8>,
    pub rom: Vec<u8>,
    banks: Vec<[PageEntry; PAGES_PER_BANK]>,
    bank_map: [Option<u8>; 256],
}

impl Mmu {
    pub fn new(ram_size: usize, rom: Vec<u8>, mapped_banks: &[u8]) -> Self {
        let mut bank_map = [None; 256];
        for (i, &bank) in mapped_banks.iter().enumerate() {
            bank_map[bank as usize] = Some(i as u8);
        }
        Mmu {
            ram: vec![0; ram_size],
            rom,
            banks: vec![[PageEntry::unmapped(); PAGES_PER_BANK]; mapped_banks.len()],
            bank_map,
        }
    }

    pub fn page_entry(&self, bank: u8, page: u8) -> Option<&PageEntry> {
        let index = self.bank_map[bank as usize]?;
        Some(&self.banks[index as usize][page as usize])
    }

    pub fn map_page_read(&mut self, bank: u8, page: u8, read: PageRead, tag: &'static str) {
        if let Some(index) = self.bank_map[bank as usize] {
            let entry = &mut self.banks[index as usize][page as usize];
            entry.read = read;
            entry.read_tag = tag;
        }
    }

    pub fn map_page_write(&mut self, bank: u8, page: u8, write: PageWrite, tag: &'static str) {
        if let Some(index) = self.bank_map[bank as usize] {
            let entry = &mut self.banks[index as usize][page as usize];
            entry.write = write;
            entry.write_tag = tag;
        }
    }

    pub fn set_page_shadow(&mut self, bank: u8, page: u8, shadow: Option<u32>) {
        if let Some(index) = self.bank_map[bank as usize] {
            self.banks[index as usize][page as usize].shadow = shadow;
        }
    }

    /// One line per page for the debugger.
    pub fn dump_page_table(&self, bank: u8, from: u8, to: u8) -> String {
        let mut out = String::new();
        for page in from..=to {
            if let Some(entry) = self.page_entry(bank, page) {
                out.push_str(&format!(
                    "{:02X}/{:02X}: r {:?} [{}]  w {:?} [{}]\n",
                    bank, page, entry.read, entry.read_tag, entry.write, entry.write_tag
                ));
            }
        }
        out
    }
}

/// Which device answers a given $C0xx address. The tables hold these tags
/// rather than callbacks; the bus matches on the tag and calls the owning
/// device field, which keeps dispatch in safe Rust and the tables printable.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SwitchOwner {
    None,
    Keyboard,
    KeyboardStrobe,
    MemoryFlag,
    MemoryStatus,
    VblStatus,
    VideoMode,
    VideoStatus,
    Col80,
    AltChar,
    Speaker,
    LanguageCard,
    Disk { slot: u8 },
    GsNewVideo,
    GsShadow,
    GsSpeed,
    GsState,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MachineKind {
    IiPlus,
    Iie,
    Iigs,
}

pub struct Bus {
    pub machine: MachineKind,
    pub clock: Clock,
    pub scanner: VideoScanner,
    pub mmu: Mmu,
    pub timer: EventTimer,
    pub speaker: Speaker,
    pub kbd: Keyboard,
    pub lc: Option<LanguageCard>,
    pub iie: Option<IieMemory>,
    pub gs: Option<IigsMemory>,
    pub disk: Option<DiskController>,
    read_owners: [SwitchOwner; 256],
    write_owners: [SwitchOwner; 256],
    pub irq_line: bool,
}

impl Bus {
    pub fn new(machine: MachineKind, clock: Clock, mmu: Mmu, speaker: Speaker) -> Self {
        Bus {
            machine,
            clock,
            scanner: VideoScanner::new(),
            mmu,
            timer: EventTimer::new(),
            speaker,
            kbd: Keyboard::new(),
            lc: None,
            iie: None,
            gs: None,
            disk: None,
            read_owners: [SwitchOwner::None; 256],
            write_owners: [SwitchOwner::None; 256],
            irq_line: false,
        }
    }

    pub fn set_c0xx_read_handler(&mut self, address: u16, owner: SwitchOwner) {
        self.read_owners[(address & 0xFF) as usize] = owner;
    }

    pub fn set_c0xx_write_handler(&mut self, address: u16, owner: SwitchOwner) {
        self.write_owners[(address & 0xFF) as usize] = owner;
    }

    /// Advance the clock by one CPU cycle, run the scanner after it, and
    /// fire any timer events that have come due.
    pub fn tick(&mut self) {
        let video_cycles = self.clock.tick();
        for _ in 0..video_cycles {
            self.scanner.video_cycle();
        }
        while let Some(event) = self.timer.pop_due(self.clock.cycles()) {
            self.dispatch_timer_event(event);
        }
    }

    fn dispatch_timer_event(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::DiskMotorOff { slot } => {
                if let Some(disk) = self.disk.as_mut() {
                    if disk.slot == slot {
                        disk.motor_expired();
                    }
                }
            }
        }
    }

    /// The byte the video scanner is fetching right now.
    pub fn floating_bus_read(&self) -> u8 {
        let addr = self.scanner.video_address();
        self.mmu.ram[addr as usize]
    }

    pub fn read(&mut self, addr: u32) -> u8 {
        self.tick();
        self.read_no_tick(addr)
    }

    pub fn read_no_tick(&mut self, addr: u32) -> u8 {
        let bank = (addr >> 16) as u8;
        let offset = (addr & 0xFFFF) as u16;
        let page = (offset >> 8) as u8;
        let entry = match self.mmu.page_entry(bank, page) {
            Some(entry) => *entry,
            None => return self.floating_bus_read(),
        };
        match entry.read {
            PageRead::Ram(base) => self.mmu.ram[base as usize + (offset & 0xFF) as usize],
            PageRead::Rom(base) => {
                if self.machine == MachineKind::Iigs {
                    self.clock.set_next_cycle_fast();
                }
                self.mmu.rom[base as usize + (offset & 0xFF) as usize]
            }
            PageRead::C0xx => self.c0xx_read(offset),
            PageRead::FloatingBus => self.floating_bus_read(),
        }
    }

    pub fn write(&mut self, addr: u32, value: u8) {
        self.tick();
        self.write_no_tick(addr, value);
    }

    pub fn write_no_tick(&mut self, addr: u32, value: u8) {
        let bank = (addr >> 16) as u8;
        let offset = (addr & 0xFFFF) as u16;
        let page = (offset >> 8) as u8;
        let entry = match self.mmu.page_entry(bank, page) {
            Some(entry) => *entry,
            None => return,
        };
        match entry.write {
            PageWrite::Ram(base) => {
                self.mmu.ram[base as usize + (offset & 0xFF) as usize] = value;
                if let Some(mirror) = entry.shadow {
                    self.mmu.ram[mirror as usize + (offset & 0xFF) as usize] = value;
                }
                if bank == 0 {
                    self.scanner.note_video_write(offset);
                }
            }
            PageWrite::Discard => {}
            PageWrite::C0xx => self.c0xx_write(offset, value),
        }
    }

    /// Peek without side effects (debugger, renderer). Soft switches and the
    /// floating bus read as zero rather than dispatching.
    pub fn peek(&self, addr: u32) -> u8 {
        let bank = (addr >> 16) as u8;
        let offset = (addr & 0xFFFF) as u16;
        let page = (offset >> 8) as u8;
        match self.mmu.page_entry(bank, page).map(|e| e.read) {
            Some(PageRead::Ram(base)) => self.mmu.ram[base as usize + (offset & 0xFF) as usize],
            Some(PageRead::Rom(base)) => self.mmu.rom[base as usize + (offset & 0xFF) as usize],
            _ => 0,
        }
    }

    fn c0xx_read(&mut self, address: u16) -> u8 {
        debug_assert!(address & 0xFF00 == 0xC000, "soft-switch dispatch outside C0xx");
        let owner = self.read_owners[(address & 0xFF) as usize];
        match owner {
            SwitchOwner::None => self.floating_bus_read(),
            SwitchOwner::Keyboard => self.kbd.read_latch(),
            SwitchOwner::KeyboardStrobe => self.kbd.clear_strobe(),
            SwitchOwner::MemoryFlag => self.floating_bus_read(),
            SwitchOwner::MemoryStatus => self.memory_status_read(address),
            SwitchOwner::VblStatus => {
                // RDVBLBAR: bit 7 low while the scanner is in the blanking band.
                let flag = if self.scanner.in_vbl() { 0x00 } else { 0x80 };
                flag | (self.kbd.last_key_val() & 0x7F)
            }
            SwitchOwner::VideoMode => {
                self.video_mode_access(address);
                self.floating_bus_read()
            }
            SwitchOwner::VideoStatus => self.video_status_read(address),
            SwitchOwner::Col80 | SwitchOwner::AltChar => self.floating_bus_read(),
            SwitchOwner::Speaker => {
                let c_14m = self.clock.c_14m();
                self.speaker.touch(c_14m);
                self.floating_bus_read()
            }
            SwitchOwner::LanguageCard => {
                self.language_card_access(address, None);
                self.floating_bus_read()
            }
            SwitchOwner::Disk { slot } => {
                let cycles = self.clock.cycles();
                match self.disk.as_mut() {
                    Some(disk) if disk.slot == slot => disk.read_c0xx(address, cycles, &mut self.timer),
                    _ => 0,
                }
            }
            SwitchOwner::GsNewVideo => self.gs.as_ref().map_or(0, |gs| gs.new_video),
            SwitchOwner::GsShadow => self.gs.as_ref().map_or(0, |gs| gs.shadow),
            SwitchOwner::GsSpeed => self.gs.as_ref().map_or(0, |gs| gs.speed),
            SwitchOwner::GsState => self.gs_state_read(),
        }
    }

    fn c0xx_write(&mut self, address: u16, value: u8) {
        debug_assert!(address & 0xFF00 == 0xC000, "soft-switch dispatch outside C0xx");
        let owner = self.write_owners[(address & 0xFF) as usize];
        match owner {
            SwitchOwner::None => {}
            SwitchOwner::Keyboard => {}
            SwitchOwner::KeyboardStrobe => {
                self.kbd.clear_strobe();
            }
            SwitchOwner::MemoryFlag => self.memory_flag_write(address),
            SwitchOwner::MemoryStatus | SwitchOwner::VblStatus | SwitchOwner::VideoStatus => {}
            SwitchOwner::VideoMode => self.video_mode_access(address),
            SwitchOwner::Col80 => {
                self.scanner.col80 = address & 1 == 1;
                self.scanner.mark_all_dirty();
            }
            SwitchOwner::AltChar => {
                self.scanner.altchar = address & 1 == 1;
                self.scanner.mark_all_dirty();
            }
            SwitchOwner::Speaker => {
                let c_14m = self.clock.c_14m();
                self.speaker.touch(c_14m);
            }
            SwitchOwner::LanguageCard => self.language_card_access(address, Some(value)),
            SwitchOwner::Disk { slot } => {
                if let Some(disk) = self.disk.as_mut() {
                    if disk.slot == slot {
                        disk.write_c0xx(address, value);
                    }
                }
            }
            SwitchOwner::GsNewVideo => {
                if let Some(gs) = self.gs.as_mut() {
                    gs.new_video = value;
                }
            }
            SwitchOwner::GsShadow => {
                if let Some(gs) = self.gs.as_mut() {
                    gs.shadow = value;
                    iigsmemory::compose_shadow(&mut self.mmu, gs);
                }
            }
            SwitchOwner::GsSpeed => {
                if let Some(gs) = self.gs.as_mut() {
                    gs.set_speed(value, &mut self.clock);
                }
            }
            SwitchOwner::GsState => self.gs_state_write(value),
        }
    }

    fn memory_flag_write(&mut self, address: u16) {
        let (page2, hires) = (self.scanner.page2, self.scanner.hires);
        if let Some(iie) = self.iie.as_mut() {
            match address {
                0xC000 => iie.f_80store = false,
                0xC001 => iie.f_80store = true,
                0xC002 => iie.f_ramrd = false,
                0xC003 => iie.f_ramrd = true,
                0xC004 => iie.f_ramwrt = false,
                0xC005 => iie.f_ramwrt = true,
                0xC006 => iie.f_intcxrom = false,
                0xC007 => iie.f_intcxrom = true,
                0xC008 => iie.f_altzp = false,
                0xC009 => iie.f_altzp = true,
                0xC00A => iie.f_slotc3rom = false,
                0xC00B => iie.f_slotc3rom = true,
                _ => {}
            }
            debug!("memory flag write {:04X}", address);
            iiememory::compose(&mut self.mmu, iie, page2, hires);
        }
    }

    fn memory_status_read(&mut self, address: u16) -> u8 {
        let keyval = self.kbd.last_key_val() & 0x7F;
        let flag = match self.iie.as_ref() {
            Some(iie) => match address {
                0xC011 => !iie.lc.bank_1,
                0xC012 => iie.lc.read_enable,
                0xC013 => iie.f_ramrd,
                0xC014 => iie.f_ramwrt,
                0xC015 => iie.f_intcxrom,
                0xC016 => iie.f_altzp,
                0xC017 => iie.f_slotc3rom,
                0xC018 => iie.f_80store,
                _ => false,
            },
            None => false,
        };
        (if flag { 0x80 } else { 0x00 }) | keyval
    }

    fn video_mode_access(&mut self, address: u16) {
        match address {
            0xC050 => self.scanner.text = false,
            0xC051 => self.scanner.text = true,
            0xC052 => self.scanner.mixed = false,
            0xC053 => self.scanner.mixed = true,
            0xC054 => self.scanner.page2 = false,
            0xC055 => self.scanner.page2 = true,
            0xC056 => self.scanner.hires = false,
            0xC057 => self.scanner.hires = true,
            _ => {}
        }
        self.scanner.mark_all_dirty();
        // PAGE2 and HIRES feed the 80STORE steering on the IIe and IIgs.
        let (page2, hires) = (self.scanner.page2, self.scanner.hires);
        if let Some(iie) = self.iie.as_mut() {
            iiememory::compose(&mut self.mmu, iie, page2, hires);
        }
    }

    fn video_status_read(&mut self, address: u16) -> u8 {
        let keyval = self.kbd.last_key_val() & 0x7F;
        let flag = match address {
            0xC01A => self.scanner.text,
            0xC01B => self.scanner.mixed,
            0xC01C => self.scanner.page2,
            0xC01D => self.scanner.hires,
            0xC01E => self.scanner.altchar,
            0xC01F => self.scanner.col80,
            _ => false,
        };
        (if flag { 0x80 } else { 0x00 }) | keyval
    }

    fn language_card_access(&mut self, address: u16, write: Option<u8>) {
        debug!("language card access {:04X} write={}", address, write.is_some());
        match self.machine {
            MachineKind::IiPlus => {
                if let Some(lc) = self.lc.as_mut() {
                    match write {
                        Some(_) => lc.logic.on_write(address),
                        None => lc.logic.on_read(address),
                    }
                }
                if let Some(lc) = self.lc.as_ref() {
                    languagecard::remap_iiplus(&mut self.mmu, lc);
                }
            }
            MachineKind::Iie | MachineKind::Iigs => {
                if let Some(iie) = self.iie.as_mut() {
                    match write {
                        Some(_) => iie.lc.on_write(address),
                        None => iie.lc.on_read(address),
                    }
                    iiememory::bsr_map_memory(&mut self.mmu, iie);
                }
            }
        }
    }

    fn gs_state_read(&self) -> u8 {
        match (self.gs.as_ref(), self.iie.as_ref()) {
            (Some(gs), Some(iie)) => gs.state_register(iie, self.scanner.page2),
            _ => 0,
        }
    }

    fn gs_state_write(&mut self, value: u8) {
        let hires = self.scanner.hires;
        let mut page2 = self.scanner.page2;
        if let (Some(gs), Some(iie)) = (self.gs.as_mut(), self.iie.as_mut()) {
            gs.apply_state_register(value, iie, &mut page2);
            self.scanner.page2 = page2;
            iiememory::compose(&mut self.mmu, iie, page2, hires);
            iiememory::bsr_map_memory(&mut self.mmu, iie);
        }
    }
}
