// IIe memory steering: the five flag pairs at $C000-$C009 pick main or
// auxiliary RAM per region, and the built-in bank-switched RAM replaces the
// slot-0 language card. The composed map is diffed against the previous one
// so only regions that actually changed get remapped.

use crate::languagecard::LanguageCardLogic;
use crate::memory::{Mmu, PageRead, PageWrite, PAGE_SIZE};

pub const MAIN_BANK: u32 = 0x0_0000;
pub const AUX_BANK: u32 = 0x1_0000;

const TAG_MAIN: &str = "MAIN";
const TAG_AUX: &str = "AUX";

pub struct IieMemory {
    pub lc: LanguageCardLogic,
    pub f_80store: bool,
    pub f_ramrd: bool,
    pub f_ramwrt: bool,
    pub f_altzp: bool,
    pub f_intcxrom: bool,
    pub f_slotc3rom: bool,
    /// Where the $D000 ROM image begins in the ROM arena (0 for the 12 KiB
    /// II-class sets; the top 12 KiB of the 128 KiB IIgs image).
    pub rom_lc_base: u32,

    // Current map state, so compose only touches what changed.
    m_zp: bool,
    m_text1_r: bool,
    m_text1_w: bool,
    m_hires1_r: bool,
    m_hires1_w: bool,
    m_all_r: bool,
    m_all_w: bool,
    map_initialized: bool,
}

impl IieMemory {
    pub fn new() -> Self {
        IieMemory {
            lc: LanguageCardLogic::new(),
            f_80store: false,
            f_ramrd: false,
            f_ramwrt: false,
            f_altzp: false,
            f_intcxrom: false,
            f_slotc3rom: false,
            rom_lc_base: 0,
            m_zp: false,
            m_text1_r: false,
            m_text1_w: false,
            m_hires1_r: false,
            m_hires1_w: false,
            m_all_r: false,
            m_all_w: false,
            map_initialized: false,
        }
    }

    /// RESET on a IIe does put the memory switches back to normal.
    pub fn reset(&mut self) {
        self.lc.reset();
        self.f_80store = false;
        self.f_ramrd = false;
        self.f_ramwrt = false;
        self.f_altzp = false;
        self.map_initialized = false;
    }
}

fn alt(selected: bool) -> u32 {
    if selected {
        AUX_BANK
    } else {
        MAIN_BANK
    }
}

fn tag(selected: bool) -> &'static str {
    if selected {
        TAG_AUX
    } else {
        TAG_MAIN
    }
}

fn map_read_range(mmu: &mut Mmu, from: u8, to: u8, base: u32, t: &'static str) {
    for page in from..=to {
        mmu.map_page_read(0, page, PageRead::Ram(base + page as u32 * PAGE_SIZE as u32), t);
    }
}

fn map_write_range(mmu: &mut Mmu, from: u8, to: u8, base: u32, t: &'static str) {
    for page in from..=to {
        mmu.map_page_write(0, page, PageWrite::Ram(base + page as u32 * PAGE_SIZE as u32), t);
    }
}

/// The bank-switched RAM portion ($D000-$FFFF). Bank 1 sits at +0xC000 in
/// the selected 64 KiB, bank 2 at +0xD000, the upper 8 KiB at +0xE000.
pub fn bsr_map_memory(mmu: &mut Mmu, iie: &IieMemory) {
    let base = alt(iie.f_altzp);
    let bank_d0 = base + if iie.lc.bank_1 { 0xC000 } else { 0xD000 };
    let bank_e0 = base + 0xE000;
    let bank_tag = if iie.lc.bank_1 { "LC_BANK1" } else { "LC_BANK2" };

    for i in 0..16u32 {
        let page = 0xD0 + i as u8;
        if iie.lc.read_enable {
            mmu.map_page_read(0, page, PageRead::Ram(bank_d0 + i * PAGE_SIZE as u32), bank_tag);
        } else {
            mmu.map_page_read(0, page, PageRead::Rom(iie.rom_lc_base + i * PAGE_SIZE as u32), "SYS_ROM");
        }
        if iie.lc.write_enabled() {
            mmu.map_page_write(0, page, PageWrite::Ram(bank_d0 + i * PAGE_SIZE as u32), bank_tag);
        } else {
            mmu.map_page_write(0, page, PageWrite::Discard, "NONE");
        }
    }
    for i in 0..32u32 {
        let page = 0xE0 + i as u8;
        if iie.lc.read_enable {
            mmu.map_page_read(0, page, PageRead::Ram(bank_e0 + i * PAGE_SIZE as u32), "LC_RAM");
        } else {
            mmu.map_page_read(0, page, PageRead::Rom(iie.rom_lc_base + 0x1000 + i * PAGE_SIZE as u32), "SYS_ROM");
        }
        if iie.lc.write_enabled() {
            mmu.map_page_write(0, page, PageWrite::Ram(bank_e0 + i * PAGE_SIZE as u32), "LC_RAM");
        } else {
            mmu.map_page_write(0, page, PageWrite::Discard, "NONE");
        }
    }
}

/// Compose the full main/aux steering from the flag state. PAGE2 only
/// steers memory when 80STORE is on; HIRES additionally gates whether the
/// hires region follows PAGE2 or the plain RAMRD/RAMWRT pair.
pub fn compose(mmu: &mut Mmu, iie: &mut IieMemory, page2: bool, hires: bool) {
    let n_zp = iie.f_altzp;
    let n_all_r = iie.f_ramrd;
    let n_all_w = iie.f_ramwrt;
    let (n_text1_r, n_text1_w, n_hires1_r, n_hires1_w);
    if iie.f_80store {
        n_text1_r = page2;
        n_text1_w = page2;
        if hires {
            n_hires1_r = page2;
            n_hires1_w = page2;
        } else {
            n_hires1_r = iie.f_ramrd;
            n_hires1_w = iie.f_ramwrt;
        }
    } else {
        n_text1_r = iie.f_ramrd;
        n_text1_w = iie.f_ramwrt;
        n_hires1_r = iie.f_ramrd;
        n_hires1_w = iie.f_ramwrt;
    }

    let force = !iie.map_initialized;

    if force || n_zp != iie.m_zp {
        map_read_range(mmu, 0x00, 0x01, alt(n_zp), tag(n_zp));
        map_write_range(mmu, 0x00, 0x01, alt(n_zp), tag(n_zp));
        bsr_map_memory(mmu, iie);
    }
    if force || n_text1_r != iie.m_text1_r {
        map_read_range(mmu, 0x04, 0x07, alt(n_text1_r), tag(n_text1_r));
    }
    if force || n_text1_w != iie.m_text1_w {
        map_write_range(mmu, 0x04, 0x07, alt(n_text1_w), tag(n_text1_w));
    }
    if force || n_hires1_r != iie.m_hires1_r {
        map_read_range(mmu, 0x20, 0x3F, alt(n_hires1_r), tag(n_hires1_r));
    }
    if force || n_hires1_w != iie.m_hires1_w {
        map_write_range(mmu, 0x20, 0x3F, alt(n_hires1_w), tag(n_hires1_w));
    }
    if force || n_all_r != iie.m_all_r {
        map_read_range(mmu, 0x02, 0x03, alt(n_all_r), tag(n_all_r));
        map_read_range(mmu, 0x08, 0x1F, alt(n_all_r), tag(n_all_r));
        map_read_range(mmu, 0x40, 0xBF, alt(n_all_r), tag(n_all_r));
    }
    if force || n_all_w != iie.m_all_w {
        map_write_range(mmu, 0x02, 0x03, alt(n_all_w), tag(n_all_w));
        map_write_range(mmu, 0x08, 0x1F, alt(n_all_w), tag(n_all_w));
        map_write_range(mmu, 0x40, 0xBF, alt(n_all_w), tag(n_all_w));
    }

    iie.m_zp = n_zp;
    iie.m_text1_r = n_text1_r;
    iie.m_text1_w = n_text1_w;
    iie.m_hires1_r = n_hires1_r;
    iie.m_hires1_w = n_hires1_w;
    iie.m_all_r = n_all_r;
    iie.m_all_w = n_all_w;
    iie.map_initialized = true;
}
