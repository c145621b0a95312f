// Instruction trace: one fixed-size entry per instruction in a ring buffer,
// saved to and reloaded from disk in host byte order. The terminal dump is
// the poor man's debugger.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use termion::{color, style};

pub const TRACE_FLAG_IRQ: u16 = 0x01;

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct TraceEntry {
    pub cycle: u64,
    pub operand: u32,
    pub eaddr: u32,
    pub opcode: u8,
    pub p: u8,
    pub db: u8,
    pub pb: u8,
    pub pc: u16,
    pub a: u16,
    pub x: u16,
    pub y: u16,
    pub sp: u16,
    pub d: u16,
    pub data: u16,
    pub flags: u16,
}

pub const TRACE_ENTRY_SIZE: usize = 40;

impl TraceEntry {
    fn to_bytes(&self) -> [u8; TRACE_ENTRY_SIZE] {
        let mut buf = [0u8; TRACE_ENTRY_SIZE];
        buf[0..8].copy_from_slice(&self.cycle.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.operand.to_ne_bytes());
        buf[12..16].copy_from_slice(&self.eaddr.to_ne_bytes());
        buf[16] = self.opcode;
        buf[17] = self.p;
        buf[18] = self.db;
        buf[19] = self.pb;
        buf[20..22].copy_from_slice(&self.pc.to_ne_bytes());
        buf[22..24].copy_from_slice(&self.a.to_ne_bytes());
        buf[24..26].copy_from_slice(&self.x.to_ne_bytes());
        buf[26..28].copy_from_slice(&self.y.to_ne_bytes());
        buf[28..30].copy_from_slice(&self.sp.to_ne_bytes());
        buf[30..32].copy_from_slice(&self.d.to_ne_bytes());
        buf[32..34].copy_from_slice(&self.data.to_ne_bytes());
        buf[34..36].copy_from_slice(&self.flags.to_ne_bytes());
        buf
    }

    fn from_bytes(buf: &[u8; TRACE_ENTRY_SIZE]) -> Self {
        let mut e = TraceEntry::default();
        e.cycle = u64::from_ne_bytes(buf[0..8].try_into_array());
        e.operand = u32::from_ne_bytes(buf[8..12].try_into_array());
        e.eaddr = u32::from_ne_bytes(buf[12..16].try_into_array());
        e.opcode = buf[16];
        e.p = buf[17];
        e.db = buf[18];
        e.pb = buf[19];
        e.pc = u16::from_ne_bytes(buf[20..22].try_into_array());
        e.a = u16::from_ne_bytes(buf[22..24].try_into_array());
        e.x = u16::from_ne_bytes(buf[24..26].try_into_array());
        e.y = u16::from_ne_bytes(buf[26..28].try_into_array());
        e.sp = u16::from_ne_bytes(buf[28..30].try_into_array());
        e.d = u16::from_ne_bytes(buf[30..32].try_into_array());
        e.data = u16::from_ne_bytes(buf[32..34].try_into_array());
        e.flags = u16::from_ne_bytes(buf[34..36].try_into_array());
        e
    }
}

// try_into on slices lands in arrays of known size; this keeps the call
// sites above readable on edition 2018.
trait TryIntoArray<const N: usize> {
    fn try_into_array(&self) -> [u8; N];
}

impl<const N: usize> TryIntoArray<N> for [u8] {
    fn try_into_array(&self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(self);
        out
    }
}

/// Mnemonic for the CMOS opcode map; anything undefined there prints as ???.
pub fn mnemonic(opcode: u8) -> &'static str {
    match opcode {
        0x69 | 0x65 | 0x75 | 0x6D | 0x7D | 0x79 | 0x61 | 0x71 | 0x72 => "ADC",
        0x29 | 0x25 | 0x35 | 0x2D | 0x3D | 0x39 | 0x21 | 0x31 | 0x32 => "AND",
        0x0A | 0x06 | 0x16 | 0x0E | 0x1E => "ASL",
        0x90 => "BCC",
        0xB0 => "BCS",
        0xF0 => "BEQ",
        0xD0 => "BNE",
        0x30 => "BMI",
        0x10 => "BPL",
        0x50 => "BVC",
        0x70 => "BVS",
        0x80 => "BRA",
        0x24 | 0x2C | 0x34 | 0x3C | 0x89 => "BIT",
        0x00 => "BRK",
        0x18 => "CLC",
        0xD8 => "CLD",
        0x58 => "CLI",
        0xB8 => "CLV",
        0xC9 | 0xC5 | 0xD5 | 0xCD | 0xDD | 0xD9 | 0xC1 | 0xD1 | 0xD2 => "CMP",
        0xE0 | 0xE4 | 0xEC => "CPX",
        0xC0 | 0xC4 | 0xCC => "CPY",
        0xC6 | 0xD6 | 0xCE | 0xDE | 0x3A => "DEC",
        0xCA => "DEX",
        0x88 => "DEY",
        0x49 | 0x45 | 0x55 | 0x4D | 0x5D | 0x59 | 0x41 | 0x51 | 0x52 => "EOR",
        0xE6 | 0xF6 | 0xEE | 0xFE | 0x1A => "INC",
        0xE8 => "INX",
        0xC8 => "INY",
        0x4C | 0x6C | 0x7C => "JMP",
        0x20 => "JSR",
        0xA9 | 0xA5 | 0xB5 | 0xAD | 0xBD | 0xB9 | 0xA1 | 0xB1 | 0xB2 => "LDA",
        0xA2 | 0xA6 | 0xB6 | 0xAE | 0xBE => "LDX",
        0xA0 | 0xA4 | 0xB4 | 0xAC | 0xBC => "LDY",
        0x4A | 0x46 | 0x56 | 0x4E | 0x5E => "LSR",
        0xEA => "NOP",
        0x09 | 0x05 | 0x15 | 0x0D | 0x1D | 0x19 | 0x01 | 0x11 | 0x12 => "ORA",
        0x48 => "PHA",
        0x08 => "PHP",
        0xDA => "PHX",
        0x5A => "PHY",
        0x68 => "PLA",
        0x28 => "PLP",
        0xFA => "PLX",
        0x7A => "PLY",
        0x2A | 0x26 | 0x36 | 0x2E | 0x3E => "ROL",
        0x6A | 0x66 | 0x76 | 0x6E | 0x7E => "ROR",
        0x40 => "RTI",
        0x60 => "RTS",
        0xE9 | 0xE5 | 0xF5 | 0xED | 0xFD | 0xF9 | 0xE1 | 0xF1 | 0xF2 => "SBC",
        0x38 => "SEC",
        0xF8 => "SED",
        0x78 => "SEI",
        0x85 | 0x95 | 0x8D | 0x9D | 0x99 | 0x81 | 0x91 | 0x92 => "STA",
        0x86 | 0x96 | 0x8E => "STX",
        0x84 | 0x94 | 0x8C => "STY",
        0x64 | 0x74 | 0x9C | 0x9E => "STZ",
        0xAA => "TAX",
        0xA8 => "TAY",
        0xBA => "TSX",
        0x8A => "TXA",
        0x9A => "TXS",
        0x98 => "TYA",
        0x14 | 0x1C => "TRB",
        0x04 | 0x0C => "TSB",
        _ => "???",
    }
}

pub struct TraceBuffer {
    entries: Vec<TraceEntry>,
    capacity: usize,
    head: usize,
    count: usize,
}

impl TraceBuffer {
    pub fn new(capacity: usize) -> Self {
        TraceBuffer { entries: vec![TraceEntry::default(); capacity], capacity, head: 0, count: 0 }
    }

    pub fn add_entry(&mut self, entry: TraceEntry) {
        self.entries[self.head] = entry;
        self.head = (self.head + 1) % self.capacity;
        if self.count < self.capacity {
            self.count += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Entry `index` counted from the oldest retained one.
    pub fn get_entry(&self, index: usize) -> Option<&TraceEntry> {
        if index >= self.count {
            return None;
        }
        let oldest = (self.head + self.capacity - self.count) % self.capacity;
        Some(&self.entries[(oldest + index) % self.capacity])
    }

    pub fn save_to_file(&self, path: &Path) -> io::Result<()> {
        let mut file = File::create(path)?;
        for i in 0..self.count {
            if let Some(entry) = self.get_entry(i) {
                file.write_all(&entry.to_bytes())?;
            }
        }
        Ok(())
    }

    pub fn read_from_file(path: &Path) -> io::Result<TraceBuffer> {
        let mut file = File::open(path)?;
        let mut raw = Vec::new();
        file.read_to_end(&mut raw)?;
        let n = raw.len() / TRACE_ENTRY_SIZE;
        let mut buffer = TraceBuffer::new(n.max(1));
        for chunk in raw.chunks_exact(TRACE_ENTRY_SIZE) {
            let mut fixed = [0u8; TRACE_ENTRY_SIZE];
            fixed.copy_from_slice(chunk);
            buffer.add_entry(TraceEntry::from_bytes(&fixed));
        }
        Ok(buffer)
    }

    /// Dump the most recent entries to the terminal.
    pub fn dump(&self, last: usize) {
        let start = self.count.saturating_sub(last);
        for i in start..self.count {
            let e = match self.get_entry(i) {
                Some(e) => e,
                None => continue,
            };
            println!(
                "{}{:>12}{} {}{:02X}/{:04X}{} {} {:02X} {:06X}  A={:04X} X={:04X} Y={:04X} SP={:04X} P={:02X}{}",
                color::Fg(color::LightBlack),
                e.cycle,
                color::Fg(color::Reset),
                color::Fg(color::Yellow),
                e.pb,
                e.pc,
                color::Fg(color::Reset),
                mnemonic(e.opcode),
                e.opcode,
                e.operand,
                e.a,
                e.x,
                e.y,
                e.sp,
                e.p,
                style::Reset,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_keeps_the_newest_entries() {
        let mut buffer = TraceBuffer::new(4);
        for i in 0..6u64 {
            let entry = TraceEntry { cycle: i, ..TraceEntry::default() };
            buffer.add_entry(entry);
        }
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.get_entry(0).unwrap().cycle, 2);
        assert_eq!(buffer.get_entry(3).unwrap().cycle, 5);
    }

    #[test]
    fn entries_survive_the_byte_round_trip() {
        let entry = TraceEntry {
            cycle: 123_456_789,
            operand: 0x1234,
            eaddr: 0x01_2345,
            opcode: 0xAD,
            p: 0x30,
            db: 0xE0,
            pb: 0x01,
            pc: 0xFDED,
            a: 0x00FF,
            x: 0x0002,
            y: 0x0003,
            sp: 0x01FB,
            d: 0x0000,
            data: 0x0042,
            flags: TRACE_FLAG_IRQ,
        };
        let bytes = entry.to_bytes();
        assert_eq!(TraceEntry::from_bytes(&bytes), entry);
    }
}
