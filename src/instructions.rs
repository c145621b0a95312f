// The 6502/65C02 instruction interpreter: one 256-way match, with the
// addressing-mode calculations factored into helpers that charge their own
// bus cycles. The variant is a set of compile-time consts, so the compiler
// emits one real core per CPU with no runtime checks at instruction level.
//
// Cycle accounting: every bus.read/bus.write advances the clock by one CPU
// cycle; internal dead cycles are explicit bus.tick() calls. Page crossing
// on indexed reads costs a cycle only when it happens; stores and
// read-modify-writes through abs,X always pay it.

use std::marker::PhantomData;

use crate::memory::Bus;
use crate::processor::{Cpu, Halt};

pub trait CpuTraits {
    /// JMP ($xxFF) fetches the high byte from the start of the same page.
    const HAS_INDIRECT_BUG: bool;
    /// CMOS opcodes, decimal-mode fixes, BRK clears D.
    const HAS_65C02_OPS: bool;
    /// Rockwell/WDC bit manipulation and bit branches.
    const HAS_BBR_BBS: bool;
}

pub struct Nmos6502;
impl CpuTraits for Nmos6502 {
    const HAS_INDIRECT_BUG: bool = true;
    const HAS_65C02_OPS: bool = false;
    const HAS_BBR_BBS: bool = false;
}

pub struct Cmos65c02;
impl CpuTraits for Cmos65c02 {
    const HAS_INDIRECT_BUG: bool = false;
    const HAS_65C02_OPS: bool = true;
    const HAS_BBR_BBS: bool = false;
}

pub struct Wdc65c02;
impl CpuTraits for Wdc65c02 {
    const HAS_INDIRECT_BUG: bool = false;
    const HAS_65C02_OPS: bool = true;
    const HAS_BBR_BBS: bool = true;
}

pub struct Core<V: CpuTraits> {
    _variant: PhantomData<V>,
}

fn bcd_to_int(bcd: u8) -> u8 {
    (bcd >> 4) * 10 + (bcd & 0x0F)
}

fn int_to_bcd(n: u8) -> u8 {
    let n1 = n % 100;
    ((n1 / 10) << 4) | (n1 % 10)
}

impl<V: CpuTraits> Core<V> {
    fn fetch_byte(cpu: &mut Cpu, bus: &mut Bus) -> u8 {
        let value = bus.read(cpu.pc as u32);
        cpu.pc = cpu.pc.wrapping_add(1);
        value
    }

    fn fetch_word(cpu: &mut Cpu, bus: &mut Bus) -> u16 {
        let lo = Self::fetch_byte(cpu, bus) as u16;
        let hi = Self::fetch_byte(cpu, bus) as u16;
        (hi << 8) | lo
    }

    fn read_word(bus: &mut Bus, addr: u16) -> u16 {
        let lo = bus.read(addr as u32) as u16;
        let hi = bus.read(addr.wrapping_add(1) as u32) as u16;
        (hi << 8) | lo
    }

    /// Zero-page pointers wrap within the page.
    fn read_word_zp(bus: &mut Bus, zp: u8) -> u16 {
        let lo = bus.read(zp as u32) as u16;
        let hi = bus.read(zp.wrapping_add(1) as u32) as u16;
        (hi << 8) | lo
    }

    // Addressing-mode calculations. Each returns the effective address and
    // has already charged the cycles the mode costs beyond its operand
    // fetches.

    fn addr_zp(cpu: &mut Cpu, bus: &mut Bus) -> u16 {
        let zp = Self::fetch_byte(cpu, bus);
        cpu.trace_entry.operand = zp as u32;
        cpu.trace_entry.eaddr = zp as u32;
        zp as u16
    }

    fn addr_zp_x(cpu: &mut Cpu, bus: &mut Bus) -> u16 {
        let zp = Self::fetch_byte(cpu, bus);
        let taddr = zp.wrapping_add(cpu.x_lo());
        bus.tick();
        cpu.trace_entry.operand = zp as u32;
        cpu.trace_entry.eaddr = taddr as u32;
        taddr as u16
    }

    fn addr_zp_y(cpu: &mut Cpu, bus: &mut Bus) -> u16 {
        let zp = Self::fetch_byte(cpu, bus);
        let taddr = zp.wrapping_add(cpu.y_lo());
        bus.tick();
        cpu.trace_entry.operand = zp as u32;
        cpu.trace_entry.eaddr = taddr as u32;
        taddr as u16
    }

    fn addr_abs(cpu: &mut Cpu, bus: &mut Bus) -> u16 {
        let addr = Self::fetch_word(cpu, bus);
        cpu.trace_entry.operand = addr as u32;
        cpu.trace_entry.eaddr = addr as u32;
        addr
    }

    fn addr_abs_x(cpu: &mut Cpu, bus: &mut Bus) -> u16 {
        let addr = Self::fetch_word(cpu, bus);
        let taddr = addr.wrapping_add(cpu.x_lo() as u16);
        if addr & 0xFF00 != taddr & 0xFF00 {
            bus.tick();
        }
        cpu.trace_entry.operand = addr as u32;
        cpu.trace_entry.eaddr = taddr as u32;
        taddr
    }

    /// Stores and RMW through abs,X pay the extra cycle whether or not the
    /// page boundary is crossed (a dummy read on real silicon).
    fn addr_abs_x_rmw(cpu: &mut Cpu, bus: &mut Bus) -> u16 {
        let addr = Self::fetch_word(cpu, bus);
        let taddr = addr.wrapping_add(cpu.x_lo() as u16);
        bus.tick();
        cpu.trace_entry.operand = addr as u32;
        cpu.trace_entry.eaddr = taddr as u32;
        taddr
    }

    fn addr_abs_y(cpu: &mut Cpu, bus: &mut Bus) -> u16 {
        let addr = Self::fetch_word(cpu, bus);
        let taddr = addr.wrapping_add(cpu.y_lo() as u16);
        if addr & 0xFF00 != taddr & 0xFF00 {
            bus.tick();
        }
        cpu.trace_entry.operand = addr as u32;
        cpu.trace_entry.eaddr = taddr as u32;
        taddr
    }

    fn addr_abs_y_store(cpu: &mut Cpu, bus: &mut Bus) -> u16 {
        let addr = Self::fetch_word(cpu, bus);
        let taddr = addr.wrapping_add(cpu.y_lo() as u16);
        bus.tick();
        cpu.trace_entry.operand = addr as u32;
        cpu.trace_entry.eaddr = taddr as u32;
        taddr
    }

    fn addr_ind_x(cpu: &mut Cpu, bus: &mut Bus) -> u16 {
        let zp = Self::fetch_byte(cpu, bus);
        bus.tick();
        let taddr = Self::read_word_zp(bus, zp.wrapping_add(cpu.x_lo()));
        cpu.trace_entry.operand = zp as u32;
        cpu.trace_entry.eaddr = taddr as u32;
        taddr
    }

    fn addr_ind_y(cpu: &mut Cpu, bus: &mut Bus) -> u16 {
        let zp = Self::fetch_byte(cpu, bus);
        let iaddr = Self::read_word_zp(bus, zp);
        let taddr = iaddr.wrapping_add(cpu.y_lo() as u16);
        if iaddr & 0xFF00 != taddr & 0xFF00 {
            bus.tick();
        }
        cpu.trace_entry.operand = zp as u32;
        cpu.trace_entry.eaddr = taddr as u32;
        taddr
    }

    fn addr_ind_y_store(cpu: &mut Cpu, bus: &mut Bus) -> u16 {
        let zp = Self::fetch_byte(cpu, bus);
        let iaddr = Self::read_word_zp(bus, zp);
        let taddr = iaddr.wrapping_add(cpu.y_lo() as u16);
        bus.tick();
        cpu.trace_entry.operand = zp as u32;
        cpu.trace_entry.eaddr = taddr as u32;
        taddr
    }

    /// 65C02 (zp) plain indirect.
    fn addr_zp_ind(cpu: &mut Cpu, bus: &mut Bus) -> u16 {
        let zp = Self::fetch_byte(cpu, bus);
        let taddr = Self::read_word_zp(bus, zp);
        cpu.trace_entry.operand = zp as u32;
        cpu.trace_entry.eaddr = taddr as u32;
        taddr
    }

    // Flag and ALU helpers.

    fn adc(cpu: &mut Cpu, bus: &mut Bus, n: u8) {
        if !cpu.dec {
            let m = cpu.a_lo();
            let sum = m as u32 + n as u32 + cpu.c as u32;
            let s8 = sum as u8;
            cpu.set_a_lo(s8);
            cpu.c = sum & 0x100 != 0;
            cpu.v = (m ^ n) & 0x80 == 0 && (m ^ s8) & 0x80 != 0;
            cpu.set_n_z(s8);
        } else {
            let m = bcd_to_int(cpu.a_lo());
            let n1 = bcd_to_int(n);
            let s = m + n1 + cpu.c as u8;
            let result = int_to_bcd(s);
            let a_before = cpu.a_lo();
            cpu.set_a_lo(result);
            cpu.c = s > 99;
            if V::HAS_65C02_OPS {
                // CMOS parts take an extra cycle in decimal and produce a
                // valid V from the adjusted result.
                cpu.v = (a_before ^ n) & 0x80 == 0 && (a_before ^ result) & 0x80 != 0;
                bus.tick();
            }
            cpu.set_n_z(result);
        }
    }

    fn sbc(cpu: &mut Cpu, bus: &mut Bus, n: u8) {
        if !cpu.dec {
            let m = cpu.a_lo();
            let n1 = n ^ 0xFF;
            let sum = m as u32 + n1 as u32 + cpu.c as u32;
            let s8 = sum as u8;
            cpu.c = sum & 0x100 != 0;
            cpu.v = (m ^ n1) & 0x80 == 0 && (m ^ s8) & 0x80 != 0;
            cpu.set_a_lo(s8);
            cpu.set_n_z(s8);
        } else {
            let m = bcd_to_int(cpu.a_lo()) as i16;
            let n1 = bcd_to_int(n) as i16;
            let mut s = m - n1 - (!cpu.c) as i16;
            if s < 0 {
                s += 100;
                cpu.c = false; // borrow
            } else {
                cpu.c = true;
            }
            let a_before = cpu.a_lo();
            let result = int_to_bcd(s as u8);
            cpu.set_a_lo(result);
            if V::HAS_65C02_OPS {
                cpu.v = (a_before ^ n) & 0x80 != 0 && (a_before ^ result) & 0x80 != 0;
                bus.tick();
            }
            cpu.set_n_z(result);
        }
    }

    /// Compare is SBC with carry assumed set, result discarded, V untouched.
    fn compare(cpu: &mut Cpu, m: u8, n: u8) {
        let sum = m as u32 + (n ^ 0xFF) as u32 + 1;
        cpu.c = sum & 0x100 != 0;
        cpu.set_n_z(sum as u8);
    }

    fn branch_if(cpu: &mut Cpu, bus: &mut Bus, condition: bool) {
        let n = Self::fetch_byte(cpu, bus);
        cpu.trace_entry.operand = n as u32;
        let oaddr = cpu.pc;
        let taddr = oaddr.wrapping_add(n as i8 as u16);
        if condition {
            if oaddr.wrapping_sub(2) == taddr {
                // bxx $FE: a jump-to-self spin with interrupts off never
                // exits; stop the machine rather than melt the host.
                if cpu.i {
                    cpu.halt = Halt::Instruction;
                }
            }
            cpu.pc = taddr;
            bus.tick();
            if oaddr & 0xFF00 != taddr & 0xFF00 {
                bus.tick();
            }
        }
    }

    fn asl(cpu: &mut Cpu, bus: &mut Bus, n: u8) -> u8 {
        cpu.c = n & 0x80 != 0;
        let result = n << 1;
        cpu.set_n_z(result);
        bus.tick();
        result
    }

    fn lsr(cpu: &mut Cpu, bus: &mut Bus, n: u8) -> u8 {
        cpu.c = n & 0x01 != 0;
        let result = n >> 1;
        cpu.set_n_z(result);
        bus.tick();
        result
    }

    fn rol(cpu: &mut Cpu, bus: &mut Bus, n: u8) -> u8 {
        let carry_in = cpu.c as u8;
        cpu.c = n & 0x80 != 0;
        let result = (n << 1) | carry_in;
        cpu.set_n_z(result);
        bus.tick();
        result
    }

    fn ror(cpu: &mut Cpu, bus: &mut Bus, n: u8) -> u8 {
        let carry_in = (cpu.c as u8) << 7;
        cpu.c = n & 0x01 != 0;
        let result = (n >> 1) | carry_in;
        cpu.set_n_z(result);
        bus.tick();
        result
    }

    fn modify<F: FnOnce(&mut Cpu, &mut Bus, u8) -> u8>(cpu: &mut Cpu, bus: &mut Bus, addr: u16, f: F) {
        let n = bus.read(addr as u32);
        let result = f(cpu, bus, n);
        bus.write(addr as u32, result);
        cpu.trace_entry.data = result as u16;
    }

    fn inc_val(cpu: &mut Cpu, bus: &mut Bus, n: u8) -> u8 {
        let result = n.wrapping_add(1);
        cpu.set_n_z(result);
        bus.tick();
        result
    }

    fn dec_val(cpu: &mut Cpu, bus: &mut Bus, n: u8) -> u8 {
        let result = n.wrapping_sub(1);
        cpu.set_n_z(result);
        bus.tick();
        result
    }

    fn bit(cpu: &mut Cpu, n: u8) {
        cpu.z = cpu.a_lo() & n == 0;
        cpu.n = n & 0x80 != 0;
        cpu.v = n & 0x40 != 0;
    }

    fn load(cpu: &mut Cpu, bus: &mut Bus, addr: u16) -> u8 {
        let n = bus.read(addr as u32);
        cpu.trace_entry.data = n as u16;
        n
    }

    fn store(cpu: &mut Cpu, bus: &mut Bus, addr: u16, n: u8) {
        bus.write(addr as u32, n);
        cpu.trace_entry.data = n as u16;
    }

    /// Undocumented opcode: behave as a NOP of the given size and cost.
    fn invalid_nop(cpu: &mut Cpu, bus: &mut Bus, bytes: u8, cycles: u8) {
        for _ in 1..bytes {
            Self::fetch_byte(cpu, bus);
        }
        for _ in bytes..cycles {
            bus.tick();
        }
    }

    /// BBR/BBS are a fixed five cycles on the Rockwell/WDC parts: no taken
    /// penalty, no page-cross penalty, so no ride through branch_if.
    fn bbr_bbs(cpu: &mut Cpu, bus: &mut Bus, bit: u8, set: bool) {
        let addr = Self::addr_zp(cpu, bus);
        let n = bus.read(addr as u32);
        bus.tick();
        let offset = Self::fetch_byte(cpu, bus);
        cpu.trace_entry.operand = offset as u32;
        if ((n >> bit) & 1 == 1) == set {
            cpu.pc = cpu.pc.wrapping_add(offset as i8 as u16);
        }
    }

    fn rmb_smb(cpu: &mut Cpu, bus: &mut Bus, bit: u8, set: bool) {
        let addr = Self::addr_zp(cpu, bus);
        Self::modify(cpu, bus, addr, |_, bus, n| {
            bus.tick();
            if set {
                n | (1 << bit)
            } else {
                n & !(1 << bit)
            }
        });
    }

    /// Run one instruction (or take a pending IRQ). Returns the cycles
    /// consumed; unknown opcodes execute as appropriately sized NOPs, so
    /// this never fails.
    pub fn execute_next(cpu: &mut Cpu, bus: &mut Bus) -> u64 {
        let start_cycles = bus.clock.cycles();
        cpu.begin_trace(bus);

        if !cpu.i && (cpu.irq_asserted || bus.irq_line) {
            cpu.service_irq(bus, V::HAS_65C02_OPS);
            cpu.commit_trace();
            return bus.clock.cycles() - start_cycles;
        }

        let opcode = Self::fetch_byte(cpu, bus);
        cpu.trace_entry.opcode = opcode;

        match opcode {
            /* ADC */
            0x69 => {
                let n = Self::fetch_byte(cpu, bus);
                Self::adc(cpu, bus, n);
            }
            0x65 => {
                let addr = Self::addr_zp(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::adc(cpu, bus, n);
            }
            0x75 => {
                let addr = Self::addr_zp_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::adc(cpu, bus, n);
            }
            0x6D => {
                let addr = Self::addr_abs(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::adc(cpu, bus, n);
            }
            0x7D => {
                let addr = Self::addr_abs_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::adc(cpu, bus, n);
            }
            0x79 => {
                let addr = Self::addr_abs_y(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::adc(cpu, bus, n);
            }
            0x61 => {
                let addr = Self::addr_ind_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::adc(cpu, bus, n);
            }
            0x71 => {
                let addr = Self::addr_ind_y(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::adc(cpu, bus, n);
            }
            0x72 if V::HAS_65C02_OPS => {
                let addr = Self::addr_zp_ind(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::adc(cpu, bus, n);
            }

            /* AND */
            0x29 => {
                let n = Self::fetch_byte(cpu, bus);
                let a = cpu.a_lo() & n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x25 => {
                let addr = Self::addr_zp(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() & n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x35 => {
                let addr = Self::addr_zp_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() & n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x2D => {
                let addr = Self::addr_abs(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() & n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x3D => {
                let addr = Self::addr_abs_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() & n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x39 => {
                let addr = Self::addr_abs_y(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() & n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x21 => {
                let addr = Self::addr_ind_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() & n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x31 => {
                let addr = Self::addr_ind_y(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() & n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x32 if V::HAS_65C02_OPS => {
                let addr = Self::addr_zp_ind(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() & n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }

            /* ASL */
            0x0A => {
                let a = cpu.a_lo();
                let result = Self::asl(cpu, bus, a);
                cpu.set_a_lo(result);
            }
            0x06 => {
                let addr = Self::addr_zp(cpu, bus);
                Self::modify(cpu, bus, addr, Self::asl);
            }
            0x16 => {
                let addr = Self::addr_zp_x(cpu, bus);
                Self::modify(cpu, bus, addr, Self::asl);
            }
            0x0E => {
                let addr = Self::addr_abs(cpu, bus);
                Self::modify(cpu, bus, addr, Self::asl);
            }
            0x1E => {
                let addr = Self::addr_abs_x_rmw(cpu, bus);
                Self::modify(cpu, bus, addr, Self::asl);
            }

            /* Branches */
            0x90 => {
                let cond = !cpu.c;
                Self::branch_if(cpu, bus, cond);
            }
            0xB0 => {
                let cond = cpu.c;
                Self::branch_if(cpu, bus, cond);
            }
            0xF0 => {
                let cond = cpu.z;
                Self::branch_if(cpu, bus, cond);
            }
            0xD0 => {
                let cond = !cpu.z;
                Self::branch_if(cpu, bus, cond);
            }
            0x30 => {
                let cond = cpu.n;
                Self::branch_if(cpu, bus, cond);
            }
            0x10 => {
                let cond = !cpu.n;
                Self::branch_if(cpu, bus, cond);
            }
            0x50 => {
                let cond = !cpu.v;
                Self::branch_if(cpu, bus, cond);
            }
            0x70 => {
                let cond = cpu.v;
                Self::branch_if(cpu, bus, cond);
            }
            0x80 if V::HAS_65C02_OPS => Self::branch_if(cpu, bus, true),

            /* BIT */
            0x24 => {
                let addr = Self::addr_zp(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::bit(cpu, n);
            }
            0x2C => {
                let addr = Self::addr_abs(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::bit(cpu, n);
            }
            0x34 if V::HAS_65C02_OPS => {
                let addr = Self::addr_zp_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::bit(cpu, n);
            }
            0x3C if V::HAS_65C02_OPS => {
                let addr = Self::addr_abs_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::bit(cpu, n);
            }
            0x89 if V::HAS_65C02_OPS => {
                // Immediate BIT only touches Z.
                let n = Self::fetch_byte(cpu, bus);
                cpu.z = cpu.a_lo() & n == 0;
            }

            /* BRK */
            0x00 => {
                cpu.pc = cpu.pc.wrapping_add(1); // signature byte skipped
                let pc = cpu.pc;
                cpu.push_word(bus, pc);
                let p = cpu.p(true);
                cpu.push_byte(bus, p);
                cpu.i = true;
                if V::HAS_65C02_OPS {
                    cpu.dec = false;
                }
                let lo = bus.read(crate::processor::IRQ_VECTOR as u32) as u16;
                let hi = bus.read(crate::processor::IRQ_VECTOR as u32 + 1) as u16;
                cpu.pc = (hi << 8) | lo;
            }

            /* Flag sets/clears */
            0x18 => {
                cpu.c = false;
                bus.tick();
            }
            0xD8 => {
                cpu.dec = false;
                bus.tick();
            }
            0x58 => {
                cpu.i = false;
                bus.tick();
            }
            0xB8 => {
                cpu.v = false;
                bus.tick();
            }
            0x38 => {
                cpu.c = true;
                bus.tick();
            }
            0xF8 => {
                cpu.dec = true;
                bus.tick();
            }
            0x78 => {
                cpu.i = true;
                bus.tick();
            }

            /* CMP */
            0xC9 => {
                let n = Self::fetch_byte(cpu, bus);
                let m = cpu.a_lo();
                Self::compare(cpu, m, n);
            }
            0xC5 => {
                let addr = Self::addr_zp(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let m = cpu.a_lo();
                Self::compare(cpu, m, n);
            }
            0xD5 => {
                let addr = Self::addr_zp_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let m = cpu.a_lo();
                Self::compare(cpu, m, n);
            }
            0xCD => {
                let addr = Self::addr_abs(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let m = cpu.a_lo();
                Self::compare(cpu, m, n);
            }
            0xDD => {
                let addr = Self::addr_abs_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let m = cpu.a_lo();
                Self::compare(cpu, m, n);
            }
            0xD9 => {
                let addr = Self::addr_abs_y(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let m = cpu.a_lo();
                Self::compare(cpu, m, n);
            }
            0xC1 => {
                let addr = Self::addr_ind_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let m = cpu.a_lo();
                Self::compare(cpu, m, n);
            }
            0xD1 => {
                let addr = Self::addr_ind_y(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let m = cpu.a_lo();
                Self::compare(cpu, m, n);
            }
            0xD2 if V::HAS_65C02_OPS => {
                let addr = Self::addr_zp_ind(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let m = cpu.a_lo();
                Self::compare(cpu, m, n);
            }

            /* CPX / CPY */
            0xE0 => {
                let n = Self::fetch_byte(cpu, bus);
                let m = cpu.x_lo();
                Self::compare(cpu, m, n);
            }
            0xE4 => {
                let addr = Self::addr_zp(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let m = cpu.x_lo();
                Self::compare(cpu, m, n);
            }
            0xEC => {
                let addr = Self::addr_abs(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let m = cpu.x_lo();
                Self::compare(cpu, m, n);
            }
            0xC0 => {
                let n = Self::fetch_byte(cpu, bus);
                let m = cpu.y_lo();
                Self::compare(cpu, m, n);
            }
            0xC4 => {
                let addr = Self::addr_zp(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let m = cpu.y_lo();
                Self::compare(cpu, m, n);
            }
            0xCC => {
                let addr = Self::addr_abs(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let m = cpu.y_lo();
                Self::compare(cpu, m, n);
            }

            /* DEC / INC */
            0xC6 => {
                let addr = Self::addr_zp(cpu, bus);
                Self::modify(cpu, bus, addr, Self::dec_val);
            }
            0xD6 => {
                let addr = Self::addr_zp_x(cpu, bus);
                Self::modify(cpu, bus, addr, Self::dec_val);
            }
            0xCE => {
                let addr = Self::addr_abs(cpu, bus);
                Self::modify(cpu, bus, addr, Self::dec_val);
            }
            0xDE => {
                let addr = Self::addr_abs_x_rmw(cpu, bus);
                Self::modify(cpu, bus, addr, Self::dec_val);
            }
            0x3A if V::HAS_65C02_OPS => {
                let a = cpu.a_lo();
                let result = Self::dec_val(cpu, bus, a);
                cpu.set_a_lo(result);
            }
            0xE6 => {
                let addr = Self::addr_zp(cpu, bus);
                Self::modify(cpu, bus, addr, Self::inc_val);
            }
            0xF6 => {
                let addr = Self::addr_zp_x(cpu, bus);
                Self::modify(cpu, bus, addr, Self::inc_val);
            }
            0xEE => {
                let addr = Self::addr_abs(cpu, bus);
                Self::modify(cpu, bus, addr, Self::inc_val);
            }
            0xFE => {
                let addr = Self::addr_abs_x_rmw(cpu, bus);
                Self::modify(cpu, bus, addr, Self::inc_val);
            }
            0x1A if V::HAS_65C02_OPS => {
                let a = cpu.a_lo();
                let result = Self::inc_val(cpu, bus, a);
                cpu.set_a_lo(result);
            }
            0xCA => {
                let result = cpu.x_lo().wrapping_sub(1);
                cpu.x = result as u16;
                cpu.set_n_z(result);
                bus.tick();
            }
            0x88 => {
                let result = cpu.y_lo().wrapping_sub(1);
                cpu.y = result as u16;
                cpu.set_n_z(result);
                bus.tick();
            }
            0xE8 => {
                let result = cpu.x_lo().wrapping_add(1);
                cpu.x = result as u16;
                cpu.set_n_z(result);
                bus.tick();
            }
            0xC8 => {
                let result = cpu.y_lo().wrapping_add(1);
                cpu.y = result as u16;
                cpu.set_n_z(result);
                bus.tick();
            }

            /* EOR */
            0x49 => {
                let n = Self::fetch_byte(cpu, bus);
                let a = cpu.a_lo() ^ n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x45 => {
                let addr = Self::addr_zp(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() ^ n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x55 => {
                let addr = Self::addr_zp_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() ^ n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x4D => {
                let addr = Self::addr_abs(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() ^ n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x5D => {
                let addr = Self::addr_abs_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() ^ n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x59 => {
                let addr = Self::addr_abs_y(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() ^ n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x41 => {
                let addr = Self::addr_ind_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() ^ n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x51 => {
                let addr = Self::addr_ind_y(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() ^ n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x52 if V::HAS_65C02_OPS => {
                let addr = Self::addr_zp_ind(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() ^ n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }

            /* JMP / JSR / RTS / RTI */
            0x4C => {
                let addr = Self::addr_abs(cpu, bus);
                cpu.pc = addr;
            }
            0x6C => {
                let addr = Self::fetch_word(cpu, bus);
                cpu.trace_entry.operand = addr as u32;
                let taddr = if V::HAS_INDIRECT_BUG && addr & 0xFF == 0xFF {
                    // The NMOS part wraps the pointer fetch within the page.
                    let lo = bus.read(addr as u32) as u16;
                    let hi = bus.read((addr & 0xFF00) as u32) as u16;
                    (hi << 8) | lo
                } else {
                    if V::HAS_65C02_OPS {
                        bus.tick();
                    }
                    Self::read_word(bus, addr)
                };
                cpu.trace_entry.eaddr = taddr as u32;
                cpu.pc = taddr;
            }
            0x7C if V::HAS_65C02_OPS => {
                let addr = Self::fetch_word(cpu, bus);
                let iaddr = addr.wrapping_add(cpu.x_lo() as u16);
                bus.tick();
                let taddr = Self::read_word(bus, iaddr);
                cpu.trace_entry.operand = addr as u32;
                cpu.trace_entry.eaddr = taddr as u32;
                cpu.pc = taddr;
            }
            0x20 => {
                let addr = Self::addr_abs(cpu, bus);
                let ret = cpu.pc.wrapping_sub(1);
                cpu.push_word(bus, ret);
                bus.tick();
                cpu.pc = addr;
            }
            0x60 => {
                let addr = cpu.pop_word(bus);
                cpu.pc = addr.wrapping_add(1);
                bus.tick();
                bus.tick();
            }
            0x40 => {
                let p = cpu.pop_byte(bus);
                cpu.set_p(p);
                let addr = cpu.pop_word(bus);
                cpu.pc = addr;
            }

            /* LDA / LDX / LDY */
            0xA9 => {
                let n = Self::fetch_byte(cpu, bus);
                cpu.set_a_lo(n);
                cpu.set_n_z(n);
            }
            0xA5 => {
                let addr = Self::addr_zp(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                cpu.set_a_lo(n);
                cpu.set_n_z(n);
            }
            0xB5 => {
                let addr = Self::addr_zp_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                cpu.set_a_lo(n);
                cpu.set_n_z(n);
            }
            0xAD => {
                let addr = Self::addr_abs(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                cpu.set_a_lo(n);
                cpu.set_n_z(n);
            }
            0xBD => {
                let addr = Self::addr_abs_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                cpu.set_a_lo(n);
                cpu.set_n_z(n);
            }
            0xB9 => {
                let addr = Self::addr_abs_y(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                cpu.set_a_lo(n);
                cpu.set_n_z(n);
            }
            0xA1 => {
                let addr = Self::addr_ind_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                cpu.set_a_lo(n);
                cpu.set_n_z(n);
            }
            0xB1 => {
                let addr = Self::addr_ind_y(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                cpu.set_a_lo(n);
                cpu.set_n_z(n);
            }
            0xB2 if V::HAS_65C02_OPS => {
                let addr = Self::addr_zp_ind(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                cpu.set_a_lo(n);
                cpu.set_n_z(n);
            }
            0xA2 => {
                let n = Self::fetch_byte(cpu, bus);
                cpu.x = n as u16;
                cpu.set_n_z(n);
            }
            0xA6 => {
                let addr = Self::addr_zp(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                cpu.x = n as u16;
                cpu.set_n_z(n);
            }
            0xB6 => {
                let addr = Self::addr_zp_y(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                cpu.x = n as u16;
                cpu.set_n_z(n);
            }
            0xAE => {
                let addr = Self::addr_abs(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                cpu.x = n as u16;
                cpu.set_n_z(n);
            }
            0xBE => {
                let addr = Self::addr_abs_y(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                cpu.x = n as u16;
                cpu.set_n_z(n);
            }
            0xA0 => {
                let n = Self::fetch_byte(cpu, bus);
                cpu.y = n as u16;
                cpu.set_n_z(n);
            }
            0xA4 => {
                let addr = Self::addr_zp(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                cpu.y = n as u16;
                cpu.set_n_z(n);
            }
            0xB4 => {
                let addr = Self::addr_zp_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                cpu.y = n as u16;
                cpu.set_n_z(n);
            }
            0xAC => {
                let addr = Self::addr_abs(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                cpu.y = n as u16;
                cpu.set_n_z(n);
            }
            0xBC => {
                let addr = Self::addr_abs_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                cpu.y = n as u16;
                cpu.set_n_z(n);
            }

            /* LSR */
            0x4A => {
                let a = cpu.a_lo();
                let result = Self::lsr(cpu, bus, a);
                cpu.set_a_lo(result);
            }
            0x46 => {
                let addr = Self::addr_zp(cpu, bus);
                Self::modify(cpu, bus, addr, Self::lsr);
            }
            0x56 => {
                let addr = Self::addr_zp_x(cpu, bus);
                Self::modify(cpu, bus, addr, Self::lsr);
            }
            0x4E => {
                let addr = Self::addr_abs(cpu, bus);
                Self::modify(cpu, bus, addr, Self::lsr);
            }
            0x5E => {
                let addr = Self::addr_abs_x_rmw(cpu, bus);
                Self::modify(cpu, bus, addr, Self::lsr);
            }

            /* NOP */
            0xEA => {
                bus.tick();
            }

            /* ORA */
            0x09 => {
                let n = Self::fetch_byte(cpu, bus);
                let a = cpu.a_lo() | n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x05 => {
                let addr = Self::addr_zp(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() | n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x15 => {
                let addr = Self::addr_zp_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() | n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x0D => {
                let addr = Self::addr_abs(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() | n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x1D => {
                let addr = Self::addr_abs_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() | n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x19 => {
                let addr = Self::addr_abs_y(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() | n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x01 => {
                let addr = Self::addr_ind_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() | n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x11 => {
                let addr = Self::addr_ind_y(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() | n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }
            0x12 if V::HAS_65C02_OPS => {
                let addr = Self::addr_zp_ind(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                let a = cpu.a_lo() | n;
                cpu.set_a_lo(a);
                cpu.set_n_z(a);
            }

            /* Stack pushes and pulls */
            0x48 => {
                let a = cpu.a_lo();
                cpu.push_byte(bus, a);
            }
            0x08 => {
                let p = cpu.p(true);
                cpu.push_byte(bus, p);
            }
            0xDA if V::HAS_65C02_OPS => {
                let x = cpu.x_lo();
                cpu.push_byte(bus, x);
            }
            0x5A if V::HAS_65C02_OPS => {
                let y = cpu.y_lo();
                cpu.push_byte(bus, y);
            }
            0x68 => {
                let n = cpu.pop_byte(bus);
                bus.tick();
                cpu.set_a_lo(n);
                cpu.set_n_z(n);
            }
            0x28 => {
                let p = cpu.pop_byte(bus);
                bus.tick();
                cpu.set_p(p);
            }
            0xFA if V::HAS_65C02_OPS => {
                let n = cpu.pop_byte(bus);
                bus.tick();
                cpu.x = n as u16;
                cpu.set_n_z(n);
            }
            0x7A if V::HAS_65C02_OPS => {
                let n = cpu.pop_byte(bus);
                bus.tick();
                cpu.y = n as u16;
                cpu.set_n_z(n);
            }

            /* ROL / ROR */
            0x2A => {
                let a = cpu.a_lo();
                let result = Self::rol(cpu, bus, a);
                cpu.set_a_lo(result);
            }
            0x26 => {
                let addr = Self::addr_zp(cpu, bus);
                Self::modify(cpu, bus, addr, Self::rol);
            }
            0x36 => {
                let addr = Self::addr_zp_x(cpu, bus);
                Self::modify(cpu, bus, addr, Self::rol);
            }
            0x2E => {
                let addr = Self::addr_abs(cpu, bus);
                Self::modify(cpu, bus, addr, Self::rol);
            }
            0x3E => {
                let addr = Self::addr_abs_x_rmw(cpu, bus);
                Self::modify(cpu, bus, addr, Self::rol);
            }
            0x6A => {
                let a = cpu.a_lo();
                let result = Self::ror(cpu, bus, a);
                cpu.set_a_lo(result);
            }
            0x66 => {
                let addr = Self::addr_zp(cpu, bus);
                Self::modify(cpu, bus, addr, Self::ror);
            }
            0x76 => {
                let addr = Self::addr_zp_x(cpu, bus);
                Self::modify(cpu, bus, addr, Self::ror);
            }
            0x6E => {
                let addr = Self::addr_abs(cpu, bus);
                Self::modify(cpu, bus, addr, Self::ror);
            }
            0x7E => {
                let addr = Self::addr_abs_x_rmw(cpu, bus);
                Self::modify(cpu, bus, addr, Self::ror);
            }

            /* SBC */
            0xE9 => {
                let n = Self::fetch_byte(cpu, bus);
                Self::sbc(cpu, bus, n);
            }
            0xE5 => {
                let addr = Self::addr_zp(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::sbc(cpu, bus, n);
            }
            0xF5 => {
                let addr = Self::addr_zp_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::sbc(cpu, bus, n);
            }
            0xED => {
                let addr = Self::addr_abs(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::sbc(cpu, bus, n);
            }
            0xFD => {
                let addr = Self::addr_abs_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::sbc(cpu, bus, n);
            }
            0xF9 => {
                let addr = Self::addr_abs_y(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::sbc(cpu, bus, n);
            }
            0xE1 => {
                let addr = Self::addr_ind_x(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::sbc(cpu, bus, n);
            }
            0xF1 => {
                let addr = Self::addr_ind_y(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::sbc(cpu, bus, n);
            }
            0xF2 if V::HAS_65C02_OPS => {
                let addr = Self::addr_zp_ind(cpu, bus);
                let n = Self::load(cpu, bus, addr);
                Self::sbc(cpu, bus, n);
            }

            /* STA / STX / STY / STZ */
            0x85 => {
                let addr = Self::addr_zp(cpu, bus);
                let a = cpu.a_lo();
                Self::store(cpu, bus, addr, a);
            }
            0x95 => {
                let addr = Self::addr_zp_x(cpu, bus);
                let a = cpu.a_lo();
                Self::store(cpu, bus, addr, a);
            }
            0x8D => {
                let addr = Self::addr_abs(cpu, bus);
                let a = cpu.a_lo();
                Self::store(cpu, bus, addr, a);
            }
            0x9D => {
                let addr = Self::addr_abs_x_rmw(cpu, bus);
                let a = cpu.a_lo();
                Self::store(cpu, bus, addr, a);
            }
            0x99 => {
                let addr = Self::addr_abs_y_store(cpu, bus);
                let a = cpu.a_lo();
                Self::store(cpu, bus, addr, a);
            }
            0x81 => {
                let addr = Self::addr_ind_x(cpu, bus);
                let a = cpu.a_lo();
                Self::store(cpu, bus, addr, a);
            }
            0x91 => {
                let addr = Self::addr_ind_y_store(cpu, bus);
                let a = cpu.a_lo();
                Self::store(cpu, bus, addr, a);
            }
            0x92 if V::HAS_65C02_OPS => {
                let addr = Self::addr_zp_ind(cpu, bus);
                let a = cpu.a_lo();
                Self::store(cpu, bus, addr, a);
            }
            0x86 => {
                let addr = Self::addr_zp(cpu, bus);
                let x = cpu.x_lo();
                Self::store(cpu, bus, addr, x);
            }
            0x96 => {
                let addr = Self::addr_zp_y(cpu, bus);
                let x = cpu.x_lo();
                Self::store(cpu, bus, addr, x);
            }
            0x8E => {
                let addr = Self::addr_abs(cpu, bus);
                let x = cpu.x_lo();
                Self::store(cpu, bus, addr, x);
            }
            0x84 => {
                let addr = Self::addr_zp(cpu, bus);
                let y = cpu.y_lo();
                Self::store(cpu, bus, addr, y);
            }
            0x94 => {
                let addr = Self::addr_zp_x(cpu, bus);
                let y = cpu.y_lo();
                Self::store(cpu, bus, addr, y);
            }
            0x8C => {
                let addr = Self::addr_abs(cpu, bus);
                let y = cpu.y_lo();
                Self::store(cpu, bus, addr, y);
            }
            0x64 if V::HAS_65C02_OPS => {
                let addr = Self::addr_zp(cpu, bus);
                Self::store(cpu, bus, addr, 0);
            }
            0x74 if V::HAS_65C02_OPS => {
                let addr = Self::addr_zp_x(cpu, bus);
                Self::store(cpu, bus, addr, 0);
            }
            0x9C if V::HAS_65C02_OPS => {
                let addr = Self::addr_abs(cpu, bus);
                Self::store(cpu, bus, addr, 0);
            }
            0x9E if V::HAS_65C02_OPS => {
                let addr = Self::addr_abs_x_rmw(cpu, bus);
                Self::store(cpu, bus, addr, 0);
            }

            /* Transfers */
            0xAA => {
                let n = cpu.a_lo();
                cpu.x = n as u16;
                cpu.set_n_z(n);
                bus.tick();
            }
            0xA8 => {
                let n = cpu.a_lo();
                cpu.y = n as u16;
                cpu.set_n_z(n);
                bus.tick();
            }
            0xBA => {
                let n = cpu.sp_lo();
                cpu.x = n as u16;
                cpu.set_n_z(n);
                bus.tick();
            }
            0x8A => {
                let n = cpu.x_lo();
                cpu.set_a_lo(n);
                cpu.set_n_z(n);
                bus.tick();
            }
            0x9A => {
                cpu.sp = 0x0100 | cpu.x_lo() as u16;
                bus.tick();
            }
            0x98 => {
                let n = cpu.y_lo();
                cpu.set_a_lo(n);
                cpu.set_n_z(n);
                bus.tick();
            }

            /* TRB / TSB */
            0x14 if V::HAS_65C02_OPS => {
                let addr = Self::addr_zp(cpu, bus);
                let a = cpu.a_lo();
                Self::modify(cpu, bus, addr, |cpu, bus, n| {
                    cpu.z = a & n == 0;
                    bus.tick();
                    n & !a
                });
            }
            0x1C if V::HAS_65C02_OPS => {
                let addr = Self::addr_abs(cpu, bus);
                let a = cpu.a_lo();
                Self::modify(cpu, bus, addr, |cpu, bus, n| {
                    cpu.z = a & n == 0;
                    bus.tick();
                    n & !a
                });
            }
            0x04 if V::HAS_65C02_OPS => {
                let addr = Self::addr_zp(cpu, bus);
                let a = cpu.a_lo();
                Self::modify(cpu, bus, addr, |cpu, bus, n| {
                    cpu.z = a & n == 0;
                    bus.tick();
                    n | a
                });
            }
            0x0C if V::HAS_65C02_OPS => {
                let addr = Self::addr_abs(cpu, bus);
                let a = cpu.a_lo();
                Self::modify(cpu, bus, addr, |cpu, bus, n| {
                    cpu.z = a & n == 0;
                    bus.tick();
                    n | a
                });
            }

            /* Rockwell bit ops */
            0x0F if V::HAS_BBR_BBS => Self::bbr_bbs(cpu, bus, 0, false),
            0x1F if V::HAS_BBR_BBS => Self::bbr_bbs(cpu, bus, 1, false),
            0x2F if V::HAS_BBR_BBS => Self::bbr_bbs(cpu, bus, 2, false),
            0x3F if V::HAS_BBR_BBS => Self::bbr_bbs(cpu, bus, 3, false),
            0x4F if V::HAS_BBR_BBS => Self::bbr_bbs(cpu, bus, 4, false),
            0x5F if V::HAS_BBR_BBS => Self::bbr_bbs(cpu, bus, 5, false),
            0x6F if V::HAS_BBR_BBS => Self::bbr_bbs(cpu, bus, 6, false),
            0x7F if V::HAS_BBR_BBS => Self::bbr_bbs(cpu, bus, 7, false),
            0x8F if V::HAS_BBR_BBS => Self::bbr_bbs(cpu, bus, 0, true),
            0x9F if V::HAS_BBR_BBS => Self::bbr_bbs(cpu, bus, 1, true),
            0xAF if V::HAS_BBR_BBS => Self::bbr_bbs(cpu, bus, 2, true),
            0xBF if V::HAS_BBR_BBS => Self::bbr_bbs(cpu, bus, 3, true),
            0xCF if V::HAS_BBR_BBS => Self::bbr_bbs(cpu, bus, 4, true),
            0xDF if V::HAS_BBR_BBS => Self::bbr_bbs(cpu, bus, 5, true),
            0xEF if V::HAS_BBR_BBS => Self::bbr_bbs(cpu, bus, 6, true),
            0xFF if V::HAS_BBR_BBS => Self::bbr_bbs(cpu, bus, 7, true),
            0x07 if V::HAS_BBR_BBS => Self::rmb_smb(cpu, bus, 0, false),
            0x17 if V::HAS_BBR_BBS => Self::rmb_smb(cpu, bus, 1, false),
            0x27 if V::HAS_BBR_BBS => Self::rmb_smb(cpu, bus, 2, false),
            0x37 if V::HAS_BBR_BBS => Self::rmb_smb(cpu, bus, 3, false),
            0x47 if V::HAS_BBR_BBS => Self::rmb_smb(cpu, bus, 4, false),
            0x57 if V::HAS_BBR_BBS => Self::rmb_smb(cpu, bus, 5, false),
            0x67 if V::HAS_BBR_BBS => Self::rmb_smb(cpu, bus, 6, false),
            0x77 if V::HAS_BBR_BBS => Self::rmb_smb(cpu, bus, 7, false),
            0x87 if V::HAS_BBR_BBS => Self::rmb_smb(cpu, bus, 0, true),
            0x97 if V::HAS_BBR_BBS => Self::rmb_smb(cpu, bus, 1, true),
            0xA7 if V::HAS_BBR_BBS => Self::rmb_smb(cpu, bus, 2, true),
            0xB7 if V::HAS_BBR_BBS => Self::rmb_smb(cpu, bus, 3, true),
            0xC7 if V::HAS_BBR_BBS => Self::rmb_smb(cpu, bus, 4, true),
            0xD7 if V::HAS_BBR_BBS => Self::rmb_smb(cpu, bus, 5, true),
            0xE7 if V::HAS_BBR_BBS => Self::rmb_smb(cpu, bus, 6, true),
            0xF7 if V::HAS_BBR_BBS => Self::rmb_smb(cpu, bus, 7, true),

            /* Everything else behaves as a NOP of the documented size */
            other => {
                if V::HAS_65C02_OPS {
                    let (bytes, cycles) = match other {
                        0x44 => (2, 3),
                        0x54 | 0xD4 | 0xF4 => (2, 4),
                        0x5C => (3, 8),
                        0xDC | 0xFC => (3, 4),
                        o if o & 0x0F == 0x02 => (2, 2),
                        _ => (1, 1),
                    };
                    Self::invalid_nop(cpu, bus, bytes, cycles);
                } else {
                    Self::invalid_nop(cpu, bus, 1, 2);
                }
            }
        }

        cpu.commit_trace();
        bus.clock.cycles() - start_cycles
    }
}
