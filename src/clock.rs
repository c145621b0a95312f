// The master clock. Every CPU cycle is converted into a number of 14M ticks
// (14.318180 MHz US, 14.250450 MHz PAL), and at the end of each scanline two
// extra 14M ticks are inserted so that 65 CPU cycles x 262 scanlines plus the
// stretch comes out to exactly 238944 ticks per frame (59.9227 Hz).

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ClockSet {
    Us,
    Pal,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ClockMode {
    FreeRun,
    Mhz1_0205,
    Mhz2_8,
    Mhz7_14,
    Mhz14_3,
}

impl ClockMode {
    pub fn name(&self) -> &'static str {
        match *self {
            ClockMode::FreeRun => "Ludicrous Speed",
            ClockMode::Mhz1_0205 => "1.0205 MHz",
            ClockMode::Mhz2_8 => "2.8 MHz",
            ClockMode::Mhz7_14 => "7.1435 MHz",
            ClockMode::Mhz14_3 => "14.318 MHz",
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct ClockModeInfo {
    pub hz_rate: u64,
    pub c14m_per_second: u64,
    pub cycles_per_frame: u64,
    pub c14m_per_cpu_cycle: u64,
    pub extra_per_scanline: u64,
    pub cycles_per_scanline: u64,
    pub c14m_per_frame: u64,
    pub ns_per_frame_even: u64,
    pub ns_per_frame_odd: u64,
}

// Cycle counts in the free-run line are nominal; the frame loop drives that
// mode off the wall clock instead.
const US_CLOCK_MODE_INFO: [ClockModeInfo; 5] = [
    ClockModeInfo { hz_rate: 14_318_180, c14m_per_second: 14_318_180, cycles_per_frame: 238_420, c14m_per_cpu_cycle: 1, extra_per_scanline: 0, cycles_per_scanline: 912, c14m_per_frame: 238_944, ns_per_frame_even: 16_688_154, ns_per_frame_odd: 16_688_155 },
    ClockModeInfo { hz_rate: 1_020_484, c14m_per_second: 14_318_180, cycles_per_frame: 17_030, c14m_per_cpu_cycle: 14, extra_per_scanline: 2, cycles_per_scanline: 65, c14m_per_frame: 238_944, ns_per_frame_even: 16_688_154, ns_per_frame_odd: 16_688_155 },
    ClockModeInfo { hz_rate: 2_857_370, c14m_per_second: 14_318_180, cycles_per_frame: 47_684, c14m_per_cpu_cycle: 5, extra_per_scanline: 2, cycles_per_scanline: 182, c14m_per_frame: 238_944, ns_per_frame_even: 16_688_154, ns_per_frame_odd: 16_688_155 },
    ClockModeInfo { hz_rate: 7_143_390, c14m_per_second: 14_318_180, cycles_per_frame: 119_210, c14m_per_cpu_cycle: 2, extra_per_scanline: 2, cycles_per_scanline: 455, c14m_per_frame: 238_944, ns_per_frame_even: 16_688_154, ns_per_frame_odd: 16_688_155 },
    ClockModeInfo { hz_rate: 14_286_780, c14m_per_second: 14_318_180, cycles_per_frame: 238_420, c14m_per_cpu_cycle: 1, extra_per_scanline: 2, cycles_per_scanline: 912, c14m_per_frame: 238_944, ns_per_frame_even: 16_688_154, ns_per_frame_odd: 16_688_155 },
];

const PAL_CLOCK_MODE_INFO: [ClockModeInfo; 5] = [
    ClockModeInfo { hz_rate: 14_250_450, c14m_per_second: 14_250_450, cycles_per_frame: 283_920, c14m_per_cpu_cycle: 1, extra_per_scanline: 0, cycles_per_scanline: 912, c14m_per_frame: 284_544, ns_per_frame_even: 19_967_369, ns_per_frame_odd: 19_967_370 },
    ClockModeInfo { hz_rate: 1_015_657, c14m_per_second: 14_250_450, cycles_per_frame: 20_280, c14m_per_cpu_cycle: 14, extra_per_scanline: 2, cycles_per_scanline: 65, c14m_per_frame: 284_544, ns_per_frame_even: 19_967_369, ns_per_frame_odd: 19_967_370 },
    ClockModeInfo { hz_rate: 2_857_370, c14m_per_second: 14_250_450, cycles_per_frame: 56_784, c14m_per_cpu_cycle: 5, extra_per_scanline: 2, cycles_per_scanline: 182, c14m_per_frame: 284_544, ns_per_frame_even: 19_967_369, ns_per_frame_odd: 19_967_370 },
    ClockModeInfo { hz_rate: 7_143_390, c14m_per_second: 14_250_450, cycles_per_frame: 141_960, c14m_per_cpu_cycle: 2, extra_per_scanline: 2, cycles_per_scanline: 455, c14m_per_frame: 284_544, ns_per_frame_even: 19_967_369, ns_per_frame_odd: 19_967_370 },
    ClockModeInfo { hz_rate: 14_250_450, c14m_per_second: 14_250_450, cycles_per_frame: 283_920, c14m_per_cpu_cycle: 1, extra_per_scanline: 2, cycles_per_scanline: 910, c14m_per_frame: 284_544, ns_per_frame_even: 19_967_369, ns_per_frame_odd: 19_967_370 },
];

const C14M_PER_VIDEO_CYCLE: u64 = 14;
const C14M_PER_SCANLINE: u64 = 910;

pub struct Clock {
    set: ClockSet,
    mode: ClockMode,
    current: ClockModeInfo,
    cycles: u64,
    c_14m: u64,
    video_cycle_14m_count: u64,
    scanline_14m_count: u64,
    // IIgs fast-ROM accesses advance the 14M clock by fewer ticks.
    next_cycle_fast: bool,
}

impl Clock {
    pub fn new(set: ClockSet, mode: ClockMode) -> Self {
        let mut clock = Clock {
            set,
            mode,
            current: US_CLOCK_MODE_INFO[1],
            cycles: 0,
            c_14m: 0,
            video_cycle_14m_count: 0,
            scanline_14m_count: 0,
            next_cycle_fast: false,
        };
        clock.set_mode(mode);
        clock
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn c_14m(&self) -> u64 {
        self.c_14m
    }

    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    pub fn info(&self) -> &ClockModeInfo {
        &self.current
    }

    pub fn set_mode(&mut self, mode: ClockMode) {
        let table = match self.set {
            ClockSet::Us => &US_CLOCK_MODE_INFO,
            ClockSet::Pal => &PAL_CLOCK_MODE_INFO,
        };
        self.mode = mode;
        self.current = table[match mode {
            ClockMode::FreeRun => 0,
            ClockMode::Mhz1_0205 => 1,
            ClockMode::Mhz2_8 => 2,
            ClockMode::Mhz7_14 => 3,
            ClockMode::Mhz14_3 => 4,
        }];
    }

    pub fn set_next_cycle_fast(&mut self) {
        self.next_cycle_fast = true;
    }

    /// Advance one CPU cycle. Returns the number of video-scanner cycles the
    /// caller must run (one per 14 ticks of 14M accumulated).
    pub fn tick(&mut self) -> u32 {
        self.cycles += 1;
        if self.mode == ClockMode::FreeRun {
            return 0;
        }
        let step = if self.next_cycle_fast {
            self.next_cycle_fast = false;
            // Fast side of the FPI: 2.8 MHz worth of 14M ticks.
            5
        } else {
            self.current.c14m_per_cpu_cycle
        };
        self.c_14m += step;
        self.video_cycle_14m_count += step;
        self.scanline_14m_count += step;

        let mut video_cycles = 0;
        while self.video_cycle_14m_count >= C14M_PER_VIDEO_CYCLE {
            self.video_cycle_14m_count -= C14M_PER_VIDEO_CYCLE;
            video_cycles += 1;
        }
        if self.scanline_14m_count >= C14M_PER_SCANLINE {
            // End of scanline: add the stretched half cycle.
            self.c_14m += self.current.extra_per_scanline;
            self.scanline_14m_count = 0;
        }
        video_cycles
    }

    /// Free-run mode executes by wall clock; the 14M counter is bulk-advanced
    /// one frame at a time to keep the scanner's illusion.
    pub fn advance_c14m(&mut self, ticks: u64) {
        self.c_14m += ticks;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stretch_adds_up_to_a_frame() {
        let info = &US_CLOCK_MODE_INFO[1];
        let per_line = info.cycles_per_scanline * info.c14m_per_cpu_cycle + info.extra_per_scanline;
        assert_eq!(per_line, 912);
        assert_eq!(per_line * 262, info.c14m_per_frame);
    }

    #[test]
    fn one_mhz_cycle_is_fourteen_ticks() {
        let mut clock = Clock::new(ClockSet::Us, ClockMode::Mhz1_0205);
        let video_cycles = clock.tick();
        assert_eq!(clock.cycles(), 1);
        assert_eq!(clock.c_14m(), 14);
        assert_eq!(video_cycles, 1);
    }

    #[test]
    fn scanline_wrap_inserts_stretch() {
        let mut clock = Clock::new(ClockSet::Us, ClockMode::Mhz1_0205);
        for _ in 0..65 {
            clock.tick();
        }
        // 65 cycles x 14 ticks + 2 stretch ticks.
        assert_eq!(clock.c_14m(), 912);
    }
}
