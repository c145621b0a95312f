// A cycle-accurate emulator core for the Apple II family (II, II+, IIe,
// IIe Enhanced, IIgs). The Machine is the headless core: a CPU, a bus that
// owns the clock, the MMU and every device, and nothing else. The Emulator
// wraps a Machine with the host window, audio output and the ~59.9227 Hz
// frame dispatcher.

use std::time::{Duration, Instant};

use log::{info, warn};
use minifb::{Key, KeyRepeat, Window, WindowOptions};

pub mod audio;
pub mod clock;
pub mod diskii;
pub mod display;
pub mod iiememory;
pub mod iigsmemory;
pub mod instructions;
pub mod keyboard;
pub mod languagecard;
pub mod memory;
pub mod nibble;
pub mod paths;
pub mod platforms;
pub mod processor;
pub mod scanner;
pub mod speaker;
pub mod timer;
pub mod trace;
pub mod w65816;

use audio::AudioSystem;
use clock::ClockMode;
use diskii::StorageDevice;
use display::{Display, FB_HEIGHT, FB_WIDTH};
use instructions::{Cmos65c02, Core, Nmos6502, Wdc65c02};
use memory::Bus;
use paths::RuntimeConfig;
use platforms::{assemble_bus, attach_disk_controller, Configuration, EmulatorError, DISK_SLOT};
use processor::{Cpu, Halt, ProcessorType};
use w65816::Core65816;

pub enum Signal {
    Ok,
    Quit,
}

/// The headless machine: everything the tests and the frame loop share.
pub struct Machine {
    pub cpu: Cpu,
    pub bus: Bus,
    core: ProcessorType,
}

impl Machine {
    pub fn new(config: &Configuration) -> Machine {
        let mut bus = assemble_bus(config);
        attach_disk_controller(&mut bus, DISK_SLOT);
        let mut cpu = Cpu::new();
        cpu.trace = config.trace;
        cpu.reset(&mut bus);
        Machine { cpu, bus, core: config.platform.processor }
    }

    /// One instruction through whichever core this platform runs.
    pub fn execute_next(&mut self) -> u64 {
        match self.core {
            ProcessorType::Nmos6502 => Core::<Nmos6502>::execute_next(&mut self.cpu, &mut self.bus),
            ProcessorType::Cmos65c02 => Core::<Cmos65c02>::execute_next(&mut self.cpu, &mut self.bus),
            ProcessorType::Wdc65c02 => Core::<Wdc65c02>::execute_next(&mut self.cpu, &mut self.bus),
            ProcessorType::Wdc65816 => Core65816::execute_next(&mut self.cpu, &mut self.bus),
        }
    }

    pub fn run_until_c14m(&mut self, target: u64) {
        while self.bus.clock.c_14m() < target && self.cpu.halt == Halt::Run {
            self.execute_next();
        }
    }

    /// Mount a disk image in the controller. Refusals (bad size, unknown
    /// type) are logged and leave the drive empty.
    pub fn mount_disk(&mut self, drive: usize, path: &std::path::Path) -> bool {
        let media = match nibble::identify_media(path) {
            Ok(media) => media,
            Err(e) => {
                warn!("refusing to mount {}: {}", path.display(), e);
                return false;
            }
        };
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                warn!("could not read {}: {}", path.display(), e);
                return false;
            }
        };
        match self.bus.disk.as_mut() {
            Some(controller) => controller.drive_mut(drive).mount(media, &data),
            None => false,
        }
    }

    /// Write modified media back out in their original formats.
    pub fn writeback_disks(&mut self) {
        if let Some(controller) = self.bus.disk.as_mut() {
            for drive in 0..2 {
                if let Some((path, bytes)) = controller.drive_mut(drive).writeback() {
                    match std::fs::write(&path, bytes) {
                        Ok(()) => info!("wrote back {}", path.display()),
                        Err(e) => warn!("write-back of {} failed: {}", path.display(), e),
                    }
                }
            }
        }
    }
}

pub struct Emulator {
    pub machine: Machine,
    display: Display,
    window: Window,
    audio: Option<AudioSystem>,
    runtime: RuntimeConfig,
    audio_buffer: Vec<i16>,
    samples_per_frame_int: u64,
    samples_per_frame_remainder: f64,
    samples_accumulated: f64,
    frame_count: u64,
    clock_slip: u64,
}

// Keep roughly 100 ms of audio queued, no more.
const MAX_AUDIO_QUEUE: usize = 4410;

impl Emulator {
    pub fn new(config: Configuration, runtime: RuntimeConfig) -> Result<Emulator, EmulatorError> {
        let display = Display::new(config.char_rom.clone());
        let window = Window::new(
            config.platform.name,
            FB_WIDTH,
            FB_HEIGHT,
            WindowOptions::default(),
        )
        .map_err(|e| EmulatorError::VideoInit(e.to_string()))?;

        let audio = Some(AudioSystem::new()?);

        let machine = Machine::new(&config);
        let info = machine.bus.clock.info();
        let frame_rate = info.c14m_per_second as f64 / info.c14m_per_frame as f64;
        let samples_per_frame = audio::SAMPLE_RATE as f64 / frame_rate;

        Ok(Emulator {
            machine,
            display,
            window,
            audio,
            runtime,
            audio_buffer: Vec::with_capacity(1024),
            samples_per_frame_int: samples_per_frame as u64,
            samples_per_frame_remainder: samples_per_frame - (samples_per_frame as u64) as f64,
            samples_accumulated: 0.0,
            frame_count: 0,
            clock_slip: 0,
        })
    }

    pub fn clock_slip(&self) -> u64 {
        self.clock_slip
    }

    /// The main loop: run the CPU one frame's worth of 14M, then events,
    /// audio, device frames, video, and the frame sleep.
    pub fn run(&mut self) {
        let mut next_frame_start_14m = self.machine.bus.clock.c_14m();
        let mut last_cycle_time = Instant::now();

        while self.machine.cpu.halt != Halt::User {
            let info = *self.machine.bus.clock.info();
            let free_run = self.machine.bus.clock.mode() == ClockMode::FreeRun;

            if free_run {
                // Ludicrous speed: wall-clock bounded, 14M faked forward one
                // frame so the scanner keeps its illusion.
                let deadline = last_cycle_time + Duration::from_nanos(info.ns_per_frame_even);
                while Instant::now() < deadline && self.machine.cpu.halt == Halt::Run {
                    self.machine.execute_next();
                }
                self.machine.bus.clock.advance_c14m(info.c14m_per_frame);
                next_frame_start_14m = self.machine.bus.clock.c_14m();
            } else {
                next_frame_start_14m += info.c14m_per_frame;
                self.machine.run_until_c14m(next_frame_start_14m);
            }

            if let Signal::Quit = self.frame_events() {
                self.machine.cpu.halt = Halt::User;
            }
            if !free_run {
                self.frame_audio(next_frame_start_14m);
            }
            self.frame_devices();
            self.frame_video();
            self.frame_sleep(&mut last_cycle_time, &info);
            self.frame_count += 1;

            if self.machine.cpu.halt == Halt::Instruction {
                warn!("CPU halted by instruction at PC={:04X}", self.machine.cpu.pc);
                break;
            }
        }

        self.machine.writeback_disks();
        if self.machine.cpu.trace {
            let path = self.runtime.trace_path();
            if let Err(e) = self.machine.cpu.trace_buffer.save_to_file(&path) {
                warn!("could not save trace to {}: {}", path.display(), e);
            }
        }
    }

    /// Drain host events: keys into the keyboard latch, close box to quit.
    fn frame_events(&mut self) -> Signal {
        if !self.window.is_open() || self.window.is_key_down(Key::F12) {
            return Signal::Quit;
        }
        let shift = self.window.is_key_down(Key::LeftShift) || self.window.is_key_down(Key::RightShift);
        let ctrl = self.window.is_key_down(Key::LeftCtrl) || self.window.is_key_down(Key::RightCtrl);
        if let Some(keys) = self.window.get_keys_pressed(KeyRepeat::Yes) {
            for key in keys {
                if let Some(ascii) = keyboard::translate_key(key, shift, ctrl) {
                    self.machine.bus.kbd.key_down(ascii);
                }
            }
        }
        if self.window.get_keys().map_or(true, |keys| keys.is_empty()) {
            self.machine.bus.kbd.all_keys_up();
        }
        Signal::Ok
    }

    /// Generate one frame of audio. Whole samples only: the fractional part
    /// of samples-per-frame carries over so successive frames alternate
    /// between floor and ceiling.
    fn frame_audio(&mut self, end_frame_c14m: u64) {
        let audio = match self.audio.as_mut() {
            Some(audio) => audio,
            None => return,
        };
        if audio.queued_samples() >= MAX_AUDIO_QUEUE {
            return;
        }
        self.samples_accumulated += self.samples_per_frame_remainder;
        let mut samples_this_frame = self.samples_per_frame_int;
        if self.samples_accumulated >= 1.0 {
            samples_this_frame += 1;
            self.samples_accumulated -= 1.0;
        }
        self.audio_buffer.clear();
        let c14m_per_frame = self.machine.bus.clock.info().c14m_per_frame;
        self.machine.bus.speaker.generate_frame(
            &mut self.audio_buffer,
            samples_this_frame,
            end_frame_c14m,
            c14m_per_frame,
        );
        audio.put_stream_data(&self.audio_buffer);
    }

    /// Per-device frame handlers.
    fn frame_devices(&mut self) {
        self.display.frame_tick(&mut self.machine.bus);
    }

    fn frame_video(&mut self) {
        self.display.render(&mut self.machine.bus);
        if let Err(e) = self
            .window
            .update_with_buffer(&self.display.framebuffer, FB_WIDTH, FB_HEIGHT)
        {
            warn!("window update failed: {}", e);
        }
    }

    /// Sleep out the rest of the frame. Even frames get one more nanosecond
    /// than odd ones so the pair averages to 59.9227 Hz; slips are counted,
    /// not chased.
    fn frame_sleep(&mut self, last_cycle_time: &mut Instant, info: &clock::ClockModeInfo) {
        let ns = if self.frame_count & 1 == 0 { info.ns_per_frame_even } else { info.ns_per_frame_odd };
        let wakeup = *last_cycle_time + Duration::from_nanos(ns);
        let now = Instant::now();
        if now > wakeup {
            self.clock_slip += 1;
        } else if self.runtime.sleep_mode {
            std::thread::sleep(wakeup - now);
        } else {
            while Instant::now() < wakeup {
                std::hint::spin_loop();
            }
        }
        *last_cycle_time = Instant::now();
    }
}
