// The Disk II controller and its 5.25" drives. The controller exposes the
// sixteen soft switches at $C0nX; the drive models the mounted medium as
// head-position-indexed nibble streams with an 8-step read shift register.
// Storage devices are capability objects held by index, not an inheritance
// tree.

use std::path::PathBuf;

use log::{debug, info, warn};

use crate::nibble::{
    self, denibblize_disk, load_nib_image, load_woz_image, nibblize_disk, MediaDescriptor,
    MediaType, NibbleDisk, NIB_TRACK_SIZE,
};
use crate::timer::{EventTimer, TimerEvent};

// One second of 1 MHz CPU cycles: the spindown delay after motor-off.
pub const MOTOR_OFF_DELAY_CYCLES: u64 = 1_020_484;

pub const MAX_HALF_TRACK: i32 = 68;

// Register offsets within the $C0nX window.
const PH0_OFF: u16 = 0x0;
const PH0_ON: u16 = 0x1;
const PH1_OFF: u16 = 0x2;
const PH1_ON: u16 = 0x3;
const PH2_OFF: u16 = 0x4;
const PH2_ON: u16 = 0x5;
const PH3_OFF: u16 = 0x6;
const PH3_ON: u16 = 0x7;
const MOTOR_OFF: u16 = 0x8;
const MOTOR_ON: u16 = 0x9;
const DRIVE_0: u16 = 0xA;
const DRIVE_1: u16 = 0xB;
const Q6L: u16 = 0xC;
const Q6H: u16 = 0xD;
const Q7L: u16 = 0xE;
const Q7H: u16 = 0xF;

#[derive(Debug, Clone)]
pub struct DriveStatus {
    pub is_mounted: bool,
    pub name: String,
    pub motor_on: bool,
    pub track: i32,
    pub modified: bool,
}

/// The capability set every mountable drive offers the machine.
pub trait StorageDevice {
    fn mount(&mut self, media: MediaDescriptor, data: &[u8]) -> bool;
    fn unmount(&mut self) -> bool;
    /// Returns the bytes to persist (and where) when the medium was modified.
    fn writeback(&mut self) -> Option<(PathBuf, Vec<u8>)>;
    fn status(&self) -> DriveStatus;
    fn read_cmd(&mut self, address: u16);
    fn write_cmd(&mut self, address: u16, data: u8);
    fn read_data_register(&mut self) -> u8;
    fn write_data_register(&mut self, data: u8);
    fn set_enable(&mut self, enable: bool);
    fn get_track(&self) -> i32;
}

pub struct Floppy525 {
    enable: bool,
    // Half-track position, 0..=68.
    track: i32,
    q6: bool,
    q7: bool,
    write_protect: bool,
    head_position: usize,
    // Bits left to shift out of the current nibble.
    bit_position: u8,
    read_shift_register: u16,
    write_shift_register: u8,
    is_mounted: bool,
    modified: bool,
    nibblized: NibbleDisk,
    media: Option<MediaDescriptor>,
}

impl Floppy525 {
    pub fn new() -> Self {
        Floppy525 {
            enable: false,
            track: 0,
            q6: false,
            q7: false,
            write_protect: false,
            head_position: 0,
            bit_position: 0,
            read_shift_register: 0,
            write_shift_register: 0,
            is_mounted: false,
            modified: false,
            nibblized: NibbleDisk::empty(),
            media: None,
        }
    }

    pub fn q6(&self) -> bool {
        self.q6
    }

    pub fn q7(&self) -> bool {
        self.q7
    }

    fn track_size(&self) -> usize {
        let size = self.nibblized.tracks[(self.track / 2) as usize].size;
        if size > 0 {
            size
        } else {
            NIB_TRACK_SIZE
        }
    }

    fn write_nybble(&mut self, nybble: u8) {
        self.bit_position = 0;
        self.head_position += 1;
        if self.head_position >= self.track_size() {
            self.head_position = 0;
        }
        let track = (self.track / 2) as usize;
        self.nibblized.tracks[track].data[self.head_position] = nybble;
        self.modified = true;
    }

    fn read_nybble(&mut self) -> u8 {
        // Motor off: the same data forever.
        if !self.enable {
            return (self.read_shift_register >> 8) as u8;
        }
        if self.bit_position == 0 {
            if self.track <= MAX_HALF_TRACK {
                let track = (self.track / 2) as usize;
                self.read_shift_register = self.nibblized.tracks[track].data[self.head_position] as u16;
                // Spin the virtual diskette a little more.
                self.head_position += 1;
                if self.head_position >= self.track_size() {
                    self.head_position = 0;
                }
                // Pre-shift six of the eight bit cycles; real software polls
                // the register often enough that only the last two matter.
                self.bit_position = 8;
                self.read_shift_register <<= 6;
                self.bit_position -= 6;
            }
        }
        self.read_shift_register <<= 1;
        self.bit_position = self.bit_position.saturating_sub(1);
        (self.read_shift_register >> 8) as u8
    }
}

impl StorageDevice for Floppy525 {
    fn mount(&mut self, media: MediaDescriptor, data: &[u8]) -> bool {
        if self.is_mounted {
            warn!("a disk is already mounted, unmounting it");
            self.unmount();
        }
        match media.media_type {
            MediaType::PreNibble => {
                load_nib_image(&mut self.nibblized, data);
                info!("mounted pre-nibblized disk {}", media.path.display());
            }
            MediaType::BlockOrder(interleave) => {
                self.nibblized = nibblize_disk(data, interleave, media.volume);
                info!("mounted disk {} volume {}", media.path.display(), media.volume);
            }
            MediaType::Woz => {
                let mut disk = NibbleDisk::empty();
                if let Err(e) = load_woz_image(&mut disk, data, &media.path) {
                    warn!("{}", e);
                    return false;
                }
                self.nibblized = disk;
            }
        }
        self.write_protect = media.write_protected;
        self.media = Some(media);
        self.is_mounted = true;
        self.modified = false;
        self.head_position = 0;
        self.bit_position = 0;
        true
    }

    fn unmount(&mut self) -> bool {
        for track in self.nibblized.tracks.iter_mut() {
            track.size = 0;
            for b in track.data.iter_mut() {
                *b = 0;
            }
        }
        self.is_mounted = false;
        self.media = None;
        self.modified = false;
        true
    }

    fn writeback(&mut self) -> Option<(PathBuf, Vec<u8>)> {
        let media = self.media.as_ref()?;
        if !self.modified {
            return None;
        }
        let bytes = match media.media_type {
            MediaType::PreNibble => nibble::write_nib_image(&self.nibblized),
            MediaType::BlockOrder(interleave) => match denibblize_disk(&self.nibblized, interleave) {
                Some(image) => image,
                None => {
                    warn!("write-back of {} failed to decode; leaving file alone", media.path.display());
                    return None;
                }
            },
            MediaType::Woz => {
                warn!("WOZ write-back is not supported; changes to {} discarded", media.path.display());
                return None;
            }
        };
        self.modified = false;
        Some((media.path.clone(), bytes))
    }

    fn status(&self) -> DriveStatus {
        DriveStatus {
            is_mounted: self.is_mounted,
            name: self
                .media
                .as_ref()
                .and_then(|m| m.path.file_name().map(|n| n.to_string_lossy().into_owned()))
                .unwrap_or_default(),
            motor_on: self.enable,
            track: self.track,
            modified: self.modified,
        }
    }

    /// Phase and Q-latch effects of a read access. Stepping happens when the
    /// energised phase sits two positions from the current half-track's
    /// residue; half-tracks clamp to [0, 68].
    fn read_cmd(&mut self, address: u16) {
        let reg = address & 0x0F;
        let cur_phase = self.track % 4;
        match reg {
            PH0_OFF | PH1_OFF | PH2_OFF | PH3_OFF => {}
            PH0_ON => {
                if cur_phase == 1 {
                    self.track -= 1;
                } else if cur_phase == 3 {
                    self.track += 1;
                }
            }
            PH1_ON => {
                if cur_phase == 2 {
                    self.track -= 1;
                } else if cur_phase == 0 {
                    self.track += 1;
                }
            }
            PH2_ON => {
                if cur_phase == 3 {
                    self.track -= 1;
                } else if cur_phase == 1 {
                    self.track += 1;
                }
            }
            PH3_ON => {
                if cur_phase == 0 {
                    self.track -= 1;
                } else if cur_phase == 2 {
                    self.track += 1;
                }
            }
            Q6L => {
                let was_write = self.q7;
                self.q6 = false;
                if was_write {
                    let nybble = self.write_shift_register;
                    self.write_nybble(nybble);
                }
            }
            Q6H => self.q6 = true,
            Q7L => self.q7 = false,
            Q7H => self.q7 = true,
            _ => {}
        }
        if self.track < 0 {
            debug!("head banged past track 0");
            self.track = 0;
        }
        if self.track > MAX_HALF_TRACK {
            self.track = MAX_HALF_TRACK;
        }
    }

    fn write_cmd(&mut self, address: u16, data: u8) {
        let reg = address & 0x0F;
        match reg {
            Q6H => {
                self.write_shift_register = data;
                self.q6 = true;
            }
            Q7H => {
                self.write_shift_register = data;
                self.q7 = true;
            }
            _ => {}
        }
    }

    fn read_data_register(&mut self) -> u8 {
        self.read_nybble()
    }

    fn write_data_register(&mut self, data: u8) {
        self.write_nybble(data);
    }

    fn set_enable(&mut self, enable: bool) {
        self.enable = enable;
    }

    fn get_track(&self) -> i32 {
        self.track
    }
}

/// The controller card: two drives, one of which is selected and at most one
/// motorized. Motor-off is deferred one second through the event timer,
/// mirroring the physical spindown; the deferral is re-armed by further
/// touches of the register, which software polling the window relies on.
pub struct DiskController {
    pub slot: u8,
    drives: [Floppy525; 2],
    selected: usize,
    motor_on: bool,
    pending_off: bool,
}

impl DiskController {
    pub fn new(slot: u8) -> Self {
        DiskController {
            slot,
            drives: [Floppy525::new(), Floppy525::new()],
            selected: 0,
            motor_on: false,
            pending_off: false,
        }
    }

    pub fn drive(&self, index: usize) -> &Floppy525 {
        &self.drives[index]
    }

    pub fn drive_mut(&mut self, index: usize) -> &mut Floppy525 {
        &mut self.drives[index]
    }

    pub fn selected_drive(&self) -> &Floppy525 {
        &self.drives[self.selected]
    }

    pub fn motor_on(&self) -> bool {
        self.motor_on
    }

    pub fn status(&self) -> DriveStatus {
        let mut status = self.drives[self.selected].status();
        status.motor_on = self.motor_on;
        status
    }

    /// The deferred spindown fired.
    pub fn motor_expired(&mut self) {
        if self.pending_off {
            debug!("disk motor off (slot {})", self.slot);
            self.motor_on = false;
            self.pending_off = false;
            for drive in self.drives.iter_mut() {
                drive.set_enable(false);
            }
        }
    }

    pub fn read_c0xx(&mut self, address: u16, cycles: u64, timer: &mut EventTimer) -> u8 {
        let reg = address & 0x0F;
        match reg {
            MOTOR_OFF => {
                if self.motor_on {
                    // Schedule (or push back) the spindown.
                    timer.cancel(TimerEvent::DiskMotorOff { slot: self.slot });
                    timer.schedule(cycles + MOTOR_OFF_DELAY_CYCLES, TimerEvent::DiskMotorOff { slot: self.slot });
                    self.pending_off = true;
                }
            }
            MOTOR_ON => {
                if self.pending_off {
                    timer.cancel(TimerEvent::DiskMotorOff { slot: self.slot });
                    self.pending_off = false;
                }
                self.motor_on = true;
                self.drives[self.selected].set_enable(true);
            }
            DRIVE_0 | DRIVE_1 => {
                let select = (reg - DRIVE_0) as usize;
                if select != self.selected {
                    self.drives[self.selected].set_enable(false);
                    self.selected = select;
                    let motor = self.motor_on;
                    self.drives[self.selected].set_enable(motor);
                }
            }
            Q7L => {
                let drive = &mut self.drives[self.selected];
                drive.read_cmd(address);
                if drive.q6() {
                    // Q6H then Q7L senses write protect in bit 7.
                    return if drive.write_protect { 0x80 } else { 0x00 };
                }
                return 0;
            }
            _ => {
                self.drives[self.selected].read_cmd(address);
            }
        }
        // Any even-address read with both latches low shifts the next bit of
        // the nibble stream out of the read register.
        let drive = &mut self.drives[self.selected];
        if reg & 1 == 0 && !drive.q6() && !drive.q7() {
            return drive.read_data_register();
        }
        0
    }

    pub fn write_c0xx(&mut self, address: u16, value: u8) {
        self.drives[self.selected].write_cmd(address, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stepped_track(accesses: &[u16]) -> i32 {
        let mut drive = Floppy525::new();
        for &a in accesses {
            drive.read_cmd(0xC0E0 + a);
        }
        drive.get_track()
    }

    #[test]
    fn alternating_phases_step_the_head() {
        // Phase 1 then 2 then 3... walks the head inward a half track each.
        assert_eq!(stepped_track(&[PH1_ON, PH1_OFF]), 1);
        assert_eq!(stepped_track(&[PH1_ON, PH1_OFF, PH2_ON, PH2_OFF]), 2);
        assert_eq!(stepped_track(&[PH1_ON, PH1_OFF, PH2_ON, PH2_OFF, PH3_ON]), 3);
    }

    #[test]
    fn head_clamps_at_the_stops() {
        // Stepping outward from track 0 stays at 0.
        assert_eq!(stepped_track(&[PH3_ON, PH3_OFF, PH3_ON]), 0);
    }

    #[test]
    fn drive_select_moves_the_motor() {
        let mut controller = DiskController::new(6);
        let mut timer = EventTimer::new();
        controller.read_c0xx(0xC0E9, 0, &mut timer);
        assert!(controller.motor_on());
        assert!(controller.drive(0).enable);
        controller.read_c0xx(0xC0EB, 0, &mut timer);
        assert!(!controller.drive(0).enable);
        assert!(controller.drive(1).enable);
    }
}
