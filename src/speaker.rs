// The speaker is a 1-bit output toggled by touching $C030. Rather than
// simulate every cycle, each toggle is stamped into a ring buffer in 14M
// units and the generator integrates the square wave one output sample at a
// time. Everything is fixed point with 20 fraction bits; the only divisions
// happen in configure().

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use log::warn;

pub const FRACTION_BITS: u32 = 20;
const FRACTION_ONE: u64 = 1 << FRACTION_BITS;
const VOLUME_SCALE: u64 = 5120;
const DECAY_COEFF: u64 = (0.9990f64 * FRACTION_ONE as f64) as u64;

pub const MIN_EVENT_BUFFER_SIZE: usize = 128 * 1024;

fn next_power_of_2(value: usize) -> usize {
    value.next_power_of_two()
}

/// Single-producer single-consumer ring of toggle timestamps. `add_event`
/// returns false when full; the producer drops the event and never blocks.
pub struct EventBufferRing {
    events: Vec<u64>,
    size: usize,
    read_pos: usize,
    write_pos: usize,
    count: usize,
}

impl EventBufferRing {
    pub fn new(min_size: usize) -> Self {
        let size = next_power_of_2(min_size);
        EventBufferRing { events: vec![0; size], size, read_pos: 0, write_pos: 0, count: 0 }
    }

    pub fn add_event(&mut self, cycle: u64) -> bool {
        if self.count >= self.size {
            return false;
        }
        self.events[self.write_pos] = cycle;
        self.write_pos = (self.write_pos + 1) % self.size;
        self.count += 1;
        true
    }

    pub fn peek_oldest(&self) -> Option<u64> {
        if self.count == 0 {
            None
        } else {
            Some(self.events[self.read_pos])
        }
    }

    pub fn pop(&mut self) {
        if self.count > 0 {
            self.read_pos = (self.read_pos + 1) % self.size;
            self.count -= 1;
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Debug event log: ASCII, one 14M timestamp per line.
    pub fn write_event_data(&self, path: &Path) -> io::Result<()> {
        let mut file = File::create(path)?;
        let mut i = self.read_pos;
        let mut n = self.count;
        while n > 0 {
            writeln!(file, "{}", self.events[i])?;
            i = (i + 1) % self.size;
            n -= 1;
        }
        Ok(())
    }

    pub fn load_event_data(&mut self, path: &Path) -> io::Result<()> {
        let file = BufReader::new(File::open(path)?);
        for line in file.lines() {
            let line = line?;
            if let Ok(cycle) = line.trim().parse::<u64>() {
                if !self.add_event(cycle) {
                    warn!("speaker event buffer full while loading {}", path.display());
                    break;
                }
            }
        }
        Ok(())
    }
}

/// Integrates the toggle stream into S16 samples. The gist: walk whole output
/// samples; each toggle event closes a rectangle of the waveform whose area
/// is accumulated into the current sample. O(state changes), not O(input Hz).
pub struct SpeakerFx {
    pub event_buffer: EventBufferRing,
    input_rate: u64,
    output_rate: u64,
    cycles_per_sample: u64,
    sample_scale: u64,
    rect_remain: u64,
    polarity_impulse: u64,
    polarity: u64,
    hold_counter: u64,
    hold_counter_value: u64,
    pub last_event_time: u64,
    last_event_fake: bool,
}

impl SpeakerFx {
    pub fn new(input_rate: u64, output_rate: u64, min_event_buffer_size: usize) -> Self {
        let mut fx = SpeakerFx {
            event_buffer: EventBufferRing::new(min_event_buffer_size),
            input_rate,
            output_rate,
            cycles_per_sample: 0,
            sample_scale: 0,
            rect_remain: 0,
            polarity_impulse: 1,
            polarity: FRACTION_ONE,
            hold_counter: 0,
            hold_counter_value: 0,
            last_event_time: 0,
            last_event_fake: true,
        };
        fx.configure(input_rate);
        fx
    }

    pub fn configure(&mut self, input_rate: u64) {
        self.input_rate = input_rate;
        self.cycles_per_sample = (input_rate << FRACTION_BITS) / self.output_rate;
        self.sample_scale = (VOLUME_SCALE << FRACTION_BITS) / self.cycles_per_sample;
        // 30 ms of output samples.
        self.hold_counter_value = 30 * self.output_rate / 1000;
    }

    pub fn reset(&mut self, cycle: u64) {
        self.last_event_time = cycle;
        self.rect_remain = 0;
    }

    pub fn generate_samples(&mut self, buffer: &mut Vec<i16>, num_samples: u64, frame_next_cycle_start: u64) -> u64 {
        for _ in 0..num_samples {
            let mut sample_remain = self.cycles_per_sample;
            let mut contrib: u64 = 0;

            while sample_remain > 0 {
                if self.rect_remain == 0 {
                    // Nothing left of the current rectangle: take the next
                    // event, or a fake end-of-frame one. Stale events left
                    // behind by a skew resync are dropped on the floor.
                    let event_time = loop {
                        match self.event_buffer.peek_oldest() {
                            Some(t) if t < self.last_event_time => {
                                self.event_buffer.pop();
                                continue;
                            }
                            Some(t) => {
                                self.event_buffer.pop();
                                break Some(t);
                            }
                            None => break None,
                        }
                    };
                    let (event_time, fake) = match event_time {
                        Some(t) => (t, false),
                        None => (frame_next_cycle_start.max(self.last_event_time), true),
                    };
                    self.rect_remain = (event_time - self.last_event_time) << FRACTION_BITS;
                    if !self.last_event_fake {
                        self.polarity_impulse ^= 1;
                        self.polarity = self.polarity_impulse << FRACTION_BITS;
                        self.hold_counter = self.hold_counter_value;
                    }
                    self.last_event_time = event_time;
                    self.last_event_fake = fake;
                }
                if self.rect_remain == 0 {
                    // No pending events: finish the sample on current polarity.
                    contrib += (sample_remain * self.polarity) >> FRACTION_BITS;
                    sample_remain = 0;
                } else if self.rect_remain >= sample_remain {
                    contrib += (sample_remain * self.polarity) >> FRACTION_BITS;
                    self.rect_remain -= sample_remain;
                    sample_remain = 0;
                } else {
                    contrib += (self.rect_remain * self.polarity) >> FRACTION_BITS;
                    sample_remain -= self.rect_remain;
                    self.rect_remain = 0;
                }
            }
            let contrib32 = ((contrib * self.sample_scale) >> FRACTION_BITS) as u32;
            buffer.push(contrib32 as i16);
            if self.hold_counter > 0 {
                self.hold_counter -= 1;
            } else {
                // Past the 30 ms hold, bleed the DC level off.
                self.polarity = (self.polarity * DECAY_COEFF) >> FRACTION_BITS;
            }
        }
        num_samples
    }
}

/// The device as seen by the bus: a toggle on any access in its soft-switch
/// range, time-stamped in 14M units.
pub struct Speaker {
    pub fx: SpeakerFx,
    pub volume: u32,
    overflow_drops: u64,
}

impl Speaker {
    pub fn new(c14m_per_second: u64, output_rate: u64) -> Self {
        Speaker {
            fx: SpeakerFx::new(c14m_per_second, output_rate, MIN_EVENT_BUFFER_SIZE),
            volume: 128,
            overflow_drops: 0,
        }
    }

    pub fn touch(&mut self, c_14m: u64) {
        if !self.fx.event_buffer.add_event(c_14m) {
            self.overflow_drops += 1;
        }
    }

    pub fn overflow_drops(&self) -> u64 {
        self.overflow_drops
    }

    /// Called by the frame dispatcher: resync after a long stall, then
    /// integrate one frame's worth of samples.
    pub fn generate_frame(
        &mut self,
        buffer: &mut Vec<i16>,
        num_samples: u64,
        end_frame_c14m: u64,
        c14m_per_frame: u64,
    ) -> u64 {
        if end_frame_c14m.saturating_sub(self.fx.last_event_time) > c14m_per_frame * 3 {
            warn!(
                "speaker skew: resync at 14M={} (was {})",
                end_frame_c14m, self.fx.last_event_time
            );
            self.fx.reset(end_frame_c14m - c14m_per_frame);
        }
        self.fx.generate_samples(buffer, num_samples, end_frame_c14m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_rejects_when_full() {
        let mut ring = EventBufferRing::new(2);
        assert!(ring.add_event(1));
        assert!(ring.add_event(2));
        assert!(!ring.add_event(3));
        ring.pop();
        assert!(ring.add_event(3));
    }

    #[test]
    fn capacity_rounds_to_power_of_two() {
        let ring = EventBufferRing::new(MIN_EVENT_BUFFER_SIZE);
        assert_eq!(ring.size, 131_072);
    }

    #[test]
    fn silence_integrates_to_the_dc_level_and_decays() {
        let mut fx = SpeakerFx::new(1_020_484, 44_100, 128);
        let mut buffer = Vec::new();
        fx.generate_samples(&mut buffer, 10, 1_020_484 / 60);
        assert_eq!(buffer.len(), 10);
        // No toggles: the first sample sits at the full DC level and the
        // decay bleeds it off monotonically.
        assert!((buffer[0] - 5120).abs() <= 1);
        assert!(buffer.windows(2).all(|w| w[1] <= w[0]));
    }
}
