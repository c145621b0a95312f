// A small cycle-domain event timer. Devices schedule (cycle, event) pairs and
// the instruction loop polls it; events are plain values dispatched by the
// bus, so nothing here ever borrows a device.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimerEvent {
    DiskMotorOff { slot: u8 },
}

pub struct EventTimer {
    queue: BinaryHeap<Reverse<(u64, TimerEvent)>>,
}

impl EventTimer {
    pub fn new() -> Self {
        EventTimer { queue: BinaryHeap::new() }
    }

    pub fn schedule(&mut self, cycle: u64, event: TimerEvent) {
        self.queue.push(Reverse((cycle, event)));
    }

    /// Drop every pending instance of `event` (used to re-arm one-shots).
    pub fn cancel(&mut self, event: TimerEvent) {
        let drained: Vec<_> = self.queue.drain().filter(|Reverse((_, e))| *e != event).collect();
        self.queue = drained.into_iter().collect();
    }

    pub fn is_due(&self, now: u64) -> bool {
        match self.queue.peek() {
            Some(Reverse((cycle, _))) => *cycle <= now,
            None => false,
        }
    }

    pub fn pop_due(&mut self, now: u64) -> Option<TimerEvent> {
        if self.is_due(now) {
            self.queue.pop().map(|Reverse((_, event))| event)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_fire_in_cycle_order() {
        let mut timer = EventTimer::new();
        timer.schedule(200, TimerEvent::DiskMotorOff { slot: 5 });
        timer.schedule(100, TimerEvent::DiskMotorOff { slot: 6 });
        assert!(!timer.is_due(99));
        assert_eq!(timer.pop_due(150), Some(TimerEvent::DiskMotorOff { slot: 6 }));
        assert_eq!(timer.pop_due(150), None);
        assert_eq!(timer.pop_due(250), Some(TimerEvent::DiskMotorOff { slot: 5 }));
    }

    #[test]
    fn cancel_removes_pending_instances() {
        let mut timer = EventTimer::new();
        timer.schedule(100, TimerEvent::DiskMotorOff { slot: 6 });
        timer.cancel(TimerEvent::DiskMotorOff { slot: 6 });
        assert_eq!(timer.pop_due(1000), None);
    }
}
