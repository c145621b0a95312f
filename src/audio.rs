// Host audio output. One mono S16 stream at the device rate, fed a frame of
// samples at a time by the dispatcher; gain is applied in software before the
// samples reach the sink.

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};

use crate::platforms::EmulatorError;

pub const SAMPLE_RATE: u32 = 44_100;

pub struct AudioSystem {
    // The stream must stay alive for the sink to keep playing.
    _stream: OutputStream,
    _handle: OutputStreamHandle,
    sink: Sink,
    volume: u32,
    samples_per_frame_hint: usize,
}

impl AudioSystem {
    pub fn new() -> Result<Self, EmulatorError> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| EmulatorError::AudioInit(e.to_string()))?;
        let sink = Sink::try_new(&handle).map_err(|e| EmulatorError::AudioInit(e.to_string()))?;
        Ok(AudioSystem {
            _stream: stream,
            _handle: handle,
            sink,
            volume: 128,
            samples_per_frame_hint: (SAMPLE_RATE / 60) as usize,
        })
    }

    pub fn volume(&self) -> u32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: u32) {
        self.volume = volume.min(255);
    }

    pub fn put_stream_data(&mut self, samples: &[i16]) {
        let scaled: Vec<i16> =
            samples.iter().map(|&s| ((s as i32 * self.volume as i32) / 255) as i16).collect();
        self.samples_per_frame_hint = samples.len().max(1);
        self.sink.append(SamplesBuffer::new(1, SAMPLE_RATE, scaled));
    }

    /// Approximate number of samples queued but not yet played, for the
    /// dispatcher's ~100 ms cap.
    pub fn queued_samples(&self) -> usize {
        self.sink.len() * self.samples_per_frame_hint
    }
}
