//! Audio output for the NES APU
//!
//! Each frame's samples are queued on an SDL2 playback device. The device
//! format follows the configured bit depth: signed 16-bit, or unsigned
//! 8-bit converted from the APU's 16-bit output.

use sdl2::audio::{AudioQueue, AudioSpecDesired};
use tracing::{debug, warn};

use crate::config::Config;

/// Queued audio beyond this many seconds is dropped instead of piling up
const MAX_LATENCY_SECS: u32 = 1;

enum Queue {
    Signed16(AudioQueue<i16>),
    Unsigned8(AudioQueue<u8>),
}

/// Audio output handler that receives samples from the NES APU
pub struct NesAudio {
    queue: Queue,
    scratch: Vec<u8>,
    max_queued_bytes: u32,
}

impl NesAudio {
    /// Open a mono playback queue at the configured rate and depth
    ///
    /// # Errors
    /// Returns an error if SDL2 audio initialization fails
    pub fn new(sdl_context: &sdl2::Sdl, config: &Config) -> Result<Self, String> {
        let audio_subsystem = sdl_context.audio()?;

        let desired_spec = AudioSpecDesired {
            freq: Some(config.audio_sample_rate as i32),
            channels: Some(1),
            samples: None,
        };

        let queue = if config.audio_bit_depth == 8 {
            Queue::Unsigned8(audio_subsystem.open_queue::<u8, _>(None, &desired_spec)?)
        } else {
            Queue::Signed16(audio_subsystem.open_queue::<i16, _>(None, &desired_spec)?)
        };
        let bytes_per_sample = config.audio_bit_depth / 8;

        debug!(
            "audio: {} Hz, {} bit",
            config.audio_sample_rate, config.audio_bit_depth
        );

        Ok(Self {
            queue,
            scratch: Vec::new(),
            max_queued_bytes: config.audio_sample_rate * bytes_per_sample * MAX_LATENCY_SECS,
        })
    }

    /// Start audio playback
    pub fn resume(&self) {
        match &self.queue {
            Queue::Signed16(q) => q.resume(),
            Queue::Unsigned8(q) => q.resume(),
        }
    }

    /// Pause audio playback
    pub fn pause(&self) {
        match &self.queue {
            Queue::Signed16(q) => q.pause(),
            Queue::Unsigned8(q) => q.pause(),
        }
    }

    /// Bytes waiting to be played
    pub fn queued_bytes(&self) -> u32 {
        match &self.queue {
            Queue::Signed16(q) => q.size(),
            Queue::Unsigned8(q) => q.size(),
        }
    }

    /// Queue one frame of samples
    pub fn push(&mut self, samples: &[i16]) -> Result<(), String> {
        if self.queued_bytes() > self.max_queued_bytes {
            warn!("audio queue full, dropping {} samples", samples.len());
            return Ok(());
        }
        match &self.queue {
            Queue::Signed16(q) => q.queue_audio(samples),
            Queue::Unsigned8(q) => {
                self.scratch.clear();
                self.scratch.extend(samples.iter().map(|&s| to_unsigned(s)));
                q.queue_audio(&self.scratch)
            }
        }
    }
}

/// Signed 16-bit sample to unsigned 8-bit, silence at 0x80
fn to_unsigned(sample: i16) -> u8 {
    ((sample >> 8) as u8) ^ 0x80
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_to_unsigned() {
        assert_eq!(to_unsigned(0), 0x80);
        assert_eq!(to_unsigned(i16::MIN), 0x00);
        assert_eq!(to_unsigned(i16::MAX), 0xff);
        assert_eq!(to_unsigned(0x0100), 0x81);
        assert_eq!(to_unsigned(-0x0100), 0x7f);
    }

    #[test]
    #[serial]
    fn test_audio_queue() {
        // Machines without an audio device have nothing to check
        let Ok(sdl_context) = sdl2::init() else {
            return;
        };
        for bits in [8, 16] {
            let config = Config {
                audio_bit_depth: bits,
                ..Config::default()
            };
            let Ok(mut audio) = NesAudio::new(&sdl_context, &config) else {
                return;
            };
            audio.pause();
            audio.push(&[0; 735]).unwrap();
            assert_eq!(audio.queued_bytes(), 735 * bits / 8);
            audio.resume();
        }
    }
}
