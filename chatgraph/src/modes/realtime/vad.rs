//! Energy-based voice activity detection over PCM16 frames.
//!
//! Speech starts when a frame's RMS crosses `threshold` and ends after
//! `silence_duration_ms` of frames below it. The utterance handed out on
//! `SpeechEnded` includes up to `prefix_padding_ms` of audio from before the
//! start, so soft onsets are not clipped.

use std::collections::VecDeque;

pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Mono PCM16 samples.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    /// Decodes little-endian PCM16. A trailing odd byte is dropped.
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self { samples }
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    /// Root mean square amplitude normalized to 0.0..=1.0.
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .samples
            .iter()
            .map(|&s| {
                let v = s as f64 / i16::MAX as f64;
                v * v
            })
            .sum();
        (sum / self.samples.len() as f64).sqrt() as f32
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VadConfig {
    /// Normalized RMS above which a frame counts as speech.
    pub threshold: f32,
    pub silence_duration_ms: u32,
    pub prefix_padding_ms: u32,
    pub sample_rate: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            threshold: 0.02,
            silence_duration_ms: 500,
            prefix_padding_ms: 300,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl VadConfig {
    fn samples_for(&self, ms: u32) -> usize {
        (self.sample_rate as u64 * ms as u64 / 1000) as usize
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VadEvent {
    SpeechStarted,
    /// The finished utterance, prefix padding included.
    SpeechEnded(Vec<i16>),
}

#[derive(Debug)]
pub struct EnergyVad {
    config: VadConfig,
    prefix: VecDeque<i16>,
    utterance: Vec<i16>,
    in_speech: bool,
    silent_samples: usize,
}

impl EnergyVad {
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            prefix: VecDeque::new(),
            utterance: Vec::new(),
            in_speech: false,
            silent_samples: 0,
        }
    }

    pub fn config(&self) -> &VadConfig {
        &self.config
    }

    pub fn in_speech(&self) -> bool {
        self.in_speech
    }

    /// Feeds one frame. Returns at most one start and one end event.
    pub fn push(&mut self, frame: &AudioFrame) -> Vec<VadEvent> {
        let mut events = Vec::new();
        let loud = frame.rms() >= self.config.threshold;

        if !self.in_speech {
            if loud {
                self.in_speech = true;
                self.silent_samples = 0;
                self.utterance = self.prefix.drain(..).collect();
                self.utterance.extend_from_slice(&frame.samples);
                events.push(VadEvent::SpeechStarted);
            } else {
                self.prefix.extend(frame.samples.iter().copied());
                let keep = self.config.samples_for(self.config.prefix_padding_ms);
                while self.prefix.len() > keep {
                    self.prefix.pop_front();
                }
            }
            return events;
        }

        self.utterance.extend_from_slice(&frame.samples);
        if loud {
            self.silent_samples = 0;
        } else {
            self.silent_samples += frame.samples.len();
            if self.silent_samples >= self.config.samples_for(self.config.silence_duration_ms) {
                events.push(self.finish());
            }
        }
        events
    }

    /// Ends an utterance in progress, e.g. when the input stream closes.
    pub fn flush(&mut self) -> Option<VadEvent> {
        if self.in_speech {
            Some(self.finish())
        } else {
            None
        }
    }

    fn finish(&mut self) -> VadEvent {
        self.in_speech = false;
        self.silent_samples = 0;
        VadEvent::SpeechEnded(std::mem::take(&mut self.utterance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 1_000;

    fn config() -> VadConfig {
        VadConfig {
            sample_rate: RATE,
            ..Default::default()
        }
    }

    /// 100 ms frames at 1 kHz.
    fn loud() -> AudioFrame {
        AudioFrame::new(vec![8_000; 100])
    }

    fn quiet() -> AudioFrame {
        AudioFrame::new(vec![0; 100])
    }

    #[test]
    fn pcm_bytes_round_trip_drops_odd_byte() {
        let frame = AudioFrame::new(vec![1, -2, 300]);
        let mut bytes = frame.to_le_bytes();
        bytes.push(9);
        assert_eq!(AudioFrame::from_le_bytes(&bytes), frame);
    }

    #[test]
    fn rms_of_silence_is_zero() {
        assert_eq!(quiet().rms(), 0.0);
        assert!(loud().rms() > 0.2);
    }

    /// **Scenario**: speech followed by 500 ms of silence yields one utterance
    /// carrying up to 300 ms of prefix padding.
    #[test]
    fn detects_utterance_with_prefix_padding() {
        let mut vad = EnergyVad::new(config());
        for _ in 0..5 {
            assert!(vad.push(&quiet()).is_empty());
        }
        assert_eq!(vad.push(&loud()), vec![VadEvent::SpeechStarted]);
        assert!(vad.push(&loud()).is_empty());
        for _ in 0..4 {
            assert!(vad.push(&quiet()).is_empty());
        }
        let events = vad.push(&quiet());
        match events.as_slice() {
            [VadEvent::SpeechEnded(samples)] => {
                // 300 prefix + 200 speech + 500 trailing silence
                assert_eq!(samples.len(), 1_000);
                assert_eq!(samples[300], 8_000);
            }
            other => panic!("expected SpeechEnded, got {:?}", other),
        }
        assert!(!vad.in_speech());
    }

    #[test]
    fn short_pause_does_not_end_speech() {
        let mut vad = EnergyVad::new(config());
        vad.push(&loud());
        for _ in 0..3 {
            assert!(vad.push(&quiet()).is_empty());
        }
        assert!(vad.push(&loud()).is_empty());
        assert!(vad.in_speech());
    }

    #[test]
    fn flush_ends_open_utterance() {
        let mut vad = EnergyVad::new(config());
        assert!(vad.flush().is_none());
        vad.push(&loud());
        assert_eq!(vad.flush(), Some(VadEvent::SpeechEnded(vec![8_000; 100])));
    }
}
