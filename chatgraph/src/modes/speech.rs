//! Speech capabilities injected into voice and realtime ingest/emit.
//!
//! Audio processing stays outside the graph: the voice handler transcribes
//! before the turn and synthesizes after it, so the graph is mode-agnostic.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

/// Container format of an [`AudioClip`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Ogg,
    Webm,
    Flac,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Webm => "webm",
            AudioFormat::Flac => "flac",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Webm => "audio/webm",
            AudioFormat::Flac => "audio/flac",
        }
    }

    /// Guesses the format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "wav" => Some(AudioFormat::Wav),
            "mp3" | "mpeg" => Some(AudioFormat::Mp3),
            "ogg" | "oga" => Some(AudioFormat::Ogg),
            "webm" => Some(AudioFormat::Webm),
            "flac" => Some(AudioFormat::Flac),
            _ => None,
        }
    }
}

/// Encoded audio buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioClip {
    pub data: Vec<u8>,
    pub format: AudioFormat,
}

impl AudioClip {
    pub fn new(data: Vec<u8>, format: AudioFormat) -> Self {
        Self { data, format }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Wraps mono PCM16 samples in a canonical 44-byte-header WAV container.
    pub fn wav_from_pcm16(samples: &[i16], sample_rate: u32) -> Self {
        let data_len = (samples.len() * 2) as u32;
        let mut data = Vec::with_capacity(44 + data_len as usize);
        data.extend_from_slice(b"RIFF");
        data.extend_from_slice(&(36 + data_len).to_le_bytes());
        data.extend_from_slice(b"WAVE");
        data.extend_from_slice(b"fmt ");
        data.extend_from_slice(&16u32.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes()); // PCM
        data.extend_from_slice(&1u16.to_le_bytes()); // mono
        data.extend_from_slice(&sample_rate.to_le_bytes());
        data.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes());
        data.extend_from_slice(&16u16.to_le_bytes());
        data.extend_from_slice(b"data");
        data.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            data.extend_from_slice(&s.to_le_bytes());
        }
        Self {
            data,
            format: AudioFormat::Wav,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechError {
    #[error("transcription failed: {0}")]
    Transcription(String),
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),
}

/// Speech-to-text capability.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, SpeechError>;
}

/// Text-to-speech capability.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SpeechError>;
}

/// The pair of speech capabilities a voice channel needs.
#[derive(Clone)]
pub struct SpeechServices {
    pub stt: Arc<dyn SpeechToText>,
    pub tts: Arc<dyn TextToSpeech>,
}

impl SpeechServices {
    pub fn new(stt: Arc<dyn SpeechToText>, tts: Arc<dyn TextToSpeech>) -> Self {
        Self { stt, tts }
    }

    /// Both capabilities from one provider.
    pub fn from_provider<P>(provider: Arc<P>) -> Self
    where
        P: SpeechToText + TextToSpeech + 'static,
    {
        Self {
            stt: provider.clone(),
            tts: provider,
        }
    }
}

/// Scripted speech provider for tests and offline runs.
///
/// Transcripts are handed out in order and the last one repeats. Synthesis
/// echoes the text bytes back as an MP3-tagged clip unless `failing_synthesis`
/// is set.
pub struct MockSpeech {
    transcripts: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    fail_synthesis: bool,
}

impl MockSpeech {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self::with_transcripts(vec![transcript.into()])
    }

    pub fn with_transcripts(transcripts: Vec<String>) -> Self {
        Self {
            transcripts: Mutex::new(transcripts.into()),
            last: Mutex::new(String::new()),
            fail_synthesis: false,
        }
    }

    pub fn failing_synthesis(mut self) -> Self {
        self.fail_synthesis = true;
        self
    }

    pub fn services(self) -> SpeechServices {
        SpeechServices::from_provider(Arc::new(self))
    }
}

#[async_trait]
impl SpeechToText for MockSpeech {
    async fn transcribe(&self, _clip: &AudioClip) -> Result<String, SpeechError> {
        let mut queue = self.transcripts.lock().unwrap_or_else(|e| e.into_inner());
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(next) = queue.pop_front() {
            *last = next;
        }
        Ok(last.clone())
    }
}

#[async_trait]
impl TextToSpeech for MockSpeech {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SpeechError> {
        if self.fail_synthesis {
            return Err(SpeechError::Synthesis("mock synthesis disabled".to_string()));
        }
        Ok(AudioClip::new(text.as_bytes().to_vec(), AudioFormat::Mp3))
    }
}
