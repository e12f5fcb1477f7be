//! OpenAI-compatible speech endpoints through `async_openai`: transcription
//! for STT and speech synthesis for TTS.

use async_openai::{
    config::OpenAIConfig,
    types::audio::{
        AudioInput, CreateSpeechRequest, CreateSpeechRequestArgs, CreateTranscriptionRequest,
        CreateTranscriptionRequestArgs, SpeechModel, SpeechResponseFormat, Voice,
    },
    Client,
};
use async_trait::async_trait;
use chatgraph::modes::{AudioClip, AudioFormat, SpeechError, SpeechToText, TextToSpeech};
use serde_json::Value;

use crate::config::RunConfig;
use crate::llm::openai_client;

pub struct OpenAiSpeech {
    client: Client<OpenAIConfig>,
    stt_model: String,
    stt_language: Option<String>,
    tts_model: String,
    tts_voice: String,
}

impl OpenAiSpeech {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            client: openai_client(config),
            stt_model: config.stt_model.clone(),
            stt_language: config.stt_language.clone(),
            tts_model: config.tts_model.clone(),
            tts_voice: config.tts_voice.clone(),
        }
    }

    /// Transcription request for `clip`; the file name carries the format.
    pub fn transcription_request(
        &self,
        clip: &AudioClip,
    ) -> Result<CreateTranscriptionRequest, SpeechError> {
        let mut args = CreateTranscriptionRequestArgs::default();
        args.file(AudioInput::from_vec_u8(
            format!("audio.{}", clip.format.extension()),
            clip.data.clone(),
        ))
        .model(self.stt_model.clone());
        if let Some(lang) = &self.stt_language {
            args.language(lang.clone());
        }
        args.build()
            .map_err(|e| SpeechError::Transcription(e.to_string()))
    }

    /// Speech request for `text`, always asking for mp3.
    ///
    /// Model and voice names are parsed the way the API spells them
    /// (`tts-1`, `alloy`), so an unknown voice fails here.
    pub fn speech_request(&self, text: &str) -> Result<CreateSpeechRequest, SpeechError> {
        let model: SpeechModel = serde_json::from_value(Value::String(self.tts_model.clone()))
            .map_err(|e| SpeechError::Synthesis(format!("tts model '{}': {}", self.tts_model, e)))?;
        let voice: Voice = serde_json::from_value(Value::String(self.tts_voice.clone()))
            .map_err(|e| SpeechError::Synthesis(format!("tts voice '{}': {}", self.tts_voice, e)))?;
        CreateSpeechRequestArgs::default()
            .input(text)
            .model(model)
            .voice(voice)
            .response_format(SpeechResponseFormat::Mp3)
            .build()
            .map_err(|e| SpeechError::Synthesis(e.to_string()))
    }
}

#[async_trait]
impl SpeechToText for OpenAiSpeech {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, SpeechError> {
        let request = self.transcription_request(clip)?;
        let response = self
            .client
            .audio()
            .transcription()
            .create(request)
            .await
            .map_err(|e| SpeechError::Transcription(e.to_string()))?;
        Ok(response.text)
    }
}

#[async_trait]
impl TextToSpeech for OpenAiSpeech {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SpeechError> {
        let request = self.speech_request(text)?;
        let response = self
            .client
            .audio()
            .speech()
            .create(request)
            .await
            .map_err(|e| SpeechError::Synthesis(e.to_string()))?;
        Ok(AudioClip::new(response.bytes.to_vec(), AudioFormat::Mp3))
    }
}
