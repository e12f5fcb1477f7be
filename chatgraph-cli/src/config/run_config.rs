//! Run config: provider endpoint and model, graph limits and speech models.
//! Filled from env / .env by [`RunConfig::from_env`].

use chatgraph::graph::DEFAULT_MAX_STEPS;
use chatgraph::{ChatGraphOptions, ToolChoiceMode, DEFAULT_SYSTEM_PROMPT};

/// Error type used for config loading and runs.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TTS_MODEL: &str = "tts-1";
pub const DEFAULT_TTS_VOICE: &str = "alloy";
pub const DEFAULT_STT_MODEL: &str = "whisper-1";

#[derive(Clone, Debug)]
pub struct RunConfig {
    /// OpenAI-compatible API base URL, e.g. `https://api.openai.com/v1`.
    pub api_base: String,
    pub api_key: String,
    /// Chat model name, e.g. `gpt-4o-mini`.
    pub model: String,
    /// Sampling temperature 0–2. Default: unset (use API default).
    pub temperature: Option<f32>,
    /// Tool choice mode: auto (model chooses), none (no tools), required (must use tools).
    pub tool_choice: Option<ToolChoiceMode>,
    pub max_steps: usize,
    /// System prompt for new conversations. Default: [`DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,
    pub tts_model: String,
    pub tts_voice: String,
    pub stt_model: String,
    /// ISO-639-1 hint for transcription.
    pub stt_language: Option<String>,
    /// When true, log node enter/exit and graph execution.
    pub verbose: bool,
}

impl RunConfig {
    /// Config with the given key and every other field at its default.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            tool_choice: None,
            max_steps: DEFAULT_MAX_STEPS,
            system_prompt: None,
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            tts_voice: DEFAULT_TTS_VOICE.to_string(),
            stt_model: DEFAULT_STT_MODEL.to_string(),
            stt_language: None,
            verbose: false,
        }
    }

    /// Fill config from env vars. Call `dotenv::dotenv().ok()` first to include `.env`.
    ///
    /// `OPENAI_API_KEY` required; `OPENAI_API_BASE`, `OPENAI_MODEL` have defaults.
    /// `OPENAI_TEMPERATURE`, `OPENAI_TOOL_CHOICE` (auto|none|required), `MAX_STEPS`,
    /// `SYSTEM_PROMPT` optional. Speech: `TTS_MODEL`, `TTS_VOICE`, `STT_MODEL`,
    /// `STT_LANGUAGE` optional.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "OPENAI_API_KEY is not set; please configure it in .env",
            )
        })?;
        let mut config = Self::with_api_key(api_key);
        if let Ok(base) = std::env::var("OPENAI_API_BASE") {
            config.api_base = base;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            config.model = model;
        }
        config.temperature = std::env::var("OPENAI_TEMPERATURE")
            .ok()
            .and_then(|s| s.parse().ok());
        config.tool_choice = match std::env::var("OPENAI_TOOL_CHOICE") {
            Ok(s) => Some(s.parse::<ToolChoiceMode>()?),
            Err(_) => None,
        };
        if let Some(steps) = std::env::var("MAX_STEPS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
        {
            config.max_steps = steps;
        }
        config.system_prompt = std::env::var("SYSTEM_PROMPT").ok().filter(|s| !s.trim().is_empty());
        if let Ok(v) = std::env::var("TTS_MODEL") {
            config.tts_model = v;
        }
        if let Ok(v) = std::env::var("TTS_VOICE") {
            config.tts_voice = v;
        }
        if let Ok(v) = std::env::var("STT_MODEL") {
            config.stt_model = v;
        }
        config.stt_language = std::env::var("STT_LANGUAGE").ok();
        Ok(config)
    }

    /// Apply optional overrides from `RunOptions`. Only set fields override.
    pub fn apply_options(&mut self, options: &super::RunOptions) {
        if let Some(t) = options.temperature {
            self.temperature = Some(t);
        }
        if let Some(tc) = options.tool_choice {
            self.tool_choice = Some(tc);
        }
        if let Some(steps) = options.max_steps {
            self.max_steps = steps;
        }
        if options.system_prompt.is_some() {
            self.system_prompt = options.system_prompt.clone();
        }
        if options.verbose {
            self.verbose = true;
        }
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    /// Options for [`chatgraph::build_chat_graph`].
    pub fn graph_options(&self) -> ChatGraphOptions {
        ChatGraphOptions {
            max_steps: self.max_steps,
            verbose: self.verbose,
            system_prompt: self.system_prompt().to_string(),
        }
    }
}
