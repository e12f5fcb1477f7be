//! OpenAI-compatible Chat Completions client implementing `LlmClient`.
//!
//! Talks to any endpoint that speaks the `/chat/completions` format (OpenAI,
//! Groq, Ollama) through `async_openai`. Request building and response parsing
//! are separate functions so they can be tested without a server.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls,
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestToolMessageArgs,
        ChatCompletionRequestUserMessage, ChatCompletionResponseMessage, ChatCompletionTool,
        ChatCompletionToolChoiceOption, ChatCompletionTools, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, FunctionCall, FunctionObject, ToolChoiceOptions,
    },
    Client,
};
use async_trait::async_trait;
use chatgraph::llm::{LlmClient, LlmResponse};
use chatgraph::{AgentError, Message, Role, ToolCall, ToolChoiceMode, ToolSpec};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::RunConfig;

/// Client for the configured endpoint and key; shared by chat and speech.
pub(crate) fn openai_client(config: &RunConfig) -> Client<OpenAIConfig> {
    Client::with_config(
        OpenAIConfig::new()
            .with_api_key(&config.api_key)
            .with_api_base(&config.api_base),
    )
}

pub struct ChatOpenAICompat {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: Option<f32>,
    tool_choice: Option<ToolChoiceMode>,
}

impl ChatOpenAICompat {
    /// Build client with custom config (e.g. custom API key or base URL).
    pub fn with_config(config: OpenAIConfig, model: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(config),
            model: model.into(),
            temperature: None,
            tool_choice: None,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            client: openai_client(config),
            model: config.model.clone(),
            temperature: config.temperature,
            tool_choice: config.tool_choice,
        }
    }

    /// Set temperature (0–2). Lower values are more deterministic.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set tool choice mode. Only sent when tools are present.
    pub fn with_tool_choice(mut self, mode: ToolChoiceMode) -> Self {
        self.tool_choice = Some(mode);
        self
    }

    /// Request for one completion over `messages` with `tools` advertised.
    pub fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<CreateChatCompletionRequest, AgentError> {
        let openai_messages = messages
            .iter()
            .map(message_to_request)
            .collect::<Result<Vec<_>, _>>()
            .map_err(build_error)?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone());
        args.messages(openai_messages);

        if !tools.is_empty() {
            let chat_tools: Vec<ChatCompletionTools> = tools
                .iter()
                .map(|t| {
                    ChatCompletionTools::Function(ChatCompletionTool {
                        function: FunctionObject {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: Some(t.input_schema.clone()),
                            ..Default::default()
                        },
                    })
                })
                .collect();
            args.tools(chat_tools);

            if let Some(mode) = self.tool_choice {
                let opt = match mode {
                    ToolChoiceMode::Auto => ToolChoiceOptions::Auto,
                    ToolChoiceMode::None => ToolChoiceOptions::None,
                    ToolChoiceMode::Required => ToolChoiceOptions::Required,
                };
                args.tool_choice(ChatCompletionToolChoiceOption::Mode(opt));
            }
        }

        if let Some(t) = self.temperature {
            args.temperature(t);
        }

        args.build().map_err(build_error)
    }
}

fn build_error(e: OpenAIError) -> AgentError {
    AgentError::ExecutionFailed(format!("chat completion request build failed: {}", e))
}

fn message_to_request(m: &Message) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    Ok(match m.role {
        Role::System => ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessage::from(m.content.as_str()),
        ),
        Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage::from(
            m.content.as_str(),
        )),
        Role::Assistant if m.tool_calls.is_empty() => {
            ChatCompletionRequestMessage::Assistant(m.content.as_str().into())
        }
        Role::Assistant => {
            let calls: Vec<ChatCompletionMessageToolCalls> = m
                .tool_calls
                .iter()
                .map(|c| {
                    ChatCompletionMessageToolCalls::Function(ChatCompletionMessageToolCall {
                        id: c.id.clone(),
                        function: FunctionCall {
                            name: c.tool_name.clone(),
                            arguments: Value::Object(c.arguments.clone()).to_string(),
                        },
                    })
                })
                .collect();
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            args.tool_calls(calls);
            if !m.content.is_empty() {
                args.content(m.content.as_str());
            }
            ChatCompletionRequestMessage::Assistant(args.build()?)
        }
        Role::Tool => ChatCompletionRequestMessage::Tool(
            ChatCompletionRequestToolMessageArgs::default()
                .content(m.content.as_str())
                .tool_call_id(m.tool_call_id.clone().unwrap_or_default())
                .build()?,
        ),
    })
}

/// Extracts text and tool calls from a response message.
///
/// Tool arguments arrive as a JSON string; unparsable arguments become an
/// empty object so schema validation reports them to the model.
pub fn parse_message(message: ChatCompletionResponseMessage) -> LlmResponse {
    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .filter_map(|tc| {
            if let ChatCompletionMessageToolCalls::Function(f) = tc {
                let arguments = serde_json::from_str(&f.function.arguments).unwrap_or_else(|e| {
                    warn!(tool = %f.function.name, error = %e, "unparsable tool arguments");
                    Value::Null
                });
                Some(ToolCall::new(f.id, f.function.name, arguments))
            } else {
                None
            }
        })
        .collect();
    LlmResponse {
        content: message.content.unwrap_or_default(),
        tool_calls,
    }
}

#[async_trait]
impl LlmClient for ChatOpenAICompat {
    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<LlmResponse, AgentError> {
        let request = self.build_request(messages, tools)?;
        debug!(model = %self.model, messages = messages.len(), tools = tools.len(), "chat completion request");

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AgentError::ExecutionFailed(format!("chat completion API error: {}", e)))?;

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            AgentError::ExecutionFailed("completion returned no choices".to_string())
        })?;
        Ok(parse_message(choice.message))
    }
}
