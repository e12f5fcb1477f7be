//! Optional overrides for a run (CLI args or programmatic).
//!
//! Used by [`RunConfig::apply_options`](super::RunConfig::apply_options) and
//! [`run_with_options`](crate::run_with_options).

use chatgraph::ToolChoiceMode;

/// Optional overrides for a run. Only set fields override the env-based config.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Override sampling temperature (0–2).
    pub temperature: Option<f32>,
    /// Override tool choice mode (auto, none, required).
    pub tool_choice: Option<ToolChoiceMode>,
    /// Override the graph step limit.
    pub max_steps: Option<usize>,
    pub system_prompt: Option<String>,
    /// Log node enter/exit and graph execution.
    pub verbose: bool,
}
