//! chatgraph binary: runs one text or voice turn and prints the conversation.

use std::path::{Path, PathBuf};

use chatgraph::modes::{AudioClip, AudioFormat};
use chatgraph::{build_chat_graph, MockLlm, Mode, Role, ToolChoiceMode};
use chatgraph_cli::{
    default_registry, run_voice_with_config, run_with_config, ConversationState, RunConfig,
    RunOptions,
};
use clap::Parser;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "chatgraph")]
#[command(about = "Conversation graph agent: send a message (or audio) and run one turn")]
struct Args {
    /// User message (can also be given as positional arguments)
    #[arg(short, long, value_name = "TEXT")]
    message: Option<String>,

    /// Channel: text or voice
    #[arg(long, default_value = "text")]
    mode: Mode,

    /// Audio file to transcribe (voice mode)
    #[arg(long, value_name = "FILE")]
    audio: Option<PathBuf>,

    /// Where to write the synthesized reply (voice mode)
    #[arg(long, value_name = "FILE")]
    audio_out: Option<PathBuf>,

    /// Maximum node executions per turn
    #[arg(long)]
    max_steps: Option<usize>,

    /// Sampling temperature (0-2)
    #[arg(long)]
    temperature: Option<f32>,

    /// Tool choice: auto, none or required
    #[arg(long)]
    tool_choice: Option<ToolChoiceMode>,

    /// Log node enter/exit and graph execution to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Print the tool catalog and exit
    #[arg(long)]
    list_tools: bool,

    /// Print the conversation graph as a Mermaid flowchart and exit
    #[arg(long)]
    print_graph: bool,

    /// Positional user message (when -m/--message is not used)
    #[arg(trailing_var_arg = true)]
    rest: Vec<String>,
}

fn get_message(args: &Args) -> String {
    if let Some(ref m) = args.message {
        return m.clone();
    }
    if args.rest.is_empty() {
        return "What time is it?".to_string();
    }
    args.rest.join(" ").trim().to_string()
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,chatgraph=debug,chatgraph_cli=debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_conversation(state: &ConversationState) {
    for m in &state.messages {
        match m.role {
            Role::System => {}
            Role::User => println!("[User] {}", m.content),
            Role::Assistant if !m.tool_calls.is_empty() => {
                for call in &m.tool_calls {
                    println!(
                        "[Tool call] {}({})",
                        call.tool_name,
                        serde_json::Value::Object(call.arguments.clone())
                    );
                }
            }
            Role::Assistant => println!("[Assistant] {}", m.content),
            Role::Tool => println!("[Tool] {}", m.content),
        }
    }
}

fn read_clip(path: &Path) -> Result<AudioClip, Box<dyn std::error::Error + Send + Sync>> {
    let format = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(AudioFormat::from_extension)
        .unwrap_or(AudioFormat::Wav);
    Ok(AudioClip::new(std::fs::read(path)?, format))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.list_tools {
        let registry = default_registry()?;
        for tool in registry.list() {
            println!("{}: {}", tool.name(), tool.description());
        }
        return Ok(());
    }
    if args.print_graph {
        let registry = Arc::new(default_registry()?);
        let graph = build_chat_graph(
            Arc::new(MockLlm::with_no_tool_calls("")),
            registry,
            Default::default(),
        )?;
        print!("{}", graph.to_mermaid());
        return Ok(());
    }

    let mut config = RunConfig::from_env()?;
    config.apply_options(&RunOptions {
        temperature: args.temperature,
        tool_choice: args.tool_choice,
        max_steps: args.max_steps,
        system_prompt: None,
        verbose: args.verbose,
    });

    match args.mode {
        Mode::Text => {
            let input = get_message(&args);
            let state = match run_with_config(&config, &input).await {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("error: {}", e);
                    std::process::exit(1);
                }
            };
            print_conversation(&state);
        }
        Mode::Voice => {
            let Some(path) = args.audio.as_deref() else {
                eprintln!("error: --audio FILE is required in voice mode");
                std::process::exit(2);
            };
            let clip = read_clip(path)?;
            let (state, reply) = match run_voice_with_config(&config, clip).await {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("error: {}", e);
                    std::process::exit(1);
                }
            };
            print_conversation(&state);
            match (reply.audio, args.audio_out.as_deref()) {
                (Some(audio), Some(out)) => {
                    std::fs::write(out, &audio.data)?;
                    println!("[Audio] {} bytes written to {}", audio.data.len(), out.display());
                }
                (None, Some(_)) => eprintln!("warning: speech synthesis failed; no audio written"),
                _ => {}
            }
        }
        Mode::Realtime => {
            eprintln!("error: realtime mode needs a duplex audio transport; use text or voice");
            std::process::exit(2);
        }
    }

    Ok(())
}
