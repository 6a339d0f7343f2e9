//! `toolloop chat` - Run one agent invocation in the terminal.
//!
//! Content deltas go to stdout as they arrive; tool activity goes to stderr.

use std::io::Write;

use futures::StreamExt;
use toolloop_agent::AgentEvent;
use toolloop_config::AppConfig;
use toolloop_core::message::Message;

/// Longest tool result preview shown in the terminal.
const PREVIEW_CHARS: usize = 120;

pub async fn run(
    config: AppConfig,
    message: String,
    model: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set OPENAI_API_KEY (or TOOLLOOP_API_KEY), or add api_key to:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let agent = toolloop_gateway::build_agent(&config)?;
    let model = model.unwrap_or_else(|| config.default_model.clone());

    let mut stream = agent.run(vec![Message::user(message)], model);
    let mut stdout = std::io::stdout();

    while let Some(event) = stream.next().await {
        let event = event?;
        match &event {
            AgentEvent::ContentDelta { delta } => {
                print!("{delta}");
                stdout.flush()?;
            }
            AgentEvent::Done {} => println!(),
            _ => {
                if let Some(line) = activity_line(&event) {
                    eprintln!("{line}");
                }
            }
        }
    }

    Ok(())
}

/// One terminal line describing tool activity, if the event is tool activity.
fn activity_line(event: &AgentEvent) -> Option<String> {
    match event {
        AgentEvent::ToolCallStart {
            name,
            arguments,
            error: None,
            ..
        } => Some(format!("  → {} {arguments}", name.as_deref().unwrap_or("?"))),
        AgentEvent::ToolCallStart {
            name,
            error: Some(error),
            ..
        } => Some(format!("  → {} ({error})", name.as_deref().unwrap_or("?"))),
        AgentEvent::ToolCallResult {
            result, is_error, ..
        } => {
            let marker = if *is_error { "✗" } else { "✓" };
            Some(format!("  {marker} {}", preview(result)))
        }
        _ => None,
    }
}

fn preview(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    let mut shown: String = first_line.chars().take(PREVIEW_CHARS).collect();
    let truncated = shown.chars().count() < first_line.chars().count();
    let more_lines = text.trim_end().len() > first_line.len();
    if truncated || more_lines {
        shown.push('…');
    }
    shown
}
