//! Completions read from the user's configuration files.
//!
//! Loading goes through the permission gate in `conductor_core::config`, so
//! a file looser than `0600` yields an error, which the envelope turns into
//! an empty list.

use anyhow::Result;
use conductor_core::config::{load_config, load_mcp_config};
use conductor_core::ConfigPaths;

use super::Completion;

/// Provider types the runner knows how to drive.
pub const PROVIDER_TYPES: [(&str, &str); 4] = [
    ("claude-code", "Claude Code CLI"),
    ("anthropic", "Anthropic API"),
    ("openai", "OpenAI API"),
    ("ollama", "Local models via Ollama"),
];

pub fn complete_providers(paths: &ConfigPaths) -> Result<Completion> {
    let config = load_config(&paths.config_file)?;
    Ok(Completion::values(config.provider_names()))
}

pub fn complete_mcp_servers(paths: &ConfigPaths) -> Result<Completion> {
    let config = load_mcp_config(&paths.mcp_file)?;
    Ok(Completion::values(config.server_names()))
}
