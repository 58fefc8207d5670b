//! CLI module for the EdStats LLM gateway
//!
//! Subcommands:
//! - `serve`: HTTP API server
//! - `generate`: one-shot generation, prints the normalized response as JSON
//! - `check`: validate configuration and show the active provider

pub mod check;
pub mod generate;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// EdStats LLM gateway - one generation contract over Gemini, OpenAI and Anthropic
#[derive(Parser)]
#[command(name = "edstats-llm-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Generate text for a single prompt
    Generate(generate::GenerateArgs),

    /// Validate configuration and print the active provider
    Check,
}

/// Load `.env` and layered configuration, then install logging
pub(crate) fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    Ok(config)
}
