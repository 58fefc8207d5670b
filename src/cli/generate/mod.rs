//! Generate command - one-shot text generation

use clap::Args;

use crate::domain::GenerationOptions;
use crate::infrastructure::llm::LlmFactory;

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Prompt text; the default prompt is used when omitted
    pub prompt: Option<String>,

    /// Model override
    #[arg(long)]
    pub model: Option<String>,

    /// Sampling temperature override
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum output tokens override
    #[arg(long)]
    pub max_tokens: Option<u32>,
}

impl GenerateArgs {
    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..Default::default()
        }
    }
}

/// Run a single generation and print the response as JSON
pub async fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let factory = LlmFactory::from_config(&config.llm)?;

    let response = factory
        .generate_text(args.prompt.as_deref(), args.options())
        .await?;

    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
