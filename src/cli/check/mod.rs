//! Check command - validates configuration without calling any provider

use crate::config::LlmConfig;
use crate::domain::DomainError;

/// Resolve the active provider and print a redacted summary
pub async fn run() -> anyhow::Result<()> {
    let config = super::bootstrap()?;

    println!("{}", summarize(&config.llm)?);

    Ok(())
}

fn summarize(config: &LlmConfig) -> Result<String, DomainError> {
    let provider = config.provider_config()?;
    let retry = provider.retry();

    let lines = [
        format!("provider:    {}", config.provider),
        format!("model:       {}", provider.model()),
        format!("base_url:    {}", provider.base_url().unwrap_or("(provider default)")),
        format!("timeout:     {}s", provider.timeout().as_secs()),
        format!("max_retries: {}", retry.max_retries),
        "api_key:     [REDACTED]".to_string(),
    ];

    Ok(lines.join("\n"))
}
