use anyhow::{Context, Result};
use clap::Parser;
use soil_advisor::{AdvisorConfig, Cli, SoilAdvisor};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = AdvisorConfig::from_env().context("invalid configuration")?;

    soil_telemetry::init_with_level("soil-advisor", config.debug)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    let advisor = SoilAdvisor::from_config(&config).await.context("failed to start the advisor")?;

    for (turn, message) in cli.messages().iter().enumerate() {
        println!("=== Pergunta {} ===", turn + 1);
        let response = advisor
            .agent_run(&cli.user_id, &cli.session_id, message)
            .await
            .with_context(|| format!("agent run failed for message {message:?}"))?;
        println!("Response {}: {}", turn + 1, response.text);
    }

    Ok(())
}
