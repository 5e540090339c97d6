use corep_assistant::*;
use dotenv::dotenv;
use std::io::Read;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let mut scenario = String::new();
    std::io::stdin().read_to_string(&mut scenario)?;

    let config = AssistantConfig::default().with_env_overrides()?;
    let oracle = GroqOracle::from_env(&config)?;
    let assistant = CorepAssistant::from_config(&config, oracle)?;

    let submission = assistant.submit(&scenario).await?;

    for skipped in &submission.skipped {
        eprintln!("skipped candidate #{}: {}", skipped.index, skipped.reason);
    }
    for finding in &submission.findings {
        eprintln!("{}", finding);
    }
    println!("{}", serde_json::to_string_pretty(&submission)?);
    Ok(())
}
