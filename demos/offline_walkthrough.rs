use corep_assistant::*;

const SCENARIO: &str = "We have issued 50m in ordinary shares directly to the market, fully paid up. \
                        We also have 20m in retained earnings.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AssistantConfig::default().with_env_overrides()?;
    let assistant = CorepAssistant::from_config(&config, StaticOracle::simulated())?;

    println!("Scenario: {}\n", SCENARIO);
    let submission = assistant.submit(SCENARIO).await?;

    println!("Regulatory context retrieved:");
    for rule in &submission.context {
        println!("  - {}: {} ({})", rule.id, rule.title, rule.source);
    }

    println!(
        "\n{} {} extract:",
        submission.template.template_id, submission.template.template_name
    );
    for row in submission.template.rows() {
        println!("Row {}: {}", row.row_id, row.description);
        println!("  -> Value: {:.2}", row.amount());
        if let Some(cell) = row.amount_cell() {
            for audit in &cell.audit_trail {
                println!("  -> {}: {}", audit.rule_id, audit.justification);
            }
        }
    }

    println!();
    if submission.findings.is_empty() {
        println!("Basic validation checks passed.");
    }
    for finding in &submission.findings {
        println!("{}", finding);
    }

    println!("\n{}", submission.template.to_csv());
    Ok(())
}
