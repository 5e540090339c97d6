use corep_assistant::*;
use serde_json::json;
use std::io::Write;

const SCENARIO: &str = "We have issued 50m in ordinary shares directly to the market, fully paid up. \
                        We also have 20m in retained earnings from the previous year.";

fn rule(id: &str, title: &str, text: &str, keywords: &[&str]) -> RuleRecord {
    RuleRecord {
        id: id.to_string(),
        title: title.to_string(),
        text: text.to_string(),
        source: "Regulation (EU) No 575/2013".to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

fn oracle_reply(rows: serde_json::Value) -> StaticOracle {
    StaticOracle::new(json!({ "rows": rows }).to_string())
}

#[test]
fn test_retrieval_ranking_keyword_over_title() {
    let store = RuleStore::from_records(vec![
        rule("R2", "Treatment of shares", "", &[]),
        rule("R1", "Instruments", "", &["shares"]),
    ])
    .unwrap();
    let retriever = Retriever::new(store);

    let ids: Vec<String> = retriever
        .retrieve("shares issued", 3)
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["R1", "R2"]);
}

#[test]
fn test_retrieval_cap_with_many_matches() {
    let rules: Vec<RuleRecord> = (0..10)
        .map(|i| rule(&format!("R{:02}", i), "Capital", "", &[]))
        .collect();
    let retriever = Retriever::new(RuleStore::from_records(rules).unwrap());

    let hits = retriever.retrieve("capital", 3);
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].id, "R00");
}

#[test]
fn test_bundled_rulebook_answers_deduction_queries() {
    let retriever = Retriever::new(RuleStore::bundled().unwrap());
    let hits = retriever.retrieve("we must deduct goodwill and other intangible assets", 3);
    assert_eq!(hits[0].id, "CRR_ART_36");
}

#[test]
fn test_rule_store_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let records = json!([
        { "id": "CRR_ART_26", "title": "CET1 items", "text": "Ordinary shares.", "source": "CRR", "keywords": ["shares"] }
    ]);
    write!(file, "{}", records).unwrap();

    let store = RuleStore::load(file.path()).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("CRR_ART_26").unwrap().title, "CET1 items");
}

#[test]
fn test_rule_store_missing_keywords_is_malformed() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[{{ "id": "CRR_ART_26", "title": "CET1 items", "text": "t", "source": "CRR" }}]"#
    )
    .unwrap();

    assert!(matches!(
        RuleStore::load(file.path()),
        Err(CorepError::MalformedData { index: 0, .. })
    ));
}

#[tokio::test]
async fn test_detail_and_aggregate_rows_both_reported() {
    let assistant = CorepAssistant::new(RuleStore::bundled().unwrap(), StaticOracle::simulated());
    let submission = assistant.submit(SCENARIO).await.unwrap();

    let template = &submission.template;
    assert_eq!(template.template_id, TEMPLATE_ID);

    let ids: Vec<&str> = template.rows().iter().map(|r| r.row_id.as_str()).collect();
    assert_eq!(ids, vec!["020", "010"]);

    let cet1 = template.get_row(CET1_ROW).unwrap().amount_cell().unwrap();
    assert_eq!(cet1.value, 70_000_000.0);
    assert_eq!(cet1.audit_trail.len(), 2);
    assert!(cet1.audit_trail.iter().all(|a| a.rule_id == "CRR_ART_26"));

    // Rule text is attached when the cited rule was part of the context.
    let cited = submission.context_rule("CRR_ART_26").unwrap();
    assert!(cet1.audit_trail[0]
        .source_text
        .as_deref()
        .is_some_and(|text| cited.text.starts_with(text.trim_end_matches("..."))));
}

#[tokio::test]
async fn test_detail_row_alone_is_not_summed_into_aggregate() {
    let oracle = oracle_reply(json!([
        { "row_id": "020", "description": "Capital instruments eligible as CET1 Capital",
          "amount": 50_000_000, "rule_ref": "CRR_ART_28", "justification": "paid-up shares" }
    ]));
    let adapter = ExtractionAdapter::new(oracle);

    let template = adapter.process(SCENARIO, &[]).await.unwrap();
    assert!(template.get_row("010").is_none());
    assert_eq!(template.rows().len(), 1);
}

#[tokio::test]
async fn test_malformed_amount_returns_no_template() {
    let oracle = oracle_reply(json!([
        { "row_id": "020", "amount": 50_000_000, "rule_ref": "CRR_ART_28" },
        { "row_id": "010", "amount": "fifty million", "rule_ref": "CRR_ART_26" }
    ]));
    let assistant = CorepAssistant::new(RuleStore::bundled().unwrap(), oracle);

    match assistant.submit(SCENARIO).await {
        Err(CorepError::MalformedAmount { index, row_id, raw }) => {
            assert_eq!(index, 1);
            assert_eq!(row_id, "010");
            assert_eq!(raw, "fifty million");
        }
        other => panic!("expected MalformedAmount, got {:?}", other),
    }
}

#[tokio::test]
async fn test_uncited_and_negative_figures_are_flagged() {
    let oracle = oracle_reply(json!([
        { "row_id": "350", "description": "Total deductions from Common Equity Tier 1",
          "amount": -80_000_000, "rule_ref": "CRR_ART_36", "justification": "goodwill" },
        { "row_id": "010", "description": "Common Equity Tier 1 (CET1) capital",
          "amount": 20_000_000, "justification": "retained earnings" },
        { "row_id": "010", "amount": -80_000_000, "rule_ref": "CRR_ART_36", "justification": "goodwill deduction" },
        { "description": "no row", "amount": 1 }
    ]));
    let assistant = CorepAssistant::new(RuleStore::bundled().unwrap(), oracle);
    let submission = assistant.submit("goodwill of 80m, retained earnings 20m").await.unwrap();

    let findings = &submission.findings;
    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0].severity, Severity::Warning);
    assert_eq!(findings[0].row_id.as_deref(), Some("010"));
    assert_eq!(findings[1].severity, Severity::Error);
    assert!(has_errors(findings));

    assert_eq!(submission.template.get_row("010").unwrap().amount(), -60_000_000.0);
    assert_eq!(submission.skipped.len(), 1);
    assert_eq!(submission.skipped[0].index, 3);

    // Findings are a pure function of the template.
    assert_eq!(validate(&submission.template), submission.findings);
}

#[tokio::test]
async fn test_oracle_garbage_is_a_response_error() {
    let assistant = CorepAssistant::new(
        RuleStore::bundled().unwrap(),
        StaticOracle::new(r#"{"answer": "CET1 is 70m"}"#),
    );
    assert!(matches!(
        assistant.submit(SCENARIO).await,
        Err(CorepError::OracleResponse(_))
    ));
}

#[tokio::test]
async fn test_csv_export_of_submission() {
    let assistant = CorepAssistant::new(RuleStore::bundled().unwrap(), StaticOracle::simulated());
    let submission = assistant.submit(SCENARIO).await.unwrap();

    let csv = submission.template.to_csv();
    assert!(csv.contains("010,Common Equity Tier 1 (CET1) capital,70000000.00,CRR_ART_26; CRR_ART_26"));
}
