#![allow(clippy::unwrap_used, clippy::expect_used)]

use prepcast_core::*;
use serde_json::json;

// ---------------------------------------------------------------------------
// 1. Outcome carries a question through JSON untouched
// ---------------------------------------------------------------------------

#[test]
fn question_survives_outcome_data() {
    let question = Question {
        id: "cat_2023_logic_001".to_string(),
        subject: "Logic".to_string(),
        year: 2023,
        question_text: "What is the 8th number?".to_string(),
        options: vec!["21".into(), "34".into(), "55".into(), "89".into()],
        correct_answer: "A".to_string(),
        topic: Some("Sequences".to_string()),
        difficulty: Some("Medium".to_string()),
    };

    let outcome = Outcome::success(Context::new())
        .with_value("question", serde_json::to_value(&question).unwrap());

    let back: Question = serde_json::from_value(outcome.data()["question"].clone()).unwrap();
    assert_eq!(back, question);
}

// ---------------------------------------------------------------------------
// 2. Metadata is independent of data
// ---------------------------------------------------------------------------

#[test]
fn metadata_annotations_do_not_touch_data() {
    let mut outcome = Outcome::failure("Step render failed: missing formatted_explanation")
        .with_value("question", json!({"id": "q"}));
    outcome
        .metadata_mut()
        .insert("agentic_mode".to_string(), json!(true));

    assert_eq!(outcome.data().len(), 1);
    assert_eq!(outcome.metadata()["agentic_mode"], true);
    assert!(!outcome.is_success());

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(
        json["error"],
        "Step render failed: missing formatted_explanation"
    );
}

// ---------------------------------------------------------------------------
// 3. Error variants render their subsystem
// ---------------------------------------------------------------------------

#[test]
fn error_variants_render_subsystem_prefix() {
    let cases = [
        (PrepcastError::Step("x".into()), "Step error: x"),
        (PrepcastError::Pipeline("x".into()), "Pipeline error: x"),
        (PrepcastError::Coordination("x".into()), "Coordination error: x"),
        (PrepcastError::Store("x".into()), "Store error: x"),
        (PrepcastError::Http("x".into()), "HTTP error: x"),
        (PrepcastError::Config("x".into()), "Config error: x"),
    ];
    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}
