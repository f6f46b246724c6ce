#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for prepcast-builtins.
//!
//! Runs the standard pipeline end to end against an in-memory question store,
//! a mock chat-completions server and a temporary output directory, in both
//! direct and adaptive mode.

use prepcast_builtins::*;
use prepcast_core::Context;
use prepcast_orchestrator::{Engine, ExecutionLogEntry, EXECUTION_LOG};
use prepcast_store::{sample_questions, InMemoryQuestionStore, QuestionStore};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn services(output: &Path, generator: Option<Arc<dyn TextGenerator>>) -> BuiltinServices {
    BuiltinServices {
        store: Arc::new(InMemoryQuestionStore::with_questions(sample_questions())),
        searcher: Arc::new(NoopSearcher),
        generator,
        renderer: Arc::new(StoryboardRenderer::new(output)),
    }
}

fn completion(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"role": "assistant", "content": text}}]
    }))
}

// ---------------------------------------------------------------------------
// 1. Registration
// ---------------------------------------------------------------------------

#[test]
fn register_builtins_registers_standard_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new();
    register_builtins(&engine, services(dir.path(), None));

    assert_eq!(engine.status().available_steps, STANDARD_PIPELINE.to_vec());
}

#[test]
fn invalid_strategy_config_is_a_creation_failure() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new();
    register_builtins(&engine, services(dir.path(), None));

    let mut config = prepcast_steps::StepConfig::new();
    config.insert("depth".into(), json!("bottomless"));
    assert!(engine
        .registry()
        .create(ReasoningExtractionStep::NAME, Some(config))
        .is_err());
}

// ---------------------------------------------------------------------------
// 2. Direct mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn standard_pipeline_offline_produces_storyboard() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new();
    register_builtins(&engine, services(dir.path(), None));

    let mut initial = Context::new();
    initial.insert("subject".into(), json!("Verbal"));
    let out = engine
        .run_pipeline(&STANDARD_PIPELINE, Some(initial), None, false)
        .await;

    assert!(out.is_success(), "pipeline failed: {:?}", out.error());
    assert_eq!(out.data()["question"]["subject"], "Verbal");
    assert_eq!(out.data()["reasoning_source"], "template");
    assert_eq!(out.data()["explanation_source"], "template");

    let video = out.data()["video_path"].as_str().unwrap();
    assert!(Path::new(video).starts_with(dir.path().join("videos")));
    let board = std::fs::read_to_string(video).unwrap();
    assert!(board.contains("Technology offers both benefits and challenges to education"));
}

#[tokio::test]
async fn empty_store_stops_at_selection() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new();
    let mut svc = services(dir.path(), None);
    svc.store = Arc::new(InMemoryQuestionStore::new());
    register_builtins(&engine, svc);

    let out = engine
        .run_pipeline(&STANDARD_PIPELINE, None, None, false)
        .await;
    assert!(!out.is_success());
    assert_eq!(
        out.error(),
        Some("Step question_selection failed: No questions found in database")
    );
    let log: Vec<ExecutionLogEntry> =
        serde_json::from_value(out.metadata()[EXECUTION_LOG].clone()).unwrap();
    assert_eq!(log.len(), 1);
    assert!(!dir.path().join("videos").exists());
}

#[tokio::test]
async fn llm_text_reaches_the_artifact() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion("## Step 1\nAdd both equations: 2 log x = 6."))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let generator: Arc<dyn TextGenerator> =
        Arc::new(OpenAiGenerator::new("sk-test").with_base_url(server.uri()));
    let engine = Engine::new();
    register_builtins(&engine, services(dir.path(), Some(generator)));

    let mut initial = Context::new();
    initial.insert("subject".into(), json!("Quant"));
    let out = engine
        .run_pipeline(&STANDARD_PIPELINE, Some(initial), None, false)
        .await;

    assert!(out.is_success());
    assert_eq!(out.data()["explanation_source"], "llm");
    let board = std::fs::read_to_string(out.data()["video_path"].as_str().unwrap()).unwrap();
    assert!(board.contains("2 log x = 6"));
}

#[tokio::test]
async fn anthropic_text_reaches_the_artifact() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "## Step 1\nEliminate the two wrong options."}],
            "stop_reason": "end_turn"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let generator: Arc<dyn TextGenerator> =
        Arc::new(AnthropicGenerator::new("sk-ant").with_base_url(server.uri()));
    let engine = Engine::new();
    register_builtins(&engine, services(dir.path(), Some(generator)));

    let mut initial = Context::new();
    initial.insert("subject".into(), json!("Verbal"));
    let out = engine
        .run_pipeline(&STANDARD_PIPELINE, Some(initial), None, false)
        .await;

    assert!(out.is_success());
    assert_eq!(out.data()["explanation_source"], "llm");
    let board = std::fs::read_to_string(out.data()["video_path"].as_str().unwrap()).unwrap();
    assert!(board.contains("Eliminate the two wrong options."));
}

// ---------------------------------------------------------------------------
// 3. Adaptive mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn adaptive_balanced_strategy_tunes_generation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"temperature": 0.5, "max_tokens": 750})))
        .respond_with(completion("Balanced explanation"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let generator: Arc<dyn TextGenerator> =
        Arc::new(OpenAiGenerator::new("sk-test").with_base_url(server.uri()));
    let engine = Engine::new();
    register_builtins(&engine, services(dir.path(), Some(generator)));

    // Quant subject alone scores 0.6
    let mut initial = Context::new();
    initial.insert("subject".into(), json!("Quant"));
    let out = engine
        .run_pipeline(&STANDARD_PIPELINE, Some(initial), None, true)
        .await;

    assert!(out.is_success(), "pipeline failed: {:?}", out.error());
    assert_eq!(out.metadata()["strategy_used"], "balanced");
    assert_eq!(out.data()["formatted_explanation"], "Balanced explanation");
    // configured instances are never cached
    assert_eq!(engine.registry().cached_count(), 2);
}

#[tokio::test]
async fn adaptive_performance_strategy_skips_search() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new();
    let svc = services(dir.path(), None);
    let store = svc.store.clone();
    register_builtins(&engine, svc);

    let out = engine
        .run_pipeline(&STANDARD_PIPELINE, None, None, true)
        .await;

    assert!(out.is_success());
    assert_eq!(out.metadata()["strategy_used"], "performance");
    assert_eq!(out.data()["reasoning_source"], "template");
    assert_eq!(store.count().await.unwrap(), 3);
}
