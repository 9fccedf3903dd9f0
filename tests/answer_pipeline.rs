//! Query pipeline against a mock Gemini endpoint.
//!
//! Documents are ingested with the offline hash embedder; generation goes
//! to a wiremock server standing in for `generateContent`.

use std::fs;

use docqa::answer::{answer_question, AnswerKind, NO_CONTEXT, STORE_UNAVAILABLE};
use docqa::config::{Config, LlmConfig};
use docqa::conversation::Conversation;
use docqa::ingest::ingest_directory;
use docqa::llm::GeminiClient;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

const BIOLOGY: &str = "Reproduction in Animals.\n\n\
Parthenogenesis is a form of asexual reproduction in which an embryo develops from an unfertilized egg. \
It is observed in some insects, fish, amphibians and reptiles.";

async fn ingested_workspace(tmp: &TempDir) -> Config {
    let mut config = Config::default();
    config.paths.data_dir = tmp.path().join("data");
    config.paths.store_dir = tmp.path().join("vector_store");
    config.embedding.provider = "hash".into();
    fs::create_dir_all(&config.paths.data_dir).unwrap();
    fs::write(config.paths.data_dir.join("biology.txt"), BIOLOGY).unwrap();
    let report = ingest_directory(&config, false).await.unwrap();
    assert_eq!(report.stored, 1);
    config
}

fn gemini(server: &MockServer) -> GeminiClient {
    let llm = LlmConfig {
        base_url: server.uri(),
        max_retries: 0,
        ..Default::default()
    };
    GeminiClient::new(&llm, Some("test-key".into())).unwrap()
}

fn reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{"content": {"parts": [{"text": text}]}}]
    }))
}

#[tokio::test]
async fn generated_answer_uses_retrieved_context() {
    let tmp = TempDir::new().unwrap();
    let config = ingested_workspace(&tmp).await;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(body_string_contains("Parthenogenesis is a form of asexual reproduction"))
        .and(body_string_contains("Answer ONLY using the context below."))
        .respond_with(reply("An unfertilized egg develops into an embryo."))
        .expect(1)
        .mount(&server)
        .await;

    let answer = answer_question(&config, &gemini(&server), "What is parthenogenesis?", None).await;
    assert_eq!(answer.kind, AnswerKind::Generated);
    assert_eq!(answer.text, "An unfertilized egg develops into an embryo.");
    assert_eq!(answer.sources, vec!["biology.txt".to_string()]);
}

#[tokio::test]
async fn quota_error_falls_back_to_extraction() {
    let tmp = TempDir::new().unwrap();
    let config = ingested_workspace(&tmp).await;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
        .mount(&server)
        .await;

    let answer = answer_question(&config, &gemini(&server), "What is parthenogenesis?", None).await;
    assert_eq!(answer.kind, AnswerKind::Fallback);
    assert!(answer.text.starts_with("[Fallback - Extracted from documents]\n\n"));
    assert!(answer.text.contains("asexual"));
}

#[tokio::test]
async fn unmatched_question_reports_failure_kind() {
    let tmp = TempDir::new().unwrap();
    let config = ingested_workspace(&tmp).await;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let mut conversation = Conversation::new();
    let answer = answer_question(
        &config,
        &gemini(&server),
        "quantum chromodynamics",
        Some(&mut conversation),
    )
    .await;
    assert_eq!(answer.kind, AnswerKind::ModelError);
    assert_eq!(
        answer.text,
        "[LLM Error - QuotaExceeded] Extracted content not available. Please check your API quota."
    );
    // model errors are still part of the conversation
    assert_eq!(conversation.len(), 1);
}

#[tokio::test]
async fn conversation_history_reaches_the_prompt() {
    let tmp = TempDir::new().unwrap();
    let config = ingested_workspace(&tmp).await;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("Previous conversation:"))
        .and(body_string_contains("User: What is parthenogenesis?"))
        .respond_with(reply("Insects and reptiles."))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(reply("Development from an unfertilized egg."))
        .expect(1)
        .mount(&server)
        .await;

    let client = gemini(&server);
    let mut conversation = Conversation::new();
    let first = answer_question(&config, &client, "What is parthenogenesis?", Some(&mut conversation)).await;
    assert_eq!(first.text, "Development from an unfertilized egg.");

    let second = answer_question(&config, &client, "Which animals show it?", Some(&mut conversation)).await;
    assert_eq!(second.text, "Insects and reptiles.");

    let history = conversation.exchanges();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].question, "What is parthenogenesis?");
    assert_eq!(history[1].answer, "Insects and reptiles.");
}

#[tokio::test]
async fn missing_and_empty_store() {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.paths.data_dir = tmp.path().join("data");
    config.paths.store_dir = tmp.path().join("vector_store");
    config.embedding.provider = "hash".into();

    let server = MockServer::start().await;
    let client = gemini(&server);

    let mut conversation = Conversation::new();
    let answer = answer_question(&config, &client, "anything", Some(&mut conversation)).await;
    assert_eq!(answer.kind, AnswerKind::StoreUnavailable);
    assert_eq!(answer.text, STORE_UNAVAILABLE);
    assert!(conversation.is_empty());

    // a store that exists but holds nothing yields no context
    docqa::store::VectorStore::open(&config.paths.store_dir)
        .await
        .unwrap()
        .close()
        .await;
    let answer = answer_question(&config, &client, "anything", None).await;
    assert_eq!(answer.kind, AnswerKind::NoContext);
    assert_eq!(answer.text, NO_CONTEXT);
}
