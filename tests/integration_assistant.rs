#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Build -> save -> load -> ask -> feedback with in-process providers

use metadata_rag::assistant::Assistant;
use metadata_rag::config::Config;
use metadata_rag::embeddings::{EmbeddingError, TextEmbedder};
use metadata_rag::indexer::{Indexer, load_records};
use metadata_rag::llm::{AnswerGenerator, LlmError, Prompt};
use metadata_rag::memory::{ConversationLog, Feedback};
use metadata_rag::retrieval::{DistanceMetric, SearchContext};
use std::fs;
use tempfile::TempDir;

/// Three-dimensional bag of keywords.
struct KeywordEmbedder;

impl TextEmbedder for KeywordEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| {
                let text = text.to_lowercase();
                vec![
                    f32::from(u8::from(text.contains("approval"))),
                    f32::from(u8::from(text.contains("customer"))),
                    f32::from(u8::from(text.contains("date"))),
                ]
            })
            .collect())
    }
}

/// Names the first context entry.
struct FirstSourceGenerator;

impl AnswerGenerator for FirstSourceGenerator {
    fn generate(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let question = prompt
            .messages()
            .last()
            .ok_or(LlmError::EmptyResponse)?;
        let source = question
            .content
            .lines()
            .find_map(|line| line.strip_prefix("- "))
            .and_then(|line| line.split(':').next())
            .ok_or(LlmError::EmptyResponse)?;
        Ok(format!("Look at {}.", source))
    }
}

const METADATA: &str = r#"[
    {"doc": "Approval outcome of the application", "TABLE_NAME": "fact_applications", "COLUMN_NAME": "outcome_id"},
    {"doc": "Customer surrogate key", "TABLE_NAME": "dim_customer", "COLUMN_NAME": "customer_id"},
    {"doc": "Date the decision was made", "TABLE_NAME": "fact_applications", "COLUMN_NAME": "decision_date"}
]"#;

#[test]
fn question_round_trip_with_feedback() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    let input = temp_dir.path().join("metadata.json");
    fs::write(&input, METADATA).expect("should write metadata");

    let records = load_records(&input).expect("should load records");
    Indexer::new(KeywordEmbedder, DistanceMetric::SquaredEuclidean, 2)
        .build_and_save(records, &config.bundle_path())
        .expect("should build and save");

    let context = SearchContext::load(&config.bundle_path()).expect("should load bundle");
    let memory = ConversationLog::open(config.memory_path());
    let assistant = Assistant::new(context, KeywordEmbedder, FirstSourceGenerator, memory)
        .with_top_k(config.retrieval.top_k)
        .with_context_turns(config.retrieval.context_turns);

    let turn = assistant
        .ask("Where do I find the customer?", Some(1))
        .expect("should answer");
    assert_eq!(turn.answer, "Look at dim_customer.customer_id.");
    assert_eq!(turn.matches.len(), 1);
    assert_eq!(turn.matches[0].column, "customer_id");

    let second = assistant
        .ask("Which approval column?", None)
        .expect("should answer");
    assert_eq!(second.answer, "Look at fact_applications.outcome_id.");
    assert_eq!(second.matches.len(), 3);

    let log = ConversationLog::open(config.memory_path());
    assert!(
        log.update_feedback(turn.id, Feedback::Like, None)
            .expect("should update")
    );
    assert!(
        log.update_feedback(second.id, Feedback::Dislike, Some("needs the date too".to_string()))
            .expect("should update")
    );

    let turns = log.load().expect("should load");
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].feedback_type, Some(Feedback::Like));
    assert_eq!(turns[1].feedback_type, Some(Feedback::Dislike));
    assert_eq!(turns[1].comment.as_deref(), Some("needs the date too"));

    let found = log
        .find_by_exchange("Which approval column?", &second.answer)
        .expect("should load")
        .expect("exchange exists");
    assert_eq!(found.id, second.id);
}

#[test]
fn rebuilt_bundle_is_picked_up_on_reload() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let bundle_path = temp_dir.path().join("vector_index.mdrb");
    let input = temp_dir.path().join("metadata.json");
    fs::write(&input, METADATA).expect("should write metadata");

    let indexer = Indexer::new(KeywordEmbedder, DistanceMetric::Cosine, 10);
    let records = load_records(&input).expect("should load records");
    let first = indexer
        .build_and_save(records[..1].to_vec(), &bundle_path)
        .expect("should build");

    let assistant = Assistant::new(
        first,
        KeywordEmbedder,
        FirstSourceGenerator,
        ConversationLog::open(temp_dir.path().join("chat_memory.json")),
    );
    assert_eq!(assistant.context().len(), 1);

    indexer
        .build_and_save(records, &bundle_path)
        .expect("should rebuild");
    assert_eq!(assistant.reload(&bundle_path).expect("should reload"), 3);

    let turn = assistant
        .ask("customer key please", Some(1))
        .expect("should answer");
    assert_eq!(turn.answer, "Look at dim_customer.customer_id.");
}
