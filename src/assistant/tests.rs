use super::*;
use crate::RagError;
use crate::embeddings::EmbeddingError;
use crate::llm::{LlmError, Role};
use crate::retrieval::{IndexBuilder, MetadataRecord, MetadataTable};
use std::sync::Mutex;
use tempfile::TempDir;

/// Maps a question to a point by keyword.
struct KeywordEmbedder;

impl TextEmbedder for KeywordEmbedder {
    fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|t| {
                if t.contains("customer") {
                    vec![0.0, 5.0]
                } else {
                    vec![0.0, 0.0]
                }
            })
            .collect())
    }
}

/// Answers with the first context line and keeps every prompt it sees.
#[derive(Default)]
struct EchoGenerator {
    prompts: Mutex<Vec<Prompt>>,
}

impl AnswerGenerator for EchoGenerator {
    fn generate(&self, prompt: &Prompt) -> std::result::Result<String, LlmError> {
        self.prompts
            .lock()
            .expect("lock poisoned")
            .push(prompt.clone());
        let last = prompt.messages().last().map(|m| m.content.clone());
        let line = last
            .as_deref()
            .and_then(|c| c.lines().find(|l| l.starts_with("- ")))
            .unwrap_or("nothing")
            .to_string();
        Ok(format!("See {}", line))
    }
}

struct FailingGenerator;

impl AnswerGenerator for FailingGenerator {
    fn generate(&self, _prompt: &Prompt) -> std::result::Result<String, LlmError> {
        Err(LlmError::EmptyResponse)
    }
}

fn context() -> SearchContext {
    let index = IndexBuilder::default()
        .build(&[vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 5.0]])
        .expect("should build index");
    let metadata = MetadataTable::new(vec![
        MetadataRecord::new("Application outcome", "fact_applications", "outcome_id"),
        MetadataRecord::new("Decision date", "fact_applications", "decided_at"),
        MetadataRecord::new("Customer key", "dim_customer", "customer_id"),
    ]);
    SearchContext::new(index, metadata).expect("aligned context")
}

#[test]
fn ask_records_turn_with_matches() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let memory = ConversationLog::open(temp_dir.path().join("chat_memory.json"));
    let assistant =
        Assistant::new(context(), KeywordEmbedder, EchoGenerator::default(), memory).with_top_k(2);

    let turn = assistant
        .ask("Where are approvals?", None)
        .expect("should answer");

    assert_eq!(
        turn.answer,
        "See - fact_applications.outcome_id: Application outcome"
    );
    assert_eq!(turn.matches.len(), 2);
    assert_eq!(turn.matches[0].column, "outcome_id");

    let stored = assistant.memory().load().expect("should load");
    assert_eq!(stored, vec![turn]);
}

#[test]
fn prior_turns_are_replayed() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let memory = ConversationLog::open(temp_dir.path().join("chat_memory.json"));
    let generator = EchoGenerator::default();
    let assistant = Assistant::new(context(), KeywordEmbedder, &generator, memory)
        .with_context_turns(1);

    assistant.ask("first", Some(1)).expect("should answer");
    assistant.ask("second", Some(1)).expect("should answer");
    assistant
        .ask("which customer column?", Some(1))
        .expect("should answer");

    let prompts = generator.prompts.lock().expect("lock poisoned");
    let last = prompts.last().expect("three prompts");
    let roles: Vec<Role> = last.messages().iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::User]
    );
    assert_eq!(last.messages()[1].content, "second");
    assert!(
        last.messages()[3]
            .content
            .contains("dim_customer.customer_id")
    );
}

#[test]
fn generator_failure_leaves_memory_untouched() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let memory = ConversationLog::open(temp_dir.path().join("chat_memory.json"));
    let assistant = Assistant::new(context(), KeywordEmbedder, FailingGenerator, memory);

    let err = assistant
        .ask("anything", None)
        .expect_err("generation should fail");
    assert!(matches!(err, RagError::Llm(LlmError::EmptyResponse)));
    assert!(assistant.memory().load().expect("should load").is_empty());
}

#[test]
fn zero_k_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let memory = ConversationLog::open(temp_dir.path().join("chat_memory.json"));
    let assistant = Assistant::new(context(), KeywordEmbedder, EchoGenerator::default(), memory);

    assert!(matches!(
        assistant.ask("anything", Some(0)),
        Err(RagError::Retrieval(crate::retrieval::RetrievalError::InvalidK))
    ));
}

#[test]
fn reload_swaps_context() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let memory = ConversationLog::open(temp_dir.path().join("chat_memory.json"));
    let assistant = Assistant::new(context(), KeywordEmbedder, EchoGenerator::default(), memory);
    let before = assistant.context();

    let index = IndexBuilder::default()
        .build(&[vec![0.0, 0.0]])
        .expect("should build index");
    let replacement = SearchContext::new(
        index,
        MetadataTable::new(vec![MetadataRecord::new("Only row", "t", "c")]),
    )
    .expect("aligned context");
    let path = temp_dir.path().join("vector_index.mdrb");
    replacement.save(&path).expect("should save");

    assert_eq!(assistant.reload(&path).expect("should reload"), 1);
    assert_eq!(before.len(), 3);
    assert_eq!(assistant.context().len(), 1);

    let turn = assistant.ask("anything", None).expect("should answer");
    assert_eq!(turn.matches.len(), 1);
}
