use super::*;
use tempfile::TempDir;

fn log_in(temp_dir: &TempDir) -> ConversationLog {
    ConversationLog::open(temp_dir.path().join("chat_memory.json"))
}

fn sample_match() -> SearchResult {
    SearchResult {
        distance: 0.25,
        doc: "Application outcome code".to_string(),
        table: "fact_applications".to_string(),
        column: "outcome_id".to_string(),
    }
}

#[test]
fn missing_file_is_empty() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let log = log_in(&temp_dir);

    assert!(log.load().expect("should load").is_empty());
    assert!(log.recent(5).expect("should load").is_empty());
}

#[test]
fn append_persists_turns() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let log = log_in(&temp_dir).with_user_id("843920");

    let first = log
        .append("Where are approvals?", "Use fact_applications.outcome_id", vec![sample_match()])
        .expect("should append");
    log.append("And rejections?", "Same column, value D", Vec::new())
        .expect("should append");

    let turns = log_in(&temp_dir).load().expect("should load");
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0], first);
    assert_eq!(turns[0].user_id, "843920");
    assert_eq!(turns[0].matches, vec![sample_match()]);
    assert_eq!(turns[0].feedback_type, None);
    assert_eq!(turns[1].query, "And rejections?");
}

#[test]
fn recent_returns_last_n_oldest_first() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let log = log_in(&temp_dir);
    for i in 0..5 {
        log.append(&format!("q{}", i), &format!("a{}", i), Vec::new())
            .expect("should append");
    }

    let recent = log.recent(2).expect("should load");
    let queries: Vec<&str> = recent.iter().map(|t| t.query.as_str()).collect();
    assert_eq!(queries, vec!["q3", "q4"]);

    assert_eq!(log.recent(10).expect("should load").len(), 5);
    assert!(log.recent(0).expect("should load").is_empty());
}

#[test]
fn clear_empties_log() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let log = log_in(&temp_dir);
    log.append("q", "a", Vec::new()).expect("should append");

    log.clear().expect("should clear");
    assert!(log.load().expect("should load").is_empty());
    assert!(log.path().exists());
}

#[test]
fn feedback_updates_matching_turn() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let log = log_in(&temp_dir);
    let turn = log.append("q", "a", Vec::new()).expect("should append");
    let other = log.append("q2", "a2", Vec::new()).expect("should append");

    let updated = log
        .update_feedback(turn.id, Feedback::Dislike, Some("too vague".to_string()))
        .expect("should update");
    assert!(updated);

    let turns = log.load().expect("should load");
    assert_eq!(turns[0].feedback_type, Some(Feedback::Dislike));
    assert_eq!(turns[0].comment.as_deref(), Some("too vague"));
    assert_eq!(turns[1].id, other.id);
    assert_eq!(turns[1].feedback_type, None);
}

#[test]
fn feedback_for_unknown_id_is_false() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let log = log_in(&temp_dir);
    log.append("q", "a", Vec::new()).expect("should append");

    let updated = log
        .update_feedback(Uuid::new_v4(), Feedback::Like, None)
        .expect("should not fail");
    assert!(!updated);
}

#[test]
fn find_by_exchange_matches_query_and_answer() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let log = log_in(&temp_dir);
    let turn = log.append("q", "a", Vec::new()).expect("should append");

    let found = log.find_by_exchange("q", "a").expect("should load");
    assert_eq!(found.map(|t| t.id), Some(turn.id));
    assert!(
        log.find_by_exchange("q", "different")
            .expect("should load")
            .is_none()
    );
}

#[test]
fn corrupt_file_is_reported_and_kept() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let log = log_in(&temp_dir);
    fs::write(log.path(), "[{ not json").expect("should write");

    assert!(matches!(log.load(), Err(MemoryError::Corrupt { .. })));
    assert!(matches!(
        log.append("q", "a", Vec::new()),
        Err(MemoryError::Corrupt { .. })
    ));
    assert_eq!(
        fs::read_to_string(log.path()).expect("should read"),
        "[{ not json"
    );
}

#[test]
fn feedback_parses_from_text() {
    assert_eq!("like".parse::<Feedback>(), Ok(Feedback::Like));
    assert_eq!("DISLIKE".parse::<Feedback>(), Ok(Feedback::Dislike));
    assert!("meh".parse::<Feedback>().is_err());
    assert_eq!(Feedback::Dislike.to_string(), "dislike");
}

#[test]
fn log_is_pretty_json_array() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let log = log_in(&temp_dir);
    log.append("q", "a", Vec::new()).expect("should append");

    let raw = fs::read_to_string(log.path()).expect("should read");
    assert!(raw.starts_with("[\n"));
    let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(value[0]["feedback_type"], serde_json::Value::Null);
    assert!(value[0]["timestamp"].as_str().is_some());
}
