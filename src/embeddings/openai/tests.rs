use super::*;
use crate::http::HttpError;
use serial_test::serial;

const TEST_KEY_VAR: &str = "METADATA_RAG_TEST_EMBEDDING_KEY";

fn keyless_config() -> EmbeddingConfig {
    EmbeddingConfig {
        base_url: "http://test-host:1234/v1".to_string(),
        model: "test-model".to_string(),
        api_key_env: String::new(),
        batch_size: 8,
        dimension: 3,
        ..EmbeddingConfig::default()
    }
}

#[test]
fn client_configuration() {
    let client = EmbeddingClient::new(&keyless_config()).expect("Failed to create client");

    assert_eq!(client.model(), "test-model");
    assert_eq!(client.batch_size, 8);
    assert_eq!(client.dimension(), 3);
    assert_eq!(client.api_key, None);
    assert_eq!(
        client.endpoint.as_str(),
        "http://test-host:1234/v1/embeddings"
    );
}

#[test]
fn client_builder_methods() {
    let client = EmbeddingClient::new(&keyless_config())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5)
        .with_api_key(Some("sk-test".to_string()));

    assert_eq!(client.http.retry_attempts(), 5);
    assert_eq!(client.api_key.as_deref(), Some("sk-test"));
}

#[test]
#[serial]
fn api_key_read_from_environment() {
    let config = EmbeddingConfig {
        api_key_env: TEST_KEY_VAR.to_string(),
        ..keyless_config()
    };

    // SAFETY: tests touching this variable are serialized with #[serial]
    unsafe { env::remove_var(TEST_KEY_VAR) };
    match EmbeddingClient::new(&config) {
        Err(EmbeddingError::MissingApiKey(var)) => assert_eq!(var, TEST_KEY_VAR),
        other => panic!("expected missing api key, got {:?}", other.map(|_| ())),
    }

    // SAFETY: as above
    unsafe { env::set_var(TEST_KEY_VAR, "sk-from-env") };
    let client = EmbeddingClient::new(&config).expect("Failed to create client");
    assert_eq!(client.api_key.as_deref(), Some("sk-from-env"));

    // SAFETY: as above
    unsafe { env::remove_var(TEST_KEY_VAR) };
}

#[test]
fn invalid_base_url_is_rejected() {
    let config = EmbeddingConfig {
        base_url: "::not-a-url".to_string(),
        ..keyless_config()
    };
    assert!(matches!(
        EmbeddingClient::new(&config),
        Err(EmbeddingError::Request(HttpError::InvalidUrl(_)))
    ));
}

#[test]
fn empty_input_makes_no_request() {
    // Nothing listens on this port; an attempted request would fail.
    let config = EmbeddingConfig {
        base_url: "http://127.0.0.1:9/v1".to_string(),
        ..keyless_config()
    };
    let client = EmbeddingClient::new(&config)
        .expect("Failed to create client")
        .with_retry_attempts(1);

    let vectors = client.embed(&[]).expect("empty input should succeed");
    assert!(vectors.is_empty());
}
