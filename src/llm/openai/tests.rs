use super::*;
use crate::http::HttpError;

fn keyless_config() -> LlmConfig {
    LlmConfig {
        base_url: "http://test-host:1234/v1/".to_string(),
        model: "test-chat".to_string(),
        api_key_env: String::new(),
        ..LlmConfig::default()
    }
}

#[test]
fn client_configuration() {
    let client = ChatClient::new(&keyless_config()).expect("Failed to create client");

    assert_eq!(client.model(), "test-chat");
    assert_eq!(client.api_key, None);
    assert!((client.temperature - 0.2).abs() < f32::EPSILON);
    assert_eq!(
        client.endpoint.as_str(),
        "http://test-host:1234/v1/chat/completions"
    );
}

#[test]
fn invalid_base_url_is_rejected() {
    let config = LlmConfig {
        base_url: "::not-a-url".to_string(),
        ..keyless_config()
    };
    assert!(matches!(
        ChatClient::new(&config),
        Err(LlmError::Request(HttpError::InvalidUrl(_)))
    ));
}

#[test]
fn request_body_shape() {
    let prompt = Prompt::assemble("q", &[], &[]);
    let request = ChatRequest {
        model: "m",
        messages: prompt.messages(),
        temperature: 0.5,
    };
    let value = serde_json::to_value(&request).expect("should serialize");

    assert_eq!(value["model"], "m");
    assert_eq!(value["messages"][0]["role"], "system");
    assert_eq!(value["messages"][1]["role"], "user");
    assert_eq!(value["temperature"], 0.5);
}

#[test]
fn response_without_content_is_empty() {
    let response: ChatResponse =
        serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant"}}]}"#)
            .expect("should parse");
    assert!(response.choices[0].message.content.is_none());
}
