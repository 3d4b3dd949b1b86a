use crate::harness::{COHORT, GatewayTestServer, TestEnv, anthropic_message, openai_sse};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tutor_gateway::store::SettingsOverride;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn openai_stream_passes_through_as_event_stream() {
    let env = TestEnv::seeded().await;
    let sse = openai_sse(&["Claims ", "need ", "support."], 12);
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse.clone()),
        )
        .expect(1)
        .mount(&env.openai)
        .await;
    let server = GatewayTestServer::start(&env).await;

    let response = reqwest::Client::new()
        .post(server.url("/chat"))
        .json(&json!({"message": "What is a claim?", "studentId": "s1", "stream": true}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    assert_eq!(response.headers()["cache-control"], "no-cache");
    assert_eq!(response.text().await.unwrap(), sse);

    let sql = "SELECT COUNT(*) FROM conversations WHERE response = 'Claims need support.'";
    assert_eq!(env.wait_for_count(sql, 1).await, 1);
}

#[tokio::test]
async fn stream_request_on_anthropic_returns_json() {
    let env = TestEnv::seeded().await;
    env.store
        .insert_settings(
            Some(COHORT),
            None,
            &SettingsOverride {
                model: Some("claude-3-5-sonnet-latest".into()),
                ..SettingsOverride::default()
            },
        )
        .await
        .unwrap();
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(anthropic_message("Buffered answer.", 8, 4)),
        )
        .expect(1)
        .mount(&env.anthropic)
        .await;
    let server = GatewayTestServer::start(&env).await;

    let response = reqwest::Client::new()
        .post(server.url("/chat"))
        .json(&json!({"message": "Stream please", "studentId": "s1", "stream": true}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["response"], "Buffered answer.");
    assert_eq!(body["tokensUsed"], 12);
    assert_eq!(body["model"], "claude-3-5-sonnet-latest");
}
