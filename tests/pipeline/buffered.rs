use crate::harness::{
    ACTIVITY_ID, ACTIVITY_TITLE, COHORT, STUDENT_ID, STUDENT_NAME, TestEnv, anthropic_message,
    openai_completion,
};
use tutor_gateway::error::PipelineError;
use tutor_gateway::pipeline::{ChatReply, ChatRequest};
use tutor_gateway::store::{ActivityKind, SettingsOverride};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn request(message: &str) -> ChatRequest {
    ChatRequest {
        message: message.into(),
        requester_id: STUDENT_ID.into(),
        activity_id: Some(ACTIVITY_ID.into()),
        use_retrieval: false,
        stream: false,
    }
}

#[tokio::test]
async fn buffered_openai_reply_is_returned_and_recorded() {
    let env = TestEnv::seeded().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test-openai"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(openai_completion("A counterargument is...", 42)),
        )
        .expect(1)
        .mount(&env.openai)
        .await;

    let pipeline = env.pipeline();
    let reply = pipeline
        .handle(&request("What is a counterargument?"))
        .await
        .unwrap();

    let ChatReply::Buffered(reply) = reply else {
        panic!("expected a buffered reply");
    };
    assert_eq!(reply.text, "A counterargument is...");
    assert_eq!(reply.tokens_consumed, 42);
    assert_eq!(reply.provider_model, "gpt-4o-mini");
    assert!(!reply.retrieval_used);

    let sent = env.openai.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&sent[0].body).unwrap();
    let system = body["messages"][0]["content"].as_str().unwrap();
    assert_eq!(body["messages"][0]["role"], "system");
    assert!(system.contains(STUDENT_NAME));
    assert!(system.contains(ACTIVITY_TITLE));
    assert_eq!(body["model"], "gpt-4o-mini");
    assert!(body.get("stream").is_none());

    let sql = "SELECT COUNT(*) FROM conversations WHERE student_id = 's1' AND activity_id = 'a1' \
               AND response = 'A counterargument is...' AND tokens_used = 42";
    assert_eq!(env.wait_for_count(sql, 1).await, 1);
    assert_eq!(
        env.wait_for_count(
            "SELECT COUNT(*) FROM question_frequency WHERE student_id = 's1' AND count = 1",
            1
        )
        .await,
        1
    );
    assert_eq!(
        env.wait_for_count("SELECT COUNT(*) FROM student_presence", 1).await,
        1
    );
}

#[tokio::test]
async fn unknown_requester_never_reaches_a_provider() {
    let env = TestEnv::seeded().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("x", 2)))
        .expect(0)
        .mount(&env.openai)
        .await;

    let mut req = request("hello");
    req.requester_id = "ghost".into();
    let err = env.pipeline().handle(&req).await.unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(ref id) if id == "ghost"));
}

#[tokio::test]
async fn cohort_settings_route_to_anthropic() {
    let env = TestEnv::seeded().await;
    env.store
        .insert_settings(
            Some(COHORT),
            Some(ActivityKind::Argumentation),
            &SettingsOverride {
                model: Some("claude-3-5-haiku-latest".into()),
                temperature: Some(0.2),
                max_tokens: Some(300),
                prompt_template: Some("Coach {student_name} on {activity_title}.".into()),
            },
        )
        .await
        .unwrap();
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(anthropic_message("Evidence first.", 30, 12)),
        )
        .expect(1)
        .mount(&env.anthropic)
        .await;

    let reply = env.pipeline().handle(&request("How do I start?")).await.unwrap();
    let ChatReply::Buffered(reply) = reply else {
        panic!("expected a buffered reply");
    };
    assert_eq!(reply.text, "Evidence first.");
    assert_eq!(reply.tokens_consumed, 42);
    assert_eq!(reply.provider_model, "claude-3-5-haiku-latest");

    let sent = env.anthropic.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&sent[0].body).unwrap();
    assert_eq!(body["system"], "Coach Ana on argumentation workshop.");
    assert_eq!(body["max_tokens"], 300);
    assert!(
        body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .all(|m| m["role"] != "system")
    );
}

#[tokio::test]
async fn provider_failure_surfaces_and_skips_conversation_row() {
    let env = TestEnv::seeded().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&env.openai)
        .await;

    let err = env.pipeline().handle(&request("hello")).await.unwrap_err();
    let PipelineError::Provider(provider) = &err else {
        panic!("expected a provider error, got {err:?}");
    };
    assert_eq!(provider.status(), Some(429));
    assert!(err.details().unwrap().contains("rate limited"));

    assert_eq!(
        env.wait_for_count("SELECT COUNT(*) FROM student_presence", 1).await,
        1
    );
    assert_eq!(env.count("SELECT COUNT(*) FROM conversations").await, 0);
}

#[tokio::test]
async fn unknown_activity_degrades_to_general_study() {
    let env = TestEnv::seeded().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("Sure.", 5)))
        .mount(&env.openai)
        .await;

    let mut req = request("Can you help?");
    req.activity_id = Some("missing".into());
    env.pipeline().handle(&req).await.unwrap();

    let sent = env.openai.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&sent[0].body).unwrap();
    assert!(
        body["messages"][0]["content"]
            .as_str()
            .unwrap()
            .contains("general study")
    );
}
