use crate::harness::{ACTIVITY_ID, STUDENT_ID, TestEnv, openai_completion};
use tutor_gateway::pipeline::{ChatReply, ChatRequest};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn request(use_retrieval: bool) -> ChatRequest {
    ChatRequest {
        message: "What makes evidence credible?".into(),
        requester_id: STUDENT_ID.into(),
        activity_id: Some(ACTIVITY_ID.into()),
        use_retrieval,
        stream: false,
    }
}

async fn mount_completion(env: &TestEnv) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("Sources.", 7)))
        .mount(&env.openai)
        .await;
}

async fn system_prompt_sent(env: &TestEnv) -> String {
    let sent = env.openai.received_requests().await.unwrap();
    let chat = sent
        .iter()
        .find(|r| r.url.path() == "/v1/chat/completions")
        .expect("chat request should be sent");
    let body: serde_json::Value = serde_json::from_slice(&chat.body).unwrap();
    body["messages"][0]["content"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn relevant_passages_are_injected() {
    let env = TestEnv::seeded().await;
    env.store
        .insert_passage("p1", "Credible evidence cites its sources.", &[1.0, 0.0, 0.0], None)
        .await
        .unwrap();
    env.store
        .insert_passage("p2", "Volcanoes erupt.", &[0.0, 1.0, 0.0], None)
        .await
        .unwrap();
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"index": 0, "embedding": [1.0, 0.0, 0.0]}]
        })))
        .expect(1)
        .mount(&env.openai)
        .await;
    mount_completion(&env).await;

    let reply = env.pipeline().handle(&request(true)).await.unwrap();
    let ChatReply::Buffered(reply) = reply else {
        panic!("expected a buffered reply");
    };
    assert!(reply.retrieval_used);

    let system = system_prompt_sent(&env).await;
    assert!(system.contains("--- REFERENCE MATERIAL ---"));
    assert!(system.contains("Credible evidence cites its sources."));
    assert!(!system.contains("Volcanoes"));
}

#[tokio::test]
async fn embedding_failure_falls_back_to_plain_prompt() {
    let env = TestEnv::seeded().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&env.openai)
        .await;
    mount_completion(&env).await;

    let reply = env.pipeline().handle(&request(true)).await.unwrap();
    let ChatReply::Buffered(reply) = reply else {
        panic!("expected a buffered reply");
    };
    assert!(!reply.retrieval_used);
    assert_eq!(reply.text, "Sources.");
    assert!(!system_prompt_sent(&env).await.contains("REFERENCE MATERIAL"));
}

#[tokio::test]
async fn retrieval_off_never_calls_embeddings() {
    let env = TestEnv::seeded().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&env.openai)
        .await;
    mount_completion(&env).await;

    env.pipeline().handle(&request(false)).await.unwrap();
}

#[tokio::test]
async fn no_passage_above_threshold_reports_unused() {
    let env = TestEnv::seeded().await;
    env.store
        .insert_passage("p1", "Unrelated.", &[0.0, 1.0, 0.0], None)
        .await
        .unwrap();
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"index": 0, "embedding": [1.0, 0.0, 0.0]}]
        })))
        .mount(&env.openai)
        .await;
    mount_completion(&env).await;

    let ChatReply::Buffered(reply) = env.pipeline().handle(&request(true)).await.unwrap() else {
        panic!("expected a buffered reply");
    };
    assert!(!reply.retrieval_used);
}
