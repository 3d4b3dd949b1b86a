use crate::harness::{ACTIVITY_ID, STUDENT_ID, TestEnv, openai_completion};
use tutor_gateway::pipeline::{ChatReply, ChatRequest};
use wiremock::matchers::{method, path};
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

fn buffered(reply: ChatReply) -> tutor_gateway::pipeline::BufferedReply {
    match reply {
        ChatReply::Buffered(reply) => reply,
        ChatReply::Stream(_) => panic!("expected a buffered reply"),
    }
}

#[tokio::test]
async fn repeated_question_is_served_from_cache() {
    let env = TestEnv::seeded().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("Cached.", 9)))
        .expect(1)
        .mount(&env.openai)
        .await;

    let pipeline = env.pipeline();
    let first = buffered(pipeline.handle(&request("What is a thesis?")).await.unwrap());
    let second = buffered(pipeline.handle(&request("  what is a   THESIS? ")).await.unwrap());

    assert_eq!(first, second);
    assert_eq!(pipeline.cache().len(), 1);
    assert_eq!(
        env.wait_for_count("SELECT COUNT(*) FROM conversations", 2).await,
        2
    );
}

#[tokio::test]
async fn different_activity_misses_the_cache() {
    let env = TestEnv::seeded().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("Answer.", 4)))
        .expect(2)
        .mount(&env.openai)
        .await;

    let pipeline = env.pipeline();
    pipeline.handle(&request("Same text")).await.unwrap();
    let mut unscoped = request("Same text");
    unscoped.activity_id = None;
    pipeline.handle(&unscoped).await.unwrap();

    assert_eq!(pipeline.cache().len(), 2);
}

#[tokio::test]
async fn failed_calls_are_not_cached() {
    let env = TestEnv::seeded().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(2)
        .mount(&env.openai)
        .await;

    let pipeline = env.pipeline();
    assert!(pipeline.handle(&request("Why?")).await.is_err());
    assert!(pipeline.handle(&request("Why?")).await.is_err());
    assert!(pipeline.cache().is_empty());
}
