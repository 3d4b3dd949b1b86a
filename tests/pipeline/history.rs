use crate::harness::{ACTIVITY_ID, STUDENT_ID, TestEnv, openai_completion};
use tutor_gateway::pipeline::ChatRequest;
use tutor_gateway::store::{ExchangeRecord, TutorStore};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

async fn seed_turns(env: &TestEnv, activity: Option<&str>, count: usize) {
    for n in 0..count {
        env.store
            .append_exchange(&ExchangeRecord {
                requester_id: STUDENT_ID.into(),
                activity_id: activity.map(Into::into),
                message: format!("question {n}"),
                response: format!("answer {n}"),
                tokens_used: 10,
                model: "gpt-4o-mini".into(),
            })
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn long_history_is_capped_at_four_exchanges() {
    let env = TestEnv::seeded().await;
    seed_turns(&env, Some(ACTIVITY_ID), 10).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("ok", 3)))
        .expect(1)
        .mount(&env.openai)
        .await;

    env.pipeline()
        .handle(&ChatRequest {
            message: "next question".into(),
            requester_id: STUDENT_ID.into(),
            activity_id: Some(ACTIVITY_ID.into()),
            use_retrieval: false,
            stream: false,
        })
        .await
        .unwrap();

    let sent = env.openai.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&sent[0].body).unwrap();
    let messages = body["messages"].as_array().unwrap();

    // system + 8 history + current
    assert_eq!(messages.len(), 10);
    assert_eq!(messages[1]["content"], "question 6");
    assert_eq!(messages[8]["content"], "answer 9");
    assert_eq!(messages[9]["content"], "next question");
}

#[tokio::test]
async fn history_from_other_activities_is_not_sent() {
    let env = TestEnv::seeded().await;
    seed_turns(&env, Some("other-activity"), 3).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("ok", 3)))
        .mount(&env.openai)
        .await;

    env.pipeline()
        .handle(&ChatRequest {
            message: "fresh start".into(),
            requester_id: STUDENT_ID.into(),
            activity_id: Some(ACTIVITY_ID.into()),
            use_retrieval: false,
            stream: false,
        })
        .await
        .unwrap();

    let sent = env.openai.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&sent[0].body).unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);
}
