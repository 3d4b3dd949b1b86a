#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::oneshot;
use tutor_gateway::Config;
use tutor_gateway::gateway::{AppState, serve};
use tutor_gateway::pipeline::ChatPipeline;
use tutor_gateway::store::{ActivityKind, SqliteTutorStore};
use wiremock::MockServer;

pub const STUDENT_ID: &str = "s1";
pub const STUDENT_NAME: &str = "Ana";
pub const COHORT: &str = "7A";
pub const ACTIVITY_ID: &str = "a1";
pub const ACTIVITY_TITLE: &str = "argumentation workshop";

/// One isolated world: mock providers, an in-memory store, and a config
/// pointing at both.
pub struct TestEnv {
    pub openai: MockServer,
    pub anthropic: MockServer,
    pub store: Arc<SqliteTutorStore>,
    pub config: Config,
}

impl TestEnv {
    pub async fn new() -> Self {
        let openai = MockServer::start().await;
        let anthropic = MockServer::start().await;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool should open");
        let store = Arc::new(
            SqliteTutorStore::new(pool)
                .await
                .expect("schema should apply"),
        );

        let mut config = Config::default();
        config.providers.openai_api_key = Some("sk-test-openai".into());
        config.providers.anthropic_api_key = Some("sk-ant-test".into());
        config.providers.openai_base_url = openai.uri();
        config.providers.anthropic_base_url = anthropic.uri();
        config.providers.timeout_secs = 5;
        config.retrieval.embedding_base_url = openai.uri();

        Self {
            openai,
            anthropic,
            store,
            config,
        }
    }

    /// Student `s1` in cohort `7A` plus argumentation activity `a1`.
    pub async fn seeded() -> Self {
        let env = Self::new().await;
        env.store
            .insert_requester(STUDENT_ID, STUDENT_NAME, Some(COHORT))
            .await
            .expect("seed student");
        env.store
            .insert_activity(ACTIVITY_ID, ACTIVITY_TITLE, ActivityKind::Argumentation)
            .await
            .expect("seed activity");
        env
    }

    pub fn pipeline(&self) -> ChatPipeline {
        ChatPipeline::from_config(&self.config, self.store.clone())
    }

    pub async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(self.store.pool())
            .await
            .expect("count query")
    }

    /// Telemetry is fire-and-forget, so wait for rows to land.
    pub async fn wait_for_count(&self, sql: &str, expected: i64) -> i64 {
        let mut seen = 0;
        for _ in 0..100 {
            seen = self.count(sql).await;
            if seen >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        seen
    }
}

pub fn openai_completion(text: &str, total_tokens: u32) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "model": "gpt-4o-mini",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": text}}],
        "usage": {
            "prompt_tokens": 1,
            "completion_tokens": total_tokens - 1,
            "total_tokens": total_tokens
        }
    })
}

pub fn anthropic_message(text: &str, input_tokens: u32, output_tokens: u32) -> serde_json::Value {
    serde_json::json!({
        "type": "message",
        "content": [{"type": "text", "text": text}],
        "usage": {"input_tokens": input_tokens, "output_tokens": output_tokens}
    })
}

pub fn openai_sse(chunks: &[&str], total_tokens: u32) -> String {
    let mut body = String::new();
    for chunk in chunks {
        let frame = serde_json::json!({"choices": [{"index": 0, "delta": {"content": chunk}}]});
        body.push_str(&format!("data: {frame}\n\n"));
    }
    let usage = serde_json::json!({
        "choices": [],
        "usage": {
            "prompt_tokens": 1,
            "completion_tokens": total_tokens - 1,
            "total_tokens": total_tokens
        }
    });
    body.push_str(&format!("data: {usage}\n\ndata: [DONE]\n\n"));
    body
}

pub struct GatewayTestServer {
    port: u16,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl GatewayTestServer {
    pub async fn start(env: &TestEnv) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral gateway listener should bind");
        let port = listener
            .local_addr()
            .expect("ephemeral gateway listener should expose local address")
            .port();

        let state = AppState::new(Arc::new(env.pipeline()));
        let config = env.config.clone();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            serve(listener, state, &config, async move {
                let _ = rx.await;
            })
            .await
        });

        wait_until_gateway_ready(port).await;

        Self {
            port,
            shutdown: Some(tx),
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }

    pub async fn stop(mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        (&mut self.handle)
            .await
            .expect("gateway task should not panic")
    }
}

impl Drop for GatewayTestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn wait_until_gateway_ready(port: u16) {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .expect("reqwest client should be built");

    for _ in 0..80 {
        let health = client
            .get(format!("http://127.0.0.1:{port}/health"))
            .send()
            .await;
        if matches!(health, Ok(ref response) if response.status().is_success()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("gateway did not become ready on port {port}");
}
