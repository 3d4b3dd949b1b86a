//! Data-access contract consumed by the chat pipeline.
//!
//! The pipeline only depends on [`TutorStore`] and [`PassageIndex`];
//! [`SqliteTutorStore`] is the bundled implementation.

mod sqlite;

pub use sqlite::SqliteTutorStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequesterProfile {
    pub id: String,
    pub display_name: String,
    /// Class or cohort the requester currently belongs to, if any.
    pub cohort_name: Option<String>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActivityKind {
    Argumentation,
    Discussion,
    Experiment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityDescriptor {
    pub id: String,
    pub title: String,
    pub kind: ActivityKind,
}

/// One `ai_settings` row. `None` fields defer to a less specific row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsOverride {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub prompt_template: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub user_text: String,
    pub assistant_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRecord {
    pub requester_id: String,
    pub activity_id: Option<String>,
    pub message: String,
    pub response: String,
    pub tokens_used: u32,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedPassage {
    pub text: String,
    pub relevance_score: f32,
}

#[async_trait]
pub trait TutorStore: Send + Sync {
    async fn find_requester(&self, id: &str) -> anyhow::Result<Option<RequesterProfile>>;

    async fn find_activity(&self, id: &str) -> anyhow::Result<Option<ActivityDescriptor>>;

    /// Exact lookup; `None` arguments match wildcard rows only.
    async fn find_settings(
        &self,
        cohort: Option<&str>,
        kind: Option<ActivityKind>,
    ) -> anyhow::Result<Option<SettingsOverride>>;

    /// The most recent `limit` exchanges, oldest first.
    async fn recent_turns(
        &self,
        requester_id: &str,
        activity_id: Option<&str>,
        limit: usize,
    ) -> anyhow::Result<Vec<ConversationTurn>>;

    async fn append_exchange(&self, record: &ExchangeRecord) -> anyhow::Result<()>;

    async fn increment_question_frequency(
        &self,
        requester_id: &str,
        question: &str,
    ) -> anyhow::Result<()>;

    async fn touch_liveness(&self, requester_id: &str) -> anyhow::Result<()>;
}

#[async_trait]
pub trait PassageIndex: Send + Sync {
    /// Passages scoring at least `threshold`, best first, at most `top_k`.
    async fn similarity_search(
        &self,
        embedding: &[f32],
        threshold: f32,
        top_k: usize,
    ) -> anyhow::Result<Vec<RetrievedPassage>>;
}
