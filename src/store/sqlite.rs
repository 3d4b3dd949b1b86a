use super::{
    ActivityDescriptor, ActivityKind, ConversationTurn, ExchangeRecord, PassageIndex,
    RequesterProfile, RetrievedPassage, SettingsOverride, TutorStore,
};
use crate::retrieval::vector::{bytes_to_vec, cosine_similarity, vec_to_bytes};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS students (
         id         TEXT PRIMARY KEY,
         name       TEXT NOT NULL,
         class_name TEXT
     )",
    "CREATE TABLE IF NOT EXISTS activities (
         id    TEXT PRIMARY KEY,
         title TEXT NOT NULL,
         kind  TEXT NOT NULL
     )",
    "CREATE TABLE IF NOT EXISTS ai_settings (
         id              INTEGER PRIMARY KEY AUTOINCREMENT,
         class_name      TEXT,
         activity_kind   TEXT,
         model           TEXT,
         temperature     REAL,
         max_tokens      INTEGER,
         prompt_template TEXT
     )",
    "CREATE TABLE IF NOT EXISTS conversations (
         id          INTEGER PRIMARY KEY AUTOINCREMENT,
         student_id  TEXT NOT NULL,
         activity_id TEXT,
         message     TEXT NOT NULL,
         response    TEXT NOT NULL,
         tokens_used INTEGER NOT NULL,
         model       TEXT NOT NULL,
         created_at  TEXT NOT NULL
     )",
    "CREATE INDEX IF NOT EXISTS idx_conversations_student
         ON conversations(student_id, activity_id, id)",
    "CREATE TABLE IF NOT EXISTS question_frequency (
         student_id    TEXT NOT NULL,
         question      TEXT NOT NULL,
         count         INTEGER NOT NULL DEFAULT 0,
         last_asked_at TEXT NOT NULL,
         PRIMARY KEY (student_id, question)
     )",
    "CREATE TABLE IF NOT EXISTS student_presence (
         student_id     TEXT PRIMARY KEY,
         last_active_at TEXT NOT NULL
     )",
    "CREATE TABLE IF NOT EXISTS passages (
         id        TEXT PRIMARY KEY,
         content   TEXT NOT NULL,
         embedding BLOB NOT NULL,
         source    TEXT
     )",
];

/// SQLite-backed tutoring data store using an sqlx async pool.
#[derive(Debug, Clone)]
pub struct SqliteTutorStore {
    pool: SqlitePool,
}

impl SqliteTutorStore {
    /// Create a store over an existing pool and ensure the schema exists.
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .context("create tutoring schema")?;
        }
        Ok(Self { pool })
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await
            .with_context(|| format!("connect to {database_url}"))?;
        Self::new(pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ── Seeding ──────────────────────────────────────────────

    pub async fn insert_requester(&self, id: &str, name: &str, cohort: Option<&str>) -> Result<()> {
        sqlx::query(
            "INSERT INTO students (id, name, class_name) VALUES ($1, $2, $3)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, class_name = excluded.class_name",
        )
        .bind(id)
        .bind(name)
        .bind(cohort)
        .execute(&self.pool)
        .await
        .context("insert student")?;
        Ok(())
    }

    pub async fn insert_activity(&self, id: &str, title: &str, kind: ActivityKind) -> Result<()> {
        let kind: &'static str = kind.into();
        sqlx::query(
            "INSERT INTO activities (id, title, kind) VALUES ($1, $2, $3)
             ON CONFLICT(id) DO UPDATE SET title = excluded.title, kind = excluded.kind",
        )
        .bind(id)
        .bind(title)
        .bind(kind)
        .execute(&self.pool)
        .await
        .context("insert activity")?;
        Ok(())
    }

    /// Replaces the row for exactly this `(cohort, kind)` pair.
    pub async fn insert_settings(
        &self,
        cohort: Option<&str>,
        kind: Option<ActivityKind>,
        settings: &SettingsOverride,
    ) -> Result<()> {
        let kind: Option<&'static str> = kind.map(Into::into);
        let mut tx = self.pool.begin().await.context("begin settings write")?;
        sqlx::query("DELETE FROM ai_settings WHERE class_name IS $1 AND activity_kind IS $2")
            .bind(cohort)
            .bind(kind)
            .execute(&mut *tx)
            .await
            .context("replace ai_settings row")?;
        sqlx::query(
            "INSERT INTO ai_settings
                 (class_name, activity_kind, model, temperature, max_tokens, prompt_template)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(cohort)
        .bind(kind)
        .bind(settings.model.as_deref())
        .bind(settings.temperature)
        .bind(settings.max_tokens.map(i64::from))
        .bind(settings.prompt_template.as_deref())
        .execute(&mut *tx)
        .await
        .context("insert ai_settings row")?;
        tx.commit().await.context("commit settings write")?;
        Ok(())
    }

    pub async fn insert_passage(
        &self,
        id: &str,
        content: &str,
        embedding: &[f32],
        source: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO passages (id, content, embedding, source) VALUES ($1, $2, $3, $4)
             ON CONFLICT(id) DO UPDATE SET
                 content = excluded.content,
                 embedding = excluded.embedding,
                 source = excluded.source",
        )
        .bind(id)
        .bind(content)
        .bind(vec_to_bytes(embedding))
        .bind(source)
        .execute(&self.pool)
        .await
        .context("insert passage")?;
        Ok(())
    }
}

fn map_activity_row(row: &SqliteRow) -> Result<ActivityDescriptor> {
    let kind_raw: String = row.try_get("kind")?;
    let kind = kind_raw
        .parse::<ActivityKind>()
        .with_context(|| format!("unknown activity kind: {kind_raw}"))?;
    Ok(ActivityDescriptor {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        kind,
    })
}

fn map_settings_row(row: &SqliteRow) -> Result<SettingsOverride> {
    let max_tokens: Option<i64> = row.try_get("max_tokens")?;
    Ok(SettingsOverride {
        model: row.try_get("model")?,
        temperature: row.try_get("temperature")?,
        max_tokens: max_tokens.and_then(|value| u32::try_from(value).ok()),
        prompt_template: row.try_get("prompt_template")?,
    })
}

#[async_trait]
impl TutorStore for SqliteTutorStore {
    async fn find_requester(&self, id: &str) -> Result<Option<RequesterProfile>> {
        let row = sqlx::query("SELECT id, name, class_name FROM students WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("load student")?;

        row.map(|row| -> Result<RequesterProfile> {
            Ok(RequesterProfile {
                id: row.try_get("id")?,
                display_name: row.try_get("name")?,
                cohort_name: row.try_get("class_name")?,
            })
        })
        .transpose()
    }

    async fn find_activity(&self, id: &str) -> Result<Option<ActivityDescriptor>> {
        let row = sqlx::query("SELECT id, title, kind FROM activities WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("load activity")?;
        row.as_ref().map(map_activity_row).transpose()
    }

    async fn find_settings(
        &self,
        cohort: Option<&str>,
        kind: Option<ActivityKind>,
    ) -> Result<Option<SettingsOverride>> {
        let kind: Option<&'static str> = kind.map(Into::into);
        let row = sqlx::query(
            "SELECT model, temperature, max_tokens, prompt_template
             FROM ai_settings
             WHERE class_name IS $1 AND activity_kind IS $2
             ORDER BY id DESC
             LIMIT 1",
        )
        .bind(cohort)
        .bind(kind)
        .fetch_optional(&self.pool)
        .await
        .context("load ai_settings")?;
        row.as_ref().map(map_settings_row).transpose()
    }

    async fn recent_turns(
        &self,
        requester_id: &str,
        activity_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = match activity_id {
            Some(activity_id) => {
                sqlx::query(
                    "SELECT message, response FROM conversations
                     WHERE student_id = $1 AND activity_id = $2
                     ORDER BY id DESC
                     LIMIT $3",
                )
                .bind(requester_id)
                .bind(activity_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT message, response FROM conversations
                     WHERE student_id = $1
                     ORDER BY id DESC
                     LIMIT $2",
                )
                .bind(requester_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .context("load conversation history")?;

        let mut turns = rows
            .iter()
            .map(|row| -> Result<ConversationTurn> {
                Ok(ConversationTurn {
                    user_text: row.try_get("message")?,
                    assistant_text: row.try_get("response")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        turns.reverse();
        Ok(turns)
    }

    async fn append_exchange(&self, record: &ExchangeRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO conversations
                 (student_id, activity_id, message, response, tokens_used, model, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&record.requester_id)
        .bind(record.activity_id.as_deref())
        .bind(&record.message)
        .bind(&record.response)
        .bind(i64::from(record.tokens_used))
        .bind(&record.model)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("append conversation")?;
        Ok(())
    }

    async fn increment_question_frequency(&self, requester_id: &str, question: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO question_frequency (student_id, question, count, last_asked_at)
             VALUES ($1, $2, 1, $3)
             ON CONFLICT(student_id, question) DO UPDATE SET
                 count = count + 1,
                 last_asked_at = excluded.last_asked_at",
        )
        .bind(requester_id)
        .bind(question)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("increment question frequency")?;
        Ok(())
    }

    async fn touch_liveness(&self, requester_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO student_presence (student_id, last_active_at) VALUES ($1, $2)
             ON CONFLICT(student_id) DO UPDATE SET last_active_at = excluded.last_active_at",
        )
        .bind(requester_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("upsert student presence")?;
        Ok(())
    }
}

#[async_trait]
impl PassageIndex for SqliteTutorStore {
    async fn similarity_search(
        &self,
        embedding: &[f32],
        threshold: f32,
        top_k: usize,
    ) -> Result<Vec<RetrievedPassage>> {
        if top_k == 0 || embedding.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query("SELECT content, embedding FROM passages")
            .fetch_all(&self.pool)
            .await
            .context("load passages")?;

        let mut scored = Vec::new();
        for row in &rows {
            let blob: Vec<u8> = row.try_get("embedding")?;
            let score = cosine_similarity(embedding, &bytes_to_vec(&blob));
            if score >= threshold {
                scored.push(RetrievedPassage {
                    text: row.try_get("content")?,
                    relevance_score: score,
                });
            }
        }

        scored.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        scored.truncate(top_k);
        Ok(scored)
    }
}
