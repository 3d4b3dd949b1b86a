//! Context assembly: who is asking, about what, with which provider settings,
//! and what was said recently.

pub mod prompt;
pub mod settings;

pub use prompt::{append_reference_material, render_template};
pub use settings::{ProviderSettings, resolve_settings};

use crate::config::TutoringConfig;
use crate::error::PipelineError;
use crate::store::{ActivityDescriptor, ConversationTurn, RequesterProfile, TutorStore};
use std::sync::Arc;

/// Everything the dispatcher needs, independent of where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    pub system_prompt: String,
    /// Oldest first.
    pub history: Vec<ConversationTurn>,
    pub user_message: String,
}

#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub requester: RequesterProfile,
    pub activity: Option<ActivityDescriptor>,
    pub settings: ProviderSettings,
    pub prompt: PromptContext,
}

pub struct ContextAssembler {
    store: Arc<dyn TutorStore>,
    defaults: TutoringConfig,
}

impl ContextAssembler {
    pub fn new(store: Arc<dyn TutorStore>, defaults: TutoringConfig) -> Self {
        Self { store, defaults }
    }

    /// Fails only when the requester is unknown, the requester lookup itself
    /// fails, or the resolved model belongs to no known provider family.
    pub async fn assemble(
        &self,
        requester_id: &str,
        activity_id: Option<&str>,
        message: &str,
    ) -> Result<AssembledContext, PipelineError> {
        let requester = self
            .store
            .find_requester(requester_id)
            .await
            .map_err(|e| PipelineError::Store(format!("{e:#}")))?
            .ok_or_else(|| PipelineError::NotFound(requester_id.to_string()))?;

        let activity = match activity_id {
            Some(id) => self.load_activity(id).await,
            None => None,
        };

        let settings = resolve_settings(
            self.store.as_ref(),
            requester.cohort_name.as_deref(),
            activity.as_ref().map(|a| a.kind),
            &self.defaults,
        )
        .await?;

        let history = self
            .load_history(requester_id, activity.as_ref().map(|a| a.id.as_str()))
            .await;

        let system_prompt = render_template(
            &settings.prompt_template,
            &requester.display_name,
            activity.as_ref().map(|a| a.title.as_str()),
            message,
        );

        Ok(AssembledContext {
            requester,
            activity,
            settings,
            prompt: PromptContext {
                system_prompt,
                history,
                user_message: message.to_string(),
            },
        })
    }

    async fn load_activity(&self, id: &str) -> Option<ActivityDescriptor> {
        match self.store.find_activity(id).await {
            Ok(Some(activity)) => Some(activity),
            Ok(None) => {
                tracing::warn!(activity_id = id, "Activity not found; continuing as general chat");
                None
            }
            Err(error) => {
                tracing::warn!(
                    activity_id = id,
                    error = %format!("{error:#}"),
                    "Activity lookup failed; continuing as general chat"
                );
                None
            }
        }
    }

    async fn load_history(
        &self,
        requester_id: &str,
        activity_id: Option<&str>,
    ) -> Vec<ConversationTurn> {
        self.store
            .recent_turns(requester_id, activity_id, self.defaults.history_window)
            .await
            .unwrap_or_else(|error| {
                tracing::warn!(
                    requester_id,
                    error = %format!("{error:#}"),
                    "History lookup failed; continuing without history"
                );
                Vec::new()
            })
    }
}
