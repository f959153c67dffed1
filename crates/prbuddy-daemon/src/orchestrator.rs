//! LLM Orchestrator: the persistent (QuickAssist) and ephemeral (DCE)
//! request pipelines, plus the PR-draft helpers.

use std::sync::Arc;

use prbuddy_core::{Message, MessageRole};
use prbuddy_llm::LlmClient;
use prbuddy_vcs::{truncate_diff, DiffSource};

use crate::assembler::{DCE_PREAMBLE, QUICKASSIST_PREAMBLE};
use crate::context_log::ContextLog;
use crate::conversation::{mint_id, ConversationStore};
use crate::draft_store::DraftStore;
use crate::error::DaemonError;
use crate::registry::CompanionRegistry;

const PRE_DRAFT_DIFF_MAX_LINES: usize = 1000;

const PR_TEMPLATE: &str = "Draft a pull request description for the following change.\n\n\
Commit message:\n{commit_message}\n\n\
Diff:\n{diff}\n";

const WHAT_TEMPLATE: &str = "Summarize in a few sentences what the developer has been working \
on, based on the most recent commit and the diff below.\n\n\
Commit message:\n{commit_message}\n\n\
Diff:\n{diff}\n";

fn render_pr_template(commit_message: &str, diff: &str) -> String {
    PR_TEMPLATE
        .replace("{commit_message}", commit_message)
        .replace("{diff}", diff)
}

fn render_what_template(commit_message: &str, diff: &str) -> String {
    WHAT_TEMPLATE
        .replace("{commit_message}", commit_message)
        .replace("{diff}", diff)
}

pub struct Orchestrator {
    conversations: ConversationStore,
    companions: CompanionRegistry,
    diff_source: Arc<DiffSource>,
    llm: Arc<LlmClient>,
    draft_store: DraftStore,
    context_log: ContextLog,
}

impl Orchestrator {
    pub fn new(
        conversations: ConversationStore,
        companions: CompanionRegistry,
        diff_source: Arc<DiffSource>,
        llm: Arc<LlmClient>,
        draft_store: DraftStore,
        context_log: ContextLog,
    ) -> Self {
        Orchestrator {
            conversations,
            companions,
            diff_source,
            llm,
            draft_store,
            context_log,
        }
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn companions(&self) -> &CompanionRegistry {
        &self.companions
    }

    /// QuickAssist: a persistent, multi-turn conversation with no DCE
    /// augmentation.
    pub async fn handle_persistent(
        &self,
        conversation_id: Option<String>,
        input: &str,
    ) -> Result<(String, String), DaemonError> {
        if input.trim().is_empty() {
            return Err(DaemonError::input("input must not be empty"));
        }

        let conversation = match conversation_id {
            Some(id) => match self.conversations.get(&id).await {
                Some(existing) => existing,
                None => self.conversations.start(id, String::new(), false).await,
            },
            None => {
                self.conversations
                    .start(mint_id("persistent"), String::new(), false)
                    .await
            }
        };

        conversation.add_message(MessageRole::User, input).await;
        let context = conversation.build_context(QUICKASSIST_PREAMBLE).await;
        let reply = self.llm.chat(&context).await?;
        conversation.add_message(MessageRole::Assistant, &reply).await;

        Ok((conversation.id.clone(), reply))
    }

    /// DCE: the Companion is activated, folds diff events into its
    /// task list, and its filtered-data summary augments a throwaway
    /// context for this one turn.
    pub async fn handle_ephemeral_with_dce(
        &self,
        conversation_id: Option<String>,
        input: &str,
    ) -> Result<(String, String), DaemonError> {
        if input.trim().is_empty() {
            return Err(DaemonError::input("input must not be empty"));
        }

        let conversation = match conversation_id {
            Some(id) => match self.conversations.get(&id).await {
                Some(existing) => existing,
                None => self.conversations.start(id, String::new(), true).await,
            },
            None => {
                self.conversations
                    .start(mint_id("ephemeral"), String::new(), true)
                    .await
            }
        };

        conversation.add_message(MessageRole::User, input).await;

        let companion = self.companions.get_or_create(&conversation.id, Vec::new()).await;
        companion.start_monitoring().await;

        let task_builder = companion.add_from_input(input).await?;
        for line in &task_builder.log_lines {
            conversation.add_message(MessageRole::System, line).await;
        }

        let summary = companion.apply_filtered_data().await;

        let assembled = conversation
            .build_context_with_dce_summary(DCE_PREAMBLE, &summary)
            .await;
        conversation.set_messages(assembled.clone()).await;

        if let Err(err) = self.context_log.append(&conversation.id, &assembled) {
            tracing::warn!(conversation_id = %conversation.id, error = %err, "failed to persist assembled DCE context");
        }

        let reply = self.llm.chat(&assembled).await?;
        conversation.add_message(MessageRole::Assistant, &reply).await;

        Ok((conversation.id.clone(), reply))
    }

    /// Returns the latest commit message and a truncated diff since
    /// the last commit, for a draft-starting client to present.
    pub fn generate_pre_draft(&self) -> Result<(String, String), DaemonError> {
        let message = self.diff_source.last_commit_message()?;
        let diff = self.diff_source.diff_since_last_commit()?;
        Ok((message, truncate_diff(&diff, PRE_DRAFT_DIFF_MAX_LINES)))
    }

    /// A one-shot, stateless LLM call that turns a commit message and
    /// diff into a PR body. No conversation is created or retained.
    pub async fn generate_draft(&self, commit_message: &str, diff: &str) -> Result<String, DaemonError> {
        let messages = vec![
            Message::system(QUICKASSIST_PREAMBLE),
            Message::user(render_pr_template(commit_message, diff)),
        ];
        Ok(self.llm.chat(&messages).await?)
    }

    /// Creates a new persistent Conversation whose first user message
    /// is the PR template, so the caller can keep iterating on the
    /// draft across turns.
    pub async fn start_pr_conversation(
        &self,
        commit_message: &str,
        diff: &str,
    ) -> Result<(String, String), DaemonError> {
        let conversation = self
            .conversations
            .start(mint_id("persistent"), String::new(), false)
            .await;

        conversation
            .add_message(MessageRole::User, render_pr_template(commit_message, diff))
            .await;
        let context = conversation.build_context(QUICKASSIST_PREAMBLE).await;
        let reply = self.llm.chat(&context).await?;
        conversation.add_message(MessageRole::Assistant, &reply).await;

        Ok((conversation.id.clone(), reply))
    }

    /// Backs the `/what` endpoint: a one-shot summary of what the
    /// developer is currently working on, derived from the latest
    /// commit message and the diff since it. An empty repository
    /// (no commits) is an `InputError`, not a 500.
    pub async fn generate_what_summary(&self) -> Result<String, DaemonError> {
        // `rev-list --count HEAD` itself fails (no HEAD to resolve) on
        // a repository with zero commits, so a command error here is
        // treated the same as a zero count rather than surfaced as a
        // VCS failure.
        let commit_count = self.diff_source.commit_count().unwrap_or(0);
        if commit_count == 0 {
            return Err(DaemonError::input("repository has no commits yet"));
        }
        let (commit_message, diff) = self.generate_pre_draft()?;
        let messages = vec![
            Message::system(QUICKASSIST_PREAMBLE),
            Message::user(render_what_template(&commit_message, &diff)),
        ];
        Ok(self.llm.chat(&messages).await?)
    }

    pub fn draft_store(&self) -> &DraftStore {
        &self.draft_store
    }

    pub fn diff_source(&self) -> &Arc<DiffSource> {
        &self.diff_source
    }

    pub fn llm(&self) -> &Arc<LlmClient> {
        &self.llm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pr_template_interpolates_message_and_diff() {
        let rendered = render_pr_template("Add Foo()", "diff --git a/x b/x\n+func Foo() {\n");
        assert!(rendered.contains("Add Foo()"));
        assert!(rendered.contains("func Foo()"));
    }
}
