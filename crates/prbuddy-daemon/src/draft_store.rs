//! Draft context on-disk layout: a persisted (branch, commit) ->
//! ordered Messages snapshot, used to resume a PR-drafting session.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use prbuddy_core::Message;
use serde::{Deserialize, Serialize};

use crate::error::DaemonError;

/// The write-time sanitization rule: `/` becomes `-`, giving a single
/// clean directory segment. `load` also accepts the legacy `_` form
/// (see `sanitize_branch_name_legacy`) so drafts saved under that
/// convention are not orphaned.
pub fn sanitize_branch_name(branch: &str) -> String {
    branch.replace('/', "-")
}

fn sanitize_branch_name_legacy(branch: &str) -> String {
    branch.replace('/', "_").replace(' ', "-")
}

fn commit_prefix(commit: &str) -> &str {
    &commit[..commit.len().min(7)]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConversationLogEntry {
    from: String,
    content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConversationLog {
    branch: String,
    commit: String,
    messages: Vec<ConversationLogEntry>,
}

/// Persists and reloads draft context snapshots under a repository's
/// VCS metadata directory.
#[derive(Debug, Clone)]
pub struct DraftStore {
    base_dir: PathBuf,
}

impl DraftStore {
    pub fn new(vcs_metadata_dir: impl Into<PathBuf>) -> Self {
        DraftStore {
            base_dir: vcs_metadata_dir.into().join("pr_buddy_db"),
        }
    }

    fn dir_for(&self, branch: &str, commit: &str, sanitize: impl Fn(&str) -> String) -> PathBuf {
        self.base_dir
            .join(format!("{}-{}", sanitize(branch), commit_prefix(commit)))
    }

    pub fn save(&self, branch: &str, commit: &str, messages: &[Message]) -> Result<(), DaemonError> {
        let dir = self.dir_for(branch, commit, sanitize_branch_name);
        fs::create_dir_all(&dir)?;

        write_atomic(&dir.join("draft_context.json"), &serde_json::to_vec_pretty(messages)?)?;

        let log = ConversationLog {
            branch: branch.to_string(),
            commit: commit.to_string(),
            messages: messages
                .iter()
                .map(|m| ConversationLogEntry {
                    from: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
        };
        write_atomic(&dir.join("conversation.json"), &serde_json::to_vec_pretty(&log)?)?;

        Ok(())
    }

    pub fn load(&self, branch: &str, commit: &str) -> Result<Vec<Message>, DaemonError> {
        let primary = self.dir_for(branch, commit, sanitize_branch_name);
        let legacy = self.dir_for(branch, commit, sanitize_branch_name_legacy);

        let dir = if primary.join("draft_context.json").exists() {
            primary
        } else if legacy.join("draft_context.json").exists() {
            legacy
        } else {
            return Err(DaemonError::not_found("draft context"));
        };

        read_locked(&dir.join("draft_context.json"))
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DaemonError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp_path = dir.join(format!(
        ".{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("draft")
    ));

    let mut tmp_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp_path)?;
    tmp_file.lock_exclusive()?;
    tmp_file.write_all(bytes)?;
    tmp_file.sync_all()?;
    FileExt::unlock(&tmp_file)?;
    drop(tmp_file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn read_locked(path: &Path) -> Result<Vec<Message>, DaemonError> {
    let file = File::open(path)?;
    file.lock_shared()?;
    let bytes = fs::read(path)?;
    FileExt::unlock(&file)?;
    let messages: Vec<Message> = serde_json::from_slice(&bytes)?;
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prbuddy_core::MessageRole;

    #[test]
    fn sanitize_branch_name_replaces_slash_with_dash() {
        assert_eq!(sanitize_branch_name("feat/x"), "feat-x");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let once = sanitize_branch_name("feat/x");
        assert_eq!(sanitize_branch_name(&once), once);
    }

    #[test]
    fn save_then_load_round_trips_messages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DraftStore::new(dir.path());
        let messages = vec![Message::new(MessageRole::User, "hi")];

        store.save("feat/x", "abcdef1234567", &messages).expect("save");
        let loaded = store.load("feat/x", "abcdef1234567").expect("load");

        assert_eq!(loaded, messages);
    }

    #[test]
    fn save_path_contains_sanitized_branch_and_commit_prefix() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DraftStore::new(dir.path());
        store.save("feat/x", "abcdef1234567", &[]).expect("save");

        let expected = dir.path().join("pr_buddy_db").join("feat-x-abcdef1");
        assert!(expected.join("draft_context.json").exists());
        assert!(expected.join("conversation.json").exists());
    }

    #[test]
    fn load_missing_draft_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DraftStore::new(dir.path());
        let err = store.load("feat/x", "abcdef1234567").unwrap_err();
        assert!(matches!(err, DaemonError::NotFound { .. }));
    }
}
