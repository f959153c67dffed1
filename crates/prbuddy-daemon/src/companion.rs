//! Companion: the per-conversation DCE task tracker. Owns a mutable
//! task list, folds diff events into tasks over time, and runs a
//! background poller.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use prbuddy_core::{Message, Task};
use prbuddy_vcs::{parse_function_names, parse_structural_events, DiffAction, DiffSource, StructuralEvent};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::error::DaemonError;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

struct CompanionInner {
    active: Vec<Task>,
    completed: Vec<Task>,
    snapshots: HashMap<String, String>,
    poll_interval: Duration,
    monitor_started: bool,
    dce_enabled: bool,
}

/// Result of the Task Builder (`§4.4.1`): the tasks it produced, plus
/// free-form log lines the Orchestrator may inject as system messages.
pub struct TaskBuilderResult {
    pub tasks: Vec<Task>,
    pub log_lines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    fn note(self) -> &'static str {
        match self {
            TaskPriority::Low => "Priority: low",
            TaskPriority::Medium => "Priority: medium",
            TaskPriority::High => "Priority: high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Some(TaskPriority::Low),
            "medium" => Some(TaskPriority::Medium),
            "high" => Some(TaskPriority::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    Active,
    Inactive,
}

pub struct MonitorReport {
    pub status: MonitorStatus,
    pub active_task_count: usize,
    pub poll_interval: Duration,
}

/// A handle to one conversation's Companion state. Cloning shares the
/// same underlying lock, matching the Conversation Store's handle
/// pattern — only the `CompanionRegistry` constructs one per id.
#[derive(Clone)]
pub struct Companion {
    conversation_id: String,
    inner: Arc<RwLock<CompanionInner>>,
    diff_source: Arc<DiffSource>,
    poller: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl Companion {
    pub fn new(conversation_id: impl Into<String>, diff_source: Arc<DiffSource>, initial_tasks: Vec<Task>) -> Self {
        Companion {
            conversation_id: conversation_id.into(),
            inner: Arc::new(RwLock::new(CompanionInner {
                active: initial_tasks,
                completed: Vec::new(),
                snapshots: HashMap::new(),
                poll_interval: DEFAULT_POLL_INTERVAL,
                monitor_started: false,
                dce_enabled: true,
            })),
            diff_source,
            poller: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_poll_interval(conversation_id: impl Into<String>, diff_source: Arc<DiffSource>, initial_tasks: Vec<Task>, poll_interval: Duration) -> Self {
        Companion {
            conversation_id: conversation_id.into(),
            inner: Arc::new(RwLock::new(CompanionInner {
                active: initial_tasks,
                completed: Vec::new(),
                snapshots: HashMap::new(),
                poll_interval,
                monitor_started: false,
                dce_enabled: true,
            })),
            diff_source,
            poller: Arc::new(RwLock::new(None)),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Idempotent: spawns a background poller only on the first call.
    /// Each tick pulls "all local changes", folds any structural
    /// events into tasks, and never propagates errors — they are
    /// logged and the tick is skipped.
    pub async fn start_monitoring(&self) {
        let mut guard = self.inner.write().await;
        if guard.monitor_started {
            return;
        }
        guard.monitor_started = true;
        let poll_interval = guard.poll_interval;
        drop(guard);

        let companion = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                ticker.tick().await;
                if !companion.dce_enabled().await {
                    continue;
                }
                match companion.diff_source.all_local_changes() {
                    Ok(changes) => {
                        let combined = changes.combined();
                        if !combined.trim().is_empty() {
                            companion.update_from_diff(&combined).await;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(
                            conversation_id = %companion.conversation_id,
                            error = %err,
                            "companion poll tick failed to read local changes"
                        );
                    }
                }
            }
        });

        let mut poller_guard = self.poller.write().await;
        *poller_guard = Some(handle);
    }

    /// Aborts the background poller, if one was started. Called when
    /// this Companion is removed from the registry so the poller does
    /// not keep ticking against dead state (spec §9: "the poller must
    /// exit when its Companion is removed from the registry").
    pub async fn stop(&self) {
        if let Some(handle) = self.poller.write().await.take() {
            handle.abort();
        }
        self.inner.write().await.monitor_started = false;
    }

    /// True once `start_monitoring` has spawned a poller and `stop`
    /// has not since aborted it.
    pub async fn is_monitoring(&self) -> bool {
        self.poller.read().await.is_some()
    }

    /// Runs the synchronous equivalent of one monitor tick.
    pub async fn refresh(&self) -> Result<(), DaemonError> {
        let changes = self.diff_source.all_local_changes()?;
        let combined = changes.combined();
        if !combined.trim().is_empty() {
            self.update_from_diff(&combined).await;
        }
        Ok(())
    }

    async fn dce_enabled(&self) -> bool {
        self.inner.read().await.dce_enabled
    }

    pub async fn set_dce_enabled(&self, enabled: bool) {
        self.inner.write().await.dce_enabled = enabled;
        if enabled {
            self.start_monitoring().await;
        }
    }

    pub async fn monitor_report(&self) -> MonitorReport {
        let guard = self.inner.read().await;
        MonitorReport {
            status: if guard.dce_enabled {
                MonitorStatus::Active
            } else {
                MonitorStatus::Inactive
            },
            active_task_count: guard.active.len(),
            poll_interval: guard.poll_interval,
        }
    }

    /// Folds structural diff events into the task list, all under one
    /// write-lock acquisition so external readers see either the
    /// pre- or post-tick state, never a partial mutation.
    pub async fn update_from_diff(&self, diff: &str) {
        let events = parse_structural_events(diff);
        let mut guard = self.inner.write().await;

        for event in &events {
            if let StructuralEvent::Function {
                file_path,
                identifier,
                action: DiffAction::Added,
            } = event
            {
                let mut task = Task::new(format!("New method `{identifier}` was added."));
                task.files.push(file_path.clone());
                task.functions.push(identifier.clone());
                task.notes.push(format!("Augment the test suite for {identifier}"));
                task.notes.push("Update API documentation if public".to_string());
                guard.active.push(task);
            }
        }

        for event in &events {
            if let StructuralEvent::Function {
                identifier,
                action: DiffAction::Removed,
                ..
            } = event
            {
                if let Some(pos) = guard
                    .active
                    .iter()
                    .position(|task| task.functions.iter().any(|f| f == identifier))
                {
                    let task = guard.active.remove(pos);
                    guard.completed.push(task);
                }
            }
        }

        for event in &events {
            match event {
                StructuralEvent::Import {
                    file_path,
                    statement,
                    action: DiffAction::Added,
                } => {
                    let mut task = Task::new(format!("New import detected: {statement}"));
                    task.files.push(file_path.clone());
                    task.notes.push("Review dependency impact and update documentation".to_string());
                    guard.active.push(task);
                }
                StructuralEvent::Import {
                    file_path,
                    statement,
                    action: DiffAction::Removed,
                } => {
                    let mut task = Task::new(format!("Import removed: {statement}"));
                    task.files.push(file_path.clone());
                    task.notes.push("Check for orphaned references and clean up".to_string());
                    guard.active.push(task);
                }
                _ => {}
            }
        }
    }

    pub async fn active_tasks(&self) -> Vec<Task> {
        self.inner.read().await.active.clone()
    }

    pub async fn completed_tasks(&self) -> Vec<Task> {
        self.inner.read().await.completed.clone()
    }

    pub async fn set_snapshot(&self, path: impl Into<String>, content: impl Into<String>) {
        self.inner.write().await.snapshots.insert(path.into(), content.into());
    }

    /// DCE's Filtered-Data step: re-reads the current local diff,
    /// extracts changed function names, and for each active task that
    /// already tracks one of those functions adds a dependency entry
    /// and a note. Returns a summary string for the Prompt Assembler
    /// to append as a system message. Diff-retrieval errors degrade
    /// gracefully — an empty diff just produces an empty summary.
    pub async fn apply_filtered_data(&self) -> String {
        let diff = match self.diff_source.all_local_changes() {
            Ok(changes) => changes.combined(),
            Err(err) => {
                tracing::warn!(
                    conversation_id = %self.conversation_id,
                    error = %err,
                    "filtered-data step could not read local changes; continuing with no diff"
                );
                String::new()
            }
        };

        let changed_functions = parse_function_names(&diff);
        if changed_functions.is_empty() {
            return String::new();
        }

        let mut guard = self.inner.write().await;
        let mut matched = Vec::new();
        for name in &changed_functions {
            for task in guard.active.iter_mut() {
                if task.functions.iter().any(|f| f == name) {
                    task.dependencies.push(name.clone());
                    task.notes.push(format!("Function {name} changed in diff"));
                    matched.push(name.clone());
                }
            }
        }
        drop(guard);

        if matched.is_empty() {
            return String::new();
        }
        format!(
            "Changed functions detected in the working diff: {}.",
            matched.join(", ")
        )
    }

    /// `/complete <n>`, 1-indexed.
    pub async fn complete(&self, index_one_based: usize) -> Result<(), DaemonError> {
        let mut guard = self.inner.write().await;
        if index_one_based == 0 || index_one_based > guard.active.len() {
            return Err(DaemonError::input(format!(
                "task index {index_one_based} is out of range (1..={})",
                guard.active.len()
            )));
        }
        let task = guard.active.remove(index_one_based - 1);
        guard.completed.push(task);
        Ok(())
    }

    /// `/priority <n> <low|medium|high>`: replaces any existing
    /// priority note with the canonical one for `priority`.
    pub async fn set_priority(&self, index_one_based: usize, priority: TaskPriority) -> Result<(), DaemonError> {
        let mut guard = self.inner.write().await;
        if index_one_based == 0 || index_one_based > guard.active.len() {
            return Err(DaemonError::input(format!(
                "task index {index_one_based} is out of range (1..={})",
                guard.active.len()
            )));
        }
        let task = &mut guard.active[index_one_based - 1];
        task.notes.retain(|note| !note.starts_with("Priority:"));
        task.notes.push(priority.note().to_string());
        Ok(())
    }

    pub async fn list_priorities(&self) -> Vec<(usize, Option<String>)> {
        let guard = self.inner.read().await;
        guard
            .active
            .iter()
            .enumerate()
            .map(|(i, task)| {
                let priority = task
                    .notes
                    .iter()
                    .find(|note| note.starts_with("Priority:"))
                    .cloned();
                (i + 1, priority)
            })
            .collect()
    }

    /// `/add <description>`: delegates to the Task Builder, then
    /// appends only tasks not already present (by description).
    pub async fn add_from_input(&self, input: &str) -> Result<Vec<String>, DaemonError> {
        let result = build_tasks_from_input(&self.diff_source, input)?;
        let mut guard = self.inner.write().await;
        for task in result.tasks {
            if !guard.active.contains(&task) {
                guard.active.push(task);
            }
        }
        Ok(result.log_lines)
    }

    /// Builds the ephemeral context the DCE pipeline augments a
    /// conversation with: a system preamble, active/completed task
    /// summaries, code snapshots, then the user's query.
    pub async fn build_ephemeral_context(&self, user_query: &str) -> Vec<Message> {
        let guard = self.inner.read().await;
        let mut messages = vec![Message::system(crate::assembler::DCE_PREAMBLE)];

        if !guard.active.is_empty() {
            messages.push(Message::system(render_task_list("Active tasks", &guard.active, true)));
        }
        if !guard.completed.is_empty() {
            messages.push(Message::system(render_task_list(
                "Completed tasks",
                &guard.completed,
                false,
            )));
        }
        for (path, content) in guard.snapshots.iter() {
            messages.push(Message::system(format!("File: {path}\n---\n{content}\n---\n")));
        }

        messages.push(Message::user(user_query));
        messages
    }
}

fn render_task_list(heading: &str, tasks: &[Task], verbose: bool) -> String {
    let mut out = format!("{heading}:\n");
    for (i, task) in tasks.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, task.description));
        if verbose {
            if !task.notes.is_empty() {
                out.push_str(&format!("   Notes: {}\n", task.notes.join("; ")));
            }
            if !task.files.is_empty() {
                out.push_str(&format!("   Files: {}\n", task.files.join(", ")));
            }
            if !task.functions.is_empty() {
                out.push_str(&format!("   Functions: {}\n", task.functions.join(", ")));
            }
        }
    }
    out
}

/// Task Builder (§4.4.1): turns free text into zero-or-more tasks by
/// matching tokens against tracked file paths.
pub fn build_tasks_from_input(diff_source: &DiffSource, input: &str) -> Result<TaskBuilderResult, DaemonError> {
    let tracked_files = diff_source.tracked_files()?;
    let tokens: Vec<String> = input
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .filter(|t| t.len() >= 3)
        .collect();

    let mut matched_files = Vec::new();
    for file in &tracked_files {
        let lowered = file.to_lowercase();
        if tokens.iter().any(|token| lowered.contains(token.as_str())) {
            matched_files.push(file.clone());
        }
    }

    if matched_files.is_empty() {
        let mut task = Task::new(input);
        task.notes.push(
            "No direct file matches found. Consider refining the description or adding files manually.".to_string(),
        );
        return Ok(TaskBuilderResult {
            tasks: vec![task],
            log_lines: vec![format!("No tracked files matched input \"{input}\".")],
        });
    }

    let mut functions = Vec::new();
    for file in &matched_files {
        // The Task Builder only has the file path, not its contents;
        // function extraction here runs over the file's current text
        // on disk, mirroring how the diff parser extracts names from
        // diff hunks.
        if let Ok(content) = std::fs::read_to_string(diff_source.root().join(file)) {
            functions.extend(parse_function_names(&content));
        }
    }

    let matched_count = matched_files.len();
    let mut task = Task::new(input);
    task.files = matched_files;
    task.functions = functions;
    task.notes.push("Matched via input and file heuristics.".to_string());

    Ok(TaskBuilderResult {
        tasks: vec![task],
        log_lines: vec![format!(
            "Matched {matched_count} file(s) for input \"{input}\"."
        )],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use prbuddy_vcs::VcsCli;

    fn test_diff_source() -> Arc<DiffSource> {
        Arc::new(DiffSource::with_cli("/tmp", VcsCli::default()))
    }

    #[tokio::test]
    async fn update_from_diff_adds_task_for_new_function() {
        let companion = Companion::new("c1", test_diff_source(), Vec::new());
        let diff = "diff --git a/pkg/x.go b/pkg/x.go\n+func Bar() {\n";
        companion.update_from_diff(diff).await;
        let active = companion.active_tasks().await;
        assert_eq!(active.len(), 1);
        assert!(active[0].functions.contains(&"Bar".to_string()));
        assert!(active[0].files.contains(&"pkg/x.go".to_string()));
    }

    #[tokio::test]
    async fn update_from_diff_completes_task_on_function_removal() {
        let companion = Companion::new("c1", test_diff_source(), Vec::new());
        companion
            .update_from_diff("diff --git a/pkg/x.go b/pkg/x.go\n+func Baz() {\n")
            .await;
        assert_eq!(companion.active_tasks().await.len(), 1);

        companion
            .update_from_diff("diff --git a/pkg/x.go b/pkg/x.go\n-func Baz() {\n")
            .await;

        assert_eq!(companion.active_tasks().await.len(), 0);
        assert_eq!(companion.completed_tasks().await.len(), 1);
    }

    #[tokio::test]
    async fn complete_out_of_range_is_an_error_and_a_no_op() {
        let companion = Companion::new("c1", test_diff_source(), Vec::new());
        let before = companion.active_tasks().await.len();
        let result = companion.complete(5).await;
        assert!(result.is_err());
        assert_eq!(companion.active_tasks().await.len(), before);
    }

    #[tokio::test]
    async fn set_priority_replaces_existing_priority_note() {
        let companion = Companion::new("c1", test_diff_source(), vec![Task::new("do the thing")]);
        companion.set_priority(1, TaskPriority::Low).await.unwrap();
        companion.set_priority(1, TaskPriority::High).await.unwrap();
        let active = companion.active_tasks().await;
        let priority_notes: Vec<_> = active[0]
            .notes
            .iter()
            .filter(|note| note.starts_with("Priority:"))
            .collect();
        assert_eq!(priority_notes, vec!["Priority: high"]);
    }

    #[tokio::test]
    async fn build_ephemeral_context_starts_system_ends_user() {
        let companion = Companion::new("c1", test_diff_source(), Vec::new());
        let messages = companion.build_ephemeral_context("what next?").await;
        assert_eq!(messages.first().unwrap().role, prbuddy_core::MessageRole::System);
        let last = messages.last().unwrap();
        assert_eq!(last.role, prbuddy_core::MessageRole::User);
        assert_eq!(last.content, "what next?");
    }

    #[tokio::test]
    async fn start_monitoring_twice_spawns_only_one_poller() {
        let companion = Companion::new("c1", test_diff_source(), Vec::new());
        companion.start_monitoring().await;
        companion.start_monitoring().await;
        let guard = companion.poller.read().await;
        assert!(guard.is_some());
    }

    #[tokio::test]
    async fn stop_aborts_the_poller_and_clears_the_handle() {
        let companion = Companion::new("c1", test_diff_source(), Vec::new());
        companion.start_monitoring().await;
        assert!(companion.poller.read().await.is_some());

        companion.stop().await;

        let guard = companion.poller.read().await;
        assert!(guard.is_none());
        assert!(!companion.inner.read().await.monitor_started);
    }

    #[tokio::test]
    async fn stop_without_a_started_poller_is_a_no_op() {
        let companion = Companion::new("c1", test_diff_source(), Vec::new());
        companion.stop().await;
        assert!(companion.poller.read().await.is_none());
    }

    #[test]
    fn task_builder_log_line_reports_matched_count_not_tracked_count() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cli = VcsCli::default();
        cli.run(dir.path(), ["init", "-q"]).expect("init");
        cli.run(dir.path(), ["config", "user.email", "dev@example.test"]).expect("config");
        cli.run(dir.path(), ["config", "user.name", "dev"]).expect("config");
        std::fs::write(dir.path().join("widget.rs"), "fn widget() {}\n").expect("write");
        std::fs::write(dir.path().join("other.rs"), "fn other() {}\n").expect("write");
        std::fs::write(dir.path().join("unrelated.rs"), "fn unrelated() {}\n").expect("write");
        cli.run(dir.path(), ["add", "."]).expect("add");
        cli.run(dir.path(), ["commit", "-q", "-m", "initial"]).expect("commit");

        let diff_source = DiffSource::with_cli(dir.path(), cli);
        let result = build_tasks_from_input(&diff_source, "widget").expect("build");

        assert_eq!(result.tasks[0].files.len(), 1);
        assert_eq!(
            result.log_lines[0],
            "Matched 1 file(s) for input \"widget\"."
        );
    }
}
