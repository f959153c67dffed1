//! Prompt Assembler: pure functions that turn a conversation's stored
//! fields into the ordered message sequence sent to the LLM.

use prbuddy_core::Message;
use prbuddy_vcs::truncate_diff;

pub const QUICKASSIST_PREAMBLE: &str =
    "You are a helpful developer assistant having a persistent conversation with the user.";

pub const DCE_PREAMBLE: &str =
    "You are a helpful developer assistant. We maintain a dynamic list of tasks and code snapshots in memory.";

const INITIAL_DIFF_MAX_LINES: usize = 1000;
const FULL_DIFF_MESSAGE_THRESHOLD: usize = 4;

pub struct AssembledContext {
    pub messages: Vec<Message>,
    pub diff_truncated: bool,
}

/// Builds the context for one LLM turn. `already_truncated` is the
/// conversation's latched truncation flag coming in; the returned
/// `diff_truncated` is the flag going out (once true, stays true).
pub fn assemble(
    preamble: &str,
    initial_diff: &str,
    messages: &[Message],
    already_truncated: bool,
    dce_summary: Option<&str>,
) -> AssembledContext {
    let mut out = Vec::with_capacity(messages.len() + 2);
    out.push(Message::system(preamble));

    let mut diff_truncated = already_truncated;
    if !initial_diff.trim().is_empty() {
        if messages.len() < FULL_DIFF_MESSAGE_THRESHOLD && !already_truncated {
            out.push(Message::system(format!(
                "Initial code changes:\n{initial_diff}"
            )));
        } else {
            let truncated = truncate_diff(initial_diff, INITIAL_DIFF_MAX_LINES);
            out.push(Message::system(format!(
                "Initial code changes (truncated):\n{truncated}"
            )));
            diff_truncated = true;
        }
    }

    out.extend(messages.iter().cloned());

    if let Some(summary) = dce_summary {
        out.push(Message::system(summary));
    }

    AssembledContext {
        messages: out,
        diff_truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prbuddy_core::MessageRole;

    #[test]
    fn empty_initial_diff_adds_no_diff_message() {
        let result = assemble(QUICKASSIST_PREAMBLE, "", &[], false, None);
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].role, MessageRole::System);
    }

    #[test]
    fn short_conversation_includes_full_diff() {
        let result = assemble(QUICKASSIST_PREAMBLE, "diff --git a/x b/x\n+hi", &[], false, None);
        assert!(result.messages[1].content.contains("Initial code changes:"));
        assert!(!result.diff_truncated);
    }

    #[test]
    fn four_or_more_messages_truncates_and_latches() {
        let messages: Vec<Message> = (0..4).map(|i| Message::user(format!("msg {i}"))).collect();
        let result = assemble(QUICKASSIST_PREAMBLE, "diff --git a/x b/x\n+hi", &messages, false, None);
        assert!(result.messages[1].content.contains("(truncated)"));
        assert!(result.diff_truncated);
    }

    #[test]
    fn dce_summary_is_appended_last() {
        let result = assemble(DCE_PREAMBLE, "", &[], false, Some("summary text"));
        assert_eq!(result.messages.last().unwrap().content, "summary text");
    }
}
