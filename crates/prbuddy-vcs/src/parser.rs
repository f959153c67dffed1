//! Pure functions over unified-diff text. No VCS access here.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffAction {
    Added,
    Removed,
}

/// A structural event extracted from a diff hunk. Returned as a tagged
/// enum (rather than parallel added/removed arrays) so downstream
/// matching is exhaustive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralEvent {
    Function {
        file_path: String,
        identifier: String,
        action: DiffAction,
    },
    Import {
        file_path: String,
        statement: String,
        action: DiffAction,
    },
}

fn function_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:func|def|function|public|private|static|void)\s+\**(\w+)\s*\(").unwrap()
    })
}

fn import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(import|from|require\(|export)\b").unwrap())
}

/// Captures just the identifier from a function-declaration line,
/// shared by the Companion's Task Builder and the structural-event
/// walk below.
pub fn parse_function_names(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            function_regex()
                .captures(line.trim_start_matches(['+', '-']).trim_start())
                .map(|caps| caps[1].to_string())
        })
        .collect()
}

/// Walks unified-diff text, returning all added events followed by all
/// removed events (functions before imports within each group, stable
/// within each group) — this ordering is load-bearing for callers.
pub fn parse_structural_events(diff: &str) -> Vec<StructuralEvent> {
    let mut current_file = String::new();
    let mut added = Vec::new();
    let mut removed = Vec::new();

    for line in diff.lines() {
        if line.starts_with("diff --git") {
            if let Some(b_path) = line.rsplit(" b/").next() {
                current_file = b_path.to_string();
            }
            continue;
        }
        if line.starts_with("+++")
            || line.starts_with("---")
            || line.starts_with("@@")
            || line.starts_with("new file mode")
            || line.starts_with("deleted file mode")
        {
            continue;
        }

        let (action, body) = if let Some(body) = line.strip_prefix('+') {
            (DiffAction::Added, body)
        } else if let Some(body) = line.strip_prefix('-') {
            (DiffAction::Removed, body)
        } else {
            continue;
        };

        let trimmed = body.trim_start();

        if let Some(caps) = function_regex().captures(trimmed) {
            let identifier = caps[1].to_string();
            let event = StructuralEvent::Function {
                file_path: current_file.clone(),
                identifier,
                action,
            };
            match action {
                DiffAction::Added => added.push(event),
                DiffAction::Removed => removed.push(event),
            }
            continue;
        }

        if import_regex().is_match(trimmed) {
            let event = StructuralEvent::Import {
                file_path: current_file.clone(),
                statement: trimmed.to_string(),
                action,
            };
            match action {
                DiffAction::Added => added.push(event),
                DiffAction::Removed => removed.push(event),
            }
        }
    }

    added.extend(removed);
    added
}

/// Returns `diff` unchanged when it has at most `max_lines` lines.
/// Otherwise keeps per-file headers, up to five `+` lines per file,
/// and summarizes the rest.
pub fn truncate_diff(diff: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = diff.lines().collect();
    if lines.len() <= max_lines {
        return diff.to_string();
    }

    let mut out: Vec<String> = Vec::new();
    let mut kept_plus_this_file = 0usize;
    let mut removed_count_this_file = 0usize;

    let flush_removed_summary = |out: &mut Vec<String>, count: usize| {
        if count > 0 {
            out.push(format!("... [{count} lines removed] ..."));
        }
    };

    for line in lines {
        if out.len() >= max_lines {
            break;
        }

        if line.starts_with("diff --git") {
            flush_removed_summary(&mut out, removed_count_this_file);
            removed_count_this_file = 0;
            kept_plus_this_file = 0;
            out.push(line.to_string());
            continue;
        }

        if line.starts_with("new file mode")
            || line.starts_with("deleted file mode")
            || line.starts_with("+++")
            || line.starts_with("---")
            || line.starts_with("@@")
        {
            out.push(line.to_string());
            continue;
        }

        if let Some(stripped) = line.strip_prefix('+') {
            let _ = stripped;
            if kept_plus_this_file < 5 {
                out.push(line.to_string());
                kept_plus_this_file += 1;
            }
            continue;
        }

        if line.starts_with('-') {
            removed_count_this_file += 1;
            continue;
        }
    }

    flush_removed_summary(&mut out, removed_count_this_file);
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_DIFF: &str = "diff --git a/pkg/x.go b/pkg/x.go\n\
+func Foo() {\n\
-func Bar() {\n\
+import \"fmt\"\n\
-import \"os\"\n";

    #[test]
    fn parse_structural_events_groups_added_then_removed() {
        let events = parse_structural_events(SAMPLE_DIFF);
        assert_eq!(
            events,
            vec![
                StructuralEvent::Function {
                    file_path: "pkg/x.go".to_string(),
                    identifier: "Foo".to_string(),
                    action: DiffAction::Added,
                },
                StructuralEvent::Import {
                    file_path: "pkg/x.go".to_string(),
                    statement: "import \"fmt\"".to_string(),
                    action: DiffAction::Added,
                },
                StructuralEvent::Function {
                    file_path: "pkg/x.go".to_string(),
                    identifier: "Bar".to_string(),
                    action: DiffAction::Removed,
                },
                StructuralEvent::Import {
                    file_path: "pkg/x.go".to_string(),
                    statement: "import \"os\"".to_string(),
                    action: DiffAction::Removed,
                },
            ]
        );
    }

    #[test]
    fn empty_diff_yields_no_events() {
        assert!(parse_structural_events("").is_empty());
    }

    #[test]
    fn truncate_diff_is_identity_under_the_limit() {
        let diff = "diff --git a/x b/x\n+line one\n";
        assert_eq!(truncate_diff(diff, 1000), diff);
    }

    #[test]
    fn truncate_diff_summarizes_removed_lines() {
        let mut diff = String::from("diff --git a/x b/x\n");
        for i in 0..20 {
            diff.push_str(&format!("-old line {i}\n"));
        }
        let truncated = truncate_diff(&diff, 2);
        assert!(truncated.contains("lines removed"));
        assert!(!truncated.contains("old line 0"));
    }

    #[test]
    fn parse_function_names_extracts_identifiers() {
        let names = parse_function_names("+func Foo() {\n+func Bar() {\n");
        assert_eq!(names, vec!["Foo".to_string(), "Bar".to_string()]);
    }
}
