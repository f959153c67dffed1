use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::command::VcsCli;
use crate::error::VcsError;

/// Staged, unstaged, and untracked changes, kept clearly separated —
/// callers that need one combined diff text use `combined()`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllLocalChanges {
    pub staged: String,
    pub unstaged: String,
    pub untracked: Vec<String>,
}

impl AllLocalChanges {
    pub fn is_empty(&self) -> bool {
        self.staged.trim().is_empty() && self.unstaged.trim().is_empty() && self.untracked.is_empty()
    }

    pub fn combined(&self) -> String {
        let mut out = String::new();
        if !self.staged.trim().is_empty() {
            out.push_str("=== staged ===\n");
            out.push_str(&self.staged);
            if !self.staged.ends_with('\n') {
                out.push('\n');
            }
        }
        if !self.unstaged.trim().is_empty() {
            out.push_str("=== unstaged ===\n");
            out.push_str(&self.unstaged);
            if !self.unstaged.ends_with('\n') {
                out.push('\n');
            }
        }
        if !self.untracked.is_empty() {
            out.push_str("=== untracked ===\n");
            for path in &self.untracked {
                out.push_str(path);
                out.push('\n');
            }
        }
        out
    }
}

/// Adapts host-VCS operations into typed results. Every method shells
/// out fresh; nothing is cached across calls.
#[derive(Debug, Clone)]
pub struct DiffSource {
    root: PathBuf,
    cli: VcsCli,
}

impl DiffSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DiffSource {
            root: root.into(),
            cli: VcsCli::default(),
        }
    }

    pub fn with_cli(root: impl Into<PathBuf>, cli: VcsCli) -> Self {
        DiffSource {
            root: root.into(),
            cli,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn current_branch(&self) -> Result<String, VcsError> {
        let output = self.cli.run(&self.root, ["rev-parse", "--abbrev-ref", "HEAD"])?;
        Ok(output.stdout.trim().to_string())
    }

    pub fn latest_commit_hash(&self) -> Result<String, VcsError> {
        let output = self.cli.run(&self.root, ["rev-parse", "HEAD"])?;
        Ok(output.stdout.trim().to_string())
    }

    pub fn commit_count(&self) -> Result<u64, VcsError> {
        let output = self.cli.run(&self.root, ["rev-list", "--count", "HEAD"])?;
        Ok(output.stdout.trim().parse().unwrap_or(0))
    }

    pub fn last_commit_message(&self) -> Result<String, VcsError> {
        let output = self.cli.run(&self.root, ["log", "-1", "--pretty=%B"])?;
        Ok(output.stdout.trim().to_string())
    }

    pub fn tracked_files(&self) -> Result<Vec<String>, VcsError> {
        let output = self.cli.run(&self.root, ["ls-files"])?;
        Ok(output
            .stdout
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }

    /// Diff of HEAD against its immediate parent.
    pub fn diff_since_last_commit(&self) -> Result<String, VcsError> {
        let output = self.cli.run(&self.root, ["diff", "HEAD~1", "HEAD"])?;
        Ok(output.stdout.trim_end().to_string())
    }

    pub fn all_local_changes(&self) -> Result<AllLocalChanges, VcsError> {
        let staged = self.cli.run(&self.root, ["diff", "--cached"])?.stdout;
        let unstaged = self.cli.run(&self.root, ["diff"])?.stdout;
        let untracked_output = self
            .cli
            .run(&self.root, ["ls-files", "--others", "--exclude-standard"])?;
        let untracked = untracked_output
            .stdout
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();

        Ok(AllLocalChanges {
            staged: staged.trim_end().to_string(),
            unstaged: unstaged.trim_end().to_string(),
            untracked,
        })
    }

    /// Compiles `.gitignore` entries into regexes. A missing file
    /// yields an empty pattern set, not an error.
    pub fn gitignore_patterns(&self) -> Result<Vec<Regex>, VcsError> {
        let path = self.root.join(".gitignore");
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(VcsError::Io {
                    command: format!("read {}", path.display()),
                    source,
                })
            }
        };

        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|pattern| glob_to_regex(pattern).ok())
            .collect())
    }
}

/// Translates a gitignore-style glob line into an anchored regex.
fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut anchored = pattern.trim_start_matches('/').to_string();
    let trailing_slash = anchored.ends_with('/');
    if trailing_slash {
        anchored.pop();
    }

    let mut out = String::from("^");
    for ch in anchored.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '.' | '+' | '(' | ')' | '|' | '^' | '$' | '[' | ']' | '{' | '}' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            other => out.push(other),
        }
    }
    out.push_str("(/.*)?$");

    Regex::new(&out)
}

/// True if any compiled `.gitignore` pattern matches `path`.
pub fn is_path_ignored(patterns: &[Regex], path: &str) -> bool {
    patterns.iter().any(|pattern| pattern.is_match(path))
}
