//! Validation for PRBuddy configuration.

use serde::{Deserialize, Serialize};

use crate::config::PrbuddyConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub level: ValidationLevel,
    pub code: &'static str,
    pub message: String,
}

pub trait Validate {
    fn validate(&self) -> Vec<ValidationIssue>;
}

impl Validate for PrbuddyConfig {
    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.llm.endpoint.trim().is_empty() {
            issues.push(ValidationIssue {
                level: ValidationLevel::Error,
                code: "llm.endpoint.empty",
                message: "llm endpoint must not be empty".to_string(),
            });
        }

        if self.companion.poll_interval_secs == 0 {
            issues.push(ValidationIssue {
                level: ValidationLevel::Warning,
                code: "companion.poll_interval_secs.zero",
                message: "a zero poll interval will busy-loop the companion poller".to_string(),
            });
        }

        issues
    }
}
