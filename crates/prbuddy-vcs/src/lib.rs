//! Diff Source and Diff Parser: VCS access and pure diff-text analysis.

pub mod command;
pub mod error;
pub mod parser;
pub mod source;

pub use command::{VcsCli, VcsOutput};
pub use error::VcsError;
pub use parser::{parse_function_names, parse_structural_events, truncate_diff, DiffAction, StructuralEvent};
pub use source::{is_path_ignored, AllLocalChanges, DiffSource};
