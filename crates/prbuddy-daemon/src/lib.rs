//! Conversation Store, Companion, Prompt Assembler, and LLM
//! Orchestrator: the stateful core of the workstation agent.

pub mod assembler;
pub mod companion;
pub mod context_log;
pub mod conversation;
pub mod draft_store;
pub mod error;
pub mod orchestrator;
pub mod port_file;
pub mod registry;

pub use companion::{Companion, MonitorReport, MonitorStatus, TaskPriority};
pub use context_log::ContextLog;
pub use conversation::{mint_id, Conversation, ConversationSnapshot, ConversationStore};
pub use draft_store::{sanitize_branch_name, DraftStore};
pub use error::DaemonError;
pub use orchestrator::Orchestrator;
pub use registry::CompanionRegistry;
