#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("llm backend transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("llm backend returned status {status}: {body}")]
    BadStatus { status: u16, body: String },
    #[error("llm backend returned empty content")]
    EmptyContent,
}
