use std::string::FromUtf8Error;

#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    #[error("vcs command failed to start ({command}): {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("vcs command returned non-zero exit ({command}): {stderr}")]
    CommandFailed { command: String, stderr: String },
    #[error("vcs command output was not valid UTF-8 ({command}): {source}")]
    Utf8 {
        command: String,
        #[source]
        source: FromUtf8Error,
    },
}
