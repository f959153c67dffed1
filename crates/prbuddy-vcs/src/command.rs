use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::VcsError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Thin wrapper around shelling out to the host VCS binary. Every
/// operation is a fresh subprocess; nothing here caches workspace
/// state, matching the "functions are pure with respect to the
/// workspace" contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsCli {
    pub binary: PathBuf,
}

impl Default for VcsCli {
    fn default() -> Self {
        VcsCli {
            binary: PathBuf::from("git"),
        }
    }
}

impl VcsCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        VcsCli {
            binary: binary.into(),
        }
    }

    pub fn run<I, S>(&self, cwd: &Path, args: I) -> Result<VcsOutput, VcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let owned_args: Vec<OsString> = args
            .into_iter()
            .map(|arg| arg.as_ref().to_os_string())
            .collect();

        let mut command = Command::new(&self.binary);
        command.current_dir(cwd);
        for arg in &owned_args {
            command.arg(arg);
        }

        let rendered = render_command(&self.binary, &owned_args);
        let output = command.output().map_err(|source| VcsError::Io {
            command: rendered.clone(),
            source,
        })?;

        let stdout = String::from_utf8(output.stdout).map_err(|source| VcsError::Utf8 {
            command: rendered.clone(),
            source,
        })?;
        let stderr = String::from_utf8(output.stderr).map_err(|source| VcsError::Utf8 {
            command: rendered.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(VcsError::CommandFailed {
                command: rendered,
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(VcsOutput { stdout, stderr })
    }
}

fn render_command(binary: &Path, args: &[OsString]) -> String {
    let mut rendered = binary.to_string_lossy().into_owned();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }
    rendered
}
