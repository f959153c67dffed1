//! Port discovery file: lets editor extensions find the locally
//! running server without a fixed port. Written atomically on
//! startup, removed on clean shutdown.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use fs2::FileExt;

use crate::error::DaemonError;

const APP_QUALIFIER: &str = "dev";
const APP_ORGANIZATION: &str = "prbuddy";
const APP_NAME: &str = "prbuddy";

pub fn default_port_file_path() -> Result<PathBuf, DaemonError> {
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
        .ok_or_else(|| DaemonError::state("could not determine a per-user cache directory"))?;
    Ok(dirs.cache_dir().join("port"))
}

/// Atomically writes `port` to `path`, creating the parent directory
/// (mode 0700) if needed. The file itself is mode 0600.
pub fn write_port_file(path: &Path, port: u16) -> Result<(), DaemonError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    set_mode(dir, 0o700)?;

    let tmp_path = dir.join(".port.tmp");
    let mut tmp_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp_path)?;
    tmp_file.lock_exclusive()?;
    tmp_file.write_all(port.to_string().as_bytes())?;
    tmp_file.sync_all()?;
    FileExt::unlock(&tmp_file)?;
    drop(tmp_file);
    set_mode(&tmp_path, 0o600)?;

    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn read_port_file(path: &Path) -> Result<u16, DaemonError> {
    let file = File::open(path)?;
    file.lock_shared()?;
    let contents = fs::read_to_string(path)?;
    FileExt::unlock(&file)?;
    contents
        .trim()
        .parse()
        .map_err(|_| DaemonError::state(format!("port file at {} does not contain a valid port", path.display())))
}

/// Removes the port file on clean shutdown. Missing file is not an
/// error.
pub fn remove_port_file(path: &Path) -> Result<(), DaemonError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    let permissions = fs::Permissions::from_mode(mode);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), DaemonError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips_port() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cache").join("port");
        write_port_file(&path, 54321).expect("write");
        assert_eq!(read_port_file(&path).expect("read"), 54321);
    }

    #[test]
    fn written_file_has_no_trailing_newline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("port");
        write_port_file(&path, 8080).expect("write");
        let contents = fs::read_to_string(&path).expect("read");
        assert_eq!(contents, "8080");
    }

    #[test]
    fn remove_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("port");
        remove_port_file(&path).expect("no error on missing file");
    }

    #[cfg(unix)]
    #[test]
    fn file_mode_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("port");
        write_port_file(&path, 1234).expect("write");
        let mode = fs::metadata(&path).expect("metadata").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
