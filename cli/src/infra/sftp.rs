//! Remote file operations over SFTP.

use std::io::Read;
use std::path::{Component, Path, PathBuf};

use ssh2::{ErrorCode, Sftp};

use crate::application::ports::FileChannel;
use crate::domain::RemoteError;

// SSH_FX_* status codes from the SFTP protocol.
const SFTP_NO_SUCH_FILE: i32 = 2;
const SFTP_FAILURE: i32 = 4;

/// `FileChannel` over an SFTP subsystem channel.
pub struct SftpChannel {
    sftp: Sftp,
}

impl SftpChannel {
    #[must_use]
    pub fn new(sftp: Sftp) -> Self {
        Self { sftp }
    }
}

fn sftp_error(path: &Path, e: &ssh2::Error) -> RemoteError {
    match e.code() {
        ErrorCode::SFTP(SFTP_NO_SUCH_FILE) => RemoteError::NotFound(path.to_path_buf()),
        _ => RemoteError::Transport(format!("`{}`: {}", path.display(), e.message())),
    }
}

impl FileChannel for SftpChannel {
    fn create_dir_all(&mut self, path: &Path) -> Result<(), RemoteError> {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            if matches!(component, Component::RootDir | Component::Prefix(_)) {
                continue;
            }
            match self.sftp.stat(&current) {
                Ok(stat) if stat.is_dir() => {}
                Ok(_) => {
                    return Err(RemoteError::Transport(format!(
                        "`{}` exists and is not a directory",
                        current.display()
                    )));
                }
                Err(_) => {
                    tracing::debug!(path = %current.display(), "sftp mkdir");
                    self.sftp
                        .mkdir(&current, 0o755)
                        .map_err(|e| sftp_error(&current, &e))?;
                }
            }
        }
        Ok(())
    }

    fn write_file(&mut self, path: &Path, contents: &mut dyn Read) -> Result<u64, RemoteError> {
        tracing::debug!(path = %path.display(), "sftp write");
        let mut file = self.sftp.create(path).map_err(|e| sftp_error(path, &e))?;
        std::io::copy(contents, &mut file)
            .map_err(|e| RemoteError::Transport(format!("cannot write `{}`: {e}", path.display())))
    }

    fn remove_file(&mut self, path: &Path) -> Result<(), RemoteError> {
        tracing::debug!(path = %path.display(), "sftp unlink");
        self.sftp.unlink(path).map_err(|e| sftp_error(path, &e))
    }

    fn remove_dir(&mut self, path: &Path) -> Result<(), RemoteError> {
        tracing::debug!(path = %path.display(), "sftp rmdir");
        self.sftp.rmdir(path).map_err(|e| match e.code() {
            // OpenSSH answers a generic failure when the directory has entries.
            ErrorCode::SFTP(SFTP_FAILURE) => RemoteError::NotEmpty(path.to_path_buf()),
            _ => sftp_error(path, &e),
        })
    }
}
