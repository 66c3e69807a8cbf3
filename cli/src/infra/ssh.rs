//! SSH sessions over libssh2.
//!
//! One TCP connection and one authenticated session per materialized
//! service. Every command runs in its own channel; the SFTP channel is
//! opened on first use and kept for the life of the session.

use std::io::{self, Read};
use std::net::TcpStream;
use std::time::Duration;

use ssh2::{Channel, Session};

use crate::application::ports::{Connector, RemoteSession, RemoteShell};
use crate::domain::{ConnectError, ConnectionParams, RemoteError};
use crate::infra::sftp::SftpChannel;

/// Opens key-authenticated sessions.
///
/// The host key is not verified against `known_hosts`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SshConnector;

impl Connector for SshConnector {
    type Session = SshSession;

    fn connect(&self, params: &ConnectionParams) -> Result<SshSession, ConnectError> {
        let key = std::fs::read_to_string(&params.private_key_path).map_err(|e| {
            ConnectError::KeyUnreadable {
                path: params.private_key_path.clone(),
                reason: e.to_string(),
            }
        })?;

        let addr = format!("{}:{}", params.host, params.port);
        let tcp = TcpStream::connect(&addr).map_err(|e| ConnectError::Network {
            addr: addr.clone(),
            reason: e.to_string(),
        })?;
        let handshake_error = |e: ssh2::Error| ConnectError::Handshake {
            addr: addr.clone(),
            reason: e.message().to_string(),
        };
        let mut session = Session::new().map_err(handshake_error)?;
        session.set_tcp_stream(tcp);
        session.handshake().map_err(handshake_error)?;

        let auth_error = |reason: String| ConnectError::Auth {
            user: params.user.clone(),
            addr: addr.clone(),
            reason,
        };
        session
            .userauth_pubkey_memory(&params.user, None, &key, None)
            .map_err(|e| auth_error(e.message().to_string()))?;
        if !session.authenticated() {
            return Err(auth_error("the server rejected the key".to_string()));
        }

        tracing::debug!(user = %params.user, addr = %addr, "ssh session established");
        Ok(SshSession {
            session,
            files: None,
        })
    }
}

/// An authenticated SSH session.
pub struct SshSession {
    session: Session,
    files: Option<SftpChannel>,
}

fn transport(e: &ssh2::Error) -> RemoteError {
    RemoteError::Transport(e.message().to_string())
}

impl RemoteShell for SshSession {
    fn run(&mut self, command: &str) -> Result<String, RemoteError> {
        let mut channel = self.session.channel_session().map_err(|e| transport(&e))?;
        channel.exec(command).map_err(|e| transport(&e))?;

        self.session.set_blocking(false);
        let drained = drain(&mut channel);
        self.session.set_blocking(true);
        let (stdout, stderr) = drained.map_err(|e| RemoteError::Transport(e.to_string()))?;
        let stdout = String::from_utf8_lossy(&stdout);
        let stderr = String::from_utf8_lossy(&stderr);
        channel.wait_close().map_err(|e| transport(&e))?;

        let status = channel.exit_status().map_err(|e| transport(&e))?;
        if status != 0 {
            return Err(RemoteError::Command {
                command: command.to_string(),
                status: Some(status),
                output: stderr.trim_end().to_string(),
            });
        }
        Ok(stdout.strip_suffix('\n').unwrap_or(&stdout).to_string())
    }
}

/// Pause between polls when neither stream has data.
const IDLE_POLL: Duration = Duration::from_millis(5);

/// Read stdout and stderr of a non-blocking channel in turns until EOF, so a
/// full stderr window never stalls the remote command while stdout is read.
fn drain(channel: &mut Channel) -> io::Result<(Vec<u8>, Vec<u8>)> {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut buf = [0u8; 16 * 1024];
    loop {
        let out = read_available(&mut channel.stream(0), &mut buf, &mut stdout)?;
        let err = read_available(&mut channel.stderr(), &mut buf, &mut stderr)?;
        if out + err == 0 {
            if channel.eof() {
                return Ok((stdout, stderr));
            }
            std::thread::sleep(IDLE_POLL);
        }
    }
}

/// Append whatever `stream` has ready to `sink`. `WouldBlock` reads as zero.
fn read_available(stream: &mut impl Read, buf: &mut [u8], sink: &mut Vec<u8>) -> io::Result<usize> {
    match stream.read(buf) {
        Ok(n) => {
            sink.extend_from_slice(&buf[..n]);
            Ok(n)
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
        Err(e) => Err(e),
    }
}

impl RemoteSession for SshSession {
    type Files = SftpChannel;

    fn file_channel(&mut self) -> Result<&mut SftpChannel, RemoteError> {
        let files = match self.files.take() {
            Some(files) => files,
            None => SftpChannel::new(self.session.sftp().map_err(|e| transport(&e))?),
        };
        Ok(self.files.insert(files))
    }
}
