//! Shared mock infrastructure for unit tests.
//!
//! Provides an in-memory remote host ([`FakeRemote`]) with scripted command
//! results, a connector that hands out sessions to it, and recorders for
//! progress events.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tether_cli::application::ports::{
    Connector, EventRenderer, FileChannel, ProgressReporter, RemoteSession, RemoteShell,
};
use tether_cli::domain::config::{self, LocalEnvironment, ResolvedConfig, ServiceConfig};
use tether_cli::domain::{ConnectError, ConnectionParams, ProgressEvent, RemoteError, Severity};

pub const HOME: &str = "/home/app";
pub const CONFIG_FILE: &str = ".tether.yml";

// ── Fake remote host ──────────────────────────────────────────────────────────

#[derive(Clone)]
enum Scripted {
    Output(String),
    Failure(String),
    Dropped(String),
}

#[derive(Default)]
struct RemoteState {
    commands: Vec<String>,
    responses: Vec<(String, Scripted)>,
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    file_channel_broken: bool,
}

impl RemoteState {
    fn add_dir_all(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if !ancestor.as_os_str().is_empty() {
                self.dirs.insert(ancestor.to_path_buf());
            }
        }
    }

    fn has_children(&self, dir: &Path) -> bool {
        self.files.keys().any(|p| p.parent() == Some(dir))
            || self.dirs.iter().any(|p| p.parent() == Some(dir))
    }
}

/// An in-memory host. Clones share state, so a test keeps one handle while
/// the code under test owns sessions to it.
///
/// Commands succeed with empty output unless scripted. `pwd` prints
/// [`HOME`] and the linger directory lists `app`.
#[derive(Clone)]
pub struct FakeRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl Default for FakeRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRemote {
    pub fn new() -> Self {
        let remote = Self {
            state: Arc::new(Mutex::new(RemoteState::default())),
        };
        remote.state.lock().unwrap().add_dir_all(Path::new(HOME));
        remote
            .respond("pwd", HOME)
            .respond("ls /var/lib/systemd/linger", "app")
    }

    /// Commands starting with `prefix` print `stdout`. Later scripts win.
    #[must_use]
    pub fn respond(self, prefix: &str, stdout: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .push((prefix.to_string(), Scripted::Output(stdout.to_string())));
        self
    }

    /// Commands starting with `prefix` exit 1 printing `stderr`.
    #[must_use]
    pub fn fail(self, prefix: &str, stderr: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .push((prefix.to_string(), Scripted::Failure(stderr.to_string())));
        self
    }

    /// Commands starting with `prefix` lose the connection.
    #[must_use]
    pub fn drop_connection(self, prefix: &str, reason: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .push((prefix.to_string(), Scripted::Dropped(reason.to_string())));
        self
    }

    /// Opening the file channel fails.
    #[must_use]
    pub fn without_file_channel(self) -> Self {
        self.state.lock().unwrap().file_channel_broken = true;
        self
    }

    pub fn put_file(&self, path: &str, contents: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(parent) = Path::new(path).parent() {
            state.add_dir_all(parent);
        }
        state
            .files
            .insert(PathBuf::from(path), contents.as_bytes().to_vec());
    }

    pub fn put_dir(&self, path: &str) {
        self.state.lock().unwrap().add_dir_all(Path::new(path));
    }

    pub fn session(&self) -> FakeSession {
        FakeSession {
            files: FakeFiles {
                state: Arc::clone(&self.state),
            },
            state: Arc::clone(&self.state),
        }
    }

    /// Every command run so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn ran(&self, prefix: &str) -> bool {
        self.commands().iter().any(|c| c.starts_with(prefix))
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(Path::new(path))
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.state.lock().unwrap().dirs.contains(Path::new(path))
    }
}

pub struct FakeSession {
    state: Arc<Mutex<RemoteState>>,
    files: FakeFiles,
}

impl RemoteShell for FakeSession {
    fn run(&mut self, command: &str) -> Result<String, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.commands.push(command.to_string());
        let scripted = state
            .responses
            .iter()
            .rev()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, result)| result.clone());
        match scripted {
            None => Ok(String::new()),
            Some(Scripted::Output(stdout)) => Ok(stdout),
            Some(Scripted::Failure(stderr)) => Err(RemoteError::Command {
                command: command.to_string(),
                status: Some(1),
                output: stderr,
            }),
            Some(Scripted::Dropped(reason)) => Err(RemoteError::Transport(reason)),
        }
    }
}

impl RemoteSession for FakeSession {
    type Files = FakeFiles;

    fn file_channel(&mut self) -> Result<&mut FakeFiles, RemoteError> {
        if self.state.lock().unwrap().file_channel_broken {
            return Err(RemoteError::Transport(
                "subsystem request failed".to_string(),
            ));
        }
        Ok(&mut self.files)
    }
}

pub struct FakeFiles {
    state: Arc<Mutex<RemoteState>>,
}

impl FileChannel for FakeFiles {
    fn create_dir_all(&mut self, path: &Path) -> Result<(), RemoteError> {
        self.state.lock().unwrap().add_dir_all(path);
        Ok(())
    }

    fn write_file(&mut self, path: &Path, contents: &mut dyn Read) -> Result<u64, RemoteError> {
        let mut state = self.state.lock().unwrap();
        let parent = path.parent().unwrap_or(Path::new("/"));
        if !state.dirs.contains(parent) {
            return Err(RemoteError::NotFound(parent.to_path_buf()));
        }
        let mut bytes = Vec::new();
        contents
            .read_to_end(&mut bytes)
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let len = bytes.len() as u64;
        state.files.insert(path.to_path_buf(), bytes);
        Ok(len)
    }

    fn remove_file(&mut self, path: &Path) -> Result<(), RemoteError> {
        match self.state.lock().unwrap().files.remove(path) {
            Some(_) => Ok(()),
            None => Err(RemoteError::NotFound(path.to_path_buf())),
        }
    }

    fn remove_dir(&mut self, path: &Path) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        if !state.dirs.contains(path) {
            return Err(RemoteError::NotFound(path.to_path_buf()));
        }
        if state.has_children(path) {
            return Err(RemoteError::NotEmpty(path.to_path_buf()));
        }
        state.dirs.remove(path);
        Ok(())
    }
}

// ── Fake connector ────────────────────────────────────────────────────────────

/// Hands out sessions to the remote registered for each host. Unknown hosts
/// are unreachable. Clones share the connection log.
#[derive(Default, Clone)]
pub struct FakeConnector {
    hosts: HashMap<String, FakeRemote>,
    connects: Arc<Mutex<Vec<ConnectionParams>>>,
}

impl FakeConnector {
    #[must_use]
    pub fn host(mut self, host: &str, remote: FakeRemote) -> Self {
        self.hosts.insert(host.to_string(), remote);
        self
    }

    pub fn connects(&self) -> Vec<ConnectionParams> {
        self.connects.lock().unwrap().clone()
    }
}

impl Connector for FakeConnector {
    type Session = FakeSession;

    fn connect(&self, params: &ConnectionParams) -> Result<FakeSession, ConnectError> {
        self.connects.lock().unwrap().push(params.clone());
        self.hosts
            .get(&params.host)
            .map(FakeRemote::session)
            .ok_or_else(|| ConnectError::Network {
                addr: format!("{}:{}", params.host, params.port),
                reason: "connection refused".to_string(),
            })
    }
}

// ── Progress recorders ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn texts(&self, severity: Severity) -> Vec<String> {
        self.events()
            .iter()
            .filter(|e| e.severity() == severity)
            .map(|e| e.text().to_string())
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.texts(Severity::Error)
    }
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Default)]
pub struct RecordingRenderer {
    pub events: Vec<ProgressEvent>,
}

impl EventRenderer for RecordingRenderer {
    fn render(&mut self, event: &ProgressEvent) {
        self.events.push(event.clone());
    }
}

// ── Config helpers ────────────────────────────────────────────────────────────

/// A minimal valid service on `host`.
pub fn service_config(host: &str) -> ServiceConfig {
    ServiceConfig {
        user: Some("app".to_string()),
        host: Some(host.to_string()),
        private_key_path: Some(PathBuf::from("/keys/id_ed25519")),
        go_install: Some("github.com/acme/shop/cmd/api@latest".to_string()),
        ..ServiceConfig::default()
    }
}

/// `raw` resolved for service `name` against [`HOME`].
pub fn resolved(name: &str, raw: &ServiceConfig) -> Arc<ResolvedConfig> {
    let params = config::connection_params(name, raw, &LocalEnvironment::default(), CONFIG_FILE)
        .expect("connection params");
    Arc::new(config::resolve(name, raw, params, HOME, CONFIG_FILE).expect("resolve"))
}
