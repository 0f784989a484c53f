//! Git commands run by a sync cycle.
//!
//! The `git` binary is executed directly, without a shell: arguments reach
//! it as-is, and its stdout/stderr are streamed to the host's as they arrive.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;

use super::SyncError;

/// Remote repository holding the site content
pub const DEFAULT_REMOTE_URL: &str = "https://github.com/homebrew-college-club/vercel-college.git";

/// One clone-or-pull operation against the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncCommand {
    /// `git clone --depth 1 --single-branch <url> <target>`
    Clone { url: String, target: PathBuf },

    /// `git pull`, run inside `dir`
    Pull { dir: PathBuf },
}

impl SyncCommand {
    /// Pick the command for a content directory: pull if it is already a
    /// directory, shallow clone otherwise.
    pub fn plan(content_dir: &Path, remote_url: &str) -> Self {
        if content_dir.is_dir() {
            SyncCommand::Pull {
                dir: content_dir.to_path_buf(),
            }
        } else {
            SyncCommand::Clone {
                url: remote_url.to_string(),
                target: content_dir.to_path_buf(),
            }
        }
    }

    /// Arguments passed to git
    pub fn args(&self) -> Vec<OsString> {
        match self {
            SyncCommand::Clone { url, target } => vec![
                "clone".into(),
                "--depth".into(),
                "1".into(),
                "--single-branch".into(),
                url.into(),
                target.into(),
            ],
            SyncCommand::Pull { .. } => vec!["pull".into()],
        }
    }

    /// Directory the command runs in (inherits the host's when `None`)
    pub fn working_dir(&self) -> Option<&Path> {
        match self {
            SyncCommand::Clone { .. } => None,
            SyncCommand::Pull { dir } => Some(dir),
        }
    }

    /// The content directory this command leaves behind
    pub fn content_dir(&self) -> &Path {
        match self {
            SyncCommand::Clone { target, .. } => target,
            SyncCommand::Pull { dir } => dir,
        }
    }

    pub fn is_clone(&self) -> bool {
        matches!(self, SyncCommand::Clone { .. })
    }
}

impl fmt::Display for SyncCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncCommand::Clone { url, target } => write!(
                f,
                "git clone --depth 1 --single-branch {} {}",
                url,
                target.display()
            ),
            SyncCommand::Pull { dir } => write!(f, "git pull (in {})", dir.display()),
        }
    }
}

/// Executes sync commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion; succeed iff it exits with status 0
    async fn run(&self, command: &SyncCommand) -> Result<(), SyncError>;
}

/// Runs sync commands through the `git` binary
pub struct GitRunner {
    /// Path to the git binary (default: "git")
    binary_path: String,
}

impl Default for GitRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl GitRunner {
    pub fn new() -> Self {
        Self::with_binary_path("git")
    }

    /// Create a runner with a custom binary path
    pub fn with_binary_path(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    pub fn binary_path(&self) -> &str {
        &self.binary_path
    }
}

impl GitRunner {
    /// Run a command, streaming its stdout and stderr into the given sinks
    pub async fn run_with_output<O, E>(
        &self,
        command: &SyncCommand,
        stdout: O,
        stderr: E,
    ) -> Result<(), SyncError>
    where
        O: AsyncWrite + Unpin + Send,
        E: AsyncWrite + Unpin + Send,
    {
        let mut process = Command::new(&self.binary_path);
        process
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = command.working_dir() {
            process.current_dir(dir);
        }

        let mut child = process.spawn().map_err(|source| SyncError::Spawn {
            command: command.to_string(),
            source,
        })?;

        let child_stdout = child.stdout.take();
        let child_stderr = child.stderr.take();

        // Exit status is only reported once both pipes are drained
        let (status, out, err) = tokio::join!(
            child.wait(),
            forward_opt(child_stdout, stdout),
            forward_opt(child_stderr, stderr),
        );

        for result in [out, err] {
            if let Err(e) = result {
                tracing::debug!("Failed to forward git output: {}", e);
            }
        }

        let status = status?;
        if !status.success() {
            return Err(SyncError::CommandFailed {
                command: command.to_string(),
                exit_code: status.code().unwrap_or(-1),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl CommandRunner for GitRunner {
    async fn run(&self, command: &SyncCommand) -> Result<(), SyncError> {
        self.run_with_output(command, tokio::io::stdout(), tokio::io::stderr())
            .await
    }
}

async fn forward_opt<R, W>(reader: Option<R>, writer: W) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match reader {
        Some(reader) => forward(reader, writer).await,
        None => Ok(()),
    }
}

/// Copy a child stream to a host stream chunk by chunk, flushing each chunk.
///
/// After a write error the rest of the stream is still read and discarded,
/// so the child never blocks on a full pipe.
async fn forward<R, W>(mut reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    use tokio::io::AsyncReadExt;

    let mut buf = [0u8; 8192];
    let mut written = Ok(());
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        if written.is_ok() {
            written = match writer.write_all(&buf[..n]).await {
                Ok(()) => writer.flush().await,
                Err(e) => Err(e),
            };
        }
    }
    written
}
