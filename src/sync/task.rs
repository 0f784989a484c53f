//! The periodic sync loop and its cancellation handle.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::command::{CommandRunner, GitRunner, SyncCommand, DEFAULT_REMOTE_URL};
use super::SyncError;

/// Time between the end of one cycle and the start of the next
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Settings for the sync loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Repository to clone from
    pub remote_url: String,

    /// Delay between cycles
    pub interval: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// Receives the outcome of every background cycle
pub trait SyncObserver: Send + Sync {
    fn cycle_succeeded(&self, cycle: u64, command: &SyncCommand);

    /// `error` is always [`SyncError::Background`]
    fn cycle_failed(&self, error: &SyncError);
}

/// Reports cycle outcomes through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SyncObserver for TracingObserver {
    fn cycle_succeeded(&self, cycle: u64, command: &SyncCommand) {
        tracing::debug!("Content sync #{} finished: {}", cycle, command);
    }

    fn cycle_failed(&self, error: &SyncError) {
        tracing::error!("{}", error);
    }
}

/// Snapshot of the loop's progress
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    /// Cycles finished, successful or not
    pub cycles: u64,
    pub failures: u64,
    pub last_command: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl SyncStatus {
    fn record(&mut self, command: &SyncCommand, result: &Result<(), SyncError>) {
        self.cycles += 1;
        self.last_command = Some(command.to_string());
        match result {
            Ok(()) => {
                self.last_success_at = Some(Utc::now());
                self.last_error = None;
            }
            Err(e) => {
                self.failures += 1;
                self.last_error = Some(e.to_string());
            }
        }
    }
}

/// State shared between the handle and the background task
#[derive(Debug, Default)]
struct Shared {
    cancelled: AtomicBool,
    wake: Notify,
    status: Mutex<SyncStatus>,
}

impl Shared {
    fn status(&self) -> MutexGuard<'_, SyncStatus> {
        self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Keeps a content directory in sync with the remote repository
pub struct SyncLoop {
    settings: SyncSettings,
    runner: Arc<dyn CommandRunner>,
    observer: Arc<dyn SyncObserver>,
}

impl SyncLoop {
    /// Create a loop that runs git and logs background outcomes
    pub fn new(settings: SyncSettings) -> Self {
        Self {
            settings,
            runner: Arc::new(GitRunner::new()),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the command runner
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replace the observer receiving background outcomes
    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Run a single cycle against `content_dir` and return the command run
    pub async fn sync_once(&self, content_dir: &Path) -> Result<SyncCommand, SyncError> {
        let (command, result) =
            run_cycle(self.runner.as_ref(), &self.settings.remote_url, content_dir).await;
        result.map(|()| command)
    }

    /// Sync once, then keep syncing in the background.
    ///
    /// Resolves only after the first cycle has finished. If it failed, the
    /// error is returned as [`SyncError::Startup`] and nothing is scheduled.
    /// Must be called from within a tokio runtime.
    pub async fn start(&self, content_dir: impl Into<PathBuf>) -> Result<SyncHandle, SyncError> {
        let content_dir = content_dir.into();
        let shared = Arc::new(Shared::default());

        let (command, result) =
            run_cycle(self.runner.as_ref(), &self.settings.remote_url, &content_dir).await;
        shared.status().record(&command, &result);
        result.map_err(|e| SyncError::Startup(Box::new(e)))?;

        let task = tokio::spawn(run_background(
            Arc::clone(&shared),
            Arc::clone(&self.runner),
            Arc::clone(&self.observer),
            self.settings.clone(),
            content_dir.clone(),
        ));

        Ok(SyncHandle {
            content_dir,
            shared,
            task,
        })
    }
}

/// One clone-or-pull, returning the command alongside its result
async fn run_cycle(
    runner: &dyn CommandRunner,
    remote_url: &str,
    content_dir: &Path,
) -> (SyncCommand, Result<(), SyncError>) {
    tracing::info!("Syncing content files from git");

    let command = SyncCommand::plan(content_dir, remote_url);
    let result = runner.run(&command).await;
    (command, result)
}

/// Background loop: sleep, sync, repeat until cancelled.
///
/// Cancellation is checked before each sleep is armed; a cycle in flight
/// always runs to completion.
async fn run_background(
    shared: Arc<Shared>,
    runner: Arc<dyn CommandRunner>,
    observer: Arc<dyn SyncObserver>,
    settings: SyncSettings,
    content_dir: PathBuf,
) {
    let mut cycle: u64 = 1;

    loop {
        if shared.is_cancelled() {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(settings.interval) => {}
            _ = shared.wake.notified() => {
                if shared.is_cancelled() {
                    break;
                }
                continue;
            }
        }

        cycle += 1;
        let (command, result) =
            run_cycle(runner.as_ref(), &settings.remote_url, &content_dir).await;
        shared.status().record(&command, &result);

        match result {
            Ok(()) => observer.cycle_succeeded(cycle, &command),
            Err(e) => observer.cycle_failed(&SyncError::Background {
                cycle,
                source: Box::new(e),
            }),
        }
    }

    tracing::info!("Content sync stopped");
}

/// Handle to the background sync loop.
///
/// Dropping the handle detaches the loop; call [`SyncHandle::cancel`] or
/// [`SyncHandle::stop`] to end it.
#[derive(Debug)]
pub struct SyncHandle {
    content_dir: PathBuf,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Stop scheduling further cycles. Safe to call any number of times.
    pub fn cancel(&self) {
        if !self.shared.cancelled.swap(true, Ordering::SeqCst) {
            tracing::debug!("Cancelling content sync for {}", self.content_dir.display());
        }
        self.shared.wake.notify_one();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }

    /// Directory being kept in sync
    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// Snapshot of cycle counters
    pub fn status(&self) -> SyncStatus {
        self.shared.status().clone()
    }

    /// Wait for the background task to exit (after a cycle in flight
    /// finishes) and return the final status
    pub async fn join(self) -> Result<SyncStatus, SyncError> {
        self.task.await?;
        Ok(self.shared.status().clone())
    }

    /// Cancel and wait for the background task to exit
    pub async fn stop(self) -> Result<SyncStatus, SyncError> {
        self.cancel();
        self.join().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct AlwaysOk;

    #[async_trait]
    impl CommandRunner for AlwaysOk {
        async fn run(&self, command: &SyncCommand) -> Result<(), SyncError> {
            if let SyncCommand::Clone { target, .. } = command {
                std::fs::create_dir_all(target)?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = SyncSettings::default();
        assert_eq!(settings.remote_url, DEFAULT_REMOTE_URL);
        assert_eq!(settings.interval, Duration::from_secs(60));
    }

    #[test]
    fn test_status_records_failures() {
        let mut status = SyncStatus::default();
        let command = SyncCommand::Pull {
            dir: PathBuf::from("/tmp/x"),
        };

        status.record(&command, &Ok(()));
        assert_eq!(status.cycles, 1);
        assert!(status.last_success_at.is_some());

        status.record(
            &command,
            &Err(SyncError::CommandFailed {
                command: command.to_string(),
                exit_code: 1,
            }),
        );
        assert_eq!(status.cycles, 2);
        assert_eq!(status.failures, 1);
        assert!(status.last_error.unwrap().contains("exit code 1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let temp = tempfile::TempDir::new().unwrap();
        let sync = SyncLoop::new(SyncSettings::default()).with_runner(Arc::new(AlwaysOk));

        let handle = sync.start(temp.path().join("content")).await.unwrap();
        assert!(!handle.is_cancelled());

        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());

        handle.join().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_once_does_not_schedule() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("content");
        let sync = SyncLoop::new(SyncSettings::default()).with_runner(Arc::new(AlwaysOk));

        let first = sync.sync_once(&dir).await.unwrap();
        assert!(first.is_clone());

        let second = sync.sync_once(&dir).await.unwrap();
        assert_eq!(second, SyncCommand::Pull { dir });
    }
}
