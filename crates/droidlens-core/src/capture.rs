//! Snapshot capture pipelines.
//!
//! Two mutually exclusive strategies produce a [`Snapshot`] (screenshot
//! file + tree-source file):
//!
//! 1. **Native**: `uiautomator dump` on the device, pulled as
//!    `window_dump.xml`.
//! 2. **Scripted**: an extraction script run inside AutoJs6 on the
//!    device writes a JSON tree, which is polled for and pulled as
//!    `autojs_ui_tree.json`. AutoJs runs the script asynchronously and
//!    offers no completion callback, so this is the one place in the
//!    crate with wait/retry semantics.
//!
//! At most one capture may be in flight at a time: both strategies race
//! on fixed device-side paths, and concurrent captures would corrupt
//! each other's results.
//!
//! # Example
//!
//! ```no_run
//! use droidlens_core::capture::CaptureConfig;
//! use droidlens_core::session::DeviceSession;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = DeviceSession::with_defaults();
//! let snapshot = session.capture_snapshot(&CaptureConfig::default()).await?;
//! println!("screenshot: {}", snapshot.screenshot.display());
//! println!("tree:       {}", snapshot.tree_source.display());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::adb::AdbError;
use crate::config::DroidlensConfig;
use crate::node::TreeFormat;
use crate::session::{DeviceSession, SessionError};

/// Remote path `uiautomator dump` writes to.
const DUMP_REMOTE_PATH: &str = "/sdcard/window_dump.xml";

/// Errors from the capture pipelines. Any hard failure aborts the whole
/// capture attempt.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Device-session failure (no device, listing error, transport).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Transport failure (tool missing, timeout, screenshot error).
    #[error(transparent)]
    Adb(#[from] AdbError),

    /// `uiautomator dump` exited non-zero.
    #[error("uiautomator dump failed: {0}")]
    DumpFailed(String),

    /// Pulling an artifact from the device failed.
    #[error("failed to pull {remote}: {message}")]
    PullFailed { remote: String, message: String },

    /// Pushing the bundled extraction script failed. A stale or missing
    /// on-device script produces silently wrong results, so this is a
    /// hard error.
    #[error(
        "failed to push extraction script to the device\n\
         local script: {local}\ntarget path: {remote}\nadb output: {message}"
    )]
    ScriptPushFailed {
        local: PathBuf,
        remote: String,
        message: String,
    },

    /// The extraction script is not present at its expected device path.
    #[error(
        "extraction script not found on device: {path}\n\
         push get_ui_tree.js to that path or change script_remote_path in the config\n\
         adb output: {message}"
    )]
    ScriptMissingOnDevice { path: String, message: String },

    /// The scripted strategy exhausted its polling budget.
    #[error(
        "timed out waiting for the extraction script to write {path}\n\
         check that AutoJs has accessibility enabled, that the script runs \
         standalone on the device, and that it writes that exact file"
    )]
    ResultTimeout { path: String },

    /// An I/O error occurred preparing local artifacts.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which pipeline produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStrategy {
    /// `uiautomator dump` accessibility tree.
    Native,
    /// AutoJs extraction script tree.
    Scripted,
}

/// The artifact set for one capture.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Local `screenshot.png`.
    pub screenshot: PathBuf,
    /// Local tree-source file (`window_dump.xml` or `autojs_ui_tree.json`).
    pub tree_source: PathBuf,
    /// Which strategy produced the pair.
    pub strategy: CaptureStrategy,
}

impl Snapshot {
    /// The wire format of [`tree_source`](Self::tree_source).
    pub fn tree_format(&self) -> TreeFormat {
        match self.strategy {
            CaptureStrategy::Native => TreeFormat::UiAutomatorXml,
            CaptureStrategy::Scripted => TreeFormat::AutojsJson,
        }
    }
}

/// Settings for one capture run.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Where local artifacts land. `None` means a fresh directory under
    /// the system temp dir.
    pub output_dir: Option<PathBuf>,

    /// Device path the extraction script is launched from.
    pub script_remote_path: String,

    /// Device path the extraction script writes its result to.
    pub result_remote_path: String,

    /// Local extraction script pushed before each scripted capture when
    /// it exists on disk. `None` skips the push.
    pub local_script: Option<PathBuf>,

    /// Package of the on-device automation app.
    pub runner_package: String,

    /// Activity that accepts the script-run intent.
    pub runner_activity: String,

    /// How many times to probe for the scripted result file.
    pub poll_attempts: u32,

    /// Delay between probes.
    pub poll_interval: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let user = DroidlensConfig::default();
        Self {
            output_dir: None,
            script_remote_path: user.script_remote_path,
            result_remote_path: user.result_remote_path,
            local_script: user.local_script,
            runner_package: "org.autojs.autojs6".to_string(),
            runner_activity: "org.autojs.autojs.external.open.RunIntentActivity".to_string(),
            poll_attempts: 30,
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl CaptureConfig {
    /// Builds a capture config from the persisted user configuration.
    pub fn from_user_config(config: &DroidlensConfig) -> Self {
        Self {
            script_remote_path: config.script_remote_path.clone(),
            result_remote_path: config.result_remote_path.clone(),
            local_script: config.local_script.clone(),
            ..Self::default()
        }
    }

    fn resolve_output_dir(&self) -> std::io::Result<PathBuf> {
        let dir = match &self.output_dir {
            Some(dir) => dir.clone(),
            None => std::env::temp_dir().join(format!("droidlens_{}", Uuid::new_v4())),
        };
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

/// State of the bounded fixed-interval poll for the scripted result
/// file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Not started.
    Idle,
    /// Probing; `attempt` probes have been made so far.
    Polling { attempt: u32 },
    /// The result file appeared.
    Found,
    /// The attempt budget is exhausted.
    TimedOut,
}

/// Bounded retry state machine: `Idle -> Polling -> Found | TimedOut`.
///
/// Sans-IO; the capture loop performs the probe and feeds the outcome
/// to [`observe`](ResultPoll::observe), sleeping
/// [`interval`](ResultPoll::interval) between probes while the state
/// stays `Polling`.
#[derive(Debug)]
pub struct ResultPoll {
    max_attempts: u32,
    interval: Duration,
    state: PollState,
}

impl ResultPoll {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            state: PollState::Idle,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Records the outcome of one probe and returns the new state.
    pub fn observe(&mut self, found: bool) -> PollState {
        let attempt = match self.state {
            PollState::Idle => 1,
            PollState::Polling { attempt } => attempt + 1,
            // Terminal states stay terminal.
            PollState::Found | PollState::TimedOut => return self.state,
        };

        self.state = if found {
            PollState::Found
        } else if attempt >= self.max_attempts {
            PollState::TimedOut
        } else {
            PollState::Polling { attempt }
        };
        self.state
    }
}

impl DeviceSession {
    /// Captures a snapshot with the native strategy.
    ///
    /// Ensures a device is connected, captures `screenshot.png`,
    /// triggers `uiautomator dump` to its fixed device-side path, and
    /// pulls the dump as `window_dump.xml`. Any step failing aborts the
    /// capture with the underlying error.
    pub async fn capture_snapshot(&self, config: &CaptureConfig) -> Result<Snapshot, CaptureError> {
        let output_dir = config.resolve_output_dir()?;
        self.ensure_device_connected().await?;

        let screenshot = output_dir.join("screenshot.png");
        self.adb().capture_screenshot(&screenshot).await?;

        let dump = self
            .adb()
            .run_default(&["shell", "uiautomator", "dump", DUMP_REMOTE_PATH])
            .await?;
        if !dump.success() {
            return Err(CaptureError::DumpFailed(dump.message()));
        }

        let tree_source = output_dir.join("window_dump.xml");
        if !self.pull_file(DUMP_REMOTE_PATH, &tree_source).await? {
            return Err(CaptureError::PullFailed {
                remote: DUMP_REMOTE_PATH.to_string(),
                message: "adb pull exited non-zero".to_string(),
            });
        }

        info!(dir = %output_dir.display(), "native snapshot captured");
        Ok(Snapshot {
            screenshot,
            tree_source,
            strategy: CaptureStrategy::Native,
        })
    }

    /// Captures a snapshot with the scripted strategy, delegating tree
    /// extraction to AutoJs6 on the device.
    ///
    /// Pushes the bundled extraction script when one exists locally,
    /// verifies it is present on the device, launches it via intent,
    /// then polls for the result file on a fixed interval before
    /// pulling it as `autojs_ui_tree.json`.
    pub async fn capture_snapshot_via_script(
        &self,
        config: &CaptureConfig,
    ) -> Result<Snapshot, CaptureError> {
        let output_dir = config.resolve_output_dir()?;
        self.ensure_device_connected().await?;

        let screenshot = output_dir.join("screenshot.png");
        self.adb().capture_screenshot(&screenshot).await?;

        if let Some(local) = config.local_script.as_ref().filter(|p| p.exists()) {
            if !self.push_file(local, &config.script_remote_path).await? {
                return Err(CaptureError::ScriptPushFailed {
                    local: local.clone(),
                    remote: config.script_remote_path.clone(),
                    message: "adb push exited non-zero".to_string(),
                });
            }
            debug!(remote = %config.script_remote_path, "extraction script pushed");
        }

        let probe = self
            .adb()
            .run_default(&["shell", "ls", &config.script_remote_path])
            .await?;
        if !probe.success() {
            return Err(CaptureError::ScriptMissingOnDevice {
                path: config.script_remote_path.clone(),
                message: probe.message(),
            });
        }

        self.launch_remote_script(config, &config.script_remote_path)
            .await?;

        let mut poll = ResultPoll::new(config.poll_attempts, config.poll_interval);
        loop {
            let probe = self
                .adb()
                .run_default(&["shell", "ls", &config.result_remote_path])
                .await?;
            match poll.observe(probe.success()) {
                PollState::Found => break,
                PollState::TimedOut => {
                    return Err(CaptureError::ResultTimeout {
                        path: config.result_remote_path.clone(),
                    });
                }
                PollState::Polling { attempt } => {
                    debug!(attempt, "result file not present yet");
                    tokio::time::sleep(poll.interval()).await;
                }
                PollState::Idle => unreachable!("observe never returns Idle"),
            }
        }

        let tree_source = output_dir.join("autojs_ui_tree.json");
        if !self
            .pull_file(&config.result_remote_path, &tree_source)
            .await?
        {
            return Err(CaptureError::PullFailed {
                remote: config.result_remote_path.clone(),
                message: "adb pull exited non-zero".to_string(),
            });
        }

        info!(dir = %output_dir.display(), "scripted snapshot captured");
        Ok(Snapshot {
            screenshot,
            tree_source,
            strategy: CaptureStrategy::Scripted,
        })
    }

    /// Launches a script on the device via the automation app's
    /// run-intent activity.
    ///
    /// The app gives no useful exit status through `am start`, so the
    /// command result is not inspected; completion is observed through
    /// the artifacts the script writes.
    pub async fn launch_remote_script(
        &self,
        config: &CaptureConfig,
        remote_path: &str,
    ) -> Result<(), CaptureError> {
        let component = format!("{}/{}", config.runner_package, config.runner_activity);
        let file_uri = format!("file://{remote_path}");
        self.adb()
            .run_default(&[
                "shell",
                "am",
                "start",
                "-n",
                &component,
                "-d",
                &file_uri,
                "-t",
                "text/javascript",
            ])
            .await?;
        Ok(())
    }
}
