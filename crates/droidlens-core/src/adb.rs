//! Subprocess transport around the `adb` executable.
//!
//! Every device operation in this crate bottoms out here: each call
//! spawns a fresh `adb` process with an explicit timeout and returns
//! the captured output. There is no persistent connection state.
//!
//! Text output is decoded permissively (invalid UTF-8 is replaced, never
//! fatal). Screenshot capture is the one binary path: `exec-out
//! screencap -p` writes PNG bytes to stdout, which must not go through
//! text decoding.
//!
//! # Example
//!
//! ```no_run
//! use droidlens_core::adb::Adb;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let adb = Adb::new("adb");
//! let out = adb.run_default(&["devices"]).await?;
//! if out.success() {
//!     println!("{}", out.stdout);
//! }
//! # Ok(())
//! # }
//! ```

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Default per-call timeout, matching the adb server's own patience.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the dedicated screenshot path.
const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when invoking adb.
#[derive(Error, Debug)]
pub enum AdbError {
    /// The adb executable could not be located.
    #[error("adb not found - install Android platform-tools and ensure `adb` is on PATH")]
    ToolNotFound,

    /// A command did not finish within its timeout. The child process
    /// is killed on expiry.
    #[error("adb command timed out after {0:?}")]
    Timeout(Duration),

    /// Screenshot capture did not finish within its timeout.
    #[error("screenshot capture timed out after {0:?}")]
    CaptureTimeout(Duration),

    /// A command that must succeed exited non-zero.
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    /// An I/O error occurred while executing the command.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Captured output of one adb invocation.
///
/// Non-zero exit is not an error at this layer; callers inspect
/// [`success`](CmdOutput::success) and decide how to surface failure.
#[derive(Debug, Clone)]
pub struct CmdOutput {
    /// The process exit code (-1 if terminated by a signal).
    pub exit_code: i32,
    /// Captured stdout, lossily decoded.
    pub stdout: String,
    /// Captured stderr, lossily decoded.
    pub stderr: String,
}

impl CmdOutput {
    /// Whether the command exited zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// A human-readable failure message: trimmed stderr, falling back
    /// to stdout when stderr is empty.
    pub fn message(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Handle on an adb executable.
#[derive(Debug, Clone)]
pub struct Adb {
    adb_path: String,
}

impl Adb {
    /// Creates a transport using the given executable path or name.
    pub fn new(adb_path: impl Into<String>) -> Self {
        Self {
            adb_path: adb_path.into(),
        }
    }

    /// The configured executable path.
    pub fn path(&self) -> &str {
        &self.adb_path
    }

    /// Runs `adb <args>` with the given timeout.
    ///
    /// # Errors
    ///
    /// - [`AdbError::ToolNotFound`] if the executable cannot be spawned
    /// - [`AdbError::Timeout`] if the command does not finish in time
    ///   (the child is killed)
    /// - [`AdbError::Io`] for other spawn failures
    pub async fn run(&self, args: &[&str], timeout: Duration) -> Result<CmdOutput, AdbError> {
        debug!(args = ?args, "adb invoke");

        let mut command = tokio::process::Command::new(&self.adb_path);
        command
            .args(args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(result) => result.map_err(|e| Self::classify_spawn_error(e))?,
            Err(_) => return Err(AdbError::Timeout(timeout)),
        };

        Ok(CmdOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Runs `adb <args>` with the [`DEFAULT_TIMEOUT`].
    pub async fn run_default(&self, args: &[&str]) -> Result<CmdOutput, AdbError> {
        self.run(args, DEFAULT_TIMEOUT).await
    }

    /// Captures the device screen to a local PNG file.
    ///
    /// Runs `adb exec-out screencap -p` and writes the raw stdout bytes
    /// to `local_path` in one shot. Text decoding would corrupt the
    /// image data, so this bypasses [`run`](Self::run) entirely.
    ///
    /// # Errors
    ///
    /// - [`AdbError::ToolNotFound`] if the executable cannot be spawned
    /// - [`AdbError::CaptureTimeout`] if capture exceeds its timeout
    ///   (the child is killed)
    /// - [`AdbError::CommandFailed`] with stderr if screencap exits non-zero
    /// - [`AdbError::Io`] if the file cannot be written
    pub async fn capture_screenshot(&self, local_path: &Path) -> Result<(), AdbError> {
        debug!(path = %local_path.display(), "capturing screenshot");

        let mut command = tokio::process::Command::new(&self.adb_path);
        command
            .args(["exec-out", "screencap", "-p"])
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(SCREENSHOT_TIMEOUT, command.output()).await {
            Ok(result) => result.map_err(|e| Self::classify_spawn_error(e))?,
            Err(_) => return Err(AdbError::CaptureTimeout(SCREENSHOT_TIMEOUT)),
        };

        if !output.status.success() {
            return Err(AdbError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        tokio::fs::write(local_path, &output.stdout).await?;
        Ok(())
    }

    fn classify_spawn_error(error: std::io::Error) -> AdbError {
        if error.kind() == ErrorKind::NotFound {
            AdbError::ToolNotFound
        } else {
            AdbError::Io(error)
        }
    }
}
