//! Device session state for one run of the inspector.
//!
//! A [`DeviceSession`] wraps the adb transport with device-level
//! operations: presence checking, ABI detection, staging of the toybox
//! helper binary, and thin file transfer wrappers. The "helper staged"
//! flag lives on the session value and is set at most once per run; it
//! is never re-verified or implicitly reset.
//!
//! The session assumes exactly one relevant connected device; it does
//! not manage multiple concurrent device connections.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::adb::{Adb, AdbError};
use crate::config::DroidlensConfig;

/// Errors from device-session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// No entry in `adb devices` reported the `device` status.
    #[error("no connected Android device found (check `adb devices` and USB debugging)")]
    NoDeviceConnected,

    /// The adb invocation itself exited non-zero.
    #[error("adb {command} failed: {message}")]
    InvocationFailed { command: String, message: String },

    /// Transport-level failure.
    #[error(transparent)]
    Adb(#[from] AdbError),
}

/// One row of the `adb devices` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    /// Serial number (e.g. `emulator-5554`).
    pub serial: String,
    /// Reported status (`device`, `offline`, `unauthorized`, ...).
    pub status: String,
}

impl DeviceEntry {
    /// Whether the device is usable for capture.
    pub fn is_connected(&self) -> bool {
        self.status == "device"
    }
}

/// Parses the body of `adb devices` output into entries.
///
/// The header line is skipped; each remaining non-empty line is split
/// on whitespace with the last field taken as the status.
pub fn parse_device_list(stdout: &str) -> Vec<DeviceEntry> {
    stdout
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let serial = fields.next()?.to_string();
            let status = fields.last()?.to_string();
            Some(DeviceEntry { serial, status })
        })
        .collect()
}

/// Maps an `ro.product.cpu.abi` value to a helper architecture tag,
/// applying substring rules in fixed priority order.
pub fn helper_arch_for_abi(abi: &str) -> Option<&'static str> {
    let lower = abi.to_lowercase();
    if lower.contains("arm64") {
        Some("aarch64")
    } else if lower.contains("armeabi-v7") || lower.contains("armeabi_v7") || lower.contains("armv7")
    {
        Some("armv7l")
    } else if lower.contains("armeabi") {
        Some("armv5l")
    } else if lower.starts_with("x86_64") {
        Some("x86_64")
    } else if lower.starts_with("x86") {
        Some("i686")
    } else if lower.contains("mips64") {
        Some("mips64")
    } else if lower.contains("mipsel") {
        Some("mipsel")
    } else if lower.contains("mips") {
        Some("mips")
    } else if lower.contains("riscv64") {
        Some("riscv64")
    } else if lower.contains("riscv32") || lower.contains("riscv") {
        Some("riscv32")
    } else {
        None
    }
}

/// Maps a `uname -m` machine string to a helper architecture tag.
///
/// Only the ARM families need translation; other machine strings are
/// tried verbatim as a tag by the caller first.
pub fn helper_arch_for_machine(machine: &str) -> Option<&'static str> {
    let lower = machine.to_lowercase();
    if lower.starts_with("armv7") {
        Some("armv7l")
    } else if lower.starts_with("armv5") {
        Some("armv5l")
    } else if lower.starts_with("armv4") {
        Some("armv4l")
    } else {
        None
    }
}

/// Process-wide device state for the duration of one run.
#[derive(Debug)]
pub struct DeviceSession {
    adb: Adb,
    /// Local directory holding `toybox-<arch>` binaries.
    helper_dir: PathBuf,
    /// Where the helper lands on the device.
    helper_remote_path: String,
    /// Set once by [`ensure_helper_staged`](Self::ensure_helper_staged).
    helper_staged: bool,
}

impl DeviceSession {
    /// Creates a session over the given transport.
    pub fn new(adb: Adb, helper_dir: PathBuf, helper_remote_path: impl Into<String>) -> Self {
        Self {
            adb,
            helper_dir,
            helper_remote_path: helper_remote_path.into(),
            helper_staged: false,
        }
    }

    /// Creates a session from the persisted user configuration.
    pub fn with_defaults() -> Self {
        Self::from_config(&DroidlensConfig::load())
    }

    /// Creates a session from an explicit configuration.
    pub fn from_config(config: &DroidlensConfig) -> Self {
        Self::new(
            Adb::new(config.adb_path.clone()),
            config.helper_dir(),
            config.helper_remote_path.clone(),
        )
    }

    /// The underlying transport.
    pub fn adb(&self) -> &Adb {
        &self.adb
    }

    /// Whether the helper binary was staged during this run.
    pub fn helper_staged(&self) -> bool {
        self.helper_staged
    }

    /// Verifies that a usable device is connected.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvocationFailed`] if `adb devices` itself errors
    /// - [`SessionError::NoDeviceConnected`] if no entry has the
    ///   `device` status
    pub async fn ensure_device_connected(&self) -> Result<(), SessionError> {
        let out = self.adb.run_default(&["devices"]).await?;
        if !out.success() {
            return Err(SessionError::InvocationFailed {
                command: "devices".to_string(),
                message: out.message(),
            });
        }
        if parse_device_list(&out.stdout)
            .iter()
            .any(DeviceEntry::is_connected)
        {
            Ok(())
        } else {
            Err(SessionError::NoDeviceConnected)
        }
    }

    /// Reads the device ABI property.
    ///
    /// Returns `None` when the command fails or the property is empty;
    /// older systems sometimes report nothing here, which is why
    /// [`select_helper_binary`](Self::select_helper_binary) has a
    /// kernel-machine fallback.
    pub async fn detect_abi(&self) -> Result<Option<String>, AdbError> {
        let out = self
            .adb
            .run_default(&["shell", "getprop", "ro.product.cpu.abi"])
            .await?;
        if !out.success() {
            return Ok(None);
        }
        let abi = out.stdout.trim();
        Ok((!abi.is_empty()).then(|| abi.to_string()))
    }

    /// Resolves the local helper binary matching the device
    /// architecture, trying the ABI property first and `uname -m`
    /// second. Returns `None` when no bundled `toybox-<arch>` file
    /// matches.
    pub async fn select_helper_binary(&self) -> Option<PathBuf> {
        if let Ok(Some(abi)) = self.detect_abi().await {
            if let Some(arch) = helper_arch_for_abi(&abi) {
                let candidate = self.helper_dir.join(format!("toybox-{arch}"));
                if candidate.exists() {
                    return Some(candidate);
                }
            }
        }

        let out = self.adb.run_default(&["shell", "uname", "-m"]).await.ok()?;
        if !out.success() {
            return None;
        }
        let machine = out.stdout.trim();
        if machine.is_empty() {
            return None;
        }

        let candidate = self.helper_dir.join(format!("toybox-{machine}"));
        if candidate.exists() {
            return Some(candidate);
        }
        if let Some(arch) = helper_arch_for_machine(machine) {
            let candidate = self.helper_dir.join(format!("toybox-{arch}"));
            if candidate.exists() {
                return Some(candidate);
            }
        }
        None
    }

    /// Pushes the helper binary to its fixed remote path and marks it
    /// executable, once per session.
    ///
    /// Misses are silent by contract: no matching local binary, a
    /// failed push, or a failed chmod leave the staged flag false and
    /// log a warning. Downstream operations that need the helper must
    /// check [`helper_staged`](Self::helper_staged) rather than assume
    /// success.
    pub async fn ensure_helper_staged(&mut self) -> Result<(), AdbError> {
        if self.helper_staged {
            return Ok(());
        }

        let Some(local) = self.select_helper_binary().await else {
            warn!(dir = %self.helper_dir.display(), "no matching helper binary bundled");
            return Ok(());
        };

        let remote = self.helper_remote_path.clone();
        if !self.push_file(&local, &remote).await? {
            warn!(local = %local.display(), remote, "helper push failed");
            return Ok(());
        }

        let chmod = self
            .adb
            .run_default(&["shell", "chmod", "755", &remote])
            .await?;
        if chmod.success() {
            debug!(remote, "helper binary staged");
            self.helper_staged = true;
        } else {
            warn!(remote, message = %chmod.message(), "helper chmod failed");
        }
        Ok(())
    }

    /// Lists all files under a remote directory, recursively.
    ///
    /// Failure is downgraded to a warning and an empty list; the
    /// listing is advisory.
    pub async fn list_remote_files(&self, remote_path: &str) -> Result<Vec<String>, AdbError> {
        let out = self
            .adb
            .run_default(&["shell", "find", remote_path, "-type", "f"])
            .await?;
        if !out.success() {
            warn!(remote_path, message = %out.message(), "list_remote_files failed");
            return Ok(Vec::new());
        }
        Ok(out
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("find:"))
            .map(str::to_string)
            .collect())
    }

    /// Pulls a file from the device, creating local parent directories
    /// as needed. Returns whether the pull succeeded.
    pub async fn pull_file(&self, remote_path: &str, local_path: &Path) -> Result<bool, AdbError> {
        if let Some(parent) = local_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let local = local_path.to_string_lossy();
        let out = self
            .adb
            .run_default(&["pull", remote_path, local.as_ref()])
            .await?;
        Ok(out.success())
    }

    /// Pushes a local file to the device. Returns whether the push
    /// succeeded.
    pub async fn push_file(&self, local_path: &Path, remote_path: &str) -> Result<bool, AdbError> {
        let local = local_path.to_string_lossy();
        let out = self
            .adb
            .run_default(&["push", local.as_ref(), remote_path])
            .await?;
        Ok(out.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_CONNECTED: &str = "List of devices attached\nemulator-5554\tdevice\n\n";
    const LISTING_OFFLINE: &str = "List of devices attached\nemulator-5554\toffline\n\n";
    const LISTING_MIXED: &str =
        "List of devices attached\nemulator-5554\toffline\nR58M12ABCDE\tdevice\n";

    #[test]
    fn parse_device_list_skips_header_and_blanks() {
        let entries = parse_device_list(LISTING_CONNECTED);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].serial, "emulator-5554");
        assert_eq!(entries[0].status, "device");
        assert!(entries[0].is_connected());
    }

    #[test]
    fn offline_entry_is_not_connected() {
        let entries = parse_device_list(LISTING_OFFLINE);
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].is_connected());
    }

    #[test]
    fn mixed_listing_finds_the_connected_device() {
        let entries = parse_device_list(LISTING_MIXED);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(DeviceEntry::is_connected));
        assert_eq!(
            entries.iter().find(|e| e.is_connected()).unwrap().serial,
            "R58M12ABCDE"
        );
    }

    #[test]
    fn empty_listing_has_no_entries() {
        assert!(parse_device_list("List of devices attached\n").is_empty());
    }

    #[test]
    fn abi_mapping_priority() {
        assert_eq!(helper_arch_for_abi("arm64-v8a"), Some("aarch64"));
        assert_eq!(helper_arch_for_abi("armeabi-v7a"), Some("armv7l"));
        assert_eq!(helper_arch_for_abi("armeabi"), Some("armv5l"));
        assert_eq!(helper_arch_for_abi("x86_64"), Some("x86_64"));
        assert_eq!(helper_arch_for_abi("x86"), Some("i686"));
        assert_eq!(helper_arch_for_abi("mips64el"), Some("mips64"));
        assert_eq!(helper_arch_for_abi("mipsel"), Some("mipsel"));
        assert_eq!(helper_arch_for_abi("mips"), Some("mips"));
        assert_eq!(helper_arch_for_abi("riscv64"), Some("riscv64"));
        assert_eq!(helper_arch_for_abi("riscv32"), Some("riscv32"));
        assert_eq!(helper_arch_for_abi("sparc"), None);
    }

    #[test]
    fn abi_mapping_is_case_insensitive() {
        assert_eq!(helper_arch_for_abi("ARM64-V8A"), Some("aarch64"));
    }

    #[test]
    fn machine_mapping_covers_arm_families() {
        assert_eq!(helper_arch_for_machine("armv7l"), Some("armv7l"));
        assert_eq!(helper_arch_for_machine("armv7a"), Some("armv7l"));
        assert_eq!(helper_arch_for_machine("armv5tel"), Some("armv5l"));
        assert_eq!(helper_arch_for_machine("armv4tl"), Some("armv4l"));
        assert_eq!(helper_arch_for_machine("aarch64"), None);
    }

    #[tokio::test]
    async fn staging_miss_is_silent_and_leaves_flag_false() {
        // No reachable adb and no bundled binaries: staging must not
        // error, and the flag must stay false.
        let dir = tempfile::tempdir().unwrap();
        let mut session = DeviceSession::new(
            Adb::new("droidlens-definitely-not-a-real-binary"),
            dir.path().to_path_buf(),
            "/data/local/tmp/toybox",
        );
        session.ensure_helper_staged().await.unwrap();
        assert!(!session.helper_staged());
    }

    #[tokio::test]
    async fn ensure_device_surfaces_tool_not_found() {
        let session = DeviceSession::new(
            Adb::new("droidlens-definitely-not-a-real-binary"),
            PathBuf::from("/tmp"),
            "/data/local/tmp/toybox",
        );
        let result = session.ensure_device_connected().await;
        assert!(matches!(
            result,
            Err(SessionError::Adb(AdbError::ToolNotFound))
        ));
    }
}
