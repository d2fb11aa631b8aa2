use crate::inspect::PathProbe;
use crate::secret::ResolvedCredential;
use crate::{DriveLetter, DriveType};
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

cfg_if::cfg_if! {
    if #[cfg(target_os = "windows")] {
        mod windows;
        pub use windows::WindowsPlatform as NativePlatform;
    } else if #[cfg(target_family = "unix")] {
        mod unix;
        pub use unix::UnsupportedPlatform as NativePlatform;
    } else {
        compile_error!("unsupported platform");
    }
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("drive mapping is not supported on this platform")]
    Unsupported,
    #[error("{call} failed with error code {code}")]
    Os { call: &'static str, code: u32 },
    #[error("General Error '{0}'")]
    General(String),
}

/// What the OS reports for the logical disk at a drive letter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Observation {
    pub device_id: String,
    pub volume_label: Option<String>,
    pub drive_type: DriveType,
    /// Remote target the letter is bound to, for network drives.
    pub provider_name: Option<String>,
}

impl Observation {
    pub fn network(device_id: impl Into<String>, provider_name: impl Into<String>) -> Self {
        Observation {
            device_id: device_id.into(),
            volume_label: None,
            drive_type: DriveType::Network,
            provider_name: Some(provider_name.into()),
        }
    }

    pub fn local(device_id: impl Into<String>, drive_type: DriveType) -> Self {
        Observation {
            device_id: device_id.into(),
            volume_label: None,
            drive_type,
            provider_name: None,
        }
    }
}

/// The OS drive-mapping table.
///
/// `detach` and `attach` are the only mutating calls a reconciliation run
/// makes.
pub trait Platform: PathProbe {
    fn query_logical_disk(
        &self,
        letter: &DriveLetter,
    ) -> Result<Option<Observation>, PlatformError>;

    fn detach(&mut self, letter: &DriveLetter) -> Result<(), PlatformError>;

    /// Creates a persistent mapping from `letter` to `remote`.
    fn attach(
        &mut self,
        letter: &DriveLetter,
        remote: &str,
        credential: Option<&ResolvedCredential>,
    ) -> Result<(), PlatformError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    Mounted,
    Disconnected,
    Unknown,
}

/// Probes a path with a metadata call.
///
/// Permission errors still prove the path is there.
pub fn check_status(path: &Path) -> PathStatus {
    match std::fs::metadata(path) {
        Ok(_) => PathStatus::Mounted,
        Err(e) => match e.kind() {
            ErrorKind::NotFound
            | ErrorKind::TimedOut
            | ErrorKind::NetworkDown
            | ErrorKind::NotConnected => PathStatus::Disconnected,

            ErrorKind::PermissionDenied => PathStatus::Mounted,

            _ => PathStatus::Unknown,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_directory_is_mounted() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(check_status(dir.path()), PathStatus::Mounted);
    }

    #[test]
    fn missing_path_is_disconnected() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(check_status(&dir.path().join("gone")), PathStatus::Disconnected);
    }

    #[test]
    fn observation_constructors() {
        let net = Observation::network("Z:", r"\\S\Docs");
        assert!(net.drive_type.is_network());
        assert_eq!(net.provider_name.as_deref(), Some(r"\\S\Docs"));
        let local = Observation::local("C:", DriveType::Fixed);
        assert!(local.provider_name.is_none());
    }
}
