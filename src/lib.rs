//! Reconciles mapped network drives against a declarative list.
//!
//! A run takes a list of [`MountSpec`]s, rejects it outright if it is not
//! valid, then inspects what the operating system currently has bound to
//! each drive letter and corrects any drift, producing one [`MountOutcome`]
//! per spec. Nothing is persisted between runs; all state is re-derived from
//! the OS each time.
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod config;
pub mod inspect;
pub mod journal;
pub mod platform;
pub mod reconcile;
pub mod secret;

pub use config::{ConfigError, load_specs, validate_specs};
pub use inspect::{Inspection, NotMountedReason, PathProbe, inspect};
pub use platform::{Observation, Platform, PlatformError};
pub use reconcile::{FailureReason, MountOutcome, MountStatus, Reconciler};
pub use secret::{
    Credential, EnvResolver, ResolvedCredential, SecretError, SecretResolver, SecretSource,
};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid drive letter '{0}', expected a single uppercase letter followed by ':'")]
pub struct InvalidDriveLetter(pub String);

/// A validated drive letter such as `Z:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriveLetter(String);

impl DriveLetter {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Root directory of the letter (`Z:\`), used for accessibility probes.
    pub fn root(&self) -> String {
        format!("{}\\", self.0)
    }
}

impl FromStr for DriveLetter {
    type Err = InvalidDriveLetter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() == 2 && bytes[0].is_ascii_uppercase() && bytes[1] == b':' {
            Ok(DriveLetter(s.to_string()))
        } else {
            Err(InvalidDriveLetter(s.to_string()))
        }
    }
}

impl fmt::Display for DriveLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One desired mapping from a drive letter to a remote share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub drive_letter: DriveLetter,
    pub remote_path: String,
    pub credential: Option<Credential>,
}

impl MountSpec {
    pub fn new(drive_letter: DriveLetter, remote_path: impl Into<String>) -> Self {
        MountSpec {
            drive_letter,
            remote_path: remote_path.into(),
            credential: None,
        }
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }
}

/// Kind of logical disk bound to a drive letter, as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveType {
    #[default]
    Unknown,
    NoRootDir,
    Removable,
    Fixed,
    Network,
    CdRom,
    RamDisk,
}

impl DriveType {
    /// Maps a Win32 `DRIVE_*` code.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => DriveType::NoRootDir,  // DRIVE_NO_ROOT_DIR
            2 => DriveType::Removable,  // DRIVE_REMOVABLE
            3 => DriveType::Fixed,      // DRIVE_FIXED
            4 => DriveType::Network,    // DRIVE_REMOTE
            5 => DriveType::CdRom,      // DRIVE_CDROM
            6 => DriveType::RamDisk,    // DRIVE_RAMDISK
            _ => DriveType::Unknown,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, DriveType::Network)
    }
}

impl fmt::Display for DriveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriveType::Unknown => "unknown",
            DriveType::NoRootDir => "no root directory",
            DriveType::Removable => "removable",
            DriveType::Fixed => "fixed",
            DriveType::Network => "network",
            DriveType::CdRom => "cd-rom",
            DriveType::RamDisk => "ram disk",
        };
        f.write_str(name)
    }
}
