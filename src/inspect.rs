//! Decides whether a drive letter is correctly mounted to a remote path.
use crate::DriveLetter;
use crate::platform::Observation;
use log::debug;
use std::fmt;
use std::path::Path;

/// Filesystem accessibility check.
pub trait PathProbe {
    fn exists(&self, path: &Path) -> bool;
}

impl<P: PathProbe + ?Sized> PathProbe for &P {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }
}

/// Why a letter does not count as mounted, in the order checks are made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotMountedReason {
    NoLogicalDisk,
    TargetMismatch,
    LetterInaccessible,
    RemoteInaccessible,
}

impl fmt::Display for NotMountedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            NotMountedReason::NoLogicalDisk => "no logical disk at this letter",
            NotMountedReason::TargetMismatch => "bound target does not match expected path",
            NotMountedReason::LetterInaccessible => "drive letter path inaccessible",
            NotMountedReason::RemoteInaccessible => "remote path inaccessible",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inspection {
    pub mounted: bool,
    pub reason: Option<NotMountedReason>,
}

impl Inspection {
    pub fn mounted() -> Self {
        Inspection { mounted: true, reason: None }
    }

    pub fn not_mounted(reason: NotMountedReason) -> Self {
        Inspection { mounted: false, reason: Some(reason) }
    }
}

/// Share paths compare the way Windows compares them: ignoring ASCII case
/// and a trailing separator.
pub fn same_remote(a: &str, b: &str) -> bool {
    let trim = |s: &str| s.trim_end_matches(['\\', '/']).to_string();
    trim(a).eq_ignore_ascii_case(&trim(b))
}

/// Checks `letter` against `expected_remote`, stopping at the first failing check.
///
/// No side effects beyond the probe's reads.
pub fn inspect<P: PathProbe + ?Sized>(
    letter: &DriveLetter,
    expected_remote: &str,
    observation: Option<&Observation>,
    probe: &P,
) -> Inspection {
    let Some(observation) = observation else {
        return Inspection::not_mounted(NotMountedReason::NoLogicalDisk);
    };

    match observation.provider_name.as_deref() {
        Some(bound) if same_remote(bound, expected_remote) => {}
        bound => {
            debug!("{letter} is bound to {bound:?}, expected {expected_remote}");
            return Inspection::not_mounted(NotMountedReason::TargetMismatch);
        }
    }

    if !probe.exists(Path::new(&letter.root())) {
        return Inspection::not_mounted(NotMountedReason::LetterInaccessible);
    }

    if !probe.exists(Path::new(expected_remote)) {
        return Inspection::not_mounted(NotMountedReason::RemoteInaccessible);
    }

    Inspection::mounted()
}
