use super::{PathStatus, Platform, PlatformError, Observation, check_status};
use crate::inspect::PathProbe;
use crate::secret::ResolvedCredential;
use crate::DriveLetter;
use std::path::Path;

/// Drive letters only exist on Windows; every mapping call fails here.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedPlatform;

impl UnsupportedPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl PathProbe for UnsupportedPlatform {
    fn exists(&self, path: &Path) -> bool {
        check_status(path) == PathStatus::Mounted
    }
}

impl Platform for UnsupportedPlatform {
    fn query_logical_disk(
        &self,
        _letter: &DriveLetter,
    ) -> Result<Option<Observation>, PlatformError> {
        Err(PlatformError::Unsupported)
    }

    fn detach(&mut self, _letter: &DriveLetter) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }

    fn attach(
        &mut self,
        _letter: &DriveLetter,
        _remote: &str,
        _credential: Option<&ResolvedCredential>,
    ) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }
}
