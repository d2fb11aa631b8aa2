//! One reconciliation pass over the configured mounts.
//!
//! Each spec is handled on its own: inspect, leave alone, or detach the stale
//! mapping and attach the desired one, then verify. Whatever goes wrong with
//! one mount is recorded in its [`MountOutcome`] and the pass moves on.
use crate::config::{ConfigError, validate_specs};
use crate::inspect::{NotMountedReason, inspect};
use crate::platform::{Observation, Platform};
use crate::secret::{SecretError, SecretResolver};
use crate::{DriveLetter, DriveType, MountSpec};
use log::{debug, error, info, warn};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Conflict { device_id: String, drive_type: DriveType },
    QueryFailed,
    DetachFailed,
    CredentialUnresolved(SecretError),
    AttachFailed,
    Verification(NotMountedReason),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Conflict { device_id, drive_type } => write!(
                f,
                "letter in use by non-network drive {device_id} of type {drive_type}"
            ),
            FailureReason::QueryFailed => f.write_str("could not query logical disk"),
            FailureReason::DetachFailed => f.write_str("could not remove stale mapping"),
            FailureReason::CredentialUnresolved(err) => write!(f, "{err}"),
            FailureReason::AttachFailed => f.write_str("could not create mapping"),
            FailureReason::Verification(reason) => write!(f, "{reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountStatus {
    /// Already correctly mounted; nothing was touched.
    Skipped,
    Mounted,
    Failed(FailureReason),
}

/// Result of reconciling one spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountOutcome {
    pub drive_letter: DriveLetter,
    pub remote_path: String,
    pub status: MountStatus,
    /// Decision points in order. Empty for skipped mounts.
    pub trace: Vec<String>,
}

impl MountOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, MountStatus::Failed(_))
    }
}

pub struct Reconciler<P, R> {
    platform: P,
    resolver: R,
}

impl<P: Platform, R: SecretResolver> Reconciler<P, R> {
    pub fn new(platform: P, resolver: R) -> Self {
        Reconciler { platform, resolver }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn into_parts(self) -> (P, R) {
        (self.platform, self.resolver)
    }

    /// Reconciles every spec in order, returning one outcome per spec.
    ///
    /// The list is validated first; a rejected list touches nothing.
    pub fn reconcile(&mut self, specs: &[MountSpec]) -> Result<Vec<MountOutcome>, ConfigError> {
        validate_specs(specs)?;
        Ok(specs.iter().map(|spec| self.reconcile_one(spec)).collect())
    }

    pub fn reconcile_one(&mut self, spec: &MountSpec) -> MountOutcome {
        let mut trace = Trace::default();
        let status = match self.run(spec, &mut trace) {
            Ok(status) => {
                if status == MountStatus::Mounted {
                    info!("{} mounted to {}", spec.drive_letter, spec.remote_path);
                    trace.push(format!(
                        "{} successfully mounted to {}",
                        spec.drive_letter, spec.remote_path
                    ));
                }
                status
            }
            Err(reason) => {
                error!("{}: {reason}", spec.drive_letter);
                trace.push(format!("{} failed: {reason}", spec.drive_letter));
                MountStatus::Failed(reason)
            }
        };
        MountOutcome {
            drive_letter: spec.drive_letter.clone(),
            remote_path: spec.remote_path.clone(),
            status,
            trace: trace.0,
        }
    }

    fn observe(
        &self,
        letter: &DriveLetter,
        trace: &mut Trace,
    ) -> Result<Option<Observation>, FailureReason> {
        self.platform.query_logical_disk(letter).map_err(|e| {
            trace.push(format!("querying {letter} failed: {e}"));
            FailureReason::QueryFailed
        })
    }

    fn run(&mut self, spec: &MountSpec, trace: &mut Trace) -> Result<MountStatus, FailureReason> {
        let letter = &spec.drive_letter;
        let observation = self.observe(letter, trace)?;

        if let Some(obs) = &observation {
            if !obs.drive_type.is_network() {
                return Err(FailureReason::Conflict {
                    device_id: obs.device_id.clone(),
                    drive_type: obs.drive_type,
                });
            }
        }

        let inspection = inspect(letter, &spec.remote_path, observation.as_ref(), &self.platform);
        if inspection.mounted {
            debug!("{letter} already mounted to {}", spec.remote_path);
            return Ok(MountStatus::Skipped);
        }
        if let Some(reason) = inspection.reason {
            trace.push(format!("{letter} is not mounted correctly: {reason}"));
        }

        if let Some(stale) = &observation {
            let target = stale.provider_name.as_deref().unwrap_or("<unknown>");
            trace.push(format!("removing existing mapping {letter} -> {target}"));
            info!("detaching {letter} from {target}");
            if let Err(e) = self.platform.detach(letter) {
                trace.push(format!("detach of {letter} failed: {e}"));
                return Err(FailureReason::DetachFailed);
            }
        }

        let credential = match &spec.credential {
            Some(credential) => {
                let resolved = credential.resolve(&self.resolver).map_err(|err| {
                    warn!("{letter}: {err}");
                    FailureReason::CredentialUnresolved(err)
                })?;
                Some(resolved)
            }
            None => None,
        };

        match &credential {
            Some(c) => trace.push(format!(
                "mapping {letter} -> {} as {}",
                spec.remote_path, c.user_name
            )),
            None => trace.push(format!("mapping {letter} -> {}", spec.remote_path)),
        }
        if let Err(e) = self.platform.attach(letter, &spec.remote_path, credential.as_ref()) {
            trace.push(format!("attach of {letter} failed: {e}"));
            return Err(FailureReason::AttachFailed);
        }
        drop(credential);

        let observation = self.observe(letter, trace)?;
        let verified = inspect(letter, &spec.remote_path, observation.as_ref(), &self.platform);
        match verified.reason {
            None if verified.mounted => Ok(MountStatus::Mounted),
            Some(reason) => Err(FailureReason::Verification(reason)),
            None => Err(FailureReason::Verification(NotMountedReason::NoLogicalDisk)),
        }
    }
}

#[derive(Default)]
struct Trace(Vec<String>);

impl Trace {
    fn push(&mut self, line: String) {
        debug!("{line}");
        self.0.push(line);
    }
}
