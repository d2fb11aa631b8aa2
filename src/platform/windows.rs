use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::{ERROR_CONNECTION_UNAVAIL, ERROR_MORE_DATA, NO_ERROR, WIN32_ERROR};
use windows::Win32::NetworkManagement::WNet::{
    CONNECT_UPDATE_PROFILE, NETRESOURCEW, RESOURCETYPE_DISK, WNetAddConnection2W,
    WNetCancelConnection2W, WNetGetConnectionW,
};
use windows::Win32::Storage::FileSystem::{GetDriveTypeW, GetVolumeInformationW};
use std::path::Path;
use log::debug;
use super::{PathStatus, Platform, PlatformError, Observation, check_status};
use crate::inspect::PathProbe;
use crate::secret::ResolvedCredential;
use crate::{DriveLetter, DriveType};

const MAX_PATH_WIDE: usize = 261;

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(Some(0)).collect()
}

fn from_wide(buf: &[u16]) -> String {
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..end])
}

fn check(call: &'static str, result: WIN32_ERROR) -> Result<(), PlatformError> {
    if result == NO_ERROR {
        Ok(())
    } else {
        Err(PlatformError::Os { call, code: result.0 })
    }
}

/// Binds the drive-mapping table to the Win32 WNet and file system APIs.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsPlatform;

impl WindowsPlatform {
    pub fn new() -> Self {
        Self
    }

    /// Remote name the letter is connected to, including remembered
    /// connections that are currently unavailable.
    fn connection(letter: &DriveLetter) -> Result<Option<String>, PlatformError> {
        let local = wide(letter.as_str());
        let mut buf = vec![0u16; MAX_PATH_WIDE];
        loop {
            let mut len = buf.len() as u32;
            let result = unsafe {
                WNetGetConnectionW(PCWSTR(local.as_ptr()), Some(PWSTR(buf.as_mut_ptr())), &mut len)
            };
            if result == NO_ERROR || result == ERROR_CONNECTION_UNAVAIL {
                return Ok(Some(from_wide(&buf)));
            }
            if result == ERROR_MORE_DATA {
                buf = vec![0u16; len as usize];
                continue;
            }
            // ERROR_NOT_CONNECTED and friends: not a network mapping
            debug!("WNetGetConnectionW({letter}) returned {}", result.0);
            return Ok(None);
        }
    }

    fn volume_label(root: &[u16]) -> Option<String> {
        let mut label = vec![0u16; MAX_PATH_WIDE];
        let result = unsafe {
            GetVolumeInformationW(
                PCWSTR(root.as_ptr()),
                Some(label.as_mut_slice()),
                None,
                None,
                None,
                None,
            )
        };
        match result {
            Ok(()) => Some(from_wide(&label)).filter(|l| !l.is_empty()),
            Err(_) => None,
        }
    }
}

impl PathProbe for WindowsPlatform {
    fn exists(&self, path: &Path) -> bool {
        check_status(path) == PathStatus::Mounted
    }
}

impl Platform for WindowsPlatform {
    fn query_logical_disk(
        &self,
        letter: &DriveLetter,
    ) -> Result<Option<Observation>, PlatformError> {
        let root = wide(&letter.root());
        let code = unsafe { GetDriveTypeW(PCWSTR(root.as_ptr())) };
        let drive_type = DriveType::from_code(code);

        if drive_type == DriveType::NoRootDir {
            // a remembered mapping whose server is gone has no root directory
            return Ok(Self::connection(letter)?
                .map(|remote| Observation::network(letter.as_str(), remote)));
        }

        let provider_name = if drive_type.is_network() {
            Self::connection(letter)?
        } else {
            None
        };

        Ok(Some(Observation {
            device_id: letter.to_string(),
            volume_label: Self::volume_label(&root),
            drive_type,
            provider_name,
        }))
    }

    fn detach(&mut self, letter: &DriveLetter) -> Result<(), PlatformError> {
        let local = wide(letter.as_str());
        let result = unsafe {
            WNetCancelConnection2W(PCWSTR(local.as_ptr()), CONNECT_UPDATE_PROFILE, true)
        };
        check("WNetCancelConnection2W", result)
    }

    fn attach(
        &mut self,
        letter: &DriveLetter,
        remote: &str,
        credential: Option<&ResolvedCredential>,
    ) -> Result<(), PlatformError> {
        if remote.contains('\0') {
            return Err(PlatformError::General(format!(
                "remote path contains a NUL character: {remote:?}"
            )));
        }
        let mut local = wide(letter.as_str());
        let mut remote_w = wide(remote);
        let resource = NETRESOURCEW {
            dwType: RESOURCETYPE_DISK,
            lpLocalName: PWSTR(local.as_mut_ptr()),
            lpRemoteName: PWSTR(remote_w.as_mut_ptr()),
            ..Default::default()
        };

        let (user, password) = match credential {
            Some(c) => (Some(wide(&c.user_name)), Some(zeroize::Zeroizing::new(wide(c.secret())))),
            None => (None, None),
        };
        let user_ptr = user.as_ref().map_or(PCWSTR::null(), |u| PCWSTR(u.as_ptr()));
        let password_ptr = password.as_ref().map_or(PCWSTR::null(), |p| PCWSTR(p.as_ptr()));

        let result = unsafe {
            WNetAddConnection2W(&resource, password_ptr, user_ptr, CONNECT_UPDATE_PROFILE)
        };
        check("WNetAddConnection2W", result)
    }
}
