//! Loading and validating the list of desired mappings.
//!
//! The file is TOML unless its extension is `.json`:
//!
//! ```toml
//! [[mount]]
//! drive_letter = "Z:"
//! remote_path = '\\server\Docs'
//! user_name = "Bob"
//! secret = "ENV:DOCS_PASSWORD"
//! ```
//!
//! A secret starting with `ENV:` names an environment variable; anything else
//! is used as-is.
use crate::secret::{Credential, SecretSource};
use crate::{DriveLetter, InvalidDriveLetter, MountSpec};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix marking a secret as the name of an environment variable.
pub const ENV_PREFIX: &str = "ENV:";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid toml config {path}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid json config {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("mount #{index}: {source}")]
    DriveLetter {
        index: usize,
        #[source]
        source: InvalidDriveLetter,
    },
    #[error("drive letter {0} is configured more than once")]
    DuplicateDriveLetter(DriveLetter),
    #[error("{0}: remote path is empty")]
    EmptyRemotePath(DriveLetter),
    #[error("{0}: user name given without a secret")]
    MissingSecret(DriveLetter),
    #[error("{0}: secret given without a user name")]
    MissingUserName(DriveLetter),
    #[error("{0}: secret names an empty environment variable")]
    EmptySecretName(DriveLetter),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    mount: Vec<RawMount>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMount {
    drive_letter: String,
    remote_path: String,
    user_name: Option<String>,
    secret: Option<String>,
}

impl SecretSource {
    /// Interprets configuration text, honouring the [`ENV_PREFIX`].
    pub fn from_config(text: &str) -> Self {
        match text.strip_prefix(ENV_PREFIX) {
            Some(name) => SecretSource::Indirect(name.to_string()),
            None => SecretSource::Literal(text.to_string()),
        }
    }
}

/// Reads `path` and returns the validated mount list.
pub fn load_specs(path: &Path) -> Result<Vec<MountSpec>, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_specs(&data, path)
}

/// Parses configuration text; `path` only decides the format and labels errors.
pub fn parse_specs(data: &str, path: &Path) -> Result<Vec<MountSpec>, ConfigError> {
    let file: ConfigFile = if path.extension().map(|ext| ext == "json").unwrap_or(false) {
        serde_json::from_str(data).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        toml::from_str(data).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?
    };

    let specs = file
        .mount
        .into_iter()
        .enumerate()
        .map(|(index, raw)| into_spec(index, raw))
        .collect::<Result<Vec<_>, _>>()?;
    validate_specs(&specs)?;
    Ok(specs)
}

fn into_spec(index: usize, raw: RawMount) -> Result<MountSpec, ConfigError> {
    let drive_letter: DriveLetter = raw
        .drive_letter
        .parse()
        .map_err(|source| ConfigError::DriveLetter { index, source })?;
    let credential = match (raw.user_name, raw.secret) {
        (Some(user_name), Some(secret)) => {
            Some(Credential::new(user_name, SecretSource::from_config(&secret)))
        }
        (Some(_), None) => return Err(ConfigError::MissingSecret(drive_letter)),
        (None, Some(_)) => return Err(ConfigError::MissingUserName(drive_letter)),
        (None, None) => None,
    };
    Ok(MountSpec {
        drive_letter,
        remote_path: raw.remote_path,
        credential,
    })
}

/// Run-level checks that must pass before any mount is touched.
pub fn validate_specs(specs: &[MountSpec]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for spec in specs {
        if spec.remote_path.trim().is_empty() {
            return Err(ConfigError::EmptyRemotePath(spec.drive_letter.clone()));
        }
        if let Some(Credential {
            secret: SecretSource::Indirect(name),
            ..
        }) = &spec.credential
        {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptySecretName(spec.drive_letter.clone()));
            }
        }
        if !seen.insert(&spec.drive_letter) {
            return Err(ConfigError::DuplicateDriveLetter(spec.drive_letter.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn toml_path() -> &'static Path {
        Path::new("drivesync.toml")
    }

    #[test]
    fn parses_toml_with_and_without_credentials() {
        let specs = parse_specs(
            r#"
            [[mount]]
            drive_letter = "Z:"
            remote_path = '\\S\Docs'
            user_name = "Bob"
            secret = "ENV:MYSECRET"

            [[mount]]
            drive_letter = "Y:"
            remote_path = '\\S\Media'
            "#,
            toml_path(),
        )
        .unwrap();

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].drive_letter.as_str(), "Z:");
        assert_eq!(specs[0].remote_path, r"\\S\Docs");
        assert_eq!(
            specs[0].credential,
            Some(Credential::new("Bob", SecretSource::Indirect("MYSECRET".into())))
        );
        assert_eq!(specs[1].credential, None);
    }

    #[test]
    fn parses_json_by_extension() {
        let specs = parse_specs(
            r#"{"mount": [{"drive_letter": "Z:", "remote_path": "\\\\S\\Docs", "user_name": "Bob", "secret": "plain"}]}"#,
            Path::new("drivesync.json"),
        )
        .unwrap();
        assert_eq!(specs[0].remote_path, r"\\S\Docs");
        assert_eq!(
            specs[0].credential.as_ref().map(|c| &c.secret),
            Some(&SecretSource::Literal("plain".into()))
        );
    }

    #[test]
    fn empty_file_means_no_mounts() {
        assert!(parse_specs("", toml_path()).unwrap().is_empty());
    }

    #[test]
    fn duplicate_letters_are_rejected() {
        let err = parse_specs(
            r#"
            [[mount]]
            drive_letter = "Z:"
            remote_path = '\\S\Docs'
            [[mount]]
            drive_letter = "Z:"
            remote_path = '\\S\Media'
            "#,
            toml_path(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateDriveLetter(l) if l.as_str() == "Z:"));
    }

    #[test]
    fn malformed_letter_is_rejected() {
        let err = parse_specs(
            "[[mount]]\ndrive_letter = \"z\"\nremote_path = 'x'\n",
            toml_path(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DriveLetter { index: 0, .. }));
    }

    #[test]
    fn incomplete_credentials_are_rejected() {
        let user_only = "[[mount]]\ndrive_letter = \"Z:\"\nremote_path = 'x'\nuser_name = \"Bob\"\n";
        assert!(matches!(parse_specs(user_only, toml_path()), Err(ConfigError::MissingSecret(_))));
        let secret_only = "[[mount]]\ndrive_letter = \"Z:\"\nremote_path = 'x'\nsecret = \"s\"\n";
        assert!(matches!(parse_specs(secret_only, toml_path()), Err(ConfigError::MissingUserName(_))));
    }

    #[test]
    fn empty_indirection_name_is_rejected_at_load() {
        let text = "[[mount]]\ndrive_letter = \"Z:\"\nremote_path = 'x'\nuser_name = \"Bob\"\nsecret = \"ENV:\"\n";
        let err = parse_specs(text, toml_path()).unwrap_err();
        assert!(matches!(err, ConfigError::EmptySecretName(l) if l.as_str() == "Z:"));

        let spec = MountSpec::new("Y:".parse().unwrap(), r"\\S\Docs")
            .with_credential(Credential::new("Bob", SecretSource::Indirect(" ".into())));
        assert!(matches!(validate_specs(&[spec]), Err(ConfigError::EmptySecretName(_))));
    }

    #[test]
    fn empty_remote_path_is_rejected() {
        let spec = MountSpec::new("Z:".parse().unwrap(), "  ");
        assert!(matches!(validate_specs(&[spec]), Err(ConfigError::EmptyRemotePath(_))));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let text = "[[mount]]\ndrive_letter = \"Z:\"\nremote_path = 'x'\npersist = true\n";
        assert!(matches!(parse_specs(text, toml_path()), Err(ConfigError::Toml { .. })));
    }

    #[test]
    fn env_prefix_maps_to_indirect() {
        assert_eq!(SecretSource::from_config("ENV:PW"), SecretSource::Indirect("PW".into()));
        assert_eq!(SecretSource::from_config("env:PW"), SecretSource::Literal("env:PW".into()));
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[[mount]]\ndrive_letter = \"Q:\"\nremote_path = '\\\\S\\Q'").unwrap();
        let specs = load_specs(file.path()).unwrap();
        assert_eq!(specs[0].drive_letter.as_str(), "Q:");
        assert_eq!(specs[0].remote_path, r"\\S\Q");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_specs(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
