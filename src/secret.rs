use log::warn;
use std::env::VarError;
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

/// Where the password for a mapping comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// The value itself.
    Literal(String),
    /// Name to look up through a [`SecretResolver`].
    Indirect(String),
}

impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretSource::Literal(_) => f.write_str("Literal(***)"),
            SecretSource::Indirect(name) => f.debug_tuple("Indirect").field(name).finish(),
        }
    }
}

/// Credentials declared for a mount, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub user_name: String,
    pub secret: SecretSource,
}

/// A credential whose secret has been looked up for this run.
///
/// The value is wiped on drop and never shows up in `Debug` output.
pub struct ResolvedCredential {
    pub user_name: String,
    secret: Zeroizing<String>,
}

impl ResolvedCredential {
    pub fn new(user_name: impl Into<String>, secret: impl Into<String>) -> Self {
        ResolvedCredential {
            user_name: user_name.into(),
            secret: Zeroizing::new(secret.into()),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCredential")
            .field("user_name", &self.user_name)
            .field("secret", &"***")
            .finish()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecretError {
    #[error("secret {name} could not be resolved")]
    NotFound { name: String },
    #[error("secret {name} is set but is not valid unicode")]
    NotUnicode { name: String },
}

/// Looks up indirect secrets by name.
///
/// `Ok(None)` means the name is simply not known to this resolver.
pub trait SecretResolver {
    fn resolve(&self, name: &str) -> Result<Option<String>, SecretError>;
}

/// Resolves secrets from process environment variables.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvResolver;

impl EnvResolver {
    pub fn new() -> Self {
        Self
    }
}

impl SecretResolver for EnvResolver {
    fn resolve(&self, name: &str) -> Result<Option<String>, SecretError> {
        from_env_var(name, std::env::var(name))
    }
}

fn from_env_var(
    name: &str,
    value: Result<String, VarError>,
) -> Result<Option<String>, SecretError> {
    match value {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => {
            warn!("environment variable {name} is not valid unicode");
            Err(SecretError::NotUnicode { name: name.to_string() })
        }
    }
}

impl<R: SecretResolver + ?Sized> SecretResolver for &R {
    fn resolve(&self, name: &str) -> Result<Option<String>, SecretError> {
        (**self).resolve(name)
    }
}

impl Credential {
    pub fn new(user_name: impl Into<String>, secret: SecretSource) -> Self {
        Credential {
            user_name: user_name.into(),
            secret,
        }
    }

    /// Produces the credential handed to the platform for a single attach.
    pub fn resolve<R: SecretResolver>(
        &self,
        resolver: &R,
    ) -> Result<ResolvedCredential, SecretError> {
        let value = match &self.secret {
            SecretSource::Literal(value) => value.clone(),
            SecretSource::Indirect(name) => resolver
                .resolve(name)?
                .ok_or_else(|| SecretError::NotFound { name: name.clone() })?,
        };
        Ok(ResolvedCredential::new(self.user_name.clone(), value))
    }
}
