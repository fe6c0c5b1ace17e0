//! Key material shared by the session cookie and signed tokens.

use std::path::{Path, PathBuf};

use actix_web::cookie::Key;
use cap_std::{ambient_authority, fs::Dir};
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

/// Minimum key length accepted by [`Key::derive_from`].
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("failed to read secret key at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("secret key at {path} holds {len} bytes; at least {MIN_SECRET_LEN} are required")]
    TooShort { path: PathBuf, len: usize },
}

/// Secret bytes plus the cookie key derived from them.
pub struct Secret {
    bytes: Zeroizing<Vec<u8>>,
    key: Key,
}

impl Secret {
    fn from_bytes(bytes: Vec<u8>) -> Self {
        let key = Key::derive_from(&bytes);
        Self {
            bytes: Zeroizing::new(bytes),
            key,
        }
    }

    /// Random secret for development runs; sessions and tokens do not
    /// survive a restart.
    pub fn ephemeral() -> Self {
        let mut bytes = vec![0_u8; 64];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_bytes(bytes)
    }

    /// Read the secret from `path`.
    ///
    /// # Errors
    /// Returns [`SecretError`] when the file cannot be read or is shorter
    /// than [`MIN_SECRET_LEN`].
    pub fn load(path: &Path) -> Result<Self, SecretError> {
        let read_error = |source| SecretError::Read {
            path: path.to_path_buf(),
            source,
        };
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file_name = path.file_name().ok_or_else(|| {
            read_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "secret key path must name a file",
            ))
        })?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(read_error)?;
        let bytes = dir.read(Path::new(file_name)).map_err(read_error)?;
        if bytes.len() < MIN_SECRET_LEN {
            return Err(SecretError::TooShort {
                path: path.to_path_buf(),
                len: bytes.len(),
            });
        }
        Ok(Self::from_bytes(bytes))
    }

    /// Key used to sign auth tokens.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Raw bytes for the token signer.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}
