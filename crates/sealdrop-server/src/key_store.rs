//! Persistent storage for the server's RSA key pair.
//!
//! Two PEM files live in the key directory:
//!
//! - `privatekey.pem`: PKCS#1 private key, mode 0600 on Unix
//! - `publickey.pem`: SubjectPublicKeyInfo public key
//!
//! Presence of both files means load, absence of both means generate. A half
//! pair is resolved by [`HalfPairPolicy`]. Halves from different generations
//! are never combined: loading checks that the public key belongs to the
//! private key.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use rand::{CryptoRng, RngCore};
use sealdrop_crypto::{AsymmetricKeyPair, CryptoError, DEFAULT_RSA_BITS};
use thiserror::Error;
use zeroize::Zeroizing;

/// File name of the private key inside the key directory.
pub const PRIVATE_KEY_FILE: &str = "privatekey.pem";

/// File name of the public key inside the key directory.
pub const PUBLIC_KEY_FILE: &str = "publickey.pem";

/// What to do when exactly one of the two key files exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HalfPairPolicy {
    /// Log a warning, then generate a new pair and overwrite both files.
    #[default]
    Regenerate,
    /// Refuse to start without touching either file.
    FailFast,
}

/// Errors from loading or creating the key pair.
#[derive(Error, Debug)]
pub enum KeyStorageError {
    /// Key directory or key file could not be written.
    #[error("key directory {} is not writable: {reason}", dir.display())]
    Unwritable {
        /// Key directory
        dir: PathBuf,
        /// Underlying I/O error
        reason: String,
    },

    /// Key file exists but could not be read.
    #[error("failed to read key file {}: {reason}", path.display())]
    Unreadable {
        /// Key file
        path: PathBuf,
        /// Underlying I/O error
        reason: String,
    },

    /// Stored keys do not parse, or the halves do not match.
    #[error("stored key pair in {} is corrupt: {reason}", dir.display())]
    Corrupt {
        /// Key directory
        dir: PathBuf,
        /// What failed to parse or match
        reason: String,
    },

    /// Only one key file exists and the policy is [`HalfPairPolicy::FailFast`].
    #[error("incomplete key pair: {} exists but {} is missing", present.display(), missing.display())]
    IncompletePair {
        /// The file that exists
        present: PathBuf,
        /// The file that is missing
        missing: PathBuf,
    },

    /// Key generation or PEM encoding failed.
    #[error("key material error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Outcome of [`KeyStore::load_or_create`].
#[derive(Debug)]
pub enum StoredKeyPair {
    /// Both files existed and were read back.
    Loaded(AsymmetricKeyPair),
    /// A new pair was generated and written.
    Generated(AsymmetricKeyPair),
}

impl StoredKeyPair {
    /// The key pair, however it was obtained.
    #[must_use]
    pub fn pair(&self) -> &AsymmetricKeyPair {
        match self {
            Self::Loaded(pair) | Self::Generated(pair) => pair,
        }
    }

    /// Take the key pair.
    #[must_use]
    pub fn into_pair(self) -> AsymmetricKeyPair {
        match self {
            Self::Loaded(pair) | Self::Generated(pair) => pair,
        }
    }

    /// True if the pair was freshly generated.
    #[must_use]
    pub fn was_generated(&self) -> bool {
        matches!(self, Self::Generated(_))
    }
}

/// Key pair persistence rooted at one directory.
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
    key_bits: usize,
    policy: HalfPairPolicy,
}

impl KeyStore {
    /// Store rooted at `dir` with default key size and policy.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), key_bits: DEFAULT_RSA_BITS, policy: HalfPairPolicy::default() }
    }

    /// Modulus size used when generating.
    #[must_use]
    pub fn with_key_bits(mut self, key_bits: usize) -> Self {
        self.key_bits = key_bits;
        self
    }

    /// Half-pair handling.
    #[must_use]
    pub fn with_policy(mut self, policy: HalfPairPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Key directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the private key file.
    pub fn private_key_path(&self) -> PathBuf {
        self.dir.join(PRIVATE_KEY_FILE)
    }

    /// Path of the public key file.
    pub fn public_key_path(&self) -> PathBuf {
        self.dir.join(PUBLIC_KEY_FILE)
    }

    /// Load the stored pair, or generate and persist a new one.
    ///
    /// # Errors
    ///
    /// - `KeyStorageError::IncompletePair` if one file is missing under
    ///   [`HalfPairPolicy::FailFast`]
    /// - `KeyStorageError::Corrupt` if stored keys fail to parse or match
    /// - `KeyStorageError::Unreadable` or `KeyStorageError::Unwritable` on
    ///   I/O failure
    /// - `KeyStorageError::Crypto` if generation fails
    pub fn load_or_create<R: CryptoRng + RngCore>(
        &self,
        rng: &mut R,
    ) -> Result<StoredKeyPair, KeyStorageError> {
        let private_path = self.private_key_path();
        let public_path = self.public_key_path();

        match (private_path.exists(), public_path.exists()) {
            (true, true) => {
                tracing::info!(dir = %self.dir.display(), "Importing existing keys");
                self.load(&private_path, &public_path).map(StoredKeyPair::Loaded)
            },
            (false, false) => {
                tracing::info!(dir = %self.dir.display(), bits = self.key_bits, "Generating new keys");
                self.generate(rng, &private_path, &public_path).map(StoredKeyPair::Generated)
            },
            (has_private, _) => {
                let (present, missing) = if has_private {
                    (private_path.clone(), public_path.clone())
                } else {
                    (public_path.clone(), private_path.clone())
                };

                match self.policy {
                    HalfPairPolicy::FailFast => {
                        Err(KeyStorageError::IncompletePair { present, missing })
                    },
                    HalfPairPolicy::Regenerate => {
                        tracing::warn!(
                            present = %present.display(),
                            missing = %missing.display(),
                            "Incomplete key pair, regenerating both keys"
                        );
                        self.generate(rng, &private_path, &public_path)
                            .map(StoredKeyPair::Generated)
                    },
                }
            },
        }
    }

    fn load(&self, private_path: &Path, public_path: &Path) -> Result<AsymmetricKeyPair, KeyStorageError> {
        let private_pem = Zeroizing::new(read_key_file(private_path)?);
        let public_pem = read_key_file(public_path)?;

        AsymmetricKeyPair::from_pem(&private_pem, &public_pem)
            .map_err(|e| KeyStorageError::Corrupt { dir: self.dir.clone(), reason: e.to_string() })
    }

    fn generate<R: CryptoRng + RngCore>(
        &self,
        rng: &mut R,
        private_path: &Path,
        public_path: &Path,
    ) -> Result<AsymmetricKeyPair, KeyStorageError> {
        let pair = AsymmetricKeyPair::generate(rng, self.key_bits)?;
        let private_pem = pair.private_key_pem()?;
        let public_pem = pair.public_key_pem()?;

        let unwritable =
            |e: io::Error| KeyStorageError::Unwritable { dir: self.dir.clone(), reason: e.to_string() };

        fs::create_dir_all(&self.dir).map_err(unwritable)?;
        write_private_key(private_path, &private_pem).map_err(unwritable)?;

        if let Err(e) = fs::write(public_path, public_pem.as_bytes()) {
            // Never leave a half pair behind
            for path in [private_path, public_path] {
                if let Err(cleanup) = remove_key_file(path) {
                    tracing::warn!(path = %path.display(), "failed to remove key file: {}", cleanup);
                }
            }
            return Err(unwritable(e));
        }

        Ok(pair)
    }
}

fn read_key_file(path: &Path) -> Result<String, KeyStorageError> {
    fs::read_to_string(path)
        .map_err(|e| KeyStorageError::Unreadable { path: path.to_path_buf(), reason: e.to_string() })
}

/// Remove a key file written by a failed generation. A missing file is fine.
fn remove_key_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(unix)]
fn write_private_key(path: &Path, pem: &str) -> io::Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file =
        fs::OpenOptions::new().write(true).create(true).truncate(true).mode(0o600).open(path)?;
    // mode() only applies on creation; tighten an overwritten file too
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(pem.as_bytes())?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private_key(path: &Path, pem: &str) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(pem.as_bytes())?;
    file.sync_all()
}
