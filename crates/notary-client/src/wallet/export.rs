//! Nym export/import (§6).
//!
//! An armored `EXPORTED NYM` string whose decoded body is a key-value map
//! `{id, name, nymfile, credlist?, credentials?, certfile?}`. Import
//! verifies every field decrypts under a freshly supplied passphrase, then
//! the caller (`Wallet::insert_nym` after re-sealing) re-encrypts under the
//! wallet master key before inserting — this module only handles the
//! export-passphrase layer.

use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::nym::KeySource;
use crate::types::Nym;
use crate::wallet::master_key::MasterKeyMaterial;

const ARMOR_BEGIN: &str = "-----BEGIN EXPORTED NYM-----";
const ARMOR_END: &str = "-----END EXPORTED NYM-----";
const EXPORT_SALT: &[u8] = b"notary-nym-export-salt";

#[derive(Serialize, Deserialize)]
struct ExportedNymFields {
    id: String,
    name: Option<String>,
    nymfile: String,
    credlist: Option<String>,
    credentials: Option<String>,
    certfile: Option<String>,
}

/// Armor-encode an exported Nym under a one-time export passphrase.
pub fn export_nym(nym: &Nym, export_passphrase: &str) -> Result<String, Error> {
    let key = MasterKeyMaterial::derive(export_passphrase, EXPORT_SALT);
    let sealed_key = key.seal(&nym.export_key_bytes())?;

    let credlist = match nym.key_source() {
        KeySource::Credentials { credential_ids } => Some(credential_ids.join(",")),
        KeySource::Legacy => None,
    };

    let fields = ExportedNymFields {
        id: nym.id().0.clone(),
        name: nym.name().map(str::to_string),
        nymfile: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, sealed_key),
        credlist,
        credentials: None,
        certfile: None,
    };

    let body = serde_json::to_string(&fields)?;
    let armored = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, body);
    Ok(format!("{ARMOR_BEGIN}\n{armored}\n{ARMOR_END}"))
}

/// Decode and decrypt an exported Nym. Every field must decrypt under
/// `export_passphrase`, prompted once by the caller — a failure anywhere
/// aborts with no partial state (§6).
pub fn import_nym(armored: &str, export_passphrase: &str) -> Result<Nym, Error> {
    let inner = armored
        .trim()
        .strip_prefix(ARMOR_BEGIN)
        .and_then(|s| s.strip_suffix(ARMOR_END))
        .ok_or_else(|| Error::InvalidInput("not a valid EXPORTED NYM block".into()))?
        .trim();

    let body_bytes = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, inner)
        .map_err(|e| Error::InvalidInput(format!("bad armor encoding: {e}")))?;
    let body = String::from_utf8(body_bytes)
        .map_err(|e| Error::InvalidInput(format!("non-utf8 export body: {e}")))?;
    let fields: ExportedNymFields = serde_json::from_str(&body)?;

    let key = MasterKeyMaterial::derive(export_passphrase, EXPORT_SALT);
    let sealed_key =
        base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &fields.nymfile)
            .map_err(|e| Error::InvalidInput(format!("bad key encoding: {e}")))?;
    let key_bytes = key.open(&sealed_key)?;
    let key_array: [u8; 32] = key_bytes
        .try_into()
        .map_err(|_| Error::InvalidInput("decrypted key material has wrong length".into()))?;
    let signing_key = SigningKey::from_bytes(&key_array);

    let key_source = match fields.credlist {
        Some(list) => KeySource::Credentials {
            credential_ids: list.split(',').map(str::to_string).collect(),
        },
        None => KeySource::Legacy,
    };

    Ok(Nym::from_signing_key(signing_key, fields.name, key_source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_then_import_round_trips_identity() {
        let nym = Nym::generate(Some("alice".into()));
        let armored = export_nym(&nym, "correct horse battery staple").unwrap();
        let imported = import_nym(&armored, "correct horse battery staple").unwrap();

        assert_eq!(imported.id(), nym.id());
        assert_eq!(imported.name(), nym.name());
        assert_eq!(imported.verifying_key(), nym.verifying_key());
    }

    #[test]
    fn export_then_export_again_is_equivalent() {
        let nym = Nym::generate(Some("bob".into()));
        let armored = export_nym(&nym, "pw").unwrap();
        let imported = import_nym(&armored, "pw").unwrap();
        let re_armored = export_nym(&imported, "pw2").unwrap();
        let re_imported = import_nym(&re_armored, "pw2").unwrap();
        assert_eq!(re_imported.id(), nym.id());
        assert_eq!(re_imported.name(), nym.name());
    }

    #[test]
    fn wrong_passphrase_fails_import() {
        let nym = Nym::generate(None);
        let armored = export_nym(&nym, "right").unwrap();
        assert!(import_nym(&armored, "wrong").is_err());
    }
}
