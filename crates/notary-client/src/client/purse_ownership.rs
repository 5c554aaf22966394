//! Purse ownership capability: seal/open/identify over either a Nym's
//! public key or a purse-embedded symmetric key (§4.6).
//!
//! Replaces `original_source`'s `OTNym_or_SymmetricKey` dual-form wrapper
//! with a two-variant sum sharing one capability trait — push/pop/peek/
//! merge/reassign never need to know which variant is in play.

use crate::error::Error;
use crate::types::ids::NymId;
use crate::types::nym::Nym;
use crate::types::purse::{CashPurse, CashToken, PurseOwnerSpec};
use crate::wallet::master_key::MasterKeyMaterial;

/// Either a Nym's public-key capability or a purse-embedded symmetric key
/// unlocked by a passphrase-derived master key (§4.6).
pub enum PurseOwner<'a> {
    Nym(&'a Nym),
    Symmetric(MasterKeyMaterial),
}

impl<'a> PurseOwner<'a> {
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        match self {
            // Sealing to a Nym is modeled as sealing under a key derived
            // from the Nym's own signing key bytes, mirroring how
            // `MasterKeyMaterial` seals for the symmetric case — the actual
            // public-key encryption scheme is out of scope (spec §1).
            PurseOwner::Nym(nym) => MasterKeyMaterial::derive(&hex::encode(nym.export_key_bytes()), b"purse-seal")
                .seal(plaintext),
            PurseOwner::Symmetric(key) => key.seal(plaintext),
        }
    }

    pub fn open(&self, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        match self {
            PurseOwner::Nym(nym) => MasterKeyMaterial::derive(&hex::encode(nym.export_key_bytes()), b"purse-seal")
                .open(ciphertext),
            PurseOwner::Symmetric(key) => key.open(ciphertext),
        }
    }

    pub fn identify(&self) -> PurseOwnerSpec {
        match self {
            PurseOwner::Nym(nym) => PurseOwnerSpec::Nym(nym.id().clone()),
            PurseOwner::Symmetric(key) => PurseOwnerSpec::Symmetric { key_fingerprint: key.fingerprint() },
        }
    }
}

pub fn push(purse: &mut CashPurse, owner: &PurseOwner<'_>, plaintext: &[u8]) -> Result<(), Error> {
    let sealed = owner.seal(plaintext)?;
    purse.push(CashToken(sealed));
    Ok(())
}

pub fn peek(purse: &CashPurse, owner: &PurseOwner<'_>) -> Result<Option<Vec<u8>>, Error> {
    match purse.peek() {
        Some(token) => Ok(Some(owner.open(&token.0)?)),
        None => Ok(None),
    }
}

pub fn pop(purse: &mut CashPurse, owner: &PurseOwner<'_>) -> Result<Option<Vec<u8>>, Error> {
    match purse.pop() {
        Some(token) => Ok(Some(owner.open(&token.0)?)),
        None => Ok(None),
    }
}

/// `merge(signer, old_owner, new_owner, new_purse) -> updated old_purse`
/// (§4.6). Every token in `new_purse` is opened under `new_owner`, re-sealed
/// under `old_owner`, and appended to `old_purse`. Any single open/seal
/// failure rolls back the whole merge — `old_purse` is left untouched.
/// Once every token round-trips, `old_purse`'s signature is released and
/// replaced by a fresh one from `signer` over the merged contents, same
/// convention `RequestBuilder::build` uses for envelope signatures.
pub fn merge(
    signer: &Nym,
    old_owner: &PurseOwner<'_>,
    new_owner: &PurseOwner<'_>,
    old_purse: &mut CashPurse,
    new_purse: &CashPurse,
) -> Result<(), Error> {
    old_purse.same_server_asset(new_purse)?;

    let mut re_sealed = Vec::with_capacity(new_purse.tokens().len());
    for token in new_purse.tokens() {
        let plaintext = new_owner.open(&token.0)?;
        re_sealed.push(CashToken(old_owner.seal(&plaintext)?));
    }
    // Nothing appended until every token round-tripped successfully.
    for token in re_sealed {
        old_purse.push(token);
    }
    old_purse.set_owner(old_owner.identify());

    let payload = old_purse.signing_payload()?;
    old_purse.set_signature(signer.sign(&payload).to_bytes().to_vec());
    Ok(())
}

/// Reassign a single token between owners without a purse (e.g. depositing
/// cash re-seals from "me" to the server's Nym) (§4.6).
pub fn reassign(old_owner: &PurseOwner<'_>, new_owner: &PurseOwner<'_>, token: &CashToken) -> Result<CashToken, Error> {
    let plaintext = old_owner.open(&token.0)?;
    Ok(CashToken(new_owner.seal(&plaintext)?))
}

pub fn nym_owner(nym: &Nym) -> PurseOwner<'_> {
    PurseOwner::Nym(nym)
}

pub fn symmetric_owner(passphrase: &str, salt: &[u8]) -> PurseOwner<'static> {
    PurseOwner::Symmetric(MasterKeyMaterial::derive(passphrase, salt))
}

pub fn owner_id(spec: &PurseOwnerSpec) -> Option<&NymId> {
    match spec {
        PurseOwnerSpec::Nym(id) => Some(id),
        PurseOwnerSpec::Symmetric { .. } => None,
    }
}
