//! Pseudonymous signing identity.

use std::collections::HashMap;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, SignerError};
use crate::types::ids::{NymId, RequestNumber, ServerId};
use crate::types::ledger::Ledger;
use crate::types::outpayment::{IncomingPaymentEntry, OutpaymentEntry};

/// A Nym's credential material.
///
/// `Credentials` is the modern per-Nym credential folder (§6); `Legacy` is
/// the older single cert/key file kept for Nyms created before credentials
/// existed. Both ultimately yield a signing keypair.
#[derive(Clone, Serialize, Deserialize)]
pub enum KeySource {
    Credentials { credential_ids: Vec<String> },
    Legacy,
}

/// A pseudonymous identity with a master key and optional credential set.
///
/// The signing key itself never round-trips through `Serialize`/`Deserialize`
/// directly in this struct — at rest it lives behind the wallet's
/// [`crate::wallet::master_key::MasterKey`], encrypted; in memory it is held
/// here as plain key bytes once unlocked.
#[derive(Clone, Serialize, Deserialize)]
pub struct Nym {
    id: NymId,
    name: Option<String>,
    key_source: KeySource,
    #[serde(with = "signing_key_bytes")]
    signing_key: SigningKey,
    /// Per-server outgoing request-number counter (§4.2).
    request_counters: HashMap<ServerId, u64>,
    /// Instruments sent by this Nym awaiting reconciliation (§4.5).
    pub outpayments: Vec<OutpaymentEntry>,
    /// Instruments received but not yet deposited/recorded (§3, §4.4).
    pub payment_inbox: Vec<IncomingPaymentEntry>,
    pub record_box: Ledger,
    pub expired_box: Ledger,
}

mod signing_key_bytes {
    use ed25519_dalek::SigningKey;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(key: &SigningKey, s: S) -> Result<S::Ok, S::Error> {
        key.to_bytes().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SigningKey, D::Error> {
        let bytes: [u8; 32] = Deserialize::deserialize(d)?;
        Ok(SigningKey::from_bytes(&bytes))
    }
}

impl Nym {
    /// Generate a fresh Nym with a new keypair.
    pub fn generate(name: Option<String>) -> Self {
        let mut rng = rand::rngs::OsRng;
        let signing_key = SigningKey::generate(&mut rng);
        let id = nym_id_from_public(&signing_key.verifying_key());
        Self {
            id,
            name,
            key_source: KeySource::Legacy,
            signing_key,
            request_counters: HashMap::new(),
            outpayments: Vec::new(),
            payment_inbox: Vec::new(),
            record_box: Ledger::new(),
            expired_box: Ledger::new(),
        }
    }

    /// Construct from existing key material (import path).
    pub fn from_signing_key(
        signing_key: SigningKey,
        name: Option<String>,
        key_source: KeySource,
    ) -> Self {
        let id = nym_id_from_public(&signing_key.verifying_key());
        Self {
            id,
            name,
            key_source,
            signing_key,
            request_counters: HashMap::new(),
            outpayments: Vec::new(),
            payment_inbox: Vec::new(),
            record_box: Ledger::new(),
            expired_box: Ledger::new(),
        }
    }

    pub fn id(&self) -> &NymId {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn key_source(&self) -> &KeySource {
        &self.key_source
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Raw private key bytes, for the export path only.
    pub(crate) fn export_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Sign a payload with this Nym's private key.
    pub fn sign(&self, payload: &[u8]) -> Signature {
        self.signing_key.sign(payload)
    }

    /// Verify a signature allegedly made by this Nym.
    pub fn verify(&self, payload: &[u8], signature: &Signature) -> Result<(), Error> {
        self.verifying_key()
            .verify(payload, signature)
            .map_err(|_| Error::Signing(SignerError::VerificationFailed))
    }

    /// Next outgoing request number for `server`, incrementing the counter
    /// unconditionally (§4.2: "incremented even if the request fails").
    pub fn next_request_number(&mut self, server: &ServerId) -> RequestNumber {
        let counter = self.request_counters.entry(server.clone()).or_insert(0);
        *counter += 1;
        RequestNumber(*counter)
    }

    pub fn last_request_number(&self, server: &ServerId) -> RequestNumber {
        RequestNumber(self.request_counters.get(server).copied().unwrap_or(0))
    }
}

/// Derive a Nym's stable identifier from its public key: a hex-rendered
/// SHA-256 digest of the raw public key bytes.
pub fn nym_id_from_public(key: &VerifyingKey) -> NymId {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    NymId(hex::encode(hasher.finalize()))
}
