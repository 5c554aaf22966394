//! Cash purses: ordered sequences of opaque blinded tokens.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::ids::{AssetId, NymId, ServerId};

/// An opaque blinded-cash token. The blinding/unblinding protocol itself is
/// out of scope (spec §1: "defined against an abstract blinded-token
/// provider") — from this crate's point of view a token is just bytes that
/// a [`crate::client::purse_ownership::PurseOwner`] can seal and open.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashToken(pub Vec<u8>);

/// Declares who can open a purse's tokens, without embedding the capability
/// itself (that lives in `client::purse_ownership::PurseOwner`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurseOwnerSpec {
    Nym(NymId),
    /// A password-owned purse carries its own embedded symmetric key,
    /// identified here by a fingerprint rather than the raw key.
    Symmetric { key_fingerprint: String },
}

/// An ordered sequence of tokens for one (server, asset) pair.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CashPurse {
    server: ServerId,
    asset: AssetId,
    owner: PurseOwnerSpec,
    tokens: Vec<CashToken>,
    /// Present only for `PurseOwnerSpec::Symmetric` purses: the purse's own
    /// embedded symmetric key, wrapped by a passphrase-derived master key
    /// (§4.6, supplemented from `original_source/src/core/crypto/CryptoSymmetric.cpp`).
    embedded_symmetric_key: Option<Vec<u8>>,
    /// Raw ed25519 signature bytes over the purse's canonical encoding
    /// (server, asset, owner, tokens), same convention as
    /// `OutgoingEnvelope::signature` — set whenever a purse changes hands
    /// (§4.6: merge re-signs the destination purse under the merging Nym).
    signature: Option<Vec<u8>>,
}

impl CashPurse {
    pub fn new_for_nym(server: ServerId, asset: AssetId, owner: NymId) -> Self {
        Self {
            server,
            asset,
            owner: PurseOwnerSpec::Nym(owner),
            tokens: Vec::new(),
            embedded_symmetric_key: None,
            signature: None,
        }
    }

    pub fn new_password_owned(
        server: ServerId,
        asset: AssetId,
        key_fingerprint: String,
        embedded_symmetric_key: Vec<u8>,
    ) -> Self {
        Self {
            server,
            asset,
            owner: PurseOwnerSpec::Symmetric { key_fingerprint },
            tokens: Vec::new(),
            embedded_symmetric_key: Some(embedded_symmetric_key),
            signature: None,
        }
    }

    pub fn server(&self) -> &ServerId {
        &self.server
    }

    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    pub fn owner(&self) -> &PurseOwnerSpec {
        &self.owner
    }

    pub fn set_owner(&mut self, owner: PurseOwnerSpec) {
        self.owner = owner;
    }

    pub fn embedded_symmetric_key(&self) -> Option<&[u8]> {
        self.embedded_symmetric_key.as_deref()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn push(&mut self, token: CashToken) {
        self.tokens.push(token);
    }

    pub fn peek(&self) -> Option<&CashToken> {
        self.tokens.last()
    }

    pub fn pop(&mut self) -> Option<CashToken> {
        self.tokens.pop()
    }

    pub fn tokens(&self) -> &[CashToken] {
        &self.tokens
    }

    pub fn same_server_asset(&self, other: &CashPurse) -> Result<(), Error> {
        if self.server != other.server || self.asset != other.asset {
            return Err(Error::InvalidInput(
                "purses must share the same server and asset to be merged".into(),
            ));
        }
        Ok(())
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    pub fn set_signature(&mut self, signature: Vec<u8>) {
        self.signature = Some(signature);
    }

    /// Canonical bytes a signature is computed over: everything except the
    /// signature field itself, so signing never signs over its own output.
    pub fn signing_payload(&self) -> Result<Vec<u8>, Error> {
        #[derive(Serialize)]
        struct Payload<'a> {
            server: &'a ServerId,
            asset: &'a AssetId,
            owner: &'a PurseOwnerSpec,
            tokens: &'a [CashToken],
        }
        serde_json::to_vec(&Payload { server: &self.server, asset: &self.asset, owner: &self.owner, tokens: &self.tokens })
            .map_err(Error::from)
    }
}
