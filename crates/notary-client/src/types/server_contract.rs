//! Server (notary) contracts.

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::types::ids::ServerId;

/// A connection endpoint advertised by a server contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Onion { address: String, port: u16 },
    Inproc { name: String },
}

/// Immutable once signed by the issuing server Nym.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerContract {
    id: ServerId,
    endpoints: Vec<Endpoint>,
    #[serde(with = "crate::types::verifying_key_bytes")]
    public_signing_key: VerifyingKey,
}

impl ServerContract {
    pub fn new(id: ServerId, endpoints: Vec<Endpoint>, public_signing_key: VerifyingKey) -> Self {
        Self {
            id,
            endpoints,
            public_signing_key,
        }
    }

    pub fn id(&self) -> &ServerId {
        &self.id
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn public_signing_key(&self) -> &VerifyingKey {
        &self.public_signing_key
    }
}
