//! Assembles request envelopes (§4.2).
//!
//! Every outgoing request carries: command name, sender NymID, server ID, a
//! monotonically increasing request number (incremented even on failure),
//! the acknowledgment list of already-processed reply request numbers, and
//! the pinned `nymbox_hash` the client last observed. The builder signs the
//! final message with the sender Nym's key.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::error::Error;
use crate::types::envelope::RequestPayload;
use crate::types::ids::{NymId, RequestNumber, ServerId};
use crate::types::{OutgoingEnvelope, RequestBody};
use crate::wallet::Wallet;

#[derive(Default)]
struct PinState {
    nymbox_hash: String,
    acknowledged: HashSet<RequestNumber>,
}

/// Tracks, per (Nym, server), the pinned nymbox hash and the set of reply
/// request-numbers already processed — used to trim the server's
/// drop-copies (§4.2).
pub struct RequestBuilder {
    pins: Mutex<HashMap<(NymId, ServerId), PinState>>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self { pins: Mutex::new(HashMap::new()) }
    }

    pub fn pinned_nymbox_hash(&self, nym: &NymId, server: &ServerId) -> String {
        self.pins
            .lock()
            .unwrap()
            .get(&(nym.clone(), server.clone()))
            .map(|p| p.nymbox_hash.clone())
            .unwrap_or_default()
    }

    /// Call after processing a reply: records the acknowledgment and
    /// advances the pinned nymbox hash if the reply carried a new one.
    pub fn on_reply(
        &self,
        nym: &NymId,
        server: &ServerId,
        request_number: RequestNumber,
        new_nymbox_hash: Option<String>,
    ) {
        let mut pins = self.pins.lock().unwrap();
        let pin = pins.entry((nym.clone(), server.clone())).or_default();
        pin.acknowledged.insert(request_number);
        if let Some(hash) = new_nymbox_hash {
            pin.nymbox_hash = hash;
        }
    }

    /// Trim acknowledgments the server has already confirmed it trimmed,
    /// keeping the ack list bounded.
    pub fn trim_acknowledged(&self, nym: &NymId, server: &ServerId, trimmed: &[RequestNumber]) {
        let mut pins = self.pins.lock().unwrap();
        if let Some(pin) = pins.get_mut(&(nym.clone(), server.clone())) {
            for n in trimmed {
                pin.acknowledged.remove(n);
            }
        }
    }

    fn acknowledged_list(&self, nym: &NymId, server: &ServerId) -> Vec<RequestNumber> {
        self.pins
            .lock()
            .unwrap()
            .get(&(nym.clone(), server.clone()))
            .map(|p| {
                let mut v: Vec<_> = p.acknowledged.iter().copied().collect();
                v.sort_by_key(|n| n.0);
                v
            })
            .unwrap_or_default()
    }

    /// Assemble and sign a request envelope. `wallet` is mutated to draw
    /// the next request number (incremented unconditionally, even if the
    /// caller later fails to send).
    pub fn build(
        &self,
        wallet: &mut Wallet,
        nym_id: &NymId,
        server_id: &ServerId,
        command: impl Into<String>,
        payload: RequestPayload,
    ) -> Result<OutgoingEnvelope, Error> {
        let command = command.into();
        let nymbox_hash = self.pinned_nymbox_hash(nym_id, server_id);
        let acknowledged = self.acknowledged_list(nym_id, server_id);

        let nym = wallet.nym_mut(nym_id)?;
        let request_number = nym.next_request_number(server_id);

        let body = RequestBody {
            command,
            sender_nym: nym_id.clone(),
            server: server_id.clone(),
            request_number,
            acknowledged,
            nymbox_hash,
            payload,
        };

        let canonical = serde_json::to_vec(&body)?;
        let signature = nym.sign(&canonical).to_bytes().to_vec();

        Ok(OutgoingEnvelope { body, signature })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Nym;
    use crate::wallet::fs::DataFolder;

    fn wallet_with_nym() -> (Wallet, NymId) {
        let mut wallet = Wallet::new(DataFolder::new("/tmp/notary-rb-test"), "pw");
        let nym = Nym::generate(Some("alice".into()));
        let id = nym.id().clone();
        wallet.insert_nym(nym).unwrap();
        (wallet, id)
    }

    #[test]
    fn request_numbers_increment_across_builds() {
        let (mut wallet, nym_id) = wallet_with_nym();
        let server = ServerId::from("srv1");
        let rb = RequestBuilder::new();

        let env1 = rb
            .build(&mut wallet, &nym_id, &server, "ping", RequestPayload::Message {
                command: "ping".into(),
                body: serde_json::Value::Null,
            })
            .unwrap();
        let env2 = rb
            .build(&mut wallet, &nym_id, &server, "ping", RequestPayload::Message {
                command: "ping".into(),
                body: serde_json::Value::Null,
            })
            .unwrap();

        assert_eq!(env1.body.request_number, RequestNumber(1));
        assert_eq!(env2.body.request_number, RequestNumber(2));
    }

    #[test]
    fn nymbox_hash_pin_updates_after_reply() {
        let (mut wallet, nym_id) = wallet_with_nym();
        let server = ServerId::from("srv1");
        let rb = RequestBuilder::new();

        let env = rb
            .build(&mut wallet, &nym_id, &server, "ping", RequestPayload::Message {
                command: "ping".into(),
                body: serde_json::Value::Null,
            })
            .unwrap();
        assert_eq!(env.body.nymbox_hash, "");

        rb.on_reply(&nym_id, &server, RequestNumber(1), Some("hash-1".into()));

        let env2 = rb
            .build(&mut wallet, &nym_id, &server, "ping", RequestPayload::Message {
                command: "ping".into(),
                body: serde_json::Value::Null,
            })
            .unwrap();
        assert_eq!(env2.body.nymbox_hash, "hash-1");
        assert_eq!(env2.body.acknowledged, vec![RequestNumber(1)]);
    }
}
