//! Transport trait and an in-process test double (§4.11, §6).
//!
//! The concrete OpenSSL/ZMQ socket layer is out of scope (spec §1); this
//! crate ships only the trait boundary plus a `LoopbackTransport` for tests
//! and development.

use async_trait::async_trait;

use crate::error::Error;
use crate::types::{IncomingEnvelope, OutgoingEnvelope};

/// One request envelope in, one reply envelope out (§6). A real deployment
/// implements this over a network socket.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_receive(&self, envelope: OutgoingEnvelope) -> Result<IncomingEnvelope, Error>;
}

/// An in-process transport driven by a user-supplied responder closure.
/// Useful for tests that want to script specific server replies without a
/// real socket.
pub struct LoopbackTransport<F>
where
    F: Fn(&OutgoingEnvelope) -> Result<IncomingEnvelope, Error> + Send + Sync,
{
    responder: F,
}

impl<F> LoopbackTransport<F>
where
    F: Fn(&OutgoingEnvelope) -> Result<IncomingEnvelope, Error> + Send + Sync,
{
    pub fn new(responder: F) -> Self {
        Self { responder }
    }
}

#[async_trait]
impl<F> Transport for LoopbackTransport<F>
where
    F: Fn(&OutgoingEnvelope) -> Result<IncomingEnvelope, Error> + Send + Sync,
{
    async fn send_receive(&self, envelope: OutgoingEnvelope) -> Result<IncomingEnvelope, Error> {
        (self.responder)(&envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReplyBody, ReplyOutcome, RequestBody, RequestNumber, RequestPayload};
    use crate::types::{NymId, ServerId};

    fn dummy_envelope() -> OutgoingEnvelope {
        OutgoingEnvelope {
            body: RequestBody {
                command: "ping".into(),
                sender_nym: NymId::from("alice"),
                server: ServerId::from("srv1"),
                request_number: RequestNumber(1),
                acknowledged: vec![],
                nymbox_hash: "abc".into(),
                payload: RequestPayload::Message {
                    command: "ping".into(),
                    body: serde_json::Value::Null,
                },
            },
            signature: vec![],
        }
    }

    #[tokio::test]
    async fn loopback_transport_invokes_responder() {
        let transport = LoopbackTransport::new(|env| {
            Ok(IncomingEnvelope {
                body: ReplyBody {
                    command: env.body.command.clone(),
                    request_number: env.body.request_number,
                    outcome: ReplyOutcome::Success,
                    new_nymbox_hash: Some("new-hash".into()),
                    detail: None,
                },
                signature: vec![],
            })
        });

        let reply = transport.send_receive(dummy_envelope()).await.unwrap();
        assert_eq!(reply.body.outcome, ReplyOutcome::Success);
        assert_eq!(reply.body.new_nymbox_hash.as_deref(), Some("new-hash"));
    }
}
