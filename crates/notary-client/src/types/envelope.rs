//! Wire envelope shapes (§6).
//!
//! The concrete armored/sealed encoding is out of scope (spec §1); these
//! types model the envelope's logical shape only, so `client::transport`
//! has something concrete to sign, send, and receive.

use serde::{Deserialize, Serialize};

use crate::types::ids::{AccountId, NymId, RequestNumber, ServerId, TransactionNumber};
use crate::types::statement::Statement;

/// A single operation-specific payload attached to a transaction request
/// (§4.3: "attach one or more `Item`s").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Item {
    DepositCheque { serialized_cheque: String },
    WithdrawVoucher { amount: i64 },
    WithdrawCash { amount: i64 },
    DepositCash { purse: String },
    MarketOffer { serialized_offer: String },
    ExchangeBasket { sub_account_deltas: Vec<(AccountId, i64)> },
    ActivateRecurring { serialized_instrument: String },
    CancelCronItem { target_number: TransactionNumber },
    PayDividend { per_share: i64, source_account: AccountId },
}

/// The transaction-ledger body of a transaction request: a one-transaction
/// ledger carrying the primary number, its items, and the statement that
/// pins the client's view of their account/numbers (§4.3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub primary_number: TransactionNumber,
    pub auxiliary_numbers: Vec<TransactionNumber>,
    pub items: Vec<Item>,
    pub statement: Statement,
}

/// Either a plain message request or a transaction request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum RequestPayload {
    Message { command: String, body: serde_json::Value },
    Transaction(TransactionRequest),
}

/// The body of an outgoing request, before signing (§4.2).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestBody {
    pub command: String,
    pub sender_nym: NymId,
    pub server: ServerId,
    pub request_number: RequestNumber,
    pub acknowledged: Vec<RequestNumber>,
    pub nymbox_hash: String,
    pub payload: RequestPayload,
}

/// A signed, ready-to-send request envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutgoingEnvelope {
    pub body: RequestBody,
    /// Raw ed25519 signature bytes over `body`'s canonical encoding.
    pub signature: Vec<u8>,
}

/// Whether a reply succeeded, and at which layer it failed if not (§4.5,
/// §7: message-level vs transaction/balance-agreement-level failure).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyOutcome {
    Success,
    MessageFailure,
    TransactionFailure,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplyBody {
    pub command: String,
    pub request_number: RequestNumber,
    pub outcome: ReplyOutcome,
    pub new_nymbox_hash: Option<String>,
    pub detail: Option<String>,
}

/// A reply envelope. Per §6 the client must accept both a sealed `ENVELOPE`
/// and a cleartext-armored `MESSAGE` — both collapse to the same logical
/// shape once decoded, which is all this crate models.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IncomingEnvelope {
    pub body: ReplyBody,
    pub signature: Vec<u8>,
}
