//! Core data model for the notary client (§3).

pub mod account;
pub mod asset_contract;
pub mod envelope;
pub mod ids;
pub mod instrument;
pub mod ledger;
pub mod nym;
pub mod outpayment;
pub mod purse;
pub mod server_contract;
pub mod statement;

pub use account::AssetAccount;
pub use asset_contract::{AssetContract, SubAsset};
pub use envelope::{
    Item, IncomingEnvelope, OutgoingEnvelope, ReplyBody, ReplyOutcome, RequestBody, RequestPayload,
    TransactionRequest,
};
pub use ids::{AccountId, AssetId, NymId, RequestNumber, ServerId, TransactionNumber};
pub use instrument::{
    Cheque, InstrumentCommon, PartyId, PaymentInstrument, PaymentPlan, ScriptProgram,
    SmartContract, SmartContractAccount, SmartContractParty, ValidityWindow, Voucher,
};
pub use ledger::{BoxKind, EntryBody, Ledger, LedgerEntry, TransactionType};
pub use nym::{KeySource, Nym};
pub use outpayment::{IncomingPaymentEntry, OutpaymentEntry};
pub use purse::{CashPurse, CashToken, PurseOwnerSpec};
pub use server_contract::{Endpoint, ServerContract};
pub use statement::{BalanceStatement, ReceiptDigest, Statement, TransactionStatement};

/// Serde helper for `ed25519_dalek::VerifyingKey`, which doesn't derive
/// `Serialize`/`Deserialize` without the dalek `serde` feature — this crate
/// keeps the dependency surface the same as the teacher's stock
/// `ed25519-dalek` feature set and round-trips through raw bytes instead.
pub(crate) mod verifying_key_bytes {
    use ed25519_dalek::VerifyingKey;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(key: &VerifyingKey, s: S) -> Result<S::Ok, S::Error> {
        key.as_bytes().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<VerifyingKey, D::Error> {
        let bytes: [u8; 32] = Deserialize::deserialize(d)?;
        VerifyingKey::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}
