//! Outpayment queue entries.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::instrument::PaymentInstrument;

/// An instrument the local Nym has sent, kept until it is closed by a
/// matching receipt, canceled, or expired with its number clawed back (§3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutpaymentEntry {
    pub instrument: PaymentInstrument,
    /// Content-addressed dedup key (a hash of the loaded instrument),
    /// supplemented from `original_source/src/otx/client/PaymentTasks.cpp`:
    /// identity for dedup purposes is the instrument's content, not its
    /// raw transaction number alone, since the same number can recur across
    /// unrelated boxes during reconciliation races.
    pub instrument_id: String,
    pub sent_at: i64,
}

impl OutpaymentEntry {
    pub fn new(instrument: PaymentInstrument, sent_at: i64) -> Self {
        let instrument_id = compute_instrument_id(&instrument, sent_at);
        Self {
            instrument,
            instrument_id,
            sent_at,
        }
    }
}

/// An instrument dropped in the local Nym's payment inbox (incoming, not
/// yet deposited or recorded) — §3, §4.4 step 2.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IncomingPaymentEntry {
    pub instrument: PaymentInstrument,
    pub received_at: i64,
}

impl IncomingPaymentEntry {
    pub fn new(instrument: PaymentInstrument, received_at: i64) -> Self {
        Self { instrument, received_at }
    }
}

fn compute_instrument_id(instrument: &PaymentInstrument, sent_at: i64) -> String {
    let encoded = serde_json::to_vec(instrument).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    hasher.update(sent_at.to_le_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ids::{AccountId, AssetId, NymId, ServerId, TransactionNumber};
    use crate::types::instrument::{Cheque, InstrumentCommon, ValidityWindow};

    fn sample_cheque() -> PaymentInstrument {
        PaymentInstrument::Cheque(
            Cheque::new(
                InstrumentCommon {
                    asset: AssetId::from("usd"),
                    server: ServerId::from("srv1"),
                    validity: ValidityWindow::new(0, 1_000),
                    memo: None,
                },
                AccountId::from("acct-a"),
                NymId::from("alice"),
                TransactionNumber(101),
                100,
            )
            .unwrap(),
        )
    }

    #[test]
    fn identical_instruments_at_same_time_dedup_to_same_id() {
        let a = OutpaymentEntry::new(sample_cheque(), 1_000);
        let b = OutpaymentEntry::new(sample_cheque(), 1_000);
        assert_eq!(a.instrument_id, b.instrument_id);
    }

    #[test]
    fn same_instrument_sent_at_different_times_differs() {
        let a = OutpaymentEntry::new(sample_cheque(), 1_000);
        let b = OutpaymentEntry::new(sample_cheque(), 2_000);
        assert_ne!(a.instrument_id, b.instrument_id);
    }
}
