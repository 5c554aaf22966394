//! Ledgers and the abbreviated/full ledger-entry split.

use serde::{Deserialize, Serialize};

use crate::types::ids::TransactionNumber;

/// Which box a ledger represents. A Nym or asset account may own several.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoxKind {
    Nymbox,
    Inbox,
    Outbox,
    PaymentInbox,
    RecordBox,
    ExpiredBox,
}

/// The type of a ledger transaction entry.
///
/// Receipt variants (`*Receipt`) are what `RecordEngine` scans an inbox for
/// when deciding whether an outgoing instrument's number was ever spent
/// (§4.4).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    ChequeReceipt,
    VoucherReceipt,
    PaymentReceipt,
    FinalReceipt,
    MarketReceipt,
    BasketReceipt,
    TransferReceipt,
    ReplyNotice,
    Notice,
    Pending,
}

impl TransactionType {
    /// Whether this is one of the receipt kinds `RecordEngine` looks for
    /// as evidence that an instrument's transaction number was consumed.
    pub fn is_relevant_receipt(&self) -> bool {
        matches!(
            self,
            TransactionType::ChequeReceipt
                | TransactionType::VoucherReceipt
                | TransactionType::PaymentReceipt
                | TransactionType::FinalReceipt
        )
    }
}

/// The body of a ledger entry: either abbreviated (hash only, full body
/// stored out-of-line in the box-receipt folder) or inline in full.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EntryBody {
    Abbreviated { hash: String },
    Full { payload: String },
}

/// A single transaction entry in a ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub transaction_number: TransactionNumber,
    pub tx_type: TransactionType,
    pub reference_to_number: Option<TransactionNumber>,
    pub reference_string: Option<String>,
    pub body: EntryBody,
}

impl LedgerEntry {
    pub fn new(
        transaction_number: TransactionNumber,
        tx_type: TransactionType,
        reference_to_number: Option<TransactionNumber>,
    ) -> Self {
        Self {
            transaction_number,
            tx_type,
            reference_to_number,
            reference_string: None,
            body: EntryBody::Abbreviated {
                hash: String::new(),
            },
        }
    }
}

/// A typed container of transactions for one box.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn push(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    pub fn remove_by_number(&mut self, n: TransactionNumber) -> Option<LedgerEntry> {
        let idx = self.entries.iter().position(|e| e.transaction_number == n)?;
        Some(self.entries.remove(idx))
    }

    /// Find a receipt (`*Receipt` type) referencing `n`, per §4.4's
    /// "related receipt" check. Per the testable invariant in §8, there is
    /// at most one such entry per `n` in a well-formed box.
    pub fn find_receipt_referencing(&self, n: TransactionNumber) -> Option<&LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| e.tx_type.is_relevant_receipt())
            .find(|e| e.reference_to_number == Some(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_receipt_by_reference_number() {
        let mut inbox = Ledger::new();
        inbox.push(LedgerEntry::new(
            TransactionNumber(500),
            TransactionType::ChequeReceipt,
            Some(TransactionNumber(101)),
        ));

        assert!(inbox.find_receipt_referencing(TransactionNumber(101)).is_some());
        assert!(inbox.find_receipt_referencing(TransactionNumber(999)).is_none());
    }

    #[test]
    fn ignores_non_receipt_entries_when_searching() {
        let mut nymbox = Ledger::new();
        nymbox.push(LedgerEntry::new(
            TransactionNumber(1),
            TransactionType::ReplyNotice,
            Some(TransactionNumber(101)),
        ));
        assert!(nymbox.find_receipt_referencing(TransactionNumber(101)).is_none());
    }
}
