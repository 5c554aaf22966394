//! `record_payment` — the hardest subsystem (§4.4).
//!
//! Split into a pure `decide` step (an immutable snapshot in, a decision
//! out — unit-testable without any I/O) and an `apply` step that performs
//! the staged commit: stage the destination write, remove from the source,
//! and only then harvest numbers and persist. A mid-sequence crash must
//! never leave a number harvested without the instrument removed, or vice
//! versa — `apply` stages the destination insert in memory, performs the
//! source removal, and only after both succeed does it touch the number
//! manager. On any failure the staged insert is simply dropped.

use crate::client::number_manager::NumberManager;
use crate::error::Error;
use crate::types::ids::{NymId, ServerId, TransactionNumber};
use crate::types::instrument::PaymentInstrument;
use crate::types::ledger::{Ledger, LedgerEntry, TransactionType};
use crate::types::outpayment::{IncomingPaymentEntry, OutpaymentEntry};

/// Which box the instrument under consideration currently lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceBox {
    PaymentInbox,
    Outpayments,
}

/// Immutable snapshot `decide` reasons over. The caller (which has access
/// to the wallet/number-manager state) builds this once per call.
pub struct RecordDecisionInput<'a> {
    pub my_nym: &'a NymId,
    pub server: &'a ServerId,
    pub instrument: &'a PaymentInstrument,
    pub source: SourceBox,
    pub now: i64,
    pub is_issued: bool,
    pub is_tentative: bool,
    /// Whether a `chequeReceipt`/`voucherReceipt`/`paymentReceipt`/
    /// `finalReceipt` referencing this instrument's number already exists
    /// in the relevant asset-account inbox(es) (§4.4's "related receipt"
    /// check; for smart contracts, across every account of every party the
    /// local Nym has signing authority over).
    pub related_receipt_present: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    RecordBox,
    ExpiredBox,
}

/// The outcome of the decision table (§4.4 steps 1–8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordDecision {
    /// Move the instrument, optionally harvesting the given numbers.
    Move { to: Destination, harvest: Vec<TransactionNumber> },
    /// Refuse the operation — caller must not touch the instrument.
    Refuse(String),
}

/// Pure decision function: spec §4.4 steps 1–8, nothing else.
pub fn decide(input: &RecordDecisionInput<'_>) -> RecordDecision {
    let expired = input.instrument.validity().is_expired(input.now);

    // Step 2: incoming entries never harvest, just move.
    if input.source == SourceBox::PaymentInbox {
        let to = if expired { Destination::ExpiredBox } else { Destination::RecordBox };
        // Step 8: server/other cash or voucher I received — only move if
        // expired; otherwise keep it live to allow refund/recovery.
        if !expired {
            return RecordDecision::Refuse(
                "incoming instrument not yet expired: kept live for possible refund/recovery".into(),
            );
        }
        return RecordDecision::Move { to, harvest: vec![] };
    }

    // Outgoing (§4.4 step 3 onward).
    let opening_number = input.instrument.opening_number_for(input.my_nym);
    let is_sender = opening_number.is_some();

    if !is_sender {
        // Not my instrument to harvest/close — treat as step 8's
        // "other" case: move only once expired.
        let to = if expired { Destination::ExpiredBox } else { Destination::RecordBox };
        if !expired {
            return RecordDecision::Refuse("not the sender on this instrument; kept live".into());
        }
        return RecordDecision::Move { to, harvest: vec![] };
    }

    // Step 5: tentative numbers should never have been recorded yet.
    if input.is_tentative {
        return RecordDecision::Refuse(
            "instrument's number is still tentative; caller should never have recorded it".into(),
        );
    }

    if expired {
        // Step 6.
        if input.is_issued && !input.related_receipt_present {
            let harvest = input.instrument.numbers_to_harvest_for(input.my_nym);
            return RecordDecision::Move { to: Destination::ExpiredBox, harvest };
        }
        // Issued-with-receipt, or not-issued: move without harvest either
        // way (already used, or already processed earlier).
        return RecordDecision::Move { to: Destination::ExpiredBox, harvest: vec![] };
    }

    // Step 7: not expired.
    if input.is_issued {
        return RecordDecision::Refuse(
            "instrument not expired and number still issued: cancel with the server first".into(),
        );
    }
    RecordDecision::Move { to: Destination::RecordBox, harvest: vec![] }
}

/// Destination ledgers a `record_payment` call may write to.
pub struct RecordBoxes<'a> {
    pub record_box: &'a mut Ledger,
    pub expired_box: &'a mut Ledger,
}

fn destination_ledger<'a>(boxes: &'a mut RecordBoxes<'_>, to: Destination) -> &'a mut Ledger {
    match to {
        Destination::RecordBox => boxes.record_box,
        Destination::ExpiredBox => boxes.expired_box,
    }
}

fn ledger_entry_for(instrument: &PaymentInstrument, n: TransactionNumber) -> LedgerEntry {
    LedgerEntry::new(n, TransactionType::Notice, None).with_memo(instrument_memo(instrument))
}

fn instrument_memo(instrument: &PaymentInstrument) -> String {
    match instrument {
        PaymentInstrument::Cheque(_) => "cheque".into(),
        PaymentInstrument::Invoice(_) => "invoice".into(),
        PaymentInstrument::Voucher(_) => "voucher".into(),
        PaymentInstrument::PaymentPlan(_) => "payment_plan".into(),
        PaymentInstrument::SmartContract(_) => "smart_contract".into(),
        PaymentInstrument::Notice { .. } => "notice".into(),
    }
}

/// Synthesize a record-key for cash purses, which have no transaction
/// number: `valid_to + K`, incrementing until no collision exists in the
/// destination box (§4.4).
pub fn synthetic_cash_key(valid_to: i64, destination: &Ledger) -> TransactionNumber {
    let mut k: i64 = 0;
    loop {
        let candidate = TransactionNumber((valid_to + k).max(0) as u64);
        if destination.entries().iter().all(|e| e.transaction_number != candidate) {
            return candidate;
        }
        k += 1;
    }
}

/// Apply a decision over an outpayment entry at `index`. Stages the
/// destination write, removes the source entry, then harvests — all
/// in-memory here; the caller persists the Nym file once this returns Ok,
/// which is the all-or-nothing boundary (§4.4 failure semantics).
pub fn apply_outpayment(
    numbers: &NumberManager,
    my_nym: &NymId,
    server: &ServerId,
    outpayments: &mut Vec<OutpaymentEntry>,
    index: usize,
    boxes: &mut RecordBoxes<'_>,
    decision: RecordDecision,
) -> Result<(), Error> {
    let RecordDecision::Move { to, harvest } = decision else {
        return Err(Error::Conflict("record_payment decision refused this instrument".into()));
    };
    if index >= outpayments.len() {
        return Err(Error::NotFound("outpayment index out of range".into()));
    }

    let entry = &outpayments[index];
    let key = entry
        .instrument
        .opening_number_for(my_nym)
        .unwrap_or_else(|| synthetic_cash_key(entry.instrument.validity().valid_to, destination_ledger(boxes, to)));
    let staged = ledger_entry_for(&entry.instrument, key);

    // Stage destination write.
    destination_ledger(boxes, to).push(staged);
    // Source removal.
    outpayments.remove(index);
    // Harvest last — only after both writes above succeeded.
    for n in harvest {
        numbers.return_unused(my_nym, server, n);
    }
    Ok(())
}

/// Apply a decision over a payment-inbox entry at `index` (never harvests;
/// §4.4 step 2).
pub fn apply_payment_inbox(
    payment_inbox: &mut Vec<IncomingPaymentEntry>,
    index: usize,
    boxes: &mut RecordBoxes<'_>,
    decision: RecordDecision,
) -> Result<(), Error> {
    let RecordDecision::Move { to, .. } = decision else {
        return Err(Error::Conflict("record_payment decision refused this instrument".into()));
    };
    if index >= payment_inbox.len() {
        return Err(Error::NotFound("payment inbox index out of range".into()));
    }

    let entry = &payment_inbox[index];
    let key = synthetic_cash_key(entry.instrument.validity().valid_to, destination_ledger(boxes, to));
    let staged = ledger_entry_for(&entry.instrument, key);

    destination_ledger(boxes, to).push(staged);
    payment_inbox.remove(index);
    Ok(())
}

impl LedgerEntry {
    fn with_memo(mut self, memo: String) -> Self {
        self.reference_string = Some(memo);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ids::{AccountId, AssetId};
    use crate::types::instrument::{Cheque, InstrumentCommon, ValidityWindow};

    fn cheque_instrument(sender: &str, valid_to: i64, tx: u64) -> PaymentInstrument {
        PaymentInstrument::Cheque(
            Cheque::new(
                InstrumentCommon {
                    asset: AssetId::from("usd"),
                    server: ServerId::from("srv1"),
                    validity: ValidityWindow::new(0, valid_to),
                    memo: None,
                },
                AccountId::from("acct-a"),
                NymId::from(sender),
                TransactionNumber(tx),
                100,
            )
            .unwrap(),
        )
    }

    // Scenario 1: cheque happy path — receipt present, not expired -> record box, no harvest.
    #[test]
    fn closed_not_expired_cheque_moves_to_record_box_without_harvest() {
        let instrument = cheque_instrument("alice", 1_000, 101);
        let input = RecordDecisionInput {
            my_nym: &NymId::from("alice"),
            server: &ServerId::from("srv1"),
            instrument: &instrument,
            source: SourceBox::Outpayments,
            now: 500,
            is_issued: false, // closed already: server processed the receipt
            is_tentative: false,
            related_receipt_present: true,
        };
        let decision = decide(&input);
        assert_eq!(decision, RecordDecision::Move { to: Destination::RecordBox, harvest: vec![] });
    }

    // Scenario 2: cheque expires unused -> harvest, expired box.
    #[test]
    fn expired_unused_cheque_harvests_and_moves_to_expired_box() {
        let instrument = cheque_instrument("alice", 1_000, 101);
        let input = RecordDecisionInput {
            my_nym: &NymId::from("alice"),
            server: &ServerId::from("srv1"),
            instrument: &instrument,
            source: SourceBox::Outpayments,
            now: 2_000,
            is_issued: true,
            is_tentative: false,
            related_receipt_present: false,
        };
        let decision = decide(&input);
        assert_eq!(
            decision,
            RecordDecision::Move { to: Destination::ExpiredBox, harvest: vec![TransactionNumber(101)] }
        );
    }

    // Scenario 3: expired but cashed while in outpayments -> no harvest.
    #[test]
    fn expired_but_receipt_present_does_not_harvest() {
        let instrument = cheque_instrument("alice", 1_000, 101);
        let input = RecordDecisionInput {
            my_nym: &NymId::from("alice"),
            server: &ServerId::from("srv1"),
            instrument: &instrument,
            source: SourceBox::Outpayments,
            now: 2_000,
            is_issued: true,
            is_tentative: false,
            related_receipt_present: true,
        };
        let decision = decide(&input);
        assert_eq!(decision, RecordDecision::Move { to: Destination::ExpiredBox, harvest: vec![] });
    }

    #[test]
    fn tentative_number_is_rejected() {
        let instrument = cheque_instrument("alice", 1_000, 101);
        let input = RecordDecisionInput {
            my_nym: &NymId::from("alice"),
            server: &ServerId::from("srv1"),
            instrument: &instrument,
            source: SourceBox::Outpayments,
            now: 500,
            is_issued: true,
            is_tentative: true,
            related_receipt_present: false,
        };
        assert!(matches!(decide(&input), RecordDecision::Refuse(_)));
    }

    #[test]
    fn not_expired_and_still_issued_must_cancel_first() {
        let instrument = cheque_instrument("alice", 1_000, 101);
        let input = RecordDecisionInput {
            my_nym: &NymId::from("alice"),
            server: &ServerId::from("srv1"),
            instrument: &instrument,
            source: SourceBox::Outpayments,
            now: 500,
            is_issued: true,
            is_tentative: false,
            related_receipt_present: false,
        };
        assert!(matches!(decide(&input), RecordDecision::Refuse(_)));
    }

    #[test]
    fn incoming_instrument_not_expired_is_kept_live() {
        let instrument = cheque_instrument("bob", 1_000, 101);
        let input = RecordDecisionInput {
            my_nym: &NymId::from("alice"),
            server: &ServerId::from("srv1"),
            instrument: &instrument,
            source: SourceBox::PaymentInbox,
            now: 500,
            is_issued: false,
            is_tentative: false,
            related_receipt_present: false,
        };
        assert!(matches!(decide(&input), RecordDecision::Refuse(_)));
    }

    #[test]
    fn incoming_instrument_expired_moves_to_expired_box() {
        let instrument = cheque_instrument("bob", 1_000, 101);
        let input = RecordDecisionInput {
            my_nym: &NymId::from("alice"),
            server: &ServerId::from("srv1"),
            instrument: &instrument,
            source: SourceBox::PaymentInbox,
            now: 2_000,
            is_issued: false,
            is_tentative: false,
            related_receipt_present: false,
        };
        assert_eq!(
            decide(&input),
            RecordDecision::Move { to: Destination::ExpiredBox, harvest: vec![] }
        );
    }

    #[test]
    fn apply_outpayment_removes_source_and_harvests_atomically() {
        let numbers = NumberManager::new();
        let nym = NymId::from("alice");
        let server = ServerId::from("srv1");
        numbers.seed_available(&nym, &server, vec![TransactionNumber(101)]);
        let drawn = numbers.draw_many(&nym, &server, 1).unwrap();
        numbers.confirm_tentative(&nym, &server, &drawn);

        let mut outpayments = vec![OutpaymentEntry::new(cheque_instrument("alice", 1_000, 101), 0)];
        let mut record_box = Ledger::new();
        let mut expired_box = Ledger::new();
        let mut boxes = RecordBoxes { record_box: &mut record_box, expired_box: &mut expired_box };

        apply_outpayment(
            &numbers,
            &nym,
            &server,
            &mut outpayments,
            0,
            &mut boxes,
            RecordDecision::Move { to: Destination::ExpiredBox, harvest: vec![TransactionNumber(101)] },
        )
        .unwrap();

        assert!(outpayments.is_empty());
        assert_eq!(expired_box.entries().len(), 1);
        assert!(!numbers.is_issued(&nym, &server, TransactionNumber(101)));
        assert_eq!(numbers.available_count(&nym, &server), 1);
    }

    #[test]
    fn synthetic_cash_key_avoids_collisions() {
        let mut ledger = Ledger::new();
        ledger.push(LedgerEntry::new(TransactionNumber(1_000), TransactionType::Notice, None));
        let key = synthetic_cash_key(1_000, &ledger);
        assert_eq!(key, TransactionNumber(1_001));
    }
}
